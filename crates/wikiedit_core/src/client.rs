use std::env;
use std::thread::sleep;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::config::WikiConfig;

pub const NS_MAIN: i32 = 0;
pub const NS_TEMPLATE: i32 = 10;
pub const NS_CATEGORY: i32 = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedPage {
    pub title: String,
    pub namespace: i32,
}

#[derive(Debug, Clone)]
pub struct RemotePage {
    pub title: String,
    pub namespace: i32,
    pub page_id: i64,
    pub revision_id: i64,
    pub timestamp: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditResult {
    pub new_revision_id: Option<i64>,
    pub no_change: bool,
}

pub trait WikiReadApi {
    fn list_all_pages(&mut self, namespace: i32) -> Result<Vec<ListedPage>>;
    fn list_category_members(&mut self, category: &str) -> Result<Vec<ListedPage>>;
    fn list_transclusions(&mut self, template: &str) -> Result<Vec<ListedPage>>;
    /// Returns `Ok(None)` when the page does not exist.
    fn get_page_content(&mut self, title: &str) -> Result<Option<RemotePage>>;
    fn request_count(&self) -> usize;
}

pub trait WikiWriteApi: WikiReadApi {
    fn login(&mut self, username: &str, password: &str) -> Result<()>;
    /// `base_timestamp` is the revision timestamp the new content was derived
    /// from; the wiki reports an edit conflict when the page moved on since.
    fn edit_page(
        &mut self,
        title: &str,
        content: &str,
        summary: &str,
        base_timestamp: Option<&str>,
    ) -> Result<EditResult>;
}

impl<T: WikiReadApi + ?Sized> WikiReadApi for &mut T {
    fn list_all_pages(&mut self, namespace: i32) -> Result<Vec<ListedPage>> {
        (**self).list_all_pages(namespace)
    }

    fn list_category_members(&mut self, category: &str) -> Result<Vec<ListedPage>> {
        (**self).list_category_members(category)
    }

    fn list_transclusions(&mut self, template: &str) -> Result<Vec<ListedPage>> {
        (**self).list_transclusions(template)
    }

    fn get_page_content(&mut self, title: &str) -> Result<Option<RemotePage>> {
        (**self).get_page_content(title)
    }

    fn request_count(&self) -> usize {
        (**self).request_count()
    }
}

impl<T: WikiWriteApi + ?Sized> WikiWriteApi for &mut T {
    fn login(&mut self, username: &str, password: &str) -> Result<()> {
        (**self).login(username, password)
    }

    fn edit_page(
        &mut self,
        title: &str,
        content: &str,
        summary: &str,
        base_timestamp: Option<&str>,
    ) -> Result<EditResult> {
        (**self).edit_page(title, content, summary, base_timestamp)
    }
}

#[derive(Debug, Clone)]
pub struct MediaWikiClientConfig {
    pub api_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
    pub rate_limit_read_ms: u64,
    pub rate_limit_write_ms: u64,
    pub max_retries: usize,
    pub max_write_retries: usize,
    pub retry_delay_ms: u64,
}

impl MediaWikiClientConfig {
    pub fn from_config(config: &WikiConfig) -> Self {
        Self {
            api_url: config.api_url().unwrap_or_default(),
            user_agent: config.user_agent(),
            timeout_ms: env_value_u64("WIKI_HTTP_TIMEOUT_MS", 30_000),
            rate_limit_read_ms: env_value_u64("WIKI_RATE_LIMIT_READ", 300),
            rate_limit_write_ms: env_value_u64("WIKI_RATE_LIMIT_WRITE", 1_000),
            max_retries: env_value_usize("WIKI_HTTP_RETRIES", 2),
            max_write_retries: env_value_usize("WIKI_HTTP_WRITE_RETRIES", 1),
            retry_delay_ms: env_value_u64("WIKI_HTTP_RETRY_DELAY_MS", 500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

pub struct MediaWikiClient {
    client: Client,
    api_url: Url,
    config: MediaWikiClientConfig,
    last_request_at: Option<Instant>,
    request_count: usize,
    csrf_token: Option<String>,
}

impl MediaWikiClient {
    pub fn new(config: MediaWikiClientConfig) -> Result<Self> {
        if config.api_url.trim().is_empty() {
            bail!("wiki API URL is not configured (set WIKI_API_URL or [wiki].api_url)");
        }
        let api_url = Url::parse(config.api_url.trim())
            .with_context(|| format!("invalid wiki API URL: {}", config.api_url))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .build()
            .context("failed to build MediaWiki HTTP client")?;

        Ok(Self {
            client,
            api_url,
            config,
            last_request_at: None,
            request_count: 0,
            csrf_token: None,
        })
    }

    fn request_json(
        &mut self,
        method: Method,
        params: &[(&str, String)],
        is_write: bool,
    ) -> Result<Value> {
        let max_retries = if is_write {
            self.config.max_write_retries
        } else {
            self.config.max_retries
        };
        let pairs = with_format_params(params);

        for attempt in 0..=max_retries {
            self.apply_rate_limit(is_write);
            tracing::debug!(
                action = params.first().map(|(_, value)| value.as_str()).unwrap_or(""),
                attempt,
                "MediaWiki API request"
            );
            let request: RequestBuilder = match method {
                Method::Get => self.client.get(self.api_url.clone()).query(&pairs),
                Method::Post => self.client.post(self.api_url.clone()).form(&pairs),
            };

            match request.send() {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        if attempt < max_retries && is_retryable_status(status) {
                            self.wait_before_retry(attempt, is_write);
                            continue;
                        }
                        bail!("MediaWiki API request failed with HTTP {status}");
                    }

                    let payload: Value = response
                        .json()
                        .context("failed to decode MediaWiki API JSON response")?;
                    check_api_error(&payload)?;
                    return Ok(payload);
                }
                Err(error) => {
                    if attempt < max_retries && is_retryable_error(&error) {
                        self.wait_before_retry(attempt, is_write);
                        continue;
                    }
                    return Err(error).context("failed to call MediaWiki API");
                }
            }
        }

        bail!("MediaWiki API request exhausted retry budget")
    }

    fn apply_rate_limit(&mut self, is_write: bool) {
        let delay = if is_write {
            Duration::from_millis(self.config.rate_limit_write_ms)
        } else {
            Duration::from_millis(self.config.rate_limit_read_ms)
        };
        if let Some(last) = self.last_request_at {
            let elapsed = last.elapsed();
            if elapsed < delay {
                sleep(delay - elapsed);
            }
        }
        self.last_request_at = Some(Instant::now());
        self.request_count += 1;
    }

    fn wait_before_retry(&self, attempt: usize, is_write: bool) {
        let exponent = u32::try_from(attempt).unwrap_or(16);
        let base = self
            .config
            .retry_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent));
        let jitter = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| u64::from(duration.subsec_millis() % 100))
            .unwrap_or(0);
        let multiplier = if is_write { 2u64 } else { 1u64 };
        let wait = base.saturating_mul(multiplier).saturating_add(jitter);
        tracing::warn!(attempt, wait_ms = wait, "retrying MediaWiki API request");
        sleep(Duration::from_millis(wait));
    }

    fn fetch_token(&mut self, kind: &str) -> Result<String> {
        let response = self.request_json(
            Method::Get,
            &[
                ("action", "query".to_string()),
                ("meta", "tokens".to_string()),
                ("type", kind.to_string()),
            ],
            false,
        )?;
        let parsed: TokenQueryResponse = serde_json::from_value(response)
            .with_context(|| format!("failed to decode {kind} token response"))?;
        let tokens = parsed.query.tokens.unwrap_or_default();
        let token = match kind {
            "login" => tokens.logintoken,
            _ => tokens.csrftoken,
        };
        token.ok_or_else(|| anyhow::anyhow!("failed to get MediaWiki {kind} token"))
    }

    fn ensure_csrf_token(&mut self) -> Result<String> {
        if let Some(token) = &self.csrf_token {
            return Ok(token.clone());
        }
        let token = self.fetch_token("csrf")?;
        self.csrf_token = Some(token.clone());
        Ok(token)
    }

    /// Walks a `list=` query through every continuation page.
    fn list_query(
        &mut self,
        list: &str,
        mut params: Vec<(&'static str, String)>,
        continue_key: &'static str,
    ) -> Result<Vec<ListedPage>> {
        params.insert(0, ("list", list.to_string()));
        params.insert(0, ("action", "query".to_string()));

        let mut pages = Vec::new();
        let mut continuation: Option<ContinuationPayload> = None;
        loop {
            let mut request = params.clone();
            if let Some(cont) = &continuation {
                if let Some(marker) = &cont.marker {
                    request.push(("continue", marker.clone()));
                }
                if let Some(token) = cont.token(continue_key) {
                    request.push((continue_key, token.to_string()));
                }
            }

            let response = self.request_json(Method::Get, &request, false)?;
            let parsed: QueryResponse = serde_json::from_value(response)
                .with_context(|| format!("failed to decode {list} API response"))?;
            pages.extend(parsed.query.listed(list));

            continuation = parsed
                .continuation
                .filter(|cont| cont.token(continue_key).is_some());
            if continuation.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}

impl WikiReadApi for MediaWikiClient {
    fn list_all_pages(&mut self, namespace: i32) -> Result<Vec<ListedPage>> {
        self.list_query(
            "allpages",
            vec![
                ("apnamespace", namespace.to_string()),
                ("aplimit", "max".to_string()),
            ],
            "apcontinue",
        )
    }

    fn list_category_members(&mut self, category: &str) -> Result<Vec<ListedPage>> {
        self.list_query(
            "categorymembers",
            vec![
                ("cmtitle", prefixed_title("Category", category)),
                ("cmtype", "page".to_string()),
                ("cmlimit", "max".to_string()),
            ],
            "cmcontinue",
        )
    }

    fn list_transclusions(&mut self, template: &str) -> Result<Vec<ListedPage>> {
        self.list_query(
            "embeddedin",
            vec![
                ("eititle", prefixed_title("Template", template)),
                ("eilimit", "max".to_string()),
            ],
            "eicontinue",
        )
    }

    fn get_page_content(&mut self, title: &str) -> Result<Option<RemotePage>> {
        let response = self.request_json(
            Method::Get,
            &[
                ("action", "query".to_string()),
                ("titles", title.to_string()),
                ("prop", "revisions".to_string()),
                ("rvprop", "content|timestamp|ids".to_string()),
                ("rvslots", "main".to_string()),
            ],
            false,
        )?;
        let parsed: QueryResponse = serde_json::from_value(response)
            .context("failed to decode page content API response")?;
        page_from_query(parsed, title)
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

impl WikiWriteApi for MediaWikiClient {
    fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let login_token = self.fetch_token("login")?;
        let response = self.request_json(
            Method::Post,
            &[
                ("action", "login".to_string()),
                ("lgname", username.to_string()),
                ("lgpassword", password.to_string()),
                ("lgtoken", login_token),
            ],
            true,
        )?;
        let payload: LoginResponse =
            serde_json::from_value(response).context("failed to decode login response")?;
        match payload.login.result.as_deref() {
            Some("Success") => {
                self.csrf_token = None;
                Ok(())
            }
            other => bail!(
                "{}",
                payload
                    .login
                    .reason
                    .or_else(|| other.map(ToString::to_string))
                    .unwrap_or_else(|| "unknown error".to_string())
            ),
        }
    }

    fn edit_page(
        &mut self,
        title: &str,
        content: &str,
        summary: &str,
        base_timestamp: Option<&str>,
    ) -> Result<EditResult> {
        let token = self.ensure_csrf_token()?;
        let params = edit_params(title, content, summary, base_timestamp, token);
        let response = self.request_json(Method::Post, &params, true)?;
        parse_edit_response(response, title)
    }
}

/// `text` is always sent, so a transform that blanks a page still saves.
fn edit_params(
    title: &str,
    content: &str,
    summary: &str,
    base_timestamp: Option<&str>,
    token: String,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("action", "edit".to_string()),
        ("title", title.to_string()),
        ("text", content.to_string()),
        ("summary", summary.to_string()),
    ];
    if let Some(timestamp) = base_timestamp.filter(|value| !value.is_empty()) {
        params.push(("basetimestamp", timestamp.to_string()));
    }
    params.push(("nocreate", "1".to_string()));
    params.push(("bot", "1".to_string()));
    params.push(("token", token));
    params
}

fn with_format_params(params: &[(&str, String)]) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len() + 2);
    pairs.push(("format".to_string(), "json".to_string()));
    pairs.push(("formatversion".to_string(), "2".to_string()));
    pairs.extend(
        params
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone())),
    );
    pairs
}

fn check_api_error(payload: &Value) -> Result<()> {
    if let Some(error) = payload.get("error") {
        let code = error
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        let info = error
            .get("info")
            .and_then(Value::as_str)
            .unwrap_or("unknown info");
        bail!("MediaWiki API error [{code}]: {info}");
    }
    Ok(())
}

fn page_from_query(parsed: QueryResponse, requested: &str) -> Result<Option<RemotePage>> {
    let Some(page) = parsed.query.pages.into_iter().next() else {
        bail!("page query returned no entry for {requested}");
    };
    if page.invalid.unwrap_or(false) {
        bail!(
            "invalid title {requested}: {}",
            page.invalidreason.unwrap_or_else(|| "unknown reason".to_string())
        );
    }
    if page.missing.unwrap_or(false) {
        return Ok(None);
    }
    let page_id = page
        .pageid
        .ok_or_else(|| anyhow::anyhow!("page query returned no page id for {requested}"))?;
    let revision = page
        .revisions
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("page query returned no revision for {requested}"))?;
    let content = revision
        .slots
        .and_then(|slots| slots.main)
        .map(|slot| slot.content)
        .ok_or_else(|| anyhow::anyhow!("page query returned no main slot for {requested}"))?;

    Ok(Some(RemotePage {
        title: page.title,
        namespace: page.ns,
        page_id,
        revision_id: revision.revid,
        timestamp: revision.timestamp,
        content,
    }))
}

fn parse_edit_response(response: Value, title: &str) -> Result<EditResult> {
    let payload: EditResponse =
        serde_json::from_value(response).context("failed to decode edit response")?;
    let edit = payload
        .edit
        .ok_or_else(|| anyhow::anyhow!("missing edit payload in API response"))?;
    if edit.result.as_deref() != Some("Success") {
        bail!(
            "MediaWiki edit failed for {}: {}",
            title,
            edit.result.unwrap_or_else(|| "unknown".to_string())
        );
    }
    Ok(EditResult {
        new_revision_id: edit.newrevid,
        no_change: edit.nochange.unwrap_or(false),
    })
}

fn prefixed_title(namespace: &str, title: &str) -> String {
    let trimmed = title.trim();
    let prefix = format!("{namespace}:");
    if trimmed
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(&prefix))
    {
        trimmed.to_string()
    } else {
        format!("{prefix}{trimmed}")
    }
}

fn env_value_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_value_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

#[derive(Debug, Deserialize, Default)]
struct QueryResponse {
    #[serde(default)]
    query: QueryPayload,
    #[serde(default, rename = "continue")]
    continuation: Option<ContinuationPayload>,
}

#[derive(Debug, Deserialize, Default)]
struct QueryPayload {
    #[serde(default)]
    allpages: Vec<TitleQueryItem>,
    #[serde(default)]
    categorymembers: Vec<TitleQueryItem>,
    #[serde(default)]
    embeddedin: Vec<TitleQueryItem>,
    #[serde(default)]
    pages: Vec<PageQueryItem>,
}

impl QueryPayload {
    fn listed(self, list: &str) -> Vec<ListedPage> {
        let items = match list {
            "allpages" => self.allpages,
            "categorymembers" => self.categorymembers,
            "embeddedin" => self.embeddedin,
            _ => Vec::new(),
        };
        items
            .into_iter()
            .map(|item| ListedPage {
                title: item.title,
                namespace: item.ns,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize, Default)]
struct ContinuationPayload {
    #[serde(rename = "continue")]
    marker: Option<String>,
    apcontinue: Option<String>,
    cmcontinue: Option<String>,
    eicontinue: Option<String>,
}

impl ContinuationPayload {
    fn token(&self, key: &str) -> Option<&str> {
        match key {
            "apcontinue" => self.apcontinue.as_deref(),
            "cmcontinue" => self.cmcontinue.as_deref(),
            "eicontinue" => self.eicontinue.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TitleQueryItem {
    title: String,
    #[serde(default)]
    ns: i32,
}

#[derive(Debug, Deserialize)]
struct PageQueryItem {
    pageid: Option<i64>,
    #[serde(default)]
    ns: i32,
    title: String,
    missing: Option<bool>,
    invalid: Option<bool>,
    invalidreason: Option<String>,
    #[serde(default)]
    revisions: Vec<RevisionQueryItem>,
}

#[derive(Debug, Deserialize)]
struct RevisionQueryItem {
    revid: i64,
    timestamp: String,
    slots: Option<RevisionSlotContainer>,
}

#[derive(Debug, Deserialize)]
struct RevisionSlotContainer {
    main: Option<RevisionMainSlot>,
}

#[derive(Debug, Deserialize)]
struct RevisionMainSlot {
    content: String,
}

#[derive(Debug, Deserialize, Default)]
struct TokenQueryResponse {
    #[serde(default)]
    query: TokenQueryPayload,
}

#[derive(Debug, Deserialize, Default)]
struct TokenQueryPayload {
    tokens: Option<TokenPayload>,
}

#[derive(Debug, Deserialize, Default)]
struct TokenPayload {
    logintoken: Option<String>,
    csrftoken: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct LoginResponse {
    #[serde(default)]
    login: LoginPayload,
}

#[derive(Debug, Deserialize, Default)]
struct LoginPayload {
    result: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct EditResponse {
    edit: Option<EditPayload>,
}

#[derive(Debug, Deserialize, Default)]
struct EditPayload {
    result: Option<String>,
    newrevid: Option<i64>,
    nochange: Option<bool>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        ContinuationPayload, QueryResponse, check_api_error, page_from_query, parse_edit_response,
        edit_params, prefixed_title, with_format_params,
    };

    #[test]
    fn page_query_returns_content_and_revision() {
        let parsed: QueryResponse = serde_json::from_value(json!({
            "query": {
                "pages": [{
                    "pageid": 42,
                    "ns": 0,
                    "title": "Alpha",
                    "revisions": [{
                        "revid": 7,
                        "timestamp": "2026-02-19T00:00:00Z",
                        "slots": { "main": { "content": "alpha body" } }
                    }]
                }]
            }
        }))
        .expect("decode");

        let page = page_from_query(parsed, "Alpha")
            .expect("query")
            .expect("page exists");
        assert_eq!(page.page_id, 42);
        assert_eq!(page.revision_id, 7);
        assert_eq!(page.content, "alpha body");
        assert_eq!(page.timestamp, "2026-02-19T00:00:00Z");
    }

    #[test]
    fn missing_page_maps_to_none() {
        let parsed: QueryResponse = serde_json::from_value(json!({
            "query": { "pages": [{ "ns": 0, "title": "Ghost", "missing": true }] }
        }))
        .expect("decode");
        assert!(page_from_query(parsed, "Ghost").expect("query").is_none());
    }

    #[test]
    fn invalid_title_is_an_error() {
        let parsed: QueryResponse = serde_json::from_value(json!({
            "query": { "pages": [{
                "title": "Bad|Title",
                "invalid": true,
                "invalidreason": "contains illegal characters"
            }] }
        }))
        .expect("decode");
        let error = page_from_query(parsed, "Bad|Title").expect_err("invalid");
        assert!(error.to_string().contains("illegal characters"));
    }

    #[test]
    fn embeddedin_listing_and_continuation_decode() {
        let parsed: QueryResponse = serde_json::from_value(json!({
            "continue": { "eicontinue": "10|123", "continue": "-||" },
            "query": { "embeddedin": [
                { "pageid": 1, "ns": 0, "title": "Ship A" },
                { "pageid": 2, "ns": 2, "title": "User:Sandbox" }
            ] }
        }))
        .expect("decode");

        let cont: ContinuationPayload = parsed.continuation.expect("continuation");
        assert_eq!(cont.token("eicontinue"), Some("10|123"));
        assert_eq!(cont.marker.as_deref(), Some("-||"));
        assert_eq!(cont.token("cmcontinue"), None);

        let listed = parsed.query.listed("embeddedin");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].title, "User:Sandbox");
        assert_eq!(listed[1].namespace, 2);
    }

    #[test]
    fn api_error_payload_is_reported_with_code() {
        let error = check_api_error(&json!({
            "error": { "code": "editconflict", "info": "Edit conflict." }
        }))
        .expect_err("api error");
        assert_eq!(
            error.to_string(),
            "MediaWiki API error [editconflict]: Edit conflict."
        );
        assert!(check_api_error(&json!({ "query": {} })).is_ok());
    }

    #[test]
    fn edit_response_reports_revision_and_nochange() {
        let result = parse_edit_response(
            json!({ "edit": { "result": "Success", "newrevid": 99 } }),
            "Alpha",
        )
        .expect("edit");
        assert_eq!(result.new_revision_id, Some(99));
        assert!(!result.no_change);

        let error = parse_edit_response(json!({ "edit": { "result": "Failure" } }), "Alpha")
            .expect_err("failure");
        assert!(error.to_string().contains("Alpha"));
    }

    #[test]
    fn blanking_edit_still_sends_text() {
        let params = edit_params("Ship A", "", "Blank page", None, "tok+\\".to_string());
        let pairs = with_format_params(&params);

        let text = pairs.iter().find(|(key, _)| key == "text");
        assert_eq!(text.map(|(_, value)| value.as_str()), Some(""));
        assert!(pairs.iter().all(|(key, _)| key != "basetimestamp"));
        assert_eq!(pairs[0], ("format".to_string(), "json".to_string()));
    }

    #[test]
    fn edit_params_carry_base_timestamp_when_known() {
        let params = edit_params(
            "Ship A",
            "body",
            "Update",
            Some("2026-02-19T00:00:00Z"),
            "tok+\\".to_string(),
        );
        assert!(params.contains(&("basetimestamp", "2026-02-19T00:00:00Z".to_string())));
        assert!(params.contains(&("nocreate", "1".to_string())));
    }

    #[test]
    fn namespace_prefix_is_added_once() {
        assert_eq!(prefixed_title("Template", "Ship infobox"), "Template:Ship infobox");
        assert_eq!(
            prefixed_title("Template", "template:Ship infobox"),
            "template:Ship infobox"
        );
        assert_eq!(prefixed_title("Category", " Ships "), "Category:Ships");
    }
}
