//! The bulk update driver.
//!
//! Targets are processed one at a time, in order, through a single session:
//! fetch, transform, compare, and (outside dry runs) save. Per-page failures
//! are recorded and the batch moves on; nothing here retries.

use std::collections::BTreeSet;
use std::thread::sleep;
use std::time::Duration;

use crate::client::{NS_MAIN, RemotePage, WikiWriteApi};
use crate::error::{FetchError, PageFailure, SaveError, SetupError, TransformError};
use crate::report::render_diff;
use crate::session::{Credentials, WikiSession};
use crate::targets::{
    PageTarget, TargetQuery, namespace_of_title, normalize_title, resolve_targets,
};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub summary: String,
    pub dry_run: bool,
    /// Pause between consecutive pages; not applied before the first one.
    pub delay: Duration,
    /// Keep a unified diff on every `Updated` outcome.
    pub capture_diff: bool,
}

impl RunOptions {
    /// A live run needs an edit summary; a dry run may go without one.
    pub fn new(summary: impl Into<String>, dry_run: bool) -> Result<Self, SetupError> {
        let summary = summary.into().trim().to_string();
        if summary.is_empty() && !dry_run {
            return Err(SetupError::Options(
                "a live run requires a non-empty edit summary".to_string(),
            ));
        }
        Ok(Self {
            summary,
            dry_run,
            delay: Duration::ZERO,
            capture_diff: false,
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_diff(mut self, capture_diff: bool) -> Self {
        self.capture_diff = capture_diff;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Unchanged,
    Updated {
        new_content: String,
        summary: String,
        /// False for dry runs: the content was computed but never submitted.
        written: bool,
        revision_id: Option<i64>,
        diff: Option<String>,
    },
    Failed(PageFailure),
}

impl PageOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Updated { written: true, .. } => "updated",
            Self::Updated { written: false, .. } => "would_update",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    pub title: String,
    pub outcome: PageOutcome,
}

/// Per-page outcomes of one finished run, in target order.
#[derive(Debug, Clone)]
pub struct RunReport {
    dry_run: bool,
    summary: String,
    pages: Vec<PageReport>,
    request_count: usize,
}

impl RunReport {
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn pages(&self) -> &[PageReport] {
        &self.pages
    }

    pub fn get(&self, title: &str) -> Option<&PageOutcome> {
        let key = title_key(title);
        self.pages
            .iter()
            .find(|page| title_key(&page.title) == key)
            .map(|page| &page.outcome)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn updated(&self) -> usize {
        self.pages.iter().filter(|page| page.outcome.is_updated()).count()
    }

    pub fn unchanged(&self) -> usize {
        self.pages
            .iter()
            .filter(|page| page.outcome == PageOutcome::Unchanged)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.pages.iter().filter(|page| page.outcome.is_failed()).count()
    }

    /// Requests issued through the session, including login and listing.
    pub fn request_count(&self) -> usize {
        self.request_count
    }
}

/// A run in progress. Callers that want to stop early simply stop calling
/// [`BatchRun::next_page`] and [`BatchRun::finish`] with what was processed.
pub struct BatchRun<'a> {
    targets: &'a [PageTarget],
    options: &'a RunOptions,
    position: usize,
    seen: BTreeSet<String>,
    /// Page ids already handled, so aliases of one page are updated once.
    seen_pages: BTreeSet<i64>,
    pages: Vec<PageReport>,
}

impl<'a> BatchRun<'a> {
    pub fn new(targets: &'a [PageTarget], options: &'a RunOptions) -> Self {
        Self {
            targets,
            options,
            position: 0,
            seen: BTreeSet::new(),
            seen_pages: BTreeSet::new(),
            pages: Vec::with_capacity(targets.len()),
        }
    }

    /// Targets not yet looked at, duplicates included.
    pub fn remaining(&self) -> usize {
        self.targets.len() - self.position
    }

    /// Processes the next distinct target; `None` once every target is done.
    pub fn next_page<A, F>(
        &mut self,
        session: &mut WikiSession<A>,
        transform: &mut F,
    ) -> Option<&PageReport>
    where
        A: WikiWriteApi,
        F: FnMut(&str) -> Result<String, TransformError>,
    {
        loop {
            let target = self.targets.get(self.position)?;
            self.position += 1;
            if !self.seen.insert(title_key(&target.title)) {
                tracing::debug!(title = %target.title, "duplicate target ignored");
                continue;
            }

            if !self.pages.is_empty() && !self.options.delay.is_zero() {
                sleep(self.options.delay);
            }

            let outcome = match fetch_page(session.api(), &target.title) {
                Ok(page) => {
                    if !self.seen_pages.insert(page.page_id) {
                        tracing::debug!(
                            title = %target.title,
                            canonical = %page.title,
                            "target resolves to a page already processed"
                        );
                        continue;
                    }
                    self.seen.insert(title_key(&page.title));
                    update_page(session.api(), page, transform, self.options)
                }
                Err(error) => PageOutcome::Failed(error.into()),
            };
            log_outcome(&target.title, &outcome);
            self.pages.push(PageReport {
                title: target.title.clone(),
                outcome,
            });
            return self.pages.last();
        }
    }

    pub fn finish<A: WikiWriteApi>(self, session: &WikiSession<A>) -> RunReport {
        RunReport {
            dry_run: self.options.dry_run,
            summary: self.options.summary.clone(),
            pages: self.pages,
            request_count: session.request_count(),
        }
    }
}

/// Runs `transform` over every target and returns the per-page outcomes.
pub fn run<A, F>(
    session: &mut WikiSession<A>,
    targets: &[PageTarget],
    mut transform: F,
    options: &RunOptions,
) -> RunReport
where
    A: WikiWriteApi,
    F: FnMut(&str) -> Result<String, TransformError>,
{
    tracing::info!(
        targets = targets.len(),
        dry_run = options.dry_run,
        summary = %options.summary,
        "starting bulk update"
    );
    let mut batch = BatchRun::new(targets, options);
    while batch.next_page(session, &mut transform).is_some() {}
    let report = batch.finish(session);
    tracing::info!(
        updated = report.updated(),
        unchanged = report.unchanged(),
        failed = report.failed(),
        "bulk update finished"
    );
    report
}

/// Opens a session, resolves the targets and runs the batch.
///
/// Everything that can fail before the first page is touched (credentials,
/// login, target listing) is returned as a [`SetupError`].
pub fn bulk_update<A, F>(
    api: A,
    credentials: Option<&Credentials>,
    query: &TargetQuery,
    transform: F,
    options: &RunOptions,
) -> Result<RunReport, SetupError>
where
    A: WikiWriteApi,
    F: FnMut(&str) -> Result<String, TransformError>,
{
    if !options.dry_run && credentials.is_none() {
        return Err(SetupError::MissingCredentials("WIKI_BOT_USER"));
    }

    let mut session = WikiSession::open(api, credentials)?;
    let targets = resolve_targets(session.api(), query)
        .map_err(|error| SetupError::Targets(format!("{error:#}")))?;
    let report = run(&mut session, &targets, transform, options);
    session.close();
    Ok(report)
}

fn update_page<A, F>(
    api: &mut A,
    page: RemotePage,
    transform: &mut F,
    options: &RunOptions,
) -> PageOutcome
where
    A: WikiWriteApi,
    F: FnMut(&str) -> Result<String, TransformError>,
{
    let new_content = match transform(&page.content) {
        Ok(content) => content,
        Err(error) => return PageOutcome::Failed(error.into()),
    };
    if new_content == page.content {
        return PageOutcome::Unchanged;
    }

    let diff = options
        .capture_diff
        .then(|| render_diff(&page.title, &page.content, &new_content));
    if options.dry_run {
        return PageOutcome::Updated {
            new_content,
            summary: options.summary.clone(),
            written: false,
            revision_id: None,
            diff,
        };
    }

    match save_page(api, &page, &new_content, &options.summary) {
        Ok(result) => {
            if result.no_change {
                tracing::debug!(title = %page.title, "wiki already had the new content");
            }
            PageOutcome::Updated {
                new_content,
                summary: options.summary.clone(),
                written: true,
                revision_id: result.new_revision_id,
                diff,
            }
        }
        Err(error) => PageOutcome::Failed(error.into()),
    }
}

fn fetch_page<A: WikiWriteApi>(api: &mut A, title: &str) -> Result<RemotePage, FetchError> {
    match api.get_page_content(title) {
        Ok(Some(page)) => Ok(page),
        Ok(None) => Err(FetchError::NotFound {
            title: title.to_string(),
        }),
        Err(error) => Err(FetchError::Client {
            title: title.to_string(),
            reason: format!("{error:#}"),
        }),
    }
}

fn save_page<A: WikiWriteApi>(
    api: &mut A,
    page: &RemotePage,
    content: &str,
    summary: &str,
) -> Result<crate::client::EditResult, SaveError> {
    api.edit_page(&page.title, content, summary, Some(&page.timestamp))
        .map_err(|error| SaveError {
            title: page.title.clone(),
            reason: format!("{error:#}"),
        })
}

fn log_outcome(title: &str, outcome: &PageOutcome) {
    match outcome {
        PageOutcome::Failed(failure) => tracing::warn!(
            title,
            kind = failure.kind.as_str(),
            reason = %failure.reason,
            "page failed"
        ),
        other => tracing::info!(title, outcome = other.label(), "page processed"),
    }
}

/// MediaWiki treats `_` and space alike, ignores the case of a namespace
/// prefix and of the first letter after it.
fn title_key(title: &str) -> String {
    let normalized = normalize_title(title);
    let namespace = namespace_of_title(&normalized);
    match normalized.split_once(':') {
        Some((_, rest)) if namespace != NS_MAIN => {
            format!("{namespace}:{}", upper_first(rest.trim()))
        }
        _ => upper_first(&normalized),
    }
}

fn upper_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
