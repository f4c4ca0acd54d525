//! In-memory wiki used by unit tests.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, bail};

use crate::client::{EditResult, ListedPage, NS_MAIN, RemotePage, WikiReadApi, WikiWriteApi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEdit {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub base_timestamp: Option<String>,
}

#[derive(Default)]
pub struct MockApi {
    pub pages: BTreeMap<String, RemotePage>,
    /// Requested title to canonical title, as the wiki normalizes them.
    pub aliases: BTreeMap<String, String>,
    /// Saves the wiki answers with `nochange`.
    pub unchanged_saves: BTreeSet<String>,
    pub fetch_errors: BTreeSet<String>,
    pub save_errors: BTreeMap<String, String>,
    pub login_error: Option<String>,
    pub all_pages: Vec<ListedPage>,
    pub category_members: Vec<ListedPage>,
    pub transclusions: Vec<ListedPage>,
    pub fail_listing: bool,
    pub listed_templates: Vec<String>,
    pub fetched: Vec<String>,
    pub edits: Vec<RecordedEdit>,
    pub logged_in_as: Option<String>,
    pub request_count: usize,
}

impl MockApi {
    pub fn with_pages(pages: &[(&str, &str)]) -> Self {
        let mut api = Self::default();
        for (index, (title, content)) in pages.iter().enumerate() {
            api.insert_page(title, content, index as i64 + 1);
        }
        api
    }

    pub fn insert_page(&mut self, title: &str, content: &str, page_id: i64) {
        self.pages.insert(
            title.to_string(),
            RemotePage {
                title: title.to_string(),
                namespace: NS_MAIN,
                page_id,
                revision_id: page_id * 100,
                timestamp: "2026-02-19T00:00:00Z".to_string(),
                content: content.to_string(),
            },
        );
    }
}

impl WikiReadApi for MockApi {
    fn list_all_pages(&mut self, namespace: i32) -> Result<Vec<ListedPage>> {
        self.request_count += 1;
        if self.fail_listing {
            bail!("listing unavailable");
        }
        Ok(self
            .all_pages
            .iter()
            .filter(|page| page.namespace == namespace)
            .cloned()
            .collect())
    }

    fn list_category_members(&mut self, _category: &str) -> Result<Vec<ListedPage>> {
        self.request_count += 1;
        if self.fail_listing {
            bail!("listing unavailable");
        }
        Ok(self.category_members.clone())
    }

    fn list_transclusions(&mut self, template: &str) -> Result<Vec<ListedPage>> {
        self.request_count += 1;
        if self.fail_listing {
            bail!("listing unavailable");
        }
        self.listed_templates.push(template.to_string());
        Ok(self.transclusions.clone())
    }

    fn get_page_content(&mut self, title: &str) -> Result<Option<RemotePage>> {
        self.request_count += 1;
        self.fetched.push(title.to_string());
        if self.fetch_errors.contains(title) {
            bail!("HTTP 503 while reading {title}");
        }
        let canonical = self.aliases.get(title).map(String::as_str).unwrap_or(title);
        Ok(self.pages.get(canonical).cloned())
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

impl WikiWriteApi for MockApi {
    fn login(&mut self, username: &str, _password: &str) -> Result<()> {
        self.request_count += 1;
        if let Some(error) = &self.login_error {
            bail!("{error}");
        }
        self.logged_in_as = Some(username.to_string());
        Ok(())
    }

    fn edit_page(
        &mut self,
        title: &str,
        content: &str,
        summary: &str,
        base_timestamp: Option<&str>,
    ) -> Result<EditResult> {
        self.request_count += 1;
        self.edits.push(RecordedEdit {
            title: title.to_string(),
            content: content.to_string(),
            summary: summary.to_string(),
            base_timestamp: base_timestamp.map(ToString::to_string),
        });
        if let Some(error) = self.save_errors.get(title) {
            bail!("MediaWiki API error [{error}]");
        }
        if self.unchanged_saves.contains(title) {
            return Ok(EditResult {
                new_revision_id: None,
                no_change: true,
            });
        }
        let page = self
            .pages
            .get_mut(title)
            .ok_or_else(|| anyhow::anyhow!("MediaWiki API error [missingtitle]"))?;
        page.content = content.to_string();
        page.revision_id += 1;
        Ok(EditResult {
            new_revision_id: Some(page.revision_id),
            no_change: false,
        })
    }
}
