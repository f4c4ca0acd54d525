use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use html_escape::decode_html_entities;
use serde::Serialize;

use crate::client::{ListedPage, NS_MAIN, WikiReadApi};

/// A page title selected for possible update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageTarget {
    pub title: String,
    pub namespace: i32,
}

impl PageTarget {
    pub fn new(title: &str) -> Self {
        let title = normalize_title(title);
        let namespace = namespace_of_title(&title);
        Self { title, namespace }
    }

    fn from_listed(page: ListedPage) -> Self {
        Self {
            title: normalize_title(&page.title),
            namespace: page.namespace,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TargetSource {
    Titles(Vec<String>),
    File(TitleFile),
    Category(String),
    /// Every page transcluding the template.
    Template(String),
    Namespace(i32),
}

/// A local list of titles: one per line, or one column of a comma-separated file.
#[derive(Debug, Clone)]
pub struct TitleFile {
    pub path: PathBuf,
    /// Zero-based column; `None` reads whole lines.
    pub column: Option<usize>,
    pub skip_header: bool,
}

#[derive(Debug, Clone)]
pub struct TargetQuery {
    pub source: TargetSource,
    /// Keep only these namespaces; empty keeps everything.
    pub namespaces: Vec<i32>,
    pub limit: Option<usize>,
}

impl TargetQuery {
    pub fn describe(&self) -> String {
        match &self.source {
            TargetSource::Titles(titles) => format!("titles ({})", titles.len()),
            TargetSource::File(file) => format!("file {}", file.path.display()),
            TargetSource::Category(category) => format!("category {category}"),
            TargetSource::Template(template) => format!("transclusions of {template}"),
            TargetSource::Namespace(namespace) => format!("namespace {namespace}"),
        }
    }
}

/// Resolves the query into an ordered target list. Source order is kept;
/// duplicates are left for the driver to collapse.
pub fn resolve_targets<A: WikiReadApi>(api: &mut A, query: &TargetQuery) -> Result<Vec<PageTarget>> {
    let candidates: Vec<PageTarget> = match &query.source {
        TargetSource::Titles(titles) => titles.iter().map(|title| PageTarget::new(title)).collect(),
        TargetSource::File(file) => load_titles_from_file(file)?
            .iter()
            .map(|title| PageTarget::new(title))
            .collect(),
        TargetSource::Category(category) => listed_targets(
            api.list_category_members(category)
                .with_context(|| format!("failed to list category {category}"))?,
        ),
        TargetSource::Template(template) => listed_targets(
            api.list_transclusions(template)
                .with_context(|| format!("failed to list transclusions of {template}"))?,
        ),
        TargetSource::Namespace(namespace) => listed_targets(
            api.list_all_pages(*namespace)
                .with_context(|| format!("failed to list namespace {namespace}"))?,
        ),
    };

    let allowed = query.namespaces.iter().copied().collect::<BTreeSet<_>>();
    let mut targets = Vec::new();
    for target in candidates {
        if target.title.is_empty() {
            continue;
        }
        if !allowed.is_empty() && !allowed.contains(&target.namespace) {
            tracing::debug!(title = %target.title, namespace = target.namespace, "outside namespace filter");
            continue;
        }
        if query.limit.is_some_and(|limit| targets.len() >= limit) {
            break;
        }
        targets.push(target);
    }

    tracing::info!(source = %query.describe(), count = targets.len(), "resolved targets");
    Ok(targets)
}

fn listed_targets(pages: Vec<ListedPage>) -> Vec<PageTarget> {
    pages.into_iter().map(PageTarget::from_listed).collect()
}

pub fn load_titles_from_file(file: &TitleFile) -> Result<Vec<String>> {
    let raw_titles = match file.column {
        None => read_title_lines(file)?,
        Some(column) => read_title_column(file, column)?,
    };
    Ok(raw_titles
        .iter()
        .map(|raw| decode_html_entities(raw.trim()).trim().to_string())
        .filter(|title| !title.is_empty())
        .collect())
}

fn read_title_lines(file: &TitleFile) -> Result<Vec<String>> {
    let content = fs::read_to_string(&file.path)
        .with_context(|| format!("failed to read {}", file.path.display()))?;
    Ok(content
        .lines()
        .skip(usize::from(file.skip_header))
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(ToString::to_string)
        .collect())
}

/// Quoted fields may span lines; `#` lines are comments.
fn read_title_column(file: &TitleFile, column: usize) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(file.skip_header)
        .flexible(true)
        .comment(Some(b'#'))
        .from_path(&file.path)
        .with_context(|| format!("failed to read {}", file.path.display()))?;

    let mut titles = Vec::new();
    for record in reader.records() {
        let record =
            record.with_context(|| format!("failed to parse {}", file.path.display()))?;
        match record.get(column) {
            Some(field) => titles.push(field.to_string()),
            None => bail!(
                "{}:{}: row has no column {column}",
                file.path.display(),
                record.position().map_or(0, |position| position.line())
            ),
        }
    }
    Ok(titles)
}

pub fn normalize_title(value: &str) -> String {
    value.replace('_', " ").trim().to_string()
}

/// Namespace id from a canonical title prefix; unknown prefixes are main namespace.
pub fn namespace_of_title(title: &str) -> i32 {
    let Some((prefix, _)) = title.split_once(':') else {
        return NS_MAIN;
    };
    match prefix.trim().to_ascii_lowercase().as_str() {
        "talk" => 1,
        "user" => 2,
        "user talk" => 3,
        "project" => 4,
        "project talk" => 5,
        "file" | "image" => 6,
        "file talk" | "image talk" => 7,
        "mediawiki" => 8,
        "mediawiki talk" => 9,
        "template" => 10,
        "template talk" => 11,
        "help" => 12,
        "help talk" => 13,
        "category" => 14,
        "category talk" => 15,
        "module" => 828,
        "module talk" => 829,
        _ => NS_MAIN,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{
        PageTarget, TargetQuery, TargetSource, TitleFile, load_titles_from_file,
        namespace_of_title, resolve_targets,
    };
    use crate::client::{ListedPage, NS_MAIN, NS_TEMPLATE, WikiReadApi};
    use crate::mock::MockApi;

    fn query(source: TargetSource) -> TargetQuery {
        TargetQuery {
            source,
            namespaces: Vec::new(),
            limit: None,
        }
    }

    #[test]
    fn explicit_titles_keep_order_and_normalize() {
        let mut api = MockApi::default();
        let targets = resolve_targets(
            &mut api,
            &query(TargetSource::Titles(vec![
                "Ship_B".to_string(),
                " Ship A ".to_string(),
                "Template:Ship infobox".to_string(),
            ])),
        )
        .expect("resolve");

        let titles = targets.iter().map(|t| t.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, vec!["Ship B", "Ship A", "Template:Ship infobox"]);
        assert_eq!(targets[2].namespace, NS_TEMPLATE);
        assert_eq!(api.request_count(), 0);
    }

    #[test]
    fn template_transclusions_are_filtered_by_namespace_and_limit() {
        let mut api = MockApi::default();
        api.transclusions = vec![
            ListedPage {
                title: "Ship A".to_string(),
                namespace: NS_MAIN,
            },
            ListedPage {
                title: "User:Someone/Sandbox".to_string(),
                namespace: 2,
            },
            ListedPage {
                title: "Ship B".to_string(),
                namespace: NS_MAIN,
            },
            ListedPage {
                title: "Ship C".to_string(),
                namespace: NS_MAIN,
            },
        ];

        let targets = resolve_targets(
            &mut api,
            &TargetQuery {
                source: TargetSource::Template("Ship infobox".to_string()),
                namespaces: vec![NS_MAIN],
                limit: Some(2),
            },
        )
        .expect("resolve");

        assert_eq!(
            targets,
            vec![PageTarget::new("Ship A"), PageTarget::new("Ship B")]
        );
        assert_eq!(api.listed_templates, vec!["Ship infobox".to_string()]);
    }

    #[test]
    fn listing_failure_is_an_error() {
        let mut api = MockApi {
            fail_listing: true,
            ..MockApi::default()
        };
        let error = resolve_targets(&mut api, &query(TargetSource::Category("Ships".to_string())))
            .expect_err("listing fails");
        assert!(error.to_string().contains("category Ships"));
    }

    #[test]
    fn title_file_lines_skip_blanks_and_comments() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("titles.txt");
        fs::write(&path, "# ships\nShip A\n\n  Ship, The  \r\nR&amp;D Lab\n").expect("write");

        let titles = load_titles_from_file(&TitleFile {
            path,
            column: None,
            skip_header: false,
        })
        .expect("load");
        assert_eq!(titles, vec!["Ship A", "Ship, The", "R&D Lab"]);
    }

    #[test]
    fn title_file_column_with_header() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("input.csv");
        fs::write(
            &path,
            "page,efficiency\n\"Ship, The\",12\n Ship B ,40\n",
        )
        .expect("write");

        let titles = load_titles_from_file(&TitleFile {
            path: path.clone(),
            column: Some(0),
            skip_header: true,
        })
        .expect("load");
        assert_eq!(titles, vec!["Ship, The", "Ship B"]);

        let error = load_titles_from_file(&TitleFile {
            path,
            column: Some(5),
            skip_header: true,
        })
        .expect_err("missing column");
        assert!(error.to_string().contains("row has no column 5"));
    }

    #[test]
    fn quoted_column_may_span_lines() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("input.csv");
        fs::write(
            &path,
            "page,notes\nShip A,\"refit\nin 1936\"\n# retired\nShip B,\"\"\"quoted\"\"\"\n",
        )
        .expect("write");

        let titles = load_titles_from_file(&TitleFile {
            path,
            column: Some(0),
            skip_header: true,
        })
        .expect("load");
        assert_eq!(titles, vec!["Ship A", "Ship B"]);
    }

    #[test]
    fn html_entities_are_unescaped() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("titles.txt");
        fs::write(
            &path,
            "Caf&eacute; Royal\nA&ndash;B\nA &amp; B &#39;C&#x27;\nFish & Chips\n",
        )
        .expect("write");

        let titles = load_titles_from_file(&TitleFile {
            path,
            column: None,
            skip_header: false,
        })
        .expect("load");
        assert_eq!(
            titles,
            vec!["Café Royal", "A\u{2013}B", "A & B 'C'", "Fish & Chips"]
        );
    }

    #[test]
    fn namespace_prefixes() {
        assert_eq!(namespace_of_title("Ship A"), NS_MAIN);
        assert_eq!(namespace_of_title("user talk:Bot"), 3);
        assert_eq!(namespace_of_title("Module:Ships/data"), 828);
        assert_eq!(namespace_of_title("Mk. II: Reloaded"), NS_MAIN);
    }
}
