use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wikiedit_core::client::{MediaWikiClient, MediaWikiClientConfig};
use wikiedit_core::config::{WikiConfig, load_config, resolve_config_path};
use wikiedit_core::driver::{PageOutcome, RunOptions, RunReport, bulk_update};
use wikiedit_core::error::SetupError;
use wikiedit_core::report::{report_json, summary_lines, write_json_report};
use wikiedit_core::session::Credentials;
use wikiedit_core::targets::{TargetQuery, TargetSource, TitleFile, resolve_targets};
use wikiedit_core::transform::{Pipeline, TransformStep};

#[derive(Debug, Parser)]
#[command(
    name = "wikiedit",
    version,
    about = "Scripted bulk edits for a MediaWiki wiki"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Config file (default: .wikiedit/config.toml)")]
    config: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Enable debug logging")]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Transform every target page and save the changes")]
    Run(RunArgs),
    #[command(about = "List the pages a run would visit")]
    Targets(TargetArgs),
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    #[arg(long = "title", value_name = "TITLE", help = "Explicit page title (repeatable)")]
    titles: Vec<String>,
    #[arg(long, value_name = "PATH", help = "File with one title per line")]
    titles_file: Option<PathBuf>,
    #[arg(long, value_name = "NAME", help = "Members of a category")]
    category: Option<String>,
    #[arg(long, value_name = "NAME", help = "Pages transcluding a template")]
    template: Option<String>,
    #[arg(long, value_name = "ID", help = "Every page in a namespace")]
    namespace: Option<i32>,
}

#[derive(Debug, Args)]
struct TargetArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long, value_name = "N", requires = "titles_file", help = "Read titles from this zero-based CSV column")]
    column: Option<usize>,
    #[arg(long, requires = "titles_file", help = "Ignore the first line of the titles file")]
    skip_header: bool,
    #[arg(long = "only-namespace", value_name = "ID", help = "Keep only pages in this namespace (repeatable)")]
    only_namespaces: Vec<i32>,
    #[arg(long, value_name = "N", help = "Process at most N pages")]
    limit: Option<usize>,
}

#[derive(Debug, Args)]
struct TransformArgs {
    #[arg(long = "skip-if", value_name = "REGEX", help = "Leave pages matching this pattern untouched")]
    skip_if: Vec<String>,
    #[arg(long, value_name = "REGEX", help = "Fail pages that do not match this pattern")]
    require: Vec<String>,
    #[arg(long, value_name = "TEXT", requires = "replace")]
    find: Option<String>,
    #[arg(long, value_name = "TEXT", requires = "find")]
    replace: Option<String>,
    #[arg(long, value_name = "REGEX", requires = "replacement")]
    regex: Option<String>,
    #[arg(long, value_name = "TEXT", requires = "regex")]
    replacement: Option<String>,
    #[arg(long, value_name = "N", requires = "regex")]
    max_replacements: Option<usize>,
    #[arg(long, value_name = "TEXT")]
    prepend: Option<String>,
    #[arg(long, value_name = "TEXT")]
    append: Option<String>,
}

impl TransformArgs {
    /// Command-line steps, applied after the configured ones in a fixed order.
    fn steps(&self) -> Vec<TransformStep> {
        let mut steps = Vec::new();
        for pattern in &self.skip_if {
            steps.push(TransformStep::SkipIf {
                pattern: pattern.clone(),
            });
        }
        for pattern in &self.require {
            steps.push(TransformStep::Require {
                pattern: pattern.clone(),
                message: None,
            });
        }
        if let (Some(find), Some(replace)) = (&self.find, &self.replace) {
            steps.push(TransformStep::Replace {
                find: find.clone(),
                replace: replace.clone(),
            });
        }
        if let (Some(pattern), Some(replacement)) = (&self.regex, &self.replacement) {
            steps.push(TransformStep::RegexReplace {
                pattern: pattern.clone(),
                replacement: replacement.clone(),
                limit: self.max_replacements,
            });
        }
        if let Some(text) = &self.prepend {
            steps.push(TransformStep::Prepend { text: text.clone() });
        }
        if let Some(text) = &self.append {
            steps.push(TransformStep::Append { text: text.clone() });
        }
        steps
    }
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    targets: TargetArgs,
    #[command(flatten)]
    transform: TransformArgs,
    #[arg(short, long, value_name = "TEXT", help = "Edit summary")]
    summary: Option<String>,
    #[arg(long, help = "Compute and report changes without saving")]
    dry_run: bool,
    #[arg(long, conflicts_with = "dry_run", help = "Save changes even if the config sets dry_run")]
    live: bool,
    #[arg(long, value_name = "MS", help = "Pause between pages")]
    delay_ms: Option<u64>,
    #[arg(long, help = "Print a unified diff for every changed page")]
    show_diff: bool,
    #[arg(long, value_name = "PATH", help = "Write a JSON run report")]
    report: Option<PathBuf>,
    #[arg(long, help = "Print the run report as JSON instead of text")]
    json: bool,
}

impl RunArgs {
    fn is_dry_run(&self, config: &WikiConfig) -> bool {
        !self.live && (self.dry_run || config.run.dry_run.unwrap_or(false))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run(args)) => run_bulk_update(cli.config, args),
        Some(Commands::Targets(args)) => run_list_targets(cli.config, args),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "debug,reqwest=info"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_bulk_update(config_path: Option<PathBuf>, args: RunArgs) -> Result<()> {
    let config = load_runtime_config(config_path)?;
    let query = target_query(&config, &args.targets);

    let mut steps = config.transform.clone();
    steps.extend(args.transform.steps());
    let pipeline = Pipeline::compile(&steps)?;
    if pipeline.is_empty() {
        bail!("no transform configured: pass transform flags or add [[transform]] to the config");
    }

    let dry_run = args.is_dry_run(&config);
    let summary = args
        .summary
        .clone()
        .or_else(|| config.run.summary.clone())
        .unwrap_or_default();
    let delay_ms = args.delay_ms.or(config.run.delay_ms).unwrap_or(0);
    let options = RunOptions::new(summary, dry_run)?
        .with_delay(Duration::from_millis(delay_ms))
        .with_diff(args.show_diff);

    let credentials = Credentials::from_env()?;
    let client = build_client(&config)?;

    println!("{}", if dry_run { "[[DRY RUN]]" } else { "[[LIVE RUN]]" });
    println!("summary: {}", options.summary);
    println!("targets: {}", query.describe());
    println!("transform_steps: {}", pipeline.len());

    let report = bulk_update(
        client,
        credentials.as_ref(),
        &query,
        |content: &str| pipeline.apply(content),
        &options,
    )?;

    if args.show_diff {
        print_diffs(&report);
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report)?)?);
    } else {
        for line in summary_lines(&report) {
            println!("{line}");
        }
    }
    if let Some(path) = args.report.or_else(|| config.run.report_path.clone()) {
        write_json_report(&report, &path)?;
        println!("report: {}", path.display());
    }

    Ok(())
}

fn run_list_targets(config_path: Option<PathBuf>, args: TargetArgs) -> Result<()> {
    let config = load_runtime_config(config_path)?;
    let query = target_query(&config, &args);
    let mut client = build_client(&config)?;

    let targets = resolve_targets(&mut client, &query)?;
    println!("targets: {}", query.describe());
    println!("targets.count: {}", targets.len());
    for target in &targets {
        println!("target: {} (ns {})", target.title, target.namespace);
    }
    Ok(())
}

fn load_runtime_config(explicit: Option<PathBuf>) -> Result<WikiConfig> {
    dotenvy::dotenv().ok();
    let cwd = env::current_dir().context("failed to read current directory")?;
    let path = resolve_config_path(explicit.as_deref(), &cwd);
    tracing::debug!(path = %path.display(), "loading config");
    load_config(&path)
}

fn build_client(config: &WikiConfig) -> Result<MediaWikiClient, SetupError> {
    MediaWikiClient::new(MediaWikiClientConfig::from_config(config))
        .map_err(|error| SetupError::Client(format!("{error:#}")))
}

fn target_query(config: &WikiConfig, args: &TargetArgs) -> TargetQuery {
    let source = &args.source;
    let source = if let Some(path) = &source.titles_file {
        TargetSource::File(TitleFile {
            path: path.clone(),
            column: args.column,
            skip_header: args.skip_header,
        })
    } else if let Some(category) = &source.category {
        TargetSource::Category(category.clone())
    } else if let Some(template) = &source.template {
        TargetSource::Template(template.clone())
    } else if let Some(namespace) = source.namespace {
        TargetSource::Namespace(namespace)
    } else {
        TargetSource::Titles(source.titles.clone())
    };

    let namespaces = if args.only_namespaces.is_empty() {
        config.run.namespaces.clone()
    } else {
        args.only_namespaces.clone()
    };

    TargetQuery {
        source,
        namespaces,
        limit: args.limit.or(config.run.limit),
    }
}

fn print_diffs(report: &RunReport) {
    for page in report.pages() {
        if let PageOutcome::Updated {
            diff: Some(diff), ..
        } = &page.outcome
        {
            println!("{diff}");
        }
    }
}
