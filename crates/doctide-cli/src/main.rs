//! doctide - normalizes a documentation source (website, sitemap, Git
//! repository, wiki, `llms.txt` manifest, or generated-API-docs host) into
//! a local directory of Markdown documents plus structured metadata.

mod config;
mod error;

use anyhow::Result;
use clap::Parser;
use doctide_strategies::{build_dispatcher, Container};
use doctide_types::Options;
use error::ExitCode;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::path::PathBuf;
use std::sync::atomic::Ordering::SeqCst;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "doctide")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Harvests documentation from a URL into normalized Markdown", long_about = None)]
struct Cli {
    /// The source to harvest: a web page, sitemap, Git repository, wiki, or
    /// `llms.txt` manifest, or a generated-API-docs page.
    url: String,

    /// Directory documents are written under.
    #[arg(long, default_value = "./docs")]
    output: PathBuf,

    /// Maximum number of pages fetched concurrently.
    #[arg(long, default_value_t = 5)]
    concurrency: usize,

    /// Maximum number of documents to write. `0` means unbounded.
    #[arg(long, default_value_t = 0)]
    limit: usize,

    /// Maximum crawl depth from the start URL.
    #[arg(long, default_value_t = 3)]
    max_depth: usize,

    /// Exclude URLs matching this regex. May be repeated.
    #[arg(long)]
    exclude: Vec<String>,

    /// Restrict discovered links to this path prefix (or, for `llms.txt`, a
    /// path substring or full base URL).
    #[arg(long)]
    filter_url: Option<String>,

    /// Re-fetch and overwrite documents that already exist on disk.
    #[arg(long)]
    force: bool,

    /// Run the pipeline without writing anything to disk.
    #[arg(long)]
    dry_run: bool,

    /// Force every page through the headless-render fallback, not only
    /// pages that look like an unexecuted SPA shell.
    #[arg(long)]
    render_js: bool,

    /// Split generated-API-docs output by module rather than one page per
    /// crate.
    #[arg(long)]
    split: bool,

    /// Write every document flat, ignoring section/path-derived subdirectories.
    #[arg(long)]
    no_folders: bool,

    /// Write a sidecar `metadata.json` next to every document.
    #[arg(long)]
    json_metadata: bool,

    /// Incremental sync: prune files from a previous run whose URL no
    /// longer appears in this one.
    #[arg(long)]
    sync: bool,

    /// Like `--sync`, but discards the previous snapshot entirely before
    /// this run rather than diffing against it.
    #[arg(long)]
    full_sync: bool,

    /// Verbose logging.
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    fn into_options(self) -> Result<(Options, String)> {
        let exclude = self
            .exclude
            .iter()
            .map(|pattern| Regex::new(pattern).map_err(|e| anyhow::anyhow!("invalid --exclude regex {pattern:?}: {e}")))
            .collect::<Result<Vec<_>>>()?;

        let options = Options {
            output: config::output_directory(Some(self.output)),
            concurrency: self.concurrency,
            limit: self.limit,
            max_depth: self.max_depth,
            exclude,
            filter_url: self.filter_url,
            force: self.force,
            dry_run: self.dry_run,
            render_js: self.render_js,
            split: self.split,
            no_folders: self.no_folders,
            sync: self.sync,
            full_sync: self.full_sync,
            json_metadata: self.json_metadata,
            verbose: self.verbose,
        };
        Ok((options, self.url))
    }
}

#[tokio::main]
async fn main() {
    std::process::exit(match run().await {
        Ok(()) => ExitCode::Success.as_i32(),
        Err(e) => {
            error!(error = %e, "doctide run failed");
            ExitCode::FatalError.as_i32()
        }
    });
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_logging(verbose);

    let (options, url) = cli.into_options()?;
    let parsed_url = url::Url::parse(&url).map_err(|e| anyhow::anyhow!("invalid URL {url:?}: {e}"))?;

    let container = Container::construct(options, &config::user_agent())?;
    let dispatcher = build_dispatcher();

    let cancel = container.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt, canceling run");
            cancel.cancel();
        }
    });

    let progress = spawn_progress_ticker(&container, verbose);
    let outcome = dispatcher.dispatch(&container, &parsed_url).await;
    finish_progress(progress, &container, outcome.is_ok());
    outcome?;

    let pruned = container.prune_deleted();
    if !pruned.is_empty() {
        info!(count = pruned.len(), "pruned documents absent from this run's previous sync snapshot");
    }
    container.flush_metadata()?;
    container.save_state()?;

    info!(
        written = container.processed_count.load(std::sync::atomic::Ordering::SeqCst),
        "run complete"
    );
    Ok(())
}

/// Spinner driven off `container.processed_count`, disabled under
/// `--verbose` so it doesn't interleave with log lines on the same stream.
fn spawn_progress_ticker(container: &Container, verbose: bool) -> Option<ProgressBar> {
    if verbose {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let counter = container.processed_count.clone();
    let ticking = bar.clone();
    tokio::spawn(async move {
        loop {
            if ticking.is_finished() {
                break;
            }
            ticking.set_message(format!("{} documents written", counter.load(SeqCst)));
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    });
    Some(bar)
}

fn finish_progress(bar: Option<ProgressBar>, container: &Container, success: bool) {
    let Some(bar) = bar else { return };
    let written = container.processed_count.load(SeqCst);
    if success {
        bar.finish_with_message(format!("{written} documents written"));
    } else {
        bar.abandon_with_message(format!("run failed after {written} documents"));
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_new(config::log_filter(verbose)).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_spec() {
        let cli = Cli::parse_from(["doctide", "https://example.com"]);
        assert_eq!(cli.output, PathBuf::from("./docs"));
        assert_eq!(cli.concurrency, 5);
        assert_eq!(cli.limit, 0);
        assert_eq!(cli.max_depth, 3);
        assert!(!cli.force);
        assert!(!cli.dry_run);
        assert!(!cli.sync);
        assert!(!cli.full_sync);
    }

    #[test]
    fn exclude_is_repeatable_and_compiles_to_regexes() {
        let cli = Cli::parse_from(["doctide", "https://example.com", "--exclude", "/blog", "--exclude", "/tag"]);
        let (options, _) = cli.into_options().unwrap();
        assert_eq!(options.exclude.len(), 2);
        assert!(options.is_excluded("https://x/blog/a"));
        assert!(options.is_excluded("https://x/tag/a"));
        assert!(!options.is_excluded("https://x/docs/a"));
    }

    #[test]
    fn invalid_exclude_regex_is_a_clean_error() {
        let cli = Cli::parse_from(["doctide", "https://example.com", "--exclude", "("]);
        assert!(cli.into_options().is_err());
    }
}
