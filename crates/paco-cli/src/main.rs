//! paco command line: fetch a page, or run a test's fetch declarations.

mod args;
mod report;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use paco::{Config, Device, Method, Page, PageLoader, PageRegistry, Protocol, StaticResolver, TestIdentity};

use crate::args::{parse_pair, FetchOptions};
use crate::report::PageReport;

/// Identity used for pages fetched straight from the command line.
const CLI_TEST_METHOD: &str = "fetch";
const CLI_TEST_CLASS: &str = "paco.cli";

#[derive(Parser)]
#[command(
    name = "paco",
    about = "Page content tester: fetch pages the way a test declares them",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Print a JSON summary instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one URL and summarize the response.
    Fetch {
        /// URL, with or without scheme (e.g. "wikipedia.org/wiki/Rust").
        url: String,

        /// Device profile (desktop, mobile).
        #[arg(long)]
        device: Option<Device>,

        /// Scheme used when the URL has none (http, https).
        #[arg(long)]
        protocol: Option<Protocol>,

        /// Host prefix, e.g. "en" for en.wikipedia.org.
        #[arg(long)]
        prefix: Option<String>,

        /// Separator between prefix and host.
        #[arg(long)]
        separator: Option<String>,

        /// Port appended to the host.
        #[arg(long)]
        port: Option<String>,

        /// HTTP method.
        #[arg(long)]
        method: Option<Method>,

        /// Request body.
        #[arg(long)]
        body: Option<String>,

        /// Request header as NAME=VALUE. Repeatable.
        #[arg(long = "header", value_parser = parse_pair)]
        headers: Vec<(String, String)>,

        /// Request cookie as NAME=VALUE. Repeatable.
        #[arg(long = "cookie", value_parser = parse_pair)]
        cookies: Vec<(String, String)>,

        /// Return 3xx responses instead of following them.
        #[arg(long)]
        no_redirects: bool,

        /// Per-attempt timeout in milliseconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Retries after a timed-out attempt.
        #[arg(long)]
        retries: Option<u32>,

        /// Explicit User-Agent, overriding the device profile.
        #[arg(long)]
        user_agent: Option<String>,

        /// CSS selector to count and print. Repeatable.
        #[arg(long = "select")]
        selectors: Vec<String>,

        /// Store the body under the output directory, optionally in FOLDER.
        #[arg(long, value_name = "FOLDER")]
        store: Option<Option<String>>,
    },

    /// Run the fetch declarations of one test from a JSON file.
    ///
    /// Example:
    ///   paco run declarations.json --test "fetch_as_mobile(shop.HomePageTest)"
    Run {
        /// JSON declarations keyed by test class.
        declarations: PathBuf,

        /// Test as method(fully.qualified.Class).
        #[arg(long)]
        test: TestIdentity,

        /// CSS selector to count on every page. Repeatable.
        #[arg(long = "select")]
        selectors: Vec<String>,

        /// Store every body under the output directory.
        #[arg(long)]
        store: bool,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   paco completions bash > ~/.local/share/bash-completion/completions/paco
    ///   paco completions zsh > ~/.zfunc/_paco
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Fetch {
            url,
            device,
            protocol,
            prefix,
            separator,
            port,
            method,
            body,
            headers,
            cookies,
            no_redirects,
            timeout,
            retries,
            user_agent,
            selectors,
            store,
        } => {
            let options = FetchOptions {
                url,
                device,
                protocol,
                prefix,
                separator,
                port,
                method,
                body,
                headers,
                cookies,
                no_redirects,
                timeout_ms: timeout,
                retries,
                user_agent,
            };
            let loader = PageLoader::new(load_config());
            let test = TestIdentity::new(CLI_TEST_METHOD, CLI_TEST_CLASS);
            let registry = loader
                .load_declarations(&[options.into_declaration()], &test)
                .await?;
            let page = registry.single()?;

            let report = PageReport::from_page(page, &selectors)?;
            let report = match store {
                Some(folder) => report.with_stored(store_page(page, folder.as_deref())?),
                None => report,
            };
            print_reports(&[report], cli.json)?;
        }

        Commands::Run {
            declarations,
            test,
            selectors,
            store,
        } => {
            let json = std::fs::read_to_string(&declarations)
                .with_context(|| format!("reading {}", declarations.display()))?;
            let resolver = StaticResolver::from_json(&json)
                .with_context(|| format!("parsing {}", declarations.display()))?;

            let loader = PageLoader::new(load_config());
            tracing::info!("Running declarations for {test}");
            let registry = loader.load(&resolver, &test).await?;
            if registry.is_empty() {
                anyhow::bail!("no fetch declarations apply to {test}");
            }
            let reports = reports_for(&registry, &selectors, store)?;
            print_reports(&reports, cli.json)?;
        }

        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "paco", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn load_config() -> Arc<Config> {
    announce_config(Config::from_env())
}

fn announce_config(config: Config) -> Arc<Config> {
    tracing::info!(
        "Config: {}ms timeout, {} retries on timeout, {} by default",
        config.timeout_ms,
        config.retries_on_timeout,
        config.protocol.scheme()
    );
    tracing::info!("Output dir: {}", config.output_dir.display());
    Arc::new(config)
}

fn store_page(page: &Page, folder: Option<&str>) -> anyhow::Result<PathBuf> {
    let path = match folder {
        Some(folder) => page.store(folder)?,
        None => page.store_page_body()?,
    };
    Ok(path)
}

fn reports_for(
    registry: &PageRegistry,
    selectors: &[String],
    store: bool,
) -> anyhow::Result<Vec<PageReport>> {
    let mut reports = Vec::with_capacity(registry.len());
    for (index, page) in registry.iter().enumerate() {
        let mut report = PageReport::from_page(page, selectors)?;
        if store {
            // Pages of one test share a file stem, so keep each under its index.
            report = report.with_stored(page.store(&format!("stored/{index}"))?);
        }
        reports.push(report);
    }
    Ok(reports)
}

fn print_reports(reports: &[PageReport], json: bool) -> anyhow::Result<()> {
    if json {
        let values: Vec<_> = reports.iter().map(PageReport::to_json).collect();
        let out = if values.len() == 1 {
            serde_json::to_string_pretty(&values[0])?
        } else {
            serde_json::to_string_pretty(&values)?
        };
        println!("{out}");
    } else {
        for report in reports {
            print!("{}", report.render_text());
        }
    }
    Ok(())
}
