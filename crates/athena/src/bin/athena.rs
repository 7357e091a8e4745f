// ABOUTME: CLI binary for the Athena content extractor.
// ABOUTME: Parses URLs or an HTML file and prints the extracted content or the full JSON result.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use digests_athena::{Client, ParseOptions, ParseResult};
use futures::stream::{self, StreamExt};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Fetches in flight at once in URL mode.
const CONCURRENCY: usize = 4;

#[derive(Parser, Debug)]
#[command(name = "athena")]
#[command(about = "Extract the main content and metadata from web pages")]
struct Args {
    /// URLs to parse (fetch mode)
    #[arg()]
    urls: Vec<String>,

    /// HTML file to parse instead of fetching
    #[arg(long = "html")]
    html: Option<PathBuf>,

    /// Source URL of the --html document
    #[arg(long = "url")]
    url: Option<String>,

    /// Output the full JSON result instead of the content
    #[arg(long = "json")]
    json_output: bool,

    /// Convert the content to Markdown
    #[arg(long = "markdown")]
    markdown: bool,

    /// Keep HTML content and add a Markdown rendering
    #[arg(long = "separate-markdown")]
    separate_markdown: bool,

    /// Record pipeline steps in the result
    #[arg(long = "debug")]
    debug: bool,

    /// Skip exact-selector clutter removal
    #[arg(long = "no-exact-selectors")]
    no_exact_selectors: bool,

    /// Skip partial-attribute clutter removal
    #[arg(long = "no-partial-selectors")]
    no_partial_selectors: bool,

    /// Strip images from the content
    #[arg(long = "remove-images")]
    remove_images: bool,

    /// JSON file of parse options (camelCase keys)
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Output file path (default: stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Print elapsed time in ms to stderr
    #[arg(long = "timing")]
    timing: bool,

    /// Allow fetching from private/local networks
    #[arg(long = "allow-private-networks")]
    allow_private_networks: bool,

    /// Fetch-and-parse timeout in seconds
    #[arg(long = "timeout", default_value_t = 30)]
    timeout: u64,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("ATHENA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(path: &Path) -> anyhow::Result<ParseOptions> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Config file first, then flags; a flag only speaks when it is given.
fn parse_options(args: &Args) -> anyhow::Result<ParseOptions> {
    let base = match &args.config {
        Some(path) => load_config(path)?,
        None => ParseOptions::default(),
    };
    let flag = |set: bool, value: bool| set.then_some(value);
    let flags = ParseOptions {
        debug: flag(args.debug, true),
        markdown: flag(args.markdown, true),
        separate_markdown: flag(args.separate_markdown, true),
        remove_exact_selectors: flag(args.no_exact_selectors, false),
        remove_partial_selectors: flag(args.no_partial_selectors, false),
        remove_images: flag(args.remove_images, true),
        ..Default::default()
    };
    Ok(base.merge(&flags))
}

fn format_output(results: &[ParseResult], json_output: bool) -> anyhow::Result<String> {
    if json_output {
        let out = match results {
            [one] => serde_json::to_string_pretty(one)?,
            many => serde_json::to_string_pretty(many)?,
        };
        return Ok(out);
    }
    Ok(results
        .iter()
        .map(|r| r.content_markdown.as_deref().unwrap_or(&r.content))
        .collect::<Vec<_>>()
        .join("\n\n"))
}

async fn run(args: &Args) -> anyhow::Result<(Vec<ParseResult>, bool)> {
    if args.html.is_some() && !args.urls.is_empty() {
        anyhow::bail!("cannot use both --html and positional URLs");
    }
    if args.html.is_none() && args.urls.is_empty() {
        anyhow::bail!("at least one URL is required, or use --html");
    }
    if args.url.is_some() && args.html.is_none() {
        anyhow::bail!("--url only applies to --html");
    }

    let opts = parse_options(args)?;
    let client = Client::builder()
        .allow_private_networks(args.allow_private_networks)
        .timeout(Duration::from_secs(args.timeout))
        .parse_options(opts)
        .build();

    if let Some(path) = &args.html {
        let html = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let doc = digests_athena::Document::from_bytes(&html, None, args.url.as_deref())?;
        return Ok((vec![client.parse_document(&doc, &ParseOptions::default())], false));
    }

    debug!(count = args.urls.len(), "fetching");
    let outcomes: Vec<_> = stream::iter(args.urls.iter())
        .map(|url| {
            let client = &client;
            async move { (url, client.parse(url).await) }
        })
        .buffered(CONCURRENCY)
        .collect()
        .await;

    let mut results = Vec::with_capacity(outcomes.len());
    let mut had_error = false;
    for (url, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                eprintln!("error parsing {}: {}", url, e);
                had_error = true;
            }
        }
    }
    Ok((results, had_error))
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();
    let start = Instant::now();

    let (results, mut had_error) = match run(&args).await {
        Ok(done) => done,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::from(1);
        }
    };

    if !results.is_empty() {
        match format_output(&results, args.json_output) {
            Ok(output) => match &args.output {
                Some(path) => {
                    if let Err(e) = fs::write(path, &output) {
                        eprintln!("error writing to {}: {}", path.display(), e);
                        had_error = true;
                    }
                }
                None => println!("{}", output),
            },
            Err(e) => {
                eprintln!("error serializing results: {}", e);
                had_error = true;
            }
        }
    }

    if args.timing {
        let _ = writeln!(io::stderr(), "elapsed: {}ms", start.elapsed().as_millis());
    }

    if had_error {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
