use anyhow::Context;
use std::path::PathBuf;
use tracing::{info, warn};

use listing_scout::core::config::load_scout_config;
use listing_scout::pipeline::location::resolve_records;
use listing_scout::pipeline::normalize::renormalize;
use listing_scout::pipeline::sink::enriched_path;
use listing_scout::pipeline::{
    read_records, write_records, CsvSink, OllamaLocationService, Pipeline, PipelineOutcome,
};
use listing_scout::ChromeSession;

#[derive(Debug, Default)]
struct CliArgs {
    max_pages: Option<usize>,
    output: Option<PathBuf>,
    with_locations: bool,
    resolve_locations: Option<PathBuf>,
}

fn flag_value(args: &mut impl Iterator<Item = String>, arg: &str, name: &str) -> Option<String> {
    if arg == name {
        return args.next();
    }
    arg.strip_prefix(name)
        .and_then(|rest| rest.strip_prefix('='))
        .map(str::to_string)
}

fn parse_args(args: impl IntoIterator<Item = String>) -> CliArgs {
    let mut cli = CliArgs::default();
    let mut args = args.into_iter().skip(1);
    while let Some(a) = args.next() {
        if a == "--with-locations" {
            cli.with_locations = true;
        } else if let Some(v) = flag_value(&mut args, &a, "--max-pages") {
            match v.parse::<usize>() {
                Ok(n) => cli.max_pages = Some(n),
                Err(_) => warn!("Ignoring invalid --max-pages value `{}`", v),
            }
        } else if let Some(v) = flag_value(&mut args, &a, "--output") {
            cli.output = Some(PathBuf::from(v));
        } else if let Some(v) = flag_value(&mut args, &a, "--resolve-locations") {
            cli.resolve_locations = Some(PathBuf::from(v));
        } else {
            warn!("Ignoring unknown argument `{}`", a);
        }
    }
    cli
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,chromiumoxide=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = parse_args(std::env::args());
    let config = load_scout_config();
    let crawl = config.crawl_options();
    let mut location = config.location_options();
    if cli.with_locations {
        location.enabled = true;
    }

    // Re-enrichment of an existing export; no browser needed.
    if let Some(input) = &cli.resolve_locations {
        let mut records: Vec<_> = read_records(input)?.iter().map(renormalize).collect();
        let service = OllamaLocationService::new(&location)?;
        resolve_records(&mut records, &service, &location.placeholder_addresses).await;
        let output = cli.output.clone().unwrap_or_else(|| enriched_path(input));
        write_records(&output, &records)?;
        info!("Location enrichment saved to {}", output.display());
        return Ok(());
    }

    let max_pages = cli.max_pages.unwrap_or(crawl.max_pages).max(1);
    let mut pipeline = Pipeline::new(crawl.clone(), location.clone());
    if location.enabled {
        info!("Location inference enabled ({} at {})", location.model, location.base_url);
        pipeline = pipeline.with_locator(Box::new(OllamaLocationService::new(&location)?));
    }

    info!("Starting web-scraping pipeline");
    let mut session = ChromeSession::launch(&crawl)
        .await
        .context("failed to start browser session")?;

    let records = match pipeline.run_scoped(&mut session, max_pages).await? {
        PipelineOutcome::Empty => {
            warn!("No listings were collected; no file written");
            return Ok(());
        }
        PipelineOutcome::Completed(records) => records,
    };

    let sink = match cli.output {
        Some(path) => CsvSink::at(path),
        None => CsvSink::in_dir(&config.output_dir(), chrono::Local::now()),
    };
    let path = sink.write(&records)?;
    info!("Pipeline complete! Data saved to {}", path.display());
    Ok(())
}
