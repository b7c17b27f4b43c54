use listing_scout::core::config::load_scout_config;
use listing_scout::pipeline::GridCrawler;
use listing_scout::{BrowserSession, ChromeSession};

/// Runs only the grid stage and prints what each card yielded.
/// Useful after a site redesign to check selectors and labels.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let pages = match std::env::args().nth(1) {
        Some(v) => match v.parse::<usize>() {
            Ok(n) => n,
            Err(_) => {
                eprintln!("Usage: grid-probe [PAGES]");
                eprintln!("\nEnv:");
                eprintln!("  LISTING_SCOUT_GRID_URL=... (optional, grid entry point)");
                eprintln!("  CHROME_EXECUTABLE=... (optional, browser override)");
                std::process::exit(2);
            }
        },
        None => 1,
    };

    let crawl = load_scout_config().crawl_options();
    let mut session = ChromeSession::launch(&crawl).await?;
    let result = GridCrawler::new(&mut session, &crawl).collect(pages).await;
    session.close().await.ok();

    let summaries = result?;
    for (i, s) in summaries.iter().enumerate() {
        println!(
            "{:>3}. {}\n     price={} condo={} area={}\n     {}",
            i + 1,
            s.title,
            s.price,
            s.condo_fee,
            s.floor_area,
            s.detail_url.as_deref().unwrap_or("<no link>")
        );
    }
    println!("\n{} listings across up to {} page(s)", summaries.len(), pages);
    Ok(())
}
