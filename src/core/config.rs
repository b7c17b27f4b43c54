use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ScoutConfig: file-based config loader (listing-scout.json) with env-var fallback
// ---------------------------------------------------------------------------

pub const DEFAULT_GRID_URL: &str = "https://www.webindustrial.com.br/alugar/galpao";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_LOCATION_MODEL: &str = "llama3.1:8b";

pub const ENV_CONFIG_PATH: &str = "LISTING_SCOUT_CONFIG";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

/// Crawl sub-config (mirrors the `crawl` key in listing-scout.json).
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct CrawlSection {
    /// Listing grid entry point.
    pub grid_url: Option<String>,
    /// Upper bound on grid pages walked. Default: 8.
    pub max_pages: Option<usize>,
    /// How long to wait for the grid to render after navigation or a page click.
    pub grid_timeout_ms: Option<u64>,
    /// How long to wait for a detail page to render.
    pub detail_timeout_ms: Option<u64>,
    /// Readiness polling period.
    pub poll_interval_ms: Option<u64>,
    /// Run the browser without a window. Default: true.
    pub headless: Option<bool>,
    /// Fixed User-Agent header. Default: picked from a small desktop pool.
    pub user_agent: Option<String>,
}

/// Location-inference sub-config (mirrors the `location` key).
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct LocationSection {
    /// Resolve missing/placeholder addresses through the LLM. Default: false.
    pub enabled: Option<bool>,
    /// Ollama endpoint, e.g. `http://localhost:11434`.
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Headings the site renders where an address should be.
    pub placeholder_addresses: Option<Vec<String>>,
}

/// Top-level config loaded from `listing-scout.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ScoutConfig {
    #[serde(default)]
    pub crawl: CrawlSection,
    #[serde(default)]
    pub location: LocationSection,
    pub output_dir: Option<String>,
}

/// Resolved crawl settings handed to the crawler and enricher.
#[derive(Clone, Debug, PartialEq)]
pub struct CrawlOptions {
    pub grid_url: String,
    pub max_pages: usize,
    pub grid_timeout: Duration,
    pub detail_timeout: Duration,
    pub poll_interval: Duration,
    pub headless: bool,
    pub user_agent: Option<String>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            grid_url: DEFAULT_GRID_URL.to_string(),
            max_pages: 8,
            grid_timeout: Duration::from_millis(5000),
            detail_timeout: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(250),
            headless: true,
            user_agent: None,
        }
    }
}

/// Resolved location-service settings.
#[derive(Clone, Debug, PartialEq)]
pub struct LocationOptions {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub placeholder_addresses: Vec<String>,
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_LOCATION_MODEL.to_string(),
            timeout: Duration::from_secs(120),
            placeholder_addresses: vec!["Detalhes da Oferta".to_string()],
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    let v = env_string(key)?.to_ascii_lowercase();
    match v.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ScoutConfig {
    /// Crawl settings: JSON field → env var → default.
    pub fn crawl_options(&self) -> CrawlOptions {
        let d = CrawlOptions::default();
        let c = &self.crawl;
        CrawlOptions {
            grid_url: c
                .grid_url
                .clone()
                .filter(|u| !u.trim().is_empty())
                .or_else(|| env_string("LISTING_SCOUT_GRID_URL"))
                .unwrap_or(d.grid_url),
            max_pages: c
                .max_pages
                .or_else(|| env_parse("LISTING_SCOUT_MAX_PAGES"))
                .unwrap_or(d.max_pages)
                .max(1),
            grid_timeout: c
                .grid_timeout_ms
                .or_else(|| env_parse("LISTING_SCOUT_GRID_TIMEOUT_MS"))
                .map(Duration::from_millis)
                .unwrap_or(d.grid_timeout),
            detail_timeout: c
                .detail_timeout_ms
                .or_else(|| env_parse("LISTING_SCOUT_DETAIL_TIMEOUT_MS"))
                .map(Duration::from_millis)
                .unwrap_or(d.detail_timeout),
            poll_interval: c
                .poll_interval_ms
                .or_else(|| env_parse("LISTING_SCOUT_POLL_MS"))
                .map(Duration::from_millis)
                .unwrap_or(d.poll_interval),
            headless: c
                .headless
                .or_else(|| env_flag("LISTING_SCOUT_HEADLESS"))
                .unwrap_or(d.headless),
            user_agent: c
                .user_agent
                .clone()
                .filter(|ua| !ua.trim().is_empty())
                .or_else(|| env_string("LISTING_SCOUT_USER_AGENT"))
                .or(d.user_agent),
        }
    }

    /// Location settings: JSON field → env var → default.
    pub fn location_options(&self) -> LocationOptions {
        let d = LocationOptions::default();
        let l = &self.location;
        LocationOptions {
            enabled: l
                .enabled
                .or_else(|| env_flag("LISTING_SCOUT_LOCATION"))
                .unwrap_or(d.enabled),
            base_url: l
                .base_url
                .clone()
                .filter(|u| !u.trim().is_empty())
                .or_else(|| env_string("OLLAMA_BASE_URL"))
                .unwrap_or(d.base_url),
            model: l
                .model
                .clone()
                .filter(|m| !m.trim().is_empty())
                .or_else(|| env_string("LISTING_SCOUT_LOCATION_MODEL"))
                .unwrap_or(d.model),
            timeout: l
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(d.timeout),
            placeholder_addresses: l
                .placeholder_addresses
                .clone()
                .unwrap_or(d.placeholder_addresses),
        }
    }

    /// Output directory: JSON field → `LISTING_SCOUT_OUTPUT_DIR` → cwd.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| env_string("LISTING_SCOUT_OUTPUT_DIR"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Load `listing-scout.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `LISTING_SCOUT_CONFIG` env var path
/// 2. `./listing-scout.json`
/// 3. `~/.listing-scout/listing-scout.json`
///
/// Missing file → `ScoutConfig::default()` (env-var fallbacks apply).
/// Parse error → log a warning, return `ScoutConfig::default()`.
pub fn load_scout_config() -> ScoutConfig {
    let mut candidates = vec![PathBuf::from("listing-scout.json")];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".listing-scout").join("listing-scout.json"));
    }
    if let Some(env_path) = env_string(ENV_CONFIG_PATH) {
        candidates.insert(0, PathBuf::from(env_path));
    }

    for path in &candidates {
        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        return parse_scout_config(&contents, path);
    }

    ScoutConfig::default()
}

fn parse_scout_config(contents: &str, path: &Path) -> ScoutConfig {
    match serde_json::from_str::<ScoutConfig>(contents) {
        Ok(cfg) => {
            tracing::info!("listing-scout.json loaded from {}", path.display());
            cfg
        }
        Err(e) => {
            tracing::warn!(
                "listing-scout.json parse error at {}: {}, using defaults",
                path.display(),
                e
            );
            ScoutConfig::default()
        }
    }
}

/// Optional override for the Chromium-family browser executable.
///
/// Only returns a value when `CHROME_EXECUTABLE` points at an existing path.
pub fn chrome_executable_override() -> Option<String> {
    let p = env_string(ENV_CHROME_EXECUTABLE)?;
    if Path::new(&p).exists() {
        Some(p)
    } else {
        None
    }
}
