use clap::{Parser, ValueEnum};
use crawl_scenarios::BrowserBackend;
use crawl_scenarios::config::{MAX_DEPTH, MIN_DEPTH};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "crawl-scenarios")]
#[command(about = "Discover a website and generate Gherkin test scenarios for it")]
#[command(version)]
pub struct Args {
    /// Start URL of the site to discover (overrides `start_url` from --config)
    pub url: Option<String>,

    /// Maximum link depth to crawl from the start URL
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(MIN_DEPTH as i64..=MAX_DEPTH as i64))]
    pub depth: Option<u8>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// How pages are loaded
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendArg>,

    /// WebDriver server URL (also read from WEBDRIVER_URL)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Total timeout in seconds (maximum runtime)
    #[arg(long)]
    pub total_timeout: Option<u64>,

    /// Number of pages processed concurrently by the completion service
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Directory that receives site.json, features.json and the scenarios
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Stop after site discovery
    #[arg(long)]
    pub discover_only: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Render pages in a browser through WebDriver
    Webdriver,
    /// Fetch raw HTML without running scripts
    Static,
}

/// Convert from CLI argument backend to the configuration backend
pub fn convert_backend(arg: BackendArg) -> BrowserBackend {
    match arg {
        BackendArg::Webdriver => BrowserBackend::Webdriver,
        BackendArg::Static => BrowserBackend::Static,
    }
}
