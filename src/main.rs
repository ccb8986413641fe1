use clap::Parser;
use crawl_scenarios::output::OutputWriter;
use crawl_scenarios::{
    Browser, BrowserBackend, ConfigError, DiscoveryConfig, OpenAiCompletion, Pipeline, RunReport,
    SiteDiscovery, StaticBrowser, WebDriverBrowser,
};
use std::error::Error;

mod args;
use args::{Args, convert_backend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();
    let config = build_config(&args)?;

    ::log::info!("Starting discovery for: {}", config.start_url);

    let output = OutputWriter::create(&args.output)?;

    // Fail before crawling if scenarios cannot be generated afterwards
    let service = if args.discover_only {
        None
    } else {
        Some(OpenAiCompletion::from_config(&config.completion)?)
    };

    let mut pipeline = Pipeline::new(config)?;

    let config = pipeline.config();
    let browser: Box<dyn Browser> = match config.backend {
        BrowserBackend::Webdriver => {
            println!("Note: the webdriver backend requires a WebDriver server (e.g., ChromeDriver).");
            println!(
                "Set WEBDRIVER_URL or --webdriver-url if not using the default http://localhost:4444"
            );
            Box::new(WebDriverBrowser::connect(&config.webdriver_url, config.headless).await?)
        }
        BrowserBackend::Static => Box::new(StaticBrowser::new()),
    };

    let discovery = match pipeline.discover(browser.as_ref()).await {
        Ok(discovery) => discovery,
        Err(e) => {
            ::log::error!("Discovery failed: {}", e);
            return Err(e.into());
        }
    };
    output.write_discovery(&discovery)?;

    let Some(service) = service else {
        let report = pipeline.report();
        output.write_report(&report)?;
        print_statistics(&discovery, &report);
        return Ok(());
    };

    let features = pipeline.identify(&service, &discovery).await;
    output.write_features(&features)?;

    let bundle = pipeline.synthesize(&service, &features, &discovery).await;
    output.write_scenarios(&bundle)?;

    let report = pipeline.report();
    output.write_report(&report)?;
    print_statistics(&discovery, &report);

    Ok(())
}

/// Merge the optional config file, the environment and command-line flags
fn build_config(args: &Args) -> Result<DiscoveryConfig, ConfigError> {
    let mut config = match (&args.config, &args.url) {
        (Some(path), _) => DiscoveryConfig::from_file(path)?,
        (None, Some(url)) => DiscoveryConfig::new(url),
        (None, None) => {
            return Err(ConfigError::Invalid(
                "a start URL is required, either as an argument or in --config".to_string(),
            ));
        }
    };

    if let Some(url) = &args.url {
        config.start_url = url.clone();
    }
    if let Some(depth) = args.depth {
        config.max_depth = usize::from(depth);
    }
    if let Some(backend) = args.backend {
        config.backend = convert_backend(backend);
    }

    // Override the WebDriver URL with an environment variable if provided
    if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
        if !webdriver_url.is_empty() {
            config.webdriver_url = webdriver_url;
        }
    }
    if let Some(webdriver_url) = &args.webdriver_url {
        config.webdriver_url = webdriver_url.clone();
    }

    if let Some(total_timeout) = args.total_timeout {
        config.total_timeout_secs = Some(total_timeout);
    }
    if let Some(concurrency) = args.concurrency {
        config.completion.max_concurrent_pages = concurrency;
    }

    config.validate()?;
    Ok(config)
}

fn print_statistics(discovery: &SiteDiscovery, report: &RunReport) {
    println!();
    println!("Discovery statistics");
    println!("  Pages found:          {}", discovery.pages.len());
    println!("  Navigation paths:     {}", discovery.navigation.len());
    println!("  Pages failed to load: {}", report.crawl.load_failures.len());
    if let Some(identify) = &report.identify {
        println!("  Features identified:  {}", identify.features);
    }
    if let Some(synthesis) = &report.synthesis {
        println!("  Scenarios generated:  {}", synthesis.scenarios);
        if synthesis.placeholder_sections > 0 {
            println!("  Pages needing review: {}", synthesis.placeholder_sections);
        }
    }
    println!("  Elapsed:              {:.2} seconds", report.elapsed_secs);
    if report.cancelled() {
        println!("  Time budget exhausted; results are partial.");
    }
}
