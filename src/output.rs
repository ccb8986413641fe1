use crate::error::OutputError;
use crate::results::{Feature, RunReport, SiteDiscovery};
use crate::scenarios::ScenarioBundle;
use crate::utils::sanitize_filename;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const SITE_FILE: &str = "site.json";
pub const FEATURES_FILE: &str = "features.json";
pub const SCENARIOS_FILE: &str = "scenarios.feature";
pub const REPORT_FILE: &str = "report.json";
pub const PAGES_DIR: &str = "pages";

/// Persists each stage's output into one directory as soon as it is available
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    /// Use `dir` for output, creating it if needed
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self, OutputError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_discovery(&self, discovery: &SiteDiscovery) -> Result<PathBuf, OutputError> {
        self.write_json(SITE_FILE, discovery)
    }

    pub fn write_features(&self, features: &[Feature]) -> Result<PathBuf, OutputError> {
        self.write_json(FEATURES_FILE, features)
    }

    pub fn write_report(&self, report: &RunReport) -> Result<PathBuf, OutputError> {
        self.write_json(REPORT_FILE, report)
    }

    /// Write the combined scenario text plus one `.feature` file per page
    pub fn write_scenarios(&self, bundle: &ScenarioBundle) -> Result<PathBuf, OutputError> {
        let combined = self.dir.join(SCENARIOS_FILE);
        fs::write(&combined, bundle.combined())?;

        let pages_dir = self.dir.join(PAGES_DIR);
        fs::create_dir_all(&pages_dir)?;

        // A page split into several chunks shares one file
        let mut per_page: Vec<(&str, Vec<&str>)> = Vec::new();
        for section in bundle.sections() {
            match per_page.iter_mut().find(|(url, _)| *url == section.page_url) {
                Some((_, texts)) => texts.push(section.text.as_str()),
                None => per_page.push((section.page_url.as_str(), vec![section.text.as_str()])),
            }
        }
        let mut used = HashSet::new();
        for (url, texts) in per_page {
            let path = pages_dir.join(format!("{}.feature", unique_name(url, &mut used)));
            fs::write(&path, texts.join("\n\n"))?;
            ::log::debug!("Wrote scenarios for {} to {}", url, path.display());
        }

        ::log::info!("Scenarios saved to {}", combined.display());
        Ok(combined)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf, OutputError> {
        let path = self.dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(value)?)?;
        ::log::info!("Saved {}", path.display());
        Ok(path)
    }
}

/// Sanitized file stem for `url`, suffixed when another URL already took it
fn unique_name(url: &str, used: &mut HashSet<String>) -> String {
    let base = sanitize_filename(url);
    let mut name = base.clone();
    let mut n = 2;
    while !used.insert(name.clone()) {
        name = format!("{}_{}", base, n);
        n += 1;
    }
    name
}
