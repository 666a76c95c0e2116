//! YAML configuration for report merging and creation.
//!
//! Every field has a default, so an empty document is a valid configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! parse:
//!   timeout_secs: 1800
//!   jobs: 8
//! output:
//!   resource_dir: /opt/android-cts/tools/resources
//!   create_zip: true
//!   create_html: false
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CreateError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 60 * 60;

/// Settings for the parse stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Deadline for one batch of report files, in seconds.
    pub timeout_secs: u64,
    /// Worker threads; `None` picks a count from the batch size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            jobs: None,
        }
    }
}

impl ParseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for the artifacts written next to `test_result.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding `compatibility_result.css`, `compatibility_result.xsl`
    /// and `logo.png`. Nothing is copied when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_dir: Option<PathBuf>,
    /// Zip the result directory into a sibling `<dir>.zip`.
    pub create_zip: bool,
    /// Render `test_result.html`.
    pub create_html: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            resource_dir: None,
            create_zip: true,
            create_html: true,
        }
    }
}

/// Top-level configuration.
///
/// # Examples
///
/// ```no_run
/// use xts_report_creator::ReportConfig;
///
/// let config = ReportConfig::load("xts-report.yml").unwrap();
/// println!("parse timeout: {:?}", config.parse.timeout());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub parse: ParseConfig,
    pub output: OutputConfig,
}

impl ReportConfig {
    /// Loads and validates configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](CreateError::Io) if the file cannot be read,
    /// [`Yaml`](CreateError::Yaml) if parsing fails, or
    /// [`InvalidConfig`](CreateError::InvalidConfig) if a value is unusable.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Rejects a zero timeout and a zero worker count.
    pub fn validate(&self) -> Result<()> {
        if self.parse.timeout_secs == 0 {
            return Err(CreateError::InvalidConfig(
                "parse.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.parse.jobs == Some(0) {
            return Err(CreateError::InvalidConfig(
                "parse.jobs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
