//! Configuration manager for the authenticator.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::scheduler::Secret;
use crate::totp::TotpConfig;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const SECONDS_PER_HOUR: i32 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read configuration file")]
    Io(#[from] std::io::Error),
    #[error("malformed configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration, {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Title shown above the codes.
    #[serde(default = "default_name")]
    pub name: String,
    /// Related to code derivation.
    #[serde(default)]
    pub totp: TotpConfig,
    /// Hours added to UTC for the date and time display.
    #[serde(default)]
    pub timezone_offset: i32,
    /// Seconds between two clock samples.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    /// Named Base32 secrets, displayed in this order.
    #[serde(default, skip_serializing)]
    pub secrets: Vec<Secret>,
    #[serde(default)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
}

fn default_name() -> String {
    "Badger TOTP Authenticator".into()
}

fn default_poll_interval() -> u64 {
    1
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: default_name(),
            totp: TotpConfig::default(),
            timezone_offset: 0,
            poll_interval: default_poll_interval(),
            secrets: Vec::new(),
            version: VERSION.to_owned(),
            path: PathBuf::new(),
        }
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Display timezone built from `timezone_offset`.
    pub fn timezone(&self) -> Option<FixedOffset> {
        self.timezone_offset
            .checked_mul(SECONDS_PER_HOUR)
            .and_then(FixedOffset::east_opt)
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    ///
    /// A missing file is not fatal: an empty default configuration is
    /// returned and the error is logged.
    pub fn read(self) -> Result<Self, ConfigError> {
        let file_path = if self.path.is_file() {
            self.path.clone()
        } else {
            Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        match File::open(&file_path) {
            Ok(file) => {
                let mut config = Self::parse(file)?;
                config.path = file_path;
                Ok(config)
            },
            Err(err) => {
                tracing::error!(error = %err, path = %file_path.display(), "configuration file not found");
                Ok(Self {
                    path: self.path,
                    ..Default::default()
                })
            },
        }
    }

    /// Parse and validate a YAML document.
    pub fn parse(reader: impl Read) -> Result<Self, ConfigError> {
        let mut config: Configuration = serde_yaml::from_reader(reader)?;

        // set app version.
        config.version = VERSION.to_owned();
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval == 0 {
            return Err(ConfigError::Invalid("poll interval must be greater than 0"));
        }

        if !(-23..=23).contains(&self.timezone_offset) {
            return Err(ConfigError::Invalid(
                "timezone offset must be between -23 and 23 hours",
            ));
        }

        Ok(())
    }
}
