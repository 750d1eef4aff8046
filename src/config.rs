//! Persistent user configuration.
//!
//! Loaded from a TOML file in the home directory (or an explicit path);
//! command-line arguments take precedence over anything found here.

use crate::{muted_error, weak_error};
use serde::Deserialize;
use std::fs::read_to_string;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileConfig {
    /// Debugger executable override.
    pub debugger: Option<String>,
    /// Upper bound for synchronous command waits, in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl FileConfig {
    const DEFAULT_PATH: &'static str = ".midrive.toml";

    /// Read the configuration file. With `path` unset the default location is
    /// tried, and its absence is not an error.
    pub fn from_file(path: Option<&str>) -> Option<Self> {
        let data = match path {
            None => {
                let path = home::home_dir()?;
                let path = path.join(Self::DEFAULT_PATH);
                muted_error!(read_to_string(path))?
            }
            Some(path) => weak_error!(read_to_string(path))?,
        };
        weak_error!(toml::de::from_str(&data))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
