//! Generator settings.
//!
//! Read from `xplm-gen.toml` when present. Every field has a default, so an
//! empty or missing file is a valid configuration. Command line arguments
//! are applied on top in `main`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::combined::FMOD_STUB_FLAG;
use crate::models::Error;

pub const CONFIG_FILE: &str = "xplm-gen.toml";

/// SDK API levels, oldest first. Selecting a level enables every level
/// up to and including it.
pub const LEVELS: [u32; 7] = [200, 210, 300, 301, 302, 303, 400];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Macos,
    Linux,
}

impl Platform {
    pub fn host() -> Platform {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else {
            Platform::Linux
        }
    }

    /// Platform switch the SDK headers test with `#if`.
    pub fn macro_name(&self) -> &'static str {
        match self {
            Platform::Windows => "IBM",
            Platform::Macos => "APL",
            Platform::Linux => "LIN",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::host()
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::Config(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the SDK, containing `CHeaders` and `Libraries`.
    pub sdk: PathBuf,

    /// Searched after the SDK header directories.
    pub include_dirs: Vec<PathBuf>,

    /// Directory the bindings crate is written to.
    pub output: PathBuf,

    /// Package name of the bindings crate.
    pub name: String,

    pub version: String,

    pub level: u32,

    pub platform: Platform,

    /// Also expose declarations the SDK marks deprecated.
    pub deprecated: bool,

    /// Declare the FMOD types the sound API refers to instead of reading
    /// the FMOD headers.
    pub fmod_stub: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sdk: PathBuf::from("SDK"),
            include_dirs: vec![],
            output: PathBuf::from("xplm-sys"),
            name: "xplm-sys".into(),
            version: "0.1.0".into(),
            level: 400,
            platform: Platform::default(),
            deprecated: false,
            fmod_stub: true,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or the defaults when there is no such file.
    pub fn load_or_default(path: &Path) -> Result<Config, Error> {
        if path.exists() {
            Config::load(path)
        } else {
            tracing::debug!("no {}, using default configuration", path.display());
            Ok(Config::default())
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !LEVELS.contains(&self.level) {
            return Err(Error::Config(format!(
                "unknown SDK level {}, expected one of {:?}",
                self.level, LEVELS
            )));
        }
        Ok(())
    }

    /// Include search path: the SDK header directories, then any extras.
    pub fn header_dirs(&self) -> Vec<PathBuf> {
        let headers = self.sdk.join("CHeaders");
        let mut dirs = vec![headers.join("XPLM"), headers.join("Widgets")];
        dirs.extend(self.include_dirs.iter().cloned());
        dirs
    }

    /// Macros defined before the headers are read.
    pub fn predefined_macros(&self) -> Vec<(String, String)> {
        let mut macros: Vec<(String, String)> = LEVELS
            .iter()
            .filter(|level| **level <= self.level)
            .map(|level| (format!("XPLM{}", level), "1".to_string()))
            .collect();
        macros.push(("XPLM_LEVEL".into(), self.level.to_string()));
        for platform in [Platform::Windows, Platform::Macos, Platform::Linux] {
            let value = if platform == self.platform { "1" } else { "0" };
            macros.push((platform.macro_name().into(), value.into()));
        }
        if self.deprecated {
            macros.push(("XPLM_DEPRECATED".into(), "1".into()));
        }
        if self.fmod_stub {
            macros.push((FMOD_STUB_FLAG.into(), "1".into()));
        }
        macros
    }
}
