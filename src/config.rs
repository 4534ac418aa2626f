use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ConfigError;
use crate::frequency::UpdateFrequency;

pub const ENV_UPDATE_FREQ: &str = "COMPOSER_UPDATE_FREQ";
pub const ENV_CHANNEL: &str = "COMPOSER_CHANNEL";
pub const ENV_FORCE_MAJOR_VERSION: &str = "COMPOSER_FORCE_MAJOR_VERSION";
pub const ENV_COMPOSER_DIR: &str = "COMPOSER_DIR";
pub const ENV_CONFIG_FILE: &str = "COMPOSER";
pub const ENV_PHP_BINARY: &str = "PHP_BINARY";

pub const CONFIG_FILE: &str = "composer.json";
pub const DEFAULT_PHP_BINARY: &str = "php";

/// Snapshot of the environment variables the wrapper cares about.
///
/// Taken once at startup; configuration never reads `std::env` directly.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    pub fn from_process() -> Environment {
        Environment { vars: std::env::vars().collect() }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Environment
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Environment {
            vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Returns the variable if it is set; an empty value counts as set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Returns the variable only if it holds something; `FOO=` counts as unset.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }
}

/// A major-version line of Composer that self-update can be pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    One,
    Two,
}

impl Channel {
    pub fn number(self) -> u8 {
        match self {
            Channel::One => 1,
            Channel::Two => 2,
        }
    }

    /// The `self-update` flag that pins this channel on Composer versions
    /// which know about it.
    pub fn flag(self) -> String {
        format!("--{}", self.number())
    }

    pub fn parse(input: &str) -> Result<Channel, ConfigError> {
        match input.trim() {
            "1" => Ok(Channel::One),
            "2" => Ok(Channel::Two),
            _ => Err(ConfigError::Channel(input.to_string())),
        }
    }

    /// Accepts integers and numeric strings; `1.0` is not an integer.
    pub fn from_json(value: &Value) -> Result<Channel, ConfigError> {
        match value {
            Value::String(s) => Channel::parse(s),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Ok(Channel::One),
                Some(2) => Ok(Channel::Two),
                _ => Err(ConfigError::Channel(n.to_string())),
            },
            other => Err(ConfigError::Channel(other.to_string())),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Contents of `composer.json` that concern the wrapper:
/// `{"config": {"wrapper": {...}}}`. Everything else is ignored.
#[derive(Debug, Default, Deserialize)]
struct ComposerJson {
    #[serde(default)]
    config: Option<ComposerJsonConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct ComposerJsonConfig {
    #[serde(default)]
    wrapper: Option<WrapperSection>,
}

#[derive(Debug, Default, Deserialize)]
struct WrapperSection {
    #[serde(rename = "update-freq")]
    update_freq: Option<Value>,
    #[serde(rename = "major-version")]
    major_version: Option<Value>,
    #[serde(rename = "composer-dir")]
    composer_dir: Option<Value>,
}

/// Resolved wrapper settings. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Config {
    update_freq: UpdateFrequency,
    channel: Option<Channel>,
    composer_dir: PathBuf,
    php_binary: PathBuf,
}

impl Config {
    /// Defaults only: seven days, no channel, `base_dir` as the target.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Config {
        Config {
            update_freq: UpdateFrequency::default(),
            channel: None,
            composer_dir: base_dir.as_ref().to_path_buf(),
            php_binary: PathBuf::from(DEFAULT_PHP_BINARY),
        }
    }

    /// Resolves the configuration: environment over `composer.json` over
    /// defaults. `base_dir` is where the wrapper itself lives.
    ///
    /// # Errors
    /// Returns the first invalid value, checked in the order update frequency,
    /// channel, directory.
    pub fn load(env: &Environment, base_dir: &Path) -> Result<Config, ConfigError> {
        let update_freq = env.get(ENV_UPDATE_FREQ);
        let channel = env
            .get_non_empty(ENV_CHANNEL)
            .or_else(|| env.get_non_empty(ENV_FORCE_MAJOR_VERSION));
        let composer_dir = env.get(ENV_COMPOSER_DIR);

        // composer.json is only read for what the environment leaves open.
        let file = if update_freq.is_some() && channel.is_some() && composer_dir.is_some() {
            WrapperSection::default()
        } else {
            load_wrapper_section(env, base_dir)?
        };
        let mut config = Config::new(base_dir);

        if let Some(value) = update_freq {
            config.update_freq = UpdateFrequency::parse(value)?;
        } else if let Some(value) = &file.update_freq {
            config.update_freq = UpdateFrequency::from_json(value)?;
        }

        if let Some(value) = channel {
            config.channel = Some(Channel::parse(value)?);
        } else if let Some(value) = &file.major_version {
            config.channel = Some(Channel::from_json(value)?);
        }

        if let Some(value) = composer_dir {
            config.composer_dir = PathBuf::from(value);
        } else if let Some(value) = &file.composer_dir {
            let dir = match value {
                Value::String(s) => PathBuf::from(s),
                other => PathBuf::from(other.to_string()),
            };
            // A relative dir in the file resolves against the wrapper dir.
            config.composer_dir = base_dir.join(dir);
        }
        validate_dir(&config.composer_dir)?;

        if let Some(value) = env.get_non_empty(ENV_PHP_BINARY) {
            config.php_binary = PathBuf::from(value);
        }

        debug!(
            update_freq = %config.update_freq,
            channel = ?config.channel,
            composer_dir = %config.composer_dir.display(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn update_freq(&self) -> &UpdateFrequency {
        &self.update_freq
    }

    pub fn channel(&self) -> Option<Channel> {
        self.channel
    }

    pub fn composer_dir(&self) -> &Path {
        &self.composer_dir
    }

    pub fn php_binary(&self) -> &Path {
        &self.php_binary
    }

    pub fn with_update_freq(mut self, update_freq: UpdateFrequency) -> Config {
        self.update_freq = update_freq;
        self
    }

    pub fn with_channel(mut self, channel: Option<Channel>) -> Config {
        self.channel = channel;
        self
    }

    pub fn with_php_binary<P: Into<PathBuf>>(mut self, php_binary: P) -> Config {
        self.php_binary = php_binary.into();
        self
    }

    /// Changes the target directory after validating it.
    pub fn with_composer_dir<P: Into<PathBuf>>(mut self, dir: P) -> Result<Config, ConfigError> {
        let dir = dir.into();
        validate_dir(&dir)?;
        self.composer_dir = dir;
        Ok(self)
    }
}

fn config_file_path(env: &Environment, base_dir: &Path) -> PathBuf {
    match env.get_non_empty(ENV_CONFIG_FILE) {
        Some(path) => base_dir.join(path),
        None => base_dir.join(CONFIG_FILE),
    }
}

fn load_wrapper_section(env: &Environment, base_dir: &Path) -> Result<WrapperSection, ConfigError> {
    let path = config_file_path(env, base_dir);
    if !path.is_file() {
        debug!(path = %path.display(), "no config file");
        return Ok(WrapperSection::default());
    }
    let parsed = std::fs::read_to_string(&path)
        .context("reading file")
        .and_then(|content| {
            serde_json::from_str::<ComposerJson>(&content).context("parsing JSON")
        })
        .map_err(|source| ConfigError::File { path: path.clone(), source })?;
    Ok(parsed
        .config
        .and_then(|config| config.wrapper)
        .unwrap_or_default())
}

fn validate_dir(dir: &Path) -> Result<(), ConfigError> {
    if !dir.is_dir() {
        return Err(ConfigError::Directory { dir: dir.to_path_buf(), reason: "a dir" });
    }
    if std::fs::read_dir(dir).is_err() {
        return Err(ConfigError::Directory { dir: dir.to_path_buf(), reason: "accessible" });
    }
    Ok(())
}
