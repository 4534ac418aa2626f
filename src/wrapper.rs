use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::capabilities::Capabilities;
use crate::config::{Config, Environment};
use crate::error::{Result, WrapperError};
use crate::installer::Installer;
use crate::permissions;
use crate::updater::{SELF_UPDATE_ALIASES, Updater, managed_command};

pub const COMPOSER_FILE: &str = "composer.phar";

/// Whether the user asked Composer to update itself, wherever the token sits
/// among the arguments.
pub fn is_self_update_request<S: AsRef<OsStr>>(args: &[S]) -> bool {
    args.iter().any(|arg| {
        let arg = AsRef::<OsStr>::as_ref(arg);
        SELF_UPDATE_ALIASES.iter().any(|alias| arg == OsStr::new(alias))
    })
}

/// Installs, prepares and refreshes `composer.phar`, then hands over to it.
pub struct ComposerWrapper<'a> {
    caps: Capabilities<'a>,
    config: Config,
}

impl<'a> ComposerWrapper<'a> {
    pub fn new(caps: Capabilities<'a>, config: Config) -> ComposerWrapper<'a> {
        ComposerWrapper { caps, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `<composer_dir>/composer.phar`.
    pub fn composer_path(&self) -> PathBuf {
        self.config.composer_dir().join(COMPOSER_FILE)
    }

    fn updater(&self) -> Updater<'_> {
        Updater::new(self.caps, &self.config)
    }

    pub fn ensure_installed(&self, path: &Path) -> Result<()> {
        if self.caps.fs.exists(path) {
            return Ok(());
        }
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Installer::new(self.caps, self.config.php_binary()).install_into(dir)
    }

    pub fn ensure_executable(&self, path: &Path) -> Result<()> {
        permissions::ensure_executable(self.caps.fs, path)?;
        Ok(())
    }

    pub fn is_up_to_date(&self, path: &Path) -> Result<bool> {
        self.updater().is_up_to_date(path)
    }

    pub fn ensure_up_to_date(&self, path: &Path) -> Result<()> {
        self.updater().ensure_up_to_date(path)
    }

    pub fn self_update(&self, path: &Path) -> Result<i32> {
        self.updater().self_update(path)
    }

    /// Runs `composer.phar` with `args` unchanged and returns its exit code.
    pub fn delegate<S: AsRef<OsStr>>(&self, path: &Path, args: &[S]) -> Result<i32> {
        let command = managed_command(&self.config, path).args(args.iter().map(|a| AsRef::<OsStr>::as_ref(a)));
        debug!(%command, "delegating");
        self.caps
            .processes
            .run(&command)
            .map_err(WrapperError::Delegate)
    }

    /// The whole lifecycle for one invocation.
    pub fn run<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<i32> {
        let path = self.composer_path();
        self.ensure_installed(&path)?;
        self.ensure_executable(&path)?;
        self.ensure_up_to_date(&path)?;

        if is_self_update_request(args) {
            info!("self-update requested");
            return self.self_update(&path);
        }
        self.delegate(&path, args)
    }
}

/// Resolves the configuration from `env` and `base_dir`, then runs the wrapper.
///
/// # Errors
/// Configuration problems, failed installs and a managed executable that
/// cannot be started are returned; the exit code of Composer itself is not an
/// error.
pub fn run<S: AsRef<OsStr>>(
    args: &[S],
    env: &Environment,
    base_dir: &Path,
    caps: Capabilities<'_>,
) -> Result<i32> {
    let config = Config::load(env, base_dir)?;
    ComposerWrapper::new(caps, config).run(args)
}
