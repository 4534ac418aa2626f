//! Freshness checks and `self-update` handling for `composer.phar`.

use std::path::Path;

use chrono::{DateTime, Local};
use regex::Regex;
use tracing::{debug, info};

use crate::capabilities::{Capabilities, CommandLine};
use crate::config::{Channel, Config};
use crate::error::Result;

pub const SELF_UPDATE_COMMAND: &str = "self-update";

/// Tokens that make a user invocation a self-update request.
pub const SELF_UPDATE_ALIASES: &[&str] = &["self-update", "selfupdate"];

/// Composer releases before the `--1`/`--2` flags existed can still be held on
/// the 1.x line by asking for this exact version.
pub const LEGACY_CHANNEL_ONE_VERSION: &str = "1.10.5";

/// Patterns looked for in `composer self-update --help`. `{channel}` is
/// replaced by the channel number. Composer lists the flag as an option
/// line such as `      --2    Force an update to the stable channel, but
/// only use 2.x versions`; any pattern matching means the flag exists.
pub const CHANNEL_FLAG_PATTERNS: &[&str] = &[r"(?m)^\s*--{channel}(?:\s|$)"];

pub const MSG_SELF_UPDATE_FAILED: &str =
    "composer self-update failed; continuing with the installed version";
pub const MSG_TOUCH_FAILED: &str =
    "could not refresh the modification time of composer.phar; the update check will run again next time";
pub const MSG_CHANNEL_FLAG_UNSUPPORTED: &str =
    "installed composer cannot be pinned to channel 2; running a plain self-update";

/// Whether `help` advertises the `--<channel>` self-update flag.
pub fn help_mentions_channel_flag(help: &str, channel: u8) -> bool {
    CHANNEL_FLAG_PATTERNS.iter().any(|template| {
        let pattern = template.replace("{channel}", &channel.to_string());
        Regex::new(&pattern).is_ok_and(|re| re.is_match(help))
    })
}

/// The command used to run the managed executable itself. On Unix the phar is
/// executed directly through its shebang; elsewhere through the interpreter.
pub fn managed_command(config: &Config, path: &Path) -> CommandLine {
    if cfg!(unix) {
        CommandLine::new(path)
    } else {
        CommandLine::new(config.php_binary()).arg(path)
    }
}

pub struct Updater<'a> {
    caps: Capabilities<'a>,
    config: &'a Config,
}

impl<'a> Updater<'a> {
    pub fn new(caps: Capabilities<'a>, config: &'a Config) -> Updater<'a> {
        Updater { caps, config }
    }

    /// A file is fresh while its mtime is later than now minus the update
    /// frequency.
    pub fn is_up_to_date(&self, path: &Path) -> Result<bool> {
        let modified: DateTime<Local> = self.caps.fs.modified(path)?.into();
        let now = Local::now();
        let fresh = match self.config.update_freq().threshold(now) {
            Some(threshold) => modified > threshold,
            None => true,
        };
        debug!(path = %path.display(), %modified, fresh, "freshness check");
        Ok(fresh)
    }

    pub fn ensure_up_to_date(&self, path: &Path) -> Result<()> {
        if !self.is_up_to_date(path)? {
            self.self_update(path)?;
        }
        Ok(())
    }

    /// Asks the installed Composer whether its `self-update` takes `--<channel>`.
    pub fn supports_channel_flag(&self, path: &Path, channel: u8) -> bool {
        let command = managed_command(self.config, path).args([SELF_UPDATE_COMMAND, "--help"]);
        match self.caps.processes.output(&command) {
            Ok(help) => help_mentions_channel_flag(&help, channel),
            Err(e) => {
                debug!(error = %e, "could not read self-update help");
                false
            }
        }
    }

    /// Runs `composer.phar self-update`, pinned to the configured channel when
    /// there is one. Never fails because the update itself failed: the exit
    /// code is returned and a warning reported.
    pub fn self_update(&self, path: &Path) -> Result<i32> {
        let mut command = managed_command(self.config, path).arg(SELF_UPDATE_COMMAND);
        if let Some(channel) = self.config.channel() {
            if self.supports_channel_flag(path, channel.number()) {
                command = command.arg(channel.flag());
            } else {
                match channel {
                    Channel::One => command = command.arg(LEGACY_CHANNEL_ONE_VERSION),
                    Channel::Two => self.caps.reporter.warn(MSG_CHANNEL_FLAG_UNSUPPORTED),
                }
            }
        }

        // Even a failed update waits for the next window before retrying.
        if let Err(e) = self.caps.fs.touch(path) {
            debug!(error = %e, path = %path.display(), "could not refresh mtime");
            self.caps.reporter.warn(MSG_TOUCH_FAILED);
        }

        info!(%command, "updating composer");
        let exit_code = match self.caps.processes.run(&command) {
            Ok(code) => code,
            Err(e) => {
                debug!(error = %e, "self-update could not start");
                1
            }
        };
        if exit_code != 0 {
            self.caps.reporter.warn(MSG_SELF_UPDATE_FAILED);
        }
        Ok(exit_code)
    }
}
