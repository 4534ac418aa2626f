use std::path::{Path, PathBuf};

use sha2::{Digest, Sha384};
use tracing::{debug, info, warn};

use crate::capabilities::{Capabilities, CommandLine};
use crate::error::{Result, WrapperError};

pub const INSTALLER_URL: &str = "https://getcomposer.org/installer";
pub const EXPECTED_INSTALLER_CHECKSUM_URL: &str = "https://composer.github.io/installer.sig";
pub const INSTALLER_FILE: &str = "composer-setup.php";

/// Lowercase hex SHA-384, the format `installer.sig` is published in.
pub fn sha384_hex(bytes: &[u8]) -> String {
    hex::encode(Sha384::digest(bytes))
}

/// Compares a computed digest with a downloaded one. The download usually
/// ends with a newline; the comparison is otherwise exact.
pub fn checksum_matches(actual: &str, expected: &str) -> bool {
    actual == expected.trim_end()
}

/// Downloads, verifies and runs the official Composer installer.
pub struct Installer<'a> {
    caps: Capabilities<'a>,
    php_binary: &'a Path,
}

impl<'a> Installer<'a> {
    pub fn new(caps: Capabilities<'a>, php_binary: &'a Path) -> Installer<'a> {
        Installer { caps, php_binary }
    }

    /// The command that runs the installer so it writes `composer.phar`
    /// into `dir`.
    pub fn installer_command(&self, installer: &Path, dir: &Path) -> CommandLine {
        let mut install_dir = std::ffi::OsString::from("--install-dir=");
        install_dir.push(dir.as_os_str());
        CommandLine::new(self.php_binary).arg(installer).arg(install_dir)
    }

    /// Installs `composer.phar` into `dir`.
    ///
    /// # Errors
    /// Fails when either download fails, when the checksum does not match
    /// (the installer is deleted first), or when the installer exits non-zero.
    pub fn install_into(&self, dir: &Path) -> Result<()> {
        let installer: PathBuf = dir.join(INSTALLER_FILE);
        info!(dir = %dir.display(), "installing composer");

        self.caps
            .downloader
            .download(INSTALLER_URL, &installer)
            .map_err(|source| WrapperError::DownloadInstaller {
                url: INSTALLER_URL.to_string(),
                source,
            })?;

        let expected = match self.caps.checksums.fetch(EXPECTED_INSTALLER_CHECKSUM_URL) {
            Ok(body) if !body.trim().is_empty() => body,
            Ok(_) => {
                return Err(WrapperError::DownloadChecksum {
                    url: EXPECTED_INSTALLER_CHECKSUM_URL.to_string(),
                    source: None,
                });
            }
            Err(source) => {
                return Err(WrapperError::DownloadChecksum {
                    url: EXPECTED_INSTALLER_CHECKSUM_URL.to_string(),
                    source: Some(source),
                });
            }
        };

        let actual = sha384_hex(&self.caps.fs.read(&installer)?);
        if !checksum_matches(&actual, &expected) {
            warn!(expected = expected.trim_end(), actual = %actual, "installer checksum mismatch");
            self.caps.fs.remove(&installer)?;
            return Err(WrapperError::ChecksumMismatch { path: installer });
        }

        let command = self.installer_command(&installer, dir);
        debug!(%command, "running installer");
        let result = self.caps.processes.run(&command);
        if let Err(e) = self.caps.fs.remove(&installer) {
            warn!(path = %installer.display(), error = %e, "could not remove installer");
        }
        let exit_code = result?;
        if exit_code != 0 {
            return Err(WrapperError::Install { exit_code });
        }
        Ok(())
    }
}
