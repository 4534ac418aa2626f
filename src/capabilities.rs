//! Side-effecting collaborators of the wrapper.
//!
//! The decision engine in [`crate::wrapper`] only talks to these traits, so
//! every network, process and filesystem call can be replaced in tests.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::SystemTime;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use filetime::FileTime;
use tempfile::NamedTempFile;
use tracing::debug;

/// A program and its arguments. Arguments are passed to the OS one by one and
/// are never re-split, so paths with spaces survive untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandLine {
    pub fn new<S: AsRef<OsStr>>(program: S) -> CommandLine {
        CommandLine { program: program.as_ref().to_os_string(), args: Vec::new() }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> CommandLine {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

/// Renders the command the way a POSIX shell would need it typed.
impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<String> = std::iter::once(&self.program)
            .chain(&self.args)
            .map(|w| w.to_string_lossy().into_owned())
            .collect();
        match shlex::try_join(words.iter().map(String::as_str)) {
            Ok(joined) => f.write_str(&joined),
            Err(_) => f.write_str(&words.join(" ")),
        }
    }
}

/// Fetches a remote file onto disk.
pub trait Downloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Fetches the published checksum of the installer.
pub trait ChecksumFetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Runs child processes to completion.
pub trait ProcessRunner {
    /// Runs with inherited stdio and returns the exit code.
    fn run(&self, command: &CommandLine) -> std::io::Result<i32>;
    /// Runs with captured stdout and returns it as text.
    fn output(&self, command: &CommandLine) -> std::io::Result<String>;
}

/// The filesystem operations the wrapper needs on the managed executable.
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
    fn remove(&self, path: &Path) -> std::io::Result<()>;
    fn modified(&self, path: &Path) -> std::io::Result<SystemTime>;
    /// Sets the modification time to now.
    fn touch(&self, path: &Path) -> std::io::Result<()>;
    /// Unix permission bits (`0o777` mask and above).
    fn mode(&self, path: &Path) -> std::io::Result<u32>;
    fn set_mode(&self, path: &Path, mode: u32) -> std::io::Result<()>;
}

/// Receives non-fatal problems meant for the user.
pub trait Reporter {
    fn warn(&self, message: &str);
}

/// Bundle of borrowed collaborators handed to [`crate::ComposerWrapper`].
#[derive(Clone, Copy)]
pub struct Capabilities<'a> {
    pub downloader: &'a dyn Downloader,
    pub checksums: &'a dyn ChecksumFetcher,
    pub processes: &'a dyn ProcessRunner,
    pub fs: &'a dyn FileSystem,
    pub reporter: &'a dyn Reporter,
}

/// HTTP(S) client backed by `reqwest`'s blocking API.
#[derive(Debug, Default)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new() -> HttpClient {
        HttpClient::default()
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", concat!("composerw/", env!("CARGO_PKG_VERSION")))
            .send()?
            .error_for_status()?;
        Ok(response)
    }
}

impl Downloader for HttpClient {
    /// Writes into a temporary file next to `dest` and renames it into place,
    /// so `dest` is either absent or complete.
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        debug!(url, dest = %dest.display(), "downloading");
        let bytes = self.get(url)?.bytes()?;
        let dir = dest
            .parent()
            .with_context(|| format!("{} has no parent directory", dest.display()))?;
        let mut file = NamedTempFile::new_in(dir)
            .with_context(|| format!("Could not create a temporary file in {}", dir.display()))?;
        file.write_all(&bytes)?;
        file.persist(dest)
            .with_context(|| format!("Could not move download to {}", dest.display()))?;
        Ok(())
    }
}

impl ChecksumFetcher for HttpClient {
    fn fetch(&self, url: &str) -> Result<String> {
        debug!(url, "fetching checksum");
        let body = self.get(url)?.text()?;
        if body.trim().is_empty() {
            bail!("{} returned an empty body", url);
        }
        Ok(body)
    }
}

/// Runs real child processes with `std::process::Command`.
#[derive(Debug, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, command: &CommandLine) -> std::io::Result<i32> {
        debug!(%command, "running");
        let status = command
            .to_command()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(exit_code(status))
    }

    fn output(&self, command: &CommandLine) -> std::io::Result<String> {
        debug!(%command, "capturing output");
        let output = command.to_command().stdin(Stdio::null()).output()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Exit code of a finished process; on Unix a signal death maps to
/// `128 + signal` the way shells report it.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// The local disk.
#[derive(Debug, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn remove(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_file(path)
    }

    fn modified(&self, path: &Path) -> std::io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    fn touch(&self, path: &Path) -> std::io::Result<()> {
        filetime::set_file_mtime(path, FileTime::now())
    }

    #[cfg(unix)]
    fn mode(&self, path: &Path) -> std::io::Result<u32> {
        use std::os::unix::fs::PermissionsExt;
        Ok(std::fs::metadata(path)?.permissions().mode())
    }

    #[cfg(unix)]
    fn set_mode(&self, path: &Path, mode: u32) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
    }

    /// Without Unix modes only the read-only flag exists; files always read.
    #[cfg(not(unix))]
    fn mode(&self, path: &Path) -> std::io::Result<u32> {
        let readonly = std::fs::metadata(path)?.permissions().readonly();
        Ok(if readonly { 0o555 } else { 0o777 })
    }

    #[cfg(not(unix))]
    fn set_mode(&self, path: &Path, mode: u32) -> std::io::Result<()> {
        let mut permissions = std::fs::metadata(path)?.permissions();
        permissions.set_readonly(mode & 0o222 == 0);
        std::fs::set_permissions(path, permissions)
    }
}

/// Prints warnings in yellow on stderr, leaving stdout to Composer.
#[derive(Debug, Default)]
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn warn(&self, message: &str) {
        eprintln!("{}", message.yellow());
    }
}
