use std::path::PathBuf;
use anyhow::{Context, Result};
use composerw::capabilities::{
    Capabilities, HttpClient, LocalFileSystem, StderrReporter, SystemProcessRunner,
};
use composerw::config::Environment;
use crate::cli::CLI;

pub fn execute(cli: CLI) -> Result<i32> {
    let env = Environment::from_process();
    let base_dir = wrapper_dir()?;

    let http = HttpClient::new();
    let processes = SystemProcessRunner;
    let fs = LocalFileSystem;
    let reporter = StderrReporter;
    let caps = Capabilities {
        downloader: &http,
        checksums: &http,
        processes: &processes,
        fs: &fs,
        reporter: &reporter,
    };

    let code = composerw::run(cli.args.as_slice(), &env, &base_dir, caps)?;
    Ok(code)
}

/// The directory the wrapper binary lives in; `composer.phar` and
/// `composer.json` are looked up there unless configured otherwise.
fn wrapper_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Could not locate the wrapper executable")?;
    let exe = exe.canonicalize().unwrap_or(exe);
    let dir = exe
        .parent()
        .ok_or(anyhow::anyhow!("Could not get the wrapper directory"))?;
    Ok(dir.to_path_buf())
}
