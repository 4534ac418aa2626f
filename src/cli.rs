use std::ffi::OsString;
use clap::Parser;

/// Installs Composer on first use, keeps it up to date and runs it.
///
/// Every argument is handed to Composer untouched, including `--help`,
/// `--version`, a leading `--` and bytes that are not valid UTF-8.
#[derive(Debug, Parser, Clone)]
#[clap(author, version, about, long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct CLI {
    /// Arguments forwarded to composer.phar
    #[arg(raw = true, value_parser = clap::value_parser!(OsString))]
    pub(crate) args: Vec<OsString>,
}

impl CLI {
    /// Parses the process arguments. Everything after the program name is
    /// put behind an explicit `--`, so clap keeps a user-supplied `--` as a
    /// value instead of consuming it.
    pub fn parse_forwarded() -> CLI {
        CLI::parse_from(forwarded_argv(std::env::args_os()))
    }
}

fn forwarded_argv<I: IntoIterator<Item = OsString>>(argv: I) -> Vec<OsString> {
    let mut argv = argv.into_iter();
    let program = argv.next().unwrap_or_else(|| OsString::from("composerw"));
    std::iter::once(program)
        .chain(std::iter::once(OsString::from("--")))
        .chain(argv)
        .collect()
}
