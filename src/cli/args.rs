//! CLI argument parsing using clap.
//!
//! Contains the Cli struct, Commands enum, and the watch arguments.

use clap::{
    Args, CommandFactory, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
    error::ErrorKind,
};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::sink::Endpoint;

const WATCH_AFTER_HELP: &str = "\
Examples:
  mirrorwatch watch ./src /srv/app/src
  mirrorwatch watch -c 10.0.0.5:29324 ./src /srv/app/src ./assets /srv/app/assets

Exit status:
  0  stopped by Ctrl-C, or interrupted before watching began
  1  a path could not be resolved, or the watch failed
  2  usage error (clap's status, not sysexits EX_USAGE 64)";

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Filesystem change forwarder
#[derive(Parser, Debug)]
#[command(
    name = "mirrorwatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Forward local filesystem changes to a remote listener",
    long_about = "Watch local directories and send debounced, remapped change notifications over UDP.",
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Write .mirrorwatch/settings.toml with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,

    /// Watch local paths and notify the remote side
    #[command(
        about = "Watch local paths and notify a remote listener",
        after_help = WATCH_AFTER_HELP
    )]
    Watch(WatchArgs),
}

/// Arguments of the `watch` command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Where to connect. Defaults to 127.0.0.1:29324
    #[arg(short = 'c', long = "connect", value_name = "HOST[:PORT]")]
    pub connect: Option<Endpoint>,

    /// Pairs of paths, the first being the local path to watch and the
    /// second one being the remote path
    #[arg(value_name = "FROM TO", required = true, num_args = 1..)]
    pub paths: Vec<OsString>,
}

impl WatchArgs {
    /// Split the positional arguments into `(local, remote)` pairs.
    ///
    /// An odd count is a usage error.
    pub fn pairs(&self) -> Result<Vec<(PathBuf, PathBuf)>, clap::Error> {
        if self.paths.len() % 2 != 0 {
            return Err(watch_usage_error(
                ErrorKind::WrongNumberOfValues,
                format!(
                    "expected <FROM> <TO> pairs, got {} paths",
                    self.paths.len()
                ),
            ));
        }

        Ok(self
            .paths
            .chunks_exact(2)
            .map(|pair| (PathBuf::from(&pair[0]), PathBuf::from(&pair[1])))
            .collect())
    }

    /// The `-c` endpoint, or `fallback` when it was not given.
    pub fn endpoint_or(&self, fallback: &Endpoint) -> Endpoint {
        self.connect.clone().unwrap_or_else(|| fallback.clone())
    }
}

/// Build a usage error carrying the `watch` subcommand's usage line.
fn watch_usage_error(kind: ErrorKind, message: String) -> clap::Error {
    let mut cmd = Cli::command();
    cmd.build();
    match cmd.find_subcommand_mut("watch") {
        Some(watch) => watch.error(kind, message),
        None => cmd.error(kind, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("mirrorwatch").chain(args.iter().copied()))
    }

    fn watch_args(args: &[&str]) -> WatchArgs {
        match parse(args).unwrap().command {
            Commands::Watch(watch) => watch,
            other => panic!("expected watch, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_watch_help_documents_exit_status() {
        let mut cmd = Cli::command();
        let help = cmd
            .find_subcommand_mut("watch")
            .unwrap()
            .render_long_help()
            .to_string();

        assert!(help.contains("Exit status:"), "{help}");
        assert!(help.contains("2  usage error"), "{help}");
    }

    #[test]
    fn test_watch_pairs() {
        let args = watch_args(&["watch", "/a", "/remote/a", "/b", "/remote/b"]);
        let pairs = args.pairs().unwrap();

        assert_eq!(
            pairs,
            vec![
                (PathBuf::from("/a"), PathBuf::from("/remote/a")),
                (PathBuf::from("/b"), PathBuf::from("/remote/b")),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_watch_accepts_non_utf8_paths() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let local = OsStr::from_bytes(b"/w/\xff");
        let cli = Cli::try_parse_from([
            OsStr::new("mirrorwatch"),
            OsStr::new("watch"),
            local,
            OsStr::new("/r"),
        ])
        .unwrap();

        let Commands::Watch(args) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(
            args.pairs().unwrap(),
            vec![(PathBuf::from(local), PathBuf::from("/r"))]
        );
    }

    #[test]
    fn test_default_endpoint_without_connect() {
        let args = watch_args(&["watch", "/a", "/remote/a"]);
        assert!(args.connect.is_none());

        let endpoint = args.endpoint_or(&Endpoint::default());
        assert_eq!(endpoint.to_string(), "127.0.0.1:29324");
    }

    #[test]
    fn test_connect_flag() {
        let args = watch_args(&["watch", "-c", "10.0.0.5:4000", "/a", "/remote/a"]);
        let endpoint = args.endpoint_or(&Endpoint::default());
        assert_eq!(endpoint.host, "10.0.0.5");
        assert_eq!(endpoint.port, 4000);

        let host_only = watch_args(&["watch", "-c", "buildbox", "/a", "/remote/a"]);
        assert_eq!(host_only.connect.unwrap().port, 29324);
    }

    #[test]
    fn test_odd_paths_is_usage_error() {
        let args = watch_args(&["watch", "/a", "/remote/a", "/b"]);
        let err = args.pairs().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongNumberOfValues);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_no_paths_is_usage_error() {
        let err = parse(&["watch"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_connect_missing_value() {
        assert!(parse(&["watch", "-c"]).is_err());
    }

    #[test]
    fn test_connect_malformed_port() {
        let err = parse(&["watch", "-c", "host:port", "/a", "/b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }
}
