//! Command line interface
//!
//! Flags are accepted in the single-dash long form (`-port 9000`,
//! `-uploaddir=./pics`) as well as the usual `--port 9000`.

use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// Tiny image host: serves a directory and accepts image uploads at /images
#[derive(Debug, Parser)]
#[command(name = "imgdrop", version, about)]
pub struct Args {
    /// Port for the server to listen on [default: 8080]
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Directory that is served and that uploads are written to [default: ./uploads]
    #[arg(long = "uploaddir", value_name = "DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Configuration file (toml, yaml or json)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Parse the process arguments
    pub fn from_env() -> Self {
        Self::parse_from(normalize_flags(std::env::args_os()))
    }
}

/// Rewrite `-name` style long flags to `--name` so clap can parse them.
///
/// Single-letter flags (`-h`, `-V`) and anything after a bare `--` are
/// left untouched.
pub fn normalize_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .enumerate()
        .map(|(idx, arg)| {
            if idx == 0 || passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            let name = text.split('=').next().unwrap_or(text);
            if text.starts_with('-') && !text.starts_with("--") && name.len() > 2 {
                let mut long = OsString::from("-");
                long.push(text);
                long
            } else {
                arg
            }
        })
        .collect()
}
