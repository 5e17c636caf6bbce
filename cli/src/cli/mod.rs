//! Command line front end for the sizeproxy rewriter.

mod commands;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_plan, run_rewrite, run_url};

#[derive(Debug, Parser)]
#[command(name = "sizeproxy", version)]
#[command(
    about = "Rewrite marked images to load through a resizing proxy at their rendered width",
    long_about = None
)]
pub struct Cli {
    /// Path to a sizeproxy.toml config file.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Flags that override values from the config file.
#[derive(Debug, Default, Clone, Args)]
pub struct Overrides {
    /// First path segment of generated URLs.
    #[arg(long, value_name = "ID")]
    pub proxy_id: Option<String>,

    /// Class that marks elements for rewriting.
    #[arg(long, value_name = "CLASS")]
    pub marker_class: Option<String>,

    /// Viewport width in CSS pixels used for layout.
    #[arg(long, value_name = "PX")]
    pub viewport_width: Option<u32>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Rewrite a page and write the resulting HTML.
    Rewrite {
        /// File path, http(s) URL, or `-` for stdin.
        input: String,

        /// Output file (stdout when omitted).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Show what a rewrite would do without changing anything.
    Plan {
        /// File path, http(s) URL, or `-` for stdin.
        input: String,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Print the proxy URL for a source at a width.
    Url {
        proxy_id: String,
        width: u32,
        source: String,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config_path = self.config.as_deref();
        match self.command {
            CliCommand::Rewrite { input, output, overrides } => {
                run_rewrite(config_path, &overrides, &input, output.as_deref())
            }
            CliCommand::Plan { input, overrides } => run_plan(config_path, &overrides, &input),
            CliCommand::Url { proxy_id, width, source } => run_url(&proxy_id, width, &source),
        }
    }
}

#[cfg(test)]
mod tests;
