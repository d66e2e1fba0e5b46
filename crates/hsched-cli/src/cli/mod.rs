//! CLI for the hsched request scheduler.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hsched_core::config;
use std::path::PathBuf;

use commands::{run_config, run_get, GetArgs};

/// Top-level CLI for the hsched request scheduler.
#[derive(Debug, Parser)]
#[command(name = "hsched")]
#[command(about = "hsched: pooled HTTP request scheduler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch one or more URLs concurrently over the shared handle pool.
    Get {
        /// HTTP/HTTPS URLs to fetch.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Send `Pragma: no-cache`.
        #[arg(long)]
        no_cache: bool,

        /// Extra request header line, e.g. "Accept: text/plain". Repeatable.
        #[arg(short = 'H', long = "header", value_name = "LINE")]
        headers: Vec<String>,

        /// Ask for the identity encoding; no compressed transfer.
        #[arg(long)]
        raw: bool,

        /// Send HEAD instead of GET.
        #[arg(long, conflicts_with = "data")]
        head: bool,

        /// POST this string as the request body.
        #[arg(long, value_name = "BODY")]
        data: Option<String>,

        /// Content-Type for `--data`.
        #[arg(long, requires = "data", value_name = "TYPE")]
        content_type: Option<String>,

        /// Write the body to this file instead of stdout (single URL only).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Print a JSON summary per request instead of headers and body.
        #[arg(long)]
        json: bool,
    },

    /// Show the config file path and the effective configuration.
    Config,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                urls,
                no_cache,
                raw,
                headers,
                head,
                data,
                content_type,
                output,
                json,
            } => {
                let args = GetArgs {
                    urls,
                    no_cache,
                    raw,
                    headers,
                    head,
                    data,
                    content_type,
                    output,
                    json,
                };
                run_get(&cfg, args)?;
            }
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
