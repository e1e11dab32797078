//! jumplint - check and repair table-of-contents jump links in Markdown
//!
//! jumplint provides:
//! - Heading, link and named-anchor extraction
//! - Two anchor-generation rules (named-anchor and renderer slug)
//! - Link reconciliation against declared, computed or literal anchors
//! - A TOC rewriter that writes a repaired copy of the document
//! - Unified output format (text/jsonl/json/md/raw)

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod anchors;
mod cli;
mod config;
mod core;

/// Broken links remain
const EXIT_BROKEN: i32 = 1;
/// Command could not complete
const EXIT_FATAL: i32 = 2;

fn main() {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    match cli::run(cli) {
        Ok(cli::Outcome::Clean) => {}
        Ok(cli::Outcome::BrokenLinks) => std::process::exit(EXIT_BROKEN),
        Err(err) => {
            let code = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<crate::core::error::JumpError>())
                .map_or("FATAL", |e| e.code());
            error!(code, error = %err, "command failed");
            for cause in err.chain().skip(1) {
                error!(cause = %cause, "caused by");
            }
            std::process::exit(EXIT_FATAL);
        }
    }
}

fn init_tracing(quiet: bool, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
