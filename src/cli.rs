//! CLI module - Command-line interface definitions and handlers

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::anchors::api::{CheckDetail, FixTarget};
use crate::anchors::lint::AnchorSource;
use crate::anchors::rule::RuleKind;
use crate::config::JumpConfig;
use crate::core::render::{OutputFormat, RenderConfig};

/// jumplint - check and repair table-of-contents jump links in a Markdown document.
#[derive(Parser, Debug)]
#[command(name = "jumplint")]
#[command(
    author,
    version,
    about,
    long_about = r#"jumplint checks that every in-document link `[text](#anchor)` of a Markdown
file points at an anchor the document actually provides, and rewrites the
table of contents so that it does.

Every command emits a result set in the selected format (default: text).

Output formats:
- text: line-oriented human report with a final summary line
- jsonl: one JSON object per line
- json: a single JSON array
- md: Markdown
- raw: excerpts only

Exit status: 0 when every link resolves, 1 when broken links remain,
2 on fatal errors (missing input, invalid config, write failure).

Examples:
    jumplint headings docs/API文档.md
    jumplint check docs/API文档.md --against computed
    jumplint fix docs/API文档.md --rule named --dry-run
    jumplint slug "用户管理 🔧" "User Management"
"#
)]
pub struct Cli {
    /// Root directory for all operations.
    #[arg(
        long,
        global = true,
        default_value = ".",
        value_name = "ROOT",
        long_help = "Root directory for all operations (defaults to the current directory).\n\n\
Input/output paths and --config are interpreted relative to it unless absolute,\n\
and paths emitted in results are relative to it."
    )]
    pub root: PathBuf,

    /// Output format (text/jsonl/json/md/raw).
    #[arg(
        long,
        global = true,
        default_value = "text",
        value_name = "FORMAT",
        long_help = "Select the output format for the result set.\n\n\
Supported values:\n\
- text (default)\n\
- jsonl\n\
- json\n\
- md (markdown)\n\
- raw"
    )]
    pub format: OutputFormat,

    /// Configuration file (default: jumplint.json under ROOT, if present).
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "JUMPLINT_CONFIG",
        long_help = "JSON configuration file. When omitted, jumplint.json under ROOT is used if it\n\
exists; otherwise built-in defaults apply. An explicitly named file must exist."
    )]
    pub config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(
        long,
        global = true,
        long_help = "Disable colored output. This is useful when piping to files or when your\n\
terminal does not support ANSI colors."
    )]
    pub no_color: bool,

    /// Quiet mode (errors only on stderr).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode (debug diagnostics on stderr).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Enable debug diagnostics on stderr. RUST_LOG, when set, takes precedence."
    )]
    pub verbose: bool,

    /// Pretty-print JSON/JSONL output with indentation.
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments shared by commands that read a document
#[derive(Args, Debug)]
pub struct DocArgs {
    /// Markdown document (relative to ROOT unless absolute).
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Anchor rule (named/slug); overrides the config file.
    #[arg(
        long,
        value_name = "RULE",
        long_help = "Anchor-generation rule; overrides the config file.\n\n\
- named: the id written into <a name=\"...\"> declarations (CJK and ASCII\n\
  alphanumerics kept, whitespace runs become '-', ASCII lowercased)\n\
- slug: the id a renderer derives from heading text (word characters, CJK and\n\
  kana kept, hyphen runs collapsed and trimmed)"
    )]
    pub rule: Option<RuleKind>,

    /// Deepest heading level considered (3 or 4).
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(3..=4))]
    pub max_level: Option<u8>,
}

impl DocArgs {
    fn apply(&self, config: &mut JumpConfig) {
        if let Some(rule) = self.rule {
            config.rule = rule;
        }
        if let Some(level) = self.max_level {
            config.max_level = level;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List headings with the anchor each one produces.
    #[command(
        long_about = "List every heading of level 2 up to --max-level with its line number and\n\
the anchor computed by the selected rule.\n\n\
Examples:\n\
  jumplint headings README.md\n\
  jumplint headings README.md --rule slug --max-level 4\n"
    )]
    Headings {
        #[command(flatten)]
        doc: DocArgs,
    },

    /// List TOC links, named-anchor declarations and back-to-top links.
    #[command(
        long_about = "List every `[text](#target)` link, every `<a name=\"...\">` declaration and\n\
every back-to-top link, with line numbers.\n\n\
Example:\n\
  jumplint links README.md\n"
    )]
    Links {
        #[command(flatten)]
        doc: DocArgs,
    },

    /// Check that every link resolves to a known anchor.
    #[command(
        long_about = "Reconcile every link against one anchor source and report each link as\n\
resolved or broken, with near-match suggestions for broken ones.\n\n\
Exits with status 1 when any link is broken, which makes it suitable for CI.\n\n\
Examples:\n\
  jumplint check README.md\n\
  jumplint check README.md --against computed --rule slug\n\
  jumplint check README.md --only-broken --format jsonl\n"
    )]
    Check {
        #[command(flatten)]
        doc: DocArgs,

        /// Anchor source (declared/computed/titles).
        #[arg(
            long,
            value_name = "SOURCE",
            long_help = "Where known anchors come from; overrides the config file.\n\n\
- declared (default): <a name=\"...\"> declarations\n\
- computed: the rule applied to each heading title\n\
- titles: raw heading titles, matched literally"
        )]
        against: Option<AnchorSource>,

        /// Only print broken links and the summary.
        #[arg(long)]
        only_broken: bool,
    },

    /// Rewrite the table of contents so every link resolves.
    #[command(
        long_about = "Rewrite TOC links, back-to-top links and named-anchor declarations to the\n\
selected rule, write the result to a distinct output file and re-check it.\n\n\
The input is never modified. Without --output, the result is written next to\n\
the input with the configured suffix (default `_new`).\n\n\
Examples:\n\
  jumplint fix docs/API文档.md\n\
  jumplint fix docs/API文档.md --output docs/API文档_fixed.md\n\
  jumplint fix docs/API文档.md --dry-run\n"
    )]
    Fix {
        #[command(flatten)]
        doc: DocArgs,

        /// Output path (relative to ROOT unless absolute).
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Report the changes without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Remove inline HTML tags from heading lines.
        #[arg(long)]
        strip_heading_tags: bool,
    },

    /// Print the anchor a title produces.
    #[command(
        long_about = "Apply an anchor rule to one or more titles and print the result.\n\n\
Examples:\n\
  jumplint slug \"用户管理 🔧\"\n\
  jumplint slug \"User Management\" --rule slug\n"
    )]
    Slug {
        /// Titles to convert.
        #[arg(value_name = "TITLE", required = true, num_args = 1..)]
        titles: Vec<String>,

        /// Anchor rule (named/slug); overrides the config file.
        #[arg(long, value_name = "RULE")]
        rule: Option<RuleKind>,
    },
}

/// How a command finished, when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Clean,
    BrokenLinks,
}

impl Outcome {
    fn from_resolved(all_resolved: bool) -> Self {
        if all_resolved {
            Outcome::Clean
        } else {
            Outcome::BrokenLinks
        }
    }
}

pub fn run(cli: Cli) -> Result<Outcome> {
    let render_config = RenderConfig::new(cli.format)
        .with_pretty(cli.pretty)
        .with_color(!cli.no_color);

    // Get absolute root path
    let root = cli.root.canonicalize().unwrap_or(cli.root);
    let mut config = JumpConfig::load(&root, cli.config.as_deref())?;

    match cli.command {
        Commands::Headings { doc } => {
            doc.apply(&mut config);
            crate::anchors::api::run_headings(&root, &doc.input, &config, render_config)?;
            Ok(Outcome::Clean)
        }

        Commands::Links { doc } => {
            doc.apply(&mut config);
            crate::anchors::api::run_links(&root, &doc.input, &config, render_config)?;
            Ok(Outcome::Clean)
        }

        Commands::Check {
            doc,
            against,
            only_broken,
        } => {
            doc.apply(&mut config);
            if let Some(source) = against {
                config.against = source;
            }
            let detail = if only_broken {
                CheckDetail::Broken
            } else {
                CheckDetail::Full
            };
            crate::anchors::api::run_check(&root, &doc.input, &config, detail, render_config)
                .map(Outcome::from_resolved)
        }

        Commands::Fix {
            doc,
            output,
            dry_run,
            strip_heading_tags,
        } => {
            doc.apply(&mut config);
            config.strip_heading_tags |= strip_heading_tags;
            let target = FixTarget::new(
                &root,
                &doc.input,
                output.as_deref(),
                &config.output_suffix,
                dry_run,
            );
            crate::anchors::api::run_fix(&root, &doc.input, &target, &config, render_config)
                .map(Outcome::from_resolved)
        }

        Commands::Slug { titles, rule } => {
            let rule = rule.unwrap_or(config.rule);
            crate::anchors::api::run_slug(&titles, rule, render_config)?;
            Ok(Outcome::Clean)
        }
    }
}
