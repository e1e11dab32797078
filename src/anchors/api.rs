//! Anchor API - headings, links, check, fix and slug operations

use anyhow::{Context, Result};
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::anchors::lint::{checkable_links, reconcile, AnchorSource, KnownAnchors, Reconciliation};
use crate::anchors::parse::{extract_headings, ExtractedLinks, Heading};
use crate::anchors::rewrite::{rewrite_document, RewriteOptions, RewriteOutcome};
use crate::anchors::rule::{AnchorRule, RuleKind};
use crate::config::JumpConfig;
use crate::core::file_reader::{read_document, write_document, Document, FileReadConfig};
use crate::core::model::{Kind, Meta, ResultItem, ResultSet, Status};
use crate::core::paths::{default_output_path, display_path, ensure_distinct, resolve};
use crate::core::render::{RenderConfig, Renderer};
use crate::core::util::hash_bytes;

/// What `check` should print besides the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckDetail {
    /// Headings, links, anchors and every classification
    #[default]
    Full,
    /// Broken links only
    Broken,
}

/// Read the input document relative to root, logging its warnings
pub fn load_document(root: &Path, input: &Path, read_config: &FileReadConfig) -> Result<Document> {
    let path = resolve(root, input);
    let doc = read_document(&path, read_config)
        .with_context(|| format!("Failed to load document {}", path.display()))?;
    for w in &doc.warnings {
        warn!(path = %path.display(), code = w.code.as_str(), "{}", w.message);
    }
    debug!(path = %path.display(), bytes = doc.text.len(), hash = %doc.hash, "document loaded");
    Ok(doc)
}

/// Stamp every item with the document path and hash, keeping values already set
fn tag_items(result_set: ResultSet, path: &str, hash: &str) -> ResultSet {
    result_set
        .into_iter()
        .map(|item| {
            let item = match item.path {
                Some(_) => item,
                None => item.with_path(path),
            };
            match item.meta.hash {
                Some(_) => item,
                None => item.with_meta(Meta {
                    hash: Some(hash.to_string()),
                }),
            }
        })
        .collect()
}

fn warning_items(doc: &Document) -> Vec<ResultItem> {
    doc.warnings.iter().map(|w| w.to_result_item()).collect()
}

fn collect_headings(text: &str, max_level: u8) -> Vec<Heading> {
    extract_headings(text, max_level).collect()
}

/// Headings with their computed anchors
pub fn headings_report(doc: &Document, rule: RuleKind, max_level: u8) -> ResultSet {
    let headings = collect_headings(&doc.text, max_level);
    info!(headings = headings.len(), rule = rule.as_str(), "headings extracted");

    let mut result_set: ResultSet = warning_items(doc).into_iter().collect();
    result_set.extend(headings.iter().map(|h| h.to_result_item(&rule)));
    result_set
}

/// TOC links, named-anchor declarations and back-to-top links in source order
pub fn links_report(doc: &Document, back_label: &str) -> ResultSet {
    let links = ExtractedLinks::scan(&doc.text, back_label);
    info!(
        links = links.toc.len(),
        anchors = links.named.len(),
        back_to_top = links.back.len(),
        total = links.total(),
        "links extracted"
    );

    let mut result_set: ResultSet = warning_items(doc).into_iter().collect();
    result_set.extend(checkable_links(&links).iter().map(|l| l.to_result_item()));
    result_set.extend(links.named.iter().map(|l| l.to_result_item()));
    result_set
}

/// Reconcile the document's links against the selected anchor source
pub fn check_document(
    doc: &Document,
    config: &JumpConfig,
    source: AnchorSource,
) -> (Reconciliation, Vec<Heading>, ExtractedLinks) {
    let headings = collect_headings(&doc.text, config.max_level);
    let links = ExtractedLinks::scan(&doc.text, &config.back_to_top.label);
    let known = KnownAnchors::from_source(source, &headings, &links, &config.rule);
    let reconciliation = reconcile(
        &known,
        &checkable_links(&links),
        &config.back_to_top.anchor,
        source,
    );

    info!(
        headings = headings.len(),
        links = reconciliation.total(),
        known = reconciliation.known_count,
        broken = reconciliation.total() - reconciliation.resolved_count(),
        source = source.as_str(),
        "links reconciled"
    );
    (reconciliation, headings, links)
}

pub fn check_report(
    doc: &Document,
    config: &JumpConfig,
    source: AnchorSource,
    detail: CheckDetail,
) -> (ResultSet, bool) {
    let (reconciliation, headings, links) = check_document(doc, config, source);

    let mut result_set: ResultSet = warning_items(doc).into_iter().collect();
    result_set.extend(reconciliation.duplicate_items());
    match detail {
        CheckDetail::Full => {
            result_set.extend(headings.iter().map(|h| h.to_result_item(&config.rule)));
            result_set.extend(checkable_links(&links).iter().map(|l| l.to_result_item()));
            result_set.extend(links.named.iter().map(|l| l.to_result_item()));
            result_set.extend(reconciliation.checks.iter().map(|c| c.to_result_item()));
        }
        CheckDetail::Broken => {
            result_set.extend(reconciliation.broken().map(|c| c.to_result_item()));
        }
    }
    result_set.push(reconciliation.summary_item());

    (result_set, reconciliation.all_resolved())
}

/// Known anchors of a rewritten document: computed heading anchors plus
/// whatever the document still declares explicitly
fn rewritten_anchors(headings: &[Heading], links: &ExtractedLinks, rule: RuleKind) -> KnownAnchors {
    let mut seen = HashSet::new();
    KnownAnchors::new(
        headings
            .iter()
            .map(|h| h.anchor(&rule))
            .chain(links.declared_anchors())
            .filter(|a| seen.insert(a.clone())),
    )
}

/// Rewrite a document and reconcile the result
pub fn fix_document(doc: &Document, opts: &RewriteOptions) -> (RewriteOutcome, Reconciliation) {
    let outcome = rewrite_document(&doc.text, opts);
    for h in &outcome.headings {
        debug!(line = h.line, anchor = %h.anchor, "{}", h.title);
    }
    for entry in &outcome.unanchored {
        warn!(line = entry.line, href = %entry.href, "TOC entry '{}' produces no anchor", entry.text);
    }

    let headings = collect_headings(&outcome.text, opts.max_level);
    let links = ExtractedLinks::scan(&outcome.text, &opts.back_to_top.label);
    let known = rewritten_anchors(&headings, &links, opts.rule);
    let reconciliation = reconcile(
        &known,
        &checkable_links(&links),
        &opts.back_to_top.anchor,
        AnchorSource::Computed,
    );

    info!(
        changed = outcome.changes.len(),
        links = reconciliation.total(),
        broken = reconciliation.total() - reconciliation.resolved_count(),
        "document rewritten"
    );
    (outcome, reconciliation)
}

/// Where `fix` writes, and whether it actually writes
#[derive(Debug, Clone)]
pub struct FixTarget {
    pub output: PathBuf,
    pub dry_run: bool,
}

impl FixTarget {
    pub fn new(root: &Path, input: &Path, output: Option<&Path>, suffix: &str, dry_run: bool) -> Self {
        let input = resolve(root, input);
        let output = match output {
            Some(p) => resolve(root, p),
            None => default_output_path(&input, suffix),
        };
        Self { output, dry_run }
    }
}

pub fn fix_report(
    root: &Path,
    doc: &Document,
    config: &JumpConfig,
    target: &FixTarget,
) -> Result<(ResultSet, bool)> {
    ensure_distinct(&doc.path, &target.output)?;

    let (outcome, reconciliation) = fix_document(doc, &config.rewrite_options());
    let output_hash = hash_bytes(outcome.text.as_bytes());
    let output_display = display_path(&target.output, root);

    if target.dry_run {
        info!(output = %output_display, "dry run; nothing written");
    } else {
        write_document(&target.output, &outcome.text)
            .with_context(|| format!("Failed to write {}", target.output.display()))?;
        info!(output = %output_display, "rewritten document written");
    }

    let mut result_set: ResultSet = warning_items(doc).into_iter().collect();
    result_set.extend(outcome.changes.iter().map(|c| c.to_result_item()));
    result_set.extend(outcome.unanchored.iter().map(|e| e.to_result_item()));
    result_set.extend(reconciliation.broken().map(|c| c.to_result_item()));

    let verb = if target.dry_run { "would write" } else { "wrote" };
    let status = if reconciliation.all_resolved() {
        Status::Resolved
    } else {
        Status::Broken
    };
    result_set.push(
        ResultItem::new(Kind::Summary)
            .with_excerpt(format!(
                "{} line(s) changed; {} {}",
                outcome.changes.len(),
                verb,
                output_display
            ))
            .with_status(status)
            .with_meta(Meta {
                hash: Some(output_hash.clone()),
            })
            .with_data(json!({
                "output": output_display,
                "changed": outcome.changes.len(),
                "unchanged": outcome.is_unchanged(),
                "unanchored": outcome.unanchored.len(),
                "dry_run": target.dry_run,
                "input_hash": doc.hash,
                "output_hash": output_hash,
            })),
    );
    result_set.push(reconciliation.summary_item());

    Ok((result_set, reconciliation.all_resolved()))
}

/// Anchor for each title under a rule
pub fn slug_report(titles: &[String], rule: RuleKind) -> ResultSet {
    titles
        .iter()
        .map(|title| {
            let anchor = rule.apply(title);
            ResultItem::new(Kind::Slug)
                .with_excerpt(format!("{} -> #{}", title, anchor))
                .with_data(json!({
                    "rule": rule.as_str(),
                    "title": title,
                    "anchor": anchor,
                }))
        })
        .collect()
}

fn emit(result_set: &ResultSet, render_config: RenderConfig) -> Result<()> {
    debug!(items = result_set.len(), format = ?render_config.format, "rendering");
    let renderer = Renderer::with_config(render_config);
    renderer
        .render_to(result_set, std::io::stdout().lock())
        .context("Failed to write report")
}

fn emit_for(
    result_set: ResultSet,
    root: &Path,
    doc: &Document,
    render_config: RenderConfig,
) -> Result<()> {
    let result_set = tag_items(result_set, &display_path(&doc.path, root), &doc.hash);
    emit(&result_set, render_config)
}

/// Run headings command
pub fn run_headings(
    root: &Path,
    input: &Path,
    config: &JumpConfig,
    render_config: RenderConfig,
) -> Result<()> {
    let doc = load_document(root, input, &config.read_config())?;
    let result_set = headings_report(&doc, config.rule, config.max_level);
    emit_for(result_set, root, &doc, render_config)
}

/// Run links command
pub fn run_links(
    root: &Path,
    input: &Path,
    config: &JumpConfig,
    render_config: RenderConfig,
) -> Result<()> {
    let doc = load_document(root, input, &config.read_config())?;
    let result_set = links_report(&doc, &config.back_to_top.label);
    emit_for(result_set, root, &doc, render_config)
}

/// Run check command; returns true when every link resolved
pub fn run_check(
    root: &Path,
    input: &Path,
    config: &JumpConfig,
    detail: CheckDetail,
    render_config: RenderConfig,
) -> Result<bool> {
    let doc = load_document(root, input, &config.read_config())?;
    let (result_set, ok) = check_report(&doc, config, config.against, detail);
    emit_for(result_set, root, &doc, render_config)?;
    Ok(ok)
}

/// Run fix command; returns true when the rewritten document has no broken links
pub fn run_fix(
    root: &Path,
    input: &Path,
    target: &FixTarget,
    config: &JumpConfig,
    render_config: RenderConfig,
) -> Result<bool> {
    let doc = load_document(root, input, &config.read_config())?;
    let (result_set, ok) = fix_report(root, &doc, config, target)?;
    emit_for(result_set, root, &doc, render_config)?;
    Ok(ok)
}

/// Run slug command
pub fn run_slug(titles: &[String], rule: RuleKind, render_config: RenderConfig) -> Result<()> {
    emit(&slug_report(titles, rule), render_config)
}
