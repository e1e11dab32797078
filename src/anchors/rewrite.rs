//! Document rewriting
//!
//! Single linear pass over the lines of a document:
//! - TOC entries (`- [text](#href)`) get `href` recomputed from the display text,
//!   unless a configured override matches first
//! - Back-to-top links are pointed at the canonical anchor
//! - Named anchors on (or directly above) a heading are renamed to the heading's anchor
//! - Heading lines are kept as written (inline tags optionally stripped)
//!
//! Everything else passes through untouched. Running the pass on its own output
//! changes nothing. A TOC entry whose text yields no anchor keeps its href and is
//! reported as unanchored.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;

use crate::anchors::parse::{heading_level, NAMED_ANCHOR_RE, TOC_LINK_RE};
use crate::anchors::rule::{clean_text, strip_html_tags, AnchorRule, RuleKind};
use crate::core::model::{JumpIssue, Kind, ResultItem};
use crate::core::util::LineEnding;

/// Default back-to-top label
pub const DEFAULT_BACK_LABEL: &str = "🔝 返回目录";

/// Default canonical table-of-contents anchor
pub const DEFAULT_BACK_ANCHOR: &str = "📑-目录";

/// Forces a fixed anchor for TOC entries matching a display-text pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    /// Substring the display text must contain
    pub text_contains: String,

    /// Substring the existing href must contain (case-insensitive), if set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href_contains: Option<String>,

    /// Anchor to use, without `#`
    pub anchor: String,
}

impl Override {
    pub fn matches(&self, text: &str, href: &str) -> bool {
        text.contains(&self.text_contains)
            && self
                .href_contains
                .as_ref()
                .map_or(true, |needle| href.to_lowercase().contains(&needle.to_lowercase()))
    }
}

/// The back-to-top convention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackToTop {
    /// Fixed display text of the link
    pub label: String,
    /// Canonical anchor, without `#`
    pub anchor: String,
}

impl Default for BackToTop {
    fn default() -> Self {
        Self {
            label: DEFAULT_BACK_LABEL.to_string(),
            anchor: DEFAULT_BACK_ANCHOR.to_string(),
        }
    }
}

impl BackToTop {
    /// Matches `[label]` with an optional `(href)`
    fn line_regex(&self) -> Regex {
        // The label is escaped, so the pattern is always valid
        Regex::new(&format!(r"\[{}\](?:\([^)]*\))?", regex::escape(&self.label)))
            .expect("Invalid back-to-top line regex")
    }

    fn canonical_link(&self) -> String {
        format!("[{}](#{})", self.label, self.anchor)
    }
}

#[derive(Debug, Clone)]
pub struct RewriteOptions {
    pub rule: RuleKind,
    /// Consulted in order; first match wins
    pub overrides: Vec<Override>,
    pub back_to_top: BackToTop,
    pub strip_heading_tags: bool,
    pub max_level: u8,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            rule: RuleKind::default(),
            overrides: Vec::new(),
            back_to_top: BackToTop::default(),
            strip_heading_tags: false,
            max_level: 3,
        }
    }
}

/// What caused a line to change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    TocLink,
    Override,
    BackToTop,
    NamedAnchor,
    HeadingTags,
}

impl ChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeReason::TocLink => "toc_link",
            ChangeReason::Override => "override",
            ChangeReason::BackToTop => "back_to_top",
            ChangeReason::NamedAnchor => "named_anchor",
            ChangeReason::HeadingTags => "heading_tags",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChange {
    pub line: u32,
    pub reason: ChangeReason,
    pub before: String,
    pub after: String,
}

impl LineChange {
    pub fn to_result_item(&self) -> ResultItem {
        ResultItem::new(Kind::Rewrite)
            .with_line(self.line)
            .with_excerpt(format!("{} => {}", self.before.trim(), self.after.trim()))
            .with_data(json!({
                "reason": self.reason.as_str(),
                "before": self.before,
                "after": self.after,
            }))
    }
}

/// Heading title and the anchor it maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingAnchor {
    pub line: u32,
    pub title: String,
    pub anchor: String,
}

/// TOC entry whose display text produces an empty anchor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnanchoredEntry {
    pub line: u32,
    pub text: String,
    pub href: String,
}

impl UnanchoredEntry {
    pub fn to_result_item(&self) -> ResultItem {
        ResultItem::error(JumpIssue::new(
            "EMPTY_ANCHOR",
            format!(
                "'{}' produces no anchor; kept '{}'",
                self.text, self.href
            ),
        ))
        .with_line(self.line)
    }
}

#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub text: String,
    pub changes: Vec<LineChange>,
    pub headings: Vec<HeadingAnchor>,
    pub unanchored: Vec<UnanchoredEntry>,
}

impl RewriteOutcome {
    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Anchor the rule computes for TOC display text
///
/// The named rule sees the text cleaned to its own character set; the slug rule
/// sees it with tags removed, exactly like a heading title.
pub fn display_anchor(text: &str, rule: RuleKind) -> String {
    match rule {
        RuleKind::Named => rule.apply(&clean_text(text)),
        RuleKind::Slug => rule.apply(strip_html_tags(text).trim()),
    }
}

/// Anchor for a TOC entry: first matching override, else the rule on the display text
///
/// An href already equal to the computed anchor is settled: overrides that
/// depend on `href_contains` no longer apply to it. `None` when neither an
/// override nor the rule yields an anchor.
pub fn toc_anchor(text: &str, href: &str, opts: &RewriteOptions) -> Option<(String, ChangeReason)> {
    let computed = display_anchor(text, opts.rule);
    let settled = !computed.is_empty() && href.strip_prefix('#') == Some(computed.as_str());

    let chosen = opts
        .overrides
        .iter()
        .filter(|o| !(settled && o.href_contains.is_some()))
        .find(|o| o.matches(text, href));
    match chosen {
        Some(o) => Some((o.anchor.clone(), ChangeReason::Override)),
        None if computed.is_empty() => None,
        None => Some((computed, ChangeReason::TocLink)),
    }
}

fn is_toc_line(line: &str) -> bool {
    line.trim_start().starts_with("- [") && line.contains("](")
}

/// A line holding nothing but HTML tags
fn is_tag_only(line: &str) -> bool {
    !line.trim().is_empty() && strip_html_tags(line).trim().is_empty()
}

/// Rename every named anchor in `line` to `anchor`, leaving fixed anchors alone
fn rename_named_anchors(line: &str, anchor: &str, fixed: &HashSet<&str>) -> String {
    NAMED_ANCHOR_RE
        .replace_all(line, |caps: &regex::Captures| {
            let whole = &caps[0];
            match (caps.get(0), caps.get(1)) {
                (Some(m), Some(name)) if !fixed.contains(name.as_str()) => {
                    let start = name.start() - m.start();
                    let end = name.end() - m.start();
                    format!("{}{}{}", &whole[..start], anchor, &whole[end..])
                }
                _ => whole.to_string(),
            }
        })
        .into_owned()
}

fn heading_anchor_of(line: &str, opts: &RewriteOptions) -> Option<String> {
    let level = heading_level(line, opts.max_level)?;
    let title = line[level as usize + 1..].trim();
    Some(opts.rule.apply(strip_html_tags(title).trim()))
}

/// Rewrite a document
pub fn rewrite_document(text: &str, opts: &RewriteOptions) -> RewriteOutcome {
    let ending = LineEnding::detect(text);
    let lines: Vec<&str> = text.lines().collect();
    let back_re = opts.back_to_top.line_regex();
    let back_marker = format!("[{}]", opts.back_to_top.label);

    // Anchors pinned by configuration keep their declarations
    let fixed: HashSet<&str> = opts
        .overrides
        .iter()
        .map(|o| o.anchor.as_str())
        .chain(std::iter::once(opts.back_to_top.anchor.as_str()))
        .collect();

    let mut out = Vec::with_capacity(lines.len());
    let mut changes = Vec::new();
    let mut headings = Vec::new();
    let mut unanchored = Vec::new();

    for (idx, &line) in lines.iter().enumerate() {
        let line_no = idx as u32 + 1;
        let mut record = |after: String, reason: ChangeReason| {
            if after != line {
                changes.push(LineChange {
                    line: line_no,
                    reason,
                    before: line.to_string(),
                    after: after.clone(),
                });
            }
            after
        };

        let new_line = if let Some(level) = heading_level(line, opts.max_level) {
            let title = line[level as usize + 1..].trim();
            let clean = strip_html_tags(title).trim().to_string();
            let anchor = opts.rule.apply(&clean);
            headings.push(HeadingAnchor {
                line: line_no,
                title: clean.clone(),
                anchor: anchor.clone(),
            });

            if opts.strip_heading_tags && clean != title {
                let marker = "#".repeat(level as usize);
                record(format!("{} {}", marker, clean), ChangeReason::HeadingTags)
            } else if NAMED_ANCHOR_RE.is_match(line) {
                record(rename_named_anchors(line, &anchor, &fixed), ChangeReason::NamedAnchor)
            } else {
                line.to_string()
            }
        } else if line.contains(&back_marker) {
            let after = back_re
                .replace_all(line, opts.back_to_top.canonical_link().as_str())
                .into_owned();
            record(after, ChangeReason::BackToTop)
        } else if is_toc_line(line) {
            match TOC_LINK_RE.captures(line) {
                Some(caps) => {
                    let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
                    let text = &caps[1];
                    let href = format!("#{}", &caps[2]);
                    match toc_anchor(text, &href, opts) {
                        Some((anchor, reason)) => {
                            let mut after = String::with_capacity(line.len());
                            after.push_str(&line[..whole.start]);
                            after.push_str(&format!("[{}](#{})", text, anchor));
                            after.push_str(&line[whole.end..]);
                            record(after, reason)
                        }
                        None => {
                            unanchored.push(UnanchoredEntry {
                                line: line_no,
                                text: text.to_string(),
                                href,
                            });
                            line.to_string()
                        }
                    }
                }
                None => line.to_string(),
            }
        } else if is_tag_only(line) && NAMED_ANCHOR_RE.is_match(line) {
            match lines
                .get(idx + 1)
                .and_then(|next| heading_anchor_of(next, opts))
            {
                Some(anchor) => {
                    record(rename_named_anchors(line, &anchor, &fixed), ChangeReason::NamedAnchor)
                }
                None => line.to_string(),
            }
        } else {
            line.to_string()
        };

        out.push(new_line);
    }

    let mut text_out = out.join(ending.as_str());
    if text.ends_with('\n') {
        text_out.push_str(ending.as_str());
    }

    RewriteOutcome {
        text: text_out,
        changes,
        headings,
        unanchored,
    }
}
