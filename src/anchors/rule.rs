//! Anchor ID generation rules
//!
//! Two conventions coexist and must never be mixed within one comparison:
//! - `named`: the identifier written into explicit `<a name="...">` declarations.
//!   Keeps CJK ideographs, ASCII letters and digits; whitespace runs become `-`.
//! - `slug`: the identifier a renderer derives from heading text.
//!   Keeps word characters, CJK ideographs and kana; hyphens are collapsed and trimmed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Inline HTML tags such as `<a name="x">`, `</a>`, `<br/>`
pub static HTML_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("Invalid HTML_TAG_RE regex"));

/// Capability shared by both rules: map a heading title to an anchor id
pub trait AnchorRule {
    fn apply(&self, title: &str) -> String;
}

/// Selectable anchor-generation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Explicit named-anchor convention
    #[default]
    Named,
    /// Renderer slug convention
    Slug,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Named => "named",
            RuleKind::Slug => "slug",
        }
    }
}

impl std::str::FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "named" | "a" | "html" => Ok(RuleKind::Named),
            "slug" | "b" | "gfm" => Ok(RuleKind::Slug),
            _ => Err(format!("Unknown anchor rule: {}", s)),
        }
    }
}

impl AnchorRule for RuleKind {
    fn apply(&self, title: &str) -> String {
        match self {
            RuleKind::Named => named_anchor(title),
            RuleKind::Slug => slug_anchor(title),
        }
    }
}

/// CJK Unified Ideographs and Extension A
#[inline]
fn is_cjk_ideograph(c: char) -> bool {
    let cp = c as u32;
    (0x4E00..=0x9FFF).contains(&cp) || (0x3400..=0x4DBF).contains(&cp)
}

/// Hiragana and Katakana
#[inline]
fn is_kana(c: char) -> bool {
    (0x3040..=0x30FF).contains(&(c as u32))
}

/// Remove HTML-tag-shaped substrings
pub fn strip_html_tags(text: &str) -> String {
    HTML_TAG_RE.replace_all(text, "").into_owned()
}

/// Replace every whitespace run with a single hyphen
fn hyphenate_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Characters kept by the named-anchor rule
///
/// Hyphens survive so the rule is stable on its own output.
#[inline]
fn keep_for_named(c: char) -> bool {
    is_cjk_ideograph(c) || c.is_ascii_alphanumeric() || c.is_whitespace() || c == '-'
}

/// Clean display text the way TOC entries are cleaned before anchoring:
/// tags removed, characters outside CJK/ASCII alphanumerics/space dropped, trimmed.
pub fn clean_text(text: &str) -> String {
    strip_html_tags(text)
        .chars()
        .filter(|&c| keep_for_named(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Named-anchor rule
pub fn named_anchor(title: &str) -> String {
    hyphenate_whitespace(&clean_text(title)).to_ascii_lowercase()
}

/// Slug rule
pub fn slug_anchor(title: &str) -> String {
    let filtered: String = title
        .to_lowercase()
        .chars()
        .filter(|&c| {
            c.is_alphanumeric()
                || c == '_'
                || c == '-'
                || c == ' '
                || is_cjk_ideograph(c)
                || is_kana(c)
        })
        .collect();

    hyphenate_whitespace(&filtered)
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
