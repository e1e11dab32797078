//! Heading and link extraction
//!
//! Tolerant scanners over the raw document text. Anything that does not match a
//! pattern is simply absent from the results; nothing here can fail.
//!
//! Headings:      `## Title`, `### Title`, `#### Title` (marker at column 0, one space)
//! TOC links:     `[text](#target)`
//! Named anchors: `<a name="target"></a>`
//! Back-to-top:   `[<label>](#target)` with a fixed label

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::anchors::rule::{strip_html_tags, AnchorRule};
use crate::core::model::{Kind, ResultItem};

/// Static regex for generic internal links
/// Format: [display text](#target)
pub static TOC_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]]+)\]\(#([^)]+)\)").expect("Invalid TOC_LINK_RE regex")
});

/// Static regex for named-anchor declarations
/// Format: <a name="target"></a>
pub static NAMED_ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a\s+(?:[^>]*?\s)?name\s*=\s*["']([^"']+)["'][^>]*>"#)
        .expect("Invalid NAMED_ANCHOR_RE regex")
});

/// Lowest heading level considered
pub const MIN_LEVEL: u8 = 2;

/// A heading line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// 2, 3 or 4
    pub level: u8,

    /// Text after the marker, trimmed; may still carry inline markup
    pub title: String,

    /// 1-indexed
    pub line: u32,
}

impl Heading {
    /// Title with inline HTML tags removed, as used for anchor computation
    pub fn clean_title(&self) -> String {
        strip_html_tags(&self.title).trim().to_string()
    }

    /// Anchor this heading produces under a rule
    pub fn anchor(&self, rule: &impl AnchorRule) -> String {
        rule.apply(&self.clean_title())
    }

    pub fn to_result_item(&self, rule: &impl AnchorRule) -> ResultItem {
        let anchor = self.anchor(rule);
        ResultItem::new(Kind::Heading)
            .with_line(self.line)
            .with_excerpt(format!(
                "{} {} -> #{}",
                "#".repeat(self.level as usize),
                self.title,
                anchor
            ))
            .with_data(json!({
                "level": self.level,
                "title": self.title,
                "anchor": anchor,
            }))
    }
}

/// How a link was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// `[text](#target)`
    Toc,
    /// `<a name="target">`
    NamedAnchor,
    /// Back-to-top link with the fixed label
    BackToTop,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Toc => "toc",
            LinkKind::NamedAnchor => "named_anchor",
            LinkKind::BackToTop => "back_to_top",
        }
    }
}

/// A link or anchor declaration found in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub kind: LinkKind,

    /// Display text; `None` for named-anchor declarations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Target without the leading `#`
    pub target: String,

    /// 1-indexed line of the match start
    pub line: u32,

    /// Byte offset of the match start
    pub offset: usize,
}

impl Link {
    pub fn to_result_item(&self) -> ResultItem {
        let kind = match self.kind {
            LinkKind::NamedAnchor => Kind::Anchor,
            LinkKind::Toc | LinkKind::BackToTop => Kind::Link,
        };
        ResultItem::new(kind)
            .with_line(self.line)
            .with_excerpt(self.describe())
            .with_data(json!({
                "link_kind": self.kind.as_str(),
                "text": self.text,
                "target": self.target,
            }))
    }

    /// `[text] -> #target` or `<a name="target">`
    pub fn describe(&self) -> String {
        match (&self.kind, &self.text) {
            (LinkKind::NamedAnchor, _) | (_, None) => format!("<a name=\"{}\">", self.target),
            (_, Some(text)) => format!("[{}] -> #{}", text, self.target),
        }
    }
}

/// Byte offset to line number lookup
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    /// 1-indexed line containing `offset`
    pub fn line_of(&self, offset: usize) -> u32 {
        self.starts.partition_point(|&start| start <= offset) as u32
    }
}

/// Heading level of a single line, if it is a heading within `max_level`
pub fn heading_level(line: &str, max_level: u8) -> Option<u8> {
    (MIN_LEVEL..=max_level).find(|&level| {
        let marker = "#".repeat(level as usize);
        line.strip_prefix(marker.as_str())
            .is_some_and(|rest| rest.starts_with(' '))
    })
}

/// Lazily yield every heading of level 2..=max_level in document order
pub fn extract_headings(text: &str, max_level: u8) -> impl Iterator<Item = Heading> + '_ {
    text.lines().enumerate().filter_map(move |(idx, line)| {
        let level = heading_level(line, max_level)?;
        let title = line[level as usize + 1..].trim().to_string();
        Some(Heading {
            level,
            title,
            line: idx as u32 + 1,
        })
    })
}

/// Every `[text](#target)` occurrence
pub fn extract_toc_links(text: &str) -> Vec<Link> {
    let index = LineIndex::new(text);
    TOC_LINK_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Link {
                kind: LinkKind::Toc,
                text: Some(caps.get(1)?.as_str().to_string()),
                target: caps.get(2)?.as_str().to_string(),
                line: index.line_of(whole.start()),
                offset: whole.start(),
            })
        })
        .collect()
}

/// Every `<a name="...">` declaration
pub fn extract_named_anchors(text: &str) -> Vec<Link> {
    let index = LineIndex::new(text);
    NAMED_ANCHOR_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Link {
                kind: LinkKind::NamedAnchor,
                text: None,
                target: caps.get(1)?.as_str().to_string(),
                line: index.line_of(whole.start()),
                offset: whole.start(),
            })
        })
        .collect()
}

/// Regex for back-to-top links carrying `label`
pub fn back_link_regex(label: &str) -> Regex {
    // The label is escaped, so the pattern is always valid
    Regex::new(&format!(r"\[{}\]\(#([^)]+)\)", regex::escape(label)))
        .expect("Invalid back-to-top regex")
}

/// Every back-to-top link carrying `label`
pub fn extract_back_links(text: &str, label: &str) -> Vec<Link> {
    let index = LineIndex::new(text);
    back_link_regex(label)
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Link {
                kind: LinkKind::BackToTop,
                text: Some(label.to_string()),
                target: caps.get(1)?.as_str().to_string(),
                line: index.line_of(whole.start()),
                offset: whole.start(),
            })
        })
        .collect()
}

/// All three scans, independently
#[derive(Debug, Clone, Default)]
pub struct ExtractedLinks {
    pub toc: Vec<Link>,
    pub named: Vec<Link>,
    pub back: Vec<Link>,
}

impl ExtractedLinks {
    pub fn scan(text: &str, back_label: &str) -> Self {
        Self {
            toc: extract_toc_links(text),
            named: extract_named_anchors(text),
            back: extract_back_links(text, back_label),
        }
    }

    /// Declared anchor names in document order
    pub fn declared_anchors(&self) -> Vec<String> {
        self.named.iter().map(|l| l.target.clone()).collect()
    }

    pub fn total(&self) -> usize {
        self.toc.len() + self.named.len() + self.back.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::rule::RuleKind;

    const DOC: &str = r#"# API 文档

<a name="📑-目录"></a>
## 📑 目录

- [用户管理](#用户管理)
- [图床管理](#图床管理)
  - [上传图片](#上传图片)

<a name="用户管理"></a>
## 用户管理 🔧

### 登录 <code>POST</code>

[🔝 返回目录](#📑-目录)

#### 请求参数
Inline # not a heading
##Not a heading either
"#;

    #[test]
    fn test_extract_headings() {
        let headings: Vec<_> = extract_headings(DOC, 3).collect();
        assert_eq!(headings.len(), 3);
        assert_eq!(headings[0].level, 2);
        assert_eq!(headings[0].title, "📑 目录");
        assert_eq!(headings[0].line, 4);
        assert_eq!(headings[1].title, "用户管理 🔧");
        assert_eq!(headings[2].level, 3);
        assert_eq!(headings[2].title, "登录 <code>POST</code>");
    }

    #[test]
    fn test_extract_headings_level_four() {
        let headings: Vec<_> = extract_headings(DOC, 4).collect();
        assert_eq!(headings.len(), 4);
        assert_eq!(headings[3].level, 4);
        assert_eq!(headings[3].title, "请求参数");
        assert_eq!(headings[3].line, 17);
    }

    #[test]
    fn test_heading_level_prefix_grammar() {
        assert_eq!(heading_level("## A", 4), Some(2));
        assert_eq!(heading_level("### A", 4), Some(3));
        assert_eq!(heading_level("#### A", 3), None);
        assert_eq!(heading_level("# A", 4), None);
        assert_eq!(heading_level("##A", 4), None);
        assert_eq!(heading_level(" ## A", 4), None);
        assert_eq!(heading_level("##### A", 4), None);
        assert_eq!(heading_level("text ## A", 4), None);
    }

    #[test]
    fn test_duplicate_titles_all_yielded() {
        let doc = "## 文章管理\n### 文章管理\n## 文章管理\n";
        let headings: Vec<_> = extract_headings(doc, 3).collect();
        assert_eq!(headings.len(), 3);
        assert!(headings.iter().all(|h| h.title == "文章管理"));
    }

    #[test]
    fn test_crlf_headings() {
        let doc = "## One  \r\n### Two\r\n";
        let headings: Vec<_> = extract_headings(doc, 3).collect();
        assert_eq!(headings[0].title, "One");
        assert_eq!(headings[1].title, "Two");
    }

    #[test]
    fn test_heading_anchor_strips_tags() {
        let headings: Vec<_> = extract_headings(DOC, 3).collect();
        assert_eq!(headings[2].clean_title(), "登录 POST");
        assert_eq!(headings[2].anchor(&RuleKind::Named), "登录-post");
        assert_eq!(headings[1].anchor(&RuleKind::Slug), "用户管理");
    }

    #[test]
    fn test_extract_toc_links() {
        let links = extract_toc_links(DOC);
        // includes the back-to-top link: scans are independent
        assert_eq!(links.len(), 4);
        assert_eq!(links[0].text.as_deref(), Some("用户管理"));
        assert_eq!(links[0].target, "用户管理");
        assert_eq!(links[0].line, 6);
        assert_eq!(links[3].text.as_deref(), Some("🔝 返回目录"));
    }

    #[test]
    fn test_toc_link_ignores_external_and_nested() {
        let links = extract_toc_links("[site](https://x.io) [a]b](#c) [x](#)");
        // `[a]b](#c)` cannot match because `]` ends the display text early
        assert!(links.is_empty());
    }

    #[test]
    fn test_extract_named_anchors() {
        let anchors = extract_named_anchors(DOC);
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].target, "📑-目录");
        assert_eq!(anchors[0].line, 3);
        assert_eq!(anchors[1].target, "用户管理");
        assert!(anchors[1].text.is_none());
    }

    #[test]
    fn test_named_anchor_variants() {
        let doc = r##"<a id="x" name='单引号'></a> <a  name="spaced" ></a> <a href="#no">"##;
        let anchors = extract_named_anchors(doc);
        let names: Vec<_> = anchors.iter().map(|a| a.target.as_str()).collect();
        assert_eq!(names, vec!["单引号", "spaced"]);
    }

    #[test]
    fn test_extract_back_links() {
        let links = extract_back_links(DOC, "🔝 返回目录");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].kind, LinkKind::BackToTop);
        assert_eq!(links[0].target, "📑-目录");
        assert_eq!(links[0].line, 15);
    }

    #[test]
    fn test_back_link_label_is_literal() {
        let links = extract_back_links("[Top (up)](#toc)", "Top (up)");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, "toc");
    }

    #[test]
    fn test_extracted_links_scan() {
        let links = ExtractedLinks::scan(DOC, "🔝 返回目录");
        assert_eq!(links.total(), 7);
        assert_eq!(links.declared_anchors(), vec!["📑-目录", "用户管理"]);
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(extract_headings("", 4).count(), 0);
        assert_eq!(ExtractedLinks::scan("", "🔝 返回目录").total(), 0);
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("a\nbb\n\nc");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(2), 2);
        assert_eq!(index.line_of(5), 3);
        assert_eq!(index.line_of(6), 4);
    }

    #[test]
    fn test_link_describe() {
        let links = ExtractedLinks::scan(DOC, "🔝 返回目录");
        assert_eq!(links.toc[0].describe(), "[用户管理] -> #用户管理");
        assert_eq!(links.named[0].describe(), "<a name=\"📑-目录\">");
        assert_eq!(links.named[0].to_result_item().kind, Kind::Anchor);
    }
}
