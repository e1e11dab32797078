//! Link/anchor reconciliation
//!
//! Checks for:
//! - Links whose target is not a known anchor
//! - Back-to-top links not pointing at the canonical anchor
//! - Duplicate anchors (reported as warnings, never affect the outcome)
//!
//! Pure report generation: inputs are borrowed and never mutated.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};

use crate::anchors::parse::{ExtractedLinks, Heading, Link, LinkKind};
use crate::anchors::rule::AnchorRule;
use crate::core::model::{JumpIssue, Kind, ResultItem, Status};

/// Where the known anchors come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorSource {
    /// `<a name="...">` declarations
    #[default]
    Declared,
    /// Rule applied to each heading's cleaned title
    Computed,
    /// Raw heading titles matched literally
    Titles,
}

impl AnchorSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorSource::Declared => "declared",
            AnchorSource::Computed => "computed",
            AnchorSource::Titles => "titles",
        }
    }
}

impl std::str::FromStr for AnchorSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "declared" => Ok(AnchorSource::Declared),
            "computed" => Ok(AnchorSource::Computed),
            "titles" => Ok(AnchorSource::Titles),
            _ => Err(format!("Unknown anchor source: {}", s)),
        }
    }
}

/// The anchors a link may resolve to
///
/// Duplicates are kept in `anchors`; membership is all the reconciler relies on.
#[derive(Debug, Clone, Default)]
pub struct KnownAnchors {
    anchors: Vec<String>,
    set: HashSet<String>,
}

impl KnownAnchors {
    pub fn new(anchors: impl IntoIterator<Item = String>) -> Self {
        let anchors: Vec<String> = anchors.into_iter().collect();
        let set = anchors.iter().cloned().collect();
        Self { anchors, set }
    }

    pub fn declared(links: &ExtractedLinks) -> Self {
        Self::new(links.declared_anchors())
    }

    pub fn computed(headings: &[Heading], rule: &impl AnchorRule) -> Self {
        Self::new(headings.iter().map(|h| h.anchor(rule)))
    }

    pub fn titles(headings: &[Heading]) -> Self {
        Self::new(headings.iter().map(|h| h.title.clone()))
    }

    /// Build from the selected source
    pub fn from_source(
        source: AnchorSource,
        headings: &[Heading],
        links: &ExtractedLinks,
        rule: &impl AnchorRule,
    ) -> Self {
        match source {
            AnchorSource::Declared => Self::declared(links),
            AnchorSource::Computed => Self::computed(headings, rule),
            AnchorSource::Titles => Self::titles(headings),
        }
    }

    pub fn contains(&self, target: &str) -> bool {
        self.set.contains(target)
    }

    /// Anchors that contain `target` or are contained in it (case-sensitive)
    ///
    /// Empty anchors are never candidates.
    pub fn similar_to(&self, target: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.anchors
            .iter()
            .filter(|a| !a.is_empty())
            .filter(|a| a.contains(target) || target.contains(a.as_str()))
            .filter(|a| seen.insert(*a))
            .cloned()
            .collect()
    }

    /// Anchors occurring more than once, with their count, in first-seen order
    pub fn duplicates(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for anchor in &self.anchors {
            *counts.entry(anchor.as_str()).or_default() += 1;
        }

        let mut seen = HashSet::new();
        self.anchors
            .iter()
            .filter(|a| counts[a.as_str()] > 1 && seen.insert(*a))
            .map(|a| (a.clone(), counts[a.as_str()]))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }
}

/// Why a link is broken
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BrokenReason {
    /// Target is not a known anchor
    Missing,
    /// Back-to-top link pointing somewhere other than the canonical anchor
    WrongTarget { expected: String },
}

impl BrokenReason {
    pub fn code(&self) -> &'static str {
        match self {
            BrokenReason::Missing => "BROKEN_LINK",
            BrokenReason::WrongTarget { .. } => "WRONG_BACK_TARGET",
        }
    }

    pub fn message(&self, link: &Link) -> String {
        match self {
            BrokenReason::Missing => format!("Anchor '#{}' does not exist", link.target),
            BrokenReason::WrongTarget { expected } => format!(
                "Back-to-top link points at '#{}', expected '#{}'",
                link.target, expected
            ),
        }
    }
}

/// Classification of one link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCheck {
    pub link: Link,
    pub broken: Option<BrokenReason>,
    /// Near-match hints; empty for resolved links
    pub similar: Vec<String>,
}

impl LinkCheck {
    pub fn is_resolved(&self) -> bool {
        self.broken.is_none()
    }

    pub fn to_result_item(&self) -> ResultItem {
        let status = if self.is_resolved() {
            Status::Resolved
        } else {
            Status::Broken
        };

        let mut item = ResultItem::new(Kind::Check)
            .with_line(self.link.line)
            .with_excerpt(self.link.describe())
            .with_status(status)
            .with_data(json!({
                "link_kind": self.link.kind.as_str(),
                "text": self.link.text,
                "target": self.link.target,
                "similar": self.similar,
            }));

        if let Some(reason) = &self.broken {
            item = item.with_error(JumpIssue::new(reason.code(), reason.message(&self.link)));
        }
        item
    }
}

/// Result of reconciling a document's links against its known anchors
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub source: AnchorSource,
    pub checks: Vec<LinkCheck>,
    pub known_count: usize,
    pub duplicates: Vec<(String, usize)>,
}

impl Reconciliation {
    pub fn total(&self) -> usize {
        self.checks.len()
    }

    pub fn resolved_count(&self) -> usize {
        self.checks.iter().filter(|c| c.is_resolved()).count()
    }

    pub fn broken(&self) -> impl Iterator<Item = &LinkCheck> {
        self.checks.iter().filter(|c| !c.is_resolved())
    }

    /// True when every link resolved (vacuously true with no links)
    pub fn all_resolved(&self) -> bool {
        self.broken().next().is_none()
    }

    /// Back-to-top checks only
    pub fn back_to_top(&self) -> impl Iterator<Item = &LinkCheck> {
        self.checks
            .iter()
            .filter(|c| c.link.kind == LinkKind::BackToTop)
    }

    /// Warnings for duplicate anchors
    pub fn duplicate_items(&self) -> Vec<ResultItem> {
        self.duplicates
            .iter()
            .map(|(anchor, count)| {
                ResultItem::error(JumpIssue::new(
                    "DUPLICATE_ANCHOR",
                    format!("Anchor '#{}' is produced {} times", anchor, count),
                ))
            })
            .collect()
    }

    pub fn summary_item(&self) -> ResultItem {
        let back_total = self.back_to_top().count();
        let back_resolved = self.back_to_top().filter(|c| c.is_resolved()).count();
        let status = if self.all_resolved() {
            Status::Resolved
        } else {
            Status::Broken
        };

        let verdict = if self.all_resolved() {
            "all links resolved"
        } else {
            "broken links found"
        };

        ResultItem::new(Kind::Summary)
            .with_excerpt(format!(
                "{}/{} links resolved against {} {} anchors ({} back-to-top, {} ok): {}",
                self.resolved_count(),
                self.total(),
                self.known_count,
                self.source.as_str(),
                back_total,
                back_resolved,
                verdict
            ))
            .with_status(status)
            .with_data(json!({
                "source": self.source.as_str(),
                "known_anchors": self.known_count,
                "total": self.total(),
                "resolved": self.resolved_count(),
                "broken": self.total() - self.resolved_count(),
                "back_to_top_total": back_total,
                "back_to_top_resolved": back_resolved,
            }))
    }
}

/// Links to classify: TOC links plus back-to-top links, each occurrence once
///
/// A back-to-top link also matches the generic TOC pattern; the generic match
/// at the same offset is dropped so the link is checked as back-to-top only.
pub fn checkable_links(links: &ExtractedLinks) -> Vec<Link> {
    let back_offsets: HashSet<usize> = links.back.iter().map(|l| l.offset).collect();

    let mut out: Vec<Link> = links
        .toc
        .iter()
        .filter(|l| !back_offsets.contains(&l.offset))
        .chain(links.back.iter())
        .cloned()
        .collect();
    out.sort_by_key(|l| l.offset);
    out
}

/// Classify each link against the known anchors
pub fn reconcile(
    known: &KnownAnchors,
    links: &[Link],
    back_anchor: &str,
    source: AnchorSource,
) -> Reconciliation {
    let checks = links
        .iter()
        .map(|link| {
            let broken = match link.kind {
                LinkKind::BackToTop if link.target != back_anchor => {
                    Some(BrokenReason::WrongTarget {
                        expected: back_anchor.to_string(),
                    })
                }
                _ if known.contains(&link.target) => None,
                _ => Some(BrokenReason::Missing),
            };

            let similar = match broken {
                Some(_) => known.similar_to(&link.target),
                None => Vec::new(),
            };

            LinkCheck {
                link: link.clone(),
                broken,
                similar,
            }
        })
        .collect();

    Reconciliation {
        source,
        checks,
        known_count: known.len(),
        duplicates: known.duplicates(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::parse::extract_headings;
    use crate::anchors::rule::RuleKind;

    const BACK: &str = "🔝 返回目录";
    const TOP: &str = "📑-目录";

    fn link(kind: LinkKind, target: &str, offset: usize) -> Link {
        Link {
            kind,
            text: Some("t".to_string()),
            target: target.to_string(),
            line: 1,
            offset,
        }
    }

    #[test]
    fn test_resolved_iff_member() {
        let known = KnownAnchors::new(vec!["用户管理".to_string(), "图床管理".to_string()]);
        let links = vec![
            link(LinkKind::Toc, "用户管理", 0),
            link(LinkKind::Toc, "用户", 10),
        ];
        let result = reconcile(&known, &links, TOP, AnchorSource::Declared);

        assert_eq!(result.total(), 2);
        assert_eq!(result.resolved_count(), 1);
        assert!(result.checks[0].is_resolved());
        assert_eq!(result.checks[1].broken, Some(BrokenReason::Missing));
        assert!(!result.all_resolved());
    }

    #[test]
    fn test_similar_both_directions_deduplicated() {
        let known = KnownAnchors::new(vec![
            "admin-文章管理".to_string(),
            "文章".to_string(),
            "admin-文章管理".to_string(),
            "分类管理".to_string(),
        ]);
        let links = vec![link(LinkKind::Toc, "文章管理", 0)];
        let result = reconcile(&known, &links, TOP, AnchorSource::Declared);

        assert_eq!(result.checks[0].similar, vec!["admin-文章管理", "文章"]);
    }

    #[test]
    fn test_similar_is_case_sensitive() {
        let known = KnownAnchors::new(vec!["User".to_string()]);
        assert!(known.similar_to("user-management").is_empty());
        assert_eq!(known.similar_to("User-management"), vec!["User"]);
    }

    #[test]
    fn test_empty_anchor_is_never_similar() {
        let known = KnownAnchors::new(vec![String::new(), "tools-list".to_string()]);
        assert_eq!(known.similar_to("tools"), vec!["tools-list"]);
        assert!(known.similar_to("other").is_empty());
    }

    #[test]
    fn test_empty_known_set_breaks_everything() {
        let known = KnownAnchors::default();
        let links = vec![
            link(LinkKind::Toc, "a", 0),
            link(LinkKind::BackToTop, TOP, 5),
        ];
        let result = reconcile(&known, &links, TOP, AnchorSource::Declared);

        assert_eq!(result.resolved_count(), 0);
        assert!(result.checks.iter().all(|c| c.similar.is_empty()));
    }

    #[test]
    fn test_back_to_top_wrong_target_even_if_known() {
        let known = KnownAnchors::new(vec![TOP.to_string(), "目录".to_string()]);
        let links = vec![
            link(LinkKind::BackToTop, "目录", 0),
            link(LinkKind::BackToTop, TOP, 5),
        ];
        let result = reconcile(&known, &links, TOP, AnchorSource::Declared);

        assert_eq!(
            result.checks[0].broken,
            Some(BrokenReason::WrongTarget {
                expected: TOP.to_string()
            })
        );
        assert!(result.checks[1].is_resolved());
        assert_eq!(result.back_to_top().count(), 2);
    }

    #[test]
    fn test_back_to_top_needs_declared_canonical_anchor() {
        let known = KnownAnchors::new(vec!["其他".to_string()]);
        let links = vec![link(LinkKind::BackToTop, TOP, 0)];
        let result = reconcile(&known, &links, TOP, AnchorSource::Declared);
        assert_eq!(result.checks[0].broken, Some(BrokenReason::Missing));
    }

    #[test]
    fn test_checkable_links_deduplicates_back_links() {
        let doc = format!("- [用户管理](#用户管理)\n[{}](#{})\n", BACK, TOP);
        let links = ExtractedLinks::scan(&doc, BACK);
        assert_eq!(links.toc.len(), 2);

        let checkable = checkable_links(&links);
        assert_eq!(checkable.len(), 2);
        assert_eq!(checkable[0].kind, LinkKind::Toc);
        assert_eq!(checkable[1].kind, LinkKind::BackToTop);
    }

    #[test]
    fn test_known_from_computed_headings() {
        let doc = "## User Management\n### 用户管理 🔧\n";
        let headings: Vec<_> = extract_headings(doc, 3).collect();
        let known = KnownAnchors::computed(&headings, &RuleKind::Slug);
        assert!(known.contains("user-management"));
        assert!(known.contains("用户管理"));

        let titles = KnownAnchors::titles(&headings);
        assert!(titles.contains("User Management"));
    }

    #[test]
    fn test_duplicates_reported() {
        let known = KnownAnchors::new(
            ["文章管理", "分类管理", "文章管理"]
                .iter()
                .map(|s| s.to_string()),
        );
        assert_eq!(known.duplicates(), vec![("文章管理".to_string(), 2)]);

        let result = reconcile(&known, &[], TOP, AnchorSource::Computed);
        assert_eq!(result.duplicate_items().len(), 1);
        assert!(result.all_resolved());
    }

    #[test]
    fn test_reconcile_does_not_mutate_inputs() {
        let known = KnownAnchors::new(vec!["a".to_string()]);
        let links = vec![link(LinkKind::Toc, "b", 0)];
        let before = (known.len(), links.clone());
        let _ = reconcile(&known, &links, TOP, AnchorSource::Declared);
        assert_eq!((known.len(), links), before);
    }

    #[test]
    fn test_summary_counts() {
        let known = KnownAnchors::new(vec!["a".to_string()]);
        let links = vec![link(LinkKind::Toc, "a", 0), link(LinkKind::Toc, "b", 3)];
        let summary = reconcile(&known, &links, TOP, AnchorSource::Declared).summary_item();

        assert_eq!(summary.status, Some(Status::Broken));
        let data = summary.data.unwrap();
        assert_eq!(data["total"], 2);
        assert_eq!(data["resolved"], 1);
        assert_eq!(data["broken"], 1);
    }

    #[test]
    fn test_summary_empty_is_success() {
        let result = reconcile(&KnownAnchors::default(), &[], TOP, AnchorSource::Declared);
        let summary = result.summary_item();
        assert_eq!(summary.status, Some(Status::Resolved));
        assert!(summary.excerpt.unwrap().starts_with("0/0 links resolved"));
    }

    #[test]
    fn test_check_item_carries_issue() {
        let known = KnownAnchors::new(vec!["admin-文章管理".to_string()]);
        let links = vec![link(LinkKind::Toc, "文章管理", 0)];
        let result = reconcile(&known, &links, TOP, AnchorSource::Declared);
        let item = result.checks[0].to_result_item();

        assert_eq!(item.status, Some(Status::Broken));
        assert_eq!(item.errors[0].code, "BROKEN_LINK");
        assert_eq!(item.data.unwrap()["similar"][0], "admin-文章管理");
    }

    #[test]
    fn test_anchor_source_parse() {
        assert_eq!(
            "computed".parse::<AnchorSource>().unwrap(),
            AnchorSource::Computed
        );
        assert!("nope".parse::<AnchorSource>().is_err());
    }
}
