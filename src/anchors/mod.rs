//! Anchors module - Table-of-contents jump links in a single Markdown document
//!
//! A link `[text](#target)` resolves when `target` is one of the document's
//! known anchors. Anchors come from explicit `<a name="...">` declarations or
//! are computed from heading titles by an anchor rule.

pub mod api;
pub mod lint;
pub mod parse;
pub mod rewrite;
pub mod rule;
