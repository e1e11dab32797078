//! Renderer module
//!
//! Renders ResultSet to different output formats: text, jsonl, json, md, raw

use colored::Colorize;
use std::io::Write;

use crate::core::model::{Kind, ResultItem, ResultSet, Status};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Jsonl,
    Json,
    Markdown,
    Raw,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "jsonl" => Ok(OutputFormat::Jsonl),
            "json" => Ok(OutputFormat::Json),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "raw" => Ok(OutputFormat::Raw),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Render configuration combining format and options
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderConfig {
    pub format: OutputFormat,
    pub pretty: bool,
    pub color: bool,
}

impl RenderConfig {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            pretty: false,
            color: false,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

/// Renderer for result sets
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    /// Create a new renderer with render config
    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render a result set to a string
    pub fn render(&self, result_set: &ResultSet) -> String {
        match self.config.format {
            OutputFormat::Text => self.render_text(result_set),
            OutputFormat::Jsonl => self.render_jsonl(result_set),
            OutputFormat::Json => self.render_json(result_set),
            OutputFormat::Markdown => self.render_markdown(result_set),
            OutputFormat::Raw => self.render_raw(result_set),
        }
    }

    /// Render to a writer
    pub fn render_to<W: Write>(
        &self,
        result_set: &ResultSet,
        mut writer: W,
    ) -> std::io::Result<()> {
        let output = self.render(result_set);
        writer.write_all(output.as_bytes())?;
        if !output.is_empty() && !output.ends_with('\n') {
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Render as a line-oriented human report, one section per kind
    fn render_text(&self, result_set: &ResultSet) -> String {
        let mut output = String::new();
        let mut current: Option<Kind> = None;

        for item in &result_set.items {
            if current != Some(item.kind) && item.kind != Kind::Summary {
                if current.is_some() {
                    output.push('\n');
                }
                let count = result_set
                    .items
                    .iter()
                    .filter(|i| i.kind == item.kind)
                    .count();
                let header = format!("=== {} ({}) ===", section_title(item.kind), count);
                output.push_str(&self.paint_bold(&header));
                output.push('\n');
            }
            current = Some(item.kind);
            self.render_item_text(&mut output, item);
        }

        output
    }

    fn render_item_text(&self, output: &mut String, item: &ResultItem) {
        let excerpt = item.excerpt.as_deref().unwrap_or("");
        let location = item
            .line
            .map(|l| format!("L{}: ", l))
            .unwrap_or_default();

        match (item.kind, item.status) {
            (Kind::Summary, status) => {
                output.push('\n');
                let line = match status {
                    Some(Status::Broken) => self.paint_red(excerpt),
                    _ => self.paint_green(excerpt),
                };
                output.push_str(&line);
                output.push('\n');
            }
            (Kind::Error, _) => {
                for error in &item.errors {
                    let line = format!("  ⚠️  {}: {}", error.code, error.message);
                    output.push_str(&self.paint_yellow(&line));
                    output.push('\n');
                }
            }
            (_, Some(Status::Resolved)) => {
                output.push_str(&format!("  ✅ {}{}\n", location, excerpt));
            }
            (_, Some(Status::Broken)) => {
                let line = format!("  ❌ {}{}", location, excerpt);
                output.push_str(&self.paint_red(&line));
                output.push('\n');
                for error in &item.errors {
                    output.push_str(&format!("      {}\n", error.message));
                }
                if let Some(similar) = similar_candidates(item) {
                    output.push_str(&format!("      💡 similar: {}\n", similar.join(", ")));
                }
            }
            _ => {
                output.push_str(&format!("  {}{}\n", location, excerpt));
            }
        }
    }

    fn paint_bold(&self, s: &str) -> String {
        if self.config.color {
            s.bold().to_string()
        } else {
            s.to_string()
        }
    }

    fn paint_red(&self, s: &str) -> String {
        if self.config.color {
            s.red().to_string()
        } else {
            s.to_string()
        }
    }

    fn paint_green(&self, s: &str) -> String {
        if self.config.color {
            s.green().to_string()
        } else {
            s.to_string()
        }
    }

    fn paint_yellow(&self, s: &str) -> String {
        if self.config.color {
            s.yellow().to_string()
        } else {
            s.to_string()
        }
    }

    /// Render as JSON Lines (one JSON object per line)
    fn render_jsonl(&self, result_set: &ResultSet) -> String {
        result_set
            .items
            .iter()
            .filter_map(|item| {
                if self.config.pretty {
                    serde_json::to_string_pretty(item).ok()
                } else {
                    serde_json::to_string(item).ok()
                }
            })
            .collect::<Vec<_>>()
            .join(if self.config.pretty { "\n\n" } else { "\n" })
    }

    /// Render as a single JSON array
    fn render_json(&self, result_set: &ResultSet) -> String {
        if self.config.pretty {
            serde_json::to_string_pretty(&result_set.items).unwrap_or_else(|_| "[]".to_string())
        } else {
            serde_json::to_string(&result_set.items).unwrap_or_else(|_| "[]".to_string())
        }
    }

    /// Render as Markdown
    fn render_markdown(&self, result_set: &ResultSet) -> String {
        let mut output = String::new();

        let order = [
            Kind::Error,
            Kind::Heading,
            Kind::Anchor,
            Kind::Link,
            Kind::Slug,
            Kind::Check,
            Kind::Rewrite,
            Kind::Summary,
        ];

        for kind in order {
            let items: Vec<&ResultItem> =
                result_set.items.iter().filter(|i| i.kind == kind).collect();
            if items.is_empty() {
                continue;
            }

            output.push_str(&format!("## {}\n\n", section_title(kind)));
            for item in items {
                self.render_item_md(&mut output, item);
            }
            output.push('\n');
        }

        output
    }

    fn render_item_md(&self, output: &mut String, item: &ResultItem) {
        if item.kind == Kind::Error {
            for error in &item.errors {
                output.push_str(&format!("- **{}**: {}\n", error.code, error.message));
            }
            return;
        }

        let marker = match item.status {
            Some(Status::Resolved) => "✅ ",
            Some(Status::Broken) => "❌ ",
            None => "",
        };
        output.push_str(&format!("- {}", marker));
        if let Some(line) = item.line {
            output.push_str(&format!("line {}: ", line));
        }
        if let Some(excerpt) = &item.excerpt {
            output.push_str(&format!("`{}`", excerpt));
        }
        output.push('\n');

        if let Some(similar) = similar_candidates(item) {
            output.push_str(&format!("  - similar: {}\n", similar.join(", ")));
        }
    }

    /// Render as raw output (excerpts only)
    fn render_raw(&self, result_set: &ResultSet) -> String {
        result_set
            .items
            .iter()
            .filter_map(|item| item.excerpt.clone())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn section_title(kind: Kind) -> &'static str {
    match kind {
        Kind::Heading => "Headings",
        Kind::Link => "Links",
        Kind::Anchor => "Anchors",
        Kind::Check => "Link checks",
        Kind::Rewrite => "Rewritten lines",
        Kind::Slug => "Anchors computed",
        Kind::Summary => "Summary",
        Kind::Error => "Errors",
    }
}

/// Similarity hints attached to a broken link, if any
fn similar_candidates(item: &ResultItem) -> Option<Vec<String>> {
    let similar: Vec<String> = item
        .data
        .as_ref()?
        .get("similar")?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    if similar.is_empty() {
        None
    } else {
        Some(similar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::JumpIssue;
    use serde_json::json;

    fn renderer(format: OutputFormat) -> Renderer {
        Renderer::with_config(RenderConfig::new(format))
    }

    fn sample_set() -> ResultSet {
        let mut set = ResultSet::new();
        set.push(
            ResultItem::new(Kind::Check)
                .with_line(3)
                .with_excerpt("[用户管理] -> #用户管理")
                .with_status(Status::Resolved),
        );
        set.push(
            ResultItem::new(Kind::Check)
                .with_line(4)
                .with_excerpt("[文章管理] -> #admin")
                .with_status(Status::Broken)
                .with_data(json!({ "similar": ["admin-文章管理"] })),
        );
        set.push(
            ResultItem::new(Kind::Summary)
                .with_excerpt("1/2 links resolved")
                .with_status(Status::Broken),
        );
        set
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("jsonl".parse::<OutputFormat>().unwrap(), OutputFormat::Jsonl);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("raw".parse::<OutputFormat>().unwrap(), OutputFormat::Raw);
        assert!("yaml"
            .parse::<OutputFormat>()
            .unwrap_err()
            .contains("Unknown format"));
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }

    #[test]
    fn test_render_text_sections_and_markers() {
        let output = renderer(OutputFormat::Text).render(&sample_set());

        assert!(output.contains("=== Link checks (2) ==="));
        assert!(output.contains("✅ L3: [用户管理] -> #用户管理"));
        assert!(output.contains("❌ L4: [文章管理] -> #admin"));
        assert!(output.contains("💡 similar: admin-文章管理"));
        assert!(output.trim_end().ends_with("1/2 links resolved"));
    }

    #[test]
    fn test_render_text_without_color_has_no_escape_codes() {
        let output = renderer(OutputFormat::Text).render(&sample_set());
        assert!(!output.contains('\u{1b}'));
    }

    #[test]
    fn test_render_text_errors() {
        let mut set = ResultSet::new();
        set.push(ResultItem::error(JumpIssue::new("LOSSY_CONVERSION", "replaced")));
        let output = renderer(OutputFormat::Text).render(&set);
        assert!(output.contains("=== Errors (1) ==="));
        assert!(output.contains("LOSSY_CONVERSION: replaced"));
    }

    #[test]
    fn test_render_jsonl() {
        let output = renderer(OutputFormat::Jsonl).render(&sample_set());
        assert_eq!(output.lines().count(), 3);
        for line in output.lines() {
            assert!(serde_json::from_str::<serde_json::Value>(line).is_ok());
        }
    }

    #[test]
    fn test_render_json_pretty() {
        let config = RenderConfig::new(OutputFormat::Json).with_pretty(true);
        let output = Renderer::with_config(config).render(&sample_set());
        assert!(output.starts_with('['));
        assert!(output.contains("  "));
    }

    #[test]
    fn test_render_markdown() {
        let output = renderer(OutputFormat::Markdown).render(&sample_set());
        assert!(output.contains("## Link checks"));
        assert!(output.contains("- ❌ line 4: `[文章管理] -> #admin`"));
        assert!(output.contains("  - similar: admin-文章管理"));
        assert!(output.contains("## Summary"));
    }

    #[test]
    fn test_render_markdown_empty() {
        let output = renderer(OutputFormat::Markdown).render(&ResultSet::new());
        assert!(output.is_empty());
    }

    #[test]
    fn test_render_raw() {
        let output = renderer(OutputFormat::Raw).render(&sample_set());
        assert_eq!(output.lines().count(), 3);
    }

    #[test]
    fn test_render_to_writer_terminates_line() {
        let mut buffer = Vec::new();
        renderer(OutputFormat::Json)
            .render_to(&sample_set(), &mut buffer)
            .unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.ends_with("]\n"));
    }
}
