//! Configuration file handling
//!
//! Optional JSON file (default `jumplint.json` under ROOT). Every field has a
//! default, so an empty object is a valid configuration.
//!
//! ```json
//! {
//!   "rule": "named",
//!   "max_level": 3,
//!   "back_to_top": { "label": "🔝 返回目录", "anchor": "📑-目录" },
//!   "overrides": [
//!     { "text_contains": "文章管理", "href_contains": "admin", "anchor": "admin-文章管理" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::anchors::lint::AnchorSource;
use crate::anchors::rewrite::{BackToTop, Override, RewriteOptions};
use crate::anchors::rule::RuleKind;
use crate::core::error::JumpError;
use crate::core::file_reader::{EncodingStrategy, FileReadConfig};

/// Default config file name, looked up under ROOT
pub const DEFAULT_CONFIG_FILE: &str = "jumplint.json";

/// Default suffix for the rewritten document's file stem
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_new";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JumpConfig {
    /// Anchor-generation rule
    pub rule: RuleKind,

    /// Anchor source used by `check`
    pub against: AnchorSource,

    /// Deepest heading level considered (3 or 4)
    pub max_level: u8,

    pub back_to_top: BackToTop,

    /// Ordered; first match wins
    pub overrides: Vec<Override>,

    /// Remove inline HTML tags from heading lines when rewriting
    pub strip_heading_tags: bool,

    /// Appended to the input file stem to form the default output path
    pub output_suffix: String,

    /// `lossy` replaces invalid UTF-8 with a warning; `strict` rejects the input
    pub encoding: EncodingStrategy,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            rule: RuleKind::default(),
            against: AnchorSource::default(),
            max_level: 3,
            back_to_top: BackToTop::default(),
            overrides: Vec::new(),
            strip_heading_tags: false,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            encoding: EncodingStrategy::default(),
        }
    }
}

impl JumpConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str, origin: &Path) -> Result<Self, JumpError> {
        let config: JumpConfig =
            serde_json::from_str(json).map_err(|e| JumpError::InvalidConfig {
                path: origin.to_path_buf(),
                reason: e.to_string(),
            })?;
        config.validate(origin)?;
        Ok(config)
    }

    fn validate(&self, origin: &Path) -> Result<(), JumpError> {
        let invalid = |reason: String| JumpError::InvalidConfig {
            path: origin.to_path_buf(),
            reason,
        };

        if !(3..=4).contains(&self.max_level) {
            return Err(invalid(format!(
                "max_level must be 3 or 4, got {}",
                self.max_level
            )));
        }
        if self.back_to_top.label.is_empty() || self.back_to_top.anchor.is_empty() {
            return Err(invalid("back_to_top label and anchor must be non-empty".into()));
        }
        if let Some(o) = self
            .overrides
            .iter()
            .find(|o| o.text_contains.is_empty() || o.anchor.is_empty())
        {
            return Err(invalid(format!(
                "override entries need a non-empty text_contains and anchor: {:?}",
                o
            )));
        }
        if self.back_to_top.anchor.starts_with('#')
            || self.overrides.iter().any(|o| o.anchor.starts_with('#'))
        {
            return Err(invalid("anchors are written without a leading '#'".into()));
        }
        Ok(())
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, `jumplint.json` under root is
    /// used when present, otherwise defaults apply.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, JumpError> {
        let path: PathBuf = match explicit {
            Some(p) => crate::core::paths::resolve(root, p),
            None => {
                let candidate = root.join(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    debug!("no config file found; using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let json = std::fs::read_to_string(&path).map_err(|e| JumpError::InvalidConfig {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), "loading config");
        Self::from_json(&json, &path)
    }

    pub fn read_config(&self) -> FileReadConfig {
        FileReadConfig {
            encoding_strategy: self.encoding,
            ..FileReadConfig::default()
        }
    }

    pub fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            rule: self.rule,
            overrides: self.overrides.clone(),
            back_to_top: self.back_to_top.clone(),
            strip_heading_tags: self.strip_heading_tags,
            max_level: self.max_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = JumpConfig::default();
        assert_eq!(config.rule, RuleKind::Named);
        assert_eq!(config.against, AnchorSource::Declared);
        assert_eq!(config.max_level, 3);
        assert_eq!(config.back_to_top.anchor, "📑-目录");
        assert!(config.overrides.is_empty());
    }

    #[test]
    fn test_empty_object_is_default() {
        let config = JumpConfig::from_json("{}", Path::new("c.json")).unwrap();
        assert_eq!(config, JumpConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "rule": "slug",
            "against": "computed",
            "max_level": 4,
            "back_to_top": { "label": "Top", "anchor": "toc" },
            "overrides": [
                { "text_contains": "文章管理", "href_contains": "admin", "anchor": "admin-文章管理" },
                { "text_contains": "分类管理", "anchor": "admin-分类管理" }
            ],
            "strip_heading_tags": true,
            "output_suffix": "_fixed",
            "encoding": "strict"
        }"#;
        let config = JumpConfig::from_json(json, Path::new("c.json")).unwrap();
        assert_eq!(config.rule, RuleKind::Slug);
        assert_eq!(config.against, AnchorSource::Computed);
        assert_eq!(config.overrides.len(), 2);
        assert_eq!(config.overrides[1].href_contains, None);
        assert_eq!(config.read_config().encoding_strategy, EncodingStrategy::Strict);

        let opts = config.rewrite_options();
        assert_eq!(opts.max_level, 4);
        assert!(opts.strip_heading_tags);
        assert_eq!(opts.back_to_top.label, "Top");
    }

    #[test]
    fn test_invalid_config_rejected() {
        for json in [
            r#"{ "max_level": 5 }"#,
            r#"{ "rule": "fancy" }"#,
            r#"{ "unknown": 1 }"#,
            r#"{ "overrides": [ { "text_contains": "", "anchor": "x" } ] }"#,
            r##"{ "back_to_top": { "label": "Top", "anchor": "#toc" } }"##,
        ] {
            let err = JumpConfig::from_json(json, Path::new("c.json")).unwrap_err();
            assert_eq!(err.code(), "INVALID_CONFIG", "{}", json);
        }
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let config = JumpConfig::load(temp.path(), None).unwrap();
        assert_eq!(config, JumpConfig::default());
    }

    #[test]
    fn test_load_default_file_under_root() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join(DEFAULT_CONFIG_FILE), r#"{ "rule": "slug" }"#).unwrap();
        let config = JumpConfig::load(temp.path(), None).unwrap();
        assert_eq!(config.rule, RuleKind::Slug);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let temp = tempdir().unwrap();
        let err = JumpConfig::load(temp.path(), Some(Path::new("missing.json"))).unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIG");
    }
}
