//! Diff configuration.
//!
//! [`DiffConfig`] bundles every recognized option. It can be built in code
//! (struct literal, presets or [`DiffConfig::builder`]) or loaded from JSON
//! with [`DiffConfig::from_json`]. Unknown keys are rejected, and
//! [`DiffConfig::validate`] checks limits and compiles the boundary patterns
//! before any diff work starts.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::split::{SplitRules, patterns};

/// Default minimum block length (in words) for a group to be kept as a move.
pub const DEFAULT_BLOCK_MIN_LENGTH: usize = 3;
/// Default maximum depth of recursive gap matching.
pub const DEFAULT_RECURSION_MAX: usize = 10;
/// Default maximum number of unlink/rebuild rounds.
pub const DEFAULT_UNLINK_MAX: usize = 5;

// =============================================================================
// DiffConfig
// =============================================================================

/// Configuration for a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiffConfig {
    /// Boundary patterns per level
    pub patterns: SplitPatterns,
    /// Groups whose longest block is shorter than this (in words) and that
    /// contain no unique word are shown as delete + insert instead of a move.
    /// `0` disables unlinking. Default: 3
    pub block_min_length: usize,
    /// Refine similar word gaps down to characters. Default: true
    pub char_diff: bool,
    /// Repeat each matching pass once with an empty symbol table to catch
    /// tokens that only become unique after the first links. Default: true
    pub repeated_diff: bool,
    /// Recursively re-match unresolved gaps at word and character level.
    /// Default: true
    pub recursive_diff: bool,
    /// Maximum recursion depth for gap re-matching. Default: 10
    pub recursion_max: usize,
    /// Convert short, common moved groups into delete + insert. Default: true
    pub unlink_blocks: bool,
    /// Maximum number of unlink rounds. Default: 5
    pub unlink_max: usize,
    /// Match tokens case-sensitively. Default: true
    pub case_sensitive: bool,
    /// Match white space exactly; otherwise runs of white space compare
    /// equal to a single space. Default: true
    pub whitespace_sensitive: bool,
    /// Elision of long unchanged fragments
    pub clip: ClipConfig,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            patterns: SplitPatterns::default(),
            block_min_length: DEFAULT_BLOCK_MIN_LENGTH,
            char_diff: true,
            repeated_diff: true,
            recursive_diff: true,
            recursion_max: DEFAULT_RECURSION_MAX,
            unlink_blocks: true,
            unlink_max: DEFAULT_UNLINK_MAX,
            case_sensitive: true,
            whitespace_sensitive: true,
            clip: ClipConfig::default(),
        }
    }
}

impl DiffConfig {
    /// Word-level diff without character refinement or recursion.
    pub fn coarse() -> Self {
        Self {
            char_diff: false,
            recursive_diff: false,
            ..Self::default()
        }
    }

    /// Default matching with clipping of long unchanged text enabled.
    pub fn clipped() -> Self {
        Self {
            clip: ClipConfig {
                enabled: true,
                ..ClipConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn builder() -> DiffConfigBuilder {
        DiffConfigBuilder {
            inner: DiffConfig::default(),
        }
    }

    /// Parse a JSON document and validate it.
    ///
    /// Missing keys take their defaults; unknown keys are an error.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: DiffConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check limits and compile patterns.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_limits()?;
        SplitRules::compile(&self.patterns)?;
        Ok(())
    }

    pub(crate) fn validate_limits(&self) -> Result<(), ConfigError> {
        if self.recursive_diff {
            ensure_non_zero(self.recursion_max, "recursion_max")?;
        }
        if self.unlink_blocks {
            ensure_non_zero(self.unlink_max, "unlink_max")?;
        }
        if self.clip.enabled {
            self.clip.validate()?;
        }
        Ok(())
    }
}

fn ensure_non_zero(value: usize, field: &'static str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::NonPositiveLimit { field, value });
    }
    Ok(())
}

fn ensure_ordered(min: usize, max: usize, field: &'static str) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::InvertedRange { field, min, max });
    }
    Ok(())
}

// =============================================================================
// SplitPatterns
// =============================================================================

/// Boundary pattern (regex syntax) per split level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitPatterns {
    pub paragraph: String,
    pub line: String,
    pub sentence: String,
    pub chunk: String,
    pub word: String,
    pub character: String,
}

impl Default for SplitPatterns {
    fn default() -> Self {
        Self {
            paragraph: patterns::PARAGRAPH.to_owned(),
            line: patterns::LINE.to_owned(),
            sentence: patterns::SENTENCE.to_owned(),
            chunk: patterns::CHUNK.to_owned(),
            word: patterns::WORD.to_owned(),
            character: patterns::CHARACTER.to_owned(),
        }
    }
}

// =============================================================================
// ClipConfig
// =============================================================================

/// Clipping of long unmoved unchanged fragments.
///
/// All lengths are in bytes of the unchanged text. The cut position is
/// searched for at a paragraph break in `paragraph_min..=paragraph_max`
/// from the fragment edge, else at a line break in `line_min..=line_max`,
/// else at a blank in `blank_min..=blank_max`, else `chars` bytes in. The
/// search never looks further than `lines_max` lines from the edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClipConfig {
    /// Default: false (full diff)
    pub enabled: bool,
    pub paragraph_min: usize,
    pub paragraph_max: usize,
    pub line_min: usize,
    pub line_max: usize,
    pub blank_min: usize,
    pub blank_max: usize,
    pub chars: usize,
    /// Maximum number of lines searched for a cut from each edge
    pub lines_max: usize,
    /// Do not clip when fewer bytes would be omitted
    pub skip_chars: usize,
    /// Do not clip when fewer lines would be omitted
    pub skip_lines: usize,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            paragraph_min: 500,
            paragraph_max: 1500,
            line_min: 500,
            line_max: 1000,
            blank_min: 500,
            blank_max: 1000,
            chars: 500,
            lines_max: 10,
            skip_chars: 1000,
            skip_lines: 5,
        }
    }
}

impl ClipConfig {
    /// Shortest text that can have a cut on one side.
    #[inline]
    pub fn min_length(&self) -> usize {
        self.paragraph_min
            .min(self.line_min)
            .min(self.blank_min)
            .min(self.chars)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        ensure_non_zero(self.chars, "clip.chars")?;
        ensure_non_zero(self.lines_max, "clip.lines_max")?;
        ensure_ordered(self.paragraph_min, self.paragraph_max, "clip.paragraph")?;
        ensure_ordered(self.line_min, self.line_max, "clip.line")?;
        ensure_ordered(self.blank_min, self.blank_max, "clip.blank")?;
        Ok(())
    }
}

// =============================================================================
// Builder
// =============================================================================

#[derive(Debug, Clone)]
pub struct DiffConfigBuilder {
    inner: DiffConfig,
}

impl Default for DiffConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffConfigBuilder {
    pub fn new() -> Self {
        DiffConfig::builder()
    }

    pub fn patterns(mut self, value: SplitPatterns) -> Self {
        self.inner.patterns = value;
        self
    }

    pub fn block_min_length(mut self, value: usize) -> Self {
        self.inner.block_min_length = value;
        self
    }

    pub fn char_diff(mut self, value: bool) -> Self {
        self.inner.char_diff = value;
        self
    }

    pub fn repeated_diff(mut self, value: bool) -> Self {
        self.inner.repeated_diff = value;
        self
    }

    pub fn recursive_diff(mut self, value: bool) -> Self {
        self.inner.recursive_diff = value;
        self
    }

    pub fn recursion_max(mut self, value: usize) -> Self {
        self.inner.recursion_max = value;
        self
    }

    pub fn unlink_blocks(mut self, value: bool) -> Self {
        self.inner.unlink_blocks = value;
        self
    }

    pub fn unlink_max(mut self, value: usize) -> Self {
        self.inner.unlink_max = value;
        self
    }

    pub fn case_sensitive(mut self, value: bool) -> Self {
        self.inner.case_sensitive = value;
        self
    }

    pub fn whitespace_sensitive(mut self, value: bool) -> Self {
        self.inner.whitespace_sensitive = value;
        self
    }

    pub fn clip(mut self, value: ClipConfig) -> Self {
        self.inner.clip = value;
        self
    }

    pub fn build(self) -> Result<DiffConfig, ConfigError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = DiffConfig::default();
        assert_eq!(cfg.block_min_length, 3);
        assert_eq!(cfg.recursion_max, 10);
        assert_eq!(cfg.unlink_max, 5);
        assert!(cfg.char_diff);
        assert!(!cfg.clip.enabled);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_serde_roundtrip_preserves_defaults() {
        let cfg = DiffConfig::default();
        let json = cfg.to_json().unwrap();
        let parsed = DiffConfig::from_json(&json).unwrap();
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg = DiffConfig::from_json(r#"{"block_min_length": 5, "clip": {"enabled": true}}"#)
            .unwrap();
        assert_eq!(cfg.block_min_length, 5);
        assert!(cfg.clip.enabled);
        assert_eq!(cfg.clip.skip_chars, 1000);
        assert_eq!(cfg.patterns, SplitPatterns::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = DiffConfig::from_json(r#"{"fuzzy": true}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(ref msg) if msg.contains("fuzzy")));

        let err = DiffConfig::from_json(r#"{"patterns": {"token": "x"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_malformed_pattern_rejected() {
        let err = DiffConfig::from_json(r#"{"patterns": {"sentence": "[unclosed"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_builder_rejects_zero_limits() {
        let err = DiffConfig::builder().recursion_max(0).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NonPositiveLimit { field: "recursion_max", value: 0 }
        ));

        // Zero is fine when the feature using the limit is off
        assert!(DiffConfig::builder()
            .recursive_diff(false)
            .recursion_max(0)
            .build()
            .is_ok());
    }

    #[test]
    fn test_clip_inverted_range_rejected() {
        let clip = ClipConfig {
            enabled: true,
            line_min: 900,
            line_max: 100,
            ..ClipConfig::default()
        };
        let err = DiffConfig::builder().clip(clip).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvertedRange { field: "clip.line", .. }));
    }

    #[test]
    fn test_presets() {
        assert!(!DiffConfig::coarse().char_diff);
        assert!(DiffConfig::clipped().clip.enabled);
        assert_eq!(ClipConfig::default().min_length(), 500);
    }
}
