//
// include_link/pattern.rs
//
// Detection of INCLUDE directives in template text
//

use regex::Regex;
use std::sync::OnceLock;

use super::config::IncludeLinkConfig;
use super::path_resolve::{resolve_include, FileHandle, PathContext};

/// A raw directive match, in byte offsets of the scanned text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMatch<'t> {
    /// Byte offset of the path token
    pub start: usize,
    /// Byte offset just past the path token
    pub end: usize,
    pub path: &'t str,
}

/// A directive whose path resolved, in character offsets of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub start: usize,
    pub end: usize,
    pub target_path: String,
    pub target: FileHandle,
}

/// Scans text for `KEYWORD <path>` directives.
///
/// The keyword must stand on its own (word-bounded), be followed by at least
/// one whitespace character, and the path must end in one of the configured
/// extensions. Only the path token is reported, never the keyword.
#[derive(Debug, Clone)]
pub struct LinkPatternMatcher {
    pattern: Regex,
    keyword: String,
}

fn build_pattern(keyword: &str, extensions: &[String]) -> Result<Regex, regex::Error> {
    let alternatives = extensions
        .iter()
        .map(|ext| regex::escape(ext))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"\b({}\s+)(\S+\.(?:{})\b)",
        regex::escape(keyword),
        alternatives
    ))
}

fn default_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(INCLUDE\s+)(\S+\.(?:html|tpl)\b)").unwrap()
    })
}

impl Default for LinkPatternMatcher {
    fn default() -> Self {
        Self {
            pattern: default_pattern().clone(),
            keyword: String::from("INCLUDE"),
        }
    }
}

impl LinkPatternMatcher {
    /// Build a matcher for the configured keyword and extensions
    pub fn from_config(config: &IncludeLinkConfig) -> anyhow::Result<Self> {
        if config.keyword.is_empty() || config.extensions.is_empty() {
            anyhow::bail!("include keyword and extension list must not be empty");
        }
        let pattern = build_pattern(&config.keyword, &config.extensions)?;
        Ok(Self {
            pattern,
            keyword: config.keyword.clone(),
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// All directive matches in `text`, without checking the filesystem.
    /// Given the same text this always yields the same ordered sequence.
    pub fn raw_matches<'t>(&'t self, text: &'t str) -> impl Iterator<Item = RawMatch<'t>> + 't {
        self.pattern.captures_iter(text).filter_map(|caps| {
            let path = caps.get(2)?;
            Some(RawMatch {
                start: path.start(),
                end: path.end(),
                path: path.as_str(),
            })
        })
    }

    /// Directive matches in `text` whose path resolves against `context`.
    ///
    /// `text` is a slice of the document beginning at character offset
    /// `base_offset`; the returned offsets are document character offsets.
    pub fn find_candidates(
        &self,
        text: &str,
        base_offset: usize,
        context: &PathContext,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        let mut cursor = CharCursor::new(text);

        for raw in self.raw_matches(text) {
            let start = cursor.char_offset(raw.start);
            let end = cursor.char_offset(raw.end);
            let Some(target) = resolve_include(raw.path, context) else {
                log::trace!("Skipping unresolved include '{}'", raw.path);
                continue;
            };
            candidates.push(Candidate {
                start: base_offset + start,
                end: base_offset + end,
                target_path: raw.path.to_string(),
                target,
            });
        }

        candidates
    }
}

/// Converts increasing byte offsets of one string into character offsets
struct CharCursor<'t> {
    text: &'t str,
    byte: usize,
    chars: usize,
}

impl<'t> CharCursor<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            text,
            byte: 0,
            chars: 0,
        }
    }

    fn char_offset(&mut self, byte: usize) -> usize {
        if byte >= self.byte {
            self.chars += self.text[self.byte..byte].chars().count();
        } else {
            self.chars = self.text[..byte].chars().count();
        }
        self.byte = byte;
        self.chars
    }
}
