//
// include_link/range.rs
//
// A tracked include link
//

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::highlight::{HighlightId, HighlightStyle, LinkTag, MarkupModel};
use super::path_resolve::FileHandle;
use super::pattern::Candidate;

// Weights of start and end in the cache key. A shift by `d` moves the key by
// `(START_WEIGHT + END_WEIGHT) * d`.
const START_WEIGHT: u64 = 31 * 31;
const END_WEIGHT: u64 = 31;

/// One detected include reference.
///
/// Identity is `(start, end, target_path)`; `active` and the rendering
/// resource are not part of it. The cache key is kept in step with the
/// offsets by `shift`, never recomputed from stale components.
#[derive(Debug, Clone)]
pub struct LinkRange {
    start: usize,
    end: usize,
    target_path: String,
    target: FileHandle,
    active: bool,
    key: u64,
    highlight: Option<HighlightId>,
}

fn path_hash(path: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

fn compute_key(start: usize, end: usize, target_path: &str) -> u64 {
    (start as u64)
        .wrapping_mul(START_WEIGHT)
        .wrapping_add((end as u64).wrapping_mul(END_WEIGHT))
        .wrapping_add(path_hash(target_path))
}

impl LinkRange {
    /// Create an inactive, unrendered range. Returns `None` for empty or
    /// inverted offsets.
    pub fn new(start: usize, end: usize, target_path: String, target: FileHandle) -> Option<Self> {
        if end <= start {
            return None;
        }
        let key = compute_key(start, end, &target_path);
        Some(Self {
            start,
            end,
            target_path,
            target,
            active: false,
            key,
            highlight: None,
        })
    }

    pub fn from_candidate(candidate: Candidate) -> Option<Self> {
        Self::new(
            candidate.start,
            candidate.end,
            candidate.target_path,
            candidate.target,
        )
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn target_path(&self) -> &str {
        &self.target_path
    }

    pub fn target(&self) -> &FileHandle {
        &self.target
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn highlight(&self) -> Option<HighlightId> {
        self.highlight
    }

    pub fn is_rendered(&self) -> bool {
        self.highlight.is_some()
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether this range equals a candidate by identity
    pub fn matches(&self, candidate: &Candidate) -> bool {
        self.start == candidate.start
            && self.end == candidate.end
            && self.target_path == candidate.target_path
    }

    /// Whether the range overlaps `[offset, offset + length]`, touching ends included
    pub fn intersects(&self, offset: usize, length: usize) -> bool {
        self.start.max(offset) <= self.end.min(offset + length)
    }

    /// Whether the range overlaps `[start, end)` by at least one character
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start.max(start) < self.end.min(end)
    }

    /// Move both offsets by `delta`, updating the cache key in the same step.
    /// Offsets saturate at zero.
    pub fn shift(&mut self, delta: isize) {
        let start = self.start.saturating_add_signed(delta);
        let end = self.end.saturating_add_signed(delta);
        let moved_start = start as i64 - self.start as i64;
        let moved_end = end as i64 - self.end as i64;
        self.key = self
            .key
            .wrapping_add((moved_start as u64).wrapping_mul(START_WEIGHT))
            .wrapping_add((moved_end as u64).wrapping_mul(END_WEIGHT));
        self.start = start;
        self.end = end;
    }

    /// Bring the rendering in line with `active`: active ranges get a fresh
    /// highlight, inactive ranges release theirs.
    pub fn render(&mut self, markup: &mut dyn MarkupModel) {
        if let Some(id) = self.highlight.take() {
            markup.remove_highlighter(id);
        }
        if self.active {
            let tag = LinkTag {
                target_path: self.target_path.clone(),
                target: self.target.path().to_path_buf(),
            };
            self.highlight = Some(markup.add_highlighter(
                self.start,
                self.end,
                HighlightStyle::INCLUDE_LINK,
                tag,
            ));
        }
    }

    /// Deactivate and release the rendering resource
    pub fn release(&mut self, markup: &mut dyn MarkupModel) {
        self.active = false;
        if let Some(id) = self.highlight.take() {
            markup.remove_highlighter(id);
        }
    }

    /// Move the rendered highlight to the current offsets
    pub(crate) fn sync_highlight(&self, markup: &mut dyn MarkupModel) {
        if let Some(id) = self.highlight {
            markup.move_highlighter(id, self.start, self.end);
        }
    }

    fn identity(&self) -> (usize, usize, &str) {
        (self.start, self.end, self.target_path.as_str())
    }
}

impl PartialEq for LinkRange {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for LinkRange {}

impl Hash for LinkRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.key);
    }
}

impl PartialOrd for LinkRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LinkRange {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}
