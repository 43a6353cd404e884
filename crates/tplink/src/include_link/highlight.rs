//
// include_link/highlight.rs
//
// Rendering layer for include links
//

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Identifier of a rendered highlight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HighlightId(u64);

/// Visual style of a rendered interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightStyle {
    pub underline: bool,
    pub bold: bool,
}

impl HighlightStyle {
    /// Comment-coloured, bold and underlined
    pub const INCLUDE_LINK: HighlightStyle = HighlightStyle {
        underline: true,
        bold: true,
    };
}

/// Tag attached to a highlight naming the link it renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTag {
    pub target_path: String,
    pub target: PathBuf,
}

/// A rendered interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub start: usize,
    pub end: usize,
    pub style: HighlightStyle,
    pub tag: LinkTag,
}

/// Host rendering surface for highlighted intervals
pub trait MarkupModel {
    fn add_highlighter(
        &mut self,
        start: usize,
        end: usize,
        style: HighlightStyle,
        tag: LinkTag,
    ) -> HighlightId;

    fn remove_highlighter(&mut self, id: HighlightId);

    /// Move a highlight after its text was shifted by an edit
    fn move_highlighter(&mut self, id: HighlightId, start: usize, end: usize);
}

/// Counters for rendering activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighlightMetrics {
    pub added: u64,
    pub removed: u64,
    pub moved: u64,
}

/// In-memory markup model for one document
#[derive(Debug, Default)]
pub struct HighlightLayer {
    next_id: u64,
    highlights: BTreeMap<HighlightId, Highlight>,
    metrics: HighlightMetrics,
}

impl HighlightLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: HighlightId) -> Option<&Highlight> {
        self.highlights.get(&id)
    }

    /// Rendered highlights in document order
    pub fn highlights(&self) -> Vec<&Highlight> {
        let mut all: Vec<&Highlight> = self.highlights.values().collect();
        all.sort_by_key(|h| (h.start, h.end));
        all
    }

    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }

    pub fn metrics(&self) -> HighlightMetrics {
        self.metrics
    }
}

impl MarkupModel for HighlightLayer {
    fn add_highlighter(
        &mut self,
        start: usize,
        end: usize,
        style: HighlightStyle,
        tag: LinkTag,
    ) -> HighlightId {
        self.next_id += 1;
        let id = HighlightId(self.next_id);
        self.highlights.insert(
            id,
            Highlight {
                start,
                end,
                style,
                tag,
            },
        );
        self.metrics.added += 1;
        id
    }

    fn remove_highlighter(&mut self, id: HighlightId) {
        if self.highlights.remove(&id).is_some() {
            self.metrics.removed += 1;
        }
    }

    fn move_highlighter(&mut self, id: HighlightId, start: usize, end: usize) {
        if let Some(h) = self.highlights.get_mut(&id) {
            h.start = start;
            h.end = end;
            self.metrics.moved += 1;
        }
    }
}
