//
// include_link/session.rs
//
// Per-document controller for include links
//

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};

use super::activation::is_comment;
use super::config::ModifierKey;
use super::document::{EditEvent, LinkDocument};
use super::highlight::HighlightLayer;
use super::path_resolve::FileHandle;
use super::pattern::{Candidate, LinkPatternMatcher};
use super::tracker::{LinkRangeSet, TrackerUpdate};

/// Modifier key state accompanying a pointer or key event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn only(key: ModifierKey) -> Self {
        let mut modifiers = Self::default();
        match key {
            ModifierKey::Ctrl => modifiers.ctrl = true,
            ModifierKey::Alt => modifiers.alt = true,
            ModifierKey::Shift => modifiers.shift = true,
            ModifierKey::Meta => modifiers.meta = true,
        }
        modifiers
    }

    pub fn has(&self, key: ModifierKey) -> bool {
        match key {
            ModifierKey::Ctrl => self.ctrl,
            ModifierKey::Alt => self.alt,
            ModifierKey::Shift => self.shift,
            ModifierKey::Meta => self.meta,
        }
    }
}

/// Pointer shape requested from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Affordance {
    /// Hand cursor over an active link
    Pointer,
    /// Default text cursor
    Text,
}

/// A change of pointer affordance and tooltip for the host to apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointerFeedback {
    pub affordance: Affordance,
    pub tooltip: Option<String>,
}

impl PointerFeedback {
    fn restore() -> Self {
        Self {
            affordance: Affordance::Text,
            tooltip: None,
        }
    }
}

/// Request to open an include target in a new editor view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub target: PathBuf,
    pub uri: Url,
}

/// Result of hit-testing a document offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitLink {
    pub start: usize,
    pub end: usize,
    pub target_path: String,
    pub target: FileHandle,
    /// Whether the link sits in comment text right now
    pub active: bool,
}

/// Owns the tracked ranges and rendering of one open document.
///
/// While not listening the session ignores edits and input and holds no
/// ranges; the document text is still kept up to date.
pub struct DocumentSession {
    document: LinkDocument,
    ranges: LinkRangeSet,
    markup: HighlightLayer,
    matcher: LinkPatternMatcher,
    navigation_modifier: ModifierKey,
    listening: bool,
    showing_link: bool,
}

impl DocumentSession {
    pub fn new(
        document: LinkDocument,
        matcher: LinkPatternMatcher,
        navigation_modifier: ModifierKey,
    ) -> Self {
        Self {
            document,
            ranges: LinkRangeSet::new(),
            markup: HighlightLayer::new(),
            matcher,
            navigation_modifier,
            listening: false,
            showing_link: false,
        }
    }

    pub fn document(&self) -> &LinkDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut LinkDocument {
        &mut self.document
    }

    pub fn ranges(&self) -> &LinkRangeSet {
        &self.ranges
    }

    pub fn markup(&self) -> &HighlightLayer {
        &self.markup
    }

    pub fn matcher(&self) -> &LinkPatternMatcher {
        &self.matcher
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn navigation_modifier(&self) -> ModifierKey {
        self.navigation_modifier
    }

    pub fn set_navigation_modifier(&mut self, key: ModifierKey) {
        self.navigation_modifier = key;
    }

    /// Register for edit and input events. Returns `false` if already
    /// registered or the document is closed.
    pub fn start_listening(&mut self) -> bool {
        if self.listening || self.document.is_disposed() {
            return false;
        }
        self.listening = true;
        true
    }

    /// Unregister from edit and input events. Returns `false` if not registered.
    pub fn stop_listening(&mut self) -> bool {
        std::mem::replace(&mut self.listening, false)
    }

    /// Unregister, then deactivate and drop every range. Safe to repeat.
    pub fn teardown(&mut self) {
        let was_listening = self.stop_listening();
        let cleared = self.ranges.clear(&mut self.markup);
        self.showing_link = false;
        if was_listening || cleared > 0 {
            log::trace!(
                "Tore down include links for {} ({} ranges)",
                self.document.uri(),
                cleared
            );
        }
    }

    /// Tear down and mark the document closed
    pub fn close(&mut self) {
        self.teardown();
        self.document.dispose();
    }

    /// Rescan the whole document and classify every range.
    /// Returns the number of active ranges.
    pub fn scan_and_activate(&mut self) -> usize {
        if !self.listening || self.document.is_disposed() {
            return 0;
        }
        let update = self
            .ranges
            .full_rescan(&self.document, &self.matcher, &mut self.markup);
        self.check_comments();
        log::trace!(
            "Scanned {}: {} added, {} kept, {} removed",
            self.document.uri(),
            update.added,
            update.kept,
            update.removed
        );
        self.ranges.active().count()
    }

    /// Merge the result of a background scan taken at `revision`.
    ///
    /// Returns `false` without touching the ranges if the session is not
    /// listening or the document changed since the snapshot.
    pub fn apply_scan(&mut self, revision: u64, candidates: Vec<Candidate>) -> bool {
        if !self.listening || self.document.is_disposed() {
            return false;
        }
        if revision != self.document.revision() {
            return false;
        }
        self.ranges.merge_full_scan(candidates, &mut self.markup);
        self.check_comments();
        true
    }

    /// Re-classify every range, re-rendering the flipped ones
    pub fn check_comments(&mut self) -> usize {
        self.ranges.check_comments(&self.document, &mut self.markup)
    }

    /// Replace the matcher and rescan with it
    pub fn set_matcher(&mut self, matcher: LinkPatternMatcher) {
        self.matcher = matcher;
        self.scan_and_activate();
    }

    pub fn before_document_change(&mut self, edit: &EditEvent) {
        if !self.listening || !edit.is_deletion() {
            return;
        }
        self.ranges
            .forget(edit.offset, edit.offset + edit.old_len, &mut self.markup);
    }

    pub fn document_changed(&mut self, edit: &EditEvent) -> TrackerUpdate {
        if !self.listening {
            return TrackerUpdate::default();
        }
        let update = self
            .ranges
            .apply_edit(edit, &self.document, &self.matcher, &mut self.markup);
        self.check_comments();
        update
    }

    /// Replace `old_len` characters at `offset` with `text`, keeping the
    /// ranges in step
    pub fn apply_change(&mut self, offset: usize, old_len: usize, text: &str) -> Option<EditEvent> {
        if self.document.is_disposed() {
            return None;
        }
        let offset = self.document.clamp(offset);
        let planned = EditEvent {
            offset,
            old_len: old_len.min(self.document.len_chars() - offset),
            new_len: text.chars().count(),
        };
        self.before_document_change(&planned);
        let edit = self.document.replace(offset, old_len, text)?;
        self.document_changed(&edit);
        Some(edit)
    }

    pub fn apply_lsp_change(&mut self, change: &TextDocumentContentChangeEvent) -> Option<EditEvent> {
        let edit = self.document.edit_for_change(change)?;
        self.apply_change(edit.offset, edit.old_len, &change.text)
    }

    /// Hit-test `offset` against the tracked ranges on its line.
    ///
    /// The comment check is done on the spot and does not touch the stored
    /// activation state. A link whose target no longer exists is not hit.
    pub fn link_under(&self, offset: usize) -> Option<HitLink> {
        if !self.listening || offset >= self.document.len_chars() {
            return None;
        }
        let line_start = self.document.line_start_offset(offset);
        let line_end = self.document.line_end_offset(offset);

        let range = self
            .ranges
            .intersecting(offset, 0)
            .into_iter()
            .find(|r| r.start() >= line_start && r.end() <= line_end)?;

        if !range.target().is_valid() {
            log::trace!("Include target '{}' no longer exists", range.target_path());
            return None;
        }

        Some(HitLink {
            start: range.start(),
            end: range.end(),
            target_path: range.target_path().to_string(),
            target: range.target().clone(),
            active: is_comment(&self.document, range.start()),
        })
    }

    /// Active link under `offset`, as seen with the navigation modifier held
    pub fn active_link_at(&self, offset: usize) -> Option<HitLink> {
        self.link_under(offset).filter(|hit| hit.active)
    }

    /// Pointer moved to `offset`. Returns the affordance change to apply, if any.
    pub fn pointer_moved(&mut self, offset: usize, modifiers: Modifiers) -> Option<PointerFeedback> {
        if !self.listening {
            return None;
        }
        if modifiers.has(self.navigation_modifier) {
            if let Some(hit) = self.active_link_at(offset) {
                if let Some(tooltip) = hit.target.display_path() {
                    self.showing_link = true;
                    return Some(PointerFeedback {
                        affordance: Affordance::Pointer,
                        tooltip: Some(tooltip),
                    });
                }
            }
        }
        self.restore_affordance()
    }

    /// Pointer clicked at `offset`. Returns the navigation to perform, if any.
    pub fn pointer_clicked(
        &self,
        offset: usize,
        modifiers: Modifiers,
        click_count: u32,
    ) -> Option<NavigationRequest> {
        if !self.listening || click_count != 1 || !modifiers.has(self.navigation_modifier) {
            return None;
        }
        let hit = self.active_link_at(offset)?;
        let uri = hit.target.to_uri()?;
        log::trace!("Include target {} under pointer", hit.target.path().display());
        Some(NavigationRequest {
            target: hit.target.path().to_path_buf(),
            uri,
        })
    }

    /// A key was released; `modifiers` is the state after the release
    pub fn key_released(&mut self, modifiers: Modifiers) -> Option<PointerFeedback> {
        if modifiers.has(self.navigation_modifier) {
            return None;
        }
        self.restore_affordance()
    }

    fn restore_affordance(&mut self) -> Option<PointerFeedback> {
        if !std::mem::replace(&mut self.showing_link, false) {
            return None;
        }
        Some(PointerFeedback::restore())
    }
}
