//
// include_link/tracker.rs
//
// Incremental tracking of include link ranges over a mutable document
//
// The set is kept sorted by (start, end, target_path) and never holds two
// equal ranges. After every operation the offsets are valid against the
// current document text, every rendered range is active and no inactive
// range holds a highlight.
//

use super::document::{EditEvent, LinkDocument};
use super::highlight::MarkupModel;
use super::pattern::{Candidate, LinkPatternMatcher};
use super::range::LinkRange;

/// Lexical classification used to decide whether a range is active
pub trait TokenClassifier {
    /// Whether the token at `offset` is comment text
    fn is_comment(&self, offset: usize) -> bool;
}

/// Outcome of a rescan or an incremental update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerUpdate {
    /// Ranges added to the set
    pub added: usize,
    /// Ranges dropped from the set
    pub removed: usize,
    /// Existing ranges confirmed by the scan and kept as-is
    pub kept: usize,
    /// Ranges moved by an edit
    pub shifted: usize,
}

/// Ordered, deduplicated set of include link ranges for one document
#[derive(Debug, Default)]
pub struct LinkRangeSet {
    ranges: Vec<LinkRange>,
}

impl LinkRangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkRange> {
        self.ranges.iter()
    }

    pub fn active(&self) -> impl Iterator<Item = &LinkRange> {
        self.ranges.iter().filter(|r| r.is_active())
    }

    fn position_of(&self, candidate: &Candidate) -> Result<usize, usize> {
        self.ranges.binary_search_by(|r| {
            (r.start(), r.end(), r.target_path()).cmp(&(
                candidate.start,
                candidate.end,
                candidate.target_path.as_str(),
            ))
        })
    }

    pub fn contains(&self, candidate: &Candidate) -> bool {
        self.position_of(candidate).is_ok()
    }

    /// Ranges meeting the closed interval `[offset, offset + length]`.
    ///
    /// A range that only touches either end counts, so an edit adjacent to a
    /// link revalidates it and a pointer on a link's last character hits it.
    pub fn intersecting(&self, offset: usize, length: usize) -> Vec<&LinkRange> {
        self.ranges
            .iter()
            .filter(|r| r.intersects(offset, length))
            .collect()
    }

    /// Rescan the whole document.
    ///
    /// Ranges equal to a fresh candidate keep their activation state and
    /// highlight; new ranges start inactive; ranges no longer found are
    /// released and dropped.
    pub fn full_rescan(
        &mut self,
        document: &LinkDocument,
        matcher: &LinkPatternMatcher,
        markup: &mut dyn MarkupModel,
    ) -> TrackerUpdate {
        if document.is_disposed() {
            return TrackerUpdate::default();
        }
        let candidates = matcher.find_candidates(&document.text(), 0, document.path_context());
        self.merge_full_scan(candidates, markup)
    }

    /// Replace the set with the result of a whole-document scan
    pub fn merge_full_scan(
        &mut self,
        candidates: Vec<Candidate>,
        markup: &mut dyn MarkupModel,
    ) -> TrackerUpdate {
        let mut update = TrackerUpdate::default();
        let mut previous = std::mem::take(&mut self.ranges);
        previous.sort();
        let mut next: Vec<LinkRange> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let existing = previous.binary_search_by(|r| {
                (r.start(), r.end(), r.target_path()).cmp(&(
                    candidate.start,
                    candidate.end,
                    candidate.target_path.as_str(),
                ))
            });
            match existing {
                Ok(idx) => {
                    next.push(previous.remove(idx));
                    update.kept += 1;
                }
                Err(_) => {
                    if next.iter().any(|r| r.matches(&candidate)) {
                        continue;
                    }
                    if let Some(range) = LinkRange::from_candidate(candidate) {
                        next.push(range);
                        update.added += 1;
                    }
                }
            }
        }

        for mut stale in previous {
            log::trace!(
                "Dropping include link '{}' at {}..{}",
                stale.target_path(),
                stale.start(),
                stale.end()
            );
            stale.release(markup);
            update.removed += 1;
        }

        next.sort();
        next.dedup();
        self.ranges = next;
        update
    }

    /// Deactivate and drop ranges overlapping `[start, end)`.
    ///
    /// Called before a deletion is applied so no highlight outlives the text
    /// under it. Returns the number of ranges dropped.
    pub fn forget(&mut self, start: usize, end: usize, markup: &mut dyn MarkupModel) -> usize {
        let (forgotten, kept): (Vec<LinkRange>, Vec<LinkRange>) = std::mem::take(&mut self.ranges)
            .into_iter()
            .partition(|r| r.overlaps(start, end));
        self.ranges = kept;

        let count = forgotten.len();
        for mut range in forgotten {
            range.release(markup);
        }
        if count > 0 {
            log::trace!("Forgot {} include links in {}..{}", count, start, end);
        }
        count
    }

    /// Bring the set up to date after `edit` was applied to `document`.
    ///
    /// Ranges at or after the edit are shifted; only the lines around the
    /// edit are rescanned. Ranges that intersected the edited text, or lie in
    /// the rescanned window, survive only if the rescan finds them again.
    /// Ranges that survive keep their activation and highlight; newly found
    /// ranges start inactive.
    pub fn apply_edit(
        &mut self,
        edit: &EditEvent,
        document: &LinkDocument,
        matcher: &LinkPatternMatcher,
        markup: &mut dyn MarkupModel,
    ) -> TrackerUpdate {
        let mut update = TrackerUpdate::default();
        if document.is_disposed() {
            return update;
        }

        let delta = edit.delta();
        let mut entries: Vec<(LinkRange, bool)> = std::mem::take(&mut self.ranges)
            .into_iter()
            .map(|r| {
                let intersecting = r.intersects(edit.offset, edit.old_len);
                (r, intersecting)
            })
            .collect();

        if delta != 0 {
            for (range, _) in entries.iter_mut() {
                if range.start() >= edit.offset {
                    range.shift(delta);
                    range.sync_highlight(markup);
                    update.shifted += 1;
                }
            }
        }

        let (window_start, window_end) = rescan_window(
            document,
            edit.offset,
            edit.offset + edit.new_len,
            matcher.keyword(),
        );
        let text = document.slice(window_start, window_end);
        let candidates = matcher.find_candidates(&text, window_start, document.path_context());

        let mut survivors: Vec<LinkRange> = Vec::with_capacity(entries.len() + candidates.len());
        for (mut range, intersecting) in entries {
            let in_window = range.start() >= window_start && range.end() <= window_end;
            let affected = intersecting || in_window;
            if affected && !candidates.iter().any(|c| range.matches(c)) {
                log::trace!(
                    "Edit invalidated include link '{}' at {}..{}",
                    range.target_path(),
                    range.start(),
                    range.end()
                );
                range.release(markup);
                update.removed += 1;
                continue;
            }
            if affected {
                update.kept += 1;
            }
            survivors.push(range);
        }

        survivors.sort();
        self.ranges = survivors;

        for candidate in candidates {
            match self.position_of(&candidate) {
                Ok(_) => {}
                Err(idx) => {
                    if let Some(range) = LinkRange::from_candidate(candidate) {
                        self.ranges.insert(idx, range);
                        update.added += 1;
                    }
                }
            }
        }

        update
    }

    /// Re-classify every range and re-render only the ones whose activation
    /// flipped. Returns the number of flipped ranges.
    pub fn check_comments(
        &mut self,
        classifier: &dyn TokenClassifier,
        markup: &mut dyn MarkupModel,
    ) -> usize {
        let mut flipped = 0;
        for range in self.ranges.iter_mut() {
            let is_comment = classifier.is_comment(range.start());
            if is_comment != range.is_active() {
                range.set_active(is_comment);
                range.render(markup);
                flipped += 1;
            }
        }
        flipped
    }

    /// Deactivate and drop every range
    pub fn clear(&mut self, markup: &mut dyn MarkupModel) -> usize {
        let count = self.ranges.len();
        for range in self.ranges.iter_mut() {
            range.release(markup);
        }
        self.ranges.clear();
        count
    }
}

/// Character span to rescan after an edit covering `[start, end)` of the
/// current text.
///
/// The span covers whole lines. It reaches back over a preceding line that
/// ends in `keyword` (a directive whose path sits on a later line) and forward
/// to the next non-blank line, so every directive touched by the edit is
/// scanned in full and no scanned directive continues past the span.
pub fn rescan_window(
    document: &LinkDocument,
    start: usize,
    end: usize,
    keyword: &str,
) -> (usize, usize) {
    let mut window_start = document.line_start_offset(start);
    while let Some(prev) = last_non_whitespace_before(document, window_start) {
        let keyword_len = keyword.chars().count();
        if prev + 1 < keyword_len || document.slice(prev + 1 - keyword_len, prev + 1) != keyword {
            break;
        }
        window_start = document.line_start_offset(prev);
    }

    let mut window_end = document.line_end_offset(end.max(start));
    let mut first_step = true;
    while let Some(next) = first_non_whitespace_from(document, window_end) {
        let ends_in_keyword = last_non_whitespace_before(document, window_end)
            .filter(|&last| last >= window_start)
            .map(|last| {
                let keyword_len = keyword.chars().count();
                last + 1 >= keyword_len
                    && document.slice(last + 1 - keyword_len, last + 1) == keyword
            })
            .unwrap_or(false);
        if !first_step && !ends_in_keyword {
            break;
        }
        first_step = false;
        window_end = document.line_end_offset(next);
    }

    (window_start, window_end)
}

fn last_non_whitespace_before(document: &LinkDocument, offset: usize) -> Option<usize> {
    let contents = document.contents();
    let offset = document.clamp(offset);
    let mut idx = offset;
    let mut chars = contents.chars_at(offset);
    while let Some(c) = chars.prev() {
        idx -= 1;
        if !c.is_whitespace() {
            return Some(idx);
        }
    }
    None
}

fn first_non_whitespace_from(document: &LinkDocument, offset: usize) -> Option<usize> {
    let contents = document.contents();
    let offset = document.clamp(offset);
    let mut idx = offset;
    for c in contents.chars_at(offset) {
        if !c.is_whitespace() {
            return Some(idx);
        }
        idx += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::include_link::highlight::HighlightLayer;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;
    use tower_lsp::lsp_types::Url;

    struct Fixture {
        _temp: TempDir,
        document: LinkDocument,
        matcher: LinkPatternMatcher,
        markup: HighlightLayer,
        set: LinkRangeSet,
    }

    /// Classifies every offset listed as comment text
    struct FixedComments(HashSet<usize>);

    impl TokenClassifier for FixedComments {
        fn is_comment(&self, offset: usize) -> bool {
            self.0.contains(&offset)
        }
    }

    fn fixture(files: &[&str], text: &str) -> Fixture {
        let temp = TempDir::new().unwrap();
        for file in files {
            fs::write(temp.path().join(file), "").unwrap();
        }
        let uri = Url::from_file_path(temp.path().join("page.html")).unwrap();
        let document = LinkDocument::new(uri, text, Some(1), Some(temp.path()));
        Fixture {
            _temp: temp,
            document,
            matcher: LinkPatternMatcher::default(),
            markup: HighlightLayer::new(),
            set: LinkRangeSet::new(),
        }
    }

    impl Fixture {
        fn rescan(&mut self) -> TrackerUpdate {
            self.set
                .full_rescan(&self.document, &self.matcher, &mut self.markup)
        }

        fn edit(&mut self, offset: usize, old_len: usize, text: &str) -> TrackerUpdate {
            if text.chars().count() < old_len {
                self.set
                    .forget(offset, offset + old_len, &mut self.markup);
            }
            let edit = self.document.replace(offset, old_len, text).unwrap();
            self.set
                .apply_edit(&edit, &self.document, &self.matcher, &mut self.markup)
        }

        fn spans(&self) -> Vec<(usize, usize, String)> {
            self.set
                .iter()
                .map(|r| (r.start(), r.end(), r.target_path().to_string()))
                .collect()
        }

        fn activate_all(&mut self) {
            let offsets = self.set.iter().map(|r| r.start()).collect();
            self.set
                .check_comments(&FixedComments(offsets), &mut self.markup);
        }
    }

    #[test]
    fn test_full_rescan_finds_path_only() {
        let mut f = fixture(&["foo.html"], "INCLUDE foo.html");
        let update = f.rescan();
        assert_eq!(update.added, 1);
        assert_eq!(f.spans(), vec![(8, 16, "foo.html".to_string())]);
        assert!(!f.set.iter().next().unwrap().is_active());
    }

    #[test]
    fn test_full_rescan_is_idempotent() {
        let mut f = fixture(
            &["a.html", "b.tpl"],
            "<!-- INCLUDE a.html -->\nINCLUDE b.tpl\nINCLUDE gone.html",
        );
        f.rescan();
        f.activate_all();
        let first = f.spans();
        let ids: Vec<_> = f.set.iter().map(|r| r.highlight()).collect();

        let update = f.rescan();
        assert_eq!(update.added, 0);
        assert_eq!(update.removed, 0);
        assert_eq!(update.kept, 2);
        assert_eq!(f.spans(), first);
        // Existing objects, activation and highlights survive
        let ids_after: Vec<_> = f.set.iter().map(|r| r.highlight()).collect();
        assert_eq!(ids, ids_after);
        assert!(f.set.iter().all(|r| r.is_active()));
    }

    #[test]
    fn test_full_rescan_drops_vanished_links() {
        let mut f = fixture(&["a.html"], "INCLUDE a.html");
        f.rescan();
        f.activate_all();
        assert_eq!(f.markup.len(), 1);

        fs::remove_file(f._temp.path().join("a.html")).unwrap();
        let update = f.rescan();
        assert_eq!(update.removed, 1);
        assert!(f.set.is_empty());
        assert!(f.markup.is_empty());
    }

    #[test]
    fn test_no_whitespace_no_link() {
        let mut f = fixture(&["foo.html"], "INCLUDEfoo.html");
        f.rescan();
        assert!(f.set.is_empty());
    }

    #[test]
    fn test_insert_before_link_shifts_it() {
        let text = format!("{} INCLUDE foo.html", "x".repeat(41));
        let mut f = fixture(&["foo.html"], &text);
        f.rescan();
        assert_eq!(f.spans(), vec![(50, 58, "foo.html".to_string())]);
        f.activate_all();
        let id = f.set.iter().next().unwrap().highlight();

        let update = f.edit(0, 0, "0123456789");
        assert_eq!(update.shifted, 1);
        assert_eq!(update.added, 0);
        assert_eq!(update.removed, 0);
        assert_eq!(f.spans(), vec![(60, 68, "foo.html".to_string())]);

        let range = f.set.iter().next().unwrap();
        assert!(range.is_active());
        assert_eq!(range.highlight(), id);
        let h = f.markup.get(id.unwrap()).unwrap();
        assert_eq!((h.start, h.end), (60, 68));
    }

    #[test]
    fn test_insert_on_other_line_keeps_link() {
        let mut f = fixture(&["foo.html"], "header\n\nfooter\nINCLUDE foo.html");
        f.rescan();
        f.activate_all();
        let update = f.edit(0, 0, "x");
        assert_eq!(update.removed, 0);
        assert_eq!(f.spans(), vec![(24, 32, "foo.html".to_string())]);
        assert_eq!(f.markup.len(), 1);
    }

    #[test]
    fn test_deleting_link_text_removes_range() {
        let mut f = fixture(&["foo.html"], "INCLUDE foo.html tail");
        f.rescan();
        f.activate_all();
        assert_eq!(f.markup.len(), 1);

        let update = f.edit(8, 8, "");
        assert_eq!(update.added, 0);
        assert!(f.set.is_empty());
        assert!(f.markup.is_empty());
        assert_eq!(f.document.text(), "INCLUDE  tail");
    }

    #[test]
    fn test_forget_releases_overlapping_ranges_once() {
        let mut f = fixture(
            &["a.html", "b.html", "c.html"],
            "INCLUDE a.html INCLUDE b.html INCLUDE c.html",
        );
        f.rescan();
        f.activate_all();
        assert_eq!(f.markup.len(), 3);
        let before = f.markup.metrics();

        // Spans the end of a.html through the start of b.html
        let forgotten = f.set.forget(12, 25, &mut f.markup);
        assert_eq!(forgotten, 2);
        assert_eq!(f.spans(), vec![(38, 44, "c.html".to_string())]);
        assert_eq!(f.markup.len(), 1);
        assert_eq!(f.markup.metrics().removed - before.removed, 2);
    }

    #[test]
    fn test_breaking_keyword_invalidates_link() {
        let mut f = fixture(&["foo.html"], "INCLUDE foo.html");
        f.rescan();
        f.activate_all();
        // INCLUDE -> INCLUDX, the path itself is untouched
        f.edit(6, 1, "X");
        assert!(f.set.is_empty());
        assert!(f.markup.is_empty());
    }

    #[test]
    fn test_editing_path_replaces_link() {
        let mut f = fixture(&["foo.html", "bar.html"], "INCLUDE foo.html");
        f.rescan();
        f.activate_all();
        f.edit(8, 3, "bar");
        assert_eq!(f.spans(), vec![(8, 16, "bar.html".to_string())]);
        // The replacement waits for the activation pass
        assert!(!f.set.iter().next().unwrap().is_active());
        assert!(f.markup.is_empty());
    }

    #[test]
    fn test_typing_a_new_directive() {
        let mut f = fixture(&["foo.html"], "line\n");
        f.rescan();
        for (i, c) in "INCLUDE foo.html".chars().enumerate() {
            f.edit(5 + i, 0, &c.to_string());
        }
        assert_eq!(f.spans(), vec![(13, 21, "foo.html".to_string())]);
    }

    #[test]
    fn test_directive_split_across_lines() {
        let mut f = fixture(&["foo.html"], "INCLUDE\nfoo.html\nrest");
        f.rescan();
        assert_eq!(f.spans(), vec![(8, 16, "foo.html".to_string())]);

        // Editing the path line must still see the keyword on the line above
        f.edit(9, 1, "o");
        assert_eq!(f.spans(), vec![(8, 16, "foo.html".to_string())]);
        f.edit(17, 4, "more");
        assert_eq!(f.spans(), vec![(8, 16, "foo.html".to_string())]);

        // Removing the keyword line invalidates the link on the next line
        f.edit(0, 7, "");
        assert!(f.set.is_empty());
    }

    #[test]
    fn test_identical_candidate_keeps_existing_object() {
        let mut f = fixture(&["foo.html"], "<!-- INCLUDE foo.html -->");
        f.rescan();
        f.activate_all();
        let id = f.set.iter().next().unwrap().highlight();
        let added_before = f.markup.metrics().added;

        // Retype a character of the path with itself
        f.edit(15, 1, "o");
        let range = f.set.iter().next().unwrap();
        assert!(range.is_active());
        assert_eq!(range.highlight(), id);
        assert_eq!(f.markup.metrics().added, added_before);
    }

    #[test]
    fn test_check_comments_flips_only_changed_ranges() {
        let mut f = fixture(&["a.html", "b.html"], "INCLUDE a.html\nINCLUDE b.html");
        f.rescan();
        let before = f.markup.metrics();

        let flipped = f
            .set
            .check_comments(&FixedComments(HashSet::from([8])), &mut f.markup);
        assert_eq!(flipped, 1);
        assert_eq!(f.markup.metrics().added - before.added, 1);

        // Same classification again: nothing flips, nothing re-renders
        let flipped = f
            .set
            .check_comments(&FixedComments(HashSet::from([8])), &mut f.markup);
        assert_eq!(flipped, 0);
        assert_eq!(f.markup.metrics().added - before.added, 1);

        let flipped = f
            .set
            .check_comments(&FixedComments(HashSet::new()), &mut f.markup);
        assert_eq!(flipped, 1);
        assert!(f.markup.is_empty());
    }

    #[test]
    fn test_intersecting_queries() {
        let mut f = fixture(&["a.html", "b.html"], "INCLUDE a.html INCLUDE b.html");
        f.rescan();
        let hit: Vec<&str> = f
            .set
            .intersecting(10, 0)
            .iter()
            .map(|r| r.target_path())
            .collect();
        assert_eq!(hit, vec!["a.html"]);
        assert_eq!(f.set.intersecting(0, 100).len(), 2);
        assert!(f.set.intersecting(0, 3).is_empty());

        // Touching either end counts
        assert_eq!(f.set.intersecting(14, 0).len(), 1);
        assert_eq!(f.set.intersecting(5, 3).len(), 1);
        assert!(f.set.intersecting(15, 0).is_empty());
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut f = fixture(&["a.html", "b.html"], "INCLUDE a.html INCLUDE b.html");
        f.rescan();
        f.activate_all();
        assert_eq!(f.set.clear(&mut f.markup), 2);
        assert!(f.set.is_empty());
        assert!(f.markup.is_empty());
        assert_eq!(f.set.clear(&mut f.markup), 0);
    }

    #[test]
    fn test_rescan_window_covers_whole_lines() {
        let f = fixture(&[], "aaa\nbbb ccc\nddd");
        assert_eq!(rescan_window(&f.document, 5, 6, "INCLUDE"), (4, 15));
    }

    #[test]
    fn test_rescan_window_reaches_back_over_keyword_line() {
        let f = fixture(&[], "x INCLUDE\n\n  foo.html\nafter");
        // Edit inside "foo.html" pulls in the keyword line
        let (start, _) = rescan_window(&f.document, 15, 16, "INCLUDE");
        assert_eq!(start, 0);
    }
}
