//
// include_link/document.rs
//
// Open template document: text, syntax tree and liveness
//

use std::path::Path;

use ropey::Rope;
use tower_lsp::lsp_types::{Position, Range, TextDocumentContentChangeEvent, Url};
use tree_sitter::Tree;

use super::path_resolve::PathContext;
use crate::parser_pool::parse_html;
use crate::utf16::{offset_to_position, position_to_offset};

/// A text mutation in character offsets: `old_len` characters at `offset`
/// were replaced by `new_len` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditEvent {
    pub offset: usize,
    pub old_len: usize,
    pub new_len: usize,
}

impl EditEvent {
    pub fn delta(&self) -> isize {
        self.new_len as isize - self.old_len as isize
    }

    pub fn is_deletion(&self) -> bool {
        self.new_len < self.old_len
    }
}

/// An open document
pub struct LinkDocument {
    uri: Url,
    context: PathContext,
    contents: Rope,
    tree: Option<Tree>,
    version: Option<i32>,
    revision: u64,
    disposed: bool,
}

impl LinkDocument {
    pub fn new(uri: Url, text: &str, version: Option<i32>, workspace_root: Option<&Path>) -> Self {
        let context = PathContext::new(&uri, workspace_root);
        let contents = Rope::from_str(text);
        let tree = parse_html(text);
        Self {
            uri,
            context,
            contents,
            tree,
            version,
            revision: 0,
            disposed: false,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn path_context(&self) -> &PathContext {
        &self.context
    }

    pub fn contents(&self) -> &Rope {
        &self.contents
    }

    pub fn tree(&self) -> Option<&Tree> {
        if self.disposed {
            return None;
        }
        self.tree.as_ref()
    }

    pub fn version(&self) -> Option<i32> {
        self.version
    }

    pub fn set_version(&mut self, version: i32) {
        self.version = Some(version);
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Mark the document closed. Every query afterwards returns "no result".
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.tree = None;
    }

    pub fn set_workspace_root(&mut self, workspace_root: Option<&Path>) {
        self.context = PathContext::new(&self.uri, workspace_root);
    }

    pub fn len_chars(&self) -> usize {
        if self.disposed {
            return 0;
        }
        self.contents.len_chars()
    }

    pub fn text(&self) -> String {
        if self.disposed {
            return String::new();
        }
        self.contents.to_string()
    }

    /// Clamp an offset to `[0, len]`
    pub fn clamp(&self, offset: usize) -> usize {
        offset.min(self.len_chars())
    }

    /// Text of `[start, end)`, clamped
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = self.clamp(end);
        let start = self.clamp(start).min(end);
        self.contents.slice(start..end).to_string()
    }

    /// Offset of the first character of the line containing `offset`
    pub fn line_start_offset(&self, offset: usize) -> usize {
        let offset = self.clamp(offset);
        let line = self.contents.char_to_line(offset);
        self.contents.line_to_char(line)
    }

    /// Offset of the end of the line containing `offset`, before its terminator
    pub fn line_end_offset(&self, offset: usize) -> usize {
        let offset = self.clamp(offset);
        let line = self.contents.char_to_line(offset);
        let line_start = self.contents.line_to_char(line);
        let mut end = line_start + self.contents.line(line).len_chars();
        while end > line_start && is_line_break(self.contents.char(end - 1)) {
            end -= 1;
        }
        end
    }

    pub fn position_to_offset(&self, position: Position) -> usize {
        position_to_offset(&self.contents, position)
    }

    pub fn offset_to_position(&self, offset: usize) -> Position {
        offset_to_position(&self.contents, self.clamp(offset))
    }

    pub fn range_of(&self, start: usize, end: usize) -> Range {
        Range::new(self.offset_to_position(start), self.offset_to_position(end))
    }

    /// Replace `old_len` characters at `offset` with `text`.
    ///
    /// Offsets are clamped to the document. Returns `None` for a disposed
    /// document.
    pub fn replace(&mut self, offset: usize, old_len: usize, text: &str) -> Option<EditEvent> {
        if self.disposed {
            return None;
        }
        let offset = self.clamp(offset);
        let old_len = old_len.min(self.len_chars() - offset);

        self.contents.remove(offset..offset + old_len);
        self.contents.insert(offset, text);
        self.revision += 1;
        self.tree = parse_html(&self.contents.to_string());

        Some(EditEvent {
            offset,
            old_len,
            new_len: text.chars().count(),
        })
    }

    /// Translate an LSP content change into an edit event without applying it
    pub fn edit_for_change(&self, change: &TextDocumentContentChangeEvent) -> Option<EditEvent> {
        if self.disposed {
            return None;
        }
        let new_len = change.text.chars().count();
        match change.range {
            Some(range) => {
                let start = self.position_to_offset(range.start);
                let end = self.position_to_offset(range.end).max(start);
                Some(EditEvent {
                    offset: start,
                    old_len: end - start,
                    new_len,
                })
            }
            None => Some(EditEvent {
                offset: 0,
                old_len: self.len_chars(),
                new_len,
            }),
        }
    }
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}
