//
// utf16.rs
//
// Conversions between LSP positions (UTF-16 columns) and character offsets
//

use ropey::Rope;
use tower_lsp::lsp_types::Position;

/// Convert an LSP position into a character offset into `contents`.
///
/// Lines past the end clamp to the document length and columns past the end
/// of a line clamp to the line end (before its terminator).
pub fn position_to_offset(contents: &Rope, position: Position) -> usize {
    let line = position.line as usize;
    if line >= contents.len_lines() {
        return contents.len_chars();
    }

    let line_start = contents.line_to_char(line);
    let line_slice = contents.line(line);
    let content_chars = line_content_chars(&line_slice.to_string());
    let max_utf16 = line_slice.char_to_utf16_cu(content_chars);
    let utf16_col = (position.character as usize).min(max_utf16);

    line_start + line_slice.utf16_cu_to_char(utf16_col)
}

/// Convert a character offset into an LSP position. Offsets past the end clamp.
pub fn offset_to_position(contents: &Rope, offset: usize) -> Position {
    let offset = offset.min(contents.len_chars());
    let line = contents.char_to_line(offset);
    let line_start = contents.line_to_char(line);
    let column = contents.line(line).char_to_utf16_cu(offset - line_start);
    Position::new(line as u32, column as u32)
}

/// Number of characters on a line, excluding its terminator.
fn line_content_chars(line: &str) -> usize {
    line.trim_end_matches(['\n', '\r']).chars().count()
}
