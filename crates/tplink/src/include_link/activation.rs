//
// include_link/activation.rs
//
// Comment classification of document offsets
//

use tree_sitter::Node;

use super::document::LinkDocument;
use super::tracker::TokenClassifier;

/// Node kinds holding comment text in the template grammar
const COMMENT_KINDS: &[&str] = &["comment"];

/// Whether the character at `offset` lies inside a comment token.
///
/// Out-of-range offsets, unparsed and disposed documents classify as
/// non-comment.
pub fn is_comment(document: &LinkDocument, offset: usize) -> bool {
    if offset >= document.len_chars() {
        return false;
    }
    let Some(tree) = document.tree() else {
        return false;
    };
    let byte = document.contents().char_to_byte(offset);
    let Some(node) = tree.root_node().descendant_for_byte_range(byte, byte) else {
        return false;
    };
    is_inside_comment(&node)
}

fn is_inside_comment(node: &Node) -> bool {
    let mut current = *node;
    loop {
        if COMMENT_KINDS.contains(&current.kind()) {
            return true;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}

impl TokenClassifier for LinkDocument {
    fn is_comment(&self, offset: usize) -> bool {
        is_comment(self, offset)
    }
}
