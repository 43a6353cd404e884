//
// parser_pool.rs
//
// Thread-local HTML parser pool for efficient parser reuse
//

use std::cell::RefCell;
use tree_sitter::{Parser, Tree};

thread_local! {
    static PARSER: RefCell<Option<Parser>> = RefCell::new({
        let mut parser = Parser::new();
        match parser.set_language(&tree_sitter_html::LANGUAGE.into()) {
            Ok(()) => Some(parser),
            Err(e) => {
                log::warn!("Failed to load the HTML grammar: {}", e);
                None
            }
        }
    });
}

/// Execute a function with a thread-local parser instance.
/// The parser is reused across calls on the same thread. Returns `None` when
/// the grammar could not be loaded.
pub fn with_parser<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut Parser) -> R,
{
    PARSER.with(|parser| parser.borrow_mut().as_mut().map(f))
}

/// Parse template text into a syntax tree.
pub fn parse_html(text: &str) -> Option<Tree> {
    with_parser(|parser| parser.parse(text, None)).flatten()
}
