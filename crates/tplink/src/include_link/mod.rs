//
// include_link/mod.rs
//
// Include link detection and tracking for template documents
//

pub mod activation;
pub mod config;
pub mod document;
pub mod highlight;
pub mod initial_scan;
pub mod path_resolve;
pub mod pattern;
pub mod range;
pub mod registry;
pub mod session;
pub mod tracker;


pub use activation::is_comment;
pub use config::*;
pub use document::{EditEvent, LinkDocument};
pub use highlight::*;
pub use initial_scan::*;
pub use path_resolve::*;
pub use pattern::*;
pub use range::LinkRange;
pub use registry::*;
pub use session::*;
pub use tracker::*;
