//! Path handling primitives
//!
//! Everything that turns untrusted caller input into a filesystem location
//! lives here: the two sanitization policies and the root-confined resolver
//! that every read, delete and serve operation must pass through.

pub mod resolve;
pub mod sanitize;

pub use resolve::resolve_under_root;
pub use sanitize::{sanitize_dir_path, sanitize_folder_name};
