//! Catalog rules that sit on top of the store: slug derivation, category
//! tree resolution and incremental rating maintenance.

pub mod rating;
pub mod slug;
pub mod tree;

pub use rating::{apply_new_review, apply_removed_review, apply_restored_review};
pub use slug::slugify;
pub use tree::{descendant_ids, CategoryChildren};
