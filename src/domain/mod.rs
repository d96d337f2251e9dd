//! Domain layer: category entities and hierarchy transforms
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod flatten;
pub mod search;

pub use arena::{CategoryArena, TreeNode};
pub use builder::{
    build_category_tree, BuildReport, CategoryForest, Orphan, OrphanPolicy, TreeBuilder,
};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use flatten::{flatten_categories, flatten_categories_from, PATH_SEPARATOR};
pub use search::{
    descendant_ids, find_category_by_id, get_all_parent_categories, parent_options, ParentOption,
};
