//! cattree: catalog category hierarchies.
//!
//! Builds sorted category trees from the flat records a storefront admin API
//! returns, flattens them into breadcrumb rows and answers lookup queries.
//!
//! ```
//! use cattree::domain::{build_category_tree, flatten_categories, CategoryRecord, PATH_SEPARATOR};
//!
//! let records = vec![
//!     CategoryRecord::new("1", "Men").with_display_order(2),
//!     CategoryRecord::new("2", "Women").with_display_order(1),
//!     CategoryRecord::new("3", "Shirts").with_parent("1"),
//! ];
//! let tree = build_category_tree(&records).unwrap();
//! let rows = flatten_categories(&tree, PATH_SEPARATOR);
//!
//! assert_eq!(rows[2].path, "Men > Shirts");
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;
