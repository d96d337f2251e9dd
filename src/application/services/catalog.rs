//! Category catalog service
//!
//! Loads category records as the admin API returns them and runs the
//! hierarchy transforms with the configured settings.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::application::error_ext::{IoResultExt, JsonResultExt};
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{
    descendant_ids, find_category_by_id, flatten_categories, get_all_parent_categories,
    parent_options, BuildReport, CategoryForest, CategoryId, CategoryNode, CategoryRecord,
    DomainError, FlatCategory, OrphanPolicy, ParentOption, TreeBuilder,
};
use crate::infrastructure::traits::FileSystem;

/// Keys under which list endpoints wrap the category array.
const ENVELOPE_KEYS: [&str; 2] = ["categories", "data"];

/// Integrity overview of a category list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub total: usize,
    pub roots: usize,
    pub depth: usize,
    pub leaves: usize,
    pub report: BuildReport,
}

impl CheckSummary {
    pub fn is_clean(&self) -> bool {
        self.report.is_clean()
    }
}

/// Service for loading categories and building their hierarchy.
pub struct CatalogService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl CatalogService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Read and parse a category file.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<Vec<CategoryRecord>> {
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read categories", path)?;
        self.parse(&content, &path.display().to_string())
    }

    /// Parse category JSON: a bare array, or an object wrapping the array
    /// in `categories` or `data`.
    pub fn parse(&self, content: &str, origin: &str) -> ApplicationResult<Vec<CategoryRecord>> {
        let value: Value = serde_json::from_str(content).with_origin(origin)?;

        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => ENVELOPE_KEYS
                .iter()
                .find_map(|key| match map.remove(*key) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                })
                .ok_or_else(|| ApplicationError::Parse {
                    origin: origin.to_string(),
                    message: "expected an array of categories or an object with a \
                              'categories' or 'data' array"
                        .to_string(),
                })?,
            _ => {
                return Err(ApplicationError::Parse {
                    origin: origin.to_string(),
                    message: "expected an array of categories".to_string(),
                })
            }
        };

        let records = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<CategoryRecord>(item).map_err(|e| {
                    DomainError::InvalidRecord {
                        index,
                        message: e.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Parsed {} categories from {}", records.len(), origin);
        Ok(records)
    }

    /// Build the forest with the configured orphan policy.
    pub fn build(&self, records: &[CategoryRecord]) -> ApplicationResult<CategoryForest> {
        let builder = TreeBuilder::with_orphan_policy(self.settings.orphan_policy);
        Ok(builder.build(records)?)
    }

    /// Build the subtree below `parent_id`.
    pub fn build_under(
        &self,
        records: &[CategoryRecord],
        parent_id: &CategoryId,
    ) -> ApplicationResult<CategoryForest> {
        let builder = TreeBuilder::with_orphan_policy(self.settings.orphan_policy);
        Ok(builder.build_under(records, parent_id)?)
    }

    pub fn flatten(&self, tree: &[CategoryNode]) -> Vec<FlatCategory> {
        flatten_categories(tree, &self.settings.path_separator)
    }

    /// Breadcrumb of `id`: ancestors root first, then the category itself.
    pub fn breadcrumb<'a>(
        &self,
        records: &'a [CategoryRecord],
        id: &CategoryId,
    ) -> ApplicationResult<Vec<&'a CategoryRecord>> {
        let mut crumbs = get_all_parent_categories(records, id)?;
        if let Some(own) = records.iter().find(|r| &r.id == id) {
            crumbs.push(own);
        }
        Ok(crumbs)
    }

    /// Parent selector entries for the edit form of `editing` (or a new category).
    ///
    /// Errors when `editing` is not part of the built tree.
    pub fn options(
        &self,
        records: &[CategoryRecord],
        editing: Option<&CategoryId>,
    ) -> ApplicationResult<Vec<ParentOption>> {
        let tree = self.build(records)?.to_tree();
        if let Some(id) = editing {
            if find_category_by_id(&tree, id).is_none() {
                return Err(DomainError::UnknownCategory(id.clone()).into());
            }
            debug!(
                "Excluding {} and {} descendants from parent options",
                id,
                descendant_ids(&tree, id).len()
            );
        }
        let rows = self.flatten(&tree);
        Ok(parent_options(&rows, editing, &self.settings.indent))
    }

    /// Build with orphans reported rather than rejected and summarise the result.
    ///
    /// Cycles and duplicate ids still fail.
    #[instrument(level = "debug", skip(self, records), fields(records = records.len()))]
    pub fn check(&self, records: &[CategoryRecord]) -> ApplicationResult<CheckSummary> {
        let forest = TreeBuilder::with_orphan_policy(OrphanPolicy::Drop).build(records)?;
        let summary = CheckSummary {
            total: records.len(),
            roots: forest.arena.roots().len(),
            depth: forest.arena.depth(),
            leaves: forest.arena.leaf_nodes().len(),
            report: forest.report,
        };
        info!(
            "Checked {} categories: {} roots, depth {}, {} orphans",
            summary.total,
            summary.roots,
            summary.depth,
            summary.report.orphans.len()
        );
        Ok(summary)
    }
}
