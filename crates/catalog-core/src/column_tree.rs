//! In-place patching of nested container columns.
//!
//! Every patch goes through [`ColumnTreePatcher::apply`]: a read-only,
//! depth-bounded search records the index path to the first column whose
//! fully-qualified name matches, then the patch runs on that one column.
//! Nothing is mutated when the search fails, and a matched column's own
//! children are never visited.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::{DuplicatePolicy, PatcherConfig};
use crate::validation::{find_duplicate_fqn, find_missing_fqn, validate_tag_fqn};
use crate::{CatalogError, ColumnNode, Result, TagLabel, TagOption};

/// Result of a patch call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// A column matched and was patched; `depth` is 0 for top-level columns
    Patched { depth: usize },
    /// No column carries the target FQN; the tree is unchanged
    NotFound,
}

impl PatchOutcome {
    /// Returns true if a column was patched.
    pub fn is_patched(&self) -> bool {
        matches!(self, PatchOutcome::Patched { .. })
    }
}

/// Locates a column by fully-qualified name and patches it in place.
#[derive(Debug, Clone, Default)]
pub struct ColumnTreePatcher {
    config: PatcherConfig,
}

impl ColumnTreePatcher {
    pub fn new(config: PatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PatcherConfig {
        &self.config
    }

    /// Run `patch` on the first column, in depth-first order, whose
    /// fully-qualified name equals `target_fqn`.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::DuplicateFqn`] under [`DuplicatePolicy::Reject`]
    /// - [`CatalogError::MissingFqn`] when `require_fqn` is set
    /// - [`CatalogError::DepthLimitExceeded`] when the search would descend
    ///   past `max_depth` levels
    ///
    /// The tree is untouched whenever an error is returned.
    pub fn apply<F>(
        &self,
        columns: &mut [ColumnNode],
        target_fqn: &str,
        patch: F,
    ) -> Result<PatchOutcome>
    where
        F: FnOnce(&mut ColumnNode),
    {
        if target_fqn.is_empty() {
            debug!("Empty patch target never matches a column");
            return Ok(PatchOutcome::NotFound);
        }

        self.check_tree(columns)?;

        let mut path = Vec::new();
        if !self.locate(columns, target_fqn, 0, &mut path)? {
            debug!(target_fqn, "No column matched patch target");
            return Ok(PatchOutcome::NotFound);
        }

        let depth = path.len() - 1;
        match node_at_path_mut(columns, &path) {
            Some(column) => {
                patch(column);
                debug!(target_fqn, depth, "Patched column");
                Ok(PatchOutcome::Patched { depth })
            }
            None => Ok(PatchOutcome::NotFound),
        }
    }

    /// Reconcile the target column's tags to exactly `new_tags`.
    ///
    /// See [`reconcile_tags`] for the merge rule.
    pub fn patch_tags(
        &self,
        columns: &mut [ColumnNode],
        target_fqn: &str,
        new_tags: &[TagOption],
    ) -> Result<PatchOutcome> {
        if self.config.validate_tags {
            for tag in new_tags {
                validate_tag_fqn(&tag.fqn)?;
            }
        }

        self.apply(columns, target_fqn, |column| {
            column.tags = reconcile_tags(&column.tags, new_tags);
        })
    }

    /// Overwrite the target column's description.
    ///
    /// An empty string is stored as-is and clears the description.
    pub fn patch_description(
        &self,
        columns: &mut [ColumnNode],
        target_fqn: &str,
        description: &str,
    ) -> Result<PatchOutcome> {
        self.apply(columns, target_fqn, |column| {
            column.description = Some(description.to_string());
        })
    }

    fn check_tree(&self, columns: &[ColumnNode]) -> Result<()> {
        if self.config.require_fqn {
            if let Some(path) = find_missing_fqn(columns) {
                warn!(%path, "Rejecting column tree with a missing fully-qualified name");
                return Err(CatalogError::MissingFqn { path });
            }
        }

        if self.config.duplicate_policy == DuplicatePolicy::Reject {
            if let Some(fqn) = find_duplicate_fqn(columns) {
                warn!(%fqn, "Rejecting column tree with a duplicated fully-qualified name");
                return Err(CatalogError::DuplicateFqn(fqn));
            }
        }

        Ok(())
    }

    /// Depth-first search recording the sibling index at each level.
    fn locate(
        &self,
        columns: &[ColumnNode],
        target_fqn: &str,
        depth: usize,
        path: &mut Vec<usize>,
    ) -> Result<bool> {
        if depth >= self.config.max_depth {
            return Err(CatalogError::DepthLimitExceeded {
                limit: self.config.max_depth,
            });
        }

        for (idx, column) in columns.iter().enumerate() {
            path.push(idx);

            if column.fully_qualified_name == target_fqn {
                return Ok(true);
            }

            if !column.children.is_empty()
                && self.locate(&column.children, target_fqn, depth + 1, path)?
            {
                return Ok(true);
            }

            path.pop();
        }

        Ok(false)
    }
}

fn node_at_path_mut<'a>(
    columns: &'a mut [ColumnNode],
    path: &[usize],
) -> Option<&'a mut ColumnNode> {
    let (first, rest) = path.split_first()?;
    let column = columns.get_mut(*first)?;

    if rest.is_empty() {
        Some(column)
    } else {
        node_at_path_mut(&mut column.children, rest)
    }
}

/// Compute a column's tag list after the user picked `new_tags`.
///
/// - Existing tags named in `new_tags` are kept in their current order with
///   their label type, state and source untouched.
/// - Tags in `new_tags` that are not already kept are appended in input
///   order as confirmed manual labels.
/// - Existing tags not named in `new_tags` are dropped.
///
/// A FQN repeated in `new_tags` is added once, not once per occurrence, so
/// a column never ends up with the same tag twice from a single patch.
/// Duplicates already present on the column are left as they are.
pub fn reconcile_tags(existing: &[TagLabel], new_tags: &[TagOption]) -> Vec<TagLabel> {
    let wanted: HashSet<&str> = new_tags.iter().map(|tag| tag.fqn.as_str()).collect();

    let mut reconciled: Vec<TagLabel> = existing
        .iter()
        .filter(|tag| wanted.contains(tag.tag_fqn.as_str()))
        .cloned()
        .collect();

    let mut present: HashSet<String> =
        reconciled.iter().map(|tag| tag.tag_fqn.clone()).collect();

    for option in new_tags {
        if present.insert(option.fqn.clone()) {
            reconciled.push(TagLabel::from(option));
        }
    }

    reconciled
}

/// First column, in depth-first order, with the given FQN.
pub fn find_column<'a>(columns: &'a [ColumnNode], target_fqn: &str) -> Option<&'a ColumnNode> {
    let mut stack: Vec<&ColumnNode> = columns.iter().rev().collect();

    while let Some(column) = stack.pop() {
        if !target_fqn.is_empty() && column.fully_qualified_name == target_fqn {
            return Some(column);
        }
        stack.extend(column.children.iter().rev());
    }

    None
}

/// Reconcile a column's tags using the default patcher.
///
/// An absent tree is treated as empty. Returns true if a column was patched.
pub fn update_column_tags(
    columns: Option<&mut [ColumnNode]>,
    target_fqn: &str,
    new_tags: &[TagOption],
) -> bool {
    let Some(columns) = columns else {
        return false;
    };

    outcome_or_warn(
        ColumnTreePatcher::default().patch_tags(columns, target_fqn, new_tags),
        target_fqn,
    )
}

/// Overwrite a column's description using the default patcher.
///
/// An absent tree is treated as empty. Returns true if a column was patched.
pub fn update_column_description(
    columns: Option<&mut [ColumnNode]>,
    target_fqn: &str,
    description: &str,
) -> bool {
    let Some(columns) = columns else {
        return false;
    };

    outcome_or_warn(
        ColumnTreePatcher::default().patch_description(columns, target_fqn, description),
        target_fqn,
    )
}

fn outcome_or_warn(result: Result<PatchOutcome>, target_fqn: &str) -> bool {
    match result {
        Ok(outcome) => outcome.is_patched(),
        Err(e) => {
            warn!(target_fqn, error = %e, "Column patch skipped");
            false
        }
    }
}
