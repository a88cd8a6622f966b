//! Input validation for Schemata column trees
//!
//! Provides validation functions to catch:
//! - Malformed fully-qualified names
//! - Tag FQNs that cannot name a tag definition
//! - Column trees with duplicated or missing identifiers
//! - Excessively deep trees
//!
//! Tree walks here use an explicit stack so that a pathological tree
//! cannot exhaust the call stack before the depth check fires.

use std::collections::HashSet;

use crate::{CatalogError, ColumnNode, Result};

/// Maximum length for column and entity FQNs
pub const MAX_FQN_LEN: usize = 3072;

/// Maximum length for tag FQNs
pub const MAX_TAG_FQN_LEN: usize = 512;

/// Split an FQN on dots that are not inside a quoted segment.
///
/// Returns `None` if a quote is left open.
fn split_fqn(fqn: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, c) in fqn.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => {
                segments.push(&fqn[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }

    if in_quotes {
        return None;
    }

    segments.push(&fqn[start..]);
    Some(segments)
}

/// Validate a fully-qualified name
///
/// Requirements:
/// - Not empty
/// - <= 3072 bytes
/// - No control characters
/// - Balanced quotes, no empty dot-separated segment
pub fn validate_fqn(fqn: &str) -> Result<()> {
    if fqn.is_empty() {
        return Err(CatalogError::ValidationError(
            "Fully-qualified name cannot be empty".to_string(),
        ));
    }

    if fqn.len() > MAX_FQN_LEN {
        return Err(CatalogError::ValidationError(format!(
            "Fully-qualified name too long: {} > {} bytes",
            fqn.len(),
            MAX_FQN_LEN
        )));
    }

    if fqn.chars().any(char::is_control) {
        return Err(CatalogError::ValidationError(
            "Fully-qualified name contains control characters".to_string(),
        ));
    }

    let segments = split_fqn(fqn).ok_or_else(|| {
        CatalogError::ValidationError(format!("Unbalanced quotes in '{}'", fqn))
    })?;

    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(CatalogError::ValidationError(format!(
            "Fully-qualified name has an empty segment: '{}'",
            fqn
        )));
    }

    Ok(())
}

/// Validate a tag FQN
///
/// Requirements:
/// - Everything [`validate_fqn`] checks
/// - <= 512 bytes
/// - At least two segments: the classification (or glossary) and the tag
pub fn validate_tag_fqn(fqn: &str) -> Result<()> {
    validate_fqn(fqn)?;

    if fqn.len() > MAX_TAG_FQN_LEN {
        return Err(CatalogError::ValidationError(format!(
            "Tag FQN too long: {} > {} bytes",
            fqn.len(),
            MAX_TAG_FQN_LEN
        )));
    }

    let segments = split_fqn(fqn).map(|s| s.len()).unwrap_or(0);
    if segments < 2 {
        return Err(CatalogError::ValidationError(format!(
            "Tag FQN must name a classification and a tag: '{}'",
            fqn
        )));
    }

    Ok(())
}

/// Number of levels in a column tree (0 when empty, 1 for a flat list).
pub fn tree_depth(columns: &[ColumnNode]) -> usize {
    let mut stack: Vec<(&ColumnNode, usize)> = columns.iter().map(|c| (c, 1)).collect();
    let mut depth = 0;

    while let Some((column, level)) = stack.pop() {
        depth = depth.max(level);
        stack.extend(column.children.iter().map(|child| (child, level + 1)));
    }

    depth
}

/// First FQN, in depth-first order, that appears on more than one column.
///
/// Columns with an empty FQN are skipped; see [`find_missing_fqn`].
pub fn find_duplicate_fqn(columns: &[ColumnNode]) -> Option<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&ColumnNode> = columns.iter().rev().collect();

    while let Some(column) = stack.pop() {
        let fqn = column.fully_qualified_name.as_str();
        if !fqn.is_empty() && !seen.insert(fqn) {
            return Some(fqn.to_string());
        }
        stack.extend(column.children.iter().rev());
    }

    None
}

/// Index path of the first column, in depth-first order, with an empty FQN.
///
/// Paths read like `columns[1].children[0]`.
pub fn find_missing_fqn(columns: &[ColumnNode]) -> Option<String> {
    let mut stack: Vec<(&ColumnNode, String)> = columns
        .iter()
        .enumerate()
        .rev()
        .map(|(idx, column)| (column, format!("columns[{}]", idx)))
        .collect();

    while let Some((column, path)) = stack.pop() {
        if column.fully_qualified_name.is_empty() {
            return Some(path);
        }
        stack.extend(
            column
                .children
                .iter()
                .enumerate()
                .rev()
                .map(|(idx, child)| (child, format!("{}.children[{}]", path, idx))),
        );
    }

    None
}

/// Validate a whole column tree
///
/// Requirements:
/// - Every column has a fully-qualified name
/// - No fully-qualified name is used twice
/// - No more than `max_depth` levels
pub fn validate_column_tree(columns: &[ColumnNode], max_depth: usize) -> Result<()> {
    if let Some(path) = find_missing_fqn(columns) {
        return Err(CatalogError::MissingFqn { path });
    }

    if let Some(fqn) = find_duplicate_fqn(columns) {
        return Err(CatalogError::DuplicateFqn(fqn));
    }

    if tree_depth(columns) > max_depth {
        return Err(CatalogError::DepthLimitExceeded { limit: max_depth });
    }

    Ok(())
}
