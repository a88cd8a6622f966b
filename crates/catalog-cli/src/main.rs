//! Schemata Catalog CLI
//!
//! Command-line interface for inspecting and patching container column trees
//! stored as catalog JSON documents.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use schemata_catalog_core::validation;
use schemata_catalog_core::{
    container_fields, ColumnNode, ColumnTreePatcher, Container, DuplicatePolicy, PatchOutcome,
    PatcherConfig, TagOption,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schemata")]
#[command(version, about = "Schemata column tree CLI", long_about = None)]
struct Cli {
    /// Fail instead of patching the first match when column FQNs repeat
    #[arg(long, global = true)]
    reject_duplicates: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set a column's tags to exactly the given list
    Tags {
        /// Container JSON document
        file: PathBuf,

        /// Fully-qualified name of the column to patch
        #[arg(short, long)]
        column: String,

        /// Tag to keep or apply, as FQN or FQN=source (repeatable; none clears)
        #[arg(short, long = "tag")]
        tags: Vec<TagOption>,

        /// Write the patched document here instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Overwrite a column's description
    Describe {
        /// Container JSON document
        file: PathBuf,

        /// Fully-qualified name of the column to patch
        #[arg(short, long)]
        column: String,

        /// New description (an empty string clears it)
        #[arg(short, long)]
        description: String,

        /// Write the patched document here instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the column tree of a container
    Show {
        /// Container JSON document
        file: PathBuf,
    },

    /// Check a container's column tree for duplicate or missing FQNs
    Validate {
        /// Container JSON document
        file: PathBuf,

        /// Maximum number of column levels
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Print the fields parameter needed to fetch containers with their tags
    Fields,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tags {
            file,
            column,
            tags,
            output,
        } => build_patcher(cli.reject_duplicates)
            .and_then(|patcher| patch_tags(&patcher, &file, &column, &tags, output.as_deref()))
            .map(drop),
        Commands::Describe {
            file,
            column,
            description,
            output,
        } => build_patcher(cli.reject_duplicates)
            .and_then(|patcher| {
                patch_description(&patcher, &file, &column, &description, output.as_deref())
            })
            .map(drop),
        Commands::Show { file } => show_container(&file),
        Commands::Validate { file, max_depth } => validate_container(&file, max_depth),
        Commands::Fields => {
            println!("{}", container_fields());
            Ok(())
        }
    };

    match result {
        Ok(()) => {}
        Err(e) if e.downcast_ref::<ColumnNotFound>().is_some() => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Raised by the patch commands when the target column does not exist.
#[derive(Debug, thiserror::Error)]
#[error("Column '{0}' not found")]
struct ColumnNotFound(String);

fn build_patcher(reject_duplicates: bool) -> CliResult<ColumnTreePatcher> {
    let mut config = PatcherConfig::from_env()?;
    if reject_duplicates {
        config.duplicate_policy = DuplicatePolicy::Reject;
    }
    Ok(ColumnTreePatcher::new(config))
}

fn load_container(path: &Path) -> CliResult<Container> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read '{}': {}", path.display(), e))?;
    Ok(Container::from_json(&json)?)
}

fn save_container(container: &Container, path: &Path) -> CliResult<()> {
    let mut json = container.to_json_pretty()?;
    json.push('\n');
    std::fs::write(path, json)
        .map_err(|e| format!("Cannot write '{}': {}", path.display(), e))?;
    Ok(())
}

/// Load, patch, and save a container document.
fn patch_file<F>(
    file: &Path,
    column: &str,
    output: Option<&Path>,
    patch: F,
) -> CliResult<PatchOutcome>
where
    F: FnOnce(&mut [ColumnNode]) -> schemata_catalog_core::Result<PatchOutcome>,
{
    let mut container = load_container(file)?;

    let outcome = match container.columns_mut() {
        Some(columns) => patch(columns)?,
        None => PatchOutcome::NotFound,
    };

    if !outcome.is_patched() {
        return Err(ColumnNotFound(column.to_string()).into());
    }

    let target = output.unwrap_or(file);
    save_container(&container, target)?;
    tracing::info!(column, path = %target.display(), "Wrote patched container");

    Ok(outcome)
}

fn patch_tags(
    patcher: &ColumnTreePatcher,
    file: &Path,
    column: &str,
    tags: &[TagOption],
    output: Option<&Path>,
) -> CliResult<PatchOutcome> {
    let outcome = patch_file(file, column, output, |columns| {
        patcher.patch_tags(columns, column, tags)
    })?;

    if tags.is_empty() {
        println!("Cleared tags on '{}'", column);
    } else {
        let fqns: Vec<&str> = tags.iter().map(|t| t.fqn.as_str()).collect();
        println!("Tagged '{}': {}", column, fqns.join(", "));
    }

    Ok(outcome)
}

fn patch_description(
    patcher: &ColumnTreePatcher,
    file: &Path,
    column: &str,
    description: &str,
    output: Option<&Path>,
) -> CliResult<PatchOutcome> {
    let outcome = patch_file(file, column, output, |columns| {
        patcher.patch_description(columns, column, description)
    })?;

    if description.is_empty() {
        println!("Cleared description on '{}'", column);
    } else {
        println!("Updated description on '{}'", column);
    }

    Ok(outcome)
}

fn show_container(file: &Path) -> CliResult<()> {
    let container = load_container(file)?;

    println!("Container: {}", container.fully_qualified_name);
    if let Some(desc) = &container.description {
        println!("Description: {}", desc);
    }
    if !container.tags.is_empty() {
        let tags: Vec<&str> = container.tags.iter().map(|t| t.tag_fqn.as_str()).collect();
        println!("Tags: {}", tags.join(", "));
    }

    println!("\nColumns:");
    match container.columns() {
        Some(columns) if !columns.is_empty() => {
            for line in render_columns(columns) {
                println!("{}", line);
            }
        }
        _ => println!("  (no data model)"),
    }

    Ok(())
}

/// One line per column, indented by depth.
fn render_columns(columns: &[ColumnNode]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut stack: Vec<(&ColumnNode, usize)> = columns.iter().rev().map(|c| (c, 1)).collect();

    while let Some((column, level)) = stack.pop() {
        let mut line = format!("{}{}", "  ".repeat(level), column.name);
        if let Some(data_type) = &column.data_type {
            line.push_str(&format!(" ({})", data_type));
        }
        if !column.tags.is_empty() {
            let tags: Vec<&str> = column.tags.iter().map(|t| t.tag_fqn.as_str()).collect();
            line.push_str(&format!(" [{}]", tags.join(", ")));
        }
        if let Some(desc) = &column.description {
            line.push_str(&format!(" - {}", desc));
        }
        lines.push(line);

        stack.extend(column.children.iter().rev().map(|c| (c, level + 1)));
    }

    lines
}

fn validate_container(file: &Path, max_depth: Option<usize>) -> CliResult<()> {
    let container = load_container(file)?;
    let max_depth = match max_depth {
        Some(depth) => depth,
        None => PatcherConfig::from_env()?.max_depth,
    };

    let columns = container.columns().unwrap_or_default();
    validation::validate_column_tree(columns, max_depth)?;

    println!("Column tree OK");
    println!("  Columns: {}", format_number(count_columns(columns)));
    println!("  Depth: {}", validation::tree_depth(columns));

    Ok(())
}

fn count_columns(columns: &[ColumnNode]) -> usize {
    columns
        .iter()
        .map(|column| 1 + count_columns(&column.children))
        .sum()
}

fn format_number(n: usize) -> String {
    let mut digits = n.to_string();
    let mut parts = Vec::new();

    while digits.len() > 3 {
        let chunk = digits.split_off(digits.len() - 3);
        parts.push(chunk);
    }
    parts.push(digits);
    parts.reverse();

    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemata_catalog_core::find_column;
    use serde_json::json;
    use tempfile::TempDir;

    /// Helper to write a small container document into a temp dir
    fn write_fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("container.json");
        let doc = json!({
            "name": "events",
            "fullyQualifiedName": "gcs.events",
            "tags": [],
            "dataModel": {
                "isPartitioned": true,
                "columns": [
                    {
                        "name": "user",
                        "fullyQualifiedName": "gcs.events.user",
                        "dataType": "STRUCT",
                        "tags": [],
                        "children": [
                            {
                                "name": "email",
                                "fullyQualifiedName": "gcs.events.user.email",
                                "dataType": "STRING",
                                "tags": [{
                                    "tagFQN": "PII.Sensitive",
                                    "labelType": "Propagated",
                                    "state": "Confirmed",
                                    "source": "Classification"
                                }]
                            }
                        ]
                    }
                ]
            },
            "owner": {"type": "team", "name": "data-platform"}
        });
        std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_patch_tags_writes_output() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(&dir);
        let output = dir.path().join("patched.json");
        let patcher = ColumnTreePatcher::default();

        let outcome = patch_tags(
            &patcher,
            &input,
            "gcs.events.user.email",
            &[
                "PII.Sensitive".parse::<TagOption>().unwrap(),
                "Business.Contact=glossary".parse::<TagOption>().unwrap(),
            ],
            Some(&output),
        )
        .unwrap();
        assert_eq!(outcome, PatchOutcome::Patched { depth: 1 });

        let patched = load_container(&output).unwrap();
        let email = find_column(patched.columns().unwrap(), "gcs.events.user.email").unwrap();
        assert_eq!(email.tags.len(), 2);
        assert_eq!(email.tags[0].tag_fqn, "PII.Sensitive");
        assert_eq!(email.tags[1].tag_fqn, "Business.Contact");
        assert_eq!(
            patched.extra.get("owner"),
            Some(&json!({"type": "team", "name": "data-platform"}))
        );

        // Input left alone when --output is given
        let original = load_container(&input).unwrap();
        let original_email =
            find_column(original.columns().unwrap(), "gcs.events.user.email").unwrap();
        assert_eq!(original_email.tags.len(), 1);
    }

    #[test]
    fn test_patch_description_in_place() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(&dir);
        let patcher = ColumnTreePatcher::default();

        patch_description(&patcher, &input, "gcs.events.user", "Acting user", None).unwrap();

        let patched = load_container(&input).unwrap();
        assert_eq!(
            patched.columns().unwrap()[0].description.as_deref(),
            Some("Acting user")
        );
    }

    #[test]
    fn test_missing_column_reports_not_found() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(&dir);
        let before = std::fs::read_to_string(&input).unwrap();
        let patcher = ColumnTreePatcher::default();

        let err = patch_description(&patcher, &input, "gcs.events.session", "x", None).unwrap_err();

        assert!(err.downcast_ref::<ColumnNotFound>().is_some());
        assert_eq!(err.to_string(), "Column 'gcs.events.session' not found");
        assert_eq!(std::fs::read_to_string(&input).unwrap(), before);
    }

    #[test]
    fn test_validate_container() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(&dir);

        assert!(validate_container(&input, Some(2)).is_ok());
        assert!(validate_container(&input, Some(1)).is_err());
    }

    #[test]
    fn test_render_columns() {
        let columns = vec![ColumnNode::new("user", "gcs.events.user")
            .with_data_type("STRUCT")
            .with_children(vec![ColumnNode::new("email", "gcs.events.user.email")
                .with_description("Login email")])];

        assert_eq!(
            render_columns(&columns),
            vec![
                "  user (STRUCT)".to_string(),
                "    email - Login email".to_string()
            ]
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1234567), "1,234,567");
    }
}
