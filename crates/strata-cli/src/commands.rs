//! Command implementations

use colored::Colorize;
use std::path::Path;
use strata_core::{ConfigManager, Document, ImportOptions};

use crate::error::{CliError, Result};

/// Print a document as YAML, or pretty JSON with `json`.
fn print_document(manager: &ConfigManager, document: &Document, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(document)?);
    } else {
        let text = manager
            .codec()
            .encode(document)
            .map_err(strata_core::Error::Encode)?;
        print!("{text}");
    }
    Ok(())
}

pub fn run_get(manager: &mut ConfigManager, path: &str, exact: bool, json: bool) -> Result<()> {
    let document = manager
        .get_with(path, !exact)?
        .ok_or_else(|| CliError::user(format!("No configuration found for '{path}'")))?;
    print_document(manager, &document, json)
}

pub fn run_source(manager: &mut ConfigManager, path: &str) -> Result<()> {
    let layer = manager
        .get_one_source(path)?
        .ok_or_else(|| CliError::user(format!("No layer stored at '{path}'")))?;

    if let Some(attrs) = &layer.attrs {
        eprintln!(
            "{} rev {} by {} at {}",
            path.cyan(),
            attrs.revision,
            attrs.user,
            attrs.timestamp
        );
    }
    print!("{}", layer.text);
    Ok(())
}

pub fn run_set(
    manager: &mut ConfigManager,
    path: &str,
    value: Option<&str>,
    file: Option<&Path>,
    user: Option<&str>,
) -> Result<()> {
    let text = match (value, file) {
        (Some(value), _) => value.to_string(),
        (None, Some(file)) => std::fs::read_to_string(file)?,
        (None, None) => return Err(CliError::user("Nothing to store; give a value or --file")),
    };

    // Reject text the resolver could not read back.
    manager.codec().decode(&text).map_err(|source| strata_core::Error::Decode {
        path: path.to_string(),
        source,
    })?;

    if manager.set_as(path, &text, user)? {
        println!("{} {}", "Stored".green(), path);
        Ok(())
    } else {
        Err(CliError::user(format!("Write to '{path}' was not applied")))
    }
}

pub fn run_delete(manager: &mut ConfigManager, pattern: &str) -> Result<()> {
    let deleted = strata_core::delete_matching(manager, pattern)?;
    if deleted == 0 {
        println!("{} Nothing matched '{}'", "!".yellow(), pattern);
    } else {
        println!("{} Deleted {} layer(s)", "OK".green().bold(), deleted);
    }
    Ok(())
}

pub fn run_keys(manager: &mut ConfigManager, pattern: &str) -> Result<()> {
    for path in manager.keys(pattern)? {
        println!("{path}");
    }
    Ok(())
}

pub fn run_tree(manager: &mut ConfigManager, pattern: &str) -> Result<()> {
    manager.load_cache(pattern, None)?;
    let tree = manager.get_tree(pattern)?;
    print_document(manager, &tree, false)
}

pub fn run_import(
    manager: &mut ConfigManager,
    dir: &Path,
    root: Option<String>,
    file_as_path: bool,
    ext: String,
    exclude: Vec<String>,
) -> Result<()> {
    if !dir.is_dir() {
        return Err(CliError::user(format!("Not a directory: {}", dir.display())));
    }
    let options = ImportOptions {
        root,
        extension: ext,
        file_as_path,
        exclude,
    };
    let count = strata_core::import_directory(manager, dir, &options)?;
    println!("{} Imported {} layer(s)", "OK".green().bold(), count);
    Ok(())
}
