// src/output.rs

//! Rendering change events and reload batches for stdout.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::reload::PathUpdates;
use crate::types::{ChangeEvent, OutputFormat};

/// One line for a single change event.
pub fn format_event(event: &ChangeEvent, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(event.to_string()),
        OutputFormat::Json => Ok(serde_json::to_string(event)?),
    }
}

#[derive(Serialize)]
struct ReloadLine {
    created: Vec<String>,
    modified: Vec<String>,
    deleted: Vec<String>,
}

/// One line for a debounced reload batch, with paths relative to `root`.
pub fn format_updates(updates: &PathUpdates, root: &Path, format: OutputFormat) -> Result<String> {
    let line = ReloadLine {
        created: relative(updates.created(), root),
        modified: relative(updates.modified(), root),
        deleted: relative(updates.deleted(), root),
    };

    match format {
        OutputFormat::Json => Ok(serde_json::to_string(&line)?),
        OutputFormat::Text => Ok(format!(
            "reload: created [{}] modified [{}] deleted [{}]",
            line.created.join(", "),
            line.modified.join(", "),
            line.deleted.join(", "),
        )),
    }
}

fn relative(paths: &BTreeSet<PathBuf>, root: &Path) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            p.strip_prefix(root)
                .unwrap_or(p)
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}
