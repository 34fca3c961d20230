//! finding and reading inventory yaml files
//!
//! Files are found recursively below a root directory by extension. Before a file is parsed,
//! [looks_relevant] checks its raw text for any recognized task name so that the bulk of an
//! ansible tree never reaches the yaml parser.
use std::path::{Path, PathBuf};

pub const EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Marker key inside `vars` that turns on vars-file merging
pub const VARS_FILES_MARKER: &str = "_vars_files";

/// Expands a leading `~/` to the home directory of the current user
pub fn expand_home(path: &str) -> PathBuf {
    let Some(rest) = path.strip_prefix("~/") else {
        return PathBuf::from(path);
    };

    match home::home_dir() {
        Some(home) => home.join(rest),
        None => {
            tracing::warn!(path, "home directory unknown, using path as is");
            PathBuf::from(path)
        }
    }
}

/// All files below `root` with one of `extensions`, in a stable order
///
/// Unreadable directories are logged and skipped.
pub fn find_files(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    tracing::info!(root=%root.display(), ?extensions, "searching for files");

    let mut files = vec![];
    for entry in walkdir::WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error=%e, "skipping unreadable path");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let matches_extension = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.contains(&ext));
        if matches_extension {
            files.push(entry.into_path());
        }
    }

    files
}

pub fn load_text(path: &Path) -> Result<String, LoadError> {
    tracing::debug!(path=%path.display(), "open");
    Ok(std::fs::read_to_string(path)?)
}

/// Pure substring test: does `text` mention any task name or the vars-file marker?
pub fn looks_relevant(text: &str, task_names: &[String]) -> bool {
    task_names
        .iter()
        .map(String::as_str)
        .chain([VARS_FILES_MARKER])
        .any(|needle| text.contains(needle))
}

/// Reads and parses a file, skipping it when it is not relevant
///
/// Returns `Ok(None)` for empty or irrelevant files.
pub fn read_yaml(
    path: &Path,
    task_names: &[String],
) -> Result<Option<serde_yaml::Value>, LoadError> {
    let text = load_text(path)?;
    if text.is_empty() {
        return Ok(None);
    }

    if !looks_relevant(&text, task_names) {
        tracing::debug!(path=%path.display(), "not a deployment file, skip");
        return Ok(None);
    }

    Ok(Some(serde_yaml::from_str(&text)?))
}

/// Reads and parses a file without the relevance check
///
/// Returns `Ok(None)` for empty files.
pub fn read_yaml_unfiltered(path: &Path) -> Result<Option<serde_yaml::Value>, LoadError> {
    let text = load_text(path)?;
    if text.is_empty() {
        return Ok(None);
    }

    Ok(Some(serde_yaml::from_str(&text)?))
}

/// Like [read_yaml] but never fails: errors are logged and the file yields nothing
///
/// Used while scanning the tree, where one broken file must not stop discovery.
pub fn read_candidate(path: &Path, task_names: &[String]) -> Option<serde_yaml::Value> {
    match read_yaml(path, task_names) {
        Ok(document) => document,
        Err(e) => {
            tracing::error!(path=%path.display(), error=%e, "unable to load file");
            None
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse yaml file")]
    YamlParseFailed(#[from] serde_yaml::Error),
}
