//! task metadata extraction
//!
//! An inventory document is a list of entries. Entries with both `hosts` and a non-empty `vars`
//! mapping are inspected for recognized task names:
//!
//! ```yaml
//! - hosts: [host-1.example.com]
//!   vars:
//!     _deploy_cert:
//!       tags: [reload]               # global: appended to every descriptor
//!       args: ["-v"]                 # global: appended to every descriptor
//!       nolimit: false               # true clears the host filter
//!       notags: false                # true allows descriptors without tags
//!       deployment_groups:
//!         - dg: example.com_2024     # required
//!           tags: [nginx_ssl_conf]   # required unless `notags`
//!           domain: example.com      # anything else becomes `-e 'domain="example.com"'`
//! ```
//!
//! A `_deployment_groups` list directly in `vars` replaces the `deployment_groups` of every task
//! in that entry.
use crate::config::Config;
use crate::descriptor::Descriptor;
use crate::source::{self, LoadError, VARS_FILES_MARKER};
use crate::value::ValueExt;
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

pub const GLOBAL_DEPLOYMENT_GROUPS: &str = "_deployment_groups";

/// Descriptors grouped by task name, in discovery order
pub type TaskMap<D> = IndexMap<String, Vec<D>>;

/// Values every descriptor of an entry inherits from the entry itself
#[derive(Debug, Clone, derive_new::new)]
pub struct EntryContext {
    pub playbook: PathBuf,
    pub hosts: Option<String>,
}

#[derive(derive_new::new)]
pub struct Extractor<'c> {
    config: &'c Config,
}

impl<'c> Extractor<'c> {
    /// Extracts descriptors from every qualifying entry of `document`
    pub fn extract_document(
        &self,
        document: &Value,
        source: &Path,
    ) -> Result<TaskMap<Descriptor>, DiscoveryError> {
        let mut result = TaskMap::new();

        let Some(entries) = document.as_sequence() else {
            return Ok(result);
        };

        for entry in entries {
            let Some(entry) = entry.as_mapping() else {
                continue;
            };

            let Some(vars) = self.entry_vars(entry, source)? else {
                continue;
            };

            let context = EntryContext::new(
                source.to_owned(),
                entry.get("hosts").and_then(ValueExt::to_hosts),
            );

            for (task, descriptors) in self.extract_vars(&vars, &context)? {
                result.entry(task).or_default().extend(descriptors);
            }
        }

        Ok(result)
    }

    /// The entry's `vars` with vars-files merged in, or `None` if the entry does not qualify
    fn entry_vars(
        &self,
        entry: &Mapping,
        source: &Path,
    ) -> Result<Option<Mapping>, DiscoveryError> {
        let Some(vars) = entry.get("vars") else {
            return Ok(None);
        };

        if !vars.is_truthy() || !entry.contains_key("hosts") {
            return Ok(None);
        }

        let Some(vars) = vars.as_mapping() else {
            return Ok(None);
        };

        let mut vars = vars.clone();
        if let Some(marker) = vars.get(VARS_FILES_MARKER).cloned() {
            let listed = entry
                .get("vars_files")
                .filter(|files| files.is_sequence())
                .unwrap_or(&marker);

            for vars_file in listed.to_string_list() {
                let path = resolve_vars_file(source, &vars_file);
                if let Some(file_vars) = self.load_vars_file(&path)? {
                    vars.extend(file_vars);
                }
            }
        }

        if vars.is_empty() {
            return Ok(None);
        }

        Ok(Some(vars))
    }

    fn load_vars_file(&self, path: &Path) -> Result<Option<Mapping>, DiscoveryError> {
        let document =
            source::read_yaml_unfiltered(path).map_err(|source| DiscoveryError::VarsFile {
                path: path.to_owned(),
                source,
            })?;

        match document {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Mapping(mapping)) => Ok(Some(mapping)),
            Some(_) => Err(DiscoveryError::VarsFileNotMapping(path.to_owned())),
        }
    }

    /// Extracts descriptors for every recognized task in one `vars` mapping
    pub fn extract_vars(
        &self,
        vars: &Mapping,
        context: &EntryContext,
    ) -> Result<TaskMap<Descriptor>, DiscoveryError> {
        let playbook = context.playbook.display();
        let mut result = TaskMap::new();

        let tasks: Vec<(&str, &Value)> = self
            .config
            .deployment_tasks
            .iter()
            .filter_map(|task| vars.get(task.as_str()).map(|data| (task.as_str(), data)))
            .collect();

        let global_dg = vars
            .get(GLOBAL_DEPLOYMENT_GROUPS)
            .filter(|groups| groups.is_truthy());

        for (task, data) in tasks {
            if !data.is_truthy() {
                tracing::error!(task, %playbook, "task has no data");
                return Err(DiscoveryError::EmptyTaskMetadata {
                    task: task.to_string(),
                    path: context.playbook.clone(),
                });
            }

            let descriptors = result.entry(task.to_string()).or_insert_with(Vec::new);

            let Some(data) = data.as_mapping() else {
                tracing::warn!(task, %playbook, "metadata format is invalid, task data is not a mapping");
                continue;
            };

            let groups = match global_dg {
                Some(global_dg) => {
                    tracing::debug!(task, %playbook, "global deployment groups used");
                    global_dg
                }
                None => match data.get("deployment_groups") {
                    Some(groups) => groups,
                    None => {
                        tracing::warn!(task, %playbook, "metadata format is invalid, deployment_groups not found");
                        continue;
                    }
                },
            };

            let Some(groups) = groups.as_sequence() else {
                tracing::warn!(task, %playbook, "metadata format is invalid, deployment_groups is not a list");
                continue;
            };

            let metadata = TaskMetadata::from_mapping(data);
            if metadata.tags.is_some() {
                tracing::debug!(task, %playbook, "global ansible tags used");
            }
            if metadata.args.is_some() {
                tracing::debug!(task, %playbook, "global ansible args used");
            }

            for raw in groups {
                if let Some(descriptor) = self.build_descriptor(task, raw, &metadata, context) {
                    descriptors.push(descriptor);
                }
            }
        }

        Ok(result)
    }

    /// Applies inheritance rules to one raw descriptor and validates it
    ///
    /// Works on an owned copy so descriptors shared through `_deployment_groups` stay independent.
    fn build_descriptor(
        &self,
        task: &str,
        raw: &Value,
        metadata: &TaskMetadata,
        context: &EntryContext,
    ) -> Option<Descriptor> {
        let playbook = context.playbook.display();

        let Some(raw) = raw.as_mapping() else {
            tracing::warn!(task, %playbook, "metadata format is invalid, deployment group is not a mapping");
            return None;
        };

        let mut dg = None;
        let mut tags = vec![];
        let mut args = vec![];
        let mut extra = IndexMap::new();

        for (key, value) in raw {
            let key = key.to_param_string();
            match key.as_str() {
                "dg" => dg = Some(value.to_param_string()).filter(|dg| !dg.is_empty()),
                "tags" => tags = value.to_string_list(),
                "args" => args = value.to_string_list(),
                // set from the entry below
                "hosts" | "playbook" => {}
                "cmd" => {
                    tracing::warn!(task, %playbook, "'cmd' is reserved, ignoring descriptor key");
                }
                _ => {
                    extra.insert(key, value.to_param_string());
                }
            }
        }

        args.extend(self.config.environment.iter().cloned());

        let mut hosts = context.hosts.clone();
        if metadata.nolimit {
            hosts = None;
        }
        if let Some(limit) = self.config.limit.as_ref().filter(|limit| !limit.is_empty()) {
            hosts = Some(limit.clone());
        }

        if let Some(global_args) = &metadata.args {
            args.extend(global_args.iter().cloned());
        }
        if let Some(global_tags) = &metadata.tags {
            tags.extend(global_tags.iter().cloned());
        }

        let Some(dg) = dg else {
            tracing::warn!(task, %playbook, "metadata format is invalid, 'dg' key not found");
            tracing::debug!(descriptor=?raw);
            return None;
        };

        if tags.is_empty() && !metadata.notags {
            tracing::warn!(task, %playbook, dg = dg.as_str(), "metadata format is invalid, 'tags' not found");
            tracing::debug!(descriptor=?raw);
            return None;
        }

        Some(Descriptor {
            dg,
            playbook: context.playbook.clone(),
            hosts,
            tags,
            args,
            extra,
        })
    }
}

/// Task level settings shared by all descriptors of a task
#[derive(Debug, Default)]
struct TaskMetadata {
    tags: Option<Vec<String>>,
    args: Option<Vec<String>>,
    nolimit: bool,
    notags: bool,
}

impl TaskMetadata {
    fn from_mapping(data: &Mapping) -> Self {
        let list = |key: &str| {
            data.get(key)
                .filter(|value| value.is_truthy())
                .map(ValueExt::to_string_list)
        };
        let flag = |key: &str| data.get(key).is_some_and(ValueExt::is_truthy);

        Self {
            tags: list("tags"),
            args: list("args"),
            nolimit: flag("nolimit"),
            notags: flag("notags"),
        }
    }
}

/// Relative vars-file paths are rooted at the directory of the referencing file
fn resolve_vars_file(source: &Path, vars_file: &str) -> PathBuf {
    let vars_file = Path::new(vars_file);
    if vars_file.is_absolute() {
        return vars_file.to_owned();
    }

    source
        .parent()
        .map(|dir| dir.join(vars_file))
        .unwrap_or_else(|| vars_file.to_owned())
}

#[derive(thiserror::Error, Debug)]
pub enum DiscoveryError {
    #[error("Task '{task}' has no data, file: {}", path.display())]
    EmptyTaskMetadata { task: String, path: PathBuf },
    #[error("Unable to load vars file {}", path.display())]
    VarsFile { path: PathBuf, source: LoadError },
    #[error("Vars file {} is not a mapping", .0.display())]
    VarsFileNotMapping(PathBuf),
}

impl DiscoveryError {
    /// Logs the error and returns the process exit code for it
    ///
    /// In debug mode empty task metadata is not turned into an exit code (`None`); the caller
    /// returns the error itself so it surfaces with its full context.
    pub fn exit_code(&self, debug: bool) -> Option<i32> {
        if debug && matches!(self, DiscoveryError::EmptyTaskMetadata { .. }) {
            return None;
        }

        tracing::error!("{self}");
        let mut source = std::error::Error::source(self);
        while let Some(error) = source {
            tracing::error!("{error}");
            source = error.source();
        }
        Some(1)
    }
}
