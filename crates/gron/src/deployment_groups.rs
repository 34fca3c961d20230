//! the group -> task -> descriptors aggregate
//!
//! [DeploymentGroups] is built once per invocation by [DeploymentGroups::discover] and only read
//! afterwards. Merging is purely additive: the same group/task pair found in several files keeps
//! every descriptor, in discovery order.
use crate::command::CommandOptions;
use crate::config::Config;
use crate::descriptor::ResolvedDescriptor;
use crate::extract::{DiscoveryError, Extractor, TaskMap};
use crate::runner::{RunError, RunReport, Runner};
use crate::source;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::Write;

#[derive(Serialize, Debug, Default, Clone, PartialEq)]
#[serde(transparent)]
pub struct DeploymentGroups {
    groups: IndexMap<String, TaskMap<ResolvedDescriptor>>,
}

impl DeploymentGroups {
    /// Scans `config.root_dir` and builds the aggregate
    ///
    /// Unreadable or unparsable files are skipped. Task metadata errors stop the scan.
    pub fn discover(config: &Config) -> Result<Self, DiscoveryError> {
        let root = source::expand_home(config.root_dir());
        let extractor = Extractor::new(config);
        let options = CommandOptions::from(config);

        tracing::info!("parsing yaml files");
        let mut groups = Self::default();
        for path in source::find_files(&root, &source::EXTENSIONS) {
            let Some(document) = source::read_candidate(&path, &config.deployment_tasks) else {
                continue;
            };

            let tasks = extractor.extract_document(&document, &path)?;
            groups.merge(
                tasks
                    .into_iter()
                    .map(|(task, descriptors)| {
                        let resolved = descriptors
                            .into_iter()
                            .map(|descriptor| ResolvedDescriptor::resolve(descriptor, &options))
                            .collect();
                        (task, resolved)
                    })
                    .collect(),
            );
        }

        Ok(groups)
    }

    /// Appends each descriptor under its own group and the task it was declared for
    pub fn merge(&mut self, tasks: TaskMap<ResolvedDescriptor>) {
        for (task, descriptors) in tasks {
            for descriptor in descriptors {
                self.groups
                    .entry(descriptor.dg().to_string())
                    .or_default()
                    .entry(task.clone())
                    .or_default()
                    .push(descriptor);
            }
        }
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &TaskMap<ResolvedDescriptor>)> {
        self.groups
            .iter()
            .map(|(group, tasks)| (group.as_str(), tasks))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, group: &str, task: &str) -> Result<&[ResolvedDescriptor], RunError> {
        let tasks = self
            .groups
            .get(group)
            .ok_or_else(|| RunError::GroupNotFound(group.to_string()))?;

        tasks
            .get(task)
            .map(Vec::as_slice)
            .ok_or_else(|| RunError::TaskNotFound {
                group: group.to_string(),
                task: task.to_string(),
            })
    }

    /// Runs every descriptor of `group`/`task` in order
    pub fn run(&self, group: &str, task: &str, runner: &Runner) -> Result<RunReport, RunError> {
        let descriptors = self.get(group, task)?;
        tracing::info!(group, task, count = descriptors.len(), "running deployment task");
        runner.run_all(descriptors)
    }

    /// Group/task/playbook listing
    ///
    /// ```text
    /// example.com_2024
    ///   _deploy_cert
    ///     - /srv/playbooks/nginx/nginx.yml
    /// ```
    pub fn show_groups(&self) -> String {
        let mut result = String::new();
        for (group, tasks) in &self.groups {
            let _ = writeln!(result, "{group}");
            for (task, descriptors) in tasks {
                let _ = writeln!(result, "  {task}");
                for descriptor in descriptors {
                    let _ = writeln!(result, "    - {}", descriptor.playbook().display());
                }
            }
        }
        result
    }
}

/// List of recognized deployment task names
pub fn show_tasks(deployment_tasks: &[String]) -> String {
    deployment_tasks
        .iter()
        .map(|task| format!("- {task}\n"))
        .collect()
}
