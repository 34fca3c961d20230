//! playbook invocation records
//!
//! A [Descriptor] is what the extractor produces from one entry of a task's `deployment_groups`
//! list after all inheritance rules were applied. [ResolvedDescriptor] adds the final argument
//! list and the rendered command line; it is built once and never changes afterwards.
use crate::command::{self, CommandOptions};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A validated descriptor, before the command line is rendered
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// Deployment group name
    pub dg: String,
    /// Inventory file the descriptor was found in
    pub playbook: PathBuf,
    pub hosts: Option<String>,
    pub tags: Vec<String>,
    pub args: Vec<String>,
    /// Every non-structural key except the reserved `cmd`; each becomes an `-e` flag
    pub extra: IndexMap<String, String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ResolvedDescriptor {
    dg: String,
    tags: Vec<String>,
    args: Vec<String>,
    hosts: Option<String>,
    playbook: PathBuf,
    #[serde(flatten)]
    extra: IndexMap<String, String>,
    cmd: String,
}

impl ResolvedDescriptor {
    pub fn resolve(descriptor: Descriptor, options: &CommandOptions) -> Self {
        let Descriptor {
            dg,
            playbook,
            hosts,
            tags,
            args,
            extra,
        } = descriptor;

        let args = command::finalize_args(args, &extra, options);
        let cmd = command::render(&playbook, &tags, hosts.as_deref(), &args, options);

        Self {
            dg,
            tags,
            args,
            hosts,
            playbook,
            extra,
            cmd,
        }
    }

    pub fn dg(&self) -> &str {
        &self.dg
    }

    pub fn playbook(&self) -> &Path {
        &self.playbook
    }

    pub fn hosts(&self) -> Option<&str> {
        self.hosts.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn extra(&self) -> &IndexMap<String, String> {
        &self.extra
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }
}
