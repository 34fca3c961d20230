//! # gron - deployment group runner
//!
//! `gron` finds deployment metadata embedded in ansible inventories and turns it into
//! `ansible-playbook` command lines that can be run by deployment group.
//!
//! ## Terms
//!
//! - a **deployment task** is a category of work, e.g. `_deploy_cert`. The set of task names is
//!   fixed by configuration ([config::Config::deployment_tasks]).
//! - a **deployment group** is a logical target, e.g. `example.com_2024`.
//! - a **descriptor** describes one playbook invocation for a group/task pair.
//!
//! ## Pipeline
//!
//! ### Loading files
//!
//! see [source]
//!
//! Every `.yml`/`.yaml` file below the root directory is a candidate. A cheap substring test
//! ([source::looks_relevant]) decides whether it is parsed at all. Files that can not be read or
//! parsed are logged and skipped.
//!
//! ### Extraction
//!
//! see [extract::Extractor]
//!
//! Each entry of a document that has `hosts` and `vars` is searched for task names. Vars-files
//! are merged into `vars` first. Task level tags/args/flags are applied to each descriptor and
//! descriptors without `dg` (or without tags, unless waived) are dropped with a warning.
//!
//! A recognized task name without any data stops discovery with
//! [extract::DiscoveryError::EmptyTaskMetadata].
//!
//! ### Resolution and merging
//!
//! see [deployment_groups::DeploymentGroups]
//!
//! Each descriptor is resolved ([descriptor::ResolvedDescriptor]) exactly once: its final
//! argument list and command line ([command]) are computed and then frozen. Resolved
//! descriptors are appended to `groups[dg][task]`.
//!
//! ### Running
//!
//! see [runner::Runner]
//!
//! The descriptors of one group/task pair run sequentially. Failures are logged and do not stop
//! the batch.
//!
pub mod command;
pub mod config;
pub mod deployment_groups;
pub mod descriptor;
pub mod extract;
pub mod runner;
pub mod source;
pub mod value;

pub use config::Config;
pub use deployment_groups::DeploymentGroups;
