//! Discovery over the inventory tree in /tests/inventory/
//!
//! Paths in snapshots have the inventory root replaced with `[root]`.

use gron::command::CommandOptions;
use gron::descriptor::ResolvedDescriptor;
use gron::extract::{DiscoveryError, Extractor};
use gron::runner::{RunError, Runner};
use gron::{Config, DeploymentGroups};
use pretty_assertions::assert_eq;
use std::path::Path;

const INVENTORY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/inventory");

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("GRON_LOG"))
        .with_writer(std::io::stderr)
        .try_init();
}

fn inventory_config() -> Config {
    Config {
        root_dir: Some(INVENTORY.to_string()),
        ..Default::default()
    }
}

fn discover() -> DeploymentGroups {
    init_logging();
    DeploymentGroups::discover(&inventory_config()).expect("inventory must be valid")
}

fn commands(groups: &DeploymentGroups) -> String {
    let mut lines = vec![];
    for (_, tasks) in groups.groups() {
        for descriptors in tasks.values() {
            lines.extend(descriptors.iter().map(|d| d.cmd().replace(INVENTORY, "[root]")));
        }
    }
    lines.join("\n")
}

#[test]
fn groups_listing() {
    let groups = discover();
    let listing = groups.show_groups().replace(INVENTORY, "[root]");

    insta::assert_snapshot!(listing.trim_end(), @r###"
    example.com_2024
      _certbot_acme
        - [root]/certbot/acme.yaml
      _certbot_upload
        - [root]/certbot/acme.yaml
      _deploy_cert
        - [root]/nginx/nginx.yml
      _gcore_upload
        - [root]/nginx/upload.yml
    example.org_2024
      _deploy_cert
        - [root]/nginx/nginx.yml
    "###);
}

#[test]
fn rendered_commands() {
    let groups = discover();

    insta::assert_snapshot!(commands(&groups), @r###"
    /usr/bin/ansible-playbook [root]/certbot/acme.yaml -t 'certbot' -v
    /usr/bin/ansible-playbook [root]/certbot/acme.yaml -t 'certbot,upload' -l "certbot.example.com"
    /usr/bin/ansible-playbook [root]/nginx/nginx.yml -t 'nginx_ssl_conf,nginx_reload' -l "host-1.example.com:host-2.example.com" -e 'domain="example.com"'
    /usr/bin/ansible-playbook [root]/nginx/upload.yml -l "cdn" -e 'resource="12345"'
    /usr/bin/ansible-playbook [root]/nginx/nginx.yml -t 'nginx_ssl_conf,nginx_reload' -l "host-1.example.com:host-2.example.com"
    "###);
}

#[test]
fn cli_options_reach_every_command() {
    init_logging();
    let mut config = inventory_config();
    config.ansible_bin = Some("/opt/ansible/bin/ansible-playbook".into());
    config.limit = Some("canary".into());
    config.ansible_dry_run = true;
    config.push_environment("serial=1");

    let groups = DeploymentGroups::discover(&config).unwrap();
    for (group, tasks) in groups.groups() {
        for descriptors in tasks.values() {
            for descriptor in descriptors {
                assert_eq!(descriptor.dg(), group);
                assert_eq!(descriptor.hosts(), Some("canary"));
                assert!(descriptor.cmd().starts_with("/opt/ansible/bin/ansible-playbook "));
                assert!(descriptor.cmd().contains(" -l \"canary\""));
                assert!(descriptor.cmd().contains(" -e serial=1"));
                assert!(descriptor.cmd().ends_with(" -C"));
            }
        }
    }
}

#[test]
fn yaml_dump() {
    let groups = discover();
    let dump = serde_yaml::to_string(&groups).unwrap();
    let value: serde_yaml::Value = serde_yaml::from_str(&dump).unwrap();

    let descriptor = &value["example.com_2024"]["_deploy_cert"][0];
    assert_eq!(descriptor["dg"].as_str(), Some("example.com_2024"));
    assert_eq!(descriptor["domain"].as_str(), Some("example.com"));
    assert_eq!(
        descriptor["hosts"].as_str(),
        Some("host-1.example.com:host-2.example.com")
    );
    assert!(descriptor["cmd"].as_str().is_some());
}

#[test]
fn dry_run_of_known_group() {
    let groups = discover();
    let report = groups
        .run("example.com_2024", "_deploy_cert", &Runner::new(true))
        .unwrap();

    assert_eq!(report.total, 1);
    assert!(report.success());
}

#[test]
fn unknown_group_runs_nothing() {
    let groups = discover();
    let err = groups
        .run("missing-group", "_deploy_cert", &Runner::new(false))
        .expect_err("group must not exist");

    assert!(matches!(err, RunError::GroupNotFound(_)));
    assert_eq!(err.exit_code(false), 1);
    assert_eq!(err.exit_code(true), 0);

    let err = groups
        .run("example.org_2024", "_gcore_upload", &Runner::new(false))
        .expect_err("task must not exist");
    assert!(matches!(err, RunError::TaskNotFound { .. }));
}

#[test]
fn empty_task_metadata_stops_discovery() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("a.yml"),
        "- hosts: all\n  vars:\n    _deploy_cert:\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("b.yml"),
        "- hosts: all\n  vars:\n    _deploy_cert: {deployment_groups: [{dg: b, tags: [t]}]}\n",
    )
    .unwrap();

    let config = Config {
        root_dir: Some(dir.path().display().to_string()),
        ..Default::default()
    };

    let err = DeploymentGroups::discover(&config).expect_err("must stop");
    match err {
        DiscoveryError::EmptyTaskMetadata { task, path } => {
            assert_eq!(task, "_deploy_cert");
            assert_eq!(path, dir.path().join("a.yml"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn vars_file_with_only_global_groups() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("vars")).unwrap();
    std::fs::write(
        dir.path().join("vars/groups.yml"),
        "_deployment_groups: [{dg: shared_2024, tags: [t]}]\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("site.yml"),
        "- hosts: all\n  vars_files: [vars/groups.yml]\n  vars:\n    _vars_files: true\n    _deploy_cert: {args: [\"-v\"]}\n",
    )
    .unwrap();

    let config = Config {
        root_dir: Some(dir.path().display().to_string()),
        ..Default::default()
    };

    let groups = DeploymentGroups::discover(&config).unwrap();
    let descriptors = groups.get("shared_2024", "_deploy_cert").unwrap();
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].args().to_vec(), vec!["-v".to_string()]);
}

#[test]
fn reserved_cmd_key_is_serialized_once() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("site.yml"),
        "- hosts: all\n  vars:\n    _deploy_cert: {deployment_groups: [{dg: a, tags: [t], cmd: echo}]}\n",
    )
    .unwrap();

    let config = Config {
        root_dir: Some(dir.path().display().to_string()),
        ..Default::default()
    };

    let groups = DeploymentGroups::discover(&config).unwrap();
    let json = serde_json::to_string(&groups).unwrap();
    assert_eq!(json.matches("\"cmd\"").count(), 1);
    assert!(!json.contains("\"cmd\":\"echo\""));
}

#[test]
fn single_descriptor_command() {
    let document: serde_yaml::Value = serde_yaml::from_str(
        r#"
- hosts: ["host-1.example.com"]
  vars:
    _deploy_cert:
      deployment_groups:
        - dg: "example.com_2024"
          tags: ["nginx_ssl_conf"]
"#,
    )
    .unwrap();

    let config = Config::default();
    let mut tasks = Extractor::new(&config)
        .extract_document(&document, Path::new("/srv/playbooks/nginx/nginx.yml"))
        .unwrap();

    let descriptors = tasks.swap_remove("_deploy_cert").unwrap();
    assert_eq!(descriptors.len(), 1);

    let options = CommandOptions::from(&config);
    let resolved: Vec<_> = descriptors
        .into_iter()
        .map(|d| ResolvedDescriptor::resolve(d, &options))
        .collect();

    assert_eq!(
        resolved[0].cmd(),
        "/usr/bin/ansible-playbook /srv/playbooks/nginx/nginx.yml -t 'nginx_ssl_conf' -l \"host-1.example.com\""
    );
}
