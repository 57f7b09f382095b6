//! Integration tests for stack-config

use stack_config::{ConfigStore, parser};
use std::io::Write;

const FULL_CONFIG: &str = r#"
version: "1.0"
name: "dev-cloud"
description: "Single host development cloud"

settings:
  log_level: debug
  distro: ubuntu

components:
  db:
    priority: 1
    description: "MySQL server"
    packages:
      - name: mysql-server
        version: "5.1"
    config_files:
      my.cnf: |
        [mysqld]
        bind-address = ${DB_BIND:-0.0.0.0}
  rabbit:
    priority: 1
    packages:
      - name: rabbitmq-server
        purge: true
  keystone:
    priority: 2
    dependencies: [db]
    downloads:
      - name: keystone
        repo: "https://github.com/openstack/keystone.git"
        branch: master
    config_files:
      keystone.conf: |
        [sql]
        connection = ${db.type}://${db.user}:${password:sql}@${db.host}/keystone
    processes:
      - name: key-api
        command: "bin/keystone-all"
        args: ["--config-file", "keystone.conf"]
        working_dir: "app/keystone"
  nova:
    priority: 3
    dependencies: [keystone, rabbit, quantum]

config:
  passwords:
    sql: ""
  db:
    type: mysql
    user: root
    host: localhost
    port: "3306"
"#;

#[test]
fn test_full_config_parsing() {
    let config = parser::parse_str(FULL_CONFIG).unwrap();

    assert_eq!(config.name.as_deref(), Some("dev-cloud"));
    assert_eq!(config.settings.distro.as_deref(), Some("ubuntu"));
    assert_eq!(config.settings.log_level.as_deref(), Some("debug"));
    assert_eq!(config.components.len(), 4);

    let db = &config.components["db"];
    assert_eq!(db.priority, 1);
    assert_eq!(db.packages[0].name, "mysql-server");
    assert_eq!(db.packages[0].version.as_deref(), Some("5.1"));
    assert!(db.config_files.contains_key("my.cnf"));

    assert!(config.components["rabbit"].packages[0].purge);

    let keystone = &config.components["keystone"];
    assert_eq!(keystone.dependencies, vec!["db".to_string()]);
    assert_eq!(keystone.downloads[0].branch.as_deref(), Some("master"));
    assert_eq!(keystone.processes[0].args.len(), 2);
    assert_eq!(
        keystone.processes[0].working_dir.as_deref(),
        Some("app/keystone")
    );

    // quantum is not part of the catalog but may still be depended upon
    assert!(
        config.components["nova"]
            .dependencies
            .contains(&"quantum".to_string())
    );
}

#[test]
fn test_parse_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FULL_CONFIG.as_bytes()).unwrap();

    let config = parser::parse_file(file.path()).unwrap();
    assert_eq!(config.components.len(), 4);
}

#[test]
fn test_parse_missing_file() {
    let result = parser::parse_file("/nonexistent/stack.yaml");
    assert!(matches!(result, Err(stack_config::ConfigError::ReadError(_))));
}

#[test]
fn test_store_renders_component_templates() {
    let config = parser::parse_str(FULL_CONFIG).unwrap();
    let store = ConfigStore::from_config(&config);

    let template = &config.components["keystone"].config_files["keystone.conf"];
    let rendered = store.render(template).unwrap();

    let password = store.password("sql");
    assert_eq!(password.len(), stack_config::store::PASSWORD_LENGTH);
    assert!(rendered.contains(&format!("mysql://root:{}@localhost/keystone", password)));

    let fetched = store.fetched();
    assert_eq!(fetched["db/type"], "mysql");
    assert_eq!(fetched["db/host"], "localhost");
}
