//! End to end runs of the configuration driven handlers

mod common;

use common::{FakePackager, store};
use stack_orchestration::trace::{INSTALL_TRACE, START_TRACE, TraceReader, trace_path};
use stack_orchestration::{
    Catalog, ComponentName, ComponentOutcome, Distro, Error, HandlerRegistry, RunCoordinator, RunRequest,
    parse_component_list,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const STACK_YAML: &str = r#"
version: "1.0"
components:
  db:
    priority: 1
    packages:
      - name: mysql-server
      - name: mysql-client
        version: "5.1"
    config_files:
      my.cnf: |
        [mysqld]
        bind-address = ${db.host}
        password = ${password:sql}
  keystone:
    priority: 2
    dependencies: [db]
    packages:
      - name: python-keystone
      - name: python-lxml
    config_files:
      conf/keystone.conf: "connection = ${db.type}://${db.user}@${db.host}/keystone"
    processes:
      - name: key-api
        command: sleep
        args: ["30"]
      - name: key-admin
        command: sleep
        args: ["31"]
"#;

struct Stack {
    _temp: TempDir,
    root: PathBuf,
    packager: Arc<FakePackager>,
    coordinator: RunCoordinator,
}

impl Stack {
    fn new(preinstalled: &[&str]) -> Self {
        let config = stack_config::parser::parse_str(STACK_YAML).unwrap();
        let catalog = Catalog::from_config(&config).unwrap();
        let registry = HandlerRegistry::from_catalog(&catalog);
        let packager = Arc::new(FakePackager::with_installed(preinstalled));
        let sections = BTreeMap::from([
            (
                "db".to_string(),
                BTreeMap::from([
                    ("type".to_string(), "mysql".to_string()),
                    ("user".to_string(), "root".to_string()),
                    ("host".to_string(), "127.0.0.1".to_string()),
                ]),
            ),
            (
                "passwords".to_string(),
                BTreeMap::from([("sql".to_string(), "hunter2".to_string())]),
            ),
        ]);
        let coordinator = RunCoordinator::with_store(Arc::new(catalog), registry, store(sections))
            .with_distro(Distro::from_name("ubuntu").unwrap())
            .with_packager(packager.clone());

        let temp = TempDir::new().unwrap();
        Self {
            root: temp.path().join("stack"),
            _temp: temp,
            packager,
            coordinator,
        }
    }

    fn request(&self, action: &str, components: &str) -> RunRequest {
        RunRequest::new(action, &self.root)
            .with_components(parse_component_list(components).unwrap())
    }

    fn component_dir(&self, component: &str) -> PathBuf {
        self.root.join(component)
    }
}

fn read_trace(dir: &Path, name: &str) -> Option<TraceReader> {
    TraceReader::open(trace_path(dir, name)).unwrap()
}

#[smol_potat::test]
async fn test_install_renders_config_and_traces_packages() {
    let stack = Stack::new(&["python-lxml"]);
    let report = stack
        .coordinator
        .execute(stack.request("install", "keystone"))
        .await
        .unwrap();

    assert_eq!(
        stack.packager.calls(),
        vec![
            "install mysql-server",
            "install mysql-client",
            "install python-keystone"
        ]
    );

    let my_cnf = std::fs::read_to_string(stack.component_dir("db").join("config/my.cnf")).unwrap();
    assert!(my_cnf.contains("bind-address = 127.0.0.1"));
    assert!(my_cnf.contains("password = hunter2"));
    let keystone_conf = std::fs::read_to_string(
        stack.component_dir("keystone").join("config/conf/keystone.conf"),
    )
    .unwrap();
    assert_eq!(keystone_conf, "connection = mysql://root@127.0.0.1/keystone");

    let traces = report.result.trace_paths();
    assert_eq!(
        traces,
        vec![
            trace_path(&stack.component_dir("db"), INSTALL_TRACE),
            trace_path(&stack.component_dir("keystone"), INSTALL_TRACE),
        ]
    );

    let keystone = read_trace(&stack.component_dir("keystone"), INSTALL_TRACE).unwrap();
    assert_eq!(
        keystone
            .packages_installed()
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>(),
        vec!["python-keystone"]
    );
    assert_eq!(keystone.files_written().len(), 1);
    assert!(keystone.dirs_created().contains(&stack.component_dir("keystone").join("logs")));

    let passwords = stack.coordinator.config_store().passwords();
    assert_eq!(passwords["sql"], "hunter2");
}

#[smol_potat::test]
async fn test_start_and_stop_selected_process() {
    let stack = Stack::new(&[]);
    stack
        .coordinator
        .execute(stack.request("install", "keystone"))
        .await
        .unwrap();

    let report = stack
        .coordinator
        .execute(stack.request("start", "db,keystone(key-api)"))
        .await
        .unwrap();

    assert_eq!(report.result.components[0].outcome, ComponentOutcome::Counted(0));
    let start_trace = trace_path(&stack.component_dir("keystone"), START_TRACE);
    assert_eq!(report.result.trace_paths(), vec![start_trace.clone()]);

    let trace = TraceReader::open(&start_trace).unwrap().unwrap();
    assert_eq!(trace.pids().len(), 1);
    assert!(stack.component_dir("keystone").join("logs/key-api.log").exists());
    assert!(!stack.component_dir("keystone").join("logs/key-admin.log").exists());

    let report = stack
        .coordinator
        .execute(stack.request("stop", "keystone"))
        .await
        .unwrap();
    assert_eq!(
        report.order,
        vec![ComponentName::new("db"), ComponentName::new("keystone")]
    );
    assert!(
        report
            .result
            .components
            .iter()
            .all(|c| c.outcome == ComponentOutcome::Completed)
    );
    assert!(!start_trace.exists());
}

#[smol_potat::test]
async fn test_stop_of_component_without_processes_needs_no_trace() {
    let stack = Stack::new(&[]);
    stack
        .coordinator
        .execute(stack.request("install", "db"))
        .await
        .unwrap();

    let report = stack
        .coordinator
        .execute(stack.request("stop", "db"))
        .await
        .unwrap();
    assert_eq!(report.result.skipped().count(), 0);
    assert_eq!(report.result.components[0].outcome, ComponentOutcome::Completed);
}

#[smol_potat::test]
async fn test_stop_without_start_needs_force() {
    let stack = Stack::new(&[]);
    stack
        .coordinator
        .execute(stack.request("install", "keystone"))
        .await
        .unwrap();

    let err = stack
        .coordinator
        .execute(stack.request("stop", "keystone"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Hook { ref component, ref source, .. }
            if component.as_str() == "keystone" && source.is_no_trace()
    ));

    let report = stack
        .coordinator
        .execute(stack.request("stop", "keystone").force(true))
        .await
        .unwrap();
    assert_eq!(
        report.result.skipped().collect::<Vec<_>>(),
        vec![&ComponentName::new("keystone")]
    );
}

#[smol_potat::test]
async fn test_start_before_install_fails() {
    let stack = Stack::new(&[]);
    let err = stack
        .coordinator
        .execute(stack.request("start", "db").force(true))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Hook { ref source, .. } if source.is_no_trace()));
}

#[smol_potat::test]
async fn test_uninstall_reverses_install() {
    let stack = Stack::new(&["python-lxml"]);
    stack
        .coordinator
        .execute(stack.request("install", "keystone"))
        .await
        .unwrap();

    stack
        .coordinator
        .execute(stack.request("uninstall", "keystone"))
        .await
        .unwrap();

    assert_eq!(
        stack.packager.calls()[3..],
        [
            "remove mysql-client",
            "remove mysql-server",
            "remove python-keystone"
        ]
    );
    assert_eq!(
        stack.packager.installed().into_iter().collect::<Vec<_>>(),
        vec!["python-lxml"]
    );
    assert!(!stack.root.exists());
}

#[smol_potat::test]
async fn test_uninstall_of_missing_install_with_force() {
    let stack = Stack::new(&[]);
    std::fs::create_dir_all(&stack.root).unwrap();

    let report = stack
        .coordinator
        .execute(stack.request("uninstall", "keystone").force(true))
        .await
        .unwrap();

    assert_eq!(report.result.skipped().count(), 2);
    assert!(stack.packager.calls().is_empty());
    assert!(!stack.root.exists());
}
