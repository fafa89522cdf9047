//! Operator conversations driven end to end through the session layer

use async_trait::async_trait;
use hostwarden::alerts::{HostUsage, MetricsSampler};
use hostwarden::config::ConfigStore;
use hostwarden::exec::{CommandRunner, CommandSpec, ExecResult};
use hostwarden::firewall::Firewall;
use hostwarden::services::{
    BackupService, DockerService, LogService, SystemService, TerminalService,
};
use hostwarden::session::{Actions, Gatekeeper, InboundEvent, Session, Step, ACCESS_DENIED};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Records every command and answers with success
#[derive(Default)]
struct RecordingRunner {
    commands: Mutex<Vec<String>>,
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn execute(&self, spec: &CommandSpec, _timeout: Duration) -> ExecResult {
        let command = spec.display();
        self.commands.lock().unwrap().push(command.clone());
        ExecResult {
            command,
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
            timed_out: false,
        }
    }
}

struct FixedSampler;

#[async_trait]
impl MetricsSampler for FixedSampler {
    async fn sample(&self) -> hostwarden::Result<HostUsage> {
        Ok(HostUsage {
            cpu_percent: 5.0,
            ..HostUsage::default()
        })
    }
}

struct Harness {
    _dir: TempDir,
    store: Arc<ConfigStore>,
    runner: Arc<RecordingRunner>,
    session: Session,
    actions: Actions,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ConfigStore::open(dir.path().join("state.json")).await);
    let runner = Arc::new(RecordingRunner::default());
    let timeout = Duration::from_secs(30);
    let session = Session::new(Gatekeeper::new(store.clone(), vec![100]));
    let actions = Actions::new(
        store.clone(),
        vec![100],
        Firewall::new(runner.clone(), timeout),
        SystemService::new(runner.clone(), Arc::new(FixedSampler), timeout),
        LogService::new(runner.clone(), timeout),
        TerminalService::new(runner.clone(), timeout),
        DockerService::new(runner.clone(), store.clone(), timeout),
        BackupService::new(runner.clone(), dir.path().join("backup"), timeout),
    );
    Harness {
        _dir: dir,
        store,
        runner,
        session,
        actions,
    }
}

fn callback(actor: i64, data: &str) -> InboundEvent {
    InboundEvent::Callback {
        actor,
        chat: actor,
        data: data.to_string(),
    }
}

fn text(actor: i64, body: &str) -> InboundEvent {
    InboundEvent::Text {
        actor,
        chat: actor,
        text: body.to_string(),
    }
}

#[tokio::test]
async fn open_port_after_one_retry() {
    let h = harness().await;

    assert!(matches!(
        h.session.handle(&callback(100, "fw:open")).await,
        Step::Prompt(_)
    ));
    assert!(matches!(
        h.session.handle(&text(100, "http")).await,
        Step::Retry { .. }
    ));
    assert!(h.runner.commands.lock().unwrap().is_empty());

    let Step::Run(intent) = h.session.handle(&text(100, "8080")).await else {
        panic!("expected an intent");
    };
    let report = h.actions.execute(intent).await.unwrap();
    assert!(report.starts_with("== Port 8080 opened =="));

    let mut commands = h.runner.commands.lock().unwrap().clone();
    commands.sort();
    assert_eq!(
        commands,
        vec![
            "iptables -I INPUT -p tcp --dport 8080 -j ACCEPT".to_string(),
            "iptables -I INPUT -p udp --dport 8080 -j ACCEPT".to_string(),
        ]
    );
}

#[tokio::test]
async fn added_operator_gains_access_and_destination_follows() {
    let h = harness().await;

    assert_eq!(
        h.session.handle(&callback(200, "term")).await,
        Step::Denied(ACCESS_DENIED)
    );

    h.session.handle(&callback(100, "admins:add")).await;
    let Step::Run(intent) = h.session.handle(&text(100, "200")).await else {
        panic!("expected an intent");
    };
    h.actions.execute(intent).await.unwrap();
    assert_eq!(h.store.notification_destination().await, Some(100));

    assert!(matches!(
        h.session.handle(&callback(200, "term")).await,
        Step::Prompt(_)
    ));
    assert_eq!(h.store.notification_destination().await, Some(200));
}

#[tokio::test]
async fn alert_settings_through_conversation() {
    let h = harness().await;

    for (data, input) in [
        ("alerts:disk", "80"),
        ("alerts:interval", "60"),
        ("alerts:services", "nginx, postgresql"),
    ] {
        h.session.handle(&callback(100, data)).await;
        let Step::Run(intent) = h.session.handle(&text(100, input)).await else {
            panic!("expected an intent for {}", data);
        };
        h.actions.execute(intent).await.unwrap();
    }

    let alerts = h.store.alerts().await;
    assert_eq!(alerts.disk_threshold.get(), 80);
    assert_eq!(alerts.poll_interval_seconds.get(), 60);
    assert_eq!(alerts.watched_services.len(), 2);
}

#[tokio::test]
async fn compose_project_chosen_then_brought_up() {
    let h = harness().await;
    let project = h._dir.path().join("stack");
    std::fs::create_dir(&project).unwrap();
    std::fs::write(project.join("docker-compose.yml"), "services: {}\n").unwrap();

    let Step::Run(intent) = h.session.handle(&callback(100, "dock:compose_up")).await else {
        panic!("expected an intent");
    };
    assert!(h.actions.execute(intent).await.is_err());

    h.session.handle(&callback(100, "dock:set_compose")).await;
    let Step::Run(intent) = h
        .session
        .handle(&text(100, &project.display().to_string()))
        .await
    else {
        panic!("expected an intent");
    };
    h.actions.execute(intent).await.unwrap();

    let Step::Run(intent) = h.session.handle(&callback(100, "dock:compose_up")).await else {
        panic!("expected an intent");
    };
    let report = h.actions.execute(intent).await.unwrap();
    assert!(report.starts_with("== docker compose up -d =="));
    assert_eq!(
        h.runner.commands.lock().unwrap().clone(),
        vec![format!(
            "docker compose -f {} up -d",
            project.join("docker-compose.yml").display()
        )]
    );
}
