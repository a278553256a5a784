// Integration tests for the deployment orchestrator and the controller's
// deploy/backup surface, driven through a fake supervisor.

mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use surfcontrol_core::deploy::{GENERATION_MARKER, installed_generation};
use surfcontrol_core::fsutil::tree_digest;
use surfcontrol_core::model::Component;
use surfcontrol_core::{
    BackupId, Controller, CoreError, DaemonConfig, DeployError, DeployFailure, DeployPhase,
    Generation, MobileCore, Orchestrator, Outcome, generate,
};

use common::{FakeSupervisor, deploy_config, intent_4g, intent_5g, unit};

// ── Helpers ─────────────────────────────────────────────────────────

fn orchestrator(root: &std::path::Path, sup: &Arc<FakeSupervisor>) -> Orchestrator {
    Orchestrator::new(deploy_config(root), sup.clone(), Generation::FourG)
}

fn names(components: &[Component]) -> Vec<String> {
    components.iter().map(|c| unit(*c)).collect()
}

// ── Successful deployments ──────────────────────────────────────────

#[tokio::test]
async fn test_deploy_writes_every_artifact_and_keeps_foreign_files() {
    let tmp = tempfile::tempdir().unwrap();
    let sup = FakeSupervisor::new();
    let orch = orchestrator(tmp.path(), &sup);

    let etc = tmp.path().join("etc");
    fs::create_dir_all(&etc).unwrap();
    fs::write(etc.join("custom.conf"), "keep me").unwrap();

    let intent = intent_4g();
    let record = orch.deploy(intent.clone()).await.unwrap();

    assert_eq!(record.outcome, Outcome::Succeeded);
    assert!(record.failure.is_none());
    assert!(record.backup.is_some());

    let expected = generate(&intent).unwrap();
    assert_eq!(record.artifacts.len(), expected.len());
    for artifact in expected.values() {
        let written = fs::read(etc.join(&artifact.file_name)).unwrap();
        assert_eq!(written, artifact.content, "{}", artifact.file_name);
    }
    assert_eq!(fs::read_to_string(etc.join("custom.conf")).unwrap(), "keep me");
    assert_eq!(*orch.phase().borrow(), DeployPhase::Idle);
}

#[tokio::test]
async fn test_4g_units_restart_in_dependency_order() {
    let tmp = tempfile::tempdir().unwrap();
    let sup = FakeSupervisor::new();
    let orch = orchestrator(tmp.path(), &sup);

    orch.deploy(intent_4g()).await.unwrap();

    assert_eq!(
        sup.calls("restart"),
        names(&[
            Component::Hss,
            Component::Mme,
            Component::Sgwc,
            Component::Sgwu,
            Component::Smf,
            Component::Upf,
        ])
    );
    assert!(sup.calls("stop").is_empty());
}

#[tokio::test]
async fn test_5g_deploy_switches_active_generation() {
    let tmp = tempfile::tempdir().unwrap();
    let sup = FakeSupervisor::new();
    let orch = orchestrator(tmp.path(), &sup);
    let generation = orch.active_generation();

    let record = orch.deploy(intent_5g()).await.unwrap();

    assert!(record.succeeded());
    assert_eq!(*generation.borrow(), Generation::FiveG);
    let restarts = sup.calls("restart");
    assert_eq!(restarts.first().unwrap(), &unit(Component::Nrf));
    let amf = restarts.iter().position(|u| *u == unit(Component::Amf)).unwrap();
    let ausf = restarts.iter().position(|u| *u == unit(Component::Ausf)).unwrap();
    let nssf = restarts.iter().position(|u| *u == unit(Component::Nssf)).unwrap();
    assert!(ausf < amf && nssf < amf);
    assert!(tmp.path().join("etc/amf.yaml").exists());
}

// ── Failures and rollback ───────────────────────────────────────────

#[tokio::test]
async fn test_rejected_intent_touches_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let sup = FakeSupervisor::new();
    let orch = orchestrator(tmp.path(), &sup);

    let mut intent = intent_4g();
    intent.addressing.device_gateway = "10.48.100.1".into();
    let record = orch.deploy(intent).await.unwrap();

    assert_eq!(record.outcome, Outcome::Failed);
    assert!(record.backup.is_none());
    let Some(DeployFailure::Validation { reasons }) = &record.failure else {
        panic!("expected validation failure, got {:?}", record.failure);
    };
    assert!(reasons.iter().any(|r| r.contains("not in device pool")), "{reasons:?}");
    assert!(!tmp.path().join("etc").exists());
    assert!(sup.calls("restart").is_empty());
}

#[tokio::test]
async fn test_restart_failure_stops_started_units_in_reverse_and_restores() {
    let tmp = tempfile::tempdir().unwrap();
    let sup = FakeSupervisor::new();
    sup.fail_unit(&unit(Component::Sgwc));
    let orch = orchestrator(tmp.path(), &sup);

    let etc = tmp.path().join("etc");
    fs::create_dir_all(&etc).unwrap();
    fs::write(etc.join("mme.yaml"), "previous: true\n").unwrap();
    let before = tree_digest(&etc).unwrap();

    let record = orch.deploy(intent_4g()).await.unwrap();

    assert_eq!(record.outcome, Outcome::RolledBack);
    assert_eq!(record.failed_unit(), Some(unit(Component::Sgwc).as_str()));
    assert_eq!(
        sup.calls("stop"),
        names(&[Component::Mme, Component::Hss])
    );
    assert_eq!(
        sup.calls("restart"),
        names(&[Component::Hss, Component::Mme, Component::Sgwc])
    );

    assert_eq!(
        fs::read_to_string(etc.join("mme.yaml")).unwrap(),
        "previous: true\n"
    );
    assert!(!etc.join("hss.yaml").exists());
    assert_eq!(tree_digest(&etc).unwrap(), before);
    assert_eq!(*orch.active_generation().borrow(), Generation::FourG);
}

#[tokio::test]
async fn test_write_failure_rolls_back_without_restarts() {
    let tmp = tempfile::tempdir().unwrap();
    let sup = FakeSupervisor::new();
    let orch = orchestrator(tmp.path(), &sup);

    // A directory where an artifact file must go makes the write fail.
    let etc = tmp.path().join("etc");
    fs::create_dir_all(etc.join("mme.yaml")).unwrap();
    fs::write(etc.join("mme.yaml/placeholder"), "x").unwrap();
    fs::write(etc.join("hss.yaml"), "untouched\n").unwrap();

    let record = orch.deploy(intent_4g()).await.unwrap();

    assert_eq!(record.outcome, Outcome::RolledBack);
    assert!(matches!(record.failure, Some(DeployFailure::Write { .. })));
    assert!(sup.calls("restart").is_empty());
    assert!(sup.calls("stop").is_empty());
    assert_eq!(fs::read_to_string(etc.join("hss.yaml")).unwrap(), "untouched\n");
    assert!(etc.join("mme.yaml").is_dir());
    assert!(!etc.join("upf.yaml").exists());
}

// ── Concurrency and retention ───────────────────────────────────────

#[tokio::test]
async fn test_concurrent_deploy_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let sup = FakeSupervisor::new();
    sup.set_restart_delay(Duration::from_millis(100));
    let orch = orchestrator(tmp.path(), &sup);

    let mut phase = orch.phase();
    let first = tokio::spawn({
        let orch = orch.clone();
        async move { orch.deploy(intent_4g()).await }
    });
    tokio::time::timeout(
        Duration::from_secs(5),
        phase.wait_for(|p| *p == DeployPhase::Restarting),
    )
    .await
    .unwrap()
    .unwrap();

    let second = orch.deploy(intent_4g()).await;
    assert!(matches!(second, Err(DeployError::InProgress)));

    let record = first.await.unwrap().unwrap();
    assert!(record.succeeded());
    assert_eq!(orch.history().await.len(), 1);
}

#[tokio::test]
async fn test_retention_keeps_newest_backups_and_records() {
    let tmp = tempfile::tempdir().unwrap();
    let sup = FakeSupervisor::new();
    let orch = orchestrator(tmp.path(), &sup);
    let keep = orch.config().backup_retention;

    let mut backups = Vec::new();
    for _ in 0..keep + 3 {
        let record = orch.deploy(intent_4g()).await.unwrap();
        assert!(record.succeeded());
        backups.push(record.backup.unwrap());
    }

    let listed: Vec<BackupId> = orch
        .list_backups()
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.id)
        .collect();
    let newest: Vec<BackupId> = backups.iter().rev().take(keep).cloned().collect();
    assert_eq!(listed, newest);

    let history = orch.history().await;
    assert_eq!(history.len(), keep);
    assert_eq!(history[0].backup.as_ref(), backups.last());
}

// ── Controller surface ──────────────────────────────────────────────

#[tokio::test]
async fn test_controller_restores_a_listed_backup() {
    let tmp = tempfile::tempdir().unwrap();
    let sup = FakeSupervisor::new();
    let config = DaemonConfig {
        deploy: deploy_config(tmp.path()),
        ..DaemonConfig::default()
    };
    let controller = Controller::with_supervisor(config, sup.clone());
    let etc = tmp.path().join("etc");

    assert!(controller.deploy(intent_4g()).await.unwrap().succeeded());
    let second = controller.deploy(intent_5g()).await.unwrap();
    assert!(etc.join("amf.yaml").exists());
    assert_eq!(controller.active_generation(), Generation::FiveG);

    // The second deployment's backup holds the 4G artifacts.
    let backup = second.backup.unwrap();
    assert!(
        controller
            .list_backups()
            .await
            .unwrap()
            .iter()
            .any(|b| b.id == backup)
    );
    controller.restore_backup(&backup).await.unwrap();
    assert!(etc.join("mme.yaml").exists());
    assert!(!etc.join("amf.yaml").exists());
    assert_eq!(controller.active_generation(), Generation::FourG);

    let history = controller.deployment_history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].generation, Generation::FiveG);
}

#[tokio::test]
async fn test_new_controller_picks_up_the_deployed_generation() {
    let tmp = tempfile::tempdir().unwrap();
    let sup = FakeSupervisor::new();
    let config = DaemonConfig {
        deploy: deploy_config(tmp.path()),
        ..DaemonConfig::default()
    };
    assert_eq!(config.generation, Generation::FourG);

    let first = Controller::with_supervisor(config.clone(), sup.clone());
    assert!(first.deploy(intent_4g()).await.unwrap().succeeded());
    assert!(first.deploy(intent_5g()).await.unwrap().succeeded());
    drop(first);

    // Both mme.yaml and amf.yaml are on disk now; the marker decides.
    let etc = tmp.path().join("etc");
    assert!(etc.join("mme.yaml").exists() && etc.join("amf.yaml").exists());

    let second = Controller::with_supervisor(config, sup.clone());
    assert_eq!(second.active_generation(), Generation::FiveG);

    let snapshot = second.observe_once().await;
    let components: Vec<Component> = snapshot.health.components.keys().copied().collect();
    assert!(components.contains(&Component::Amf));
    assert!(!components.contains(&Component::Mme));
}

#[test]
fn test_unmarked_artifact_directory_is_judged_by_mobility_function() {
    let tmp = tempfile::tempdir().unwrap();
    let etc = tmp.path().join("etc");
    fs::create_dir_all(&etc).unwrap();
    assert_eq!(installed_generation(&etc), None);

    fs::write(etc.join("amf.yaml"), "amf: {}\n").unwrap();
    assert_eq!(installed_generation(&etc), Some(Generation::FiveG));

    fs::write(etc.join("mme.yaml"), "mme: {}\n").unwrap();
    assert_eq!(installed_generation(&etc), None);

    fs::write(etc.join(GENERATION_MARKER), "4G\n").unwrap();
    assert_eq!(installed_generation(&etc), Some(Generation::FourG));

    let sup = FakeSupervisor::new();
    assert_eq!(
        *Orchestrator::new(deploy_config(tmp.path()), sup, Generation::FiveG)
            .active_generation()
            .borrow(),
        Generation::FourG
    );
}

#[tokio::test]
async fn test_controller_reports_unknown_backup() {
    let tmp = tempfile::tempdir().unwrap();
    let config = DaemonConfig {
        deploy: deploy_config(tmp.path()),
        ..DaemonConfig::default()
    };
    let controller = Controller::with_supervisor(config, FakeSupervisor::new());

    let err = controller
        .restore_backup(&BackupId::new("20990101T000000.000000Z"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::BackupNotFound { .. }));

    let err = controller
        .restore_backup(&BackupId::new("../etc"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::BackupNotFound { .. }));
}
