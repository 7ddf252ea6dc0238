//! Integration tests for the connection checker against a fake
//! management daemon and on-disk limit files.

mod helpers;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use checkuser_checker::limit::LimitLookup;
use checkuser_checker::openvpn::session_count;
use checkuser_checker::process::MockProcessQuery;
use checkuser_checker::{ConnectionChecker, LimitStore, ProcessQuery};
use checkuser_core::types::{KillOutcome, UserReport};
use helpers::{FakeDaemon, TestApp, Vpn, status_dump};

#[tokio::test]
async fn test_vpn_only_user_counts_one_session() {
    let daemon = FakeDaemon::start(status_dump(&[("alice", "192.0.2.10")])).await;
    let app = TestApp::start(
        Arc::new(MockProcessQuery::new()),
        Vpn::Port(daemon.port),
        "",
        &[],
    )
    .await;

    let report = app.checker.report("alice").await.expect("report");
    assert_eq!(report.connection_count, 1);
    assert_eq!(app.checker.vpn_sessions("alice").await, 1);
    assert_eq!(app.checker.vpn_sessions("bob").await, 0);
}

#[tokio::test]
async fn test_report_follows_daemon_changes() {
    let daemon = FakeDaemon::start(status_dump(&[])).await;
    let app = TestApp::start(
        Arc::new(MockProcessQuery::new()),
        Vpn::Port(daemon.port),
        "",
        &[],
    )
    .await;
    assert_eq!(app.checker.connection_count("dave").await, 0);

    daemon.set_status(status_dump(&[("dave", "192.0.2.1"), ("dave", "192.0.2.2")]));
    assert_eq!(app.checker.connection_count("dave").await, 2);
}

#[tokio::test]
async fn test_report_with_no_sources() {
    let app = TestApp::new().await;
    let report = app.checker.report("frank").await.expect("report");
    assert_eq!(report, UserReport::empty("frank"));
}

#[tokio::test]
async fn test_refused_daemon_leaves_ssh_count() {
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let port = closed.local_addr().expect("addr").port();
    drop(closed);

    let process = Arc::new(MockProcessQuery::new());
    process.add_ssh_session("grace", 11);
    process.add_ssh_session("grace", 12);
    let app = TestApp::start(process, Vpn::Port(port), "", &[]).await;

    assert_eq!(app.checker.vpn_sessions("grace").await, 0);
    let report = app.checker.report("grace").await.expect("report");
    assert_eq!(report.connection_count, 2);
}

#[tokio::test]
async fn test_count_all_takes_one_snapshot() {
    let daemon = FakeDaemon::start(status_dump(&[
        ("heidi", "192.0.2.1"),
        ("ivan", "192.0.2.2"),
    ]))
    .await;
    let process = Arc::new(MockProcessQuery::new());
    for (i, user) in ["heidi", "ivan", "judy"].iter().enumerate() {
        process.add_account(user, 1000 + i as u32);
    }
    process.add_account("daemon", 1);
    process.add_ssh_session("judy", 5);
    let app = TestApp::start(process, Vpn::Port(daemon.port), "", &[]).await;

    assert_eq!(app.checker.count_all().await.expect("count"), 3);
    assert_eq!(daemon.commands(), vec!["status".to_string()]);
}

#[tokio::test]
async fn test_count_all_without_daemon() {
    let process = Arc::new(MockProcessQuery::new());
    process.add_account("kim", 1500);
    process.add_ssh_session("kim", 1);
    process.add_ssh_session("kim", 2);
    let app = TestApp::start(process, Vpn::Absent, "", &[]).await;

    assert_eq!(app.checker.count_all().await.expect("count"), 2);
}

#[tokio::test]
async fn test_kill_reaches_daemon_and_process_table() {
    let daemon = FakeDaemon::start(status_dump(&[("leo", "192.0.2.3")])).await;
    let process = Arc::new(MockProcessQuery::new());
    process.add_ssh_session("leo", 900);
    let app = TestApp::start(process.clone(), Vpn::Port(daemon.port), "", &[]).await;

    assert_eq!(app.checker.kill("leo").await, KillOutcome::ok());
    assert_eq!(process.killed_pids(), vec![900]);
    assert!(daemon.wait_for("kill leo").await);
    assert_eq!(process.count_ssh_sessions("leo").await, 0);
}

#[tokio::test]
async fn test_kill_rejects_injection() {
    let daemon = FakeDaemon::start(status_dump(&[])).await;
    let app = TestApp::start(
        Arc::new(MockProcessQuery::new()),
        Vpn::Port(daemon.port),
        "",
        &[],
    )
    .await;

    let outcome = app.checker.kill("mallory\nkill bob").await;
    assert!(!outcome.success);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(daemon.commands().is_empty());
}

#[tokio::test]
async fn test_limit_store_scenarios() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("usuarios.db");
    std::fs::write(&path, "alice 2\ncarol 5\n\nbroken\n").expect("write");

    let store = LimitStore::new(
        path,
        Some("checkuser-no-such-limiter".to_string()),
        Duration::from_secs(2),
    );
    assert_eq!(store.limit("carol").await, 5);
    assert_eq!(store.limit("dave").await, -1);
    assert_eq!(store.lookup("dave").await, LimitLookup::NotConfigured);
}

#[tokio::test]
async fn test_limit_store_without_file() {
    let store = LimitStore::new(
        PathBuf::from("/nonexistent/usuarios.db"),
        None,
        Duration::from_secs(2),
    );
    assert_eq!(store.limit("carol").await, -1);
}

#[test]
fn test_session_count_halves_occurrences() {
    let dump = status_dump(&[("nina", "192.0.2.4"), ("nina", "192.0.2.5")]);
    assert_eq!(session_count(dump.as_bytes(), "nina"), 2);
    assert_eq!(session_count(dump.as_bytes(), "olga"), 0);
    assert_eq!(session_count(b"nina", "nina"), 0);
    assert_eq!(session_count(b"nina nina nina", "nina"), 1);
}

#[tokio::test]
async fn test_checker_shared_across_tasks() {
    let process = Arc::new(MockProcessQuery::new());
    process.add_ssh_session("pat", 1);
    let app = TestApp::start(process, Vpn::Absent, "pat 3\n", &[]).await;
    let checker: Arc<ConnectionChecker> = Arc::clone(&app.checker);

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let checker = Arc::clone(&checker);
        tasks.push(tokio::spawn(async move { checker.report("pat").await }));
    }
    for task in tasks {
        let report = task.await.expect("task").expect("report");
        assert_eq!(report.connection_count, 1);
        assert_eq!(report.connection_limit, 3);
    }
}
