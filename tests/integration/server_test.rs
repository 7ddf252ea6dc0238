//! Integration tests for the request server over real TCP connections.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Local};
use http::StatusCode;
use serde_json::json;

use checkuser_checker::process::MockProcessQuery;
use helpers::{FakeDaemon, TestApp, Vpn, status_dump};

#[tokio::test]
async fn test_check_reports_vpn_sessions() {
    let daemon = FakeDaemon::start(status_dump(&[("alice", "198.51.100.7")])).await;
    let app = TestApp::start(
        Arc::new(MockProcessQuery::new()),
        Vpn::Port(daemon.port),
        "",
        &[],
    )
    .await;

    let response = app.request("/check/alice").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["username"], "alice");
    assert_eq!(response.body["connection_count"], 1);
    assert!(daemon.commands().contains(&"status".to_string()));
}

#[tokio::test]
async fn test_check_full_report() {
    let process = Arc::new(MockProcessQuery::new());
    process.add_ssh_session("carol", 300);
    process.add_ssh_session("carol", 301);
    process.set_time_online("carol", "02:15:00");

    let expires = Local::now()
        .date_naive()
        .checked_add_days(Days::new(10))
        .expect("date")
        .format("%b %d, %Y")
        .to_string();
    process.set_expiration("carol", &expires);

    let app = TestApp::start(process, Vpn::Absent, "carol 5\ndave x\n", &[]).await;

    let response = app.request("/check/carol").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["connection_count"], 2);
    assert_eq!(response.body["connection_limit"], 5);
    assert_eq!(response.body["expiration_date"], expires.as_str());
    let days = response.body["expiration_days"].as_i64().expect("days");
    assert!(days == 9 || days == 10, "unexpected days {days}");
    assert_eq!(response.body["time_online"], "02:15:00");
}

#[tokio::test]
async fn test_check_unknown_user_uses_sentinels() {
    let app = TestApp::new().await;

    let response = app.request("/check/nobody").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({
            "username": "nobody",
            "connection_count": 0,
            "connection_limit": -1,
            "expiration_date": null,
            "expiration_days": -1,
            "time_online": null,
        })
    );
}

#[tokio::test]
async fn test_check_with_excluded_fields() {
    let process = Arc::new(MockProcessQuery::new());
    process.add_ssh_session("alice", 1);
    let app = TestApp::start(process, Vpn::Absent, "", &["expiration_date", "time_online"]).await;

    let response = app.request("/check/alice").await;
    let body = response.body.as_object().expect("object");
    assert!(!body.contains_key("expiration_date"));
    assert!(!body.contains_key("time_online"));
    assert_eq!(body["connection_count"], 1);
}

#[tokio::test]
async fn test_missing_user_is_server_error() {
    let app = TestApp::new().await;

    for path in ["/check/", "/check", "/kill/"] {
        let response = app.request(path).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR, "{path}");
        assert_eq!(response.body, json!({"error": "User name is required"}));
    }
    assert_eq!(app.process.inquiry_count(), 0);
}

#[tokio::test]
async fn test_unknown_command_is_server_error() {
    let app = TestApp::new().await;

    for path in ["/nope/bob", "/nope", "/"] {
        let response = app.request(path).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR, "{path}");
        assert_eq!(response.body, json!({"error": "Unknown command"}));
    }
}

#[tokio::test]
async fn test_silent_client_is_forbidden() {
    let app = TestApp::new().await;

    let response = app.raw_request(b"").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body, json!({"error": "Forbidden"}));
    assert_eq!(response.header("connection"), Some("close"));
}

#[tokio::test]
async fn test_unparseable_request_is_forbidden() {
    let app = TestApp::new().await;

    let response = app.raw_request(b"\xff\xfe\xfd\n").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.raw_request(b"HELLO\r\n").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_response_headers() {
    let app = TestApp::new().await;

    let response = app.request("/all_connections").await;
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.header("connection"), Some("close"));
    assert!(response.header("content-length").is_some());
}

#[tokio::test]
async fn test_unreachable_daemon_counts_ssh_only() {
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let port = closed.local_addr().expect("addr").port();
    drop(closed);

    let process = Arc::new(MockProcessQuery::new());
    process.add_ssh_session("erin", 50);
    let app = TestApp::start(process, Vpn::Port(port), "", &[]).await;

    let response = app.request("/check/erin").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["connection_count"], 1);

    let response = app.request("/all_connections").await;
    assert_eq!(response.body, json!({"count": 0, "success": true}));
}

#[tokio::test]
async fn test_kill_terminates_ssh_and_vpn() {
    let daemon = FakeDaemon::start(status_dump(&[("bob", "203.0.113.9")])).await;
    let process = Arc::new(MockProcessQuery::new());
    process.add_ssh_session("bob", 4242);
    process.add_process("bob", 4243);
    let app = TestApp::start(process, Vpn::Port(daemon.port), "", &[]).await;

    let response = app.request("/kill/bob").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"success": true, "error": null}));
    assert_eq!(app.process.killed_pids(), vec![4242, 4243]);
    assert!(daemon.wait_for("kill bob").await);
}

#[tokio::test]
async fn test_kill_twice_succeeds() {
    let process = Arc::new(MockProcessQuery::new());
    process.add_ssh_session("bob", 77);
    let app = TestApp::start(process, Vpn::Absent, "", &[]).await;

    for _ in 0..2 {
        let response = app.request("/kill/bob").await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["success"], true);
    }

    let response = app.request("/check/bob").await;
    assert_eq!(response.body["connection_count"], 0);
}

#[tokio::test]
async fn test_all_connections_matches_per_user_reports() {
    let daemon = FakeDaemon::start(status_dump(&[
        ("alice", "198.51.100.1"),
        ("bob", "198.51.100.2"),
        ("bob", "198.51.100.3"),
    ]))
    .await;

    let process = Arc::new(MockProcessQuery::new());
    process.add_account("root", 0);
    process.add_account("alice", 1000);
    process.add_account("bob", 1001);
    process.add_account("carol", 1002);
    process.add_ssh_session("root", 1);
    process.add_ssh_session("alice", 10);
    process.add_ssh_session("carol", 30);
    process.add_ssh_session("carol", 31);

    let app = TestApp::start(process, Vpn::Port(daemon.port), "", &[]).await;

    let mut sum = 0;
    for user in ["alice", "bob", "carol"] {
        let response = app.request(&format!("/check/{user}")).await;
        sum += response.body["connection_count"].as_u64().expect("count");
    }
    assert_eq!(sum, 6);

    let response = app.request("/all_connections").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"count": sum, "success": true}));

    let status_requests = daemon
        .commands()
        .iter()
        .filter(|c| c.as_str() == "status")
        .count();
    assert_eq!(status_requests, 4);
}

#[tokio::test]
async fn test_concurrent_requests() {
    let process = Arc::new(MockProcessQuery::new());
    process.add_ssh_session("alice", 1);
    let app = Arc::new(TestApp::start(process, Vpn::Absent, "alice 2\n", &[]).await);

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let app = Arc::clone(&app);
        tasks.push(tokio::spawn(async move { app.request("/check/alice").await }));
    }

    for task in tasks {
        let response = task.await.expect("task");
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["connection_limit"], 2);
    }
}

#[tokio::test]
async fn test_silent_client_does_not_block_others() {
    let app = TestApp::new().await;

    let _silent = tokio::net::TcpStream::connect(app.addr)
        .await
        .expect("connect");
    let response = tokio::time::timeout(Duration::from_secs(2), app.request("/all_connections"))
        .await
        .expect("answered while another client is silent");
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let mut app = TestApp::new().await;
    let addr = app.addr;

    assert_eq!(app.request("/all_connections").await.status, StatusCode::OK);
    app.stop().await;

    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}
