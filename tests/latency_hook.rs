//! Latency reporting against a live server.

use std::time::Duration;

use axum::http::HeaderValue;
use backend_server::config::StaticSource;
use backend_server::http::cors::{CorsPolicy, OriginPolicy};
use backend_server::http::hooks::ResponseOutcome;
use backend_server::http::latency::LatencyReport;
use backend_server::lifecycle::Bootstrap;
use futures_util::future::join_all;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

mod common;

async fn next_report(rx: &mut mpsc::UnboundedReceiver<LatencyReport>) -> LatencyReport {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("report in time")
        .expect("observer open")
}

#[tokio::test]
async fn delayed_handler_is_measured_end_to_end() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let process = Bootstrap::new(StaticSource::new([
        ("NODE_ENV", "test"),
        ("PORT", "4000"),
        ("HOST", "127.0.0.1"),
    ]))
    .with_routes(common::delay_routes())
    .with_latency_observer(tx)
    .without_signal_handlers()
    .start()
    .await
    .expect("startup");

    let res = common::client()
        .get("http://127.0.0.1:4000/delay/10")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ok");

    let report = next_report(&mut rx).await;
    assert_eq!(report.path, "/delay/10");
    assert_eq!(report.method, "GET");
    assert_eq!(report.outcome, ResponseOutcome::Completed(StatusCode::OK));

    let ms = report.elapsed_ms().expect("timed");
    assert!((9.0..30.0).contains(&ms), "latency {ms} ms");

    let message = report.message();
    assert!(message.starts_with("Latency for /delay/10: "), "{message}");
    assert!(message.ends_with(" ms"), "{message}");

    process.stop();
}

#[tokio::test]
async fn concurrent_requests_are_timed_independently() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let process = Bootstrap::new(common::local_config(28311))
        .with_routes(common::delay_routes())
        .with_latency_observer(tx)
        .without_signal_handlers()
        .start()
        .await
        .expect("startup");

    let delays = [120u64, 5, 80, 25, 50];
    let client = common::client();
    let responses = join_all(delays.iter().map(|ms| {
        client
            .get(format!("http://127.0.0.1:28311/delay/{ms}"))
            .send()
    }))
    .await;
    for res in responses {
        assert_eq!(res.unwrap().status(), StatusCode::OK);
    }

    let mut reports = Vec::new();
    for _ in delays {
        reports.push(next_report(&mut rx).await);
    }

    for ms in delays {
        let path = format!("/delay/{ms}");
        let report = reports
            .iter()
            .find(|r| r.path == path)
            .unwrap_or_else(|| panic!("no report for {path}"));
        let measured = report.elapsed_ms().expect("timed");
        let expected = ms as f64;
        assert!(
            measured >= expected - 1.0 && measured <= expected + 40.0,
            "{path}: {measured} ms"
        );
    }

    // Shorter requests finish first, whatever the send order.
    let fastest = &reports[0];
    assert_eq!(fastest.path, "/delay/5");

    process.stop();
}

#[tokio::test]
async fn request_id_header_flows_into_report() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let process = Bootstrap::new(common::local_config(28312))
        .with_latency_observer(tx)
        .without_signal_handlers()
        .start()
        .await
        .expect("startup");

    let res = common::client()
        .get("http://127.0.0.1:28312/health")
        .header("x-request-id", "trace-abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let report = next_report(&mut rx).await;
    assert_eq!(report.request_id, "trace-abc-123");
    assert_eq!(report.path, "/health");

    process.stop();
}

#[tokio::test]
async fn preflight_is_answered_and_still_measured() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let process = Bootstrap::new(common::local_config(28313))
        .with_routes(common::delay_routes())
        .with_latency_observer(tx)
        .without_signal_handlers()
        .start()
        .await
        .expect("startup");

    let res = common::client()
        .request(reqwest::Method::OPTIONS, "http://127.0.0.1:28313/delay/1")
        .header("origin", "https://app.example.com")
        .header("access-control-request-method", "PATCH")
        .header("access-control-request-headers", "authorization")
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let headers = res.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "https://app.example.com"
    );
    assert_eq!(headers["access-control-allow-credentials"], "true");
    let methods = headers["access-control-allow-methods"].to_str().unwrap();
    assert!(methods.contains("PATCH"), "{methods}");

    let report = next_report(&mut rx).await;
    assert_eq!(report.method, "OPTIONS");
    assert_eq!(report.path, "/delay/1");
    assert!(report.elapsed.is_some());

    process.stop();
}

#[tokio::test]
async fn unmatched_route_is_still_reported() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let process = Bootstrap::new(common::local_config(28314))
        .with_latency_observer(tx)
        .without_signal_handlers()
        .start()
        .await
        .expect("startup");

    let res = common::client()
        .get("http://127.0.0.1:28314/missing?page=2")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let report = next_report(&mut rx).await;
    assert_eq!(report.path, "/missing?page=2");
    assert_eq!(
        report.outcome,
        ResponseOutcome::Completed(StatusCode::NOT_FOUND)
    );

    process.stop();
}

#[tokio::test]
async fn client_disconnect_mid_handler_reports_aborted() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let process = Bootstrap::new(common::local_config(28315))
        .with_routes(common::delay_routes())
        .with_latency_observer(tx)
        .without_signal_handlers()
        .start()
        .await
        .expect("startup");

    let mut socket = TcpStream::connect(process.local_addr()).await.unwrap();
    socket
        .write_all(b"GET /delay/500 HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(socket);

    let report = next_report(&mut rx).await;
    assert_eq!(report.path, "/delay/500");
    assert_eq!(report.outcome, ResponseOutcome::Aborted);
    let ms = report.elapsed_ms().expect("timed");
    assert!((40.0..400.0).contains(&ms), "aborted after {ms} ms");

    process.stop();
}

#[tokio::test]
async fn origin_allow_list_replaces_default_policy() {
    let policy = CorsPolicy {
        origins: OriginPolicy::List(vec![HeaderValue::from_static("https://allowed.example.com")]),
        ..CorsPolicy::default()
    };
    let process = Bootstrap::new(common::local_config(28316))
        .with_cors(policy)
        .without_signal_handlers()
        .start()
        .await
        .expect("startup");
    let client = common::client();

    let allowed = client
        .get("http://127.0.0.1:28316/health")
        .header("origin", "https://allowed.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()["access-control-allow-origin"],
        "https://allowed.example.com"
    );
    assert_eq!(allowed.headers()["access-control-allow-credentials"], "true");

    let other = client
        .get("http://127.0.0.1:28316/health")
        .header("origin", "https://elsewhere.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);
    assert!(other.headers().get("access-control-allow-origin").is_none());

    process.stop();
}
