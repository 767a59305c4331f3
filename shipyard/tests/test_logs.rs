//! Job log history and live tails

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{header, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::time::timeout;

use shipyard::http::client::HttpClient;
use shipyard::http::tail::TailClient;
use shipyard::models::log::NewLogRecord;
use shipyard::store::{keys, Store};
use shipyard::streams::{Cursor, TailFrame, TailStart};
use shipyard_api::{LogEntry, LogLevel, TailEvent};

use common::{TestApp, API_KEY};

const JOB: &str = "job-1";

async fn append(app: &TestApp, line: &str) -> Cursor {
    app.store
        .log_append(&keys::job_stream(JOB), &NewLogRecord::new(LogLevel::Info, line))
        .await
        .unwrap()
}

async fn next_entry(rx: &mut tokio::sync::mpsc::Receiver<TailFrame>) -> String {
    loop {
        let frame = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for a tail frame")
            .expect("tail ended");
        if let TailFrame::Entry(record) = frame {
            return record.line;
        }
    }
}

#[tokio::test]
async fn test_history_of_unknown_job_is_empty() {
    let app = TestApp::new();
    let (status, body) = app
        .call(Method::GET, "/api/jobs/nope/logs", None)
        .await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["entries"], serde_json::json!([]));
    assert_eq!(body["lastId"], "0-0");
}

#[tokio::test]
async fn test_history_then_tail_sees_each_entry_once() {
    let app = TestApp::new();
    for i in 0..3 {
        append(&app, &format!("before {}", i)).await;
    }

    let history = app.state.streams.history(JOB).await.unwrap();
    assert_eq!(history.entries.len(), 3);
    let last: Cursor = history.last_id.parse().unwrap();

    // Appended between the history read and the tail opening
    append(&app, "gap").await;

    let mut rx = app.state.streams.tail(JOB, TailStart::After(last)).await.unwrap();
    assert_eq!(rx.recv().await, Some(TailFrame::Connected));
    assert_eq!(next_entry(&mut rx).await, "gap");

    for i in 0..3 {
        append(&app, &format!("after {}", i)).await;
    }
    for i in 0..3 {
        assert_eq!(next_entry(&mut rx).await, format!("after {}", i));
    }
}

#[tokio::test]
async fn test_tail_from_cursor_in_order() {
    let app = TestApp::new();
    let mut cursors = Vec::new();
    for i in 0..10 {
        cursors.push(append(&app, &i.to_string()).await);
    }

    let mut rx = app.state.streams.tail(JOB, TailStart::After(cursors[4])).await.unwrap();
    let mut seen = Vec::new();
    while seen.len() < 5 {
        seen.push(next_entry(&mut rx).await);
    }
    assert_eq!(seen, vec!["5", "6", "7", "8", "9"]);
}

#[tokio::test]
async fn test_closing_streams_ends_tails() {
    let app = TestApp::new();
    let mut rx = app.state.streams.tail(JOB, TailStart::Latest).await.unwrap();
    assert_eq!(rx.recv().await, Some(TailFrame::Connected));

    app.state.shutdown().await.unwrap();

    let end = timeout(Duration::from_secs(5), async {
        while rx.recv().await.is_some() {}
    })
    .await;
    assert!(end.is_ok(), "tail kept running after shutdown");
}

#[tokio::test]
async fn test_tail_client_over_http() {
    let app = TestApp::new();
    let before = append(&app, "before").await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let http = HttpClient::new(
        &format!("http://{}", addr),
        Some(SecretString::from(API_KEY)),
    )
    .unwrap();

    let history = http.history(JOB).await.unwrap();
    assert_eq!(history.entries.len(), 1);
    assert_eq!(history.last_id, before.to_string());

    let client = TailClient::new(http).with_reconnect_delay(Duration::from_millis(50));
    let mut entries = client.follow(JOB, Some(before));

    append(&app, "one").await;
    append(&app, "two").await;

    let mut seen = Vec::new();
    while seen.len() < 2 {
        let entry = timeout(Duration::from_secs(5), entries.recv())
            .await
            .expect("timed out waiting for tail entry")
            .expect("tail client stopped");
        seen.push(entry.line);
    }
    assert_eq!(seen, vec!["one", "two"]);

    drop(entries);
    server.abort();
}

fn sse_frames(entries: &[(&str, &str)]) -> String {
    let mut events = vec![TailEvent::connected()];
    events.extend(entries.iter().map(|(id, line)| {
        TailEvent::entry(LogEntry {
            id: id.to_string(),
            timestamp: String::new(),
            level: LogLevel::Info,
            line: line.to_string(),
        })
    }));
    events
        .iter()
        .map(|event| format!("data: {}\n\n", serde_json::to_string(event).unwrap()))
        .collect()
}

/// Ends the first response after two entries, replays one of them on the
/// second, and holds the third open
async fn scripted_tail(
    State(requests): State<Arc<Mutex<Vec<String>>>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let attempt = {
        let mut requests = requests.lock().unwrap();
        requests.push(query.get("from").cloned().unwrap_or_default());
        requests.len()
    };
    let body = match attempt {
        1 => Body::from(sse_frames(&[("1-0", "one"), ("2-0", "two")])),
        2 => Body::from(sse_frames(&[("2-0", "two"), ("3-0", "three"), ("4-0", "four")])),
        _ => Body::from_stream(futures::stream::pending::<Result<Bytes, std::io::Error>>()),
    };
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

#[tokio::test]
async fn test_tail_client_resumes_once_after_disconnect() {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route("/api/jobs/{id}/logs/tail", get(scripted_tail))
        .with_state(requests.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let http = HttpClient::new(&format!("http://{}", addr), None).unwrap();
    let client = TailClient::new(http).with_reconnect_delay(Duration::from_millis(20));
    let mut entries = client.follow(JOB, None);

    let mut seen = Vec::new();
    while seen.len() < 4 {
        let entry = timeout(Duration::from_secs(5), entries.recv())
            .await
            .expect("timed out waiting for tail entry")
            .expect("tail client stopped");
        seen.push(entry.line);
    }
    assert_eq!(seen, vec!["one", "two", "three", "four"]);

    // The replayed "two" never surfaces
    let extra = timeout(Duration::from_millis(300), entries.recv()).await;
    assert!(extra.is_err(), "unexpected entry: {:?}", extra);

    let requests = requests.lock().unwrap().clone();
    assert!(requests.len() >= 3, "no reconnect after second end: {:?}", requests);
    assert_eq!(requests[..3], ["$", "2-0", "4-0"]);

    drop(entries);
    server.abort();
}
