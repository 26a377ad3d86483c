//! Tests for streaming archive downloads.

use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use ttu_updater::{DownloadStreamItem, LauncherError, download_stream, download_to_file};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn progress_ends_at_one_hundred_percent() {
    let server = MockServer::start().await;
    let body = vec![7u8; 256 * 1024];
    Mock::given(method("GET"))
        .and(path("/windows.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("bin.zip");
    let client = reqwest::Client::new();

    let mut percents = Vec::new();
    let summary = download_to_file(
        &client,
        &format!("{}/windows.zip", server.uri()),
        &dest,
        |p| percents.push(p.percent),
    )
    .await
    .unwrap();

    assert_eq!(summary.bytes, body.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), body);
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.iter().all(|&p| p <= 100));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn stream_yields_complete_last() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/macos.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"zipdata".to_vec()))
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("client.zip");
    let items: Vec<_> = download_stream(
        reqwest::Client::new(),
        format!("{}/macos.zip", server.uri()),
        dest.clone(),
    )
    .collect()
    .await;

    assert!(items.iter().all(Result::is_ok));
    match items.last() {
        Some(Ok(DownloadStreamItem::Complete(summary))) => {
            assert_eq!(summary.bytes, 7);
            assert_eq!(summary.path, dest);
            assert_eq!(summary.progress.percent, 100);
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn error_status_is_download_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/windows.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().unwrap();
    let result = download_to_file(
        &reqwest::Client::new(),
        &format!("{}/windows.zip", server.uri()),
        &temp.path().join("bin.zip"),
        |_| {},
    )
    .await;

    match result {
        Err(LauncherError::Download(message)) => assert!(message.contains("404")),
        other => panic!("expected download error, got {other:?}"),
    }
}

/// Serves a response that announces more bytes than it sends.
async fn truncating_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\nConnection: close\r\n\r\n0123456789")
                .await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn truncated_body_is_download_error() {
    let base = truncating_server().await;
    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("client.zip");

    let mut percents = Vec::new();
    let result = download_to_file(
        &reqwest::Client::new(),
        &format!("{base}/macos.zip"),
        &dest,
        |p| percents.push(p.percent),
    )
    .await;

    match result {
        Err(LauncherError::Download(message)) => assert!(
            message.contains("truncated") || message.contains("interrupted"),
            "unexpected message: {message}"
        ),
        other => panic!("expected download error, got {other:?}"),
    }
    assert!(!percents.contains(&100));
    assert!(dest.exists());
}
