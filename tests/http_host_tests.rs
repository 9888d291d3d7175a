mod test_helpers;

use std::sync::Arc;

use link_downloader::*;
use tempfile::tempdir;
use test_helpers::collect_until_done;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn host_in(dir: &std::path::Path) -> HttpDownloadHost {
    let config = HttpHostConfig::builder()
        .with_download_dir(dir.to_path_buf())
        .build();
    HttpDownloadHost::new(config).unwrap()
}

#[tokio::test]
async fn test_http_download_written_to_disk() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7 fake".to_vec()))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let host = host_in(dir.path());
    let item = DownloadItem::new(format!("{}/files/report.pdf", server.uri()), "report.pdf");

    host.initiate(&item).await.unwrap();
    host.wait_idle().await;

    let written = std::fs::read(dir.path().join("report.pdf")).unwrap();
    assert_eq!(written, b"%PDF-1.7 fake");
}

#[tokio::test]
async fn test_duplicate_names_are_uniquified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("data"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let host = host_in(dir.path());
    let url = format!("{}/a.txt", server.uri());

    host.initiate(&DownloadItem::new(url.clone(), "a.txt"))
        .await
        .unwrap();
    host.initiate(&DownloadItem::new(url, "a.txt")).await.unwrap();
    host.wait_idle().await;

    assert!(dir.path().join("a.txt").exists());
    assert!(dir.path().join("a (1).txt").exists());
}

#[tokio::test]
async fn test_server_error_is_not_an_initiation_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let host = host_in(dir.path());
    let item = DownloadItem::new(format!("{}/missing.zip", server.uri()), "missing.zip");

    // Submission succeeds; the transfer itself fails in the background.
    assert!(host.initiate(&item).await.is_ok());
    host.wait_idle().await;
    assert!(!dir.path().join("missing.zip").exists());

    // A retry gets the original name back rather than "missing (1).zip".
    host.initiate(&item).await.unwrap();
    host.wait_idle().await;
    assert!(!dir.path().join("missing (1).zip").exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_failed_transfer_frees_name_for_next_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky/data.csv"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky/data.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a,b"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let host = host_in(dir.path());
    let item = DownloadItem::new(format!("{}/flaky/data.csv", server.uri()), "data.csv");

    host.initiate(&item).await.unwrap();
    host.wait_idle().await;
    host.initiate(&item).await.unwrap();
    host.wait_idle().await;

    assert_eq!(
        std::fs::read_to_string(dir.path().join("data.csv")).unwrap(),
        "a,b"
    );
    assert!(!dir.path().join("data (1).csv").exists());
}

#[tokio::test]
async fn test_bad_data_uri_leaves_no_file() {
    let dir = tempdir().unwrap();
    let host = host_in(dir.path());

    let result = host
        .initiate(&DownloadItem::new("data:text/plain;base64,!!!", "note.txt"))
        .await;
    assert!(matches!(result, Err(HostError::InvalidUrl { .. })));
    assert!(!dir.path().join("note.txt").exists());
}

#[tokio::test]
async fn test_rejected_urls() {
    let dir = tempdir().unwrap();
    let host = host_in(dir.path());

    let invalid = host
        .initiate(&DownloadItem::new("not a url", "x.pdf"))
        .await;
    assert!(matches!(invalid, Err(HostError::InvalidUrl { .. })));

    let ftp = host
        .initiate(&DownloadItem::new("ftp://example.com/x.pdf", "x.pdf"))
        .await;
    assert!(matches!(ftp, Err(HostError::UnsupportedScheme(s)) if s == "ftp"));
}

#[tokio::test]
async fn test_data_uri_is_decoded() {
    let dir = tempdir().unwrap();
    let host = host_in(dir.path());

    host.initiate(&DownloadItem::new(
        "data:text/plain;base64,aGVsbG8gd29ybGQ=",
        "hello.txt",
    ))
    .await
    .unwrap();

    let written = std::fs::read_to_string(dir.path().join("hello.txt")).unwrap();
    assert_eq!(written, "hello world");
}

#[tokio::test]
async fn test_file_name_falls_back_to_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("zip"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let host = host_in(dir.path());
    let item = DownloadItem::new(format!("{}/pkg/bundle.zip?token=1", server.uri()), "");

    host.initiate(&item).await.unwrap();
    host.wait_idle().await;
    assert!(dir.path().join("bundle.zip").exists());
}

#[tokio::test]
async fn test_batch_through_http_host() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("payload"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let host = Arc::new(host_in(dir.path()));
    let orch = DownloadOrchestrator::new(host.clone(), OrchestratorConfig::default());
    let (_id, mut rx) = orch.subscribe();

    let batch = vec![
        DownloadItem::new(format!("{}/one.txt", server.uri()), "one.txt"),
        DownloadItem::new("gopher://old.example/two.txt", "two.txt"),
        DownloadItem::new(format!("{}/three.txt", server.uri()), "three.txt"),
    ];
    orch.start_batch(batch, 10).unwrap();

    let events = collect_until_done(&mut rx).await;
    match events.last().unwrap() {
        DownloadEvent::DownloadComplete(done) => {
            assert_eq!(done.completed, 2);
            assert_eq!(done.failed, 1);
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }

    host.wait_idle().await;
    assert_eq!(
        std::fs::read_to_string(dir.path().join("one.txt")).unwrap(),
        "payload"
    );
    assert!(dir.path().join("three.txt").exists());
    assert!(!dir.path().join("two.txt").exists());
}
