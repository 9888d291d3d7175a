use std::path::PathBuf;
use std::sync::Arc;

use link_downloader::classifier::{self, Anchor};
use link_downloader::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // What a page scan would hand over.
    let anchors = vec![
        Anchor {
            href: "https://www.rust-lang.org/static/images/rust-logo-blk.svg".into(),
            text: "Rust logo".into(),
            parent_text: "Brand assets".into(),
        },
        Anchor {
            href: "https://www.rust-lang.org/learn".into(),
            text: "Learn".into(),
            parent_text: String::new(),
        },
        Anchor {
            href: "data:text/plain;base64,aGVsbG8gZnJvbSBhIGRhdGEgVVJJ".into(),
            text: "Inline note (1 KB)".into(),
            parent_text: String::new(),
        },
    ];

    let links = classifier::scan_links(&anchors);
    for link in &links {
        println!(
            "Found {} [{}] {:?}",
            link.file_name,
            link.extension,
            link.category()
        );
    }

    let host = HttpDownloadHost::new(
        HttpHostConfig::builder()
            .with_download_dir(PathBuf::from("demo-downloads"))
            .build(),
    )?;
    let host = Arc::new(host);
    let orchestrator = DownloadOrchestrator::new(host.clone(), OrchestratorConfig::default());
    let (_id, mut events) = orchestrator.subscribe();

    let batch = links.iter().map(|l| l.to_download_item()).collect();
    orchestrator.start_batch(batch, 500)?;

    while let Some(event) = events.recv().await {
        println!("{}", serde_json::to_string(&event)?);
        if matches!(
            event,
            DownloadEvent::DownloadComplete(_) | DownloadEvent::DownloadCancelled(_)
        ) {
            break;
        }
    }

    host.wait_idle().await;
    println!("Files are in {}", host.download_dir().display());
    Ok(())
}
