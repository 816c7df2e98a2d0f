//! Finalize a staged session against the local store.

use std::path::PathBuf;
use std::sync::Arc;

use reelcap_common::config::AppConfig;
use reelcap_encode_engine::Finalizer;
use reelcap_frame_model::{FinalizeRequest, SessionId};
use reelcap_session_store::SessionStore;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    session: String,
    total_frames: u64,
    fps: u32,
    width: u32,
    height: u32,
    storage_root: Option<PathBuf>,
    strategy: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load();
    if let Some(root) = storage_root {
        config.storage_root = root;
    }
    if let Some(raw) = strategy {
        config.encoder.strategy = super::serve::parse_strategy(&raw)?;
    }

    let session = SessionId::parse(session)?;
    let store = Arc::new(SessionStore::new(&config.storage_root)?);
    let staged = store.frame_count(&session)?;
    println!("Finalizing session {session} ({staged} frames staged)");

    let finalizer = Finalizer::new(store, config.encoder.clone());
    let request = FinalizeRequest {
        total_frames,
        fps,
        width,
        height,
    };

    let task_session = session.clone();
    let artifact =
        tokio::task::spawn_blocking(move || finalizer.finalize(&task_session, &request)).await??;

    let output = output.unwrap_or_else(|| PathBuf::from(format!("output-{session}.mp4")));
    std::fs::write(&output, &artifact.bytes)?;
    println!(
        "Finalize complete: {} ({:.2} MB)",
        output.display(),
        artifact.len() as f64 / 1024.0 / 1024.0
    );
    Ok(())
}
