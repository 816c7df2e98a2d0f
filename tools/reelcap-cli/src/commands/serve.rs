//! Run the staging/finalize server.

use std::path::PathBuf;
use std::time::Duration;

use reelcap_common::config::{AppConfig, EncodeStrategy};
use reelcap_server::{build_router, serve, spawn_reaper, AppState};

pub async fn run(
    addr: Option<String>,
    storage_root: Option<PathBuf>,
    strategy: Option<String>,
    session_ttl: Option<u64>,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load();
    if let Some(addr) = addr {
        config.server.listen_addr = addr;
    }
    if let Some(root) = storage_root {
        config.storage_root = root;
    }
    if let Some(raw) = strategy {
        config.encoder.strategy = parse_strategy(&raw)?;
    }
    if let Some(ttl) = session_ttl {
        config.server.session_ttl_secs = ttl;
    }

    println!("Reelcap server");
    println!("  Listen:   {}", config.server.listen_addr);
    println!("  Staging:  {}", config.storage_root.display());
    println!("  Strategy: {:?}", config.encoder.strategy);

    let state = AppState::from_config(&config)?;

    if !state.finalizer.encoder_available() {
        tracing::warn!("ffmpeg not found; finalize requests will fail until it is installed");
    }

    let _reaper = spawn_reaper(
        state.store.clone(),
        Duration::from_secs(config.server.session_ttl_secs),
    );

    let router = build_router(state, config.server.max_batch_bytes);
    serve(&config.server.listen_addr, router).await?;
    Ok(())
}

pub(crate) fn parse_strategy(raw: &str) -> anyhow::Result<EncodeStrategy> {
    match raw {
        "image-sequence" => Ok(EncodeStrategy::ImageSequence),
        "concat-manifest" => Ok(EncodeStrategy::ConcatManifest),
        _ => Err(anyhow::anyhow!(
            "Unknown strategy: {raw}. Use: image-sequence, concat-manifest"
        )),
    }
}
