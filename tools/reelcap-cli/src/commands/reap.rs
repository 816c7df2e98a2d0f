//! Remove stale staging partitions.

use std::path::PathBuf;
use std::time::Duration;

use reelcap_common::config::AppConfig;
use reelcap_session_store::SessionStore;

pub fn run(ttl: u64, storage_root: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = AppConfig::load();
    if let Some(root) = storage_root {
        config.storage_root = root;
    }

    let store = SessionStore::new(&config.storage_root)?;
    let before = store.list_sessions()?.len();
    let reaped = store.reap_stale(Duration::from_secs(ttl))?;

    println!(
        "Reaped {} of {before} sessions older than {ttl}s under {}",
        reaped.len(),
        config.storage_root.display()
    );
    for session in reaped {
        println!("  removed session-{session}");
    }
    Ok(())
}
