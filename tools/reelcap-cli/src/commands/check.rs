//! Check system capabilities.

use reelcap_common::config::AppConfig;
use reelcap_encode_engine::{ffmpeg_available, resolve_ffmpeg};

pub fn run() -> anyhow::Result<()> {
    println!("Reelcap System Check");
    println!("{}", "=".repeat(50));

    let config = AppConfig::load();

    let ffmpeg = resolve_ffmpeg(&config.encoder);
    if ffmpeg_available(&ffmpeg) {
        println!("[OK] Encoder: {}", ffmpeg.display());
    } else {
        println!(
            "[FAIL] Encoder: {} not runnable (install ffmpeg or set FFMPEG_PATH)",
            ffmpeg.display()
        );
    }

    match std::fs::create_dir_all(&config.storage_root) {
        Ok(()) => println!("[OK] Staging root: {}", config.storage_root.display()),
        Err(e) => println!(
            "[FAIL] Staging root: {} ({e})",
            config.storage_root.display()
        ),
    }

    match std::fs::create_dir_all(&config.publish.object_root) {
        Ok(()) => println!("[OK] Object root: {}", config.publish.object_root.display()),
        Err(e) => println!(
            "[FAIL] Object root: {} ({e})",
            config.publish.object_root.display()
        ),
    }

    println!("     Strategy: {:?}", config.encoder.strategy);
    println!("     Listen:   {}", config.server.listen_addr);

    if ffmpeg_available(&ffmpeg) {
        println!();
        println!("All required capabilities are available. Reelcap is ready.");
    } else {
        println!();
        println!("The external encoder is missing; finalize will fail until it is installed.");
    }

    Ok(())
}
