//! Run a synthetic capture against a server.

use std::path::PathBuf;

use reelcap_capture_engine::{
    CaptureConfig, CaptureOrchestrator, CaptureProgress, HttpApiClient, SyntheticSource,
};
use reelcap_frame_model::{FrameGeometry, SessionId};
use reelcap_publish::deliver;

pub struct CaptureArgs {
    pub server: String,
    pub session: Option<String>,
    pub duration: f64,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub batch_size: u32,
    pub color: String,
    pub output: Option<PathBuf>,
    pub owner: String,
    pub no_publish: bool,
}

pub async fn run(args: CaptureArgs) -> anyhow::Result<()> {
    let session_raw = args
        .session
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().to_string());
    let session = SessionId::parse(session_raw)
        .map_err(|e| anyhow::anyhow!("Invalid session id: {e}"))?;
    let color = parse_color(&args.color)?;

    println!("Capturing session {session}");
    println!("  Server:   {}", args.server);
    println!("  Source:   {}x{} solid #{}", args.width, args.height, args.color);
    println!("  Duration: {:.1}s at {} fps", args.duration, args.fps);

    let geometry = FrameGeometry::new(args.width, args.height);
    let mut source = SyntheticSource::solid(geometry, args.duration, color);
    let client = HttpApiClient::new(args.server.as_str());

    let orchestrator = CaptureOrchestrator::new(CaptureConfig {
        session_id: session.clone(),
        fps: args.fps,
        batch_size: args.batch_size,
    })?;

    let progress_cb: Box<dyn Fn(CaptureProgress) + Send> = Box::new(|p| {
        print!(
            "\r  {:5.1}% {}                    ",
            p.progress * 100.0,
            p.message
        );
    });

    let artifact = orchestrator
        .run(&mut source, &client, Some(progress_cb))
        .await?;
    println!(
        "\nEncoded video: {:.2} MB",
        artifact.len() as f64 / 1024.0 / 1024.0
    );

    // Local delivery and publish are independent; one failing must not
    // suppress the other.
    let file_name = format!("enhanced-video-{session}.mp4");
    let output = args.output.unwrap_or_else(|| PathBuf::from(&file_name));
    let delivered = match deliver(&artifact, &output) {
        Ok(()) => {
            println!("Saved locally: {}", output.display());
            true
        }
        Err(e) => {
            eprintln!("Local save failed: {e}");
            false
        }
    };

    let published = if args.no_publish {
        true
    } else {
        match client
            .publish_video(&args.owner, &file_name, &artifact.bytes)
            .await
        {
            Ok(receipt) => {
                println!("Published: {}", receipt.public_ref);
                println!("Content id: {}", receipt.content_id);
                true
            }
            Err(e) => {
                eprintln!("Publish failed: {e}");
                false
            }
        }
    };

    if !delivered && !published {
        return Err(anyhow::anyhow!(
            "Video was encoded but neither saved locally nor published"
        ));
    }
    Ok(())
}

fn parse_color(raw: &str) -> anyhow::Result<[u8; 4]> {
    let raw = raw.trim_start_matches('#');
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(anyhow::anyhow!("Color must be RRGGBB hex, got {raw:?}"));
    }
    let channel = |at: usize| u8::from_str_radix(&raw[at..at + 2], 16).unwrap();
    Ok([channel(0), channel(2), channel(4), 255])
}
