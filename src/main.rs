//! Body streamer: captures a rest pose, then sends rest-relative joint deltas
//! for every tracked-body update to the configured UDP endpoint.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use arkit_udp_streamer::config::{Config, SourceKind};
use arkit_udp_streamer::encode::Encoding;
use arkit_udp_streamer::sender::{ignore_failures, UdpSender};
use arkit_udp_streamer::skeleton::SkeletonFrame;
use arkit_udp_streamer::source::{PoseSource, ReplaySource, SyntheticBody};
use arkit_udp_streamer::streamer::{BodyStreamer, FrameStatus};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Receiver host (overrides [stream].host)
    #[arg(long)]
    host: Option<String>,

    /// Receiver port (overrides [stream].port)
    #[arg(short, long)]
    port: Option<u16>,

    /// json or osc (overrides [stream].encoding)
    #[arg(short, long)]
    encoding: Option<Encoding>,

    /// Swap left/right joint names and negate X
    #[arg(long)]
    mirrored: bool,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,
}

fn build_source(config: &Config) -> Result<(Box<dyn PoseSource>, Option<SkeletonFrame>)> {
    match config.source.kind {
        SourceKind::Synthetic => {
            let body = SyntheticBody::new(config.source.fps);
            let rest = body.rest_frame();
            Ok((Box::new(body), Some(rest)))
        }
        SourceKind::Replay => {
            let mut replay = ReplaySource::open(&config.source.path, config.source.loop_replay)?;
            // 記録の先頭フレームを基準姿勢にする
            let rest = replay.next_frame();
            Ok((Box::new(replay), rest))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = Config::load_or_default(&args.config)?;
    if let Some(host) = args.host {
        config.stream.host = host;
    }
    if let Some(port) = args.port {
        config.stream.port = port;
    }
    if let Some(encoding) = args.encoding {
        config.stream.encoding = encoding;
    }
    config.stream.mirrored |= args.mirrored;
    config.validate()?;

    println!("ARKit UDP Streamer {}", env!("CARGO_PKG_VERSION"));
    println!("Target: {}", config.stream.endpoint());
    println!("Encoding: {}", config.stream.encoding);
    println!("Mirrored: {}", if config.stream.mirrored { "ON" } else { "OFF" });
    println!("Source: {:?} @ {} fps", config.source.kind, config.source.fps);
    println!();

    let sender = UdpSender::connect(
        &config.stream.endpoint(),
        config.stream.queue_depth,
        ignore_failures(),
    )
    .await
    .with_context(|| format!("failed to open UDP association to {}", config.stream.endpoint()))?;
    let streamer = BodyStreamer::new(sender, config.stream.encoding, config.stream.mirrored);

    let (mut source, rest) = build_source(&config)?;
    match rest {
        Some(frame) if streamer.capture_rest_pose(&frame) => {}
        _ => anyhow::bail!("could not capture a rest pose from the source"),
    }

    let mut ticker = tokio::time::interval(Duration::from_secs_f32(1.0 / config.source.fps));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut total_frames = 0u64;
    let mut frame_count = 0u32;
    let mut datagram_count = 0usize;
    let mut fps_timer = Instant::now();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted");
                break;
            }
            _ = ticker.tick() => {}
        }

        let Some(frame) = source.next_frame() else {
            println!("Source exhausted");
            break;
        };
        let report = streamer.process_frame(&frame);
        if report.status == FrameStatus::Submitted {
            frame_count += 1;
            datagram_count += report.datagrams;
        }
        total_frames += 1;

        let elapsed = fps_timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            let stats = streamer.sender().stats();
            log::info!(
                "FPS: {:.1} | datagrams {} | sent {} failed {}",
                frame_count as f32 / elapsed,
                datagram_count,
                stats.sent,
                stats.failed
            );
            frame_count = 0;
            datagram_count = 0;
            fps_timer = Instant::now();
        }

        if args.frames.is_some_and(|limit| total_frames >= limit) {
            break;
        }
    }

    let stats = streamer.into_sender().close().await;
    println!(
        "Shutting down... frames {} | submitted {} sent {} failed {}",
        total_frames, stats.submitted, stats.sent, stats.failed
    );
    Ok(())
}
