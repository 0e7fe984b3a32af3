//! Pose receiver: listens for streamed joint packets and prints them.
//!
//! JSON mode prints the inter-frame interval and the first few joints of each
//! snapshot. OSC mode prints one line per joint message and a per-second rate.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::UdpSocket;

use arkit_udp_streamer::config::Config;
use arkit_udp_streamer::encode::{decode_joint_message, Encoding, SnapshotPacket};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listen address (overrides [receiver].bind)
    #[arg(short, long)]
    bind: Option<String>,

    /// json or osc (overrides [receiver].encoding)
    #[arg(short, long)]
    encoding: Option<Encoding>,
}

fn fmt_values(values: &[f32]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{:.3}", v)).collect();
    format!("[{}]", parts.join(", "))
}

struct JsonPrinter {
    last_ts: Option<f64>,
    preview: usize,
}

impl JsonPrinter {
    fn handle(&mut self, data: &[u8]) {
        let packet = match SnapshotPacket::decode(data) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Decode error: {}", e);
                return;
            }
        };

        if let Some(last) = self.last_ts {
            let dt = packet.timestamp - last;
            if dt > 0.0 {
                println!("\nFrame Δt = {:.3} sec ({:.1} fps approx)", dt, 1.0 / dt);
            } else {
                println!("\nFrame Δt = {:.3} sec (out of order)", dt);
            }
        }
        self.last_ts = Some(packet.timestamp);

        for (joint, values) in packet.joints.iter().take(self.preview) {
            println!("{}: pos={}, rot={}", joint, fmt_values(&values[..3]), fmt_values(&values[3..]));
        }
    }
}

#[derive(Default)]
struct OscPrinter {
    count: u32,
    timer: Option<Instant>,
}

impl OscPrinter {
    fn handle(&mut self, data: &[u8]) {
        match decode_joint_message(data) {
            Ok((joint, values)) => {
                log::debug!("{}: pos={}, rot={}", joint, fmt_values(&values[..3]), fmt_values(&values[3..]));
                self.count += 1;
            }
            Err(e) => {
                log::warn!("Decode error: {}", e);
                return;
            }
        }

        let timer = self.timer.get_or_insert_with(Instant::now);
        let elapsed = timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            println!("OSC: {:.1} msg/s", self.count as f32 / elapsed);
            self.count = 0;
            *timer = Instant::now();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = Config::load_or_default(&args.config)?;
    let bind = args.bind.unwrap_or(config.receiver.bind);
    let encoding = args.encoding.unwrap_or(config.receiver.encoding);

    let socket = UdpSocket::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    println!("Listening on UDP {} ({})...", socket.local_addr()?, encoding);

    let mut json = JsonPrinter {
        last_ts: None,
        preview: config.receiver.preview_joints,
    };
    let mut osc = OscPrinter::default();
    let mut buf = vec![0u8; 65535];

    loop {
        let n = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = socket.recv(&mut buf) => match received {
                Ok(n) => n,
                Err(e) => {
                    log::warn!("recv error: {}", e);
                    continue;
                }
            },
        };
        match encoding {
            Encoding::Json => json.handle(&buf[..n]),
            Encoding::Osc => osc.handle(&buf[..n]),
        }
    }

    println!("Stopped");
    Ok(())
}
