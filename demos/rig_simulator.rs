// Rig simulator: serves the push feed the way the on-board firmware does
//
// Every connected client gets a {rates, dt} frame every 100 ms. Rates come
// from a synthetic roll/pitch motion run through the firmware's gyro
// conditioning and the default PTO geometry.
use clap::Parser;
use futures_util::SinkExt;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info};

use pto_monitor::messages::RateFrame;
use pto_monitor::rig::{OmegaFilter, RigBody, compute_rates};

const UPDATE_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Parser)]
struct Args {
    /// Address to serve the websocket on
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Peak roll/pitch rate (rad/s)
    #[arg(long, default_value_t = 0.6)]
    amplitude: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let listener = TcpListener::bind(&args.bind).await?;
    info!("Rig simulator on ws://{}/ws", args.bind);

    loop {
        let (stream, peer) = listener.accept().await?;
        let amplitude = args.amplitude;
        tokio::spawn(async move {
            if let Err(e) = serve_client(stream, amplitude).await {
                error!(peer = %peer, error = %e, "client error");
            }
            info!("Client {} disconnected", peer);
        });
    }
}

async fn serve_client(
    stream: TcpStream,
    amplitude: f64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut ws = accept_async(stream).await?;
    let rig = RigBody::default();
    let started = Instant::now();
    let mut tick = interval(UPDATE_INTERVAL);

    loop {
        tick.tick().await;
        let t = started.elapsed().as_secs_f64();

        // Swell: slow roll, faster pitch, some yaw the firmware throws away
        let omega = [
            amplitude * (0.8 * t).sin(),
            amplitude * (1.3 * t).cos(),
            0.2 * (0.3 * t).sin(),
        ];
        let rates = compute_rates(OmegaFilter::FIRMWARE.apply(omega), rig.channels());

        let frame = RateFrame {
            rates,
            dt: Some(UPDATE_INTERVAL.as_secs_f64()),
        };
        ws.send(Message::Text(serde_json::to_string(&frame)?.into()))
            .await?;
    }
}
