// Operator console: R resets battery and history, C reconnects now, S shows status, Q quits
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::Duration;
use tracing::{info, warn};

use pto_monitor::config::{TOPIC_CMD_RECONNECT, TOPIC_CMD_RESET, TOPIC_DISPLAY};
use pto_monitor::messages::DisplaySnapshot;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_RESET).await?;
    let reconnect = session.declare_publisher(TOPIC_CMD_RECONNECT).await?;
    let display = session.declare_subscriber(TOPIC_DISPLAY).await?;

    info!("Controls: R=reset, C=reconnect, S=status, Q=quit");

    enable_raw_mode()?;
    let result = run_console(&publisher, &reconnect, &display).await;
    disable_raw_mode()?;

    result
}

async fn run_console(
    publisher: &zenoh::pubsub::Publisher<'_>,
    reconnect: &zenoh::pubsub::Publisher<'_>,
    display: &zenoh::pubsub::Subscriber<zenoh::handlers::FifoChannelHandler<zenoh::sample::Sample>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut latest: Option<DisplaySnapshot> = None;

    loop {
        // Keep only the newest snapshot
        while let Ok(Some(sample)) = display.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DisplaySnapshot>(&payload) {
                Ok(snapshot) => latest = Some(snapshot),
                Err(e) => warn!("Failed to parse snapshot: {}", e),
            }
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                if kind != KeyEventKind::Press {
                    continue;
                }
                match code {
                    KeyCode::Char('r') => {
                        publisher.put("reset").await?;
                        info!("Reset sent");
                    }
                    KeyCode::Char('c') => {
                        reconnect.put("reconnect").await?;
                        info!("Reconnect sent");
                    }
                    KeyCode::Char('s') => match &latest {
                        Some(snapshot) => info!(
                            "{:?} | {} ({:.0}%)\r\n{}",
                            snapshot.connection,
                            snapshot.battery_label(),
                            snapshot.percent,
                            snapshot.summary().replace('\n', "\r\n")
                        ),
                        None => info!("No status received yet"),
                    },
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    _ => {}
                }
            }
        }
    }

    Ok(())
}
