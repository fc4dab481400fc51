// Event loop: sample source -> controller -> zenoh display topics
//
// Single-threaded and cooperative. One event (a feed event or an operator
// command) is handled to completion before the next is awaited, so the
// controller needs no locking. The sample source is the only transport
// handle; it sits beside the controller in this loop and nothing else
// touches it.

use tokio::signal;
use tracing::{debug, info, warn};

use crate::config::{
    MonitorConfig, TOPIC_CMD_RECONNECT, TOPIC_CMD_RESET, TOPIC_CONNECTION, TOPIC_DISPLAY,
};
use crate::feed::{FeedController, SampleSource};
use crate::messages::ConnectionState;

/// Operator commands arriving on the command topics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Empty the battery and every display window
    Reset,
    /// Drop a pending reconnect wait and try the push feed now
    Reconnect,
}

pub fn apply_command(
    controller: &mut FeedController,
    source: &mut SampleSource,
    command: OperatorCommand,
) {
    match command {
        OperatorCommand::Reset => controller.reset(),
        OperatorCommand::Reconnect => {
            info!("Operator requested reconnect");
            source.reconnect_now();
        }
    }
}

/// Remembers the last published connection state so it only goes out on change
#[derive(Debug, Default)]
pub struct ConnectionGate {
    published: Option<ConnectionState>,
}

impl ConnectionGate {
    /// True if `state` differs from what was last published; records it
    pub fn changed(&mut self, state: ConnectionState) -> bool {
        if self.published == Some(state) {
            return false;
        }
        self.published = Some(state);
        true
    }
}

pub async fn run(config: MonitorConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let reset_subscriber = session.declare_subscriber(TOPIC_CMD_RESET).await?;
    let reconnect_subscriber = session.declare_subscriber(TOPIC_CMD_RECONNECT).await?;
    let pub_display = session.declare_publisher(TOPIC_DISPLAY).await?;
    let pub_connection = session.declare_publisher(TOPIC_CONNECTION).await?;

    let mut controller = FeedController::new(&config);
    let mut source = SampleSource::from_config(&config);

    info!(
        "Monitor started: {:?}, capacity {} kWh, {} points per channel",
        config.source, config.profile.capacity_kwh, config.profile.max_points
    );
    info!("Subscribed to: {}, {}", TOPIC_CMD_RESET, TOPIC_CMD_RECONNECT);
    info!("Publishing to: {}, {}", TOPIC_DISPLAY, TOPIC_CONNECTION);

    controller.begin_connect();
    let mut gate = ConnectionGate::default();

    loop {
        tokio::select! {
            event = source.next_event() => {
                if let Err(e) = controller.handle_event(event) {
                    if e.is_transport() {
                        warn!("Feed transport error: {}", e);
                    } else {
                        warn!("Discarded sample: {}", e);
                    }
                }
            }
            reset = reset_subscriber.recv_async() => {
                reset?;
                apply_command(&mut controller, &mut source, OperatorCommand::Reset);
            }
            reconnect = reconnect_subscriber.recv_async() => {
                reconnect?;
                apply_command(&mut controller, &mut source, OperatorCommand::Reconnect);
            }
            _ = signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        }

        let connection = controller.connection();
        if gate.changed(connection) {
            pub_connection.put(serde_json::to_string(&connection)?).await?;
        }

        let snapshot = controller.snapshot();
        debug!("{}", snapshot.summary());
        pub_display.put(serde_json::to_string(&snapshot)?).await?;
    }
}
