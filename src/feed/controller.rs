// Feed state machine and per-sample pipeline
//
// Disconnected -> Connecting -> Connected, and back to Connecting whenever
// the transport fails. Each accepted sample is validated in full before any
// state is touched, then folded into the battery and the display windows.

use tracing::{debug, info};

use super::error::{FeedError, Result};
use super::source::FeedEvent;
use crate::config::{MonitorConfig, SourceConfig};
use crate::energy::{BatteryState, EnergyIntegrator};
use crate::messages::{
    ChannelView, ConnectionState, DisplaySnapshot, MotionSample, PollPayload, RateFrame,
    resolve_dt,
};
use crate::rig::{OmegaFilter, RigBody, compute_rates};
use crate::stream::DisplayBoard;

/// How raw payloads become per-channel rates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatePipeline {
    /// Pull feed: derive rates from the gyro reading
    Derive { filter: OmegaFilter },
    /// Push feed: rates arrive precomputed and are snapped below a threshold
    Precomputed { snap_threshold: f64 },
}

impl From<&SourceConfig> for RatePipeline {
    fn from(source: &SourceConfig) -> Self {
        match source {
            SourceConfig::Poll { filter, .. } => RatePipeline::Derive { filter: *filter },
            SourceConfig::Push { snap_threshold, .. } => RatePipeline::Precomputed {
                snap_threshold: *snap_threshold,
            },
        }
    }
}

/// Reject rates that cannot be integrated or serialized
fn ensure_finite(rates: &[f64]) -> Result<()> {
    match rates.iter().position(|rate| !rate.is_finite()) {
        Some(channel) => Err(FeedError::NonFinite { channel }),
        None => Ok(()),
    }
}

/// Snap a precomputed rate below `threshold` to zero
pub fn snap_rate(rate: f64, threshold: f64) -> f64 {
    if rate < threshold { 0.0 } else { rate }
}

pub struct FeedController {
    pipeline: RatePipeline,
    rig: RigBody,
    default_dt: f64,
    connection: ConnectionState,
    energy: EnergyIntegrator,
    board: DisplayBoard,
    diagnostic: Option<String>,
}

impl FeedController {
    pub fn new(config: &MonitorConfig) -> Self {
        let profile = config.profile;
        Self {
            pipeline: RatePipeline::from(&config.source),
            rig: config.rig.clone(),
            default_dt: config.default_dt,
            connection: ConnectionState::Disconnected,
            energy: EnergyIntegrator::new(profile.capacity_kwh, profile.kw_per_rate),
            board: DisplayBoard::new(config.rig.len(), profile.max_points),
            diagnostic: None,
        }
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn battery(&self) -> BatteryState {
        self.energy.state()
    }

    pub fn board(&self) -> &DisplayBoard {
        &self.board
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    pub fn rig(&self) -> &RigBody {
        &self.rig
    }

    fn set_connection(&mut self, next: ConnectionState) {
        if self.connection != next {
            info!("Connection {:?} -> {:?}", self.connection, next);
            self.connection = next;
        }
    }

    /// Mark the first connection attempt as in flight
    pub fn begin_connect(&mut self) {
        self.set_connection(ConnectionState::Connecting);
    }

    pub fn on_connected(&mut self) {
        self.set_connection(ConnectionState::Connected);
    }

    pub fn on_transport_error(&mut self, err: &FeedError) {
        self.diagnostic = Some(err.to_string());
        self.set_connection(ConnectionState::Connecting);
    }

    /// Route one event from the sample source
    pub fn handle_event(&mut self, event: FeedEvent) -> Result<()> {
        match event {
            FeedEvent::Connected => {
                self.on_connected();
                Ok(())
            }
            FeedEvent::Payload(text) => self.ingest(&text).map(|_| ()),
            FeedEvent::TransportError(err) => {
                self.on_transport_error(&err);
                Err(err)
            }
        }
    }

    /// Validate one raw payload and, if it passes, fold it into the state.
    ///
    /// Returns the rates that were recorded. On error nothing but the
    /// diagnostic changes.
    pub fn ingest(&mut self, text: &str) -> Result<Vec<f64>> {
        let parsed = if self.connection == ConnectionState::Connected {
            match self.pipeline {
                RatePipeline::Derive { filter } => self.parse_motion(text, filter),
                RatePipeline::Precomputed { snap_threshold } => {
                    self.parse_frame(text, snap_threshold)
                }
            }
        } else {
            Err(FeedError::NotConnected {
                state: self.connection,
            })
        };

        match parsed {
            Ok((rates, elapsed_seconds)) => {
                let state = self.energy.apply(&rates, elapsed_seconds);
                self.board.record(&rates);
                self.diagnostic = None;
                debug!(
                    "Rates {:?} over {}s, charge {:.6}/{} kWh",
                    rates, elapsed_seconds, state.charge, state.capacity
                );
                Ok(rates)
            }
            Err(err) => {
                self.diagnostic = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn parse_motion(&self, text: &str, filter: OmegaFilter) -> Result<(Vec<f64>, f64)> {
        let payload: PollPayload = serde_json::from_str(text)?;
        let sample = MotionSample::from_payload(&payload, self.default_dt);
        let omega = filter.apply(sample.angular_velocity);
        let rates = compute_rates(omega, self.rig.channels());
        ensure_finite(&rates)?;
        Ok((rates, sample.elapsed_seconds))
    }

    fn parse_frame(&self, text: &str, snap_threshold: f64) -> Result<(Vec<f64>, f64)> {
        let frame: RateFrame = serde_json::from_str(text)?;
        if frame.rates.len() != self.rig.len() {
            return Err(FeedError::ChannelCount {
                expected: self.rig.len(),
                got: frame.rates.len(),
            });
        }
        let rates: Vec<f64> = frame
            .rates
            .iter()
            .map(|&rate| snap_rate(rate, snap_threshold))
            .collect();
        ensure_finite(&rates)?;
        Ok((rates, resolve_dt(frame.dt, self.default_dt)))
    }

    /// Operator reset: empty battery and windows. Connection and geometry stay.
    pub fn reset(&mut self) {
        info!("Resetting battery and display history");
        self.energy.reset();
        self.board.reset();
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        let battery = self.energy.state();
        DisplaySnapshot {
            channels: self
                .rig
                .channels()
                .iter()
                .zip(self.board.windows())
                .zip(self.board.latest())
                .map(|((channel, window), &latest)| ChannelView {
                    name: channel.name().to_string(),
                    window: window.to_vec(),
                    latest,
                })
                .collect(),
            battery,
            percent: battery.percent(),
            band: battery.band(),
            connection: self.connection,
            diagnostic: self.diagnostic.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::ChargeBand;

    fn connected(config: MonitorConfig) -> FeedController {
        let mut controller = FeedController::new(&config);
        controller.begin_connect();
        controller.on_connected();
        controller
    }

    fn push_controller() -> FeedController {
        connected(MonitorConfig::push("ws://test/ws"))
    }

    fn poll_controller() -> FeedController {
        connected(MonitorConfig::poll("http://test/data"))
    }

    #[test]
    fn test_state_machine() {
        let mut controller = FeedController::new(&MonitorConfig::push("ws://test/ws"));
        assert_eq!(controller.connection(), ConnectionState::Disconnected);

        controller.begin_connect();
        assert_eq!(controller.connection(), ConnectionState::Connecting);

        controller.handle_event(FeedEvent::Connected).unwrap();
        assert_eq!(controller.connection(), ConnectionState::Connected);

        let err = controller
            .handle_event(FeedEvent::TransportError(FeedError::Closed))
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(controller.connection(), ConnectionState::Connecting);
        assert_eq!(controller.diagnostic(), Some("Connection closed"));
    }

    #[test]
    fn test_push_frame_accepted_and_snapped() {
        let mut controller = push_controller();
        let rates = controller
            .ingest(r#"{"rates":[0.5, 1.0, 2.5], "dt": 0.1}"#)
            .unwrap();
        assert_eq!(rates, vec![0.0, 1.0, 2.5]);

        let expected = 3.5 * 0.1 / 3600.0;
        assert!((controller.battery().charge - expected).abs() < 1e-15);
        assert_eq!(controller.battery().capacity, 0.15);
        assert_eq!(controller.board().latest(), &[0.0, 1.0, 2.5]);
    }

    #[test]
    fn test_push_frame_default_dt() {
        let mut controller = push_controller();
        controller.ingest(r#"{"rates":[2, 2, 2], "dt": 0}"#).unwrap();
        let expected = 6.0 * 0.05 / 3600.0;
        assert!((controller.battery().charge - expected).abs() < 1e-15);
    }

    #[test]
    fn test_malformed_push_frames_leave_state_unchanged() {
        let mut controller = push_controller();
        controller.ingest(r#"{"rates":[3, 3, 3]}"#).unwrap();
        let battery = controller.battery();
        let windows = controller.board().windows().to_vec();

        let bad = [
            r#"{"rates":[3, 3]}"#,
            r#"{"rates":[3, 3, 3, 3]}"#,
            r#"{"rates":[3, "x", 3]}"#,
            r#"{"dt": 0.05}"#,
            r#"not json"#,
        ];
        for frame in bad {
            let err = controller.ingest(frame).unwrap_err();
            assert!(!err.is_transport(), "{frame}");
            assert_eq!(controller.battery(), battery);
            assert_eq!(controller.board().windows(), windows.as_slice());
            assert_eq!(controller.connection(), ConnectionState::Connected);
            assert!(controller.diagnostic().is_some());
        }

        let err = controller.ingest(r#"{"rates":[3, 3]}"#).unwrap_err();
        assert!(matches!(
            err,
            FeedError::ChannelCount {
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn test_poll_sample_derives_rates() {
        let mut controller = poll_controller();
        // Pitch bow-down loads PTO 1 only
        let rates = controller
            .ingest(r#"{"q":[1,0,0,0],"acc":[0,0,9.81],"gyr":[0,1,0]}"#)
            .unwrap();
        assert!((rates[0] - 50.0 / 125.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(rates[1], 0.0);
        assert_eq!(rates[2], 0.0);

        let expected = rates[0] * 0.05 / 3600.0;
        assert!((controller.battery().charge - expected).abs() < 1e-15);
    }

    #[test]
    fn test_poll_pure_yaw_on_forward_pto() {
        let mut controller = poll_controller();
        let rates = controller.ingest(r#"{"gyr":[0,0,1],"dt":0.05}"#).unwrap();
        assert!(rates[0].abs() < 1e-12);
    }

    #[test]
    fn test_poll_malformed_surfaces_diagnostic() {
        let mut controller = poll_controller();
        let err = controller.ingest(r#"{"gyr":[0,1]}"#).unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
        assert!(controller.diagnostic().unwrap().starts_with("Malformed sample"));
        assert_eq!(controller.battery().charge, 0.0);
        assert!(controller.board().windows().iter().all(|w| w.is_empty()));

        // Next good sample clears it
        controller.ingest(r#"{"gyr":[0,0,0]}"#).unwrap();
        assert!(controller.diagnostic().is_none());
    }

    #[test]
    fn test_overflowing_gyro_discarded() {
        let mut controller = poll_controller();
        controller.ingest(r#"{"gyr":[0,1,0]}"#).unwrap();
        let battery = controller.battery();

        let err = controller.ingest(r#"{"gyr":[0,1e308,0]}"#).unwrap_err();
        assert!(matches!(err, FeedError::NonFinite { channel: 0 }));
        assert!(!err.is_transport());
        assert_eq!(controller.battery(), battery);
        assert_eq!(controller.board().windows()[0].len(), 1);

        // Snapshot still serializes with numbers, not nulls
        let json = serde_json::to_string(&controller.snapshot()).unwrap();
        let back: DisplaySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.channels[0].window.len(), 1);
    }

    #[test]
    fn test_poll_filter_applied() {
        let mut config = MonitorConfig::poll("http://test/data");
        config.source = SourceConfig::Poll {
            url: "http://test/data".into(),
            interval: std::time::Duration::from_millis(50),
            filter: OmegaFilter::FIRMWARE,
        };
        let mut controller = connected(config);
        let rates = controller.ingest(r#"{"gyr":[0.001,0.004,0.0]}"#).unwrap();
        assert_eq!(rates, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_samples_rejected_until_connected() {
        let mut controller = FeedController::new(&MonitorConfig::push("ws://test/ws"));
        controller.begin_connect();
        let err = controller.ingest(r#"{"rates":[3, 3, 3]}"#).unwrap_err();
        assert!(matches!(
            err,
            FeedError::NotConnected {
                state: ConnectionState::Connecting
            }
        ));
        assert_eq!(controller.battery().charge, 0.0);
    }

    #[test]
    fn test_window_capped_at_profile_length() {
        let mut controller = push_controller();
        for i in 0..100 {
            let frame = format!(r#"{{"rates":[{i}, 0, 0]}}"#);
            controller.ingest(&frame).unwrap();
        }
        let window = controller.board().windows()[0].to_vec();
        assert_eq!(window.len(), 80);
        assert_eq!(window[0], 20.0);
        assert_eq!(window[79], 99.0);
    }

    #[test]
    fn test_battery_clamps_at_capacity() {
        let mut controller = push_controller();
        for _ in 0..1000 {
            controller.ingest(r#"{"rates":[500, 500, 500], "dt": 1}"#).unwrap();
        }
        assert_eq!(controller.battery().charge, 0.15);
        assert_eq!(controller.snapshot().percent, 100.0);
        assert_eq!(controller.snapshot().band, ChargeBand::High);
    }

    #[test]
    fn test_reset() {
        let mut controller = push_controller();
        controller.ingest(r#"{"rates":[3, 4, 5]}"#).unwrap();
        controller.reset();

        assert_eq!(controller.battery().charge, 0.0);
        assert!(controller.board().windows().iter().all(|w| w.len() == 0));
        assert_eq!(controller.connection(), ConnectionState::Connected);
        assert_eq!(controller.rig(), &RigBody::default());
    }

    #[test]
    fn test_snapshot() {
        let mut controller = push_controller();
        controller.ingest(r#"{"rates":[1.5, 0, 2]}"#).unwrap();
        let snap = controller.snapshot();
        assert_eq!(snap.channels.len(), 3);
        assert_eq!(snap.channels[0].name, "PTO 1");
        assert_eq!(snap.channels[0].window, vec![1.5]);
        assert_eq!(snap.channels[2].latest, 2.0);
        assert_eq!(snap.connection, ConnectionState::Connected);
        assert!(snap.diagnostic.is_none());
        assert_eq!(snap.summary(), "Belt Rates (m/s):\nPTO 1: 1.500\nPTO 2: 0.000\nPTO 3: 2.000");
    }

    #[test]
    fn test_snap_rate() {
        assert_eq!(snap_rate(0.99, 1.0), 0.0);
        assert_eq!(snap_rate(-2.0, 1.0), 0.0);
        assert_eq!(snap_rate(1.0, 1.0), 1.0);
        assert_eq!(snap_rate(0.5, 0.1), 0.5);
    }
}
