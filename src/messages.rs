// Wire payloads in from the rig, display snapshot out to the presentation layer

use serde::{Deserialize, Serialize};

use crate::energy::{BatteryState, ChargeBand};
use crate::rig::Vec3;

// Pull feed: one motion reading per request
// `gyr` is required; everything else may be missing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollPayload {
    /// Orientation quaternion [w, x, y, z]
    pub q: Option<[f64; 4]>,
    /// Body-frame acceleration (m/s^2)
    pub acc: Option<[f64; 3]>,
    /// Body-frame angular velocity (rad/s)
    pub gyr: [f64; 3],
    pub dt: Option<f64>,
}

// Push feed: rates already derived on the device, one per channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateFrame {
    pub rates: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dt: Option<f64>,
}

/// A validated motion reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub angular_velocity: Vec3,
    /// Carried for future frame transforms; rate derivation does not use it
    pub orientation: Option<[f64; 4]>,
    pub elapsed_seconds: f64,
}

impl MotionSample {
    pub fn from_payload(payload: &PollPayload, default_dt: f64) -> Self {
        Self {
            angular_velocity: payload.gyr,
            orientation: payload.q,
            elapsed_seconds: resolve_dt(payload.dt, default_dt),
        }
    }
}

/// Sample spacing, falling back to `default_dt` when missing or non-positive
pub fn resolve_dt(dt: Option<f64>, default_dt: f64) -> f64 {
    match dt {
        Some(dt) if dt.is_finite() && dt > 0.0 => dt,
        _ => default_dt,
    }
}

/// Feed connection state. Samples are only accepted while `Connected`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelView {
    pub name: String,
    /// Oldest to newest
    pub window: Vec<f64>,
    pub latest: f64,
}

/// Everything the presentation layer needs for one refresh
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplaySnapshot {
    pub channels: Vec<ChannelView>,
    pub battery: BatteryState,
    pub percent: f64,
    pub band: ChargeBand,
    pub connection: ConnectionState,
    pub diagnostic: Option<String>,
}

impl DisplaySnapshot {
    /// Text panel: latest rate per channel, or the last error
    pub fn summary(&self) -> String {
        if let Some(diagnostic) = &self.diagnostic {
            return format!("Error fetching data:\n{}", diagnostic);
        }
        let mut out = String::from("Belt Rates (m/s):");
        for channel in &self.channels {
            out.push_str(&format!("\n{}: {:.3}", channel.name, channel.latest));
        }
        out
    }

    /// Battery label, e.g. "0.02 / 15.0 kWh"
    pub fn battery_label(&self) -> String {
        format!(
            "{:.2} / {:.1} kWh",
            self.battery.charge, self.battery.capacity
        )
    }
}
