// Policy constants, topics, rig geometry, and runtime configuration
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::rig::{OmegaFilter, RigBody, Vec3};

// Elapsed time assumed when a sample carries no usable dt (seconds)
pub const DEFAULT_DT_SECS: f64 = 0.05;

// Poll cadence for the pull feed
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

// First reconnect delay for the push feed, and the backoff ceiling
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(16);

// Push-feed rates below this are noise and snap to zero
pub const RATE_SNAP_THRESHOLD: f64 = 1.0;

// Vectors shorter than this have no direction
pub const DEGENERATE_NORM_EPSILON: f64 = 1e-9;

// Gyro deadband used by the rig firmware (rad/s)
pub const GYRO_DEADBAND: f64 = 0.005;

// Default endpoints
pub const DEFAULT_POLL_URL: &str = "http://localhost:3000/data";
pub const DEFAULT_PUSH_URL: &str = "ws://192.168.4.1/ws";

// Zenoh topics
pub const TOPIC_DISPLAY: &str = "pto/state/display"; // display snapshot
pub const TOPIC_CONNECTION: &str = "pto/state/connection"; // connection state
pub const TOPIC_CMD_RESET: &str = "pto/cmd/reset"; // operator reset
pub const TOPIC_CMD_RECONNECT: &str = "pto/cmd/reconnect"; // skip a pending reconnect wait

// PTO geometry: (name, mount point, anchor point), body frame, meters
pub const DEFAULT_PTOS: [(&str, Vec3, Vec3); 3] = [
    ("PTO 1", [5.0, 0.0, 0.0], [10.0, 0.0, -10.0]),
    ("PTO 2", [-5.0, 2.5, 0.0], [-10.0, 5.0, -10.0]),
    ("PTO 3", [-5.0, -2.5, 0.0], [-10.0, -5.0, -10.0]),
];

/// Unit assumptions for one feed variant.
///
/// The pull and push feeds historically used different battery scales;
/// they are kept apart rather than reconciled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingProfile {
    pub capacity_kwh: f64,
    pub kw_per_rate: f64,
    pub max_points: usize,
}

impl ScalingProfile {
    pub const POLL: Self = Self {
        capacity_kwh: 15.0,
        kw_per_rate: 1.0,
        max_points: 100,
    };

    pub const PUSH: Self = Self {
        capacity_kwh: 0.15,
        kw_per_rate: 1.0,
        max_points: 80,
    };
}

/// Which acquisition variant to run, with its transport settings
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    Poll {
        url: String,
        interval: Duration,
        filter: OmegaFilter,
    },
    Push {
        url: String,
        snap_threshold: f64,
    },
}

/// A setting that would break the pipeline at runtime
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be finite and >= 0, got {value}")]
    NegativeOrNonFinite { name: &'static str, value: f64 },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NegativeOrNonFinite { name, value })
    }
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub source: SourceConfig,
    pub profile: ScalingProfile,
    pub default_dt: f64,
    pub reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    pub rig: RigBody,
}

impl MonitorConfig {
    pub fn poll(url: impl Into<String>) -> Self {
        Self::with_source(
            SourceConfig::Poll {
                url: url.into(),
                interval: POLL_INTERVAL,
                filter: OmegaFilter::NONE,
            },
            ScalingProfile::POLL,
        )
    }

    pub fn push(url: impl Into<String>) -> Self {
        Self::with_source(
            SourceConfig::Push {
                url: url.into(),
                snap_threshold: RATE_SNAP_THRESHOLD,
            },
            ScalingProfile::PUSH,
        )
    }

    /// Reject settings that would panic or let charge or rates go negative
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("capacity", self.profile.capacity_kwh)?;
        non_negative("kw_per_rate", self.profile.kw_per_rate)?;
        if self.profile.max_points == 0 {
            return Err(ConfigError::Zero { name: "max_points" });
        }
        if !(self.default_dt.is_finite() && self.default_dt > 0.0) {
            return Err(ConfigError::Zero { name: "default_dt" });
        }
        if self.reconnect_delay.is_zero() {
            return Err(ConfigError::Zero {
                name: "reconnect delay",
            });
        }
        match &self.source {
            SourceConfig::Poll {
                interval, filter, ..
            } => {
                if interval.is_zero() {
                    return Err(ConfigError::Zero {
                        name: "poll interval",
                    });
                }
                non_negative("gyro deadband", filter.deadband)
            }
            SourceConfig::Push { snap_threshold, .. } => {
                non_negative("snap_threshold", *snap_threshold)
            }
        }
    }

    fn with_source(source: SourceConfig, profile: ScalingProfile) -> Self {
        Self {
            source,
            profile,
            default_dt: DEFAULT_DT_SECS,
            reconnect_delay: RECONNECT_DELAY,
            max_reconnect_delay: MAX_RECONNECT_DELAY,
            rig: RigBody::default(),
        }
    }
}

/// Command line for the monitor binary
#[derive(Debug, Parser)]
#[command(name = "pto-monitor", about = "Live PTO belt-rate and battery monitor")]
pub struct Args {
    #[command(subcommand)]
    pub mode: Mode,

    /// Battery capacity override (kWh)
    #[arg(long, global = true)]
    pub capacity: Option<f64>,

    /// kW produced per unit of summed belt rate
    #[arg(long, global = true)]
    pub kw_per_rate: Option<f64>,

    /// Points kept per channel for the time-series display
    #[arg(long, global = true)]
    pub max_points: Option<usize>,

    /// First reconnect delay (ms)
    #[arg(long, global = true, default_value_t = RECONNECT_DELAY.as_millis() as u64)]
    pub reconnect_ms: u64,

    /// Reconnect backoff ceiling (ms)
    #[arg(long, global = true, default_value_t = MAX_RECONNECT_DELAY.as_millis() as u64)]
    pub max_reconnect_ms: u64,
}

#[derive(Debug, Subcommand)]
pub enum Mode {
    /// Poll a JSON motion endpoint and derive rates locally
    Poll {
        #[arg(long, default_value = DEFAULT_POLL_URL)]
        url: String,

        #[arg(long, default_value_t = POLL_INTERVAL.as_millis() as u64)]
        interval_ms: u64,

        /// Zero gyro axes below the firmware deadband
        #[arg(long)]
        deadband: bool,

        /// Ignore yaw rate
        #[arg(long)]
        suppress_yaw: bool,
    },
    /// Stream precomputed rate frames over a websocket
    Push {
        #[arg(long, default_value = DEFAULT_PUSH_URL)]
        url: String,

        #[arg(long, default_value_t = RATE_SNAP_THRESHOLD)]
        snap_threshold: f64,
    },
}

impl TryFrom<Args> for MonitorConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, ConfigError> {
        let mut config = match args.mode {
            Mode::Poll {
                url,
                interval_ms,
                deadband,
                suppress_yaw,
            } => MonitorConfig::with_source(
                SourceConfig::Poll {
                    url,
                    interval: Duration::from_millis(interval_ms),
                    filter: OmegaFilter {
                        deadband: if deadband { GYRO_DEADBAND } else { 0.0 },
                        suppress_yaw,
                    },
                },
                ScalingProfile::POLL,
            ),
            Mode::Push {
                url,
                snap_threshold,
            } => MonitorConfig::with_source(
                SourceConfig::Push {
                    url,
                    snap_threshold,
                },
                ScalingProfile::PUSH,
            ),
        };

        if let Some(capacity) = args.capacity {
            config.profile.capacity_kwh = capacity;
        }
        if let Some(kw) = args.kw_per_rate {
            config.profile.kw_per_rate = kw;
        }
        if let Some(points) = args.max_points {
            config.profile.max_points = points;
        }
        config.reconnect_delay = Duration::from_millis(args.reconnect_ms);
        config.max_reconnect_delay =
            Duration::from_millis(args.max_reconnect_ms.max(args.reconnect_ms));
        config.validate()?;
        Ok(config)
    }
}
