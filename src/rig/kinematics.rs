// Rigid-body kinematics: body angular velocity -> per-PTO belt speed
//
// A point fixed in a rotating body moves with v = omega x r. The belt only
// sees the component of that velocity along its own direction. Translational
// body velocity is not available from the feed and is ignored.

use super::geometry::PtoChannel;
use super::vector::{self, Vec3};
use crate::config::GYRO_DEADBAND;

/// Conditioning applied to a raw gyro reading before rate derivation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OmegaFilter {
    /// Per-axis magnitudes below this are treated as zero (rad/s)
    pub deadband: f64,
    /// Force the z (yaw) component to zero
    pub suppress_yaw: bool,
}

impl OmegaFilter {
    /// Pass-through: no deadband, yaw kept
    pub const NONE: Self = Self {
        deadband: 0.0,
        suppress_yaw: false,
    };

    /// What the rig firmware does on-device: small deadband, yaw ignored
    pub const FIRMWARE: Self = Self {
        deadband: GYRO_DEADBAND,
        suppress_yaw: true,
    };

    pub fn apply(&self, omega: Vec3) -> Vec3 {
        let mut out = omega.map(|w| if w.abs() < self.deadband { 0.0 } else { w });
        if self.suppress_yaw {
            out[2] = 0.0;
        }
        out
    }
}

impl Default for OmegaFilter {
    fn default() -> Self {
        Self::NONE
    }
}

/// Belt speed for one channel (m/s), clamped to >= 0.
///
/// Negative projections mean the belt is being driven backward or is slack;
/// only forward motion loads the PTO.
pub fn belt_rate(angular_velocity: Vec3, channel: &PtoChannel) -> f64 {
    let v = vector::cross(angular_velocity, channel.mount_point());
    let rate = vector::dot(v, channel.belt_direction());
    rate.max(0.0)
}

/// Compute belt speeds for every channel, in declaration order
pub fn compute_rates(angular_velocity: Vec3, channels: &[PtoChannel]) -> Vec<f64> {
    channels
        .iter()
        .map(|channel| belt_rate(angular_velocity, channel))
        .collect()
}
