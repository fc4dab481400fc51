// PTO mounting geometry in the vehicle body frame
//
// Each PTO has a mount point (where the belt leaves the body) and an anchor
// point (where the belt is tied off). The belt direction is fixed by those
// two points and is derived once, not per sample.

use super::vector::{self, Vec3};
use crate::config::DEFAULT_PTOS;

/// A single power-takeoff channel
#[derive(Debug, Clone, PartialEq)]
pub struct PtoChannel {
    name: String,
    mount_point: Vec3,
    anchor_point: Vec3,
    belt_direction: Vec3,
}

impl PtoChannel {
    /// Create a channel, deriving its belt direction from the geometry.
    ///
    /// A channel whose mount and anchor coincide gets a zero belt direction,
    /// so every rate derived for it is zero.
    pub fn new(name: impl Into<String>, mount_point: Vec3, anchor_point: Vec3) -> Self {
        Self {
            name: name.into(),
            mount_point,
            anchor_point,
            belt_direction: vector::unit(vector::sub(anchor_point, mount_point)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mount_point(&self) -> Vec3 {
        self.mount_point
    }

    pub fn anchor_point(&self) -> Vec3 {
        self.anchor_point
    }

    pub fn belt_direction(&self) -> Vec3 {
        self.belt_direction
    }

    /// Replace the geometry; the only path that recomputes the belt direction
    pub fn set_geometry(&mut self, mount_point: Vec3, anchor_point: Vec3) {
        *self = Self::new(std::mem::take(&mut self.name), mount_point, anchor_point);
    }

    pub fn is_degenerate(&self) -> bool {
        self.belt_direction == vector::ZERO
    }
}

/// The rig: an ordered set of PTO channels. Declaration order is output order.
#[derive(Debug, Clone, PartialEq)]
pub struct RigBody {
    channels: Vec<PtoChannel>,
}

impl RigBody {
    pub fn new(channels: Vec<PtoChannel>) -> Self {
        Self { channels }
    }

    pub fn channels(&self) -> &[PtoChannel] {
        &self.channels
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut PtoChannel> {
        self.channels.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }
}

impl Default for RigBody {
    /// The three-PTO rig: one forward, two aft splayed port/starboard
    fn default() -> Self {
        Self::new(
            DEFAULT_PTOS
                .iter()
                .map(|&(name, mount, anchor)| PtoChannel::new(name, mount, anchor))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_belt_direction_derived_once() {
        let ch = PtoChannel::new("PTO 1", [5.0, 0.0, 0.0], [10.0, 0.0, -10.0]);
        let n = 125.0_f64.sqrt();
        let dir = ch.belt_direction();
        assert!((dir[0] - 5.0 / n).abs() < 1e-12);
        assert_eq!(dir[1], 0.0);
        assert!((dir[2] + 10.0 / n).abs() < 1e-12);
        assert!(!ch.is_degenerate());
    }

    #[test]
    fn test_degenerate_geometry() {
        let ch = PtoChannel::new("stub", [1.0, 2.0, 3.0], [1.0, 2.0, 3.0]);
        assert_eq!(ch.belt_direction(), vector::ZERO);
        assert!(ch.is_degenerate());
    }

    #[test]
    fn test_set_geometry_recomputes() {
        let mut ch = PtoChannel::new("PTO 1", [0.0, 0.0, 0.0], [0.0, 0.0, -1.0]);
        assert_eq!(ch.belt_direction(), [0.0, 0.0, -1.0]);

        ch.set_geometry([0.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        assert_eq!(ch.name(), "PTO 1");
        assert_eq!(ch.belt_direction(), [1.0, 0.0, 0.0]);
        assert_eq!(ch.anchor_point(), [2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_default_rig() {
        let rig = RigBody::default();
        assert_eq!(rig.len(), 3);
        assert_eq!(rig.names(), vec!["PTO 1", "PTO 2", "PTO 3"]);
        assert!(rig.channels().iter().all(|c| !c.is_degenerate()));
    }
}
