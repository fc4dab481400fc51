// Rig model for the PTO monitor
//
// Provides:
// - 3D vector helpers (cross, dot, norm, unit)
// - PTO mounting geometry and the fixed belt direction per channel
// - Body angular velocity -> belt speed derivation

pub mod geometry;
pub mod kinematics;
pub mod vector;

pub use geometry::{PtoChannel, RigBody};
pub use kinematics::{OmegaFilter, belt_rate, compute_rates};
pub use vector::Vec3;
