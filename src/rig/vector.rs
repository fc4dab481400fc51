// Minimal 3D vector algebra for body-frame kinematics

use crate::config::DEGENERATE_NORM_EPSILON;

/// 3-vector in the body frame (x, y, z)
pub type Vec3 = [f64; 3];

pub const ZERO: Vec3 = [0.0, 0.0, 0.0];

pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn norm(v: Vec3) -> f64 {
    dot(v, v).sqrt()
}

/// Unit vector along `v`, or the zero vector when `v` is too short to normalize
pub fn unit(v: Vec3) -> Vec3 {
    let n = norm(v);
    if n < DEGENERATE_NORM_EPSILON {
        return ZERO;
    }
    v.map(|x| x / n)
}
