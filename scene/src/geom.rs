use glam::{DQuat, DVec3};
use serde::Serialize;
use std::{f64::consts::PI, fmt};

/// Rotation given as X, Y, Z angles in degrees, applied X first, then Y,
/// then Z about the world axes.
pub fn rotation_xyz_degrees(x: f64, y: f64, z: f64) -> DQuat {
    DQuat::from_rotation_z(degrees_to_radians(z))
        * DQuat::from_rotation_y(degrees_to_radians(y))
        * DQuat::from_rotation_x(degrees_to_radians(x))
}

/// One camera draw: angles in degrees, distance in scene units.
///
/// `v_angle` is the polar angle measured from +Z, `h_angle` the azimuth in the
/// XY plane, so `(h = 0, v = 90)` sits on the +X axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CameraSample {
    pub h_angle: f64,
    pub v_angle: f64,
    pub distance: f64,
}

impl CameraSample {
    pub fn position(&self) -> DVec3 {
        spherical_to_cartesian(
            (
                degrees_to_radians(self.v_angle),
                degrees_to_radians(self.h_angle),
            ),
            self.distance,
        )
    }
}

impl fmt::Display for CameraSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "h={:.2}° v={:.2}° d={:.3}",
            self.h_angle, self.v_angle, self.distance
        )
    }
}

pub fn degrees_to_radians(deg: f64) -> f64 {
    PI * deg / 180.0
}

/// `alpha` is the polar angle from +Z, `beta` the azimuth from +X.
pub fn spherical_to_cartesian(angles: (f64, f64), radius: f64) -> DVec3 {
    let (alpha, beta) = angles;
    DVec3::new(
        radius * alpha.sin() * beta.cos(),
        radius * alpha.sin() * beta.sin(),
        radius * alpha.cos(),
    )
}

/// Inverse of [`spherical_to_cartesian`]. Returns `alpha` in `[0, π]` and
/// `beta` in `(-π, π]`; the origin maps to all zeros.
pub fn cartesian_to_spherical(p: DVec3) -> ((f64, f64), f64) {
    let radius = p.length();
    if radius == 0.0 {
        return ((0.0, 0.0), 0.0);
    }
    let alpha = (p.z / radius).clamp(-1.0, 1.0).acos();
    let beta = p.y.atan2(p.x);
    ((alpha, beta), radius)
}
