use deps::*;

use bevy::prelude::*;

pub mod real {
    pub use std::f32::*;
}

pub type TReal = f32;
pub type TVec3 = Vec3;
pub type TQuat = Quat;
use real::consts::TAU;

/// Tolerance used when checking that a direction is unit length.
pub const UNIT_TOLERANCE: TReal = 1e-6;

#[inline]
pub fn is_unit(v: TVec3) -> bool {
    (v.length() - 1.).abs() <= UNIT_TOLERANCE
}

#[inline]
pub fn smallest_positve_equivalent_angle_rad(mut angle: TReal) -> TReal {
    angle %= TAU;
    if angle < 0. {
        angle + TAU
    } else {
        angle
    }
}

/// Offset on the circle of `radius` in the XZ plane at `angle` radians.
#[inline]
pub fn circle_offset_xz(angle: TReal, radius: TReal) -> TVec3 {
    TVec3::new(radius * angle.cos(), 0., radius * angle.sin())
}

#[test]
fn smallest_positve_equivalent_angle_rad_test() {
    use real::consts::PI;
    let d90 = PI * 0.5;
    assert!(smallest_positve_equivalent_angle_rad(0.) - 0. < TReal::EPSILON);
    assert!(smallest_positve_equivalent_angle_rad(TAU) - 0. < TReal::EPSILON);
    assert!(smallest_positve_equivalent_angle_rad(PI) - PI < TReal::EPSILON);
    assert!(smallest_positve_equivalent_angle_rad(TAU - d90) - (PI + d90) < TReal::EPSILON);
    assert!(smallest_positve_equivalent_angle_rad(TAU + d90) - d90 <= TReal::EPSILON);
    assert!(smallest_positve_equivalent_angle_rad(-0.2) - (TAU - 0.2) <= TReal::EPSILON);
}

#[test]
fn circle_offset_xz_test() {
    let off = circle_offset_xz(real::consts::PI * 0.5, 200.);
    assert!(off.x.abs() < 1e-3);
    assert!(off.y == 0.);
    assert!((off.z - 200.).abs() < 1e-3);
    assert!((circle_offset_xz(1.234, 200.).length() - 200.).abs() < 1e-3);
}
