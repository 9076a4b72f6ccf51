use deps::*;

use rand::prelude::*;

use super::DefenseError;
use crate::math::{real::consts::TAU, *};

/// Below this length a seam point is considered degenerate and can't be normalized.
const DEGENERATE_LENGTH: TReal = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(crate = "serde")]
pub enum FormationKind {
    /// Closed baseball-seam curve around the pivot.
    Seam,
    /// Random points on the sphere around the pivot.
    Cloud,
}

impl FormationKind {
    pub const ALL: [FormationKind; 2] = [FormationKind::Seam, FormationKind::Cloud];

    pub fn label(self) -> &'static str {
        match self {
            FormationKind::Seam => "seam",
            FormationKind::Cloud => "cloud",
        }
    }
}

/// Unit direction for the `kind` formation at step `t` of `n`.
///
/// Cloud samples come from the thread rng; use [`sample_with`] to control them.
pub fn sample(
    kind: FormationKind,
    t: TReal,
    n: i32,
    shape_param: TReal,
) -> Result<TVec3, DefenseError> {
    sample_with(&mut rand::thread_rng(), kind, t, n, shape_param)
}

pub fn sample_with<R: Rng + ?Sized>(
    rng: &mut R,
    kind: FormationKind,
    t: TReal,
    n: i32,
    shape_param: TReal,
) -> Result<TVec3, DefenseError> {
    if n <= 0 {
        return Err(DefenseError::InvalidArgument(
            "formation count must be positive",
        ));
    }
    match kind {
        FormationKind::Seam => seam(t, n, shape_param),
        FormationKind::Cloud => Ok(cloud(rng)),
    }
}

/// Point on the baseball-seam curve, periodic in `t` with period `n`.
///
/// `tightness` pulls the lobes of the curve in (positive) or out (negative).
pub fn seam(t: TReal, n: i32, tightness: TReal) -> Result<TVec3, DefenseError> {
    if n <= 0 {
        return Err(DefenseError::InvalidArgument(
            "formation count must be positive",
        ));
    }
    if !t.is_finite() || !tightness.is_finite() {
        return Err(DefenseError::InvalidArgument(
            "seam step and tightness must be finite",
        ));
    }
    // reduce to one period first so large steps keep their precision
    let theta = (t / n as TReal).rem_euclid(1.) * TAU;
    let point = TVec3::new(
        theta.cos() - tightness * (3. * theta).cos(),
        theta.sin() + tightness * (3. * theta).sin(),
        (2. * theta).cos(),
    );
    let length = point.length();
    if length < DEGENERATE_LENGTH {
        return Err(DefenseError::InvalidArgument(
            "seam curve degenerates at this step",
        ));
    }
    Ok(point / length)
}

/// Direction uniformly distributed over the whole sphere.
pub fn cloud<R: Rng + ?Sized>(rng: &mut R) -> TVec3 {
    loop {
        let candidate = TVec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        // rejection inside the unit ball keeps the corners of the cube from biasing directions
        let length_sq = candidate.length_squared();
        if length_sq > 1e-6 && length_sq <= 1. {
            return candidate / length_sq.sqrt();
        }
    }
}
