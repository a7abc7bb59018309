//! Small helpers over `glam::DVec2` shared by the physics modules.

use std::f64::consts::PI;

use glam::DVec2;

/// Tolerance used by the change-tracking setters.
pub const APPROX_EPSILON: f64 = 1e-6;

/// Sign of `x` as -1, 0 or +1.
///
/// Unlike `f64::signum`, zero maps to zero.
#[inline]
pub fn fsign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Sign of `x` where zero (and negative zero) counts as positive.
#[inline]
pub fn fsign_pos(x: f64) -> f64 {
    if x >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Wrap an angle into (-PI, PI].
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Extra vector queries used by the kinematic code.
pub trait Vec2Ext {
    /// Per-component comparison within [`APPROX_EPSILON`].
    fn approx_eq(self, other: Self) -> bool;
    /// Unsigned area of the box spanned by the two components.
    fn area(self) -> f64;
    /// Both components are exactly zero.
    fn is_zero(self) -> bool;
}

impl Vec2Ext for DVec2 {
    #[inline]
    fn approx_eq(self, other: Self) -> bool {
        self.abs_diff_eq(other, APPROX_EPSILON)
    }

    #[inline]
    fn area(self) -> f64 {
        (self.x * self.y).abs()
    }

    #[inline]
    fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}
