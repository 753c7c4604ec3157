use std::f32::consts::PI;

pub const TAU: f32 = 2.0 * PI;

/// Wraps an angle in radians into `(-π, π]`.
///
/// Both bounds wrap by a full turn. Values already in range are returned
/// unchanged, so the function is idempotent. Non-finite input yields `0.0`.
pub fn normalize_angle(theta: f32) -> f32 {
    if !theta.is_finite() {
        return 0.0;
    }
    // `%` on floats is exact and keeps the sign of `theta`, so `a` lies in
    // (-TAU, TAU); the single correction below is exact as well.
    let a = theta % TAU;
    if a > PI {
        a - TAU
    } else if a <= -PI {
        a + TAU
    } else {
        a
    }
}

/// Signed shortest rotation taking `to` onto `from`, in `(-π, π]`.
pub fn angular_difference(from: f32, to: f32) -> f32 {
    normalize_angle(from - to)
}
