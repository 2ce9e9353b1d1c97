#![forbid(unsafe_code)]

//! Easing curves for overlay tweens.
//!
//! Every curve maps a normalized time `t` in `[0.0, 1.0]` to a normalized
//! progress value. Inputs outside that range are clamped first, so a curve
//! never extrapolates past its endpoints.

/// Easing curve applied to a tween's normalized time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// Constant speed.
    Linear,
    /// Quadratic acceleration from rest.
    InQuad,
    /// Quadratic deceleration to rest. Used by every overlay animation.
    #[default]
    OutQuad,
    /// Quadratic S-curve.
    InOutQuad,
    /// Cubic deceleration to rest.
    OutCubic,
}

impl Easing {
    /// Apply the curve to a progress value.
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => t * (2.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let inv = -2.0 * t + 2.0;
                    1.0 - inv * inv / 2.0
                }
            }
            Self::OutCubic => {
                let inv = 1.0 - t;
                1.0 - inv * inv * inv
            }
        }
    }

    /// Interpolate between `from` and `to` at normalized time `t`.
    #[inline]
    #[must_use]
    pub fn lerp(self, from: f32, to: f32, t: f32) -> f32 {
        from + (to - from) * self.apply(t)
    }
}
