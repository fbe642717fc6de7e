//! Lo-fi shaping primitives: soft saturation, grid quantization, smoothing.
//!
//! All of these are single-sample helpers inlined into the per-sample voice
//! loop. They are branch-free and total over their documented domains.

/// Cubic soft saturator, x * (27 + x^2) / (27 + 9 * x^2).
///
/// Close to the identity for |x| < 1, compresses gently above. Only valid as
/// a saturator for moderate drive; the engine always uses it through
/// `soft_clip`, which normalizes it.
#[inline]
pub fn soft_limit(x: f32) -> f32 {
    x * (27.0 + x * x) / (27.0 + 9.0 * x * x)
}

/// Normalized soft clipper: `soft_limit(x * drive) / soft_limit(drive)`.
///
/// Symmetric, and exactly transparent at the drive's own level, so for
/// |x| <= 1 the output stays in [-1, 1] and unity drive barely colors the
/// signal. `drive` must be positive; the engine's minimum is 1e-4, where the
/// clipper is transparent to within float precision.
#[inline]
pub fn soft_clip(x: f32, drive: f32) -> f32 {
    debug_assert!(drive > 0.0);
    soft_limit(x * drive) / soft_limit(drive)
}

/// Truncate `x` to a grid of `steps` levels.
///
/// Used both for bitcrush (amplitude grid) and decimate (phase grid, which
/// emulates sample-rate reduction when applied ahead of the sine lookup).
/// Truncation is toward zero, like the integer cast it replaces. At the
/// default 65535 steps the grid is inaudible.
#[inline]
pub fn quantize(x: f32, steps: f32) -> f32 {
    debug_assert!(steps >= 1.0);
    (x * steps) as i32 as f32 / steps
}

/// One-pole low-pass update: `state += coefficient * (input - state)`.
#[inline]
pub fn one_pole(state: &mut f32, input: f32, coefficient: f32) {
    *state += coefficient * (input - *state);
}
