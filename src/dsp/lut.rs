/*
Lookup-Table Math
=================

Every transcendental the engine needs at audio or control rate goes through a
fixed table plus one shared interpolation primitive:

  interpolate(table, index, size)
    index in [0, 1) is scaled by `size`, split into integer and fractional
    parts, and the two bracketing entries are blended linearly.

The tables:

  SINE           one period of sin() in 1024 entries. A second read at an
                 offset of 256 entries (a quarter period) gives cos() from
                 the same table, so the per-voice loop pays for one table.

  EXP            e^x over [-20, 20] in 256 entries. `lut_exp` range-reduces
                 any finite argument into that window by repeated +-20 steps
                 and rescales by e^20 per step, so very large modulation
                 products never leave the table's domain.

  LOG            ln(x) over [1, 10] in 16 entries. `lut_log` remaps the
                 argument with (x - 1) / 9; keeping x inside [1, 10] is the
                 caller's job (documented precondition, debug-checked only).

  RAISED_COSINE  (1 - cos(pi * t)) / 2 in 256 entries. Used by
                 `interpolate_sine` to warp the fractional part before the
                 blend, giving zero-slope joins at table breakpoints. This is
                 what makes a swept "structure" control glide through discrete
                 coupling topologies without audible steps.

Each table carries guard entries past its nominal size so the `integral + 1`
read of the interpolator never indexes out of bounds, even at index == 1.0.
Tables are computed once on first use and never mutated (LazyLock statics).
*/

use std::sync::LazyLock;

pub const SINE_TABLE_SIZE: usize = 1024;
/// Offset between the sine and cosine reads, in table entries.
const QUARTER_PERIOD: usize = SINE_TABLE_SIZE / 4;
pub const EXP_TABLE_SIZE: usize = 256;
pub const LOG_TABLE_SIZE: usize = 16;
pub const RAISED_COSINE_TABLE_SIZE: usize = 256;

/// e^20, the rescaling factor for one range-reduction step in `lut_exp`.
const EXP_STEP_SCALE: f32 = 485_165_195.4;

static SINE: LazyLock<[f32; SINE_TABLE_SIZE + QUARTER_PERIOD + 1]> = LazyLock::new(|| {
    let mut table = [0.0; SINE_TABLE_SIZE + QUARTER_PERIOD + 1];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = (std::f32::consts::TAU * i as f32 / SINE_TABLE_SIZE as f32).sin();
    }
    table
});

static EXP: LazyLock<[f32; EXP_TABLE_SIZE + 2]> = LazyLock::new(|| {
    let mut table = [0.0; EXP_TABLE_SIZE + 2];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = (-20.0 + 40.0 * i as f32 / EXP_TABLE_SIZE as f32).exp();
    }
    table
});

static LOG: LazyLock<[f32; LOG_TABLE_SIZE + 2]> = LazyLock::new(|| {
    let mut table = [0.0; LOG_TABLE_SIZE + 2];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = (1.0 + 9.0 * i as f32 / LOG_TABLE_SIZE as f32).ln();
    }
    table
});

static RAISED_COSINE: LazyLock<[f32; RAISED_COSINE_TABLE_SIZE + 2]> = LazyLock::new(|| {
    let mut table = [0.0; RAISED_COSINE_TABLE_SIZE + 2];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry =
            (1.0 - (std::f32::consts::PI * i as f32 / RAISED_COSINE_TABLE_SIZE as f32).cos()) / 2.0;
    }
    table
});

/// Linear interpolation at a fractional table index.
///
/// `index` must be in [0, 1]; the table must have at least `size + 2` entries
/// so the bracketing read stays in bounds.
#[inline]
pub fn interpolate(table: &[f32], index: f32, size: f32) -> f32 {
    debug_assert!(index >= 0.0, "negative table index: {index}");
    let index = index * size;
    let integral = index as usize;
    let fractional = index - integral as f32;
    let a = table[integral];
    let b = table[integral + 1];
    a + (b - a) * fractional
}

/// sin(2 * pi * phase) for phase in [0, 1).
#[inline]
pub fn sine(phase: f32) -> f32 {
    interpolate(&*SINE, phase, SINE_TABLE_SIZE as f32)
}

/// cos(2 * pi * phase) for phase in [0, 1): the same table read a quarter
/// period ahead.
#[inline]
pub fn cosine(phase: f32) -> f32 {
    interpolate(&SINE[QUARTER_PERIOD..], phase, SINE_TABLE_SIZE as f32)
}

/// e^x for any finite x.
///
/// The argument is reduced into the table window [-20, 20] by repeated +-20
/// steps, each undone by one multiply/divide by e^20 after the lookup. The
/// loop counts are bounded by construction (|x| / 20 steps), so the call is
/// unconditionally bounded even for huge modulation-index products.
pub fn lut_exp(x: f32) -> f32 {
    debug_assert!(x.is_finite(), "lut_exp argument must be finite: {x}");
    let mut x = x;
    let mut up = 0u32;
    let mut down = 0u32;
    while x >= 20.0 {
        up += 1;
        x -= 20.0;
    }
    while x <= -20.0 {
        down += 1;
        x += 20.0;
    }
    let mut y = interpolate(&*EXP, (x + 20.0) / 40.0, EXP_TABLE_SIZE as f32);
    for _ in 0..up {
        y *= EXP_STEP_SCALE;
    }
    for _ in 0..down {
        y /= EXP_STEP_SCALE;
    }
    y
}

/// ln(x) for x in [1, 10].
///
/// Precondition: callers keep x inside the table domain. There is no runtime
/// range check, matching the rest of the audio path.
#[inline]
pub fn lut_log(x: f32) -> f32 {
    debug_assert!((1.0..=10.0).contains(&x), "lut_log argument out of [1, 10]: {x}");
    interpolate(&*LOG, (x - 1.0) / 9.0, LOG_TABLE_SIZE as f32)
}

/// Structural interpolation: like `interpolate`, but the fractional part is
/// warped through the raised-cosine table before the blend.
///
/// The warp has zero slope at both ends of each segment, so sweeping `index`
/// across breakpoints of `table` is continuous and smooth rather than
/// piecewise linear.
#[inline]
pub fn interpolate_sine(table: &[f32], index: f32, size: f32) -> f32 {
    debug_assert!(index >= 0.0, "negative table index: {index}");
    let index = index * size;
    let integral = index as usize;
    let fractional = index - integral as f32;
    let a = table[integral];
    let b = table[integral + 1];
    let warped = interpolate(
        &*RAISED_COSINE,
        fractional,
        RAISED_COSINE_TABLE_SIZE as f32,
    );
    a + (b - a) * warped
}
