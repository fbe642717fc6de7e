//! Low-level DSP primitives behind the chord engine.
//!
//! These components are allocation-free and realtime-safe. Every function is
//! total over its documented input domain: out-of-domain arguments are caller
//! preconditions (checked with `debug_assert!` only), never runtime errors.
//! The audio path has no failure branch to take.

/// The six-voice cross-modulating oscillator bank.
pub mod chords;
/// Fixed lookup tables and the shared fractional-index interpolation primitive.
pub mod lut;
/// Nearest-value quantization and bounded rational approximation.
pub mod rational;
/// Lo-fi shaping: soft saturation, amplitude/phase quantization, smoothing.
pub mod shape;

pub use chords::{Chords, ModulationType};
