pub mod dsp;
pub mod synth; // Control surface plumbing (messages, block host)

pub const MAX_BLOCK_SIZE: usize = 2048;

/// One stereo sample pair, the unit of the in-place block contract.
///
/// The engine rewrites a `&mut [StereoFrame]` block per call: the incoming
/// values act as external phase-modulation sources, the outgoing values are
/// the rendered voices.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoFrame {
    pub l: f32,
    pub r: f32,
}
