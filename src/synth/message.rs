#[cfg(feature = "rtrb")]
use rtrb::Consumer;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::chords::ModulationType;

/// One control-surface write, queued from the control context and applied
/// between audio blocks. One variant per engine setter plus `Reset`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone)]
pub enum ChordMessage {
    Frequencies { note: f32, spread: f32, fine: f32, distrib: f32 },
    Chord { note: f32, spread: f32, fine: f32, chord: f32 },
    Rationals { note: f32, spread: f32, fine: f32, max_denominator: u32 },
    Harmonics { note: f32, spread: f32, fine: f32, detune: f32 },
    Structure(f32),
    SelfFeedback(f32),
    ModulationIndex(f32),
    Freeze(bool),
    Bitcrush(f32),
    Softclip(f32),
    Decimate(f32),
    Detune(f32),
    Mode(ModulationType),
    Reset,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<ChordMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<ChordMessage> {
    fn pop(&mut self) -> Option<ChordMessage> {
        Consumer::pop(self).ok()
    }
}

/// No-op receiver for hosts that drive the engine's setters directly.
impl MessageReceiver for () {
    fn pop(&mut self) -> Option<ChordMessage> {
        None
    }
}
