use crate::dsp::chords::{Chords, ModulationType};
use crate::synth::message::{ChordMessage, MessageReceiver};
use crate::StereoFrame;

/// Hosts a `Chords` engine behind a message queue.
///
/// `render_block` drains all pending control messages first, then processes
/// the block, so every setter lands between blocks and a control pass is
/// never torn across the audio-rate loop.
pub struct ChordSynth<R: MessageReceiver> {
    engine: Chords,
    mode: ModulationType,
    receiver: R,
}

impl<R: MessageReceiver> ChordSynth<R> {
    pub fn new(sample_rate: f32, receiver: R) -> Self {
        Self {
            engine: Chords::new(sample_rate),
            mode: ModulationType::Fm,
            receiver,
        }
    }

    pub fn mode(&self) -> ModulationType {
        self.mode
    }

    pub fn engine(&self) -> &Chords {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Chords {
        &mut self.engine
    }

    pub fn render_block(&mut self, frames: &mut [StereoFrame]) {
        while let Some(message) = self.receiver.pop() {
            self.apply(message);
        }
        self.engine.process(self.mode, frames);
    }

    fn apply(&mut self, message: ChordMessage) {
        match message {
            ChordMessage::Frequencies { note, spread, fine, distrib } => {
                self.engine.set_frequencies(note, spread, fine, distrib)
            }
            ChordMessage::Chord { note, spread, fine, chord } => {
                self.engine.set_chords(note, spread, fine, chord)
            }
            ChordMessage::Rationals { note, spread, fine, max_denominator } => {
                self.engine.set_rationals(note, spread, fine, max_denominator)
            }
            ChordMessage::Harmonics { note, spread, fine, detune } => {
                self.engine.set_harmonics(note, spread, fine, detune)
            }
            ChordMessage::Structure(value) => self.engine.set_structure(value),
            ChordMessage::SelfFeedback(gain) => self.engine.set_self_feedback(gain),
            ChordMessage::ModulationIndex(value) => self.engine.set_modulation_index(value),
            ChordMessage::Freeze(freeze) => self.engine.set_freeze(freeze),
            ChordMessage::Bitcrush(levels) => self.engine.set_bitcrush(levels),
            ChordMessage::Softclip(drive) => self.engine.set_softclip(drive),
            ChordMessage::Decimate(steps) => self.engine.set_decimate(steps),
            ChordMessage::Detune(value) => self.engine.set_detune(value),
            ChordMessage::Mode(mode) => self.mode = mode,
            ChordMessage::Reset => self.engine.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    impl MessageReceiver for VecDeque<ChordMessage> {
        fn pop(&mut self) -> Option<ChordMessage> {
            self.pop_front()
        }
    }

    #[test]
    fn messages_apply_before_the_block_renders() {
        let mut queue = VecDeque::new();
        queue.push_back(ChordMessage::Frequencies {
            note: 69.0,
            spread: 4.0,
            fine: 0.0,
            distrib: 0.5,
        });
        queue.push_back(ChordMessage::Mode(ModulationType::Am));
        queue.push_back(ChordMessage::Structure(0.5));

        let mut synth = ChordSynth::new(32_000.0, queue);
        let mut block = [StereoFrame::default(); 32];
        synth.render_block(&mut block);

        assert_eq!(synth.mode(), ModulationType::Am);
        assert!(synth.engine().phase_increments().iter().any(|&i| i != 0.0));
        assert!(block.iter().any(|f| f.l != 0.0 || f.r != 0.0));
    }

    #[test]
    fn reset_message_reaches_the_engine() {
        let mut queue = VecDeque::new();
        queue.push_back(ChordMessage::Frequencies {
            note: 60.0,
            spread: 3.0,
            fine: 0.0,
            distrib: 1.0,
        });
        let mut synth = ChordSynth::new(32_000.0, queue);
        let mut block = [StereoFrame::default(); 64];
        synth.render_block(&mut block);

        synth.receiver.push_back(ChordMessage::Reset);
        let increments = *synth.engine().phase_increments();
        let mut next = [StereoFrame::default(); 1];
        synth.render_block(&mut next);
        // Tuning survives a reset.
        assert_eq!(increments, *synth.engine().phase_increments());
    }
}
