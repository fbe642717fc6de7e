// Purpose: control surface plumbing between the control context and the
// audio callback. The engine's setters are plain field writes with no
// synchronization; this layer makes each control pass effectively atomic by
// draining a lock-free message queue only between audio blocks.

pub mod chord_synth;
pub mod message;

pub use chord_synth::ChordSynth;
pub use message::{ChordMessage, MessageReceiver};
