/*
Chords: six-voice cross-modulating oscillator bank
==================================================

Six phase-accumulated sine voices, tuned by one of four frequency mappers and
coupled through a structure-controlled modulation matrix, with a lo-fi
shaping chain (phase decimation, bitcrush, normalized soft clip) on every
voice.

Vocabulary
----------

  logical voice    index in ascending-frequency order, as produced by the
                   frequency mappers (0 = lowest).

  physical voice   slot in the coupling chain, as iterated by the per-sample
                   loop. `VOICE_PERMUTATION` maps logical -> physical so the
                   audible cross-modulation pattern does not strictly follow
                   pitch order.

  structure        continuous control in [0, 1] selecting which voices couple
                   to which. Interpolated through a raised-cosine kernel, so
                   sweeping it glides between discrete coupling topologies.

  freeze           when set, only odd logical voices accept new tuning
                   writes; even ones hold their last increment, freezing half
                   the chord while the rest moves.

Two coupling modes, selected per block (never per sample):

  FM   voice i's shaped output, scaled by its matrix coefficient and the
       global modulation index, is added into voice i+1's phase argument.
       The stereo output is a (1 - coefficient)-weighted sum of all voices,
       normalized by the total weight plus a fixed 2.0 headroom term.

  AM   every earlier voice multiplicatively gates every later voice through
       a triangular pair matrix (15 coefficients for 6 voices). The gate is
       cauchy(out * index^2 * pair_coefficient) with cauchy(z) = 1/(1+z^2),
       bounded in (0, 1], so one voice can never fully silence another.
       Voices route to the left or right channel alternately by parity.

Control-rate methods (mappers and setters) are plain field writes; the audio
loop only reads them plus its own feedback history. Callers keep the two
contexts un-torn by invoking setters between blocks, e.g. through the
`synth::ChordSynth` message drain.

The per-sample loop allocates nothing, takes no locks, and has no error
path. Out-of-range control values are the caller's responsibility (see each
setter's documented range).
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::lut;
use crate::dsp::rational::{closest_rational, nearest_in_table};
use crate::dsp::shape::{one_pole, quantize, soft_clip};
use crate::StereoFrame;

pub const NUM_VOICES: usize = 6;
/// Unordered voice pairs, the size of the AM coupling matrix.
pub const NUM_PAIRS: usize = NUM_VOICES * (NUM_VOICES - 1) / 2;
const NUM_STRUCTURES: usize = 8;

/// Pitches are expressed in semitones around MIDI note 69 (A above middle C);
/// its phase increment is 440 / sample_rate.
const CENTER_NOTE: f32 = 69.0;
/// Added to every phase argument before wrapping so the argument stays
/// positive for the documented modulation ranges.
const PHASE_BIAS: f32 = 10.0;
const FEEDBACK_SMOOTHING: f32 = 0.1;
/// Fixed term in the output gain normalization.
const HEADROOM: f32 = 2.0;
/// Chord updates farther than this from the center note are dropped,
/// keeping increments away from overflow and aliasing territory.
const MAX_SEMITONE_OFFSET: f32 = 64.0;

/// Logical (tuning) index -> physical (coupling chain) slot. Constant for
/// the engine's lifetime; decorrelates pitch order from modulation order.
const VOICE_PERMUTATION: [usize; NUM_VOICES] = [0, 3, 1, 4, 2, 5];

/// Twelve chord templates, in semitone degrees within one octave, ascending.
/// The last row quantizes everything to octaves of the root.
const CHORD_TABLE: [[f32; NUM_VOICES]; 12] = [
    [0.0, 0.0, 5.0, 5.0, 12.0, 12.0],
    [0.0, 0.0, 3.0, 3.0, 10.0, 12.0],
    [0.0, 3.0, 5.0, 5.0, 12.0, 12.0],
    [0.0, 2.0, 3.0, 7.0, 10.0, 12.0],
    [0.0, 1.0, 3.0, 5.0, 11.0, 12.0],
    [0.0, 0.0, 4.0, 7.0, 11.0, 12.0],
    [0.0, 0.0, 3.0, 6.0, 9.0, 12.0],
    [0.0, 1.0, 3.0, 5.0, 8.0, 12.0],
    [0.0, 4.0, 5.0, 8.0, 11.0, 12.0],
    [0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
    [0.0, 2.0, 4.0, 6.0, 8.0, 10.0],
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
];

/// FM coupling breakpoints per physical voice, indexed by structure. Each row
/// carries a trailing guard column for the interpolator.
const FM_MODULATION_TABLE: [[f32; NUM_STRUCTURES + 1]; NUM_VOICES] = [
    [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
    [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0],
    [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
];

/// AM pair-coupling breakpoints, one row per unordered pair in `pair_index`
/// order, with the same trailing guard column.
const AM_MODULATION_TABLE: [[f32; NUM_STRUCTURES + 1]; NUM_PAIRS] = [
    [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0], // (0,1)
    [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0], // (0,2)
    [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0], // (0,3)
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0], // (0,4)
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0], // (0,5)
    [0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0], // (1,2)
    [0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0], // (1,3)
    [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0], // (1,4)
    [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0], // (1,5)
    [0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0], // (2,3)
    [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0], // (2,4)
    [0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0], // (2,5)
    [0.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0], // (3,4)
    [0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0], // (3,5)
    [0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0], // (4,5)
];

/// Pair index consulted for each physical voice's AM output gain. Hand-tuned
/// with the coupling constant below; the audible character depends on these
/// exact values.
const GAIN_PAIR_INDEXES: [usize; NUM_VOICES] = [0, 5, 9, 12, 14, 4];

/// AM coupling index scale, squared before use. Hand-tuned, see above.
const AM_INDEX_SCALE: f32 = 5.0;

/// Coupling mode, selected once per block. The per-sample loops are
/// mode-specialized so no mode branch runs at audio rate.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulationType {
    Fm,
    Am,
}

/// Row index of an unordered pair (i, j), i < j, in the triangular AM matrix.
#[inline]
fn pair_index(i: usize, j: usize) -> usize {
    debug_assert!(i < j && j < NUM_VOICES);
    i * (2 * NUM_VOICES - i - 1) / 2 + (j - i - 1)
}

#[inline]
fn cauchy(x: f32) -> f32 {
    1.0 / (1.0 + x * x)
}

#[inline]
fn semitones_to_ratio(semitones: f32) -> f32 {
    (semitones / 12.0).exp2()
}

/// Last raised output sample and its one-pole-smoothed version, per channel.
/// The smoothed values feed the next sample's phase bias (self feedback).
#[derive(Debug, Clone, Copy, Default)]
struct FeedbackHistory {
    sin: f32,
    sin_smooth: f32,
    cos: f32,
    cos_smooth: f32,
}

pub struct Chords {
    /// Phase increment of the center note, 440 / sample_rate.
    a3: f32,

    // Shaping parameters, shared across voices.
    freeze: bool,
    self_feedback: f32,
    modulation_index: f32,
    bitcrush: f32,
    decimate: f32,
    softclip: f32,
    detune: f32,

    // Per-voice runtime state, physical order.
    phase: [f32; NUM_VOICES],
    phase_increment: [f32; NUM_VOICES],
    feedback: [FeedbackHistory; NUM_VOICES],

    // Coupling coefficients derived from structure, all in [0, 1].
    fm_matrix: [f32; NUM_VOICES],
    am_matrix: [f32; NUM_PAIRS],
}

impl Chords {
    pub fn new(sample_rate: f32) -> Self {
        debug_assert!(sample_rate > 0.0);
        let mut chords = Self {
            a3: 440.0 / sample_rate,
            freeze: false,
            self_feedback: 0.0,
            modulation_index: 0.0,
            bitcrush: 0.0,
            decimate: 0.0,
            softclip: 0.0,
            detune: 0.0,
            phase: [0.0; NUM_VOICES],
            phase_increment: [0.0; NUM_VOICES],
            feedback: [FeedbackHistory::default(); NUM_VOICES],
            fm_matrix: [0.0; NUM_VOICES],
            am_matrix: [0.0; NUM_PAIRS],
        };
        chords.init();
        chords
    }

    /// Zero all phase and feedback state and restore default shaping
    /// parameters (quantizers wide open, clipper transparent).
    pub fn init(&mut self) {
        self.phase = [0.0; NUM_VOICES];
        self.feedback = [FeedbackHistory::default(); NUM_VOICES];
        self.bitcrush = 65535.0;
        self.decimate = 65535.0;
        self.softclip = 1e-4;
    }

    /// Zero phase only: re-trigger without discarding tuning, feedback
    /// history or shaping parameters.
    pub fn reset(&mut self) {
        self.phase = [0.0; NUM_VOICES];
    }

    /// Rewrite `frames` in place: input samples act as phase modulation,
    /// output is the coupled voice sum. Mode is matched once per block.
    pub fn process(&mut self, modulation_type: ModulationType, frames: &mut [StereoFrame]) {
        match modulation_type {
            ModulationType::Fm => self.process_fm(frames),
            ModulationType::Am => self.process_am(frames),
        }
    }

    fn process_fm(&mut self, frames: &mut [StereoFrame]) {
        for frame in frames.iter_mut() {
            let in_l = frame.l;
            let in_r = frame.r;
            let mut out_l = 0.0;
            let mut out_r = 0.0;
            let mut total_gain = 0.0;

            // Additive accumulator, cleared every sample; voice 0 receives
            // no cross-modulation.
            let mut modulation = [[0.0f32; 2]; NUM_VOICES];

            for i in 0..NUM_VOICES {
                let phase_l = (self.phase[i]
                    + in_l
                    + self.feedback[i].sin_smooth * self.self_feedback
                    + self.self_feedback
                    + modulation[i][0]
                    + PHASE_BIAS)
                    .fract();
                let phase_r = (self.phase[i]
                    + in_r
                    + self.feedback[i].cos_smooth * self.self_feedback
                    + self.self_feedback
                    + modulation[i][1]
                    + PHASE_BIAS)
                    .fract();

                let phase_l = quantize(phase_l, self.decimate);
                let phase_r = quantize(phase_r, self.decimate);

                let mut sin = lut::sine(phase_l);
                let mut cos = lut::cosine(phase_r);

                sin = quantize(sin, self.bitcrush);
                cos = quantize(cos, self.bitcrush);

                sin = soft_clip(sin, self.softclip);
                cos = soft_clip(cos, self.softclip);

                self.feedback[i].sin = sin;
                one_pole(&mut self.feedback[i].sin_smooth, sin, FEEDBACK_SMOOTHING);
                self.feedback[i].cos = cos;
                one_pole(&mut self.feedback[i].cos_smooth, cos, FEEDBACK_SMOOTHING);

                if i + 1 < NUM_VOICES {
                    modulation[i + 1][0] = sin * self.fm_matrix[i] * self.modulation_index;
                    modulation[i + 1][1] = cos * self.fm_matrix[i] * self.modulation_index;
                }

                let gain = 1.0 - self.fm_matrix[i];
                total_gain += gain;
                out_l += sin * gain;
                out_r += cos * gain;

                self.advance_phase(i);
            }

            total_gain += HEADROOM;
            frame.l = out_l / total_gain;
            frame.r = out_r / total_gain;
        }
    }

    fn process_am(&mut self, frames: &mut [StereoFrame]) {
        let index = self.modulation_index * AM_INDEX_SCALE;
        let index_squared = index * index;

        for frame in frames.iter_mut() {
            let in_l = frame.l;
            let in_r = frame.r;
            let mut out_l = 0.0;
            let mut out_r = 0.0;
            let mut gain_l = 0.0;
            let mut gain_r = 0.0;

            // Multiplicative accumulator, reset to unity every sample.
            let mut modulation = [[1.0f32; 2]; NUM_VOICES];

            for i in 0..NUM_VOICES {
                let phase_l = (self.phase[i]
                    + in_l
                    + self.feedback[i].sin_smooth * self.self_feedback
                    + self.self_feedback
                    + PHASE_BIAS)
                    .fract();
                let phase_r = (self.phase[i]
                    + in_r
                    + self.feedback[i].cos_smooth * self.self_feedback
                    + self.self_feedback
                    + PHASE_BIAS)
                    .fract();

                let phase_l = quantize(phase_l, self.decimate);
                let phase_r = quantize(phase_r, self.decimate);

                let mut sin = lut::sine(phase_l);
                let mut cos = lut::cosine(phase_r);

                sin = quantize(sin, self.bitcrush);
                cos = quantize(cos, self.bitcrush);

                sin = soft_clip(sin, self.softclip);
                cos = soft_clip(cos, self.softclip);

                // Gate by everything accumulated from earlier voices.
                sin *= modulation[i][0];
                cos *= modulation[i][1];

                self.feedback[i].sin = sin;
                one_pole(&mut self.feedback[i].sin_smooth, sin, FEEDBACK_SMOOTHING);
                self.feedback[i].cos = cos;
                one_pole(&mut self.feedback[i].cos_smooth, cos, FEEDBACK_SMOOTHING);

                for j in (i + 1)..NUM_VOICES {
                    let depth = index_squared * self.am_matrix[pair_index(i, j)];
                    modulation[j][0] *= cauchy(sin * depth);
                    modulation[j][1] *= cauchy(cos * depth);
                }

                let gain = 1.0 - self.am_matrix[GAIN_PAIR_INDEXES[i]];
                if i % 2 == 0 {
                    out_l += sin * gain;
                    gain_l += gain;
                } else {
                    out_r += cos * gain;
                    gain_r += gain;
                }

                self.advance_phase(i);
            }

            frame.l = out_l / (gain_l + HEADROOM);
            frame.r = out_r / (gain_r + HEADROOM);
        }
    }

    #[inline]
    fn advance_phase(&mut self, i: usize) {
        self.phase[i] += self.phase_increment[i];
        // Increments are signed; renormalize into [0, 1) either way.
        if self.phase[i] >= 1.0 {
            self.phase[i] -= 1.0;
        }
        if self.phase[i] < 0.0 {
            self.phase[i] += 1.0;
        }
    }

    /// Freeze guard: even logical voices hold their increment while frozen.
    #[inline]
    fn voice_frozen(&self, logical: usize) -> bool {
        self.freeze && logical % 2 == 0
    }

    /// Spread/distribution mapper: voices log-spaced around `note`, with the
    /// spacing curve shaped by `distrib` through exp(distrib * ln(i + 1)).
    ///
    /// `note` and `fine` in semitones (MIDI numbering), `spread` in semitones
    /// per voice, `distrib` roughly in [-3, 3].
    pub fn set_frequencies(&mut self, note: f32, spread: f32, fine: f32, distrib: f32) {
        let mut ratios = [0.0f32; NUM_VOICES];
        let mut n = 0.0;
        for (i, ratio) in ratios.iter_mut().enumerate() {
            *ratio = n;
            n += lut::lut_exp(distrib * lut::lut_log((i + 1) as f32));
        }
        let span = ratios[NUM_VOICES - 1];

        let note = note + fine - CENTER_NOTE;
        for i in 0..NUM_VOICES {
            if self.voice_frozen(i) {
                continue;
            }
            let semitones = note + ratios[i] / span * spread * (NUM_VOICES - 1) as f32;
            self.phase_increment[VOICE_PERMUTATION[i]] = semitones_to_ratio(semitones) * self.a3;
        }
    }

    /// Chord mapper: quantize each voice's note to the template selected by
    /// `chord` in [0, 1), re-add the octave and a per-voice detune, and walk
    /// up by `spread` semitones per voice.
    ///
    /// Updates landing outside +-64 semitones of the center note are dropped,
    /// leaving the previous increment in place.
    pub fn set_chords(&mut self, note: f32, spread: f32, fine: f32, chord: f32) {
        let template = ((chord * 12.0) as usize).min(CHORD_TABLE.len() - 1);
        let mut note = note;

        for i in 0..NUM_VOICES {
            let octave = (note / 12.0) as i32 as f32 * 12.0;
            let degree = nearest_in_table(note - octave, &CHORD_TABLE[template]);
            let offset =
                degree + octave + fine - CENTER_NOTE + (i as f32 - 2.5) * self.detune;

            if offset > -MAX_SEMITONE_OFFSET
                && offset < MAX_SEMITONE_OFFSET
                && !self.voice_frozen(i)
            {
                self.phase_increment[VOICE_PERMUTATION[i]] =
                    semitones_to_ratio(offset) * self.a3;
            }
            note += spread;
        }
    }

    /// Rational mapper: stack voices by repeated multiplication by `spread`,
    /// snapping every ratio to the closest fraction with denominator at most
    /// `max_denominator`, relative to a fundamental placed by `fine`.
    ///
    /// `note` scales the fundamental directly; the musical range is positive,
    /// and a non-positive value degrades to silent or inverted voices rather
    /// than misbehaving.
    pub fn set_rationals(&mut self, note: f32, spread: f32, fine: f32, max_denominator: u32) {
        let fundamental = semitones_to_ratio(45.0 + fine - CENTER_NOTE) * self.a3;
        let mut freq = fundamental * note;

        for i in (0..NUM_VOICES).rev() {
            let ratio = closest_rational(freq / fundamental, max_denominator);
            if !self.voice_frozen(i) {
                self.phase_increment[VOICE_PERMUTATION[i]] = ratio * fundamental;
            }
            freq *= spread;
        }
    }

    /// Harmonic mapper: integer harmonic number h = trunc(note + j) per
    /// voice, with j walking up by `spread` from 1. Positive h plays the
    /// h-th harmonic; h <= 0 plays a descending subharmonic series through
    /// -fundamental / (h - 2), where the offset keeps the divisor away from
    /// zero. `detune` widens voices by sqrt(1 + detune * j^2).
    pub fn set_harmonics(&mut self, note: f32, spread: f32, fine: f32, detune: f32) {
        let fundamental = semitones_to_ratio(45.0 + fine - CENTER_NOTE) * self.a3;
        let base = note as i32 as f32;

        let mut j = 1.0f32;
        for i in (0..NUM_VOICES).rev() {
            if !self.voice_frozen(i) {
                let harmonic = (base + j) as i32;
                let micro_detune = (1.0 + detune * j * j).sqrt();
                self.phase_increment[VOICE_PERMUTATION[i]] = if harmonic > 0 {
                    fundamental * harmonic as f32 * micro_detune
                } else {
                    -fundamental / (harmonic - 2) as f32 * micro_detune
                };
            }
            j += spread;
        }
    }

    /// Derive both coupling matrices from the structure control in [0, 1].
    pub fn set_structure(&mut self, structure: f32) {
        let structure = structure.clamp(0.0, 1.0);
        let resolution = (NUM_STRUCTURES - 1) as f32;
        for (coefficient, table) in self.fm_matrix.iter_mut().zip(&FM_MODULATION_TABLE) {
            *coefficient = lut::interpolate_sine(table, structure, resolution);
        }
        for (coefficient, table) in self.am_matrix.iter_mut().zip(&AM_MODULATION_TABLE) {
            *coefficient = lut::interpolate_sine(table, structure, resolution);
        }
    }

    /// Per-voice feedback gain. Documented range [0, 1].
    pub fn set_self_feedback(&mut self, feedback: f32) {
        self.self_feedback = feedback;
    }

    /// Overall cross-modulation depth. Documented range [0, 1].
    pub fn set_modulation_index(&mut self, index: f32) {
        self.modulation_index = index;
    }

    pub fn set_freeze(&mut self, freeze: bool) {
        self.freeze = freeze;
    }

    /// Amplitude quantization step count; 65535 is transparent.
    pub fn set_bitcrush(&mut self, levels: f32) {
        self.bitcrush = levels;
    }

    /// Soft clip drive; 1e-4 is transparent, useful up to about 16.
    pub fn set_softclip(&mut self, drive: f32) {
        self.softclip = drive;
    }

    /// Phase quantization step count; 65535 is transparent.
    pub fn set_decimate(&mut self, steps: f32) {
        self.decimate = steps;
    }

    /// Per-voice detune spread applied by the chord mapper, in semitones.
    pub fn set_detune(&mut self, detune: f32) {
        self.detune = detune;
    }

    /// Current per-voice phase increments, physical order, in cycles/sample.
    pub fn phase_increments(&self) -> &[f32; NUM_VOICES] {
        &self.phase_increment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 32_000.0;

    fn engine() -> Chords {
        Chords::new(SAMPLE_RATE)
    }

    #[test]
    fn pair_index_covers_the_triangle_exactly_once() {
        let mut seen = [false; NUM_PAIRS];
        for i in 0..NUM_VOICES {
            for j in (i + 1)..NUM_VOICES {
                let p = pair_index(i, j);
                assert!(!seen[p], "pair ({i}, {j}) collides at {p}");
                seen[p] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn permutation_is_a_bijection() {
        let mut seen = [false; NUM_VOICES];
        for &slot in &VOICE_PERMUTATION {
            assert!(!seen[slot]);
            seen[slot] = true;
        }
    }

    #[test]
    fn chord_templates_are_ascending() {
        for row in &CHORD_TABLE {
            for pair in row.windows(2) {
                assert!(pair[0] <= pair[1]);
            }
        }
    }

    #[test]
    fn structure_sweep_keeps_coefficients_in_range_and_continuous() {
        let mut chords = engine();
        let steps = 4000;
        let mut previous_fm = [0.0f32; NUM_VOICES];
        let mut previous_am = [0.0f32; NUM_PAIRS];

        for step in 0..=steps {
            let structure = step as f32 / steps as f32;
            chords.set_structure(structure);

            for (v, &coefficient) in chords.fm_matrix.iter().enumerate() {
                assert!(
                    (0.0..=1.0).contains(&coefficient),
                    "fm[{v}] = {coefficient} at structure {structure}"
                );
                if step > 0 {
                    let delta = (coefficient - previous_fm[v]).abs();
                    assert!(delta < 0.02, "fm[{v}] jumps by {delta} at {structure}");
                }
            }
            for (p, &coefficient) in chords.am_matrix.iter().enumerate() {
                assert!(
                    (0.0..=1.0).contains(&coefficient),
                    "am[{p}] = {coefficient} at structure {structure}"
                );
                if step > 0 {
                    let delta = (coefficient - previous_am[p]).abs();
                    assert!(delta < 0.02, "am[{p}] jumps by {delta} at {structure}");
                }
            }
            previous_fm = chords.fm_matrix;
            previous_am = chords.am_matrix;
        }
    }

    #[test]
    fn frequencies_mapper_orders_voices_by_pitch() {
        let mut chords = engine();
        chords.set_frequencies(69.0, 7.0, 0.0, 0.5);
        let increments = chords.phase_increments();
        for i in 0..NUM_VOICES - 1 {
            let low = increments[VOICE_PERMUTATION[i]];
            let high = increments[VOICE_PERMUTATION[i + 1]];
            assert!(low < high, "logical voice {i} not below voice {}", i + 1);
        }
        // Logical voice 0 sits on the root.
        let root = increments[VOICE_PERMUTATION[0]];
        assert!((root - 440.0 / SAMPLE_RATE).abs() < 1e-6);
    }

    #[test]
    fn freeze_holds_even_logical_voices_across_all_mappers() {
        let mappers: [fn(&mut Chords); 4] = [
            |c| c.set_frequencies(50.0, 3.0, 0.0, 1.0),
            |c| c.set_chords(50.0, 3.0, 0.0, 0.4),
            |c| c.set_rationals(2.0, 1.5, 0.0, 8),
            |c| c.set_harmonics(3.0, 1.0, 0.0, 0.01),
        ];

        for (m, mapper) in mappers.iter().enumerate() {
            let mut chords = engine();
            chords.set_frequencies(69.0, 5.0, 0.0, 0.5);
            let before = *chords.phase_increments();

            chords.set_freeze(true);
            mapper(&mut chords);
            let after = *chords.phase_increments();

            for logical in 0..NUM_VOICES {
                let slot = VOICE_PERMUTATION[logical];
                if logical % 2 == 0 {
                    assert_eq!(
                        before[slot], after[slot],
                        "mapper {m}: frozen voice {logical} moved"
                    );
                } else {
                    assert_ne!(
                        before[slot], after[slot],
                        "mapper {m}: free voice {logical} did not move"
                    );
                }
            }
        }
    }

    #[test]
    fn chord_mapper_is_idempotent() {
        let mut chords = engine();
        chords.set_detune(0.02);
        chords.set_chords(62.0, 4.0, 0.3, 0.25);
        let first = *chords.phase_increments();
        chords.set_chords(62.0, 4.0, 0.3, 0.25);
        assert_eq!(first, *chords.phase_increments());
    }

    #[test]
    fn chord_mapper_drops_out_of_range_updates() {
        let mut chords = engine();
        chords.set_chords(69.0, 0.0, 0.0, 0.0);
        let sane = *chords.phase_increments();

        // 600 semitones above center: every voice lands outside the guard.
        chords.set_chords(669.0, 0.0, 0.0, 0.0);
        assert_eq!(sane, *chords.phase_increments());
    }

    #[test]
    fn rational_mapper_snaps_to_small_ratios() {
        let mut chords = engine();
        chords.set_rationals(1.0, 2.0, 24.0, 8);
        let fundamental = semitones_to_ratio(45.0 + 24.0 - CENTER_NOTE) * 440.0 / SAMPLE_RATE;
        let increments = chords.phase_increments();

        // Logical voice 5 is seeded first at ratio 1, each voice below
        // doubles; octaves survive the denominator bound exactly.
        let expected = [32.0f32, 16.0, 8.0, 4.0, 2.0, 1.0];
        for (logical, ratio) in (0..NUM_VOICES).zip(expected) {
            let actual = increments[VOICE_PERMUTATION[logical]] / fundamental;
            assert!(
                (actual - ratio).abs() < 1e-4,
                "voice {logical}: ratio {actual}, expected {ratio}"
            );
        }
    }

    #[test]
    fn rational_mapper_tolerates_non_positive_notes() {
        let mut chords = engine();
        chords.set_rationals(0.0, 1.5, 0.0, 8);
        for &increment in chords.phase_increments() {
            assert!(increment.is_finite());
        }
        chords.set_rationals(-2.0, 1.5, 0.0, 8);
        for &increment in chords.phase_increments() {
            assert!(increment.is_finite());
        }
    }

    #[test]
    fn harmonic_mapper_handles_subharmonics_without_blowup() {
        let mut chords = engine();
        // Negative harmonic numbers for the upper voices.
        chords.set_harmonics(-10.0, 1.0, 0.0, 0.05);
        for &increment in chords.phase_increments() {
            assert!(increment.is_finite());
            assert!(increment != 0.0, "subharmonic formula produced silence");
        }

        // h = 0 must not divide by zero: note + j straddling zero.
        chords.set_harmonics(-1.0, 0.5, 0.0, 0.0);
        for &increment in chords.phase_increments() {
            assert!(increment.is_finite());
        }
    }

    #[test]
    fn harmonic_mapper_plays_integer_multiples() {
        let mut chords = engine();
        chords.set_harmonics(0.0, 1.0, 24.0, 0.0);
        let fundamental = semitones_to_ratio(45.0 + 24.0 - CENTER_NOTE) * 440.0 / SAMPLE_RATE;
        let increments = chords.phase_increments();
        // j runs 1..=6 from the top voice down.
        for (logical, harmonic) in (0..NUM_VOICES).rev().zip(1..=NUM_VOICES) {
            let actual = increments[VOICE_PERMUTATION[logical]];
            let expected = fundamental * harmonic as f32;
            assert!(
                (actual - expected).abs() < 1e-6,
                "voice {logical}: {actual} vs harmonic {harmonic}"
            );
        }
    }

    #[test]
    fn reset_zeroes_phase_and_nothing_else() {
        let mut chords = engine();
        chords.set_frequencies(60.0, 4.0, 0.0, 1.0);
        chords.set_self_feedback(0.3);
        chords.set_structure(0.6);
        chords.set_bitcrush(12.0);

        let mut block = [StereoFrame::default(); 64];
        chords.process(ModulationType::Fm, &mut block);

        let increments = *chords.phase_increments();
        let feedback = chords.feedback;
        assert!(chords.phase.iter().any(|&p| p != 0.0));
        assert!(feedback.iter().any(|f| f.sin_smooth != 0.0));

        chords.reset();

        assert_eq!(chords.phase, [0.0; NUM_VOICES]);
        assert_eq!(increments, chords.phase_increment);
        assert_eq!(chords.bitcrush, 12.0);
        assert_eq!(chords.self_feedback, 0.3);
        for (before, after) in feedback.iter().zip(&chords.feedback) {
            assert_eq!(before.sin_smooth, after.sin_smooth);
            assert_eq!(before.cos_smooth, after.cos_smooth);
        }
    }

    #[test]
    fn init_restores_default_shaping() {
        let mut chords = engine();
        chords.set_bitcrush(4.0);
        chords.set_decimate(32.0);
        chords.set_softclip(8.0);
        let mut block = [StereoFrame::default(); 32];
        chords.set_frequencies(69.0, 3.0, 0.0, 0.5);
        chords.process(ModulationType::Am, &mut block);

        chords.init();
        assert_eq!(chords.bitcrush, 65535.0);
        assert_eq!(chords.decimate, 65535.0);
        assert_eq!(chords.softclip, 1e-4);
        assert_eq!(chords.phase, [0.0; NUM_VOICES]);
        assert!(chords.feedback.iter().all(|f| f.sin_smooth == 0.0));
    }
}
