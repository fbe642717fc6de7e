//! End-to-end behavior of the chord engine through its public surface.

use hexachord_dsp::dsp::chords::{Chords, ModulationType, NUM_VOICES};
use hexachord_dsp::StereoFrame;

const SAMPLE_RATE: f32 = 32_000.0;
const BLOCK: usize = 512;

fn silent_block() -> Vec<StereoFrame> {
    vec![StereoFrame::default(); BLOCK]
}

/// A transparent engine: no cross-modulation, no feedback, quantizers wide
/// open, clipper at minimal drive.
fn transparent_engine() -> Chords {
    let mut chords = Chords::new(SAMPLE_RATE);
    chords.set_frequencies(69.0, 7.0, 0.0, 0.5);
    chords.set_structure(0.0);
    chords.set_modulation_index(0.0);
    chords.set_self_feedback(0.0);
    chords
}

#[test]
fn silent_input_produces_stable_bounded_tones_in_both_modes() {
    for mode in [ModulationType::Fm, ModulationType::Am] {
        let mut chords = transparent_engine();
        let mut frames = silent_block();
        chords.process(mode, &mut frames);

        let peak = frames
            .iter()
            .flat_map(|f| [f.l, f.r])
            .fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak > 0.01, "{mode:?}: expected audible output, peak {peak}");
        assert!(peak <= 1.0, "{mode:?}: output out of range, peak {peak}");
        assert!(frames.iter().all(|f| f.l.is_finite() && f.r.is_finite()));
    }
}

#[test]
fn output_stays_bounded_across_the_parameter_range() {
    let structures = [0.0, 0.15, 0.4, 0.65, 0.9, 1.0];
    let indexes = [0.0, 0.3, 1.0];
    let feedbacks = [0.0, 0.5, 1.0];

    for mode in [ModulationType::Fm, ModulationType::Am] {
        for &structure in &structures {
            for &index in &indexes {
                for &feedback in &feedbacks {
                    let mut chords = Chords::new(SAMPLE_RATE);
                    chords.set_frequencies(57.0, 5.0, 0.0, 1.0);
                    chords.set_structure(structure);
                    chords.set_modulation_index(index);
                    chords.set_self_feedback(feedback);
                    chords.set_bitcrush(64.0);
                    chords.set_decimate(1024.0);
                    chords.set_softclip(4.0);

                    let mut frames = silent_block();
                    chords.process(mode, &mut frames);
                    for (n, frame) in frames.iter().enumerate() {
                        assert!(
                            frame.l.abs() <= 1.0 && frame.r.abs() <= 1.0,
                            "{mode:?} s={structure} i={index} fb={feedback}: \
                             sample {n} out of range ({}, {})",
                            frame.l,
                            frame.r
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn uncoupled_fm_output_matches_the_documented_gain_normalization() {
    // With structure 0 every coefficient is 0: six unit gains plus the 2.0
    // headroom term, so the output is the plain voice sum divided by 8.
    let mut chords = transparent_engine();
    let increments = *chords.phase_increments();
    let mut frames = silent_block();
    chords.process(ModulationType::Fm, &mut frames);

    let mut phases = [0.0f64; NUM_VOICES];
    for (n, frame) in frames.iter().enumerate() {
        let expected: f64 = phases
            .iter()
            .map(|&p| (std::f64::consts::TAU * p).sin())
            .sum::<f64>()
            / 8.0;
        assert!(
            (frame.l as f64 - expected).abs() < 2e-3,
            "sample {n}: got {}, expected {expected}",
            frame.l
        );
        for (phase, &increment) in phases.iter_mut().zip(&increments) {
            *phase = (*phase + increment as f64).fract();
        }
    }
}

#[test]
fn modes_produce_different_audio_once_coupled() {
    let mut fm = Chords::new(SAMPLE_RATE);
    let mut am = Chords::new(SAMPLE_RATE);
    for chords in [&mut fm, &mut am] {
        chords.set_frequencies(57.0, 7.0, 0.0, 0.5);
        chords.set_structure(0.8);
        chords.set_modulation_index(0.5);
    }

    let mut fm_frames = silent_block();
    let mut am_frames = silent_block();
    fm.process(ModulationType::Fm, &mut fm_frames);
    am.process(ModulationType::Am, &mut am_frames);

    let difference: f32 = fm_frames
        .iter()
        .zip(&am_frames)
        .map(|(a, b)| (a.l - b.l).abs() + (a.r - b.r).abs())
        .sum();
    assert!(difference > 0.1, "FM and AM rendered identically");
}

#[test]
fn identically_configured_engines_render_identically() {
    let make = || {
        let mut chords = Chords::new(SAMPLE_RATE);
        chords.set_chords(60.0, 7.0, 0.0, 0.4);
        chords.set_structure(0.7);
        chords.set_modulation_index(0.6);
        chords.set_self_feedback(0.2);
        chords
    };
    let mut a = make();
    let mut b = make();
    let mut frames_a = silent_block();
    let mut frames_b = silent_block();
    a.process(ModulationType::Am, &mut frames_a);
    b.process(ModulationType::Am, &mut frames_b);
    assert_eq!(frames_a, frames_b);
}

#[test]
fn lofi_shaping_changes_the_waveform() {
    let mut clean = transparent_engine();
    let mut crushed = transparent_engine();
    crushed.set_bitcrush(8.0);
    crushed.set_decimate(64.0);

    let mut clean_frames = silent_block();
    let mut crushed_frames = silent_block();
    clean.process(ModulationType::Fm, &mut clean_frames);
    crushed.process(ModulationType::Fm, &mut crushed_frames);

    assert!(clean_frames
        .iter()
        .zip(&crushed_frames)
        .any(|(a, b)| (a.l - b.l).abs() > 1e-3));
    // Still bounded.
    assert!(crushed_frames.iter().all(|f| f.l.abs() <= 1.0 && f.r.abs() <= 1.0));
}

#[test]
fn freeze_changes_exactly_half_the_voices_from_outside() {
    let mut chords = Chords::new(SAMPLE_RATE);
    chords.set_frequencies(69.0, 5.0, 0.0, 0.5);
    let before = *chords.phase_increments();

    chords.set_freeze(true);
    chords.set_harmonics(4.0, 1.0, 0.0, 0.0);
    let after = *chords.phase_increments();

    let changed = before
        .iter()
        .zip(&after)
        .filter(|(b, a)| b != a)
        .count();
    assert_eq!(changed, NUM_VOICES / 2);
}
