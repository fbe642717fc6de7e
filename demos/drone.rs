//! Minimal playback demo: a rational-ratio drone, slowly swept structure.
//!
//! Run with: cargo run --example drone

use std::thread;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hexachord_dsp::dsp::chords::ModulationType;
use hexachord_dsp::synth::{ChordMessage, ChordSynth};
use hexachord_dsp::{StereoFrame, MAX_BLOCK_SIZE};
use rtrb::RingBuffer;

fn main() -> EyreResult<()> {
    color_eyre::install()?;

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;
    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;

    let (mut tx, rx) = RingBuffer::<ChordMessage>::new(64);

    let mut frames = vec![StereoFrame::default(); MAX_BLOCK_SIZE];
    let stream = device
        .build_output_stream(
            &config.into(),
            {
                let mut synth = ChordSynth::new(sample_rate, rx);
                move |data: &mut [f32], _| {
                    let total = data.len() / channels;
                    let mut written = 0;
                    while written < total {
                        let count = (total - written).min(MAX_BLOCK_SIZE);
                        let block = &mut frames[..count];
                        block.fill(StereoFrame::default());
                        synth.render_block(block);

                        for (i, frame) in block.iter().enumerate() {
                            let offset = (written + i) * channels;
                            data[offset] = frame.l;
                            if channels > 1 {
                                data[offset + 1] = frame.r;
                            }
                        }
                        written += count;
                    }
                }
            },
            move |err| eprintln!("stream error: {err}"),
            None,
        )
        .wrap_err("failed to build output stream")?;
    stream.play().wrap_err("failed to start output stream")?;

    // Sound design: a just-intonation stack, lightly coupled in AM mode.
    let _ = tx.push(ChordMessage::Rationals {
        note: 2.0,
        spread: 1.5,
        fine: -12.0,
        max_denominator: 8,
    });
    let _ = tx.push(ChordMessage::Mode(ModulationType::Am));
    let _ = tx.push(ChordMessage::ModulationIndex(0.4));
    let _ = tx.push(ChordMessage::SelfFeedback(0.1));

    // Sweep the structure control once over thirty seconds.
    println!("playing a 30 s structure sweep, ctrl-c to quit early");
    for step in 0..=300 {
        let _ = tx.push(ChordMessage::Structure(step as f32 / 300.0));
        thread::sleep(Duration::from_millis(100));
    }

    Ok(())
}
