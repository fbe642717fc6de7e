//! Interactive TUI playground for the chord engine.
//!
//! Keys:
//!   1..4        frequency mapper (spread / chord / rational / harmonic)
//!   m           toggle FM / AM coupling
//!   left/right  structure
//!   up/down     root note
//!   +/-         modulation index
//!   f           freeze toggle
//!   q / esc     quit

use std::time::Duration;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossterm::event::{Event, KeyCode};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    DefaultTerminal, Frame,
};
use rtrb::{Producer, PushError, RingBuffer};
use rustfft::{num_complex::Complex, FftPlanner};

use hexachord_dsp::dsp::chords::ModulationType;
use hexachord_dsp::synth::{ChordMessage, ChordSynth};
use hexachord_dsp::{StereoFrame, MAX_BLOCK_SIZE};

const VIS_BLOCK_LEN: usize = 1024;
const AUDIO_RING_BLOCKS: usize = 16;
const SPECTRUM_BINS: usize = 64;

#[derive(Clone, Copy, PartialEq)]
enum Mapper {
    Spread,
    Chord,
    Rational,
    Harmonic,
}

/// Control-surface state mirrored on the UI side; every edit is sent to the
/// audio thread as a message.
struct Panel {
    mapper: Mapper,
    mode: ModulationType,
    note: f32,
    structure: f32,
    modulation_index: f32,
    freeze: bool,
}

impl Panel {
    fn new() -> Self {
        Self {
            mapper: Mapper::Spread,
            mode: ModulationType::Fm,
            note: 57.0,
            structure: 0.3,
            modulation_index: 0.4,
            freeze: false,
        }
    }

    fn mapper_message(&self) -> ChordMessage {
        match self.mapper {
            Mapper::Spread => ChordMessage::Frequencies {
                note: self.note,
                spread: 7.0,
                fine: 0.0,
                distrib: 0.5,
            },
            Mapper::Chord => ChordMessage::Chord {
                note: self.note,
                spread: 12.0,
                fine: 0.0,
                chord: 0.4,
            },
            Mapper::Rational => ChordMessage::Rationals {
                note: (self.note - 45.0).max(1.0) / 4.0,
                spread: 1.5,
                fine: 0.0,
                max_denominator: 8,
            },
            Mapper::Harmonic => ChordMessage::Harmonics {
                note: (self.note - 45.0) / 4.0,
                spread: 1.0,
                fine: 0.0,
                detune: 0.01,
            },
        }
    }

    fn push_all(&self, tx: &mut Producer<ChordMessage>) {
        let _ = tx.push(self.mapper_message());
        let _ = tx.push(ChordMessage::Mode(self.mode));
        let _ = tx.push(ChordMessage::Structure(self.structure));
        let _ = tx.push(ChordMessage::ModulationIndex(self.modulation_index));
        let _ = tx.push(ChordMessage::Freeze(self.freeze));
    }

    /// Returns false when the key asks to quit.
    fn handle_key(&mut self, code: KeyCode, tx: &mut Producer<ChordMessage>) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('1') => self.mapper = Mapper::Spread,
            KeyCode::Char('2') => self.mapper = Mapper::Chord,
            KeyCode::Char('3') => self.mapper = Mapper::Rational,
            KeyCode::Char('4') => self.mapper = Mapper::Harmonic,
            KeyCode::Char('m') => {
                self.mode = match self.mode {
                    ModulationType::Fm => ModulationType::Am,
                    ModulationType::Am => ModulationType::Fm,
                };
            }
            KeyCode::Char('f') => self.freeze = !self.freeze,
            KeyCode::Left => self.structure = (self.structure - 0.02).max(0.0),
            KeyCode::Right => self.structure = (self.structure + 0.02).min(1.0),
            KeyCode::Up => self.note = (self.note + 1.0).min(96.0),
            KeyCode::Down => self.note = (self.note - 1.0).max(24.0),
            KeyCode::Char('+') => {
                self.modulation_index = (self.modulation_index + 0.05).min(1.0)
            }
            KeyCode::Char('-') => {
                self.modulation_index = (self.modulation_index - 0.05).max(0.0)
            }
            _ => return true,
        }
        self.push_all(tx);
        true
    }
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let terminal = ratatui::init();

    let res = run(terminal);

    ratatui::restore();
    res
}

fn run(mut terminal: DefaultTerminal) -> EyreResult<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;
    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;

    let (mut msg_tx, msg_rx) = RingBuffer::<ChordMessage>::new(64);
    let (audio_tx, mut audio_rx) = RingBuffer::<f32>::new(VIS_BLOCK_LEN * AUDIO_RING_BLOCKS);

    let mut render_buf = vec![StereoFrame::default(); MAX_BLOCK_SIZE];
    let stream = device
        .build_output_stream(
            &config.into(),
            {
                let mut synth = ChordSynth::new(sample_rate, msg_rx);
                let mut audio_tx = audio_tx;
                move |data: &mut [f32], _| {
                    let total = data.len() / channels;
                    let mut written = 0;
                    while written < total {
                        let count = (total - written).min(MAX_BLOCK_SIZE);
                        let block = &mut render_buf[..count];
                        block.fill(StereoFrame::default());
                        synth.render_block(block);

                        for (i, frame) in block.iter().enumerate() {
                            let offset = (written + i) * channels;
                            data[offset] = frame.l;
                            if channels > 1 {
                                data[offset + 1] = frame.r;
                            }
                            // Mono mix to the UI ring, dropped on overflow.
                            if let Err(PushError::Full(_)) =
                                audio_tx.push((frame.l + frame.r) * 0.5)
                            {
                                // UI fell behind; keep rendering.
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

    let mut panel = Panel::new();
    panel.push_all(&mut msg_tx);

    let mut vis_buffer = vec![0.0f32; VIS_BLOCK_LEN];
    let mut spectrum = Spectrum::new(VIS_BLOCK_LEN, sample_rate);

    loop {
        let mut filled = 0usize;
        while filled < VIS_BLOCK_LEN {
            match audio_rx.pop() {
                Ok(s) => {
                    vis_buffer[filled] = s;
                    filled += 1;
                }
                Err(_) => break,
            }
        }
        if filled == VIS_BLOCK_LEN {
            spectrum.update(&vis_buffer);
        }

        terminal.draw(|frame| render_ui(frame, &vis_buffer, spectrum.points(), &panel))?;

        if crossterm::event::poll(Duration::from_millis(16))? {
            if let Event::Key(key) = crossterm::event::read()? {
                if !panel.handle_key(key.code, &mut msg_tx) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn render_ui(frame: &mut Frame, buffer: &[f32], spectrum: &[(f64, f64)], panel: &Panel) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(frame.area());
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(columns[1]);

    let target_w = columns[0].width.max(1) as usize;
    let step = buffer.len().div_ceil(target_w);
    let wave_points: Vec<(f64, f64)> = buffer
        .iter()
        .enumerate()
        .step_by(step.max(1))
        .map(|(i, &s)| (i as f64, s as f64))
        .collect();

    let wave = Chart::new(vec![Dataset::default()
        .name("mono mix")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&wave_points)])
    .block(
        Block::default()
            .title("hexachord - q to quit")
            .borders(Borders::ALL),
    )
    .x_axis(Axis::default().bounds([0.0, buffer.len() as f64]))
    .y_axis(Axis::default().bounds([-1.0, 1.0]));

    let spectrum_chart = Chart::new(vec![Dataset::default()
        .name("spectrum")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(spectrum)])
    .block(Block::default().title("Spectrum").borders(Borders::ALL))
    .x_axis(Axis::default().title("Hz").bounds([
        0.0,
        spectrum.iter().map(|(f, _)| *f).fold(1.0, f64::max),
    ]))
    .y_axis(Axis::default().title("dB").bounds([-90.0, 10.0]));

    let mapper = match panel.mapper {
        Mapper::Spread => "spread",
        Mapper::Chord => "chord",
        Mapper::Rational => "rational",
        Mapper::Harmonic => "harmonic",
    };
    let mode = match panel.mode {
        ModulationType::Fm => "FM",
        ModulationType::Am => "AM",
    };
    let info_text = format!(
        "mapper [1-4]: {mapper}\n\
         mode [m]:     {mode}\n\
         note  [^v]:   {:.0}\n\
         structure []: {:.2}\n\
         index [+-]:   {:.2}\n\
         freeze [f]:   {}",
        panel.note, panel.structure, panel.modulation_index, panel.freeze
    );
    let info =
        Paragraph::new(info_text).block(Block::default().title("Controls").borders(Borders::ALL));

    frame.render_widget(wave, columns[0]);
    frame.render_widget(spectrum_chart, right[0]);
    frame.render_widget(info, right[1]);
}

/// Windowed FFT of the visualization buffer, reduced to a fixed number of
/// log-magnitude points.
struct Spectrum {
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    fft: std::sync::Arc<dyn rustfft::Fft<f32>>,
    points: Vec<(f64, f64)>,
    sample_rate: f32,
}

impl Spectrum {
    fn new(len: usize, sample_rate: f32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(len);
        let window = (0..len)
            .map(|i| {
                let t = i as f32 / (len - 1) as f32;
                0.5 * (1.0 - (std::f32::consts::TAU * t).cos())
            })
            .collect();
        Self {
            window,
            scratch: vec![Complex::new(0.0, 0.0); len],
            fft,
            points: vec![(0.0, -90.0); SPECTRUM_BINS],
            sample_rate,
        }
    }

    fn update(&mut self, buffer: &[f32]) {
        if buffer.len() != self.window.len() {
            return;
        }
        for (slot, (&sample, &w)) in self.scratch.iter_mut().zip(buffer.iter().zip(&self.window)) {
            slot.re = sample * w;
            slot.im = 0.0;
        }
        self.fft.process(&mut self.scratch);

        let half = self.scratch.len() / 2;
        let per_point = half / SPECTRUM_BINS;
        for (p, point) in self.points.iter_mut().enumerate() {
            let start = p * per_point;
            let mut power = 0.0f32;
            for bin in &self.scratch[start..start + per_point] {
                power = power.max(bin.re * bin.re + bin.im * bin.im);
            }
            let freq = start as f32 * self.sample_rate / self.scratch.len() as f32;
            *point = (freq as f64, 10.0 * (power.max(1e-9) as f64).log10());
        }
    }

    fn points(&self) -> &[(f64, f64)] {
        &self.points
    }
}
