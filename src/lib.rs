//! A low-level, cycle-accurate Game Boy family APU core.
//!
//! This crate emulates the audio processing unit shared by the original
//! DMG, Color (CGB) and Advance (AGB) Game Boy family, for consumption by a
//! host CPU emulator. The host drives timing: it issues register reads and
//! writes at specific clock timestamps (`Apu::read_io`/`Apu::write_io`),
//! clocks the frame sequencer on the DIV-bit falling edge
//! (`Apu::frame_sequencer_clock`), requests AGB FIFO DMA refills on timer
//! overflows (`Apu::timer_overflow`), and periodically drains band-limited
//! stereo PCM samples for playback (`Apu::end_frame`/`Apu::read_samples`).
//!
//! The hard part of this crate is timing: four programmable sound
//! generators (two square channels, one wave channel, one noise channel)
//! plus, on AGB, two PCM FIFO channels, each synchronized to the host's
//! cycle clock and depositing amplitude deltas into a band-limited
//! synthesis buffer ([`buffer::BlipBuffer`], backed by the `blip_buf`
//! crate). See `SPEC_FULL.md` and `DESIGN.md` in the repository root for the
//! full requirements and the grounding behind each module.

pub mod apu;
pub mod buffer;
pub mod channel;
pub mod config;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod fifo;
pub mod highpass;
pub mod length;
pub mod model;
pub mod noise;
pub mod regs;
pub mod sequencer;
pub mod square;
pub mod state;
pub mod sweep;
pub mod wave;

pub use apu::Apu;
pub use config::{Config, HighPassPreset};
pub use error::{ApuError, Result};
pub use model::GbModel;
