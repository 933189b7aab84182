//! Stereo band-limited synthesis buffer façade.
//!
//! Wraps two independent [`blip_buf::BlipBuf`] instances (one per stereo
//! channel) behind the uniform interface spec'd in §4.1: deposit amplitude
//! deltas at integer clock timestamps, then periodically close a frame and
//! drain resampled, band-limited PCM. Grounded on `blip_wrap.c`/`blip_wrap.h`
//! (the thin C shim `gb_apu.c` is written against) — this struct is the
//! concrete Rust instantiation of that same shim, with `blip_buf` standing
//! in for Blargg's `Blip_Buffer`.

use crate::error::{ApuError, Result};

/// `INT16_MAX`, the fixed-point scale `blip_wrap_set_volume` uses for the
/// master volume.
const VOLUME_SCALE: i32 = i16::MAX as i32;
/// `VOLUME_MAX` from `blip_wrap.c`: `enum { VOLUME_MAX = 15 * 8 }`, the
/// loudest a single un-scaled PSG channel sample (`envelope.volume * (1..=8)
/// * sign`) can be.
const VOLUME_MAX: i32 = 15 * 8;

/// Stereo band-limited buffer. `lr` is always `0` (left) or `1` (right).
pub struct BlipBuffer {
    bufs: [blip_buf::BlipBuf; 2],
    /// Master volume, pre-scaled to `[0, INT16_MAX]` fixed point.
    volume: i32,
}

impl BlipBuffer {
    /// Allocates two mono buffers sized to `sample_rate / 10` samples, as
    /// `blip_wrap_new` does. Fails if `sample_rate` is zero (the real
    /// `blip_buf` crate would otherwise construct a degenerate buffer that
    /// can never hold a sample).
    pub fn new(sample_rate: u32) -> Result<BlipBuffer> {
        if sample_rate == 0 {
            return Err(ApuError::BufferAlloc { sample_rate });
        }

        let capacity = sample_rate / 10;
        Ok(BlipBuffer {
            bufs: [
                blip_buf::BlipBuf::new(capacity),
                blip_buf::BlipBuf::new(capacity),
            ],
            volume: 0,
        })
    }

    pub fn set_rates(&mut self, clock_rate: f64, sample_rate: f64) {
        for buf in &mut self.bufs {
            buf.set_rates(clock_rate, sample_rate);
        }
    }

    pub fn clear(&mut self) {
        for buf in &mut self.bufs {
            buf.clear();
        }
    }

    /// Deposits an amplitude step at `clock_time` in buffer `lr`, using the
    /// highest-quality band-limited kernel.
    pub fn add_delta(&mut self, clock_time: u32, delta: i32, lr: usize) {
        if delta != 0 {
            self.bufs[lr].add_delta(clock_time, delta);
        }
    }

    /// As [`Self::add_delta`] but with the cheaper kernel used for channels
    /// (wave, noise) whose amplitude changes frequently.
    pub fn add_delta_fast(&mut self, clock_time: u32, delta: i32, lr: usize) {
        if delta != 0 {
            self.bufs[lr].add_delta_fast(clock_time, delta);
        }
    }

    /// Scales a raw channel amplitude (already weighted by envelope volume
    /// and NR50 panning) by the master volume and a caller-supplied
    /// per-channel volume. Mirrors `blip_apply_volume_to_sample`'s integer
    /// division order exactly, so a zero master volume silences output
    /// without relying on float rounding.
    pub fn apply_volume_to_sample(&self, sample: i32, channel_volume: f32) -> i32 {
        let scaled = (i64::from(sample) * i64::from(self.volume)) / i64::from(VOLUME_MAX);
        (scaled as f32 * channel_volume) as i32
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = (VOLUME_SCALE as f32 * volume.clamp(0.0, 1.0)) as i32;
    }

    /// No-op: `blip_buf` doesn't expose bass shaping, unlike the C++
    /// `Blip_Buffer` `blip_wrap.cpp` can wrap.
    pub fn set_bass(&mut self, _freq: i32) {}

    /// No-op, see [`Self::set_bass`].
    pub fn set_treble(&mut self, _treble_db: f64) {}

    pub fn clocks_needed(&self, sample_count: u32) -> u32 {
        self.bufs[0].clocks_needed(sample_count / 2)
    }

    pub fn end_frame(&mut self, clock_duration: u32) {
        for buf in &mut self.bufs {
            buf.end_frame(clock_duration);
        }
    }

    pub fn samples_avail(&self) -> u32 {
        self.bufs[0].samples_avail() * 2
    }

    /// Drains interleaved stereo samples into `out`, returning the number
    /// of `i16` values written (not sample *pairs*).
    pub fn read_samples(&mut self, out: &mut [i16], count: usize) -> usize {
        let pairs = count / 2;
        self.bufs[0].read_samples(&mut out[0..], pairs, true);
        self.bufs[1].read_samples(&mut out[1..], pairs, true) * 2
    }
}
