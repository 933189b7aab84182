//! The public `Apu` handle: owns every channel, the register file, the
//! band-limited buffer and the optional high-pass filter, and exposes the
//! lifecycle/MMIO/sample-draining surface described in spec §6.
//!
//! The actual behavior is spread across sibling modules, mirroring how
//! `gb_apu.c` keeps one translation unit but groups its static functions by
//! concern; here that grouping is expressed as Rust modules instead of a
//! comment banner:
//!
//! - [`sync`] — the per-channel catch-up algorithm (§4.2) and the raw
//!   sample computation for each generator.
//! - [`quirks`] — length/envelope/sweep clocking and all the
//!   trigger/NRx4-write edge cases (§4.3–§4.5).
//! - [`io`] — DMG/CGB and AGB MMIO read/write semantics (§4.10), the AGB
//!   address translation, and the CGB PCM peek registers (§4.11).
//! - [`fifo_ctl`] — AGB FIFO writes and `timer_overflow` (§4.9).
//! - [`state`] — save-state serialization.

mod fifo_ctl;
mod io;
mod quirks;
mod state;
mod sync;

use tracing::{debug, trace};

use crate::buffer::BlipBuffer;
use crate::channel::{ChannelId, ChannelTiming};
use crate::config::{Config, HighPassPreset};
use crate::envelope::Envelope;
use crate::error::{ApuError, Result};
use crate::fifo::Fifo;
use crate::highpass::HighPassFilter;
use crate::length::LengthCounter;
use crate::model::GbModel;
use crate::noise::Noise;
use crate::sequencer::FrameSequencer;
use crate::square::Square;
use crate::sweep::Sweep;
use crate::wave::Wave;

/// Number of bytes in the flat DMG/CGB register window this crate keeps
/// behind `addr - 0x10` indexing, covering `NR10..NR52` and their unused
/// gaps (wave RAM is tracked separately in [`Apu::wave_ram`]).
const REGS_LEN: usize = 0x20;

pub struct Apu {
    model: GbModel,
    config: Config,

    clock_rate: f64,
    sample_rate: f64,

    buffer: BlipBuffer,
    highpass: HighPassFilter,

    timing: [ChannelTiming; 6],
    length: [LengthCounter; 4],
    envelope: [Envelope; 3],
    sweep: Sweep,
    square: [Square; 2],
    wave: Wave,
    noise: Noise,
    fifo: [Fifo; 2],
    sequencer: FrameSequencer,

    regs: [u8; REGS_LEN],
    wave_ram: [[u8; 16]; 2],
    soundcnt_h: u16,
    soundbias: u16,
}

impl Apu {
    /// `init` (§6): allocates the band-limited buffer at `sample_rate` and
    /// configures it for `clock_rate` input clocks. Fails only if the
    /// buffer can't be allocated.
    pub fn new(clock_rate: f64, sample_rate: u32) -> Result<Apu> {
        let mut buffer = BlipBuffer::new(sample_rate)?;
        buffer.set_rates(clock_rate, f64::from(sample_rate));
        buffer.set_volume(1.0);

        let highpass = HighPassFilter::from_preset(HighPassPreset::None, clock_rate, f64::from(sample_rate));

        Ok(Apu {
            model: GbModel::Dmg,
            config: Config::new(),
            clock_rate,
            sample_rate: f64::from(sample_rate),
            buffer,
            highpass,
            timing: [ChannelTiming::new(); 6],
            length: [LengthCounter::new(); 4],
            envelope: [Envelope::new(); 3],
            sweep: Sweep::new(),
            square: [Square::new(); 2],
            wave: Wave::new(),
            noise: Noise::new(),
            fifo: [Fifo::new(), Fifo::new()],
            sequencer: FrameSequencer::new(),
            regs: [0; REGS_LEN],
            wave_ram: [crate::constants::WAVE_RAM_POWERON_CGB; 2],
            soundcnt_h: 0,
            soundbias: 0x0200,
        })
    }

    pub fn model(&self) -> GbModel {
        self.model
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `reset` (§6): clears channel/sub-unit state, zeroes registers
    /// `0x10..0x26`, restores wave RAM to its per-type power-on pattern,
    /// and seeds the noise LFSR.
    pub fn reset(&mut self, model: GbModel) {
        debug!(?model, "apu reset");

        self.model = model;
        self.buffer.clear();

        self.timing = [ChannelTiming::new(); 6];
        self.length = [LengthCounter::new(); 4];
        self.envelope = [Envelope::new(); 3];
        self.sweep = Sweep::new();
        self.square = [Square::new(); 2];
        self.wave = Wave::new();
        self.noise = Noise::new();
        self.noise.trigger();
        self.fifo = [Fifo::new(), Fifo::new()];
        self.sequencer = FrameSequencer::new();

        self.regs = [0; REGS_LEN];

        let pattern = *crate::constants::wave_ram_poweron(model);
        self.wave_ram = [pattern, pattern];
        self.soundcnt_h = 0;
        self.soundbias = 0x0200;
    }

    /// Called on the host's DIV-bit falling edge; may clock length/sweep/
    /// envelope subsystems per the frame sequencer's current phase (§4.8).
    pub fn frame_sequencer_clock(&mut self, time: u32) {
        if !self.apu_enabled() {
            return;
        }
        quirks::frame_sequencer_clock(self, time);
    }

    /// Rebase every channel's `timestamp` by `delta`, used by the host to
    /// avoid a 32-bit cycle-counter wraparound without disturbing relative
    /// timing between channels (§5).
    pub fn update_timestamp(&mut self, delta: u32) {
        for timing in &mut self.timing {
            timing.update_timestamp(delta);
        }
    }

    /// `end_frame` (§2, §4.1): syncs every channel up to `time`, resets
    /// each channel's local clock, and closes the band-limited buffer's
    /// frame so `read_samples` can drain it.
    pub fn end_frame(&mut self, time: u32) {
        for id in ChannelId::PSG {
            sync::channel_sync(self, id, time);
        }
        for id in [ChannelId::FifoA, ChannelId::FifoB] {
            sync::channel_sync(self, id, time);
        }

        let clock_duration = self.timing[ChannelId::Square0.index()].clock;
        for timing in &mut self.timing {
            debug_assert_eq!(timing.clock, clock_duration, "channels desynced before end_frame");
            timing.reset_clock(clock_duration);
        }

        self.buffer.end_frame(clock_duration);
    }

    pub fn clocks_needed(&self, sample_count: u32) -> u32 {
        self.buffer.clocks_needed(sample_count)
    }

    pub fn samples_available(&self) -> u32 {
        self.buffer.samples_avail()
    }

    /// Drains up to `count` interleaved stereo samples into `out`,
    /// applying the high-pass filter if one is configured. Returns the
    /// number of `i16` values actually written.
    pub fn read_samples(&mut self, out: &mut [i16], count: usize) -> usize {
        let written = self.buffer.read_samples(out, count);

        let mut i = 0;
        while i + 1 < written {
            let (l, r) = self.highpass.apply_stereo(out[i], out[i + 1]);
            out[i] = l;
            out[i + 1] = r;
            i += 2;
        }

        written
    }

    pub fn clear_samples(&mut self) {
        self.buffer.clear();
    }

    pub fn set_channel_volume(&mut self, channel: usize, volume: f32) {
        self.config.set_channel_volume(channel, volume);
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.config.set_master_volume(volume);
        self.buffer.set_volume(volume);
    }

    pub fn set_bass(&mut self, freq: i32) {
        self.buffer.set_bass(freq);
    }

    pub fn set_treble(&mut self, treble_db: f64) {
        self.buffer.set_treble(treble_db);
    }

    pub fn set_highpass_filter(&mut self, preset: HighPassPreset) {
        self.config.highpass = preset;
        self.highpass = HighPassFilter::from_preset(preset, self.clock_rate, self.sample_rate);
    }

    pub fn set_highpass_filter_custom(&mut self, factor: f64) {
        self.set_highpass_filter(HighPassPreset::Custom(factor));
    }

    pub fn set_zombie_mode(&mut self, on: bool) {
        self.config.zombie_mode = on;
    }

    pub fn read_io(&mut self, addr: u16, time: u32) -> u8 {
        debug_assert!((0x10..=0x3F).contains(&addr), "read_io address out of range: {addr:#06x}");
        io::read_io(self, addr, time)
    }

    pub fn write_io(&mut self, addr: u16, value: u8, time: u32) {
        debug_assert!((0x10..=0x3F).contains(&addr), "write_io address out of range: {addr:#06x}");
        io::write_io(self, addr, value, time)
    }

    /// CGB-only PCM12 peek register (§4.11). Returns
    /// [`ApuError::WrongModel`] off CGB.
    pub fn pcm12(&mut self, time: u32) -> Result<u8> {
        self.require_model(GbModel::Cgb)?;
        Ok(io::pcm12(self, time))
    }

    /// CGB-only PCM34 peek register (§4.11). Returns
    /// [`ApuError::WrongModel`] off CGB.
    pub fn pcm34(&mut self, time: u32) -> Result<u8> {
        self.require_model(GbModel::Cgb)?;
        Ok(io::pcm34(self, time))
    }

    /// AGB 8/16-bit MMIO read over `0x60..=0x9F`.
    pub fn agb_read(&mut self, addr: u16, time: u32) -> Result<u8> {
        self.require_model(GbModel::Agb)?;
        Ok(io::agb_read(self, addr, time))
    }

    /// AGB 8/16-bit MMIO write over `0x60..=0x9F`.
    pub fn agb_write(&mut self, addr: u16, value: u8, time: u32) -> Result<()> {
        self.require_model(GbModel::Agb)?;
        io::agb_write(self, addr, value, time);
        Ok(())
    }

    pub fn soundcnt_read(&self) -> Result<u16> {
        self.require_model(GbModel::Agb)?;
        Ok(self.soundcnt_h)
    }

    pub fn soundcnt_write(&mut self, value: u16, time: u32) -> Result<()> {
        self.require_model(GbModel::Agb)?;
        fifo_ctl::soundcnt_write(self, value, time);
        Ok(())
    }

    pub fn soundbias_read(&self) -> Result<u16> {
        self.require_model(GbModel::Agb)?;
        Ok(self.soundbias)
    }

    pub fn soundbias_write(&mut self, value: u16) -> Result<()> {
        self.require_model(GbModel::Agb)?;
        self.soundbias = value;
        Ok(())
    }

    pub fn fifo_write8(&mut self, addr: u32, value: u8) -> Result<()> {
        self.require_model(GbModel::Agb)?;
        fifo_ctl::fifo_write8(self, addr, value);
        Ok(())
    }

    pub fn fifo_write16(&mut self, addr: u32, value: u16) -> Result<()> {
        self.require_model(GbModel::Agb)?;
        fifo_ctl::fifo_write16(self, addr, value);
        Ok(())
    }

    pub fn fifo_write32(&mut self, addr: u32, value: u32) -> Result<()> {
        self.require_model(GbModel::Agb)?;
        fifo_ctl::fifo_write32(self, addr, value);
        Ok(())
    }

    /// AGB-only: advances FIFO playback on a timer overflow, invoking
    /// `dma_request` if the selected FIFO has room for a refill (§4.9).
    pub fn timer_overflow(&mut self, timer_num: u8, time: u32, mut dma_request: impl FnMut(ChannelId, u32)) -> Result<()> {
        self.require_model(GbModel::Agb)?;
        fifo_ctl::timer_overflow(self, timer_num, time, &mut dma_request);
        Ok(())
    }

    pub fn state_size(&self) -> usize {
        state::state_size(self)
    }

    pub fn save_state(&self, dst: &mut Vec<u8>) {
        state::save_state(self, dst)
    }

    pub fn load_state(&mut self, src: &[u8]) -> Result<()> {
        state::load_state(self, src)
    }

    fn require_model(&self, needed: GbModel) -> Result<()> {
        if self.model == needed {
            Ok(())
        } else {
            debug_assert!(false, "operation requires {needed:?}, running as {:?}", self.model);
            trace!(?needed, actual = ?self.model, "model mismatch");
            Err(ApuError::WrongModel {
                needed,
                actual: self.model,
            })
        }
    }

    pub(crate) fn apu_enabled(&self) -> bool {
        self.regs[reg_idx(0x26)] & 0x80 != 0
    }

    pub(crate) fn reg(&self, addr: u16) -> u8 {
        self.regs[reg_idx(addr)]
    }

    pub(crate) fn set_reg(&mut self, addr: u16, value: u8) {
        self.regs[reg_idx(addr)] = value;
    }

    /// `NR52` per-channel status bit (bits 0-3; only meaningful for the
    /// four PSG channels — FIFO channels have no enable bit of their own).
    pub(crate) fn channel_enabled(&self, id: ChannelId) -> bool {
        debug_assert!(id.is_psg());
        self.reg(0x26) & (1 << id.index()) != 0
    }

    pub(crate) fn channel_enable(&mut self, id: ChannelId) {
        debug_assert!(id.is_psg());
        let bit = 1 << id.index();
        let nr52 = self.reg(0x26) | bit;
        self.set_reg(0x26, nr52);
    }

    /// Clears a PSG channel's `NR52` status bit and zeroes its frequency
    /// timer, per `channel_disable` in the reference core.
    pub(crate) fn channel_disable(&mut self, id: ChannelId) {
        debug_assert!(id.is_psg());
        let bit = 1 << id.index();
        let nr52 = self.reg(0x26) & !bit;
        self.set_reg(0x26, nr52);
        self.timing[id.index()].frequency_timer = 0;
    }

    /// Whether the channel's DAC is powered: wave gates off `NR30.7`,
    /// square/noise gate off their envelope's start-volume/direction bits
    /// being all-zero (§4.4's "DAC disable").
    pub(crate) fn channel_dac_enabled(&self, id: ChannelId) -> bool {
        match id {
            ChannelId::Wave => self.reg(0x1A) & 0x80 != 0,
            ChannelId::FifoA | ChannelId::FifoB => true,
            _ => self.reg(crate::constants::env_reg_addr(id)) & 0xF8 != 0,
        }
    }

    /// `NR51` left/right panning bit for `id` (bit `index` = left, bit
    /// `index + 4` = right).
    pub(crate) fn nr51_left(&self, id: ChannelId) -> bool {
        self.reg(0x25) & (1 << id.index()) != 0
    }

    pub(crate) fn nr51_right(&self, id: ChannelId) -> bool {
        self.reg(0x25) & (1 << (id.index() + 4)) != 0
    }

    pub(crate) fn nr50_left_vol(&self) -> u8 {
        self.reg(0x24) & 0x7
    }

    pub(crate) fn nr50_right_vol(&self) -> u8 {
        (self.reg(0x24) >> 4) & 0x7
    }

    /// AGB-only PSG mixing-level right-shift (§4.2 step 4): `SOUNDCNT_H`
    /// bits 0-1 select 25/50/100% PSG output level, expressed here as the
    /// shift that produces it.
    pub(crate) fn agb_psg_shift(&self) -> u32 {
        match self.soundcnt_h & 0x3 {
            0 => 2,
            1 => 1,
            _ => 0,
        }
    }

    /// `NRx4` bit 6 — whether `id`'s length counter currently gates the
    /// channel.
    pub(crate) fn len_enabled(&self, id: ChannelId) -> bool {
        self.reg(u16::from(crate::constants::len_reg_addr(id))) & 0x40 != 0
    }
}

/// `addr - 0x10`, the index into [`Apu::regs`]. Only valid for
/// `0x10..=0x2F` (wave RAM at `0x30..=0x3F` lives in
/// [`Apu::wave_ram`] instead).
pub(crate) fn reg_idx(addr: u16) -> usize {
    usize::from(addr - 0x10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_sample_rate() {
        assert!(Apu::new(4_194_304.0, 0).is_err());
    }

    #[test]
    fn reset_restores_model_specific_wave_ram() {
        let mut apu = Apu::new(4_194_304.0, 48_000).unwrap();
        apu.reset(GbModel::Dmg);
        assert_eq!(apu.wave_ram[0], crate::constants::WAVE_RAM_POWERON_DMG);
        apu.reset(GbModel::Cgb);
        assert_eq!(apu.wave_ram[0], crate::constants::WAVE_RAM_POWERON_CGB);
    }

    #[test]
    fn end_frame_resets_every_channel_clock_to_zero() {
        let mut apu = Apu::new(4_194_304.0, 48_000).unwrap();
        apu.reset(GbModel::Dmg);
        apu.write_io(0x26, 0x80, 0);
        apu.end_frame(1000);
        for timing in &apu.timing {
            assert_eq!(timing.clock, 0);
        }
    }

    #[test]
    fn cgb_only_ops_error_off_cgb() {
        let mut apu = Apu::new(4_194_304.0, 48_000).unwrap();
        apu.reset(GbModel::Dmg);
        assert!(apu.pcm12(0).is_err());
    }

    #[test]
    fn agb_only_ops_error_off_agb() {
        let mut apu = Apu::new(4_194_304.0, 48_000).unwrap();
        apu.reset(GbModel::Dmg);
        assert!(apu.soundcnt_read().is_err());
        assert!(apu.fifo_write32(0x60, 0).is_err());
    }
}
