//! Save-state serialization (§6, §9's "explicit serialization schema").
//!
//! The schema is a flat sequence of fixed-width little-endian fields, written
//! and read back in exactly the same order by [`save_state`]/[`load_state`],
//! through the byte-cursor primitives in [`crate::state`]. There is no
//! struct-layout `transmute` and no gap-skipping: every field the reference
//! core's static-offset-asserted struct holds is written explicitly, in
//! declaration order grouped by subsystem (channel timing, length, envelope,
//! sweep, square, wave, noise, fifo, frame sequencer, register file). The
//! model tag is included so a loaded state can't silently be replayed
//! against the wrong console variant's constant tables; [`Config`] and the
//! band-limited buffer are not part of the blob (§3: "nothing transient").

use crate::apu::Apu;
use crate::channel::ChannelTiming;
use crate::envelope::Envelope;
use crate::error::Result;
use crate::fifo::Fifo;
use crate::length::LengthCounter;
use crate::model::GbModel;
use crate::noise::Noise;
use crate::sequencer::FrameSequencer;
use crate::square::Square;
use crate::state::{StateReader, StateWriter};
use crate::sweep::Sweep;
use crate::wave::Wave;

fn model_tag(model: GbModel) -> u8 {
    match model {
        GbModel::Dmg => 0,
        GbModel::Cgb => 1,
        GbModel::Agb => 2,
    }
}

fn model_from_tag(tag: u8) -> GbModel {
    match tag {
        1 => GbModel::Cgb,
        2 => GbModel::Agb,
        _ => GbModel::Dmg,
    }
}

fn write_timing(w: &mut StateWriter, t: &ChannelTiming) {
    w.write_u32(t.clock);
    w.write_u32(t.timestamp);
    w.write_i32(t.amp[0]);
    w.write_i32(t.amp[1]);
    w.write_i32(t.frequency_timer);
}

fn read_timing(r: &mut StateReader) -> Result<ChannelTiming> {
    Ok(ChannelTiming {
        clock: r.read_u32()?,
        timestamp: r.read_u32()?,
        amp: [r.read_i32()?, r.read_i32()?],
        frequency_timer: r.read_i32()?,
    })
}

fn write_length(w: &mut StateWriter, l: &LengthCounter) {
    w.write_u16(l.counter);
}

fn read_length(r: &mut StateReader) -> Result<LengthCounter> {
    Ok(LengthCounter { counter: r.read_u16()? })
}

fn write_envelope(w: &mut StateWriter, e: &Envelope) {
    w.write_u8(e.volume);
    w.write_u8(e.timer);
    w.write_bool(e.disable);
}

fn read_envelope(r: &mut StateReader) -> Result<Envelope> {
    Ok(Envelope {
        volume: r.read_u8()?,
        timer: r.read_u8()?,
        disable: r.read_bool()?,
    })
}

fn write_sweep(w: &mut StateWriter, s: &Sweep) {
    w.write_u16(s.freq_shadow_register);
    w.write_u8(s.timer);
    w.write_bool(s.enabled);
    w.write_bool(s.did_negate);
}

fn read_sweep(r: &mut StateReader) -> Result<Sweep> {
    Ok(Sweep {
        freq_shadow_register: r.read_u16()?,
        timer: r.read_u8()?,
        enabled: r.read_bool()?,
        did_negate: r.read_bool()?,
    })
}

fn write_square(w: &mut StateWriter, s: &Square) {
    w.write_u8(s.duty_index);
}

fn read_square(r: &mut StateReader) -> Result<Square> {
    Ok(Square { duty_index: r.read_u8()? })
}

fn write_wave(w: &mut StateWriter, wv: &Wave) {
    w.write_u8(wv.sample_buffer);
    w.write_u8(wv.position_counter);
    w.write_bool(wv.just_accessed);
}

fn read_wave(r: &mut StateReader) -> Result<Wave> {
    Ok(Wave {
        sample_buffer: r.read_u8()?,
        position_counter: r.read_u8()?,
        just_accessed: r.read_bool()?,
    })
}

fn write_noise(w: &mut StateWriter, n: &Noise) {
    w.write_u16(n.lfsr);
}

fn read_noise(r: &mut StateReader) -> Result<Noise> {
    Ok(Noise { lfsr: r.read_u16()? })
}

fn write_fifo(w: &mut StateWriter, f: &Fifo) {
    for word in f.ring {
        w.write_u32(word);
    }
    w.write_u8(f.r_index);
    w.write_u8(f.w_index);
    w.write_u32(f.playing_buffer);
    w.write_u8(f.playing_buffer_index);
    w.write_u8(f.current_sample as u8);
}

fn read_fifo(r: &mut StateReader) -> Result<Fifo> {
    let mut ring = [0u32; 8];
    for slot in &mut ring {
        *slot = r.read_u32()?;
    }
    Ok(Fifo {
        ring,
        r_index: r.read_u8()?,
        w_index: r.read_u8()?,
        playing_buffer: r.read_u32()?,
        playing_buffer_index: r.read_u8()?,
        current_sample: r.read_u8()? as i8,
    })
}

fn write_sequencer(w: &mut StateWriter, s: &FrameSequencer) {
    w.write_u8(s.index);
}

fn read_sequencer(r: &mut StateReader) -> Result<FrameSequencer> {
    Ok(FrameSequencer { index: r.read_u8()? })
}

pub(crate) fn save_state(apu: &Apu, dst: &mut Vec<u8>) {
    let mut w = StateWriter::new(dst);

    w.write_u8(model_tag(apu.model));

    for timing in &apu.timing {
        write_timing(&mut w, timing);
    }
    for length in &apu.length {
        write_length(&mut w, length);
    }
    for envelope in &apu.envelope {
        write_envelope(&mut w, envelope);
    }
    write_sweep(&mut w, &apu.sweep);
    for square in &apu.square {
        write_square(&mut w, square);
    }
    write_wave(&mut w, &apu.wave);
    write_noise(&mut w, &apu.noise);
    for fifo in &apu.fifo {
        write_fifo(&mut w, fifo);
    }
    write_sequencer(&mut w, &apu.sequencer);

    w.write_bytes(&apu.regs);
    for bank in &apu.wave_ram {
        w.write_bytes(bank);
    }
    w.write_u16(apu.soundcnt_h);
    w.write_u16(apu.soundbias);
}

/// The exact byte length [`save_state`] will produce for the current state.
/// Computed by running the real serialization into a scratch buffer rather
/// than duplicating its arithmetic, so the two can never drift apart.
pub(crate) fn state_size(apu: &Apu) -> usize {
    let mut scratch = Vec::new();
    save_state(apu, &mut scratch);
    scratch.len()
}

pub(crate) fn load_state(apu: &mut Apu, src: &[u8]) -> Result<()> {
    let mut r = StateReader::new(src);

    let model = model_from_tag(r.read_u8()?);

    let mut timing = [ChannelTiming::new(); 6];
    for slot in &mut timing {
        *slot = read_timing(&mut r)?;
    }

    let mut length = [LengthCounter::new(); 4];
    for slot in &mut length {
        *slot = read_length(&mut r)?;
    }

    let mut envelope = [Envelope::new(); 3];
    for slot in &mut envelope {
        *slot = read_envelope(&mut r)?;
    }

    let sweep = read_sweep(&mut r)?;

    let mut square = [Square::new(); 2];
    for slot in &mut square {
        *slot = read_square(&mut r)?;
    }

    let wave = read_wave(&mut r)?;
    let noise = read_noise(&mut r)?;

    let mut fifo = [Fifo::new(), Fifo::new()];
    for slot in &mut fifo {
        *slot = read_fifo(&mut r)?;
    }

    let sequencer = read_sequencer(&mut r)?;

    let regs: [u8; super::REGS_LEN] = r.read_bytes(super::REGS_LEN)?.try_into().unwrap();
    let mut wave_ram = [[0u8; 16]; 2];
    for bank in &mut wave_ram {
        *bank = r.read_bytes(16)?.try_into().unwrap();
    }
    let soundcnt_h = r.read_u16()?;
    let soundbias = r.read_u16()?;

    r.expect_exhausted()?;

    apu.model = model;
    apu.timing = timing;
    apu.length = length;
    apu.envelope = envelope;
    apu.sweep = sweep;
    apu.square = square;
    apu.wave = wave;
    apu.noise = noise;
    apu.fifo = fifo;
    apu.sequencer = sequencer;
    apu.regs = regs;
    apu.wave_ram = wave_ram;
    apu.soundcnt_h = soundcnt_h;
    apu.soundbias = soundbias;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelId;

    #[test]
    fn round_trips_through_save_and_load() {
        let mut apu = Apu::new(4_194_304.0, 44_100).unwrap();
        apu.reset(GbModel::Cgb);
        apu.write_io(0x26, 0x80, 0);
        apu.write_io(0x11, 0x80, 0);
        apu.write_io(0x12, 0xF3, 0);
        apu.write_io(0x13, 0xC1, 0);
        apu.write_io(0x14, 0xC7, 100);
        apu.frame_sequencer_clock(200);

        let mut buf = Vec::new();
        apu.save_state(&mut buf);
        assert_eq!(buf.len(), apu.state_size());

        let mut loaded = Apu::new(4_194_304.0, 44_100).unwrap();
        loaded.load_state(&buf).unwrap();

        assert_eq!(loaded.model, GbModel::Cgb);
        assert_eq!(loaded.reg(0x12), apu.reg(0x12));
        assert_eq!(loaded.reg(0x13), apu.reg(0x13));
        assert!(loaded.channel_enabled(ChannelId::Square0));
        assert_eq!(loaded.sequencer.index, apu.sequencer.index);
    }

    #[test]
    fn load_rejects_short_buffer_without_mutating_destination() {
        let mut apu = Apu::new(4_194_304.0, 44_100).unwrap();
        apu.reset(GbModel::Dmg);
        let before = apu.reg(0x26);

        let err = apu.load_state(&[0u8; 4]);
        assert!(err.is_err());
        assert_eq!(apu.reg(0x26), before);
    }

    #[test]
    fn load_rejects_oversized_buffer() {
        let apu = Apu::new(4_194_304.0, 44_100).unwrap();
        let mut buf = Vec::new();
        apu.save_state(&mut buf);
        buf.push(0);

        let mut loaded = Apu::new(4_194_304.0, 44_100).unwrap();
        assert!(loaded.load_state(&buf).is_err());
    }
}
