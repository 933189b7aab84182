//! DMG/CGB and AGB MMIO read/write semantics (§4.10), the AGB address
//! translation (§4.10 "AGB translation"), and the CGB PCM peek registers
//! (§4.11). Grounded on `gb_apu.c`'s `apu_read_io`/`apu_write_io` and the
//! AGB-specific `gba_read_io`/`gba_write_io` wrappers around the same
//! register file.

use crate::apu::sync;
use crate::apu::Apu;
use crate::channel::ChannelId;
use crate::constants::{duty_reg_addr, env_index, square_duty_table, AGB_TO_DMG_ADDR, AGB_UNUSED, READ_MASK_AGB, READ_OR_MASK_DMG};
use crate::envelope::Envelope;
use crate::length::LengthCounter;
use crate::model::GbModel;
use crate::noise::Noise;
use crate::sequencer::FrameSequencer;
use crate::square::Square;
use crate::sweep::Sweep;

use super::quirks;

pub(crate) fn read_io(apu: &mut Apu, addr: u16, time: u32) -> u8 {
    if (0x30..=0x3F).contains(&addr) {
        sync::channel_sync(apu, ChannelId::Wave, time);
        return wave_ram_read(apu, addr);
    }

    let offset = usize::from(addr - 0x10);
    let raw = apu.reg(addr);

    match apu.model {
        GbModel::Agb => raw & READ_MASK_AGB[offset],
        GbModel::Dmg | GbModel::Cgb => raw | READ_OR_MASK_DMG[offset],
    }
}

pub(crate) fn write_io(apu: &mut Apu, addr: u16, value: u8, time: u32) {
    if (0x30..=0x3F).contains(&addr) {
        sync::channel_sync(apu, ChannelId::Wave, time);
        wave_ram_write(apu, addr, value);
        return;
    }

    if addr == 0x26 {
        write_nr52(apu, value, time);
        return;
    }

    if !apu.apu_enabled() && !(apu.model.is_dmg() && is_len_load_addr(addr)) {
        return;
    }

    if addr == 0x24 || addr == 0x25 {
        sync_all_psg(apu, time);
        apu.set_reg(addr, value);
        return;
    }

    let id = match channel_for_addr(addr) {
        Some(id) => id,
        None => return,
    };

    sync::channel_sync(apu, id, time);
    let old_value = apu.reg(addr);
    apu.set_reg(addr, value);
    dispatch_register_write(apu, id, addr, value, old_value, time);
}

fn dispatch_register_write(apu: &mut Apu, id: ChannelId, addr: u16, value: u8, old_value: u8, time: u32) {
    match addr {
        0x10 | 0x1A => quirks::on_nrx0_write(apu, id, value, old_value),
        0x11 | 0x16 | 0x1B | 0x20 => quirks::on_nrx1_write(apu, id, value),
        0x12 | 0x17 | 0x21 => quirks::on_nrx2_write(apu, id, time, value, old_value),
        0x14 | 0x19 | 0x1E | 0x23 => quirks::on_nrx4_write(apu, id, time, value, old_value),
        // NR13/18/1D/22 (frequency-lo / NR43): no immediate side effect, the
        // new value is just picked up on the next sync. NR32 (wave volume
        // code): same, read live by `sync_wave`.
        _ => {}
    }
}

fn is_len_load_addr(addr: u16) -> bool {
    matches!(addr, 0x11 | 0x16 | 0x1B | 0x20)
}

fn channel_for_addr(addr: u16) -> Option<ChannelId> {
    match addr {
        0x10..=0x14 => Some(ChannelId::Square0),
        0x16..=0x19 => Some(ChannelId::Square1),
        0x1A..=0x1E => Some(ChannelId::Wave),
        0x20..=0x23 => Some(ChannelId::Noise),
        _ => None,
    }
}

fn sync_all_psg(apu: &mut Apu, time: u32) {
    for id in ChannelId::PSG {
        sync::channel_sync(apu, id, time);
    }
}

/// `NR52` write (§4.10): the only register that can be written while the
/// APU is disabled, and the only one whose own enable transition governs
/// everyone else's gating.
fn write_nr52(apu: &mut Apu, value: u8, time: u32) {
    let was_enabled = apu.apu_enabled();
    let now_enabled = value & 0x80 != 0;

    if was_enabled && !now_enabled {
        sync_all_psg(apu, time);

        let preserved_len = apu.model.is_dmg().then(|| std::array::from_fn::<u16, 4, _>(|i| apu.length[i].counter));

        for addr in 0x10u16..=0x25 {
            apu.set_reg(addr, 0);
        }

        apu.length = [LengthCounter::new(); 4];
        apu.envelope = [Envelope::new(); 3];
        apu.sweep = Sweep::new();
        apu.square = [Square::new(); 2];
        apu.wave.position_counter = 0;
        apu.wave.sample_buffer = 0;
        apu.wave.just_accessed = false;
        apu.noise = Noise::new();

        if let Some(preserved) = preserved_len {
            for (i, counter) in preserved.into_iter().enumerate() {
                apu.length[i].counter = counter;
            }
        }

        apu.set_reg(0x26, 0x00);
    } else if !was_enabled && now_enabled {
        apu.sequencer = FrameSequencer::new();
        apu.set_reg(0x26, 0x80 | (apu.reg(0x26) & 0x0F));
    }
    // Writing the same enable state is a no-op: NR52 bits 0-3 are read-only
    // status, never settable directly by a write.
}

fn wave_ram_read(apu: &Apu, addr: u16) -> u8 {
    let offset = usize::from(addr - 0x30);
    match apu.model {
        GbModel::Dmg => {
            if apu.channel_enabled(ChannelId::Wave) && !apu.wave.just_accessed {
                0xFF
            } else {
                apu.wave_ram[0][offset]
            }
        }
        GbModel::Cgb => apu.wave_ram[0][offset],
        GbModel::Agb => apu.wave_ram[active_agb_read_bank(apu)][offset],
    }
}

fn wave_ram_write(apu: &mut Apu, addr: u16, value: u8) {
    let offset = usize::from(addr - 0x30);
    match apu.model {
        GbModel::Dmg => {
            if !apu.channel_enabled(ChannelId::Wave) || apu.wave.just_accessed {
                apu.wave_ram[0][offset] = value;
            }
        }
        GbModel::Cgb => apu.wave_ram[0][offset] = value,
        GbModel::Agb => apu.wave_ram[active_agb_read_bank(apu)][offset] = value,
    }
}

/// AGB wave-RAM bank reached through the DMG-compatible `0x30..0x3F`
/// window: outside bank mode, the currently-playing bank is exclusive to
/// the generator, so the CPU sees the *other* bank (double-buffering);
/// in bank mode, the CPU addresses whichever bank `NR30.6` currently
/// selects.
fn active_agb_read_bank(apu: &Apu) -> usize {
    let bank_mode = apu.reg(0x1A) & 0x20 != 0;
    let bank_select = apu.reg(0x1A) & 0x40 != 0;
    if bank_mode {
        usize::from(bank_select)
    } else {
        usize::from(!bank_select)
    }
}

/// CGB-only PCM12 peek (§4.11): `(sq1 << 4) | sq0`, each nibble the
/// channel's current envelope volume gated by its enable bit and live duty
/// bit, zero otherwise.
pub(crate) fn pcm12(apu: &mut Apu, time: u32) -> u8 {
    sync::channel_sync(apu, ChannelId::Square0, time);
    sync::channel_sync(apu, ChannelId::Square1, time);
    let sq0 = square_nibble(apu, ChannelId::Square0);
    let sq1 = square_nibble(apu, ChannelId::Square1);
    (sq1 << 4) | sq0
}

/// CGB-only PCM34 peek (§4.11): `(noise << 4) | wave`.
pub(crate) fn pcm34(apu: &mut Apu, time: u32) -> u8 {
    sync::channel_sync(apu, ChannelId::Wave, time);
    sync::channel_sync(apu, ChannelId::Noise, time);
    let noise = noise_nibble(apu);
    let wave = wave_nibble(apu);
    (noise << 4) | wave
}

fn square_nibble(apu: &Apu, id: ChannelId) -> u8 {
    if !apu.channel_enabled(id) {
        return 0;
    }
    let duty_table = *square_duty_table(apu.model);
    let duty_sel = usize::from(apu.reg(u16::from(duty_reg_addr(id))) >> 6);
    let bit = apu.square[id.index()].duty_bit(duty_table[duty_sel]);
    if bit {
        apu.envelope[env_index(id)].volume
    } else {
        0
    }
}

fn noise_nibble(apu: &Apu) -> u8 {
    if !apu.channel_enabled(ChannelId::Noise) {
        return 0;
    }
    if apu.noise.bit0() {
        0
    } else {
        apu.envelope[env_index(ChannelId::Noise)].volume
    }
}

fn wave_nibble(apu: &Apu) -> u8 {
    if !apu.channel_enabled(ChannelId::Wave) {
        return 0;
    }
    apu.wave.current_nibble()
}

/// AGB 8-bit MMIO read over `0x60..=0x9F` (§4.10 "AGB translation"): most
/// addresses translate to their DMG equivalent and fall through to
/// [`read_io`]; `0x90..=0x9F` reaches wave RAM bank 1 directly, since the
/// DMG-address table has no slot for a second bank.
pub(crate) fn agb_read(apu: &mut Apu, addr: u16, time: u32) -> u8 {
    if (0x90..=0x9F).contains(&addr) {
        return apu.wave_ram[1][usize::from(addr - 0x90)];
    }

    match AGB_TO_DMG_ADDR[usize::from(addr - 0x60)] {
        AGB_UNUSED => 0xFF,
        dmg_addr => read_io(apu, u16::from(dmg_addr), time),
    }
}

pub(crate) fn agb_write(apu: &mut Apu, addr: u16, value: u8, time: u32) {
    if (0x90..=0x9F).contains(&addr) {
        apu.wave_ram[1][usize::from(addr - 0x90)] = value;
        return;
    }

    match AGB_TO_DMG_ADDR[usize::from(addr - 0x60)] {
        AGB_UNUSED => {}
        dmg_addr => write_io(apu, u16::from(dmg_addr), value, time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apu() -> Apu {
        let mut apu = Apu::new(4_194_304.0, 44_100).unwrap();
        apu.reset(GbModel::Dmg);
        apu
    }

    #[test]
    fn nr52_disable_zeroes_registers_but_preserves_dmg_length() {
        let mut apu = apu();
        write_io(&mut apu, 0x26, 0x80, 0);
        write_io(&mut apu, 0x11, 0x3F, 0); // length load, 1 step left
        assert_eq!(apu.length[ChannelId::Square0.index()].counter, 1);

        write_io(&mut apu, 0x26, 0x00, 0);
        assert_eq!(apu.reg(0x11), 0);
        assert_eq!(apu.length[ChannelId::Square0.index()].counter, 1);
    }

    #[test]
    fn writes_dropped_while_disabled_except_dmg_length_load() {
        let mut apu = apu();
        write_io(&mut apu, 0x12, 0xF0, 0);
        assert_eq!(apu.reg(0x12), 0);

        write_io(&mut apu, 0x11, 0x20, 0);
        assert_ne!(apu.length[ChannelId::Square0.index()].counter, 0);
    }

    #[test]
    fn unused_register_window_reads_as_all_ones_on_dmg() {
        let mut apu = apu();
        assert_eq!(read_io(&mut apu, 0x15, 0), 0xFF);
    }

    #[test]
    fn wave_ram_write_outside_playback_always_lands() {
        let mut apu = apu();
        write_io(&mut apu, 0x30, 0xAB, 0);
        assert_eq!(apu.wave_ram[0][0], 0xAB);
    }
}
