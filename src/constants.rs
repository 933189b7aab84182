//! Immutable lookup tables shared by the register file and the channel
//! synthesizers: duty cycles, wave RAM power-on patterns, read-or/read-mask
//! tables, the AGB register address translation table and the noise
//! divisor table.

use crate::channel::ChannelId;
use crate::model::GbModel;

/// Maps a raw 3-bit `NRx2`/`NR10` period field to its reload value; `0`
/// reads back as `8` everywhere a period/sweep-time timer is reloaded.
pub fn period_reload(period: u8) -> u8 {
    if period == 0 {
        8
    } else {
        period
    }
}

/// `NRx4` address for each PSG channel, used to read the length-enable bit
/// and to know which register a length-load write landed on.
pub fn len_reg_addr(id: ChannelId) -> u8 {
    match id {
        ChannelId::Square0 => 0x14,
        ChannelId::Square1 => 0x19,
        ChannelId::Wave => 0x1E,
        ChannelId::Noise => 0x23,
        ChannelId::FifoA | ChannelId::FifoB => unreachable!("FIFO channels have no length counter"),
    }
}

/// `NRx2` address for each envelope-bearing PSG channel (wave has no
/// envelope; it gates its DAC off `NR30` instead).
pub fn env_reg_addr(id: ChannelId) -> u8 {
    match id {
        ChannelId::Square0 => 0x12,
        ChannelId::Square1 => 0x17,
        ChannelId::Noise => 0x21,
        _ => unreachable!("only square/noise channels have an envelope"),
    }
}

/// Index into `Apu::envelope` (one entry per envelope-bearing channel —
/// wave has no envelope, so this is a separate, denser mapping from
/// [`ChannelId::index`]).
pub fn env_index(id: ChannelId) -> usize {
    match id {
        ChannelId::Square0 => 0,
        ChannelId::Square1 => 1,
        ChannelId::Noise => 2,
        _ => unreachable!("only square/noise channels have an envelope"),
    }
}

/// `NRx1` address for each square channel, used to read the live duty
/// selector (bits 6-7) on every sync.
pub fn duty_reg_addr(id: ChannelId) -> u8 {
    match id {
        ChannelId::Square0 => 0x11,
        ChannelId::Square1 => 0x16,
        _ => unreachable!("only square channels have a duty selector"),
    }
}

/// Wave DAC volume multiplier selected by `NR32` bits 5-6 (and, on AGB, the
/// extra 75% bit): `raw = (((nibble) * 2 - 15) * multiplier) >> 2`. `0`
/// mutes the channel outright; `4` is full scale; `1`/`2` are 25%/50%; `3`
/// (AGB-only) is 75%.
pub fn wave_volume_multiplier(vol_code: u8, agb_full: bool) -> u8 {
    if agb_full {
        return 3;
    }
    match vol_code & 0x3 {
        0 => 0,
        1 => 4,
        2 => 2,
        3 => 1,
        _ => unreachable!(),
    }
}

/// Square/pulse duty-cycle patterns, one bit per step of the 8-step duty
/// cycle. Bit `n` is tested as `(pattern >> duty_index) & 1`.
pub const SQUARE_DUTY_DMG: [u8; 4] = [
    0b0000_0001, // 12.5%
    0b1000_0001, // 25%
    0b1000_0111, // 50%
    0b0111_1110, // 75%
];

/// AGB's square DAC polarity is inverted relative to DMG/CGB.
pub const SQUARE_DUTY_AGB: [u8; 4] = [
    !SQUARE_DUTY_DMG[0],
    !SQUARE_DUTY_DMG[1],
    !SQUARE_DUTY_DMG[2],
    !SQUARE_DUTY_DMG[3],
];

pub fn square_duty_table(model: GbModel) -> &'static [u8; 4] {
    match model {
        GbModel::Agb => &SQUARE_DUTY_AGB,
        GbModel::Dmg | GbModel::Cgb => &SQUARE_DUTY_DMG,
    }
}

/// Wave RAM power-on contents, per model. DMG has a fixed noisy pattern;
/// CGB/AGB power on with an alternating `00 FF` pattern.
pub const WAVE_RAM_POWERON_DMG: [u8; 16] = [
    0x84, 0x40, 0x43, 0xAA, 0x2D, 0x78, 0x92, 0x3C, 0x60, 0x59, 0x59, 0xB0, 0x34, 0xB8, 0x2E, 0xDA,
];

pub const WAVE_RAM_POWERON_CGB: [u8; 16] = [
    0x00, 0xFF, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0xFF,
];

pub fn wave_ram_poweron(model: GbModel) -> &'static [u8; 16] {
    match model {
        GbModel::Dmg => &WAVE_RAM_POWERON_DMG,
        GbModel::Cgb | GbModel::Agb => &WAVE_RAM_POWERON_CGB,
    }
}

/// Noise LFSR divisor table (pre clock-shift). Multiplied by 4 on AGB.
pub const NOISE_DIVISOR_TABLE: [u32; 8] = [8, 16, 32, 48, 64, 80, 96, 112];

/// `read_io` OR-mask for the DMG/CGB register window 0x10..=0x3F, indexed by
/// `addr - 0x10`. Unused bits always read high.
pub const READ_OR_MASK_DMG: [u8; 0x30] = [
    0x80, 0x3F, 0x00, 0xFF, 0xBF, // FF10..FF14 (NR10..NR14)
    0xFF, 0x3F, 0x00, 0xFF, 0xBF, // FF15..FF19 (NR15 unused, NR21..NR24)
    0x7F, 0xFF, 0x9F, 0xFF, 0xBF, // FF1A..FF1E (NR30..NR34)
    0xFF, 0xFF, 0x00, 0x00, 0xBF, // FF1F..FF23 (NR1F unused, NR41..NR44)
    0x00, 0x00, 0x70, 0xFF, 0xFF, // FF24..FF28 (NR50..NR52, FF27/28 unused)
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // FF29..FF2D unused
    0xFF, 0xFF, 0x00, 0x00, 0x00, // FF2E..FF32 (FF2E/2F unused, wave RAM starts FF30)
    0x00, 0x00, 0x00, 0x00, 0x00, // FF33..FF37 wave RAM
    0x00, 0x00, 0x00, 0x00, 0x00, // FF38..FF3C wave RAM
    0x00, 0x00, 0x00, // FF3D..FF3F wave RAM
];

/// AGB applies a read *mask* (bitwise AND, not OR) to the same register
/// window. Registers that only half-expose their bits on read (the AGB MMIO
/// is stricter about write-only fields) use this table instead.
pub const READ_MASK_AGB: [u8; 0x30] = [
    0xFF, 0xC0, 0xFF, 0x00, 0xC7, // FF10..FF14
    0x00, 0xC0, 0xFF, 0x00, 0xC7, // FF15..FF19
    0xE0, 0x00, 0xE0, 0x00, 0xC7, // FF1A..FF1E
    0x00, 0x3F, 0xFF, 0x00, 0xC0, // FF1F..FF23
    0xFF, 0xFF, 0xFF, 0x00, 0x00, // FF24..FF28
    0x00, 0x00, 0x00, 0x00, 0x00, // FF29..FF2D
    0x00, 0x00, 0xFF, 0xFF, 0xFF, // FF2E..FF32
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // FF33..FF37
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // FF38..FF3C
    0xFF, 0xFF, 0xFF, // FF3D..FF3F
];

/// Maps AGB MMIO addresses in `0x60..=0x9F` to their DMG-register
/// equivalent (offset from `0x10`). `0xFF` is the sentinel for "unused /
/// gap", used by 16-bit accesses that straddle a hole (e.g. NR15/NR1F).
pub const AGB_TO_DMG_ADDR: [u8; 0x40] = [
    0x10, 0x11, 0x12, 0x13, 0x14, 0xFF, // 60..65
    0x16, 0x17, 0x18, 0x19, 0xFF, 0xFF, // 66..6B
    0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0xFF, // 6C..71
    0x20, 0x21, 0x22, 0x23, 0xFF, 0xFF, // 72..77
    0x24, 0x25, 0x26, 0xFF, 0xFF, 0xFF, // 78..7D
    0xFF, 0xFF, // 7E..7F
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, // 80..87 (wave RAM bank 0)
    0x38, 0x39, 0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F, // 88..8F (wave RAM bank 0, cont.)
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // 90..97 (wave RAM bank 1, handled separately)
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // 98..9F (wave RAM bank 1, cont.)
];

pub const AGB_UNUSED: u8 = 0xFF;
