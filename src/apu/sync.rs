//! The per-channel catch-up algorithm (§4.2): advances a channel's local
//! clock up to a target time, deposits any deltas its amplitude picked up
//! along the way into the band-limited buffer, and steps the owning
//! generator (duty index, wave position, LFSR) as many times as its
//! frequency timer allows. Grounded directly on `channel_sync`/`add_delta`
//! in `gb_apu.c`; the AGB PSG-shift and wave bank-select/inversion paths are
//! this crate's generalization of that DMG/CGB-only routine to the wider
//! model set §4.2 describes.

use crate::apu::Apu;
use crate::channel::ChannelId;
use crate::regs::SoundCntH;

/// Deposits a (possibly zero) delta for both stereo channels, mirroring
/// `add_delta`/`add_delta_fast` in the reference core: the delta is only
/// pushed into the band-limited buffer when the sample actually changed,
/// and `amp` is updated to match so the next call sees the right baseline.
fn deposit(apu: &mut Apu, id: ChannelId, clock: u32, left: i32, right: i32, fast: bool) {
    let idx = id.index();
    let amp = apu.timing[idx].amp;

    let dl = left - amp[0];
    if dl != 0 {
        if fast {
            apu.buffer.add_delta_fast(clock, dl, 0);
        } else {
            apu.buffer.add_delta(clock, dl, 0);
        }
        apu.timing[idx].amp[0] = left;
    }

    let dr = right - amp[1];
    if dr != 0 {
        if fast {
            apu.buffer.add_delta_fast(clock, dr, 1);
        } else {
            apu.buffer.add_delta(clock, dr, 1);
        }
        apu.timing[idx].amp[1] = right;
    }
}

/// Synchronizes one channel's state up to `time` (§4.2 steps 1-6).
pub(crate) fn channel_sync(apu: &mut Apu, id: ChannelId, time: u32) {
    match id {
        ChannelId::FifoA | ChannelId::FifoB => fifo_sync(apu, id, time),
        _ => psg_sync(apu, id, time),
    }
}

fn psg_sync(apu: &mut Apu, id: ChannelId, time: u32) {
    let idx = id.index();
    let base_clock = apu.timing[idx].clock;
    let until = time.wrapping_sub(apu.timing[idx].timestamp) as i32;

    apu.timing[idx].clock = apu.timing[idx].clock.wrapping_add(until as u32);
    apu.timing[idx].timestamp = time;

    if until <= 0 {
        return;
    }

    let freq_timer = apu.timing[idx].frequency_timer;
    let from = if freq_timer > until {
        base_clock.wrapping_add(until as u32)
    } else {
        base_clock.wrapping_add(freq_timer as u32)
    };

    if !apu.apu_enabled() || !apu.channel_enabled(id) {
        deposit(apu, id, from, 0, 0, matches!(id, ChannelId::Wave | ChannelId::Noise));
        return;
    }

    let mut left_volume = i32::from(apu.nr51_left(id)) * (1 + i32::from(apu.nr50_left_vol()));
    let mut right_volume = i32::from(apu.nr51_right(id)) * (1 + i32::from(apu.nr50_right_vol()));
    if apu.model.is_agb() {
        let shift = apu.agb_psg_shift();
        left_volume >>= shift;
        right_volume >>= shift;
    }

    let freq = channel_frequency(apu, id);
    apu.timing[idx].frequency_timer -= until;

    match id {
        ChannelId::Square0 | ChannelId::Square1 => sync_square(apu, id, from, freq, left_volume, right_volume),
        ChannelId::Wave => sync_wave(apu, id, from, freq, left_volume, right_volume),
        ChannelId::Noise => sync_noise(apu, id, from, freq, left_volume, right_volume),
        ChannelId::FifoA | ChannelId::FifoB => unreachable!(),
    }
}

/// Host-cycle period between this channel's periodic events (§4.2
/// "Frequency formulas"), already scaled ×4 on AGB.
pub(crate) fn channel_frequency(apu: &Apu, id: ChannelId) -> u32 {
    let mul = apu.model.clock_multiplier();
    match id {
        ChannelId::Square0 => {
            let encoded = u32::from(apu.reg(0x13)) | (u32::from(apu.reg(0x14) & 0x7) << 8);
            (2048 - encoded) * 4 * mul
        }
        ChannelId::Square1 => {
            let encoded = u32::from(apu.reg(0x18)) | (u32::from(apu.reg(0x19) & 0x7) << 8);
            (2048 - encoded) * 4 * mul
        }
        ChannelId::Wave => {
            let encoded = u32::from(apu.reg(0x1D)) | (u32::from(apu.reg(0x1E) & 0x7) << 8);
            (2048 - encoded) * 2 * mul
        }
        ChannelId::Noise => {
            let nr43 = apu.reg(0x22);
            let divisor = crate::constants::NOISE_DIVISOR_TABLE[usize::from(nr43 & 0x7)];
            (divisor << (nr43 >> 4)) * mul
        }
        ChannelId::FifoA | ChannelId::FifoB => unreachable!(),
    }
}

fn sync_square(apu: &mut Apu, id: ChannelId, mut from: u32, freq: u32, left_volume: i32, right_volume: i32) {
    let idx = id.index();
    let channel_vol = apu.config.channel_volume(idx);
    let env_idx = crate::constants::env_index(id);
    let duty_table = *crate::constants::square_duty_table(apu.model);
    let duty_sel = usize::from(apu.reg(crate::constants::duty_reg_addr(id)) >> 6);
    let pattern = duty_table[duty_sel];

    let vol = i32::from(apu.envelope[env_idx].volume);
    let mut bit = apu.square[idx].duty_bit(pattern);
    let mut sign = if bit { 1 } else { -1 };
    let mut left = apu.buffer.apply_volume_to_sample(vol * left_volume * sign, channel_vol);
    let mut right = apu.buffer.apply_volume_to_sample(vol * right_volume * sign, channel_vol);
    deposit(apu, id, from, left, right, false);

    while apu.timing[idx].frequency_timer <= 0 {
        let new_bit = apu.square[idx].step(pattern);
        if new_bit != bit {
            bit = new_bit;
            sign = if bit { 1 } else { -1 };
            left = vol * left_volume * sign;
            right = vol * right_volume * sign;
            left = apu.buffer.apply_volume_to_sample(left, channel_vol);
            right = apu.buffer.apply_volume_to_sample(right, channel_vol);
            deposit(apu, id, from, left, right, false);
        }

        from = from.wrapping_add(freq);
        apu.timing[idx].frequency_timer += freq as i32;
    }
}

/// Picks the 16-byte wave-RAM bank a fetch should land in, given the
/// position counter and whether AGB dual-bank (64-sample) mode is active
/// (§4.2 "Wave"). DMG/CGB always play bank 0.
fn active_wave_bank(apu: &Apu, position_counter: u8, bank_mode_64: bool) -> usize {
    if !apu.model.is_agb() {
        return 0;
    }
    if bank_mode_64 {
        usize::from(position_counter >= 32)
    } else {
        usize::from(apu.reg(0x1A) & 0x40 != 0)
    }
}

fn sync_wave(apu: &mut Apu, id: ChannelId, mut from: u32, freq: u32, left_volume: i32, right_volume: i32) {
    let idx = id.index();
    let channel_vol = apu.config.channel_volume(idx);

    let nr32 = apu.reg(0x1C);
    let agb_full = apu.model.is_agb() && nr32 & 0x80 != 0;
    let multiplier = i32::from(crate::constants::wave_volume_multiplier((nr32 >> 5) & 0x3, agb_full));
    let bank_mode = apu.model.is_agb() && apu.reg(0x1A) & 0x20 != 0;
    let invert = apu.model.is_agb() && apu.reg(0x1A) & 0x08 != 0;

    let wave_sample = |nibble: u8| -> i32 {
        let n = if invert { nibble ^ 0xF } else { nibble };
        ((i32::from(n) * 2 - 15) * multiplier) >> 2
    };

    let mut sample = wave_sample(apu.wave.current_nibble());
    let mut left = apu.buffer.apply_volume_to_sample(sample * left_volume, channel_vol);
    let mut right = apu.buffer.apply_volume_to_sample(sample * right_volume, channel_vol);
    deposit(apu, id, from, left, right, true);

    apu.wave.just_accessed = false;
    while apu.timing[idx].frequency_timer <= 0 {
        apu.wave.advance(bank_mode);
        if apu.wave.should_fetch() {
            let bank = active_wave_bank(apu, apu.wave.position_counter, bank_mode);
            let byte_idx = apu.wave.fetch_byte_index();
            apu.wave.sample_buffer = apu.wave_ram[bank][byte_idx];
            apu.wave.just_accessed = true;
        }

        sample = wave_sample(apu.wave.current_nibble());
        left = apu.buffer.apply_volume_to_sample(sample * left_volume, channel_vol);
        right = apu.buffer.apply_volume_to_sample(sample * right_volume, channel_vol);
        deposit(apu, id, from, left, right, true);

        from = from.wrapping_add(freq);
        apu.timing[idx].frequency_timer += freq as i32;
    }
}

fn sync_noise(apu: &mut Apu, id: ChannelId, mut from: u32, freq: u32, left_volume: i32, right_volume: i32) {
    let idx = id.index();
    let channel_vol = apu.config.channel_volume(idx);
    let env_idx = crate::constants::env_index(id);
    let vol = i32::from(apu.envelope[env_idx].volume);

    let mut bit0 = apu.noise.bit0();
    let mut sign = if bit0 { -1 } else { 1 };
    let mut left = apu.buffer.apply_volume_to_sample(vol * left_volume * sign, channel_vol);
    let mut right = apu.buffer.apply_volume_to_sample(vol * right_volume * sign, channel_vol);
    deposit(apu, id, from, left, right, true);

    let nr43 = apu.reg(0x22);
    let clock_shift = nr43 >> 4;
    let narrow = nr43 & 0x08 != 0;

    // A clock shift of 14/15, or an LFSR that's somehow reached zero,
    // freezes stepping entirely (§4.2, §4.7): the frequency timer is never
    // replenished, so this channel produces no further deltas until the
    // next trigger.
    if apu.noise.lfsr != 0 && clock_shift < 14 {
        while apu.timing[idx].frequency_timer <= 0 {
            let new_bit0 = apu.noise.step(narrow);
            if new_bit0 != bit0 {
                bit0 = new_bit0;
                sign = if bit0 { -1 } else { 1 };
                left = apu.buffer.apply_volume_to_sample(vol * left_volume * sign, channel_vol);
                right = apu.buffer.apply_volume_to_sample(vol * right_volume * sign, channel_vol);
                deposit(apu, id, from, left, right, true);
            }

            from = from.wrapping_add(freq);
            apu.timing[idx].frequency_timer += freq as i32;
        }
    }
}

fn fifo_sync(apu: &mut Apu, id: ChannelId, time: u32) {
    let idx = id.index();
    let until = time.wrapping_sub(apu.timing[idx].timestamp) as i32;

    apu.timing[idx].clock = apu.timing[idx].clock.wrapping_add(until as u32);
    apu.timing[idx].timestamp = time;

    if until <= 0 {
        return;
    }

    let clock = apu.timing[idx].clock;

    if !apu.apu_enabled() {
        deposit(apu, id, clock, 0, 0, true);
        return;
    }

    let (left, right) = fifo_raw_lr(apu, id);
    deposit(apu, id, clock, left, right, true);
}

/// FIFO raw sample (§4.2, §4.9): `current_sample * (volume_code ? 4 : 2)`,
/// gated independently per stereo side by `SOUNDCNT_H`'s enable bits.
fn fifo_raw_lr(apu: &Apu, id: ChannelId) -> (i32, i32) {
    let cnt = SoundCntH::from_bits_retain(apu.soundcnt_h);
    let fifo = &apu.fifo[id.index() - 4];
    let channel_vol = apu.config.channel_volume(id.index());

    let (vol_bit, l_en, r_en) = match id {
        ChannelId::FifoA => (cnt.contains(SoundCntH::FIFO_A_VOL), cnt.contains(SoundCntH::FIFO_A_L_EN), cnt.contains(SoundCntH::FIFO_A_R_EN)),
        ChannelId::FifoB => (cnt.contains(SoundCntH::FIFO_B_VOL), cnt.contains(SoundCntH::FIFO_B_L_EN), cnt.contains(SoundCntH::FIFO_B_R_EN)),
        _ => unreachable!(),
    };

    let raw = i32::from(fifo.current_sample) * if vol_bit { 4 } else { 2 };
    let left = if l_en { apu.buffer.apply_volume_to_sample(raw, channel_vol) } else { 0 };
    let right = if r_en { apu.buffer.apply_volume_to_sample(raw, channel_vol) } else { 0 };
    (left, right)
}
