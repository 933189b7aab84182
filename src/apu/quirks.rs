//! Frame-sequencer dispatch and the per-register/trigger edge cases (§4.3
//! length, §4.4 envelope, §4.5 sweep, §4.6 wave/noise trigger quirks).
//! Grounded on `gb_apu.c`'s `frame_sequencer_clock_*`, `len_clock`,
//! `len_on_nrx4_edge_case_write`, `len_trigger`, `sweep_clock`,
//! `sweep_trigger`, `sweep_do_freq_calc`, `env_clock`, `env_trigger`,
//! `env_write` and `trigger`.

use crate::apu::sync::{channel_frequency, channel_sync};
use crate::apu::Apu;
use crate::channel::ChannelId;
use crate::constants::{env_index, env_reg_addr, len_reg_addr, period_reload};
use crate::sweep::SweepCalc;

/// Runs one frame-sequencer tick: dispatches length/sweep/envelope clocks
/// per the current phase, then advances to the next phase (§4.8).
pub(crate) fn frame_sequencer_clock(apu: &mut Apu, time: u32) {
    let actions = apu.sequencer.actions();

    if actions.length {
        for id in ChannelId::PSG {
            len_clock(apu, id, time);
        }
    }
    if actions.sweep {
        sweep_clock(apu, time);
    }
    if actions.envelope {
        for id in [ChannelId::Square0, ChannelId::Square1, ChannelId::Noise] {
            env_clock(apu, id, time);
        }
    }

    apu.sequencer.advance();
}

fn len_clock(apu: &mut Apu, id: ChannelId, time: u32) {
    let idx = id.index();
    if !apu.channel_enabled(id) || !apu.len_enabled(id) || apu.length[idx].counter == 0 {
        return;
    }

    apu.length[idx].counter -= 1;
    if apu.length[idx].counter == 0 {
        channel_sync(apu, id, time);
        apu.channel_disable(id);
    }
}

/// NR11/21/31/41 length-enable edge case (§4.3): enabling the length gate on
/// a step where the *next* frame-sequencer tick isn't a length step steals
/// one extra decrement right away.
pub(crate) fn len_on_nrx4_edge_case_write(apu: &mut Apu, id: ChannelId, new_value: u8, old_value: u8) {
    let idx = id.index();
    let was_enabled = old_value & 0x40 != 0;
    let now_enabled = new_value & 0x40 != 0;

    if !apu.sequencer.next_step_is_not_length() || !now_enabled || was_enabled || apu.length[idx].counter == 0 {
        return;
    }

    apu.length[idx].counter -= 1;
    if apu.length[idx].counter == 0 && new_value & 0x80 == 0 {
        apu.channel_disable(id);
    }
}

/// Trigger-time length reload quirk (§4.3): a trigger into an already-zero
/// counter reloads it full, then immediately steals the edge-case
/// decrement if the length gate is on and the sequencer is mid-cycle.
fn len_trigger(apu: &mut Apu, id: ChannelId) {
    let idx = id.index();
    if apu.length[idx].counter != 0 {
        return;
    }

    apu.length[idx].counter = crate::length::reload_value(id);
    if apu.len_enabled(id) && apu.sequencer.next_step_is_not_length() {
        apu.length[idx].counter -= 1;
    }
}

fn sweep_clock(apu: &mut Apu, time: u32) {
    if !apu.channel_enabled(ChannelId::Square0) || !apu.sweep.enabled {
        return;
    }

    apu.sweep.timer -= 1;
    if apu.sweep.timer != 0 {
        return;
    }

    let nr10 = apu.reg(0x10);
    let period = (nr10 >> 4) & 0x7;
    apu.sweep.timer = period_reload(period);
    if period == 0 {
        return;
    }

    let shift = nr10 & 0x7;
    let negate = nr10 & 0x8 != 0;
    channel_sync(apu, ChannelId::Square0, time);
    sweep_do_freq_calc(apu, shift, negate, true);
    sweep_do_freq_calc(apu, shift, negate, false);
}

/// Runs one sweep frequency calculation; on `update`, a non-overflowing
/// result is committed back to `NR13`/`NR14` and the shadow register.
fn sweep_do_freq_calc(apu: &mut Apu, shift: u8, negate: bool, update: bool) {
    match apu.sweep.calculate(shift, negate) {
        SweepCalc::Overflow => apu.channel_disable(ChannelId::Square0),
        SweepCalc::Ok(new_freq) => {
            if update && shift != 0 {
                apu.sweep.freq_shadow_register = new_freq;
                apu.set_reg(0x13, (new_freq & 0xFF) as u8);
                let nr14 = (apu.reg(0x14) & !0x07) | ((new_freq >> 8) as u8 & 0x7);
                apu.set_reg(0x14, nr14);
            }
        }
    }
}

fn sweep_trigger(apu: &mut Apu) {
    let nr10 = apu.reg(0x10);
    let period = (nr10 >> 4) & 0x7;
    let shift = nr10 & 0x7;
    let negate = nr10 & 0x8 != 0;
    let live_freq = u16::from(apu.reg(0x13)) | (u16::from(apu.reg(0x14) & 0x7) << 8);

    if let Some(SweepCalc::Overflow) = apu.sweep.trigger(live_freq, period, shift, negate) {
        apu.channel_disable(ChannelId::Square0);
    }
}

/// NR10 negate-clear quirk (§4.5): clearing the negate bit after a negate
/// calculation has run since the last trigger disables square0 outright,
/// independent of anything else sweep is doing.
pub(crate) fn on_nrx0_write(apu: &mut Apu, id: ChannelId, new_value: u8, old_value: u8) {
    match id {
        ChannelId::Square0 => {
            let was_negate = old_value & 0x8 != 0;
            let now_negate = new_value & 0x8 != 0;
            if was_negate && !now_negate && apu.sweep.did_negate {
                apu.channel_disable(ChannelId::Square0);
            }
        }
        ChannelId::Wave => {
            if !apu.channel_dac_enabled(ChannelId::Wave) {
                apu.channel_disable(ChannelId::Wave);
            }
        }
        _ => {}
    }
}

/// NRx1 length-load write: always accepted, whether or not the channel (or
/// the APU) is currently enabled.
pub(crate) fn on_nrx1_write(apu: &mut Apu, id: ChannelId, new_value: u8) {
    apu.length[id.index()].load(id, u16::from(new_value));
}

/// NRx2 envelope/DAC write (§4.4): the optional zombie-mode glitch runs
/// first (on DMG/CGB, only while the channel is already playing), then the
/// DAC-disable check, which always runs.
pub(crate) fn on_nrx2_write(apu: &mut Apu, id: ChannelId, time: u32, new_value: u8, old_value: u8) {
    if id != ChannelId::Wave {
        if apu.config.zombie_mode && !apu.model.is_agb() && apu.channel_enabled(id) {
            let env_idx = env_index(id);
            let old_period = old_value & 0x7;
            let old_increase = old_value & 0x8 != 0;
            let new_increase = new_value & 0x8 != 0;

            channel_sync(apu, id, time);
            apu.envelope[env_idx].zombie_write(old_period, old_increase, new_increase);
        }
    }

    if !apu.channel_dac_enabled(id) {
        apu.channel_disable(id);
    }
}

/// NRx4 write (§4.3, §4.6): runs the length edge-case quirk against the
/// byte that's already landed in the register file, then triggers if bit 7
/// is set.
pub(crate) fn on_nrx4_write(apu: &mut Apu, id: ChannelId, time: u32, new_value: u8, old_value: u8) {
    len_on_nrx4_edge_case_write(apu, id, new_value, old_value);
    if new_value & 0x80 != 0 {
        trigger(apu, id, time);
    }
}

/// Trigger dispatch (§4.6): common channel-enable/length/DAC-disable
/// sequencing, with per-channel-kind frequency-timer/envelope/sweep/LFSR
/// reloads. Runs after the write that set the trigger bit has already
/// landed in the register file and after the caller has synced the channel
/// up to `time`.
pub(crate) fn trigger(apu: &mut Apu, id: ChannelId, time: u32) {
    if id == ChannelId::Wave {
        wave_retrigger_corruption(apu);
    }

    apu.channel_enable(id);
    let new_freq = channel_frequency(apu, id);
    len_trigger(apu, id);

    match id {
        ChannelId::Wave => {
            apu.wave.trigger();
            apu.timing[id.index()].frequency_timer = (new_freq + 6 * apu.model.clock_multiplier()) as i32;
        }
        ChannelId::Noise => {
            env_trigger(apu, id);
            apu.noise.trigger();
            apu.timing[id.index()].frequency_timer = new_freq as i32;
        }
        ChannelId::Square0 | ChannelId::Square1 => {
            env_trigger(apu, id);
            let idx = id.index();
            let old_timer = apu.timing[idx].frequency_timer;
            apu.timing[idx].frequency_timer = (old_timer & 0x3) | (new_freq as i32 & !0x3);
            if id == ChannelId::Square0 {
                sweep_trigger(apu);
            }
        }
        ChannelId::FifoA | ChannelId::FifoB => unreachable!("FIFO channels have no NRx4 trigger bit"),
    }

    if !apu.channel_dac_enabled(id) {
        apu.channel_disable(id);
    }
    if apu.channel_enabled(id) {
        apu.timing[id.index()].timestamp = time;
    }
}

fn env_trigger(apu: &mut Apu, id: ChannelId) {
    let env_idx = env_index(id);
    let reg = apu.reg(u16::from(env_reg_addr(id)));
    let period = reg & 0x7;
    let start_volume = reg >> 4;
    let next_is_env = apu.sequencer.current_step_is_envelope();
    apu.envelope[env_idx].trigger(start_volume, period, next_is_env);
}

/// Envelope clock (§4.4): delegates the timer/volume arithmetic to
/// [`crate::envelope::Envelope::step_candidate`], splicing the channel sync
/// between computing the candidate volume and committing it — the reference
/// core syncs at exactly that point, so the old volume's deltas land before
/// the new one's.
fn env_clock(apu: &mut Apu, id: ChannelId, time: u32) {
    if !apu.channel_enabled(id) {
        return;
    }

    let env_idx = env_index(id);
    let reg = apu.reg(u16::from(env_reg_addr(id)));
    let period = reg & 0x7;
    let increase = reg & 0x8 != 0;

    if let Some(new_volume) = apu.envelope[env_idx].step_candidate(period, increase) {
        channel_sync(apu, id, time);
        apu.envelope[env_idx].commit_volume(new_volume);
    }
}

/// DMG wave-RAM corruption on early retrigger (§4.6): retriggering wave
/// while it's already playing and its frequency timer has 2 cycles or less
/// left corrupts the first one or four bytes of wave RAM, copied from
/// whichever byte the channel was about to fetch next. DMG-only; CGB and
/// AGB don't reproduce this glitch.
fn wave_retrigger_corruption(apu: &mut Apu) {
    if !apu.model.is_dmg() || !apu.channel_enabled(ChannelId::Wave) {
        return;
    }
    if apu.timing[ChannelId::Wave.index()].frequency_timer > 2 {
        return;
    }

    let index = usize::from((apu.wave.position_counter.wrapping_add(1) % 32) >> 1);
    if index < 4 {
        apu.wave_ram[0][0] = apu.wave_ram[0][index];
    } else {
        let base = index & !3;
        let copied: [u8; 4] = apu.wave_ram[0][base..base + 4].try_into().unwrap();
        apu.wave_ram[0][0..4].copy_from_slice(&copied);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apu() -> Apu {
        Apu::new(4_194_304.0, 44_100).unwrap()
    }

    #[test]
    fn len_edge_case_steals_one_decrement_on_mid_cycle_enable() {
        let mut apu = apu();
        apu.channel_enable(ChannelId::Square0);
        apu.length[ChannelId::Square0.index()].counter = 2;
        apu.sequencer.index = 1; // odd index -> next step is not a length step

        len_on_nrx4_edge_case_write(&mut apu, ChannelId::Square0, 0x40, 0x00);
        assert_eq!(apu.length[ChannelId::Square0.index()].counter, 1);
    }

    #[test]
    fn len_edge_case_disables_channel_when_it_steals_the_last_decrement() {
        let mut apu = apu();
        apu.channel_enable(ChannelId::Square0);
        apu.length[ChannelId::Square0.index()].counter = 1;
        apu.sequencer.index = 1;

        len_on_nrx4_edge_case_write(&mut apu, ChannelId::Square0, 0x40, 0x00);
        assert!(!apu.channel_enabled(ChannelId::Square0));
    }

    #[test]
    fn trigger_reloads_zeroed_length_counter_full() {
        let mut apu = apu();
        apu.set_reg(0x14, 0x00);
        trigger(&mut apu, ChannelId::Square0, 0);
        assert_eq!(apu.length[ChannelId::Square0.index()].counter, 64);
    }

    #[test]
    fn negate_clear_after_negate_calc_disables_square0() {
        let mut apu = apu();
        apu.set_reg(0x10, 0b0111_1000); // period 7, negate, shift 0
        apu.channel_enable(ChannelId::Square0);
        apu.sweep.did_negate = true;

        on_nrx0_write(&mut apu, ChannelId::Square0, 0b0111_0000, 0b0111_1000);
        assert!(!apu.channel_enabled(ChannelId::Square0));
    }

    #[test]
    fn wave_retrigger_corrupts_low_byte_when_index_under_four() {
        let mut apu = Apu::new(4_194_304.0, 44_100).unwrap();
        assert!(apu.model().is_dmg());

        apu.channel_enable(ChannelId::Wave);
        apu.timing[ChannelId::Wave.index()].frequency_timer = 1;
        apu.wave.position_counter = 4; // next index = (5)>>1 = 2
        apu.wave_ram[0][2] = 0xAB;

        wave_retrigger_corruption(&mut apu);
        assert_eq!(apu.wave_ram[0][0], 0xAB);
    }

    #[test]
    fn wave_retrigger_leaves_ram_untouched_when_timer_has_slack() {
        let mut apu = apu();
        apu.channel_enable(ChannelId::Wave);
        apu.timing[ChannelId::Wave.index()].frequency_timer = 10;
        let before = apu.wave_ram[0];

        wave_retrigger_corruption(&mut apu);
        assert_eq!(apu.wave_ram[0], before);
    }

    #[test]
    fn env_trigger_on_step_seven_bumps_timer_like_bare_envelope() {
        let mut apu = apu();
        apu.sequencer.index = 7;
        apu.set_reg(0x12, 0b0000_0011); // start volume 0, increase, period 3
        env_trigger(&mut apu, ChannelId::Square0);
        assert_eq!(apu.envelope[env_index(ChannelId::Square0)].timer, 4);
    }
}
