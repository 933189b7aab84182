//! Volume envelope (§4.4): a timer-driven up/down volume sweep clocked by
//! frame-sequencer step 7. Present on square0, square1 and noise; the wave
//! channel has its own fixed-shift DAC instead.

use crate::constants::period_reload;

#[derive(Debug, Clone, Copy, Default)]
pub struct Envelope {
    pub volume: u8,
    pub timer: u8,
    pub disable: bool,
}

impl Envelope {
    pub fn new() -> Envelope {
        Envelope::default()
    }

    /// Advances the envelope by one frame-sequencer step-7 tick. `period`
    /// and `increase` come from the live `NRx2` register. Returns the
    /// candidate volume if this clock produced one, or `None` if nothing
    /// changes (disabled, mid-timer, or a zero period). The caller must
    /// `sync` the owning channel before committing the returned volume with
    /// [`Self::commit_volume`], so the old volume's deltas land before the
    /// new one's.
    ///
    /// The timer decrement is masked to 3 bits (`(timer - 1) & 0x7`) per
    /// the open question in the design notes: two source variants disagree
    /// on masked-vs-unconditional decrement, and the masked form is judged
    /// the more likely hardware behavior.
    pub fn step_candidate(&mut self, period: u8, increase: bool) -> Option<u8> {
        if self.disable {
            return None;
        }

        self.timer = self.timer.wrapping_sub(1) & 0x7;
        if self.timer != 0 {
            return None;
        }

        self.timer = period_reload(period);
        if period == 0 {
            return None;
        }

        let modifier: i8 = if increase { 1 } else { -1 };
        let new_volume = i16::from(self.volume) + i16::from(modifier);

        if (0..=15).contains(&new_volume) {
            Some(new_volume as u8)
        } else {
            self.disable = true;
            None
        }
    }

    /// Commits a volume returned by [`Self::step_candidate`].
    pub fn commit_volume(&mut self, volume: u8) {
        self.volume = volume;
    }

    /// Trigger reload (§4.4): volume and timer reload from `NRx2`; if the
    /// *current* frame-sequencer step is 7 (i.e. the next envelope clock
    /// is due right now), the freshly reloaded timer gets bumped by one so
    /// the very next step-7 clock doesn't fire immediately.
    pub fn trigger(&mut self, start_volume: u8, period: u8, next_step_is_env: bool) {
        self.disable = false;
        self.timer = period_reload(period);
        if next_step_is_env {
            self.timer += 1;
        }
        self.volume = start_volume;
    }

    /// Zombie-mode glitch (§4.4, optional): applying NRx2 mid-play on
    /// DMG/CGB perturbs the live volume instead of cleanly reloading it.
    /// `old_period`/`old_increase` are the envelope fields *before* the
    /// write; `new_increase` is the mode bit after.
    pub fn zombie_write(&mut self, old_period: u8, old_increase: bool, new_increase: bool) {
        if old_period == 0 && !self.disable {
            self.volume = self.volume.wrapping_add(1);
        } else if !old_increase {
            self.volume = self.volume.wrapping_add(2);
        }

        if old_increase != new_increase {
            self.volume = 16u8.wrapping_sub(self.volume);
        }

        self.volume &= 0xF;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_saturates_and_disables_on_overflow() {
        let mut env = Envelope {
            volume: 15,
            timer: 1,
            disable: false,
        };
        assert_eq!(env.step_candidate(1, true), None);
        assert!(env.disable);
        assert_eq!(env.volume, 15);
    }

    #[test]
    fn zero_period_never_steps() {
        let mut env = Envelope::new();
        env.trigger(8, 0, false);
        assert_eq!(env.timer, 8);
        for _ in 0..20 {
            assert_eq!(env.step_candidate(0, true), None);
        }
        assert_eq!(env.volume, 8);
    }

    #[test]
    fn trigger_on_step_seven_bumps_timer() {
        let mut env = Envelope::new();
        env.trigger(0, 3, true);
        assert_eq!(env.timer, 4);
    }
}
