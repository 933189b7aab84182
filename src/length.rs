//! Length counter (§4.3): a down-counter that, when enabled via `NRx4` bit
//! 6, silences its owning channel once it reaches zero. One instance per
//! PSG channel (reload values 64/64/256/64 for square0/square1/wave/noise).
//!
//! The actual clocking and the NRx4-write/trigger edge cases (§4.3) need the
//! frame-sequencer phase and the owning channel's enable bit, both of which
//! live on [`crate::apu::Apu`]; this type only holds the counter itself and
//! the invariant `0 <= counter <= reload`.

use crate::channel::ChannelId;

/// Reload value for a full length counter, indexed by channel.
pub fn reload_value(id: ChannelId) -> u16 {
    match id {
        ChannelId::Wave => 256,
        _ => 64,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LengthCounter {
    pub counter: u16,
}

impl LengthCounter {
    pub fn new() -> LengthCounter {
        LengthCounter::default()
    }

    /// Reloads the counter from an `NRx1` length-load write: `reload - (raw
    /// & (reload - 1))`, per `on_nrx1_write` in the reference core.
    pub fn load(&mut self, id: ChannelId, raw_len_field: u16) {
        let reload = reload_value(id);
        self.counter = reload - (raw_len_field & (reload - 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_values_match_hardware() {
        assert_eq!(reload_value(ChannelId::Square0), 64);
        assert_eq!(reload_value(ChannelId::Square1), 64);
        assert_eq!(reload_value(ChannelId::Wave), 256);
        assert_eq!(reload_value(ChannelId::Noise), 64);
    }

    #[test]
    fn load_computes_complement_of_raw_field() {
        let mut len = LengthCounter::new();
        len.load(ChannelId::Square0, 63);
        assert_eq!(len.counter, 1);

        len.load(ChannelId::Wave, 0);
        assert_eq!(len.counter, 256);
    }
}
