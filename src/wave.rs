//! Wave channel synthesizer state (§4.2, §4.6). Plays back 4-bit nibbles
//! from wave RAM (32 samples on DMG/CGB, up to 64 on AGB's bank-mode).
//! Wave RAM itself and the bank-select/bank-mode/inversion bits live in the
//! register file on `Apu`; this struct only tracks playback position.

#[derive(Debug, Clone, Copy, Default)]
pub struct Wave {
    /// Last-fetched byte (a pair of nibbles); re-fetched only when stepping
    /// onto an even position.
    pub sample_buffer: u8,
    /// `0..32` on DMG/CGB and AGB non-bank-mode; `0..64` in AGB bank-mode.
    pub position_counter: u8,
    /// Set for exactly the cycle a DMG wave-RAM fetch lands on; backs the
    /// `just_accessed` read quirk (§4.10, §9 open question).
    pub just_accessed: bool,
}

impl Wave {
    pub fn new() -> Wave {
        Wave::default()
    }

    pub fn trigger(&mut self) {
        self.position_counter = 0;
    }

    /// Advances the position counter by one sample, modulo 32 (or 64 in
    /// AGB bank-mode). Returns the new position so the caller can decide
    /// whether to re-fetch `sample_buffer`.
    pub fn advance(&mut self, bank_mode_64: bool) -> u8 {
        let modulus = if bank_mode_64 { 64 } else { 32 };
        self.position_counter = (self.position_counter + 1) % modulus;
        self.position_counter
    }

    /// Wave RAM is re-fetched only when the position counter lands on an
    /// even index (i.e. we're about to play the *high* nibble of a new
    /// byte).
    pub fn should_fetch(self) -> bool {
        self.position_counter & 1 == 0
    }

    /// Extracts the nibble currently due to play from `sample_buffer`: the
    /// high nibble on an even position, the low nibble on odd.
    pub fn current_nibble(self) -> u8 {
        if self.position_counter & 1 == 1 {
            self.sample_buffer & 0xF
        } else {
            self.sample_buffer >> 4
        }
    }

    /// Byte index into the currently-selected 16-byte wave RAM bank for
    /// the position counter's *next* fetch point.
    pub fn fetch_byte_index(self) -> usize {
        usize::from(self.position_counter >> 1) % 16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_wraps_at_32_outside_bank_mode() {
        let mut wave = Wave::new();
        for _ in 0..32 {
            wave.advance(false);
        }
        assert_eq!(wave.position_counter, 0);
    }

    #[test]
    fn advance_wraps_at_64_in_bank_mode() {
        let mut wave = Wave::new();
        for _ in 0..64 {
            wave.advance(true);
        }
        assert_eq!(wave.position_counter, 0);
    }

    #[test]
    fn nibble_parity_selects_high_or_low() {
        let wave = Wave {
            sample_buffer: 0xAB,
            position_counter: 0,
            just_accessed: false,
        };
        assert_eq!(wave.current_nibble(), 0xA);
        let wave = Wave {
            position_counter: 1,
            ..wave
        };
        assert_eq!(wave.current_nibble(), 0xB);
    }
}
