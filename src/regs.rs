//! `SOUNDCNT_H` bitflags (§4.9): the one register this crate consumes as a
//! bitfield from several unrelated call sites (FIFO sync, `timer_overflow`,
//! `soundcnt_write`), unlike the DMG/CGB `NRxx` window, which stays a flat
//! byte array (see `SPEC_FULL.md` §3) because its bits are almost always
//! read back in the same place they were last written.

use bitflags::bitflags;

bitflags! {
    /// SOUNDCNT_H — AGB-only DMA sound control (R/W, 16-bit)
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SoundCntH: u16 {
        const PSG_VOL       = 0b0000_0000_0000_0011;
        const FIFO_A_VOL    = 0b0000_0000_0000_0100;
        const FIFO_B_VOL    = 0b0000_0000_0000_1000;
        const FIFO_A_R_EN   = 0b0000_0001_0000_0000;
        const FIFO_A_L_EN   = 0b0000_0010_0000_0000;
        const FIFO_A_TIMER  = 0b0000_0100_0000_0000;
        const FIFO_A_RESET  = 0b0000_1000_0000_0000;
        const FIFO_B_R_EN   = 0b0001_0000_0000_0000;
        const FIFO_B_L_EN   = 0b0010_0000_0000_0000;
        const FIFO_B_TIMER  = 0b0100_0000_0000_0000;
        const FIFO_B_RESET  = 0b1000_0000_0000_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_reset_bits_are_independent() {
        let cnt = SoundCntH::from_bits_retain(SoundCntH::FIFO_A_RESET.bits());
        assert!(cnt.contains(SoundCntH::FIFO_A_RESET));
        assert!(!cnt.contains(SoundCntH::FIFO_B_RESET));
    }
}
