//! AGB direct-sound FIFO write semantics and `timer_overflow` (§4.9).
//! Grounded on `gb_apu.c`'s `GBA` FIFO-handling branch: `fifo_write`,
//! `apu_soundcnt_write`, `apu_timer_overflow`.

use tracing::trace;

use crate::apu::sync;
use crate::apu::Apu;
use crate::channel::ChannelId;
use crate::regs::SoundCntH;

pub(crate) fn soundcnt_write(apu: &mut Apu, value: u16, time: u32) {
    let cnt = SoundCntH::from_bits_retain(value);

    if cnt.contains(SoundCntH::FIFO_A_RESET) {
        apu.fifo[ChannelId::FifoA.index() - 4].reset_indices();
        trace!("soundcnt fifo a reset");
    }
    if cnt.contains(SoundCntH::FIFO_B_RESET) {
        apu.fifo[ChannelId::FifoB.index() - 4].reset_indices();
        trace!("soundcnt fifo b reset");
    }

    sync::channel_sync(apu, ChannelId::FifoA, time);
    sync::channel_sync(apu, ChannelId::FifoB, time);
    apu.soundcnt_h = value;
}

/// Which FIFO (if any) `addr` targets: `0x60..0x64` is FIFO A, `0x68..0x6C`
/// is FIFO B, per the GBA `FIFO_A`/`FIFO_B` MMIO window.
fn fifo_for_addr(addr: u32) -> Option<ChannelId> {
    match addr & !0x3 {
        0x60 => Some(ChannelId::FifoA),
        0x68 => Some(ChannelId::FifoB),
        _ => None,
    }
}

pub(crate) fn fifo_write8(apu: &mut Apu, addr: u32, value: u8) {
    if let Some(id) = fifo_for_addr(addr) {
        apu.fifo[id.index() - 4].write8(addr, value);
    }
}

pub(crate) fn fifo_write16(apu: &mut Apu, addr: u32, value: u16) {
    if let Some(id) = fifo_for_addr(addr) {
        apu.fifo[id.index() - 4].write16(addr, value);
    }
}

pub(crate) fn fifo_write32(apu: &mut Apu, addr: u32, value: u32) {
    if let Some(id) = fifo_for_addr(addr) {
        apu.fifo[id.index() - 4].write32(value);
    }
}

/// Which of the two timers (0 or 1) currently drains a FIFO, per
/// `SOUNDCNT_H`'s per-channel timer-select bit.
fn selected_timer(apu: &Apu, id: ChannelId) -> u8 {
    let cnt = SoundCntH::from_bits_retain(apu.soundcnt_h);
    let bit = match id {
        ChannelId::FifoA => SoundCntH::FIFO_A_TIMER,
        ChannelId::FifoB => SoundCntH::FIFO_B_TIMER,
        _ => unreachable!("only FIFO channels have a timer select"),
    };
    u8::from(cnt.contains(bit))
}

/// Advances FIFO playback on a timer overflow (§4.9). `dma_request` is
/// invoked with the channel and `time` when the ring has room for a DMA
/// refill; the caller performs the actual transfer, this crate only
/// decides when to ask for one.
pub(crate) fn timer_overflow(apu: &mut Apu, timer_num: u8, time: u32, dma_request: &mut dyn FnMut(ChannelId, u32)) {
    for id in [ChannelId::FifoA, ChannelId::FifoB] {
        if selected_timer(apu, id) != timer_num {
            continue;
        }

        let idx = id.index() - 4;

        if apu.fifo[idx].free_slots() > 4 {
            dma_request(id, time);
        }

        if apu.fifo[idx].playing_buffer_index == 0 {
            if let Some(word) = apu.fifo[idx].pop_word() {
                apu.fifo[idx].playing_buffer = word;
                apu.fifo[idx].playing_buffer_index = 4;
            }
        }

        if apu.fifo[idx].playing_buffer_index > 0 {
            sync::channel_sync(apu, id, time);
            apu.fifo[idx].current_sample = (apu.fifo[idx].playing_buffer & 0xFF) as i8;
            apu.fifo[idx].playing_buffer >>= 8;
            apu.fifo[idx].playing_buffer_index -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GbModel;

    fn apu() -> Apu {
        let mut apu = Apu::new(16_777_216.0, 44_100).unwrap();
        apu.reset(GbModel::Agb);
        apu
    }

    #[test]
    fn soundcnt_reset_bit_clears_fifo_indices_not_contents() {
        let mut apu = apu();
        fifo_write32(&mut apu, 0x60, 0xAABBCCDD);
        soundcnt_write(&mut apu, SoundCntH::FIFO_A_RESET.bits(), 0);
        assert_eq!(apu.fifo[0].len(), 0);
    }

    #[test]
    fn timer_overflow_drains_bytes_low_to_high() {
        let mut apu = apu();
        soundcnt_write(&mut apu, 0, 0); // timer 0 selected for both FIFOs by default
        fifo_write32(&mut apu, 0x60, 0x0102_0304);

        let mut requests = Vec::new();
        let mut request = |id: ChannelId, t: u32| requests.push((id, t));

        timer_overflow(&mut apu, 0, 100, &mut request);
        assert_eq!(apu.fifo[0].current_sample, 0x04);
        timer_overflow(&mut apu, 0, 101, &mut request);
        assert_eq!(apu.fifo[0].current_sample, 0x03);
        timer_overflow(&mut apu, 0, 102, &mut request);
        assert_eq!(apu.fifo[0].current_sample, 0x02);
        timer_overflow(&mut apu, 0, 103, &mut request);
        assert_eq!(apu.fifo[0].current_sample, 0x01);
    }

    #[test]
    fn timer_overflow_requests_dma_once_ring_is_mostly_drained() {
        let mut apu = apu();
        soundcnt_write(&mut apu, 0, 0);

        let mut requested = false;
        let mut request = |_id: ChannelId, _t: u32| requested = true;
        timer_overflow(&mut apu, 0, 0, &mut request);
        assert!(requested, "empty ring has more than 4 free slots");
    }
}
