use thiserror::Error;

use crate::model::GbModel;

/// The narrow error surface of this crate. Out-of-range register addresses
/// and writes while the APU is disabled are *not* errors — hardware drops
/// them silently, and so does this crate (see the module docs on
/// [`crate::Apu::write_io`]).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ApuError {
    /// The band-limited synthesis buffers could not be allocated for the
    /// requested sample rate.
    #[error("failed to allocate synthesis buffer for sample rate {sample_rate}")]
    BufferAlloc { sample_rate: u32 },

    /// `save_state`/`load_state` was handed a buffer of the wrong size.
    #[error("state buffer size mismatch: expected {expected}, got {actual}")]
    StateSizeMismatch { expected: usize, actual: usize },

    /// An operation specific to one model (CGB's PCM peeks, AGB's FIFO/
    /// SOUNDCNT/SOUNDBIAS MMIO) was invoked against an incompatible model.
    #[error("operation requires {needed:?}, but this core is running as {actual:?}")]
    WrongModel { needed: GbModel, actual: GbModel },
}

pub type Result<T> = std::result::Result<T, ApuError>;
