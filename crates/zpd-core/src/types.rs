//! Common types for zpd
//!
//! Sample type and engine-wide defaults shared by the DSP chain, the
//! configuration layer and the runner.

/// Audio sample type (32-bit float, as exchanged with hosts)
pub type Sample = f32;

/// Default sample rate used when an instance has never been prepared
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default DSP block size (one control tick of the reference engine)
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Upper bound accepted by `prepare` for the block size
pub const MAX_BLOCK_SIZE: usize = 8192;

/// Upper bound accepted by `prepare` for channel counts
pub const MAX_CHANNELS: usize = 64;

/// Nested message deliveries allowed before a dispatch is aborted
///
/// A patch that routes a send back into its own receive would otherwise
/// recurse until the stack overflows.
pub const MAX_MESSAGE_DEPTH: usize = 512;

/// First dollar-zero handed out to a loaded patch
pub const FIRST_DOLLAR_ZERO: i32 = 1000;

/// Engine version triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub bug: u32,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.bug)
    }
}
