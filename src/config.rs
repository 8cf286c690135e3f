//! Buffer configuration knobs
//!
//! Every knob is a plain number with a default taken from the tuner server's
//! stock settings. Loading these from a config store is left to the caller.

use std::time::Duration;

/// Default starting capacity of a stream buffer (7.5 MiB)
pub const DEFAULT_CAPACITY: usize = 7_864_320;

/// Default number of bytes a [`TransferBuffer`](crate::TransferBuffer) collects
/// before waking its reader
pub const DEFAULT_MIN_TRANSFER_SIZE: usize = 8192;

/// Default size of a [`TransferBuffer`](crate::TransferBuffer)
pub const DEFAULT_TRANSFER_CAPACITY: usize = 1_328_000;

/// What a buffer does with a write that does not fit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowMode {
    /// Discard the payload and count it as lost
    Drop,
    /// Queue the payload outside the ring and drain it back in later
    #[default]
    Spill,
    /// Reallocate a larger ring, then use `fallback` once the ceiling is hit
    Grow {
        /// Behavior once `max_capacity` has been reached
        fallback: GrowthFallback,
    },
}

/// Overflow behavior of a grown-out buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthFallback {
    /// Drop writes that do not fit
    Drop,
    /// Spill writes that do not fit into the overflow queue
    Spill,
}

/// Invalid combination of buffer knobs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The ring needs at least two bytes: one usable and one reserved
    #[error("capacity must be at least 2 bytes, got {0}")]
    CapacityTooSmall(usize),
    /// Growth ceiling below the starting capacity
    #[error("max capacity {max} is smaller than the starting capacity {capacity}")]
    CeilingBelowCapacity {
        /// Starting capacity
        capacity: usize,
        /// Configured ceiling
        max: usize,
    },
    /// Growth requested with a zero step
    #[error("growth increment must be non-zero")]
    ZeroIncrement,
    /// A transfer buffer would never gather enough bytes to wake its reader
    #[error("minimum transfer size {min_transfer_size} must be between 1 and the capacity {capacity}")]
    MinTransferOutOfRange {
        /// Configured capacity
        capacity: usize,
        /// Configured minimum transfer size
        min_transfer_size: usize,
    },
}

/// Configuration for a [`RingBuffer`](crate::RingBuffer)
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Starting (and minimum) capacity in bytes
    pub capacity: usize,
    /// Overflow handling
    pub policy: OverflowMode,
    /// Byte budget of the spill queue
    pub max_overflow_bytes: usize,
    /// Growth ceiling in bytes
    pub max_capacity: usize,
    /// Bytes added per growth step
    pub growth_increment: usize,
    /// Bytes a fixed-size transfer buffer gathers before waking its reader
    pub min_transfer_size: usize,
    /// Liveness re-check interval for blocked readers
    pub read_recheck: Duration,
    /// Liveness re-check interval for blocked writers
    pub write_recheck: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BufferConfig {
    /// Defaults scaled to the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            policy: OverflowMode::default(),
            max_overflow_bytes: capacity.saturating_mul(4),
            max_capacity: capacity.saturating_mul(2),
            growth_increment: capacity,
            min_transfer_size: DEFAULT_MIN_TRANSFER_SIZE.min(capacity),
            read_recheck: Duration::from_millis(500),
            write_recheck: Duration::from_millis(100),
        }
    }

    /// Buffer that drops writes when full
    pub fn dropping(capacity: usize) -> Self {
        Self {
            policy: OverflowMode::Drop,
            ..Self::new(capacity)
        }
    }

    /// Buffer that spills to a queue when full
    pub fn spilling(capacity: usize) -> Self {
        Self {
            policy: OverflowMode::Spill,
            ..Self::new(capacity)
        }
    }

    /// Buffer that grows when full, spilling once it reaches its ceiling
    pub fn growing(capacity: usize) -> Self {
        Self {
            policy: OverflowMode::Grow {
                fallback: GrowthFallback::Spill,
            },
            ..Self::new(capacity)
        }
    }

    /// Replace the overflow policy
    pub fn with_policy(mut self, policy: OverflowMode) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the spill queue budget
    pub fn with_max_overflow_bytes(mut self, bytes: usize) -> Self {
        self.max_overflow_bytes = bytes;
        self
    }

    /// Replace the growth ceiling
    pub fn with_max_capacity(mut self, bytes: usize) -> Self {
        self.max_capacity = bytes;
        self
    }

    /// Replace the growth step
    pub fn with_growth_increment(mut self, bytes: usize) -> Self {
        self.growth_increment = bytes;
        self
    }

    /// Replace the minimum transfer size
    pub fn with_min_transfer_size(mut self, bytes: usize) -> Self {
        self.min_transfer_size = bytes;
        self
    }

    /// Check the knobs for combinations the buffer cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity < 2 {
            return Err(ConfigError::CapacityTooSmall(self.capacity));
        }
        if self.min_transfer_size == 0 || self.min_transfer_size > self.capacity {
            return Err(ConfigError::MinTransferOutOfRange {
                capacity: self.capacity,
                min_transfer_size: self.min_transfer_size,
            });
        }

        if let OverflowMode::Grow { .. } = self.policy {
            if self.max_capacity < self.capacity {
                return Err(ConfigError::CeilingBelowCapacity {
                    capacity: self.capacity,
                    max: self.max_capacity,
                });
            }
            if self.growth_increment == 0 {
                return Err(ConfigError::ZeroIncrement);
            }
        }

        Ok(())
    }
}
