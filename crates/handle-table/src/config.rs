//! Handle table configuration.

/// Slots per chunk unless configured otherwise.
pub const DEFAULT_CHUNK_CAPACITY: usize = 1024;

/// Size of the stable index space: indices are `u32`.
pub const MAX_HANDLES: u64 = 1 << 32;

/// Sizing of a [`HandleTable`](crate::HandleTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleTableConfig {
    /// Slots per chunk; the unit of growth.
    pub chunk_capacity: usize,
    /// Upper bound on addressable slots. Growing past it aborts the process.
    /// Never larger than [`MAX_HANDLES`].
    pub max_handles: u64,
}

impl Default for HandleTableConfig {
    fn default() -> Self {
        Self {
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            max_handles: MAX_HANDLES,
        }
    }
}

impl HandleTableConfig {
    /// Largest chunk count whose slots all fit under `max_handles`.
    #[must_use]
    pub fn max_chunks(&self) -> usize {
        let chunks = self.max_handles / self.chunk_capacity as u64;
        usize::try_from(chunks).unwrap_or(usize::MAX)
    }

    pub(crate) fn assert_valid(&self) {
        assert!(self.chunk_capacity > 0, "chunk_capacity must be non-zero");
        assert!(
            self.max_handles <= MAX_HANDLES,
            "max_handles {} exceeds the 32-bit index space",
            self.max_handles
        );
        assert!(
            self.chunk_capacity as u64 <= self.max_handles,
            "chunk_capacity {} exceeds max_handles {}",
            self.chunk_capacity,
            self.max_handles
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_covers_whole_index_space() {
        let config = HandleTableConfig::default();
        config.assert_valid();
        assert_eq!(
            config.max_chunks() as u64 * config.chunk_capacity as u64,
            MAX_HANDLES
        );
    }

    #[test]
    fn test_max_chunks_rounds_down() {
        let config = HandleTableConfig {
            chunk_capacity: 3,
            max_handles: 10,
        };
        assert_eq!(config.max_chunks(), 3);
    }

    #[test]
    #[should_panic(expected = "chunk_capacity must be non-zero")]
    fn test_zero_capacity_rejected() {
        HandleTableConfig {
            chunk_capacity: 0,
            max_handles: MAX_HANDLES,
        }
        .assert_valid();
    }

    #[test]
    #[should_panic(expected = "exceeds the 32-bit index space")]
    fn test_oversized_index_space_rejected() {
        HandleTableConfig {
            chunk_capacity: 4,
            max_handles: MAX_HANDLES + 1,
        }
        .assert_valid();
    }

    #[test]
    #[should_panic(expected = "exceeds max_handles")]
    fn test_chunk_larger_than_limit_rejected() {
        HandleTableConfig {
            chunk_capacity: 16,
            max_handles: 8,
        }
        .assert_valid();
    }
}
