//! Provenance and quality bits carried by every sample.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Bitfield recording where a sample came from and what should happen to it.
    ///
    /// The low byte is reserved by the engine; algorithms may use the upper
    /// bits for their own validation codes (see [`SampleFlags::RESERVED`]).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct SampleFlags: u32 {
        /// Sample was newly written to the store and triggered this run.
        const DB_ADDED = 1 << 0;
        /// Sample was deleted from the store and triggered this run.
        const DB_DELETED = 1 << 1;
        /// Sample must be written back to the store when the run is flushed.
        const TO_WRITE = 1 << 2;
        /// Sample must be deleted from the store when the run is flushed.
        const TO_DELETE = 1 << 3;
        /// Value is a missing-value placeholder.
        const MISSING = 1 << 4;
        /// Value passed screening with warnings.
        const QUESTIONABLE = 1 << 5;
        /// Value failed screening.
        const REJECTED = 1 << 6;
        /// Stored value must not be overwritten by a recomputation.
        const NO_OVERWRITE = 1 << 7;

        /// Bits owned by the engine.
        const RESERVED = 0xFF;
        /// Bits that describe trigger provenance only.
        const TRIGGER = Self::DB_ADDED.bits() | Self::DB_DELETED.bits();
        /// Bits describing pending store intent.
        const INTENT = Self::TO_WRITE.bits() | Self::TO_DELETE.bits();
    }
}

impl SampleFlags {
    /// True when the sample arrived as a deletion.
    #[must_use]
    pub const fn was_deleted(self) -> bool {
        self.contains(Self::DB_DELETED)
    }

    /// True when the sample is one of the values that triggered this run.
    #[must_use]
    pub const fn is_trigger(self) -> bool {
        self.intersects(Self::TRIGGER)
    }

    /// True when the sample is flagged questionable.
    #[must_use]
    pub const fn is_questionable(self) -> bool {
        self.contains(Self::QUESTIONABLE)
    }

    /// Good quality means not questionable, rejected, missing or pending delete.
    #[must_use]
    pub const fn is_good_quality(self) -> bool {
        !self.intersects(
            Self::QUESTIONABLE
                .union(Self::REJECTED)
                .union(Self::MISSING)
                .union(Self::TO_DELETE),
        )
    }
}
