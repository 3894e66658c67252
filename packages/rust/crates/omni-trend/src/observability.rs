//! Stable event names for structured `tracing` output.

/// Event identifiers attached as the `event` field of trend log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendEvent {
    /// A delta and its two counter sets were initialized.
    DeltaCreated,
    /// A delta creation request failed validation.
    DeltaCreateRejected,
    /// An observation predating the set's last decay was dropped.
    IncrementRejectedStale,
    /// A decay pass rewrote the set's scores.
    DecayApplied,
    /// A decay pass failed to write; the last decay date was not advanced.
    DecayWriteFailed,
    /// Near-zero members were removed after decay.
    ScrubApplied,
}

impl TrendEvent {
    /// Dotted event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeltaCreated => "trend.delta.created",
            Self::DeltaCreateRejected => "trend.delta.create_rejected",
            Self::IncrementRejectedStale => "trend.set.increment_rejected_stale",
            Self::DecayApplied => "trend.set.decay_applied",
            Self::DecayWriteFailed => "trend.set.decay_write_failed",
            Self::ScrubApplied => "trend.set.scrub_applied",
        }
    }
}
