//! Counters for mirroring work, formatted as one JSON line.
//! Kept independent of session internals; callers pass counters explicitly.

use log::info;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MirrorCounters {
    /// Batches applied
    pub batches: u64,
    /// Change records seen
    pub records: u64,
    /// Source nodes copied into the mirror
    pub added: u64,
    /// Mirror nodes detached because their source was removed
    pub removed: u64,
    /// Mirror nodes replaced by a fresh copy after a modification
    pub replaced: u64,
    /// Records or nodes outside the mirrored scope
    pub ignored: u64,
}

impl MirrorCounters {
    pub fn absorb(&mut self, other: &Self) {
        self.batches += other.batches;
        self.records += other.records;
        self.added += other.added;
        self.removed += other.removed;
        self.replaced += other.replaced;
        self.ignored += other.ignored;
    }

    /// Whether anything in the mirror changed.
    pub const fn changed_mirror(&self) -> bool {
        self.added + self.removed + self.replaced > 0
    }

    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(text) => text,
            Err(_) => String::from("{}"),
        }
    }
}

pub fn maybe_emit(enabled: bool, counters: &MirrorCounters) {
    if enabled {
        info!(target: "style_mirror::telemetry", "{}", counters.to_json());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_sums_fields() {
        let mut total = MirrorCounters {
            batches: 1,
            added: 2,
            ..MirrorCounters::default()
        };
        total.absorb(&MirrorCounters {
            batches: 1,
            records: 3,
            removed: 1,
            ignored: 4,
            ..MirrorCounters::default()
        });
        assert_eq!(total.batches, 2);
        assert_eq!(total.records, 3);
        assert_eq!(total.added, 2);
        assert_eq!(total.removed, 1);
        assert_eq!(total.ignored, 4);
        assert!(total.changed_mirror());
        assert!(!MirrorCounters::default().changed_mirror());
    }

    #[test]
    fn json_line_has_every_counter() {
        let counters = MirrorCounters {
            replaced: 7,
            ..MirrorCounters::default()
        };
        assert_eq!(
            counters.to_json(),
            "{\"batches\":0,\"records\":0,\"added\":0,\"removed\":0,\"replaced\":7,\"ignored\":0}"
        );
    }
}
