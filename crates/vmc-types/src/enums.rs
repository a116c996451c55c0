//! Enumeration types for the vending controller.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The discrete state of the vending machine.
///
/// The machine is a cyclic two-state automaton: it starts `Idle`, moves
/// to `Vending` when a request is admitted, and returns to `Idle` when
/// the vend completes (or is abandoned at shutdown).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Phase {
    /// No vend in progress; new requests are admitted.
    #[default]
    Idle,
    /// A vend is in progress; new requests are rejected as busy.
    Vending,
}

impl Phase {
    /// Wire name of the phase, as it appears in JSON payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Vending => "vending",
        }
    }

    /// Whether a vend is currently in progress.
    pub const fn is_vending(self) -> bool {
        matches!(self, Self::Vending)
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
