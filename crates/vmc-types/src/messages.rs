//! JSON payloads exchanged with the ordering application.
//!
//! Field names follow the camelCase convention the ordering frontend
//! expects (`estimatedTime`, `vendedItems`, ...). Every shape here is
//! exported to `TypeScript` via `ts-rs`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Phase;
use crate::ids::ItemId;

/// Message text sent when a vend is admitted.
pub const MSG_VEND_STARTED: &str = "Vending started";
/// Message text sent when a vend finishes.
pub const MSG_VEND_COMPLETED: &str = "Vending completed successfully";
/// Message text for a status poll while vending.
pub const MSG_VEND_IN_PROGRESS: &str = "Vending in progress";
/// Message text for a status poll while idle.
pub const MSG_MACHINE_IDLE: &str = "Machine is idle";

// ---------------------------------------------------------------------------
// Push channel
// ---------------------------------------------------------------------------

/// A server-push frame delivered to every attached subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum Notification {
    /// Current phase and items. Sent as the attach-time snapshot and on
    /// every accepted vend.
    Status {
        /// Machine phase at the time of the frame.
        status: Phase,
        /// Items being vended (empty when idle).
        items: Vec<ItemId>,
        /// Human-readable note; absent on attach-time snapshots.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[ts(optional)]
        message: Option<String>,
    },
    /// A vend cycle finished and the machine is idle again.
    VendComplete {
        /// Always [`Phase::Idle`].
        status: Phase,
        /// The items that were vended in the finished cycle.
        #[serde(rename = "vendedItems")]
        vended_items: Vec<ItemId>,
        /// When the cycle completed.
        timestamp: DateTime<Utc>,
        /// Human-readable note.
        message: String,
    },
}

impl Notification {
    /// Snapshot frame for a newly attached subscriber.
    pub fn snapshot(status: Phase, items: Vec<ItemId>) -> Self {
        Self::Status {
            status,
            items,
            message: None,
        }
    }

    /// Frame announcing that a vend of `items` has started.
    pub fn vend_started(items: Vec<ItemId>) -> Self {
        Self::Status {
            status: Phase::Vending,
            items,
            message: Some(MSG_VEND_STARTED.to_owned()),
        }
    }

    /// Frame announcing that the vend of `items` completed at `timestamp`.
    pub fn vend_complete(items: Vec<ItemId>, timestamp: DateTime<Utc>) -> Self {
        Self::VendComplete {
            status: Phase::Idle,
            vended_items: items,
            timestamp,
            message: MSG_VEND_COMPLETED.to_owned(),
        }
    }

    /// Wire name of the frame's `type` tag.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::VendComplete { .. } => "vend-complete",
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP bodies
// ---------------------------------------------------------------------------

/// Request body for `POST /vend`.
///
/// A missing `items` field decodes as an empty list and is rejected by
/// the state machine like any other empty request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VendRequest {
    /// Items to vend, in order.
    #[serde(default)]
    pub items: Vec<ItemId>,
}

/// Response body for an admitted vend (`202 Accepted`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct VendAccepted {
    /// Always `true`.
    pub success: bool,
    /// Human-readable note.
    pub message: String,
    /// The items now being vended.
    pub items: Vec<ItemId>,
    /// Milliseconds until the vend is expected to complete.
    pub estimated_time: u64,
}

impl VendAccepted {
    /// Build the accepted body for `items` completing after `estimated_time` ms.
    pub fn new(items: Vec<ItemId>, estimated_time: u64) -> Self {
        Self {
            success: true,
            message: MSG_VEND_STARTED.to_owned(),
            items,
            estimated_time,
        }
    }
}

/// Response body for a rejected vend (`400` or `409`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct VendRejected {
    /// Always `false`.
    pub success: bool,
    /// Why the request was rejected.
    pub message: String,
    /// Items of the vend in progress, present only on a busy rejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub current_items: Option<Vec<ItemId>>,
}

/// Response body for `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StatusReport {
    /// Current phase.
    pub status: Phase,
    /// Items being vended; absent while idle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub items: Option<Vec<ItemId>>,
    /// Milliseconds since the current vend started; absent while idle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub elapsed_time: Option<u64>,
    /// When the report was produced.
    pub timestamp: DateTime<Utc>,
    /// Human-readable note.
    pub message: String,
}

impl StatusReport {
    /// Report for an idle machine.
    pub fn idle(timestamp: DateTime<Utc>) -> Self {
        Self {
            status: Phase::Idle,
            items: None,
            elapsed_time: None,
            timestamp,
            message: MSG_MACHINE_IDLE.to_owned(),
        }
    }

    /// Report for a machine vending `items` for `elapsed_ms` so far.
    pub fn vending(items: Vec<ItemId>, elapsed_ms: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            status: Phase::Vending,
            items: Some(items),
            elapsed_time: Some(elapsed_ms),
            timestamp,
            message: MSG_VEND_IN_PROGRESS.to_owned(),
        }
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HealthReport {
    /// Always `"healthy"` while the process answers.
    pub status: String,
    /// Service name.
    pub service: String,
    /// When the probe was answered.
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    /// Name reported by the health probe.
    pub const SERVICE_NAME: &'static str = "VMC Mock Server";

    /// A healthy report stamped with `timestamp`.
    pub fn healthy(timestamp: DateTime<Utc>) -> Self {
        Self {
            status: "healthy".to_owned(),
            service: Self::SERVICE_NAME.to_owned(),
            timestamp,
        }
    }
}
