use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Closed status set for an appointment.
///
/// `Pending` is the sole initial status. `Completed`, `Cancelled` and
/// `Rejected` are terminal: no edge leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Approved,
    Completed,
    Cancelled,
    Rejected,
}

impl AppointmentStatus {
    /// All statuses reachable from `self` in one step, independent of who
    /// is asking. Role restrictions are layered on top by the lifecycle
    /// engine.
    pub fn successors(self) -> &'static [AppointmentStatus] {
        match self {
            Self::Pending => &[Self::Approved, Self::Rejected, Self::Cancelled],
            Self::Approved => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled | Self::Rejected => &[],
        }
    }

    /// Whether any edge at all leaves this status.
    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    /// Whether `(self, to)` is an edge of the status graph.
    pub fn can_transition_to(self, to: AppointmentStatus) -> bool {
        self.successors().contains(&to)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            // Legacy records used "Done" and "Completed" interchangeably.
            "Completed" | "Done" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            "Rejected" => Ok(Self::Rejected),
            other => Err(DomainError::validation(format!(
                "Unknown appointment status: {other}"
            ))),
        }
    }
}
