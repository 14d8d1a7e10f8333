use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Pending,
    InReview,
    Resolved,
    Dismissed,
}

impl ComplaintStatus {
    pub const ALL: [ComplaintStatus; 4] = [
        ComplaintStatus::Pending,
        ComplaintStatus::InReview,
        ComplaintStatus::Resolved,
        ComplaintStatus::Dismissed,
    ];

    pub const INITIAL: ComplaintStatus = ComplaintStatus::Pending;

    pub fn as_str(self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::InReview => "in_review",
            ComplaintStatus::Resolved => "resolved",
            ComplaintStatus::Dismissed => "dismissed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ComplaintStatus::Resolved | ComplaintStatus::Dismissed)
    }

    /// Validates an administrative status change. Re-asserting the current
    /// status is a no-op and always allowed.
    pub fn transition_to(self, next: ComplaintStatus) -> WorkflowResult<ComplaintStatus> {
        use ComplaintStatus::*;

        if self == next {
            return Ok(next);
        }

        match (self, next) {
            (Pending, InReview | Resolved | Dismissed) => Ok(next),
            (InReview, Resolved | Dismissed) => Ok(next),
            (from, to) => Err(WorkflowError::InvalidComplaintTransition { from, to }),
        }
    }

    /// Attaching a response resolves the complaint whatever state it was in.
    pub fn respond(self) -> ComplaintStatus {
        ComplaintStatus::Resolved
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplaintPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl ComplaintPriority {
    pub const ALL: [ComplaintPriority; 4] = [
        ComplaintPriority::Low,
        ComplaintPriority::Medium,
        ComplaintPriority::High,
        ComplaintPriority::Urgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComplaintPriority::Low => "low",
            ComplaintPriority::Medium => "medium",
            ComplaintPriority::High => "high",
            ComplaintPriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ComplaintPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = WorkflowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ComplaintStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
            .ok_or_else(|| {
                WorkflowError::Validation(format!("unknown complaint status '{value}'"))
            })
    }
}

impl FromStr for ComplaintPriority {
    type Err = WorkflowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        ComplaintPriority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == normalized)
            .ok_or_else(|| WorkflowError::Validation(format!("unknown priority '{value}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_always_resolves() {
        for status in ComplaintStatus::ALL {
            assert_eq!(status.respond(), ComplaintStatus::Resolved);
        }
    }

    #[test]
    fn review_flow_moves_forward() {
        assert_eq!(
            ComplaintStatus::Pending.transition_to(ComplaintStatus::InReview),
            Ok(ComplaintStatus::InReview)
        );
        assert_eq!(
            ComplaintStatus::InReview.transition_to(ComplaintStatus::Dismissed),
            Ok(ComplaintStatus::Dismissed)
        );
        assert_eq!(
            ComplaintStatus::Pending.transition_to(ComplaintStatus::Resolved),
            Ok(ComplaintStatus::Resolved)
        );
    }

    #[test]
    fn closed_complaints_stay_closed() {
        assert!(ComplaintStatus::Resolved
            .transition_to(ComplaintStatus::Pending)
            .is_err());
        assert!(ComplaintStatus::Dismissed
            .transition_to(ComplaintStatus::InReview)
            .is_err());
        assert!(ComplaintStatus::InReview
            .transition_to(ComplaintStatus::Pending)
            .is_err());
    }

    #[test]
    fn priority_parsing_is_case_insensitive() {
        assert_eq!("URGENT".parse::<ComplaintPriority>(), Ok(ComplaintPriority::Urgent));
        assert!("critical".parse::<ComplaintPriority>().is_err());
    }
}
