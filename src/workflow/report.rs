use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Role, WorkflowError, WorkflowResult};

/// Lifecycle of a lecture report.
///
/// ```text
/// pending_student_approval -> student_approved -> prl_reviewed -> completed
///            \__________________\________________\______________-> rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    PendingStudentApproval,
    StudentApproved,
    PrlReviewed,
    Completed,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAction {
    Sign,
    PrlReview,
    Complete,
    Reject,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 5] = [
        ReportStatus::PendingStudentApproval,
        ReportStatus::StudentApproved,
        ReportStatus::PrlReviewed,
        ReportStatus::Completed,
        ReportStatus::Rejected,
    ];

    pub const INITIAL: ReportStatus = ReportStatus::PendingStudentApproval;

    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::PendingStudentApproval => "pending_student_approval",
            ReportStatus::StudentApproved => "student_approved",
            ReportStatus::PrlReviewed => "prl_reviewed",
            ReportStatus::Completed => "completed",
            ReportStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReportStatus::Completed | ReportStatus::Rejected)
    }

    /// Applies `action`, returning the next status or the reason it is illegal.
    ///
    /// A second class representative may co-sign a report that is already
    /// `student_approved`; the status stays put.
    pub fn apply(self, action: ReportAction) -> WorkflowResult<ReportStatus> {
        use ReportAction::*;
        use ReportStatus::*;

        if self.is_terminal() {
            return Err(WorkflowError::Terminal(self));
        }

        match (self, action) {
            (PendingStudentApproval | StudentApproved, Sign) => Ok(StudentApproved),
            (StudentApproved, PrlReview) => Ok(PrlReviewed),
            (PrlReviewed, Complete) => Ok(Completed),
            (_, Reject) => Ok(Rejected),
            (from, action) => Err(WorkflowError::InvalidTransition { from, action }),
        }
    }
}

impl ReportAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportAction::Sign => "sign",
            ReportAction::PrlReview => "review",
            ReportAction::Complete => "complete",
            ReportAction::Reject => "reject",
        }
    }

    pub fn allowed_roles(self) -> &'static [Role] {
        match self {
            ReportAction::Sign => &[Role::Student],
            ReportAction::PrlReview => &[Role::Prl, Role::Pl, Role::Fmg],
            ReportAction::Complete => &[Role::Pl, Role::Fmg],
            ReportAction::Reject => &[Role::Prl, Role::Pl, Role::Fmg],
        }
    }

    /// Maps the target status of a status update request onto the action that
    /// produces it. Student approval is only reachable through a signature.
    pub fn for_target(status: ReportStatus) -> WorkflowResult<ReportAction> {
        match status {
            ReportStatus::PrlReviewed => Ok(ReportAction::PrlReview),
            ReportStatus::Completed => Ok(ReportAction::Complete),
            ReportStatus::Rejected => Ok(ReportAction::Reject),
            ReportStatus::StudentApproved => Err(WorkflowError::Validation(
                "student approval is recorded by signing the report".to_string(),
            )),
            ReportStatus::PendingStudentApproval => Err(WorkflowError::Validation(
                "reports cannot be returned to pending_student_approval".to_string(),
            )),
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ReportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = WorkflowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ReportStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
            .ok_or_else(|| WorkflowError::Validation(format!("unknown report status '{value}'")))
    }
}
