//! Role-gated status workflows for lecture reports and complaints.
//!
//! Everything in here is pure: handlers load rows, ask an [`Actor`] whether a
//! transition or route is permitted, and persist the outcome. No role string
//! is compared anywhere else in the crate.

pub mod access;
pub mod actor;
pub mod complaint;
pub mod report;
pub mod role;

use thiserror::Error;

pub use access::Operation;
pub use actor::{Actor, ReviewScope};
pub use complaint::{ComplaintPriority, ComplaintStatus};
pub use report::{ReportAction, ReportStatus};
pub use role::Role;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("forbidden")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    #[error("cannot {action} a report that is {from}")]
    InvalidTransition {
        from: ReportStatus,
        action: ReportAction,
    },
    #[error("report is already {0}")]
    Terminal(ReportStatus),
    #[error("complaint cannot move from {from} to {to}")]
    InvalidComplaintTransition {
        from: ComplaintStatus,
        to: ComplaintStatus,
    },
    #[error("Invalid complaint route for your role")]
    InvalidRoute,
    #[error("Cannot file complaint against yourself")]
    SelfComplaint,
    #[error("You have already signed this report")]
    AlreadySigned,
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
