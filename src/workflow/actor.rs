use uuid::Uuid;

use super::access::{self, Operation};
use super::{ReportAction, ReportStatus, Role, WorkflowError, WorkflowResult};

/// The authenticated caller, carrying the role-based rules every handler
/// consults before touching the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub faculty: String,
    pub name: String,
}

/// Row filter describing what a reviewer may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewScope<S> {
    pub target: S,
    /// `None` means institution-wide.
    pub faculty: Option<String>,
}

impl Actor {
    pub fn new(id: Uuid, role: Role, faculty: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            role,
            faculty: faculty.into(),
            name: name.into(),
        }
    }

    pub fn can(&self, operation: Operation) -> bool {
        access::is_allowed(self.role, operation)
    }

    pub fn require(&self, operation: Operation) -> WorkflowResult<()> {
        if self.can(operation) {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden)
        }
    }

    /// Checks that this actor may perform `action` on a report currently in
    /// `current` and returns the resulting status.
    pub fn authorize_transition(
        &self,
        current: ReportStatus,
        action: ReportAction,
    ) -> WorkflowResult<ReportStatus> {
        if !action.allowed_roles().contains(&self.role) {
            return Err(WorkflowError::Forbidden);
        }
        current.apply(action)
    }

    /// Enforces the complaint routing table and the self-complaint ban.
    pub fn authorize_route(&self, against_user_id: Uuid, against_role: Role) -> WorkflowResult<()> {
        if against_user_id == self.id {
            return Err(WorkflowError::SelfComplaint);
        }
        match self.role.complaint_target() {
            Some(target) if target == against_role => Ok(()),
            _ => Err(WorkflowError::InvalidRoute),
        }
    }

    /// Complaints this actor may list for review: prl and pl are bound to
    /// their own faculty, fmg sees every complaint against a program leader.
    pub fn complaint_review_scope(&self) -> Option<ReviewScope<Role>> {
        match self.role {
            Role::Prl => Some(self.scoped(Role::Lecturer)),
            Role::Pl => Some(self.scoped(Role::Prl)),
            Role::Fmg => Some(ReviewScope {
                target: Role::Pl,
                faculty: None,
            }),
            Role::Student | Role::Lecturer => None,
        }
    }

    /// Reports waiting on this actor's review step.
    pub fn report_review_scope(&self) -> Option<ReviewScope<ReportStatus>> {
        match self.role {
            Role::Prl => Some(self.scoped(ReportStatus::StudentApproved)),
            Role::Pl => Some(self.scoped(ReportStatus::PrlReviewed)),
            Role::Fmg => Some(ReviewScope {
                target: ReportStatus::PrlReviewed,
                faculty: None,
            }),
            Role::Student | Role::Lecturer => None,
        }
    }

    fn scoped<S>(&self, value: S) -> ReviewScope<S> {
        ReviewScope {
            target: value,
            faculty: Some(self.faculty.clone()),
        }
    }
}
