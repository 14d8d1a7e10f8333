use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Lecturer,
    Prl,
    Pl,
    Fmg,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Student,
        Role::Lecturer,
        Role::Prl,
        Role::Pl,
        Role::Fmg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Lecturer => "lecturer",
            Role::Prl => "prl",
            Role::Pl => "pl",
            Role::Fmg => "fmg",
        }
    }

    /// Roles that review work submitted below them.
    pub fn is_reviewer(self) -> bool {
        matches!(self, Role::Prl | Role::Pl | Role::Fmg)
    }

    pub fn is_staff(self) -> bool {
        !matches!(self, Role::Student)
    }

    /// The single role a complainant of this role may file against.
    pub fn complaint_target(self) -> Option<Role> {
        match self {
            Role::Student => Some(Role::Lecturer),
            Role::Lecturer => Some(Role::Prl),
            Role::Prl => Some(Role::Pl),
            Role::Pl => Some(Role::Fmg),
            Role::Fmg => None,
        }
    }

    /// Students must be approved by a program leader before they can sign in.
    pub fn requires_approval(self) -> bool {
        matches!(self, Role::Student)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = WorkflowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "lecturer" => Ok(Role::Lecturer),
            "prl" => Ok(Role::Prl),
            "pl" => Ok(Role::Pl),
            "fmg" => Ok(Role::Fmg),
            other => Err(WorkflowError::Validation(format!("unknown role '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("PRL".parse::<Role>(), Ok(Role::Prl));
        assert_eq!(" student ".parse::<Role>(), Ok(Role::Student));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn round_trips_through_as_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn routing_chain_ends_at_faculty_management() {
        assert_eq!(Role::Student.complaint_target(), Some(Role::Lecturer));
        assert_eq!(Role::Lecturer.complaint_target(), Some(Role::Prl));
        assert_eq!(Role::Prl.complaint_target(), Some(Role::Pl));
        assert_eq!(Role::Pl.complaint_target(), Some(Role::Fmg));
        assert_eq!(Role::Fmg.complaint_target(), None);
    }
}
