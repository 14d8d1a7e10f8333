use super::Role;

/// Every guarded capability of the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateReport,
    ListOwnReports,
    ListAllReports,
    ViewReport,
    ReviewReports,
    UpdateReportStatus,
    ListPendingSignatures,
    SignReport,
    ViewSignatures,
    FileComplaint,
    ListOwnComplaints,
    ReviewComplaints,
    RespondToComplaint,
    UpdateComplaint,
    ViewComplaintResponses,
    ViewCatalog,
    ManageCatalog,
    ListUsers,
    CreateUser,
    ViewUser,
    UpdateUser,
    ApproveStudents,
    SubmitRating,
    ViewRatings,
    ViewStatistics,
    ExportRecords,
    ExportOwnData,
}

const EVERYONE: &[Role] = &Role::ALL;
const AUTHORS: &[Role] = &[Role::Lecturer, Role::Prl, Role::Pl, Role::Fmg];
const REVIEWERS: &[Role] = &[Role::Prl, Role::Pl, Role::Fmg];
const COMPLAINANTS: &[Role] = &[Role::Student, Role::Lecturer, Role::Prl, Role::Pl];
const STUDENTS: &[Role] = &[Role::Student];
const PROGRAM_LEADERS: &[Role] = &[Role::Pl];
const ADMINISTRATORS: &[Role] = &[Role::Pl, Role::Fmg];
const FACULTY_MANAGEMENT: &[Role] = &[Role::Fmg];

pub fn allowed_roles(operation: Operation) -> &'static [Role] {
    use Operation::*;

    match operation {
        CreateReport | ListOwnReports => AUTHORS,
        ListAllReports | ReviewReports | UpdateReportStatus => REVIEWERS,
        ViewReport | ViewSignatures => EVERYONE,
        ListPendingSignatures | SignReport => STUDENTS,
        FileComplaint => COMPLAINANTS,
        ListOwnComplaints | ViewComplaintResponses => EVERYONE,
        ReviewComplaints | RespondToComplaint | UpdateComplaint => REVIEWERS,
        ViewCatalog => EVERYONE,
        ManageCatalog | ApproveStudents => PROGRAM_LEADERS,
        ListUsers | UpdateUser => ADMINISTRATORS,
        CreateUser => FACULTY_MANAGEMENT,
        ViewUser => EVERYONE,
        SubmitRating | ViewRatings | ExportOwnData => EVERYONE,
        ViewStatistics | ExportRecords => REVIEWERS,
    }
}

pub fn is_allowed(role: Role, operation: Operation) -> bool {
    allowed_roles(operation).contains(&role)
}
