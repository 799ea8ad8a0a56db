use std::sync::Arc;

use common::{ApiResponse, ErrorResponse, MarkState};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::config::Settings;
use crate::handlers::{
    accounts::{AccountForm, AccountResponse, EditAccountForm, StudentDetailResponse},
    admin::{AdminDashboardResponse, ApproveForm},
    auth::{LoginForm, RegisterForm, RegisterPageResponse},
    subjects::{MembershipForm, SubjectDetailResponse, SubjectForm, SubjectResponse, SubjectSummaryResponse},
    teacher::{AttendanceSheetResponse, SheetEntryResponse, TeacherDashboardResponse},
    student::{AttendanceRecordResponse, StudentDashboardResponse},
};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Settings loaded at startup
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, settings: Settings) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
        }
    }
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register_page,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::admin::admin_dashboard,
        crate::handlers::admin::approve_from_dashboard,
        crate::handlers::teachers::list_teachers,
        crate::handlers::teachers::add_teacher,
        crate::handlers::teachers::get_teacher,
        crate::handlers::teachers::edit_teacher,
        crate::handlers::teachers::delete_teacher,
        crate::handlers::teachers::approve_teacher,
        crate::handlers::students::list_students,
        crate::handlers::students::add_student,
        crate::handlers::students::get_student,
        crate::handlers::students::edit_student,
        crate::handlers::students::delete_student,
        crate::handlers::students::approve_student,
        crate::handlers::subjects::list_subjects,
        crate::handlers::subjects::add_subject,
        crate::handlers::subjects::subject_detail,
        crate::handlers::subjects::change_membership,
        crate::handlers::subjects::get_subject,
        crate::handlers::subjects::edit_subject,
        crate::handlers::subjects::delete_subject,
        crate::handlers::teacher::teacher_dashboard,
        crate::handlers::teacher::attendance_sheet,
        crate::handlers::teacher::mark_attendance,
        crate::handlers::teacher::add_student_to_subject,
        crate::handlers::student::student_dashboard,
    ),
    components(
        schemas(
            ApiResponse<AdminDashboardResponse>,
            ApiResponse<Vec<AccountResponse>>,
            ApiResponse<AccountResponse>,
            ApiResponse<StudentDetailResponse>,
            ApiResponse<Vec<SubjectSummaryResponse>>,
            ApiResponse<SubjectResponse>,
            ApiResponse<SubjectDetailResponse>,
            ApiResponse<TeacherDashboardResponse>,
            ApiResponse<AttendanceSheetResponse>,
            ApiResponse<StudentDashboardResponse>,
            ApiResponse<RegisterPageResponse>,
            ErrorResponse,
            HealthResponse,
            MarkState,
            RegisterForm,
            LoginForm,
            AccountForm,
            EditAccountForm,
            ApproveForm,
            SubjectForm,
            MembershipForm,
            AccountResponse,
            StudentDetailResponse,
            AdminDashboardResponse,
            SubjectResponse,
            SubjectSummaryResponse,
            SubjectDetailResponse,
            TeacherDashboardResponse,
            AttendanceSheetResponse,
            SheetEntryResponse,
            StudentDashboardResponse,
            AttendanceRecordResponse,
            RegisterPageResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and logout"),
        (name = "admin", description = "Admin dashboard and account management"),
        (name = "subjects", description = "Subject and roster management"),
        (name = "teacher", description = "Teacher dashboard and attendance marking"),
        (name = "student", description = "Student attendance report"),
    ),
    info(
        title = "Rollcall API",
        description = "School attendance tracking: registration with approval, subject rosters, daily attendance and monthly reports",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
