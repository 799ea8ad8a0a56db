use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::{Json, Redirect},
    Extension, Form,
};
use axum_valid::Valid;
use chrono::{Local, NaiveDate};
use common::{ApiResponse, MarkState};
use compute::access::{Access, RoleSet, authorize};
use compute::{attendance, roster};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::guard::CurrentAccount;
use crate::handlers::accounts::{AccountForm, AccountResponse};
use crate::handlers::students::create_student;
use crate::handlers::subjects::SubjectResponse;
use crate::schemas::AppState;

const TEACHER_DASHBOARD_PATH: &str = "/teacher_dashboard";

/// Subjects the logged in teacher is assigned to
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeacherDashboardResponse {
    pub teacher: AccountResponse,
    pub subjects: Vec<SubjectResponse>,
}

/// One student on the marking sheet
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SheetEntryResponse {
    pub account_id: i32,
    pub profile_id: i32,
    pub username: String,
    pub display_name: String,
    pub roll_no: String,
    /// Form field carrying this student's status, `status_<profile_id>`
    pub field: String,
    pub state: MarkState,
    /// Pre-selected code: `P`, `A` or empty
    pub code: String,
}

/// Today's marking sheet of a subject
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSheetResponse {
    pub subject: SubjectResponse,
    pub date: NaiveDate,
    pub students: Vec<SheetEntryResponse>,
}

/// Whether the new student joins the subject right away
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EnrollQuery {
    /// Defaults to true
    pub enroll: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/teacher_dashboard",
    tag = "teacher",
    responses(
        (status = 200, description = "Subjects taught", body = ApiResponse<TeacherDashboardResponse>),
        (status = 303, description = "Not logged in"),
        (status = 403, description = "Not a teacher", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(teacher_id = current.0.id))]
pub async fn teacher_dashboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Result<Json<ApiResponse<TeacherDashboardResponse>>, AppError> {
    trace!("Entering teacher_dashboard function");
    let CurrentAccount(teacher) = current;

    let subjects = roster::subjects_taught_by(&state.db, teacher.id)
        .await?
        .into_iter()
        .map(SubjectResponse::from)
        .collect::<Vec<_>>();
    debug!("Teacher {} teaches {} subjects", teacher.id, subjects.len());

    let response = TeacherDashboardResponse {
        teacher: teacher.into(),
        subjects,
    };
    Ok(Json(ApiResponse::ok(response, "Teacher dashboard")))
}

/// Today's attendance sheet as marked by the current teacher
#[utoipa::path(
    get,
    path = "/teacher/subject/{subject_id}/attendance",
    tag = "teacher",
    params(("subject_id" = i32, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Marking sheet", body = ApiResponse<AttendanceSheetResponse>),
        (status = 403, description = "Not a teacher of this subject", body = common::ErrorResponse),
        (status = 404, description = "Subject not found", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(teacher_id = current.0.id))]
pub async fn attendance_sheet(
    Path(subject_id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Result<Json<ApiResponse<AttendanceSheetResponse>>, AppError> {
    let today = Local::now().date_naive();
    let sheet = attendance::day_attendance(&state.db, &current.0, subject_id, today).await?;

    let students = sheet
        .entries
        .into_iter()
        .map(|entry| SheetEntryResponse {
            field: entry.student.field_name(),
            account_id: entry.student.account.id,
            profile_id: entry.student.profile.id,
            display_name: entry.student.account.display_name(),
            username: entry.student.account.username,
            roll_no: entry.student.profile.roll_no,
            code: entry.state.code().to_string(),
            state: entry.state,
        })
        .collect();

    let response = AttendanceSheetResponse {
        subject: sheet.subject.into(),
        date: sheet.date,
        students,
    };
    Ok(Json(ApiResponse::ok(response, "Attendance sheet")))
}

/// Record today's attendance
///
/// Fields are `status_<profile_id>` with `P` or `A`. Other values and
/// missing students are skipped.
#[utoipa::path(
    post,
    path = "/teacher/subject/{subject_id}/attendance",
    tag = "teacher",
    params(("subject_id" = i32, Path, description = "Subject ID")),
    responses(
        (status = 303, description = "Saved, back to the teacher dashboard"),
        (status = 403, description = "Not a teacher of this subject", body = common::ErrorResponse),
        (status = 404, description = "Subject not found", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state, current, statuses), fields(teacher_id = current.0.id))]
pub async fn mark_attendance(
    Path(subject_id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Form(statuses): Form<HashMap<String, String>>,
) -> Result<Redirect, AppError> {
    trace!("Entering mark_attendance function");
    let today = Local::now().date_naive();

    let summary =
        attendance::mark_attendance(&state.db, &current.0, subject_id, today, &statuses).await?;
    info!(
        "Teacher {} marked {} students of subject {} ({} skipped)",
        current.0.id, summary.marked, subject_id, summary.skipped
    );
    Ok(Redirect::to(TEACHER_DASHBOARD_PATH))
}

/// Create a student and enroll them in a subject
///
/// Teachers may only add to subjects they teach; admins to any subject.
#[utoipa::path(
    post,
    path = "/teacher/subject/{subject_id}/add_student",
    tag = "teacher",
    params(("subject_id" = i32, Path, description = "Subject ID"), EnrollQuery),
    request_body(content = AccountForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created"),
        (status = 400, description = "Invalid form", body = common::ErrorResponse),
        (status = 403, description = "Not a teacher of this subject", body = common::ErrorResponse),
        (status = 404, description = "Subject not found", body = common::ErrorResponse),
        (status = 409, description = "Username taken", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state, current, form), fields(caller_id = current.0.id))]
pub async fn add_student_to_subject(
    Path(subject_id): Path<i32>,
    State(state): State<AppState>,
    Query(query): Query<EnrollQuery>,
    Extension(current): Extension<CurrentAccount>,
    Valid(Form(form)): Valid<Form<AccountForm>>,
) -> Result<Redirect, AppError> {
    let caller = current.0;
    let subject = roster::get_subject(&state.db, subject_id).await?;
    let is_admin = authorize(&caller, RoleSet::ADMIN) == Access::Granted;

    if !is_admin && !roster::is_teacher_of(&state.db, caller.id, subject.id).await? {
        warn!("Teacher {} tried to add a student to subject {}", caller.id, subject.id);
        return Err(AppError::Forbidden(format!(
            "You are not a teacher of subject {}",
            subject.name
        )));
    }

    let enroll = query.enroll.unwrap_or(true);
    let student = create_student(&state, form, enroll.then_some(subject.id)).await?;
    info!(
        "Account {} added student '{}' (enrolled in {}: {})",
        caller.id, student.username, subject.id, enroll
    );

    if is_admin {
        Ok(Redirect::to(&format!("/admins/subjects/{}", subject.id)))
    } else {
        Ok(Redirect::to(TEACHER_DASHBOARD_PATH))
    }
}
