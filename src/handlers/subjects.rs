use axum::{
    extract::{Path, State},
    response::{Json, Redirect},
    Form,
};
use axum_valid::Valid;
use common::ApiResponse;
use compute::roster;
use model::entities::{account, subject};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;
use crate::handlers::accounts::AccountResponse;
use crate::schemas::AppState;

const SUBJECTS_PATH: &str = "/admins/subjects";

/// Subject response model
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubjectResponse {
    pub id: i32,
    pub name: String,
}

impl From<subject::Model> for SubjectResponse {
    fn from(model: subject::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// Subject with member counts
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubjectSummaryResponse {
    pub id: i32,
    pub name: String,
    pub teacher_count: u64,
    pub student_count: u64,
}

/// Subject detail page
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubjectDetailResponse {
    pub subject: SubjectResponse,
    pub teachers: Vec<AccountResponse>,
    pub students: Vec<AccountResponse>,
    /// Teachers not assigned yet, including pending ones
    pub available_teachers: Vec<AccountResponse>,
    /// Students not enrolled yet
    pub available_students: Vec<AccountResponse>,
}

/// Create or rename form
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct SubjectForm {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// Membership change posted from the subject detail page.
///
/// Exactly one of the action fields is expected; the first present one in
/// the order add teacher, remove teacher, add student, remove student wins.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct MembershipForm {
    pub add_teacher: Option<String>,
    pub remove_teacher: Option<String>,
    pub add_student: Option<String>,
    pub remove_student: Option<String>,
    pub teacher_id: Option<i32>,
    pub student_id: Option<i32>,
}

fn required(id: Option<i32>, field: &str) -> Result<i32, AppError> {
    id.ok_or_else(|| AppError::Validation(format!("Missing field '{}'", field)))
}

/// List subjects with member counts
#[utoipa::path(
    get,
    path = "/admins/subjects",
    tag = "subjects",
    responses(
        (status = 200, description = "Subjects", body = ApiResponse<Vec<SubjectSummaryResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn list_subjects(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SubjectSummaryResponse>>>, AppError> {
    trace!("Entering list_subjects function");
    let data = roster::list_subjects(&state.db)
        .await?
        .into_iter()
        .map(|summary| SubjectSummaryResponse {
            id: summary.subject.id,
            name: summary.subject.name,
            teacher_count: summary.teacher_count,
            student_count: summary.student_count,
        })
        .collect();
    Ok(Json(ApiResponse::ok(data, "Subjects retrieved successfully")))
}

/// Create a subject
#[utoipa::path(
    post,
    path = "/admins/subjects/add",
    tag = "subjects",
    request_body(content = SubjectForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created"),
        (status = 400, description = "Invalid name", body = common::ErrorResponse),
        (status = 409, description = "Name taken", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn add_subject(
    State(state): State<AppState>,
    Valid(Form(form)): Valid<Form<SubjectForm>>,
) -> Result<Redirect, AppError> {
    let created = roster::create_subject(&state.db, &form.name).await?;
    info!("Subject '{}' added with ID {}", created.name, created.id);
    Ok(Redirect::to(SUBJECTS_PATH))
}

/// Subject with its roster and the accounts that can still join
#[utoipa::path(
    get,
    path = "/admins/subjects/{subject_id}",
    tag = "subjects",
    params(("subject_id" = i32, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Subject detail", body = ApiResponse<SubjectDetailResponse>),
        (status = 404, description = "Subject not found", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn subject_detail(
    Path(subject_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SubjectDetailResponse>>, AppError> {
    let roster = roster::subject_roster(&state.db, subject_id).await?;
    let accounts = |list: Vec<account::Model>| -> Vec<AccountResponse> {
        list.into_iter().map(AccountResponse::from).collect()
    };

    let detail = SubjectDetailResponse {
        subject: roster.subject.into(),
        teachers: accounts(roster.teachers),
        students: accounts(roster.students),
        available_teachers: accounts(roster.available_teachers),
        available_students: accounts(roster.available_students),
    };
    Ok(Json(ApiResponse::ok(detail, "Subject retrieved successfully")))
}

/// Add or remove a teacher or student
#[utoipa::path(
    post,
    path = "/admins/subjects/{subject_id}",
    tag = "subjects",
    params(("subject_id" = i32, Path, description = "Subject ID")),
    request_body(content = MembershipForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Back to the subject detail"),
        (status = 400, description = "Missing account id", body = common::ErrorResponse),
        (status = 404, description = "Subject or account not found", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn change_membership(
    Path(subject_id): Path<i32>,
    State(state): State<AppState>,
    Form(form): Form<MembershipForm>,
) -> Result<Redirect, AppError> {
    let changed = if form.add_teacher.is_some() {
        roster::add_teacher(&state.db, subject_id, required(form.teacher_id, "teacher_id")?).await?
    } else if form.remove_teacher.is_some() {
        roster::remove_teacher(&state.db, subject_id, required(form.teacher_id, "teacher_id")?)
            .await?
    } else if form.add_student.is_some() {
        roster::add_student(&state.db, subject_id, required(form.student_id, "student_id")?).await?
    } else if form.remove_student.is_some() {
        roster::remove_student(&state.db, subject_id, required(form.student_id, "student_id")?)
            .await?
    } else {
        debug!("Membership form without an action");
        roster::get_subject(&state.db, subject_id).await?;
        false
    };

    debug!("Membership of subject {} changed: {}", subject_id, changed);
    Ok(Redirect::to(&format!("{}/{}", SUBJECTS_PATH, subject_id)))
}

/// Get a subject for editing
#[utoipa::path(
    get,
    path = "/admins/subjects/edit/{subject_id}",
    tag = "subjects",
    params(("subject_id" = i32, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Subject", body = ApiResponse<SubjectResponse>),
        (status = 404, description = "Subject not found", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_subject(
    Path(subject_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SubjectResponse>>, AppError> {
    let found = roster::get_subject(&state.db, subject_id).await?;
    Ok(Json(ApiResponse::ok(found.into(), "Subject retrieved successfully")))
}

/// Rename a subject
#[utoipa::path(
    post,
    path = "/admins/subjects/edit/{subject_id}",
    tag = "subjects",
    params(("subject_id" = i32, Path, description = "Subject ID")),
    request_body(content = SubjectForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Renamed"),
        (status = 404, description = "Subject not found", body = common::ErrorResponse),
        (status = 409, description = "Name taken", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn edit_subject(
    Path(subject_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Form(form)): Valid<Form<SubjectForm>>,
) -> Result<Redirect, AppError> {
    roster::rename_subject(&state.db, subject_id, &form.name).await?;
    Ok(Redirect::to(SUBJECTS_PATH))
}

/// Delete a subject, its memberships and its attendance
#[utoipa::path(
    post,
    path = "/admins/subjects/delete/{subject_id}",
    tag = "subjects",
    params(("subject_id" = i32, Path, description = "Subject ID")),
    responses(
        (status = 303, description = "Deleted"),
        (status = 404, description = "Subject not found", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_subject(
    Path(subject_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    roster::delete_subject(&state.db, subject_id).await?;
    info!("Subject {} deleted", subject_id);
    Ok(Redirect::to(SUBJECTS_PATH))
}
