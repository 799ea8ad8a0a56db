use axum::{
    extract::{Path, Query, State},
    response::{Json, Redirect},
    Form,
};
use axum_valid::Valid;
use common::ApiResponse;
use compute::identity;
use model::entities::account::{self, Role};
use tracing::{debug, info, instrument, trace};

use crate::error::AppError;
use crate::handlers::accounts::{
    AccountForm, AccountResponse, EditAccountForm, StudentDetailResponse, SubjectQuery,
    after_add_path,
};
use crate::schemas::AppState;

const STUDENTS_PATH: &str = "/admins/students";

/// Creates a student under the approval policy and optionally enrolls them.
pub(crate) async fn create_student(
    state: &AppState,
    form: AccountForm,
    enroll_in: Option<i32>,
) -> Result<account::Model, AppError> {
    let approved = !state.settings.approval_policy().requires_approval(Role::Student);
    Ok(identity::create_student(&state.db, form.into_new_account(None), approved, enroll_in).await?)
}

/// List all students
#[utoipa::path(
    get,
    path = "/admins/students",
    tag = "admin",
    responses(
        (status = 200, description = "Students", body = ApiResponse<Vec<AccountResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn list_students(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AccountResponse>>>, AppError> {
    trace!("Entering list_students function");
    let students = identity::list_accounts(&state.db, Role::Student).await?;
    let data = students.into_iter().map(AccountResponse::from).collect();
    Ok(Json(ApiResponse::ok(data, "Students retrieved successfully")))
}

/// Create a student, optionally enrolled in a subject
#[utoipa::path(
    post,
    path = "/admins/students/add",
    tag = "admin",
    params(SubjectQuery),
    request_body(content = AccountForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created"),
        (status = 400, description = "Invalid form", body = common::ErrorResponse),
        (status = 404, description = "Subject not found", body = common::ErrorResponse),
        (status = 409, description = "Username taken", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn add_student(
    State(state): State<AppState>,
    Query(query): Query<SubjectQuery>,
    Valid(Form(form)): Valid<Form<AccountForm>>,
) -> Result<Redirect, AppError> {
    let student = create_student(&state, form, query.subject_id).await?;
    info!("Admin added student '{}' with ID {}", student.username, student.id);
    Ok(Redirect::to(&after_add_path(query.subject_id, STUDENTS_PATH)))
}

/// Get a student and their profile for editing
#[utoipa::path(
    get,
    path = "/admins/students/edit/{student_id}",
    tag = "admin",
    params(("student_id" = i32, Path, description = "Student account ID")),
    responses(
        (status = 200, description = "Student", body = ApiResponse<StudentDetailResponse>),
        (status = 404, description = "Student not found", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_student(
    Path(student_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StudentDetailResponse>>, AppError> {
    let student = identity::find_account(&state.db, Role::Student, student_id).await?;
    let profile = identity::ensure_student_profile(&state.db, &student).await?;
    Ok(Json(ApiResponse::ok(
        StudentDetailResponse::new(student, profile),
        "Student retrieved successfully",
    )))
}

/// Update a student and their profile
#[utoipa::path(
    post,
    path = "/admins/students/edit/{student_id}",
    tag = "admin",
    params(("student_id" = i32, Path, description = "Student account ID")),
    request_body(content = EditAccountForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated"),
        (status = 404, description = "Student not found", body = common::ErrorResponse),
        (status = 409, description = "Username taken", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state, form))]
pub async fn edit_student(
    Path(student_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Form(form)): Valid<Form<EditAccountForm>>,
) -> Result<Redirect, AppError> {
    let updated =
        identity::update_account(&state.db, Role::Student, student_id, form.account_update())
            .await?;
    let profile =
        identity::update_student_profile(&state.db, updated.id, form.roll_no, form.course).await?;
    debug!(
        "Student {} updated, roll number {}, course {}",
        updated.id, profile.roll_no, profile.course
    );
    Ok(Redirect::to(STUDENTS_PATH))
}

/// Delete a student with their profile and attendance
#[utoipa::path(
    post,
    path = "/admins/students/delete/{student_id}",
    tag = "admin",
    params(("student_id" = i32, Path, description = "Student account ID")),
    responses(
        (status = 303, description = "Deleted"),
        (status = 404, description = "Student not found", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_student(
    Path(student_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    identity::delete_account(&state.db, Role::Student, student_id).await?;
    Ok(Redirect::to(STUDENTS_PATH))
}

/// Approve a student
#[utoipa::path(
    post,
    path = "/admins/students/approve/{student_id}",
    tag = "admin",
    params(("student_id" = i32, Path, description = "Student account ID")),
    responses(
        (status = 303, description = "Approved"),
        (status = 404, description = "Student not found", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn approve_student(
    Path(student_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    identity::approve_with_role(&state.db, Role::Student, student_id).await?;
    Ok(Redirect::to(STUDENTS_PATH))
}
