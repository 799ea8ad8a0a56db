use axum::{
    extract::{Path, Query, State},
    response::{Json, Redirect},
    Form,
};
use axum_valid::Valid;
use common::ApiResponse;
use compute::{identity, roster};
use model::entities::account::Role;
use tracing::{debug, info, instrument, trace};

use crate::error::AppError;
use crate::handlers::accounts::{
    AccountForm, AccountResponse, EditAccountForm, SubjectQuery, after_add_path,
};
use crate::schemas::AppState;

const TEACHERS_PATH: &str = "/admins/teachers";

/// List all teachers
#[utoipa::path(
    get,
    path = "/admins/teachers",
    tag = "admin",
    responses(
        (status = 200, description = "Teachers", body = ApiResponse<Vec<AccountResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn list_teachers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AccountResponse>>>, AppError> {
    trace!("Entering list_teachers function");
    let teachers = identity::list_accounts(&state.db, Role::Teacher).await?;
    let data = teachers.into_iter().map(AccountResponse::from).collect();
    Ok(Json(ApiResponse::ok(data, "Teachers retrieved successfully")))
}

/// Create an approved teacher, optionally assigned to a subject
#[utoipa::path(
    post,
    path = "/admins/teachers/add",
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
pub async fn add_teacher(
    State(state): State<AppState>,
    Query(query): Query<SubjectQuery>,
    Valid(Form(form)): Valid<Form<AccountForm>>,
) -> Result<Redirect, AppError> {
    trace!("Entering add_teacher function");

    if let Some(subject_id) = query.subject_id {
        roster::get_subject(&state.db, subject_id).await?;
    }

    // Added by an admin, so no approval round trip
    let teacher = identity::create_account(
        &state.db,
        Role::Teacher,
        form.into_new_account(None),
        true,
        false,
    )
    .await?;

    if let Some(subject_id) = query.subject_id {
        roster::add_teacher(&state.db, subject_id, teacher.id).await?;
    }

    info!("Admin added teacher '{}' with ID {}", teacher.username, teacher.id);
    Ok(Redirect::to(&after_add_path(query.subject_id, TEACHERS_PATH)))
}

/// Get a teacher for editing
#[utoipa::path(
    get,
    path = "/admins/teachers/edit/{teacher_id}",
    tag = "admin",
    params(("teacher_id" = i32, Path, description = "Teacher account ID")),
    responses(
        (status = 200, description = "Teacher", body = ApiResponse<AccountResponse>),
        (status = 404, description = "Teacher not found", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_teacher(
    Path(teacher_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AccountResponse>>, AppError> {
    let teacher = identity::find_account(&state.db, Role::Teacher, teacher_id).await?;
    Ok(Json(ApiResponse::ok(teacher.into(), "Teacher retrieved successfully")))
}

/// Update a teacher
#[utoipa::path(
    post,
    path = "/admins/teachers/edit/{teacher_id}",
    tag = "admin",
    params(("teacher_id" = i32, Path, description = "Teacher account ID")),
    request_body(content = EditAccountForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated"),
        (status = 404, description = "Teacher not found", body = common::ErrorResponse),
        (status = 409, description = "Username taken", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state, form))]
pub async fn edit_teacher(
    Path(teacher_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Form(form)): Valid<Form<EditAccountForm>>,
) -> Result<Redirect, AppError> {
    let updated =
        identity::update_account(&state.db, Role::Teacher, teacher_id, form.account_update())
            .await?;
    debug!("Teacher {} updated", updated.id);
    Ok(Redirect::to(TEACHERS_PATH))
}

/// Delete a teacher
#[utoipa::path(
    post,
    path = "/admins/teachers/delete/{teacher_id}",
    tag = "admin",
    params(("teacher_id" = i32, Path, description = "Teacher account ID")),
    responses(
        (status = 303, description = "Deleted"),
        (status = 404, description = "Teacher not found", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_teacher(
    Path(teacher_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    identity::delete_account(&state.db, Role::Teacher, teacher_id).await?;
    Ok(Redirect::to(TEACHERS_PATH))
}

/// Approve a teacher
#[utoipa::path(
    post,
    path = "/admins/teachers/approve/{teacher_id}",
    tag = "admin",
    params(("teacher_id" = i32, Path, description = "Teacher account ID")),
    responses(
        (status = 303, description = "Approved"),
        (status = 404, description = "Teacher not found", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn approve_teacher(
    Path(teacher_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    identity::approve_with_role(&state.db, Role::Teacher, teacher_id).await?;
    Ok(Redirect::to(TEACHERS_PATH))
}
