use axum::{
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Json, Redirect, Response},
    Form,
};
use axum_valid::Valid;
use chrono::Local;
use common::ApiResponse;
use compute::identity::{self, NewAccount};
use compute::roster;
use compute::session::{create_session, revoke_session};
use model::entities::account::Role;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;
use crate::guard::{expired_session_cookie, session_cookie, session_token};
use crate::handlers::accounts::parse_subject_id;
use crate::handlers::subjects::SubjectResponse;
use crate::schemas::AppState;

/// Self-service registration form
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct RegisterForm {
    /// Username (must be unique)
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password1: String,
    #[validate(must_match(other = "password1", message = "Passwords do not match"))]
    pub password2: String,
    /// `admin`, `teacher` or `student`
    pub role: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    /// Display name, used for admins
    pub name: Option<String>,
    /// Subject to register with (ignored for admins), blank for none
    pub subject_id: Option<String>,
}

/// Login form
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// What the registration page needs to render its choices
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterPageResponse {
    pub roles: Vec<String>,
    pub subjects: Vec<SubjectResponse>,
}

/// Registration page data
#[utoipa::path(
    get,
    path = "/register",
    tag = "auth",
    responses(
        (status = 200, description = "Registration choices", body = ApiResponse<RegisterPageResponse>),
        (status = 500, description = "Internal server error", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn register_page(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RegisterPageResponse>>, AppError> {
    let subjects = roster::list_subjects(&state.db)
        .await?
        .into_iter()
        .map(|summary| SubjectResponse::from(summary.subject))
        .collect();

    let page = RegisterPageResponse {
        roles: [Role::Admin, Role::Teacher, Role::Student]
            .iter()
            .map(|r| r.to_string())
            .collect(),
        subjects,
    };
    Ok(Json(ApiResponse::ok(page, "Registration form")))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Account created, redirect to /login"),
        (status = 400, description = "Invalid form", body = common::ErrorResponse),
        (status = 404, description = "Unknown subject", body = common::ErrorResponse),
        (status = 409, description = "Username taken", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state, form), fields(username = %form.username, role = %form.role))]
pub async fn register(
    State(state): State<AppState>,
    Valid(Form(form)): Valid<Form<RegisterForm>>,
) -> Result<Redirect, AppError> {
    trace!("Entering register function");

    let role: Role = form.role.parse().map_err(AppError::Validation)?;
    let subject_id = parse_subject_id(form.subject_id.as_deref())?;
    let account = NewAccount {
        username: form.username,
        password: form.password1,
        email: form.email,
        first_name: form.first_name,
        last_name: form.last_name,
        full_name: form.full_name,
        subject_id,
    };

    let created = identity::register(
        &state.db,
        &state.settings.approval_policy(),
        role,
        account,
        form.name,
    )
    .await?;

    info!(
        "Registered {} '{}' (approved: {})",
        created.role, created.username, created.is_approved
    );
    Ok(Redirect::to("/login"))
}

/// Log in and open a session
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Logged in, redirect to the role dashboard"),
        (status = 401, description = "Invalid credentials or account not approved yet", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    trace!("Entering login function");

    let account = identity::authenticate(&state.db, &form.username, &form.password).await?;
    let token = create_session(&state.db, &account, Local::now().naive_local()).await?;

    let cookie = session_cookie(
        &token,
        state.settings.session_ttl().num_seconds(),
        state.settings.cookie_secure,
    )?;
    let target = account.role.dashboard_path();
    debug!("Redirecting account {} to {}", account.id, target);

    Ok(([(header::SET_COOKIE, cookie)], Redirect::to(target)).into_response())
}

/// End the current session
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    responses(
        (status = 303, description = "Session ended, redirect to /login")
    )
)]
#[instrument(skip(state, headers))]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        revoke_session(&state.db, &token).await?;
        info!("Session ended");
    }

    Ok((
        [(header::SET_COOKIE, expired_session_cookie())],
        Redirect::to("/login"),
    )
        .into_response())
}
