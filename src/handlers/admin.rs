use axum::{
    extract::State,
    response::{Json, Redirect},
    Form,
};
use common::ApiResponse;
use compute::identity;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::handlers::accounts::AccountResponse;
use crate::schemas::AppState;

/// Admin dashboard: teachers waiting for approval and totals
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminDashboardResponse {
    pub pending_teachers: Vec<AccountResponse>,
    pub total_teachers: u64,
    pub total_students: u64,
    pub total_subjects: u64,
    /// Teachers plus students
    pub total_users: u64,
}

/// Approval submitted from the dashboard
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ApproveForm {
    pub approve_id: i32,
}

#[utoipa::path(
    get,
    path = "/admin_dashboard",
    tag = "admin",
    responses(
        (status = 200, description = "Dashboard data", body = ApiResponse<AdminDashboardResponse>),
        (status = 303, description = "Not logged in"),
        (status = 403, description = "Not an admin", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn admin_dashboard(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AdminDashboardResponse>>, AppError> {
    trace!("Entering admin_dashboard function");

    let overview = identity::admin_overview(&state.db).await?;
    debug!("{} teachers waiting for approval", overview.pending_teachers.len());

    let response = AdminDashboardResponse {
        pending_teachers: overview
            .pending_teachers
            .into_iter()
            .map(AccountResponse::from)
            .collect(),
        total_teachers: overview.total_teachers,
        total_students: overview.total_students,
        total_subjects: overview.total_subjects,
        total_users: overview.total_users,
    };
    Ok(Json(ApiResponse::ok(response, "Admin dashboard")))
}

/// Approve an account from the dashboard
#[utoipa::path(
    post,
    path = "/admin_dashboard",
    tag = "admin",
    request_body(content = ApproveForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Approved, back to the dashboard"),
        (status = 404, description = "Account not found", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn approve_from_dashboard(
    State(state): State<AppState>,
    Form(form): Form<ApproveForm>,
) -> Result<Redirect, AppError> {
    let approved = identity::approve(&state.db, form.approve_id).await?;
    info!("Approved {} '{}' from dashboard", approved.role, approved.username);
    Ok(Redirect::to("/admin_dashboard"))
}
