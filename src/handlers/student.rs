use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use chrono::{Local, NaiveDate};
use common::ApiResponse;
use common::dates::parse_date_or;
use compute::attendance;
use model::entities::attendance_record;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::guard::CurrentAccount;
use crate::handlers::accounts::parse_subject_id;
use crate::handlers::subjects::SubjectResponse;
use crate::schemas::AppState;

/// Report filters. Both are optional; a date that does not parse means today.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    /// Subject to report on, defaults to the first enrolled subject
    pub subject_id: Option<String>,
    /// Show records up to this date (YYYY-MM-DD)
    pub date: Option<String>,
}

/// One attendance record
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecordResponse {
    pub date: NaiveDate,
    /// `P` or `A`
    pub status: String,
    pub marked_by: i32,
}

impl From<attendance_record::Model> for AttendanceRecordResponse {
    fn from(model: attendance_record::Model) -> Self {
        Self {
            date: model.date,
            status: model.status.code().to_string(),
            marked_by: model.marked_by,
        }
    }
}

/// Student dashboard
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StudentDashboardResponse {
    pub roll_no: String,
    pub course: String,
    pub subjects: Vec<SubjectResponse>,
    pub selected_subject_id: Option<i32>,
    pub selected_date: NaiveDate,
    /// Records up to the selected date, newest first
    pub attendance: Vec<AttendanceRecordResponse>,
    /// Present days this calendar month
    pub present_count: u64,
    /// Absent days this calendar month
    pub absent_count: u64,
    /// Present share of this month's marked days, in percent
    pub percentage: Decimal,
}

#[utoipa::path(
    get,
    path = "/student/dashboard",
    tag = "student",
    params(ReportQuery),
    responses(
        (status = 200, description = "Attendance report", body = ApiResponse<StudentDashboardResponse>),
        (status = 303, description = "Not logged in"),
        (status = 403, description = "Not a student", body = common::ErrorResponse),
        (status = 404, description = "Subject not found", body = common::ErrorResponse)
    )
)]
#[instrument(skip(state, current), fields(student_id = current.0.id))]
pub async fn student_dashboard(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
    Extension(current): Extension<CurrentAccount>,
) -> Result<Json<ApiResponse<StudentDashboardResponse>>, AppError> {
    trace!("Entering student_dashboard function");

    let today = Local::now().date_naive();
    let subject_id = parse_subject_id(query.subject_id.as_deref())?;
    let as_of = parse_date_or(query.date.as_deref(), today);
    debug!("Report for subject {:?} as of {}", subject_id, as_of);

    let report =
        attendance::student_report(&state.db, &current.0, subject_id, Some(as_of), today).await?;

    let response = StudentDashboardResponse {
        roll_no: report.profile.roll_no,
        course: report.profile.course,
        subjects: report.subjects.into_iter().map(SubjectResponse::from).collect(),
        selected_subject_id: report.selected_subject.map(|s| s.id),
        selected_date: report.as_of,
        attendance: report
            .records
            .into_iter()
            .map(AttendanceRecordResponse::from)
            .collect(),
        present_count: report.present_count,
        absent_count: report.absent_count,
        percentage: report.percentage,
    };
    Ok(Json(ApiResponse::ok(response, "Attendance report")))
}
