use crate::guard::{RoleGuard, require_role};
use crate::handlers::{
    admin::{admin_dashboard, approve_from_dashboard},
    auth::{login, logout, register, register_page},
    health::health_check,
    student::student_dashboard,
    students::{add_student, approve_student, delete_student, edit_student, get_student, list_students},
    subjects::{
        add_subject, change_membership, delete_subject, edit_subject, get_subject, list_subjects,
        subject_detail,
    },
    teacher::{add_student_to_subject, attendance_sheet, mark_attendance, teacher_dashboard},
    teachers::{add_teacher, approve_teacher, delete_teacher, edit_teacher, get_teacher, list_teachers},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use compute::access::RoleSet;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Puts every route of `routes` behind a session check for `allowed`.
fn guarded(state: &AppState, allowed: RoleSet, routes: Router<AppState>) -> Router<AppState> {
    routes.route_layer(middleware::from_fn_with_state(
        RoleGuard::new(state.clone(), allowed),
        require_role,
    ))
}

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health_check))
        .route("/register", get(register_page).post(register))
        .route("/login", post(login));

    let authenticated = Router::new().route("/logout", get(logout).post(logout));

    let admin = Router::new()
        .route("/admin_dashboard", get(admin_dashboard).post(approve_from_dashboard))
        // Teacher CRUD
        .route("/admins/teachers", get(list_teachers))
        .route("/admins/teachers/add", post(add_teacher))
        .route("/admins/teachers/edit/:teacher_id", get(get_teacher).post(edit_teacher))
        .route("/admins/teachers/delete/:teacher_id", post(delete_teacher))
        .route("/admins/teachers/approve/:teacher_id", post(approve_teacher))
        // Student CRUD
        .route("/admins/students", get(list_students))
        .route("/admins/students/add", post(add_student))
        .route("/admins/students/edit/:student_id", get(get_student).post(edit_student))
        .route("/admins/students/delete/:student_id", post(delete_student))
        .route("/admins/students/approve/:student_id", post(approve_student))
        // Subjects and rosters
        .route("/admins/subjects", get(list_subjects))
        .route("/admins/subjects/add", post(add_subject))
        .route("/admins/subjects/:subject_id", get(subject_detail).post(change_membership))
        .route("/admins/subjects/edit/:subject_id", get(get_subject).post(edit_subject))
        .route("/admins/subjects/delete/:subject_id", post(delete_subject));

    let teacher = Router::new()
        .route("/teacher_dashboard", get(teacher_dashboard))
        .route(
            "/teacher/subject/:subject_id/attendance",
            get(attendance_sheet).post(mark_attendance),
        );

    let staff = Router::new().route(
        "/teacher/subject/:subject_id/add_student",
        post(add_student_to_subject),
    );

    let student = Router::new().route("/student/dashboard", get(student_dashboard));

    Router::new()
        .merge(public)
        .merge(guarded(&state, RoleSet::ANY, authenticated))
        .merge(guarded(&state, RoleSet::ADMIN, admin))
        .merge(guarded(&state, RoleSet::TEACHER, teacher))
        .merge(guarded(&state, RoleSet::ADMIN_OR_TEACHER, staff))
        .merge(guarded(&state, RoleSet::STUDENT, student))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
