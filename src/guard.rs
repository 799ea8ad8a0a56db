//! Session cookie handling and the role gate put in front of route groups.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use chrono::Local;
use compute::access::{Access, RoleSet, authorize};
use compute::session::resolve_session;
use model::entities::account;
use tracing::{debug, error, trace, warn};

use crate::error::AppError;
use crate::schemas::AppState;

pub const SESSION_COOKIE: &str = "rollcall_session";

/// The authenticated caller, inserted into request extensions by
/// [`require_role`].
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub account::Model);

/// State of one `require_role` layer.
#[derive(Clone)]
pub struct RoleGuard {
    state: AppState,
    allowed: RoleSet,
}

impl RoleGuard {
    pub fn new(state: AppState, allowed: RoleSet) -> Self {
        Self { state, allowed }
    }
}

/// Value of the session cookie, if the request carries one.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| match value.to_str() {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Ignoring unreadable cookie header {:?}: {}", value, e);
                None
            }
        })
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn cookie_header(value: String) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&value).map_err(|e| {
        error!("Failed to build session cookie: {}", e);
        AppError::Validation("Invalid session token".to_string())
    })
}

/// `Set-Cookie` value opening a session.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> Result<HeaderValue, AppError> {
    let secure = if secure { "; Secure" } else { "" };
    cookie_header(format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        SESSION_COOKIE, token, max_age_secs, secure
    ))
}

/// `Set-Cookie` value removing the session cookie.
pub fn expired_session_cookie() -> HeaderValue {
    HeaderValue::from_static("rollcall_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Lets the request through only for a live session whose account is in the
/// guard's role set.
///
/// Missing or dead sessions are sent to `/login`; a wrong role gets a 403.
pub async fn require_role(
    State(guard): State<RoleGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    trace!("Checking session for {}", request.uri().path());

    let Some(token) = session_token(request.headers()) else {
        debug!("No session cookie on request to {}", request.uri().path());
        return Err(AppError::Unauthenticated);
    };

    let now = Local::now().naive_local();
    let account = resolve_session(&guard.state.db, &token, guard.state.settings.session_ttl(), now)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if authorize(&account, guard.allowed) == Access::Forbidden {
        warn!(
            "Account {} with role {} denied access to {}",
            account.id,
            account.role,
            request.uri().path()
        );
        return Err(AppError::Forbidden(format!(
            "{} accounts cannot access this page",
            account.role
        )));
    }

    request.extensions_mut().insert(CurrentAccount(account));
    Ok(next.run(request).await)
}
