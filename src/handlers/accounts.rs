//! Account views and forms shared by the admin, teacher and auth handlers.

use chrono::NaiveDateTime;
use compute::identity::{AccountUpdate, NewAccount};
use model::entities::{account, student_profile};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppError;

/// Account response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub id: i32,
    pub username: String,
    /// Full name, first and last name, or the username
    pub display_name: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    /// One of `admin`, `teacher`, `student`
    pub role: String,
    pub is_approved: bool,
    pub is_superuser: bool,
    /// Subject chosen at registration
    pub subject_id: Option<i32>,
    pub date_joined: NaiveDateTime,
}

impl From<account::Model> for AccountResponse {
    fn from(model: account::Model) -> Self {
        Self {
            id: model.id,
            display_name: model.display_name(),
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            full_name: model.full_name,
            role: model.role.to_string(),
            is_approved: model.is_approved,
            is_superuser: model.is_superuser,
            subject_id: model.subject_id,
            date_joined: model.date_joined,
        }
    }
}

/// A student account together with its profile
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StudentDetailResponse {
    pub account: AccountResponse,
    pub profile_id: i32,
    pub roll_no: String,
    pub course: String,
}

impl StudentDetailResponse {
    pub fn new(account: account::Model, profile: student_profile::Model) -> Self {
        Self {
            account: account.into(),
            profile_id: profile.id,
            roll_no: profile.roll_no,
            course: profile.course,
        }
    }
}

/// Form used by admins and teachers to create an account
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct AccountForm {
    /// Username (must be unique)
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password1: String,
    #[validate(must_match(other = "password1", message = "Passwords do not match"))]
    pub password2: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
}

impl AccountForm {
    pub fn into_new_account(self, subject_id: Option<i32>) -> NewAccount {
        NewAccount {
            username: self.username,
            password: self.password1,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            full_name: self.full_name,
            subject_id,
        }
    }
}

/// Form for editing an account. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct EditAccountForm {
    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,
    /// New password, ignored when empty
    pub password: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    /// Students only
    pub roll_no: Option<String>,
    /// Students only
    pub course: Option<String>,
}

impl EditAccountForm {
    pub fn account_update(&self) -> AccountUpdate {
        AccountUpdate {
            username: self.username.clone(),
            password: self.password.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

/// Optional subject to attach a new account to
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubjectQuery {
    pub subject_id: Option<i32>,
}

/// Where an admin lands after adding an account.
pub fn after_add_path(subject_id: Option<i32>, list_path: &str) -> String {
    match subject_id {
        Some(id) => format!("/admins/subjects/{}", id),
        None => list_path.to_string(),
    }
}

/// Reads an optional subject id from a form or query value. Blank means none.
pub fn parse_subject_id(raw: Option<&str>) -> Result<Option<i32>, AppError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<i32>()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid subject id '{}'", value))),
    }
}
