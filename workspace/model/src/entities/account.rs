use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The role an account plays in the school.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "teacher")]
    Teacher,
    #[sea_orm(string_value = "student")]
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    /// Where a freshly authenticated account of this role lands.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin_dashboard",
            Role::Teacher => "/teacher_dashboard",
            Role::Student => "/student/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

/// A login identity. Teachers, students and admins all live in this table,
/// distinguished by `role`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Display name, used by admins instead of first/last name.
    pub full_name: Option<String>,
    pub role: Role,
    /// Unapproved accounts cannot log in.
    pub is_approved: bool,
    /// Admits the account to admin-gated routes regardless of its role.
    pub is_superuser: bool,
    /// Subject picked on the registration form. Not a roster membership.
    pub subject_id: Option<i32>,
    pub date_joined: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id",
        on_delete = "SetNull"
    )]
    RegisteredSubject,
    #[sea_orm(has_one = "super::student_profile::Entity")]
    StudentProfile,
    #[sea_orm(has_many = "super::subject_teacher::Entity")]
    SubjectTeacher,
    #[sea_orm(has_many = "super::subject_student::Entity")]
    SubjectStudent,
    #[sea_orm(has_many = "super::session::Entity")]
    Session,
}

impl Related<super::student_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentProfile.def()
    }
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Best human readable name for listings.
    pub fn display_name(&self) -> String {
        if let Some(full_name) = self.full_name.as_ref().filter(|n| !n.trim().is_empty()) {
            return full_name.clone();
        }
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.trim().is_empty())
            .collect();
        if parts.is_empty() {
            self.username.clone()
        } else {
            parts.join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(first: Option<&str>, last: Option<&str>, full: Option<&str>) -> Model {
        Model {
            id: 1,
            username: "jdoe".to_string(),
            password_hash: String::new(),
            email: None,
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            full_name: full.map(str::to_string),
            role: Role::Teacher,
            is_approved: true,
            is_superuser: false,
            subject_id: None,
            date_joined: chrono::NaiveDate::from_ymd_opt(2024, 9, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Admin, Role::Teacher, Role::Student] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(" Teacher ".parse::<Role>().unwrap(), Role::Teacher);
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn test_dashboard_path_depends_only_on_role() {
        assert_eq!(Role::Admin.dashboard_path(), "/admin_dashboard");
        assert_eq!(Role::Teacher.dashboard_path(), "/teacher_dashboard");
        assert_eq!(Role::Student.dashboard_path(), "/student/dashboard");
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        assert_eq!(account(Some("Jane"), Some("Doe"), Some("Dr. Doe")).display_name(), "Dr. Doe");
        assert_eq!(account(Some("Jane"), Some("Doe"), None).display_name(), "Jane Doe");
        assert_eq!(account(None, None, Some("  ")).display_name(), "jdoe");
    }
}
