use super::{account, student_profile, subject};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What a teacher recorded for a student on a day.
///
/// Stored as the single letter codes used by the marking form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(1))")]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "P")]
    #[serde(rename = "P")]
    Present,
    #[sea_orm(string_value = "A")]
    #[serde(rename = "A")]
    Absent,
}

impl AttendanceStatus {
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "P",
            AttendanceStatus::Absent => "A",
        }
    }

    /// Parses a form code. Anything other than `P` or `A` is rejected.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "P" => Some(AttendanceStatus::Present),
            "A" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }
}

/// One student's attendance for one subject on one date.
///
/// `(student_id, subject_id, date)` is unique; writes go through an upsert.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// References `student_profiles.id`.
    pub student_id: i32,
    pub subject_id: i32,
    pub date: Date,
    pub status: AttendanceStatus,
    /// The teacher account that wrote the current status.
    pub marked_by: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "student_profile::Entity",
        from = "Column::StudentId",
        to = "student_profile::Column::Id",
        on_delete = "Cascade"
    )]
    StudentProfile,
    #[sea_orm(
        belongs_to = "subject::Entity",
        from = "Column::SubjectId",
        to = "subject::Column::Id",
        on_delete = "Cascade"
    )]
    Subject,
    #[sea_orm(
        belongs_to = "account::Entity",
        from = "Column::MarkedBy",
        to = "account::Column::Id",
        on_delete = "Cascade"
    )]
    MarkedBy,
}

impl Related<student_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentProfile.def()
    }
}

impl Related<subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
