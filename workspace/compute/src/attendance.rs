//! Marking attendance and reporting it back.
//!
//! Records are keyed by `(student profile, subject, date)`. Every write is a
//! single `INSERT .. ON CONFLICT DO UPDATE` on that key, so re-marking a day
//! replaces the status and the marker instead of adding a row.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, trace, warn};

use common::dates::month_bounds;
use common::{MarkState, attendance_percentage};
use model::entities::account::{self, Role};
use model::entities::attendance_record::{self, AttendanceStatus};
use model::entities::{student_profile, subject};

use crate::error::{ComputeError, Result};
use crate::identity::ensure_student_profile;
use crate::roster::{get_subject, is_teacher_of, students_of, subjects_enrolled};

/// Prefix of the per-student form field, followed by the profile id.
pub const STATUS_FIELD_PREFIX: &str = "status_";

/// An enrolled student together with their profile.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub account: account::Model,
    pub profile: student_profile::Model,
}

impl RosterEntry {
    /// Name of the form field carrying this student's status.
    pub fn field_name(&self) -> String {
        format!("{}{}", STATUS_FIELD_PREFIX, self.profile.id)
    }
}

/// Outcome of one marking submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkSummary {
    /// Records inserted or overwritten.
    pub marked: usize,
    /// Enrolled students with no field or an unrecognised code.
    pub skipped: usize,
    /// Status fields naming nobody on the roster.
    pub ignored: usize,
}

#[derive(Debug, Clone)]
pub struct DayEntry {
    pub student: RosterEntry,
    pub state: MarkState,
}

/// The marking sheet of a subject for one day.
#[derive(Debug, Clone)]
pub struct DaySheet {
    pub subject: subject::Model,
    pub date: NaiveDate,
    pub entries: Vec<DayEntry>,
}

/// What a student sees on their dashboard.
#[derive(Debug, Clone)]
pub struct StudentReport {
    pub profile: student_profile::Model,
    pub subjects: Vec<subject::Model>,
    pub selected_subject: Option<subject::Model>,
    pub as_of: NaiveDate,
    /// Records up to and including `as_of`, newest first.
    pub records: Vec<attendance_record::Model>,
    /// Counts over the calendar month of today.
    pub present_count: u64,
    pub absent_count: u64,
    pub percentage: Decimal,
}

/// Enrolled students of a subject, fetched fresh, with their profiles.
pub async fn enrolled_roster<C>(db: &C, subject_id: i32) -> Result<Vec<RosterEntry>>
where
    C: ConnectionTrait,
{
    let students = students_of(db, subject_id).await?;
    let mut roster = Vec::with_capacity(students.len());
    for account in students {
        let profile = ensure_student_profile(db, &account).await?;
        roster.push(RosterEntry { account, profile });
    }
    Ok(roster)
}

/// Subject must exist and `teacher` must be one of its teachers.
async fn authorize_teacher<C>(
    db: &C,
    teacher: &account::Model,
    subject_id: i32,
) -> Result<subject::Model>
where
    C: ConnectionTrait,
{
    let subject = get_subject(db, subject_id).await?;
    if teacher.role != Role::Teacher || !is_teacher_of(db, teacher.id, subject.id).await? {
        return Err(ComputeError::Forbidden(format!(
            "Account {} does not teach subject {}",
            teacher.id, subject.id
        )));
    }
    Ok(subject)
}

/// Upserts the statuses submitted for `date`.
///
/// `statuses` maps form field names (`status_<profileId>`) to codes. Only
/// students currently enrolled are considered; unknown codes are skipped.
#[instrument(skip(db, teacher, statuses), fields(teacher_id = teacher.id))]
pub async fn mark_attendance(
    db: &DatabaseConnection,
    teacher: &account::Model,
    subject_id: i32,
    date: NaiveDate,
    statuses: &HashMap<String, String>,
) -> Result<MarkSummary> {
    trace!("Entering mark_attendance function");

    let txn = db.begin().await?;
    let subject = authorize_teacher(&txn, teacher, subject_id).await?;
    let roster = enrolled_roster(&txn, subject.id).await?;

    let mut summary = MarkSummary::default();
    for entry in &roster {
        let code = statuses.get(&entry.field_name()).map(|c| c.trim());
        let Some(status) = code.and_then(AttendanceStatus::from_code) else {
            if let Some(code) = code.filter(|c| !c.is_empty()) {
                debug!("Skipping unrecognised status '{}' for profile {}", code, entry.profile.id);
            }
            summary.skipped += 1;
            continue;
        };

        let record = attendance_record::ActiveModel {
            student_id: Set(entry.profile.id),
            subject_id: Set(subject.id),
            date: Set(date),
            status: Set(status),
            marked_by: Set(teacher.id),
            ..Default::default()
        };
        attendance_record::Entity::insert(record)
            .on_conflict(
                OnConflict::columns([
                    attendance_record::Column::StudentId,
                    attendance_record::Column::SubjectId,
                    attendance_record::Column::Date,
                ])
                .update_columns([
                    attendance_record::Column::Status,
                    attendance_record::Column::MarkedBy,
                ])
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        summary.marked += 1;
    }

    let on_roster = roster.iter().map(|e| e.field_name()).collect::<Vec<_>>();
    summary.ignored = statuses
        .keys()
        .filter(|k| k.starts_with(STATUS_FIELD_PREFIX) && !on_roster.contains(k))
        .count();
    if summary.ignored > 0 {
        warn!(
            "{} status fields did not match an enrolled student of subject {}",
            summary.ignored, subject.id
        );
    }

    txn.commit().await?;
    info!(
        "Attendance for subject {} on {}: {} marked, {} skipped",
        subject.id, date, summary.marked, summary.skipped
    );
    Ok(summary)
}

/// The tri-state sheet of `date` as written by `teacher`.
#[instrument(skip(db, teacher), fields(teacher_id = teacher.id))]
pub async fn day_attendance(
    db: &DatabaseConnection,
    teacher: &account::Model,
    subject_id: i32,
    date: NaiveDate,
) -> Result<DaySheet> {
    let subject = authorize_teacher(db, teacher, subject_id).await?;
    let roster = enrolled_roster(db, subject.id).await?;

    let records = attendance_record::Entity::find()
        .filter(attendance_record::Column::SubjectId.eq(subject.id))
        .filter(attendance_record::Column::Date.eq(date))
        .filter(attendance_record::Column::MarkedBy.eq(teacher.id))
        .all(db)
        .await?;
    let by_student: HashMap<i32, AttendanceStatus> =
        records.into_iter().map(|r| (r.student_id, r.status)).collect();

    let entries = roster
        .into_iter()
        .map(|student| {
            let state = match by_student.get(&student.profile.id) {
                Some(AttendanceStatus::Present) => MarkState::Present,
                Some(AttendanceStatus::Absent) => MarkState::Absent,
                None => MarkState::Unmarked,
            };
            DayEntry { student, state }
        })
        .collect::<Vec<_>>();

    debug!("Day sheet for subject {} on {} has {} entries", subject.id, date, entries.len());
    Ok(DaySheet {
        subject,
        date,
        entries,
    })
}

/// Builds the dashboard report of a student.
///
/// `subject_id` defaults to the first enrolled subject and `as_of` to
/// `today`. Monthly counts always cover the month of `today`.
#[instrument(skip(db, student), fields(student_id = student.id))]
pub async fn student_report(
    db: &DatabaseConnection,
    student: &account::Model,
    subject_id: Option<i32>,
    as_of: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<StudentReport> {
    trace!("Entering student_report function");

    let profile = ensure_student_profile(db, student).await?;
    let subjects = subjects_enrolled(db, student.id).await?;
    let as_of = as_of.unwrap_or(today);

    let selected_subject = match subject_id {
        Some(id) => Some(get_subject(db, id).await?),
        None => subjects.first().cloned(),
    };

    let Some(selected) = selected_subject.as_ref() else {
        debug!("Student {} has no subject to report on", student.id);
        return Ok(StudentReport {
            profile,
            subjects,
            selected_subject: None,
            as_of,
            records: Vec::new(),
            present_count: 0,
            absent_count: 0,
            percentage: Decimal::ZERO,
        });
    };

    let records = attendance_record::Entity::find()
        .filter(attendance_record::Column::StudentId.eq(profile.id))
        .filter(attendance_record::Column::SubjectId.eq(selected.id))
        .filter(attendance_record::Column::Date.lte(as_of))
        .order_by_desc(attendance_record::Column::Date)
        .all(db)
        .await?;

    let (month_start, next_month) = month_bounds(today);
    let in_month = || {
        attendance_record::Entity::find()
            .filter(attendance_record::Column::StudentId.eq(profile.id))
            .filter(attendance_record::Column::SubjectId.eq(selected.id))
            .filter(attendance_record::Column::Date.gte(month_start))
            .filter(attendance_record::Column::Date.lt(next_month))
    };
    let present_count = in_month()
        .filter(attendance_record::Column::Status.eq(AttendanceStatus::Present))
        .count(db)
        .await?;
    let absent_count = in_month()
        .filter(attendance_record::Column::Status.eq(AttendanceStatus::Absent))
        .count(db)
        .await?;

    let percentage = attendance_percentage(present_count, absent_count);
    debug!(
        "Report for student {} in subject {}: {} records, {}% this month",
        student.id,
        selected.id,
        records.len(),
        percentage
    );

    Ok(StudentReport {
        profile,
        subjects,
        selected_subject,
        as_of,
        records,
        present_count,
        absent_count,
        percentage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{add_student, add_teacher, create_subject};
    use crate::testing::{setup_db, student, teacher};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn form(pairs: &[(i32, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(id, code)| (format!("status_{}", id), code.to_string()))
            .collect()
    }

    struct Class {
        db: DatabaseConnection,
        subject: subject::Model,
        teacher: account::Model,
        students: Vec<RosterEntry>,
    }

    async fn class_of(names: &[&str]) -> Class {
        let db = setup_db().await;
        let subject = create_subject(&db, "Physics").await.unwrap();
        let teacher = teacher(&db, "prof").await;
        add_teacher(&db, subject.id, teacher.id).await.unwrap();
        for name in names {
            let s = student(&db, name).await;
            add_student(&db, subject.id, s.id).await.unwrap();
        }
        let mut students = enrolled_roster(&db, subject.id).await.unwrap();
        students.sort_by(|a, b| a.account.username.cmp(&b.account.username));
        Class {
            db,
            subject,
            teacher,
            students,
        }
    }

    #[tokio::test]
    async fn test_marking_twice_overwrites_single_record() {
        let class = class_of(&["amy"]).await;
        let amy = class.students[0].profile.id;
        let day = d(2024, 3, 4);

        mark_attendance(&class.db, &class.teacher, class.subject.id, day, &form(&[(amy, "P")]))
            .await
            .unwrap();

        // A second teacher of the same subject re-marks the day
        let other = teacher(&class.db, "substitute").await;
        add_teacher(&class.db, class.subject.id, other.id).await.unwrap();
        mark_attendance(&class.db, &other, class.subject.id, day, &form(&[(amy, "A")]))
            .await
            .unwrap();

        let records = attendance_record::Entity::find().all(&class.db).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AttendanceStatus::Absent);
        assert_eq!(records[0].marked_by, other.id);
        assert_eq!(records[0].date, day);
    }

    #[tokio::test]
    async fn test_unmarked_student_reads_unmarked() {
        let class = class_of(&["amy", "ben"]).await;
        let amy = class.students[0].profile.id;
        let day = d(2024, 3, 5);

        mark_attendance(&class.db, &class.teacher, class.subject.id, day, &form(&[(amy, "P")]))
            .await
            .unwrap();

        let sheet = day_attendance(&class.db, &class.teacher, class.subject.id, day)
            .await
            .unwrap();
        let states: HashMap<String, MarkState> = sheet
            .entries
            .iter()
            .map(|e| (e.student.account.username.clone(), e.state))
            .collect();
        assert_eq!(states["amy"], MarkState::Present);
        assert_eq!(states["ben"], MarkState::Unmarked);

        let other_day = day_attendance(&class.db, &class.teacher, class.subject.id, d(2024, 3, 6))
            .await
            .unwrap();
        assert!(other_day.entries.iter().all(|e| e.state == MarkState::Unmarked));
    }

    #[tokio::test]
    async fn test_partial_and_invalid_submissions_are_skipped() {
        let class = class_of(&["amy", "ben", "cat"]).await;
        let (amy, ben) = (class.students[0].profile.id, class.students[1].profile.id);

        let mut statuses = form(&[(amy, "A"), (ben, "late")]);
        statuses.insert("status_99999".to_string(), "P".to_string());
        statuses.insert("csrf".to_string(), "x".to_string());

        let summary = mark_attendance(
            &class.db,
            &class.teacher,
            class.subject.id,
            d(2024, 3, 7),
            &statuses,
        )
        .await
        .unwrap();

        assert_eq!(
            summary,
            MarkSummary {
                marked: 1,
                skipped: 2,
                ignored: 1
            }
        );
        assert_eq!(attendance_record::Entity::find().count(&class.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_teacher_of_other_subject_is_forbidden() {
        let class = class_of(&["amy"]).await;
        let amy = class.students[0].profile.id;
        let other_subject = create_subject(&class.db, "Chemistry").await.unwrap();
        let chemist = teacher(&class.db, "chemist").await;
        add_teacher(&class.db, other_subject.id, chemist.id).await.unwrap();

        let result = mark_attendance(
            &class.db,
            &chemist,
            class.subject.id,
            d(2024, 3, 8),
            &form(&[(amy, "P")]),
        )
        .await;
        assert!(matches!(result, Err(ComputeError::Forbidden(_))));
        assert!(matches!(
            day_attendance(&class.db, &chemist, class.subject.id, d(2024, 3, 8)).await,
            Err(ComputeError::Forbidden(_))
        ));
        assert_eq!(attendance_record::Entity::find().count(&class.db).await.unwrap(), 0);

        assert!(matches!(
            mark_attendance(&class.db, &class.teacher, 4242, d(2024, 3, 8), &HashMap::new()).await,
            Err(ComputeError::NotFound { entity: "Subject", .. })
        ));
    }

    #[tokio::test]
    async fn test_report_monthly_percentage() {
        let class = class_of(&["amy"]).await;
        let amy = &class.students[0];
        let marks = [
            (d(2024, 4, 1), "P"),
            (d(2024, 4, 2), "P"),
            (d(2024, 4, 3), "A"),
            (d(2024, 4, 4), "P"),
            // Previous month, outside the monthly window
            (d(2024, 3, 29), "A"),
        ];
        for (day, code) in marks {
            mark_attendance(
                &class.db,
                &class.teacher,
                class.subject.id,
                day,
                &form(&[(amy.profile.id, code)]),
            )
            .await
            .unwrap();
        }

        let today = d(2024, 4, 20);
        let report = student_report(&class.db, &amy.account, None, None, today)
            .await
            .unwrap();
        assert_eq!(report.selected_subject.as_ref().map(|s| s.id), Some(class.subject.id));
        assert_eq!(report.present_count, 3);
        assert_eq!(report.absent_count, 1);
        assert_eq!(report.percentage, Decimal::new(7500, 2));
        assert_eq!(report.records.len(), 5);
        assert_eq!(report.records[0].date, d(2024, 4, 4));

        // as_of trims the listing but not the monthly numbers
        let earlier = student_report(&class.db, &amy.account, None, Some(d(2024, 4, 2)), today)
            .await
            .unwrap();
        assert_eq!(
            earlier.records.iter().map(|r| r.date).collect::<Vec<_>>(),
            vec![d(2024, 4, 2), d(2024, 4, 1), d(2024, 3, 29)]
        );
        assert_eq!(earlier.percentage, Decimal::new(7500, 2));

        let next_month = student_report(&class.db, &amy.account, None, None, d(2024, 5, 2))
            .await
            .unwrap();
        assert_eq!(next_month.percentage, Decimal::ZERO);
        assert_eq!(next_month.present_count + next_month.absent_count, 0);
    }

    #[tokio::test]
    async fn test_report_without_subjects_is_empty() {
        let db = setup_db().await;
        let loner = student(&db, "loner").await;

        let report = student_report(&db, &loner, None, None, d(2024, 1, 10))
            .await
            .unwrap();
        assert!(report.selected_subject.is_none());
        assert!(report.records.is_empty());
        assert_eq!(report.percentage, Decimal::ZERO);
        assert_eq!(report.as_of, d(2024, 1, 10));

        assert!(matches!(
            student_report(&db, &loner, Some(777), None, d(2024, 1, 10)).await,
            Err(ComputeError::NotFound { entity: "Subject", .. })
        ));
    }

    #[tokio::test]
    async fn test_report_defaults_to_lowest_subject_id() {
        let db = setup_db().await;
        let first = create_subject(&db, "Zoology").await.unwrap();
        let second = create_subject(&db, "Anatomy").await.unwrap();
        let s = student(&db, "eve").await;
        add_student(&db, second.id, s.id).await.unwrap();
        add_student(&db, first.id, s.id).await.unwrap();

        let report = student_report(&db, &s, None, None, d(2024, 2, 2)).await.unwrap();
        assert_eq!(report.selected_subject.map(|s| s.id), Some(first.id));
        assert_eq!(report.subjects.len(), 2);

        let explicit = student_report(&db, &s, Some(second.id), None, d(2024, 2, 2))
            .await
            .unwrap();
        assert_eq!(explicit.selected_subject.map(|s| s.id), Some(second.id));
    }
}
