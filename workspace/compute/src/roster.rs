//! Subjects and their teacher and student sets.

use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, trace, warn};

use model::entities::account::{self, Role};
use model::entities::{attendance_record, subject, subject_student, subject_teacher};

use crate::error::{ComputeError, Result};
use crate::identity::{ensure_student_profile, find_account};

const MAX_SUBJECT_NAME_LEN: usize = 100;

/// A subject with the size of its teacher and student sets.
#[derive(Debug, Clone)]
pub struct SubjectSummary {
    pub subject: subject::Model,
    pub teacher_count: u64,
    pub student_count: u64,
}

/// Everything the subject detail page shows.
#[derive(Debug, Clone)]
pub struct SubjectRoster {
    pub subject: subject::Model,
    pub teachers: Vec<account::Model>,
    pub students: Vec<account::Model>,
    pub available_teachers: Vec<account::Model>,
    pub available_students: Vec<account::Model>,
}

fn validate_subject_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ComputeError::Validation("Subject name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_SUBJECT_NAME_LEN {
        return Err(ComputeError::Validation(format!(
            "Subject name must be at most {} characters",
            MAX_SUBJECT_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

#[instrument(skip(db))]
pub async fn create_subject(db: &DatabaseConnection, name: &str) -> Result<subject::Model> {
    trace!("Entering create_subject function");
    let name = validate_subject_name(name)?;

    let created = subject::ActiveModel {
        name: Set(name.clone()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| ComputeError::from_write(e, || format!("Subject '{}' already exists", name)))?;

    info!("Subject created with ID: {}, name: {}", created.id, created.name);
    Ok(created)
}

#[instrument(skip(db))]
pub async fn rename_subject(
    db: &DatabaseConnection,
    subject_id: i32,
    name: &str,
) -> Result<subject::Model> {
    let name = validate_subject_name(name)?;
    let existing = get_subject(db, subject_id).await?;
    if existing.name == name {
        return Ok(existing);
    }

    let mut active: subject::ActiveModel = existing.into();
    active.name = Set(name.clone());
    let updated = active
        .update(db)
        .await
        .map_err(|e| ComputeError::from_write(e, || format!("Subject '{}' already exists", name)))?;
    info!("Subject {} renamed to {}", updated.id, updated.name);
    Ok(updated)
}

/// Deletes a subject, its memberships and its attendance records.
/// Accounts that registered with the subject keep existing without one.
#[instrument(skip(db))]
pub async fn delete_subject(db: &DatabaseConnection, subject_id: i32) -> Result<()> {
    let txn = db.begin().await?;
    let existing = subject::Entity::find_by_id(subject_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ComputeError::not_found("Subject", subject_id))?;

    let records = attendance_record::Entity::delete_many()
        .filter(attendance_record::Column::SubjectId.eq(existing.id))
        .exec(&txn)
        .await?;
    subject_teacher::Entity::delete_many()
        .filter(subject_teacher::Column::SubjectId.eq(existing.id))
        .exec(&txn)
        .await?;
    subject_student::Entity::delete_many()
        .filter(subject_student::Column::SubjectId.eq(existing.id))
        .exec(&txn)
        .await?;
    account::Entity::update_many()
        .col_expr(
            account::Column::SubjectId,
            sea_orm::sea_query::Expr::value(Option::<i32>::None),
        )
        .filter(account::Column::SubjectId.eq(existing.id))
        .exec(&txn)
        .await?;
    subject::Entity::delete_by_id(existing.id).exec(&txn).await?;

    txn.commit().await?;
    info!(
        "Subject {} deleted together with {} attendance records",
        subject_id, records.rows_affected
    );
    Ok(())
}

pub async fn get_subject<C>(db: &C, subject_id: i32) -> Result<subject::Model>
where
    C: ConnectionTrait,
{
    subject::Entity::find_by_id(subject_id)
        .one(db)
        .await?
        .ok_or_else(|| ComputeError::not_found("Subject", subject_id))
}

pub async fn list_subjects(db: &DatabaseConnection) -> Result<Vec<SubjectSummary>> {
    let subjects = subject::Entity::find()
        .order_by_asc(subject::Column::Name)
        .all(db)
        .await?;

    let mut summaries = Vec::with_capacity(subjects.len());
    for subject in subjects {
        let teacher_count = subject_teacher::Entity::find()
            .filter(subject_teacher::Column::SubjectId.eq(subject.id))
            .count(db)
            .await?;
        let student_count = subject_student::Entity::find()
            .filter(subject_student::Column::SubjectId.eq(subject.id))
            .count(db)
            .await?;
        summaries.push(SubjectSummary {
            subject,
            teacher_count,
            student_count,
        });
    }
    debug!("Retrieved {} subjects", summaries.len());
    Ok(summaries)
}

pub async fn teachers_of<C>(db: &C, subject_id: i32) -> Result<Vec<account::Model>>
where
    C: ConnectionTrait,
{
    Ok(account::Entity::find()
        .join(JoinType::InnerJoin, account::Relation::SubjectTeacher.def())
        .filter(subject_teacher::Column::SubjectId.eq(subject_id))
        .order_by_asc(account::Column::Username)
        .all(db)
        .await?)
}

pub async fn students_of<C>(db: &C, subject_id: i32) -> Result<Vec<account::Model>>
where
    C: ConnectionTrait,
{
    Ok(account::Entity::find()
        .join(JoinType::InnerJoin, account::Relation::SubjectStudent.def())
        .filter(subject_student::Column::SubjectId.eq(subject_id))
        .order_by_asc(account::Column::Username)
        .all(db)
        .await?)
}

/// Teachers not yet assigned to the subject, approved or not.
pub async fn available_teachers(
    db: &DatabaseConnection,
    subject_id: i32,
) -> Result<Vec<account::Model>> {
    let assigned: Vec<i32> = teachers_of(db, subject_id)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    Ok(account::Entity::find()
        .filter(account::Column::Role.eq(Role::Teacher))
        .filter(account::Column::Id.is_not_in(assigned))
        .order_by_asc(account::Column::Username)
        .all(db)
        .await?)
}

/// Students not yet enrolled in the subject, approved or not.
pub async fn available_students(
    db: &DatabaseConnection,
    subject_id: i32,
) -> Result<Vec<account::Model>> {
    let enrolled: Vec<i32> = students_of(db, subject_id)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    Ok(account::Entity::find()
        .filter(account::Column::Role.eq(Role::Student))
        .filter(account::Column::Id.is_not_in(enrolled))
        .order_by_asc(account::Column::Username)
        .all(db)
        .await?)
}

#[instrument(skip(db))]
pub async fn subject_roster(db: &DatabaseConnection, subject_id: i32) -> Result<SubjectRoster> {
    let subject = get_subject(db, subject_id).await?;
    Ok(SubjectRoster {
        teachers: teachers_of(db, subject.id).await?,
        students: students_of(db, subject.id).await?,
        available_teachers: available_teachers(db, subject.id).await?,
        available_students: available_students(db, subject.id).await?,
        subject,
    })
}

/// Assigns a teacher. Returns whether the set changed.
#[instrument(skip(db))]
pub async fn add_teacher(db: &DatabaseConnection, subject_id: i32, teacher_id: i32) -> Result<bool> {
    get_subject(db, subject_id).await?;
    let teacher = find_account(db, Role::Teacher, teacher_id).await?;

    let link = subject_teacher::ActiveModel {
        subject_id: Set(subject_id),
        account_id: Set(teacher.id),
    };
    let inserted = subject_teacher::Entity::insert(link)
        .on_conflict(
            OnConflict::columns([
                subject_teacher::Column::SubjectId,
                subject_teacher::Column::AccountId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    if inserted > 0 {
        info!("Teacher {} assigned to subject {}", teacher.id, subject_id);
    } else {
        debug!("Teacher {} already assigned to subject {}", teacher.id, subject_id);
    }
    Ok(inserted > 0)
}

#[instrument(skip(db))]
pub async fn remove_teacher(
    db: &DatabaseConnection,
    subject_id: i32,
    teacher_id: i32,
) -> Result<bool> {
    get_subject(db, subject_id).await?;
    let teacher = find_account(db, Role::Teacher, teacher_id).await?;

    let removed = subject_teacher::Entity::delete_many()
        .filter(subject_teacher::Column::SubjectId.eq(subject_id))
        .filter(subject_teacher::Column::AccountId.eq(teacher.id))
        .exec(db)
        .await?;
    debug!(
        "Removed teacher {} from subject {}: {}",
        teacher.id,
        subject_id,
        removed.rows_affected > 0
    );
    Ok(removed.rows_affected > 0)
}

/// Enrolls a student, creating the profile if it is missing.
/// Returns whether the set changed.
#[instrument(skip(db))]
pub async fn add_student(db: &DatabaseConnection, subject_id: i32, student_id: i32) -> Result<bool> {
    let txn = db.begin().await?;
    get_subject(&txn, subject_id).await?;
    let student = find_account(&txn, Role::Student, student_id).await?;
    let inserted = enroll(&txn, subject_id, &student).await?;
    txn.commit().await?;
    Ok(inserted)
}

/// Enrolls a student account in an existing subject, backfilling its
/// profile. Returns whether a new membership was written.
pub(crate) async fn enroll<C>(db: &C, subject_id: i32, student: &account::Model) -> Result<bool>
where
    C: ConnectionTrait,
{
    ensure_student_profile(db, student).await?;

    let link = subject_student::ActiveModel {
        subject_id: Set(subject_id),
        account_id: Set(student.id),
    };
    let inserted = subject_student::Entity::insert(link)
        .on_conflict(
            OnConflict::columns([
                subject_student::Column::SubjectId,
                subject_student::Column::AccountId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    if inserted > 0 {
        info!("Student {} enrolled in subject {}", student.id, subject_id);
    } else {
        debug!("Student {} already enrolled in subject {}", student.id, subject_id);
    }
    Ok(inserted > 0)
}

/// Unenrolls a student. Attendance already recorded is kept.
#[instrument(skip(db))]
pub async fn remove_student(
    db: &DatabaseConnection,
    subject_id: i32,
    student_id: i32,
) -> Result<bool> {
    get_subject(db, subject_id).await?;
    let student = find_account(db, Role::Student, student_id).await?;

    let removed = subject_student::Entity::delete_many()
        .filter(subject_student::Column::SubjectId.eq(subject_id))
        .filter(subject_student::Column::AccountId.eq(student.id))
        .exec(db)
        .await?;
    Ok(removed.rows_affected > 0)
}

pub async fn subjects_taught_by<C>(db: &C, teacher_id: i32) -> Result<Vec<subject::Model>>
where
    C: ConnectionTrait,
{
    Ok(subject::Entity::find()
        .join(JoinType::InnerJoin, subject::Relation::SubjectTeacher.def())
        .filter(subject_teacher::Column::AccountId.eq(teacher_id))
        .order_by_asc(subject::Column::Name)
        .all(db)
        .await?)
}

/// Subjects the student is enrolled in, lowest id first.
pub async fn subjects_enrolled<C>(db: &C, student_id: i32) -> Result<Vec<subject::Model>>
where
    C: ConnectionTrait,
{
    Ok(subject::Entity::find()
        .join(JoinType::InnerJoin, subject::Relation::SubjectStudent.def())
        .filter(subject_student::Column::AccountId.eq(student_id))
        .order_by_asc(subject::Column::Id)
        .all(db)
        .await?)
}

pub async fn is_teacher_of<C>(db: &C, teacher_id: i32, subject_id: i32) -> Result<bool>
where
    C: ConnectionTrait,
{
    let assigned = subject_teacher::Entity::find_by_id((subject_id, teacher_id))
        .one(db)
        .await?
        .is_some();
    if !assigned {
        warn!("Account {} is not a teacher of subject {}", teacher_id, subject_id);
    }
    Ok(assigned)
}
