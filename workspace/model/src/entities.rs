//! SeaORM entities for the attendance application.
//!
//! Accounts of every role share one table. Students additionally own a
//! `student_profile`, which is what attendance records point at.

pub mod account;
pub mod attendance_record;
pub mod session;
pub mod student_profile;
pub mod subject;
pub mod subject_student;
pub mod subject_teacher;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::account::Entity as Account;
    pub use super::attendance_record::Entity as AttendanceRecord;
    pub use super::session::Entity as Session;
    pub use super::student_profile::Entity as StudentProfile;
    pub use super::subject::Entity as Subject;
    pub use super::subject_student::Entity as SubjectStudent;
    pub use super::subject_teacher::Entity as SubjectTeacher;
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, JoinType, ModelTrait, QueryFilter, QuerySelect, RelationTrait, Set,
    };

    use super::account::Role;
    use super::attendance_record::AttendanceStatus;
    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;

        // Enable foreign keys
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    fn new_account(username: &str, role: Role) -> account::ActiveModel {
        account::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set("not-a-real-hash".to_string()),
            email: Set(None),
            first_name: Set(None),
            last_name: Set(None),
            full_name: Set(None),
            role: Set(role),
            is_approved: Set(true),
            is_superuser: Set(false),
            subject_id: Set(None),
            date_joined: Set(NaiveDate::from_ymd_opt(2024, 9, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let teacher = new_account("mr_smith", Role::Teacher).insert(&db).await?;
        let student = new_account("alice", Role::Student).insert(&db).await?;

        let profile = student_profile::ActiveModel {
            account_id: Set(student.id),
            roll_no: Set(student_profile::roll_no_for(student.id)),
            course: Set(student_profile::DEFAULT_COURSE.to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let maths = subject::ActiveModel {
            name: Set("Mathematics".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        subject_teacher::ActiveModel {
            subject_id: Set(maths.id),
            account_id: Set(teacher.id),
        }
        .insert(&db)
        .await?;
        subject_student::ActiveModel {
            subject_id: Set(maths.id),
            account_id: Set(student.id),
        }
        .insert(&db)
        .await?;

        attendance_record::ActiveModel {
            student_id: Set(profile.id),
            subject_id: Set(maths.id),
            date: Set(NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()),
            status: Set(AttendanceStatus::Present),
            marked_by: Set(teacher.id),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // Subjects taught by the teacher, through the link table
        let taught = Subject::find()
            .join(JoinType::InnerJoin, subject::Relation::SubjectTeacher.def())
            .filter(subject_teacher::Column::AccountId.eq(teacher.id))
            .all(&db)
            .await?;
        assert_eq!(taught.len(), 1);
        assert_eq!(taught[0].name, "Mathematics");

        // Enrolled students, through the other link table
        let enrolled = Account::find()
            .join(JoinType::InnerJoin, account::Relation::SubjectStudent.def())
            .filter(subject_student::Column::SubjectId.eq(maths.id))
            .all(&db)
            .await?;
        assert_eq!(enrolled.len(), 1);
        assert_eq!(enrolled[0].username, "alice");

        let found_profile = student.find_related(StudentProfile).one(&db).await?;
        assert_eq!(found_profile.map(|p| p.roll_no), Some(format!("STU{:04}", student.id)));

        let records = profile.find_related(AttendanceRecord).all(&db).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AttendanceStatus::Present);

        Ok(())
    }

    #[tokio::test]
    async fn test_attendance_key_is_unique() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let teacher = new_account("teacher", Role::Teacher).insert(&db).await?;
        let student = new_account("student", Role::Student).insert(&db).await?;
        let profile = student_profile::ActiveModel {
            account_id: Set(student.id),
            roll_no: Set(student_profile::roll_no_for(student.id)),
            course: Set(student_profile::DEFAULT_COURSE.to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        let history = subject::ActiveModel {
            name: Set("History".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let record = |status| attendance_record::ActiveModel {
            student_id: Set(profile.id),
            subject_id: Set(history.id),
            date: Set(NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()),
            status: Set(status),
            marked_by: Set(teacher.id),
            ..Default::default()
        };

        record(AttendanceStatus::Present).insert(&db).await?;
        let duplicate = record(AttendanceStatus::Absent).insert(&db).await;
        assert!(duplicate.is_err(), "second row for the same key must be rejected");

        Ok(())
    }

    #[tokio::test]
    async fn test_profile_account_is_unique() -> Result<(), DbErr> {
        let db = setup_db().await?;
        let student = new_account("bob", Role::Student).insert(&db).await?;

        let profile = || student_profile::ActiveModel {
            account_id: Set(student.id),
            roll_no: Set(student_profile::roll_no_for(student.id)),
            course: Set(student_profile::DEFAULT_COURSE.to_string()),
            ..Default::default()
        };

        profile().insert(&db).await?;
        assert!(profile().insert(&db).await.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_deleting_subject_cascades_to_links_and_records() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let teacher = new_account("t", Role::Teacher).insert(&db).await?;
        let student = new_account("s", Role::Student).insert(&db).await?;
        let profile = student_profile::ActiveModel {
            account_id: Set(student.id),
            roll_no: Set(student_profile::roll_no_for(student.id)),
            course: Set(student_profile::DEFAULT_COURSE.to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        let art = subject::ActiveModel {
            name: Set("Art".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        subject_teacher::ActiveModel {
            subject_id: Set(art.id),
            account_id: Set(teacher.id),
        }
        .insert(&db)
        .await?;
        attendance_record::ActiveModel {
            student_id: Set(profile.id),
            subject_id: Set(art.id),
            date: Set(NaiveDate::from_ymd_opt(2024, 10, 2).unwrap()),
            status: Set(AttendanceStatus::Absent),
            marked_by: Set(teacher.id),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        Subject::delete_by_id(art.id).exec(&db).await?;

        assert!(SubjectTeacher::find().all(&db).await?.is_empty());
        assert!(AttendanceRecord::find().all(&db).await?.is_empty());
        // Accounts survive
        assert_eq!(Account::find().all(&db).await?.len(), 2);

        Ok(())
    }
}
