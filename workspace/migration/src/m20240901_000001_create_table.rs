use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create subjects table
        manager
            .create_table(
                Table::create()
                    .table(Subjects::Table)
                    .if_not_exists()
                    .col(pk_auto(Subjects::Id))
                    .col(string(Subjects::Name).unique_key())
                    .to_owned(),
            )
            .await?;

        // Create accounts table
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(pk_auto(Accounts::Id))
                    .col(string_len(Accounts::Username, 150).unique_key())
                    .col(string(Accounts::PasswordHash))
                    .col(string_null(Accounts::Email))
                    .col(string_null(Accounts::FirstName))
                    .col(string_null(Accounts::LastName))
                    .col(string_len_null(Accounts::FullName, 100))
                    .col(string_len(Accounts::Role, 10))
                    .col(boolean(Accounts::IsApproved).default(false))
                    .col(boolean(Accounts::IsSuperuser).default(false))
                    .col(integer_null(Accounts::SubjectId))
                    .col(date_time(Accounts::DateJoined).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_subject")
                            .from(Accounts::Table, Accounts::SubjectId)
                            .to(Subjects::Table, Subjects::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create student_profiles table, one row per student account
        manager
            .create_table(
                Table::create()
                    .table(StudentProfiles::Table)
                    .if_not_exists()
                    .col(pk_auto(StudentProfiles::Id))
                    .col(integer(StudentProfiles::AccountId).unique_key())
                    .col(string_len(StudentProfiles::RollNo, 20))
                    .col(string_len(StudentProfiles::Course, 50))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_profile_account")
                            .from(StudentProfiles::Table, StudentProfiles::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create subject_teachers table (join table)
        manager
            .create_table(
                Table::create()
                    .table(SubjectTeachers::Table)
                    .if_not_exists()
                    .col(integer(SubjectTeachers::SubjectId))
                    .col(integer(SubjectTeachers::AccountId))
                    .primary_key(
                        Index::create()
                            .name("pk_subject_teachers")
                            .col(SubjectTeachers::SubjectId)
                            .col(SubjectTeachers::AccountId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_teachers_subject")
                            .from(SubjectTeachers::Table, SubjectTeachers::SubjectId)
                            .to(Subjects::Table, Subjects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_teachers_account")
                            .from(SubjectTeachers::Table, SubjectTeachers::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create subject_students table (join table)
        manager
            .create_table(
                Table::create()
                    .table(SubjectStudents::Table)
                    .if_not_exists()
                    .col(integer(SubjectStudents::SubjectId))
                    .col(integer(SubjectStudents::AccountId))
                    .primary_key(
                        Index::create()
                            .name("pk_subject_students")
                            .col(SubjectStudents::SubjectId)
                            .col(SubjectStudents::AccountId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_students_subject")
                            .from(SubjectStudents::Table, SubjectStudents::SubjectId)
                            .to(Subjects::Table, Subjects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_students_account")
                            .from(SubjectStudents::Table, SubjectStudents::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create attendance_records table
        manager
            .create_table(
                Table::create()
                    .table(AttendanceRecords::Table)
                    .if_not_exists()
                    .col(pk_auto(AttendanceRecords::Id))
                    .col(integer(AttendanceRecords::StudentId))
                    .col(integer(AttendanceRecords::SubjectId))
                    .col(date(AttendanceRecords::Date))
                    .col(string_len(AttendanceRecords::Status, 1))
                    .col(integer(AttendanceRecords::MarkedBy))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_records_student")
                            .from(AttendanceRecords::Table, AttendanceRecords::StudentId)
                            .to(StudentProfiles::Table, StudentProfiles::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_records_subject")
                            .from(AttendanceRecords::Table, AttendanceRecords::SubjectId)
                            .to(Subjects::Table, Subjects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_records_marked_by")
                            .from(AttendanceRecords::Table, AttendanceRecords::MarkedBy)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The upsert on marking conflicts on this index
        manager
            .create_index(
                Index::create()
                    .name("ux_attendance_student_subject_date")
                    .table(AttendanceRecords::Table)
                    .col(AttendanceRecords::StudentId)
                    .col(AttendanceRecords::SubjectId)
                    .col(AttendanceRecords::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AttendanceRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubjectStudents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubjectTeachers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StudentProfiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subjects::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Accounts {
    Table,
    Id,
    Username,
    PasswordHash,
    Email,
    FirstName,
    LastName,
    FullName,
    Role,
    IsApproved,
    IsSuperuser,
    SubjectId,
    DateJoined,
}

#[derive(DeriveIden)]
enum Subjects {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum StudentProfiles {
    Table,
    Id,
    AccountId,
    RollNo,
    Course,
}

#[derive(DeriveIden)]
enum SubjectTeachers {
    Table,
    SubjectId,
    AccountId,
}

#[derive(DeriveIden)]
enum SubjectStudents {
    Table,
    SubjectId,
    AccountId,
}

#[derive(DeriveIden)]
enum AttendanceRecords {
    Table,
    Id,
    StudentId,
    SubjectId,
    Date,
    Status,
    MarkedBy,
}
