//! Accounts, approval and student profiles.
//!
//! Every student account owns exactly one `student_profile`. The profile is
//! written in the same transaction as the account, through a conditional
//! insert keyed by the account id, so retries and races cannot duplicate it.

use std::sync::OnceLock;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Local;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, trace, warn};

use model::entities::account::{self, Role};
use model::entities::{
    attendance_record, session, student_profile, subject, subject_student, subject_teacher,
};

use crate::access::ApprovalPolicy;
use crate::error::{ComputeError, Result};
use crate::roster::{enroll, get_subject};

const MAX_USERNAME_LEN: usize = 150;

/// Fields collected when an account is created, whoever creates it.
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub subject_id: Option<i32>,
}

/// Partial update of an account. `None` leaves a field untouched, an empty
/// string clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
}

/// Numbers shown on the admin dashboard.
#[derive(Debug, Clone)]
pub struct AdminOverview {
    pub pending_teachers: Vec<account::Model>,
    pub total_teachers: u64,
    pub total_students: u64,
    pub total_subjects: u64,
    pub total_users: u64,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ComputeError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is unparsable: {}", e);
            false
        }
    }
}

fn entity_name(role: Role) -> &'static str {
    match role {
        Role::Admin => "Admin",
        Role::Teacher => "Teacher",
        Role::Student => "Student",
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_username(username: &str) -> Result<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ComputeError::Validation("Username must not be empty".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ComputeError::Validation(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    Ok(username.to_string())
}

fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(ComputeError::Validation("Password must not be empty".to_string()));
    }
    Ok(())
}

/// Self-service registration.
///
/// Approval is decided by `policy`. Admins register with a display name
/// (`display_name`, falling back to `full_name`) and never keep a subject.
#[instrument(skip(db, account), fields(username = %account.username))]
pub async fn register(
    db: &DatabaseConnection,
    policy: &ApprovalPolicy,
    role: Role,
    mut account: NewAccount,
    display_name: Option<String>,
) -> Result<account::Model> {
    trace!("Entering register function");

    if role == Role::Admin {
        account.full_name = non_empty(display_name).or(account.full_name);
        account.first_name = None;
        account.last_name = None;
        account.subject_id = None;
    }

    let approved = !policy.requires_approval(role);
    debug!("Registering {} account, approved on creation: {}", role, approved);
    create_account(db, role, account, approved, false).await
}

/// Inserts an account and, for students, its profile, atomically.
#[instrument(skip(db, account), fields(username = %account.username))]
pub async fn create_account(
    db: &DatabaseConnection,
    role: Role,
    account: NewAccount,
    approved: bool,
    superuser: bool,
) -> Result<account::Model> {
    let txn = db.begin().await?;
    let created = insert_account(&txn, role, account, approved, superuser).await?;
    txn.commit().await?;

    info!(
        "Account created with ID: {}, username: {}, role: {}",
        created.id, created.username, created.role
    );
    Ok(created)
}

/// Creates a student and, when `enroll_in` is set, enrolls them in that
/// subject. Nothing is written unless both steps succeed.
#[instrument(skip(db, account), fields(username = %account.username))]
pub async fn create_student(
    db: &DatabaseConnection,
    account: NewAccount,
    approved: bool,
    enroll_in: Option<i32>,
) -> Result<account::Model> {
    let txn = db.begin().await?;
    if let Some(subject_id) = enroll_in {
        get_subject(&txn, subject_id).await?;
    }
    let created = insert_account(&txn, Role::Student, account, approved, false).await?;
    if let Some(subject_id) = enroll_in {
        enroll(&txn, subject_id, &created).await?;
    }
    txn.commit().await?;

    info!(
        "Student created with ID: {}, username: {}, enrolled in: {:?}",
        created.id, created.username, enroll_in
    );
    Ok(created)
}

async fn insert_account<C>(
    db: &C,
    role: Role,
    account: NewAccount,
    approved: bool,
    superuser: bool,
) -> Result<account::Model>
where
    C: ConnectionTrait,
{
    let username = validate_username(&account.username)?;
    validate_password(&account.password)?;

    if let Some(subject_id) = account.subject_id {
        if subject::Entity::find_by_id(subject_id).one(db).await?.is_none() {
            warn!("Registration references missing subject {}", subject_id);
            return Err(ComputeError::not_found("Subject", subject_id));
        }
    }

    let new_account = account::ActiveModel {
        username: Set(username.clone()),
        password_hash: Set(hash_password(&account.password)?),
        email: Set(non_empty(account.email)),
        first_name: Set(non_empty(account.first_name)),
        last_name: Set(non_empty(account.last_name)),
        full_name: Set(non_empty(account.full_name)),
        role: Set(role),
        is_approved: Set(approved),
        is_superuser: Set(superuser),
        subject_id: Set(account.subject_id),
        date_joined: Set(Local::now().naive_local()),
        ..Default::default()
    };

    let created = new_account.insert(db).await.map_err(|e| {
        ComputeError::from_write(e, || format!("Username '{}' already exists", username))
    })?;

    if created.role == Role::Student {
        ensure_student_profile(db, &created).await?;
    }
    Ok(created)
}

/// Returns the profile of a student account, creating it if missing.
///
/// The insert is `ON CONFLICT (account_id) DO NOTHING`, so concurrent callers
/// converge on the same row.
#[instrument(skip(db, account), fields(account_id = account.id))]
pub async fn ensure_student_profile<C>(
    db: &C,
    account: &account::Model,
) -> Result<student_profile::Model>
where
    C: ConnectionTrait,
{
    if account.role != Role::Student {
        return Err(ComputeError::Validation(format!(
            "Account {} is a {}, only students have a profile",
            account.id, account.role
        )));
    }

    let profile = student_profile::ActiveModel {
        account_id: Set(account.id),
        roll_no: Set(student_profile::roll_no_for(account.id)),
        course: Set(student_profile::DEFAULT_COURSE.to_string()),
        ..Default::default()
    };

    let inserted = student_profile::Entity::insert(profile)
        .on_conflict(
            OnConflict::column(student_profile::Column::AccountId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    if inserted > 0 {
        debug!("Created student profile for account {}", account.id);
    }

    student_profile::Entity::find()
        .filter(student_profile::Column::AccountId.eq(account.id))
        .one(db)
        .await?
        .ok_or_else(|| ComputeError::not_found("Student profile", account.id))
}

/// Hash checked when the username is unknown, so that path costs the same
/// Argon2 run as a wrong password.
fn dummy_password_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("rollcall-unknown-account").ok())
        .as_deref()
}

/// Checks credentials and the approval gate.
///
/// Every failure is reported as `InvalidCredentials`; the actual reason is
/// only logged.
#[instrument(skip(db, password))]
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<account::Model> {
    trace!("Entering authenticate function");

    let found = account::Entity::find()
        .filter(account::Column::Username.eq(username.trim()))
        .one(db)
        .await?;

    let Some(found) = found else {
        debug!("Login rejected: unknown username");
        if let Some(hash) = dummy_password_hash() {
            verify_password(password, hash);
        }
        return Err(ComputeError::InvalidCredentials);
    };

    if !verify_password(password, &found.password_hash) {
        debug!("Login rejected for account {}: wrong password", found.id);
        return Err(ComputeError::InvalidCredentials);
    }

    if !found.is_approved {
        debug!("Login rejected for account {}: not approved", found.id);
        return Err(ComputeError::InvalidCredentials);
    }

    info!("Account {} authenticated as {}", found.id, found.role);
    Ok(found)
}

/// Marks an account approved. Approving twice is harmless.
#[instrument(skip(db))]
pub async fn approve(db: &DatabaseConnection, account_id: i32) -> Result<account::Model> {
    let found = account::Entity::find_by_id(account_id)
        .one(db)
        .await?
        .ok_or_else(|| ComputeError::not_found("Account", account_id))?;
    approve_model(db, found).await
}

/// Like [`approve`], restricted to accounts of `role`.
#[instrument(skip(db))]
pub async fn approve_with_role(
    db: &DatabaseConnection,
    role: Role,
    account_id: i32,
) -> Result<account::Model> {
    let found = find_account(db, role, account_id).await?;
    approve_model(db, found).await
}

async fn approve_model(db: &DatabaseConnection, found: account::Model) -> Result<account::Model> {
    if found.is_approved {
        debug!("Account {} already approved", found.id);
        return Ok(found);
    }

    let mut active: account::ActiveModel = found.into();
    active.is_approved = Set(true);
    let updated = active.update(db).await?;
    info!("Account {} ({}) approved", updated.id, updated.username);
    Ok(updated)
}

/// Looks up an account by id, only if it has `role`.
pub async fn find_account<C>(db: &C, role: Role, account_id: i32) -> Result<account::Model>
where
    C: ConnectionTrait,
{
    account::Entity::find_by_id(account_id)
        .filter(account::Column::Role.eq(role))
        .one(db)
        .await?
        .ok_or_else(|| ComputeError::not_found(entity_name(role), account_id))
}

pub async fn list_accounts(db: &DatabaseConnection, role: Role) -> Result<Vec<account::Model>> {
    let accounts = account::Entity::find()
        .filter(account::Column::Role.eq(role))
        .order_by_asc(account::Column::Username)
        .all(db)
        .await?;
    debug!("Retrieved {} {} accounts", accounts.len(), role);
    Ok(accounts)
}

#[instrument(skip(db, update))]
pub async fn update_account(
    db: &DatabaseConnection,
    role: Role,
    account_id: i32,
    update: AccountUpdate,
) -> Result<account::Model> {
    let existing = find_account(db, role, account_id).await?;
    let mut active: account::ActiveModel = existing.into();
    let mut updated_fields = Vec::new();

    if let Some(username) = update.username {
        let username = validate_username(&username)?;
        updated_fields.push(format!("username: {}", username));
        active.username = Set(username);
    }
    if let Some(password) = update.password.filter(|p| !p.is_empty()) {
        active.password_hash = Set(hash_password(&password)?);
        updated_fields.push("password".to_string());
    }
    if let Some(email) = update.email {
        active.email = Set(non_empty(Some(email)));
        updated_fields.push("email".to_string());
    }
    if let Some(first_name) = update.first_name {
        active.first_name = Set(non_empty(Some(first_name)));
        updated_fields.push("first_name".to_string());
    }
    if let Some(last_name) = update.last_name {
        active.last_name = Set(non_empty(Some(last_name)));
        updated_fields.push("last_name".to_string());
    }
    if let Some(full_name) = update.full_name {
        active.full_name = Set(non_empty(Some(full_name)));
        updated_fields.push("full_name".to_string());
    }

    if updated_fields.is_empty() {
        debug!("No fields to update for account ID: {}", account_id);
        return find_account(db, role, account_id).await;
    }

    let updated = active.update(db).await.map_err(|e| {
        ComputeError::from_write(e, || "Username already exists".to_string())
    })?;
    info!(
        "Account with ID {} updated successfully. Updated fields: {}",
        account_id,
        updated_fields.join(", ")
    );
    Ok(updated)
}

/// Changes the roll number and/or course of a student's profile.
#[instrument(skip(db))]
pub async fn update_student_profile(
    db: &DatabaseConnection,
    account_id: i32,
    roll_no: Option<String>,
    course: Option<String>,
) -> Result<student_profile::Model> {
    let student = find_account(db, Role::Student, account_id).await?;
    let profile = ensure_student_profile(db, &student).await?;

    let roll_no = non_empty(roll_no);
    let course = non_empty(course);
    if roll_no.is_none() && course.is_none() {
        return Ok(profile);
    }

    let mut active: student_profile::ActiveModel = profile.into();
    if let Some(roll_no) = roll_no {
        active.roll_no = Set(roll_no);
    }
    if let Some(course) = course {
        active.course = Set(course);
    }
    Ok(active.update(db).await?)
}

/// Deletes an account of `role` with everything it owns.
#[instrument(skip(db))]
pub async fn delete_account(db: &DatabaseConnection, role: Role, account_id: i32) -> Result<()> {
    let txn = db.begin().await?;
    let existing = find_account(&txn, role, account_id).await?;

    if let Some(profile) = student_profile::Entity::find()
        .filter(student_profile::Column::AccountId.eq(existing.id))
        .one(&txn)
        .await?
    {
        let removed = attendance_record::Entity::delete_many()
            .filter(attendance_record::Column::StudentId.eq(profile.id))
            .exec(&txn)
            .await?;
        debug!("Removed {} attendance records of profile {}", removed.rows_affected, profile.id);
        student_profile::Entity::delete_by_id(profile.id).exec(&txn).await?;
    }

    attendance_record::Entity::delete_many()
        .filter(attendance_record::Column::MarkedBy.eq(existing.id))
        .exec(&txn)
        .await?;
    subject_teacher::Entity::delete_many()
        .filter(subject_teacher::Column::AccountId.eq(existing.id))
        .exec(&txn)
        .await?;
    subject_student::Entity::delete_many()
        .filter(subject_student::Column::AccountId.eq(existing.id))
        .exec(&txn)
        .await?;
    session::Entity::delete_many()
        .filter(session::Column::AccountId.eq(existing.id))
        .exec(&txn)
        .await?;
    account::Entity::delete_by_id(existing.id).exec(&txn).await?;

    txn.commit().await?;
    info!("{} with ID {} deleted", entity_name(role), account_id);
    Ok(())
}

pub async fn admin_overview(db: &DatabaseConnection) -> Result<AdminOverview> {
    let pending_teachers = account::Entity::find()
        .filter(account::Column::Role.eq(Role::Teacher))
        .filter(account::Column::IsApproved.eq(false))
        .order_by_asc(account::Column::DateJoined)
        .all(db)
        .await?;
    let total_teachers = account::Entity::find()
        .filter(account::Column::Role.eq(Role::Teacher))
        .count(db)
        .await?;
    let total_students = account::Entity::find()
        .filter(account::Column::Role.eq(Role::Student))
        .count(db)
        .await?;
    let total_subjects = subject::Entity::find().count(db).await?;

    Ok(AdminOverview {
        pending_teachers,
        total_teachers,
        total_students,
        total_subjects,
        total_users: total_teachers + total_students,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{new_account, setup_db, student, teacher};

    #[tokio::test]
    async fn test_register_defaults_to_unapproved() {
        let db = setup_db().await;
        let policy = ApprovalPolicy::default();

        for (name, role) in [("t", Role::Teacher), ("s", Role::Student), ("a", Role::Admin)] {
            let created = register(&db, &policy, role, new_account(name), None)
                .await
                .unwrap();
            assert!(!created.is_approved, "{} should wait for approval", role);
        }
    }

    #[tokio::test]
    async fn test_register_honours_relaxed_policy() {
        let db = setup_db().await;
        let policy = ApprovalPolicy::new([Role::Teacher, Role::Admin]);

        let s = register(&db, &policy, Role::Student, new_account("kid"), None)
            .await
            .unwrap();
        assert!(s.is_approved);
        let t = register(&db, &policy, Role::Teacher, new_account("prof"), None)
            .await
            .unwrap();
        assert!(!t.is_approved);
    }

    #[tokio::test]
    async fn test_admin_registration_keeps_display_name_only() {
        let db = setup_db().await;
        let subject = crate::roster::create_subject(&db, "Physics").await.unwrap();

        let mut form = new_account("head");
        form.first_name = Some("Ada".to_string());
        form.last_name = Some("Lovelace".to_string());
        form.subject_id = Some(subject.id);

        let admin = register(
            &db,
            &ApprovalPolicy::default(),
            Role::Admin,
            form,
            Some("Head Teacher".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(admin.full_name.as_deref(), Some("Head Teacher"));
        assert_eq!(admin.first_name, None);
        assert_eq!(admin.last_name, None);
        assert_eq!(admin.subject_id, None);
    }

    #[tokio::test]
    async fn test_teacher_registration_keeps_subject() {
        let db = setup_db().await;
        let subject = crate::roster::create_subject(&db, "Chemistry").await.unwrap();
        let mut form = new_account("curie");
        form.subject_id = Some(subject.id);

        let created = register(&db, &ApprovalPolicy::default(), Role::Teacher, form, None)
            .await
            .unwrap();
        assert_eq!(created.subject_id, Some(subject.id));
    }

    #[tokio::test]
    async fn test_registration_with_missing_subject_is_rejected() {
        let db = setup_db().await;
        let mut form = new_account("ghost");
        form.subject_id = Some(404);

        let result = register(&db, &ApprovalPolicy::default(), Role::Teacher, form, None).await;
        assert!(matches!(result, Err(ComputeError::NotFound { entity: "Subject", id: 404 })));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_a_conflict() {
        let db = setup_db().await;
        let policy = ApprovalPolicy::default();
        register(&db, &policy, Role::Teacher, new_account("dup"), None)
            .await
            .unwrap();

        let second = register(&db, &policy, Role::Student, new_account("dup"), None).await;
        assert!(matches!(second, Err(ComputeError::Conflict(_))));
        // The failed student registration must not leave a profile behind
        assert_eq!(
            student_profile::Entity::find().count(&db).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_empty_username_is_invalid() {
        let db = setup_db().await;
        let result = create_account(&db, Role::Teacher, new_account("   "), true, false).await;
        assert!(matches!(result, Err(ComputeError::Validation(_))));
    }

    #[tokio::test]
    async fn test_student_account_gets_exactly_one_profile() {
        let db = setup_db().await;
        let created = student(&db, "alice").await;

        // Retried and concurrent get-or-create calls converge on one row
        let (a, b) = tokio::join!(
            ensure_student_profile(&db, &created),
            ensure_student_profile(&db, &created)
        );
        let again = ensure_student_profile(&db, &created).await.unwrap();
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.id, b.id);
        assert_eq!(a.id, again.id);
        assert_eq!(a.roll_no, format!("STU{:04}", created.id));
        assert_eq!(a.course, "Undeclared");

        let profiles = student_profile::Entity::find()
            .filter(student_profile::Column::AccountId.eq(created.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(profiles, 1);
    }

    #[tokio::test]
    async fn test_teacher_has_no_profile() {
        let db = setup_db().await;
        let created = teacher(&db, "bob").await;
        assert!(matches!(
            ensure_student_profile(&db, &created).await,
            Err(ComputeError::Validation(_))
        ));
        assert_eq!(student_profile::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unapproved_and_wrong_password_fail_identically() {
        let db = setup_db().await;
        register(&db, &ApprovalPolicy::default(), Role::Teacher, new_account("pending"), None)
            .await
            .unwrap();
        teacher(&db, "approved").await;

        let unapproved = authenticate(&db, "pending", "secret-password").await.unwrap_err();
        let wrong_password = authenticate(&db, "approved", "nope").await.unwrap_err();
        let unknown = authenticate(&db, "nobody", "secret-password").await.unwrap_err();

        assert!(matches!(unapproved, ComputeError::InvalidCredentials));
        assert_eq!(unapproved.to_string(), wrong_password.to_string());
        assert_eq!(unapproved.to_string(), unknown.to_string());

        let ok = authenticate(&db, "approved", "secret-password").await.unwrap();
        assert_eq!(ok.username, "approved");
    }

    #[test]
    fn test_unknown_username_is_checked_against_a_real_hash() {
        let hash = dummy_password_hash().expect("dummy hash should be computed");
        assert!(PasswordHash::new(hash).is_ok());
        assert!(!verify_password("secret-password", hash));
        // Computed once
        assert!(std::ptr::eq(hash, dummy_password_hash().unwrap()));
    }

    #[tokio::test]
    async fn test_create_student_enrolls_in_the_same_transaction() {
        use crate::roster::{create_subject, students_of};

        let db = setup_db().await;
        let subject = create_subject(&db, "Chemistry").await.unwrap();

        let enrolled = create_student(&db, new_account("joined"), true, Some(subject.id))
            .await
            .unwrap();
        let members = students_of(&db, subject.id).await.unwrap();
        assert_eq!(members.iter().map(|a| a.id).collect::<Vec<_>>(), vec![enrolled.id]);
        assert_eq!(
            student_profile::Entity::find()
                .filter(student_profile::Column::AccountId.eq(enrolled.id))
                .count(&db)
                .await
                .unwrap(),
            1
        );

        // An unknown subject leaves no account behind
        let missing = create_student(&db, new_account("orphan"), true, Some(9999))
            .await
            .unwrap_err();
        assert!(matches!(missing, ComputeError::NotFound { entity: "Subject", .. }));
        // A taken username leaves no extra membership
        let duplicate = create_student(&db, new_account("joined"), true, Some(subject.id))
            .await
            .unwrap_err();
        assert!(matches!(duplicate, ComputeError::Conflict(_)));

        let accounts = list_accounts(&db, Role::Student).await.unwrap();
        assert_eq!(accounts.iter().map(|a| a.username.as_str()).collect::<Vec<_>>(), vec!["joined"]);
        assert_eq!(students_of(&db, subject.id).await.unwrap().len(), 1);

        let unenrolled = create_student(&db, new_account("solo"), false, None).await.unwrap();
        assert!(!unenrolled.is_approved);
        assert!(students_of(&db, subject.id).await.unwrap().iter().all(|a| a.id != unenrolled.id));
    }

    #[tokio::test]
    async fn test_approve_is_idempotent() {
        let db = setup_db().await;
        let pending = register(
            &db,
            &ApprovalPolicy::default(),
            Role::Teacher,
            new_account("waiting"),
            None,
        )
        .await
        .unwrap();

        let first = approve(&db, pending.id).await.unwrap();
        let second = approve(&db, pending.id).await.unwrap();
        assert!(first.is_approved);
        assert_eq!(first, second);

        assert!(authenticate(&db, "waiting", "secret-password").await.is_ok());
        assert!(matches!(
            approve(&db, 9999).await,
            Err(ComputeError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_approve_with_role_checks_role() {
        let db = setup_db().await;
        let s = student(&db, "stu").await;
        assert!(matches!(
            approve_with_role(&db, Role::Teacher, s.id).await,
            Err(ComputeError::NotFound { entity: "Teacher", .. })
        ));
    }

    #[tokio::test]
    async fn test_update_account_and_profile() {
        let db = setup_db().await;
        let s = student(&db, "carol").await;

        let updated = update_account(
            &db,
            Role::Student,
            s.id,
            AccountUpdate {
                email: Some("carol@school.test".to_string()),
                first_name: Some("Carol".to_string()),
                password: Some("new-password".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.email.as_deref(), Some("carol@school.test"));
        assert_eq!(updated.first_name.as_deref(), Some("Carol"));
        assert!(verify_password("new-password", &updated.password_hash));

        let profile = update_student_profile(&db, s.id, None, Some("Biology".to_string()))
            .await
            .unwrap();
        assert_eq!(profile.course, "Biology");
        assert_eq!(profile.roll_no, format!("STU{:04}", s.id));
    }

    #[tokio::test]
    async fn test_delete_student_removes_profile_and_links() {
        let db = setup_db().await;
        let s = student(&db, "dave").await;
        let subject = crate::roster::create_subject(&db, "Music").await.unwrap();
        crate::roster::add_student(&db, subject.id, s.id).await.unwrap();

        delete_account(&db, Role::Student, s.id).await.unwrap();

        assert!(account::Entity::find_by_id(s.id).one(&db).await.unwrap().is_none());
        assert_eq!(student_profile::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(subject_student::Entity::find().count(&db).await.unwrap(), 0);
        assert!(matches!(
            delete_account(&db, Role::Student, s.id).await,
            Err(ComputeError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_admin_overview_counts() {
        let db = setup_db().await;
        teacher(&db, "t1").await;
        register(&db, &ApprovalPolicy::default(), Role::Teacher, new_account("t2"), None)
            .await
            .unwrap();
        student(&db, "s1").await;
        crate::roster::create_subject(&db, "Geography").await.unwrap();

        let overview = admin_overview(&db).await.unwrap();
        assert_eq!(overview.total_teachers, 2);
        assert_eq!(overview.total_students, 1);
        assert_eq!(overview.total_subjects, 1);
        assert_eq!(overview.total_users, 3);
        assert_eq!(overview.pending_teachers.len(), 1);
        assert_eq!(overview.pending_teachers[0].username, "t2");
    }
}
