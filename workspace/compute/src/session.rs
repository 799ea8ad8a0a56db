//! Login sessions stored as rows.

use chrono::{Duration, NaiveDateTime};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use model::entities::{account, session};

use crate::error::Result;

/// Opens a session for `account` and returns its token.
#[instrument(skip(db, account), fields(account_id = account.id))]
pub async fn create_session(
    db: &DatabaseConnection,
    account: &account::Model,
    now: NaiveDateTime,
) -> Result<String> {
    let token = Uuid::new_v4().simple().to_string();
    session::ActiveModel {
        token: Set(token.clone()),
        account_id: Set(account.id),
        created_at: Set(now),
    }
    .insert(db)
    .await?;
    info!("Session opened for account {}", account.id);
    Ok(token)
}

/// Returns the account behind `token` if the session is alive.
///
/// Expired sessions are deleted on sight. Sessions of accounts that are no
/// longer approved resolve to nothing but are kept.
pub async fn resolve_session(
    db: &DatabaseConnection,
    token: &str,
    ttl: Duration,
    now: NaiveDateTime,
) -> Result<Option<account::Model>> {
    let Some((found, owner)) = session::Entity::find_by_id(token.to_string())
        .find_also_related(account::Entity)
        .one(db)
        .await?
    else {
        debug!("Unknown session token");
        return Ok(None);
    };

    if found.created_at + ttl <= now {
        debug!("Session of account {} expired", found.account_id);
        session::Entity::delete_by_id(found.token).exec(db).await?;
        return Ok(None);
    }

    Ok(owner.filter(|a| a.is_approved))
}

/// Ends a session. Unknown tokens are ignored.
pub async fn revoke_session(db: &DatabaseConnection, token: &str) -> Result<()> {
    let removed = session::Entity::delete_many()
        .filter(session::Column::Token.eq(token))
        .exec(db)
        .await?;
    debug!("Revoked {} session(s)", removed.rows_affected);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{setup_db, teacher};
    use chrono::NaiveDate;
    use sea_orm::PaginatorTrait;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let db = setup_db().await;
        let t = teacher(&db, "owner").await;
        let token = create_session(&db, &t, at(8)).await.unwrap();
        assert_eq!(token.len(), 32);

        let resolved = resolve_session(&db, &token, Duration::hours(2), at(9))
            .await
            .unwrap();
        assert_eq!(resolved.map(|a| a.id), Some(t.id));

        revoke_session(&db, &token).await.unwrap();
        assert!(resolve_session(&db, &token, Duration::hours(2), at(9))
            .await
            .unwrap()
            .is_none());
        revoke_session(&db, &token).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let db = setup_db().await;
        let t = teacher(&db, "sleepy").await;
        let token = create_session(&db, &t, at(8)).await.unwrap();

        assert!(resolve_session(&db, &token, Duration::hours(2), at(10))
            .await
            .unwrap()
            .is_none());
        assert_eq!(session::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unapproved_account_session_does_not_resolve() {
        let db = setup_db().await;
        let t = teacher(&db, "revoked").await;
        let token = create_session(&db, &t, at(8)).await.unwrap();

        let mut active: account::ActiveModel = t.into();
        active.is_approved = Set(false);
        active.update(&db).await.unwrap();

        assert!(resolve_session(&db, &token, Duration::hours(2), at(9))
            .await
            .unwrap()
            .is_none());
    }
}
