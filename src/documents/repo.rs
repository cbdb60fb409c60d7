use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::service::DocumentKind;

/// Clear the stored-key reference for one document slot.
pub async fn clear_document_key(
    db: &PgPool,
    user_id: Uuid,
    kind: DocumentKind,
) -> anyhow::Result<()> {
    // column() is a static name, never user input
    let sql = format!("UPDATE users SET {} = NULL WHERE id = $1", kind.column());
    sqlx::query(&sql)
        .bind(user_id)
        .execute(db)
        .await
        .context("clear document key")?;
    Ok(())
}

/// Point one document slot at a freshly stored object, within the
/// caller's transaction.
pub async fn set_document_key_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    kind: DocumentKind,
    key: &str,
) -> anyhow::Result<()> {
    let sql = format!("UPDATE users SET {} = $2 WHERE id = $1", kind.column());
    sqlx::query(&sql)
        .bind(user_id)
        .bind(key)
        .execute(&mut **tx)
        .await
        .context("set document key")?;
    Ok(())
}
