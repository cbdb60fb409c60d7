use anyhow::Context;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Validated text fields of a profile update; `None` leaves the column
/// as it is.
pub struct ProfileFields<'a> {
    pub full_name: Option<&'a str>,
    pub document_id: Option<&'a str>,
    pub pan_number: Option<&'a str>,
    pub aadhaar_number: Option<&'a str>,
    pub address: Option<&'a str>,
}

pub async fn update_fields_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    fields: &ProfileFields<'_>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE users
           SET full_name      = COALESCE($2, full_name),
               document_id    = COALESCE($3, document_id),
               pan_number     = COALESCE($4, pan_number),
               aadhaar_number = COALESCE($5, aadhaar_number),
               address        = COALESCE($6, address)
         WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(fields.full_name)
    .bind(fields.document_id)
    .bind(fields.pan_number)
    .bind(fields.aadhaar_number)
    .bind(fields.address)
    .execute(&mut **tx)
    .await
    .context("update profile fields")?;
    Ok(())
}
