//! Registration-credential lifecycle.
//!
//! Every pass keeps the pool's short-lived registration credential fresh:
//! growth always has a valid token to hand new workers, and shrink-path
//! deregistration never stalls on an expired one. The long-lived reference
//! credential named by the pool spec is only ever read, never rotated here.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::info;

use crate::conventions::Conventions;
use crate::error::CoreError;
use crate::pool::Pool;
use crate::registry::RegistryApi;
use crate::store::{CredentialRecord, CredentialStore};

/// Clock-skew window: refresh this far ahead of expiry.
pub const EXPIRY_SKEW_SECS: i64 = 5 * 60;

/// True when the stored record must be replaced: token missing, expiry
/// absent or unparsable, or expiry within the skew window.
pub fn needs_refresh(
    record: &CredentialRecord,
    conventions: &Conventions,
    now: DateTime<Utc>,
) -> bool {
    if !record.data.contains_key(&conventions.token_key) {
        return true;
    }
    let Some(raw) = record.annotations.get(&conventions.expiry_annotation) else {
        return true;
    };
    let Ok(epoch) = raw.parse::<i64>() else {
        return true;
    };
    let Some(expires_at) = Utc.timestamp_opt(epoch, 0).single() else {
        return true;
    };

    now + Duration::seconds(EXPIRY_SKEW_SECS) >= expires_at
}

/// Resolves the long-lived reference credential named by the pool spec.
pub async fn resolve_reference_token(
    pool: &Pool,
    credentials: &dyn CredentialStore,
) -> Result<String, CoreError> {
    let reference = &pool.spec.credential_ref;
    let record = credentials.get(&reference.name).await?.ok_or_else(|| {
        CoreError::Credential(format!("reference credential {} not found", reference.name))
    })?;

    record.data.get(&reference.key).cloned().ok_or_else(|| {
        CoreError::Credential(format!(
            "reference credential {} has no key {}",
            reference.name, reference.key
        ))
    })
}

/// Ensures the pool's registration credential is present and outside the
/// skew window, minting a replacement when it is not. Returns the token that
/// is current after the call.
pub async fn ensure_registration_credential(
    pool: &Pool,
    reference_token: &str,
    credentials: &dyn CredentialStore,
    registry: &dyn RegistryApi,
    conventions: &Conventions,
    now: DateTime<Utc>,
) -> Result<String, CoreError> {
    let key = conventions.credential_key(&pool.name);

    match credentials.get(&key).await? {
        Some(record) if !needs_refresh(&record, conventions, now) => {
            if let Some(token) = record.data.get(&conventions.token_key) {
                return Ok(token.clone());
            }
            // unreachable in practice: needs_refresh checks the token key
            info!(key = %key, "Registration credential missing its token, minting");
        }
        Some(_) => {
            info!(key = %key, "Registration credential expiring, minting a new one");
        }
        None => {
            info!(key = %key, "Registration credential not found, minting");
        }
    }

    let minted = registry
        .mint_credential(&pool.spec.scope, reference_token)
        .await?;

    let mut record = CredentialRecord::default();
    record
        .data
        .insert(conventions.token_key.clone(), minted.token.clone());
    record.annotations.insert(
        conventions.expiry_annotation.clone(),
        minted.expires_at.timestamp().to_string(),
    );
    record.labels = conventions.ownership_labels(&pool.name);

    credentials.put(&key, record).await?;

    Ok(minted.token)
}
