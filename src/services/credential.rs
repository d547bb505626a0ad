//! Provider credential records — encrypted API keys and server URLs.
//!
//! A credential names a provider plus whichever secret that provider needs:
//! hosted providers carry an encrypted API key, the custom server carries a
//! plain endpoint URL. Plaintext keys are accepted once at create time and
//! never read back out through the API.

use sqlx::PgPool;
use uuid::Uuid;

use crate::llm::Provider;
use crate::services::crypto::{CryptoError, MasterKey};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("credential not found")]
    NotFound,

    #[error("credential is inactive")]
    Inactive,

    #[error("credential has no usable secret for provider {0}")]
    MissingSecret(Provider),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Stored credential record. `api_key_ciphertext`/`api_key_iv` travel
/// together; both absent for custom-server credentials.
#[derive(Debug, Clone)]
pub struct CredentialRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub provider: Provider,
    pub api_key_ciphertext: Option<String>,
    pub api_key_iv: Option<String>,
    pub endpoint_url: Option<String>,
    pub model: Option<String>,
    pub active: bool,
}

/// Fields accepted when creating a credential.
#[derive(Debug)]
pub struct NewCredential {
    pub name: String,
    pub provider: Provider,
    pub api_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub model: Option<String>,
}

type CredentialTuple = (
    Uuid,
    Uuid,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    bool,
);

fn credential_from_tuple(row: CredentialTuple) -> Result<CredentialRow, CredentialError> {
    let (id, project_id, name, provider, api_key_ciphertext, api_key_iv, endpoint_url, model, active) = row;
    let provider = Provider::parse(&provider).map_err(|_| CredentialError::NotFound)?;
    Ok(CredentialRow {
        id,
        project_id,
        name,
        provider,
        api_key_ciphertext,
        api_key_iv,
        endpoint_url,
        model,
        active,
    })
}

const CREDENTIAL_COLUMNS: &str =
    "id, project_id, name, provider, api_key_ciphertext, api_key_iv, endpoint_url, model, active";

// =============================================================================
// CRUD
// =============================================================================

/// Create a credential, encrypting any plaintext API key before it touches
/// the database.
///
/// # Errors
///
/// Returns a crypto error if encryption fails or a database error.
pub async fn create_credential(
    pool: &PgPool,
    master_key: &MasterKey,
    project_id: Uuid,
    new: NewCredential,
) -> Result<CredentialRow, CredentialError> {
    let encrypted = new
        .api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .map(|key| master_key.encrypt(key))
        .transpose()?;
    let (ciphertext, iv) = match encrypted {
        Some(secret) => (Some(secret.ciphertext), Some(secret.iv)),
        None => (None, None),
    };

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO api_keys
             (id, project_id, name, provider, api_key_ciphertext, api_key_iv, endpoint_url, model, active)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)",
    )
    .bind(id)
    .bind(project_id)
    .bind(&new.name)
    .bind(new.provider.as_str())
    .bind(&ciphertext)
    .bind(&iv)
    .bind(&new.endpoint_url)
    .bind(&new.model)
    .execute(pool)
    .await?;

    Ok(CredentialRow {
        id,
        project_id,
        name: new.name,
        provider: new.provider,
        api_key_ciphertext: ciphertext,
        api_key_iv: iv,
        endpoint_url: new.endpoint_url,
        model: new.model,
        active: true,
    })
}

/// List a project's credentials.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_credentials(pool: &PgPool, project_id: Uuid) -> Result<Vec<CredentialRow>, CredentialError> {
    let rows = sqlx::query_as::<_, CredentialTuple>(&format!(
        "SELECT {CREDENTIAL_COLUMNS} FROM api_keys WHERE project_id = $1 ORDER BY name",
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(credential_from_tuple).collect()
}

/// Fetch one credential by id within a project.
///
/// # Errors
///
/// Returns [`CredentialError::NotFound`] when absent, or a database error.
pub async fn find_credential(pool: &PgPool, project_id: Uuid, id: Uuid) -> Result<CredentialRow, CredentialError> {
    let row = sqlx::query_as::<_, CredentialTuple>(&format!(
        "SELECT {CREDENTIAL_COLUMNS} FROM api_keys WHERE project_id = $1 AND id = $2",
    ))
    .bind(project_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(credential_from_tuple)
        .transpose()?
        .ok_or(CredentialError::NotFound)
}

/// Deactivate a credential. Rows are kept so historical analytics stay
/// attributable.
///
/// # Errors
///
/// Returns [`CredentialError::NotFound`] when no row matched, or a database
/// error.
pub async fn deactivate_credential(pool: &PgPool, project_id: Uuid, id: Uuid) -> Result<(), CredentialError> {
    let result = sqlx::query("UPDATE api_keys SET active = FALSE WHERE project_id = $1 AND id = $2")
        .bind(project_id)
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CredentialError::NotFound);
    }
    Ok(())
}

// =============================================================================
// RESOLUTION FOR EXECUTION
// =============================================================================

/// Turn a stored credential into the per-call provider config, decrypting
/// the API key when one is present.
///
/// # Errors
///
/// Returns [`CredentialError::Inactive`] for deactivated records,
/// [`CredentialError::MissingSecret`] when the provider's required secret is
/// absent, or a crypto error on decryption failure.
pub fn resolve_provider_config(
    master_key: &MasterKey,
    credential: &CredentialRow,
) -> Result<crate::llm::ProviderConfig, CredentialError> {
    if !credential.active {
        return Err(CredentialError::Inactive);
    }

    let api_key = match (&credential.api_key_ciphertext, &credential.api_key_iv) {
        (Some(ciphertext), Some(iv)) => Some(master_key.decrypt(ciphertext, iv)?),
        _ => None,
    };

    let has_secret = match credential.provider {
        Provider::LlmServer => credential.endpoint_url.is_some(),
        _ => api_key.is_some(),
    };
    if !has_secret {
        return Err(CredentialError::MissingSecret(credential.provider));
    }

    Ok(crate::llm::ProviderConfig {
        api_key,
        endpoint_url: credential.endpoint_url.clone(),
        model: credential.model.clone(),
    })
}
