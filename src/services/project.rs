//! Project and endpoint definitions — tenant-scoped CRUD.
//!
//! DESIGN
//! ======
//! Tenancy is flat: a project belongs to one user and is addressed by
//! (owner id, project name); endpoints are addressed by name within their
//! project. Execution reads these rows as immutable per-call input.

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("endpoint not found: {0}")]
    EndpointNotFound(String),

    #[error("name already in use: {0}")]
    Duplicate(String),

    #[error("invalid endpoint definition: {0}")]
    InvalidDefinition(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Closed set of endpoint kinds. Crosses {structured, text} input with
/// {LLM-call, payload-only} output handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    Structured,
    Text,
    StructuredPayload,
    TextPayload,
}

impl EndpointKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Text => "text",
            Self::StructuredPayload => "structured_payload",
            Self::TextPayload => "text_payload",
        }
    }

    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw {
            "structured" => Some(Self::Structured),
            "text" => Some(Self::Text),
            "structured_payload" => Some(Self::StructuredPayload),
            "text_payload" => Some(Self::TextPayload),
            _ => None,
        }
    }

    /// Payload-only kinds never reach a provider.
    #[must_use]
    pub fn calls_llm(self) -> bool {
        matches!(self, Self::Structured | Self::Text)
    }

    /// Text kinds demand a `text` field in the request body.
    #[must_use]
    pub fn requires_text(self) -> bool {
        matches!(self, Self::Text | Self::TextPayload)
    }
}

const ALLOWED_VERBS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

/// Uppercase and validate an endpoint verb against the closed set.
#[must_use]
pub fn normalize_verb(raw: &str) -> Option<String> {
    let verb = raw.trim().to_ascii_uppercase();
    ALLOWED_VERBS.contains(&verb.as_str()).then_some(verb)
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProjectRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct EndpointRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub http_verb: String,
    pub kind: EndpointKind,
    pub input_schema: Option<Value>,
    pub output_schema: Option<Value>,
    pub instructions: Option<String>,
    pub context: Option<String>,
    /// Credential record bound to this endpoint.
    pub api_key_id: Option<Uuid>,
}

/// Mutable endpoint fields, shared by create and update.
#[derive(Debug, Clone)]
pub struct EndpointDefinition {
    pub name: String,
    pub http_verb: String,
    pub kind: EndpointKind,
    pub input_schema: Option<Value>,
    pub output_schema: Option<Value>,
    pub instructions: Option<String>,
    pub context: Option<String>,
    pub api_key_id: Option<Uuid>,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

// =============================================================================
// PROJECTS
// =============================================================================

/// Create a project for an owner.
///
/// # Errors
///
/// Returns [`ProjectError::Duplicate`] when the owner already has a project
/// of that name, or a database error.
pub async fn create_project(pool: &PgPool, owner_id: Uuid, name: &str) -> Result<ProjectRow, ProjectError> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO projects (id, owner_id, name) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(owner_id)
        .bind(name)
        .execute(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ProjectError::Duplicate(name.to_string())
            } else {
                ProjectError::Database(e)
            }
        })?;
    Ok(ProjectRow { id, owner_id, name: name.to_string() })
}

/// List an owner's projects, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_projects(pool: &PgPool, owner_id: Uuid) -> Result<Vec<ProjectRow>, ProjectError> {
    let rows = sqlx::query_as::<_, (Uuid, String)>(
        "SELECT id, name FROM projects WHERE owner_id = $1 ORDER BY created_at DESC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| ProjectRow { id, owner_id, name })
        .collect())
}

/// Resolve a project by owner and name.
///
/// # Errors
///
/// Returns [`ProjectError::ProjectNotFound`] when absent, or a database error.
pub async fn find_project(pool: &PgPool, owner_id: Uuid, name: &str) -> Result<ProjectRow, ProjectError> {
    let row = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM projects WHERE owner_id = $1 AND name = $2")
        .bind(owner_id)
        .bind(name)
        .fetch_optional(pool)
        .await?;
    row.map(|(id,)| ProjectRow { id, owner_id, name: name.to_string() })
        .ok_or_else(|| ProjectError::ProjectNotFound(name.to_string()))
}

/// Delete a project (endpoints and events cascade).
///
/// # Errors
///
/// Returns [`ProjectError::ProjectNotFound`] when no row matched, or a
/// database error.
pub async fn delete_project(pool: &PgPool, owner_id: Uuid, name: &str) -> Result<(), ProjectError> {
    let result = sqlx::query("DELETE FROM projects WHERE owner_id = $1 AND name = $2")
        .bind(owner_id)
        .bind(name)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ProjectError::ProjectNotFound(name.to_string()));
    }
    Ok(())
}

// =============================================================================
// ENDPOINTS
// =============================================================================

type EndpointTuple = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    Option<Value>,
    Option<Value>,
    Option<String>,
    Option<String>,
    Option<Uuid>,
);

fn endpoint_from_tuple(row: EndpointTuple) -> Result<EndpointRow, ProjectError> {
    let (id, project_id, name, http_verb, kind, input_schema, output_schema, instructions, context, api_key_id) = row;
    let kind = EndpointKind::from_str(&kind)
        .ok_or_else(|| ProjectError::InvalidDefinition(format!("unknown endpoint kind: {kind}")))?;
    Ok(EndpointRow {
        id,
        project_id,
        name,
        http_verb,
        kind,
        input_schema,
        output_schema,
        instructions,
        context,
        api_key_id,
    })
}

const ENDPOINT_COLUMNS: &str =
    "id, project_id, name, http_verb, kind, input_schema, output_schema, instructions, context, api_key_id";

/// Create an endpoint inside a project.
///
/// # Errors
///
/// Returns [`ProjectError::InvalidDefinition`] for a bad verb,
/// [`ProjectError::Duplicate`] for a name collision, or a database error.
pub async fn create_endpoint(
    pool: &PgPool,
    project_id: Uuid,
    definition: EndpointDefinition,
) -> Result<EndpointRow, ProjectError> {
    let verb = normalize_verb(&definition.http_verb)
        .ok_or_else(|| ProjectError::InvalidDefinition(format!("unsupported verb: {}", definition.http_verb)))?;

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO endpoints
             (id, project_id, name, http_verb, kind, input_schema, output_schema, instructions, context, api_key_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(id)
    .bind(project_id)
    .bind(&definition.name)
    .bind(&verb)
    .bind(definition.kind.as_str())
    .bind(&definition.input_schema)
    .bind(&definition.output_schema)
    .bind(&definition.instructions)
    .bind(&definition.context)
    .bind(definition.api_key_id)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ProjectError::Duplicate(definition.name.clone())
        } else {
            ProjectError::Database(e)
        }
    })?;

    Ok(EndpointRow {
        id,
        project_id,
        name: definition.name,
        http_verb: verb,
        kind: definition.kind,
        input_schema: definition.input_schema,
        output_schema: definition.output_schema,
        instructions: definition.instructions,
        context: definition.context,
        api_key_id: definition.api_key_id,
    })
}

/// List a project's endpoints by name.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_endpoints(pool: &PgPool, project_id: Uuid) -> Result<Vec<EndpointRow>, ProjectError> {
    let rows = sqlx::query_as::<_, EndpointTuple>(&format!(
        "SELECT {ENDPOINT_COLUMNS} FROM endpoints WHERE project_id = $1 ORDER BY name",
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(endpoint_from_tuple).collect()
}

/// Resolve an endpoint by name within a project.
///
/// # Errors
///
/// Returns [`ProjectError::EndpointNotFound`] when absent, or a database error.
pub async fn find_endpoint(pool: &PgPool, project_id: Uuid, name: &str) -> Result<EndpointRow, ProjectError> {
    let row = sqlx::query_as::<_, EndpointTuple>(&format!(
        "SELECT {ENDPOINT_COLUMNS} FROM endpoints WHERE project_id = $1 AND name = $2",
    ))
    .bind(project_id)
    .bind(name)
    .fetch_optional(pool)
    .await?;
    row.map(endpoint_from_tuple)
        .transpose()?
        .ok_or_else(|| ProjectError::EndpointNotFound(name.to_string()))
}

/// Replace an endpoint's mutable fields.
///
/// # Errors
///
/// Returns [`ProjectError::InvalidDefinition`] for a bad verb,
/// [`ProjectError::EndpointNotFound`] when absent, or a database error.
pub async fn update_endpoint(
    pool: &PgPool,
    project_id: Uuid,
    name: &str,
    definition: EndpointDefinition,
) -> Result<EndpointRow, ProjectError> {
    let verb = normalize_verb(&definition.http_verb)
        .ok_or_else(|| ProjectError::InvalidDefinition(format!("unsupported verb: {}", definition.http_verb)))?;

    let row = sqlx::query_as::<_, (Uuid,)>(
        "UPDATE endpoints
         SET name = $3, http_verb = $4, kind = $5, input_schema = $6, output_schema = $7,
             instructions = $8, context = $9, api_key_id = $10
         WHERE project_id = $1 AND name = $2
         RETURNING id",
    )
    .bind(project_id)
    .bind(name)
    .bind(&definition.name)
    .bind(&verb)
    .bind(definition.kind.as_str())
    .bind(&definition.input_schema)
    .bind(&definition.output_schema)
    .bind(&definition.instructions)
    .bind(&definition.context)
    .bind(definition.api_key_id)
    .fetch_optional(pool)
    .await?;

    let (id,) = row.ok_or_else(|| ProjectError::EndpointNotFound(name.to_string()))?;
    Ok(EndpointRow {
        id,
        project_id,
        name: definition.name,
        http_verb: verb,
        kind: definition.kind,
        input_schema: definition.input_schema,
        output_schema: definition.output_schema,
        instructions: definition.instructions,
        context: definition.context,
        api_key_id: definition.api_key_id,
    })
}

/// Delete an endpoint by name.
///
/// # Errors
///
/// Returns [`ProjectError::EndpointNotFound`] when no row matched, or a
/// database error.
pub async fn delete_endpoint(pool: &PgPool, project_id: Uuid, name: &str) -> Result<(), ProjectError> {
    let result = sqlx::query("DELETE FROM endpoints WHERE project_id = $1 AND name = $2")
        .bind(project_id)
        .bind(name)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ProjectError::EndpointNotFound(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_kind_round_trips() {
        for kind in [
            EndpointKind::Structured,
            EndpointKind::Text,
            EndpointKind::StructuredPayload,
            EndpointKind::TextPayload,
        ] {
            assert_eq!(EndpointKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(EndpointKind::from_str("conversational"), None);
    }

    #[test]
    fn kind_flags_partition_the_set() {
        assert!(EndpointKind::Structured.calls_llm());
        assert!(EndpointKind::Text.calls_llm());
        assert!(!EndpointKind::StructuredPayload.calls_llm());
        assert!(!EndpointKind::TextPayload.calls_llm());

        assert!(EndpointKind::Text.requires_text());
        assert!(EndpointKind::TextPayload.requires_text());
        assert!(!EndpointKind::Structured.requires_text());
        assert!(!EndpointKind::StructuredPayload.requires_text());
    }

    #[test]
    fn verbs_normalize_to_uppercase_closed_set() {
        assert_eq!(normalize_verb("post"), Some("POST".to_string()));
        assert_eq!(normalize_verb(" Get "), Some("GET".to_string()));
        assert_eq!(normalize_verb("TRACE"), None);
        assert_eq!(normalize_verb(""), None);
    }
}
