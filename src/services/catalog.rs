//! Task catalog seeding

use std::path::Path;
use tracing::info;

use crate::db::FarmStore;
use crate::domain::{Task, TaskDefinition};
use crate::types::{FarmError, Result};

/// Parse a JSON array of task definitions
pub fn parse_catalog(json: &str) -> Result<Vec<TaskDefinition>> {
    serde_json::from_str(json)
        .map_err(|e| FarmError::Config(format!("Invalid task catalog: {}", e)))
}

/// Read a catalog file
pub async fn load_catalog(path: &Path) -> Result<Vec<TaskDefinition>> {
    let json = tokio::fs::read_to_string(path).await.map_err(|e| {
        FarmError::Config(format!("Failed to read task catalog {}: {}", path.display(), e))
    })?;
    parse_catalog(&json)
}

/// Check a definition the way the store will decode it
pub fn validate_definition(definition: &TaskDefinition) -> Result<()> {
    let mut candidate = definition.clone();
    candidate.id.get_or_insert_with(uuid::Uuid::nil);
    Task::from_definition(&candidate)
        .map(|_| ())
        .map_err(|e| FarmError::Config(format!("Invalid task catalog entry: {}", e)))
}

/// Upsert every definition.
///
/// The whole catalog is validated first; one invalid entry seeds nothing.
pub async fn seed_catalog(store: &dyn FarmStore, definitions: &[TaskDefinition]) -> Result<usize> {
    for definition in definitions {
        validate_definition(definition)?;
    }

    for definition in definitions {
        let id = store.upsert_task(definition).await?;
        info!("Seeded task '{}' ({})", definition.name, id);
    }
    Ok(definitions.len())
}
