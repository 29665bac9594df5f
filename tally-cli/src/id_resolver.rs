//! ID resolver module
//!
//! Resolves UUID prefixes to full UUIDs by listing the resource and matching
//! against the prefix.

use anyhow::{Context, Result, anyhow};
use tally_client::TallyClient;
use uuid::Uuid;

use crate::types::IdOrPrefix;

/// Resolve a task ID or prefix to a full UUID
pub async fn resolve_task_id(client: &TallyClient, id_or_prefix: &IdOrPrefix) -> Result<Uuid> {
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let tasks = client
        .list_tasks()
        .await
        .context("Failed to fetch tasks for ID resolution")?;

    match_prefix("task", &id_or_prefix.to_string(), tasks.iter().map(|t| t.id))
}

/// Resolve a schedule ID or prefix to a full UUID
pub async fn resolve_schedule_id(
    client: &TallyClient,
    id_or_prefix: &IdOrPrefix,
) -> Result<Uuid> {
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let schedules = client
        .list_schedules()
        .await
        .context("Failed to fetch schedules for ID resolution")?;

    match_prefix(
        "schedule",
        &id_or_prefix.to_string(),
        schedules.iter().map(|s| s.id),
    )
}

/// Pick the single ID starting with `prefix`.
///
/// # Errors
/// Returns an error if no ID matches or if the prefix is ambiguous.
fn match_prefix(kind: &str, prefix: &str, ids: impl Iterator<Item = Uuid>) -> Result<Uuid> {
    let matches: Vec<Uuid> = ids
        .filter(|id| id.to_string().starts_with(prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No {} found with ID starting with '{}'", kind, prefix)),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple {}s: {}",
                prefix,
                kind,
                ids.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> Vec<Uuid> {
        vec![
            Uuid::parse_str("a1b2c3d4-0000-4000-8000-000000000001").unwrap(),
            Uuid::parse_str("a1b2ffff-0000-4000-8000-000000000002").unwrap(),
            Uuid::parse_str("b0000000-0000-4000-8000-000000000003").unwrap(),
        ]
    }

    #[test]
    fn test_unique_prefix() {
        let id = match_prefix("task", "a1b2c", ids().into_iter()).unwrap();
        assert_eq!(id, ids()[0]);
    }

    #[test]
    fn test_ambiguous_prefix() {
        let err = match_prefix("task", "a1b2", ids().into_iter()).unwrap_err();
        assert!(err.to_string().contains("Ambiguous prefix 'a1b2'"));
    }

    #[test]
    fn test_no_match() {
        let err = match_prefix("schedule", "ff", ids().into_iter()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No schedule found with ID starting with 'ff'"
        );
    }

    #[tokio::test]
    async fn test_full_uuid_skips_lookup() {
        // Nothing listens here; a full UUID must not hit the network.
        let client = TallyClient::new("http://127.0.0.1:1");
        let id = Uuid::new_v4();

        let resolved = resolve_task_id(&client, &IdOrPrefix::Full(id)).await.unwrap();
        assert_eq!(resolved, id);
    }
}
