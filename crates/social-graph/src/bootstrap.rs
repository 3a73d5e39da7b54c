//! Initial edge-list loading (`from,to,weight` per line).

use social_types::{clamp_weight, GraphStore, GraphStoreError};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("failed to read edge list: {0}")]
    Io(#[from] std::io::Error),
    #[error("graph store: {0}")]
    Store(#[from] GraphStoreError),
}

/// Counts from one bootstrap run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub loaded: usize,
    pub skipped: usize,
}

fn parse_row(line: &str) -> Option<(&str, &str, f64)> {
    let mut parts = line.split(',').map(str::trim);
    let from = parts.next().filter(|s| !s.is_empty())?;
    let to = parts.next().filter(|s| !s.is_empty())?;
    let weight = parts.next()?.parse::<f64>().ok().filter(|w| w.is_finite())?;
    Some((from, to, weight))
}

/// Load edges from CSV text into an empty store.
///
/// Returns `Ok(None)` without touching the store when it already holds vertices.
/// Malformed rows are skipped and logged; they never abort the load.
pub async fn load_edge_list(
    store: &dyn GraphStore,
    content: &str,
) -> Result<Option<BootstrapReport>, BootstrapError> {
    if !store.is_empty().await? {
        tracing::info!("graph already populated, skipping bootstrap");
        return Ok(None);
    }
    let mut report = BootstrapReport::default();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_row(line) {
            Some((from, to, weight)) => {
                store
                    .add_or_update_edge(from, to, clamp_weight(weight))
                    .await?;
                report.loaded += 1;
            }
            None => {
                tracing::warn!(line = idx + 1, row = %line, "skipping malformed edge row");
                report.skipped += 1;
            }
        }
    }
    tracing::info!(
        loaded = report.loaded,
        skipped = report.skipped,
        "graph bootstrap finished"
    );
    Ok(Some(report))
}

/// Load edges from a CSV file. A missing file means "start with an empty graph" and yields `Ok(None)`.
pub async fn load_edge_list_file(
    store: &dyn GraphStore,
    path: impl AsRef<Path>,
) -> Result<Option<BootstrapReport>, BootstrapError> {
    let content = match tokio::fs::read_to_string(path.as_ref()).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.as_ref().display(), "no edge list found, starting with empty graph");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    load_edge_list(store, &content).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryGraphStore;
    use std::io::Write;

    #[tokio::test]
    async fn malformed_rows_are_skipped() {
        let store = InMemoryGraphStore::new();
        let csv = "a,b,1.0\n\
                   # comment\n\
                   broken-row\n\
                   b,c,not-a-number\n\
                   ,c,1.0\n\
                   b,c,2.5\n\
                   \n\
                   c,a,NaN\n\
                   c,d,42\n";
        let report = load_edge_list(&store, csv).await.unwrap().unwrap();
        assert_eq!(report, BootstrapReport { loaded: 3, skipped: 4 });
        assert_eq!(store.get_connection_weight("b", "c").await.unwrap(), 2.5);
        // Out-of-range weights are clamped.
        assert_eq!(store.get_connection_weight("c", "d").await.unwrap(), 10.0);
    }

    #[tokio::test]
    async fn non_empty_store_is_left_alone() {
        let store = InMemoryGraphStore::new();
        store.add_user("existing").await.unwrap();
        let report = load_edge_list(&store, "a,b,1.0\n").await.unwrap();
        assert!(report.is_none());
        assert!(store.export_edges().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryGraphStore::new();
        let report = load_edge_list_file(&store, dir.path().join("absent.csv"))
            .await
            .unwrap();
        assert!(report.is_none());
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alice,bob,1.0").unwrap();
        writeln!(file, "bob,carol,0.5").unwrap();
        let store = InMemoryGraphStore::new();
        let report = load_edge_list_file(&store, file.path()).await.unwrap().unwrap();
        assert_eq!(report.loaded, 2);
        assert!(store.get_following("alice").await.unwrap().contains("bob"));
    }
}
