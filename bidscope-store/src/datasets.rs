//! Saved datasets.
//!
//! A dataset is a named snapshot of enriched rows plus the query that
//! produced them, stored as `<dir>/<stem>.json`.

use bidscope_core::EnrichedRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{default_datasets_dir, load_json, save_json};

/// Query that produced a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetQuery {
    /// Start of the window, as entered.
    pub from_date: Option<String>,
    /// End of the window, as entered.
    pub to_date: Option<String>,
    /// Thread limit.
    pub limit: Option<usize>,
}

/// Dataset metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMeta {
    /// Name as given by the user.
    pub name: String,
    /// Start of the window, as entered.
    #[serde(default)]
    pub from_date: Option<String>,
    /// End of the window, as entered.
    #[serde(default)]
    pub to_date: Option<String>,
    /// Thread limit.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Number of rows.
    pub row_count: usize,
    /// When it was saved.
    pub saved_at: DateTime<Utc>,
}

/// Metadata plus rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Metadata.
    pub meta: DatasetMeta,
    /// Rows.
    pub rows: Vec<EnrichedRecord>,
}

#[derive(Deserialize)]
struct MetaOnly {
    meta: DatasetMeta,
}

/// Turns a dataset name into a safe file stem.
///
/// ASCII letters, digits, `-` and `_` are kept, everything else becomes `_`,
/// and leading or trailing underscores are dropped.
pub fn sanitize_name(name: &str) -> Result<String, StoreError> {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(stem.to_string())
}

/// Dataset files in one directory.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    dir: PathBuf,
}

impl DatasetStore {
    /// Creates a store over `dir`. Nothing is touched until the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store over the default data directory.
    pub fn open_default() -> Self {
        Self::new(default_datasets_dir())
    }

    /// Directory holding the dataset files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        Ok(self.dir.join(format!("{}.json", sanitize_name(name)?)))
    }

    /// Saves rows under `name`, replacing any dataset with the same stem.
    pub async fn save(
        &self,
        name: &str,
        query: DatasetQuery,
        rows: Vec<EnrichedRecord>,
    ) -> Result<DatasetMeta, StoreError> {
        let path = self.path_for(name)?;
        let meta = DatasetMeta {
            name: name.trim().to_string(),
            from_date: query.from_date,
            to_date: query.to_date,
            limit: query.limit,
            row_count: rows.len(),
            saved_at: Utc::now(),
        };
        let dataset = Dataset {
            meta: meta.clone(),
            rows,
        };

        save_json(&path, &dataset).await?;
        info!(name = %meta.name, rows = meta.row_count, "Saved dataset");
        Ok(meta)
    }

    /// Loads a dataset.
    pub async fn load(&self, name: &str) -> Result<Dataset, StoreError> {
        let path = self.path_for(name)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(StoreError::DatasetNotFound(name.to_string()));
        }
        load_json(&path).await
    }

    /// Metadata of every dataset, newest first. Unreadable files are skipped.
    pub async fn list(&self) -> Result<Vec<DatasetMeta>, StoreError> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut metas = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match load_json::<MetaOnly>(&path).await {
                Ok(file) => metas.push(file.meta),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable dataset"),
            }
        }

        metas.sort_by(|a, b| {
            b.saved_at
                .cmp(&a.saved_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        debug!(count = metas.len(), "Listed datasets");
        Ok(metas)
    }

    /// Deletes a dataset.
    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(name, "Deleted dataset");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::DatasetNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(thread_id: u64) -> EnrichedRecord {
        EnrichedRecord {
            thread_id: Some(thread_id),
            ..EnrichedRecord::default()
        }
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("March run").unwrap(), "March_run");
        assert_eq!(sanitize_name("../etc/passwd").unwrap(), "etc_passwd");
        assert_eq!(sanitize_name("q1-2024_final").unwrap(), "q1-2024_final");
        assert!(matches!(
            sanitize_name("  ///  "),
            Err(StoreError::InvalidName(_))
        ));
        assert!(sanitize_name("").is_err());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = DatasetStore::new(temp_dir.path().join("datasets"));
        let query = DatasetQuery {
            from_date: Some("2024-01-01".into()),
            to_date: None,
            limit: Some(50),
        };

        let meta = store
            .save("January", query, vec![row(1), row(2)])
            .await
            .unwrap();
        assert_eq!(meta.row_count, 2);

        let dataset = store.load("January").await.unwrap();
        assert_eq!(dataset.meta, meta);
        assert_eq!(dataset.rows.len(), 2);
        assert_eq!(dataset.rows[1].thread_id, Some(2));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let store = DatasetStore::new(temp_dir.path());

        store
            .save("older", DatasetQuery::default(), vec![])
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        store
            .save("newer", DatasetQuery::default(), vec![row(1)])
            .await
            .unwrap();
        tokio::fs::write(temp_dir.path().join("junk.json"), "nope")
            .await
            .unwrap();

        let names: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = DatasetStore::new(temp_dir.path().join("nothing-here"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = DatasetStore::new(temp_dir.path());
        store
            .save("gone soon", DatasetQuery::default(), vec![])
            .await
            .unwrap();

        store.delete("gone soon").await.unwrap();
        assert!(store.load("gone soon").await.unwrap_err().is_not_found());
        assert!(store.delete("gone soon").await.unwrap_err().is_not_found());
    }
}
