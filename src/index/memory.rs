//! In-memory [`VectorStore`] for tests and offline runs.
//!
//! Uses `HashMap` and `BTreeMap` behind `std::sync::RwLock`. Queries are brute force over every
//! stored vector; scores are cosine similarity, inner product, or `1 / (1 + distance)` for
//! euclidean indexes so that a higher score always means a closer match.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use super::filters::MetadataFilter;
use super::store::VectorStore;
use super::types::{
    DistanceMetric, IndexError, IndexSpec, IndexStats, NamespaceStats, QueryMatch, VectorRecord,
};

struct MemoryIndex {
    spec: IndexSpec,
    records: BTreeMap<String, VectorRecord>,
}

/// Vector store that keeps every index in process memory.
#[derive(Default)]
pub struct InMemoryStore {
    indexes: RwLock<HashMap<String, MemoryIndex>>,
}

impl InMemoryStore {
    /// Empty store with no indexes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids stored in `index`, sorted, or an empty list when the index is missing.
    pub fn ids(&self, index: &str) -> Vec<String> {
        self.read()
            .ok()
            .and_then(|indexes| {
                indexes
                    .get(index)
                    .map(|stored| stored.records.keys().cloned().collect())
            })
            .unwrap_or_default()
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, MemoryIndex>>, IndexError> {
        self.indexes
            .read()
            .map_err(|_| IndexError::Rejected("in-memory store lock poisoned".into()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, MemoryIndex>>, IndexError> {
        self.indexes
            .write()
            .map_err(|_| IndexError::Rejected("in-memory store lock poisoned".into()))
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

fn score(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Cosine => cosine_sim(a, b),
        DistanceMetric::DotProduct => a.iter().zip(b.iter()).map(|(x, y)| x * y).sum(),
        DistanceMetric::Euclidean => {
            let distance = a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt();
            1.0 / (1.0 + distance)
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn list_indexes(&self) -> Result<Vec<String>, IndexError> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), IndexError> {
        let mut indexes = self.write()?;
        if indexes.contains_key(&spec.name) {
            return Err(IndexError::Rejected(format!(
                "index {} already exists",
                spec.name
            )));
        }
        indexes.insert(
            spec.name.clone(),
            MemoryIndex {
                spec: spec.clone(),
                records: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn upsert(&self, index: &str, records: Vec<VectorRecord>) -> Result<usize, IndexError> {
        let mut indexes = self.write()?;
        let stored = indexes
            .get_mut(index)
            .ok_or_else(|| IndexError::IndexNotFound(index.to_string()))?;

        if let Some(bad) = records
            .iter()
            .find(|record| record.values.len() != stored.spec.dimension)
        {
            return Err(IndexError::Rejected(format!(
                "vector {} has dimension {}, index expects {}",
                bad.id,
                bad.values.len(),
                stored.spec.dimension
            )));
        }

        let count = records.len();
        for record in records {
            stored.records.insert(record.id.clone(), record);
        }
        Ok(count)
    }

    async fn query(
        &self,
        index: &str,
        vector: Vec<f32>,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>, IndexError> {
        let indexes = self.read()?;
        let stored = indexes
            .get(index)
            .ok_or_else(|| IndexError::IndexNotFound(index.to_string()))?;
        if vector.len() != stored.spec.dimension {
            return Err(IndexError::Rejected(format!(
                "query has dimension {}, index expects {}",
                vector.len(),
                stored.spec.dimension
            )));
        }

        let mut matches: Vec<QueryMatch> = stored
            .records
            .values()
            .filter(|record| filter.is_none_or(|filter| filter.matches(&record.metadata)))
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: score(stored.spec.metric, &vector, &record.values),
                metadata: Some(record.metadata.clone()),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete(&self, index: &str, filter: &MetadataFilter) -> Result<(), IndexError> {
        let mut indexes = self.write()?;
        let stored = indexes
            .get_mut(index)
            .ok_or_else(|| IndexError::IndexNotFound(index.to_string()))?;
        stored
            .records
            .retain(|_, record| !filter.matches(&record.metadata));
        Ok(())
    }

    async fn describe_stats(&self, index: &str) -> Result<IndexStats, IndexError> {
        let indexes = self.read()?;
        let stored = indexes
            .get(index)
            .ok_or_else(|| IndexError::IndexNotFound(index.to_string()))?;
        let count = stored.records.len() as u64;
        let mut namespaces = BTreeMap::new();
        if count > 0 {
            namespaces.insert(
                String::new(),
                NamespaceStats {
                    vector_count: count,
                },
            );
        }
        Ok(IndexStats {
            total_vector_count: count,
            dimension: stored.spec.dimension,
            index_fullness: 0.0,
            namespaces,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value, json};

    fn spec(metric: DistanceMetric) -> IndexSpec {
        IndexSpec {
            name: "docs".into(),
            dimension: 2,
            metric,
        }
    }

    fn record(id: &str, values: [f32; 2], source: &str) -> VectorRecord {
        let mut metadata = Map::new();
        metadata.insert("source".into(), Value::String(source.into()));
        VectorRecord {
            id: id.into(),
            values: values.to_vec(),
            metadata,
        }
    }

    #[tokio::test]
    async fn query_ranks_by_similarity_and_honours_filters() {
        let store = InMemoryStore::new();
        store.create_index(&spec(DistanceMetric::Cosine)).await.unwrap();
        store
            .upsert(
                "docs",
                vec![
                    record("near", [1.0, 0.1], "a.txt"),
                    record("far", [0.0, 1.0], "b.txt"),
                    record("mid", [1.0, 1.0], "a.txt"),
                ],
            )
            .await
            .unwrap();

        let all = store.query("docs", vec![1.0, 0.0], 10, None).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);

        let filter = MetadataFilter::source("b.txt");
        let filtered = store
            .query("docs", vec![1.0, 0.0], 10, Some(&filter))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].metadata.as_ref().unwrap()["source"], json!("b.txt"));

        let top = store.query("docs", vec![1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id_and_delete_removes_by_filter() {
        let store = InMemoryStore::new();
        store.create_index(&spec(DistanceMetric::Euclidean)).await.unwrap();
        store
            .upsert("docs", vec![record("x", [1.0, 0.0], "a.txt")])
            .await
            .unwrap();
        store
            .upsert(
                "docs",
                vec![record("x", [0.0, 1.0], "a.txt"), record("y", [1.0, 1.0], "b.txt")],
            )
            .await
            .unwrap();
        assert_eq!(store.describe_stats("docs").await.unwrap().total_vector_count, 2);

        store
            .delete("docs", &MetadataFilter::source("a.txt"))
            .await
            .unwrap();
        assert_eq!(store.ids("docs"), vec!["y".to_string()]);
    }

    #[tokio::test]
    async fn wrong_dimension_and_missing_index_are_errors() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.query("docs", vec![1.0, 0.0], 1, None).await,
            Err(IndexError::IndexNotFound(_))
        ));

        store.create_index(&spec(DistanceMetric::DotProduct)).await.unwrap();
        let bad = VectorRecord {
            id: "bad".into(),
            values: vec![1.0, 2.0, 3.0],
            metadata: Map::new(),
        };
        assert!(matches!(
            store.upsert("docs", vec![bad]).await,
            Err(IndexError::Rejected(_))
        ));
        assert!(store.create_index(&spec(DistanceMetric::Cosine)).await.is_err());
    }
}
