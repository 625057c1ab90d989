use crate::embeddings::cosine_distance;
use crate::models::{IndexRecord, StoreMatches};
use crate::traits::VectorStore;
use crate::SearchError;
use async_trait::async_trait;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredRecord {
    record: IndexRecord,
    embedding: Vec<f32>,
}

/// In-process collection with exact cosine-distance search.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<StoredRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<String> {
        self.records
            .read()
            .map(|records| records.iter().map(|stored| stored.record.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, id: &str) -> Option<IndexRecord> {
        self.records.read().ok().and_then(|records| {
            records
                .iter()
                .find(|stored| stored.record.id == id)
                .map(|stored| stored.record.clone())
        })
    }
}

fn poisoned() -> SearchError {
    SearchError::Request("memory store lock poisoned".to_string())
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn add(&self, records: &[IndexRecord], embeddings: &[Vec<f32>]) -> Result<(), SearchError> {
        if records.len() != embeddings.len() {
            return Err(SearchError::Request(format!(
                "embedding count {} doesn't match record count {}",
                embeddings.len(),
                records.len()
            )));
        }

        let mut stored = self.records.write().map_err(|_| poisoned())?;
        for (record, embedding) in records.iter().zip(embeddings) {
            let entry = StoredRecord {
                record: record.clone(),
                embedding: embedding.clone(),
            };
            match stored.iter_mut().find(|existing| existing.record.id == record.id) {
                Some(existing) => *existing = entry,
                None => stored.push(entry),
            }
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], n_results: usize) -> Result<StoreMatches, SearchError> {
        let stored = self.records.read().map_err(|_| poisoned())?;

        let mut scored = stored
            .iter()
            .map(|entry| (cosine_distance(embedding, &entry.embedding), entry))
            .collect::<Vec<_>>();
        scored.sort_by(|left, right| left.0.total_cmp(&right.0));
        scored.truncate(n_results);

        let mut matches = StoreMatches::default();
        for (distance, entry) in scored {
            matches.ids.push(entry.record.id.clone());
            matches.documents.push(entry.record.document.clone());
            matches.metadatas.push(entry.record.metadata.clone());
            matches.distances.push(distance);
        }
        Ok(matches)
    }
}
