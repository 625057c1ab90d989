use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::models::{QueryResult, StoreMatches};
use crate::traits::VectorStore;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_TOP_K: usize = 5;

/// Cosine similarity from the store's cosine distance.
pub fn similarity_from_distance(distance: f64) -> f64 {
    1.0 - distance
}

/// Embeds a query and returns the nearest stored records, most similar first.
pub struct QueryService<S: VectorStore> {
    store: Arc<S>,
    embedder: Arc<dyn Embedder>,
}

impl<S: VectorStore> QueryService<S> {
    pub fn new(store: Arc<S>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<QueryResult>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| SearchError::Embedding("embedder returned no vector".to_string()))?;

        let matches = self.store.query(&vector, top_k).await?;
        debug!(query, matches = matches.len(), "store query finished");

        let mut results = rank_matches(matches)?;
        results.truncate(top_k);
        Ok(results)
    }
}

/// Zips the store's parallel columns and orders them by decreasing similarity.
pub fn rank_matches(matches: StoreMatches) -> Result<Vec<QueryResult>, SearchError> {
    let count = matches.ids.len();
    if matches.documents.len() != count
        || matches.metadatas.len() != count
        || matches.distances.len() != count
    {
        return Err(SearchError::BackendResponse {
            backend: "vector store".to_string(),
            details: "result columns have different lengths".to_string(),
        });
    }

    let mut results = matches
        .ids
        .into_iter()
        .zip(matches.documents)
        .zip(matches.metadatas)
        .zip(matches.distances)
        .map(|(((id, document), metadata), distance)| QueryResult {
            id,
            document,
            metadata,
            similarity: similarity_from_distance(distance),
        })
        .collect::<Vec<_>>();

    results.sort_by(|left, right| right.similarity.total_cmp(&left.similarity));
    Ok(results)
}
