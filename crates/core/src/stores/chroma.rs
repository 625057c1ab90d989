use crate::models::{IndexRecord, RecordMetadata, StoreMatches};
use crate::traits::VectorStore;
use crate::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_COLLECTION: &str = "multimodal-documents";
const DEFAULT_TENANT: &str = "default_tenant";
const DEFAULT_DATABASE: &str = "default_database";

/// Client for one collection of a Chroma server (v2 REST API).
///
/// The collection is created with cosine distance, so `query` distances are
/// `1 - cosine similarity`.
pub struct ChromaStore {
    client: Client,
    collection_url: Url,
    collection_name: String,
}

impl ChromaStore {
    /// Gets or creates `collection` and returns a handle bound to it.
    pub async fn connect(endpoint: &str, collection: &str) -> Result<Self, SearchError> {
        let client = Client::new();
        let base = Url::parse(endpoint)?;
        let collections_url = base.join(&format!(
            "api/v2/tenants/{DEFAULT_TENANT}/databases/{DEFAULT_DATABASE}/collections/"
        ))?;

        let response = client
            .post(collections_url.as_str().trim_end_matches('/'))
            .json(&json!({
                "name": collection,
                "metadata": { "hnsw:space": "cosine" },
                "get_or_create": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: format!("collection setup returned {}", response.status()),
            });
        }

        let payload: Value = response.json().await?;
        let collection_id = payload
            .pointer("/id")
            .and_then(Value::as_str)
            .ok_or_else(|| SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: "collection response has no id".to_string(),
            })?;

        info!(collection, collection_id, "chroma collection ready");
        Ok(Self {
            client,
            collection_url: collections_url.join(&format!("{collection_id}/"))?,
            collection_name: collection.to_string(),
        })
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    async fn post(&self, action: &str, body: Value) -> Result<Value, SearchError> {
        let response = self
            .client
            .post(self.collection_url.join(action)?)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let details = response.text().await.unwrap_or_default();
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: format!("{action} returned {status}: {details}"),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn add(&self, records: &[IndexRecord], embeddings: &[Vec<f32>]) -> Result<(), SearchError> {
        if records.len() != embeddings.len() {
            return Err(SearchError::Request(format!(
                "embedding count {} doesn't match record count {}",
                embeddings.len(),
                records.len()
            )));
        }
        if records.is_empty() {
            return Ok(());
        }

        let ids = records.iter().map(|record| &record.id).collect::<Vec<_>>();
        let documents = records.iter().map(|record| &record.document).collect::<Vec<_>>();
        let metadatas = records.iter().map(|record| &record.metadata).collect::<Vec<_>>();

        // Upsert: a re-ingested id replaces the stored document.
        self.post(
            "upsert",
            json!({
                "ids": ids,
                "embeddings": embeddings,
                "documents": documents,
                "metadatas": metadatas,
            }),
        )
        .await?;

        debug!(count = records.len(), collection = %self.collection_name, "records upserted");
        Ok(())
    }

    async fn query(&self, embedding: &[f32], n_results: usize) -> Result<StoreMatches, SearchError> {
        let payload = self
            .post(
                "query",
                json!({
                    "query_embeddings": [embedding],
                    "n_results": n_results,
                    "include": ["documents", "metadatas", "distances"],
                }),
            )
            .await?;

        parse_query_response(&payload)
    }
}

/// Reads the first query's columns out of Chroma's nested
/// `{ids: [[..]], documents: [[..]], metadatas: [[..]], distances: [[..]]}`.
fn parse_query_response(payload: &Value) -> Result<StoreMatches, SearchError> {
    let column = |name: &str| -> Vec<Value> {
        payload
            .pointer(&format!("/{name}/0"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };

    let ids = column("ids")
        .into_iter()
        .map(|id| match id {
            Value::String(id) => Ok(id),
            other => Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: format!("non-string id in query response: {other}"),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let documents = column("documents");
    let metadatas = column("metadatas");
    let distances = column("distances");

    if distances.len() != ids.len() {
        return Err(SearchError::BackendResponse {
            backend: "chroma".to_string(),
            details: format!("{} ids but {} distances", ids.len(), distances.len()),
        });
    }

    let mut matches = StoreMatches::default();
    for (index, id) in ids.into_iter().enumerate() {
        let document = documents
            .get(index)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let metadata = metadatas
            .get(index)
            .filter(|value| !value.is_null())
            .map(|value| serde_json::from_value::<RecordMetadata>(value.clone()))
            .transpose()?
            .unwrap_or_default();
        let distance = distances[index].as_f64().ok_or_else(|| SearchError::BackendResponse {
            backend: "chroma".to_string(),
            details: format!("distance for {id} is not a number"),
        })?;

        matches.ids.push(id);
        matches.documents.push(document);
        matches.metadatas.push(metadata);
        matches.distances.push(distance);
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::parse_query_response;
    use crate::SearchError;
    use serde_json::json;

    #[test]
    fn query_columns_are_zipped_in_store_order() -> Result<(), SearchError> {
        let payload = json!({
            "ids": [["./pdf/a.pdf#chunk_2", "./voice/memo.mp3"]],
            "documents": [["chunk text", "[0.00 → 1.00] 안녕"]],
            "metadatas": [[
                {"kind": "pdf", "display_name": "a.pdf", "chunk_index": 2},
                {"kind": "voice", "display_name": "memo.mp3", "segment_count": 1}
            ]],
            "distances": [[0.12, 0.48]]
        });

        let matches = parse_query_response(&payload)?;
        assert_eq!(matches.len(), 2);
        assert_eq!(matches.ids[1], "./voice/memo.mp3");
        assert_eq!(matches.metadatas[0].chunk_index, Some(2));
        assert_eq!(matches.metadatas[1].kind, "voice");
        assert_eq!(matches.distances, vec![0.12, 0.48]);
        Ok(())
    }

    #[test]
    fn empty_collection_yields_empty_matches() -> Result<(), SearchError> {
        let payload = json!({
            "ids": [[]],
            "documents": [[]],
            "metadatas": [[]],
            "distances": [[]]
        });
        assert!(parse_query_response(&payload)?.is_empty());
        Ok(())
    }

    #[test]
    fn null_metadata_defaults() -> Result<(), SearchError> {
        let payload = json!({
            "ids": [["x"]],
            "documents": [[null]],
            "metadatas": [[null]],
            "distances": [[0.3]]
        });
        let matches = parse_query_response(&payload)?;
        assert_eq!(matches.documents[0], "");
        assert_eq!(matches.metadatas[0].kind, "");
        Ok(())
    }

    #[test]
    fn missing_distances_are_rejected() {
        let payload = json!({ "ids": [["x"]], "documents": [["d"]], "metadatas": [[{}]] });
        assert!(parse_query_response(&payload).is_err());
    }

    #[test]
    fn non_string_ids_are_rejected() {
        let payload = json!({
            "ids": [["a", 7]],
            "documents": [["d1", "d2"]],
            "metadatas": [[{}, {}]],
            "distances": [[0.1, 0.2]],
        });
        let result = parse_query_response(&payload);
        assert!(matches!(result, Err(SearchError::BackendResponse { .. })));
    }
}
