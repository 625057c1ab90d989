use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    /// One vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError>;
}

/// Hashes character trigrams into a fixed-size L2-normalized vector.
/// Needs no model and is fully deterministic.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let chars: Vec<char> = text.to_lowercase().chars().collect();

        let windows: Vec<&[char]> = if chars.len() < 3 {
            vec![chars.as_slice()]
        } else {
            chars.windows(3).collect()
        };

        for window in windows.into_iter().filter(|window| !window.is_empty()) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        normalize_l2(&mut vector);
        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    /// Full URL of an OpenAI-compatible `/v1/embeddings` endpoint.
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
    pub timeout_secs: u64,
}

impl Default for HttpEmbedderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/v1/embeddings".to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_key: None,
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            timeout_secs: 60,
        }
    }
}

/// Embeds through a remote sentence-embedding service.
pub struct HttpEmbedder {
    client: Client,
    config: HttpEmbedderConfig,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(&self.config.endpoint)
            .json(&json!({ "model": self.config.model, "input": texts }));

        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::BackendResponse {
                backend: "embeddings".to_string(),
                details: format!("{status}: {body}"),
            });
        }

        let payload: Value = response.json().await?;
        let vectors = parse_embedding_response(&payload)?;

        if vectors.len() != texts.len() {
            return Err(SearchError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        Ok(vectors)
    }
}

fn parse_embedding_response(payload: &Value) -> Result<Vec<Vec<f32>>, SearchError> {
    let data = payload
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::Embedding("response is missing the data array".to_string()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(Value::as_u64)
            .map(|index| index as usize)
            .unwrap_or(position);
        let vector = item
            .get("embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::Embedding(format!("item {position} has no embedding")))?
            .iter()
            .map(|value| {
                value.as_f64().map(|number| number as f32).ok_or_else(|| {
                    SearchError::Embedding(format!("item {position} has a non-numeric value: {value}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        indexed.push((index, vector));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}

pub fn normalize_l2(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}

/// `1 - cos(a, b)`; orthogonal or degenerate vectors are at distance 1.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        return 1.0;
    }

    1.0 - dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embedder_is_deterministic() -> Result<(), SearchError> {
        let embedder = CharacterNgramEmbedder::default();
        let texts = vec!["유압 펌프 압력".to_string(), "유압 펌프 압력".to_string()];
        let vectors = embedder.embed(&texts).await?;
        assert_eq!(vectors[0], vectors[1]);
        Ok(())
    }

    #[test]
    fn embedder_outputs_expected_length() {
        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        assert_eq!(embedder.embed_one("ab").len(), 32);
        assert_eq!(embedder.embed_one("abcdef").len(), 32);
    }

    #[test]
    fn identical_text_has_zero_distance() {
        let embedder = CharacterNgramEmbedder::default();
        let vector = embedder.embed_one("meeting notes about the budget");
        assert!(cosine_distance(&vector, &vector).abs() < 1e-6);
    }

    #[test]
    fn mismatched_vectors_are_maximally_distant() {
        assert_eq!(cosine_distance(&[1.0, 0.0], &[1.0]), 1.0);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[0.0, 0.0]), 1.0);
    }

    #[test]
    fn embedding_response_is_reordered_by_index() -> Result<(), SearchError> {
        let payload = json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        });
        let vectors = parse_embedding_response(&payload)?;
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        Ok(())
    }

    #[test]
    fn embedding_response_without_data_is_an_error() {
        let result = parse_embedding_response(&json!({"error": "nope"}));
        assert!(matches!(result, Err(SearchError::Embedding(_))));
    }

    #[test]
    fn non_numeric_embedding_value_is_an_error() {
        let payload = json!({"data": [{"index": 0, "embedding": [0.1, "oops", 0.3]}]});
        let result = parse_embedding_response(&payload);
        assert!(matches!(result, Err(SearchError::Embedding(_))));
    }
}
