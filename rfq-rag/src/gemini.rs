//! Gemini embedding and token-counting collaborators.
//!
//! A thin client over the Generative Language REST API. Both collaborators
//! talk to the same embedding model, so the token counts used to size
//! retrieval windows match what the embedder will see.
//!
//! This module is only available when the `gemini` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use rfq_rag::gemini::{GeminiClient, GeminiEmbeddingProvider, GeminiTokenCounter};
//!
//! let client = GeminiClient::new("your-api-key")?;
//! let embedder = GeminiEmbeddingProvider::new(client.clone());
//! let counter = GeminiTokenCounter::new(client);
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::tokens::TokenCounter;

/// Base URL of the public Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Embedding model used for both retrieval and ingestion.
pub const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";
/// Output dimensionality requested from the embedding model.
pub const DEFAULT_DIMENSIONS: usize = 3072;

const PROVIDER: &str = "Gemini";

/// Embedding task hint sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// Text used as a search query.
    RetrievalQuery,
    /// Text stored as a searchable document.
    RetrievalDocument,
}

/// HTTP client bound to one Gemini model.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Create a client for [`DEFAULT_EMBEDDING_MODEL`] on the public API.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the key is not a valid header value
    /// or the HTTP client cannot be built.
    pub fn new(api_key: impl AsRef<str>) -> Result<Self> {
        let key = HeaderValue::from_str(api_key.as_ref())
            .map_err(|_| RagError::ConfigError("invalid Gemini API key".to_string()))?;
        let headers = HeaderMap::from_iter([(HeaderName::from_static("x-goog-api-key"), key)]);
        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RagError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
        })
    }

    /// Point the client at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use another model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The model name, without the `models/` prefix.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn model_path(&self) -> String {
        format!("models/{}", self.model)
    }

    async fn post<B, R>(&self, method: &str, body: &B) -> std::result::Result<R, String>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}:{method}", self.base_url, self.model_path());
        let response =
            self.http.post(&url).json(body).send().await.map_err(|e| e.to_string())?;
        let response = check_response(response).await?;
        response.json::<R>().await.map_err(|e| format!("failed to decode {method} response: {e}"))
    }
}

/// Turn a non-2xx response into the API's error message.
async fn check_response(response: Response) -> std::result::Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);
    Err(format!("HTTP {}: {message}", status.as_u16()))
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

impl<'a> Content<'a> {
    fn text(text: &'a str) -> Self {
        Self { parts: [Part { text }] }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct BatchEmbedContentsRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Serialize)]
struct CountTokensRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    total_tokens: Option<i64>,
}

/// An [`EmbeddingProvider`] backed by `embedContent`/`batchEmbedContents`.
///
/// Defaults to [`TaskType::RetrievalQuery`] and [`DEFAULT_DIMENSIONS`].
#[derive(Debug, Clone)]
pub struct GeminiEmbeddingProvider {
    client: GeminiClient,
    task_type: TaskType,
    dimensions: usize,
}

impl GeminiEmbeddingProvider {
    /// Create a provider over `client`.
    pub fn new(client: GeminiClient) -> Self {
        Self { client, task_type: TaskType::RetrievalQuery, dimensions: DEFAULT_DIMENSIONS }
    }

    /// Set the task type used for embedding requests.
    pub fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    /// Set the output dimensionality.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    fn request<'a>(&self, model: &'a str, text: &'a str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model,
            content: Content::text(text),
            task_type: self.task_type,
            output_dimensionality: self.dimensions,
        }
    }

    fn failure(message: impl Into<String>) -> RagError {
        RagError::EmbeddingError { provider: PROVIDER.to_string(), message: message.into() }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let model = self.client.model_path();
        let response: EmbedContentResponse =
            self.client.post("embedContent", &self.request(&model, text)).await.map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                Self::failure(e)
            })?;

        if response.embedding.values.is_empty() {
            return Err(Self::failure("empty embedding returned"));
        }
        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), "embedding batch");

        let model = self.client.model_path();
        let body = BatchEmbedContentsRequest {
            requests: texts.iter().map(|text| self.request(&model, text)).collect(),
        };
        let response: BatchEmbedContentsResponse =
            self.client.post("batchEmbedContents", &body).await.map_err(|e| {
                error!(provider = PROVIDER, error = %e, "batch embedding request failed");
                Self::failure(e)
            })?;

        if response.embeddings.len() != texts.len() {
            return Err(Self::failure(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }
        if response.embeddings.iter().any(|e| e.values.is_empty()) {
            return Err(Self::failure("empty embedding returned"));
        }
        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// A [`TokenCounter`] backed by `countTokens` on the embedding model.
#[derive(Debug, Clone)]
pub struct GeminiTokenCounter {
    client: GeminiClient,
}

impl GeminiTokenCounter {
    /// Create a counter over `client`.
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    fn failure(message: impl Into<String>) -> RagError {
        RagError::TokenCountError { counter: PROVIDER.to_string(), message: message.into() }
    }
}

#[async_trait]
impl TokenCounter for GeminiTokenCounter {
    async fn count_tokens(&self, text: &str) -> Result<usize> {
        let body = CountTokensRequest { contents: [Content::text(text)] };
        let response: CountTokensResponse =
            self.client.post("countTokens", &body).await.map_err(|e| {
                error!(counter = PROVIDER, error = %e, "countTokens request failed");
                Self::failure(e)
            })?;

        match response.total_tokens {
            Some(total) if total >= 0 => Ok(total as usize),
            Some(total) => Err(Self::failure(format!("negative token count {total}"))),
            None => Err(Self::failure("response has no totalTokens")),
        }
    }
}
