//! Batch transport: ordered, sequential delivery of frame batches.

use async_trait::async_trait;
use reelcap_common::error::{ReelcapError, ReelcapResult};
use reelcap_frame_model::{
    BatchHeader, EncodedArtifact, FinalizeRequest, PublishReceipt, SessionId,
};

/// Destination for captured batches and the finalize call.
///
/// Batches must be delivered in non-decreasing `start_frame` order per
/// session; the sink does not reorder or buffer out-of-order batches.
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Deliver one batch. Returns only once the server has durably staged
    /// every frame in it.
    async fn send_batch(&self, header: &BatchHeader, payload: &[u8]) -> ReelcapResult<()>;

    /// Finalize the session and return the encoded artifact.
    async fn finalize(
        &self,
        session: &SessionId,
        request: &FinalizeRequest,
    ) -> ReelcapResult<EncodedArtifact>;
}

/// Structured error payload returned by the server.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

/// HTTP client for the Reelcap server API.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Publish an encoded artifact to the server's object store under an
    /// owner-scoped path.
    pub async fn publish_video(
        &self,
        owner: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> ReelcapResult<PublishReceipt> {
        let url = format!("{}/api/videos", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("owner", owner), ("file_name", file_name)])
            .header(reqwest::header::CONTENT_TYPE, "video/mp4")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| ReelcapError::transport(format!("Publish request failed: {e}")))?;

        let response = Self::check(response).await?;
        response
            .json::<PublishReceipt>()
            .await
            .map_err(|e| ReelcapError::transport(format!("Invalid publish response: {e}")))
    }

    /// Surface non-2xx responses as transport errors carrying the server's
    /// structured `{error, details}` payload when present.
    async fn check(response: reqwest::Response) -> ReelcapResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => match parsed.details {
                Some(details) => format!("{}: {details}", parsed.error),
                None => parsed.error,
            },
            Err(_) if !body.is_empty() => body,
            Err(_) => status.to_string(),
        };
        Err(ReelcapError::transport(format!(
            "Server responded {status}: {message}"
        )))
    }
}

#[async_trait]
impl BatchSink for HttpApiClient {
    async fn send_batch(&self, header: &BatchHeader, payload: &[u8]) -> ReelcapResult<()> {
        let url = format!(
            "{}/api/sessions/{}/batches",
            self.base_url, header.session_id
        );
        let response = self
            .client
            .post(&url)
            .query(&header.to_params())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|e| {
                ReelcapError::transport(format!(
                    "Batch {} upload failed: {e}",
                    header.batch_number
                ))
            })?;

        Self::check(response).await?;
        Ok(())
    }

    async fn finalize(
        &self,
        session: &SessionId,
        request: &FinalizeRequest,
    ) -> ReelcapResult<EncodedArtifact> {
        let url = format!("{}/api/sessions/{session}/finalize", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ReelcapError::transport(format!("Finalize request failed: {e}")))?;

        let response = Self::check(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ReelcapError::transport(format!("Failed to read video body: {e}")))?;
        Ok(EncodedArtifact::new(bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = HttpApiClient::new("http://localhost:8787/");
        assert_eq!(client.base_url, "http://localhost:8787");
    }

    #[test]
    fn error_body_parses_with_and_without_details() {
        let full: ErrorBody =
            serde_json::from_str(r#"{"error":"Validation error","details":"bad length"}"#).unwrap();
        assert_eq!(full.error, "Validation error");
        assert_eq!(full.details.as_deref(), Some("bad length"));

        let bare: ErrorBody = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert!(bare.details.is_none());
    }
}
