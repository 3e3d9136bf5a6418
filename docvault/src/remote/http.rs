//! reqwest-backed implementation of the remote API

use super::otp::{OtpGateway, VerifiedUser};
use super::{
    DocumentApi, SearchRequest, SearchResponse, TagListResponse, TagQuery, UploadPayload,
    UploadResponse,
};
use crate::config::{
    DOWNLOAD_MULTIPLE_PATH, DOWNLOAD_PATH, GENERATE_OTP_PATH, SEARCH_PATH, TAGS_PATH,
    UPLOAD_PATH, VALIDATE_OTP_PATH,
};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client for the document management backend
#[derive(Clone)]
pub struct HttpDocumentApi {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpDocumentApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("docvault/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            timeout,
        })
    }

    /// Same client, authenticated with a session token
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Remote request failed with status: {}", status);
            return Err(AppError::Remote(format!(
                "Request failed with status: {}",
                status
            )));
        }

        Ok(response)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let response = self.send(self.client.post(&url).json(body)).await?;
        response.json().await.map_err(|e| self.classify(e))
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("GET {}", url);

        let response = self.send(self.client.get(url)).await?;
        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;

        tracing::debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    fn classify(&self, error: reqwest::Error) -> AppError {
        if error.is_timeout() {
            AppError::Timeout(self.timeout)
        } else {
            AppError::Http(error)
        }
    }
}

#[async_trait]
impl DocumentApi for HttpDocumentApi {
    async fn search_documents(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.post_json(SEARCH_PATH, request).await
    }

    async fn upload_document(&self, payload: UploadPayload) -> Result<UploadResponse> {
        let url = self.url(UPLOAD_PATH);
        tracing::debug!("POST {} (multipart, {} bytes)", url, payload.bytes.len());

        let file_part = Part::bytes(payload.bytes)
            .file_name(payload.file_name)
            .mime_str(&payload.mime_type)?;

        let form = Form::new()
            .part("file", file_part)
            .text("data", serde_json::to_string(&payload.metadata)?);

        let response = self.send(self.client.post(&url).multipart(form)).await?;
        response.json().await.map_err(|e| self.classify(e))
    }

    async fn list_tags(&self, term: &str) -> Result<TagListResponse> {
        let query = TagQuery {
            term: term.to_string(),
        };
        self.post_json(TAGS_PATH, &query).await
    }

    async fn fetch_file(&self, url: &str) -> Result<Vec<u8>> {
        self.get_bytes(&self.url(url)).await
    }

    async fn download_document(&self, document_id: &str) -> Result<Vec<u8>> {
        let url = self.url(&format!("{}/{}", DOWNLOAD_PATH, document_id));
        self.get_bytes(&url).await
    }

    async fn download_multiple(&self, document_ids: &[String]) -> Result<Vec<u8>> {
        let url = self.url(DOWNLOAD_MULTIPLE_PATH);
        tracing::debug!("POST {} ({} documents)", url, document_ids.len());

        let response = self
            .send(self.client.post(&url).json(&BatchDownload { document_ids }))
            .await?;
        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Serialize)]
struct BatchDownload<'a> {
    #[serde(rename = "documentIds")]
    document_ids: &'a [String],
}

#[derive(Serialize)]
struct OtpRequest<'a> {
    mobile_number: &'a str,
}

#[derive(Serialize)]
struct OtpValidation<'a> {
    mobile_number: &'a str,
    otp: &'a str,
}

#[derive(Deserialize)]
struct OtpResponse<T> {
    status: bool,
    data: Option<T>,
}

#[derive(Deserialize)]
struct TokenData {
    token: String,
    #[serde(default, deserialize_with = "optional_id")]
    user_id: Option<String>,
    #[serde(default)]
    user_name: Option<String>,
}

fn optional_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "crate::models::id_from_string_or_number")] String);

    Option::<Wrapper>::deserialize(deserializer).map(|w| w.map(|Wrapper(id)| id))
}

#[async_trait]
impl OtpGateway for HttpDocumentApi {
    async fn request_otp(&self, mobile_number: &str) -> Result<()> {
        let response: OtpResponse<serde_json::Value> = self
            .post_json(GENERATE_OTP_PATH, &OtpRequest { mobile_number })
            .await?;

        if !response.status {
            return Err(AppError::Remote("Error sending OTP".to_string()));
        }
        Ok(())
    }

    async fn verify_otp(&self, mobile_number: &str, otp: &str) -> Result<Option<VerifiedUser>> {
        let response: OtpResponse<TokenData> = self
            .post_json(VALIDATE_OTP_PATH, &OtpValidation { mobile_number, otp })
            .await?;

        match (response.status, response.data) {
            (true, Some(data)) => Ok(Some(VerifiedUser {
                token: data.token,
                user_id: data.user_id,
                user_name: data.user_name,
            })),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let api = HttpDocumentApi::new("https://api.example.com/dm/", Duration::from_secs(5)).unwrap();

        assert_eq!(
            api.url(SEARCH_PATH),
            "https://api.example.com/dm/searchDocumentEntry"
        );
        assert_eq!(
            api.url("https://cdn.example.com/a.pdf"),
            "https://cdn.example.com/a.pdf"
        );
    }

    #[test]
    fn test_with_token_keeps_base_url() {
        let api = HttpDocumentApi::new("https://api.example.com", Duration::from_secs(5)).unwrap();
        let authed = api.with_token("abc");

        assert_eq!(authed.token.as_deref(), Some("abc"));
        assert!(api.token.is_none());
        assert_eq!(authed.url(TAGS_PATH), "https://api.example.com/documentTags");
    }

    #[test]
    fn test_batch_download_wire_shape() {
        let ids = vec!["7".to_string(), "9".to_string()];
        let body = serde_json::to_value(BatchDownload {
            document_ids: &ids,
        })
        .unwrap();

        assert_eq!(body, serde_json::json!({"documentIds": ["7", "9"]}));
    }

    #[test]
    fn test_token_response_accepts_numeric_user_id() {
        let response: OtpResponse<TokenData> = serde_json::from_str(
            r#"{"status": true, "data": {"token": "t-1", "user_id": 42, "user_name": "Asha"}}"#,
        )
        .unwrap();

        let data = response.data.unwrap();
        assert_eq!(data.token, "t-1");
        assert_eq!(data.user_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_rejected_otp_response_has_no_data() {
        let response: OtpResponse<TokenData> =
            serde_json::from_str(r#"{"status": false, "message": "Invalid"}"#).unwrap();

        assert!(!response.status);
        assert!(response.data.is_none());
    }
}
