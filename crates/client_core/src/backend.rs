//! Seam to the analysis backend plus its HTTP implementation.

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use shared::{
    error::ErrorReply,
    protocol::{
        BackendReply, CompareRequest, QueryReply, QueryRequest, UploadReply, UPLOAD_FIELD_NAME,
    },
};
use tracing::debug;
use url::Url;

use crate::error::BackendError;

/// Raw spreadsheet picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn upload(&self, file: &UploadFile) -> Result<BackendReply<UploadReply>, BackendError>;
    async fn query(&self, request: &QueryRequest)
        -> Result<BackendReply<QueryReply>, BackendError>;
    async fn compare(
        &self,
        request: &CompareRequest,
    ) -> Result<BackendReply<QueryReply>, BackendError>;
}

pub struct HttpAnalysisBackend {
    http: Client,
    base_url: String,
}

impl HttpAnalysisBackend {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let parsed = Url::parse(base_url.trim())
            .with_context(|| format!("invalid analysis backend url '{base_url}'"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("analysis backend url must start with http:// or https://");
        }
        Ok(Self {
            http: Client::new(),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

#[async_trait]
impl AnalysisBackend for HttpAnalysisBackend {
    async fn upload(&self, file: &UploadFile) -> Result<BackendReply<UploadReply>, BackendError> {
        debug!(file = %file.name, size = file.bytes.len(), "backend: POST /upload");
        let part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        let form = Form::new().part(UPLOAD_FIELD_NAME, part);
        let response = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        decode_reply(response).await
    }

    async fn query(
        &self,
        request: &QueryRequest,
    ) -> Result<BackendReply<QueryReply>, BackendError> {
        debug!(data_id = %request.data_id, "backend: POST /query");
        let response = self
            .http
            .post(self.endpoint("query"))
            .json(request)
            .send()
            .await?;
        decode_reply(response).await
    }

    async fn compare(
        &self,
        request: &CompareRequest,
    ) -> Result<BackendReply<QueryReply>, BackendError> {
        debug!(
            data_id_1 = %request.data_id_1,
            data_id_2 = %request.data_id_2,
            "backend: POST /compare"
        );
        let response = self
            .http
            .post(self.endpoint("compare"))
            .json(request)
            .send()
            .await?;
        decode_reply(response).await
    }
}

async fn decode_reply<T: DeserializeOwned>(
    response: Response,
) -> Result<BackendReply<T>, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    parse_reply(status, &body)
}

/// The success shape only counts on a 2xx status; everything else is read
/// as the failure shape.
pub(crate) fn parse_reply<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<BackendReply<T>, BackendError> {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(err) if status.is_success() => {
            return Err(BackendError::InvalidResponse(err.to_string()));
        }
        Err(_) => return Ok(BackendReply::Failure(ErrorReply::new(format!("HTTP {status}")))),
    };

    if status.is_success() {
        if let Ok(success) = serde_json::from_value::<T>(value.clone()) {
            return Ok(BackendReply::Success(success));
        }
    }

    let mut failure: ErrorReply = serde_json::from_value(value).unwrap_or_default();
    if failure.error.is_none() && failure.details.is_none() && !status.is_success() {
        failure.error = Some(format!("HTTP {status}"));
    }
    Ok(BackendReply::Failure(failure))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_shape_with_error_status_is_a_failure() {
        let reply = parse_reply::<QueryReply>(
            StatusCode::BAD_REQUEST,
            r#"{"question":"q","result":1,"error":"dataset expired"}"#,
        )
        .expect("reply");
        assert_eq!(
            reply,
            BackendReply::Failure(ErrorReply::new("dataset expired"))
        );
    }

    #[test]
    fn non_json_error_body_reports_status() {
        let reply = parse_reply::<UploadReply>(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>")
            .expect("reply");
        let BackendReply::Failure(failure) = reply else {
            panic!("expected failure");
        };
        assert_eq!(failure.message(), "HTTP 502 Bad Gateway");
    }

    #[test]
    fn non_json_success_body_is_invalid_response() {
        let err = parse_reply::<UploadReply>(StatusCode::OK, "ok").expect_err("invalid");
        assert!(matches!(err, BackendError::InvalidResponse(_)));
    }

    #[test]
    fn upload_success_accepts_numeric_id_and_null_summary() {
        let reply = parse_reply::<UploadReply>(
            StatusCode::OK,
            r#"{"id":1718000000000,"originalName":"q.xlsx","summary":null,"sheets":[]}"#,
        )
        .expect("reply");
        let BackendReply::Success(upload) = reply else {
            panic!("expected success: {reply:?}");
        };
        assert_eq!(upload.id.as_str(), "1718000000000");
        assert_eq!(upload.summary, "");
    }

    #[test]
    fn upload_with_blank_id_quotes_backend_error() {
        let reply = parse_reply::<UploadReply>(
            StatusCode::OK,
            r#"{"id":"","originalName":"q.xlsx","error":"Only Excel files are allowed"}"#,
        )
        .expect("reply");
        assert_eq!(
            reply,
            BackendReply::Failure(ErrorReply::new("Only Excel files are allowed"))
        );
    }

    #[test]
    fn rejects_non_http_backend_url() {
        assert!(HttpAnalysisBackend::new("ftp://example.com").is_err());
        let backend = HttpAnalysisBackend::new("http://localhost:5001/").expect("backend");
        assert_eq!(backend.endpoint("query"), "http://localhost:5001/query");
    }
}
