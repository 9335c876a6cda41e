use chrono::{DateTime, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    domain::{AnalysisResult, DataId, ProcessedFile, SheetData},
    error::ErrorReply,
};

/// Multipart field name the backend reads the spreadsheet from.
pub const UPLOAD_FIELD_NAME: &str = "excelFile";

/// Outcome of a backend call that reached the server and produced a body.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendReply<T> {
    Success(T),
    Failure(ErrorReply),
}

impl<T> BackendReply<T> {
    pub fn into_result(self) -> Result<T, ErrorReply> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReply {
    #[serde(deserialize_with = "opaque_file_id")]
    pub id: DataId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sheets: Vec<SheetData>,
}

/// The backend id is opaque: strings and numbers are both accepted, an empty
/// or missing one makes the body a failure reply.
fn opaque_file_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DataId, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(id) if !id.trim().is_empty() => Ok(DataId(id)),
        Value::Number(id) => Ok(DataId(id.to_string())),
        other => Err(D::Error::custom(format!("unusable file id: {other}"))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl UploadReply {
    pub fn into_processed_file(self, created_at: DateTime<Utc>) -> ProcessedFile {
        ProcessedFile {
            id: self.id,
            original_name: self.original_name,
            summary: self.summary,
            sheets: self.sheets,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub question: String,
    pub data_id: DataId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareRequest {
    pub question: String,
    #[serde(rename = "dataId1")]
    pub data_id_1: DataId,
    #[serde(rename = "dataId2")]
    pub data_id_2: DataId,
}

/// Success body shared by `/query` and `/compare`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryReply {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_code: Option<String>,
}

impl QueryReply {
    pub fn analysis_result(&self) -> AnalysisResult {
        AnalysisResult {
            generated_code: self.generated_code.clone(),
            execution_result: self.result.clone(),
        }
    }
}
