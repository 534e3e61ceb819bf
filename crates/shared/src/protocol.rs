//! Wire shapes of the identity and workbook endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Cell, LogEntry};

pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

#[derive(Debug, Clone, Serialize)]
pub struct ClientCredentialsRequest<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub scope: &'a str,
}

impl<'a> ClientCredentialsRequest<'a> {
    pub fn new(client_id: &'a str, client_secret: &'a str, scope: &'a str) -> Self {
        Self {
            grant_type: "client_credentials",
            client_id,
            client_secret,
            scope,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// `GET .../tables/{name}/rows`
#[derive(Debug, Clone, Deserialize)]
pub struct TableRowsResponse {
    pub value: Option<Vec<TableRow>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub index: Option<i64>,
    pub values: Vec<Vec<Value>>,
}

/// `GET .../worksheets/{name}/usedRange`
#[derive(Debug, Clone, Deserialize)]
pub struct UsedRangeResponse {
    #[serde(default)]
    pub address: Option<String>,
    pub values: Option<Vec<Vec<Value>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorEnvelope {
    pub error: GraphErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorBody {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Body of `POST .../tables/{name}/rows/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRowsRequest {
    pub values: Vec<Vec<String>>,
}

impl From<&LogEntry> for AddRowsRequest {
    fn from(entry: &LogEntry) -> Self {
        Self {
            values: vec![entry.to_row()],
        }
    }
}

/// Render a workbook cell as text. JSON `null` is an empty cell.
pub fn cell_from_json(value: &Value) -> Cell {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
