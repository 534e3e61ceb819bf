use std::sync::Arc;

use reqwest::{Client, StatusCode};
use shared::{
    domain::LogEntry,
    error::FormError,
    protocol::{AddRowsRequest, GraphErrorEnvelope},
};
use tracing::{info, warn};

use crate::{settings::GraphSettings, token::AccessToken};

/// Appends submissions to the log table. Every call adds a row; identical
/// entries are not merged.
pub struct AppendWriter {
    http: Client,
    settings: Arc<GraphSettings>,
}

impl AppendWriter {
    pub fn new(http: Client, settings: Arc<GraphSettings>) -> Self {
        Self { http, settings }
    }

    /// `true` only when the workbook answers `201 Created`.
    pub async fn append(&self, token: &AccessToken, entry: &LogEntry) -> bool {
        match self.try_append(token, entry).await {
            Ok(()) => {
                info!(
                    worksheet = %self.settings.log_worksheet,
                    table = %self.settings.log_table,
                    district = %entry.district,
                    "appended log entry"
                );
                true
            }
            Err(err) => {
                warn!(error = %err, table = %self.settings.log_table, "log append failed");
                false
            }
        }
    }

    async fn try_append(&self, token: &AccessToken, entry: &LogEntry) -> Result<(), FormError> {
        let response = self
            .http
            .post(self.settings.append_url())
            .bearer_auth(token.secret())
            .json(&AddRowsRequest::from(entry))
            .send()
            .await
            .map_err(|err| FormError::Submission(format!("log table unreachable: {err}")))?;

        let status = response.status();
        if status == StatusCode::CREATED {
            return Ok(());
        }

        let detail = response
            .json::<GraphErrorEnvelope>()
            .await
            .map(|envelope| format!(": {} {}", envelope.error.code, envelope.error.message))
            .unwrap_or_default();
        Err(FormError::Submission(format!(
            "log table answered {status}{detail}"
        )))
    }
}
