use std::sync::Arc;

use reqwest::Client;
use shared::{
    domain::{Cell, ReferenceTable, DISTRICT_COLUMN, NAME_COLUMN, REFERENCE_COLUMNS},
    error::FormError,
    protocol::{cell_from_json, GraphErrorEnvelope, TableRowsResponse, UsedRangeResponse},
};
use tracing::{info, warn};

use crate::{
    settings::{GraphSettings, ReadStrategy},
    token::AccessToken,
};

/// Result of a reference read. A schema problem leaves `table` empty and
/// explains itself in `diagnostic` instead of failing the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceFetch {
    pub table: ReferenceTable,
    pub diagnostic: Option<FormError>,
}

impl ReferenceFetch {
    pub fn loaded(table: ReferenceTable) -> Self {
        Self {
            table,
            diagnostic: None,
        }
    }

    pub fn mismatch(message: impl Into<String>) -> Self {
        Self {
            table: ReferenceTable::empty(),
            diagnostic: Some(FormError::SchemaMismatch(message.into())),
        }
    }
}

pub struct ReferenceReader {
    http: Client,
    settings: Arc<GraphSettings>,
}

impl ReferenceReader {
    pub fn new(http: Client, settings: Arc<GraphSettings>) -> Self {
        Self { http, settings }
    }

    pub async fn fetch(&self, token: &AccessToken) -> Result<ReferenceFetch, FormError> {
        let response = self
            .http
            .get(self.settings.reference_url())
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|err| FormError::Transport(format!("reference read failed: {err}")))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| FormError::Transport(format!("reference read interrupted: {err}")))?;

        let fetch = match &self.settings.read_strategy {
            ReadStrategy::NamedTable { table } => parse_table_rows(table, &body),
            ReadStrategy::UsedRange { worksheet } => parse_used_range(worksheet, &body),
        };

        match &fetch.diagnostic {
            Some(diagnostic) => warn!(%status, %diagnostic, "reference data unusable"),
            None => info!(
                rows = fetch.table.len(),
                strategy = ?self.settings.read_strategy,
                "loaded reference table"
            ),
        }
        Ok(fetch)
    }
}

/// Rows of a named table. Each row's first value array is mapped onto
/// `District, Name, Gender` by position.
pub fn parse_table_rows(table_name: &str, body: &[u8]) -> ReferenceFetch {
    let source = format!("table '{table_name}'");
    let rows = match serde_json::from_slice::<TableRowsResponse>(body) {
        Ok(TableRowsResponse { value: Some(rows) }) => rows,
        Ok(_) => return missing_field(&source, "value", body),
        Err(err) => return ReferenceFetch::mismatch(format!("unreadable rows of {source}: {err}")),
    };

    let rows = rows
        .iter()
        .map(|row| {
            row.values
                .first()
                .map(|cells| cells.iter().map(cell_from_json).collect::<Vec<Cell>>())
                .unwrap_or_default()
        })
        .collect();

    ReferenceFetch::loaded(ReferenceTable::new(
        REFERENCE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
    ))
}

/// A worksheet's used range: header row first, then data rows.
pub fn parse_used_range(worksheet: &str, body: &[u8]) -> ReferenceFetch {
    let source = format!("worksheet '{worksheet}'");
    let matrix = match serde_json::from_slice::<UsedRangeResponse>(body) {
        Ok(UsedRangeResponse {
            values: Some(matrix),
            ..
        }) => matrix,
        Ok(_) => return missing_field(&source, "values", body),
        Err(err) => {
            return ReferenceFetch::mismatch(format!("unreadable used range of {source}: {err}"))
        }
    };

    let mut matrix = matrix.into_iter();
    let Some(header) = matrix.next() else {
        return ReferenceFetch::mismatch(format!("used range of {source} has no header row"));
    };
    let columns: Vec<String> = header
        .iter()
        .map(|cell| cell_from_json(cell).unwrap_or_default())
        .collect();

    for required in [DISTRICT_COLUMN, NAME_COLUMN] {
        if !columns.iter().any(|c| c == required) {
            return ReferenceFetch::mismatch(format!(
                "header of {source} has no '{required}' column"
            ));
        }
    }

    let rows = matrix
        .map(|row| row.iter().map(cell_from_json).collect())
        .collect();
    ReferenceFetch::loaded(ReferenceTable::new(columns, rows))
}

fn missing_field(source: &str, field: &str, body: &[u8]) -> ReferenceFetch {
    let detail = serde_json::from_slice::<GraphErrorEnvelope>(body)
        .map(|envelope| format!(" (graph error {}: {})", envelope.error.code, envelope.error.message))
        .unwrap_or_default();
    ReferenceFetch::mismatch(format!(
        "response for {source} has no `{field}` field{detail}"
    ))
}
