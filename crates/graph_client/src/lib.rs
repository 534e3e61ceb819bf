use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{domain::LogEntry, error::FormError};

pub mod reader;
pub mod settings;
pub mod token;
pub mod writer;

pub use reader::{ReferenceFetch, ReferenceReader};
pub use settings::{GraphSettings, ReadStrategy, WorkbookLocator};
pub use token::{AccessToken, TokenProvider};
pub use writer::AppendWriter;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the form needs from the remote workbook.
#[async_trait]
pub trait WorkbookGateway: Send + Sync {
    /// A bearer token valid for the next call, refreshed when the cached one
    /// has reached its refresh point.
    async fn acquire_token(&self) -> Result<AccessToken, FormError>;
    async fn fetch_reference(&self, token: &AccessToken) -> Result<ReferenceFetch, FormError>;
    async fn append_entry(&self, token: &AccessToken, entry: &LogEntry) -> bool;
}

/// Graph-backed workbook built from one set of settings.
pub struct GraphWorkbook {
    settings: Arc<GraphSettings>,
    tokens: TokenProvider,
    reader: ReferenceReader,
    writer: AppendWriter,
}

impl GraphWorkbook {
    pub fn new(settings: GraphSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build workbook http client")?;
        Ok(Self::with_client(http, settings))
    }

    pub fn with_client(http: Client, settings: GraphSettings) -> Self {
        let settings = Arc::new(settings);
        Self {
            tokens: TokenProvider::new(http.clone(), settings.clone()),
            reader: ReferenceReader::new(http.clone(), settings.clone()),
            writer: AppendWriter::new(http, settings.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }
}

#[async_trait]
impl WorkbookGateway for GraphWorkbook {
    async fn acquire_token(&self) -> Result<AccessToken, FormError> {
        self.tokens.acquire().await
    }

    async fn fetch_reference(&self, token: &AccessToken) -> Result<ReferenceFetch, FormError> {
        self.reader.fetch(token).await
    }

    async fn append_entry(&self, token: &AccessToken, entry: &LogEntry) -> bool {
        self.writer.append(token, entry).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
