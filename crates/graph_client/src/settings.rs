//! Addressing for the identity provider and the target workbook.

use std::fmt;

use shared::protocol::GRAPH_DEFAULT_SCOPE;
use url::Url;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Which workbook file the form reads from and appends to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkbookLocator {
    DriveItem { drive_id: String, item_id: String },
    File { file_id: String },
}

/// How the reference table is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStrategy {
    /// Rows of a named table, mapped positionally onto `District, Name, Gender`.
    NamedTable { table: String },
    /// A worksheet's used range; the first row is the header.
    UsedRange { worksheet: String },
}

#[derive(Clone)]
pub struct GraphSettings {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub scope: String,
    pub authority_host: Url,
    pub graph_base_url: Url,
    pub workbook: WorkbookLocator,
    pub read_strategy: ReadStrategy,
    pub log_worksheet: String,
    pub log_table: String,
}

impl fmt::Debug for GraphSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("scope", &self.scope)
            .field("authority_host", &self.authority_host.as_str())
            .field("graph_base_url", &self.graph_base_url.as_str())
            .field("workbook", &self.workbook)
            .field("read_strategy", &self.read_strategy)
            .field("log_worksheet", &self.log_worksheet)
            .field("log_table", &self.log_table)
            .finish()
    }
}

impl GraphSettings {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tenant_id: impl Into<String>,
        workbook: WorkbookLocator,
        read_strategy: ReadStrategy,
        log_worksheet: impl Into<String>,
        log_table: impl Into<String>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tenant_id: tenant_id.into(),
            scope: GRAPH_DEFAULT_SCOPE.to_string(),
            authority_host: parse_base_url(DEFAULT_AUTHORITY_HOST)?,
            graph_base_url: parse_base_url(DEFAULT_GRAPH_BASE_URL)?,
            workbook,
            read_strategy,
            log_worksheet: log_worksheet.into(),
            log_table: log_table.into(),
        })
    }

    pub fn with_endpoints(mut self, authority_host: &str, graph_base_url: &str) -> anyhow::Result<Self> {
        self.authority_host = parse_base_url(authority_host)?;
        self.graph_base_url = parse_base_url(graph_base_url)?;
        Ok(self)
    }

    /// `{authority}/{tenant}/oauth2/v2.0/token`
    pub fn token_url(&self) -> Url {
        join_segments(
            &self.authority_host,
            &[self.tenant_id.as_str(), "oauth2", "v2.0", "token"],
        )
    }

    pub fn workbook_url(&self) -> Url {
        match &self.workbook {
            WorkbookLocator::DriveItem { drive_id, item_id } => join_segments(
                &self.graph_base_url,
                &["drives", drive_id.as_str(), "items", item_id.as_str(), "workbook"],
            ),
            WorkbookLocator::File { file_id } => join_segments(
                &self.graph_base_url,
                &["drive", "items", file_id.as_str(), "workbook"],
            ),
        }
    }

    pub fn reference_url(&self) -> Url {
        let workbook = self.workbook_url();
        match &self.read_strategy {
            ReadStrategy::NamedTable { table } => {
                join_segments(&workbook, &["tables", table.as_str(), "rows"])
            }
            ReadStrategy::UsedRange { worksheet } => {
                join_segments(&workbook, &["worksheets", worksheet.as_str(), "usedRange"])
            }
        }
    }

    pub fn append_url(&self) -> Url {
        join_segments(
            &self.workbook_url(),
            &[
                "worksheets",
                self.log_worksheet.as_str(),
                "tables",
                self.log_table.as_str(),
                "rows",
                "add",
            ],
        )
    }
}

pub fn parse_base_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|err| anyhow::anyhow!("invalid endpoint url '{raw}': {err}"))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("endpoint url '{raw}' cannot carry a path");
    }
    Ok(url)
}

fn join_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(workbook: WorkbookLocator, read_strategy: ReadStrategy) -> GraphSettings {
        GraphSettings::new("cid", "s3cr3t-value", "tenant-1", workbook, read_strategy, "data2", "Table1")
            .expect("settings")
    }

    #[test]
    fn drive_item_locator_builds_named_table_and_append_urls() {
        let settings = settings(
            WorkbookLocator::DriveItem {
                drive_id: "d1".into(),
                item_id: "i1".into(),
            },
            ReadStrategy::NamedTable {
                table: "Data1Table".into(),
            },
        );
        assert_eq!(
            settings.reference_url().as_str(),
            "https://graph.microsoft.com/v1.0/drives/d1/items/i1/workbook/tables/Data1Table/rows"
        );
        assert_eq!(
            settings.append_url().as_str(),
            "https://graph.microsoft.com/v1.0/drives/d1/items/i1/workbook/worksheets/data2/tables/Table1/rows/add"
        );
        assert_eq!(
            settings.token_url().as_str(),
            "https://login.microsoftonline.com/tenant-1/oauth2/v2.0/token"
        );
    }

    #[test]
    fn file_locator_builds_used_range_url() {
        let settings = settings(
            WorkbookLocator::File {
                file_id: "f9".into(),
            },
            ReadStrategy::UsedRange {
                worksheet: "data1".into(),
            },
        );
        assert_eq!(
            settings.reference_url().as_str(),
            "https://graph.microsoft.com/v1.0/drive/items/f9/workbook/worksheets/data1/usedRange"
        );
    }

    #[test]
    fn trailing_slash_on_base_does_not_double_up() {
        let settings = settings(
            WorkbookLocator::File {
                file_id: "f9".into(),
            },
            ReadStrategy::NamedTable { table: "T".into() },
        )
        .with_endpoints("http://127.0.0.1:9/", "http://127.0.0.1:9/v1.0/")
        .expect("endpoints");
        assert_eq!(
            settings.workbook_url().as_str(),
            "http://127.0.0.1:9/v1.0/drive/items/f9/workbook"
        );
        assert_eq!(
            settings.token_url().as_str(),
            "http://127.0.0.1:9/tenant-1/oauth2/v2.0/token"
        );
    }

    #[test]
    fn debug_output_hides_client_secret() {
        let settings = settings(
            WorkbookLocator::File {
                file_id: "f".into(),
            },
            ReadStrategy::NamedTable { table: "T".into() },
        );
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("s3cr3t-value"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn rejects_non_base_endpoint() {
        assert!(parse_base_url("mailto:ops@example.com").is_err());
        assert!(parse_base_url("not a url").is_err());
    }
}
