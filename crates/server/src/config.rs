use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use graph_client::{
    settings::{DEFAULT_AUTHORITY_HOST, DEFAULT_GRAPH_BASE_URL},
    GraphSettings, ReadStrategy, WorkbookLocator,
};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "literacy_entry.toml";

const DEFAULT_BIND: &str = "127.0.0.1:8501";
const DEFAULT_REFERENCE_TABLE: &str = "Data1Table";
const DEFAULT_LOG_WORKSHEET: &str = "data2";
const DEFAULT_LOG_TABLE: &str = "Table1";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GraphSection {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
    pub drive_id: Option<String>,
    pub item_id: Option<String>,
    pub file_id: Option<String>,
    pub read_strategy: Option<String>,
    pub reference_table: Option<String>,
    pub reference_worksheet: Option<String>,
    pub log_worksheet: Option<String>,
    pub log_table: Option<String>,
    pub authority_host: Option<String>,
    pub graph_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ServerSection {
    bind_addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    server: ServerSection,
    graph: GraphSection,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub graph: GraphSection,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: DEFAULT_BIND.into(),
            graph: GraphSection::default(),
        }
    }
}

/// Defaults, then the TOML file, then `APP__*` environment overrides.
///
/// A missing default config file is fine; a missing explicit one is not.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, explicit) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?,
        Err(err) if explicit => {
            return Err(err).with_context(|| {
                format!("failed to read config file '{}'", path.display())
            });
        }
        Err(_) => {}
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileConfig = toml::from_str(raw)?;
    if let Some(v) = file_cfg.server.bind_addr {
        settings.server_bind = v;
    }
    settings.graph = file_cfg.graph;
    Ok(())
}

pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    let graph = &mut settings.graph;
    for (key, slot) in [
        ("APP__GRAPH__CLIENT_ID", &mut graph.client_id),
        ("APP__GRAPH__CLIENT_SECRET", &mut graph.client_secret),
        ("APP__GRAPH__TENANT_ID", &mut graph.tenant_id),
        ("APP__GRAPH__DRIVE_ID", &mut graph.drive_id),
        ("APP__GRAPH__ITEM_ID", &mut graph.item_id),
        ("APP__GRAPH__FILE_ID", &mut graph.file_id),
    ] {
        if let Some(v) = lookup(key) {
            *slot = Some(v);
        }
    }
}

impl Settings {
    /// Presence checks only. Every missing key is reported at once.
    pub fn graph_settings(&self) -> anyhow::Result<GraphSettings> {
        let graph = &self.graph;
        let mut missing = Vec::new();

        let client_id = required(&graph.client_id, "graph.client_id", &mut missing);
        let client_secret = required(&graph.client_secret, "graph.client_secret", &mut missing);
        let tenant_id = required(&graph.tenant_id, "graph.tenant_id", &mut missing);

        let workbook = match (
            present(&graph.drive_id),
            present(&graph.item_id),
            present(&graph.file_id),
        ) {
            (Some(drive_id), Some(item_id), _) => Some(WorkbookLocator::DriveItem {
                drive_id: drive_id.to_string(),
                item_id: item_id.to_string(),
            }),
            (_, _, Some(file_id)) => Some(WorkbookLocator::File {
                file_id: file_id.to_string(),
            }),
            _ => {
                missing.push("graph.drive_id + graph.item_id, or graph.file_id");
                None
            }
        };

        let read_strategy = match present(&graph.read_strategy).unwrap_or("table") {
            "table" => Some(ReadStrategy::NamedTable {
                table: present(&graph.reference_table)
                    .unwrap_or(DEFAULT_REFERENCE_TABLE)
                    .to_string(),
            }),
            "used_range" => present(&graph.reference_worksheet)
                .map(|worksheet| ReadStrategy::UsedRange {
                    worksheet: worksheet.to_string(),
                })
                .or_else(|| {
                    missing.push("graph.reference_worksheet");
                    None
                }),
            other => bail!("graph.read_strategy must be 'table' or 'used_range', got '{other}'"),
        };

        let (Some(workbook), Some(read_strategy), true) =
            (workbook, read_strategy, missing.is_empty())
        else {
            bail!("missing required settings: {}", missing.join(", "));
        };

        GraphSettings::new(
            client_id,
            client_secret,
            tenant_id,
            workbook,
            read_strategy,
            present(&graph.log_worksheet).unwrap_or(DEFAULT_LOG_WORKSHEET),
            present(&graph.log_table).unwrap_or(DEFAULT_LOG_TABLE),
        )?
        .with_endpoints(
            present(&graph.authority_host).unwrap_or(DEFAULT_AUTHORITY_HOST),
            present(&graph.graph_base_url).unwrap_or(DEFAULT_GRAPH_BASE_URL),
        )
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required(value: &Option<String>, key: &'static str, missing: &mut Vec<&'static str>) -> String {
    match present(value) {
        Some(v) => v.to_string(),
        None => {
            missing.push(key);
            String::new()
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
