//! Session state machine behind the entry form.

use std::sync::Arc;

use graph_client::{AccessToken, WorkbookGateway};
use serde::Serialize;
use shared::{
    domain::{LogEntry, ReferenceTable},
    error::FormError,
};
use tracing::{debug, error, info, warn};

use crate::selection;

pub const SUBMIT_SUCCESS_MESSAGE: &str = "Entry successfully submitted to the workbook.";
pub const SUBMIT_FAILURE_MESSAGE: &str =
    "Submission failed. Check table permissions or formatting, then submit again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Failure {
    /// Credentials or transport broke while loading; the session is over.
    Unrecoverable(String),
    /// Reference data is unusable; there is nothing to select from.
    SchemaMismatch(String),
    /// The last append did not go through; the operator may submit again.
    Submission(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "failure", rename_all = "snake_case")]
pub enum FormPhase {
    Loading,
    Ready,
    Submitting,
    Succeeded,
    Failed(Failure),
}

impl FormPhase {
    /// Halted sessions accept no further input.
    pub fn is_halted(&self) -> bool {
        matches!(
            self,
            FormPhase::Failed(Failure::Unrecoverable(_) | Failure::SchemaMismatch(_))
        )
    }

    fn is_submission_outcome(&self) -> bool {
        matches!(
            self,
            FormPhase::Succeeded | FormPhase::Failed(Failure::Submission(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Everything a page needs to render the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub phase: FormPhase,
    pub districts: Vec<String>,
    pub names: Vec<String>,
    pub selected_district: Option<String>,
    pub selected_name: Option<String>,
    pub literacy_status: String,
    pub can_submit: bool,
    pub show_dropdowns: bool,
    pub notice: Option<Notice>,
}

pub struct FormController {
    gateway: Arc<dyn WorkbookGateway>,
    phase: FormPhase,
    reference: ReferenceTable,
    districts: Vec<String>,
    names: Vec<String>,
    selected_district: Option<String>,
    selected_name: Option<String>,
    literacy_status: String,
    notice: Option<Notice>,
}

impl FormController {
    pub fn new(gateway: Arc<dyn WorkbookGateway>) -> Self {
        Self {
            gateway,
            phase: FormPhase::Loading,
            reference: ReferenceTable::empty(),
            districts: Vec::new(),
            names: Vec::new(),
            selected_district: None,
            selected_name: None,
            literacy_status: String::new(),
            notice: None,
        }
    }

    pub fn phase(&self) -> &FormPhase {
        &self.phase
    }

    pub fn districts(&self) -> &[String] {
        &self.districts
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn selected_district(&self) -> Option<&str> {
        self.selected_district.as_deref()
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.selected_name.as_deref()
    }

    pub fn literacy_status(&self) -> &str {
        &self.literacy_status
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Fetch the reference table for this session. Only acts while `Loading`.
    pub async fn load(&mut self) -> &FormPhase {
        if self.phase != FormPhase::Loading {
            return &self.phase;
        }

        let token = match self.gateway.acquire_token().await {
            Ok(token) => token,
            Err(err) => {
                self.halt_unrecoverable(err);
                return &self.phase;
            }
        };

        let fetch = match self.gateway.fetch_reference(&token).await {
            Ok(fetch) => fetch,
            Err(err) => {
                self.halt_unrecoverable(err);
                return &self.phase;
            }
        };

        if let Some(diagnostic) = fetch.diagnostic {
            self.halt_schema_mismatch(diagnostic.to_string());
            return &self.phase;
        }

        let districts = selection::districts(&fetch.table);
        if districts.is_empty() {
            self.halt_schema_mismatch(
                FormError::SchemaMismatch("reference table has no selectable districts".into())
                    .to_string(),
            );
            return &self.phase;
        }

        self.reference = fetch.table;
        self.districts = districts;
        let first = self.districts[0].clone();
        self.apply_district(first);
        info!(
            districts = self.districts.len(),
            rows = self.reference.len(),
            "form ready"
        );
        self.transition(FormPhase::Ready);
        &self.phase
    }

    pub fn select_district(&mut self, district: &str) -> Result<(), FormError> {
        self.begin_interaction()?;
        if !self.districts.iter().any(|d| d == district) {
            return Err(FormError::Validation(format!(
                "unknown district '{district}'"
            )));
        }
        self.apply_district(district.to_string());
        Ok(())
    }

    pub fn select_name(&mut self, name: &str) -> Result<(), FormError> {
        self.begin_interaction()?;
        if !self.names.iter().any(|n| n == name) {
            return Err(FormError::Validation(format!(
                "'{name}' is not listed for the selected district"
            )));
        }
        self.selected_name = Some(name.to_string());
        Ok(())
    }

    pub fn set_literacy_status(&mut self, value: &str) -> Result<(), FormError> {
        self.begin_interaction()?;
        self.literacy_status = value.to_string();
        Ok(())
    }

    pub fn can_submit(&self) -> bool {
        self.phase == FormPhase::Ready
            && self.selected_district.as_deref().is_some_and(|d| !d.is_empty())
            && self.selected_name.as_deref().is_some_and(|n| !n.is_empty())
            && !self.literacy_status.trim().is_empty()
    }

    /// Append the current selection to the log table. Returns whether the
    /// row was created.
    pub async fn submit(&mut self) -> Result<bool, FormError> {
        self.begin_interaction()?;
        if !self.can_submit() {
            return Err(FormError::Validation(
                "district, name and literacy status are all required".into(),
            ));
        }

        let entry = LogEntry::new(
            self.selected_district.clone().unwrap_or_default(),
            self.selected_name.clone().unwrap_or_default(),
            self.literacy_status.clone(),
        );
        self.transition(FormPhase::Submitting);
        let gateway = self.gateway.clone();
        let mut in_flight = InFlight { controller: self };

        let token: AccessToken = match gateway.acquire_token().await {
            Ok(token) => token,
            Err(err) => {
                in_flight.controller.halt_unrecoverable(err);
                return Ok(false);
            }
        };

        let created = gateway.append_entry(&token, &entry).await;
        Ok(in_flight.controller.finish_submission(created))
    }

    fn finish_submission(&mut self, created: bool) -> bool {
        if created {
            self.notice = Some(Notice {
                level: NoticeLevel::Success,
                message: SUBMIT_SUCCESS_MESSAGE.to_string(),
            });
            self.transition(FormPhase::Succeeded);
        } else {
            self.notice = Some(Notice {
                level: NoticeLevel::Error,
                message: SUBMIT_FAILURE_MESSAGE.to_string(),
            });
            self.transition(FormPhase::Failed(Failure::Submission(
                SUBMIT_FAILURE_MESSAGE.to_string(),
            )));
        }
        created
    }

    pub fn view(&self) -> FormView {
        // The literacy field is reset on the next interaction, so a finished
        // submission already renders it empty.
        let settled = self.phase.is_submission_outcome();
        FormView {
            phase: self.phase.clone(),
            districts: self.districts.clone(),
            names: self.names.clone(),
            selected_district: self.selected_district.clone(),
            selected_name: self.selected_name.clone(),
            literacy_status: if settled {
                String::new()
            } else {
                self.literacy_status.clone()
            },
            can_submit: self.can_submit(),
            show_dropdowns: !matches!(self.phase, FormPhase::Loading) && !self.phase.is_halted(),
            notice: self.notice.clone(),
        }
    }

    /// Leave a finished submission behind before handling new input. Keeps
    /// district and name, clears the literacy text and the notice.
    fn begin_interaction(&mut self) -> Result<(), FormError> {
        if self.phase.is_submission_outcome() {
            self.literacy_status.clear();
            self.notice = None;
            self.transition(FormPhase::Ready);
        }
        match &self.phase {
            FormPhase::Ready => Ok(()),
            FormPhase::Loading => Err(FormError::Validation(
                "reference data is still loading".into(),
            )),
            FormPhase::Submitting => Err(FormError::Validation(
                "a submission is already in flight".into(),
            )),
            _ => Err(FormError::Validation("session halted".into())),
        }
    }

    fn apply_district(&mut self, district: String) {
        self.names = selection::names(&self.reference, &district);
        let keep = self
            .selected_name
            .as_ref()
            .is_some_and(|name| self.names.contains(name));
        if !keep {
            self.selected_name = self.names.first().cloned();
        }
        self.selected_district = Some(district);
    }

    fn halt_unrecoverable(&mut self, err: FormError) {
        error!(error = %err, "session halted");
        self.notice = Some(Notice {
            level: NoticeLevel::Error,
            message: err.to_string(),
        });
        self.transition(FormPhase::Failed(Failure::Unrecoverable(err.to_string())));
    }

    fn halt_schema_mismatch(&mut self, diagnostic: String) {
        warn!(%diagnostic, "reference data unusable; form blocked");
        self.reference = ReferenceTable::empty();
        self.districts.clear();
        self.names.clear();
        self.selected_district = None;
        self.selected_name = None;
        self.notice = Some(Notice {
            level: NoticeLevel::Error,
            message: diagnostic.clone(),
        });
        self.transition(FormPhase::Failed(Failure::SchemaMismatch(diagnostic)));
    }

    fn transition(&mut self, next: FormPhase) {
        debug!(from = ?self.phase, to = ?next, "form transition");
        self.phase = next;
    }
}

/// Held across the workbook calls of a submission. If the submit future is
/// dropped before an outcome is recorded, the session goes back to `Ready`
/// with its fields intact.
struct InFlight<'a> {
    controller: &'a mut FormController,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.controller.phase == FormPhase::Submitting {
            warn!("submission abandoned before the workbook answered");
            self.controller.transition(FormPhase::Ready);
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
