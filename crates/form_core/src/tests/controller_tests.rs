use super::*;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use graph_client::ReferenceFetch;
use shared::domain::ReferenceRow;
use tokio::sync::Mutex;

struct TestWorkbook {
    reference: ReferenceFetch,
    token_error: Option<FormError>,
    fetch_error: Option<FormError>,
    append_results: Mutex<Vec<bool>>,
    stall_appends: bool,
    token_calls: Mutex<u32>,
    appended: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestWorkbook {
    fn with_rows(rows: Vec<ReferenceRow>) -> Self {
        Self {
            reference: ReferenceFetch::loaded(ReferenceTable::from_reference_rows(rows)),
            token_error: None,
            fetch_error: None,
            append_results: Mutex::new(Vec::new()),
            stall_appends: false,
            token_calls: Mutex::new(0),
            appended: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn scenario() -> Self {
        Self::with_rows(vec![
            ReferenceRow::new("A", "X", "M"),
            ReferenceRow::new("B", "Y", "F"),
            ReferenceRow::new("B", "W", "F"),
        ])
    }

    fn schema_mismatch() -> Self {
        let mut workbook = Self::with_rows(Vec::new());
        workbook.reference =
            ReferenceFetch::mismatch("response for table 'Data1Table' has no `value` field");
        workbook
    }

    fn failing_token(err: FormError) -> Self {
        let mut workbook = Self::scenario();
        workbook.token_error = Some(err);
        workbook
    }

    /// Queue the outcomes of the next appends; unqueued appends succeed.
    fn with_append_results(self, results: Vec<bool>) -> Self {
        Self {
            append_results: Mutex::new(results),
            ..self
        }
    }
}

#[async_trait]
impl WorkbookGateway for TestWorkbook {
    async fn acquire_token(&self) -> Result<AccessToken, FormError> {
        *self.token_calls.lock().await += 1;
        if let Some(err) = &self.token_error {
            return Err(err.clone());
        }
        Ok(AccessToken::new("test-token", Utc::now() + Duration::hours(1)))
    }

    async fn fetch_reference(&self, _token: &AccessToken) -> Result<ReferenceFetch, FormError> {
        if let Some(err) = &self.fetch_error {
            return Err(err.clone());
        }
        Ok(self.reference.clone())
    }

    async fn append_entry(&self, _token: &AccessToken, entry: &LogEntry) -> bool {
        if self.stall_appends {
            std::future::pending::<()>().await;
        }
        let mut results = self.append_results.lock().await;
        let ok = if results.is_empty() {
            true
        } else {
            results.remove(0)
        };
        if ok {
            self.appended.lock().await.push(entry.clone());
        }
        ok
    }
}

async fn ready_controller(workbook: TestWorkbook) -> (FormController, Arc<Mutex<Vec<LogEntry>>>) {
    let appended = workbook.appended.clone();
    let mut controller = FormController::new(Arc::new(workbook));
    assert_eq!(controller.load().await, &FormPhase::Ready);
    (controller, appended)
}

#[tokio::test]
async fn load_selects_first_district_and_its_first_name() {
    let (controller, _) = ready_controller(TestWorkbook::scenario()).await;
    assert_eq!(controller.districts(), ["A", "B"]);
    assert_eq!(controller.selected_district(), Some("A"));
    assert_eq!(controller.names(), ["X"]);
    assert_eq!(controller.selected_name(), Some("X"));
    assert!(!controller.can_submit());
}

#[tokio::test]
async fn selecting_district_recomputes_sorted_names() {
    let (mut controller, _) = ready_controller(TestWorkbook::scenario()).await;
    controller.select_district("B").expect("select");
    assert_eq!(controller.names(), ["W", "Y"]);
    assert_eq!(controller.selected_name(), Some("W"));

    controller.select_name("Y").expect("name");
    assert_eq!(controller.selected_name(), Some("Y"));
}

#[tokio::test]
async fn unknown_choices_are_rejected_without_state_change() {
    let (mut controller, _) = ready_controller(TestWorkbook::scenario()).await;
    let err = controller.select_district("a").expect_err("case differs");
    assert!(matches!(err, FormError::Validation(_)));
    assert_eq!(controller.selected_district(), Some("A"));

    let err = controller.select_name("Y").expect_err("Y belongs to B");
    assert!(matches!(err, FormError::Validation(_)));
    assert_eq!(controller.selected_name(), Some("X"));
    assert_eq!(controller.phase(), &FormPhase::Ready);
}

#[tokio::test]
async fn submit_requires_non_blank_literacy_status() {
    let (mut controller, appended) = ready_controller(TestWorkbook::scenario()).await;
    controller.set_literacy_status("   ").expect("set");
    assert!(!controller.can_submit());
    let err = controller.submit().await.expect_err("blank");
    assert!(matches!(err, FormError::Validation(_)));
    assert!(appended.lock().await.is_empty());
}

#[tokio::test]
async fn successful_submit_appends_entry_and_keeps_selection() {
    let (mut controller, appended) = ready_controller(TestWorkbook::scenario()).await;
    controller.select_district("B").expect("district");
    controller.select_name("Y").expect("name");
    controller.set_literacy_status("Reads fluently").expect("status");
    assert!(controller.can_submit());

    assert!(controller.submit().await.expect("submit"));
    assert_eq!(controller.phase(), &FormPhase::Succeeded);
    assert_eq!(
        controller.notice().map(|n| n.level),
        Some(NoticeLevel::Success)
    );
    assert_eq!(
        appended.lock().await.as_slice(),
        [LogEntry::new("B", "Y", "Reads fluently")]
    );

    controller.set_literacy_status("Next").expect("next entry");
    assert_eq!(controller.phase(), &FormPhase::Ready);
    assert_eq!(controller.selected_district(), Some("B"));
    assert_eq!(controller.selected_name(), Some("Y"));
    assert!(controller.notice().is_none());
}

#[tokio::test]
async fn forbidden_append_reports_failure_and_preserves_selection() {
    let workbook = TestWorkbook::scenario().with_append_results(vec![false]);
    let (mut controller, appended) = ready_controller(workbook).await;
    controller.set_literacy_status("Cannot read").expect("status");

    assert!(!controller.submit().await.expect("submit"));
    assert!(matches!(
        controller.phase(),
        FormPhase::Failed(Failure::Submission(_))
    ));
    assert!(!controller.phase().is_halted());
    assert_eq!(controller.notice().map(|n| n.level), Some(NoticeLevel::Error));
    assert!(appended.lock().await.is_empty());

    let view = controller.view();
    assert!(view.show_dropdowns);
    assert_eq!(view.selected_district.as_deref(), Some("A"));
    assert_eq!(view.selected_name.as_deref(), Some("X"));
    assert!(view.literacy_status.is_empty());

    controller.set_literacy_status("Cannot read").expect("retry input");
    assert_eq!(controller.phase(), &FormPhase::Ready);
    assert!(controller.submit().await.expect("retry"));
    assert_eq!(appended.lock().await.len(), 1);
}

#[tokio::test]
async fn abandoned_submit_returns_session_to_ready() {
    let mut workbook = TestWorkbook::scenario();
    workbook.stall_appends = true;
    let (mut controller, appended) = ready_controller(workbook).await;
    controller.set_literacy_status("literate").expect("status");

    let outcome =
        tokio::time::timeout(std::time::Duration::from_millis(50), controller.submit()).await;
    assert!(outcome.is_err(), "append never answers");

    assert_eq!(controller.phase(), &FormPhase::Ready);
    assert_eq!(controller.selected_district(), Some("A"));
    assert_eq!(controller.literacy_status(), "literate");
    controller.set_literacy_status("again").expect("next interaction");
    assert!(appended.lock().await.is_empty());
}

#[tokio::test]
async fn resubmitting_same_triple_appends_twice() {
    let (mut controller, appended) = ready_controller(TestWorkbook::scenario()).await;
    for _ in 0..2 {
        controller.set_literacy_status("literate").expect("status");
        assert!(controller.submit().await.expect("submit"));
    }
    let appended = appended.lock().await;
    assert_eq!(appended.len(), 2);
    assert_eq!(appended[0], appended[1]);
}

#[tokio::test]
async fn literacy_is_cleared_after_outcome_so_plain_resubmit_is_rejected() {
    let (mut controller, _) = ready_controller(TestWorkbook::scenario()).await;
    controller.set_literacy_status("literate").expect("status");
    assert!(controller.submit().await.expect("submit"));

    let err = controller.submit().await.expect_err("literacy reset");
    assert!(matches!(err, FormError::Validation(_)));
    assert_eq!(controller.literacy_status(), "");
    assert_eq!(controller.phase(), &FormPhase::Ready);
}

#[tokio::test]
async fn schema_mismatch_blocks_the_form() {
    let mut controller = FormController::new(Arc::new(TestWorkbook::schema_mismatch()));
    let phase = controller.load().await.clone();
    assert!(matches!(phase, FormPhase::Failed(Failure::SchemaMismatch(_))));
    assert!(phase.is_halted());

    let view = controller.view();
    assert!(!view.show_dropdowns);
    assert!(view.districts.is_empty());
    assert!(view.notice.is_some());

    let err = controller.select_district("A").expect_err("halted");
    assert!(matches!(err, FormError::Validation(_)));
}

#[tokio::test]
async fn table_without_usable_districts_is_a_schema_mismatch() {
    let workbook = TestWorkbook::with_rows(vec![ReferenceRow {
        district: None,
        name: Some("X".into()),
        gender: None,
    }]);
    let mut controller = FormController::new(Arc::new(workbook));
    assert!(matches!(
        controller.load().await,
        FormPhase::Failed(Failure::SchemaMismatch(_))
    ));
}

#[tokio::test]
async fn authentication_failure_halts_session() {
    let workbook = TestWorkbook::failing_token(FormError::Authentication("invalid_client".into()));
    let mut controller = FormController::new(Arc::new(workbook));
    assert!(matches!(
        controller.load().await,
        FormPhase::Failed(Failure::Unrecoverable(_))
    ));

    let err = controller.set_literacy_status("x").expect_err("halted");
    assert!(matches!(err, FormError::Validation(_)));
    assert!(!controller.view().show_dropdowns);
}

#[tokio::test]
async fn transport_failure_during_load_halts_session() {
    let mut workbook = TestWorkbook::scenario();
    workbook.fetch_error = Some(FormError::Transport("connection refused".into()));
    let mut controller = FormController::new(Arc::new(workbook));
    assert!(matches!(
        controller.load().await,
        FormPhase::Failed(Failure::Unrecoverable(_))
    ));
}

#[tokio::test]
async fn load_runs_once_per_session() {
    let workbook = Arc::new(TestWorkbook::scenario());
    let mut controller = FormController::new(workbook.clone());
    controller.load().await;
    controller.load().await;
    assert_eq!(*workbook.token_calls.lock().await, 1);
}

#[tokio::test]
async fn each_submit_asks_for_a_current_token() {
    let workbook = Arc::new(TestWorkbook::scenario());
    let mut controller = FormController::new(workbook.clone());
    controller.load().await;
    controller.set_literacy_status("literate").expect("status");
    controller.submit().await.expect("submit");
    assert_eq!(*workbook.token_calls.lock().await, 2);
}

#[tokio::test]
async fn input_before_load_is_rejected() {
    let mut controller = FormController::new(Arc::new(TestWorkbook::scenario()));
    let err = controller.select_district("A").expect_err("loading");
    assert!(matches!(err, FormError::Validation(_)));
    assert_eq!(controller.phase(), &FormPhase::Loading);
}

#[test]
fn view_serializes_phase_with_tag() {
    let value = serde_json::to_value(FormPhase::Failed(Failure::Submission("x".into())))
        .expect("json");
    assert_eq!(
        value,
        serde_json::json!({ "state": "failed", "failure": { "kind": "submission", "message": "x" } })
    );
}
