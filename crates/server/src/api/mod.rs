use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Redirect},
    routing::{get, post},
    Form, Json, Router,
};
use form_core::{FormController, FormPhase, FormView, Notice};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use shared::error::{ApiError, ErrorCode, FormError};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::debug;

use crate::app_state::AppState;

const FORM_TEMPLATE: &str = "form";
const MAX_FORM_BYTES: usize = 16 * 1024;

type Rejection = (StatusCode, Json<ApiError>);

#[derive(Debug, Deserialize)]
struct SelectRequest {
    district: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    literacy_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    district: String,
    // An empty name dropdown is left out of the post entirely.
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    literacy_status: String,
}

#[derive(Debug, Serialize)]
struct OptionItem<'a> {
    value: &'a str,
    selected: bool,
}

#[derive(Debug, Serialize)]
struct PageModel<'a> {
    loading: bool,
    show_dropdowns: bool,
    districts: Vec<OptionItem<'a>>,
    names: Vec<OptionItem<'a>>,
    literacy_status: &'a str,
    can_submit: bool,
    notice: Option<&'a Notice>,
}

impl<'a> PageModel<'a> {
    fn from_view(view: &'a FormView) -> Self {
        Self {
            loading: view.phase == FormPhase::Loading,
            show_dropdowns: view.show_dropdowns,
            districts: options(&view.districts, view.selected_district.as_deref()),
            names: options(&view.names, view.selected_name.as_deref()),
            literacy_status: &view.literacy_status,
            can_submit: view.can_submit,
            notice: view.notice.as_ref(),
        }
    }
}

fn options<'a>(values: &'a [String], selected: Option<&str>) -> Vec<OptionItem<'a>> {
    values
        .iter()
        .map(|value| OptionItem {
            value,
            selected: Some(value.as_str()) == selected,
        })
        .collect()
}

pub(crate) fn page_registry() -> anyhow::Result<Handlebars<'static>> {
    let mut pages = Handlebars::new();
    pages.register_template_string(FORM_TEMPLATE, include_str!("../templates/form.hbs"))?;
    Ok(pages)
}

pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(form_page))
        .route("/healthz", get(healthz))
        .route("/state", get(form_state))
        .route("/select", post(select))
        .route("/submit", post(submit))
        .layer(RequestBodyLimitLayer::new(MAX_FORM_BYTES))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn form_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, Rejection> {
    let view = {
        let mut controller = state.controller.lock().await;
        controller.load().await;
        controller.view()
    };
    state
        .pages
        .render(FORM_TEMPLATE, &PageModel::from_view(&view))
        .map(Html)
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new(ErrorCode::Internal, e.to_string())),
            )
        })
}

async fn form_state(State(state): State<Arc<AppState>>) -> Json<FormView> {
    let mut controller = state.controller.lock().await;
    controller.load().await;
    Json(controller.view())
}

async fn select(
    State(state): State<Arc<AppState>>,
    Form(req): Form<SelectRequest>,
) -> Result<Redirect, Rejection> {
    let mut controller = state.controller.lock().await;
    controller.load().await;

    controller
        .select_district(&req.district)
        .map_err(|e| rejection(&controller, e))?;
    // A district change posts the previous name along; keep it only if it
    // still belongs to the new district.
    if let Some(name) = req.name.as_deref() {
        if controller.names().iter().any(|n| n == name) {
            controller
                .select_name(name)
                .map_err(|e| rejection(&controller, e))?;
        }
    }
    if let Some(literacy_status) = req.literacy_status.as_deref() {
        controller
            .set_literacy_status(literacy_status)
            .map_err(|e| rejection(&controller, e))?;
    }
    debug!(district = %req.district, "selection updated");
    Ok(Redirect::to("/"))
}

async fn submit(
    State(state): State<Arc<AppState>>,
    Form(req): Form<SubmitRequest>,
) -> Result<Redirect, Rejection> {
    let mut controller = state.controller.lock().await;
    controller.load().await;

    controller
        .select_district(&req.district)
        .map_err(|e| rejection(&controller, e))?;
    controller
        .select_name(req.name.as_deref().unwrap_or_default())
        .map_err(|e| rejection(&controller, e))?;
    controller
        .set_literacy_status(&req.literacy_status)
        .map_err(|e| rejection(&controller, e))?;
    // The outcome is rendered from the controller's notice.
    controller
        .submit()
        .await
        .map_err(|e| rejection(&controller, e))?;
    Ok(Redirect::to("/"))
}

fn rejection(controller: &FormController, err: FormError) -> Rejection {
    if controller.phase().is_halted() {
        (
            StatusCode::CONFLICT,
            Json(ApiError::new(ErrorCode::Conflict, err.to_string())),
        )
    } else {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(ApiError::from(err)))
    }
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
