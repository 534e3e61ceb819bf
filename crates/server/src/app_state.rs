use std::sync::Arc;

use form_core::FormController;
use handlebars::Handlebars;
use tokio::sync::Mutex;

use crate::api::page_registry;

/// One operator session: the controller is locked for the whole of each
/// request, so at most one workbook call is in flight.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) controller: Arc<Mutex<FormController>>,
    pub(crate) pages: Arc<Handlebars<'static>>,
}

impl AppState {
    pub(crate) fn new(controller: FormController) -> anyhow::Result<Self> {
        Ok(Self {
            controller: Arc::new(Mutex::new(controller)),
            pages: Arc::new(page_registry()?),
        })
    }
}
