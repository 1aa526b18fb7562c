use askama::Template;
use axum::extract::State;
use axum::response::Html;
use axum::Form;

use crate::error::{AppError, AppResult, RenderHtml};
use crate::models::{Prediction, PredictForm};
use crate::state::AppState;
use crate::VERSION;

#[derive(Template)]
#[template(path = "pages/predict.html")]
pub struct PredictTemplate {
    pub title: String,
    pub version: &'static str,
    pub xsrf_token: String,
    pub description: String,
    pub amount: String,
    pub prediction: Option<Prediction>,
    pub error: Option<String>,
}

impl PredictTemplate {
    fn new(state: &AppState) -> Self {
        Self {
            title: "Check a Transaction".into(),
            version: VERSION,
            xsrf_token: state.xsrf_value(),
            description: String::new(),
            amount: String::new(),
            prediction: None,
            error: None,
        }
    }
}

pub async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    PredictTemplate::new(&state).render_html()
}

pub async fn submit(
    State(state): State<AppState>,
    Form(form): Form<PredictForm>,
) -> AppResult<Html<String>> {
    let mut template = PredictTemplate::new(&state);
    template.description = form.description.clone();
    template.amount = form.amount.clone();

    let result = match form.parse() {
        Ok((description, amount)) => state.dashboard.predict(description, amount).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(prediction) => template.prediction = Some(prediction),
        Err(e @ (AppError::Validation(_) | AppError::Upstream { .. })) => {
            template.error = Some(e.user_message())
        }
        Err(e) => return Err(e),
    }

    template.render_html()
}
