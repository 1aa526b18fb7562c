use std::sync::Arc;

use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::services::dashboard::DashboardController;
use crate::services::insights_client::InsightsClient;
use crate::xsrf::XsrfToken;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub xsrf_token: XsrfToken,
    pub dashboard: DashboardController,
}

impl AppState {
    /// Wire the transactions client and a fresh dashboard to `db`.
    pub fn new(config: Config, db: DbPool) -> AppResult<Self> {
        let client = InsightsClient::new(&config.api_base_url, config.request_timeout, db.clone())?;
        let dashboard = DashboardController::new(client, config.page_size);

        Ok(Self {
            db,
            config: Arc::new(config),
            xsrf_token: XsrfToken::generate(),
            dashboard,
        })
    }

    pub fn xsrf_value(&self) -> String {
        self.xsrf_token.value().to_string()
    }
}
