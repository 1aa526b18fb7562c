//! Shared test utilities for integration tests.
//!
//! `TestClient` drives the full application router (XSRF and error page
//! middleware included) against an in-memory request log and a stub
//! transactions service bound to an OS-assigned local port. The stub keeps
//! just enough behavior to exercise the dashboard: filtering, paging,
//! duplicate upload detection, forecasts and single predictions.

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::{Multipart, Query, State};
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use spendscope::config::Config;
use spendscope::db::create_in_memory_pool;
use spendscope::models::Transaction;
use spendscope::server::{build_app_with_pool, serve};
use spendscope::state::AppState;
use spendscope::xsrf::XSRF_HEADER;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

// =============================================================================
// Stub transactions service
// =============================================================================

/// Everything the stub has seen and holds.
#[derive(Default)]
pub struct StubData {
    pub transactions: Vec<Transaction>,
    pub uploaded_files: Vec<Vec<u8>>,
    pub list_queries: Vec<HashMap<String, String>>,
    pub export_queries: Vec<HashMap<String, String>>,
    pub forecast_inputs: Vec<BTreeMap<String, f64>>,
    /// When set, `GET /transactions` answers 500.
    pub fail_listing: bool,
}

#[derive(Clone, Default)]
pub struct StubService {
    pub data: Arc<Mutex<StubData>>,
}

impl StubService {
    pub fn data(&self) -> std::sync::MutexGuard<'_, StubData> {
        self.data.lock().unwrap()
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/", get(stub_root))
            .route("/transactions", get(stub_list))
            .route("/transactions/", get(stub_list))
            .route("/transactions/upload", post(stub_upload))
            .route("/transactions/filters", get(stub_filters))
            .route("/transactions/export", get(stub_export))
            .route("/forecast/monthly", post(stub_forecast))
            .route("/predict/category", post(stub_predict_category))
            .route("/predict/anomaly", post(stub_predict_anomaly))
            .with_state(self.clone())
    }

    async fn start(&self) -> u16 {
        let (port, _handle) = serve(self.router(), "127.0.0.1", 0)
            .await
            .expect("Failed to start stub service");
        port
    }
}

/// 45 transactions from January to March 2024 across three categories and
/// two accounts. Every tenth one is an anomaly.
pub fn sample_transactions() -> Vec<Transaction> {
    let categories = ["Groceries", "Rent", "Dining Out"];
    let accounts = ["Checking", "Savings"];

    (0..45)
        .map(|i| {
            let month = 1 + i / 15;
            let day = 1 + (i % 15);
            Transaction {
                id: Some(i as i64 + 1),
                date: format!("2024-{:02}-{:02}", month, day),
                description: format!("Purchase {}", i + 1),
                amount: 10.0 + i as f64,
                transaction_type: Some("debit".into()),
                account_name: Some(accounts[i % 2].into()),
                predicted_category: categories[i % 3].into(),
                is_anomaly: i % 10 == 9,
            }
        })
        .collect()
}

fn matching(data: &StubData, params: &HashMap<String, String>) -> Vec<Transaction> {
    let mut rows: Vec<Transaction> = data
        .transactions
        .iter()
        .filter(|t| params.get("start_date").map_or(true, |d| t.date.as_str() >= d.as_str()))
        .filter(|t| params.get("end_date").map_or(true, |d| t.date.as_str() <= d.as_str()))
        .filter(|t| params.get("category").map_or(true, |c| &t.predicted_category == c))
        .filter(|t| {
            params
                .get("account")
                .map_or(true, |a| t.account_name.as_deref() == Some(a.as_str()))
        })
        .filter(|t| {
            params
                .get("anomaly")
                .map_or(true, |a| t.is_anomaly.to_string() == *a)
        })
        .cloned()
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    rows
}

async fn stub_root() -> Json<Value> {
    Json(json!({"status": "Welcome to the Financial Transactions Prediction API"}))
}

async fn stub_list(
    State(stub): State<StubService>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut data = stub.data();
    data.list_queries.push(params.clone());
    if data.fail_listing {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    let limit: usize = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(100);
    let offset: usize = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let rows = matching(&data, &params);
    let page: Vec<_> = rows.iter().skip(offset).take(limit).cloned().collect();

    Json(json!({"total": rows.len(), "data": page})).into_response()
}

async fn stub_upload(State(stub): State<StubService>, mut multipart: Multipart) -> Response {
    let mut content = None;
    let mut file_name = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            file_name = field.file_name().map(String::from);
            content = field.bytes().await.ok().map(|b| b.to_vec());
        }
    }

    let (Some(content), Some(file_name)) = (content, file_name) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"loc": ["body", "file"], "msg": "field required"}]})),
        )
            .into_response();
    };

    if !file_name.ends_with(".csv") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Invalid file type. Please upload a CSV file."})),
        )
            .into_response();
    }

    let mut data = stub.data();
    if data.uploaded_files.contains(&content) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"detail": "This file has already been uploaded."})),
        )
            .into_response();
    }
    data.uploaded_files.push(content);
    data.transactions = sample_transactions();

    let anomalies = data.transactions.iter().filter(|t| t.is_anomaly).count();
    Json(json!({
        "total_transactions": data.transactions.len(),
        "anomalies_detected": anomalies,
        "category_summary": {"Rent": 1000.0},
        "anomaly_summary": {"normal": data.transactions.len() - anomalies, "anomaly": anomalies},
        "monthly_spending": {"2024-01": 255.0},
        "data": [],
        "preview": []
    }))
    .into_response()
}

async fn stub_filters(State(stub): State<StubService>) -> Json<Value> {
    let data = stub.data();
    let mut categories: Vec<String> = Vec::new();
    let mut accounts: Vec<String> = Vec::new();
    for t in &data.transactions {
        if !categories.contains(&t.predicted_category) {
            categories.push(t.predicted_category.clone());
        }
        if let Some(account) = &t.account_name {
            if !accounts.contains(account) {
                accounts.push(account.clone());
            }
        }
    }
    Json(json!({"categories": categories, "accounts": accounts}))
}

async fn stub_export(
    State(stub): State<StubService>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut data = stub.data();
    data.export_queries.push(params.clone());

    let mut csv = String::from(
        "date,description,amount,transaction_type,account_name,predicted_category,is_anomaly\n",
    );
    for t in matching(&data, &params) {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            t.date,
            t.description,
            t.amount,
            t.transaction_type.unwrap_or_default(),
            t.account_name.unwrap_or_default(),
            t.predicted_category,
            t.is_anomaly
        ));
    }

    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=transactions_export.csv",
            ),
        ],
        csv,
    )
        .into_response()
}

async fn stub_forecast(State(stub): State<StubService>, Json(body): Json<Value>) -> Response {
    let Some(monthly) = body.get("monthly_spending") else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Missing 'monthly_spending' in payload"})),
        )
            .into_response();
    };
    let monthly: BTreeMap<String, f64> = serde_json::from_value(monthly.clone()).unwrap_or_default();
    stub.data().forecast_inputs.push(monthly);

    Json(json!({
        "forecast": {
            "2024-04-30T00:00:00": 512.5,
            "2024-05-31T00:00:00": 530.1,
            "2024-06-30T00:00:00": 498.0
        }
    }))
    .into_response()
}

async fn stub_predict_category(Json(body): Json<Value>) -> Json<Value> {
    let description = body["description"].as_str().unwrap_or_default().to_lowercase();
    let category = if description.contains("cafe") {
        "Dining Out"
    } else {
        "Other"
    };
    Json(json!({"category": category}))
}

async fn stub_predict_anomaly(Json(body): Json<Value>) -> Json<Value> {
    let amount = body["amount"].as_f64().unwrap_or_default();
    Json(json!({"is_anomaly": amount > 1000.0}))
}

// =============================================================================
// Test Client - Simulates a browser session
// =============================================================================

pub struct TestClient {
    pub state: AppState,
    router: Router,
    pub service: StubService,
}

impl TestClient {
    /// A fresh application talking to a fresh stub service.
    pub async fn new() -> Self {
        let service = StubService::default();
        let port = service.start().await;
        Self::with_api_url(format!("http://127.0.0.1:{}", port), service)
    }

    /// An application whose transactions service refuses connections.
    pub async fn with_unreachable_service() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Self::with_api_url(format!("http://127.0.0.1:{}", port), StubService::default())
    }

    fn with_api_url(api_base_url: String, service: StubService) -> Self {
        let config = Config {
            host: "127.0.0.1".into(),
            port: 0,
            api_base_url,
            page_size: 20,
            request_timeout: Duration::from_secs(5),
            database_path: PathBuf::from(":memory:"),
            migrations_path: PathBuf::from("migrations"),
            static_path: PathBuf::from("static"),
        };

        let pool = create_in_memory_pool().expect("Failed to create in-memory pool");
        let (state, router) = build_app_with_pool(config, pool).expect("Failed to build app");

        Self {
            state,
            router,
            service,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn token(&self) -> String {
        self.state.xsrf_value()
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn read(response: Response) -> (StatusCode, String) {
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&body).to_string())
    }

    /// Make a GET request and return status and body.
    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        let response = self
            .send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await;
        Self::read(response).await
    }

    /// Make a GET request and return the raw response (for headers).
    pub async fn get_response(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Get JSON from an endpoint and parse it.
    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, body) = self.get(uri).await;
        (status, serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    /// POST a url-encoded form carrying the XSRF token as a form field.
    pub async fn post_form(&self, uri: &str, form_data: &[(&str, &str)]) -> (StatusCode, String) {
        let token = self.token();
        let mut fields: Vec<(&str, &str)> = form_data.to_vec();
        fields.push(("_xsrf_token", token.as_str()));
        self.post_raw_form(uri, &fields).await
    }

    /// POST a url-encoded form exactly as given.
    pub async fn post_raw_form(
        &self,
        uri: &str,
        form_data: &[(&str, &str)],
    ) -> (StatusCode, String) {
        let body = form_data
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let response = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;
        Self::read(response).await
    }

    /// POST a dashboard action and return the redirect target.
    pub async fn post_action(&self, uri: &str) -> (StatusCode, Option<String>) {
        let response = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(XSRF_HEADER, self.token())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        (response.status(), location)
    }

    /// Upload a file through the multipart form, token in the query string
    /// as the dashboard page does it.
    pub async fn upload(&self, file_name: &str, content: &str) -> (StatusCode, Option<String>) {
        let boundary = "spendscope-test-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
            b = boundary,
            f = file_name,
            c = content
        );

        let response = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri(format!("/upload?_xsrf_token={}", self.token()))
                    .header(
                        "Content-Type",
                        format!("multipart/form-data; boundary={}", boundary),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        (response.status(), location)
    }

    /// Upload the standard sample file.
    pub async fn upload_sample(&self) {
        let (status, location) = self
            .upload(
                "transactions.csv",
                "date,description,amount,transaction_type,account_name\n2024-01-01,Coffee,3.5,debit,Checking\n",
            )
            .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/"));
    }

    /// Current dashboard state as JSON.
    pub async fn dashboard(&self) -> Value {
        let (status, json) = self.get_json("/api/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        json
    }
}
