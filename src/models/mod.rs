pub mod api_log;
pub mod dashboard;
pub mod transaction;

pub use api_log::{ApiLog, NewApiLog};
pub use dashboard::{select_options, DashboardFilter, PredictForm, SelectOption, TransactionQuery};
pub use transaction::{
    AnomalyPrediction, AnomalySummary, CategoryPrediction, FilterOptions, Prediction, Transaction,
    TransactionInput, TransactionPage, UploadSummary,
};
