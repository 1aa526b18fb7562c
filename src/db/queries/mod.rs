pub mod api_logs;
