pub mod log_status_view;
