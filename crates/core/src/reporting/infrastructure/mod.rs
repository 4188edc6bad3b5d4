pub mod http_violation_reporter;
