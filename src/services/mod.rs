pub mod chart_service;
pub mod indicator_service;
pub mod rate_service;
