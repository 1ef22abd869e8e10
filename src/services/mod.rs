pub mod availability_service;
pub mod health_service;
