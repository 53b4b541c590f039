pub mod order_query;
pub mod order_service;
pub mod ownership;
pub mod pricing;
pub mod status_machine;
