pub mod auth;
pub mod dao;
pub mod database;
pub mod errors;
pub mod model;
pub mod observability;
pub mod rate_limiting;
pub mod routes;
pub mod services;
pub mod startup;
pub mod store;
