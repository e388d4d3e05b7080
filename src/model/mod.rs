pub mod article;
pub mod configuration;
pub mod user;
