pub mod app;
pub mod auth;
pub mod categories;
pub mod config;
pub mod error;
pub mod memory;
pub mod pagination;
pub mod products;
pub mod response;
pub mod state;
pub mod validation;
