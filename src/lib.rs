pub mod access;
pub mod auth;
pub mod billing;
pub mod companies;
pub mod config;
pub mod db;
pub mod dsars;
pub mod error;
pub mod models;
pub mod routes;
pub mod routing;
pub mod schema;
pub mod state;
pub mod subscriptions;
pub mod users;
pub mod validation;
pub mod webhook;
