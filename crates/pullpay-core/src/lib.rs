//! Core PullPay library (session, fetching, views, mutations, config).

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod mutation;
pub mod session;
pub mod validation;
pub mod views;
