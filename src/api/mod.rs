//! HTTP surface exercising the orchestration core

pub mod auth;
pub mod routes;
pub mod schemas;
