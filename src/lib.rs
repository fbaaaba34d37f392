// Library exports for Postboard
// This allows integration tests and external code to use Postboard modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod storage;
