// Library for tests to access modules

pub mod config;
pub mod document_file;
pub mod error;
pub mod models;
pub mod persistence_worker;
pub mod reconciler;
pub mod routes;
pub mod runtime;
pub mod scheduler;
pub mod store;
pub mod task;
