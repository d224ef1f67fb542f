pub mod actions;
pub mod agent;
pub mod browser;
pub mod commands;
pub mod document_parser;
pub mod errors;
pub mod jd_store;
pub mod ledger;
pub mod models;
pub mod monitor;
pub mod naming;
pub mod pdf;
pub mod runner;
pub mod secret_store;
pub mod service;
pub mod settings_store;
pub mod status;
pub mod template;
#[cfg(test)]
pub(crate) mod test_support;
