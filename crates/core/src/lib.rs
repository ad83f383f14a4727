//! Core business logic for agora: the vote ledger, reputation, best answers,
//! content cleanup and abuse reports.

pub mod services;

pub use services::*;
