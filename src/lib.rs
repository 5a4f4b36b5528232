//! Phonebook REST backend: contacts with phone numbers over a relational
//! store, plus an append-only audit log of deletions.

pub mod config;
pub mod db;
pub mod deletion_log;
pub mod dto;
pub mod error;
pub mod http;
pub mod model;
pub mod repository;
pub mod service;
