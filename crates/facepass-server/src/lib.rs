pub mod auth;
pub mod blob_store;
pub mod config;
pub mod credentials;
pub mod error;
pub mod face_matcher;
pub mod state;
pub mod token_store;
pub mod verification;
pub mod web;
