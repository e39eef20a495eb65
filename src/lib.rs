//! Personal task tracker: account registration and login, then bearer-token
//! authenticated CRUD over tasks that only their owner can see.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod state;
pub mod tasks;
