// src/lib.rs

pub mod api;
pub mod app_state;
pub mod config;
pub mod logging;
pub mod service;
pub mod storage;
pub mod streaming;
