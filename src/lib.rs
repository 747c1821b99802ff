// src/lib.rs

//! eqboard: earthquake feeds to bulletin-board threads

pub mod error;
pub mod feeds;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod services;
pub mod storage;
pub mod utils;
