// src/models/mod.rs

//! Data models for the earthquake poller.

pub mod config;
pub mod event;
pub mod record;
pub mod scale;
pub mod thread;

pub use config::{Config, EarthquakeConfig, ImageConfig, InfoSource, ThreadConfig};
pub use event::{
    AlertEvent, Area, AreaKind, DomesticTsunami, FeedSource, ForeignTsunami, Hypocentre,
    InfoEvent, Point,
};
pub use record::{DedupRecord, SiteKey, SiteKeyPolicy};
pub use thread::{PostedThread, ThreadInfo, ThreadPage};
