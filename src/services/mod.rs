// src/services/mod.rs

//! Board-facing collaborators and their trait seams.
//!
//! The lifecycle engine only talks to [`ThreadPoster`] and [`ThreadInspector`];
//! the concrete board implementations live in [`poster`] and [`survival`].

pub mod image;
pub mod poster;
pub mod survival;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{PostedThread, ThreadInfo, ThreadPage};

pub use image::ImageLookup;
pub use poster::BoardPoster;
pub use survival::PageInspector;

/// Creates threads and writes replies.
#[async_trait]
pub trait ThreadPoster: Send + Sync {
    /// Start a new thread; `thread.key` is ignored.
    async fn create_thread(&self, thread: &ThreadInfo) -> Result<PostedThread>;

    /// Reply to the thread named by `thread.key`.
    async fn write_thread(&self, thread: &ThreadInfo) -> Result<()>;
}

/// Reads the current state of a thread page.
#[async_trait]
pub trait ThreadInspector: Send + Sync {
    async fn inspect(&self, url: &str) -> Result<ThreadPage>;
}
