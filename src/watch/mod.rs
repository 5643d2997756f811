// src/watch/mod.rs

//! Source-tree watching.
//!
//! This module is responsible for:
//! - Compiling glob patterns per asset category.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Evicting removed sprite sources from the sprite cache.
//!
//! It does **not** know about the pipeline graph; it only turns filesystem
//! changes into task-level triggers.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use patterns::{
    build_profiles_from_config, collect_matching_files, PatternSet, TaskWatchProfile,
};
pub use watcher::{spawn_watcher, WatcherHandle};
