//! Core domain types for Taskly: the todo store and the background time tracker.

pub mod config;
pub mod heartbeat;
pub mod inspect;
pub mod lock;
pub mod process;
pub mod search;
pub mod storage;
pub mod timeline;
pub mod todo;
pub mod tracker;
