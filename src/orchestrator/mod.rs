//! Scenario orchestration.
//!
//! Owns the session lifecycle (dispatching calls, teardown, waiting for
//! settlement) and post-run report assembly. The CLI and the TUI both drive
//! a [`Session`] and only differ in how they present it.

mod controller;
mod post_process;
mod timeline;

pub(crate) use controller::{play, Session, StatusView};
pub(crate) use post_process::Report;
pub(crate) use timeline::TimelineEvent;
