//! Application-level orchestration utilities.
//!
//! This module owns the run lifecycle (begin, play/pause, navigation, end) and
//! post-run processing of the summary. UI/CLI layers call into this module to
//! keep responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{run_controller, Ports, UiCommand};
pub(crate) use post_process::process_run_completion;
