//! End-to-end pipeline tests.
//!
//! Drives the orchestrator and executor with in-process fakes; no network,
//! no ffmpeg.
//!
//!   cargo test -p trailer-worker --test pipeline

pub mod fakes;

mod executor_tests;
mod orchestrator_tests;
