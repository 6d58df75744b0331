//! Media handling for trailer assembly.
//!
//! This crate provides:
//! - FFmpeg command building and execution
//! - WebVTT subtitle generation from scene scripts
//! - Scene concatenation with subtitle burn-in and graceful fallbacks

pub mod assemble;
pub mod command;
pub mod error;
pub mod subtitles;

pub use assemble::{AssemblyMode, FfmpegAssembler, MediaAssembler};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use subtitles::{format_timestamp, SubtitleCue, WebVttBuilder};
