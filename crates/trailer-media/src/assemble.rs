//! Final trailer assembly.
//!
//! Fallback chain: concat with burned subtitles, then concat with stream copy,
//! then the first scene alone.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::command::{escape_filter_path, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// How the final video was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyMode {
    /// All scenes concatenated with subtitles burned in
    BurnedSubtitles,
    /// All scenes concatenated, subtitles only as a sidecar file
    ConcatOnly,
    /// Only the first scene
    FirstSceneOnly,
}

impl AssemblyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssemblyMode::BurnedSubtitles => "burned_subtitles",
            AssemblyMode::ConcatOnly => "concat_only",
            AssemblyMode::FirstSceneOnly => "first_scene_only",
        }
    }
}

/// Joins ordered scene videos into one output file.
#[async_trait]
pub trait MediaAssembler: Send + Sync {
    /// Assemble `scenes` (already in playback order) into `output`.
    async fn assemble(
        &self,
        scenes: &[PathBuf],
        subtitles: Option<&Path>,
        output: &Path,
    ) -> MediaResult<AssemblyMode>;
}

/// FFmpeg-backed assembler.
#[derive(Debug, Clone)]
pub struct FfmpegAssembler {
    runner: FfmpegRunner,
    crf: u8,
    preset: String,
}

impl Default for FfmpegAssembler {
    fn default() -> Self {
        Self::new(300)
    }
}

impl FfmpegAssembler {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(timeout_secs),
            crf: 20,
            preset: "veryfast".to_string(),
        }
    }

    async fn write_concat_list(&self, scenes: &[PathBuf], output: &Path) -> MediaResult<PathBuf> {
        let list_path = output.with_extension("concat.txt");
        let mut list_body = String::new();
        for path in scenes {
            let absolute = if path.is_absolute() {
                path.clone()
            } else {
                std::env::current_dir()?.join(path)
            };
            list_body.push_str("file '");
            list_body.push_str(&absolute.to_string_lossy().replace('\'', "'\\''"));
            list_body.push_str("'\n");
        }
        tokio::fs::write(&list_path, list_body).await?;
        Ok(list_path)
    }

    async fn burn_subtitles(&self, list: &Path, subtitles: &Path, output: &Path) -> MediaResult<()> {
        let cmd = FfmpegCommand::concat_list(list, output)
            .video_filter(format!("subtitles={}", escape_filter_path(subtitles)))
            .video_codec("libx264")
            .preset(self.preset.clone())
            .crf(self.crf)
            .audio_codec("aac")
            .faststart();
        self.runner.run(&cmd).await
    }

    async fn concat_copy(&self, list: &Path, output: &Path) -> MediaResult<()> {
        let cmd = FfmpegCommand::concat_list(list, output).stream_copy().faststart();
        self.runner.run(&cmd).await
    }
}

#[async_trait]
impl MediaAssembler for FfmpegAssembler {
    async fn assemble(
        &self,
        scenes: &[PathBuf],
        subtitles: Option<&Path>,
        output: &Path,
    ) -> MediaResult<AssemblyMode> {
        let first = scenes.first().ok_or(MediaError::NoScenes)?;
        for scene in scenes {
            if !scene.exists() {
                return Err(MediaError::FileNotFound(scene.clone()));
            }
        }

        let list = self.write_concat_list(scenes, output).await?;

        let mode = 'assembled: {
            if let Some(subtitles) = subtitles {
                match self.burn_subtitles(&list, subtitles, output).await {
                    Ok(()) => break 'assembled Some(AssemblyMode::BurnedSubtitles),
                    Err(e) => warn!(error = %e, "Subtitle burn-in failed, falling back to concat"),
                }
            }

            match self.concat_copy(&list, output).await {
                Ok(()) => Some(AssemblyMode::ConcatOnly),
                Err(e) => {
                    warn!(error = %e, "Concat failed, falling back to first scene");
                    None
                }
            }
        };

        let _ = tokio::fs::remove_file(&list).await;

        let mode = match mode {
            Some(mode) => mode,
            None => {
                tokio::fs::copy(first, output).await.map_err(|e| {
                    MediaError::assembly_failed(format!(
                        "could not copy first scene {}: {}",
                        first.display(),
                        e
                    ))
                })?;
                AssemblyMode::FirstSceneOnly
            }
        };

        info!(
            scenes = scenes.len(),
            mode = mode.as_str(),
            output = %output.display(),
            "Trailer assembled"
        );
        Ok(mode)
    }
}
