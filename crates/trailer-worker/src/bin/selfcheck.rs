use std::path::Path;

use trailer_ai_client::{GenerationConfig, ScriptWriterConfig};
use trailer_storage::StorageConfig;
use trailer_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "trailer-selfcheck: starting with work_dir={}",
        config.work_dir
    );
    ensure_workdir(&config.work_dir).await?;

    let ffmpeg = trailer_media::check_ffmpeg()
        .map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;
    println!("trailer-selfcheck: ffmpeg at {}", ffmpeg.display());

    let storage = StorageConfig::from_env()
        .map_err(|e| anyhow::anyhow!("storage config invalid: {}", e))?;
    println!("trailer-selfcheck: storage backend {:?}", storage.backend);

    let generation = GenerationConfig::from_env()
        .map_err(|e| anyhow::anyhow!("generation config invalid: {}", e))?;
    if generation.api_key.is_none() {
        ensure_env_present(&["GENERATION_API_KEY"])?;
    }

    if !ScriptWriterConfig::from_env().is_enabled() {
        println!("trailer-selfcheck: GEMINI_API_KEY unset, template script writer will be used");
    }

    println!("trailer-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;

    let probe = path.join(".selfcheck");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("work dir {} not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
