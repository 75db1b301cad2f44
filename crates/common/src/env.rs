//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use tracing::info;

/// Create every directory in `dirs` (with parents) before the server accepts requests.
pub async fn ensure_dirs(dirs: &[&str]) -> anyhow::Result<()> {
    for dir in dirs {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {dir}: {e}"))?;
        info!(%dir, event = "dir_ready", "runtime directory ready");
    }
    Ok(())
}
