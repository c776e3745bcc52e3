//! The `script download` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use fl_core::{actions, ManagementApi};

use crate::console;

/// Downloads a platform script's decoded content to disk.
///
/// The id comes from a pasted console URL (`policyId/...`) or a bare id;
/// the output path defaults to the script's own file name.
pub async fn download<A>(api: &A, target: &str, out: Option<PathBuf>) -> Result<()>
where
    A: ManagementApi + ?Sized,
{
    let script_id = console::extract_policy_id(target)?;
    let script = actions::fetch_script(api, &script_id)
        .await
        .context("Script fetch failed")?;

    let path = out.unwrap_or_else(|| PathBuf::from(&script.file_name));
    std::fs::write(&path, &script.content)
        .with_context(|| format!("Failed to write script to {}", path.display()))?;
    println!(
        "{} {} ({} bytes)",
        "Saved".green(),
        path.display().to_string().cyan(),
        script.content.len()
    );
    Ok(())
}
