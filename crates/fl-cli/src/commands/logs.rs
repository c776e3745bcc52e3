//! The `logs collect` command: request diagnostic log collection for an
//! app on a device.

use anyhow::{Context, Result};
use colored::Colorize;

use fl_core::{actions, resolve_subjects, ManagementApi};

use crate::console;

pub async fn collect<A>(api: &A, target: &str, app_id: &str, folders: &[String]) -> Result<()>
where
    A: ManagementApi + ?Sized,
{
    let mdm_id = console::extract_device_id(target)?;
    let subjects = resolve_subjects(api, &mdm_id)
        .await
        .context("Identity resolution failed")?;

    actions::collect_logs(api, &subjects, app_id, folders)
        .await
        .context("Log collection request failed")?;

    println!(
        "{} log collection for app {} on {} ({} folder(s))",
        "Requested".green(),
        app_id.cyan(),
        subjects.device.display_name.cyan(),
        folders.len()
    );
    Ok(())
}
