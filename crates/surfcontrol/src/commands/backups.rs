//! Backup command handlers.

use tabled::Tabled;

use surfcontrol_core::{BackupId, BackupInfo, Controller, CoreError, MobileCore};

use crate::cli::{BackupsArgs, BackupsCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Files")]
    files: usize,
}

impl From<&BackupInfo> for BackupRow {
    fn from(b: &BackupInfo) -> Self {
        Self {
            id: b.id.to_string(),
            created: b.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            files: b.files,
        }
    }
}

pub async fn handle(
    controller: &Controller,
    args: BackupsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        BackupsCommand::List => {
            let backups = controller.list_backups().await?;
            let out = output::render_list(&global.output, &backups, |b| BackupRow::from(b), |b| {
                b.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BackupsCommand::Restore { id } => {
            let id = BackupId::new(id);
            controller.restore_backup(&id).await?;
            if !global.quiet {
                eprintln!("Restored backup {id}");
            }
            Ok(())
        }

        BackupsCommand::Prune { keep } => {
            let keep = keep.unwrap_or(controller.config().deploy.backup_retention);
            let store = controller.orchestrator().backups().clone();
            let removed = tokio::task::spawn_blocking(move || store.prune(keep))
                .await
                .map_err(|e| CliError::Core {
                    message: format!("prune task failed: {e}"),
                })?
                .map_err(CoreError::from)?;
            let ids: Vec<String> = removed.iter().map(ToString::to_string).collect();
            let out = match global.output {
                OutputFormat::Table => format!("Removed {} backup(s)", ids.len()),
                _ => output::render_single(&global.output, &ids, |_| String::new(), |v| v.join("\n"))?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
