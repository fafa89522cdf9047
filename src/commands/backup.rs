//! Backup archive commands

use crate::cli::args::{BackupCommands, OutputFormat};
use crate::cli::output::{print_output, BackupList, Message};
use crate::commands::AppContext;
use crate::domain::{parse_absolute_path, ArchiveName};
use crate::error::Result;

/// Execute backup commands
pub async fn run_backup(ctx: &AppContext, command: &BackupCommands, format: OutputFormat) -> Result<()> {
    let backups = ctx.backups();
    match command {
        BackupCommands::List { limit } => {
            let list = BackupList {
                dir: backups.dir().display().to_string(),
                backups: backups.list(*limit).await?,
            };
            print_output(&list, format)?;
        }
        BackupCommands::Create { path } => {
            let info = backups.create(&parse_absolute_path(path)?).await?;
            print_output(&info, format)?;
        }
        BackupCommands::Restore { archive, target } => {
            let archive = ArchiveName::new(archive)?;
            let target = parse_absolute_path(target)?;
            let members = backups.restore(&archive, &target).await?;
            let message = Message::ok(format!(
                "Restored {} into {} ({} entries)",
                archive,
                target.display(),
                members
            ));
            print_output(&message, format)?;
        }
        BackupCommands::Delete { archive } => {
            let archive = ArchiveName::new(archive)?;
            backups.delete(&archive).await?;
            print_output(&Message::ok(format!("Deleted backup {}", archive)), format)?;
        }
    }
    Ok(())
}
