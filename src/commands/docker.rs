//! Docker engine and compose commands

use crate::cli::args::DockerCommands;
use crate::commands::AppContext;
use crate::domain::{parse_absolute_path, ContainerName};
use crate::error::Result;
use crate::services::{ComposeAction, DockerQuery};

/// Execute docker commands
pub async fn run_docker(ctx: &AppContext, command: &DockerCommands) -> Result<()> {
    let docker = ctx.docker();
    let report = match command {
        DockerCommands::Info => docker.query(DockerQuery::Info).await,
        DockerCommands::Ps => docker.query(DockerQuery::Containers).await,
        DockerCommands::Images => docker.query(DockerQuery::Images).await,
        DockerCommands::Logs { name } => docker.container_logs(&ContainerName::new(name)?).await,
        DockerCommands::ComposeSet { path } => {
            let file = docker.set_project(&parse_absolute_path(path)?).await?;
            format!("Compose project set to {}", file.display())
        }
        DockerCommands::Compose { action } => docker.compose(ComposeAction::from(*action)).await?,
    };
    println!("{}", report);
    Ok(())
}
