//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod backups;
pub mod config_cmd;
pub mod deploy;
pub mod intent;
pub mod run;
pub mod status;

use surfcontrol_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a controller-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Run => run::handle(controller).await,
        Command::Deploy(args) => deploy::handle(controller, &args, global).await,
        Command::Status(args) => status::handle(controller, &args, global).await,
        Command::Backups(args) => backups::handle(controller, args, global).await,
        // Handled before a controller is built
        Command::Validate(_) | Command::Render(_) | Command::Config(_) | Command::Completions(_) => {
            unreachable!()
        }
    }
}
