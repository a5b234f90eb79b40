//! Command handlers, one module per top-level subcommand.

pub mod config_cmd;
pub mod profile;
pub mod stats;
pub mod status;
pub mod watch;

use invisia_core::Coordinator;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a backend command to its handler.
pub async fn dispatch(
    cmd: Command,
    coordinator: &Coordinator,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(coordinator, global).await,
        Command::Watch => watch::handle(coordinator, global).await,
        Command::SetProfile { profile } => profile::handle(coordinator, &profile, global).await,
        Command::Stats(args) => stats::handle(coordinator, args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "handled without a backend connection".into(),
        }),
    }
}
