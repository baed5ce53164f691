//! Command trait definition for CLI commands.
//!
//! Every chunkpress subcommand implements [`Command`]; `enum_dispatch`
//! forwards `execute` from the subcommand enum to the selected variant.

use anyhow::Result;
use enum_dispatch::enum_dispatch;

/// Trait implemented by all chunkpress CLI commands.
///
/// `command_line` is the full invocation, logged for provenance.
#[enum_dispatch]
pub trait Command {
    #[allow(clippy::missing_errors_doc)]
    fn execute(&self, command_line: &str) -> Result<()>;
}
