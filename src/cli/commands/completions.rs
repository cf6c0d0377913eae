//! Completions command - print shell completion scripts

use crate::cli::args::{Cli, CompletionsArgs};
use crate::error::SwatchResult;
use clap::CommandFactory;

/// Execute the completions command
pub fn execute(args: CompletionsArgs) -> SwatchResult<()> {
    let mut command = Cli::command();
    clap_complete::generate(args.shell, &mut command, "swatch", &mut std::io::stdout());
    Ok(())
}
