//! Policy subcommand implementation.

use crate::cli::PolicyOverrides;
use crate::config::{Paths, PolicyConfig, PolicyFile};
use crate::error::CliResult;
use crate::output;
use clap::Parser;

/// Print the effective policy as JSON.
#[derive(Parser, Debug)]
pub struct PolicyCommand {
    /// Print the path a policy file is read from by default, then exit
    #[arg(long)]
    pub path: bool,

    #[command(flatten)]
    pub overrides: PolicyOverrides,
}

impl PolicyCommand {
    pub fn execute(&self, base: &PolicyConfig) -> CliResult<()> {
        if self.path {
            let paths = Paths::discover()?;
            println!("{}", paths.policy_file().display());
            return Ok(());
        }

        let policy = self.overrides.apply(base)?;
        output::print_policy(&PolicyFile::from(&policy))?;
        Ok(())
    }
}
