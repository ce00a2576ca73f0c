//! completion fast path - Generate shell completion scripts

use std::io::Write;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bootline_core::AutocompleteHandler;
use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::args::Cli;

/// Writes a completion script for the requested shell to stdout.
#[derive(Debug, Default)]
pub struct ShellCompletion;

#[async_trait]
impl AutocompleteHandler for ShellCompletion {
    async fn complete(&self, args: &[String]) -> Result<()> {
        let shell = resolve_shell(args.get(1).map(String::as_str))?;
        let mut stdout = std::io::stdout().lock();
        write_completion(shell, &mut stdout);
        stdout.flush()?;
        Ok(())
    }
}

/// Shell named on the command line, else the login shell, else bash.
pub fn resolve_shell(requested: Option<&str>) -> Result<Shell> {
    match requested {
        Some(name) => Shell::from_str(name).map_err(|_| anyhow!("unsupported shell: {name}")),
        None => Ok(Shell::from_env().unwrap_or(Shell::Bash)),
    }
}

pub fn write_completion(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, out);
}
