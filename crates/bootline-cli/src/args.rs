//! Command-line definition for the bundled engine.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bootline")]
#[command(author = "Bootline Developers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Plugin-driven command runner with managed invocation lifecycle", long_about = None)]
pub struct Cli {
    /// Render command output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the invocation id, version and registered plugins
    Info,

    /// List registered plugins and their capabilities
    Plugins,

    /// Run a program; a non-zero exit fails the invocation
    Exec {
        /// Program and its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Print a shell completion script
    Completion {
        /// Target shell (defaults to $SHELL, then bash)
        shell: Option<clap_complete::Shell>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("bootline").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_exec_keeps_child_flags() {
        let cli = parse(&["exec", "--", "ls", "-la"]).unwrap();
        match cli.command {
            Commands::Exec { command } => assert_eq!(command, vec!["ls", "-la"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_exec_requires_program() {
        assert!(parse(&["exec"]).is_err());
    }

    #[test]
    fn test_json_is_global() {
        let cli = parse(&["plugins", "--json"]).unwrap();
        assert!(cli.json);
    }

    #[test]
    fn test_completion_shell_parsed() {
        let cli = parse(&["completion", "fish"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Completion {
                shell: Some(clap_complete::Shell::Fish)
            }
        ));
    }
}
