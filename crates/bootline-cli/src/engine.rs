//! The bundled lifecycle engine.
//!
//! `initialize` parses the command line; `execute` runs the parsed command.
//! Plugins are discovered when the engine is constructed.

use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use bootline_core::{
    BootConfig, EngineFactory, FaultTap, InvocationId, LifecycleEngine, PluginRegistry, VERSION,
};
use clap::error::ErrorKind;
use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;

use crate::args::{Cli, Commands};
use crate::completion::{resolve_shell, write_completion};
use crate::plugins::builtin_plugins;

/// What `initialize` resolved the command line to.
#[derive(Debug)]
enum Parsed {
    /// `--help` / `--version`: print and succeed.
    Message(String),
    Command { json: bool, command: Commands },
}

pub struct CommandEngine {
    args: Vec<String>,
    plugins: PluginRegistry,
    faults: FaultTap,
    invocation_id: Option<InvocationId>,
    parsed: Option<Parsed>,
}

impl CommandEngine {
    pub fn new(args: Vec<String>, plugins: PluginRegistry, faults: FaultTap) -> Self {
        Self {
            args,
            plugins,
            faults,
            invocation_id: None,
            parsed: None,
        }
    }

    fn invocation_id(&self) -> Result<InvocationId> {
        self.invocation_id
            .context("engine executed without an invocation id")
    }

    fn info(&self, json: bool) -> Result<()> {
        let invocation_id = self.invocation_id()?;
        let plugins: Vec<&str> = self.plugins.plugins().iter().map(|p| p.name()).collect();
        if json {
            let payload = serde_json::json!({
                "invocation_id": invocation_id,
                "version": VERSION,
                "plugins": plugins,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        } else {
            println!("Invocation: {}", invocation_id);
            println!("Version:    {}", VERSION);
            println!("Plugins:    {}", plugins.join(", "));
        }
        Ok(())
    }

    fn list_plugins(&self, json: bool) -> Result<()> {
        #[derive(Serialize)]
        struct PluginRow<'a> {
            name: &'a str,
            error_handler: bool,
        }

        let rows: Vec<PluginRow<'_>> = self
            .plugins
            .plugins()
            .iter()
            .map(|p| PluginRow {
                name: p.name(),
                error_handler: p.has_error_handler(),
            })
            .collect();

        if json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else {
            for row in rows {
                let capability = if row.error_handler {
                    "error-handler"
                } else {
                    "-"
                };
                println!("{:<24} {}", row.name, capability);
            }
        }
        Ok(())
    }

    async fn exec(&self, command: &[String]) -> Result<()> {
        let Some((program, args)) = command.split_first() else {
            bail!("exec requires a program");
        };
        let invocation_id = self.invocation_id()?;

        tracing::debug!(event = "exec.spawn", program = %program);
        let mut child = Command::new(program)
            .args(args)
            .env("BOOTLINE_INVOCATION_ID", invocation_id.to_string())
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start `{program}`"))?;

        // Output forwarding runs detached; a broken pipe there must not
        // mask the child's own exit status.
        let mut forwarders = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(
                self.faults
                    .spawn("exec.stdout", forward_output(stdout, tokio::io::stdout())),
            );
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(
                self.faults
                    .spawn("exec.stderr", forward_output(stderr, tokio::io::stderr())),
            );
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("Failed to wait for `{program}`"))?;
        futures::future::join_all(forwarders).await;

        if !status.success() {
            match status.code() {
                Some(code) => bail!("`{program}` exited with status {code}"),
                None => bail!("`{program}` was terminated by a signal"),
            }
        }
        Ok(())
    }
}

/// Copy child output byte for byte; no decoding, no line rewriting.
async fn forward_output<R, W>(mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tokio::io::copy(&mut reader, &mut writer).await?;
    writer.flush().await?;
    Ok(())
}

#[async_trait]
impl LifecycleEngine for CommandEngine {
    fn attach_invocation_id(&mut self, invocation_id: InvocationId) {
        self.invocation_id = Some(invocation_id);
    }

    async fn initialize(&mut self) -> Result<()> {
        let argv = std::iter::once("bootline".to_string()).chain(self.args.iter().cloned());
        let parsed = match Cli::try_parse_from(argv) {
            Ok(cli) => Parsed::Command {
                json: cli.json,
                command: cli.command,
            },
            Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                Parsed::Message(err.render().to_string())
            }
            Err(err) => return Err(anyhow::Error::new(err)),
        };
        tracing::debug!(event = "engine.initialized", plugins = self.plugins.len());
        self.parsed = Some(parsed);
        Ok(())
    }

    async fn execute(&mut self) -> Result<()> {
        let Some(parsed) = self.parsed.take() else {
            bail!("engine executed before initialisation");
        };

        match parsed {
            Parsed::Message(text) => {
                print!("{text}");
                Ok(())
            }
            Parsed::Command { json, command } => match command {
                Commands::Info => self.info(json),
                Commands::Plugins => self.list_plugins(json),
                Commands::Exec { command } => self.exec(&command).await,
                // Only reached when `completion` is not the first argument
                // (e.g. `bootline --json completion`), which the bootstrap's
                // completion fast path does not match.
                Commands::Completion { shell } => {
                    let shell = match shell {
                        Some(shell) => shell,
                        None => resolve_shell(None)?,
                    };
                    write_completion(shell, &mut std::io::stdout());
                    Ok(())
                }
            },
        }
    }

    fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }
}

/// Builds a [`CommandEngine`] over this process's arguments.
pub struct CommandEngineFactory {
    config: BootConfig,
    args: Vec<String>,
}

impl CommandEngineFactory {
    pub fn new(config: BootConfig, args: Vec<String>) -> Self {
        Self { config, args }
    }
}

impl EngineFactory for CommandEngineFactory {
    fn construct(&self, faults: FaultTap) -> Result<Box<dyn LifecycleEngine>> {
        let plugins = builtin_plugins(&self.config);
        Ok(Box::new(CommandEngine::new(
            self.args.clone(),
            plugins,
            faults,
        )))
    }
}
