//! Command registry mapping request path names to commands.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Value, json};
use thiserror::Error;
use tracing;

use checkuser_checker::ConnectionChecker;
use checkuser_core::error::{AppError, ErrorKind};
use checkuser_core::types::ConnectionTotal;

/// Message returned when a user command has no argument.
pub const USER_REQUIRED: &str = "User name is required";

/// Error at the dispatch boundary; rendered as a 500 response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// No command is registered under the requested name.
    #[error("Unknown command")]
    UnknownCommand,

    /// The command's argument is missing or invalid.
    #[error("{0}")]
    Validation(String),

    /// The command failed while executing.
    #[error("{0}")]
    Execution(String),
}

impl From<CommandError> for AppError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::UnknownCommand => AppError::unknown_command(),
            CommandError::Validation(message) => AppError::validation(message),
            CommandError::Execution(message) => AppError::internal(message),
        }
    }
}

impl From<AppError> for CommandError {
    fn from(err: AppError) -> Self {
        match err.kind {
            ErrorKind::UnknownCommand => Self::UnknownCommand,
            ErrorKind::Validation => Self::Validation(err.message),
            _ => Self::Execution(err.message),
        }
    }
}

/// A request-scoped command. Each variant owns its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report sessions, limit, and expiry of one user.
    CheckUser(String),
    /// Terminate every session of one user.
    KillUser(String),
    /// Count sessions across all end-user accounts.
    CountAllConnections,
}

impl Command {
    /// Build a `CheckUser` command.
    pub fn check_user(argument: Option<String>) -> Result<Self, CommandError> {
        Ok(Self::CheckUser(require_user(argument)?))
    }

    /// Build a `KillUser` command.
    pub fn kill_user(argument: Option<String>) -> Result<Self, CommandError> {
        Ok(Self::KillUser(require_user(argument)?))
    }

    /// Build a `CountAllConnections` command; any argument is ignored.
    pub fn count_all(_argument: Option<String>) -> Result<Self, CommandError> {
        Ok(Self::CountAllConnections)
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckUser(_) => "check",
            Self::KillUser(_) => "kill",
            Self::CountAllConnections => "all_connections",
        }
    }

    /// Run the command and produce its JSON payload.
    ///
    /// Checker failures are folded into the payload (`{"error": ...}` or
    /// `success: false`); only a payload that cannot be produced at all
    /// is returned as an error.
    pub async fn execute(&self, context: &CommandContext) -> Result<Value, CommandError> {
        match self {
            Self::CheckUser(username) => {
                match context.checker.report_json(username, &context.exclude).await {
                    Ok(report) => Ok(report),
                    Err(e) if e.kind == ErrorKind::Serialization => {
                        Err(CommandError::Execution(e.message))
                    }
                    Err(e) => {
                        tracing::warn!("Check for '{}' failed: {}", username, e);
                        Ok(json!({ "error": e.message }))
                    }
                }
            }
            Self::KillUser(username) => {
                let outcome = context.checker.kill(username).await;
                to_payload(&outcome)
            }
            Self::CountAllConnections => {
                let total = match context.checker.count_all().await {
                    Ok(count) => ConnectionTotal::ok(count),
                    Err(e) => {
                        tracing::error!("Counting all connections failed: {}", e);
                        ConnectionTotal::failed(e.message)
                    }
                };
                to_payload(&total)
            }
        }
    }
}

/// Shared state handed to every command execution.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Session checker
    pub checker: Arc<ConnectionChecker>,
    /// Report fields stripped from `check` payloads
    pub exclude: Vec<String>,
}

/// Builds a command from the optional path argument.
pub type CommandConstructor = fn(Option<String>) -> Result<Command, CommandError>;

/// Name → constructor table plus the context commands execute against.
#[derive(Debug)]
pub struct CommandRegistry {
    /// Registered constructors by name
    constructors: HashMap<String, CommandConstructor>,
    /// Execution context
    context: CommandContext,
}

impl CommandRegistry {
    /// Create a registry with the built-in commands registered.
    pub fn new(checker: Arc<ConnectionChecker>, exclude: Vec<String>) -> Self {
        let mut registry = Self {
            constructors: HashMap::new(),
            context: CommandContext { checker, exclude },
        };
        registry.register("check", Command::check_user);
        registry.register("kill", Command::kill_user);
        registry.register("all_connections", Command::count_all);
        registry
    }

    /// Register a constructor under `name`, replacing any previous one.
    pub fn register(&mut self, name: &str, constructor: CommandConstructor) {
        tracing::debug!("Registered command '{}'", name);
        self.constructors.insert(name.to_string(), constructor);
    }

    /// Registered command names, sorted.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up and construct a command without running it.
    pub fn resolve(&self, name: &str, argument: Option<&str>) -> Result<Command, CommandError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or(CommandError::UnknownCommand)?;
        constructor(argument.map(str::to_string))
    }

    /// Resolve and execute a command.
    pub async fn dispatch(&self, name: &str, argument: Option<&str>) -> Result<Value, CommandError> {
        let command = self.resolve(name, argument)?;
        tracing::info!("Executing command '{}'", command.name());
        command.execute(&self.context).await
    }
}

fn require_user(argument: Option<String>) -> Result<String, CommandError> {
    argument
        .filter(|user| !user.is_empty())
        .ok_or_else(|| CommandError::Validation(USER_REQUIRED.to_string()))
}

fn to_payload<T: serde::Serialize>(value: &T) -> Result<Value, CommandError> {
    serde_json::to_value(value).map_err(|e| CommandError::Execution(e.to_string()))
}
