// src/notifier.rs

//! Side channel for per-file build errors.

use std::fmt;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

/// Receives per-file errors (bad CSS, broken SVG, bundler failures).
pub trait Notifier: Send + Sync + fmt::Debug {
    fn notify(&self, title: &str, message: &str);
}

/// Logs every notification at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        error!(title, "{message}");
    }
}

/// Logs, then runs a desktop notification command such as `notify-send`
/// with the title and message appended.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
    args: Vec<String>,
}

impl CommandNotifier {
    /// `argv` is the command prefix; returns `None` when it is empty.
    pub fn new(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl CommandNotifier {
    fn spawn(&self, title: &str, message: &str) -> std::io::Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(title)
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, title: &str, message: &str) {
        LogNotifier.notify(title, message);

        // Spawning a tokio child needs a reactor; outside one only the log remains.
        if Handle::try_current().is_err() {
            debug!(program = %self.program, "no async runtime; notification command skipped");
            return;
        }
        let mut child = match self.spawn(title, message) {
            Ok(child) => child,
            Err(err) => {
                warn!(program = %self.program, error = %err, "could not run notification command");
                return;
            }
        };
        let program = self.program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => {
                    debug!(program = %program, ?status, "notification command failed");
                }
                Ok(_) => {}
                Err(err) => warn!(program = %program, error = %err, "notification command lost"),
            }
        });
    }
}

/// Notifier for the configured `[notify].command`, or plain logging.
pub fn from_config(command: Option<&[String]>) -> std::sync::Arc<dyn Notifier> {
    match command.and_then(CommandNotifier::new) {
        Some(n) => std::sync::Arc::new(n),
        None => std::sync::Arc::new(LogNotifier),
    }
}
