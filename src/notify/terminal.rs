//! Notifier for plain terminal output.

use std::io::{BufRead, IsTerminal, Write};
use std::sync::OnceLock;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use super::{Notifier, Permission, PermissionCell};

/// Prints notifications to stdout and asks for permission on stdin.
///
/// When stdin is not a terminal the prompt is skipped and the permission
/// stays undecided. Stdin is read on its own OS thread, so a prompt nobody
/// answers never holds up runtime shutdown.
#[derive(Debug)]
pub struct TerminalNotifier {
    permission: PermissionCell,
    bell: bool,
    interactive: bool,
    lines: OnceLock<Mutex<mpsc::UnboundedReceiver<String>>>,
}

impl TerminalNotifier {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission: PermissionCell::new(permission),
            bell: true,
            interactive: std::io::stdin().is_terminal(),
            lines: OnceLock::new(),
        }
    }

    /// Disable the terminal bell on delivery.
    pub fn without_bell(mut self) -> Self {
        self.bell = false;
        self
    }

    /// Answers come from `lines` instead of stdin.
    #[cfg(test)]
    fn with_lines(permission: Permission, lines: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            permission: PermissionCell::new(permission),
            bell: false,
            interactive: true,
            lines: OnceLock::from(Mutex::new(lines)),
        }
    }

    fn lines(&self) -> &Mutex<mpsc::UnboundedReceiver<String>> {
        self.lines.get_or_init(|| Mutex::new(spawn_stdin_reader()))
    }
}

/// Forward stdin lines to a channel from a detached thread. The channel
/// closes at end of input.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("shk-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "failed to start stdin reader");
    }
    rx
}

/// Interpret a prompt answer. Anything that is not a clear yes/no is a dismissal.
fn parse_answer(line: &str) -> Permission {
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => Permission::Granted,
        "n" | "no" => Permission::Denied,
        _ => Permission::Undecided,
    }
}

#[async_trait]
impl Notifier for TerminalNotifier {
    fn permission(&self) -> Permission {
        self.permission.get()
    }

    async fn request_permission(&self) -> Permission {
        if !self.interactive {
            tracing::debug!("stdin is not a terminal, skipping notification prompt");
            return self.permission.get();
        }

        let mut lines = self.lines().lock().await;
        // Lines typed before the prompt are not answers
        while lines.try_recv().is_ok() {}

        eprint!("Show desktop-style notifications for status changes? [y/n] ");
        let _ = std::io::stderr().flush();

        let answer = match lines.recv().await {
            Some(line) => parse_answer(&line),
            None => {
                tracing::debug!("stdin closed before the notification prompt was answered");
                Permission::Undecided
            }
        };

        if answer != Permission::Undecided {
            self.permission.set(answer);
        }
        answer
    }

    fn deliver(&self, message: &str) {
        let bell = if self.bell { "\x07" } else { "" };
        println!("{}🔔 {}", bell, message);
    }
}
