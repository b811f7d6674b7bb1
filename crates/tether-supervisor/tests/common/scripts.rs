//! Shell scripts standing in for the supervised CLI
//!
//! Every script appends `<version> <pid> <args...>` to a launch log before
//! doing anything else.

use std::path::Path;
use tether_supervisor::RESTART_SIGNAL;

/// How a fake CLI behaves once launched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Run until signalled; exit with the restart status on the restart signal
    Serve,
    /// Exit with the restart status on the first launch, then serve
    RestartOnce,
    /// Exit with this status immediately
    Exit(i32),
    /// Run until signalled; exit with this status on the restart signal
    DieOnRestart(i32),
}

/// Numeric value of the restart signal
pub fn restart_status() -> i32 {
    RESTART_SIGNAL as i32
}

/// Render the script for `version`
///
/// Traps are installed before the launch is logged, so a test that has seen
/// the launch can signal the script right away.
pub fn render(version: &str, behavior: Behavior, log: &Path, dir: &Path) -> String {
    let trap = match behavior {
        Behavior::Serve | Behavior::RestartOnce => format!("trap 'exit {}' USR1\n", restart_status()),
        Behavior::DieOnRestart(code) => format!("trap 'exit {}' USR1\n", code),
        Behavior::Exit(_) => String::new(),
    };
    let launch = format!("echo \"{} $$ $*\" >> \"{}\"\n", version, log.display());
    let serve = "while true; do sleep 0.05; done\n";

    let body = match behavior {
        Behavior::Serve | Behavior::DieOnRestart(_) => serve.to_string(),
        Behavior::RestartOnce => format!(
            "marker=\"{}/.restarted-{}\"\nif [ ! -f \"$marker\" ]; then\n  touch \"$marker\"\n  exit {}\nfi\n{}",
            dir.display(),
            version,
            restart_status(),
            serve
        ),
        Behavior::Exit(code) => format!("exit {}\n", code),
    };

    format!("#!/bin/sh\n{}{}{}", trap, launch, body)
}
