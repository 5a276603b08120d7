//! Terminal host for the refresh coordinator.
//!
//! The coordinator calls its sinks from whatever task finished the work, so
//! the sinks only forward [`HostEvent`]s to the main loop, which owns stdout.

use std::sync::Arc;

use lintlens_engine::{BadgeSink, DisplaySurface, HostSinks, Notifier};
use lintlens_types::{BadgeState, DiagnosticRecord, GroupMode};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone)]
pub enum HostEvent {
    DataChanged,
    Reveal(DiagnosticRecord),
    Error(String),
    Badge(BadgeState),
    Notice(String),
}

pub struct TerminalHost {
    tx: UnboundedSender<HostEvent>,
}

impl TerminalHost {
    pub fn sinks(tx: UnboundedSender<HostEvent>) -> HostSinks {
        let host = Arc::new(Self { tx });
        HostSinks {
            display: host.clone(),
            badge: host.clone(),
            notifier: host,
        }
    }

    fn send(&self, event: HostEvent) {
        // Receiver gone means the main loop is shutting down.
        let _ = self.tx.send(event);
    }
}

impl DisplaySurface for TerminalHost {
    fn data_changed(&self) {
        self.send(HostEvent::DataChanged);
    }

    fn reveal(&self, record: &DiagnosticRecord) {
        self.send(HostEvent::Reveal(record.clone()));
    }

    fn show_error(&self, message: &str) {
        self.send(HostEvent::Error(message.to_string()));
    }
}

impl BadgeSink for TerminalHost {
    fn set_badge(&self, badge: BadgeState) {
        self.send(HostEvent::Badge(badge));
    }
}

impl Notifier for TerminalHost {
    fn notify(&self, message: &str) {
        self.send(HostEvent::Notice(message.to_string()));
    }
}

/// Commands typed on stdin while watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Refresh,
    TogglePause,
    Next,
    Previous,
    /// 1-based position in the flat list.
    Goto(usize),
    Group(GroupMode),
    Revalidate,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  r            refresh now
  p            pause / resume
  n, b         next / previous problem
  <number>     jump to problem
  g <mode>     group by file, rule or both
  c            re-resolve project config
  q            quit";

impl UserCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let head = words.next()?;
        let command = match head {
            "r" | "refresh" => Self::Refresh,
            "p" | "pause" => Self::TogglePause,
            "n" | "next" => Self::Next,
            "b" | "prev" | "previous" => Self::Previous,
            "g" | "group" => Self::Group(words.next()?.parse().ok()?),
            "c" | "config" => Self::Revalidate,
            "h" | "?" | "help" => Self::Help,
            "q" | "quit" | "exit" => Self::Quit,
            number => match number.parse::<usize>() {
                Ok(n) if n > 0 => Self::Goto(n),
                _ => return None,
            },
        };
        Some(command)
    }
}
