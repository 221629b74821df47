//! Terminal output for the CLI.
//!
//! Status lines go to stdout, except warnings and errors which share stderr
//! with the log. JSON output is a single pretty-printed document on stdout.

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{AnsiColors, OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Separates a build order and marks plan steps.
pub const ARROW: &str = "→";

#[derive(Debug, Clone, Copy)]
enum Status {
  Success,
  Error,
  Warning,
  Info,
}

impl Status {
  fn symbol(self) -> &'static str {
    match self {
      Status::Success => "✓",
      Status::Error => "✗",
      Status::Warning => "⚠",
      Status::Info => "•",
    }
  }

  fn color(self) -> AnsiColors {
    match self {
      Status::Success => AnsiColors::Green,
      Status::Error => AnsiColors::Red,
      Status::Warning => AnsiColors::Yellow,
      Status::Info => AnsiColors::Blue,
    }
  }

  fn stream(self) -> Stream {
    match self {
      Status::Error | Status::Warning => Stream::Stderr,
      Status::Success | Status::Info => Stream::Stdout,
    }
  }

  /// Problems color the whole line; other statuses only their symbol.
  fn render(self, message: &str) -> String {
    let stream = self.stream();
    let symbol = self.symbol();
    let symbol = symbol.if_supports_color(stream, |s| s.color(self.color()));
    match self {
      Status::Error | Status::Warning => {
        format!("{symbol} {}", message.if_supports_color(stream, |m| m.color(self.color())))
      }
      Status::Success | Status::Info => format!("{symbol} {message}"),
    }
  }

  fn print(self, message: &str) {
    let line = self.render(message);
    match self.stream() {
      Stream::Stderr => eprintln!("{line}"),
      _ => println!("{line}"),
    }
  }
}

pub fn print_success(message: &str) {
  Status::Success.print(message);
}

pub fn print_error(message: &str) {
  Status::Error.print(message);
}

pub fn print_warning(message: &str) {
  Status::Warning.print(message);
}

pub fn print_info(message: &str) {
  Status::Info.print(message);
}

/// An indented `label: value` line under a status line.
pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {value}", label.if_supports_color(Stream::Stdout, |l| l.dimmed()));
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{json}");
  Ok(())
}
