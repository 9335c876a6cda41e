use std::path::{Path, PathBuf};

pub const HELP: &str = "\
Commands:
  /upload <path> [path]  upload one file to analyse, or two files to compare
  /compare               start collecting two files for a comparison
  /status                show the current mode and loaded files
  /history               print the whole conversation
  /clear                 clear the conversation and forget loaded files
  /help                  show this help
  /quit                  exit
Anything else is sent as a question about the loaded data.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(Vec<PathBuf>),
    Compare,
    Status,
    History,
    Clear,
    Help,
    Quit,
    Ask(String),
    Invalid(String),
    Empty,
}

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Ask(line.to_string());
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();
    match (name, args.as_slice()) {
        ("upload", []) => Command::Invalid("usage: /upload <path> [path]".into()),
        ("upload", paths) => Command::Upload(paths.iter().map(|p| PathBuf::from(*p)).collect()),
        ("compare", []) => Command::Compare,
        ("status", []) => Command::Status,
        ("history", []) => Command::History,
        ("clear", []) => Command::Clear,
        ("help", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        (other, _) => Command::Invalid(format!("unknown command '/{other}', try /help")),
    }
}

/// Only Excel workbooks are offered to the backend.
pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xls"))
        .unwrap_or(false)
}
