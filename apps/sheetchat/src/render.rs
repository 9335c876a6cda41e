use chrono::Local;
use client_core::SessionState;
use shared::domain::{Message, MessageRole, ProcessedFile};

pub fn render_message(message: &Message) -> String {
    let label = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
        MessageRole::System => "system",
    };
    let time = message.timestamp.with_timezone(&Local).format("%H:%M:%S");
    let mut out = format!("[{time}] {label}: {}", message.content);

    if let Some(analysis) = &message.analysis_result {
        if let Some(code) = analysis
            .generated_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
        {
            out.push_str("\n  generated code:\n");
            out.push_str(&indent(code));
        }
        let raw = serde_json::to_string_pretty(&analysis.execution_result)
            .unwrap_or_else(|_| analysis.execution_result.to_string());
        out.push_str("\n  raw result:\n");
        out.push_str(&indent(&raw));
    }
    out
}

pub fn render_status(state: &SessionState) -> String {
    match state {
        SessionState::Single { current_file: None } => {
            "mode: single file (no file loaded)".to_string()
        }
        SessionState::Single {
            current_file: Some(file),
        } => format!("mode: single file\n  file: {}", describe_file(file)),
        SessionState::ComparisonSetup { pending: None } => {
            "mode: comparison setup (waiting for file 1 of 2)".to_string()
        }
        SessionState::ComparisonSetup {
            pending: Some(file),
        } => format!(
            "mode: comparison setup (waiting for file 2 of 2)\n  file A: {}",
            describe_file(file)
        ),
        SessionState::Comparison { pair } => format!(
            "mode: comparison\n  file A: {}\n  file B: {}",
            describe_file(&pair.file_a),
            describe_file(&pair.file_b)
        ),
    }
}

fn describe_file(file: &ProcessedFile) -> String {
    format!(
        "{} ({} sheet{}, id {})",
        file.original_name,
        file.sheets.len(),
        if file.sheets.len() == 1 { "" } else { "s" },
        file.id
    )
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
