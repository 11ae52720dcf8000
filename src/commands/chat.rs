//! Interactive chat shell and one-shot questions.
//!
//! The shell only reads orchestrator state: the history, the held files and
//! the input-disabled flag. Lines starting with `/` are shell commands.

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use crate::models::{FileSet, Message, RetrievedFile, Role};
use crate::orchestrator::{IgnoreReason, Orchestrator, TurnOutcome};
use crate::pipeline::TurnPipeline;

const HELP: &str = "Commands:
  /files         list retrieved files
  /show <n|id>   show a file's metadata and content
  /history       print the conversation so far
  /help          show this help
  /quit          leave the chat
Anything else is sent as a question.";

/// One line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Quit,
    Help,
    Files,
    History,
    Show(String),
    Submit(String),
}

pub fn parse_line(line: &str) -> ShellCommand {
    let trimmed = line.trim();
    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };

    match head {
        "/quit" | "/exit" => ShellCommand::Quit,
        "/help" => ShellCommand::Help,
        "/files" => ShellCommand::Files,
        "/history" => ShellCommand::History,
        "/show" => ShellCommand::Show(rest.to_string()),
        _ => ShellCommand::Submit(line.to_string()),
    }
}

/// Numbered list of held files.
pub fn render_file_list(files: &FileSet) -> String {
    if files.is_empty() {
        return "No files retrieved yet.".to_string();
    }
    files
        .iter()
        .enumerate()
        .map(|(i, file)| format!("{:>3}. {} ({})", i + 1, file.name, file.id))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Look a file up by 1-based position or by id.
pub fn find_file<'a>(files: &'a FileSet, key: &str) -> Option<&'a RetrievedFile> {
    match key.parse::<usize>() {
        Ok(n) if n >= 1 => files.iter().nth(n - 1),
        _ => files.get(key),
    }
}

pub fn render_file_detail(file: &RetrievedFile) -> String {
    let mut out = format!("{}\nid: {}\n", file.name, file.id);
    if !file.metadata.is_empty() {
        out.push_str("metadata:\n");
        for (key, value) in &file.metadata {
            out.push_str(&format!("  {}: {}\n", key, value));
        }
    }
    out.push('\n');
    out.push_str(&file.full_content);
    out
}

fn render_message(message: &Message) -> String {
    let label = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
        Role::System => "system",
    };
    format!("[{}] {}", label, message.content)
}

/// Submit one question and print the assistant messages it produced.
pub async fn ask<P: TurnPipeline>(orchestrator: &Orchestrator<P>, question: &str) -> Result<()> {
    let before = orchestrator.messages().await.len();
    let outcome = orchestrator.submit(question).await;

    for message in orchestrator.messages().await.iter().skip(before) {
        if message.role == Role::Assistant {
            println!("{}\n", message.content);
        }
    }

    match outcome {
        TurnOutcome::Answered { .. } => Ok(()),
        TurnOutcome::Failed { error } => bail!("turn failed: {}", error),
        TurnOutcome::Ignored(IgnoreReason::EmptyInput) => bail!("question is empty"),
        TurnOutcome::Ignored(IgnoreReason::TurnInProgress) => bail!("a turn is already running"),
    }
}

/// Run the interactive shell on stdin until `/quit` or end of input.
pub async fn run<P: TurnPipeline>(orchestrator: Orchestrator<P>) -> Result<()> {
    let session = orchestrator.snapshot().await;
    info!(session = %session.id, "Chat session started");
    println!("Ask about the open datasets. Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_line(&line) {
            ShellCommand::Quit => break,
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Files => println!("{}", render_file_list(&orchestrator.files().await)),
            ShellCommand::History => {
                for message in orchestrator.messages().await {
                    println!("{}", render_message(&message));
                }
            }
            ShellCommand::Show(key) => {
                let files = orchestrator.files().await;
                match find_file(&files, &key) {
                    Some(file) => println!("{}", render_file_detail(file)),
                    None => println!("No file matches '{}'. Try /files.", key),
                }
            }
            ShellCommand::Submit(text) => {
                if text.trim().is_empty() {
                    continue;
                }
                // Failures already put the fallback reply in the history.
                if let Err(err) = ask(&orchestrator, &text).await {
                    info!(error = %err, "Turn did not complete");
                }
            }
        }
    }

    let session = orchestrator.snapshot().await;
    info!(
        session = %session.id,
        messages = session.messages.len(),
        files = session.files.len(),
        "Chat session ended"
    );
    Ok(())
}
