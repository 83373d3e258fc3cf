//! Console transport used by the replay binary.

use crate::domain::account::UserId;
use crate::domain::ports::{ChallengeRenderer, MessageRef, Notifier, Outbound};
use crate::error::Result;
use async_trait::async_trait;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

/// Prints outbound messages to stderr, one block per message.
#[derive(Default)]
pub struct ConsoleNotifier {
    next_id: AtomicU64,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn print(&self, header: &str, message: &Outbound) -> Result<()> {
        let stderr = io::stderr();
        let mut out = stderr.lock();
        writeln!(out, "{header}")?;
        if let Some(photo) = &message.photo {
            writeln!(out, "{}", String::from_utf8_lossy(photo))?;
        }
        for line in message.text.lines() {
            writeln!(out, "  {line}")?;
        }
        if let Some(controls) = &message.controls {
            for row in controls.keyboard_rows() {
                let labels: Vec<&str> = row.iter().map(|item| item.label()).collect();
                writeln!(out, "  [{}]", labels.join(" | "))?;
            }
            for row in controls.inline_rows() {
                let buttons: Vec<String> = row
                    .iter()
                    .map(|(label, button)| format!("{label} ({button})"))
                    .collect();
                writeln!(out, "  <{}>", buttons.join(" | "))?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, recipient: UserId, message: Outbound) -> Result<MessageRef> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.print(&format!("-> {recipient} #{id}"), &message)?;
        Ok(MessageRef(id))
    }

    async fn edit(&self, recipient: UserId, target: MessageRef, message: Outbound) -> Result<()> {
        self.print(&format!("-> {recipient} edit #{}", target.0), &message)
    }

    async fn alert(&self, recipient: UserId, text: &str) -> Result<()> {
        let stderr = io::stderr();
        writeln!(stderr.lock(), "-> {recipient} alert: {text}")?;
        Ok(())
    }
}

/// Draws the answer as a framed, letter-spaced text block.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextRenderer;

#[async_trait]
impl ChallengeRenderer for TextRenderer {
    async fn render(&self, answer: &str) -> Result<Vec<u8>> {
        let spaced: Vec<String> = answer.chars().map(String::from).collect();
        let body = spaced.join(" ");
        let border = "-".repeat(body.chars().count() + 2);
        Ok(format!("  +{border}+\n  | {body} |\n  +{border}+").into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_text_renderer_frames_answer() {
        let image = TextRenderer.render("AB12CD").await.unwrap();
        let text = String::from_utf8(image).unwrap();
        assert_eq!(
            text,
            "  +-------------+\n  | A B 1 2 C D |\n  +-------------+"
        );
    }

    #[tokio::test]
    async fn test_console_notifier_assigns_increasing_refs() {
        let notifier = ConsoleNotifier::new();
        let first = notifier.send(1, Outbound::text("hello")).await.unwrap();
        let second = notifier.send(2, Outbound::text("world")).await.unwrap();
        assert_eq!(first, MessageRef(1));
        assert_eq!(second, MessageRef(2));
    }
}
