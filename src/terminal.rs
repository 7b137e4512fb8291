//! Terminal front end helpers
//!
//! Turns successive [`ConversationView`] snapshots into incremental terminal
//! output, and typed lines into runtime commands.

use std::fmt::Write as _;

use crate::conversation::{ConversationView, Phase};
use crate::runtime::{Command, Notice};
use crate::voice::{ListenOutcome, SpeakOutcome};

const HELP: &str = "(type a number or your own answer; /listen /stop /speak /restart /quit)";

/// Parse a typed line against the options currently offered
#[must_use]
pub fn parse_input(line: &str, options: &[String]) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let command = match line {
        "/listen" | "/l" => Command::Listen,
        "/stop" => Command::StopListening,
        "/speak" | "/s" => Command::Narrate,
        "/restart" => Command::Restart,
        "/quit" | "/q" | "/exit" => Command::Quit,
        _ => match line.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => Command::Select(options[n - 1].clone()),
            _ => Command::Select(line.to_string()),
        },
    };
    Some(command)
}

/// Incremental renderer for the conversation transcript
#[derive(Debug, Default)]
pub struct TranscriptRenderer {
    segment: Option<(usize, bool)>,
    printed: usize,
    line_open: bool,
    typing_shown: bool,
    options_shown: bool,
    history_len: usize,
    completed_shown: bool,
}

impl TranscriptRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Output to append for `view`, given everything rendered so far
    pub fn render(&mut self, view: &ConversationView) -> String {
        let mut out = String::new();

        if view.history.len() < self.history_len {
            self.close_line(&mut out);
            out.push_str("\n--- starting over ---\n");
            *self = Self::default();
        }

        for choice in &view.history[self.history_len..] {
            self.close_line(&mut out);
            let _ = writeln!(out, "you> {}", choice.choice_text);
        }
        self.history_len = view.history.len();

        let segment = (view.step_index, view.phase == Phase::Completed);
        if self.segment != Some(segment) {
            self.close_line(&mut out);
            self.segment = Some(segment);
            self.printed = 0;
            self.typing_shown = false;
            self.options_shown = false;
        }

        if view.typing && !self.typing_shown && view.revealed.is_empty() {
            out.push_str("guide is typing...\n");
            self.typing_shown = true;
        }

        if view.revealed.len() > self.printed && view.revealed.is_char_boundary(self.printed) {
            if self.printed == 0 {
                out.push_str("guide> ");
            }
            out.push_str(&view.revealed[self.printed..]);
            self.printed = view.revealed.len();
            self.line_open = true;
        }

        if view.accepting_response && !self.options_shown {
            self.close_line(&mut out);
            for (i, option) in view.options.iter().enumerate() {
                let _ = writeln!(out, "  {}. {option}", i + 1);
            }
            out.push_str(HELP);
            out.push('\n');
            self.options_shown = true;
        }

        let closing_done = view
            .closing
            .as_ref()
            .is_none_or(|closing| view.revealed.len() >= closing.len());
        if view.phase == Phase::Completed && closing_done && !self.completed_shown {
            self.close_line(&mut out);
            out.push_str("(conversation complete; /restart or /quit)\n");
            self.completed_shown = true;
        }

        if matches!(view.phase, Phase::Resolving | Phase::AutoAdvancing) {
            self.close_line(&mut out);
        }

        out
    }

    fn close_line(&mut self, out: &mut String) {
        if self.line_open {
            out.push('\n');
            self.line_open = false;
        }
    }
}

/// One-line description of a notice, if it is worth showing
#[must_use]
pub fn describe_notice(notice: &Notice) -> Option<String> {
    let text = match notice {
        Notice::AnswerIgnored => "(not waiting for an answer right now)".to_string(),
        Notice::Listening => "(listening... speak your answer)".to_string(),
        Notice::Heard { text, accepted: true } => format!("(heard: {text})"),
        Notice::Heard {
            text,
            accepted: false,
        } => format!("(heard \"{text}\", but that step has passed)"),
        Notice::ListenEnded(ListenOutcome::Failed(reason)) => {
            format!("(couldn't hear that: {reason})")
        }
        Notice::ListenEnded(ListenOutcome::Unsupported) | Notice::VoiceUnavailable => {
            "(voice input is not available; type your answer)".to_string()
        }
        Notice::ListenEnded(ListenOutcome::Skipped) => {
            "(voice input needs an ElevenLabs key; run `quest-guide set-key`)".to_string()
        }
        Notice::Narration(SpeakOutcome::Failed(reason)) => format!("(narration failed: {reason})"),
        Notice::ListenEnded(_) | Notice::Narration(_) => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::UserChoice;

    fn view(step_index: usize, phase: Phase) -> ConversationView {
        ConversationView {
            phase,
            step_index,
            step_count: 2,
            prompt: Some("Pick one".to_string()),
            revealed: String::new(),
            typing: false,
            options: vec!["red".to_string(), "blue".to_string()],
            accepting_response: false,
            history: Vec::new(),
            closing: None,
        }
    }

    #[test]
    fn test_parse_input() {
        let options = vec!["red".to_string(), "blue".to_string()];
        assert_eq!(parse_input("  ", &options), None);
        assert_eq!(parse_input("/listen", &options), Some(Command::Listen));
        assert_eq!(parse_input("/quit", &options), Some(Command::Quit));
        assert_eq!(
            parse_input("2", &options),
            Some(Command::Select("blue".to_string()))
        );
        assert_eq!(
            parse_input("3", &options),
            Some(Command::Select("3".to_string()))
        );
        assert_eq!(
            parse_input(" green please ", &options),
            Some(Command::Select("green please".to_string()))
        );
    }

    #[test]
    fn test_renders_incremental_reveal() {
        let mut renderer = TranscriptRenderer::new();

        let mut v = view(0, Phase::Revealing);
        v.typing = true;
        assert_eq!(renderer.render(&v), "guide is typing...\n");

        v.typing = false;
        v.revealed = "Pi".to_string();
        assert_eq!(renderer.render(&v), "guide> Pi");

        v.revealed = "Pick one".to_string();
        assert_eq!(renderer.render(&v), "ck one");

        v.phase = Phase::AwaitingResponse;
        v.accepting_response = true;
        let out = renderer.render(&v);
        assert!(out.starts_with("\n  1. red\n  2. blue\n"));

        // Nothing new to show
        assert_eq!(renderer.render(&v), "");
    }

    #[test]
    fn test_renders_choices_and_restart() {
        let mut renderer = TranscriptRenderer::new();
        let mut v = view(0, Phase::Resolving);
        v.history = vec![UserChoice::new(0, "blue")];
        assert_eq!(renderer.render(&v), "you> blue\n");

        let restarted = view(0, Phase::Revealing);
        assert!(renderer.render(&restarted).contains("starting over"));
    }

    #[test]
    fn test_describe_notice() {
        assert!(describe_notice(&Notice::Narration(SpeakOutcome::Played)).is_none());
        assert!(
            describe_notice(&Notice::Heard {
                text: "red".to_string(),
                accepted: true
            })
            .unwrap()
            .contains("red")
        );
    }
}
