//! Runtime - drives a conversation in real time
//!
//! Maps the sequencer's clock onto tokio time, carries out voice requests on
//! background tasks, and feeds spoken answers back in with the ticket of the
//! step they were requested for.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::conversation::{ConversationView, ResponseTicket, StepSequencer, VoiceRequest};
use crate::voice::{ListenOutcome, SpeakOutcome, VoiceRecognizer, VoiceSynthesizer};

/// Commands accepted from a front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Answer the current step with typed text or a chosen option
    Select(String),
    /// Capture a spoken answer for the current step
    Listen,
    /// Stop a voice capture in progress
    StopListening,
    /// Read the current step aloud, or stop narration already playing
    Narrate,
    /// Restart from the first step
    Restart,
    Quit,
}

/// Things a front end may want to tell the user that are not part of the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A typed answer arrived when no answer was expected
    AnswerIgnored,
    /// Voice capture started
    Listening,
    /// A spoken answer was transcribed
    Heard { text: String, accepted: bool },
    /// Voice capture ended without a transcript
    ListenEnded(ListenOutcome),
    /// A narration finished
    Narration(SpeakOutcome),
    /// Voice answers cannot be offered right now
    VoiceUnavailable,
}

/// Handle to a spawned runtime
pub struct RuntimeHandle {
    pub commands: mpsc::Sender<Command>,
    pub view: watch::Receiver<ConversationView>,
    pub notices: mpsc::UnboundedReceiver<Notice>,
    pub task: JoinHandle<()>,
}

/// Owns the sequencer and the voice channels for one session
pub struct GuideRuntime {
    sequencer: StepSequencer,
    synthesizer: Arc<VoiceSynthesizer>,
    recognizer: Arc<VoiceRecognizer>,
}

impl GuideRuntime {
    #[must_use]
    pub fn new(
        sequencer: StepSequencer,
        synthesizer: Arc<VoiceSynthesizer>,
        recognizer: Arc<VoiceRecognizer>,
    ) -> Self {
        Self {
            sequencer,
            synthesizer,
            recognizer,
        }
    }

    /// Start the conversation on a background task
    #[must_use]
    pub fn spawn(self) -> RuntimeHandle {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (view_tx, view_rx) = watch::channel(self.sequencer.current_view());
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(self.run(command_rx, view_tx, notice_tx));

        RuntimeHandle {
            commands: command_tx,
            view: view_rx,
            notices: notice_rx,
            task,
        }
    }

    /// Run until `Quit` arrives or every command sender is dropped
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        view: watch::Sender<ConversationView>,
        notices: mpsc::UnboundedSender<Notice>,
    ) {
        let origin = Instant::now();
        let (answer_tx, mut answers) = mpsc::unbounded_channel::<(ResponseTicket, ListenOutcome)>();

        self.sequencer.start();
        self.flush(&view, &notices);

        loop {
            let deadline = self.sequencer.next_deadline().map(|due| origin + due);

            tokio::select! {
                command = commands.recv() => {
                    self.sequencer.advance_to(origin.elapsed());
                    match command {
                        None | Some(Command::Quit) => break,
                        Some(command) => self.handle(command, &answer_tx, &notices),
                    }
                }
                Some((ticket, outcome)) = answers.recv() => {
                    self.sequencer.advance_to(origin.elapsed());
                    self.handle_answer(ticket, outcome, &notices);
                }
                () = sleep_until(deadline) => {
                    self.sequencer.advance_to(origin.elapsed());
                }
            }

            self.flush(&view, &notices);
        }

        self.synthesizer.stop();
        self.recognizer.stop();
        tracing::info!("conversation runtime stopped");
    }

    fn handle(
        &mut self,
        command: Command,
        answers: &mpsc::UnboundedSender<(ResponseTicket, ListenOutcome)>,
        notices: &mpsc::UnboundedSender<Notice>,
    ) {
        tracing::debug!(?command, phase = %self.sequencer.phase(), "command received");

        match command {
            Command::Select(text) => {
                if !self.sequencer.submit_choice(&text) {
                    let _ = notices.send(Notice::AnswerIgnored);
                }
            }
            Command::Listen => {
                let Some(ticket) = self.sequencer.response_ticket() else {
                    let _ = notices.send(Notice::AnswerIgnored);
                    return;
                };
                if !self.recognizer.is_supported() {
                    let _ = notices.send(Notice::VoiceUnavailable);
                    return;
                }

                let pending = match self.recognizer.begin() {
                    Ok(pending) => pending,
                    Err(ListenOutcome::Rejected) => return,
                    Err(outcome) => {
                        let _ = notices.send(Notice::ListenEnded(outcome));
                        return;
                    }
                };

                let recognizer = Arc::clone(&self.recognizer);
                let answers = answers.clone();
                tokio::spawn(async move {
                    let outcome = recognizer.complete(pending).await;
                    let _ = answers.send((ticket, outcome));
                });
                let _ = notices.send(Notice::Listening);
            }
            Command::StopListening => self.recognizer.stop(),
            Command::Narrate => {
                if self.synthesizer.is_speaking() {
                    self.synthesizer.stop();
                } else if let Some(text) = self.sequencer.narration_text() {
                    self.speak(&text, notices);
                }
            }
            Command::Restart => {
                tracing::info!("restart requested");
                self.sequencer.start();
            }
            Command::Quit => {}
        }
    }

    fn handle_answer(
        &mut self,
        ticket: ResponseTicket,
        outcome: ListenOutcome,
        notices: &mpsc::UnboundedSender<Notice>,
    ) {
        let notice = match outcome {
            ListenOutcome::Transcript(text) => {
                let accepted = self.sequencer.submit_for(ticket, &text);
                Notice::Heard { text, accepted }
            }
            other => Notice::ListenEnded(other),
        };
        let _ = notices.send(notice);
    }

    /// Carry out pending voice requests and publish the view
    fn flush(
        &mut self,
        view: &watch::Sender<ConversationView>,
        notices: &mpsc::UnboundedSender<Notice>,
    ) {
        for request in self.sequencer.take_voice_requests() {
            match request {
                VoiceRequest::Speak(text) => self.speak(&text, notices),
                VoiceRequest::StopListening => self.recognizer.stop(),
                VoiceRequest::StopAll => {
                    self.synthesizer.stop();
                    self.recognizer.stop();
                }
            }
        }

        let current = self.sequencer.current_view();
        view.send_if_modified(|shown| {
            if *shown == current {
                false
            } else {
                *shown = current;
                true
            }
        });
    }

    fn speak(&self, text: &str, notices: &mpsc::UnboundedSender<Notice>) {
        if !self.synthesizer.is_enabled() {
            return;
        }
        let pending = match self.synthesizer.begin(text) {
            Ok(pending) => pending,
            Err(outcome) => {
                let _ = notices.send(Notice::Narration(outcome));
                return;
            }
        };
        let synthesizer = Arc::clone(&self.synthesizer);
        let notices = notices.clone();
        tokio::spawn(async move {
            let outcome = synthesizer.complete(pending).await;
            let _ = notices.send(Notice::Narration(outcome));
        });
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures::future::pending().await,
    }
}
