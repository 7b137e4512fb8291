//! Pure conversation state transitions
//!
//! `transition` never touches the clock, the store, or the voice channels. It
//! returns the next state and the effects the sequencer must carry out.

use super::effect::Effect;
use super::event::{Event, Timer};
use super::resolver::resolve;
use super::state::{ConversationState, Phase, UserChoice};
use super::timing::Timing;
use crate::script::Script;

/// Compute the next state and effects for an event
#[must_use]
pub fn transition(
    state: &ConversationState,
    event: Event,
    script: &Script,
    timing: &Timing,
) -> (ConversationState, Vec<Effect>) {
    match (state.phase, event) {
        (Phase::Revealing | Phase::AwaitingResponse, Event::Start)
            if state.current_index == 0 && state.history.is_empty() =>
        {
            tracing::debug!("conversation already at first step, ignoring start");
            (state.clone(), Vec::new())
        }

        (_, Event::Start) => {
            let fresh = ConversationState::default();
            let mut effects = vec![Effect::ResetSession];
            let next = enter_step(fresh, 0, script, timing, &mut effects);
            (next, effects)
        }

        (Phase::Revealing, Event::TimerFired(Timer::BeginReveal)) => {
            let effects = script
                .step(state.current_index)
                .map(|step| {
                    vec![Effect::StartReveal {
                        text: step.prompt_text().to_string(),
                    }]
                })
                .unwrap_or_default();
            (state.clone(), effects)
        }

        (Phase::Revealing, Event::RevealFinished) => {
            let Some(step) = script.step(state.current_index) else {
                return (state.clone(), Vec::new());
            };

            let mut next = state.clone();
            let mut effects = vec![Effect::OfferNarration {
                text: step.prompt_text().to_string(),
            }];

            if step.has_options() {
                next.phase = Phase::AwaitingResponse;
            } else {
                next.phase = Phase::AutoAdvancing;
                effects.push(Effect::Schedule {
                    timer: Timer::AutoAdvance,
                    after: timing.auto_advance_delay,
                });
            }
            (next, effects)
        }

        (Phase::AwaitingResponse, Event::Submit { text, at }) => {
            let Some(step) = script.step(state.current_index) else {
                return (state.clone(), Vec::new());
            };

            if text.trim().is_empty() || state.has_choice_for(step.index()) {
                tracing::debug!(step = step.index(), "ignoring empty or repeated answer");
                return (state.clone(), Vec::new());
            }

            let choice = UserChoice {
                step_index: step.index(),
                choice_text: resolve(&text, step.options()).into_choice_text(),
                recorded_at: at,
            };

            let mut next = state.clone();
            next.history.push(choice.clone());
            next.phase = Phase::Resolving;

            let effects = vec![
                Effect::StopListening,
                Effect::PersistChoice(choice),
                Effect::Schedule {
                    timer: Timer::AdvanceAfterChoice,
                    after: timing.choice_delay,
                },
            ];
            (next, effects)
        }

        (Phase::AutoAdvancing, Event::TimerFired(Timer::AutoAdvance))
        | (Phase::Resolving, Event::TimerFired(Timer::AdvanceAfterChoice)) => {
            let mut effects = Vec::new();
            let next_index = state.current_index + 1;
            let next = enter_step(state.clone(), next_index, script, timing, &mut effects);
            (next, effects)
        }

        (phase, event) => {
            tracing::debug!(%phase, ?event, "event ignored in current phase");
            (state.clone(), Vec::new())
        }
    }
}

/// Move to step `index`, or complete when the script has run out
fn enter_step(
    mut state: ConversationState,
    index: usize,
    script: &Script,
    timing: &Timing,
    effects: &mut Vec<Effect>,
) -> ConversationState {
    if index >= script.len() {
        state.phase = Phase::Completed;
        effects.push(Effect::Completed);
        if let Some(closing) = script.closing() {
            effects.push(Effect::StartReveal {
                text: closing.to_string(),
            });
            effects.push(Effect::Narrate {
                text: closing.to_string(),
            });
        }
        return state;
    }

    state.current_index = index;
    state.phase = Phase::Revealing;
    effects.push(Effect::Schedule {
        timer: Timer::BeginReveal,
        after: timing.typing_delay,
    });
    state
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn script() -> Script {
        Script::new(
            "test",
            [
                ("hello", vec![]),
                ("how are you?", vec!["good".to_string(), "bad".to_string()]),
                ("bye", vec![]),
            ],
        )
    }

    fn submit(text: &str) -> Event {
        Event::Submit {
            text: text.to_string(),
            at: Utc::now(),
        }
    }

    fn at(index: usize, phase: Phase) -> ConversationState {
        ConversationState {
            current_index: index,
            history: Vec::new(),
            phase,
        }
    }

    #[test]
    fn test_start_enters_first_step() {
        let timing = Timing::default();
        let (next, effects) =
            transition(&ConversationState::default(), Event::Start, &script(), &timing);

        assert_eq!(next.phase, Phase::Revealing);
        assert_eq!(next.current_index, 0);
        assert_eq!(
            effects,
            vec![
                Effect::ResetSession,
                Effect::Schedule {
                    timer: Timer::BeginReveal,
                    after: timing.typing_delay
                }
            ]
        );
    }

    #[test]
    fn test_start_is_noop_at_first_step() {
        let state = at(0, Phase::Revealing);
        let (next, effects) = transition(&state, Event::Start, &script(), &Timing::default());
        assert_eq!(next, state);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_start_resets_later_step() {
        let mut state = at(1, Phase::AwaitingResponse);
        state.history.push(UserChoice::new(1, "good"));

        let (next, effects) = transition(&state, Event::Start, &script(), &Timing::default());
        assert_eq!(next.current_index, 0);
        assert!(next.history.is_empty());
        assert_eq!(effects[0], Effect::ResetSession);
    }

    #[test]
    fn test_start_on_empty_script_completes() {
        let empty = Script::new("empty", Vec::<(String, Vec<String>)>::new());
        let (next, effects) =
            transition(&ConversationState::default(), Event::Start, &empty, &Timing::default());
        assert_eq!(next.phase, Phase::Completed);
        assert!(effects.contains(&Effect::Completed));
    }

    #[test]
    fn test_reveal_finished_without_options_auto_advances() {
        let (next, effects) = transition(
            &at(0, Phase::Revealing),
            Event::RevealFinished,
            &script(),
            &Timing::default(),
        );
        assert_eq!(next.phase, Phase::AutoAdvancing);
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Schedule {
                timer: Timer::AutoAdvance,
                ..
            }
        )));
    }

    #[test]
    fn test_reveal_finished_with_options_awaits() {
        let (next, effects) = transition(
            &at(1, Phase::Revealing),
            Event::RevealFinished,
            &script(),
            &Timing::default(),
        );
        assert_eq!(next.phase, Phase::AwaitingResponse);
        assert_eq!(
            effects,
            vec![Effect::OfferNarration {
                text: "how are you?".to_string()
            }]
        );
    }

    #[test]
    fn test_submit_records_and_persists() {
        let (next, effects) = transition(
            &at(1, Phase::AwaitingResponse),
            submit("GOOD"),
            &script(),
            &Timing::default(),
        );

        assert_eq!(next.phase, Phase::Resolving);
        assert_eq!(next.history.len(), 1);
        assert_eq!(next.history[0].choice_text, "good");
        assert_eq!(next.current_index, 1);
        assert!(matches!(effects[1], Effect::PersistChoice(ref c) if c.step_index == 1));
    }

    #[test]
    fn test_submit_outside_awaiting_is_ignored() {
        for phase in [
            Phase::Idle,
            Phase::Revealing,
            Phase::Resolving,
            Phase::AutoAdvancing,
            Phase::Completed,
        ] {
            let state = at(1, phase);
            let (next, effects) = transition(&state, submit("good"), &script(), &Timing::default());
            assert_eq!(next, state, "phase {phase}");
            assert!(effects.is_empty());
        }
    }

    #[test]
    fn test_blank_submit_is_ignored() {
        let state = at(1, Phase::AwaitingResponse);
        let (next, effects) = transition(&state, submit("  "), &script(), &Timing::default());
        assert_eq!(next, state);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_advance_after_last_step_completes() {
        let (next, effects) = transition(
            &at(2, Phase::AutoAdvancing),
            Event::TimerFired(Timer::AutoAdvance),
            &script(),
            &Timing::default(),
        );
        assert_eq!(next.phase, Phase::Completed);
        assert_eq!(effects, vec![Effect::Completed]);
    }

    #[test]
    fn test_completion_reveals_and_narrates_closing() {
        let script = script().with_closing("all done");
        let (_, effects) = transition(
            &at(2, Phase::AutoAdvancing),
            Event::TimerFired(Timer::AutoAdvance),
            &script,
            &Timing::default(),
        );
        assert!(effects.contains(&Effect::StartReveal {
            text: "all done".to_string()
        }));
        assert!(effects.contains(&Effect::Narrate {
            text: "all done".to_string()
        }));
    }

    #[test]
    fn test_mismatched_timer_is_ignored() {
        let state = at(1, Phase::AwaitingResponse);
        let (next, effects) = transition(
            &state,
            Event::TimerFired(Timer::AutoAdvance),
            &script(),
            &Timing::default(),
        );
        assert_eq!(next, state);
        assert!(effects.is_empty());
    }
}
