use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use ns_api::{create_session, CreateSessionOptions, PlaybackSession};
use ns_runtime::{HeadlessPresenter, InputBinding, PlayerEvent, PresentedEvent, StateMap};
use tokio::task::LocalSet;
use tracing::debug;

use crate::source::{read_sources, read_test_case};
use crate::{ExpectedEvent, NsToolError, TestAction, TestCase};

const MAX_STEPS: usize = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub observed_events: Vec<ExpectedEvent>,
    pub consumed_actions: usize,
    pub steps: usize,
}

type EventLog = Rc<RefCell<Vec<ExpectedEvent>>>;

fn flush_presented(presenter: &HeadlessPresenter, log: &EventLog) {
    let mut log = log.borrow_mut();
    for event in presenter.take_events() {
        log.push(match event {
            PresentedEvent::Print { author, text, .. } => ExpectedEvent::Print { author, text },
            PresentedEvent::Character {
                id,
                appearance,
                visible,
            } => ExpectedEvent::Character {
                id,
                appearance,
                visible,
            },
        });
    }
}

/// Plays the case on a paused clock, so timed waits resolve instantly.
pub fn run_case(case_dir: &Path, case: &TestCase) -> Result<RunReport, NsToolError> {
    let sources = read_sources(case_dir)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .map_err(NsToolError::Runtime)?;
    LocalSet::new().block_on(&runtime, run_session(sources, case))
}

async fn run_session(
    sources: BTreeMap<String, String>,
    case: &TestCase,
) -> Result<RunReport, NsToolError> {
    let session = create_session(CreateSessionOptions {
        sources,
        entry_script: Some(case.entry_script.clone()),
        player: case.player.clone(),
        ..CreateSessionOptions::default()
    })?;

    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    {
        let log = log.clone();
        let presenter = session.presenter.clone();
        session.player.subscribe(move |event| {
            if let PlayerEvent::Error { code, .. } = event {
                flush_presented(&presenter, &log);
                log.borrow_mut().push(ExpectedEvent::Error { code: code.clone() });
            }
        });
    }

    session.start().await?;
    let mut action_index = 0usize;
    let mut saved: Option<StateMap> = None;

    for step in 1..=MAX_STEPS {
        session.player.idle().await;
        flush_presented(&session.presenter, &log);

        if !session.player.is_playing() {
            log.borrow_mut().push(ExpectedEvent::End);
            if action_index != case.actions.len() {
                return Err(NsToolError::UnusedActions {
                    used: action_index,
                    total: case.actions.len(),
                });
            }
            let observed_events = log.borrow().clone();
            return Ok(RunReport {
                observed_events,
                consumed_actions: action_index,
                steps: step,
            });
        }

        log.borrow_mut().push(ExpectedEvent::Wait);
        let event_index = log.borrow().len() - 1;
        match case.actions.get(action_index) {
            Some(action) => {
                action_index += 1;
                debug!(kind = action.kind_name(), event_index, "applying action");
                apply_action(&session, action, event_index, &mut saved).await?;
            }
            None => session.control(InputBinding::Continue).pulse(),
        }
    }

    Err(NsToolError::GuardExceeded {
        max_steps: MAX_STEPS,
    })
}

async fn apply_action(
    session: &PlaybackSession,
    action: &TestAction,
    event_index: usize,
    saved: &mut Option<StateMap>,
) -> Result<(), NsToolError> {
    match action {
        TestAction::Continue => session.control(InputBinding::Continue).pulse(),
        TestAction::ToggleSkip => session.control(InputBinding::ToggleSkip).pulse(),
        TestAction::Save => *saved = Some(session.save_game()?),
        TestAction::Load => {
            let state = saved
                .as_ref()
                .ok_or(NsToolError::NothingSaved { event_index })?;
            session.load_game(state).await?;
        }
        TestAction::Rewind { line_index } => {
            session.player.rewind(*line_index).await?;
        }
    }
    Ok(())
}

pub fn assert_case(case_dir: &Path, case_path: &Path) -> Result<(), NsToolError> {
    let case = read_test_case(case_path)?;
    let report = run_case(case_dir, &case)?;

    if report.observed_events.len() != case.expected_events.len() {
        let observed = serde_json::to_string_pretty(&report.observed_events)
            .map_err(NsToolError::EventSerialize)?;
        return Err(NsToolError::EventCountMismatch {
            expected: case.expected_events.len(),
            actual: report.observed_events.len(),
            observed,
        });
    }

    for (index, (expected, actual)) in case
        .expected_events
        .iter()
        .zip(report.observed_events.iter())
        .enumerate()
    {
        if expected != actual {
            let expected = serde_json::to_string(expected).map_err(NsToolError::EventSerialize)?;
            let actual = serde_json::to_string(actual).map_err(NsToolError::EventSerialize)?;
            return Err(NsToolError::EventMismatch {
                index,
                expected,
                actual,
            });
        }
    }

    Ok(())
}
