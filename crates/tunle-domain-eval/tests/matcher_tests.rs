use pretty_assertions::assert_eq;
use std::time::Duration;
use tunle_domain_eval::{
    Action, BarOutcome, Cue, Effect, GamePhase, Hint, HintLevel, MatchTimings, SequenceMatcher,
    SessionState,
};
use tunle_domain_melody::Bar;

fn bar(notes: &[u8]) -> Bar {
    Bar::from_notes(notes).expect("test bar should be valid")
}

fn matcher(bars: [&[u8]; 4]) -> SequenceMatcher {
    SequenceMatcher::new(
        [bar(bars[0]), bar(bars[1]), bar(bars[2]), bar(bars[3])],
        MatchTimings::default(),
    )
}

fn ready_to_perform(m: &mut SequenceMatcher) {
    m.dispatch(Action::AudioReady).expect("initial -> ready");
    m.dispatch(Action::StartPerform).expect("ready -> perform");
}

fn play(m: &mut SequenceMatcher, notes: &[u8]) -> Vec<Effect> {
    let mut effects = Vec::new();
    for &note in notes {
        if let Some(mut out) = m.dispatch(Action::NoteInput { note }) {
            effects.append(&mut out);
        }
    }
    effects
}

/// Dispatches the scheduled actions in due order, as the timer queue would.
fn run_scheduled(m: &mut SequenceMatcher, effects: &[Effect]) -> Vec<Effect> {
    let mut scheduled: Vec<(Duration, Action)> = effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Schedule { delay, action } => Some((*delay, *action)),
            _ => None,
        })
        .collect();
    scheduled.sort_by_key(|(delay, _)| *delay);

    let mut produced = Vec::new();
    for (_, action) in scheduled {
        if let Some(mut out) = m.dispatch(action) {
            produced.append(&mut out);
        }
    }
    produced
}

fn wrong_then_clear(m: &mut SequenceMatcher, note: u8) -> Vec<Effect> {
    let effects = play(m, &[note]);
    m.dispatch(Action::ClearBarFailing);
    effects
}

#[test]
fn perfect_bar_completes_once_and_scores_hearts() {
    let mut m = matcher([&[1, 2, 3], &[1], &[1], &[1]]);
    ready_to_perform(&mut m);

    let effects = play(&mut m, &[1, 2, 3]);

    let resolved: Vec<_> = effects
        .iter()
        .filter(|e| matches!(e, Effect::BarResolved { .. }))
        .collect();
    assert_eq!(
        resolved,
        vec![&Effect::BarResolved {
            bar: 0,
            outcome: BarOutcome::Completed
        }]
    );
    assert!(effects.contains(&Effect::PlayCue(Cue::BarComplete)));
    assert!(effects.contains(&Effect::LoadBar { bar: 1 }));

    let state = m.state();
    assert_eq!(state.score, 4);
    assert_eq!(state.current_bar_index, 1);
    assert_eq!(state.current_note_index, 0);
    assert_eq!(state.game_phase, GamePhase::Initial);
    assert_eq!(state.completed_bars, [true, false, false, false]);
}

#[test]
fn note_input_outside_perform_is_ignored() {
    let mut m = matcher([&[1], &[1], &[1], &[1]]);
    assert!(m.dispatch(Action::NoteInput { note: 1 }).is_none());

    m.dispatch(Action::AudioReady);
    m.dispatch(Action::StartPractice);
    assert!(m.dispatch(Action::NoteInput { note: 1 }).is_none());
    assert_eq!(m.state().current_note_index, 0);
}

#[test]
fn mismatch_costs_one_heart_and_resets_position() {
    let mut m = matcher([&[1, 2, 3], &[1], &[1], &[1]]);
    ready_to_perform(&mut m);

    play(&mut m, &[1, 2]);
    let effects = play(&mut m, &[7]);

    assert_eq!(effects[0], Effect::PlayCue(Cue::Wrong));
    assert!(effects.contains(&Effect::Schedule {
        delay: MatchTimings::default().feedback_window,
        action: Action::ClearBarFailing,
    }));
    let state = m.state();
    assert_eq!(state.bar_hearts[0], 3);
    assert_eq!(state.current_note_index, 0);
    assert!(state.is_bar_failing);
    assert_eq!(state.game_phase, GamePhase::Perform);
}

#[test]
fn mismatch_inside_feedback_window_is_not_penalized_twice() {
    let mut m = matcher([&[1, 2], &[1], &[1], &[1]]);
    ready_to_perform(&mut m);

    play(&mut m, &[5]);
    let second = play(&mut m, &[6, 7]);

    assert!(second.is_empty());
    assert_eq!(m.state().bar_hearts[0], 3);

    m.dispatch(Action::ClearBarFailing).expect("window closes");
    play(&mut m, &[5]);
    assert_eq!(m.state().bar_hearts[0], 2);
}

#[test]
fn practice_and_perform_stay_open_during_the_feedback_window() {
    let mut m = matcher([&[1, 2], &[1], &[1], &[1]]);
    ready_to_perform(&mut m);
    play(&mut m, &[4]);
    assert!(m.state().is_bar_failing);
    assert_eq!(m.state().bar_hearts, [3, 4, 4, 4]);

    let effects = m.dispatch(Action::StartPractice).expect("practice re-entry");
    assert_eq!(effects, vec![Effect::PlayBarRecording { bar: 0 }]);
    assert_eq!(m.state().game_phase, GamePhase::Practice);

    m.dispatch(Action::StartPerform).expect("perform re-entry");
    assert_eq!(m.state().game_phase, GamePhase::Perform);
    assert_eq!(m.state().current_note_index, 0);

    // Still inside the window: another mismatch is not charged.
    assert!(play(&mut m, &[6]).is_empty());
    assert_eq!(m.state().bar_hearts[0], 3);
}

#[test]
fn hint_level_follows_remaining_hearts() {
    let mut m = matcher([&[1, 2, 3, 4], &[1], &[1], &[1]]);
    ready_to_perform(&mut m);

    wrong_then_clear(&mut m, 8);
    assert_eq!(m.state().hint_level, HintLevel::None);
    assert_eq!(m.visible_hint(), None);

    wrong_then_clear(&mut m, 8);
    assert_eq!(m.state().hint_level, HintLevel::FirstTwo);
    assert_eq!(m.visible_hint(), Some(Hint { position: 0, note: 1 }));
    play(&mut m, &[1, 2]);
    assert_eq!(m.visible_hint(), None, "level 1 only covers the first two notes");

    wrong_then_clear(&mut m, 8);
    assert_eq!(m.state().hint_level, HintLevel::Full);
    play(&mut m, &[1, 2, 3]);
    assert_eq!(m.visible_hint(), Some(Hint { position: 3, note: 4 }));
}

#[test]
fn reset_hint_level_is_explicit() {
    let mut m = matcher([&[1, 2], &[1], &[1], &[1]]);
    ready_to_perform(&mut m);
    wrong_then_clear(&mut m, 8);
    wrong_then_clear(&mut m, 8);
    assert_eq!(m.state().hint_level, HintLevel::FirstTwo);

    m.dispatch(Action::ResetHintLevel);
    assert_eq!(m.state().hint_level, HintLevel::None);
}

#[test]
fn practice_playback_arms_first_note_hint_only() {
    let mut m = matcher([&[3, 4, 5], &[1], &[1], &[1]]);
    m.dispatch(Action::AudioReady);

    let effects = m.dispatch(Action::StartPractice).expect("ready -> practice");
    assert_eq!(effects, vec![Effect::PlayBarRecording { bar: 0 }]);
    assert_eq!(m.visible_hint(), None);

    m.dispatch(Action::PracticePlaybackFinished);
    assert_eq!(m.visible_hint(), Some(Hint { position: 0, note: 3 }));

    m.dispatch(Action::StartPerform);
    assert_eq!(m.visible_hint(), Some(Hint { position: 0, note: 3 }));
    play(&mut m, &[3]);
    assert_eq!(m.visible_hint(), None);
}

#[test]
fn replaying_practice_keeps_hearts_and_position() {
    let mut m = matcher([&[1, 2, 3], &[1], &[1], &[1]]);
    ready_to_perform(&mut m);
    play(&mut m, &[1]);

    m.dispatch(Action::StartPractice).expect("perform -> practice");
    m.dispatch(Action::StartPractice).expect("practice is replayable");

    let state = m.state();
    assert_eq!(state.bar_hearts[0], 4);
    assert_eq!(state.current_note_index, 1);
    assert_eq!(state.game_phase, GamePhase::Practice);
}

#[test]
fn exhausted_hearts_fail_the_bar_without_further_input() {
    let mut m = matcher([&[1], &[2, 3], &[1], &[1]]);
    ready_to_perform(&mut m);

    wrong_then_clear(&mut m, 8);
    wrong_then_clear(&mut m, 8);
    wrong_then_clear(&mut m, 8);
    let last = play(&mut m, &[8]);

    assert!(m.state().failed_bars[0]);
    assert!(m.state().is_bar_failing);
    assert!(play(&mut m, &[1]).is_empty(), "failed bar takes no more input");

    let timings = MatchTimings::default();
    assert!(last.contains(&Effect::Schedule {
        delay: timings.failure_cue_delay + timings.failed_advance_delay,
        action: Action::AdvanceFailedBar { bar: 0 },
    }));

    let produced = run_scheduled(&mut m, &last);
    assert_eq!(
        produced,
        vec![
            Effect::PlayCue(Cue::Wrong),
            Effect::BarResolved {
                bar: 0,
                outcome: BarOutcome::Failed
            },
            Effect::LoadBar { bar: 1 },
        ]
    );
    let state = m.state();
    assert_eq!(state.current_bar_index, 1);
    assert_eq!(state.score, 0);
    assert!(!state.is_bar_failing);
    assert_eq!(state.hint_level, HintLevel::None);
}

#[test]
fn stale_advance_for_previous_bar_is_ignored() {
    let mut m = matcher([&[1], &[2], &[1], &[1]]);
    ready_to_perform(&mut m);
    play(&mut m, &[1]);

    assert!(m.dispatch(Action::AdvanceFailedBar { bar: 0 }).is_none());
    assert_eq!(m.state().current_bar_index, 1);
}

#[test]
fn four_bar_session_scores_twelve() {
    let mut m = matcher([
        &[1, 2, 3, 4],
        &[5, 6, 7, 8, 7, 6],
        &[1, 3, 5, 3, 1],
        &[2, 4, 6],
    ]);

    ready_to_perform(&mut m);
    play(&mut m, &[1, 2, 3, 4]);
    assert_eq!(m.state().score, 4);

    ready_to_perform(&mut m);
    wrong_then_clear(&mut m, 1);
    wrong_then_clear(&mut m, 1);
    wrong_then_clear(&mut m, 1);
    let failure = play(&mut m, &[1]);
    run_scheduled(&mut m, &failure);
    assert_eq!(m.state().score, 4);
    assert!(m.state().failed_bars[1]);

    ready_to_perform(&mut m);
    play(&mut m, &[1, 3, 5, 3, 1]);

    ready_to_perform(&mut m);
    let last = play(&mut m, &[2, 4, 6]);

    let state = m.state().clone();
    assert_eq!(state.score, 12);
    assert_eq!(state.completed_bars, [true, false, true, true]);
    assert_eq!(state.failed_bars, [false, true, false, false]);
    assert_eq!(state.game_phase, GamePhase::Ended);
    assert!(state.session_complete);

    let summary = last.iter().find_map(|e| match e {
        Effect::SessionEnded(summary) => Some(*summary),
        _ => None,
    });
    let summary = summary.expect("session end carries a summary");
    assert_eq!(summary.score, 12);
    assert_eq!(summary.bar_hearts, [4, 0, 4, 4]);

    let reveal = run_scheduled(&mut m, &last);
    assert_eq!(reveal, vec![Effect::PlayFullTune]);
    assert!(m.state().summary_revealed);
    assert!(play(&mut m, &[2]).is_empty());
}

#[test]
fn reset_returns_fresh_state() {
    let mut m = matcher([&[1], &[1], &[1], &[1]]);
    ready_to_perform(&mut m);
    play(&mut m, &[2]);

    m.dispatch(Action::Reset);
    assert_eq!(m.state(), &SessionState::default());
}

#[test]
fn hearts_never_increase_across_retries() {
    let mut m = matcher([&[1, 2], &[1], &[1], &[1]]);
    ready_to_perform(&mut m);

    let mut last = m.state().bar_hearts[0];
    for note in [8, 1, 8, 1] {
        play(&mut m, &[note]);
        m.dispatch(Action::ClearBarFailing);
        let hearts = m.state().bar_hearts[0];
        assert!(hearts <= last);
        last = hearts;
    }
    assert_eq!(last, 2);
}
