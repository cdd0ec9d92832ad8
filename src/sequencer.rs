// src/sequencer.rs
//! Timed Rest / Cue / Left / Right / Hold protocol for motor-imagery recordings.
//!
//! The sequencer never reads a clock. Callers pass the time elapsed since the
//! run started and [`Sequencer::advance`] replays every transition that became
//! due, using the scheduled entry time of each phase so coarse ticks do not
//! accumulate drift.
use std::time::Duration;
use thiserror::Error;
use crate::types::{ClassLabel, Phase};

/// Blank fixation cross shown before every task cue.
pub const CUE_DURATION: Duration = Duration::from_millis(1000);
/// Recording starts this long after a task cue appears, skipping the onset artifact.
pub const RECORDING_DELAY: Duration = Duration::from_millis(300);
/// Pause between the end of the Right task and the next round.
pub const POST_TASK_HOLD: Duration = Duration::from_millis(1000);

const DEFAULT_ROUNDS: u32 = 1;
const DEFAULT_REST_MS: u64 = 1000;
const DEFAULT_LEFT_MS: u64 = 3000;
const DEFAULT_RIGHT_MS: u64 = 3000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequencerError {
    #[error("an acquisition run is already in progress")]
    AlreadyRunning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcquisitionSettings {
    pub rounds: u32,
    pub rest: Duration,
    pub left: Duration,
    pub right: Duration,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            rest: Duration::from_millis(DEFAULT_REST_MS),
            left: Duration::from_millis(DEFAULT_LEFT_MS),
            right: Duration::from_millis(DEFAULT_RIGHT_MS),
        }
    }
}

impl AcquisitionSettings {
    /// Parses the text boxes; anything unparsable or negative falls back to its default.
    pub fn from_inputs(rounds: &str, rest_secs: &str, left_secs: &str, right_secs: &str) -> Self {
        let rounds = match rounds.trim().parse::<i64>() {
            Ok(n) if n >= 0 => u32::try_from(n).unwrap_or(u32::MAX),
            _ => {
                log::warn!("invalid round count {rounds:?}, using {DEFAULT_ROUNDS}");
                DEFAULT_ROUNDS
            }
        };
        Self {
            rounds,
            rest: parse_seconds("rest", rest_secs, DEFAULT_REST_MS),
            left: parse_seconds("left", left_secs, DEFAULT_LEFT_MS),
            right: parse_seconds("right", right_secs, DEFAULT_RIGHT_MS),
        }
    }
}

fn parse_seconds(name: &str, text: &str, default_ms: u64) -> Duration {
    match text.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Duration::from_millis((secs * 1000.0) as u64),
        _ => {
            log::warn!("invalid {name} duration {text:?}, using {default_ms} ms");
            Duration::from_millis(default_ms)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerEvent {
    PhaseEntered(Phase),
    RecordingStarted(ClassLabel),
    RecordingStopped,
    Finished,
}

pub struct Sequencer {
    settings: AcquisitionSettings,
    phase: Phase,
    /// Task the next cue leads into.
    next_task: ClassLabel,
    rounds_remaining: u32,
    /// Scheduled entry time of the current phase.
    phase_started: Duration,
    recording: bool,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            settings: AcquisitionSettings::default(),
            phase: Phase::Idle,
            next_task: ClassLabel::Left,
            rounds_remaining: 0,
            phase_started: Duration::ZERO,
            recording: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.phase, Phase::Idle | Phase::Finished)
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Label of the active task phase, if any.
    pub fn current_class(&self) -> Option<ClassLabel> {
        self.phase.class()
    }

    pub fn rounds_remaining(&self) -> u32 {
        self.rounds_remaining
    }

    pub fn instruction(&self) -> &'static str {
        match self.phase {
            Phase::Idle | Phase::Cue => "",
            Phase::Rest => "Rest",
            Phase::Left => "Left",
            Phase::Right | Phase::Hold => "Right",
            Phase::Finished => "Collection finish",
        }
    }

    pub fn time_remaining(&self, now: Duration) -> Option<Duration> {
        self.phase_duration()
            .map(|d| (self.phase_started + d).saturating_sub(now))
    }

    /// Begins a run at `now`. A run that has not reached `Finished` cannot be restarted.
    pub fn start(
        &mut self,
        settings: AcquisitionSettings,
        now: Duration,
    ) -> Result<Vec<SequencerEvent>, SequencerError> {
        if self.is_running() {
            return Err(SequencerError::AlreadyRunning);
        }
        self.settings = settings;
        self.rounds_remaining = settings.rounds;
        self.next_task = ClassLabel::Left;
        self.recording = false;
        let mut events = Vec::new();
        self.begin_round(now, &mut events);
        Ok(events)
    }

    /// Applies every transition due at `now`.
    pub fn advance(&mut self, now: Duration) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        while let Some(duration) = self.phase_duration() {
            if let Some(class) = self.phase.class() {
                let record_at = self.phase_started + RECORDING_DELAY;
                if !self.recording && RECORDING_DELAY < duration && now >= record_at {
                    self.recording = true;
                    events.push(SequencerEvent::RecordingStarted(class));
                }
            }
            let deadline = self.phase_started + duration;
            if now < deadline {
                break;
            }
            if self.recording {
                self.recording = false;
                events.push(SequencerEvent::RecordingStopped);
            }
            match self.phase {
                Phase::Rest => self.enter(Phase::Cue, deadline, &mut events),
                Phase::Cue => {
                    let task = match self.next_task {
                        ClassLabel::Left => Phase::Left,
                        ClassLabel::Right => Phase::Right,
                    };
                    self.enter(task, deadline, &mut events);
                }
                Phase::Left => {
                    self.next_task = ClassLabel::Right;
                    self.enter(Phase::Rest, deadline, &mut events);
                }
                Phase::Right => self.enter(Phase::Hold, deadline, &mut events),
                Phase::Hold => {
                    self.rounds_remaining = self.rounds_remaining.saturating_sub(1);
                    self.next_task = ClassLabel::Left;
                    self.begin_round(deadline, &mut events);
                }
                Phase::Idle | Phase::Finished => break,
            }
        }
        events
    }

    fn begin_round(&mut self, at: Duration, events: &mut Vec<SequencerEvent>) {
        if self.rounds_remaining == 0 {
            self.enter(Phase::Finished, at, events);
            events.push(SequencerEvent::Finished);
        } else {
            self.enter(Phase::Rest, at, events);
        }
    }

    fn enter(&mut self, phase: Phase, at: Duration, events: &mut Vec<SequencerEvent>) {
        self.phase = phase;
        self.phase_started = at;
        events.push(SequencerEvent::PhaseEntered(phase));
    }

    fn phase_duration(&self) -> Option<Duration> {
        match self.phase {
            Phase::Rest => Some(self.settings.rest),
            Phase::Cue => Some(CUE_DURATION),
            Phase::Left => Some(self.settings.left),
            Phase::Right => Some(self.settings.right),
            Phase::Hold => Some(POST_TASK_HOLD),
            Phase::Idle | Phase::Finished => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn two_rounds() -> AcquisitionSettings {
        AcquisitionSettings {
            rounds: 2,
            rest: ms(1000),
            left: ms(3000),
            right: ms(3000),
        }
    }

    // Ticks every `step` ms and records when each event was observed.
    fn run_timeline(step: u64) -> Vec<(u64, SequencerEvent)> {
        let mut seq = Sequencer::new();
        let mut timeline: Vec<(u64, SequencerEvent)> = seq
            .start(two_rounds(), Duration::ZERO)
            .unwrap()
            .into_iter()
            .map(|e| (0, e))
            .collect();
        let mut t = 0;
        while seq.is_running() {
            t += step;
            timeline.extend(seq.advance(ms(t)).into_iter().map(|e| (t, e)));
        }
        timeline
    }

    #[test]
    fn two_rounds_follow_the_protocol() {
        use Phase::*;
        let timeline = run_timeline(10);
        let phases: Vec<(u64, Phase)> = timeline
            .iter()
            .filter_map(|(t, e)| match e {
                SequencerEvent::PhaseEntered(p) => Some((*t, *p)),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                (0, Rest),
                (1000, Cue),
                (2000, Left),
                (5000, Rest),
                (6000, Cue),
                (7000, Right),
                (10000, Hold),
                (11000, Rest),
                (12000, Cue),
                (13000, Left),
                (16000, Rest),
                (17000, Cue),
                (18000, Right),
                (21000, Hold),
                (22000, Finished),
            ]
        );
        let recording: Vec<(u64, SequencerEvent)> = timeline
            .iter()
            .filter(|(_, e)| {
                matches!(
                    e,
                    SequencerEvent::RecordingStarted(_) | SequencerEvent::RecordingStopped
                )
            })
            .cloned()
            .collect();
        assert_eq!(
            recording,
            vec![
                (2300, SequencerEvent::RecordingStarted(ClassLabel::Left)),
                (5000, SequencerEvent::RecordingStopped),
                (7300, SequencerEvent::RecordingStarted(ClassLabel::Right)),
                (10000, SequencerEvent::RecordingStopped),
                (13300, SequencerEvent::RecordingStarted(ClassLabel::Left)),
                (16000, SequencerEvent::RecordingStopped),
                (18300, SequencerEvent::RecordingStarted(ClassLabel::Right)),
                (21000, SequencerEvent::RecordingStopped),
            ]
        );
        assert_eq!(timeline.last(), Some(&(22000, SequencerEvent::Finished)));
    }

    #[test]
    fn one_late_tick_replays_every_transition() {
        let mut seq = Sequencer::new();
        seq.start(two_rounds(), Duration::ZERO).unwrap();
        let events = seq.advance(ms(60_000));
        let entered = events
            .iter()
            .filter(|e| matches!(e, SequencerEvent::PhaseEntered(_)))
            .count();
        assert_eq!(entered, 14);
        assert_eq!(events.last(), Some(&SequencerEvent::Finished));
        assert_eq!(seq.phase(), Phase::Finished);
        assert!(!seq.is_recording());
        assert_eq!(seq.instruction(), "Collection finish");
    }

    #[test]
    fn recording_window_and_instructions() {
        let mut seq = Sequencer::new();
        seq.start(two_rounds(), Duration::ZERO).unwrap();
        assert_eq!(seq.instruction(), "Rest");
        seq.advance(ms(1500));
        assert_eq!(seq.phase(), Phase::Cue);
        assert_eq!(seq.instruction(), "");
        seq.advance(ms(2299));
        assert_eq!(seq.instruction(), "Left");
        assert_eq!(seq.current_class(), Some(ClassLabel::Left));
        assert!(!seq.is_recording());
        seq.advance(ms(2300));
        assert!(seq.is_recording());
        assert_eq!(seq.time_remaining(ms(2300)), Some(ms(2700)));
        seq.advance(ms(5000));
        assert!(!seq.is_recording());
        assert_eq!(seq.phase(), Phase::Rest);
        assert_eq!(seq.rounds_remaining(), 2);
    }

    #[test]
    fn right_task_is_held_before_the_round_ends() {
        let mut seq = Sequencer::new();
        let settings = AcquisitionSettings {
            rounds: 1,
            ..two_rounds()
        };
        seq.start(settings, Duration::ZERO).unwrap();
        let events = seq.advance(ms(10_000));
        assert!(events.contains(&SequencerEvent::RecordingStopped));
        assert_eq!(events.last(), Some(&SequencerEvent::PhaseEntered(Phase::Hold)));
        assert_eq!(seq.phase(), Phase::Hold);
        assert_eq!(seq.instruction(), "Right");
        assert!(!seq.is_recording());
        assert_eq!(seq.current_class(), None);
        assert_eq!(seq.rounds_remaining(), 1);
        assert_eq!(seq.time_remaining(ms(10_400)), Some(ms(600)));
        assert!(seq.advance(ms(10_999)).is_empty());
        assert_eq!(
            seq.advance(ms(11_000)),
            vec![
                SequencerEvent::PhaseEntered(Phase::Finished),
                SequencerEvent::Finished
            ]
        );
        assert_eq!(seq.rounds_remaining(), 0);
    }

    #[test]
    fn restart_while_running_is_rejected() {
        let mut seq = Sequencer::new();
        seq.start(two_rounds(), Duration::ZERO).unwrap();
        assert_eq!(
            seq.start(two_rounds(), ms(10)),
            Err(SequencerError::AlreadyRunning)
        );
        seq.advance(ms(22_000));
        assert_eq!(seq.phase(), Phase::Finished);
        let events = seq.start(two_rounds(), ms(25_000)).unwrap();
        assert_eq!(events, vec![SequencerEvent::PhaseEntered(Phase::Rest)]);
        assert_eq!(seq.time_remaining(ms(25_000)), Some(ms(1000)));
    }

    #[test]
    fn zero_rounds_finish_immediately() {
        let mut seq = Sequencer::new();
        let settings = AcquisitionSettings {
            rounds: 0,
            ..AcquisitionSettings::default()
        };
        let events = seq.start(settings, Duration::ZERO).unwrap();
        assert_eq!(
            events,
            vec![
                SequencerEvent::PhaseEntered(Phase::Finished),
                SequencerEvent::Finished
            ]
        );
        assert!(!seq.is_running());
    }

    #[test]
    fn task_shorter_than_onset_delay_never_records() {
        let mut seq = Sequencer::new();
        let settings = AcquisitionSettings {
            rounds: 1,
            rest: ms(0),
            left: ms(200),
            right: ms(200),
        };
        seq.start(settings, Duration::ZERO).unwrap();
        let events: Vec<SequencerEvent> = (0..400).flat_map(|i| seq.advance(ms(i * 10))).collect();
        assert!(!events
            .iter()
            .any(|e| matches!(e, SequencerEvent::RecordingStarted(_))));
        assert_eq!(seq.phase(), Phase::Finished);
    }

    #[test]
    fn inputs_fall_back_to_defaults() {
        let parsed = AcquisitionSettings::from_inputs("2", "1.5", "abc", "-3");
        assert_eq!(parsed.rounds, 2);
        assert_eq!(parsed.rest, ms(1500));
        assert_eq!(parsed.left, ms(3000));
        assert_eq!(parsed.right, ms(3000));
        let parsed = AcquisitionSettings::from_inputs("x", " 2 ", "4", "0.25");
        assert_eq!(parsed.rounds, 1);
        assert_eq!(parsed.rest, ms(2000));
        assert_eq!(parsed.left, ms(4000));
        assert_eq!(parsed.right, ms(250));
        assert_eq!(AcquisitionSettings::from_inputs("-1", "", "", "").rounds, 1);
    }
}
