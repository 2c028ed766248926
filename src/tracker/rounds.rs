//! Round state machine.
//!
//! Converts the noisy periodic control-game polls into discrete
//! round-start / round-end transitions that are credited at most once per
//! actual state change. The tracker starts in the "ended" state so that a
//! round already underway when the session attaches is observed but never
//! credited.

use std::collections::HashSet;

use crate::api::{ControlGame, GamePhase};
use crate::store::Faction;

/// Per-faction score snapshot from one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scores {
    pub arthurian: i64,
    pub tuatha_de_danann: i64,
    pub viking: i64,
}

impl Scores {
    /// The faction(s) holding the maximum score. A 2- or 3-way tie returns
    /// every tied leader.
    pub fn leaders(&self) -> Vec<Faction> {
        let top = self.arthurian.max(self.tuatha_de_danann).max(self.viking);
        let mut leaders = Vec::new();
        if self.arthurian == top {
            leaders.push(Faction::Arthurian);
        }
        if self.tuatha_de_danann == top {
            leaders.push(Faction::TuathaDeDanann);
        }
        if self.viking == top {
            leaders.push(Faction::Viking);
        }
        leaders
    }
}

impl From<&ControlGame> for Scores {
    fn from(poll: &ControlGame) -> Self {
        Self {
            arthurian: poll.arthurian_score,
            tuatha_de_danann: poll.tuatha_de_danann_score,
            viking: poll.viking_score,
        }
    }
}

/// A credited transition produced by one poll observation.
#[derive(Debug, PartialEq, Eq)]
pub enum RoundEvent {
    Started {
        round_number: u64,
        started_at: u64,
    },
    Ended {
        winners: Vec<Faction>,
        participants: Vec<String>,
    },
    /// The round ended during an API outage; the outcome is ambiguous and
    /// nobody is credited.
    Abandoned,
}

pub struct RoundTracker {
    initialized: bool,
    ended: bool,
    started_at: u64,
    round_number: u64,
    start_scores: Scores,
    down_polls: u32,
    down_budget: u32,
    round_duration_secs: u64,
    participants: HashSet<String>,
}

impl RoundTracker {
    pub fn new(round_duration_secs: u64, down_budget: u32) -> Self {
        Self {
            initialized: false,
            // A round already in progress at session start must never be
            // credited, so the tracker begins in the ended state.
            ended: true,
            started_at: 0,
            round_number: 0,
            start_scores: Scores {
                arthurian: 0,
                tuatha_de_danann: 0,
                viking: 0,
            },
            down_polls: 0,
            down_budget,
            round_duration_secs,
            participants: HashSet::new(),
        }
    }

    /// Feed one successful poll. Returns the transition it produced, if
    /// any. Re-observing the same phase is a no-op, so flapping inside a
    /// tick gap cannot double-credit.
    pub fn observe(&mut self, poll: &ControlGame, now: u64) -> Option<RoundEvent> {
        self.down_polls = 0;
        let active = poll.game_state.is_active();
        let scores = Scores::from(poll);

        if !self.initialized {
            self.initialized = true;
            self.ended = !active;
            if active {
                self.started_at = self.derive_start(now, poll.time_left);
                self.start_scores = scores;
            }
            return None;
        }

        if !active && !self.ended {
            self.ended = true;
            let mut participants: Vec<String> = self.participants.drain().collect();
            participants.sort();
            Some(RoundEvent::Ended {
                winners: scores.leaders(),
                participants,
            })
        } else if active && self.ended {
            self.ended = false;
            self.started_at = self.derive_start(now, poll.time_left);
            self.start_scores = scores;
            self.round_number += 1;
            self.participants.clear();
            Some(RoundEvent::Started {
                round_number: self.round_number,
                started_at: self.started_at,
            })
        } else {
            None
        }
    }

    /// Feed one failed poll tick (all retries exhausted). Once the outage
    /// budget is spent while a round is active, the round is force-ended
    /// without crediting anyone.
    pub fn observe_down(&mut self) -> Option<RoundEvent> {
        self.down_polls += 1;
        if !self.ended && self.down_polls >= self.down_budget {
            self.ended = true;
            self.participants.clear();
            Some(RoundEvent::Abandoned)
        } else {
            None
        }
    }

    /// Mark a player as having taken part in the current round. Ignored
    /// between rounds.
    pub fn note_participant(&mut self, name: &str) {
        if !self.ended {
            self.participants.insert(name.to_string());
        }
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    pub fn round_number(&self) -> u64 {
        self.round_number
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    fn derive_start(&self, now: u64, time_left: u64) -> u64 {
        now.saturating_sub(self.round_duration_secs.saturating_sub(time_left))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(state: GamePhase, art: i64, tua: i64, vik: i64, time_left: u64) -> ControlGame {
        ControlGame {
            time_left,
            arthurian_score: art,
            tuatha_de_danann_score: tua,
            viking_score: vik,
            game_state: state,
        }
    }

    #[test]
    fn first_poll_never_credits() {
        let mut tracker = RoundTracker::new(600, 3);
        let ev = tracker.observe(&poll(GamePhase::BasicActive, 10, 0, 0, 300), 1000);
        assert_eq!(ev, None);
        assert!(!tracker.ended());
        assert_eq!(tracker.round_number(), 0);
        // Start time is reconstructed from the remaining time.
        assert_eq!(tracker.started_at(), 700);
    }

    #[test]
    fn leaders_handle_ties() {
        let all = Scores {
            arthurian: 10,
            tuatha_de_danann: 10,
            viking: 10,
        };
        assert_eq!(
            all.leaders(),
            vec![Faction::Arthurian, Faction::TuathaDeDanann, Faction::Viking]
        );
        let two = Scores {
            arthurian: 10,
            tuatha_de_danann: 10,
            viking: 5,
        };
        assert_eq!(
            two.leaders(),
            vec![Faction::Arthurian, Faction::TuathaDeDanann]
        );
        let one = Scores {
            arthurian: 12,
            tuatha_de_danann: 5,
            viking: 3,
        };
        assert_eq!(one.leaders(), vec![Faction::Arthurian]);
    }

    #[test]
    fn flapping_does_not_double_credit() {
        // Active, Active, Waiting, Active, Waiting => exactly two rounds
        // credited, not three.
        let mut tracker = RoundTracker::new(600, 3);
        let mut ended = 0;
        let script = [
            poll(GamePhase::BasicActive, 10, 0, 0, 300),
            poll(GamePhase::BasicActive, 10, 0, 0, 290),
            poll(GamePhase::Waiting, 10, 0, 0, 0),
            poll(GamePhase::BasicActive, 0, 0, 0, 600),
            poll(GamePhase::Waiting, 0, 0, 0, 0),
        ];
        for (i, p) in script.iter().enumerate() {
            if let Some(RoundEvent::Ended { .. }) = tracker.observe(p, 1000 + i as u64 * 5) {
                ended += 1;
            }
        }
        assert_eq!(ended, 2);
    }

    #[test]
    fn repeated_waiting_is_a_noop() {
        let mut tracker = RoundTracker::new(600, 3);
        tracker.observe(&poll(GamePhase::BasicActive, 1, 2, 3, 100), 1000);
        assert!(matches!(
            tracker.observe(&poll(GamePhase::Waiting, 1, 2, 3, 0), 1005),
            Some(RoundEvent::Ended { .. })
        ));
        assert_eq!(tracker.observe(&poll(GamePhase::Waiting, 1, 2, 3, 0), 1010), None);
        assert_eq!(tracker.observe(&poll(GamePhase::Disabled, 1, 2, 3, 0), 1015), None);
    }

    #[test]
    fn winners_credited_from_ending_poll() {
        let mut tracker = RoundTracker::new(600, 3);
        tracker.observe(&poll(GamePhase::BasicActive, 0, 0, 0, 600), 1000);
        match tracker.observe(&poll(GamePhase::Waiting, 12, 5, 3, 0), 1600) {
            Some(RoundEvent::Ended { winners, .. }) => {
                assert_eq!(winners, vec![Faction::Arthurian])
            }
            other => panic!("expected round end, got {other:?}"),
        }
    }

    #[test]
    fn sustained_outage_abandons_without_credit() {
        let mut tracker = RoundTracker::new(600, 3);
        tracker.observe(&poll(GamePhase::BasicActive, 10, 0, 0, 300), 1000);
        assert_eq!(tracker.observe_down(), None);
        assert_eq!(tracker.observe_down(), None);
        assert_eq!(tracker.observe_down(), Some(RoundEvent::Abandoned));
        assert!(tracker.ended());
        // Further down ticks stay quiet.
        assert_eq!(tracker.observe_down(), None);
        // A successful poll resumes normal tracking: the game is still
        // active, so a fresh round start is recorded.
        assert!(matches!(
            tracker.observe(&poll(GamePhase::BasicActive, 10, 0, 0, 200), 1100),
            Some(RoundEvent::Started { .. })
        ));
    }

    #[test]
    fn outage_between_rounds_is_harmless() {
        let mut tracker = RoundTracker::new(600, 3);
        tracker.observe(&poll(GamePhase::Waiting, 0, 0, 0, 0), 1000);
        for _ in 0..10 {
            assert_eq!(tracker.observe_down(), None);
        }
    }

    #[test]
    fn participants_reported_at_round_end() {
        let mut tracker = RoundTracker::new(600, 3);
        tracker.observe(&poll(GamePhase::BasicActive, 0, 0, 0, 600), 1000);
        tracker.note_participant("morrigan");
        tracker.note_participant("beowulf");
        tracker.note_participant("morrigan");
        match tracker.observe(&poll(GamePhase::Waiting, 1, 0, 0, 0), 1300) {
            Some(RoundEvent::Ended { participants, .. }) => {
                assert_eq!(participants, vec!["beowulf".to_string(), "morrigan".to_string()]);
            }
            other => panic!("expected round end, got {other:?}"),
        }
        // Participation between rounds is ignored.
        tracker.note_participant("latecomer");
        tracker.observe(&poll(GamePhase::BasicActive, 0, 0, 0, 600), 1400);
        match tracker.observe(&poll(GamePhase::Waiting, 1, 0, 0, 0), 1700) {
            Some(RoundEvent::Ended { participants, .. }) => assert!(participants.is_empty()),
            other => panic!("expected round end, got {other:?}"),
        }
    }
}
