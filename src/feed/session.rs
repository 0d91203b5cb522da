//! Swipe-feed traversal over a fetched list of ready profiles.
//!
//! One card is shown at a time. Leaving a card (skip, like, or a decision
//! after a call) starts a swipe; the index advances once the swipe animation
//! has had [`SWIPE_DELAY`] to play. Walking past the last card reaches the
//! terminal "seen everyone" state, left only through [`FeedSession::reset`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::profiles::FeedCard;

/// Time between a swipe and the index advancing.
pub const SWIPE_DELAY: Duration = Duration::from_millis(300);

/// Like or pass on a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Left,
    Right,
}

impl From<Decision> for SwipeDirection {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Yes => Self::Right,
            Decision::No => Self::Left,
        }
    }
}

/// Voice call overlay state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallPhase {
    Idle,
    /// Microphone requested, session opening.
    Connecting { agent_id: String },
    Live { agent_id: String },
    /// Call ended; waiting for yes/no.
    AwaitingDecision,
}

/// A swipe waiting for its animation to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSwipe {
    pub direction: SwipeDirection,
    pub due: Instant,
}

/// `position` of `total`, 1-based and capped at `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub position: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("No more profiles")]
    Exhausted,

    #[error("This user's agent is not available")]
    AgentUnavailable,

    #[error("A call is already in progress")]
    CallInProgress,

    #[error("No call to end")]
    NoCall,

    #[error("No decision pending")]
    NoDecisionPending,

    #[error("Card is still swiping")]
    SwipeInProgress,
}

/// Client-side feed state.
#[derive(Debug, Clone)]
pub struct FeedSession {
    cards: Vec<FeedCard>,
    index: usize,
    decisions: HashMap<String, Decision>,
    phase: CallPhase,
    swipe: Option<PendingSwipe>,
}

impl FeedSession {
    pub fn new(cards: Vec<FeedCard>) -> Self {
        Self {
            cards,
            index: 0,
            decisions: HashMap::new(),
            phase: CallPhase::Idle,
            swipe: None,
        }
    }

    /// The card on screen, `None` once everyone has been seen.
    pub fn current(&self) -> Option<&FeedCard> {
        self.cards.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn phase(&self) -> &CallPhase {
        &self.phase
    }

    pub fn pending_swipe(&self) -> Option<PendingSwipe> {
        self.swipe
    }

    pub fn decision(&self, profile_id: &str) -> Option<Decision> {
        self.decisions.get(profile_id).copied()
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.cards.len()
    }

    pub fn likes_count(&self) -> usize {
        self.decisions.values().filter(|d| **d == Decision::Yes).count()
    }

    pub fn progress(&self) -> Progress {
        let total = self.cards.len();
        Progress {
            position: (self.index + 1).min(total),
            total,
        }
    }

    /// Open a call with the current card's agent. Returns the agent id.
    pub fn start_call(&mut self) -> Result<String, FeedError> {
        self.ensure_idle()?;
        let card = self.current().ok_or(FeedError::Exhausted)?;
        let agent_id = card
            .agent_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(FeedError::AgentUnavailable)?
            .to_string();
        self.phase = CallPhase::Connecting {
            agent_id: agent_id.clone(),
        };
        Ok(agent_id)
    }

    pub fn call_connected(&mut self) -> Result<(), FeedError> {
        match std::mem::replace(&mut self.phase, CallPhase::Idle) {
            CallPhase::Connecting { agent_id } => {
                self.phase = CallPhase::Live { agent_id };
                Ok(())
            }
            other => {
                self.phase = other;
                Err(FeedError::NoCall)
            }
        }
    }

    /// Microphone denied or the session failed to open; the overlay closes
    /// without a decision prompt.
    pub fn call_failed(&mut self) {
        if matches!(self.phase, CallPhase::Connecting { .. } | CallPhase::Live { .. }) {
            self.phase = CallPhase::Idle;
        }
    }

    /// Close the call and ask for a decision.
    pub fn end_call(&mut self) -> Result<(), FeedError> {
        match self.phase {
            CallPhase::Connecting { .. } | CallPhase::Live { .. } => {
                self.phase = CallPhase::AwaitingDecision;
                Ok(())
            }
            _ => Err(FeedError::NoCall),
        }
    }

    /// Record the post-call decision and swipe the card away.
    pub fn decide(&mut self, decision: Decision, now: Instant) -> Result<(), FeedError> {
        if self.phase != CallPhase::AwaitingDecision {
            return Err(FeedError::NoDecisionPending);
        }
        self.phase = CallPhase::Idle;
        self.record_and_swipe(decision, now)
    }

    /// Pass without calling.
    pub fn skip(&mut self, now: Instant) -> Result<(), FeedError> {
        self.ensure_idle()?;
        self.record_and_swipe(Decision::No, now)
    }

    /// Like without calling.
    pub fn like(&mut self, now: Instant) -> Result<(), FeedError> {
        self.ensure_idle()?;
        self.record_and_swipe(Decision::Yes, now)
    }

    /// Advance the index if the pending swipe is due. Returns whether it
    /// advanced.
    pub fn finish_swipe(&mut self, now: Instant) -> bool {
        match self.swipe {
            Some(swipe) if now >= swipe.due => {
                self.swipe = None;
                self.index = (self.index + 1).min(self.cards.len());
                true
            }
            _ => false,
        }
    }

    /// Back to the first card. Decisions are kept.
    pub fn reset(&mut self) {
        self.index = 0;
        self.swipe = None;
        self.phase = CallPhase::Idle;
    }

    fn ensure_idle(&self) -> Result<(), FeedError> {
        if self.swipe.is_some() {
            return Err(FeedError::SwipeInProgress);
        }
        if self.phase != CallPhase::Idle {
            return Err(FeedError::CallInProgress);
        }
        Ok(())
    }

    fn record_and_swipe(&mut self, decision: Decision, now: Instant) -> Result<(), FeedError> {
        if self.swipe.is_some() {
            return Err(FeedError::SwipeInProgress);
        }
        let id = self.current().ok_or(FeedError::Exhausted)?.id.clone();
        self.decisions.insert(id, decision);
        self.swipe = Some(PendingSwipe {
            direction: decision.into(),
            due: now + SWIPE_DELAY,
        });
        Ok(())
    }
}
