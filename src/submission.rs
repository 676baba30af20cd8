//! Flag submission: the server-side verdict and the dialog state the browser keeps while a
//! submission is in flight.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::CtfError;
use crate::model::{SessionUser, SolveRecord};
use crate::store::{SolveStore, SolveWrite};

/// How long the success message stays up before the dialog refreshes scores and closes.
pub const SOLVE_DISPLAY_DELAY_MS: u32 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Solved { points_awarded: i32 },
    AlreadySolved,
}

/// Checks `candidate` against the challenge's flag and records a solve if it matches.
///
/// The caller is rejected before the store is touched when there is no user. A wrong flag
/// never writes. A pair that is already solved is reported as `AlreadySolved`, both when the
/// pre-check sees it and when the store refuses a concurrent second write.
pub fn submit_flag<S: SolveStore>(
    store: &S,
    user: Option<&SessionUser>,
    challenge_id: &str,
    candidate: &str,
    now: NaiveDateTime,
) -> Result<SubmitOutcome, CtfError> {
    let user = user.ok_or(CtfError::Unauthenticated)?;

    let candidate = candidate.trim();
    if candidate.is_empty() {
        return Err(CtfError::validation("Flag cannot be empty"));
    }

    let challenge = store
        .challenge(challenge_id)
        .map_err(|e| CtfError::Submission(e.to_string()))?
        .ok_or_else(|| CtfError::NotFound("Challenge".to_string()))?;

    if candidate != challenge.flag.trim() {
        return Err(CtfError::IncorrectFlag);
    }

    let existing = store
        .find_solve(&user.id, &challenge.id)
        .map_err(|e| CtfError::Submission(e.to_string()))?;
    if existing.map_or(false, |s| s.solved) {
        return Ok(SubmitOutcome::AlreadySolved);
    }

    let solve = SolveRecord {
        user_id: user.id.clone(),
        challenge_id: challenge.id.clone(),
        solved: true,
        points: challenge.points,
        solved_at: now,
    };
    match store
        .record_solve(&solve)
        .map_err(|e| CtfError::Submission(e.to_string()))?
    {
        SolveWrite::Recorded => Ok(SubmitOutcome::Solved {
            points_awarded: challenge.points,
        }),
        SolveWrite::Conflict => Ok(SubmitOutcome::AlreadySolved),
    }
}

/// What the browser receives for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagVerdict {
    Solved { points_awarded: i32 },
    AlreadySolved,
    IncorrectFlag,
    Unauthenticated,
}

impl FlagVerdict {
    /// Splits a submission result into a verdict for the user, or an error that stays an error.
    pub fn from_result(result: Result<SubmitOutcome, CtfError>) -> Result<Self, CtfError> {
        match result {
            Ok(SubmitOutcome::Solved { points_awarded }) => {
                Ok(FlagVerdict::Solved { points_awarded })
            }
            Ok(SubmitOutcome::AlreadySolved) => Ok(FlagVerdict::AlreadySolved),
            Err(CtfError::IncorrectFlag) => Ok(FlagVerdict::IncorrectFlag),
            Err(CtfError::Unauthenticated) => Ok(FlagVerdict::Unauthenticated),
            Err(e) => Err(e),
        }
    }

    /// True when the attempt should appear as correct in the activity log.
    pub fn is_correct(&self) -> bool {
        matches!(
            self,
            FlagVerdict::Solved { .. } | FlagVerdict::AlreadySolved
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
    Info,
}

impl MessageKind {
    pub fn css_class(&self) -> &'static str {
        match self {
            MessageKind::Success => "message message-success",
            MessageKind::Error => "message message-error",
            MessageKind::Info => "message message-info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogMessage {
    pub kind: MessageKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogPhase {
    #[default]
    Idle,
    Submitting,
}

/// State of one open flag dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagDialog {
    pub phase: DialogPhase,
    pub message: Option<DialogMessage>,
}

impl FlagDialog {
    /// Moves to `Submitting`. Returns false, and changes nothing, if a submission from this
    /// dialog is already in flight.
    pub fn begin(&mut self) -> bool {
        if self.phase == DialogPhase::Submitting {
            return false;
        }
        self.phase = DialogPhase::Submitting;
        self.message = None;
        true
    }

    /// Records the result of the in-flight submission and returns to `Idle`.
    pub fn finish(&mut self, result: Result<FlagVerdict, String>) {
        self.phase = DialogPhase::Idle;
        let (kind, text) = match result {
            Ok(FlagVerdict::Solved { points_awarded }) => (
                MessageKind::Success,
                format!("Correct! +{} points!", points_awarded),
            ),
            Ok(FlagVerdict::AlreadySolved) => (
                MessageKind::Info,
                "You've already solved this challenge!".to_string(),
            ),
            Ok(FlagVerdict::IncorrectFlag) => {
                (MessageKind::Error, CtfError::IncorrectFlag.to_string())
            }
            Ok(FlagVerdict::Unauthenticated) => (
                MessageKind::Error,
                "You must be logged in to submit flags".to_string(),
            ),
            Err(e) => (
                MessageKind::Error,
                CtfError::Submission(e).to_string(),
            ),
        };
        self.message = Some(DialogMessage { kind, text });
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == DialogPhase::Submitting
    }

    /// Whether the submit button accepts a click for the given input.
    pub fn can_submit(&self, input: &str) -> bool {
        !self.is_submitting() && !input.trim().is_empty()
    }
}
