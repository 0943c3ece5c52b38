//! Multi-turn documentation session as an explicit state machine.
//!
//! The controller owns the backup of the target document and turns agent
//! results and user actions into [`Decision`] values. It never talks to the
//! user; drivers render decision points and feed actions back in.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, info_span, warn};

use crate::agent::{AgentError, TaskResult};
use crate::classifier::{Classifier, TaskClass};
use crate::preserve;
use crate::prompts::{
    PromptSource, ERROR_RETRY_INSTRUCTION, FORCED_WRITE_INSTRUCTION, UNCHANGED_RETRY_INSTRUCTION,
};

/// Section-based recoveries allowed before falling through to the document check.
pub const INTERACTIVE_TOKEN_LIMIT_RECOVERIES: usize = 3;
pub const NON_INTERACTIVE_TOKEN_LIMIT_RECOVERIES: usize = 1;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("action '{action}' is not available {state}")]
    InvalidAction { action: ActionKind, state: String },
    #[error("session is {found}; expected {expected}")]
    UnexpectedState {
        expected: &'static str,
        found: &'static str,
    },
}

impl SessionError {
    fn io(operation: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Interactive,
    NonInteractive,
}

/// Why the controller wants another agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueReason {
    Initial,
    TokenLimitRecovery,
    ErrorRetry,
    UnchangedRetry,
    Revision,
    ForcedWrite,
}

/// Actions a driver may offer at a decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Retry,
    Abort,
    Accept,
    RequestChanges,
    Cancel,
    RetryWithInstruction,
    ExitAnyway,
}

impl ActionKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Retry => "Try again",
            Self::Abort => "Exit",
            Self::Accept => "Accept and finalize",
            Self::RequestChanges => "Request changes",
            Self::Cancel => "Cancel",
            Self::RetryWithInstruction => "Try again",
            Self::ExitAnyway => "Exit anyway",
        }
    }

    /// Whether choosing this action ends the session without another run.
    #[must_use]
    pub fn is_exit(self) -> bool {
        matches!(self, Self::Abort | Self::Cancel | Self::ExitAnyway)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A chosen action. Only `RequestChanges` carries data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Retry,
    Abort,
    Accept,
    RequestChanges(String),
    Cancel,
    RetryWithInstruction,
    ExitAnyway,
}

impl UserAction {
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Retry => ActionKind::Retry,
            Self::Abort => ActionKind::Abort,
            Self::Accept => ActionKind::Accept,
            Self::RequestChanges(_) => ActionKind::RequestChanges,
            Self::Cancel => ActionKind::Cancel,
            Self::RetryWithInstruction => ActionKind::RetryWithInstruction,
            Self::ExitAnyway => ActionKind::ExitAnyway,
        }
    }
}

/// Where the session waits for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionPoint {
    /// The agent's final text was classified as an error.
    ErrorRecovery { final_content: String },
    /// The document changed; `warnings` lists spans that were not preserved.
    Review {
        document: String,
        warnings: Vec<String>,
    },
    /// The document is the same as before the run.
    Unchanged,
}

impl DecisionPoint {
    #[must_use]
    pub fn actions(&self) -> &'static [ActionKind] {
        match self {
            Self::ErrorRecovery { .. } => &[ActionKind::Retry, ActionKind::Abort],
            Self::Review { .. } => &[
                ActionKind::Accept,
                ActionKind::RequestChanges,
                ActionKind::Cancel,
            ],
            Self::Unchanged => &[ActionKind::RetryWithInstruction, ActionKind::ExitAnyway],
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ErrorRecovery { .. } => "error recovery",
            Self::Review { .. } => "review",
            Self::Unchanged => "unchanged document",
        }
    }
}

/// What restoring the backup did to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreAction {
    Rewrote { chars: usize },
    Removed,
    NothingToRemove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    ClassifiedError(String),
    NoDocumentWritten,
    Agent(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClassifiedError(content) => {
                write!(f, "LLM agent encountered an error: {content}")
            }
            Self::NoDocumentWritten => f.write_str("failed to create README.md after two attempts"),
            Self::Agent(message) => write!(f, "agent task failed: {message}"),
        }
    }
}

/// Terminal state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted { warnings: Vec<String> },
    Cancelled { restore: RestoreAction },
    Aborted { restore: RestoreAction },
    ExitedWithoutChanges { restore: RestoreAction },
    Failed {
        reason: FailureReason,
        restore: RestoreAction,
    },
    Interrupted { restore: RestoreAction },
}

impl Outcome {
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Accepted { .. } | Self::Cancelled { .. } | Self::ExitedWithoutChanges { .. } => 0,
            Self::Aborted { .. } | Self::Failed { .. } => 1,
            Self::Interrupted { .. } => 130,
        }
    }

    #[must_use]
    pub fn restore(&self) -> Option<RestoreAction> {
        match self {
            Self::Accepted { .. } => None,
            Self::Cancelled { restore }
            | Self::Aborted { restore }
            | Self::ExitedWithoutChanges { restore }
            | Self::Failed { restore, .. }
            | Self::Interrupted { restore } => Some(*restore),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Continue {
        prompt: String,
        reason: ContinueReason,
    },
    AwaitUser(DecisionPoint),
    Finished(Outcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Working,
    Awaiting(DecisionPoint),
    Finished,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            Self::Working => "working",
            Self::Awaiting(_) => "awaiting user",
            Self::Finished => "finished",
        }
    }
}

pub struct SessionController<P> {
    target: PathBuf,
    original: Option<String>,
    prompts: P,
    classifier: Classifier,
    mode: SessionMode,
    state: State,
    forced_write_used: bool,
    token_limit_recoveries: usize,
}

impl<P: PromptSource> SessionController<P> {
    /// Captures the backup of `target` and returns the controller together
    /// with the initial run decision. A missing target is a valid backup.
    pub fn start(
        target: impl Into<PathBuf>,
        prompts: P,
        classifier: Classifier,
        mode: SessionMode,
    ) -> Result<(Self, Decision), SessionError> {
        let target = target.into();
        let original = read_optional(&target)?;
        match &original {
            Some(content) => info!(chars = content.chars().count(), "backed up target document"),
            None => info!("target document does not exist yet"),
        }

        let prompt = prompts.initial();
        let controller = Self {
            target,
            original,
            prompts,
            classifier,
            mode,
            state: State::Working,
            forced_write_used: false,
            token_limit_recoveries: 0,
        };

        Ok((
            controller,
            Decision::Continue {
                prompt,
                reason: ContinueReason::Initial,
            },
        ))
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Document content captured before any model interaction.
    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Classifies a finished agent run and decides the next step.
    pub fn on_task_result(&mut self, result: &TaskResult) -> Result<Decision, SessionError> {
        self.expect_working()?;
        let _span = info_span!("session_decide", mode = ?self.mode).entered();

        let class = self
            .classifier
            .classify(&result.final_content, &result.conversation);
        info!(class = class.as_str(), success = result.success, "classified task result");

        match class {
            TaskClass::TokenLimit if self.token_limit_recoveries < self.token_limit_budget() => {
                self.token_limit_recoveries += 1;
                Ok(self.continue_with(self.prompts.section_based(), ContinueReason::TokenLimitRecovery))
            }
            TaskClass::Error => match self.mode {
                SessionMode::Interactive => Ok(self.await_user(DecisionPoint::ErrorRecovery {
                    final_content: result.final_content.clone(),
                })),
                SessionMode::NonInteractive if !self.forced_write_used => {
                    self.forced_write_used = true;
                    Ok(self.continue_with(
                        FORCED_WRITE_INSTRUCTION.to_string(),
                        ContinueReason::ForcedWrite,
                    ))
                }
                SessionMode::NonInteractive => self.fail(FailureReason::ClassifiedError(
                    result.final_content.clone(),
                )),
            },
            TaskClass::TokenLimit | TaskClass::Completed => self.decide_document(),
        }
    }

    /// Turns an agent failure into a terminal outcome, restoring the backup.
    pub fn on_agent_error(&mut self, error: &AgentError) -> Result<Decision, SessionError> {
        self.expect_working()?;
        warn!(%error, "agent task failed");

        match error {
            AgentError::Cancelled => {
                let restore = self.restore()?;
                Ok(self.finish(Outcome::Interrupted { restore }))
            }
            AgentError::Provider(_) => self.fail(FailureReason::Agent(error.to_string())),
        }
    }

    /// Applies a user action at the current decision point.
    pub fn apply(&mut self, action: UserAction) -> Result<Decision, SessionError> {
        let point = match &self.state {
            State::Awaiting(point) => point.clone(),
            other => {
                return Err(SessionError::UnexpectedState {
                    expected: "awaiting user",
                    found: other.name(),
                })
            }
        };

        if !point.actions().contains(&action.kind()) {
            return Err(SessionError::InvalidAction {
                action: action.kind(),
                state: format!("at the {} step", point.name()),
            });
        }
        info!(action = %action.kind(), point = point.name(), "applying user action");

        match action {
            UserAction::Retry => Ok(self.continue_with(
                self.prompts.revision(ERROR_RETRY_INSTRUCTION),
                ContinueReason::ErrorRetry,
            )),
            UserAction::Abort => {
                let restore = self.restore()?;
                Ok(self.finish(Outcome::Aborted { restore }))
            }
            UserAction::Accept => {
                let warnings = match point {
                    DecisionPoint::Review { warnings, .. } => warnings,
                    _ => Vec::new(),
                };
                Ok(self.finish(Outcome::Accepted { warnings }))
            }
            UserAction::RequestChanges(changes) if changes.trim().is_empty() => {
                Ok(Decision::AwaitUser(point))
            }
            UserAction::RequestChanges(changes) => Ok(self.continue_with(
                self.prompts.revision(changes.trim()),
                ContinueReason::Revision,
            )),
            UserAction::Cancel => {
                let restore = self.restore()?;
                Ok(self.finish(Outcome::Cancelled { restore }))
            }
            UserAction::RetryWithInstruction => Ok(self.continue_with(
                self.prompts.revision(UNCHANGED_RETRY_INSTRUCTION),
                ContinueReason::UnchangedRetry,
            )),
            UserAction::ExitAnyway => {
                let restore = self.restore()?;
                Ok(self.finish(Outcome::ExitedWithoutChanges { restore }))
            }
        }
    }

    /// Puts the target back the way it was before the session.
    ///
    /// Anything left at the target path is replaced, including a directory.
    pub fn restore(&self) -> Result<RestoreAction, SessionError> {
        let cleared = self.clear_target()?;
        match &self.original {
            Some(content) => {
                std::fs::write(&self.target, content)
                    .map_err(|source| SessionError::io("restore", &self.target, source))?;
                let chars = content.chars().count();
                info!(chars, path = %self.target.display(), "restored original document");
                Ok(RestoreAction::Rewrote { chars })
            }
            None if cleared => {
                info!(path = %self.target.display(), "removed document created during session");
                Ok(RestoreAction::Removed)
            }
            None => Ok(RestoreAction::NothingToRemove),
        }
    }

    /// Removes whatever occupies the target path. Returns whether anything was there.
    fn clear_target(&self) -> Result<bool, SessionError> {
        let metadata = match std::fs::symlink_metadata(&self.target) {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(false),
            Err(source) => return Err(SessionError::io("inspect", &self.target, source)),
        };

        let removed = if metadata.is_dir() {
            warn!(path = %self.target.display(), "target document was replaced by a directory");
            std::fs::remove_dir_all(&self.target)
        } else {
            std::fs::remove_file(&self.target)
        };
        match removed {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(SessionError::io("remove", &self.target, source)),
        }
    }

    fn decide_document(&mut self) -> Result<Decision, SessionError> {
        let current = read_document(&self.target)?;
        let changed = match (&self.original, &current) {
            (_, None) => false,
            (None, Some(document)) => !document.is_empty(),
            (Some(original), Some(document)) => original != document,
        };

        match (changed, current, self.mode) {
            (true, Some(document), mode) => {
                let warnings = self
                    .original
                    .as_deref()
                    .map(|original| preserve::validate(original, &document))
                    .unwrap_or_default();
                if !warnings.is_empty() {
                    warn!(count = warnings.len(), "preserved regions were not kept");
                }

                match mode {
                    SessionMode::Interactive => {
                        Ok(self.await_user(DecisionPoint::Review { document, warnings }))
                    }
                    SessionMode::NonInteractive => Ok(self.finish(Outcome::Accepted { warnings })),
                }
            }
            (_, _, SessionMode::Interactive) => Ok(self.await_user(DecisionPoint::Unchanged)),
            (_, _, SessionMode::NonInteractive) if !self.forced_write_used => {
                self.forced_write_used = true;
                Ok(self.continue_with(
                    FORCED_WRITE_INSTRUCTION.to_string(),
                    ContinueReason::ForcedWrite,
                ))
            }
            (_, _, SessionMode::NonInteractive) => self.fail(FailureReason::NoDocumentWritten),
        }
    }

    fn token_limit_budget(&self) -> usize {
        match self.mode {
            SessionMode::Interactive => INTERACTIVE_TOKEN_LIMIT_RECOVERIES,
            SessionMode::NonInteractive => NON_INTERACTIVE_TOKEN_LIMIT_RECOVERIES,
        }
    }

    fn fail(&mut self, reason: FailureReason) -> Result<Decision, SessionError> {
        let restore = self.restore()?;
        Ok(self.finish(Outcome::Failed { reason, restore }))
    }

    fn continue_with(&mut self, prompt: String, reason: ContinueReason) -> Decision {
        self.state = State::Working;
        Decision::Continue { prompt, reason }
    }

    fn await_user(&mut self, point: DecisionPoint) -> Decision {
        self.state = State::Awaiting(point.clone());
        Decision::AwaitUser(point)
    }

    fn finish(&mut self, outcome: Outcome) -> Decision {
        self.state = State::Finished;
        Decision::Finished(outcome)
    }

    fn expect_working(&self) -> Result<(), SessionError> {
        match self.state {
            State::Working => Ok(()),
            ref other => Err(SessionError::UnexpectedState {
                expected: "working",
                found: other.name(),
            }),
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, SessionError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SessionError::io("read", path, source)),
    }
}

/// Like `read_optional`, but anything other than a regular file at `path`
/// reads as no document.
fn read_document(path: &Path) -> Result<Option<String>, SessionError> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => read_optional(path),
        Ok(_) => {
            warn!(path = %path.display(), "target document is not a regular file");
            Ok(None)
        }
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SessionError::io("inspect", path, source)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ConversationEntry;

    struct FixedPrompts;

    impl PromptSource for FixedPrompts {
        fn initial(&self) -> String {
            "initial".to_string()
        }

        fn revision(&self, changes: &str) -> String {
            format!("revise: {changes}")
        }

        fn section_based(&self) -> String {
            "sections".to_string()
        }
    }

    fn finished(content: &str) -> TaskResult {
        TaskResult {
            success: true,
            final_content: content.to_string(),
            conversation: vec![ConversationEntry::user("initial")],
        }
    }

    fn start(
        target: &Path,
        mode: SessionMode,
    ) -> (SessionController<FixedPrompts>, Decision) {
        SessionController::start(target, FixedPrompts, Classifier::default(), mode)
            .expect("session should start")
    }

    #[test]
    fn start_captures_missing_target_and_emits_initial_prompt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (controller, decision) = start(&dir.path().join("README.md"), SessionMode::Interactive);

        assert_eq!(controller.original(), None);
        assert_eq!(
            decision,
            Decision::Continue {
                prompt: "initial".to_string(),
                reason: ContinueReason::Initial,
            }
        );
    }

    #[test]
    fn token_limit_goes_straight_to_section_prompt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut controller, _) = start(&dir.path().join("README.md"), SessionMode::Interactive);

        let decision = controller
            .on_task_result(&finished("I encountered an error: token limit reached"))
            .expect("decision");
        assert_eq!(
            decision,
            Decision::Continue {
                prompt: "sections".to_string(),
                reason: ContinueReason::TokenLimitRecovery,
            }
        );
    }

    #[test]
    fn error_offers_retry_or_abort_in_interactive_mode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut controller, _) = start(&dir.path().join("README.md"), SessionMode::Interactive);

        let decision = controller
            .on_task_result(&finished("Something went wrong."))
            .expect("decision");
        let Decision::AwaitUser(point) = decision else {
            panic!("expected a decision point, got {decision:?}");
        };
        assert_eq!(point.actions(), &[ActionKind::Retry, ActionKind::Abort]);

        let retry = controller.apply(UserAction::Retry).expect("retry");
        assert_eq!(
            retry,
            Decision::Continue {
                prompt: format!("revise: {ERROR_RETRY_INSTRUCTION}"),
                reason: ContinueReason::ErrorRetry,
            }
        );
    }

    #[test]
    fn actions_outside_the_offered_set_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut controller, _) = start(&dir.path().join("README.md"), SessionMode::Interactive);
        controller
            .on_task_result(&finished("Something went wrong."))
            .expect("decision");

        let error = controller
            .apply(UserAction::Accept)
            .expect_err("accept is not offered after an error");
        assert!(matches!(
            error,
            SessionError::InvalidAction {
                action: ActionKind::Accept,
                ..
            }
        ));
    }

    #[test]
    fn results_are_rejected_while_awaiting_user() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut controller, _) = start(&dir.path().join("README.md"), SessionMode::Interactive);
        controller.on_task_result(&finished("done")).expect("decision");

        let error = controller
            .on_task_result(&finished("done"))
            .expect_err("second result without an action");
        assert!(matches!(error, SessionError::UnexpectedState { .. }));
    }

    #[test]
    fn empty_feedback_represents_the_review_point() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("README.md");
        let (mut controller, _) = start(&target, SessionMode::Interactive);
        std::fs::write(&target, "# X").expect("write");

        let review = controller.on_task_result(&finished("done")).expect("decision");
        let again = controller
            .apply(UserAction::RequestChanges("  \n".to_string()))
            .expect("empty feedback");
        assert_eq!(review, again);

        let revise = controller
            .apply(UserAction::RequestChanges("Add a FAQ.\n".to_string()))
            .expect("feedback");
        assert_eq!(
            revise,
            Decision::Continue {
                prompt: "revise: Add a FAQ.".to_string(),
                reason: ContinueReason::Revision,
            }
        );
    }

    #[test]
    fn non_interactive_unchanged_forces_one_retry_then_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut controller, _) = start(&dir.path().join("README.md"), SessionMode::NonInteractive);

        let first = controller.on_task_result(&finished("done")).expect("decision");
        assert_eq!(
            first,
            Decision::Continue {
                prompt: FORCED_WRITE_INSTRUCTION.to_string(),
                reason: ContinueReason::ForcedWrite,
            }
        );

        let second = controller.on_task_result(&finished("done")).expect("decision");
        assert_eq!(
            second,
            Decision::Finished(Outcome::Failed {
                reason: FailureReason::NoDocumentWritten,
                restore: RestoreAction::NothingToRemove,
            })
        );
        assert_eq!(
            FailureReason::NoDocumentWritten.to_string(),
            "failed to create README.md after two attempts"
        );
    }

    #[test]
    fn non_interactive_error_after_forced_retry_fails_and_restores() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("README.md");
        std::fs::write(&target, "original").expect("seed");
        let (mut controller, _) = start(&target, SessionMode::NonInteractive);

        controller
            .on_task_result(&finished("Task did not complete within maximum iterations"))
            .expect("forced retry");
        std::fs::write(&target, "half written").expect("agent write");
        let decision = controller
            .on_task_result(&finished("I cannot complete this task"))
            .expect("decision");

        assert!(matches!(
            decision,
            Decision::Finished(Outcome::Failed {
                reason: FailureReason::ClassifiedError(_),
                restore: RestoreAction::Rewrote { chars: 8 },
            })
        ));
        assert_eq!(std::fs::read_to_string(&target).expect("read"), "original");
    }

    #[test]
    fn non_interactive_token_limit_recovers_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut controller, _) = start(&dir.path().join("README.md"), SessionMode::NonInteractive);

        let first = controller
            .on_task_result(&finished("response is too long"))
            .expect("decision");
        assert!(matches!(
            first,
            Decision::Continue {
                reason: ContinueReason::TokenLimitRecovery,
                ..
            }
        ));

        let second = controller
            .on_task_result(&finished("response is too long"))
            .expect("decision");
        assert!(matches!(
            second,
            Decision::Continue {
                reason: ContinueReason::ForcedWrite,
                ..
            }
        ));
    }

    #[test]
    fn cancelled_agent_restores_and_reports_interrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("README.md");
        let (mut controller, _) = start(&target, SessionMode::Interactive);
        std::fs::write(&target, "partial").expect("agent write");

        let decision = controller
            .on_agent_error(&AgentError::Cancelled)
            .expect("decision");
        assert_eq!(
            decision,
            Decision::Finished(Outcome::Interrupted {
                restore: RestoreAction::Removed,
            })
        );
        assert!(!target.exists());
    }

    #[test]
    fn exit_codes_reflect_terminal_state() {
        assert_eq!(Outcome::Accepted { warnings: Vec::new() }.exit_code(), 0);
        assert_eq!(
            Outcome::Cancelled {
                restore: RestoreAction::Removed
            }
            .exit_code(),
            0
        );
        assert_eq!(
            Outcome::Failed {
                reason: FailureReason::NoDocumentWritten,
                restore: RestoreAction::NothingToRemove,
            }
            .exit_code(),
            1
        );
        assert_eq!(
            Outcome::Interrupted {
                restore: RestoreAction::NothingToRemove
            }
            .exit_code(),
            130
        );
    }

    #[test]
    fn directory_at_target_counts_as_unchanged_and_is_removed_on_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("README.md");
        let (mut controller, _) = start(&target, SessionMode::NonInteractive);

        std::fs::create_dir_all(target.join("nested")).expect("agent made a directory");
        let first = controller.on_task_result(&finished("done")).expect("decision");
        assert!(matches!(
            first,
            Decision::Continue {
                reason: ContinueReason::ForcedWrite,
                ..
            }
        ));

        let second = controller.on_task_result(&finished("done")).expect("decision");
        assert_eq!(
            second,
            Decision::Finished(Outcome::Failed {
                reason: FailureReason::NoDocumentWritten,
                restore: RestoreAction::Removed,
            })
        );
        assert!(!target.exists());
    }

    #[test]
    fn restore_rewrites_original_over_a_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("README.md");
        std::fs::write(&target, "# Old").expect("seed");
        let (mut controller, _) = start(&target, SessionMode::Interactive);

        std::fs::remove_file(&target).expect("remove");
        std::fs::create_dir(&target).expect("agent made a directory");
        let decision = controller.on_task_result(&finished("done")).expect("decision");
        assert_eq!(decision, Decision::AwaitUser(DecisionPoint::Unchanged));

        let exit = controller.apply(UserAction::ExitAnyway).expect("exit");
        assert_eq!(
            exit,
            Decision::Finished(Outcome::ExitedWithoutChanges {
                restore: RestoreAction::Rewrote { chars: 5 },
            })
        );
        assert_eq!(std::fs::read_to_string(&target).expect("restored"), "# Old");
    }
}
