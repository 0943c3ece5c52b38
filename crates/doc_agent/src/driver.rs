//! Drives a [`SessionController`] against an [`Agent`], rendering progress
//! and asking the user through a [`UserInteraction`].

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::atomic::Ordering;

use agent_provider::CancelSignal;
use thiserror::Error;
use tracing::{debug, info};

use crate::agent::Agent;
use crate::config::{
    API_KEY_ENV_VAR, ENDPOINT_ENV_VAR, MODEL_ENV_VAR, OPENAI_CONFIG_PATH_ENV_VAR, PROVIDER_ENV_VAR,
};
use crate::prompts::PromptSource;
use crate::session::{
    ActionKind, ContinueReason, Decision, DecisionPoint, Outcome, RestoreAction,
    SessionController, SessionError, SessionMode, UserAction,
};

const RULE: &str = "==================================================";

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("failed to write progress output: {0}")]
    Output(#[source] io::Error),
    #[error("failed to read user input: {0}")]
    Input(#[source] io::Error),
    #[error("{0} needs a user decision but the session is non-interactive")]
    NoInteraction(&'static str),
}

/// User-facing prompts. Implementations only do I/O; deciding what a choice
/// means is the controller's job.
pub trait UserInteraction {
    /// Yes/no question. EOF answers no.
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
    /// Picks one of `actions`. EOF picks the first exit action.
    fn choose(&mut self, title: &str, actions: &[ActionKind]) -> io::Result<ActionKind>;
    /// Free-form feedback; `None` when the user gave up before typing anything.
    fn feedback(&mut self, question: &str) -> io::Result<Option<String>>;
}

/// Numbered menus over any reader/writer pair.
pub struct TerminalInteraction<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> TerminalInteraction<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

impl<R: BufRead, W: Write> UserInteraction for TerminalInteraction<R, W> {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        loop {
            write!(self.writer, "{question} [y/n]: ")?;
            self.writer.flush()?;
            let Some(answer) = self.read_line()? else {
                writeln!(self.writer)?;
                return Ok(false);
            };
            match answer.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.writer, "Please answer 'y' or 'n'.")?,
            }
        }
    }

    fn choose(&mut self, title: &str, actions: &[ActionKind]) -> io::Result<ActionKind> {
        let fallback = actions
            .iter()
            .copied()
            .find(|action| action.is_exit())
            .or_else(|| actions.last().copied())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no actions offered"))?;

        loop {
            writeln!(self.writer, "{title}")?;
            for (index, action) in actions.iter().enumerate() {
                writeln!(self.writer, "  {}) {}", index + 1, action.label())?;
            }
            write!(self.writer, "Enter choice [1-{}]: ", actions.len())?;
            self.writer.flush()?;

            let Some(answer) = self.read_line()? else {
                writeln!(self.writer)?;
                return Ok(fallback);
            };
            match answer.trim().parse::<usize>() {
                Ok(choice) if (1..=actions.len()).contains(&choice) => {
                    return Ok(actions[choice - 1]);
                }
                _ => writeln!(self.writer, "Invalid choice '{}'.", answer.trim())?,
            }
        }
    }

    fn feedback(&mut self, question: &str) -> io::Result<Option<String>> {
        writeln!(self.writer, "{question}")?;
        writeln!(
            self.writer,
            "(finish with an empty line or a single '.' on its own line)"
        )?;
        self.writer.flush()?;

        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            if line.trim().is_empty() || line.trim() == "." {
                break;
            }
            lines.push(line);
        }

        if lines.is_empty() {
            Ok(None)
        } else {
            Ok(Some(lines.join("\n")))
        }
    }
}

/// Stand-in for sessions that must never ask the user anything.
pub struct NoInteraction;

impl UserInteraction for NoInteraction {
    fn confirm(&mut self, _question: &str) -> io::Result<bool> {
        Ok(true)
    }

    fn choose(&mut self, _title: &str, _actions: &[ActionKind]) -> io::Result<ActionKind> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "non-interactive session",
        ))
    }

    fn feedback(&mut self, _question: &str) -> io::Result<Option<String>> {
        Ok(None)
    }
}

pub fn run_interactive<P: PromptSource>(
    agent: &mut Agent,
    controller: SessionController<P>,
    first: Decision,
    interaction: &mut dyn UserInteraction,
    out: &mut dyn Write,
    cancel: &CancelSignal,
) -> Result<Outcome, DriverError> {
    emit(out, "Starting documentation update process...")?;
    run_session(agent, controller, first, interaction, out, cancel)
}

pub fn run_non_interactive<P: PromptSource>(
    agent: &mut Agent,
    controller: SessionController<P>,
    first: Decision,
    out: &mut dyn Write,
    cancel: &CancelSignal,
) -> Result<Outcome, DriverError> {
    emit(out, "Starting non-interactive documentation update process...")?;
    run_session(agent, controller, first, &mut NoInteraction, out, cancel)
}

fn run_session<P: PromptSource>(
    agent: &mut Agent,
    mut controller: SessionController<P>,
    first: Decision,
    interaction: &mut dyn UserInteraction,
    out: &mut dyn Write,
    cancel: &CancelSignal,
) -> Result<Outcome, DriverError> {
    report_backup(out, controller.original())?;

    let mut decision = first;
    loop {
        decision = match decision {
            Decision::Continue { prompt, reason } => {
                announce(out, reason)?;
                emit(out, "LLM Agent is working...")?;
                match agent.execute_task(&prompt, cancel) {
                    Ok(result) => {
                        emit(out, "Task completed")?;
                        emit_block(out, "Agent Response", &result.final_content)?;
                        controller.on_task_result(&result)?
                    }
                    Err(error) => {
                        emit(out, &format!("Agent task failed: {error}"))?;
                        controller.on_agent_error(&error)?
                    }
                }
            }
            Decision::AwaitUser(point) => {
                if controller.mode() == SessionMode::NonInteractive {
                    return Err(DriverError::NoInteraction(point.name()));
                }
                render_point(out, &point)?;
                let action = ask(interaction, &point)?;
                if cancel.load(Ordering::SeqCst) {
                    info!("interrupt received while waiting for the user");
                    let restore = controller.restore()?;
                    Decision::Finished(Outcome::Interrupted { restore })
                } else {
                    controller.apply(action)?
                }
            }
            Decision::Finished(outcome) => {
                report_outcome(out, &outcome)?;
                return Ok(outcome);
            }
        };
    }
}

/// Printed instead of running a session when no provider is selected.
pub fn print_manual_instructions(out: &mut dyn Write, target: &Path) -> io::Result<()> {
    writeln!(out, "No LLM provider is configured for documentation updates.")?;
    writeln!(out)?;
    writeln!(out, "To update the documentation manually, edit:")?;
    writeln!(out, "  {}", target.display())?;
    writeln!(out)?;
    writeln!(
        out,
        "Keep any sections between <!-- HUMAN-EDITED START --> and <!-- HUMAN-EDITED END -->"
    )?;
    writeln!(
        out,
        "(or <!-- PRESERVE START --> and <!-- PRESERVE END -->) exactly as they are."
    )?;
    writeln!(out)?;
    writeln!(out, "To use the AI agent instead, set:")?;
    writeln!(out, "  {PROVIDER_ENV_VAR}=openai-compat")?;
    writeln!(
        out,
        "  {ENDPOINT_ENV_VAR}, {MODEL_ENV_VAR}, {API_KEY_ENV_VAR} or {OPENAI_CONFIG_PATH_ENV_VAR} as needed"
    )
}

fn ask(
    interaction: &mut dyn UserInteraction,
    point: &DecisionPoint,
) -> Result<UserAction, DriverError> {
    let kind = interaction
        .choose("What would you like to do?", point.actions())
        .map_err(DriverError::Input)?;
    debug!(action = %kind, "user chose action");

    Ok(match kind {
        ActionKind::Retry => UserAction::Retry,
        ActionKind::Abort => UserAction::Abort,
        ActionKind::Accept => UserAction::Accept,
        ActionKind::RequestChanges => {
            let changes = interaction
                .feedback("Please describe the changes you'd like to make:")
                .map_err(DriverError::Input)?;
            UserAction::RequestChanges(changes.unwrap_or_default())
        }
        ActionKind::Cancel => UserAction::Cancel,
        ActionKind::RetryWithInstruction => UserAction::RetryWithInstruction,
        ActionKind::ExitAnyway => UserAction::ExitAnyway,
    })
}

fn report_backup(out: &mut dyn Write, original: Option<&str>) -> Result<(), DriverError> {
    match original {
        Some(content) => emit(
            out,
            &format!(
                "Backed up original README.md ({} characters)",
                content.chars().count()
            ),
        ),
        None => emit(out, "No existing README.md found - will create new one"),
    }
}

fn announce(out: &mut dyn Write, reason: ContinueReason) -> Result<(), DriverError> {
    let message = match reason {
        ContinueReason::Initial => return Ok(()),
        ContinueReason::TokenLimitRecovery => {
            "LLM hit token limits. Switching to section-based generation..."
        }
        ContinueReason::ErrorRetry => "Retrying after error...",
        ContinueReason::UnchangedRetry => "Trying again to create README.md...",
        ContinueReason::Revision => "Applying requested changes...",
        ContinueReason::ForcedWrite => {
            "No README.md was updated. Trying again with specific instructions..."
        }
    };
    emit(out, message)
}

fn render_point(out: &mut dyn Write, point: &DecisionPoint) -> Result<(), DriverError> {
    match point {
        DecisionPoint::ErrorRecovery { .. } => emit(out, "Error detected in LLM response."),
        DecisionPoint::Unchanged => emit(out, "README.md file not updated."),
        DecisionPoint::Review { document, warnings } => {
            emit(
                out,
                &format!(
                    "Generated README stats: {} characters, {} lines",
                    document.chars().count(),
                    document.lines().count()
                ),
            )?;
            emit_block(out, "Generated README.md", document)?;
            report_warnings(out, warnings)
        }
    }
}

fn report_warnings(out: &mut dyn Write, warnings: &[String]) -> Result<(), DriverError> {
    if warnings.is_empty() {
        return Ok(());
    }
    emit(out, "Warning: some preserved sections were changed:")?;
    for warning in warnings {
        emit(out, &format!("  - {warning}"))?;
    }
    Ok(())
}

fn report_outcome(out: &mut dyn Write, outcome: &Outcome) -> Result<(), DriverError> {
    if let Some(restore) = outcome.restore() {
        report_restore(out, restore)?;
    }

    match outcome {
        Outcome::Accepted { warnings } => {
            report_warnings(out, warnings)?;
            emit(out, "Documentation update completed!")
        }
        Outcome::Cancelled { .. } => emit(out, "Documentation update cancelled."),
        Outcome::Aborted { .. } => emit(out, "Exiting after LLM error."),
        Outcome::ExitedWithoutChanges { .. } => emit(out, "Exiting without updating README.md."),
        Outcome::Failed { reason, .. } => emit(out, &format!("Documentation update failed: {reason}")),
        Outcome::Interrupted { .. } => emit(out, "Documentation update interrupted."),
    }
}

fn report_restore(out: &mut dyn Write, restore: RestoreAction) -> Result<(), DriverError> {
    match restore {
        RestoreAction::Rewrote { chars } => emit(
            out,
            &format!("Restored original README.md ({chars} characters)"),
        ),
        RestoreAction::Removed => emit(
            out,
            "Removed created README.md file - restored to original state (no file)",
        ),
        RestoreAction::NothingToRemove => Ok(()),
    }
}

fn emit_block(out: &mut dyn Write, title: &str, body: &str) -> Result<(), DriverError> {
    writeln!(out, "\n{title}:\n{RULE}\n{body}\n{RULE}").map_err(DriverError::Output)
}

fn emit(out: &mut dyn Write, line: &str) -> Result<(), DriverError> {
    writeln!(out, "{line}").map_err(DriverError::Output)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn terminal(input: &str) -> TerminalInteraction<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalInteraction::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn choose_reprompts_until_a_valid_number() {
        let mut interaction = terminal("9\nx\n2\n");
        let actions = [ActionKind::Accept, ActionKind::RequestChanges, ActionKind::Cancel];

        let choice = interaction.choose("Pick", &actions).expect("choice");
        assert_eq!(choice, ActionKind::RequestChanges);

        let rendered = String::from_utf8(interaction.writer).expect("utf8");
        assert!(rendered.contains("Invalid choice '9'."), "{rendered}");
        assert!(rendered.contains("  3) Cancel"), "{rendered}");
    }

    #[test]
    fn choose_picks_exit_action_on_eof() {
        let mut interaction = terminal("");
        let actions = [ActionKind::RetryWithInstruction, ActionKind::ExitAnyway];
        assert_eq!(
            interaction.choose("Pick", &actions).expect("choice"),
            ActionKind::ExitAnyway
        );
    }

    #[test]
    fn feedback_collects_lines_until_terminator() {
        let mut interaction = terminal("Add a FAQ.\nMention TLS.\n.\nignored\n");
        assert_eq!(
            interaction.feedback("Changes?").expect("feedback"),
            Some("Add a FAQ.\nMention TLS.".to_string())
        );

        let mut empty = terminal("\n");
        assert_eq!(empty.feedback("Changes?").expect("feedback"), None);
    }

    #[test]
    fn manual_instructions_name_target_and_provider_variable() {
        let mut out = Vec::new();
        print_manual_instructions(&mut out, Path::new("/pkg/_dev/build/docs/README.md"))
            .expect("write");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("/pkg/_dev/build/docs/README.md"), "{text}");
        assert!(text.contains("DOC_AGENT_PROVIDER=openai-compat"), "{text}");
    }

    #[test]
    fn confirm_accepts_yes_and_treats_eof_as_no() {
        assert!(terminal("maybe\nyes\n").confirm("Go?").expect("answer"));
        assert!(!terminal("").confirm("Go?").expect("answer"));
    }
}
