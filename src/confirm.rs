//! Interactive confirmation before destructive remote operations.

use crate::error::{LockError, Result};
use std::io::{self, BufRead, Write};

/// The only input accepted as an affirmative answer.
pub const CONFIRM_TOKEN: &str = "yes";

/// Asks the user whether a destructive action may proceed.
pub trait Confirm {
    /// Show `warning` and return `true` only on an explicit affirmative answer.
    fn confirm(&mut self, warning: &str) -> Result<bool>;
}

/// Line-based prompt over any reader/writer pair.
pub struct PromptConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl PromptConfirm<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr, read the answer from stdin.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn confirm(&mut self, warning: &str) -> Result<bool> {
        let prompt_failed =
            |e: io::Error| LockError::UserError(format!("failed to prompt for confirmation: {}", e));

        writeln!(self.output, "{}", warning).map_err(prompt_failed)?;
        write!(self.output, "Type '{}' to confirm: ", CONFIRM_TOKEN).map_err(prompt_failed)?;
        self.output.flush().map_err(prompt_failed)?;

        let mut answer = String::new();
        self.input
            .read_line(&mut answer)
            .map_err(|e| LockError::UserError(format!("failed to read confirmation: {}", e)))?;

        Ok(answer.trim() == CONFIRM_TOKEN)
    }
}

/// Fixed answer.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[cfg(test)]
impl Confirm for AutoConfirm {
    fn confirm(&mut self, _warning: &str) -> Result<bool> {
        Ok(self.0)
    }
}
