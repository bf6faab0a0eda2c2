//! Interactive confirmation before destructive operations

use std::io::{BufRead, Write};
use tracing::info;

/// Result of asking the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Declined,
}

/// Requires the operator to type an exact phrase
#[derive(Debug, Clone)]
pub struct ConfirmationGate {
    phrase: String,
}

impl ConfirmationGate {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Compare an answer against the phrase
    ///
    /// Only the trailing line terminator is stripped. Case and any other
    /// whitespace must match exactly.
    pub fn check(&self, answer: &str) -> GateDecision {
        let answer = answer
            .strip_suffix('\n')
            .map(|a| a.strip_suffix('\r').unwrap_or(a))
            .unwrap_or(answer);

        if answer == self.phrase {
            GateDecision::Proceed
        } else {
            GateDecision::Declined
        }
    }

    /// Print `summary`, prompt, and read one line
    ///
    /// EOF or a read error counts as a decline.
    pub fn confirm<R: BufRead, W: Write>(
        &self,
        summary: &str,
        input: &mut R,
        output: &mut W,
    ) -> GateDecision {
        let _ = writeln!(output, "{summary}");
        let _ = write!(output, "Type {} to confirm: ", self.phrase);
        let _ = output.flush();

        let mut line = String::new();
        let decision = match input.read_line(&mut line) {
            Ok(0) | Err(_) => GateDecision::Declined,
            Ok(_) => self.check(&line),
        };

        info!(decision = ?decision, "Confirmation answered");
        decision
    }
}
