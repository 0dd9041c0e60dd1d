//! Natural-language command interpretation.
//!
//! The interpreter is an external service that turns an utterance into
//! command JSON. Its output is untrusted: it is decoded into the command
//! vocabulary and the resulting command is validated like any local edit.

use crate::errors::InterpreterError;
use async_trait::async_trait;
use folio_editor::{Command, Interpretation};
use folio_schema::Block;
use serde_json::Value;
use tracing::warn;

#[async_trait]
pub trait CommandInterpreter: Send + Sync {
    /// Produce command JSON for `utterance` against the current blocks
    async fn interpret(&self, utterance: &str, blocks: &[Block]) -> Result<Value, InterpreterError>;
}

/// Turn interpreter output into an [`Interpretation`].
///
/// Any failure (service error, undecodable JSON) falls back to inserting the
/// utterance as plain text.
pub fn resolve_interpretation(
    utterance: &str,
    output: Result<Value, InterpreterError>,
) -> Interpretation {
    let value = match output {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Interpreter failed, inserting utterance as text");
            return Interpretation::Command(Command::insert_text(utterance));
        }
    };

    match Interpretation::from_value(&value) {
        Ok(interpretation) => interpretation,
        Err(e) => {
            warn!(error = %e, "Unusable interpreter output, inserting utterance as text");
            Interpretation::Command(Command::insert_text(utterance))
        }
    }
}

/// Interpreter that always answers with the same JSON. Useful for wiring
/// tests and offline use.
#[derive(Debug, Clone)]
pub struct FixedInterpreter {
    response: Result<Value, InterpreterError>,
}

impl FixedInterpreter {
    pub fn responding(value: Value) -> Self {
        Self {
            response: Ok(value),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            response: Err(InterpreterError::Unavailable(reason.into())),
        }
    }
}

#[async_trait]
impl CommandInterpreter for FixedInterpreter {
    async fn interpret(&self, _utterance: &str, _blocks: &[Block]) -> Result<Value, InterpreterError> {
        self.response.clone()
    }
}
