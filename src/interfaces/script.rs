use crate::error::{Result, StoreError};
use crate::infrastructure::in_memory::{PurchaseDecision, UiBehavior};
use serde::Deserialize;
use serde_json::Value;
use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    ListProducts,
    LaunchPurchase,
    TerminatePurchase,
}

/// One call of a session script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptCommand {
    pub op: Operation,
    /// Entry point parameters. A JSON string is passed through verbatim.
    #[serde(default)]
    pub params: Value,
    /// How the purchase surface behaves, for `launchPurchase`.
    #[serde(default)]
    pub ui: UiBehavior,
    /// What the user answers in the store dialog, for `launchPurchase`.
    #[serde(default)]
    pub decision: PurchaseDecision,
}

impl ScriptCommand {
    pub fn params_json(&self) -> String {
        match &self.params {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }
}

/// Reads a session script, one JSON command per line.
///
/// Blank lines and lines starting with `#` are skipped.
pub struct ScriptReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> ScriptReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn commands(self) -> impl Iterator<Item = Result<ScriptCommand>> {
        self.source
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                line.as_ref()
                    .map(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
                    .unwrap_or(true)
            })
            .map(|(index, line)| -> Result<ScriptCommand> {
                let line = line?;
                serde_json::from_str(&line).map_err(|e| {
                    StoreError::Internal(format!("Reading script line {}: {e}", index + 1))
                })
            })
    }
}
