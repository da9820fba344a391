//! Request Models
//!
//! Caller input for the pipeline entry points. Every request is validated
//! before any stage runs.

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};
use uber_codegen_agents::prompts::{follow_up_prompt, regenerate_prompt};

/// Generate code from a prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Becomes the thread id of the run
    #[serde(default)]
    pub session_id: Option<String>,
    /// Per-request credential override
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Previously generated code for a follow-up prompt
    #[serde(default)]
    pub context_code: Option<String>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_context_code(mut self, code: impl Into<String>) -> Self {
        self.context_code = Some(code.into());
        self
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(AppError::validation("Prompt is required"));
        }
        Ok(())
    }

    /// Prompt for single-file generation, wrapped with prior code when given.
    pub fn generation_prompt(&self) -> String {
        match self.context_code.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(context) => follow_up_prompt(context, &self.prompt),
            None => self.prompt.clone(),
        }
    }
}

/// Rework existing code according to edit instructions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegenerateRequest {
    #[serde(default)]
    pub original_prompt: String,
    pub edit_instructions: String,
    #[serde(default)]
    pub current_code: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl RegenerateRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.edit_instructions.trim().is_empty() {
            return Err(AppError::validation("Edit instructions required"));
        }
        Ok(())
    }

    pub fn prompt(&self) -> String {
        regenerate_prompt(&self.original_prompt, &self.current_code, &self.edit_instructions)
    }
}

/// Literal find/replace applied before re-analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEdit {
    #[serde(default)]
    pub old: String,
    #[serde(default)]
    pub new: String,
}

/// Apply edits to code and re-run the analysis stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditRequest {
    pub original_code: String,
    #[serde(default)]
    pub updates: Vec<CodeEdit>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl EditRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.original_code.trim().is_empty() {
            return Err(AppError::validation("Original code is required"));
        }
        Ok(())
    }

    /// Code with every edit applied in order. Edits with an empty `old` are skipped.
    pub fn apply(&self) -> String {
        self.updates
            .iter()
            .filter(|edit| !edit.old.is_empty())
            .fold(self.original_code.clone(), |code, edit| {
                code.replace(&edit.old, &edit.new)
            })
    }
}
