//! Conversation scripts
//!
//! A script is a fixed, ordered list of steps loaded once when the engine is
//! built. Prompts may contain a `{name}` placeholder that is filled with the
//! user's display name.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Placeholder replaced with the user's name
const NAME_PLACEHOLDER: &str = "{name}";

/// Name used when the user has not given one
pub const DEFAULT_USER_NAME: &str = "friend";

/// Script compiled into the binary
const EMBEDDED_SCRIPT: &str = include_str!("../scripts/healing_quest.json");

/// One scripted turn of the dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    index: usize,
    prompt_text: String,
    options: Vec<String>,
}

impl Step {
    /// Position of this step in its script
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Text the guide says for this step
    #[must_use]
    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }

    /// Suggested answers; empty when the step needs no answer
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Whether the step waits for an answer
    #[must_use]
    pub fn has_options(&self) -> bool {
        !self.options.is_empty()
    }
}

/// On-disk step format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StepFile {
    text: String,
    #[serde(default)]
    options: Vec<String>,
}

/// On-disk script format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScriptFile {
    #[serde(default)]
    id: Option<String>,
    steps: Vec<StepFile>,
    #[serde(default)]
    closing: Option<String>,
}

/// Ordered, immutable list of steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    id: String,
    steps: Vec<Step>,
    closing: Option<String>,
}

impl Script {
    /// Build a script from `(prompt, options)` pairs; indices follow list order
    #[must_use]
    pub fn new<I, S>(id: impl Into<String>, steps: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(index, (prompt, options))| Step {
                index,
                prompt_text: prompt.into(),
                options,
            })
            .collect();

        Self {
            id: id.into(),
            steps,
            closing: None,
        }
    }

    /// Attach a closing line shown after the last step
    #[must_use]
    pub fn with_closing(mut self, closing: impl Into<String>) -> Self {
        self.closing = Some(closing.into());
        self
    }

    /// Parse a script from JSON
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed, has no steps, or has blank options
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ScriptFile = serde_json::from_str(json)
            .map_err(|e| Error::Script(format!("failed to parse script: {e}")))?;

        if file.steps.is_empty() {
            return Err(Error::Script("script has no steps".to_string()));
        }

        for (index, step) in file.steps.iter().enumerate() {
            if step.options.iter().any(|o| o.trim().is_empty()) {
                return Err(Error::Script(format!("step {index} has a blank option")));
            }
        }

        let id = file.id.unwrap_or_else(|| "custom".to_string());
        let mut script = Self::new(id, file.steps.into_iter().map(|s| (s.text, s.options)));
        script.closing = file.closing;
        Ok(script)
    }

    /// Load a script from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let script = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), steps = script.len(), "loaded script");
        Ok(script)
    }

    /// The script compiled into the binary
    ///
    /// # Errors
    ///
    /// Returns error if the embedded data is malformed
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_SCRIPT)
    }

    /// Copy of this script with `{name}` filled in
    #[must_use]
    pub fn personalized(&self, name: &str) -> Self {
        let name = if name.trim().is_empty() {
            DEFAULT_USER_NAME
        } else {
            name.trim()
        };

        let fill = |text: &str| text.replace(NAME_PLACEHOLDER, name);

        Self {
            id: self.id.clone(),
            steps: self
                .steps
                .iter()
                .map(|s| Step {
                    index: s.index,
                    prompt_text: fill(&s.prompt_text),
                    options: s.options.iter().map(|o| fill(o)).collect(),
                })
                .collect(),
            closing: self.closing.as_deref().map(fill),
        }
    }

    /// Script identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Step at an index
    #[must_use]
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// All steps in order
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Closing line, if any
    #[must_use]
    pub fn closing(&self) -> Option<&str> {
        self.closing.as_deref()
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the script has no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
