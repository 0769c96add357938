//! Selection wizard: Context → Risk → Countermeasure → Guidelines
//!
//! `WizardState` is the pure step machine, `WizardSession` binds it to a
//! graph store and a chat model, and `console` renders the four panels on
//! a terminal.

pub mod console;
mod session;
mod state;

pub use session::{CountermeasureOptions, Guidelines, RecordSet, WizardSession};
pub use state::{Progress, Step, TreatmentSelection, WizardState};

use crate::llm::LlmError;
use crate::storage::StorageError;
use thiserror::Error;

/// Rejections and failures of wizard interactions.
///
/// Display text is the warning shown inline in the panel.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("{}", .0.locked_warning())]
    Locked(Step),

    #[error("The {0} step is already submitted. Reset the selections to change it.")]
    StepCompleted(Step),

    #[error("'{value}' is not one of the {step} options.")]
    UnknownOption { step: Step, value: String },

    #[error("Please select at least one risk in the Risk tab first.")]
    NoRisksSelected,

    #[error(
        "Please select at least one treatment for each risk before proceeding. (missing: {})",
        .0.join(", ")
    )]
    MissingCountermeasures(Vec<String>),

    #[error("Graph query failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Guideline generation failed: {0}")]
    Model(#[from] LlmError),
}

/// Result type for wizard interactions
pub type WizardResult<T> = Result<T, WizardError>;
