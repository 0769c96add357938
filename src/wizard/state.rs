//! Wizard progress as a finite-state value
//!
//! `Progress` has one variant per completed step and each variant owns
//! exactly the selections made so far, so a selection can never be
//! observed without the steps it depends on. `reset` is one assignment.

use super::{WizardError, WizardResult};
use std::collections::{BTreeMap, BTreeSet};

/// The four panels, in their strict forward order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Context,
    Risk,
    Countermeasure,
    Guidelines,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Context, Step::Risk, Step::Countermeasure, Step::Guidelines];

    pub fn title(&self) -> &'static str {
        match self {
            Step::Context => "Context",
            Step::Risk => "Risk",
            Step::Countermeasure => "Countermeasure",
            Step::Guidelines => "Guidelines",
        }
    }

    /// Warning shown when the step is opened before its prerequisite
    pub fn locked_warning(&self) -> &'static str {
        match self {
            Step::Context => "",
            Step::Risk => "Please select a context in the Context tab first.",
            Step::Countermeasure => "Please select risks in the Risk tab first.",
            Step::Guidelines => "Please select countermeasure in the Countermeasure tab first.",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// Treatments chosen per risk
pub type TreatmentSelection = BTreeMap<String, BTreeSet<String>>;

/// Selections recorded so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Progress {
    #[default]
    Start,
    ContextChosen {
        application: String,
    },
    RisksChosen {
        application: String,
        risks: BTreeSet<String>,
    },
    CountermeasuresChosen {
        application: String,
        risks: BTreeSet<String>,
        treatments: TreatmentSelection,
    },
}

/// Session-scoped wizard state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardState {
    progress: Progress,
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// The step awaiting submission (Guidelines once everything is chosen)
    pub fn active_step(&self) -> Step {
        match self.progress {
            Progress::Start => Step::Context,
            Progress::ContextChosen { .. } => Step::Risk,
            Progress::RisksChosen { .. } => Step::Countermeasure,
            Progress::CountermeasuresChosen { .. } => Step::Guidelines,
        }
    }

    /// Whether a step's prerequisites are complete
    pub fn is_enabled(&self, step: Step) -> bool {
        step <= self.active_step()
    }

    pub fn application(&self) -> Option<&str> {
        match &self.progress {
            Progress::Start => None,
            Progress::ContextChosen { application }
            | Progress::RisksChosen { application, .. }
            | Progress::CountermeasuresChosen { application, .. } => Some(application),
        }
    }

    pub fn risks(&self) -> Option<&BTreeSet<String>> {
        match &self.progress {
            Progress::RisksChosen { risks, .. } | Progress::CountermeasuresChosen { risks, .. } => Some(risks),
            _ => None,
        }
    }

    pub fn treatments(&self) -> Option<&TreatmentSelection> {
        match &self.progress {
            Progress::CountermeasuresChosen { treatments, .. } => Some(treatments),
            _ => None,
        }
    }

    /// Fail unless `step` may be viewed
    pub fn require_enabled(&self, step: Step) -> WizardResult<()> {
        if self.is_enabled(step) {
            Ok(())
        } else {
            Err(WizardError::Locked(step))
        }
    }

    fn require_active(&self, step: Step) -> WizardResult<()> {
        self.require_enabled(step)?;
        if self.active_step() == step {
            Ok(())
        } else {
            Err(WizardError::StepCompleted(step))
        }
    }

    /// Record the application. Only valid as the first submission.
    pub fn select_context(&mut self, application: impl Into<String>) -> WizardResult<()> {
        self.require_active(Step::Context)?;
        self.progress = Progress::ContextChosen {
            application: application.into(),
        };
        Ok(())
    }

    /// Record zero or more risks for the chosen application.
    pub fn select_risks(&mut self, risks: BTreeSet<String>) -> WizardResult<()> {
        self.require_active(Step::Risk)?;
        let application = match std::mem::take(&mut self.progress) {
            Progress::ContextChosen { application } => application,
            other => {
                self.progress = other;
                return Err(WizardError::Locked(Step::Risk));
            }
        };
        self.progress = Progress::RisksChosen { application, risks };
        Ok(())
    }

    /// Record treatments; every selected risk needs at least one.
    ///
    /// On rejection the state is unchanged and stays at Countermeasure.
    pub fn select_countermeasures(&mut self, treatments: TreatmentSelection) -> WizardResult<()> {
        self.require_active(Step::Countermeasure)?;
        let risks = self.risks().cloned().unwrap_or_default();
        if risks.is_empty() {
            return Err(WizardError::NoRisksSelected);
        }
        if let Some(extra) = treatments.keys().find(|risk| !risks.contains(*risk)) {
            return Err(WizardError::UnknownOption {
                step: Step::Countermeasure,
                value: extra.clone(),
            });
        }
        let missing: Vec<String> = risks
            .iter()
            .filter(|risk| treatments.get(*risk).map_or(true, BTreeSet::is_empty))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(WizardError::MissingCountermeasures(missing));
        }

        if let Progress::RisksChosen { application, risks } = std::mem::take(&mut self.progress) {
            self.progress = Progress::CountermeasuresChosen {
                application,
                risks,
                treatments,
            };
        }
        Ok(())
    }

    /// Clear every selection and return to the Context step
    pub fn reset(&mut self) {
        self.progress = Progress::Start;
    }
}
