//! A wizard session: the step state plus the graph and model it queries

use super::state::{Step, TreatmentSelection, WizardState};
use super::{WizardError, WizardResult};
use crate::guidance::{GuidanceGenerator, GuidanceRecord};
use crate::llm::GuidanceModel;
use crate::storage::GraphStore;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Treatments on offer for one selected risk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountermeasureOptions {
    pub risk: String,
    pub treatments: Vec<String>,
}

/// Flat (risk, treatment) records plus notices for pairs without a phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    pub records: Vec<GuidanceRecord>,
    pub notices: Vec<String>,
}

/// What the Guidelines panel shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guidelines {
    pub risks: Vec<String>,
    pub records: Vec<GuidanceRecord>,
    pub notices: Vec<String>,
    /// Model output; `None` when there were no records to send
    pub text: Option<String>,
}

/// One user's pass through the four panels.
///
/// The graph is only read. Each method is one interaction and returns
/// once its queries (or model call) finish.
pub struct WizardSession {
    store: Arc<dyn GraphStore>,
    generator: GuidanceGenerator,
    state: WizardState,
}

impl WizardSession {
    pub fn new(store: Arc<dyn GraphStore>, model: Arc<dyn GuidanceModel>) -> Self {
        Self {
            store,
            generator: GuidanceGenerator::new(model),
            state: WizardState::new(),
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn active_step(&self) -> Step {
        self.state.active_step()
    }

    // === Context ===

    pub async fn context_options(&self) -> WizardResult<Vec<String>> {
        Ok(self.store.list_applications().await?)
    }

    pub async fn submit_context(&mut self, application: &str) -> WizardResult<()> {
        let options = self.context_options().await?;
        if !options.iter().any(|a| a == application) {
            return Err(WizardError::UnknownOption {
                step: Step::Context,
                value: application.to_string(),
            });
        }
        self.state.select_context(application)?;
        tracing::debug!(application, "context selected");
        Ok(())
    }

    // === Risk ===

    fn selected_application(&self, step: Step) -> WizardResult<&str> {
        self.state.require_enabled(step)?;
        self.state.application().ok_or(WizardError::Locked(step))
    }

    pub async fn risk_options(&self) -> WizardResult<Vec<String>> {
        let application = self.selected_application(Step::Risk)?;
        Ok(self.store.list_risks(application).await?)
    }

    pub async fn submit_risks<I, S>(&mut self, risks: I) -> WizardResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = self.risk_options().await?;
        let risks: BTreeSet<String> = risks.into_iter().map(Into::into).collect();
        if let Some(unknown) = risks.iter().find(|r| !options.contains(*r)) {
            return Err(WizardError::UnknownOption {
                step: Step::Risk,
                value: unknown.clone(),
            });
        }
        tracing::debug!(count = risks.len(), "risks selected");
        self.state.select_risks(risks)
    }

    // === Countermeasure ===

    /// Treatments valid for both the risk and the selected context, per
    /// selected risk. An empty list means nothing can be chosen for it.
    pub async fn countermeasure_options(&self) -> WizardResult<Vec<CountermeasureOptions>> {
        let application = self.selected_application(Step::Countermeasure)?;
        let risks = self.state.risks().ok_or(WizardError::Locked(Step::Countermeasure))?;
        let mut options = Vec::with_capacity(risks.len());
        for risk in risks {
            options.push(CountermeasureOptions {
                risk: risk.clone(),
                treatments: self.store.list_treatments(risk, application).await?,
            });
        }
        Ok(options)
    }

    pub async fn submit_countermeasures(&mut self, treatments: TreatmentSelection) -> WizardResult<()> {
        let options = self.countermeasure_options().await?;
        for offered in &options {
            let Some(chosen) = treatments.get(&offered.risk) else {
                continue;
            };
            if let Some(unknown) = chosen.iter().find(|t| !offered.treatments.contains(*t)) {
                return Err(WizardError::UnknownOption {
                    step: Step::Countermeasure,
                    value: unknown.clone(),
                });
            }
        }
        if let Err(e) = self.state.select_countermeasures(treatments) {
            tracing::warn!(error = %e, "countermeasure submission rejected");
            return Err(e);
        }
        Ok(())
    }

    // === Guidelines ===

    /// Look up phase and stakeholder for every chosen (risk, treatment) pair
    pub async fn collect_records(&self) -> WizardResult<RecordSet> {
        self.state.require_enabled(Step::Guidelines)?;
        let treatments = self
            .state
            .treatments()
            .ok_or(WizardError::Locked(Step::Guidelines))?;

        let mut set = RecordSet::default();
        for (risk, chosen) in treatments {
            for treatment in chosen {
                let Some(lc_phase) = self.store.treatment_phase(risk, treatment).await? else {
                    set.notices
                        .push(format!("There are no countermeasure registered for the risk: {risk}"));
                    continue;
                };
                set.records.push(GuidanceRecord {
                    risk: risk.clone(),
                    treatment: treatment.clone(),
                    lc_phase,
                    stakeholder: self.store.stakeholder(treatment).await?,
                });
            }
        }
        Ok(set)
    }

    /// Build the records and, when there are any, ask the model for
    /// guidelines. A model failure is returned as an error.
    pub async fn generate_guidelines(&self) -> WizardResult<Guidelines> {
        let RecordSet { records, notices } = self.collect_records().await?;
        let risks = self
            .state
            .treatments()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();

        let text = if records.is_empty() {
            None
        } else {
            Some(self.generator.generate(&records).await?)
        };

        Ok(Guidelines {
            risks,
            records,
            notices,
            text,
        })
    }

    /// Clear all selections and return to the Context panel
    pub fn reset(&mut self) {
        self.state.reset();
        tracing::debug!("selections reset");
    }
}
