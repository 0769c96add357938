//! Terminal form surface for the wizard
//!
//! Renders the four panels in order on a line-oriented terminal. Every
//! prompt also accepts `reset` (clear all selections, back to Context)
//! and `quit`.

use super::{Step, TreatmentSelection, WizardError, WizardSession};
use rustyline::error::ReadlineError;
use std::collections::{BTreeSet, VecDeque};
use std::io::{self, Write};
use thiserror::Error;

/// Failures that end the console session. User mistakes never do.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Wizard(WizardError),
}

/// Source of typed lines
pub trait LineInput {
    /// Next line, or `None` once input is closed
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// Interactive input with line editing and history
pub struct EditorInput {
    editor: rustyline::DefaultEditor,
}

impl EditorInput {
    pub fn new() -> Result<Self, ReadlineError> {
        Ok(Self {
            editor: rustyline::DefaultEditor::new()?,
        })
    }
}

impl LineInput for EditorInput {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                    tracing::warn!(error = %e, "failed to record history entry");
                }
                Some(line)
            }
            Err(e) => {
                if !is_user_exit(&e) {
                    tracing::warn!(error = %e, "terminal read failed, ending session");
                }
                None
            }
        }
    }
}

/// Ctrl-C and Ctrl-D end the session quietly; anything else is a fault
fn is_user_exit(error: &ReadlineError) -> bool {
    matches!(error, ReadlineError::Interrupted | ReadlineError::Eof)
}

/// Pre-recorded input, one entry per prompt
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl LineInput for ScriptedInput {
    fn read_line(&mut self, _prompt: &str) -> Option<String> {
        self.lines.pop_front()
    }
}

enum Answer {
    Line(String),
    Reset,
    Quit,
}

enum Flow {
    Continue,
    Reset,
    Quit,
}

const RESET_OR_QUIT: &str = "Type 'reset' to start over or 'quit' to exit: ";

/// Parse "1, 3 4" into distinct zero-based indices below `count`
fn parse_choices(line: &str, count: usize) -> Result<Vec<usize>, String> {
    let mut seen = BTreeSet::new();
    let mut choices = Vec::new();
    for token in line.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty()) {
        let index = token
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=count).contains(n))
            .ok_or_else(|| format!("'{token}' is not a number between 1 and {count}."))?;
        if seen.insert(index) {
            choices.push(index - 1);
        }
    }
    Ok(choices)
}

fn pick<'a>(options: &'a [String], indices: &[usize]) -> Vec<&'a str> {
    indices.iter().map(|&i| options[i].as_str()).collect()
}

/// Drives one [`WizardSession`] from a [`LineInput`], writing panels to `W`
pub struct Console<I, W> {
    session: WizardSession,
    input: I,
    out: W,
}

impl<I: LineInput, W: Write> Console<I, W> {
    pub fn new(session: WizardSession, input: I, out: W) -> Self {
        Self { session, input, out }
    }

    pub fn session(&self) -> &WizardSession {
        &self.session
    }

    pub fn into_parts(self) -> (WizardSession, W) {
        (self.session, self.out)
    }

    /// Show panels until the user quits or input ends
    pub async fn run(&mut self) -> Result<(), ConsoleError> {
        writeln!(self.out, "AI Acquisition Guidelines Generator")?;
        loop {
            let step = self.session.active_step();
            writeln!(self.out)?;
            let flow = match step {
                Step::Context => self.context_panel().await?,
                Step::Risk => self.risk_panel().await?,
                Step::Countermeasure => self.countermeasure_panel().await?,
                Step::Guidelines => self.guidelines_panel().await?,
            };
            match flow {
                Flow::Continue => {}
                Flow::Reset => {
                    self.session.reset();
                    writeln!(self.out, "Selections cleared. Starting again from the Context tab.")?;
                }
                Flow::Quit => {
                    writeln!(self.out, "Goodbye.")?;
                    return Ok(());
                }
            }
        }
    }

    fn ask(&mut self, prompt: &str) -> Answer {
        match self.input.read_line(prompt) {
            None => Answer::Quit,
            Some(line) => match line.trim() {
                "reset" => Answer::Reset,
                "quit" | "exit" => Answer::Quit,
                other => Answer::Line(other.to_string()),
            },
        }
    }

    /// Print a rejection inline; storage failures end the session
    fn warn(&mut self, error: WizardError) -> Result<(), ConsoleError> {
        match error {
            WizardError::Storage(_) => Err(ConsoleError::Wizard(error)),
            other => {
                writeln!(self.out, "Warning: {other}")?;
                Ok(())
            }
        }
    }

    fn list(&mut self, options: &[String]) -> io::Result<()> {
        for (i, option) in options.iter().enumerate() {
            writeln!(self.out, "  {}. {}", i + 1, option)?;
        }
        Ok(())
    }

    fn wait_for_reset(&mut self) -> Flow {
        loop {
            match self.ask(RESET_OR_QUIT) {
                Answer::Reset => return Flow::Reset,
                Answer::Quit => return Flow::Quit,
                Answer::Line(_) => {}
            }
        }
    }

    async fn context_panel(&mut self) -> Result<Flow, ConsoleError> {
        writeln!(self.out, "== Select Context ==")?;
        let applications = self.session.context_options().await.map_err(ConsoleError::Wizard)?;
        if applications.is_empty() {
            writeln!(self.out, "No applications found. Import risk data first.")?;
            return Ok(Flow::Quit);
        }
        self.list(&applications)?;

        let line = match self.ask(&format!("Choose an application [1-{}]: ", applications.len())) {
            Answer::Line(line) => line,
            Answer::Reset => return Ok(Flow::Reset),
            Answer::Quit => return Ok(Flow::Quit),
        };
        let choice = match parse_choices(&line, applications.len()) {
            Ok(choices) if choices.len() == 1 => choices[0],
            Ok(_) => {
                writeln!(self.out, "Warning: choose exactly one application.")?;
                return Ok(Flow::Continue);
            }
            Err(message) => {
                writeln!(self.out, "Warning: {message}")?;
                return Ok(Flow::Continue);
            }
        };

        let application = applications[choice].clone();
        match self.session.submit_context(&application).await {
            Ok(()) => writeln!(
                self.out,
                "Context '{application}' selected. You can now proceed to the Risk tab."
            )?,
            Err(e) => self.warn(e)?,
        }
        Ok(Flow::Continue)
    }

    async fn risk_panel(&mut self) -> Result<Flow, ConsoleError> {
        writeln!(self.out, "== Select Risk ==")?;
        let risks = self.session.risk_options().await.map_err(ConsoleError::Wizard)?;
        if risks.is_empty() {
            let application = self.session.state().application().unwrap_or_default().to_string();
            writeln!(
                self.out,
                "No risks are registered for context '{application}'. Reset to choose another context."
            )?;
        }
        self.list(&risks)?;

        let line = match self.ask("Choose risks (numbers separated by commas, blank for none): ") {
            Answer::Line(line) => line,
            Answer::Reset => return Ok(Flow::Reset),
            Answer::Quit => return Ok(Flow::Quit),
        };
        let chosen = match parse_choices(&line, risks.len()) {
            Ok(indices) => pick(&risks, &indices),
            Err(message) => {
                writeln!(self.out, "Warning: {message}")?;
                return Ok(Flow::Continue);
            }
        };

        let summary = if chosen.is_empty() {
            "No risks selected.".to_string()
        } else {
            format!("Risks '{}' selected.", chosen.join(", "))
        };
        match self.session.submit_risks(chosen).await {
            Ok(()) => writeln!(self.out, "{summary} You can now proceed to the Countermeasure tab.")?,
            Err(e) => self.warn(e)?,
        }
        Ok(Flow::Continue)
    }

    async fn countermeasure_panel(&mut self) -> Result<Flow, ConsoleError> {
        writeln!(self.out, "== Select Countermeasure ==")?;
        let offered = self
            .session
            .countermeasure_options()
            .await
            .map_err(ConsoleError::Wizard)?;
        if offered.is_empty() {
            self.warn(WizardError::NoRisksSelected)?;
            return Ok(self.wait_for_reset());
        }

        let mut selection = TreatmentSelection::new();
        for options in &offered {
            writeln!(self.out, "-- Countermeasure for Risk: {}", options.risk)?;
            if options.treatments.is_empty() {
                writeln!(
                    self.out,
                    "No countermeasures are registered for risk '{}'. Reset to choose different risks.",
                    options.risk
                )?;
                continue;
            }
            self.list(&options.treatments)?;
            loop {
                let line = match self.ask(&format!("Choose countermeasure for {}: ", options.risk)) {
                    Answer::Line(line) => line,
                    Answer::Reset => return Ok(Flow::Reset),
                    Answer::Quit => return Ok(Flow::Quit),
                };
                match parse_choices(&line, options.treatments.len()) {
                    Ok(indices) => {
                        let chosen = pick(&options.treatments, &indices)
                            .into_iter()
                            .map(str::to_string)
                            .collect();
                        selection.insert(options.risk.clone(), chosen);
                        break;
                    }
                    Err(message) => writeln!(self.out, "Warning: {message}")?,
                }
            }
        }

        match self.session.submit_countermeasures(selection).await {
            Ok(()) => {
                writeln!(
                    self.out,
                    "Treatments selected. You can now proceed to the Guidelines tab."
                )?;
                Ok(Flow::Continue)
            }
            Err(e) => {
                self.warn(e)?;
                if offered.iter().any(|o| o.treatments.is_empty()) {
                    Ok(self.wait_for_reset())
                } else {
                    Ok(Flow::Continue)
                }
            }
        }
    }

    async fn guidelines_panel(&mut self) -> Result<Flow, ConsoleError> {
        writeln!(self.out, "== Guidelines for Risk Mitigation ==")?;
        let risks: Vec<&str> = self
            .session
            .state()
            .risks()
            .map(|r| r.iter().map(String::as_str).collect())
            .unwrap_or_default();
        writeln!(self.out, "The selected risk(s) is/are:")?;
        writeln!(self.out, "Risk: {}", risks.join(", "))?;

        match self.session.generate_guidelines().await {
            Ok(guidelines) => {
                for notice in &guidelines.notices {
                    writeln!(self.out, "{notice}")?;
                }
                match guidelines.text {
                    Some(text) => writeln!(self.out, "\n{text}")?,
                    None => writeln!(
                        self.out,
                        "No registered countermeasures to describe, so no guidelines were generated."
                    )?,
                }
            }
            Err(e) => self.warn(e)?,
        }
        Ok(self.wait_for_reset())
    }
}
