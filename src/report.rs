//! Human-readable summary of a pipeline run.
//!
//! Each stage contributes one [`RunStep`]. Non-fatal diagnostics such as
//! unmatched merge keys surface as warnings; a failed stage marks the run as
//! failed.

use serde::Serialize;
use std::fmt;

#[cfg(feature = "colorized_output")]
use console::style;

/// Outcome of one pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum StepStatus {
    /// Step completed
    Ok,
    /// Step completed with diagnostics
    Warning(String),
    /// Step failed; later steps did not run
    Failed(String),
}

impl StepStatus {
    fn is_ok(&self) -> bool {
        matches!(self, StepStatus::Ok)
    }

    fn is_warning(&self) -> bool {
        matches!(self, StepStatus::Warning(_))
    }

    fn is_failed(&self) -> bool {
        matches!(self, StepStatus::Failed(_))
    }
}

/// One line of the report.
#[derive(Debug, Clone, Serialize)]
pub struct RunStep {
    /// Step name, e.g. `merge:gnps`
    pub name: String,
    /// Result status
    #[serde(flatten)]
    pub status: StepStatus,
    /// Rows in the table after the step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
}

impl RunStep {
    /// Successful step.
    pub fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Ok,
            rows: None,
        }
    }

    /// Step that completed with a diagnostic.
    pub fn warning(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Warning(message.into()),
            rows: None,
        }
    }

    /// Failed step.
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Failed(message.into()),
            rows: None,
        }
    }

    /// Attach the row count after the step.
    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }
}

/// Report for one run over an input table.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Steps in execution order
    pub steps: Vec<RunStep>,
    /// Input the run started from
    pub source: String,
}

impl RunReport {
    /// Empty report for `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            steps: Vec::new(),
            source: source.into(),
        }
    }

    /// Append a step.
    pub fn add_step(&mut self, step: RunStep) {
        self.steps.push(step);
    }

    /// True if any step failed.
    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(|s| s.status.is_failed())
    }

    /// True if any step warned.
    pub fn has_warnings(&self) -> bool {
        self.steps.iter().any(|s| s.status.is_warning())
    }

    /// Number of clean steps.
    pub fn success_count(&self) -> usize {
        self.steps.iter().filter(|s| s.status.is_ok()).count()
    }

    /// Number of steps with warnings.
    pub fn warning_count(&self) -> usize {
        self.steps.iter().filter(|s| s.status.is_warning()).count()
    }

    /// Number of failed steps.
    pub fn failure_count(&self) -> usize {
        self.steps.iter().filter(|s| s.status.is_failed()).count()
    }

    fn verdict(&self) -> &'static str {
        if self.has_failures() {
            "Run FAILED"
        } else if self.has_warnings() {
            "Run COMPLETED with warnings"
        } else {
            "Run COMPLETED"
        }
    }

    /// Render with terminal colors when the `colorized_output` feature is on.
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            use console::Emoji;

            static OK: Emoji<'_, '_> = Emoji("✓", "[OK]");
            static WARN: Emoji<'_, '_> = Emoji("⚠", "[WARN]");
            static FAIL: Emoji<'_, '_> = Emoji("✗", "[FAIL]");

            let mut output = String::new();
            output.push_str(&format!("{}\n", style("Annotation Run Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("=====================").cyan()));
            output.push_str(&format!("{}: {}\n\n", style("Input").bold(), self.source));

            for step in &self.steps {
                let symbol = match &step.status {
                    StepStatus::Ok => OK,
                    StepStatus::Warning(_) => WARN,
                    StepStatus::Failed(_) => FAIL,
                };
                let name = match &step.status {
                    StepStatus::Ok => style(step.name.as_str()).green(),
                    StepStatus::Warning(_) => style(step.name.as_str()).yellow(),
                    StepStatus::Failed(_) => style(step.name.as_str()).red(),
                };
                output.push_str(&format!("[{}] {}", symbol, name));
                if let Some(rows) = step.rows {
                    output.push_str(&format!(" ({} rows)", rows));
                }
                match &step.status {
                    StepStatus::Ok => output.push('\n'),
                    StepStatus::Warning(msg) => {
                        output.push_str(&format!(" - {}: {}\n", style("WARNING").yellow().bold(), msg));
                    }
                    StepStatus::Failed(msg) => {
                        output.push_str(&format!(" - {}: {}\n", style("FAILED").red().bold(), msg));
                    }
                }
            }

            output.push('\n');
            output.push_str(&format!(
                "{}: {} passed, {} warnings, {} failed\n\n",
                style("Summary").bold(),
                style(self.success_count()).green(),
                style(self.warning_count()).yellow(),
                style(self.failure_count()).red()
            ));
            let verdict = if self.has_failures() {
                style(self.verdict()).red().bold()
            } else if self.has_warnings() {
                style(self.verdict()).yellow().bold()
            } else {
                style(self.verdict()).green().bold()
            };
            output.push_str(&format!("{}\n", verdict));
            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Annotation Run Report")?;
        writeln!(f, "=====================")?;
        writeln!(f, "Input: {}", self.source)?;
        writeln!(f)?;

        for step in &self.steps {
            let symbol = match &step.status {
                StepStatus::Ok => "✓",
                StepStatus::Warning(_) => "⚠",
                StepStatus::Failed(_) => "✗",
            };
            write!(f, "[{}] {}", symbol, step.name)?;
            if let Some(rows) = step.rows {
                write!(f, " ({} rows)", rows)?;
            }
            match &step.status {
                StepStatus::Ok => writeln!(f)?,
                StepStatus::Warning(msg) => writeln!(f, " - WARNING: {}", msg)?,
                StepStatus::Failed(msg) => writeln!(f, " - FAILED: {}", msg)?,
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Summary: {} passed, {} warnings, {} failed",
            self.success_count(),
            self.warning_count(),
            self.failure_count()
        )?;
        writeln!(f)?;
        writeln!(f, "{}", self.verdict())
    }
}
