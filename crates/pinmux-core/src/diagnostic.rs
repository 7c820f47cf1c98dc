//! Accumulated validation findings.
//!
//! Diagnostics are collected across the whole pipeline and returned next to
//! a best-effort result; they are never raised as errors. Whether an
//! error-severity diagnostic blocks artifact generation is decided by the
//! caller.

use std::fmt;

use serde::Serialize;

use crate::pin::Pin;
use crate::resource::ResourceRef;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// What kind of problem a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A line did not match the grammar of its keyword.
    SyntaxIssue,
    /// The same resource (or timer pin) was declared more than once.
    DuplicateResource,
    /// The pin cannot serve the requested peripheral kind or role at all.
    UnsupportedPin,
    /// The pin serves the kind, but not the requested instance.
    InstanceMismatch,
    /// No timer mapping of the pin uses the annotated alternate function.
    NoMatchingVariant,
    /// More than one timer mapping uses the annotated alternate function.
    AmbiguousMapping,
    /// A timer-bearing output has no `timer` annotation.
    MissingTimer,
    /// A timer comment disagrees with the capability table.
    AdvisoryMismatch,
    /// One physical pin is claimed by several resources.
    PinConflict,
    /// A bus is missing one of its required signals.
    IncompleteBus,
    /// A device setting selects a bus that did not resolve.
    UnresolvedBusReference,
    /// An output protocol name was not recognized.
    UnknownProtocol,
    /// Outputs with different frequencies share one timer.
    TimerFrequencyConflict,
    /// Several outputs drive the same timer channel.
    TimerChannelConflict,
    /// Several board bus indices resolve to one peripheral instance.
    BusInstanceConflict,
    /// The pin does not appear anywhere in the capability table.
    UnknownPin,
}

/// A single validation finding with resource identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Actionable, human-readable description.
    pub message: String,
    /// The resource the finding is about, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceRef>,
    /// The physical pin involved, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<Pin>,
    /// 1-based source line in the board definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, message)
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, message)
    }

    fn new(severity: Severity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            resource: None,
            pin: None,
            line: None,
        }
    }

    pub fn with_resource(mut self, resource: ResourceRef) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_pin(mut self, pin: Pin) -> Self {
        self.pin = Some(pin);
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.severity)?;
        match (&self.resource, self.pin) {
            (Some(resource), Some(pin)) => write!(f, "{resource} ({pin}): ")?,
            (Some(resource), None) => write!(f, "{resource}: ")?,
            (None, Some(pin)) => write!(f, "{pin}: ")?,
            (None, None) => {}
        }
        write!(f, "{}", self.message)?;
        if let Some(line) = self.line {
            write!(f, " [line {line}]")?;
        }
        Ok(())
    }
}

/// Error and warning counts over a diagnostic list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticSummary {
    pub errors: usize,
    pub warnings: usize,
}

impl DiagnosticSummary {
    pub fn of(diagnostics: &[Diagnostic]) -> Self {
        diagnostics
            .iter()
            .fold(Self::default(), |mut acc, d| {
                match d.severity {
                    Severity::Error => acc.errors += 1,
                    Severity::Warning => acc.warnings += 1,
                }
                acc
            })
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

impl fmt::Display for DiagnosticSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s), {} warning(s)", self.errors, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{OutputFamily, ResourceType};

    #[test]
    fn display_includes_identity() {
        let d = Diagnostic::error(DiagnosticKind::MissingTimer, "no timer assignment")
            .with_resource(ResourceRef::new(ResourceType::Timer(OutputFamily::Motor), 2))
            .with_pin(Pin::new('A', 9).unwrap())
            .with_line(14);
        assert_eq!(
            d.to_string(),
            "error: MOTOR 2 (A09): no timer assignment [line 14]"
        );
    }

    #[test]
    fn summary_counts() {
        let diags = vec![
            Diagnostic::error(DiagnosticKind::PinConflict, "a"),
            Diagnostic::warning(DiagnosticKind::SyntaxIssue, "b"),
            Diagnostic::warning(DiagnosticKind::SyntaxIssue, "c"),
        ];
        let summary = DiagnosticSummary::of(&diags);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.warnings, 2);
        assert!(summary.has_errors());
        assert_eq!(summary.to_string(), "1 error(s), 2 warning(s)");
    }

    #[test]
    fn json_shape() {
        let d = Diagnostic::warning(DiagnosticKind::UnknownProtocol, "fallback")
            .with_pin(Pin::new('B', 4).unwrap());
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["kind"], "unknown-protocol");
        assert_eq!(json["pin"], "B04");
        assert!(json.get("resource").is_none());
    }
}
