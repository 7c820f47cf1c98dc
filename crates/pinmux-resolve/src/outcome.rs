//! Result of one resolution step.

use pinmux_core::Diagnostic;

/// An optional resolved node plus the diagnostics found producing it.
///
/// Steps never short-circuit: a step can resolve its node and still report
/// warnings, or drop it and report why.
#[derive(Debug, Clone)]
pub(crate) struct Outcome<T> {
    pub node: Option<T>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Outcome<T> {
    pub fn resolved(node: T) -> Self {
        Self {
            node: Some(node),
            diagnostics: Vec::new(),
        }
    }

    pub fn dropped(diagnostic: Diagnostic) -> Self {
        Self {
            node: None,
            diagnostics: vec![diagnostic],
        }
    }

    pub fn with(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    /// Move the diagnostics into `sink` and return the node.
    pub fn collect_into(self, sink: &mut Vec<Diagnostic>) -> Option<T> {
        sink.extend(self.diagnostics);
        self.node
    }
}
