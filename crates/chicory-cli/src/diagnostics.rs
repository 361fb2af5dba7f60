use chicory_core::diagnostics::{Diagnostic, DiagnosticSink, Severity};

/// Forwards plugin diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        let id = diagnostic.id.as_deref().unwrap_or("");
        match diagnostic.severity {
            Severity::Error => tracing::error!(
                plugin = %diagnostic.plugin,
                hook = diagnostic.hook,
                id,
                "{}",
                diagnostic.message
            ),
            Severity::Warning => tracing::warn!(
                plugin = %diagnostic.plugin,
                hook = diagnostic.hook,
                id,
                "{}",
                diagnostic.message
            ),
        }
    }
}
