//! Correlation ids tying together every entry of one request or call chain.

use uuid::Uuid;

/// Returns `candidate` when it is present and non-empty, otherwise a freshly
/// generated id (a random UUID v4).
pub fn resolve(candidate: Option<&str>) -> String {
    match candidate {
        Some(trace_id) if !trace_id.is_empty() => trace_id.to_owned(),
        _ => Uuid::new_v4().to_string(),
    }
}

/// Carries one trace id through a call chain.
///
/// Created at a boundary (an incoming request, a job pickup) and passed down
/// to every logging call belonging to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceContext {
    trace_id: String,
}

impl TraceContext {
    /// Propagates `candidate` if the caller supplied one, or starts a new trace.
    pub fn new(candidate: Option<&str>) -> Self {
        Self {
            trace_id: resolve(candidate),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new(None)
    }
}
