use std::fmt;

/// Free-text marker attached to a result: recorded assumptions,
/// validation reasons, unit-local error text. Carried through to the
/// output sheet unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation(pub String);

impl Annotation {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Annotation(text.into())
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal state of a computed result.
///
/// A result's lifecycle is pending → computing → terminal; the engine only
/// ever hands out terminal states, and nothing mutates a result after it
/// reaches one. Flagging retains the value: validation informs, it does
/// not destroy data.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultState {
    Resolved(f64),
    Flagged { value: f64, reasons: Vec<String> },
    Unresolved { reason: String },
}

/// A final computed value (or explicit unresolved marker) for one unit
/// and one output column, with the annotations accumulated on the way.
#[derive(Debug, Clone)]
pub struct CalcResult {
    pub column: String,
    pub state: ResultState,
    pub notes: Vec<Annotation>,
}

impl CalcResult {
    #[must_use]
    pub fn resolved(column: &str, value: f64) -> Self {
        CalcResult {
            column: column.to_string(),
            state: ResultState::Resolved(value),
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn unresolved(column: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        CalcResult {
            column: column.to_string(),
            state: ResultState::Unresolved { reason },
            notes: Vec::new(),
        }
    }

    /// The numeric value, present for resolved and flagged results.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        match &self.state {
            ResultState::Resolved(v) | ResultState::Flagged { value: v, .. } => Some(*v),
            ResultState::Unresolved { .. } => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, ResultState::Resolved(_))
    }

    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(self.state, ResultState::Unresolved { .. })
    }

    #[must_use]
    pub fn is_flagged(&self) -> bool {
        matches!(self.state, ResultState::Flagged { .. })
    }

    /// Attach an annotation.
    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(Annotation::new(note));
    }

    /// Downgrade to flagged, retaining the value. No-op for unresolved
    /// results; an already-flagged result accumulates the reason.
    pub fn flag(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        match &mut self.state {
            ResultState::Resolved(v) => {
                self.state = ResultState::Flagged {
                    value: *v,
                    reasons: vec![reason],
                };
            }
            ResultState::Flagged { reasons, .. } => reasons.push(reason),
            ResultState::Unresolved { .. } => {}
        }
    }

    /// Downgrade to unresolved with a reason (hard rules, unit-local
    /// errors). Idempotent for already-unresolved results.
    pub fn invalidate(&mut self, reason: impl Into<String>) {
        if !self.is_unresolved() {
            self.state = ResultState::Unresolved {
                reason: reason.into(),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessor() {
        assert_eq!(CalcResult::resolved("A", 10.0).value(), Some(10.0));
        assert_eq!(CalcResult::unresolved("A", "missing").value(), None);
    }

    #[test]
    fn test_flag_retains_value() {
        let mut r = CalcResult::resolved("A", -5.0);
        r.flag("negative");
        assert!(r.is_flagged());
        assert_eq!(r.value(), Some(-5.0));

        r.flag("also out of range");
        match &r.state {
            ResultState::Flagged { reasons, .. } => assert_eq!(reasons.len(), 2),
            _ => panic!("expected flagged"),
        }
    }

    #[test]
    fn test_flag_on_unresolved_is_noop() {
        let mut r = CalcResult::unresolved("A", "missing");
        r.flag("negative");
        assert!(r.is_unresolved());
    }

    #[test]
    fn test_invalidate() {
        let mut r = CalcResult::resolved("A", 1.0);
        r.invalidate("hard rule");
        assert!(r.is_unresolved());
        assert_eq!(r.value(), None);
    }
}
