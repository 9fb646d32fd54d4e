//! Report rendering port trait.

use crate::domain::registry::StrategyProfile;
use crate::domain::report::BatchOutcome;

/// Port for turning batch outcomes into text.
pub trait ReportPort {
    fn render(&self, outcome: &BatchOutcome, strategy: Option<&StrategyProfile>) -> String;

    /// Default implementation: renders each outcome in turn.
    fn render_all(&self, outcomes: &[(BatchOutcome, Option<&StrategyProfile>)]) -> String {
        outcomes
            .iter()
            .map(|(outcome, strategy)| self.render(outcome, *strategy))
            .collect()
    }
}
