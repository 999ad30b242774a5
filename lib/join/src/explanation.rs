use crate::JoinCoefficients;
use itertools::Itertools;
use rdf_federation_common::{JoinRejection, JoinType};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Describes how the mediator planned a join.
///
/// Lists every registered algorithm in declaration order with either its coefficients or the
/// reason why it rejected the join.
#[derive(Clone, Debug)]
pub struct JoinExplanation {
    /// The kind of the explained join.
    pub join_type: JoinType,
    /// The number of entries of the explained join.
    pub entries: usize,
    /// The test result of each algorithm.
    pub candidates: Vec<(&'static str, Result<JoinCoefficients, JoinRejection>)>,
    /// The name of the selected algorithm, if any algorithm accepted the join.
    pub selected: Option<&'static str>,
}

impl JoinExplanation {
    /// Returns the coefficients of the selected algorithm.
    pub fn selected_coefficients(&self) -> Option<&JoinCoefficients> {
        let selected = self.selected?;
        self.candidates
            .iter()
            .find(|(name, _)| *name == selected)
            .and_then(|(_, result)| result.as_ref().ok())
    }

    /// Returns the names of the algorithms that accepted the join.
    pub fn accepted(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.candidates
            .iter()
            .filter(|(_, result)| result.is_ok())
            .map(|(name, _)| *name)
    }
}

impl Display for JoinExplanation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} join over {} entries", self.join_type, self.entries)?;
        let candidates = self.candidates.iter().format_with("\n", |(name, result), f| {
            match result {
                Ok(coefficients) => f(&format_args!("  {name}: {coefficients}")),
                Err(rejection) => f(&format_args!("  {name}: rejected ({})", rejection.reason)),
            }
        });
        if !self.candidates.is_empty() {
            writeln!(f, "{candidates}")?;
        }
        write!(f, "selected: {}", self.selected.unwrap_or("none"))
    }
}
