use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(String),
}

/// One entry of the load ledger, in the order strategies were tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub index: usize,
    pub strategy: Strategy,
    pub outcome: Outcome,
}

impl Attempt {
    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

impl std::fmt::Display for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            Outcome::Success => write!(f, "{}. {} ✓", self.index, self.strategy),
            Outcome::Failure(reason) => write!(
                f,
                "{}. {} ✗ {}",
                self.index,
                self.strategy,
                crate::truncate(reason, crate::ERROR_PREVIEW)
            ),
        }
    }
}
