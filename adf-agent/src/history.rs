//! Per-session result history (in memory only)

use adf_agent_sdk::AgentResult;

#[derive(Debug, Default, Clone)]
pub struct SessionHistory {
    results: Vec<AgentResult>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: AgentResult) {
        self.results.push(result);
    }

    pub fn latest(&self) -> Option<&AgentResult> {
        self.results.last()
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &AgentResult> {
        self.results.iter()
    }
}
