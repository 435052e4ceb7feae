use serde::Serialize;

use super::NormalizedWorkflow;

/// A node in the step chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainNode {
    pub position: usize,
    pub label: String,
}

/// Workflow structure as an ordered sequence: every step hands off to the
/// next one. Declared step dependencies are carried on the steps but are
/// not turned into edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepChain {
    pub nodes: Vec<ChainNode>,
}

impl StepChain {
    pub fn from_workflow(workflow: &NormalizedWorkflow) -> Self {
        let nodes = workflow
            .step_labels()
            .into_iter()
            .enumerate()
            .map(|(position, label)| ChainNode { position, label })
            .collect();
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Hand-off edges as `(from, to)` positions.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        (1..self.nodes.len()).map(|i| (i - 1, i)).collect()
    }

    pub fn render(&self, separator: &str) -> String {
        self.nodes
            .iter()
            .map(|n| n.label.as_str())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::normalizer::normalize_csv;

    #[test]
    fn test_chain_links_consecutive_steps() {
        let workflow = normalize_csv(b"name\nIntake\nReview\nShip\n").unwrap();
        let chain = StepChain::from_workflow(&workflow);
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.edges(), vec![(0, 1), (1, 2)]);
        assert_eq!(chain.render(" -> "), "Intake -> Review -> Ship");
    }

    #[test]
    fn test_empty_chain() {
        let workflow = normalize_csv(b"name\n").unwrap();
        let chain = StepChain::from_workflow(&workflow);
        assert!(chain.is_empty());
        assert!(chain.edges().is_empty());
    }
}
