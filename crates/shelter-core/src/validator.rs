//! Stability Validator
//!
//! Post-hoc global audit of the final assignment. Uses ground-truth
//! positions and shelters only, never gossip-acquired knowledge.

use thiserror::Error;

use crate::agent::Agent;
use crate::error::{AgentError, StabilityViolation};
use crate::grid::Metric;

/// Check every unordered pair for a shelter swap that would lower the pair's
/// combined distance. Reports the first offending pair.
pub fn check_stability(agents: &[Agent], metric: &impl Metric) -> Result<(), ValidationError> {
    for (i, first) in agents.iter().enumerate() {
        for second in &agents[i + 1..] {
            audit_pair(first, second, agents.len(), metric)?;
        }
    }
    Ok(())
}

/// Audit a single pair of agents.
pub fn audit_pair(
    first: &Agent,
    second: &Agent,
    agent_count: usize,
    metric: &impl Metric,
) -> Result<(), ValidationError> {
    let a = first.record()?;
    let b = second.record()?;

    let swapped_first = metric.distance(a.position, b.shelter);
    let swapped_second = metric.distance(b.position, a.shelter);

    if a.distance + b.distance > swapped_first + swapped_second {
        return Err(ValidationError::Unstable(StabilityViolation {
            agent_count,
            first: first.id(),
            second: second.id(),
            own_first: a.distance,
            own_second: b.distance,
            swapped_first,
            swapped_second,
        }));
    }
    Ok(())
}

/// Why an audit did not pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Unstable(#[from] StabilityViolation),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{AgentId, Cell, Manhattan};

    fn agent(id: usize, count: usize, position: Cell, shelter: Cell) -> Agent {
        let mut agent = Agent::new(AgentId(id), position, count);
        agent.assign_shelter(shelter, &Manhattan).unwrap();
        agent
    }

    #[test]
    fn test_stable_pair_passes() {
        let agents = vec![
            agent(0, 2, Cell::new(0, 0), Cell::new(0, 3)),
            agent(1, 2, Cell::new(9, 9), Cell::new(9, 5)),
        ];
        assert_eq!(check_stability(&agents, &Manhattan), Ok(()));
    }

    /// Distances given by table, symmetric; anything unlisted is far away.
    struct TableMetric(Vec<((Cell, Cell), u64)>);

    impl Metric for TableMetric {
        fn distance(&self, a: Cell, b: Cell) -> u64 {
            self.0
                .iter()
                .find(|((x, y), _)| (*x == a && *y == b) || (*x == b && *y == a))
                .map(|&(_, d)| d)
                .unwrap_or(100)
        }
    }

    fn two_agents(metric: &TableMetric, p1: Cell, s1: Cell, p2: Cell, s2: Cell) -> Vec<Agent> {
        let mut a = Agent::new(AgentId(0), p1, 2);
        a.assign_shelter(s1, metric).unwrap();
        let mut b = Agent::new(AgentId(1), p2, 2);
        b.assign_shelter(s2, metric).unwrap();
        vec![a, b]
    }

    #[test]
    fn test_two_agent_scenarios() {
        let (p1, s1, p2, s2) = (Cell::new(0, 0), Cell::new(0, 1), Cell::new(1, 0), Cell::new(1, 1));

        // 3 + 4 <= 2 + 10: stable
        let metric = TableMetric(vec![((p1, s1), 3), ((p2, s2), 4), ((p1, s2), 2), ((p2, s1), 10)]);
        let agents = two_agents(&metric, p1, s1, p2, s2);
        assert_eq!(check_stability(&agents, &metric), Ok(()));

        // 3 + 4 > 1 + 1: the pair (A, B) is reported
        let metric = TableMetric(vec![((p1, s1), 3), ((p2, s2), 4), ((p1, s2), 1), ((p2, s1), 1)]);
        let agents = two_agents(&metric, p1, s1, p2, s2);
        let err = check_stability(&agents, &metric).unwrap_err();

        assert_eq!(
            err,
            ValidationError::Unstable(StabilityViolation {
                agent_count: 2,
                first: AgentId(0),
                second: AgentId(1),
                own_first: 3,
                own_second: 4,
                swapped_first: 1,
                swapped_second: 1,
            })
        );
    }

    #[test]
    fn test_crossed_pair_on_grid_reports_violation() {
        let agents = vec![
            agent(0, 3, Cell::new(8, 8), Cell::new(8, 9)),
            agent(1, 3, Cell::new(0, 0), Cell::new(3, 0)),
            agent(2, 3, Cell::new(2, 1), Cell::new(0, 1)),
        ];
        match check_stability(&agents, &Manhattan) {
            Err(ValidationError::Unstable(v)) => {
                assert_eq!((v.first, v.second), (AgentId(1), AgentId(2)));
                assert_eq!((v.own_first, v.own_second), (3, 2));
                assert_eq!((v.swapped_first, v.swapped_second), (1, 2));
            }
            other => panic!("expected a violation, got {:?}", other),
        }
    }

    #[test]
    fn test_crossed_pair_on_huge_grid_reports_violation() {
        let far = u32::MAX;
        let agents = vec![
            agent(0, 2, Cell::new(0, 0), Cell::new(far, far)),
            agent(1, 2, Cell::new(far, far - 1), Cell::new(0, 1)),
        ];
        match check_stability(&agents, &Manhattan) {
            Err(ValidationError::Unstable(v)) => {
                let side = u64::from(far);
                assert_eq!((v.own_first, v.own_second), (2 * side, 2 * side - 2));
                assert_eq!((v.swapped_first, v.swapped_second), (1, 1));
            }
            other => panic!("expected a violation, got {:?}", other),
        }
    }

    #[test]
    fn test_single_agent_has_no_pairs() {
        let agents = vec![agent(0, 1, Cell::new(0, 0), Cell::new(9, 9))];
        assert_eq!(check_stability(&agents, &Manhattan), Ok(()));
    }

    #[test]
    fn test_missing_shelter_is_protocol_error() {
        let agents = vec![
            agent(0, 2, Cell::new(0, 0), Cell::new(0, 3)),
            Agent::new(AgentId(1), Cell::new(1, 1), 2),
        ];
        assert_eq!(
            check_stability(&agents, &Manhattan),
            Err(ValidationError::Agent(AgentError::ShelterNotAssigned { agent: AgentId(1) }))
        );
    }

    #[test]
    fn test_audit_is_idempotent() {
        let agents = vec![
            agent(0, 3, Cell::new(0, 0), Cell::new(3, 0)),
            agent(1, 3, Cell::new(2, 1), Cell::new(0, 1)),
            agent(2, 3, Cell::new(8, 8), Cell::new(8, 9)),
        ];
        let first = check_stability(&agents, &Manhattan);
        let second = check_stability(&agents, &Manhattan);
        assert!(first.is_err());
        assert_eq!(first, second);
    }
}
