//! Protocol property tests
//!
//! Liveness, counter bounds, knowledge completeness at termination, and the
//! stability audit over full trials.

use rand::rngs::SmallRng;
use rand::SeedableRng;

use shelter_core::{
    check_stability, drive, generate_round, place, run_trial, AgentId, AgentStatus, Cell,
    ConfirmationMode, ContactPool, Manhattan, Metric, Placement, Population, ProtocolConfig,
    ShelterPolicy, SimConfig, TrialError,
};

fn protocol(confirmation: ConfirmationMode, fanout: Option<usize>, contact_pool: ContactPool) -> ProtocolConfig {
    ProtocolConfig {
        confirmation,
        fanout,
        contact_pool,
    }
}

fn all_protocols() -> Vec<ProtocolConfig> {
    let mut protocols = Vec::new();
    for confirmation in [ConfirmationMode::Handshake, ConfirmationMode::Deferred] {
        for fanout in [None, Some(1), Some(2)] {
            for pool in [ContactPool::AllPeers, ContactPool::Pending] {
                protocols.push(protocol(confirmation, fanout, pool));
            }
        }
    }
    protocols
}

fn population(agent_count: usize, grid_size: u32, seed: u64) -> Population {
    let mut rng = SmallRng::seed_from_u64(seed);
    let placement = place(agent_count, grid_size, ShelterPolicy::SwapSettled, &Manhattan, &mut rng).unwrap();
    Population::from_placement(&placement, &Manhattan).unwrap()
}

#[test]
fn test_every_protocol_reaches_global_termination() {
    for protocol in all_protocols() {
        for agent_count in [2, 3, 7, 12] {
            let config = SimConfig {
                protocol: protocol.clone(),
                ..SimConfig::default()
            };
            let mut rng = SmallRng::seed_from_u64(agent_count as u64);

            let report = run_trial(agent_count, &config, &mut rng)
                .unwrap_or_else(|e| panic!("{:?} with {} agents failed: {}", protocol, agent_count, e));

            assert_eq!(report.agent_count, agent_count);
            assert!(report.rounds >= 1);
        }
    }
}

#[test]
fn test_smallest_grid_that_fits() {
    // n² = 2m exactly
    let config = SimConfig {
        grid: shelter_core::GridConfig {
            size: 4,
            ..Default::default()
        },
        ..SimConfig::default()
    };
    let report = run_trial(8, &config, &mut SmallRng::seed_from_u64(1)).unwrap();
    assert_eq!(report.agent_count, 8);
}

#[test]
fn test_confirmations_are_monotone_and_bounded() {
    for protocol in all_protocols() {
        let agent_count = 9;
        let mut population = population(agent_count, 20, 5);
        let mut rng = SmallRng::seed_from_u64(17);
        let bound = 2 * (agent_count - 1);
        let mut previous = vec![0usize; agent_count];

        population.settle().unwrap();
        while !population.all_terminated() {
            let schedule = generate_round(agent_count, protocol.contact_pool, &mut rng);
            population.run_round(&schedule, &protocol).unwrap();

            for (agent, prev) in population.agents().iter().zip(previous.iter_mut()) {
                assert!(agent.confirmations() >= *prev, "CFR decreased for {}", agent.id());
                assert!(agent.confirmations() <= bound, "CFR exceeded bound for {}", agent.id());
                *prev = agent.confirmations();
            }
        }
    }
}

#[test]
fn test_terminated_agents_know_every_peer_and_stay_frozen() {
    for protocol in all_protocols() {
        let agent_count = 8;
        let mut population = population(agent_count, 20, 23);
        let mut rng = SmallRng::seed_from_u64(29);
        let mut frozen: Vec<Option<(u64, usize, usize)>> = vec![None; agent_count];

        population.settle().unwrap();
        while !population.all_terminated() {
            let schedule = generate_round(agent_count, protocol.contact_pool, &mut rng);
            population.run_round(&schedule, &protocol).unwrap();

            for agent in population.agents() {
                let snapshot = (agent.contact_count(), agent.confirmations(), agent.knowledge().len());
                let index = agent.id().index();
                match frozen[index] {
                    Some(previous) => assert_eq!(previous, snapshot, "{} changed after terminating", agent.id()),
                    None if agent.is_terminated() => {
                        assert_eq!(agent.knowledge().len(), agent_count - 1);
                        for peer in agent.peers() {
                            assert!(agent.knowledge().contains_key(&peer));
                        }
                        frozen[index] = Some(snapshot);
                    }
                    None => {}
                }
            }
        }
    }
}

#[test]
fn test_three_agents_confirm_four_times_each() {
    for confirmation in [ConfirmationMode::Handshake, ConfirmationMode::Deferred] {
        for fanout in [None, Some(1)] {
            let config = SimConfig {
                protocol: protocol(confirmation, fanout, ContactPool::AllPeers),
                ..SimConfig::default()
            };
            let mut rng = SmallRng::seed_from_u64(3);

            let (population, _) = drive(population(3, 10, 31), &config, &mut rng).unwrap();

            for agent in population.agents() {
                assert_eq!(agent.status(), AgentStatus::Terminated);
                assert_eq!(agent.confirmations(), 4);
                assert_eq!(agent.knowledge().len(), 2);
            }
        }
    }
}

#[test]
fn test_single_agent_terminates_without_rounds() {
    let config = SimConfig::default();
    let mut rng = SmallRng::seed_from_u64(0);

    let (population, report) = drive(population(1, 10, 0), &config, &mut rng).unwrap();

    assert_eq!(report.rounds, 0);
    assert_eq!(population.agents()[0].contact_count(), 0);
    assert!(population.all_terminated());
    assert!(check_stability(population.agents(), &Manhattan).is_ok());
}

#[test]
fn test_knowledge_matches_ground_truth() {
    let config = SimConfig::default();
    let mut rng = SmallRng::seed_from_u64(8);
    let (population, _) = drive(population(6, 15, 8), &config, &mut rng).unwrap();

    for agent in population.agents() {
        for (peer, record) in agent.knowledge() {
            let truth = population.get(*peer).unwrap().record().unwrap();
            assert_eq!(*record, truth);
        }
    }
}

#[test]
fn test_placement_round_trip_to_agent_distance() {
    let mut rng = SmallRng::seed_from_u64(64);
    let placement = place(30, 25, ShelterPolicy::Random, &Manhattan, &mut rng).unwrap();
    let population = Population::from_placement(&placement, &Manhattan).unwrap();

    for (agent, (position, shelter)) in population.agents().iter().zip(placement.pairs()) {
        assert_eq!(agent.distance(), Some(Manhattan.distance(position, shelter)));
    }
}

#[test]
fn test_unstable_pair_is_reported_after_convergence() {
    // Crossed shelters: each agent stands next to the other's shelter.
    let placement = Placement {
        positions: vec![Cell::new(0, 0), Cell::new(9, 9)],
        shelters: vec![Cell::new(9, 8), Cell::new(0, 1)],
    };
    let population = Population::from_placement(&placement, &Manhattan).unwrap();
    let mut rng = SmallRng::seed_from_u64(1);

    let (population, report) = drive(population, &SimConfig::default(), &mut rng).unwrap();
    assert_eq!(report.rounds, 1);

    let err: TrialError = check_stability(population.agents(), &Manhattan).unwrap_err().into();
    match err {
        TrialError::Unstable(violation) => {
            assert_eq!(violation.agent_count, 2);
            assert_eq!((violation.first, violation.second), (AgentId(0), AgentId(1)));
        }
        other => panic!("expected a stability violation, got {}", other),
    }

    // Agents see the same improving swap from their own knowledge.
    assert_eq!(population.agents()[0].unstable_peers(&Manhattan), vec![AgentId(1)]);
    assert_eq!(population.agents()[1].unstable_peers(&Manhattan), vec![AgentId(0)]);
}

#[test]
fn test_audit_is_idempotent_on_converged_trial() {
    let config = SimConfig::default();
    let mut rng = SmallRng::seed_from_u64(4);
    let (population, _) = drive(population(10, 20, 4), &config, &mut rng).unwrap();

    let first = check_stability(population.agents(), &Manhattan);
    let second = check_stability(population.agents(), &Manhattan);
    assert!(first.is_ok());
    assert_eq!(first, second);
}
