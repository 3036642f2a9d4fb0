//! Multi-party betting computation.
//!
//! `nr_bettors` bettors place one secret bet on each of `nr_events` events.
//! The computation reveals, per event, the total amount bet and the payout
//! `total * odds` to a dedicated output party, without revealing individual
//! bets. Odds and the cancellation deadline are contributed by the output
//! party; each bettor additionally supplies an authentication token checked
//! by the external runtime.
use crate::constants::graph_size_limit_constants;
use crate::data_types::{public_scalar_type, secret_scalar_type, UINT64};
use crate::errors::Result;
use crate::graphs::{Context, Graph, Node};
use crate::parties::Party;
use log::debug;

/// Name of the party the per-event results are revealed to.
pub const OUT_PARTY_NAME: &str = "OutParty";

/// Name of the shared cancellation deadline input.
pub const CANCELLATION_DEADLINE_NAME: &str = "cancellation_deadline";

/// Returns the name of the `bettor`-th bettor party.
pub fn bettor_party_name(bettor: u64) -> String {
    format!("Bettor{bettor}")
}

/// Returns the wire name of the bet of bettor `bettor` on event `event`.
pub fn bet_input_name(bettor: u64, event: u64) -> String {
    format!("b{bettor}_e{event}")
}

/// Returns the wire name of the odds input for event `event`.
pub fn odds_input_name(event: u64) -> String {
    format!("odds_e{event}")
}

/// Returns the wire name of the authentication token of bettor `bettor`.
pub fn auth_input_name(bettor: u64) -> String {
    format!("auth_bettor_{bettor}")
}

/// Returns the name of the total-bets output for event `event`.
pub fn total_output_name(event: u64) -> String {
    format!("total_bets_event_{event}")
}

/// Returns the name of the payout output for event `event`.
pub fn payout_output_name(event: u64) -> String {
    format!("payout_event_{event}")
}

/// Registers `nr_bettors` bettor parties in a context.
pub fn create_bettor_parties(context: &Context, nr_bettors: u64) -> Result<Vec<Party>> {
    let mut bettors = vec![];
    for i in 0..nr_bettors {
        bettors.push(context.create_party(&bettor_party_name(i))?);
    }
    Ok(bettors)
}

/// Input nodes of the betting computation.
pub struct BettingInputs {
    /// `bets[i][j]` is the bet of bettor `i` on event `j`.
    pub bets: Vec<Vec<Node>>,
    /// `odds[j]` is the odds multiplier of event `j`.
    pub odds: Vec<Node>,
    /// `user_auth[i]` is the authentication token of bettor `i`.
    pub user_auth: Vec<Node>,
    /// Deadline until which bets can be cancelled.
    pub cancellation_deadline: Node,
}

/// Declares all inputs of the betting computation in a graph.
///
/// Every input is a secret [UINT64] scalar. Bets and authentication tokens
/// are owned by their bettor; odds and the cancellation deadline are owned by
/// the output party. The declaration order is fixed: all bets in bettor-major
/// order, then odds, then authentication tokens, then the deadline.
pub fn declare_betting_inputs(
    graph: &Graph,
    bettors: &[Party],
    out_party: &Party,
    nr_events: u64,
) -> Result<BettingInputs> {
    let t = secret_scalar_type(UINT64);
    let mut bets = vec![];
    for (i, bettor) in bettors.iter().enumerate() {
        let mut bettor_bets = vec![];
        for j in 0..nr_events {
            let bet = graph
                .input(t, bettor.clone())?
                .set_name(&bet_input_name(i as u64, j))?;
            bettor_bets.push(bet);
        }
        bets.push(bettor_bets);
    }
    let mut odds = vec![];
    for j in 0..nr_events {
        let event_odds = graph
            .input(t, out_party.clone())?
            .set_name(&odds_input_name(j))?;
        odds.push(event_odds);
    }
    let mut user_auth = vec![];
    for (i, bettor) in bettors.iter().enumerate() {
        let auth = graph
            .input(t, bettor.clone())?
            .set_name(&auth_input_name(i as u64))?;
        user_auth.push(auth);
    }
    let cancellation_deadline = graph
        .input(t, out_party.clone())?
        .set_name(CANCELLATION_DEADLINE_NAME)?;
    Ok(BettingInputs {
        bets,
        odds,
        user_auth,
        cancellation_deadline,
    })
}

/// Computes the per-event totals and payouts.
///
/// For event `j`, the total is the fold of `bets[0][j] + ... + bets[n-1][j]`
/// in ascending bettor order over a fresh zero accumulator, and the payout is
/// `total * odds[j]`.
pub fn compute_totals_and_payouts(
    graph: &Graph,
    bets: &[Vec<Node>],
    odds: &[Node],
) -> Result<(Vec<Node>, Vec<Node>)> {
    let mut total_bets = vec![];
    let mut payouts = vec![];
    for (j, event_odds) in odds.iter().enumerate() {
        let mut event_total_bet = graph.zeros(public_scalar_type(UINT64))?;
        for bettor_bets in bets {
            event_total_bet = event_total_bet.add(bettor_bets[j].clone())?;
        }
        total_bets.push(event_total_bet.clone());
        payouts.push(event_total_bet.multiply(event_odds.clone())?);
    }
    Ok((total_bets, payouts))
}

fn check_betting_size(nr_bettors: u64, nr_events: u64) -> Result<()> {
    if nr_events == 0 {
        return Err(runtime_error!(
            "Betting computation needs at least one event"
        ));
    }
    let overflow = || runtime_error!("Betting graph size overflows the node budget");
    let nr_bets = nr_bettors.checked_mul(nr_events).ok_or_else(overflow)?;
    // zeros + adds + multiply per event
    let compute_nodes = nr_events
        .checked_mul(nr_bettors.checked_add(2).ok_or_else(overflow)?)
        .ok_or_else(overflow)?;
    let total_nodes = nr_bets
        .checked_add(nr_events)
        .and_then(|n| n.checked_add(nr_bettors))
        .and_then(|n| n.checked_add(1))
        .and_then(|n| n.checked_add(compute_nodes))
        .ok_or_else(overflow)?;
    if total_nodes > graph_size_limit_constants::MAX_NODES {
        return Err(runtime_error!(
            "Betting graph with {} nodes exceeds the node budget",
            total_nodes
        ));
    }
    Ok(())
}

/// Builds and finalizes the betting graph for given bettor and event counts.
///
/// Registers the bettor parties and the output party in the context, declares
/// the inputs, computes totals and payouts and binds, per event `j`, the
/// outputs `total_bets_event_{j}` then `payout_event_{j}`, both revealed to
/// `OutParty`.
///
/// The caller decides whether to promote the graph to the main one of its
/// context.
///
/// # Example
///
/// ```
/// # use parlay_base::graphs::create_context;
/// # use parlay_base::applications::betting::create_betting_graph;
/// let c = create_context().unwrap();
/// let g = create_betting_graph(&c, 3, 4).unwrap();
/// assert_eq!(g.get_outputs().len(), 8);
/// ```
pub fn create_betting_graph(context: &Context, nr_bettors: u64, nr_events: u64) -> Result<Graph> {
    check_betting_size(nr_bettors, nr_events)?;
    let bettors = create_bettor_parties(context, nr_bettors)?;
    let out_party = context.create_party(OUT_PARTY_NAME)?;
    let graph = context.create_graph()?;
    let inputs = declare_betting_inputs(&graph, &bettors, &out_party, nr_events)?;
    let (total_bets, payouts) = compute_totals_and_payouts(&graph, &inputs.bets, &inputs.odds)?;
    for j in 0..nr_events {
        graph.add_output(
            total_bets[j as usize].clone(),
            &total_output_name(j),
            out_party.clone(),
        )?;
        graph.add_output(
            payouts[j as usize].clone(),
            &payout_output_name(j),
            out_party.clone(),
        )?;
    }
    let graph = graph.finalize()?;
    debug!(
        "Built betting graph: {} bettors, {} events, {} nodes",
        nr_bettors,
        nr_events,
        graph.get_num_nodes()
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::Visibility;
    use crate::graphs::{contexts_deep_equal, create_context, Operation};

    #[test]
    fn test_wire_names() {
        assert_eq!(bettor_party_name(0), "Bettor0");
        assert_eq!(bettor_party_name(12), "Bettor12");
        assert_eq!(bet_input_name(1, 3), "b1_e3");
        assert_eq!(odds_input_name(2), "odds_e2");
        assert_eq!(auth_input_name(0), "auth_bettor_0");
        assert_eq!(CANCELLATION_DEADLINE_NAME, "cancellation_deadline");
        assert_eq!(total_output_name(0), "total_bets_event_0");
        assert_eq!(payout_output_name(3), "payout_event_3");
        assert_eq!(OUT_PARTY_NAME, "OutParty");
    }

    #[test]
    fn test_bettor_parties() -> Result<()> {
        let c = create_context()?;
        let bettors = create_bettor_parties(&c, 5)?;
        assert_eq!(bettors.len(), 5);
        for (i, bettor) in bettors.iter().enumerate() {
            assert_eq!(bettor.get_name(), format!("Bettor{i}"));
        }
        assert_eq!(create_bettor_parties(&c, 0)?.len(), 0);
        // names already taken
        assert!(create_bettor_parties(&c, 1).is_err());
        Ok(())
    }

    #[test]
    fn test_scenario_3_bettors_4_events() -> Result<()> {
        let c = create_context()?;
        let g = create_betting_graph(&c, 3, 4)?;
        assert_eq!(c.get_num_parties(), 4);
        assert_eq!(c.retrieve_party("OutParty")?.get_id(), 3);

        let mut nr_bets = 0;
        let mut nr_odds = 0;
        let mut nr_auth = 0;
        let mut nr_deadlines = 0;
        for node in g.get_nodes() {
            if !node.get_operation().is_input() {
                continue;
            }
            let name = node.get_name()?.unwrap();
            if name.starts_with('b') && name.contains("_e") {
                nr_bets += 1;
            } else if name.starts_with("odds_e") {
                nr_odds += 1;
            } else if name.starts_with("auth_bettor_") {
                nr_auth += 1;
            } else {
                assert_eq!(name, CANCELLATION_DEADLINE_NAME);
                nr_deadlines += 1;
            }
            assert_eq!(node.get_type()?.get_visibility(), Visibility::Secret);
        }
        assert_eq!(nr_bets, 12);
        assert_eq!(nr_odds, 4);
        assert_eq!(nr_auth, 3);
        assert_eq!(nr_deadlines, 1);

        let outputs = g.get_outputs();
        assert_eq!(outputs.len(), 8);
        for j in 0..4u64 {
            let total = &outputs[(2 * j) as usize];
            let payout = &outputs[(2 * j + 1) as usize];
            assert_eq!(total.get_name(), total_output_name(j));
            assert_eq!(payout.get_name(), payout_output_name(j));
            assert_eq!(total.get_party().get_name(), "OutParty");
            assert_eq!(payout.get_party().get_name(), "OutParty");
        }
        Ok(())
    }

    #[test]
    fn test_payout_structure() -> Result<()> {
        let c = create_context()?;
        let g = create_betting_graph(&c, 3, 4)?;
        for j in 0..4u64 {
            let payout = g.get_outputs()[(2 * j + 1) as usize].get_node();
            assert_eq!(payout.get_operation(), Operation::Multiply);
            let payout_deps = payout.get_node_dependencies();
            let total = g.get_outputs()[(2 * j) as usize].get_node();
            assert_eq!(payout_deps[0], total);
            assert_eq!(
                payout_deps[1].get_name()?,
                Some(odds_input_name(j))
            );
            // total is the add-fold of the bets in ascending bettor order
            let mut current = total;
            for i in (0..3u64).rev() {
                assert_eq!(current.get_operation(), Operation::Add);
                let deps = current.get_node_dependencies();
                assert_eq!(deps[1].get_name()?, Some(bet_input_name(i, j)));
                current = deps[0].clone();
            }
            assert!(matches!(current.get_operation(), Operation::Zeros(_)));
        }
        Ok(())
    }

    #[test]
    fn test_zero_bettors() -> Result<()> {
        let c = create_context()?;
        let g = create_betting_graph(&c, 0, 2)?;
        assert_eq!(c.get_num_parties(), 1);
        let outputs = g.get_outputs();
        assert_eq!(outputs.len(), 4);
        for j in 0..2u64 {
            let total = outputs[(2 * j) as usize].get_node();
            assert!(matches!(total.get_operation(), Operation::Zeros(_)));
        }
        Ok(())
    }

    #[test]
    fn test_invalid_sizes() -> Result<()> {
        let c = create_context()?;
        assert!(create_betting_graph(&c, 3, 0).is_err());
        let c2 = create_context()?;
        assert!(create_betting_graph(&c2, u64::MAX, 2).is_err());
        let c3 = create_context()?;
        assert!(create_betting_graph(&c3, 1000, 1000).is_err());
        Ok(())
    }

    #[test]
    fn test_determinism() -> Result<()> {
        let build = || -> Result<Context> {
            let c = create_context()?;
            let g = create_betting_graph(&c, 3, 4)?;
            g.set_as_main()?;
            c.finalize()?;
            Ok(c)
        };
        let c1 = build()?;
        let c2 = build()?;
        assert!(contexts_deep_equal(c1, c2));
        Ok(())
    }

    #[test]
    fn test_duplicate_parties_rejected() -> Result<()> {
        let c = create_context()?;
        create_betting_graph(&c, 2, 2)?;
        // the same context can't host a second betting graph: party names clash
        assert!(create_betting_graph(&c, 2, 2).is_err());
        Ok(())
    }

    #[test]
    fn test_serialization_round_trip() -> Result<()> {
        let c = create_context()?;
        create_betting_graph(&c, 3, 4)?.set_as_main()?;
        c.finalize()?;
        let serialized = serde_json::to_string(&c)?;
        let recovered = serde_json::from_str::<crate::graphs::Context>(&serialized)?;
        assert!(c.deep_equal(recovered));
        Ok(())
    }
}
