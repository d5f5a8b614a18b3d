use wasm_bindgen::prelude::*;

pub mod auction;
pub mod config;
pub mod constricted;
pub mod convergence;
pub mod demand;
mod error;
pub mod graph;
pub mod matching;
pub mod report;
pub mod state;
pub mod types;
pub mod valuation;

pub use auction::*;
pub use config::*;
pub use demand::{Assignment, BestResponse, Choice, Demand};
pub use error::{AuctionError, MalformedGraph};
pub use graph::{EdgeInput, GraphInput, NodeInput, ValuationGraph};
pub use report::*;
pub use state::*;
pub use types::*;
pub use valuation::NetUtilities;

#[cfg(feature = "instrument")]
pub use instrument;

// ============================================================================
// WASM API - Interactive Auction
// ============================================================================

/// An auction advanced one round at a time, for renderers that draw every
/// round before asking for the next.
#[wasm_bindgen]
pub struct AuctionSession {
    graph: ValuationGraph,
    config: AuctionConfig,
    phase: Phase,
    evaluated: u32,
}

enum Phase {
    /// State for the next round to evaluate.
    Running(AuctionState),
    Finished(AuctionOutcome),
    Failed(AuctionError),
}

#[wasm_bindgen]
impl AuctionSession {
    #[wasm_bindgen(constructor)]
    pub fn new(graph: GraphInput, config: AuctionConfig) -> Result<AuctionSession, JsError> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        let graph = ValuationGraph::from_input(&graph)?;
        Ok(Self::start(graph, config))
    }

    /// Build from node-link JSON text.
    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(json: &str, config: AuctionConfig) -> Result<AuctionSession, JsError> {
        console_error_panic_hook::set_once();

        let graph = ValuationGraph::from_json(json)?;
        Ok(Self::start(graph, config))
    }

    /// The graph at starting prices, before any round.
    #[wasm_bindgen(js_name = initialSnapshot)]
    pub fn initial_snapshot(&self) -> Result<RoundSnapshot, JsError> {
        Ok(RoundSnapshot::initial(
            &self.graph,
            &AuctionState::initial(&self.graph),
        )?)
    }

    /// Evaluate the next round and return its snapshot. Once the auction is
    /// over this keeps returning the closing frame.
    #[wasm_bindgen(js_name = nextRound)]
    pub fn next_round(&mut self) -> Result<RoundSnapshot, JsError> {
        match self.advance()? {
            Some(round) => Ok(RoundSnapshot::from_round(&self.graph, &round)),
            None => self.closing_frame(),
        }
    }

    /// Run the remaining rounds and return the final matching.
    #[wasm_bindgen(js_name = runToEnd)]
    pub fn run_to_end(&mut self) -> Result<MatchReport, JsError> {
        Ok(self.finish()?)
    }

    #[wasm_bindgen(js_name = closingFrame)]
    pub fn closing_frame(&self) -> Result<RoundSnapshot, JsError> {
        self.outcome()
            .map(|outcome| RoundSnapshot::final_frame(&self.graph, outcome))
            .ok_or_else(|| JsError::new("auction has not finished"))
    }

    #[wasm_bindgen(getter)]
    pub fn status(&self) -> AuctionStatus {
        self.outcome()
            .map_or(AuctionStatus::Searching, |o| o.status)
    }

    /// Rounds evaluated so far.
    #[wasm_bindgen(getter)]
    pub fn rounds(&self) -> u32 {
        self.evaluated
    }
}

impl AuctionSession {
    pub fn start(graph: ValuationGraph, config: AuctionConfig) -> Self {
        let state = AuctionState::initial(&graph);
        Self {
            graph,
            config,
            phase: Phase::Running(state),
            evaluated: 0,
        }
    }

    pub fn graph(&self) -> &ValuationGraph {
        &self.graph
    }

    pub fn outcome(&self) -> Option<&AuctionOutcome> {
        match &self.phase {
            Phase::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Evaluate one round. `Ok(None)` once the auction is over; a failed
    /// session keeps returning its error.
    pub fn advance(&mut self) -> Result<Option<Round>, AuctionError> {
        let state = match &self.phase {
            Phase::Running(state) => state.clone(),
            Phase::Finished(_) => return Ok(None),
            Phase::Failed(failure) => return Err(failure.clone()),
        };

        let evaluated = self.evaluated + 1;
        let result = auction::step(&self.graph, state).and_then(|(round, next)| {
            let phase = match next {
                None => Phase::Finished(auction::finish(
                    &self.graph,
                    round.clone(),
                    AuctionStatus::Converged,
                )),
                Some(_) if evaluated >= self.config.round_limit() => Phase::Finished(
                    auction::stall(&self.graph, &self.config, round.clone(), evaluated)?,
                ),
                Some(next) => Phase::Running(next),
            };
            Ok((round, phase))
        });

        match result {
            Ok((round, phase)) => {
                self.evaluated = evaluated;
                self.phase = phase;
                Ok(Some(round))
            }
            Err(failure) => {
                self.evaluated = evaluated;
                self.phase = Phase::Failed(failure.clone());
                Err(failure)
            }
        }
    }

    /// Advance until terminal and report.
    pub fn finish(&mut self) -> Result<MatchReport, AuctionError> {
        loop {
            if let Some(outcome) = self.outcome() {
                return Ok(MatchReport::new(&self.graph, outcome));
            }
            self.advance()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_a() -> ValuationGraph {
        ValuationGraph::from_input(
            &GraphInput::new()
                .with_market("M1", 0)
                .with_market("M2", 0)
                .with_buyer("B1")
                .with_buyer("B2")
                .with_edge("M1", "B1", 10.0)
                .with_edge("M2", "B1", 8.0)
                .with_edge("M1", "B2", 9.0)
                .with_edge("M2", "B2", 7.0),
        )
        .unwrap()
    }

    #[test]
    fn session_matches_batch_run() {
        let graph = scenario_a();
        let batch = run_auction(&graph, &AuctionConfig::default()).unwrap();

        let mut session = AuctionSession::start(graph.clone(), AuctionConfig::default());
        let mut indices = Vec::new();
        while let Some(round) = session.advance().unwrap() {
            indices.push(round.index);
        }

        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(session.rounds(), 3);
        assert_eq!(session.status(), AuctionStatus::Converged);
        assert_eq!(session.outcome(), Some(&batch));
        assert!(session.advance().unwrap().is_none(), "terminal sessions stay put");
    }

    #[test]
    fn session_applies_stall_policy() {
        let config = AuctionConfig::default()
            .with_max_rounds(1)
            .with_stall_policy(StallPolicy::Report);
        let mut session = AuctionSession::start(scenario_a(), config);

        let report = session.finish().unwrap();
        assert_eq!(report.status, AuctionStatus::Stalled);
        assert_eq!(report.rounds, 1);

        let mut failing =
            AuctionSession::start(scenario_a(), config.with_stall_policy(StallPolicy::Fail));
        assert!(matches!(
            failing.finish(),
            Err(AuctionError::NonTermination { rounds: 1, .. })
        ));
        assert_eq!(failing.status(), AuctionStatus::Searching);
        assert_eq!(
            failing.finish(),
            Err(AuctionError::NonTermination {
                rounds: 1,
                prices: vec![0, 0]
            })
        );
    }
}
