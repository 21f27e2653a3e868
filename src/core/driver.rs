use crate::instructions::{Assignment, Program, Wiring};
use crate::network::{CascadeError, Network, NetworkConfig, NodeId, NodeRef};
use crate::observer::{PairObserver, Signal};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every assignment was replayed.
    Completed,
    /// An observer answered `Halt`; replay stopped after that cascade.
    Interrupted,
}

/// Replays a parsed instruction listing against a fresh network.
///
/// Two phases, both in input order: wirings are attached first (never
/// propagating), then assignments are injected one at a time, each cascade
/// running to its fixed point before the next value goes in.
pub struct Simulation {
    network: Network,
}

impl Simulation {
    pub fn new(cfg: NetworkConfig) -> Self {
        Self {
            network: Network::new(cfg),
        }
    }

    pub fn run<O: PairObserver>(
        &mut self,
        wirings: &[Wiring],
        assignments: &[Assignment],
        observer: &mut O,
    ) -> Result<Outcome, CascadeError> {
        for w in wirings {
            self.network.attach(w.bot, w.low, w.high);
        }

        for a in assignments {
            let signal = self
                .network
                .deliver(NodeRef::bot(a.bot), a.value, observer)?;
            if signal == Signal::Halt {
                return Ok(Outcome::Interrupted);
            }
        }

        Ok(Outcome::Completed)
    }

    pub fn run_program<O: PairObserver>(
        &mut self,
        program: &Program,
        observer: &mut O,
    ) -> Result<Outcome, CascadeError> {
        self.run(&program.wirings, &program.assignments, observer)
    }

    /// Final contents of an output, in arrival order.
    pub fn sink(&self, id: NodeId) -> &[u32] {
        self.network.sink_values(id)
    }

    pub fn network(&self) -> &Network {
        &self.network
    }
}
