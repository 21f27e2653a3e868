use serde::{Deserialize, Serialize};

use crate::network::NodeId;

/// One completed comparison: the bot's identity plus its sorted pair.
///
/// Design intent:
/// - Events are emitted synchronously, exactly once per completed pair.
/// - The pair is already sorted; `low < high` always holds for valid input.
/// - Observers cannot mutate or steer the network; they only see events
///   and answer with a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairEvent {
    pub bot: NodeId,
    pub low: u32,
    pub high: u32,
}

/// What the observer wants the replay loop to do next.
///
/// `Halt` is advisory: the in-flight cascade always runs to its fixed point,
/// and the driver stops feeding further assignments afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Halt,
}

pub trait PairObserver {
    fn on_pair(&mut self, event: PairEvent) -> Signal;
}

impl<F> PairObserver for F
where
    F: FnMut(PairEvent) -> Signal,
{
    fn on_pair(&mut self, event: PairEvent) -> Signal {
        self(event)
    }
}

/// Records every event in firing order and never halts.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<PairEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[PairEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<PairEvent> {
        self.events
    }
}

impl PairObserver for EventLog {
    fn on_pair(&mut self, event: PairEvent) -> Signal {
        self.events.push(event);
        Signal::Continue
    }
}

/// Halts replay once some bot compares exactly the wanted pair.
#[derive(Debug, Clone)]
pub struct PairFinder {
    low: u32,
    high: u32,
    found: Option<NodeId>,
}

impl PairFinder {
    /// The wanted pair may be given in either order.
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
            found: None,
        }
    }

    pub fn found(&self) -> Option<NodeId> {
        self.found
    }
}

impl PairObserver for PairFinder {
    fn on_pair(&mut self, event: PairEvent) -> Signal {
        if self.found.is_none() && event.low == self.low && event.high == self.high {
            self.found = Some(event.bot);
        }
        match self.found {
            Some(_) => Signal::Halt,
            None => Signal::Continue,
        }
    }
}
