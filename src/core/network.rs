use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::observer::{PairEvent, PairObserver, Signal};

pub type NodeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Bot,
    Output,
}

/// A (kind, identity) reference to a node, independent of whether the node
/// has been instantiated yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub id: NodeId,
}

impl NodeRef {
    pub fn bot(id: NodeId) -> Self {
        Self {
            kind: NodeKind::Bot,
            id,
        }
    }

    pub fn output(id: NodeId) -> Self {
        Self {
            kind: NodeKind::Output,
            id,
        }
    }
}

/// A sorting actor. Holds at most one value between deliveries; the second
/// value only ever exists inside a single accept step.
#[derive(Debug, Clone, Default)]
pub struct Bot {
    pub held: Vec<u32>,
    pub low: Option<NodeRef>,
    pub high: Option<NodeRef>,
}

/// A terminal accumulator. Values are appended in arrival order and never
/// leave.
#[derive(Debug, Clone, Default)]
pub struct Sink {
    pub received: Vec<u32>,
}

#[derive(Debug, Clone)]
pub enum Node {
    Bot(Bot),
    Output(Sink),
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Bot => Node::Bot(Bot::default()),
            NodeKind::Output => Node::Output(Sink::default()),
        }
    }
}

/// Which cascade engine drives propagation. Both fire observations in the
/// same order: depth-first, high branch fully drained before the low branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    #[default]
    Recursive,
    Worklist,
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkConfig {
    /// Forwarding-chain bound per cascade. The wiring graph is acyclic by
    /// contract; exceeding this fails the delivery instead of overflowing
    /// the stack.
    pub max_depth: usize,
    pub delivery: Delivery,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_depth: 1024,
            delivery: Delivery::Recursive,
        }
    }
}

impl NetworkConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    #[error("cascade exceeded the depth limit of {limit}; wiring graph is likely cyclic")]
    DepthExceeded { limit: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub bots: usize,
    pub outputs: usize,
    pub held_values: usize,
    pub sunk_values: usize,
}

/// A completed pair, pulled out of the bot before its halves are forwarded.
#[derive(Debug, Clone, Copy)]
struct Completed {
    bot: NodeId,
    low: u32,
    high: u32,
    low_target: Option<NodeRef>,
    high_target: Option<NodeRef>,
}

/// Owns every node for one simulation run. Nodes are created lazily on
/// first reference, so values may arrive before wiring or the other way
/// round.
pub struct Network {
    cfg: NetworkConfig,
    nodes: HashMap<NodeRef, Node>,
}

impl Network {
    pub fn new(cfg: NetworkConfig) -> Self {
        Self {
            cfg,
            nodes: HashMap::new(),
        }
    }

    /// Returns the node for `nref`, creating an empty one on first use.
    /// Exactly one instance ever exists per reference.
    pub fn get_or_create(&mut self, nref: NodeRef) -> &mut Node {
        self.nodes
            .entry(nref)
            .or_insert_with(|| Node::new(nref.kind))
    }

    pub fn bot(&self, id: NodeId) -> Option<&Bot> {
        match self.nodes.get(&NodeRef::bot(id)) {
            Some(Node::Bot(bot)) => Some(bot),
            _ => None,
        }
    }

    /// Values accumulated by an output, in arrival order. Empty for an
    /// output that was never referenced or never received anything.
    pub fn sink_values(&self, id: NodeId) -> &[u32] {
        match self.nodes.get(&NodeRef::output(id)) {
            Some(Node::Output(sink)) => &sink.received,
            _ => &[],
        }
    }

    /// Attach forwarding targets to a bot, creating placeholders for the
    /// bot and both targets as needed. Never propagates anything.
    pub fn attach(&mut self, bot: NodeId, low: NodeRef, high: NodeRef) {
        self.get_or_create(low);
        self.get_or_create(high);
        if let Node::Bot(b) = self.get_or_create(NodeRef::bot(bot)) {
            b.low = Some(low);
            b.high = Some(high);
        }
    }

    /// Inject one value and drive the resulting cascade to a fixed point.
    ///
    /// Returns the sticky observer signal for the cascade: once any
    /// observation answers `Halt`, the cascade still completes but `Halt`
    /// is reported to the caller.
    pub fn deliver<O: PairObserver>(
        &mut self,
        target: NodeRef,
        value: u32,
        observer: &mut O,
    ) -> Result<Signal, CascadeError> {
        match self.cfg.delivery {
            Delivery::Recursive => {
                let mut signal = Signal::Continue;
                self.deliver_recursive(target, value, observer, 0, &mut signal)?;
                Ok(signal)
            }
            Delivery::Worklist => self.deliver_worklist(target, value, observer),
        }
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let mut diag = Diagnostics {
            bots: 0,
            outputs: 0,
            held_values: 0,
            sunk_values: 0,
        };
        for node in self.nodes.values() {
            match node {
                Node::Bot(b) => {
                    diag.bots += 1;
                    diag.held_values += b.held.len();
                }
                Node::Output(s) => {
                    diag.outputs += 1;
                    diag.sunk_values += s.received.len();
                }
            }
        }
        diag
    }

    /// One accept step. A sink swallows the value; a bot stores it and, on
    /// its second value, gives back the completed pair for forwarding.
    fn accept(&mut self, target: NodeRef, value: u32) -> Option<Completed> {
        match self.get_or_create(target) {
            Node::Output(sink) => {
                sink.received.push(value);
                None
            }
            Node::Bot(bot) => {
                bot.held.push(value);
                if bot.held.len() < 2 {
                    return None;
                }
                bot.held.sort_unstable();
                let (low, high) = (bot.held[0], bot.held[1]);
                bot.held.clear();
                Some(Completed {
                    bot: target.id,
                    low,
                    high,
                    low_target: bot.low,
                    high_target: bot.high,
                })
            }
        }
    }

    fn deliver_recursive<O: PairObserver>(
        &mut self,
        target: NodeRef,
        value: u32,
        observer: &mut O,
        depth: usize,
        signal: &mut Signal,
    ) -> Result<(), CascadeError> {
        if depth > self.cfg.max_depth {
            return Err(CascadeError::DepthExceeded {
                limit: self.cfg.max_depth,
            });
        }

        let Some(done) = self.accept(target, value) else {
            return Ok(());
        };

        let event = PairEvent {
            bot: done.bot,
            low: done.low,
            high: done.high,
        };
        if observer.on_pair(event) == Signal::Halt {
            *signal = Signal::Halt;
        }

        // High first, then low. An unwired side drops its value here.
        if let Some(t) = done.high_target {
            self.deliver_recursive(t, done.high, observer, depth + 1, signal)?;
        }
        if let Some(t) = done.low_target {
            self.deliver_recursive(t, done.low, observer, depth + 1, signal)?;
        }
        Ok(())
    }

    fn deliver_worklist<O: PairObserver>(
        &mut self,
        target: NodeRef,
        value: u32,
        observer: &mut O,
    ) -> Result<Signal, CascadeError> {
        let mut signal = Signal::Continue;
        let mut stack = vec![(target, value, 0usize)];

        while let Some((nref, value, depth)) = stack.pop() {
            if depth > self.cfg.max_depth {
                return Err(CascadeError::DepthExceeded {
                    limit: self.cfg.max_depth,
                });
            }

            let Some(done) = self.accept(nref, value) else {
                continue;
            };

            let event = PairEvent {
                bot: done.bot,
                low: done.low,
                high: done.high,
            };
            if observer.on_pair(event) == Signal::Halt {
                signal = Signal::Halt;
            }

            // Low is pushed first so the high branch is popped and fully
            // drained before the low branch starts, matching the recursive
            // engine exactly.
            if let Some(t) = done.low_target {
                stack.push((t, done.low, depth + 1));
            }
            if let Some(t) = done.high_target {
                stack.push((t, done.high, depth + 1));
            }
        }

        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::EventLog;

    fn network() -> Network {
        Network::new(NetworkConfig::default())
    }

    #[test]
    fn registry_returns_one_instance_per_key() {
        let mut net = network();

        if let Node::Bot(bot) = net.get_or_create(NodeRef::bot(7)) {
            bot.held.push(42);
        }

        // The same key must resolve to the same actor, values intact.
        match net.get_or_create(NodeRef::bot(7)) {
            Node::Bot(bot) => assert_eq!(bot.held, vec![42]),
            _ => panic!("bot key resolved to an output"),
        }

        // Same identity, different kind is a different node.
        match net.get_or_create(NodeRef::output(7)) {
            Node::Output(sink) => assert!(sink.received.is_empty()),
            _ => panic!("output key resolved to a bot"),
        }
    }

    #[test]
    fn bot_fires_once_with_sorted_pair_in_either_arrival_order() {
        for (first, second) in [(1, 5), (5, 1)] {
            let mut net = network();
            let mut log = EventLog::new();

            net.deliver(NodeRef::bot(111), first, &mut log).unwrap();
            assert!(log.events().is_empty(), "one value must not complete");

            net.deliver(NodeRef::bot(111), second, &mut log).unwrap();
            assert_eq!(
                log.events(),
                &[PairEvent {
                    bot: 111,
                    low: 1,
                    high: 5,
                }]
            );
            assert!(
                net.bot(111).unwrap().held.is_empty(),
                "bot must drain back to empty after completing"
            );
        }
    }

    #[test]
    fn unwired_values_are_observed_then_discarded() {
        let mut net = network();
        let mut log = EventLog::new();

        net.deliver(NodeRef::bot(0), 3, &mut log).unwrap();
        net.deliver(NodeRef::bot(0), 9, &mut log).unwrap();

        assert_eq!(log.events().len(), 1);
        let diag = net.diagnostics();
        assert_eq!(diag.held_values, 0);
        assert_eq!(diag.sunk_values, 0);
    }

    #[test]
    fn sink_receives_values_in_arrival_order() {
        let mut net = network();
        net.attach(0, NodeRef::output(5), NodeRef::output(5));

        let mut log = EventLog::new();
        net.deliver(NodeRef::bot(0), 8, &mut log).unwrap();
        net.deliver(NodeRef::bot(0), 2, &mut log).unwrap();

        // High is forwarded before low, so the sink sees 8 then 2.
        assert_eq!(net.sink_values(5), &[8, 2]);
        assert_eq!(net.sink_values(99), &[] as &[u32]);
    }

    #[test]
    fn high_branch_cascades_fully_before_low_branch() {
        // bot0 feeds bot1 (low) and bot2 (high); both are primed with one
        // value so each side completes during bot0's cascade.
        let mut net = network();
        net.attach(0, NodeRef::bot(1), NodeRef::bot(2));
        net.attach(1, NodeRef::output(1), NodeRef::output(1));
        net.attach(2, NodeRef::output(2), NodeRef::output(2));

        let mut log = EventLog::new();
        net.deliver(NodeRef::bot(1), 50, &mut log).unwrap();
        net.deliver(NodeRef::bot(2), 60, &mut log).unwrap();
        net.deliver(NodeRef::bot(0), 10, &mut log).unwrap();
        net.deliver(NodeRef::bot(0), 20, &mut log).unwrap();

        let bots: Vec<NodeId> = log.events().iter().map(|e| e.bot).collect();
        assert_eq!(bots, vec![0, 2, 1], "expected high-first depth-first order");
    }

    #[test]
    fn cyclic_wiring_fails_with_depth_exceeded() {
        // bot0 and bot1 feed each other; primed so every delivery completes
        // a pair and forwards again, forever.
        let mut net = Network::new(NetworkConfig::default().with_max_depth(64));
        net.attach(0, NodeRef::bot(1), NodeRef::bot(1));
        net.attach(1, NodeRef::bot(0), NodeRef::bot(0));

        let mut log = EventLog::new();
        net.deliver(NodeRef::bot(0), 1, &mut log).unwrap();
        net.deliver(NodeRef::bot(1), 2, &mut log).unwrap();

        let err = net.deliver(NodeRef::bot(0), 3, &mut log).unwrap_err();
        assert!(matches!(err, CascadeError::DepthExceeded { limit: 64 }));
    }

    #[test]
    fn worklist_engine_guards_depth_too() {
        let mut net = Network::new(
            NetworkConfig::default()
                .with_delivery(Delivery::Worklist)
                .with_max_depth(64),
        );
        net.attach(0, NodeRef::bot(1), NodeRef::bot(1));
        net.attach(1, NodeRef::bot(0), NodeRef::bot(0));

        let mut log = EventLog::new();
        net.deliver(NodeRef::bot(0), 1, &mut log).unwrap();
        net.deliver(NodeRef::bot(1), 2, &mut log).unwrap();

        let err = net.deliver(NodeRef::bot(0), 3, &mut log).unwrap_err();
        assert!(matches!(err, CascadeError::DepthExceeded { limit: 64 }));
    }

    #[test]
    fn diagnostics_counts_nodes_and_values() {
        let mut net = network();
        net.attach(0, NodeRef::output(0), NodeRef::output(1));

        let mut log = EventLog::new();
        net.deliver(NodeRef::bot(0), 4, &mut log).unwrap();

        let diag = net.diagnostics();
        assert_eq!(diag.bots, 1);
        assert_eq!(diag.outputs, 2);
        assert_eq!(diag.held_values, 1);
        assert_eq!(diag.sunk_values, 0);

        net.deliver(NodeRef::bot(0), 6, &mut log).unwrap();
        let diag = net.diagnostics();
        assert_eq!(diag.held_values, 0);
        assert_eq!(diag.sunk_values, 2);
    }
}
