use serde::{Deserialize, Serialize};

use crate::network::{NodeId, NodeKind, NodeRef};

/// One external value injected into the graph: `value N goes to bot B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub value: u32,
    pub bot: NodeId,
}

/// A bot's static forwarding declaration:
/// `bot B gives low to X and high to Y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wiring {
    pub bot: NodeId,
    pub low: NodeRef,
    pub high: NodeRef,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: unrecognized instruction: {text:?}")]
    Unrecognized { line: usize, text: String },
    #[error("line {line}: invalid number {token:?}")]
    InvalidNumber { line: usize, token: String },
    #[error("line {line}: unknown node kind {token:?} (expected \"bot\" or \"output\")")]
    UnknownKind { line: usize, token: String },
}

/// A parsed instruction listing, split by record shape. Declaration order
/// is preserved within each shape; the driver's replay semantics depend on
/// it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub wirings: Vec<Wiring>,
    pub assignments: Vec<Assignment>,
}

impl Program {
    /// Parses line-oriented instruction text. Blank lines are skipped; the
    /// first malformed line fails the whole parse, so a bad listing never
    /// produces partial results.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut program = Program::default();

        for (idx, raw) in input.lines().enumerate() {
            let line = idx + 1;
            let tokens: Vec<&str> = raw.split_whitespace().collect();

            match tokens.as_slice() {
                [] => {}
                ["value", value, "goes", "to", "bot", bot] => {
                    program.assignments.push(Assignment {
                        value: parse_num(value, line)?,
                        bot: parse_num(bot, line)?,
                    });
                }
                ["bot", bot, "gives", "low", "to", low_kind, low_id, "and", "high", "to", high_kind, high_id] => {
                    program.wirings.push(Wiring {
                        bot: parse_num(bot, line)?,
                        low: parse_node(low_kind, low_id, line)?,
                        high: parse_node(high_kind, high_id, line)?,
                    });
                }
                _ => {
                    return Err(ParseError::Unrecognized {
                        line,
                        text: raw.trim().to_string(),
                    })
                }
            }
        }

        Ok(program)
    }
}

fn parse_num(token: &str, line: usize) -> Result<u32, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

fn parse_node(kind: &str, id: &str, line: usize) -> Result<NodeRef, ParseError> {
    let kind = match kind {
        "bot" => NodeKind::Bot,
        "output" => NodeKind::Output,
        _ => {
            return Err(ParseError::UnknownKind {
                line,
                token: kind.to_string(),
            })
        }
    };
    Ok(NodeRef {
        kind,
        id: parse_num(id, line)?,
    })
}
