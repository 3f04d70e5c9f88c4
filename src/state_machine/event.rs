//! Outcomes fed back into the state machine

use crate::responder::Reply;
use crate::router::RouteDecision;
use crate::thread::Compaction;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Routed { route: RouteDecision },
    Responded { reply: Reply },
    Compacted { compaction: Compaction },
}
