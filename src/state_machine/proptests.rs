//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::policy::ContinuationPolicy;
use crate::responder::Reply;
use crate::router::RouteDecision;
use crate::thread::{Compaction, ConversationState, Retention, Role};
use crate::tools::ToolInvocation;
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_route() -> impl Strategy<Value = RouteDecision> {
    prop_oneof![
        Just(RouteDecision::Conversation),
        Just(RouteDecision::HelpWithCoding),
        Just(RouteDecision::TellAStory),
    ]
}

fn arb_invocation() -> impl Strategy<Value = ToolInvocation> {
    (1i64..5, 1i64..20).prop_map(|(count, sides)| ToolInvocation {
        name: "roll_dice".to_string(),
        arguments: json!({"count": count, "sides": sides}),
        result: "Here are the results: [1]".to_string(),
    })
}

fn arb_reply_for(route: RouteDecision) -> impl Strategy<Value = Reply> {
    let invocations = if route == RouteDecision::Conversation {
        proptest::collection::vec(arb_invocation(), 0..3).boxed()
    } else {
        Just(Vec::new()).boxed()
    };
    ("[a-zA-Z ]{0,40}", invocations).prop_map(move |(content, tool_invocations)| Reply {
        route,
        content,
        tool_invocations,
    })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_route().prop_map(|route| Event::Routed { route }),
        arb_route()
            .prop_flat_map(arb_reply_for)
            .prop_map(|reply| Event::Responded { reply }),
        "[a-z ]{1,20}".prop_map(|summary| Event::Compacted {
            compaction: Compaction {
                summary,
                removed: vec![],
            }
        }),
    ]
}

fn arb_history() -> impl Strategy<Value = ConversationState> {
    proptest::collection::vec(
        prop_oneof![Just(Role::User), Just(Role::Assistant), Just(Role::Tool)],
        0..12,
    )
    .prop_map(|roles| {
        let mut state = ConversationState::new();
        for (i, role) in roles.into_iter().enumerate() {
            state.append(role, format!("turn {i}"));
        }
        state
    })
}

/// Drive one turn to completion, answering each effect with generated outcomes
fn run_turn(
    state: &ConversationState,
    text: &str,
    route: RouteDecision,
    reply: Reply,
    ctx: &TurnContext,
) -> (TransitionResult, usize) {
    let mut result = begin(state, text).unwrap();
    let mut steps = 0;
    while let Some(effect) = result.effects.first().copied() {
        let event = match effect {
            Effect::Route => Event::Routed { route },
            Effect::Respond { .. } => Event::Responded {
                reply: reply.clone(),
            },
            Effect::Compact => Event::Compacted {
                compaction: Compaction {
                    summary: "summary".to_string(),
                    removed: Retention::default().removable_ids(result.state.messages()),
                },
            },
            Effect::Commit => break,
        };
        result = transition(&result.phase, &result.state, ctx, event).unwrap();
        steps += 1;
    }
    (result, steps)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Every transition yields exactly one effect, and Commit only at Terminal
    #[test]
    fn prop_effects_match_phase(events in proptest::collection::vec(arb_event(), 0..20)) {
        let ctx = TurnContext::new("p", ContinuationPolicy::default());
        let mut result = begin(&ConversationState::new(), "hello").unwrap();

        for event in events {
            match transition(&result.phase, &result.state, &ctx, event) {
                Ok(next) => {
                    prop_assert_eq!(next.effects.len(), 1);
                    let commit = next.effects[0] == Effect::Commit;
                    prop_assert_eq!(commit, next.phase.is_terminal());
                    result = next;
                }
                Err(TransitionError::InvalidTransition(_)) => {}
                Err(e) => prop_assert!(false, "unexpected error {e:?}"),
            }
        }
    }

    // Rejected events never alter state
    #[test]
    fn prop_invalid_transition_is_noop(history in arb_history(), event in arb_event()) {
        let ctx = TurnContext::new("p", ContinuationPolicy::default());
        let before = history.clone();
        if transition(&Phase::Terminal, &history, &ctx, event).is_ok() {
            prop_assert!(false, "terminal accepted an event");
        }
        prop_assert_eq!(history, before);
    }

    // A full turn ends Terminal, grows the log by the turn's own messages,
    // and compacts exactly when the policy says so
    #[test]
    fn prop_turn_reaches_terminal(
        history in arb_history(),
        (route, reply) in arb_route().prop_flat_map(|r| (Just(r), arb_reply_for(r))),
        record in any::<bool>(),
    ) {
        let ctx = TurnContext::new("p", ContinuationPolicy::default()).with_tool_turns(record);
        let (result, steps) = run_turn(&history, "next question", route, reply.clone(), &ctx);

        prop_assert!(result.phase.is_terminal());
        prop_assert_eq!(result.effects.clone(), vec![Effect::Commit]);

        let tool_turns = if record { reply.tool_invocations.len() } else { 0 };
        let grown = history.len() + 1 + tool_turns + 1;
        if grown > ctx.policy.threshold() {
            prop_assert_eq!(steps, 3);
            prop_assert!(result.state.len() <= 2);
            prop_assert_eq!(result.state.summary(), "summary");
        } else {
            prop_assert_eq!(steps, 2);
            prop_assert_eq!(result.state.len(), grown);
            prop_assert_eq!(result.state.last().map(|t| t.content()), Some(reply.content.as_str()));
        }
    }

    // The input state is never mutated by a transition
    #[test]
    fn prop_transition_is_pure(history in arb_history(), route in arb_route()) {
        let ctx = TurnContext::new("p", ContinuationPolicy::default());
        let before = history.clone();
        let _ = transition(&Phase::Routing, &history, &ctx, Event::Routed { route });
        let _ = transition(
            &Phase::Responding { route },
            &history,
            &ctx,
            Event::Responded { reply: Reply::text(route, "r") },
        );
        prop_assert_eq!(history, before);
    }
}
