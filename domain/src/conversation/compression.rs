//! Pure compression planning for an over-budget history.
//!
//! Planning only decides *where* to cut; writing the summary that stands
//! in for the cut prefix is the caller's job (it needs a model). Keeping
//! the decision pure makes every boundary rule unit-testable without a
//! gateway in sight.
//!
//! # Boundary rules
//!
//! A prefix of length `k` may be replaced by a summary only if:
//!
//! - `k >= 1` (something is actually removed)
//! - no tool call opened inside the prefix is answered outside it, so a
//!   model turn and its tool results always travel together
//! - the most recent user turn stays in the retained suffix
//!
//! Among valid boundaries the planner picks the smallest `k` whose
//! retained suffix fits the budget; if none fits, the largest valid `k`
//! is taken as a best effort.

use serde::{Deserialize, Serialize};

use super::turn::ConversationTurn;

/// Cost model for sizing turns against a budget.
///
/// Token-exact counting needs a tokenizer; a cost trait keeps the planner
/// independent of how precisely callers want to measure.
pub trait TurnCost {
    fn cost(&self, turn: &ConversationTurn) -> usize;
}

/// Character-count cost model with a fixed per-turn overhead.
///
/// Counts the visible text of each turn plus serialized tool-call
/// arguments, approximating what the turn occupies on the wire.
#[derive(Debug, Clone)]
pub struct CharCost {
    per_turn_overhead: usize,
}

impl CharCost {
    pub fn new(per_turn_overhead: usize) -> Self {
        Self { per_turn_overhead }
    }
}

impl Default for CharCost {
    fn default() -> Self {
        Self {
            per_turn_overhead: 16,
        }
    }
}

impl TurnCost for CharCost {
    fn cost(&self, turn: &ConversationTurn) -> usize {
        let text = match turn {
            ConversationTurn::User { content } => content.chars().count(),
            ConversationTurn::Model {
                content,
                tool_calls,
            } => {
                let prose = content.as_deref().map_or(0, |c| c.chars().count());
                let calls: usize = tool_calls
                    .iter()
                    .map(|call| call.name.chars().count() + call.arguments.to_string().len())
                    .sum();
                prose + calls
            }
            ConversationTurn::ToolResult {
                tool_name, content, ..
            } => tool_name.chars().count() + content.chars().count(),
            ConversationTurn::Summary { content, .. } => content.chars().count(),
        };
        text + self.per_turn_overhead
    }
}

/// A committed decision to replace the first `prefix_len` turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionPlan {
    prefix_len: usize,
}

impl CompressionPlan {
    pub fn new(prefix_len: usize) -> Self {
        Self { prefix_len }
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }
}

/// Decides whether and where to compress `turns` under `budget`.
///
/// Returns `None` when the history already fits, or when no boundary
/// satisfies the rules above (e.g. everything after the most recent user
/// turn, or pairs spanning every cut point).
pub fn plan_compression(
    turns: &[ConversationTurn],
    budget: usize,
    cost: &dyn TurnCost,
) -> Option<CompressionPlan> {
    let costs: Vec<usize> = turns.iter().map(|t| cost.cost(t)).collect();
    let total: usize = costs.iter().sum();
    if total <= budget {
        return None;
    }

    // The retained suffix must include the most recent user turn.
    let max_prefix = turns.iter().rposition(ConversationTurn::is_user)?;

    let mut open_calls: usize = 0;
    let mut prefix_cost: usize = 0;
    let mut fallback: Option<CompressionPlan> = None;

    for (index, turn) in turns.iter().enumerate() {
        open_calls += turn.opened_calls().len();
        if turn.closes_call().is_some() {
            open_calls = open_calls.saturating_sub(1);
        }
        prefix_cost += costs[index];

        let prefix_len = index + 1;
        if prefix_len > max_prefix {
            break;
        }
        // A cut here would strand a pending tool result in the suffix.
        if open_calls != 0 {
            continue;
        }

        let plan = CompressionPlan::new(prefix_len);
        if total - prefix_cost <= budget {
            return Some(plan);
        }
        fallback = Some(plan);
    }

    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::invocation::{CallId, ToolCall};
    use serde_json::json;

    fn user(len: usize) -> ConversationTurn {
        ConversationTurn::user("u".repeat(len))
    }

    fn model(len: usize) -> ConversationTurn {
        ConversationTurn::model_text("m".repeat(len))
    }

    fn model_call(id: &str) -> ConversationTurn {
        ConversationTurn::model_calls(None, vec![ToolCall::new(id, "probe", json!({}))])
    }

    fn result(id: &str, len: usize) -> ConversationTurn {
        ConversationTurn::ToolResult {
            call_id: CallId::new(id),
            tool_name: "probe".to_string(),
            content: "r".repeat(len),
            is_error: false,
        }
    }

    // Overhead-free cost model keeps the arithmetic in tests readable.
    struct FlatCost;
    impl TurnCost for FlatCost {
        fn cost(&self, _turn: &ConversationTurn) -> usize {
            10
        }
    }

    #[test]
    fn test_under_budget_is_left_alone() {
        let turns = vec![user(50), model(50)];
        assert!(plan_compression(&turns, 1_000, &CharCost::default()).is_none());
    }

    #[test]
    fn test_smallest_fitting_boundary_wins() {
        // 5 turns x 10 = 50 total; budget 30 needs a prefix of >= 2
        let turns = vec![user(0), model(0), user(0), model(0), user(0)];
        let plan = plan_compression(&turns, 30, &FlatCost).unwrap();
        assert_eq!(plan.prefix_len(), 2);
    }

    #[test]
    fn test_boundary_never_splits_call_from_result() {
        // Cutting after the model turn at index 1 would orphan the result
        // at index 2, so the first admissible boundary is after index 2.
        let turns = vec![user(0), model_call("c1"), result("c1", 0), user(0)];
        let plan = plan_compression(&turns, 10, &FlatCost).unwrap();
        assert_eq!(plan.prefix_len(), 3);
    }

    #[test]
    fn test_most_recent_user_turn_is_never_cut() {
        let turns = vec![user(0), model(0), user(0)];
        // Budget 0: nothing fits, so the largest valid prefix is taken,
        // which still stops short of the last user turn.
        let plan = plan_compression(&turns, 0, &FlatCost).unwrap();
        assert_eq!(plan.prefix_len(), 2);
    }

    #[test]
    fn test_best_effort_when_no_boundary_fits() {
        // 4 x 10 = 40 total; even the largest valid prefix (2) leaves 20
        // retained, over the budget of 15. Best effort still compresses.
        let turns = vec![user(0), model(0), user(0), model(0)];
        let plan = plan_compression(&turns, 15, &FlatCost).unwrap();
        assert_eq!(plan.prefix_len(), 2);
    }

    #[test]
    fn test_single_user_turn_cannot_be_compressed() {
        let turns = vec![user(10_000)];
        assert!(plan_compression(&turns, 100, &CharCost::default()).is_none());
    }

    #[test]
    fn test_open_call_blocks_every_later_boundary() {
        // c1 never gets a result, so no boundary after index 1 is valid;
        // only the cut after the opening user turn remains.
        let turns = vec![user(0), model_call("c1"), user(0)];
        let plan = plan_compression(&turns, 0, &FlatCost).unwrap();
        assert_eq!(plan.prefix_len(), 1);
    }

    #[test]
    fn test_empty_history() {
        assert!(plan_compression(&[], 100, &CharCost::default()).is_none());
    }

    #[test]
    fn test_char_cost_counts_calls_and_results() {
        let cost = CharCost::new(0);
        let call_turn = ConversationTurn::model_calls(
            Some("ok".to_string()),
            vec![ToolCall::new("c1", "ab", json!({"k": "v"}))],
        );
        // prose (2) + name (2) + serialized arguments ({"k":"v"} = 9)
        assert_eq!(cost.cost(&call_turn), 13);

        let result_turn = result("c1", 4);
        // tool name (5) + content (4)
        assert_eq!(cost.cost(&result_turn), 9);
    }
}
