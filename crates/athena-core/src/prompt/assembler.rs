//! Budgeted context assembly.
//!
//! Priority is fixed: system instructions and the query are always kept in
//! full, then conversation history newest-first, then retrieved passages
//! highest-score-first. Items are only ever kept or dropped whole. The
//! first item that does not fit ends its category, and passages are only
//! considered when every history turn fit, so evidence is always dropped
//! before history.

use athena_types::corpus::RetrievalResult;
use athena_types::prompt::{PromptContext, TruncationReport};
use athena_types::session::ConversationTurn;
use tracing::warn;

use super::estimator::TokenEstimator;
use super::template::PromptTemplate;

#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    estimator: TokenEstimator,
    template: PromptTemplate,
}

impl ContextAssembler {
    pub fn new(estimator: TokenEstimator, template: PromptTemplate) -> Self {
        Self {
            estimator,
            template,
        }
    }

    /// Fit instructions, history, and passages into `token_budget`.
    ///
    /// `history` is chronological and `retrieval_results` is best-first. The
    /// returned context preserves both orders. Pure: identical inputs give
    /// an identical context.
    pub fn assemble(
        &self,
        query: &str,
        retrieval_results: &[RetrievalResult],
        history: &[ConversationTurn],
        system_instructions: &str,
        token_budget: usize,
    ) -> PromptContext {
        let fixed = self
            .estimator
            .estimate(&self.template.skeleton(system_instructions, query));
        let mut used = fixed;

        let mut window: Vec<ConversationTurn> = Vec::new();
        for turn in history.iter().rev() {
            let cost = self.estimator.estimate(&self.template.turn(turn));
            if used + cost > token_budget {
                break;
            }
            used += cost;
            window.push(turn.clone());
        }
        window.reverse();
        let dropped_history_turns = history.len() - window.len();

        let mut passages: Vec<RetrievalResult> = Vec::new();
        if dropped_history_turns == 0 {
            for (i, result) in retrieval_results.iter().enumerate() {
                let cost = self.estimator.estimate(&self.template.passage(i + 1, result));
                if used + cost > token_budget {
                    break;
                }
                used += cost;
                passages.push(result.clone());
            }
        }
        let dropped_passages = retrieval_results.len() - passages.len();

        let truncation = TruncationReport {
            dropped_history_turns,
            dropped_passages,
            estimated_tokens: used,
            token_budget,
        };

        if fixed > token_budget {
            warn!(
                fixed_tokens = fixed,
                token_budget, "System instructions and query alone exceed the token budget"
            );
        }
        if truncation.is_truncated() {
            warn!(
                dropped_history_turns,
                dropped_passages,
                estimated_tokens = used,
                token_budget,
                "Prompt context truncated to fit token budget"
            );
        }

        PromptContext {
            system_instructions: system_instructions.to_string(),
            query: query.to_string(),
            retrieved_passages: passages,
            history_window: window,
            truncation,
        }
    }

    pub fn render(&self, ctx: &PromptContext) -> String {
        self.template.render(ctx)
    }

    pub fn estimator(&self) -> TokenEstimator {
        self.estimator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use athena_types::corpus::ChunkId;

    const INSTRUCTIONS: &str = "You are ATHENA, an academic mentor.";

    fn passage(id: u64, text: &str, score: f32) -> RetrievalResult {
        RetrievalResult {
            chunk_id: ChunkId(id),
            source_name: format!("doc{id}.txt"),
            text: text.to_string(),
            score,
        }
    }

    fn passages() -> Vec<RetrievalResult> {
        vec![
            passage(0, "A list is an ordered, mutable collection of items.", 0.9),
            passage(1, "Tuples are ordered and immutable.", 0.5),
            passage(2, "Sets store unique, unordered elements.", 0.2),
        ]
    }

    fn history() -> Vec<ConversationTurn> {
        vec![
            ConversationTurn::user("What is a list?"),
            ConversationTurn::assistant("A list is an ordered collection of items in Python."),
        ]
    }

    fn full_cost(asm: &ContextAssembler, history: &[ConversationTurn], passages: &[RetrievalResult]) -> usize {
        let est = asm.estimator();
        let t = PromptTemplate::new();
        est.estimate(&t.skeleton(INSTRUCTIONS, "Can you give an example?"))
            + history.iter().map(|h| est.estimate(&t.turn(h))).sum::<usize>()
            + passages
                .iter()
                .enumerate()
                .map(|(i, p)| est.estimate(&t.passage(i + 1, p)))
                .sum::<usize>()
    }

    #[test]
    fn test_everything_fits_under_large_budget() {
        let asm = ContextAssembler::default();
        let h = history();
        let p = passages();
        let ctx = asm.assemble("Can you give an example?", &p, &h, INSTRUCTIONS, 10_000);
        assert_eq!(ctx.history_window, h);
        assert_eq!(ctx.retrieved_passages, p);
        assert!(!ctx.truncation.is_truncated());
        assert!(ctx.truncation.estimated_tokens <= 10_000);
    }

    #[test]
    fn test_history_window_holds_prior_turns_in_order() {
        let asm = ContextAssembler::default();
        let ctx = asm.assemble("Can you give an example?", &[], &history(), INSTRUCTIONS, 2048);
        assert_eq!(ctx.history_window.len(), 2);
        assert_eq!(ctx.history_window[0].text, "What is a list?");
        assert_eq!(ctx.history_window[1].text, "A list is an ordered collection of items in Python.");
    }

    #[test]
    fn test_passages_dropped_before_history() {
        let asm = ContextAssembler::default();
        let h = history();
        let p = passages();
        let budget = full_cost(&asm, &h, &p) - 1;

        let ctx = asm.assemble("Can you give an example?", &p, &h, INSTRUCTIONS, budget);
        assert_eq!(ctx.history_window.len(), 2);
        assert_eq!(ctx.retrieved_passages.len(), 2);
        assert_eq!(ctx.retrieved_passages[0].chunk_id, ChunkId(0));
        assert_eq!(ctx.truncation.dropped_passages, 1);
        assert_eq!(ctx.truncation.dropped_history_turns, 0);
        assert!(ctx.truncation.estimated_tokens <= budget);
    }

    #[test]
    fn test_truncation_law_over_all_budgets() {
        let asm = ContextAssembler::default();
        let h = history();
        let p = passages();
        let full = full_cost(&asm, &h, &p);

        for budget in 0..full {
            let ctx = asm.assemble("Can you give an example?", &p, &h, INSTRUCTIONS, budget);
            assert_eq!(ctx.system_instructions, INSTRUCTIONS);
            assert!(ctx.truncation.is_truncated(), "budget {budget}");
            if ctx.truncation.dropped_history_turns > 0 {
                assert!(ctx.retrieved_passages.is_empty(), "budget {budget}");
            }
            // Kept history is always the newest suffix.
            let kept = ctx.history_window.len();
            assert_eq!(ctx.history_window[..], h[h.len() - kept..]);
            // Kept passages are always the best prefix.
            let kept = ctx.retrieved_passages.len();
            assert_eq!(ctx.retrieved_passages[..], p[..kept]);
        }
    }

    #[test]
    fn test_newest_history_kept_first() {
        let asm = ContextAssembler::default();
        let h = history();
        let est = asm.estimator();
        let t = PromptTemplate::new();
        let budget = est.estimate(&t.skeleton(INSTRUCTIONS, "Can you give an example?"))
            + est.estimate(&t.turn(&h[1]));

        let ctx = asm.assemble("Can you give an example?", &passages(), &h, INSTRUCTIONS, budget);
        assert_eq!(ctx.history_window, vec![h[1].clone()]);
        assert!(ctx.retrieved_passages.is_empty());
        assert_eq!(ctx.truncation.dropped_history_turns, 1);
        assert_eq!(ctx.truncation.dropped_passages, 3);
    }

    #[test]
    fn test_instructions_kept_even_when_budget_is_tiny() {
        let asm = ContextAssembler::default();
        let ctx = asm.assemble("q", &passages(), &history(), INSTRUCTIONS, 1);
        assert_eq!(ctx.system_instructions, INSTRUCTIONS);
        assert_eq!(ctx.query, "q");
        assert!(ctx.history_window.is_empty());
        assert!(ctx.retrieved_passages.is_empty());
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let asm = ContextAssembler::default();
        let h = history();
        let p = passages();
        for budget in [1, 80, 120, 2048] {
            let a = asm.assemble("Can you give an example?", &p, &h, INSTRUCTIONS, budget);
            let b = asm.assemble("Can you give an example?", &p, &h, INSTRUCTIONS, budget);
            assert_eq!(a, b);
            assert_eq!(asm.render(&a), asm.render(&b));
        }
    }

    #[test]
    fn test_rendered_prompt_stays_within_budget() {
        let asm = ContextAssembler::default();
        let h = history();
        let p = passages();
        let full = full_cost(&asm, &h, &p);
        let fixed = asm
            .estimator()
            .estimate(&PromptTemplate::new().skeleton(INSTRUCTIONS, "Can you give an example?"));

        for budget in fixed..=full {
            let ctx = asm.assemble("Can you give an example?", &p, &h, INSTRUCTIONS, budget);
            let rendered = asm.render(&ctx);
            assert!(asm.estimator().estimate(&rendered) <= budget, "budget {budget}");
        }
    }
}
