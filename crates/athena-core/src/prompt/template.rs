//! Text layout of the final prompt.
//!
//! ```text
//! <system instructions>
//!
//! Conversation so far:
//! Student: ...
//! ATHENA: ...
//!
//! Course Materials:
//! [1] (faiss.txt) ...
//!
//! Student Question:
//! <query>
//!
//! Your professional, well-structured answer:
//! ```
//!
//! The conversation block is omitted when there is no history. When no
//! passages survive, the materials block holds a short fallback instruction.

use athena_types::corpus::RetrievalResult;
use athena_types::prompt::PromptContext;
use athena_types::session::{ConversationTurn, Role};

const HISTORY_HEADER: &str = "Conversation so far:\n";
const MATERIALS_HEADER: &str = "Course Materials:\n";
const NO_MATERIALS: &str =
    "No course material context available. Provide a short, clear educational explanation.\n";
const QUESTION_HEADER: &str = "Student Question:\n";
const ANSWER_CUE: &str = "Your professional, well-structured answer:";

#[derive(Debug, Clone, Copy, Default)]
pub struct PromptTemplate;

impl PromptTemplate {
    pub fn new() -> Self {
        Self
    }

    /// Every fixed part of the prompt, with all optional headers present.
    ///
    /// Used by the assembler as the baseline cost; it is never shorter than
    /// the fixed parts of any rendered prompt.
    pub fn skeleton(&self, system_instructions: &str, query: &str) -> String {
        format!(
            "{}\n\n{HISTORY_HEADER}\n{MATERIALS_HEADER}{NO_MATERIALS}\n{QUESTION_HEADER}{}\n\n{ANSWER_CUE}",
            system_instructions.trim_end(),
            query.trim(),
        )
    }

    pub fn turn(&self, turn: &ConversationTurn) -> String {
        let speaker = match turn.role {
            Role::User => "Student",
            Role::Assistant => "ATHENA",
        };
        format!("{speaker}: {}\n", turn.text.trim())
    }

    /// `position` is 1-based.
    pub fn passage(&self, position: usize, result: &RetrievalResult) -> String {
        format!("[{position}] ({}) {}\n", result.source_name, result.text.trim())
    }

    pub fn render(&self, ctx: &PromptContext) -> String {
        let mut out = String::new();
        out.push_str(ctx.system_instructions.trim_end());
        out.push_str("\n\n");

        if !ctx.history_window.is_empty() {
            out.push_str(HISTORY_HEADER);
            for turn in &ctx.history_window {
                out.push_str(&self.turn(turn));
            }
            out.push('\n');
        }

        out.push_str(MATERIALS_HEADER);
        if ctx.retrieved_passages.is_empty() {
            out.push_str(NO_MATERIALS);
        } else {
            for (i, passage) in ctx.retrieved_passages.iter().enumerate() {
                out.push_str(&self.passage(i + 1, passage));
            }
        }
        out.push('\n');

        out.push_str(QUESTION_HEADER);
        out.push_str(ctx.query.trim());
        out.push_str("\n\n");
        out.push_str(ANSWER_CUE);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use athena_types::corpus::ChunkId;
    use athena_types::prompt::TruncationReport;

    fn ctx(history: Vec<ConversationTurn>, passages: Vec<RetrievalResult>) -> PromptContext {
        PromptContext {
            system_instructions: "You are ATHENA.".into(),
            query: "What is FAISS?".into(),
            retrieved_passages: passages,
            history_window: history,
            truncation: TruncationReport::default(),
        }
    }

    #[test]
    fn test_render_without_history_or_passages_uses_fallback() {
        let text = PromptTemplate::new().render(&ctx(vec![], vec![]));
        assert!(text.starts_with("You are ATHENA.\n\n"));
        assert!(!text.contains(HISTORY_HEADER));
        assert!(text.contains("No course material context available."));
        assert!(text.ends_with("Student Question:\nWhat is FAISS?\n\nYour professional, well-structured answer:"));
    }

    #[test]
    fn test_render_orders_sections() {
        let passage = RetrievalResult {
            chunk_id: ChunkId(1),
            source_name: "faiss.txt".into(),
            text: "FAISS performs vector similarity search.".into(),
            score: 0.8,
        };
        let text = PromptTemplate::new().render(&ctx(
            vec![ConversationTurn::user("hi"), ConversationTurn::assistant("hello")],
            vec![passage],
        ));

        let history = text.find("Student: hi\nATHENA: hello\n").unwrap();
        let materials = text.find("[1] (faiss.txt) FAISS performs").unwrap();
        let question = text.find(QUESTION_HEADER).unwrap();
        assert!(history < materials && materials < question);
        assert!(!text.contains("No course material"));
    }

    #[test]
    fn test_skeleton_covers_fixed_parts_of_any_render() {
        let t = PromptTemplate::new();
        let c = ctx(vec![], vec![]);
        assert!(t.skeleton(&c.system_instructions, &c.query).len() >= t.render(&c).len());
    }
}
