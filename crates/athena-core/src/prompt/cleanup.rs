//! Post-processing of raw model output.
//!
//! Small chat models echo role labels, leak special tokens, keep writing
//! the next turn of the dialogue, and end with canned follow-up offers.
//! `clean_output` strips all of that while keeping list formatting.

const SPECIAL_TOKENS: &[&str] = &[
    "<|im_start|>",
    "<|im_end|>",
    "<|assistant|>",
    "<|user|>",
    "<|system|>",
    "</s>",
    "<s>",
];

const LEADING_LABELS: &[&str] = &[
    "your professional, well-structured answer:",
    "your answer:",
    "answer:",
    "athena:",
    "assistant:",
];

/// Markers after which the model has started inventing further dialogue.
const CONTINUATION_MARKERS: &[&str] = &[
    "\nStudent:",
    "\nStudent Question:",
    "\nATHENA:",
    "\nUser:",
];

/// Phrases that start a self-continuation when they open a line or recur.
/// A single inline use is left alone.
const SELF_CONTINUATIONS: &[&str] = &["Now let me", "Let me continue"];

const FOLLOW_UP_OPENERS: &[&str] = &[
    "would you like",
    "what would you like",
    "do you have any",
    "is there anything",
    "feel free to ask",
];

pub fn clean_output(raw: &str) -> String {
    let mut text = raw.to_string();
    for token in SPECIAL_TOKENS {
        text = text.replace(token, "");
    }

    let mut text = strip_leading_labels(text.trim()).to_string();

    if let Some(cut) = continuation_cut(&text) {
        text.truncate(cut);
    }

    let mut seen: Vec<&str> = Vec::new();
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        let trimmed = line.trim();
        if is_follow_up_offer(trimmed) {
            continue;
        }
        if !trimmed.is_empty() && !is_list_item(trimmed) {
            if seen.contains(&trimmed) {
                continue;
            }
            seen.push(trimmed);
        }
        if trimmed.is_empty() && lines.last().is_some_and(|l| l.trim().is_empty()) {
            continue;
        }
        lines.push(line);
    }

    lines.join("\n").trim().to_string()
}

fn continuation_cut(text: &str) -> Option<usize> {
    let markers = CONTINUATION_MARKERS.iter().filter_map(|m| text.find(m));
    let phrases = SELF_CONTINUATIONS.iter().filter_map(|phrase| {
        if let Some(at) = text.find(&format!("\n{phrase}")) {
            return Some(at);
        }
        let mut hits = text.match_indices(phrase).map(|(at, _)| at);
        let first = hits.next()?;
        let second = hits.next()?;
        // An answer may open with the phrase; cut at the repeat instead.
        Some(if first == 0 { second } else { first })
    });
    markers.chain(phrases).min()
}

fn strip_leading_labels(mut text: &str) -> &str {
    loop {
        let Some(label) = LEADING_LABELS.iter().find(|label| {
            text.get(..label.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(label))
        }) else {
            return text;
        };
        text = text[label.len()..].trim_start();
    }
}

fn is_list_item(line: &str) -> bool {
    if line.starts_with(['-', '*', '•']) {
        return true;
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && line[digits..].starts_with(['.', ')'])
}

fn is_follow_up_offer(line: &str) -> bool {
    let lower = line.to_lowercase();
    FOLLOW_UP_OPENERS.iter().any(|o| lower.starts_with(o))
        && (lower.ends_with('?') || lower.ends_with('.') || lower.ends_with('!'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_labels_and_special_tokens() {
        let raw = "<s> Answer: ATHENA: A list is an ordered collection.</s>";
        assert_eq!(clean_output(raw), "A list is an ordered collection.");
    }

    #[test]
    fn test_cuts_invented_dialogue() {
        let raw = "A tuple is immutable.\nStudent: What about sets?\nATHENA: Sets are unordered.";
        assert_eq!(clean_output(raw), "A tuple is immutable.");
    }

    #[test]
    fn test_cuts_self_continuation_on_new_line() {
        let raw = "Recursion is a function calling itself.\nNow let me explain loops.";
        assert_eq!(clean_output(raw), "Recursion is a function calling itself.");
    }

    #[test]
    fn test_cuts_repeated_self_continuation() {
        let raw = "A queue is FIFO. Now let me add one thing. Now let me continue with stacks.";
        assert_eq!(clean_output(raw), "A queue is FIFO.");
    }

    #[test]
    fn test_answer_opening_with_continuation_phrase_survives() {
        let raw = "Now let me explain: a linked list stores nodes that point to the next node.";
        assert_eq!(clean_output(raw), raw);

        let inline = "Sorting is done. Let me continue by noting it is stable.";
        assert_eq!(clean_output(inline), inline);
    }

    #[test]
    fn test_opening_phrase_repeated_cuts_at_repeat() {
        let raw = "Now let me explain: lists are ordered. Now let me explain sets too.";
        assert_eq!(clean_output(raw), "Now let me explain: lists are ordered.");
    }

    #[test]
    fn test_drops_follow_up_offers() {
        let raw = "Binary search halves the range each step.\n\nWould you like to see an example?";
        assert_eq!(clean_output(raw), "Binary search halves the range each step.");
    }

    #[test]
    fn test_dedupes_prose_but_keeps_list_items() {
        let raw = "Key points:\n- ordered\n- ordered\nKey points:\n1. mutable\n1. mutable";
        assert_eq!(clean_output(raw), "Key points:\n- ordered\n- ordered\n1. mutable\n1. mutable");
    }

    #[test]
    fn test_collapses_blank_runs() {
        let raw = "First paragraph.\n\n\n\nSecond paragraph.";
        assert_eq!(clean_output(raw), "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn test_list_item_detection() {
        assert!(is_list_item("- a"));
        assert!(is_list_item("• a"));
        assert!(is_list_item("12) a"));
        assert!(!is_list_item("2024 was a year"));
        assert!(!is_list_item("plain"));
    }

    #[test]
    fn test_clean_text_is_unchanged() {
        let raw = "A stack is LIFO.\n\nExample:\n- push 1\n- pop";
        assert_eq!(clean_output(raw), raw);
    }
}
