//! Canned replies for greetings and other conversational filler.
//!
//! Only short messages that consist entirely of a known phrase (optionally
//! followed by "athena" or "there") are matched, so "help me understand
//! recursion" still goes through retrieval.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmallTalk {
    Greeting,
    TimeOfDay,
    HowAreYou,
    Identity,
    Help,
    Thanks,
}

const PHRASES: &[(SmallTalk, &[&str])] = &[
    (
        SmallTalk::Greeting,
        &["hello", "hi", "hey", "greetings", "howdy", "whats up", "what s up"],
    ),
    (
        SmallTalk::TimeOfDay,
        &["good morning", "good afternoon", "good evening", "good night"],
    ),
    (
        SmallTalk::HowAreYou,
        &["how are you", "how are you doing", "how do you do"],
    ),
    (
        SmallTalk::Identity,
        &["who are you", "what is your name", "whats your name", "what s your name"],
    ),
    (
        SmallTalk::Help,
        &["help", "help me", "can you help", "can you help me", "i need help"],
    ),
    (
        SmallTalk::Thanks,
        &["thanks", "thank you", "thanks a lot", "thank you so much", "much appreciated"],
    ),
];

const TRAILING_ADDRESS: &[&str] = &["athena", "there"];

impl SmallTalk {
    pub fn detect(message: &str) -> Option<Self> {
        let normalized = normalize(message);
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let core = match words.split_last() {
            Some((last, rest)) if !rest.is_empty() && TRAILING_ADDRESS.contains(last) => rest,
            _ => &words[..],
        };
        let phrase = core.join(" ");

        PHRASES
            .iter()
            .find(|(_, phrases)| phrases.contains(&phrase.as_str()))
            .map(|(kind, _)| *kind)
    }

    pub fn reply(self) -> &'static str {
        match self {
            SmallTalk::Greeting => {
                "Hello! I'm ATHENA, your academic mentor. Ask me about anything in your \
                 course material and I'll explain it step by step."
            }
            SmallTalk::TimeOfDay => {
                "Good day! I'm ATHENA, ready to help with your coursework. Which topic \
                 would you like to explore?"
            }
            SmallTalk::HowAreYou => {
                "I'm doing well and ready to help you learn. What are you studying right now?"
            }
            SmallTalk::Identity => {
                "I'm ATHENA, an AI academic mentor. I answer questions using your course \
                 materials and explain concepts in a clear, structured way."
            }
            SmallTalk::Help => {
                "Of course. Ask me a specific question about your course, for example \
                 \"What is a linked list?\", and I'll walk you through it."
            }
            SmallTalk::Thanks => "You're welcome! Ask me anything else whenever you need.",
        }
    }
}

fn normalize(message: &str) -> String {
    message
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}
