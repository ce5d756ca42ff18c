//! Canned replies for pleasantries that need no retrieval.
//!
//! Greetings match whole tokens at the start of the message ("hi there",
//! but never the "hi" in "this"). Thanks and farewells match anywhere as
//! plain substrings.

pub const GREETING_REPLY: &str = "Hi! How can I help you today?";
pub const THANKS_REPLY: &str = "You're welcome! 😊";
pub const FAREWELL_REPLY: &str = "Goodbye! Have a great day!";

const GREETINGS: [&str; 3] = ["hi", "hello", "hey"];
const THANKS: [&str; 1] = ["thank"];
const FAREWELLS: [&str; 3] = ["bye", "goodbye", "see you"];

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Message opens with a greeting token; the rest of that line is free text.
fn is_greeting(text: &str) -> bool {
    GREETINGS.iter().any(|greeting| {
        text.strip_prefix(greeting).is_some_and(|rest| {
            !rest.chars().next().is_some_and(is_word_char) && !rest.contains('\n')
        })
    })
}

/// Canned reply for `user_text`, or `None` when it should go to the pipeline.
///
/// Checked in order: greeting, thanks, farewell.
#[must_use]
pub fn detect(user_text: &str) -> Option<&'static str> {
    let text = user_text.trim().to_lowercase();

    if is_greeting(&text) {
        return Some(GREETING_REPLY);
    }
    if THANKS.iter().any(|t| text.contains(t)) {
        return Some(THANKS_REPLY);
    }
    if FAREWELLS.iter().any(|f| text.contains(f)) {
        return Some(FAREWELL_REPLY);
    }
    None
}
