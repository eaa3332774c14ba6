//! Assistant instructions and fixed utterances

/// System instructions sent ahead of the conversation history
pub const INSTRUCTIONS: &str = "You are a helpful voice AI assistant for a small CRM. \
Keep responses concise and natural for spoken dialogue. Use the conversation history for context. \
Use the tools to look up, add and update contacts, notes and tasks instead of guessing. \
Due dates are in the format YYYY-MM-DD. Be friendly and helpful.";

/// Spoken when a session starts
pub const GREETING: &str = "Hello! I'm your mini CRM assistant. How can I help you today?";

/// Instructions with today's date appended so relative dates resolve
#[must_use]
pub fn instructions_for(today: chrono::NaiveDate) -> String {
    format!("{INSTRUCTIONS} Today is {}.", today.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_include_date() {
        let today = chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert!(instructions_for(today).ends_with("Today is 2025-03-01."));
    }
}
