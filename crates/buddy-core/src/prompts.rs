//! Prompt and reply texts.

pub const GENERATION_ERROR_MSG: &str = "I can't process that right now, try again later!";
pub const UNKNOWN_COMMAND_MSG: &str = "I'm not sure how to respond to that.";
pub const START_MSG: &str = "Hello! I'm ChatBuddy. Use /activate to turn on hourly quizzes, \
/deactivate to turn them off, /quiz <word> for a quiz right now, or mention me to chat.";
pub const ACTIVATED_MSG: &str = "✅ Quizzes activated in this chat.";
pub const ALREADY_ACTIVE_MSG: &str = "✅ Quizzes are already active in this chat.";
pub const DEACTIVATED_MSG: &str = "❌ Quizzes deactivated in this chat.";
pub const NOT_ACTIVE_MSG: &str = "Quizzes were not active in this chat.";
pub const QUIZ_USAGE_MSG: &str = "Usage: /quiz <word>";
pub const QUIZ_SEND_FAILED_MSG: &str = "I couldn't send the quiz poll here.";

/// Scheduled vocabulary quiz.
pub const VOCABULARY_QUIZ_PROMPT: &str = r#"Follow these response guidelines:
1. DO NOT use markdown formatting (no asterisks for bold/italic)
Create a multiple-choice English vocabulary question. Return JSON:
{"question":"...","choices":["opt1","opt2","opt3","opt4"],"answer_index":<0-3>}."#;

/// Ad-hoc quiz about one word.
pub fn word_quiz_prompt(word: &str) -> String {
    format!(
        r#"Follow these response guidelines:
1. DO NOT use markdown formatting (no asterisks for bold/italic)
Create a multiple-choice English vocabulary question that tests the meaning or usage of the word "{word}". Return JSON:
{{"question":"...","choices":["opt1","opt2","opt3","opt4"],"answer_index":<0-3>}}."#
    )
}

/// Free-form chat reply.
pub fn chat_prompt(query: &str) -> String {
    format!(
        r#"You are a helpful and witty Telegram bot. The user asked: "{query}"

Follow these response guidelines:
1. Keep all responses brief and concise (2-3 sentences maximum)
2. DO NOT use markdown formatting (no asterisks for bold/italic)
3. Be conversational and friendly
4. Focus only on the most essential information
Response language: Same as the user's message"#
    )
}

pub fn help_text(handle: &str, creator: Option<&str>) -> String {
    let mut out = format!(
        "How to use me:\n\
- /activate to enable hourly English quizzes in this chat\n\
- /deactivate to disable them\n\
- /quiz <word> for a quiz about a word right now\n\
- /broadcast to send a quiz to every active chat now\n\
- Mention me like @{handle} with a question or message, or reply to one of my messages\n\
- Example: '@{handle} What's the weather like?'"
    );
    if let Some(c) = creator {
        out.push_str(&format!("\nthe creator❤️ {c}"));
    }
    out
}
