//! Code-assistant intents
//!
//! The panel's code tab issues chat calls with fixed prompt shapes per
//! action over a `{language, code}` pair. The builders here are the
//! single source of those shapes for both the panel and the CLI.

use crate::gateway::ChatMessage;
use clap::ValueEnum;

/// Actions offered by the code-assistant tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CodeAction {
    Explain,
    Debug,
    Format,
    Generate,
}

/// Conversation sent to the gateway for one code-assist action
pub fn request_messages(language: &str, action: CodeAction, code: &str) -> Vec<ChatMessage> {
    let system = format!(
        "You are an expert {} developer. Provide clear, concise, and helpful responses \
with properly formatted code.",
        language
    );
    let user = match action {
        CodeAction::Explain => {
            format!("Explain this {} code in detail:\n\n{}", language, code)
        }
        CodeAction::Debug => {
            format!(
                "Help me debug this {} code and suggest fixes:\n\n{}",
                language, code
            )
        }
        CodeAction::Format => {
            format!(
                "Format and improve this {} code with best practices:\n\n{}",
                language, code
            )
        }
        CodeAction::Generate => {
            format!("Generate {} code based on this description:\n\n{}", language, code)
        }
    };
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}
