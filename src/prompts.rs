//! Prompt construction for the four pipeline call kinds.
//!
//! Provider-agnostic: each builder returns the message list for one call.
//! The five brief labels are embedded verbatim so the evaluation and repair
//! prompts stay in lockstep with the strict parser.

use crate::brief::{EXPECTED_SCHEMA, FIELD_LABELS};
use crate::gateway::Message;

// =============================================================================
// Generation
// =============================================================================

const GENERATION_SYSTEM_PROMPT: &str =
    "You are an AI assistant that generates creative story ideas for a content team.";

/// Messages for one single-idea generation request.
pub fn generation_messages(topic: &str) -> Vec<Message> {
    let user = format!(
        "Generate one story idea for the topic: {topic}\n\n\
         Start your response with \"Title:\" followed by a short headline, \
         then a few sentences describing the idea."
    );
    vec![Message::system(GENERATION_SYSTEM_PROMPT), Message::user(user)]
}

// =============================================================================
// Evaluation
// =============================================================================

const EVALUATION_SYSTEM_PROMPT: &str = "\
As the NYTimes data journalism editor, your job is to take promising brainstorm \
ideas and improve them: make them more concrete, more newsworthy, and viable to \
create without large technical hurdles. You also provide justification for why \
each idea deserves to be produced. The rubric you think about most frequently \
when evaluating ideas is the SUCCESs model of content stickiness made famous in \
Made to Stick by Chip and Dan Heath.";

/// Messages for one enhance-and-structure evaluation request.
pub fn evaluation_messages(idea_text: &str) -> Vec<Message> {
    let user = format!(
        "Enhance the following brainstorm idea and restructure it.\n\n\
         Idea:\n{idea_text}\n\n\
         Provide the result in exactly this structured format:\n\n\
         {labels}\n\n\
         Ensure all the information is provided in a single block, with each \
         label starting its own line.",
        labels = format_label_template(),
    );
    vec![Message::system(EVALUATION_SYSTEM_PROMPT), Message::user(user)]
}

fn format_label_template() -> String {
    FIELD_LABELS
        .iter()
        .zip([
            "[Enhanced title for the idea]",
            "[Detailed description of the idea, including the lede, newsworthy hooks, target audience, and why they should care]",
            "[Justification for selecting this idea]",
            "[Methodology for producing this idea, including feasibility within a 2-week timeline]",
            "[Datasets, sources, technologies, and tools needed to accomplish this idea]",
        ])
        .map(|(label, hint)| format!("{label} {hint}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Brief enhancement
// =============================================================================

/// Messages for the brief-enhancement request that precedes parsing.
pub fn brief_messages(refined_text: &str) -> Vec<Message> {
    let user = format!(
        "Enhance and make more specific each part of this idea brief, especially \
         providing sources for datasets needed for the idea and methodological \
         guidance to help prevent roadblocks or timesucks.\n\n\
         Idea:\n{refined_text}\n\n\
         Keep the result in exactly this format, with each label starting its \
         own line:\n\n{EXPECTED_SCHEMA}"
    );
    vec![Message::user(user)]
}

// =============================================================================
// Repair
// =============================================================================

const REPAIR_SYSTEM_PROMPT: &str =
    "You are an expert at rewriting text to match an exact expected format. \
     You output only the reformatted text, nothing else.";

/// Messages for the structured-repair request.
pub fn repair_messages(malformed_text: &str) -> Vec<Message> {
    let user = format!(
        "Rewrite the following text to match the expected format exactly. Keep \
         all of the substantive content; change only the structure.\n\n\
         Expected format:\n{EXPECTED_SCHEMA}\n\n\
         Text to fix:\n{malformed_text}"
    );
    vec![Message::system(REPAIR_SYSTEM_PROMPT), Message::user(user)]
}
