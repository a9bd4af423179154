// Shared prompt fragments.
// Each service that needs AI calls defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments only.

/// Appended to prompts whose reply is machine-parsed as a JSON object.
pub const JSON_OBJECT_INSTRUCTION: &str = "Respond with a single JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Guards against fabricated experience in any rewrite prompt.
pub const FACTS_INSTRUCTION: &str = "\
    CRITICAL: Keep the candidate's employers, titles, dates, and degrees exactly as given. \
    Do NOT invent experience, dates, or metrics. \
    If the text implies a metric you may surface it; if it does not, leave it out.";
