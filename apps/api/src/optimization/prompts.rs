// All AI prompt text for the optimization pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{FACTS_INSTRUCTION, JSON_OBJECT_INSTRUCTION};

pub const START_MARKER: &str = "---START_OPTIMIZED---";
pub const END_MARKER: &str = "---END_OPTIMIZED---";

/// System prompt for the rewrite call.
pub const OPTIMIZATION_SYSTEM: &str = "You are a professional resume optimization assistant. \
    Produce a polished, job-targeted version of the candidate resume that increases relevance \
    to the job description, keeps facts intact, improves action verbs, quantifies achievements \
    where possible, and adds relevant keywords from the job description. \
    Keep the length similar to the original unless the job requires a shorter format.";

/// Rewrite prompt template. Replace `{job_description}` and `{resume}` before sending.
const OPTIMIZATION_PROMPT_TEMPLATE: &str = r#"Job Description:
{job_description}

Candidate base resume:
{resume}

Instructions:
1. Tailor the resume to the job description above. Use keywords and phrases present in the job description naturally in bullet points and summary.
2. {facts}
3. Replace weak verbs with strong action verbs.
4. Provide the output as:
---START_OPTIMIZED---
[optimized resume text here]
---END_OPTIMIZED---"#;

/// System prompt for the change-summary call.
pub const SUMMARY_SYSTEM: &str = "You are a resume change summarizer.";

/// Summary prompt template. Replace `{original}` and `{optimized}` before sending.
const SUMMARY_PROMPT_TEMPLATE: &str = r#"Given the original resume and the optimized resume, produce:
1) A short 8-12 word headline of the main change (e.g., "Added Excel and data analysis keywords")
2) A 2-3 sentence summary of what changed and why it helps for the job.
3) A list of added keywords or phrases (5-12 items).

Original:
{original}

Optimized:
{optimized}

Use this exact shape:
{
  "headline": "your headline here",
  "summary": "your 2-3 sentence summary here",
  "keywordsAdded": ["keyword1", "keyword2", "keyword3"]
}
{json_only}"#;

pub fn build_optimization_prompt(job_description: &str, resume: &str) -> String {
    OPTIMIZATION_PROMPT_TEMPLATE
        .replace("{facts}", FACTS_INSTRUCTION)
        .replace("{job_description}", job_description)
        .replace("{resume}", resume)
}

pub fn build_summary_prompt(original: &str, optimized: &str) -> String {
    SUMMARY_PROMPT_TEMPLATE
        .replace("{json_only}", JSON_OBJECT_INSTRUCTION)
        .replace("{original}", original)
        .replace("{optimized}", optimized)
}
