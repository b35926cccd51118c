// Scoring LLM prompt templates.

pub const SCORING_SYSTEM: &str = "\
You are an expert technical recruiter. You evaluate candidates strictly \
against the company criteria you are given. \
You MUST respond with valid JSON only. Do NOT use markdown code fences.";

/// Replace `{criteria}` and `{candidate}` (both pretty-printed JSON) before sending.
pub const SCORING_PROMPT: &str = r#"Evaluate the candidate strictly according to these company criteria:
{criteria}

Candidate details:
{candidate}

{constraints}

Return exactly this structure:
{
  "score": 8.5,
  "rationale": "One paragraph: why this score, strengths and gaps against the criteria"
}
The score is a number between 1 and 10 and may include one decimal."#;
