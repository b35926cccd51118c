// Enrichment LLM prompt templates.

pub const PROFILE_SYSTEM: &str = "\
You write concise, factual professional profile fields for recruiters. \
You MUST respond with valid JSON only — no markdown fences, no explanations.";

pub const PROFILE_PROMPT: &str = r#"Generate professional profile fields for this candidate.

Candidate: {name}
Current Role: {role}
Company: {company}
Skills: {skills}
Experience: {experience_count} roles in background

{constraints}

OUTPUT SCHEMA (return exactly this structure):
{
  "linkedin_title": "Professional headline with key skills and role",
  "linkedin_industry": "Industry category",
  "linkedin_summary": "Professional summary, 2-3 sentences",
  "experience_highlights": "3-4 key career achievements",
  "key_competencies": "Top 8-10 skills relevant to the role",
  "career_level": "Junior | Mid-level | Senior | Executive",
  "professional_value": "What they bring to an organization"
}"#;
