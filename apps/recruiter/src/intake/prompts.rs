// Intake LLM prompt templates.

pub const RESUME_PARSE_SYSTEM: &str = "\
You are a precise resume data extractor for a recruiting team. \
Convert raw resume text into structured JSON. \
You MUST respond with valid JSON only — no markdown fences, no explanations.";

pub const RESUME_PARSE_PROMPT: &str = r#"Extract the candidate described in this resume.

FILE: {file_name}

RESUME TEXT:
{resume_text}

OUTPUT SCHEMA (return exactly this structure, use "" or [] when unknown):
{
  "full_name": "string",
  "email": "string",
  "phone": "string",
  "location": "string",
  "current_role": "string",
  "company": "string",
  "years_of_experience": "string",
  "linkedin_url": "string",
  "github_url": "string",
  "portfolio_url": "string",
  "summary": "string",
  "skills": ["string"],
  "experience": [{"title": "string", "company": "string", "duration": "string", "achievements": ["string"]}],
  "education": [{"degree": "string", "field": "string", "institution": "string", "year": "string"}],
  "certifications": ["string"],
  "projects": [{"name": "string", "description": "string"}],
  "languages": ["string"]
}"#;
