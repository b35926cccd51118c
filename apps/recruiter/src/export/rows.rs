// Tabular views of candidate records for sheets and CSV.
// Every builder returns the header row first.

use crate::models::{keys, Candidate};

pub type Row = Vec<String>;

pub const ROSTER_HEADERS: [&str; 12] = [
    "Full Name",
    "Email",
    "Phone",
    "Current Role",
    "Current Company",
    "Career Level",
    "Location",
    "Top Skills",
    "LinkedIn",
    "LinkedIn Verified",
    "Enrichment Source",
    "Professional Summary",
];

pub const INTERVIEW_HEADERS: [&str; 10] = [
    "Candidate Name",
    "Email",
    "Score",
    "Interview Date",
    "Interview Time",
    "Duration (min)",
    "Calendar Event Created",
    "Rationale",
    "Skills",
    "Current Role",
];

pub const CSV_HEADERS: [&str; 8] = [
    "Name",
    "Email",
    "Score",
    "Interview Date",
    "Interview Time",
    "Duration (min)",
    "Calendar Event",
    "Rationale",
];

const TOP_SKILLS: usize = 6;
const NOT_SCHEDULED: &str = "Not scheduled";

fn header(columns: &[&str]) -> Row {
    columns.iter().map(|c| c.to_string()).collect()
}

fn top_skills(candidate: &Candidate) -> String {
    let skills = candidate.list(keys::SKILLS);
    if skills.is_empty() {
        return candidate.str_or("key_competencies", "").chars().take(60).collect();
    }
    let mut shown = skills.iter().take(TOP_SKILLS).cloned().collect::<Vec<_>>().join(", ");
    if skills.len() > TOP_SKILLS {
        shown.push_str(&format!(" (+{})", skills.len() - TOP_SKILLS));
    }
    shown
}

fn linkedin_status(candidate: &Candidate) -> String {
    let verified_email = candidate.str_or(keys::LINKEDIN_EMAIL, "");
    if candidate.flag(keys::LINKEDIN_VERIFIED) && !verified_email.is_empty() {
        format!("Verified ({verified_email})")
    } else if candidate.flag(keys::LINKEDIN_HAS_PROFILE) || !candidate.str_or(keys::LINKEDIN_URL, "").is_empty() {
        "Profile Found".to_string()
    } else {
        "No".to_string()
    }
}

/// Generated summary first, then the resume's own, then the value statement;
/// a sentence assembled from role and company when none exist.
fn professional_summary(candidate: &Candidate) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for key in ["linkedin_summary", "summary", "professional_value"] {
        let text = candidate.str_or(key, "");
        if !text.is_empty() && !parts.iter().any(|p| p.contains(text)) {
            parts.push(text);
        }
    }
    if !parts.is_empty() {
        return parts.join(" | ");
    }

    let role = candidate.str_or(keys::CURRENT_ROLE, "");
    let company = candidate.str_or(keys::COMPANY, "");
    let mut sentence = Vec::new();
    if !role.is_empty() {
        sentence.push(role.to_string());
    }
    if !company.is_empty() {
        sentence.push(format!("at {company}"));
    }
    if let Some(skill) = candidate.list(keys::SKILLS).first() {
        sentence.push(format!("specializing in {skill}"));
    }
    if sentence.is_empty() {
        "Professional seeking new opportunities".to_string()
    } else {
        format!("{} professional", sentence.join(" "))
    }
}

fn score_cell(candidate: &Candidate) -> String {
    candidate
        .number(keys::SCORE)
        .map_or_else(|| "N/A".to_string(), |s| format!("{s:.1}"))
}

fn duration_cell(candidate: &Candidate) -> String {
    candidate
        .number(keys::DURATION_MINUTES)
        .map_or_else(String::new, |d| format!("{d:.0}"))
}

pub fn roster_rows(candidates: &[Candidate]) -> Vec<Row> {
    let mut rows = vec![header(&ROSTER_HEADERS)];
    rows.extend(candidates.iter().map(|c| {
        vec![
            c.name().to_string(),
            c.email().to_string(),
            c.str_or(keys::PHONE, "").to_string(),
            c.str_or(keys::CURRENT_ROLE, "").to_string(),
            c.str_or(keys::COMPANY, "").to_string(),
            c.str_or("career_level", "Mid-level").to_string(),
            c.str_or(keys::LOCATION, "").to_string(),
            top_skills(c),
            c.str_or(keys::LINKEDIN_URL, "").to_string(),
            linkedin_status(c),
            c.str_or(keys::ENRICHMENT_SOURCE, "").to_string(),
            professional_summary(c),
        ]
    }));
    rows
}

pub fn interview_rows(candidates: &[Candidate]) -> Vec<Row> {
    let mut rows = vec![header(&INTERVIEW_HEADERS)];
    rows.extend(candidates.iter().map(|c| {
        let created = if c.flag(keys::SCHEDULE_CREATED) { "Yes" } else { "No" };
        vec![
            c.name().to_string(),
            c.email().to_string(),
            score_cell(c),
            c.str_or(keys::INTERVIEW_DATE, NOT_SCHEDULED).to_string(),
            c.str_or(keys::INTERVIEW_TIME, NOT_SCHEDULED).to_string(),
            duration_cell(c),
            created.to_string(),
            c.str_or(keys::RATIONALE, "").to_string(),
            c.list(keys::SKILLS).into_iter().take(5).collect::<Vec<_>>().join(", "),
            c.str_or(keys::CURRENT_ROLE, "").to_string(),
        ]
    }));
    rows
}

pub fn csv_rows(candidates: &[Candidate]) -> Vec<Row> {
    let mut rows = vec![header(&CSV_HEADERS)];
    rows.extend(candidates.iter().map(|c| {
        let event = match c.str_or(keys::CALENDAR_EVENT_LINK, "") {
            "" if c.flag(keys::SCHEDULE_CREATED) => "Yes".to_string(),
            "" => "No".to_string(),
            link => link.to_string(),
        };
        vec![
            c.name().to_string(),
            c.email().to_string(),
            score_cell(c),
            c.str_or(keys::INTERVIEW_DATE, NOT_SCHEDULED).to_string(),
            c.str_or(keys::INTERVIEW_TIME, NOT_SCHEDULED).to_string(),
            duration_cell(c),
            event,
            c.str_or(keys::RATIONALE, "").to_string(),
        ]
    }));
    rows
}
