use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known candidate attribute names. Records are open-ended; these are the
/// keys the pipeline itself reads or owns.
pub mod keys {
    pub const FULL_NAME: &str = "full_name";
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const SKILLS: &str = "skills";
    pub const EXPERIENCE: &str = "experience";
    pub const CURRENT_ROLE: &str = "current_role";
    pub const COMPANY: &str = "company";
    pub const LOCATION: &str = "location";
    pub const LINKEDIN_URL: &str = "linkedin_url";
    pub const SOURCE_FILE: &str = "source_file";

    pub const ENRICHMENT_SOURCE: &str = "enrichment_source";
    pub const LINKEDIN_VERIFIED: &str = "linkedin_verified";
    pub const LINKEDIN_EMAIL: &str = "linkedin_email";
    pub const LINKEDIN_HAS_PROFILE: &str = "linkedin_has_profile";

    pub const SCORE: &str = "score";
    pub const RATIONALE: &str = "rationale";
    pub const SCORING_METHOD: &str = "scoring_method";

    pub const INTERVIEW_DATE: &str = "interview_date";
    pub const INTERVIEW_TIME: &str = "interview_time";
    pub const INTERVIEW_DATETIME: &str = "interview_datetime";
    pub const DURATION_MINUTES: &str = "duration_minutes";
    pub const SCHEDULE_CREATED: &str = "schedule_created";
    pub const CALENDAR_EVENT_LINK: &str = "calendar_event_link";
}

/// A candidate record: a property bag that only ever grows as it moves
/// through the pipeline. Reads fall back to defaults; nothing deletes keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(Map<String, Value>);

impl Candidate {
    /// Wraps a JSON value; anything other than an object is rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the string at `key`, trimmed, or `default` when absent/empty.
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
    }

    pub fn name(&self) -> &str {
        let name = self.str_or(keys::FULL_NAME, "");
        if name.is_empty() {
            self.str_or(keys::NAME, "Unknown")
        } else {
            name
        }
    }

    pub fn email(&self) -> &str {
        self.str_or(keys::EMAIL, "")
    }

    /// Stable identity used for set comparisons: email, else name.
    pub fn identity(&self) -> String {
        let email = self.email();
        if email.is_empty() {
            self.name().to_lowercase()
        } else {
            email.to_lowercase()
        }
    }

    /// String items of an array attribute. Non-string items are rendered
    /// through their `name`/`title` field when they are objects.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Object(obj) => obj
                        .get("name")
                        .or_else(|| obj.get("title"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Number of entries in an array attribute (0 when absent).
    pub fn count(&self, key: &str) -> usize {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Sets a key owned by the calling stage.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Merges generated fields without overwriting anything already known.
    /// Returns how many keys were added.
    pub fn absorb(&mut self, fields: Map<String, Value>) -> usize {
        let mut added = 0;
        for (key, value) in fields {
            if value.is_null() || self.0.contains_key(&key) {
                continue;
            }
            self.0.insert(key, value);
            added += 1;
        }
        added
    }
}

impl From<Map<String, Value>> for Candidate {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(value: Value) -> Candidate {
        Candidate::from_value(value).unwrap()
    }

    #[test]
    fn test_name_falls_back_to_name_then_unknown() {
        assert_eq!(candidate(json!({"full_name": "Ada Lovelace"})).name(), "Ada Lovelace");
        assert_eq!(candidate(json!({"name": "Grace"})).name(), "Grace");
        assert_eq!(candidate(json!({"full_name": "  "})).name(), "Unknown");
    }

    #[test]
    fn test_identity_prefers_email_case_insensitive() {
        let c = candidate(json!({"full_name": "Ada", "email": "Ada@Example.com"}));
        assert_eq!(c.identity(), "ada@example.com");
        let c = candidate(json!({"full_name": "Ada"}));
        assert_eq!(c.identity(), "ada");
    }

    #[test]
    fn test_list_handles_strings_objects_and_csv() {
        let c = candidate(json!({
            "skills": ["Rust", " Go ", null, ""],
            "projects": [{"name": "compiler"}, {"title": "db"}],
            "languages": "English, French"
        }));
        assert_eq!(c.list("skills"), vec!["Rust", "Go"]);
        assert_eq!(c.list("projects"), vec!["compiler", "db"]);
        assert_eq!(c.list("languages"), vec!["English", "French"]);
        assert!(c.list("missing").is_empty());
    }

    #[test]
    fn test_number_parses_strings() {
        let c = candidate(json!({"score": "7.5", "raw": 3}));
        assert_eq!(c.number("score"), Some(7.5));
        assert_eq!(c.number("raw"), Some(3.0));
        assert_eq!(c.number("missing"), None);
    }

    #[test]
    fn test_absorb_never_overwrites_or_deletes() {
        let mut c = candidate(json!({"career_level": "Senior", "email": "a@b.c"}));
        let fields = json!({"career_level": "Junior", "linkedin_title": "Engineer", "empty": null});
        let added = c.absorb(fields.as_object().unwrap().clone());
        assert_eq!(added, 1);
        assert_eq!(c.str_or("career_level", ""), "Senior");
        assert_eq!(c.str_or("linkedin_title", ""), "Engineer");
        assert!(c.get("email").is_some());
        assert!(c.get("empty").is_none());
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Candidate::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn test_serializes_transparently() {
        let c = candidate(json!({"email": "a@b.c"}));
        assert_eq!(serde_json::to_value(&c).unwrap(), json!({"email": "a@b.c"}));
    }
}
