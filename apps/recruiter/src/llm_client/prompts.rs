// Shared prompt fragments and template filling.
// Each collaborator that needs LLM calls defines its own prompts.rs alongside it.

/// Instruction appended to prompts that describe a real person.
pub const NO_FABRICATION_INSTRUCTION: &str = "\
    Only use facts present in the candidate data provided. \
    If a field cannot be determined, use an empty string or an empty list. \
    Never invent employers, degrees, contact details or dates.";

/// Fills `{placeholder}` markers in a template.
pub fn fill(template: &str, pairs: &[(&str, &str)]) -> String {
    pairs.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_every_marker() {
        let out = fill("{name} has {count} roles; {name}", &[("name", "Ada"), ("count", "3")]);
        assert_eq!(out, "Ada has 3 roles; Ada");
    }

    #[test]
    fn test_fill_leaves_unknown_markers() {
        assert_eq!(fill("{missing}", &[("name", "Ada")]), "{missing}");
    }
}
