//! Markdown review prompt formatting.
//!
//! Bundles a bounded diff snippet and DDL snippet into a prompt a reviewer
//! (human or model) can consume without the full comparison context.

/// Upper bound on the embedded diff snippet, in characters.
const DIFF_SNIPPET_MAX: usize = 1000;

/// Upper bound on the embedded DDL snippet, in characters.
const DDL_SNIPPET_MAX: usize = 4000;

/// Build the review prompt from a serialized diff and a generated script.
pub fn build_review_prompt(diff_json: &str, ddl: &str) -> String {
    let (diff_snippet, diff_truncated) = truncate_chars(diff_json, DIFF_SNIPPET_MAX);
    let (ddl_snippet, ddl_truncated) = truncate_chars(ddl, DDL_SNIPPET_MAX);

    let mut out = String::new();
    out.push_str("# Schema migration review\n\n");
    out.push_str(
        "Review the proposed migration below. Flag destructive statements, \
         lossy type changes, and any TODO marker that needs manual follow-up.\n\n",
    );

    out.push_str("## Diff\n\n```json\n");
    out.push_str(&diff_snippet);
    out.push_str("\n```\n");
    if diff_truncated {
        out.push_str("\n_(diff snippet truncated)_\n");
    }

    out.push_str("\n## Proposed DDL\n\n```sql\n");
    out.push_str(&ddl_snippet);
    out.push_str("\n```\n");
    if ddl_truncated {
        out.push_str("\n_(DDL snippet truncated)_\n");
    }

    out
}

/// Truncate to at most `max` characters; returns whether truncation happened.
fn truncate_chars(text: &str, max: usize) -> (String, bool) {
    if text.chars().count() <= max {
        (text.to_string(), false)
    } else {
        (text.chars().take(max).collect(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippets_are_bounded() {
        let long_diff = "x".repeat(5000);
        let long_ddl = "y".repeat(9000);
        let prompt = build_review_prompt(&long_diff, &long_ddl);

        let diff_run = prompt.matches('x').count();
        let ddl_run = prompt.matches('y').count();
        assert_eq!(diff_run, DIFF_SNIPPET_MAX);
        assert_eq!(ddl_run, DDL_SNIPPET_MAX);
        assert!(prompt.contains("_(diff snippet truncated)_"));
        assert!(prompt.contains("_(DDL snippet truncated)_"));
    }

    #[test]
    fn test_short_inputs_pass_through() {
        let prompt = build_review_prompt("{}", "DROP TABLE \"users\";");
        assert!(prompt.contains("```json\n{}\n```"));
        assert!(prompt.contains("```sql\nDROP TABLE \"users\";\n```"));
        assert!(!prompt.contains("truncated"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(10);
        let (out, truncated) = truncate_chars(&text, 4);
        assert!(truncated);
        assert_eq!(out.chars().count(), 4);
    }
}
