// src/pipeline/template.rs
//! Literal placeholder substitution for operator-authored prompts.

pub const START_DATE_TOKEN: &str = "{{start_date}}";
pub const END_DATE_TOKEN: &str = "{{end_date}}";

/// Replace every `{{start_date}}` / `{{end_date}}` occurrence. No escaping, single pass
/// per token, so a date value that itself contains a token is not expanded again.
pub fn render(template: &str, start_date: &str, end_date: &str) -> String {
    template
        .replace(START_DATE_TOKEN, start_date)
        .replace(END_DATE_TOKEN, end_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_both_tokens_everywhere() {
        let t = "From {{start_date}} to {{end_date}}; again {{start_date}}.";
        let out = render(t, "2024-01-01", "2024-01-31");
        assert_eq!(out, "From 2024-01-01 to 2024-01-31; again 2024-01-01.");
        assert!(!out.contains(START_DATE_TOKEN));
        assert!(!out.contains(END_DATE_TOKEN));
    }

    #[test]
    fn template_without_tokens_is_unchanged() {
        let t = "List the best events in town.";
        assert_eq!(render(t, "2024-01-01", "2024-01-31"), t);
    }

    #[test]
    fn near_miss_tokens_pass_through() {
        let t = "{start_date} {{ end_date }} {{START_DATE}}";
        assert_eq!(render(t, "a", "b"), t);
    }
}
