// src/pipeline/fence.rs
//! Markdown code-fence removal for model replies.

const FENCE: &str = "```";

/// Trim, drop an opening fence line (language tag included) and a closing fence, trim again.
///
/// A single pass is not idempotent: doubled fences (```` "``````" ````) or a fence
/// wrapped in another one leave a marker behind for the next call. The pass is
/// therefore repeated until nothing changes, so such input is stripped further than
/// one pass would strip it and a second call is always a no-op.
pub fn strip_fences(text: &str) -> String {
    let mut current = text;
    loop {
        let next = strip_once(current);
        if next.len() == current.len() {
            return next.to_string();
        }
        current = next;
    }
}

fn strip_once(text: &str) -> &str {
    let mut s = text.trim();
    if s.starts_with(FENCE) {
        if let Some(nl) = s.find('\n') {
            s = &s[nl + 1..];
        }
    }
    if let Some(rest) = s.strip_suffix(FENCE) {
        s = rest;
    }
    s.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence_with_language_tag() {
        let raw = "\n```json\n[{\"title\":\"A\"}]\n```\n";
        assert_eq!(strip_fences(raw), "[{\"title\":\"A\"}]");
    }

    #[test]
    fn plain_text_is_only_trimmed() {
        assert_eq!(strip_fences("  {\"a\":1}\t\n"), "{\"a\":1}");
    }

    #[test]
    fn closing_fence_alone_is_removed() {
        assert_eq!(strip_fences("[1,2]\n```"), "[1,2]");
    }

    #[test]
    fn opening_fence_without_newline_keeps_text() {
        // no line break after the marker: nothing to drop at the front
        assert_eq!(strip_fences("```json"), "```json");
    }

    #[test]
    fn doubled_fences_collapse() {
        assert_eq!(strip_fences("```\n```json\n[]\n```\n```"), "[]");
        assert_eq!(strip_fences("``````"), "");
    }

    #[test]
    fn idempotent_on_assorted_inputs() {
        for x in [
            "",
            "   ",
            "```",
            "``````",
            "```\n```",
            "```json\n{}\n```",
            "```\n```json\n[]\n```\n```",
            "text ``` in the middle",
            "   [1]   ",
        ] {
            let once = strip_fences(x);
            assert_eq!(strip_fences(&once), once, "not idempotent for {x:?}");
        }
    }
}
