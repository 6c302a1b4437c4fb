/// Strips markdown bold markers from a backend answer.
///
/// Single `*` characters are kept; every `**` run is removed until none is left.
pub fn normalize_answer(text: &str) -> String {
    let mut out = text.to_string();
    while out.contains("**") {
        out = out.replace("**", "");
    }
    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
mod tests {
    use super::normalize_answer;

    #[test]
    fn removes_bold_markers() {
        assert_eq!(
            normalize_answer("The **main** difference is **scope**.\n"),
            "The main difference is scope."
        );
    }

    #[test]
    fn keeps_single_asterisks() {
        assert_eq!(normalize_answer("* item\n* other"), "* item\n* other");
    }

    #[test]
    fn odd_runs_leave_no_double_marker() {
        let out = normalize_answer("a***b****c");
        assert!(!out.contains("**"));
        assert_eq!(out, "a*bc");
    }
}
