//! Field splitting for one already-newline-stripped log record.
//!
//! Two modes share the same scan: plain CSV (quote-escaping only) and
//! bracket-aware (additionally treats `[...]` groups as a single field, used
//! by records embedding unquoted lists such as player equipment).

/// Split a line into comma-separated fields, honoring `"`-quoting with `""`
/// as an escaped literal quote. No backslash escapes.
pub fn split_fields(line: &str) -> Vec<String> {
    split(line, false)
}

/// Split a line into fields the same way [`split_fields`] does, except a
/// comma inside a non-negative bracket depth (`[`/`]`) does not split.
pub fn split_fields_bracketed(line: &str) -> Vec<String> {
    split(line, true)
}

fn split(line: &str, bracket_aware: bool) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut depth: i32 = 0;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            '[' if bracket_aware && !in_quotes => {
                depth += 1;
                field.push('[');
            }
            ']' if bracket_aware && !in_quotes => {
                depth = (depth - 1).max(0);
                field.push(']');
            }
            ',' if !in_quotes && depth == 0 => {
                fields.push(std::mem::take(&mut field));
            }
            other => field.push(other),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_fields() {
        assert_eq!(split_fields("a,b,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn handles_doubled_quote_as_literal() {
        assert_eq!(split_fields(r#"a,"b""c",d"#), vec!["a", "b\"c", "d"]);
    }

    #[test]
    fn comma_inside_quotes_does_not_split() {
        assert_eq!(split_fields(r#""a,b",c"#), vec!["a,b", "c"]);
    }

    #[test]
    fn bracketed_list_does_not_split_on_inner_commas() {
        let fields = split_fields_bracketed("1,[2,3,4],5");
        assert_eq!(fields, vec!["1", "[2,3,4]", "5"]);
    }

    #[test]
    fn nested_bracketed_groups_stay_whole() {
        let fields = split_fields_bracketed("[[1,2],[3,4]],x");
        assert_eq!(fields, vec!["[[1,2],[3,4]]", "x"]);
    }

    #[test]
    fn unmatched_closing_bracket_floors_depth_at_zero() {
        let fields = split_fields_bracketed("a],b,c");
        assert_eq!(fields, vec!["a]", "b", "c"]);
    }
}
