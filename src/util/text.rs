/// Remove the indentation shared with the first non-blank line.
///
/// The indentation width is measured on the first non-blank line. Every line
/// that starts with at least that many whitespace characters loses them; other
/// lines are kept as is. Leading and trailing blank space is trimmed last.
pub fn trim_default_value(content: &str) -> String {
    let Some(first) = content.lines().find(|line| !line.trim().is_empty()) else {
        return content.trim().to_string();
    };
    let indent = first.chars().take_while(|ch| ch.is_whitespace()).count();

    content
        .split('\n')
        .map(|line| strip_indent(line, indent))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn strip_indent(line: &str, indent: usize) -> &str {
    let mut chars = line.char_indices();
    for _ in 0..indent {
        match chars.next() {
            Some((_, ch)) if ch.is_whitespace() => {}
            _ => return line,
        }
    }
    match chars.next() {
        Some((offset, _)) => &line[offset..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_indentation_of_first_line() {
        let source = "\n    <div>\n      <p>hi</p>\n    </div>\n  ";
        assert_eq!(trim_default_value(source), "<div>\n  <p>hi</p>\n</div>");
    }

    #[test]
    fn keeps_lines_with_less_indentation() {
        let source = "    a\n  b\n    c";
        assert_eq!(trim_default_value(source), "a\n  b\nc");
    }

    #[test]
    fn blank_content_collapses_to_empty() {
        assert_eq!(trim_default_value("   \n\t\n"), "");
    }

    #[test]
    fn unindented_content_is_only_trimmed() {
        assert_eq!(trim_default_value("a\n b\n"), "a\n b");
    }
}
