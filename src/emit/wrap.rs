//! Line-continued token lists, as used for `OBJS = ...` style assignments.

/// Layout of a wrapped block
#[derive(Debug, Clone)]
pub struct WrapOptions<'a> {
    /// Text starting the first line
    pub prefix: &'a str,
    /// Text appended after the last token
    pub postfix: &'a str,
    pub sep: &'a str,
    /// Maximum line width, continuation marker included
    pub width: usize,
    /// Continuation marker closing every line but the last
    pub end: &'a str,
    /// Indent continuation lines to the width of the prefix
    pub adjust: bool,
}

impl Default for WrapOptions<'_> {
    fn default() -> Self {
        Self {
            prefix: "",
            postfix: "",
            sep: " ",
            width: 80,
            end: "\\",
            adjust: true,
        }
    }
}

impl<'a> WrapOptions<'a> {
    #[must_use]
    pub fn with_prefix(prefix: &'a str) -> Self {
        Self {
            prefix,
            ..Self::default()
        }
    }
}

/// Join `tokens` into a block of lines no wider than `options.width`.
///
/// A line is closed once appending the next token (plus separator and
/// marker) would overflow. Closed lines are padded with spaces so the
/// continuation markers line up in one column. A token that does not fit even
/// on a fresh line is placed there anyway.
#[must_use]
pub fn wrap_tokens<S: AsRef<str>>(tokens: &[S], options: &WrapOptions<'_>) -> String {
    let indent = if options.adjust {
        " ".repeat(options.prefix.chars().count())
    } else {
        String::new()
    };
    let sep_len = options.sep.chars().count();
    let end_len = options.end.chars().count();

    let mut result = String::new();
    let mut line = options.prefix.to_string();
    let mut line_len = options.prefix.chars().count();
    let mut fresh = true;

    for token in tokens {
        let token = token.as_ref();
        let needed = line_len + sep_len + token.chars().count() + end_len + 1;
        if needed > options.width && !fresh {
            let pad = options.width.saturating_sub(line_len + end_len);
            result.push_str(&line);
            result.push_str(&" ".repeat(pad));
            result.push_str(options.end);
            result.push('\n');
            line.clone_from(&indent);
            line_len = indent.len();
        }
        line.push_str(token);
        line.push_str(options.sep);
        line_len += token.chars().count() + sep_len;
        fresh = false;
    }

    result.push_str(line.trim_end_matches(options.sep));
    result.push_str(options.postfix);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tokens back out of a wrapped block
    fn tokens_of(block: &str, prefix: &str) -> Vec<String> {
        block
            .strip_prefix(prefix)
            .unwrap()
            .split_whitespace()
            .filter(|t| *t != "\\")
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_short_list_single_line() {
        let block = wrap_tokens(&["a.obj", "b.obj"], &WrapOptions::with_prefix("OBJS = "));
        assert_eq!(block, "OBJS = a.obj b.obj");
    }

    #[test]
    fn test_empty_list() {
        let block = wrap_tokens::<&str>(&[], &WrapOptions::with_prefix("MODS = "));
        assert_eq!(block, "MODS =");
    }

    #[test]
    fn test_wrapped_lines_aligned() {
        let tokens: Vec<String> = (0..30).map(|i| format!("dir/file_{i:02}.obj")).collect();
        let block = wrap_tokens(&tokens, &WrapOptions::with_prefix("OBJS = "));
        let lines: Vec<&str> = block.lines().collect();
        assert!(lines.len() > 1);
        for line in &lines[..lines.len() - 1] {
            assert_eq!(line.len(), 80);
            assert!(line.ends_with('\\'));
        }
        for line in &lines[1..] {
            assert!(line.starts_with("       dir/"));
        }
        assert!(!lines[lines.len() - 1].ends_with('\\'));
    }

    #[test]
    fn test_tokens_reconstructed_in_order() {
        let tokens: Vec<String> = (0..57).map(|i| format!("m{}{}", i, "x".repeat(i % 9))).collect();
        let block = wrap_tokens(&tokens, &WrapOptions::with_prefix("MODS = "));
        assert_eq!(tokens_of(&block, "MODS = "), tokens);
    }

    #[test]
    fn test_oversized_token_terminates() {
        let long = "x".repeat(120);
        let tokens = vec!["a".to_string(), long.clone(), "b".to_string()];
        let block = wrap_tokens(&tokens, &WrapOptions::with_prefix("OBJS = "));
        assert_eq!(tokens_of(&block, "OBJS = "), tokens);
        assert!(block.lines().any(|l| l.trim_start().starts_with(&long)));
    }

    #[test]
    fn test_postfix_and_separator() {
        let options = WrapOptions {
            prefix: ">>> modules: [",
            postfix: "]",
            sep: ", ",
            end: "",
            ..WrapOptions::default()
        };
        assert_eq!(wrap_tokens(&["a", "b"], &options), ">>> modules: [a, b]");
    }
}
