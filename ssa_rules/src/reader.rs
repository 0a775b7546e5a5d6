use crate::{Loc, RuleError};
use std::sync::Arc;

/// The text of a single rule, joined from one or more lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleText {
    pub loc: Loc,
    pub text: String,
}

/// Splits a rule file into rules. `//` starts a comment. A rule continues on the next line until
/// it contains `->`, doesn't end with `->` and its parentheses are balanced.
pub fn read_rules(file: &str, src: &str) -> Result<Vec<RuleText>, RuleError> {
    let file: Arc<str> = Arc::from(file);
    let mut rules = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (i, line) in src.lines().enumerate() {
        let line = line.split("//").next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        if current.is_empty() {
            start = i + 1;
        } else {
            current.push(' ');
        }
        current.push_str(line);

        if is_complete(&current) {
            rules.push(RuleText {
                loc: Loc {
                    file: file.clone(),
                    line: start,
                },
                text: std::mem::take(&mut current),
            });
        }
    }

    if !current.is_empty() {
        let loc = Loc { file, line: start };
        let message = if current.contains("->") {
            "unbalanced parentheses"
        } else {
            "rule without `->`"
        };
        return Err(RuleError::syntax(&loc, message));
    }
    Ok(rules)
}

fn is_complete(rule: &str) -> bool {
    rule.contains("->") && !rule.ends_with("->") && balanced(rule)
}

fn balanced(s: &str) -> bool {
    let mut depth = 0i32;
    for c in s.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn joins_lines() {
        let src = "\
// constant folding
(Add (Const [c]) (Const [d])) ->
    (Const [c+d])

(Neg (Neg x))
    && true // always
    -> x
";
        let rules = read_rules("test.rules", src).unwrap();
        assert_eq!(
            vec![
                "(Add (Const [c]) (Const [d])) -> (Const [c+d])",
                "(Neg (Neg x)) && true -> x"
            ],
            rules.iter().map(|r| r.text.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(2, rules[0].loc.line);
        assert_eq!(5, rules[1].loc.line);
        assert_eq!("test.rules:5", rules[1].loc.to_string());
    }

    #[test]
    fn reports_unfinished_rules() {
        let err = read_rules("x.rules", "(Add x y)\n").unwrap_err();
        assert_eq!("x.rules:1: rule without `->`", err.to_string());

        let err = read_rules("x.rules", "\n(Add x y) -> (Sub x y\n").unwrap_err();
        assert_eq!("x.rules:2: unbalanced parentheses", err.to_string());
    }
}
