//! The syntax of a single rule: `match [&& guard] -> result`.

/// A node or a variable, on either side of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sexpr {
    /// A variable, `_`, `nil` or a successor name.
    Var(String),
    Node(Node),
}

/// `name:(Op <type> [int] {sym} args...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub bind: Option<String>,
    pub head: String,
    pub ty: Option<String>,
    pub int: Option<String>,
    pub sym: Option<String>,
    pub args: Vec<Sexpr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSyntax {
    pub lhs: Node,
    pub guard: Option<String>,
    pub rhs: Sexpr,
}

/// Finds `pat` outside of any parentheses or brackets.
fn find_top_level(s: &str, pat: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ if depth == 0 && s[i..].starts_with(pat) => return Some(i),
            _ => {}
        }
    }
    None
}

pub fn parse_rule(text: &str) -> Result<RuleSyntax, String> {
    let arrow = find_top_level(text, "->").ok_or("missing `->`")?;
    let (lhs, rhs) = (&text[..arrow], &text[arrow + 2..]);
    let (lhs, guard) = match find_top_level(lhs, "&&") {
        Some(i) => (&lhs[..i], Some(lhs[i + 2..].trim().to_owned())),
        None => (lhs, None),
    };
    if guard.as_deref() == Some("") {
        return Err("empty condition".to_owned());
    }

    let lhs = match parse_all(lhs)? {
        Sexpr::Node(node) => node,
        Sexpr::Var(var) => return Err(format!("a rule must match a node, not `{var}`")),
    };
    let rhs = parse_all(rhs)?;
    Ok(RuleSyntax { lhs, guard, rhs })
}

fn parse_all(s: &str) -> Result<Sexpr, String> {
    let mut parser = Parser { s, pos: 0 };
    let sexpr = parser.sexpr()?;
    parser.skip_ws();
    if parser.pos != s.len() {
        return Err(format!("unexpected `{}`", s[parser.pos..].trim()));
    }
    Ok(sexpr)
}

struct Parser<'a> {
    s: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.s[self.pos..].chars().next()
    }

    fn skip_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek().filter(|&c| pred(c)) {
            self.pos += c.len_utf8();
        }
    }

    fn skip_ws(&mut self) {
        self.skip_while(char::is_whitespace);
    }

    fn word(&mut self) -> &str {
        let start = self.pos;
        self.skip_while(|c| c.is_alphanumeric() || c == '_');
        &self.s[start..self.pos]
    }

    fn sexpr(&mut self) -> Result<Sexpr, String> {
        self.skip_ws();
        match self.peek() {
            Some('(') => Ok(Sexpr::Node(self.node(None)?)),
            Some(_) => {
                let word = self.word().to_owned();
                if word.is_empty() {
                    return Err(format!("unexpected `{}`", &self.s[self.pos..]));
                }
                if self.s[self.pos..].starts_with(":(") {
                    self.pos += 1;
                    return Ok(Sexpr::Node(self.node(Some(word))?));
                }
                Ok(Sexpr::Var(word))
            }
            None => Err("unexpected end of rule".to_owned()),
        }
    }

    fn node(&mut self, bind: Option<String>) -> Result<Node, String> {
        // Skip the `(`.
        self.pos += 1;
        self.skip_ws();
        let head = self.word().to_owned();
        if head.is_empty() {
            return Err("expected an operation".to_owned());
        }
        let mut node = Node {
            bind,
            head,
            ty: None,
            int: None,
            sym: None,
            args: Vec::new(),
        };

        loop {
            self.skip_ws();
            let (slot, open, close) = match self.peek() {
                Some(')') => {
                    self.pos += 1;
                    return Ok(node);
                }
                None => return Err(format!("missing `)` after `{}`", node.head)),
                Some('<') => (&mut node.ty, '<', '>'),
                Some('[') => (&mut node.int, '[', ']'),
                Some('{') => (&mut node.sym, '{', '}'),
                Some(_) => {
                    let arg = self.sexpr()?;
                    node.args.push(arg);
                    continue;
                }
            };
            let inner = delimited(self.s, &mut self.pos, open, close)?;
            if slot.replace(inner.trim().to_owned()).is_some() {
                return Err(format!("`{}` has two `{open}{close}` restrictions", node.head));
            }
        }
    }
}

/// Reads from `open` at `pos` to the matching `close`, returning what's in between.
fn delimited<'a>(s: &'a str, pos: &mut usize, open: char, close: char) -> Result<&'a str, String> {
    let start = *pos + 1;
    let mut depth = 0;
    for (i, c) in s[*pos..].char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                *pos += i + 1;
                return Ok(&s[start..*pos - 1]);
            }
        }
    }
    Err(format!("missing `{close}`"))
}
