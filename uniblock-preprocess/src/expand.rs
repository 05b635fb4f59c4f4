use uniblock_common::map::FastHashMap;

const MAX_EXPANSION_DEPTH: usize = 32;

/// A `#define` recorded during preprocessing.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Macro {
    /// Parameter names for function-like macros.
    pub params: Option<Vec<String>>,
    /// The replacement text.
    pub body: String,
}

impl Macro {
    /// Whether the macro takes arguments. Function-like macros are recorded but never expanded.
    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }
}

/// The macro table in effect while preprocessing.
#[derive(Debug, Default, Clone)]
pub struct MacroTable {
    macros: FastHashMap<String, Macro>,
}

enum Piece<'a> {
    Ident(&'a str),
    Other(&'a str),
}

/// Split a line into identifiers and everything else.
///
/// Numeric literals are kept whole so suffixes and exponents are never mistaken for names.
fn pieces(line: &str) -> Vec<Piece> {
    let bytes = line.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_alphabetic() || b == b'_' {
            if start < i {
                pieces.push(Piece::Other(&line[start..i]));
            }
            let ident_start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            pieces.push(Piece::Ident(&line[ident_start..i]));
            start = i;
        } else if b.is_ascii_digit()
            || (b == b'.' && bytes.get(i + 1).map_or(false, u8::is_ascii_digit))
        {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                i += 1;
            }
        } else {
            i += 1;
        }
    }

    if start < bytes.len() {
        pieces.push(Piece::Other(&line[start..]));
    }
    pieces
}

impl MacroTable {
    pub fn define(&mut self, name: impl Into<String>, value: Macro) {
        self.macros.insert(name.into(), value);
    }

    pub fn undefine(&mut self, name: &str) {
        self.macros.remove(name);
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Macro)> {
        self.macros.iter()
    }

    /// Substitute object-like macros in a line at identifier boundaries.
    pub fn expand(&self, line: &str) -> String {
        let mut active = Vec::new();
        self.expand_inner(line, &mut active, 0)
    }

    fn expand_inner<'a>(&'a self, line: &str, active: &mut Vec<&'a str>, depth: usize) -> String {
        let mut output = String::with_capacity(line.len());
        for piece in pieces(line) {
            match piece {
                Piece::Other(text) => output.push_str(text),
                Piece::Ident(ident) => {
                    let Some((name, found)) = self.macros.get_key_value(ident) else {
                        output.push_str(ident);
                        continue;
                    };

                    if found.is_function_like() || active.contains(&name.as_str()) {
                        output.push_str(ident);
                        continue;
                    }

                    if depth >= MAX_EXPANSION_DEPTH {
                        log::warn!("macro expansion of `{ident}` exceeded the depth limit");
                        output.push_str(&found.body);
                        continue;
                    }

                    active.push(name.as_str());
                    output.push_str(&self.expand_inner(&found.body, active, depth + 1));
                    active.pop();
                }
            }
        }
        output
    }

    /// Evaluate the condition of an `#if` or `#elif`.
    ///
    /// Unknown identifiers evaluate to zero. Returns `None` if the expression does not parse.
    pub fn evaluate(&self, condition: &str) -> Option<bool> {
        let resolved = self.resolve_defined(condition);
        let expanded = self.expand(&resolved);
        let tokens = tokenize(&expanded)?;
        let mut parser = ExprParser { tokens, pos: 0 };
        let value = parser.expression()?;
        if parser.pos != parser.tokens.len() {
            return None;
        }
        Some(value != 0)
    }

    /// Replace `defined(NAME)` and `defined NAME` with `1` or `0` before expansion.
    fn resolve_defined(&self, condition: &str) -> String {
        let mut output = String::with_capacity(condition.len());
        let parts = pieces(condition);
        let mut iter = parts.iter().peekable();

        while let Some(piece) = iter.next() {
            match piece {
                Piece::Ident("defined") => {
                    let mut parenthesized = false;
                    if let Some(Piece::Other(text)) = iter.peek() {
                        if text.trim() == "(" {
                            parenthesized = true;
                            iter.next();
                        } else if !text.trim().is_empty() {
                            output.push_str("defined");
                            continue;
                        } else {
                            iter.next();
                        }
                    }
                    let Some(Piece::Ident(name)) = iter.next() else {
                        output.push_str("0");
                        continue;
                    };
                    output.push_str(if self.is_defined(name) { " 1 " } else { " 0 " });
                    if parenthesized {
                        if let Some(Piece::Other(text)) = iter.next() {
                            let text = text.trim_start();
                            output.push_str(text.strip_prefix(')').unwrap_or(text));
                        }
                    }
                }
                Piece::Ident(ident) => output.push_str(ident),
                Piece::Other(text) => output.push_str(text),
            }
        }
        output
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Token {
    Number(i64),
    Ident,
    Op(&'static str),
}

const OPERATORS: [&str; 19] = [
    "||", "&&", "==", "!=", "<=", ">=", "<<", ">>", "<", ">", "+", "-", "*", "/", "%", "!", "(",
    ")", "~",
];

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = input.trim_start();

    while !rest.is_empty() {
        let first = rest.as_bytes()[0];
        if first.is_ascii_digit() {
            let end = rest
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(rest.len());
            let literal = rest[..end].trim_end_matches(|c| c == 'u' || c == 'U');
            let value = if let Some(hex) = literal
                .strip_prefix("0x")
                .or_else(|| literal.strip_prefix("0X"))
            {
                i64::from_str_radix(hex, 16).ok()?
            } else {
                literal.parse().ok()?
            };
            tokens.push(Token::Number(value));
            rest = &rest[end..];
        } else if first.is_ascii_alphabetic() || first == b'_' {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            tokens.push(Token::Ident);
            rest = &rest[end..];
        } else {
            let op = OPERATORS.iter().find(|op| rest.starts_with(**op))?;
            tokens.push(Token::Op(*op));
            rest = &rest[op.len()..];
        }
        rest = rest.trim_start();
    }

    Some(tokens)
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

const BINARY_LEVELS: [&[&str]; 7] = [
    &["||"],
    &["&&"],
    &["==", "!="],
    &["<", ">", "<=", ">="],
    &["<<", ">>"],
    &["+", "-"],
    &["*", "/", "%"],
];

impl ExprParser {
    fn peek_op(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(Token::Op(op)) => Some(op),
            _ => None,
        }
    }

    fn expression(&mut self) -> Option<i64> {
        self.binary(0)
    }

    fn binary(&mut self, level: usize) -> Option<i64> {
        if level == BINARY_LEVELS.len() {
            return self.unary();
        }

        let mut lhs = self.binary(level + 1)?;
        while let Some(op) = self.peek_op().filter(|op| BINARY_LEVELS[level].contains(op)) {
            self.pos += 1;
            let rhs = self.binary(level + 1)?;
            lhs = match op {
                "||" => ((lhs != 0) || (rhs != 0)) as i64,
                "&&" => ((lhs != 0) && (rhs != 0)) as i64,
                "==" => (lhs == rhs) as i64,
                "!=" => (lhs != rhs) as i64,
                "<" => (lhs < rhs) as i64,
                ">" => (lhs > rhs) as i64,
                "<=" => (lhs <= rhs) as i64,
                ">=" => (lhs >= rhs) as i64,
                "<<" => lhs.checked_shl(u32::try_from(rhs).ok()?)?,
                ">>" => lhs.checked_shr(u32::try_from(rhs).ok()?)?,
                "+" => lhs.wrapping_add(rhs),
                "-" => lhs.wrapping_sub(rhs),
                "*" => lhs.wrapping_mul(rhs),
                "/" => lhs.checked_div(rhs)?,
                "%" => lhs.checked_rem(rhs)?,
                _ => return None,
            };
        }
        Some(lhs)
    }

    fn unary(&mut self) -> Option<i64> {
        match self.tokens.get(self.pos).copied()? {
            Token::Op("!") => {
                self.pos += 1;
                Some((self.unary()? == 0) as i64)
            }
            Token::Op("-") => {
                self.pos += 1;
                Some(self.unary()?.wrapping_neg())
            }
            Token::Op("+") => {
                self.pos += 1;
                self.unary()
            }
            Token::Op("~") => {
                self.pos += 1;
                Some(!self.unary()?)
            }
            Token::Op("(") => {
                self.pos += 1;
                let value = self.expression()?;
                if self.peek_op() != Some(")") {
                    return None;
                }
                self.pos += 1;
                Some(value)
            }
            Token::Number(value) => {
                self.pos += 1;
                Some(value)
            }
            Token::Ident => {
                self.pos += 1;
                Some(0)
            }
            Token::Op(_) => None,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::expand::{Macro, MacroTable};

    fn table(defines: &[(&str, &str)]) -> MacroTable {
        let mut table = MacroTable::default();
        for (name, body) in defines {
            table.define(
                *name,
                Macro {
                    params: None,
                    body: body.to_string(),
                },
            );
        }
        table
    }

    #[test]
    fn expands_at_identifier_boundaries() {
        let table = table(&[("N", "4"), ("COUNT", "N")]);
        assert_eq!(table.expand("float a[COUNT]; float NN;"), "float a[4]; float NN;");
        assert_eq!(table.expand("1e5N"), "1e5N");
    }

    #[test]
    fn self_reference_terminates() {
        let table = table(&[("A", "B"), ("B", "A + 1")]);
        assert_eq!(table.expand("A"), "A + 1");
    }

    #[test]
    fn function_like_macros_are_not_expanded() {
        let mut table = MacroTable::default();
        table.define(
            "F",
            Macro {
                params: Some(vec!["x".to_string()]),
                body: "x".to_string(),
            },
        );
        assert_eq!(table.expand("F(2)"), "F(2)");
    }

    #[test]
    fn evaluates_conditions() {
        let table = table(&[("LIGHTS", "4"), ("HAS_FOG", "")]);
        assert_eq!(table.evaluate("LIGHTS > 2 && defined(HAS_FOG)"), Some(true));
        assert_eq!(table.evaluate("defined MISSING || LIGHTS == 3"), Some(false));
        assert_eq!(table.evaluate("!defined(MISSING)"), Some(true));
        assert_eq!(table.evaluate("(1 + 2) * 3 == 9"), Some(true));
        assert_eq!(table.evaluate("UNKNOWN"), Some(false));
        assert_eq!(table.evaluate("0x10 == 16u"), Some(true));
        assert_eq!(table.evaluate("1 +"), None);
    }
}
