//! Token values and the matchers that recognize them.

use regex_lite::Regex;

/// Zero-based line/column position of a token in the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// Line number, counted from 0.
    pub line: usize,
    /// Column within the line, counted in characters from 0.
    pub column: usize,
}

impl Position {
    /// Position reached after consuming `text` starting from this position.
    pub fn advance(self, text: &str) -> Position {
        match text.rfind('\n') {
            Some(idx) => Position {
                line: self.line + text.matches('\n').count(),
                column: text[idx + 1..].chars().count(),
            },
            None => Position {
                line: self.line,
                column: self.column + text.chars().count(),
            },
        }
    }
}

/// A token produced by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<K> {
    /// Kind of the token type that matched.
    pub kind: K,
    /// Matched text.
    pub literal: String,
    /// Capture groups of a regular-expression match (empty for other matchers).
    pub submatches: Vec<String>,
    /// Where the token starts.
    pub position: Position,
}

/// How a token type recognizes its text.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// A fixed literal, optionally compared case-insensitively.
    Simple { literal: String, ignore_case: bool },
    /// The longest of several fixed literals.
    Multi {
        literals: Vec<String>,
        ignore_case: bool,
    },
    /// A regular expression anchored at the current position.
    Regexp { regex: Regex },
    /// Text enclosed by balanced delimiters; every run of text between two delimiter
    /// characters must fully match `segment`.
    BalancedDelimiters {
        open: char,
        close: char,
        segment: Regex,
    },
}

/// A token matcher together with its kind, priority and predecessor constraint.
///
/// Lower priorities are tried first. Once any matcher of a priority matches at a
/// position, matchers with a greater priority value are not consulted there.
#[derive(Debug, Clone)]
pub struct TokenType<K> {
    /// Kind assigned to tokens produced by this type.
    pub kind: K,
    /// Priority class (lower is tried first).
    pub priority: u32,
    /// When set, this type only participates right after a token of that kind.
    pub previous: Option<K>,
    /// The matching strategy.
    pub matcher: Matcher,
}

/// A successful match: the literal and any capture groups.
pub type Match = (String, Vec<String>);

impl<K: Copy> TokenType<K> {
    /// Match a single literal.
    pub fn simple(kind: K, literal: &str, ignore_case: bool, priority: u32) -> Self {
        TokenType {
            kind,
            priority,
            previous: None,
            matcher: Matcher::Simple {
                literal: literal.to_string(),
                ignore_case,
            },
        }
    }

    /// Match the longest of several literals.
    pub fn multi(kind: K, literals: &[&str], ignore_case: bool, priority: u32) -> Self {
        TokenType {
            kind,
            priority,
            previous: None,
            matcher: Matcher::Multi {
                literals: literals.iter().map(|s| s.to_string()).collect(),
                ignore_case,
            },
        }
    }

    /// Match a regular expression. Patterns not starting with `^` are anchored.
    pub fn regexp(kind: K, pattern: &str, priority: u32) -> Result<Self, regex_lite::Error> {
        Ok(TokenType {
            kind,
            priority,
            previous: None,
            matcher: Matcher::Regexp {
                regex: Regex::new(&anchor(pattern))?,
            },
        })
    }

    /// Match text enclosed in balanced `open`/`close` delimiters.
    pub fn balanced(
        kind: K,
        open: char,
        close: char,
        segment: &str,
        priority: u32,
    ) -> Result<Self, regex_lite::Error> {
        Ok(TokenType {
            kind,
            priority,
            previous: None,
            matcher: Matcher::BalancedDelimiters {
                open,
                close,
                segment: Regex::new(&format!("^(?:{})$", segment))?,
            },
        })
    }

    /// Restrict this type to positions right after a token of kind `previous`.
    pub fn after(mut self, previous: K) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Try to match at the start of `input`.
    pub fn find(&self, input: &str) -> Option<Match> {
        match &self.matcher {
            Matcher::Simple {
                literal,
                ignore_case,
            } => starts_with(input, literal, *ignore_case).then(|| (literal.clone(), Vec::new())),
            Matcher::Multi {
                literals,
                ignore_case,
            } => {
                let mut found: Option<&String> = None;
                for l in literals {
                    if starts_with(input, l, *ignore_case)
                        && found.is_none_or(|f| l.len() > f.len())
                    {
                        found = Some(l);
                    }
                }
                found.map(|l| (l.clone(), Vec::new()))
            }
            Matcher::Regexp { regex } => {
                let caps = regex.captures(input)?;
                let whole = caps.get(0)?;
                let subs = (1..caps.len())
                    .map(|i| caps.get(i).map_or(String::new(), |m| m.as_str().to_string()))
                    .collect();
                Some((whole.as_str().to_string(), subs))
            }
            Matcher::BalancedDelimiters {
                open,
                close,
                segment,
            } => find_balanced(input, *open, *close, segment).map(|s| (s.to_string(), Vec::new())),
        }
    }

    /// Whether `input` could still match once more text follows it. Only delimited
    /// matchers can tell; an unclosed `(` is reported here instead of as no match.
    pub fn is_incomplete(&self, input: &str) -> bool {
        match &self.matcher {
            Matcher::BalancedDelimiters {
                open,
                close,
                segment,
            } => matches!(scan_balanced(input, *open, *close, segment), Balanced::Open),
            _ => false,
        }
    }
}

fn anchor(pattern: &str) -> String {
    if pattern.starts_with('^') {
        pattern.to_string()
    } else {
        format!("^(?:{})", pattern)
    }
}

fn starts_with(input: &str, literal: &str, ignore_case: bool) -> bool {
    match input.get(..literal.len()) {
        Some(prefix) if ignore_case => prefix.eq_ignore_ascii_case(literal),
        Some(prefix) => prefix == literal,
        None => false,
    }
}

/// Outcome of scanning for a balanced delimiter pair.
enum Balanced<'a> {
    Closed(&'a str),
    /// Input ended before the closing delimiter.
    Open,
    NoMatch,
}

fn scan_balanced<'a>(input: &'a str, open: char, close: char, segment: &Regex) -> Balanced<'a> {
    if !input.starts_with(open) {
        return Balanced::NoMatch;
    }
    let mut level = 0usize;
    let mut segment_start = 0usize;
    for (i, c) in input.char_indices() {
        if c != open && c != close {
            continue;
        }
        if !segment.is_match(&input[segment_start..i]) {
            return Balanced::NoMatch;
        }
        segment_start = i + c.len_utf8();
        if c == open {
            level += 1;
        } else {
            level -= 1;
            if level == 0 {
                return Balanced::Closed(&input[..segment_start]);
            }
        }
    }
    if segment.is_match(&input[segment_start..]) {
        Balanced::Open
    } else {
        Balanced::NoMatch
    }
}

fn find_balanced<'a>(input: &'a str, open: char, close: char, segment: &Regex) -> Option<&'a str> {
    match scan_balanced(input, open, close, segment) {
        Balanced::Closed(s) => Some(s),
        Balanced::Open | Balanced::NoMatch => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_advance() {
        let p = Position::default().advance("ab");
        assert_eq!(p, Position { line: 0, column: 2 });
        let p = p.advance("c\n\nxyz");
        assert_eq!(p, Position { line: 2, column: 3 });
    }

    #[test]
    fn test_simple_ignore_case_returns_literal() {
        let t = TokenType::simple(1, "CREATE", true, 1);
        assert_eq!(t.find("create table").unwrap().0, "CREATE");
        assert!(t.find("creat").is_none());
        let strict = TokenType::simple(1, "CREATE", false, 1);
        assert!(strict.find("create").is_none());
    }

    #[test]
    fn test_multi_prefers_longest() {
        let t = TokenType::multi(1, &["<", "<=", "<=>"], false, 1);
        assert_eq!(t.find("<=> 1").unwrap().0, "<=>");
        assert_eq!(t.find("<= 1").unwrap().0, "<=");
        assert_eq!(t.find("< 1").unwrap().0, "<");
    }

    #[test]
    fn test_regexp_is_anchored_and_captures() {
        let t = TokenType::regexp(1, "MATCH (FULL|PARTIAL)", 1).unwrap();
        let (lit, subs) = t.find("MATCH FULL x").unwrap();
        assert_eq!(lit, "MATCH FULL");
        assert_eq!(subs, vec!["FULL".to_string()]);
        assert!(t.find("x MATCH FULL").is_none());
    }

    #[test]
    fn test_balanced_delimiters() {
        let t = TokenType::balanced(1, '(', ')', "[^;]*", 1).unwrap();
        assert_eq!(t.find("((a > 0) and (b < 1)) x").unwrap().0, "((a > 0) and (b < 1))");
        assert!(t.find("(a > 0").is_none());
        assert!(t.find("(a; b)").is_none());
        assert!(t.find("a > 0").is_none());
    }

    #[test]
    fn test_unclosed_balanced_is_incomplete() {
        let t = TokenType::balanced(1, '(', ')', "[^;]*", 1).unwrap();
        assert!(t.find("(a + (b").is_none());
        assert!(t.is_incomplete("(a + (b"));
        assert!(!t.is_incomplete("(a); (b"));
        assert!(!t.is_incomplete("(a) + b"));
        assert!(!TokenType::regexp(2, "'[^']*'", 1).unwrap().is_incomplete("'abc"));
    }
}
