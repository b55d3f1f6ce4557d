//! Token kinds and matchers of the MySQL DDL dialect.

use std::sync::LazyLock;

use crate::lexer::{Token, TokenType};

/// Kinds of tokens emitted for DDL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    LParen,
    RParen,
    Comma,
    Semicolon,
    Eq,
    Dot,
    Minus,
    Plus,
    /// Any other operator sign; never valid outside an expression.
    Operator,
    /// `CHECK`, `AS` and `DEFAULT` get their own kinds so that a following parenthesized
    /// expression can be captured whole.
    Check,
    As,
    Default,
    NotEnforced,
    /// A balanced parenthesized expression.
    Expr,
    Str,
    BitStr,
    HexStr,
    HexNum,
    BitNum,
    Int,
    Float,
    Word,
    QuotedIdent,
    Skip,
}

const STRING_BODY: &str = r"(?:[^'\\]|\\.|'')*";

pub static TOKEN_TYPES: LazyLock<Vec<TokenType<Kind>>> = LazyLock::new(|| {
    let mut types = vec![
        TokenType::simple(Kind::LParen, "(", false, 1),
        TokenType::simple(Kind::RParen, ")", false, 1),
        TokenType::simple(Kind::Comma, ",", false, 1),
        TokenType::simple(Kind::Semicolon, ";", false, 1),
        TokenType::simple(Kind::Eq, "=", false, 1),
        TokenType::simple(Kind::Dot, ".", false, 1),
        TokenType::simple(Kind::Minus, "-", false, 1),
        TokenType::simple(Kind::Plus, "+", false, 1),
        TokenType::multi(
            Kind::Operator,
            &[
                "{", "}", ">", ">=", "<", "<=", "!=", "<>", "<=>", "~", "&", "&&", "|", "||",
                "<<", ">>", "*", "/", "%", "^", "!", "?",
            ],
            false,
            1,
        ),
    ];
    for previous in [Kind::Check, Kind::As, Kind::Default, Kind::LParen, Kind::Comma] {
        types.push(
            TokenType::balanced(Kind::Expr, '(', ')', "[^;]*", 1)
                .unwrap()
                .after(previous),
        );
    }
    types.extend([
        TokenType::simple(Kind::Check, "CHECK", true, 2),
        TokenType::simple(Kind::As, "AS", true, 2),
        TokenType::simple(Kind::Default, "DEFAULT", true, 2),
        TokenType::regexp(Kind::NotEnforced, r"(?i:NOT)\s+(?i:ENFORCED)", 2).unwrap(),
        TokenType::regexp(Kind::Str, &format!("'{}'", STRING_BODY), 2).unwrap(),
        TokenType::regexp(Kind::Str, r#""(?:[^"\\]|\\.|"")*""#, 2).unwrap(),
        TokenType::regexp(Kind::Str, &format!("_[a-zA-Z0-9]+'{}'", STRING_BODY), 2).unwrap(),
        TokenType::regexp(Kind::BitStr, "[bB]'[01]*'", 2).unwrap(),
        TokenType::regexp(Kind::HexStr, "[xX]'[0-9a-fA-F]*'", 2).unwrap(),
        TokenType::regexp(Kind::HexNum, "0x[0-9a-fA-F]+", 2).unwrap(),
        TokenType::regexp(Kind::BitNum, "0b[01]+", 2).unwrap(),
        TokenType::regexp(Kind::Int, "[0-9]+", 2).unwrap(),
        TokenType::regexp(
            Kind::Float,
            r"[0-9]+\.[0-9]*(?:[eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+",
            2,
        )
        .unwrap(),
        TokenType::regexp(Kind::Word, r"[a-zA-Z_][a-zA-Z0-9_$]*", 2).unwrap(),
        TokenType::regexp(Kind::QuotedIdent, "`(?:[^`]|``)+`", 2).unwrap(),
    ]);
    types
});

pub static SKIPPED: LazyLock<Vec<TokenType<Kind>>> = LazyLock::new(|| {
    [
        r"\s",
        r"#.*\n",
        r"--.*\n",
        r"(?s)/\*[^!].*?\*/",
        r"/\*!\d{5}",
        r"\*/",
    ]
    .iter()
    .map(|re| TokenType::regexp(Kind::Skip, re, 0).unwrap())
    .collect()
});

/// Whether `token` is the (case-insensitive) keyword `keyword`.
pub fn is_keyword(token: &Token<Kind>, keyword: &str) -> bool {
    matches!(
        token.kind,
        Kind::Word | Kind::Check | Kind::As | Kind::Default
    ) && token.literal.eq_ignore_ascii_case(keyword)
}

/// Strip the backticks of a quoted identifier.
pub fn unquote_identifier(literal: &str) -> String {
    literal
        .strip_prefix('`')
        .and_then(|s| s.strip_suffix('`'))
        .unwrap_or(literal)
        .replace("``", "`")
}

/// Strip the quotes of a string literal.
pub fn unquote_string(literal: &str) -> String {
    let inner = literal
        .strip_prefix(['\'', '"'])
        .and_then(|s| s.strip_suffix(['\'', '"']))
        .unwrap_or(literal);
    inner.replace("''", "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Tokenizer;

    fn kinds(input: &str) -> Vec<(Kind, String)> {
        let mut t = Tokenizer::new(input.as_bytes(), TOKEN_TYPES.clone(), SKIPPED.clone());
        let mut out = Vec::new();
        while let Some(tok) = t.scan().unwrap() {
            out.push((tok.kind, tok.literal));
        }
        out
    }

    #[test]
    fn test_keywords_lex_as_words() {
        let toks = kinds("create TABLE `t1`");
        assert_eq!(toks[0], (Kind::Word, "create".to_string()));
        assert_eq!(toks[2], (Kind::QuotedIdent, "`t1`".to_string()));
    }

    #[test]
    fn test_default_expression_is_one_token() {
        let toks = kinds("DEFAULT (rand() * rand()) NOT NULL");
        assert_eq!(toks[0].0, Kind::Default);
        assert_eq!(toks[1], (Kind::Expr, "(rand() * rand())".to_string()));
        assert_eq!(toks[2].1, "NOT");
    }

    #[test]
    fn test_parenthesis_after_word_is_plain() {
        let toks = kinds("VARCHAR(10)");
        assert_eq!(toks[1].0, Kind::LParen);
        assert_eq!(toks[2], (Kind::Int, "10".to_string()));
    }

    #[test]
    fn test_literals() {
        let toks = kinds("'it''s' 0x1F b'01' 1.5 42 _utf8mb4'x' ascii_col");
        let k: Vec<Kind> = toks.iter().map(|t| t.0).collect();
        assert_eq!(
            k,
            vec![
                Kind::Str,
                Kind::HexNum,
                Kind::BitStr,
                Kind::Float,
                Kind::Int,
                Kind::Str,
                Kind::Word
            ]
        );
    }

    #[test]
    fn test_as_prefix_does_not_split_words() {
        let toks = kinds("ASC AS");
        assert_eq!(toks[0], (Kind::Word, "ASC".to_string()));
        assert_eq!(toks[1].0, Kind::As);
    }

    #[test]
    fn test_not_enforced_is_one_token() {
        let toks = kinds("CHECK (a > 0) NOT  ENFORCED");
        assert_eq!(toks[1], (Kind::Expr, "(a > 0)".to_string()));
        assert_eq!(toks[2].0, Kind::NotEnforced);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote_identifier("`a``b`"), "a`b");
        assert_eq!(unquote_string("'utf8mb4'"), "utf8mb4");
    }
}
