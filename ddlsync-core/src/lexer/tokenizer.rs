//! Streaming tokenizer with priority classes and longest-match selection.

use std::fmt::Debug;
use std::io::{ErrorKind, Read};

use super::token::{Position, Token, TokenType};
use crate::error::{caret_snippet, DdlsyncError, Result};

/// Bytes requested from the reader per refill.
const CHUNK_SIZE: usize = 2048;
/// The buffer is refilled whenever fewer bytes than this remain.
const LOW_WATER_MARK: usize = 1024;

/// Turns a character stream into tokens.
///
/// Skip matchers (whitespace, comments) are consumed before every match attempt and
/// never surface as tokens.
pub struct Tokenizer<R, K> {
    reader: R,
    buf: String,
    /// Bytes of an incomplete UTF-8 sequence at the end of the last chunk.
    pending: Vec<u8>,
    eof: bool,
    /// Text of the current line consumed so far.
    loaded_line: String,
    next_pos: Position,
    token_types: Vec<TokenType<K>>,
    skipped: Vec<TokenType<K>>,
    previous: Option<K>,
    peeked: Option<Token<K>>,
}

impl<R: Read, K: Copy + Eq + Debug> Tokenizer<R, K> {
    /// Create a tokenizer. Token types are tried in ascending priority order,
    /// keeping registration order within one priority.
    pub fn new(reader: R, mut token_types: Vec<TokenType<K>>, skipped: Vec<TokenType<K>>) -> Self {
        token_types.sort_by_key(|t| t.priority);
        Tokenizer {
            reader,
            buf: String::new(),
            pending: Vec::new(),
            eof: false,
            loaded_line: String::new(),
            next_pos: Position::default(),
            token_types,
            skipped,
            previous: None,
            peeked: None,
        }
    }

    /// Return the next token without consuming it. `Ok(None)` means clean end of input.
    pub fn peek(&mut self) -> Result<Option<Token<K>>> {
        if self.peeked.is_none() {
            self.peeked = self.find_token()?;
        }
        Ok(self.peeked.clone())
    }

    /// Consume and return the next token. `Ok(None)` means clean end of input.
    pub fn scan(&mut self) -> Result<Option<Token<K>>> {
        let token = match self.peeked.take() {
            Some(t) => Some(t),
            None => self.find_token()?,
        };
        if let Some(t) = &token {
            self.consume(&t.literal);
            self.previous = Some(t.kind);
            log::debug!("token {:?} as {:?}", t.literal, t.kind);
        }
        Ok(token)
    }

    /// The source line containing the current position, for diagnostics.
    pub fn last_line(&mut self) -> String {
        if let Err(e) = self.fill() {
            log::debug!("read error while rendering diagnostics: {}", e);
        }
        let rest = self.buf.split('\n').next().unwrap_or("");
        format!("{}{}", self.loaded_line, rest)
    }

    /// Position of the next unconsumed character.
    pub fn position(&self) -> Position {
        self.next_pos
    }

    fn find_token(&mut self) -> Result<Option<Token<K>>> {
        loop {
            self.skip()?;
            self.fill()?;
            if self.buf.is_empty() {
                return Ok(None);
            }

            let (best, incomplete) = self.longest_match();
            // A match cut short by the end of the buffer may grow with more input.
            let truncated = incomplete
                || match &best {
                    Some((_, literal, _)) => literal.len() == self.buf.len(),
                    None => true,
                };
            if truncated && !self.eof {
                self.read_chunk()?;
                continue;
            }

            return match best {
                Some((kind, literal, submatches)) => Ok(Some(Token {
                    kind,
                    literal,
                    submatches,
                    position: self.next_pos,
                })),
                None => Err(self.unknown_token()),
            };
        }
    }

    /// Longest literal of the lowest priority tier with any match, and whether a
    /// matcher of that tier or a lower one ran out of buffered input.
    fn longest_match(&self) -> (Option<(K, String, Vec<String>)>, bool) {
        let mut tier: Option<u32> = None;
        let mut best: Option<(K, String, Vec<String>)> = None;
        let mut incomplete = false;
        for tt in &self.token_types {
            if tier.is_some_and(|p| tt.priority > p) {
                break;
            }
            if tt.previous.is_some() && tt.previous != self.previous {
                continue;
            }
            if tt.is_incomplete(&self.buf) {
                incomplete = true;
            }
            let Some((literal, submatches)) = tt.find(&self.buf) else {
                continue;
            };
            if literal.is_empty() {
                continue;
            }
            tier = Some(tt.priority);
            if best.as_ref().is_none_or(|(_, l, _)| literal.len() > l.len()) {
                best = Some((tt.kind, literal, submatches));
            }
        }
        (best, incomplete)
    }

    fn skip(&mut self) -> Result<()> {
        loop {
            self.fill()?;
            let mut skipped = false;
            for i in 0..self.skipped.len() {
                if let Some((literal, _)) = self.skipped[i].find(&self.buf) {
                    if literal.is_empty() {
                        continue;
                    }
                    log::trace!("skip {:?}", literal);
                    self.consume(&literal);
                    skipped = true;
                }
            }
            if !skipped {
                return Ok(());
            }
        }
    }

    fn fill(&mut self) -> Result<()> {
        while self.buf.len() < LOW_WATER_MARK && !self.eof {
            self.read_chunk()?;
        }
        Ok(())
    }

    /// Append one chunk of input to the buffer, or mark end of input.
    fn read_chunk(&mut self) -> Result<()> {
        let mut chunk = [0u8; CHUNK_SIZE];
        let n = loop {
            match self.reader.read(&mut chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if n == 0 {
            self.eof = true;
            if !self.pending.is_empty() {
                let rest = std::mem::take(&mut self.pending);
                self.buf.push_str(&String::from_utf8_lossy(&rest));
            }
            return Ok(());
        }
        let mut read = &chunk[..n];
        while let [head @ .., 0] = read {
            read = head;
        }
        self.pending.extend_from_slice(read);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(s) => s.len(),
            Err(e) => e.valid_up_to(),
        };
        let decoded: Vec<u8> = self.pending.drain(..valid).collect();
        self.buf.push_str(&String::from_utf8_lossy(&decoded));
        Ok(())
    }

    fn consume(&mut self, literal: &str) {
        self.buf.drain(..literal.len());
        self.next_pos = self.next_pos.advance(literal);
        match literal.rfind('\n') {
            Some(idx) => self.loaded_line = literal[idx + 1..].to_string(),
            None => self.loaded_line.push_str(literal),
        }
    }

    fn unknown_token(&mut self) -> DdlsyncError {
        let literal = self.buf.clone();
        let width = literal
            .split(char::is_whitespace)
            .next()
            .map_or(1, |w| w.chars().count());
        let position = self.next_pos;
        DdlsyncError::UnknownToken {
            snippet: caret_snippet(&self.last_line(), position.column, width),
            literal,
            line: position.line,
            column: position.column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skipped() -> Vec<TokenType<i32>> {
        vec![
            TokenType::regexp(-1, r"\s", 0).unwrap(),
            TokenType::regexp(-1, r"#.*\n", 0).unwrap(),
            TokenType::regexp(-1, r"(?s)/\*[^!].*?\*/", 0).unwrap(),
            TokenType::regexp(-1, r"/\*!\d{5}", 0).unwrap(),
            TokenType::regexp(-1, r"\*/", 0).unwrap(),
        ]
    }

    fn tokenize(input: &str, types: Vec<TokenType<i32>>) -> Vec<Token<i32>> {
        let mut t = Tokenizer::new(input.as_bytes(), types, skipped());
        let mut out = Vec::new();
        while let Some(tok) = t.scan().unwrap() {
            out.push(tok);
        }
        out
    }

    #[test]
    fn test_simple_token_types() {
        let tokens = tokenize(
            "CREATE table",
            vec![
                TokenType::simple(1, "CREATE", true, 1),
                TokenType::simple(2, "TABLE", true, 1),
            ],
        );
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, 1);
        assert_eq!(tokens[1].kind, 2);
        assert_eq!(tokens[1].literal, "TABLE");
    }

    #[test]
    fn test_priority_tier_wins_over_longer_lower_priority() {
        let tokens = tokenize(
            "REFERENCES tbl MATCH FULL",
            vec![
                TokenType::simple(1, "REFERENCES", true, 1),
                TokenType::regexp(2, "[a-zA-Z0-9]+", 2).unwrap(),
                TokenType::regexp(3, "MATCH (FULL|PARTIAL)", 1).unwrap(),
            ],
        );
        let kinds: Vec<i32> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![1, 2, 3]);
        assert_eq!(tokens[1].literal, "tbl");
        assert_eq!(tokens[2].submatches, vec!["FULL".to_string()]);
    }

    #[test]
    fn test_longest_match_within_tier() {
        let tokens = tokenize(
            "INTEGER INT",
            vec![
                TokenType::simple(1, "INT", true, 2),
                TokenType::regexp(2, "[A-Z]+", 2).unwrap(),
            ],
        );
        assert_eq!(tokens[0].kind, 2);
        assert_eq!(tokens[0].literal, "INTEGER");
        // tie goes to the first registered type
        assert_eq!(tokens[1].kind, 1);
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = tokenize(
            "CREATE /* comment */ table `t1` /*!40100 (`id`) */ # tail\n",
            vec![
                TokenType::simple(1, "CREATE", true, 1),
                TokenType::simple(2, "TABLE", true, 1),
                TokenType::simple(3, "(", true, 1),
                TokenType::simple(4, ")", true, 1),
                TokenType::regexp(5, "`[a-zA-Z0-9]+`", 2).unwrap(),
            ],
        );
        let literals: Vec<&str> = tokens.iter().map(|t| t.literal.as_str()).collect();
        assert_eq!(literals, vec!["CREATE", "TABLE", "`t1`", "(", "`id`", ")"]);
    }

    #[test]
    fn test_predecessor_constraint() {
        let types = vec![
            TokenType::simple(1, "CHECK", true, 1),
            TokenType::simple(2, "(", false, 1),
            TokenType::simple(3, ")", false, 1),
            TokenType::balanced(4, '(', ')', "[^;]*", 1).unwrap().after(1),
            TokenType::regexp(5, "[a-z]+", 2).unwrap(),
        ];
        let tokens = tokenize("CHECK (a) (b)", types);
        let kinds: Vec<i32> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![1, 4, 2, 5, 3]);
        assert_eq!(tokens[1].literal, "(a)");
    }

    #[test]
    fn test_positions_track_lines() {
        let tokens = tokenize(
            "a\n  bb\nccc",
            vec![TokenType::regexp(1, "[a-z]+", 1).unwrap()],
        );
        assert_eq!(tokens[1].position, Position { line: 1, column: 2 });
        assert_eq!(tokens[2].position, Position { line: 2, column: 0 });
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut t = Tokenizer::new(
            "a b".as_bytes(),
            vec![TokenType::regexp(1, "[a-z]+", 1).unwrap()],
            skipped(),
        );
        assert_eq!(t.peek().unwrap().unwrap().literal, "a");
        assert_eq!(t.peek().unwrap().unwrap().literal, "a");
        assert_eq!(t.scan().unwrap().unwrap().literal, "a");
        assert_eq!(t.scan().unwrap().unwrap().literal, "b");
        assert!(t.scan().unwrap().is_none());
        assert!(t.peek().unwrap().is_none());
    }

    #[test]
    fn test_unknown_token_reports_position_and_line() {
        let mut t = Tokenizer::new(
            "ab\ncd ?? ef".as_bytes(),
            vec![TokenType::regexp(1, "[a-z]+", 1).unwrap()],
            skipped(),
        );
        t.scan().unwrap();
        t.scan().unwrap();
        match t.scan() {
            Err(DdlsyncError::UnknownToken {
                literal,
                line,
                column,
                snippet,
            }) => {
                assert_eq!(literal, "?? ef");
                assert_eq!((line, column), (1, 3));
                assert_eq!(snippet, "cd ?? ef\n   ^^");
            }
            other => panic!("expected unknown token, got {:?}", other),
        }
    }

    #[test]
    fn test_large_input_crosses_chunks() {
        let words: Vec<String> = (0..2000).map(|i| format!("w{}", i)).collect();
        let input = words.join(" ");
        let tokens = tokenize(&input, vec![TokenType::regexp(1, "[a-z0-9]+", 1).unwrap()]);
        assert_eq!(tokens.len(), 2000);
        assert_eq!(tokens[1999].literal, "w1999");
    }

    #[test]
    fn test_multibyte_text_survives_chunk_boundaries() {
        // the first read ends in the middle of 'é'
        let input = format!("{} 'é漢字'", "x".repeat(2045));
        let tokens = tokenize(
            &input,
            vec![
                TokenType::regexp(1, "x+", 1).unwrap(),
                TokenType::regexp(2, "'[^']*'", 1).unwrap(),
            ],
        );
        assert_eq!(tokens[1].literal, "'é漢字'");
    }

    #[test]
    fn test_literal_longer_than_a_chunk() {
        let comment = "x".repeat(3000);
        let input = format!("-- {}\nCOMMENT='{}' ;", "y".repeat(500), comment);
        let types = vec![
            TokenType::simple(1, "COMMENT", true, 1),
            TokenType::simple(2, "=", false, 1),
            TokenType::simple(3, ";", false, 1),
            TokenType::regexp(4, "'[^']*'", 1).unwrap(),
        ];
        let mut skip = skipped();
        skip.push(TokenType::regexp(-1, r"--.*\n", 0).unwrap());

        let mut t = Tokenizer::new(input.as_bytes(), types, skip);
        let mut tokens = Vec::new();
        while let Some(tok) = t.scan().unwrap() {
            tokens.push(tok);
        }
        let kinds: Vec<i32> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![1, 2, 4, 3]);
        assert_eq!(tokens[2].literal, format!("'{}'", comment));
        assert_eq!(tokens[2].position, Position { line: 1, column: 8 });
    }

    #[test]
    fn test_word_split_by_chunk_boundary() {
        // the second word starts above the low-water mark and ends past the first read
        let input = format!("{} {}", "a".repeat(1000), "b".repeat(1500));
        let tokens = tokenize(&input, vec![TokenType::regexp(1, "[a-z]+", 1).unwrap()]);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].literal, "b".repeat(1500));
    }

    #[test]
    fn test_parenthesized_expression_split_by_chunk_boundary() {
        let expr = format!("({})", "a".repeat(1500));
        let input = format!("{} CHECK {}", "b".repeat(1000), expr);
        let types = vec![
            TokenType::simple(1, "CHECK", true, 1),
            TokenType::simple(2, "(", false, 1),
            TokenType::simple(3, ")", false, 1),
            TokenType::balanced(4, '(', ')', "[^;]*", 1).unwrap().after(1),
            TokenType::regexp(5, "[a-z]+", 2).unwrap(),
        ];
        let tokens = tokenize(&input, types);
        let kinds: Vec<i32> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![5, 1, 4]);
        assert_eq!(tokens[2].literal, expr);
    }
}
