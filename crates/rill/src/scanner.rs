//! The tokenizer: source text to a token stream with INDENT/DEDENT.
//!
//! Each source module is tokenized eagerly, so a position bookmark is just an
//! index into the resulting token vector. Indentation is tracked Python-style
//! with a width stack (tabs advance to the next multiple of eight); blank and
//! comment-only lines produce no tokens at all.

use strum::Display;

use crate::{
    error::{CodeLoc, ErrorKind, RunResult},
    value::escape_byte,
};

/// Token kinds.
///
/// The display form is what error messages show, e.g.
/// `expected ')' instead of NEWLINE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub(crate) enum Tok {
    #[strum(serialize = "identifier")]
    Ident,
    #[strum(serialize = "string literal")]
    StrLit,
    #[strum(serialize = "character literal")]
    CharLit,
    #[strum(serialize = "integer literal")]
    IntLit,
    #[strum(serialize = "float literal")]
    FloatLit,

    #[strum(serialize = "'('")]
    Lpar,
    #[strum(serialize = "')'")]
    Rpar,
    #[strum(serialize = "'['")]
    Lbracket,
    #[strum(serialize = "']'")]
    Rbracket,
    #[strum(serialize = "','")]
    Comma,
    #[strum(serialize = "':'")]
    Colon,
    #[strum(serialize = "'='")]
    Equal,

    #[strum(serialize = "'=='")]
    EqEq,
    #[strum(serialize = "'!='")]
    NotEq,
    #[strum(serialize = "'<'")]
    Lss,
    #[strum(serialize = "'<='")]
    Leq,
    #[strum(serialize = "'>'")]
    Gtr,
    #[strum(serialize = "'>='")]
    Geq,
    #[strum(serialize = "'+'")]
    Plus,
    #[strum(serialize = "'-'")]
    Minus,
    #[strum(serialize = "'*'")]
    Star,
    #[strum(serialize = "'/'")]
    Slash,
    #[strum(serialize = "'%'")]
    Percent,
    #[strum(serialize = "'!'")]
    Not,

    #[strum(serialize = "'and'")]
    And,
    #[strum(serialize = "'or'")]
    Or,
    #[strum(serialize = "'in'")]
    In,
    #[strum(serialize = "'if'")]
    If,
    #[strum(serialize = "'else'")]
    Else,
    #[strum(serialize = "'while'")]
    While,
    #[strum(serialize = "'do'")]
    Do,
    #[strum(serialize = "'for'")]
    For,
    #[strum(serialize = "'import'")]
    Import,
    #[strum(serialize = "'input'")]
    Input,
    #[strum(serialize = "'print'")]
    Print,
    #[strum(serialize = "'return'")]
    Return,
    #[strum(serialize = "'pass'")]
    Pass,
    #[strum(serialize = "'break'")]
    Break,
    #[strum(serialize = "'continue'")]
    Continue,
    #[strum(serialize = "'def'")]
    Def,

    #[strum(serialize = "'char'")]
    DefChar,
    #[strum(serialize = "'int'")]
    DefInt,
    #[strum(serialize = "'float'")]
    DefFloat,
    #[strum(serialize = "'str'")]
    DefStr,
    #[strum(serialize = "'list'")]
    DefList,

    #[strum(serialize = "NEWLINE")]
    Newline,
    #[strum(serialize = "INDENT")]
    Indent,
    #[strum(serialize = "DEDENT")]
    Dedent,
    #[strum(serialize = "ENDMARKER")]
    EndMarker,
}

/// One token: kind, payload text (identifiers and literals only), position.
///
/// Character literals carry their raw content, escapes unprocessed; string
/// literals carry their content with escapes already translated.
#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub(crate) kind: Tok,
    pub(crate) text: String,
    pub(crate) loc: CodeLoc,
}

impl Token {
    fn bare(kind: Tok, loc: CodeLoc) -> Self {
        Self {
            kind,
            text: String::new(),
            loc,
        }
    }
}

fn keyword(ident: &str) -> Option<Tok> {
    Some(match ident {
        "char" => Tok::DefChar,
        "int" => Tok::DefInt,
        "float" => Tok::DefFloat,
        "str" => Tok::DefStr,
        "list" => Tok::DefList,
        "def" => Tok::Def,
        "if" => Tok::If,
        "else" => Tok::Else,
        "while" => Tok::While,
        "do" => Tok::Do,
        "for" => Tok::For,
        "in" => Tok::In,
        "and" => Tok::And,
        "or" => Tok::Or,
        "import" => Tok::Import,
        "input" => Tok::Input,
        "print" => Tok::Print,
        "return" => Tok::Return,
        "pass" => Tok::Pass,
        "break" => Tok::Break,
        "continue" => Tok::Continue,
        _ => return None,
    })
}

/// Tokenizes a whole source module.
///
/// The stream always ends with any pending DEDENTs followed by a single
/// ENDMARKER, so a reader can rely on never running off the end.
pub(crate) fn tokenize(source: &str, file: &str) -> RunResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut indents: Vec<usize> = vec![0];

    for (line_index, line) in source.lines().enumerate() {
        let line_no = u32::try_from(line_index + 1).unwrap_or(u32::MAX);
        let line = line.strip_suffix('\r').unwrap_or(line);
        let mut scanner = LineScanner {
            bytes: line.as_bytes(),
            pos: 0,
            line_no,
            file,
        };

        let width = scanner.indentation();
        if scanner.at_line_end() {
            continue;
        }

        let loc = scanner.loc();
        let current = *indents.last().expect("indent stack is never empty");
        if width > current {
            indents.push(width);
            tokens.push(Token::bare(Tok::Indent, loc));
        } else {
            while width < *indents.last().expect("indent stack is never empty") {
                indents.pop();
                tokens.push(Token::bare(Tok::Dedent, loc));
            }
            if width != *indents.last().expect("indent stack is never empty") {
                return Err(ErrorKind::SyntaxError
                    .msg("unindent does not match any outer indentation level")
                    .at(file, loc));
            }
        }

        while !scanner.at_line_end() {
            let token = scanner.next_token()?;
            tokens.push(token);
            scanner.skip_spaces();
        }
        tokens.push(Token::bare(Tok::Newline, scanner.loc()));
    }

    let end = CodeLoc {
        line: u32::try_from(source.lines().count() + 1).unwrap_or(u32::MAX),
        column: 1,
    };
    while indents.len() > 1 {
        indents.pop();
        tokens.push(Token::bare(Tok::Dedent, end));
    }
    tokens.push(Token::bare(Tok::EndMarker, end));
    Ok(tokens)
}

/// Cursor over a single source line.
struct LineScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    line_no: u32,
    file: &'a str,
}

impl LineScanner<'_> {
    fn loc(&self) -> CodeLoc {
        CodeLoc {
            line: self.line_no,
            column: u32::try_from(self.pos + 1).unwrap_or(u32::MAX),
        }
    }

    fn fail(&self, kind: ErrorKind, message: impl std::fmt::Display) -> crate::error::RunError {
        kind.msg(message).at(self.file, self.loc())
    }

    /// Measures leading whitespace; a tab advances to the next multiple of 8.
    fn indentation(&mut self) -> usize {
        let mut width = 0;
        while let Some(&b) = self.bytes.get(self.pos) {
            match b {
                b' ' => width += 1,
                b'\t' => width = (width / 8 + 1) * 8,
                _ => break,
            }
            self.pos += 1;
        }
        width
    }

    fn skip_spaces(&mut self) {
        while matches!(self.bytes.get(self.pos), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    /// Whether only whitespace or a comment remains on the line.
    fn at_line_end(&mut self) -> bool {
        self.skip_spaces();
        match self.bytes.get(self.pos) {
            None | Some(b'#') => true,
            Some(_) => false,
        }
    }

    fn next_token(&mut self) -> RunResult<Token> {
        let loc = self.loc();
        let b = self.bytes[self.pos];
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => Ok(self.ident_or_keyword(loc)),
            b'0'..=b'9' => self.number(loc),
            b'"' => self.string_literal(loc),
            b'\'' => self.char_literal(loc),
            _ => self.operator(loc),
        }
    }

    fn ident_or_keyword(&mut self, loc: CodeLoc) -> Token {
        let start = self.pos;
        while matches!(
            self.bytes.get(self.pos),
            Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_')
        ) {
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();
        match keyword(&text) {
            Some(kind) => Token::bare(kind, loc),
            None => Token {
                kind: Tok::Ident,
                text,
                loc,
            },
        }
    }

    fn number(&mut self, loc: CodeLoc) -> RunResult<Token> {
        let start = self.pos;
        let mut is_float = false;
        while matches!(self.bytes.get(self.pos), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.bytes.get(self.pos) == Some(&b'.') {
            is_float = true;
            self.pos += 1;
            while matches!(self.bytes.get(self.pos), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if matches!(self.bytes.get(self.pos), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.bytes.get(self.pos), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if !matches!(self.bytes.get(self.pos), Some(b'0'..=b'9')) {
                return Err(self.fail(ErrorKind::SyntaxError, "malformed number: exponent has no digits"));
            }
            while matches!(self.bytes.get(self.pos), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        let text = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();
        Ok(Token {
            kind: if is_float { Tok::FloatLit } else { Tok::IntLit },
            text,
            loc,
        })
    }

    /// A double-quoted string; escapes are translated here.
    fn string_literal(&mut self, loc: CodeLoc) -> RunResult<Token> {
        self.pos += 1;
        let mut bytes = Vec::new();
        loop {
            match self.bytes.get(self.pos) {
                None => return Err(self.fail(ErrorKind::SyntaxError, "unterminated string literal")),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    let escape = *self
                        .bytes
                        .get(self.pos + 1)
                        .ok_or_else(|| self.fail(ErrorKind::SyntaxError, "unterminated string literal"))?;
                    let translated = escape_byte(escape).ok_or_else(|| {
                        self.fail(
                            ErrorKind::ValueError,
                            format!("unknown escape sequence: {}", escape as char),
                        )
                    })?;
                    bytes.push(translated);
                    self.pos += 2;
                }
                Some(&b) => {
                    bytes.push(b);
                    self.pos += 1;
                }
            }
        }
        Ok(Token {
            kind: Tok::StrLit,
            text: String::from_utf8_lossy(&bytes).into_owned(),
            loc,
        })
    }

    /// A single-quoted character literal.
    ///
    /// The raw content (escape included) is kept as-is; validation and escape
    /// translation happen when the literal is evaluated.
    fn char_literal(&mut self, loc: CodeLoc) -> RunResult<Token> {
        self.pos += 1;
        let start = self.pos;
        loop {
            match self.bytes.get(self.pos) {
                None => return Err(self.fail(ErrorKind::SyntaxError, "unterminated character literal")),
                Some(b'\'') => break,
                Some(b'\\') => {
                    if self.bytes.get(self.pos + 1).is_none() {
                        return Err(self.fail(ErrorKind::SyntaxError, "unterminated character literal"));
                    }
                    self.pos += 2;
                }
                Some(_) => self.pos += 1,
            }
        }
        let text = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();
        self.pos += 1;
        Ok(Token {
            kind: Tok::CharLit,
            text,
            loc,
        })
    }

    fn operator(&mut self, loc: CodeLoc) -> RunResult<Token> {
        let b = self.bytes[self.pos];
        let next = self.bytes.get(self.pos + 1).copied();
        let (kind, width) = match (b, next) {
            (b'=', Some(b'=')) => (Tok::EqEq, 2),
            (b'=', _) => (Tok::Equal, 1),
            (b'!', Some(b'=')) => (Tok::NotEq, 2),
            (b'!', _) => (Tok::Not, 1),
            // '<>' is the historical spelling of '!='
            (b'<', Some(b'>')) => (Tok::NotEq, 2),
            (b'<', Some(b'=')) => (Tok::Leq, 2),
            (b'<', _) => (Tok::Lss, 1),
            (b'>', Some(b'=')) => (Tok::Geq, 2),
            (b'>', _) => (Tok::Gtr, 1),
            (b'+', _) => (Tok::Plus, 1),
            (b'-', _) => (Tok::Minus, 1),
            (b'*', _) => (Tok::Star, 1),
            (b'/', _) => (Tok::Slash, 1),
            (b'%', _) => (Tok::Percent, 1),
            (b'(', _) => (Tok::Lpar, 1),
            (b')', _) => (Tok::Rpar, 1),
            (b'[', _) => (Tok::Lbracket, 1),
            (b']', _) => (Tok::Rbracket, 1),
            (b',', _) => (Tok::Comma, 1),
            (b':', _) => (Tok::Colon, 1),
            _ => {
                return Err(self.fail(
                    ErrorKind::SyntaxError,
                    format!("unexpected character '{}'", b as char),
                ));
            }
        };
        self.pos += width;
        Ok(Token::bare(kind, loc))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(source: &str) -> Vec<Tok> {
        tokenize(source, "test.rl").unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn a_simple_statement_ends_with_newline_and_endmarker() {
        assert_eq!(
            kinds("int x\n"),
            vec![Tok::DefInt, Tok::Ident, Tok::Newline, Tok::EndMarker]
        );
    }

    #[test]
    fn blocks_produce_matched_indent_dedent_pairs() {
        let toks = kinds("while 1\n    pass\nprint 1\n");
        assert_eq!(
            toks,
            vec![
                Tok::While,
                Tok::IntLit,
                Tok::Newline,
                Tok::Indent,
                Tok::Pass,
                Tok::Newline,
                Tok::Dedent,
                Tok::Print,
                Tok::IntLit,
                Tok::Newline,
                Tok::EndMarker,
            ]
        );
    }

    #[test]
    fn dangling_indents_close_at_end_of_file() {
        let toks = kinds("if 1\n    if 2\n        pass");
        let dedents = toks.iter().filter(|t| **t == Tok::Dedent).count();
        let indents = toks.iter().filter(|t| **t == Tok::Indent).count();
        assert_eq!(indents, 2);
        assert_eq!(dedents, 2);
        assert_eq!(toks.last(), Some(&Tok::EndMarker));
    }

    #[test]
    fn blank_and_comment_lines_are_invisible() {
        assert_eq!(
            kinds("int x\n\n   \n# comment\nint y  # trailing\n"),
            vec![
                Tok::DefInt,
                Tok::Ident,
                Tok::Newline,
                Tok::DefInt,
                Tok::Ident,
                Tok::Newline,
                Tok::EndMarker,
            ]
        );
    }

    #[test]
    fn mismatched_unindent_is_a_syntax_error() {
        let err = tokenize("if 1\n    pass\n  pass\n", "test.rl").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn number_literals_split_into_int_and_float() {
        let toks = tokenize("1 2.5 1e3 7.\n", "test.rl").unwrap();
        assert_eq!(
            toks.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![Tok::IntLit, Tok::FloatLit, Tok::FloatLit, Tok::FloatLit, Tok::Newline, Tok::EndMarker]
        );
        assert_eq!(toks[0].text, "1");
        assert_eq!(toks[1].text, "2.5");
    }

    #[test]
    fn string_escapes_are_translated_in_the_scanner() {
        let toks = tokenize("\"a\\nb\"\n", "test.rl").unwrap();
        assert_eq!(toks[0].kind, Tok::StrLit);
        assert_eq!(toks[0].text, "a\nb");
    }

    #[test]
    fn char_literals_keep_their_raw_content() {
        let toks = tokenize("'\\n' 'a'\n", "test.rl").unwrap();
        assert_eq!(toks[0].kind, Tok::CharLit);
        assert_eq!(toks[0].text, "\\n");
        assert_eq!(toks[1].text, "a");
    }

    #[test]
    fn diamond_is_an_alias_for_not_equal() {
        assert_eq!(
            kinds("1 <> 2\n"),
            vec![Tok::IntLit, Tok::NotEq, Tok::IntLit, Tok::Newline, Tok::EndMarker]
        );
    }

    #[test]
    fn unknown_characters_are_rejected() {
        let err = tokenize("int x @\n", "test.rl").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert_eq!(err.loc().map(|l| l.line), Some(1));
    }

    #[test]
    fn unterminated_literals_are_rejected() {
        assert!(tokenize("\"abc\n", "test.rl").is_err());
        assert!(tokenize("'a\n", "test.rl").is_err());
    }
}
