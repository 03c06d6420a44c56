//! The token reader: a cursor over tokenized source modules.
//!
//! The parser drives execution through this interface. Loops and function
//! calls work by saving a [`Position`] and jumping back to it, so the reader
//! must be able to restore its state exactly from a bookmark.

use std::fs;

use ahash::AHashSet;

use crate::{
    error::{CodeLoc, ErrorKind, RunResult},
    scanner::{Tok, Token, tokenize},
};

/// An opaque bookmark into the token stream: which module, which token.
///
/// Positions are plain copyable values; the ones bound to function names in
/// the identifier table are additionally wrapped in heap values so the scope
/// machinery can hold them like any other binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Position {
    module: usize,
    index: usize,
}

/// The reader contract the parser consumes.
///
/// `save`/`jump` must round-trip exactly: after `jump(p)` the reader reports
/// the same token, text and location as when `p` was saved.
pub(crate) trait Reader {
    /// Current token kind.
    fn token(&self) -> Tok;
    /// Current token payload text (identifiers and literals).
    fn text(&self) -> &str;
    /// Current token source position.
    fn loc(&self) -> CodeLoc;
    /// Name of the module the reader is currently in.
    fn file(&self) -> &str;
    /// Advances one token; a no-op at ENDMARKER.
    fn next(&mut self);
    /// Captures the current position.
    fn save(&self) -> Position;
    /// Restores a previously saved position.
    fn jump(&mut self, pos: Position);
    /// Returns to the start of the current module.
    fn reset(&mut self);
    /// Loads and tokenizes another source file, returning the position of its
    /// first token. Returns `None` when the file was already imported.
    fn import(&mut self, path: &str) -> RunResult<Option<Position>>;
}

/// One tokenized source module.
#[derive(Debug)]
struct Module {
    name: String,
    tokens: Vec<Token>,
}

/// The production reader: owns every loaded module's token stream.
#[derive(Debug)]
pub(crate) struct SourceReader {
    modules: Vec<Module>,
    imported: AHashSet<String>,
    module: usize,
    cursor: usize,
}

impl SourceReader {
    /// Tokenizes `source` as the main module.
    pub(crate) fn from_source(source: &str, name: &str) -> RunResult<Self> {
        let tokens = tokenize(source, name)?;
        Ok(Self {
            modules: vec![Module {
                name: name.to_owned(),
                tokens,
            }],
            imported: AHashSet::new(),
            module: 0,
            cursor: 0,
        })
    }

    fn current(&self) -> &Token {
        &self.modules[self.module].tokens[self.cursor]
    }
}

impl Reader for SourceReader {
    fn token(&self) -> Tok {
        self.current().kind
    }

    fn text(&self) -> &str {
        &self.current().text
    }

    fn loc(&self) -> CodeLoc {
        self.current().loc
    }

    fn file(&self) -> &str {
        &self.modules[self.module].name
    }

    fn next(&mut self) {
        if self.current().kind != Tok::EndMarker {
            self.cursor += 1;
        }
    }

    fn save(&self) -> Position {
        Position {
            module: self.module,
            index: self.cursor,
        }
    }

    fn jump(&mut self, pos: Position) {
        self.module = pos.module;
        self.cursor = pos.index;
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn import(&mut self, path: &str) -> RunResult<Option<Position>> {
        if !self.imported.insert(path.to_owned()) {
            return Ok(None);
        }
        let source = fs::read_to_string(path)
            .map_err(|err| ErrorKind::SystemError.msg(format!("cannot import {path}: {err}")))?;
        let tokens = tokenize(&source, path)?;
        self.modules.push(Module {
            name: path.to_owned(),
            tokens,
        });
        Ok(Some(Position {
            module: self.modules.len() - 1,
            index: 0,
        }))
    }
}
