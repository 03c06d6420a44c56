//! The statement executor: a recursive-descent parser that runs what it
//! parses.
//!
//! There is no AST. Execution happens in two phases over the token reader:
//! a discovery pass records a position bookmark for every top-level `def`,
//! then the statement loop parses and executes in lock-step. Loops jump the
//! reader back to a saved position each iteration; function calls jump to
//! the callee's bookmark and back.
//!
//! Non-local control flow is an explicit [`Flow`] result threaded through
//! `statement()`: loops intercept `Break` and `Continue`, function-call
//! sites intercept `Return`. After every statement the reader sits on the
//! first token of the next one.

use crate::{
    error::{ErrorKind, RunError, RunResult},
    heap::{DropWithHeap, Heap, HeapData},
    io::{LineSource, PrintWriter},
    ops,
    reader::{Position, Reader},
    scanner::Tok,
    scope::Scopes,
    types::{List, Str},
    value::{Kind, Value, parse_char, str_to_float, str_to_int},
};

/// How a statement finished.
///
/// `Break` and `Continue` travel up to the innermost loop; `Return` travels
/// up to the innermost function call (or ends the program at top level).
#[derive(Debug)]
pub(crate) enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// The execution context: reader, heap, scope stack and standard streams,
/// threaded explicitly through every parsing entry point.
pub(crate) struct Interp<'a, R: Reader, W: PrintWriter, L: LineSource> {
    pub(crate) reader: &'a mut R,
    pub(crate) heap: &'a mut Heap,
    pub(crate) scopes: &'a mut Scopes,
    pub(crate) print: &'a mut W,
    pub(crate) input: &'a mut L,
}

impl<R: Reader, W: PrintWriter, L: LineSource> Interp<'_, R, W, L> {
    /// If the current token matches `t`, consume it and return true.
    pub(crate) fn accept(&mut self, t: Tok) -> bool {
        if self.reader.token() == t {
            self.reader.next();
            true
        } else {
            false
        }
    }

    /// The current token must match `t`; consume it or fail.
    pub(crate) fn expect(&mut self, t: Tok) -> RunResult<()> {
        if self.accept(t) {
            Ok(())
        } else {
            Err(self.fail(
                ErrorKind::SyntaxError,
                format!("expected {t} instead of {}", self.reader.token()),
            ))
        }
    }

    /// Builds an error carrying the reader's current position.
    pub(crate) fn fail(&self, kind: ErrorKind, message: impl std::fmt::Display) -> RunError {
        kind.msg(message).at(self.reader.file(), self.reader.loc())
    }

    /// Attaches the current position to an error that lacks one.
    pub(crate) fn attach_loc(&self, err: RunError) -> RunError {
        err.at(self.reader.file(), self.reader.loc())
    }

    /// Runs the module currently at the reader's start: discovery pass, then
    /// the statement loop.
    pub(crate) fn run(&mut self) -> RunResult<()> {
        self.reader.reset();
        self.discover_functions()?;
        self.reader.reset();
        self.statement_loop()
    }

    /// Executes statements until ENDMARKER. A top-level `return` ends the
    /// program.
    fn statement_loop(&mut self) -> RunResult<()> {
        loop {
            if self.reader.token() == Tok::EndMarker {
                return Ok(());
            }
            if let Flow::Return(value) = self.statement()? {
                value.drop_with_heap(self.heap);
                return Ok(());
            }
        }
    }

    /// Phase A: scan from the current position to ENDMARKER, recording a
    /// bookmark for every function definition in the top-level scope.
    ///
    /// The bookmark is captured at the `(` of the parameter list. Function
    /// bodies are skipped, so nested definitions are never recorded.
    pub(crate) fn discover_functions(&mut self) -> RunResult<()> {
        loop {
            if self.accept(Tok::Def) {
                if self.reader.token() != Tok::Ident {
                    return Err(self.fail(ErrorKind::SyntaxError, "missing identifier after function definition"));
                }
                let name = self.reader.text().to_owned();
                self.reader.next();
                if self.reader.token() != Tok::Lpar {
                    return Err(self.fail(
                        ErrorKind::SyntaxError,
                        format!("expected {} instead of {}", Tok::Lpar, self.reader.token()),
                    ));
                }
                let bookmark = self.reader.save();
                if !self.scopes.add(&name) {
                    return Err(self.fail(ErrorKind::NameError, format!("{name} is already declared")));
                }
                let position = self.heap.allocate(HeapData::Position(bookmark))?;
                self.scopes.bind(&name, position, self.heap);
                self.skip_to_newline();
                self.skip_block()?;
            } else if self.reader.token() == Tok::EndMarker {
                return Ok(());
            } else {
                self.reader.next();
            }
        }
    }

    /// Statement interpreter. In: the statement's first token; out: the
    /// first token after the statement.
    pub(crate) fn statement(&mut self) -> RunResult<Flow> {
        self.statement_inner().map_err(|err| self.attach_loc(err))
    }

    fn statement_inner(&mut self) -> RunResult<Flow> {
        if self.accept(Tok::DefChar) {
            self.variable_declaration(Kind::Char)?;
        } else if self.accept(Tok::DefInt) {
            self.variable_declaration(Kind::Int)?;
        } else if self.accept(Tok::DefFloat) {
            self.variable_declaration(Kind::Float)?;
        } else if self.accept(Tok::DefStr) {
            self.variable_declaration(Kind::Str)?;
        } else if self.accept(Tok::DefList) {
            self.variable_declaration(Kind::List)?;
        } else if self.accept(Tok::Def) {
            // definitions were handled in the discovery pass
            self.skip_function()?;
        } else if self.accept(Tok::For) {
            return self.for_stmt();
        } else if self.accept(Tok::Do) {
            return self.do_stmt();
        } else if self.accept(Tok::If) {
            return self.if_stmt();
        } else if self.accept(Tok::Import) {
            self.import_stmt()?;
        } else if self.accept(Tok::Input) {
            self.input_stmt()?;
        } else if self.accept(Tok::Pass) {
            self.expect(Tok::Newline)?;
        } else if self.accept(Tok::Print) {
            self.print_stmt()?;
        } else if self.accept(Tok::Return) {
            return self.return_stmt();
        } else if self.accept(Tok::While) {
            return self.while_stmt();
        } else if self.accept(Tok::Break) {
            return Ok(Flow::Break);
        } else if self.accept(Tok::Continue) {
            return Ok(Flow::Continue);
        } else if self.reader.token() == Tok::EndMarker {
            // nothing left to do
        } else {
            self.expression_stmt()?;
        }
        Ok(Flow::Normal)
    }

    /// Executes a statement block.
    ///
    /// Syntax: NEWLINE INDENT statement+ DEDENT
    ///
    /// In: NEWLINE; out: the closing DEDENT (not consumed). When a statement
    /// breaks, continues or returns, the rest of the block is skipped and the
    /// flow is handed to the caller.
    fn block(&mut self) -> RunResult<Flow> {
        self.expect(Tok::Newline)?;
        self.expect(Tok::Indent)?;
        loop {
            let flow = self.statement()?;
            if matches!(flow, Flow::Return(_)) {
                return Ok(flow);
            }
            if matches!(self.reader.token(), Tok::Dedent | Tok::EndMarker) {
                return Ok(flow);
            }
            if !matches!(flow, Flow::Normal) {
                self.skip_to_block_end();
                return Ok(flow);
            }
        }
    }

    /// Consumes tokens up to (not including) the block's closing DEDENT,
    /// counting nested INDENT/DEDENT pairs.
    fn skip_to_block_end(&mut self) {
        let mut level = 1u32;
        while level > 0 && self.reader.token() != Tok::EndMarker {
            self.reader.next();
            match self.reader.token() {
                Tok::Indent => level += 1,
                Tok::Dedent => level -= 1,
                _ => {}
            }
        }
    }

    /// Skips a whole statement block without executing it.
    ///
    /// In: NEWLINE; out: the first token after the closing DEDENT.
    fn skip_block(&mut self) -> RunResult<()> {
        self.expect(Tok::Newline)?;
        self.expect(Tok::Indent)?;
        self.skip_to_block_end();
        self.reader.next();
        Ok(())
    }

    fn skip_to_newline(&mut self) {
        while !matches!(self.reader.token(), Tok::Newline | Tok::EndMarker) {
            self.reader.next();
        }
    }

    /// Skips a function definition encountered during execution.
    ///
    /// In: the function's identifier; out: the first token after the body.
    fn skip_function(&mut self) -> RunResult<()> {
        self.expect(Tok::Ident)?;
        self.expect(Tok::Lpar)?;
        self.skip_to_newline();
        self.skip_block()
    }

    /// Declares one or more variables of `kind`, with optional initializers.
    ///
    /// Syntax: kind identifier ('=' value)? (',' identifier ('=' value)?)* NEWLINE
    fn variable_declaration(&mut self, kind: Kind) -> RunResult<()> {
        loop {
            if self.reader.token() != Tok::Ident {
                return Err(self.fail(
                    ErrorKind::SyntaxError,
                    format!("expected identifier instead of {}", self.reader.token()),
                ));
            }
            let name = self.reader.text().to_owned();
            if !self.scopes.add(&name) {
                return Err(ErrorKind::already_declared(&name));
            }
            let default = Value::default_of(kind, self.heap)?;
            self.scopes.bind(&name, default, self.heap);
            self.reader.next();

            if self.accept(Tok::Equal) {
                let value = self.assignment_expr()?;
                self.assign_to_name(&name, &value)?;
                value.drop_with_heap(self.heap);
            }
            if self.accept(Tok::Newline) {
                return Ok(());
            }
            self.expect(Tok::Comma)?;
        }
    }

    /// Evaluates an expression and discards the result.
    fn expression_stmt(&mut self) -> RunResult<()> {
        let value = self.comma_expr()?;
        value.drop_with_heap(self.heap);
        self.expect(Tok::Newline)
    }

    /// Evaluates a condition expression down to true/false.
    fn condition(&mut self) -> RunResult<bool> {
        let value = self.comma_expr()?;
        let truth = value.as_bool(self.heap).map_err(|err| self.attach_loc(err));
        value.drop_with_heap(self.heap);
        truth
    }

    /// if condition / block / optional else block. Exactly one branch runs;
    /// the other is skipped without execution.
    fn if_stmt(&mut self) -> RunResult<Flow> {
        if self.condition()? {
            let flow = self.block()?;
            if matches!(flow, Flow::Return(_)) {
                return Ok(flow);
            }
            self.expect(Tok::Dedent)?;
            if self.accept(Tok::Else) {
                self.skip_block()?;
            }
            Ok(flow)
        } else {
            self.skip_block()?;
            if self.accept(Tok::Else) {
                let flow = self.block()?;
                if matches!(flow, Flow::Return(_)) {
                    return Ok(flow);
                }
                self.expect(Tok::Dedent)?;
                Ok(flow)
            } else {
                Ok(Flow::Normal)
            }
        }
    }

    /// while condition / block. The position at the loop head is saved once
    /// and jumped to before every re-evaluation of the condition.
    fn while_stmt(&mut self) -> RunResult<Flow> {
        let loop_pos = self.reader.save();
        loop {
            if !self.condition()? {
                break;
            }
            match self.block()? {
                Flow::Normal | Flow::Continue => self.reader.jump(loop_pos),
                Flow::Break => {
                    // leave via the loop head so the reader ends up after the
                    // condition, in front of the block to skip
                    self.reader.jump(loop_pos);
                    self.condition()?;
                    break;
                }
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        self.skip_block()?;
        Ok(Flow::Normal)
    }

    /// do / block / while condition. The body runs before the first test.
    fn do_stmt(&mut self) -> RunResult<Flow> {
        if self.reader.token() != Tok::Newline {
            return Err(self.fail(ErrorKind::SyntaxError, "expected newline after do"));
        }
        let loop_pos = self.reader.save();
        loop {
            self.reader.jump(loop_pos);
            let flow = self.block()?;
            if matches!(flow, Flow::Return(_)) {
                return Ok(flow);
            }
            self.expect(Tok::Dedent)?;
            self.expect(Tok::While)?;
            let keep_going = self.condition()?;
            if matches!(flow, Flow::Break) || !keep_going {
                break;
            }
        }
        self.expect(Tok::Newline)?;
        Ok(Flow::Normal)
    }

    /// for identifier in sequence / block.
    ///
    /// The sequence is evaluated once and held for the duration of the loop.
    /// The loop variable is created on the fly if necessary, bound to each
    /// element in index order, and unbound after every iteration. List
    /// elements bind as their node cell, so assigning to the loop variable
    /// writes through to the list.
    fn for_stmt(&mut self) -> RunResult<Flow> {
        if self.reader.token() != Tok::Ident {
            return Err(self.fail(
                ErrorKind::SyntaxError,
                format!("expected identifier instead of {}", self.reader.token()),
            ));
        }
        let name = self.reader.text().to_owned();
        if self.scopes.lookup(&name).is_none() {
            self.scopes.add(&name);
        }
        self.reader.next();
        self.expect(Tok::In)?;

        let sequence = self.comma_expr()?;
        let len = ops::length(&sequence, self.heap).map_err(|err| self.attach_loc(err))?;
        if self.reader.token() != Tok::Newline {
            return Err(self.fail(ErrorKind::SyntaxError, "expected newline"));
        }

        let loop_pos = self.reader.save();
        for index in 0..len {
            let element = ops::item(&sequence, index, self.heap)?;
            self.scopes.bind(&name, element, self.heap);
            let flow = self.block()?;
            self.scopes.unbind(&name, self.heap);
            match flow {
                Flow::Normal | Flow::Continue => self.reader.jump(loop_pos),
                Flow::Break => {
                    self.reader.jump(loop_pos);
                    break;
                }
                Flow::Return(_) => {
                    sequence.drop_with_heap(self.heap);
                    return Ok(flow);
                }
            }
        }
        self.skip_block()?;
        sequence.drop_with_heap(self.heap);
        Ok(Flow::Normal)
    }

    /// print value (',' value)* NEWLINE — each value through its printed
    /// form, no separators.
    fn print_stmt(&mut self) -> RunResult<()> {
        loop {
            let value = self.assignment_expr()?;
            let mut out = String::new();
            value.write_display(self.heap, &mut out);
            value.drop_with_heap(self.heap);
            self.print.stdout_write(&out)?;
            if !self.accept(Tok::Comma) {
                break;
            }
        }
        self.expect(Tok::Newline)
    }

    /// input (prompt? identifier)+ NEWLINE — reads one line per item and
    /// converts it to the identifier's declared kind.
    fn input_stmt(&mut self) -> RunResult<()> {
        loop {
            if self.reader.token() == Tok::StrLit {
                let prompt = self.reader.text().to_owned();
                self.print.stdout_write(&prompt)?;
                self.reader.next();
            }
            if self.reader.token() != Tok::Ident {
                return Err(self.fail(
                    ErrorKind::SyntaxError,
                    format!("expected identifier instead of {}", self.reader.token()),
                ));
            }
            let name = self.reader.text().to_owned();
            let kind = match self.scopes.lookup(&name) {
                None => return Err(ErrorKind::undeclared(&name)),
                Some(None) => return Err(ErrorKind::unbound(&name)),
                Some(Some(value)) => value.kind(self.heap),
            };
            let line = self.input.read_line()?;
            let converted = match kind {
                Kind::Char => Value::Char(parse_char(&line)?),
                Kind::Int => Value::Int(str_to_int(&line)?),
                Kind::Float => Value::Float(str_to_float(&line)?),
                Kind::Str => self.heap.allocate(HeapData::Str(Str::from_str(&line)))?,
                other => {
                    return Err(ErrorKind::TypeError.msg(format!("unsupported type for input: {other}")));
                }
            };
            self.scopes.bind(&name, converted, self.heap);
            self.reader.next();
            if !self.accept(Tok::Comma) {
                break;
            }
        }
        self.expect(Tok::Newline)
    }

    /// import string (',' string)* NEWLINE.
    ///
    /// Each operand names a source file. The file is tokenized as a new
    /// module, its functions are discovered into the top-level scope, its
    /// top-level statements run, and the reader returns to the statement
    /// that imported it. A file already imported earlier is skipped.
    fn import_stmt(&mut self) -> RunResult<()> {
        loop {
            let value = self.assignment_expr()?;
            let path = value.as_str_view(self.heap)?.to_text().into_owned();
            value.drop_with_heap(self.heap);

            let here = self.reader.save();
            if let Some(start) = self.reader.import(&path)? {
                self.reader.jump(start);
                self.discover_functions()?;
                self.reader.jump(start);
                self.statement_loop()?;
            }
            self.reader.jump(here);

            if !self.accept(Tok::Comma) {
                break;
            }
        }
        self.expect(Tok::Newline)
    }

    /// return value? NEWLINE — the value defaults to int 0.
    fn return_stmt(&mut self) -> RunResult<Flow> {
        let value = if self.reader.token() == Tok::Newline {
            Value::Int(0)
        } else {
            self.comma_expr()?
        };
        self.expect(Tok::Newline)?;
        Ok(Flow::Return(value))
    }

    /// Calls the function whose parameter list starts at `addr`.
    ///
    /// In: the `(` of the call site; out: the first token after the call's
    /// `)`. Arguments are evaluated left to right and passed by value in a
    /// temporary list; the callee binds its formals by popping from its
    /// head. Extra actuals are released with the list; a missing actual is a
    /// syntax error.
    pub(crate) fn function_call(&mut self, addr: Position) -> RunResult<Value> {
        let arglist = self.push_arguments()?;
        // the reader now sits on the call's ')'
        self.scopes.append_level();
        let return_to = self.reader.save();

        self.reader.jump(addr);
        self.pop_arguments(&arglist)?;
        self.expect(Tok::Rpar)?;

        let flow = self.block()?;
        let result = match flow {
            Flow::Return(value) => value,
            // falling off the end returns int 0
            _ => Value::Int(0),
        };

        arglist.drop_with_heap(self.heap);
        self.reader.jump(return_to);
        self.accept(Tok::Rpar);
        self.scopes.remove_level(self.heap);
        Ok(result)
    }

    /// Builds the argument list for a call: a fresh list holding a deep copy
    /// of every actual.
    ///
    /// In: the call's `(`; out: the call's `)` (not consumed).
    fn push_arguments(&mut self) -> RunResult<Value> {
        let mut list = List::new();
        self.expect(Tok::Lpar)?;
        while self.reader.token() != Tok::Rpar {
            let value = self.assignment_expr()?;
            let copy = value.deep_copy(self.heap).map_err(|err| self.attach_loc(err))?;
            value.drop_with_heap(self.heap);
            ops::push_element(&mut list, copy, self.heap)?;
            if self.reader.token() != Tok::Rpar {
                self.expect(Tok::Comma)?;
            }
        }
        self.heap.allocate(HeapData::List(list))
    }

    /// Binds the callee's formals from the argument list, in order.
    ///
    /// In: the definition's `(`; out: the definition's `)` (not consumed).
    fn pop_arguments(&mut self, arglist: &Value) -> RunResult<()> {
        self.expect(Tok::Lpar)?;
        while self.reader.token() != Tok::Rpar {
            if self.reader.token() != Tok::Ident {
                return Err(self.fail(
                    ErrorKind::SyntaxError,
                    format!("expected identifier instead of {}", self.reader.token()),
                ));
            }
            let name = self.reader.text().to_owned();
            if !self.scopes.add(&name) {
                return Err(self.fail(ErrorKind::NameError, format!("identifier {name} already declared")));
            }

            let list_id = arglist.as_list_id(self.heap)?;
            let node_id = match self.heap.get_mut(list_id) {
                HeapData::List(list) => list.remove_node(0),
                _ => return Err(ErrorKind::SystemError.msg("argument frame is not a list")),
            };
            let Some(node_id) = node_id else {
                return Err(self.fail(
                    ErrorKind::SyntaxError,
                    format!("no argument on stack to assign to {name}"),
                ));
            };
            let value = match self.heap.get_mut(node_id) {
                HeapData::Node(node) => node.take_inner(),
                _ => return Err(ErrorKind::SystemError.msg("argument cell is not a node")),
            };
            self.heap.dec_ref(node_id);
            self.scopes.bind(&name, value, self.heap);

            self.expect(Tok::Ident)?;
            self.accept(Tok::Comma);
        }
        Ok(())
    }

    /// Assigns `source` to the named variable with the coercion fixed by the
    /// target's kind. A target bound to a list-node cell (a loop variable)
    /// is written through the cell instead.
    pub(crate) fn assign_to_name(&mut self, name: &str, source: &Value) -> RunResult<()> {
        let target_kind = match self.scopes.lookup(name) {
            None => return Err(ErrorKind::undeclared(name)),
            Some(None) => return Err(ErrorKind::unbound(name)),
            Some(Some(current)) => {
                if let Value::Ref(id) = current
                    && matches!(self.heap.get(*id), HeapData::Node(_))
                {
                    let node_id = *id;
                    return ops::assign_node(node_id, source, self.heap);
                }
                current.kind(self.heap)
            }
        };
        let coerced = ops::coerce_assign(target_kind, source, self.heap)?;
        self.scopes.bind(name, coerced, self.heap);
        Ok(())
    }
}
