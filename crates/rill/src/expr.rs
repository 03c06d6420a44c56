//! The expression sub-parser.
//!
//! Like the statement level, expressions are evaluated while they are
//! parsed. Precedence, lowest first: comma, assignment, `or`, `and`,
//! equality, relational (including `in`), additive, multiplicative, unary,
//! postfix subscript/slice, primary.
//!
//! Assignment targets are detected by lookahead over raw tokens (the reader's
//! save/jump makes that cheap), so operand expressions are never evaluated
//! twice.

use crate::{
    error::{ErrorKind, RunResult},
    heap::{DropWithHeap, HeapData},
    io::{LineSource, PrintWriter},
    ops,
    parser::Interp,
    reader::Reader,
    scanner::Tok,
    types::{List, Str},
    value::{Value, parse_char, str_to_float, str_to_int},
};

impl<R: Reader, W: PrintWriter, L: LineSource> Interp<'_, R, W, L> {
    /// expression (',' expression)* — evaluates left to right, yields the
    /// last value.
    pub(crate) fn comma_expr(&mut self) -> RunResult<Value> {
        let mut value = self.assignment_expr()?;
        while self.accept(Tok::Comma) {
            value.drop_with_heap(self.heap);
            value = self.assignment_expr()?;
        }
        Ok(value)
    }

    /// Assignment (right-associative) or a plain expression.
    ///
    /// `name = value` coerces into the target's declared kind;
    /// `name[index] = value` writes through the element's node cell. The
    /// assigned value is the expression result.
    pub(crate) fn assignment_expr(&mut self) -> RunResult<Value> {
        if self.reader.token() == Tok::Ident {
            let name = self.reader.text().to_owned();
            let start = self.reader.save();
            self.reader.next();

            if self.accept(Tok::Equal) {
                let value = self.assignment_expr()?;
                self.assign_to_name(&name, &value)?;
                return Ok(value);
            }
            if self.reader.token() == Tok::Lbracket && self.subscript_is_store() {
                return self.subscript_store(&name);
            }
            // not an assignment after all
            self.reader.jump(start);
        }
        self.or_expr()
    }

    /// Looks ahead from a `[` to the matching `]` to see whether `=` follows.
    /// The reader is restored before returning; nothing is evaluated.
    fn subscript_is_store(&mut self) -> bool {
        let probe = self.reader.save();
        let mut depth = 0i32;
        let is_store = loop {
            match self.reader.token() {
                Tok::Lbracket => depth += 1,
                Tok::Rbracket => {
                    depth -= 1;
                    if depth == 0 {
                        self.reader.next();
                        break self.reader.token() == Tok::Equal;
                    }
                }
                Tok::Newline | Tok::EndMarker => break false,
                _ => {}
            }
            self.reader.next();
        };
        self.reader.jump(probe);
        is_store
    }

    /// name '[' index ']' '=' value — assignment through a list element's
    /// node cell.
    fn subscript_store(&mut self, name: &str) -> RunResult<Value> {
        self.expect(Tok::Lbracket)?;
        let index_value = self.assignment_expr()?;
        let index = index_value.as_int(self.heap)?;
        index_value.drop_with_heap(self.heap);
        self.expect(Tok::Rbracket)?;
        self.expect(Tok::Equal)?;

        let value = self.assignment_expr()?;
        let target = match self.scopes.lookup(name) {
            None => return Err(ErrorKind::undeclared(name)),
            Some(None) => return Err(ErrorKind::unbound(name)),
            Some(Some(current)) => current.peek(),
        };
        let element = ops::item(&target, index, self.heap)?;
        match element {
            Value::Ref(node_id) if matches!(self.heap.get(node_id), HeapData::Node(_)) => {
                ops::assign_node(node_id, &value, self.heap)?;
                self.heap.dec_ref(node_id);
            }
            other => {
                let kind = target.resolved_kind(self.heap);
                other.drop_with_heap(self.heap);
                return Err(ErrorKind::TypeError.msg(format!("cannot assign to {kind} element")));
            }
        }
        Ok(value)
    }

    fn or_expr(&mut self) -> RunResult<Value> {
        let mut left = self.and_expr()?;
        while self.accept(Tok::Or) {
            let right = self.and_expr()?;
            let result = ops::or(&left, &right, self.heap)?;
            left.drop_with_heap(self.heap);
            right.drop_with_heap(self.heap);
            left = result;
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> RunResult<Value> {
        let mut left = self.equality_expr()?;
        while self.accept(Tok::And) {
            let right = self.equality_expr()?;
            let result = ops::and(&left, &right, self.heap)?;
            left.drop_with_heap(self.heap);
            right.drop_with_heap(self.heap);
            left = result;
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> RunResult<Value> {
        let mut left = self.relational_expr()?;
        loop {
            let op = match self.reader.token() {
                t @ (Tok::EqEq | Tok::NotEq) => t,
                _ => return Ok(left),
            };
            self.reader.next();
            let right = self.relational_expr()?;
            let result = match op {
                Tok::EqEq => ops::eql(&left, &right, self.heap),
                _ => ops::neq(&left, &right, self.heap),
            };
            left.drop_with_heap(self.heap);
            right.drop_with_heap(self.heap);
            left = result;
        }
    }

    fn relational_expr(&mut self) -> RunResult<Value> {
        let mut left = self.additive_expr()?;
        loop {
            let op = match self.reader.token() {
                t @ (Tok::Lss | Tok::Leq | Tok::Gtr | Tok::Geq | Tok::In) => t,
                _ => return Ok(left),
            };
            self.reader.next();
            let right = self.additive_expr()?;
            let result = match op {
                Tok::Lss => ops::lss(&left, &right, self.heap)?,
                Tok::Leq => ops::leq(&left, &right, self.heap)?,
                Tok::Gtr => ops::gtr(&left, &right, self.heap)?,
                Tok::Geq => ops::geq(&left, &right, self.heap)?,
                _ => ops::contains(&left, &right, self.heap)?,
            };
            left.drop_with_heap(self.heap);
            right.drop_with_heap(self.heap);
            left = result;
        }
    }

    fn additive_expr(&mut self) -> RunResult<Value> {
        let mut left = self.term_expr()?;
        loop {
            let op = match self.reader.token() {
                t @ (Tok::Plus | Tok::Minus) => t,
                _ => return Ok(left),
            };
            self.reader.next();
            let right = self.term_expr()?;
            let result = match op {
                Tok::Plus => ops::add(&left, &right, self.heap)?,
                _ => ops::sub(&left, &right, self.heap)?,
            };
            left.drop_with_heap(self.heap);
            right.drop_with_heap(self.heap);
            left = result;
        }
    }

    fn term_expr(&mut self) -> RunResult<Value> {
        let mut left = self.unary_expr()?;
        loop {
            let op = match self.reader.token() {
                t @ (Tok::Star | Tok::Slash | Tok::Percent) => t,
                _ => return Ok(left),
            };
            self.reader.next();
            let right = self.unary_expr()?;
            let result = match op {
                Tok::Star => ops::mul(&left, &right, self.heap)?,
                Tok::Slash => ops::div(&left, &right, self.heap)?,
                _ => ops::rem(&left, &right, self.heap)?,
            };
            left.drop_with_heap(self.heap);
            right.drop_with_heap(self.heap);
            left = result;
        }
    }

    fn unary_expr(&mut self) -> RunResult<Value> {
        let op = match self.reader.token() {
            t @ (Tok::Minus | Tok::Plus | Tok::Not) => t,
            _ => return self.postfix_expr(),
        };
        self.reader.next();
        let operand = self.unary_expr()?;
        let result = match op {
            Tok::Minus => ops::neg(&operand, self.heap)?,
            Tok::Plus => ops::plus(&operand, self.heap)?,
            _ => ops::not(&operand, self.heap)?,
        };
        operand.drop_with_heap(self.heap);
        Ok(result)
    }

    fn postfix_expr(&mut self) -> RunResult<Value> {
        let mut value = self.primary_expr()?;
        while self.accept(Tok::Lbracket) {
            value = self.subscript_read(value)?;
        }
        Ok(value)
    }

    /// '[' already consumed: item access or slice on `sequence`.
    fn subscript_read(&mut self, sequence: Value) -> RunResult<Value> {
        let result = if self.accept(Tok::Colon) {
            let end = self.slice_bound(&sequence)?;
            ops::slice(&sequence, 0, end, self.heap)?
        } else {
            let index_value = self.assignment_expr()?;
            let index = index_value.as_int(self.heap)?;
            index_value.drop_with_heap(self.heap);
            if self.accept(Tok::Colon) {
                let end = self.slice_bound(&sequence)?;
                ops::slice(&sequence, index, end, self.heap)?
            } else {
                ops::item(&sequence, index, self.heap)?
            }
        };
        self.expect(Tok::Rbracket)?;
        sequence.drop_with_heap(self.heap);
        Ok(result)
    }

    /// The end bound of a slice; missing means the sequence length.
    fn slice_bound(&mut self, sequence: &Value) -> RunResult<i64> {
        if self.reader.token() == Tok::Rbracket {
            return ops::length(sequence, self.heap);
        }
        let bound = self.assignment_expr()?;
        let end = bound.as_int(self.heap)?;
        bound.drop_with_heap(self.heap);
        Ok(end)
    }

    fn primary_expr(&mut self) -> RunResult<Value> {
        match self.reader.token() {
            Tok::IntLit => {
                let value = Value::Int(str_to_int(self.reader.text()).map_err(|err| self.attach_loc(err))?);
                self.reader.next();
                Ok(value)
            }
            Tok::FloatLit => {
                let value = Value::Float(str_to_float(self.reader.text()).map_err(|err| self.attach_loc(err))?);
                self.reader.next();
                Ok(value)
            }
            Tok::CharLit => {
                let value = Value::Char(parse_char(self.reader.text()).map_err(|err| self.attach_loc(err))?);
                self.reader.next();
                Ok(value)
            }
            Tok::StrLit => {
                let value = self.heap.allocate(HeapData::Str(Str::from_str(self.reader.text())))?;
                self.reader.next();
                Ok(value)
            }
            Tok::Lbracket => self.list_display(),
            Tok::Lpar => {
                self.reader.next();
                let value = self.comma_expr()?;
                self.expect(Tok::Rpar)?;
                Ok(value)
            }
            Tok::Ident => self.identifier_expr(),
            other => Err(self.fail(
                ErrorKind::SyntaxError,
                format!("expected an expression instead of {other}"),
            )),
        }
    }

    /// '[' element (',' element)* ']' — a fresh list owning deep copies of
    /// its elements.
    fn list_display(&mut self) -> RunResult<Value> {
        self.expect(Tok::Lbracket)?;
        let mut list = List::new();
        if self.reader.token() != Tok::Rbracket {
            loop {
                let element = self.assignment_expr()?;
                let copy = element.deep_copy(self.heap).map_err(|err| self.attach_loc(err))?;
                element.drop_with_heap(self.heap);
                ops::push_element(&mut list, copy, self.heap)?;
                if !self.accept(Tok::Comma) {
                    break;
                }
            }
        }
        self.expect(Tok::Rbracket)?;
        self.heap.allocate(HeapData::List(list))
    }

    /// A name: either a variable read or, when followed by `(`, a call of
    /// the function bookmark bound to the name.
    fn identifier_expr(&mut self) -> RunResult<Value> {
        let name = self.reader.text().to_owned();
        self.reader.next();

        let slot = match self.scopes.lookup(&name) {
            None => return Err(self.attach_loc(ErrorKind::undeclared(&name))),
            Some(None) => return Err(self.attach_loc(ErrorKind::unbound(&name))),
            Some(Some(value)) => value.peek(),
        };

        if self.reader.token() == Tok::Lpar {
            if let Value::Ref(id) = &slot
                && let HeapData::Position(addr) = self.heap.get(*id)
            {
                let addr = *addr;
                return self.function_call(addr);
            }
            return Err(self.fail(ErrorKind::TypeError, format!("{name} is not a function")));
        }
        Ok(slot.clone_with_heap(self.heap))
    }
}
