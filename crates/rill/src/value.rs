use std::fmt::Write as _;

use strum::{Display, IntoStaticStr};

use crate::{
    error::{ErrorKind, RunResult},
    heap::{Heap, HeapData, HeapId},
    types::{List, ListNode, Str},
};

/// A value's primitive category.
///
/// The set is closed: every runtime value is exactly one of these. `char`,
/// `int` and `float` are the numeric kinds and coerce along
/// `char < int < float`; `str` and `list` are the sequence kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum Kind {
    #[strum(serialize = "char")]
    Char,
    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "float")]
    Float,
    #[strum(serialize = "str")]
    Str,
    #[strum(serialize = "list")]
    List,
    #[strum(serialize = "listnode")]
    ListNode,
    #[strum(serialize = "position")]
    Position,
    #[strum(serialize = "none")]
    None,
}

impl Kind {
    /// Whether this kind participates in numeric coercion.
    #[must_use]
    pub(crate) fn is_numeric(self) -> bool {
        matches!(self, Self::Char | Self::Int | Self::Float)
    }
}

/// A runtime value.
///
/// This enum uses a hybrid design: small immediate values (`char`, `int`,
/// `float`, `none`) are stored inline, while owning values (`str`, `list`,
/// list nodes, position bookmarks) live in the arena heap and are referenced
/// via `Ref(HeapId)`.
///
/// NOTE: `Clone` is intentionally NOT derived. Use [`Value::clone_with_heap`]
/// to duplicate a value, or [`Value::peek`] for a transient non-owning alias.
/// Direct cloning would bypass reference counting.
#[derive(Debug)]
pub enum Value {
    None,
    Char(u8),
    Int(i64),
    Float(f64),
    Ref(HeapId),
}

impl Value {
    /// The value's kind tag.
    #[must_use]
    pub(crate) fn kind(&self, heap: &Heap) -> Kind {
        match self {
            Self::None => Kind::None,
            Self::Char(_) => Kind::Char,
            Self::Int(_) => Kind::Int,
            Self::Float(_) => Kind::Float,
            Self::Ref(id) => match heap.get(*id) {
                HeapData::Str(_) => Kind::Str,
                HeapData::List(_) => Kind::List,
                HeapData::Node(_) => Kind::ListNode,
                HeapData::Position(_) => Kind::Position,
            },
        }
    }

    /// The kind after transparently unwrapping a list node.
    #[must_use]
    pub(crate) fn resolved_kind(&self, heap: &Heap) -> Kind {
        self.resolve(heap).kind(heap)
    }

    /// Follows a list-node reference to the inner value it stores.
    ///
    /// Every operation unwraps node operands first; non-node values resolve
    /// to themselves. Inner values are never nodes, so one step suffices.
    #[must_use]
    pub(crate) fn resolve<'a>(&'a self, heap: &'a Heap) -> &'a Self {
        if let Self::Ref(id) = self
            && let HeapData::Node(node) = heap.get(*id)
        {
            node.inner()
        } else {
            self
        }
    }

    /// Duplicates the value, adding a reference for heap values.
    #[must_use]
    pub(crate) fn clone_with_heap(&self, heap: &mut Heap) -> Self {
        if let Self::Ref(id) = self {
            heap.inc_ref(*id);
        }
        self.peek()
    }

    /// Bitwise copy without touching reference counts.
    ///
    /// The result is a non-owning alias: use it transiently while the owner
    /// is live, and never release it through the heap.
    #[must_use]
    pub(crate) fn peek(&self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Char(c) => Self::Char(*c),
            Self::Int(i) => Self::Int(*i),
            Self::Float(f) => Self::Float(*f),
            Self::Ref(id) => Self::Ref(*id),
        }
    }

    /// Allocates the default value of a declarable kind: zero for the numeric
    /// kinds, an empty string or list for the sequence kinds.
    pub(crate) fn default_of(kind: Kind, heap: &mut Heap) -> RunResult<Self> {
        match kind {
            Kind::Char => Ok(Self::Char(0)),
            Kind::Int => Ok(Self::Int(0)),
            Kind::Float => Ok(Self::Float(0.0)),
            Kind::Str => heap.allocate(HeapData::Str(Str::default())),
            Kind::List => heap.allocate(HeapData::List(List::new())),
            Kind::ListNode | Kind::Position | Kind::None => {
                Err(ErrorKind::SystemError.msg(format!("cannot allocate type {kind}")))
            }
        }
    }

    /// Deep-copies the value: scalars by value, strings by bytes, lists
    /// recursively. Nodes copy their inner value.
    ///
    /// Used for argument passing (by value) and list construction.
    pub(crate) fn deep_copy(&self, heap: &mut Heap) -> RunResult<Self> {
        let source = self.resolve(heap).peek();
        match source {
            Self::Char(_) | Self::Int(_) | Self::Float(_) => Ok(source),
            Self::Ref(id) => match heap.get(id) {
                HeapData::Str(s) => {
                    let bytes = s.as_bytes().to_vec();
                    heap.allocate(HeapData::Str(Str::from_bytes(bytes)))
                }
                HeapData::List(list) => {
                    let source_nodes = list.node_ids().to_vec();
                    let mut copy = List::new();
                    for node_id in source_nodes {
                        let inner = match heap.get(node_id) {
                            HeapData::Node(node) => node.inner().peek(),
                            _ => return Err(ErrorKind::SystemError.msg("list element is not a node")),
                        };
                        let inner_copy = inner.deep_copy(heap)?;
                        let node = heap.allocate(HeapData::Node(ListNode::new(inner_copy)))?;
                        match node {
                            Self::Ref(new_id) => copy.push_node(new_id),
                            _ => unreachable!("allocate always returns a heap reference"),
                        }
                    }
                    heap.allocate(HeapData::List(copy))
                }
                HeapData::Node(_) | HeapData::Position(_) => {
                    Err(ErrorKind::TypeError.msg(format!("cannot copy type {}", source.kind(heap))))
                }
            },
            Self::None => Err(ErrorKind::TypeError.msg("cannot copy type none")),
        }
    }

    /// Length of a sequence value, after node unwrapping.
    #[must_use]
    pub(crate) fn sequence_len(&self, heap: &Heap) -> Option<usize> {
        match self.resolve(heap) {
            Self::Ref(id) => match heap.get(*id) {
                HeapData::Str(s) => Some(s.len()),
                HeapData::List(list) => Some(list.len()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Full equality with numeric coercion: `char`/`int`/`float` compare as
    /// numbers, strings by bytes, lists element-wise. Values of incompatible
    /// kinds are by definition not equal.
    #[must_use]
    pub(crate) fn eq_value(&self, other: &Self, heap: &Heap) -> bool {
        let a = self.resolve(heap);
        let b = other.resolve(heap);
        match (a, b) {
            (Self::Char(c1), Self::Char(c2)) => c1 == c2,
            (Self::Int(i1), Self::Int(i2)) => i1 == i2,
            (Self::Char(c), Self::Int(i)) => i64::from(*c) == *i,
            (Self::Int(i), Self::Char(c)) => *i == i64::from(*c),
            (Self::Float(f1), Self::Float(f2)) => f1 == f2,
            (Self::Float(f), Self::Char(c)) => *f == f64::from(*c),
            (Self::Char(c), Self::Float(f)) => f64::from(*c) == *f,
            (Self::Float(f), Self::Int(i)) => *f == (*i as f64),
            (Self::Int(i), Self::Float(f)) => (*i as f64) == *f,
            (Self::Ref(id1), Self::Ref(id2)) => match (heap.get(*id1), heap.get(*id2)) {
                (HeapData::Str(s1), HeapData::Str(s2)) => s1.as_bytes() == s2.as_bytes(),
                (HeapData::List(l1), HeapData::List(l2)) => {
                    if l1.len() != l2.len() {
                        return false;
                    }
                    let ids1 = l1.node_ids().to_vec();
                    let ids2 = l2.node_ids().to_vec();
                    ids1.iter().zip(&ids2).all(|(n1, n2)| {
                        let (HeapData::Node(e1), HeapData::Node(e2)) = (heap.get(*n1), heap.get(*n2)) else {
                            return false;
                        };
                        e1.inner().peek().eq_value(&e2.inner().peek(), heap)
                    })
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Converts to a `char`, parsing one-character literals from strings.
    pub(crate) fn as_char(&self, heap: &Heap) -> RunResult<u8> {
        match self.resolve(heap) {
            Self::Char(c) => Ok(*c),
            Self::Int(i) => Ok(*i as u8),
            Self::Float(f) => Ok(*f as u8),
            Self::Ref(id) => match heap.get(*id) {
                HeapData::Str(s) => parse_char(&s.to_text()),
                _ => Err(ErrorKind::cannot_convert(self.resolved_kind(heap), "char")),
            },
            Self::None => Err(ErrorKind::cannot_convert(Kind::None, "char")),
        }
    }

    /// Converts to an `int`, truncating floats and parsing decimal strings.
    pub(crate) fn as_int(&self, heap: &Heap) -> RunResult<i64> {
        match self.resolve(heap) {
            Self::Char(c) => Ok(i64::from(*c)),
            Self::Int(i) => Ok(*i),
            Self::Float(f) => Ok(*f as i64),
            Self::Ref(id) => match heap.get(*id) {
                HeapData::Str(s) => str_to_int(&s.to_text()),
                _ => Err(ErrorKind::cannot_convert(self.resolved_kind(heap), "integer")),
            },
            Self::None => Err(ErrorKind::cannot_convert(Kind::None, "integer")),
        }
    }

    /// Converts to a `float`, widening integers and parsing decimal strings.
    pub(crate) fn as_float(&self, heap: &Heap) -> RunResult<f64> {
        match self.resolve(heap) {
            Self::Char(c) => Ok(f64::from(*c)),
            Self::Int(i) => Ok(*i as f64),
            Self::Float(f) => Ok(*f),
            Self::Ref(id) => match heap.get(*id) {
                HeapData::Str(s) => str_to_float(&s.to_text()),
                _ => Err(ErrorKind::cannot_convert(self.resolved_kind(heap), "float")),
            },
            Self::None => Err(ErrorKind::cannot_convert(Kind::None, "float")),
        }
    }

    /// Truthiness: non-zero for the numeric kinds. Strings, lists and `none`
    /// are not convertible and raise `ValueError`.
    pub(crate) fn as_bool(&self, heap: &Heap) -> RunResult<bool> {
        match self.resolve(heap) {
            Self::Char(c) => Ok(*c != 0),
            Self::Int(i) => Ok(*i != 0),
            Self::Float(f) => Ok(*f != 0.0),
            _ => Err(ErrorKind::cannot_convert(self.resolved_kind(heap), "bool")),
        }
    }

    /// Borrows the string payload; only `str` values convert.
    pub(crate) fn as_str_view<'a>(&'a self, heap: &'a Heap) -> RunResult<&'a Str> {
        match self.resolve(heap) {
            Self::Ref(id) => match heap.get(*id) {
                HeapData::Str(s) => Ok(s),
                _ => Err(ErrorKind::cannot_convert(self.resolved_kind(heap), "string")),
            },
            _ => Err(ErrorKind::cannot_convert(self.resolved_kind(heap), "string")),
        }
    }

    /// The heap id of a `list` value; only lists convert.
    pub(crate) fn as_list_id(&self, heap: &Heap) -> RunResult<HeapId> {
        match self.resolve(heap) {
            Self::Ref(id) if matches!(heap.get(*id), HeapData::List(_)) => Ok(*id),
            _ => Err(ErrorKind::cannot_convert(self.resolved_kind(heap), "list")),
        }
    }

    /// Produces the string representation as a new `str` value.
    ///
    /// For `str` inputs this shares: the same heap object is returned with an
    /// added reference. Every other kind allocates a fresh string: `int` as
    /// shortest signed decimal, `float` with 16 significant digits, `char` as
    /// the single character, `none` as `"None"`, lists as their printed form.
    pub(crate) fn to_str_value(&self, heap: &mut Heap) -> RunResult<Self> {
        let source = self.resolve(heap).peek();
        if let Self::Ref(id) = source
            && matches!(heap.get(id), HeapData::Str(_))
        {
            heap.inc_ref(id);
            return Ok(Self::Ref(id));
        }
        let text = match &source {
            Self::Char(c) => String::from(*c as char),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::None => String::from("None"),
            Self::Ref(_) => {
                let mut out = String::new();
                source.write_display(heap, &mut out);
                out
            }
        };
        heap.allocate(HeapData::Str(Str::from_str(&text)))
    }

    /// Writes the value's printed form.
    ///
    /// This is what the `print` statement emits: characters and strings print
    /// raw, lists print as `[a, b]`, position bookmarks print nothing.
    pub(crate) fn write_display(&self, heap: &Heap, out: &mut String) {
        match self {
            Self::None => out.push_str("none"),
            Self::Char(c) => out.push(*c as char),
            Self::Int(i) => {
                let _ = write!(out, "{i}");
            }
            Self::Float(f) => out.push_str(&format_float(*f)),
            Self::Ref(id) => match heap.get(*id) {
                HeapData::Str(s) => out.push_str(&s.to_text()),
                HeapData::Node(node) => node.inner().peek().write_display(heap, out),
                HeapData::Position(_) => {}
                HeapData::List(list) => {
                    out.push('[');
                    let ids = list.node_ids().to_vec();
                    for (i, node_id) in ids.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        if let HeapData::Node(node) = heap.get(*node_id) {
                            node.inner().peek().write_display(heap, out);
                        }
                    }
                    out.push(']');
                }
            },
        }
    }
}

/// Translates the character after a backslash in an escape sequence.
pub(crate) fn escape_byte(escape: u8) -> Option<u8> {
    match escape {
        b'0' => Some(0),
        b'b' => Some(8),
        b'f' => Some(12),
        b'n' => Some(b'\n'),
        b'r' => Some(b'\r'),
        b't' => Some(b'\t'),
        b'v' => Some(11),
        b'\\' => Some(b'\\'),
        b'\'' => Some(b'\''),
        b'"' => Some(b'"'),
        _ => None,
    }
}

/// Parses the content of a one-character literal, escapes included.
///
/// `content` is the raw text between the quotes. An unknown escape raises
/// `ValueError`; empty or multi-character content raises `SyntaxError`.
pub(crate) fn parse_char(content: &str) -> RunResult<u8> {
    let bytes = content.as_bytes();
    let (c, consumed) = if bytes.first() == Some(&b'\\') {
        let escape = bytes
            .get(1)
            .copied()
            .ok_or_else(|| ErrorKind::ValueError.msg("unknown escape sequence"))?;
        let c = escape_byte(escape)
            .ok_or_else(|| ErrorKind::ValueError.msg(format!("unknown escape sequence: {}", escape as char)))?;
        (c, 2)
    } else {
        match bytes.first() {
            None => return Err(ErrorKind::SyntaxError.msg("empty character constant")),
            Some(c) => (*c, 1),
        }
    };
    if bytes.len() > consumed {
        return Err(ErrorKind::SyntaxError.msg("too many characters in character constant"));
    }
    Ok(c)
}

/// Parses a base-10 integer with full consumption and overflow checking.
///
/// Surrounding whitespace is tolerated; anything else trailing raises
/// `ValueError`, as does overflow past the `int` range.
pub(crate) fn str_to_int(text: &str) -> RunResult<i64> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| ErrorKind::ValueError.msg(format!("cannot convert {text} to int")))
}

/// Parses a base-10 float with full consumption and overflow checking.
pub(crate) fn str_to_float(text: &str) -> RunResult<f64> {
    let value = text
        .trim()
        .parse::<f64>()
        .map_err(|_| ErrorKind::ValueError.msg(format!("cannot convert {text} to float")))?;
    if value.is_infinite() {
        return Err(ErrorKind::ValueError.msg(format!("cannot convert {text} to float; out of range")));
    }
    Ok(value)
}

/// Formats a float with 16 significant digits in `%G` style: fixed notation
/// for moderate exponents, scientific otherwise, trailing zeros trimmed.
#[must_use]
pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        return String::from("NAN");
    }
    if value.is_infinite() {
        return String::from(if value < 0.0 { "-INF" } else { "INF" });
    }
    if value == 0.0 {
        return String::from(if value.is_sign_negative() { "-0" } else { "0" });
    }

    let sci = format!("{value:.15e}");
    let (_, exp) = sci.split_once('e').expect("scientific notation always has an exponent");
    let exp: i32 = exp.parse().expect("float exponent is an integer");

    if (-4..16).contains(&exp) {
        let decimals = usize::try_from(15 - exp).expect("decimal count is non-negative in fixed range");
        trim_fraction(&format!("{value:.decimals$}")).to_owned()
    } else {
        let (mantissa, _) = sci.split_once('e').expect("checked above");
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}E{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    }
}

/// Strips trailing zeros (and a bare trailing point) from a decimal string.
fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn float_formatting_matches_16_digit_general_style() {
        assert_eq!(format_float(3.5), "3.5");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(2.0), "2");
        assert_eq!(format_float(-0.25), "-0.25");
        assert_eq!(format_float(0.0), "0");
        assert_eq!(format_float(1e15), "1000000000000000");
        assert_eq!(format_float(1e16), "1E+16");
        assert_eq!(format_float(1.5e-4), "0.00015");
        assert_eq!(format_float(1e-5), "1E-05");
        assert_eq!(format_float(1.2345e-7), "1.2345E-07");
    }

    #[test]
    fn float_formatting_rounds_to_16_significant_digits() {
        assert_eq!(format_float(1.0 / 3.0), "0.3333333333333333");
        assert_eq!(format_float(2.0 / 3.0), "0.6666666666666666");
    }

    #[test]
    fn char_literals_accept_the_escape_table() {
        assert_eq!(parse_char("a").unwrap(), b'a');
        assert_eq!(parse_char("\\n").unwrap(), b'\n');
        assert_eq!(parse_char("\\0").unwrap(), 0);
        assert_eq!(parse_char("\\\\").unwrap(), b'\\');
        assert_eq!(parse_char("\\'").unwrap(), b'\'');
    }

    #[test]
    fn bad_char_literals_raise_the_documented_kinds() {
        assert_eq!(parse_char("\\q").unwrap_err().kind(), ErrorKind::ValueError);
        assert_eq!(parse_char("").unwrap_err().kind(), ErrorKind::SyntaxError);
        assert_eq!(parse_char("ab").unwrap_err().kind(), ErrorKind::SyntaxError);
        assert_eq!(parse_char("\\na").unwrap_err().kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn int_parsing_requires_full_consumption() {
        assert_eq!(str_to_int("42").unwrap(), 42);
        assert_eq!(str_to_int("-7").unwrap(), -7);
        assert_eq!(str_to_int("  13  ").unwrap(), 13);
        assert!(str_to_int("42x").is_err());
        assert!(str_to_int("").is_err());
        assert!(str_to_int("99999999999999999999").is_err());
    }

    #[test]
    fn int_round_trips_through_its_string_form() {
        for n in [0i64, 1, -1, 42, i64::MAX, i64::MIN] {
            assert_eq!(str_to_int(&n.to_string()).unwrap(), n);
        }
    }

    #[test]
    fn float_parsing_rejects_garbage_and_overflow() {
        assert_eq!(str_to_float("0.5").unwrap(), 0.5);
        assert_eq!(str_to_float("1e3").unwrap(), 1000.0);
        assert!(str_to_float("1.2.3").is_err());
        assert!(str_to_float("1e999").is_err());
    }

    #[test]
    fn numeric_equality_coerces_across_kinds() {
        let heap = Heap::new();
        assert!(Value::Char(b'a').eq_value(&Value::Int(97), &heap));
        assert!(Value::Int(2).eq_value(&Value::Float(2.0), &heap));
        assert!(!Value::Int(2).eq_value(&Value::Float(2.5), &heap));
        assert!(!Value::None.eq_value(&Value::None, &heap));
    }
}
