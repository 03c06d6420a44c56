//! Operations on values: arithmetic, comparison, logical, sequence.
//!
//! Every operation reads its operands (callers keep ownership) and returns a
//! freshly allocated result the caller must release; the one exception is
//! [`Value::to_str_value`] on an already-`str` input, which shares. List-node
//! operands are transparently unwrapped to their inner value before dispatch.
//!
//! Unary operators take one operand (`-` negates, `+` is the identity, `!`
//! negates logically). Binary operators cover arithmetic (`+ - * / %`),
//! comparison (`== != < <= > >= in`) and logic (`and or`). Which combinations
//! are accepted depends on the operand kinds; numeric operands widen along
//! `char < int < float`, and comparison and logical results are always an
//! `int` 0 or 1 because the language has no boolean kind.

use crate::{
    error::{ErrorKind, RunResult},
    heap::{DropWithHeap, Heap, HeapData, HeapId},
    types::{List, ListNode, Str, clamp_slice, normalize_index},
    value::{Kind, Value},
};

/// A pair of numeric operands widened to their common kind.
enum NumPair {
    Chars(u8, u8),
    Ints(i64, i64),
    Floats(f64, f64),
}

/// Widens two already-resolved operands along `char < int < float`.
fn numeric_pair(a: &Value, b: &Value) -> Option<NumPair> {
    Some(match (a, b) {
        (Value::Char(a), Value::Char(b)) => NumPair::Chars(*a, *b),
        (Value::Char(a), Value::Int(b)) => NumPair::Ints(i64::from(*a), *b),
        (Value::Int(a), Value::Char(b)) => NumPair::Ints(*a, i64::from(*b)),
        (Value::Int(a), Value::Int(b)) => NumPair::Ints(*a, *b),
        (Value::Float(a), Value::Float(b)) => NumPair::Floats(*a, *b),
        (Value::Float(a), Value::Char(b)) => NumPair::Floats(*a, f64::from(*b)),
        (Value::Char(a), Value::Float(b)) => NumPair::Floats(f64::from(*a), *b),
        (Value::Float(a), Value::Int(b)) => NumPair::Floats(*a, *b as f64),
        (Value::Int(a), Value::Float(b)) => NumPair::Floats(*a as f64, *b),
        _ => return None,
    })
}

fn resolved_pair(op1: &Value, op2: &Value, heap: &Heap) -> (Value, Value) {
    (op1.resolve(heap).peek(), op2.resolve(heap).peek())
}

/// result = op1 + op2
pub(crate) fn add(op1: &Value, op2: &Value, heap: &mut Heap) -> RunResult<Value> {
    let (a, b) = resolved_pair(op1, op2, heap);
    if let Some(pair) = numeric_pair(&a, &b) {
        return Ok(match pair {
            NumPair::Chars(a, b) => Value::Char(a.wrapping_add(b)),
            NumPair::Ints(a, b) => Value::Int(a.wrapping_add(b)),
            NumPair::Floats(a, b) => Value::Float(a + b),
        });
    }
    let (k1, k2) = (a.kind(heap), b.kind(heap));
    if k1 == Kind::Str || k2 == Kind::Str {
        // string concatenation converts the other side to its printed form
        let s1 = a.to_str_value(heap)?;
        let s2 = b.to_str_value(heap)?;
        let mut bytes = s1.as_str_view(heap)?.as_bytes().to_vec();
        bytes.extend_from_slice(s2.as_str_view(heap)?.as_bytes());
        s1.drop_with_heap(heap);
        s2.drop_with_heap(heap);
        return heap.allocate(HeapData::Str(Str::from_bytes(bytes)));
    }
    if k1 == Kind::List && k2 == Kind::List {
        let id1 = a.as_list_id(heap)?;
        let id2 = b.as_list_id(heap)?;
        return concat_lists(&[id1, id2], heap);
    }
    Err(ErrorKind::binary_type_error("+", k1, k2))
}

/// result = op1 - op2
pub(crate) fn sub(op1: &Value, op2: &Value, heap: &mut Heap) -> RunResult<Value> {
    let (a, b) = resolved_pair(op1, op2, heap);
    match numeric_pair(&a, &b) {
        Some(NumPair::Chars(a, b)) => Ok(Value::Char(a.wrapping_sub(b))),
        Some(NumPair::Ints(a, b)) => Ok(Value::Int(a.wrapping_sub(b))),
        Some(NumPair::Floats(a, b)) => Ok(Value::Float(a - b)),
        None => Err(ErrorKind::binary_type_error("-", a.kind(heap), b.kind(heap))),
    }
}

/// result = op1 * op2
///
/// Besides numeric multiplication this covers sequence repetition: a string
/// or list on either side repeated by the numeric side, coerced to `int`.
/// Non-positive counts give an empty sequence.
pub(crate) fn mul(op1: &Value, op2: &Value, heap: &mut Heap) -> RunResult<Value> {
    let (a, b) = resolved_pair(op1, op2, heap);
    if let Some(pair) = numeric_pair(&a, &b) {
        return Ok(match pair {
            NumPair::Chars(a, b) => Value::Char(a.wrapping_mul(b)),
            NumPair::Ints(a, b) => Value::Int(a.wrapping_mul(b)),
            NumPair::Floats(a, b) => Value::Float(a * b),
        });
    }
    let (k1, k2) = (a.kind(heap), b.kind(heap));
    let (seq, count) = if k1.is_numeric() && (k2 == Kind::Str || k2 == Kind::List) {
        (&b, a.as_int(heap)?)
    } else if k2.is_numeric() && (k1 == Kind::Str || k1 == Kind::List) {
        (&a, b.as_int(heap)?)
    } else {
        return Err(ErrorKind::binary_type_error("*", k1, k2));
    };
    let count = usize::try_from(count).unwrap_or(0);
    if seq.kind(heap) == Kind::Str {
        let bytes = seq.as_str_view(heap)?.as_bytes().repeat(count);
        heap.allocate(HeapData::Str(Str::from_bytes(bytes)))
    } else {
        let id = seq.as_list_id(heap)?;
        concat_lists(&vec![id; count], heap)
    }
}

/// result = op1 / op2
pub(crate) fn div(op1: &Value, op2: &Value, heap: &mut Heap) -> RunResult<Value> {
    let (a, b) = resolved_pair(op1, op2, heap);
    match numeric_pair(&a, &b) {
        Some(NumPair::Chars(a, b)) => {
            if b == 0 {
                return Err(ErrorKind::division_by_zero());
            }
            Ok(Value::Char(a / b))
        }
        Some(NumPair::Ints(a, b)) => {
            if b == 0 {
                return Err(ErrorKind::division_by_zero());
            }
            Ok(Value::Int(a.wrapping_div(b)))
        }
        Some(NumPair::Floats(a, b)) => {
            if b == 0.0 {
                return Err(ErrorKind::division_by_zero());
            }
            Ok(Value::Float(a / b))
        }
        None => Err(ErrorKind::binary_type_error("/", a.kind(heap), b.kind(heap))),
    }
}

/// result = op1 % op2 — the remainder's sign follows the dividend.
pub(crate) fn rem(op1: &Value, op2: &Value, heap: &mut Heap) -> RunResult<Value> {
    let (a, b) = resolved_pair(op1, op2, heap);
    match numeric_pair(&a, &b) {
        Some(NumPair::Chars(a, b)) => {
            if b == 0 {
                return Err(ErrorKind::division_by_zero());
            }
            Ok(Value::Char(a % b))
        }
        Some(NumPair::Ints(a, b)) => {
            if b == 0 {
                return Err(ErrorKind::division_by_zero());
            }
            Ok(Value::Int(a.wrapping_rem(b)))
        }
        Some(NumPair::Floats(a, b)) => {
            if b == 0.0 {
                return Err(ErrorKind::division_by_zero());
            }
            Ok(Value::Float(a % b))
        }
        None => Err(ErrorKind::binary_type_error("%", a.kind(heap), b.kind(heap))),
    }
}

/// result = 0 - op1
pub(crate) fn neg(op1: &Value, heap: &mut Heap) -> RunResult<Value> {
    match op1.resolve(heap).peek() {
        Value::Char(c) => Ok(Value::Char(c.wrapping_neg())),
        Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(ErrorKind::unary_type_error("-", other.kind(heap))),
    }
}

/// result = +op1 — the identity on numerics, still a fresh value.
pub(crate) fn plus(op1: &Value, heap: &mut Heap) -> RunResult<Value> {
    match op1.resolve(heap).peek() {
        keep @ (Value::Char(_) | Value::Int(_) | Value::Float(_)) => Ok(keep),
        other => Err(ErrorKind::unary_type_error("+", other.kind(heap))),
    }
}

/// result = !op1
pub(crate) fn not(op1: &Value, heap: &mut Heap) -> RunResult<Value> {
    match op1.resolve(heap).peek() {
        Value::Char(c) => Ok(Value::Int(i64::from(c == 0))),
        Value::Int(i) => Ok(Value::Int(i64::from(i == 0))),
        Value::Float(f) => Ok(Value::Int(i64::from(f == 0.0))),
        other => Err(ErrorKind::unary_type_error("!", other.kind(heap))),
    }
}

/// result = (int)(op1 == op2) — operands of different kinds are by
/// definition not equal.
pub(crate) fn eql(op1: &Value, op2: &Value, heap: &Heap) -> Value {
    Value::Int(i64::from(op1.eq_value(op2, heap)))
}

/// result = (int)(op1 != op2)
pub(crate) fn neq(op1: &Value, op2: &Value, heap: &Heap) -> Value {
    Value::Int(i64::from(!op1.eq_value(op2, heap)))
}

fn ordering(op: &str, op1: &Value, op2: &Value, heap: &Heap) -> RunResult<std::cmp::Ordering> {
    let (a, b) = resolved_pair(op1, op2, heap);
    match numeric_pair(&a, &b) {
        Some(NumPair::Chars(a, b)) => Ok(a.cmp(&b)),
        Some(NumPair::Ints(a, b)) => Ok(a.cmp(&b)),
        Some(NumPair::Floats(a, b)) => a
            .partial_cmp(&b)
            .ok_or_else(|| ErrorKind::ValueError.msg(format!("cannot order NAN with operation {op}"))),
        None => Err(ErrorKind::binary_type_error(op, a.kind(heap), b.kind(heap))),
    }
}

/// result = (int)(op1 < op2)
pub(crate) fn lss(op1: &Value, op2: &Value, heap: &Heap) -> RunResult<Value> {
    Ok(Value::Int(i64::from(ordering("<", op1, op2, heap)?.is_lt())))
}

/// result = (int)(op1 <= op2)
pub(crate) fn leq(op1: &Value, op2: &Value, heap: &Heap) -> RunResult<Value> {
    Ok(Value::Int(i64::from(ordering("<=", op1, op2, heap)?.is_le())))
}

/// result = (int)(op1 > op2)
pub(crate) fn gtr(op1: &Value, op2: &Value, heap: &Heap) -> RunResult<Value> {
    Ok(Value::Int(i64::from(ordering(">", op1, op2, heap)?.is_gt())))
}

/// result = (int)(op1 >= op2)
pub(crate) fn geq(op1: &Value, op2: &Value, heap: &Heap) -> RunResult<Value> {
    Ok(Value::Int(i64::from(ordering(">=", op1, op2, heap)?.is_ge())))
}

/// result = (int)(op1 and op2)
pub(crate) fn and(op1: &Value, op2: &Value, heap: &Heap) -> RunResult<Value> {
    let (a, b) = resolved_pair(op1, op2, heap);
    match numeric_pair(&a, &b) {
        Some(_) => Ok(Value::Int(i64::from(a.as_bool(heap)? && b.as_bool(heap)?))),
        None => Err(ErrorKind::binary_type_error("and", a.kind(heap), b.kind(heap))),
    }
}

/// result = (int)(op1 or op2)
pub(crate) fn or(op1: &Value, op2: &Value, heap: &Heap) -> RunResult<Value> {
    let (a, b) = resolved_pair(op1, op2, heap);
    match numeric_pair(&a, &b) {
        Some(_) => Ok(Value::Int(i64::from(a.as_bool(heap)? || b.as_bool(heap)?))),
        None => Err(ErrorKind::binary_type_error("or", a.kind(heap), b.kind(heap))),
    }
}

/// result = (int)(op1 in op2) — walks the sequence and stops at the first
/// `==` match.
pub(crate) fn contains(op1: &Value, op2: &Value, heap: &Heap) -> RunResult<Value> {
    let needle = op1.resolve(heap).peek();
    match op2.resolve(heap) {
        Value::Ref(id) => match heap.get(*id) {
            HeapData::Str(s) => {
                let found = s.as_bytes().iter().any(|b| needle.eq_value(&Value::Char(*b), heap));
                Ok(Value::Int(i64::from(found)))
            }
            HeapData::List(list) => {
                let ids = list.node_ids().to_vec();
                let found = ids.iter().any(|node_id| {
                    matches!(heap.get(*node_id), HeapData::Node(node) if needle.eq_value(&node.inner().peek(), heap))
                });
                Ok(Value::Int(i64::from(found)))
            }
            _ => Err(ErrorKind::not_subscriptable(op2.resolved_kind(heap))),
        },
        other => Err(ErrorKind::not_subscriptable(other.kind(heap))),
    }
}

/// item = sequence[index]
///
/// Negative indices are normalized by adding the length. String subscripts
/// yield a fresh `char`; list subscripts yield the element's node cell with
/// an added reference, so assigning through it mutates the list.
pub(crate) fn item(sequence: &Value, index: i64, heap: &mut Heap) -> RunResult<Value> {
    match sequence.resolve(heap).peek() {
        Value::Ref(id) => match heap.get(id) {
            HeapData::Str(s) => {
                let at = normalize_index(index, s.len()).ok_or_else(|| ErrorKind::index_error(Kind::Str))?;
                Ok(Value::Char(s.byte_at(at)))
            }
            HeapData::List(list) => {
                let at = normalize_index(index, list.len()).ok_or_else(|| ErrorKind::index_error(Kind::List))?;
                let node_id = list.node_at(at);
                heap.inc_ref(node_id);
                Ok(Value::Ref(node_id))
            }
            _ => Err(ErrorKind::not_subscriptable(sequence.resolved_kind(heap))),
        },
        other => Err(ErrorKind::not_subscriptable(other.kind(heap))),
    }
}

/// slice = sequence[start:end]
///
/// Bounds are normalized (negative counts from the end) then clamped to
/// `[0, len]`; an empty range gives an empty sequence.
pub(crate) fn slice(sequence: &Value, start: i64, end: i64, heap: &mut Heap) -> RunResult<Value> {
    match sequence.resolve(heap).peek() {
        Value::Ref(id) => match heap.get(id) {
            HeapData::Str(s) => {
                let (lo, hi) = clamp_slice(start, end, s.len());
                let bytes = s.slice_bytes(lo, hi);
                heap.allocate(HeapData::Str(Str::from_bytes(bytes)))
            }
            HeapData::List(list) => {
                let (lo, hi) = clamp_slice(start, end, list.len());
                let ids = list.node_ids()[lo..hi].to_vec();
                let mut out = List::new();
                for node_id in ids {
                    let inner = match heap.get(node_id) {
                        HeapData::Node(node) => node.inner().peek(),
                        _ => return Err(ErrorKind::SystemError.msg("list element is not a node")),
                    };
                    let copy = inner.deep_copy(heap)?;
                    push_element(&mut out, copy, heap)?;
                }
                heap.allocate(HeapData::List(out))
            }
            _ => Err(ErrorKind::not_subscriptable(sequence.resolved_kind(heap))),
        },
        other => Err(ErrorKind::not_subscriptable(other.kind(heap))),
    }
}

/// Number of items in a sequence.
pub(crate) fn length(sequence: &Value, heap: &Heap) -> RunResult<i64> {
    sequence
        .sequence_len(heap)
        .map(|len| i64::try_from(len).unwrap_or(i64::MAX))
        .ok_or_else(|| ErrorKind::not_subscriptable(sequence.resolved_kind(heap)))
}

/// Wraps `inner` in a fresh node cell and appends it to `list`.
pub(crate) fn push_element(list: &mut List, inner: Value, heap: &mut Heap) -> RunResult<()> {
    match heap.allocate(HeapData::Node(ListNode::new(inner)))? {
        Value::Ref(node_id) => {
            list.push_node(node_id);
            Ok(())
        }
        _ => unreachable!("allocate always returns a heap reference"),
    }
}

/// Builds a fresh list from the elements of `sources` in order, deep-copying
/// every element. Shared by list `+` and `*`.
fn concat_lists(sources: &[HeapId], heap: &mut Heap) -> RunResult<Value> {
    let mut out = List::new();
    for &source in sources {
        let ids = match heap.get(source) {
            HeapData::List(list) => list.node_ids().to_vec(),
            _ => return Err(ErrorKind::SystemError.msg("list operand is not a list")),
        };
        for node_id in ids {
            let inner = match heap.get(node_id) {
                HeapData::Node(node) => node.inner().peek(),
                _ => return Err(ErrorKind::SystemError.msg("list element is not a node")),
            };
            let copy = inner.deep_copy(heap)?;
            push_element(&mut out, copy, heap)?;
        }
    }
    heap.allocate(HeapData::List(out))
}

/// op1 = (kind of op1) op2
///
/// Assignment coercion: the declared kind of the target fixes the conversion.
/// Returns the coerced value for the caller to bind in the target's slot.
pub(crate) fn coerce_assign(target_kind: Kind, source: &Value, heap: &mut Heap) -> RunResult<Value> {
    match target_kind {
        Kind::Char => Ok(Value::Char(source.as_char(heap)?)),
        Kind::Int => Ok(Value::Int(source.as_int(heap)?)),
        Kind::Float => Ok(Value::Float(source.as_float(heap)?)),
        Kind::Str => source.to_str_value(heap),
        Kind::List => {
            source.as_list_id(heap)?;
            source.deep_copy(heap)
        }
        Kind::ListNode | Kind::Position | Kind::None => Err(ErrorKind::binary_type_error(
            "=",
            target_kind,
            source.resolved_kind(heap),
        )),
    }
}

/// Assigns through a node cell: the element takes a deep copy of `source`,
/// and the previous inner value is released.
pub(crate) fn assign_node(node_id: HeapId, source: &Value, heap: &mut Heap) -> RunResult<()> {
    let copy = source.deep_copy(heap)?;
    let old = match heap.get_mut(node_id) {
        HeapData::Node(node) => node.replace_inner(copy),
        _ => return Err(ErrorKind::SystemError.msg("assignment target is not a node")),
    };
    old.drop_with_heap(heap);
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn new_str(heap: &mut Heap, text: &str) -> Value {
        heap.allocate(HeapData::Str(Str::from_str(text))).unwrap()
    }

    fn new_list(heap: &mut Heap, items: &[i64]) -> Value {
        let mut list = List::new();
        for item in items {
            push_element(&mut list, Value::Int(*item), heap).unwrap();
        }
        heap.allocate(HeapData::List(list)).unwrap()
    }

    fn heap_id(value: &Value) -> HeapId {
        match value {
            Value::Ref(id) => *id,
            other => panic!("expected a heap value, got {other:?}"),
        }
    }

    fn as_int(value: &Value) -> i64 {
        match value {
            Value::Int(i) => *i,
            other => panic!("expected an int, got {other:?}"),
        }
    }

    #[test]
    fn numeric_results_take_the_wider_kind() {
        let mut heap = Heap::new();
        let cases: &[(Value, Value, Kind)] = &[
            (Value::Char(1), Value::Char(2), Kind::Char),
            (Value::Char(1), Value::Int(2), Kind::Int),
            (Value::Int(1), Value::Int(2), Kind::Int),
            (Value::Int(1), Value::Float(2.0), Kind::Float),
            (Value::Char(1), Value::Float(2.0), Kind::Float),
            (Value::Float(1.0), Value::Float(2.0), Kind::Float),
        ];
        for (a, b, expected) in cases {
            for op in [add, sub, mul, div, rem] {
                let result = op(a, b, &mut heap).unwrap();
                assert_eq!(result.kind(&heap), *expected);
            }
        }
    }

    #[test]
    fn comparisons_always_yield_int() {
        let mut heap = Heap::new();
        for result in [
            lss(&Value::Char(1), &Value::Float(2.0), &heap).unwrap(),
            geq(&Value::Float(3.0), &Value::Int(2), &heap).unwrap(),
            and(&Value::Float(1.0), &Value::Char(1), &heap).unwrap(),
            or(&Value::Int(0), &Value::Int(0), &heap).unwrap(),
        ] {
            assert_eq!(result.kind(&heap), Kind::Int);
            result.drop_with_heap(&mut heap);
        }
    }

    #[test]
    fn integer_division_truncates_and_float_division_does_not() {
        let mut heap = Heap::new();
        assert_eq!(as_int(&div(&Value::Int(1), &Value::Int(2), &mut heap).unwrap()), 0);
        match div(&Value::Float(1.0), &Value::Int(2), &mut heap).unwrap() {
            Value::Float(f) => assert_eq!(f, 0.5),
            other => panic!("expected a float, got {other:?}"),
        }
    }

    #[test]
    fn division_and_remainder_by_zero_raise_value_error() {
        let mut heap = Heap::new();
        for op in [div, rem] {
            let err = op(&Value::Int(1), &Value::Int(0), &mut heap).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValueError);
            let err = op(&Value::Float(1.0), &Value::Float(0.0), &mut heap).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValueError);
        }
    }

    #[test]
    fn remainder_sign_follows_the_dividend() {
        let mut heap = Heap::new();
        assert_eq!(as_int(&rem(&Value::Int(-7), &Value::Int(2), &mut heap).unwrap()), -1);
        assert_eq!(as_int(&rem(&Value::Int(7), &Value::Int(-2), &mut heap).unwrap()), 1);
    }

    #[test]
    fn operators_leave_operand_refcounts_unchanged() {
        let mut heap = Heap::new();
        let s = new_str(&mut heap, "ab");
        let t = new_str(&mut heap, "cd");
        let before = (heap.refcount(heap_id(&s)), heap.refcount(heap_id(&t)));

        let joined = add(&s, &t, &mut heap).unwrap();
        assert_eq!(heap.refcount(heap_id(&joined)), 1, "results are fresh with one reference");
        assert_eq!((heap.refcount(heap_id(&s)), heap.refcount(heap_id(&t))), before);

        joined.drop_with_heap(&mut heap);
        s.drop_with_heap(&mut heap);
        t.drop_with_heap(&mut heap);
        assert_eq!(heap.live_objects(), 0);
    }

    #[test]
    fn string_concat_converts_the_other_side() {
        let mut heap = Heap::new();
        let s = new_str(&mut heap, "n=");
        let joined = add(&s, &Value::Int(7), &mut heap).unwrap();
        assert_eq!(joined.as_str_view(&heap).unwrap().as_bytes(), b"n=7");
        joined.drop_with_heap(&mut heap);
        s.drop_with_heap(&mut heap);
    }

    #[test]
    fn concat_lengths_add_up() {
        let mut heap = Heap::new();
        let s = new_str(&mut heap, "abc");
        let t = new_str(&mut heap, "de");
        let joined = add(&s, &t, &mut heap).unwrap();
        assert_eq!(
            length(&joined, &heap).unwrap(),
            length(&s, &heap).unwrap() + length(&t, &heap).unwrap()
        );
        joined.drop_with_heap(&mut heap);

        let l1 = new_list(&mut heap, &[1, 2, 3]);
        let l2 = new_list(&mut heap, &[4]);
        let joined = add(&l1, &l2, &mut heap).unwrap();
        assert_eq!(length(&joined, &heap).unwrap(), 4);
        for value in [s, t, l1, l2, joined] {
            value.drop_with_heap(&mut heap);
        }
        assert_eq!(heap.live_objects(), 0);
    }

    #[test]
    fn repetition_length_law_holds_and_negative_counts_empty() {
        let mut heap = Heap::new();
        let s = new_str(&mut heap, "ab");
        for (count, expected) in [(3i64, 6i64), (0, 0), (-2, 0)] {
            let repeated = mul(&s, &Value::Int(count), &mut heap).unwrap();
            assert_eq!(length(&repeated, &heap).unwrap(), expected);
            repeated.drop_with_heap(&mut heap);
        }
        let list = new_list(&mut heap, &[1, 2]);
        let repeated = mul(&Value::Int(3), &list, &mut heap).unwrap();
        assert_eq!(length(&repeated, &heap).unwrap(), 6);
        repeated.drop_with_heap(&mut heap);
        list.drop_with_heap(&mut heap);
        s.drop_with_heap(&mut heap);
    }

    #[test]
    fn negative_subscripts_normalize_by_length() {
        let mut heap = Heap::new();
        let s = new_str(&mut heap, "abc");
        let len = length(&s, &heap).unwrap();
        for i in -len..0 {
            let a = item(&s, i, &mut heap).unwrap();
            let b = item(&s, i + len, &mut heap).unwrap();
            assert!(a.eq_value(&b, &heap));
            a.drop_with_heap(&mut heap);
            b.drop_with_heap(&mut heap);
        }
        s.drop_with_heap(&mut heap);
    }

    #[test]
    fn out_of_range_subscripts_raise_index_error() {
        let mut heap = Heap::new();
        let s = new_str(&mut heap, "abc");
        for bad in [3, -4, 100] {
            let err = item(&s, bad, &mut heap).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::IndexError);
        }
        s.drop_with_heap(&mut heap);
    }

    #[test]
    fn full_slice_equals_the_source_and_inverted_bounds_are_empty() {
        let mut heap = Heap::new();
        let list = new_list(&mut heap, &[1, 2, 3]);
        let len = length(&list, &heap).unwrap();

        let full = slice(&list, 0, len, &mut heap).unwrap();
        assert!(full.eq_value(&list, &heap));
        assert_ne!(heap_id(&full), heap_id(&list), "slices are fresh copies");

        let empty = slice(&list, 2, 1, &mut heap).unwrap();
        assert_eq!(length(&empty, &heap).unwrap(), 0);

        let clamped = slice(&list, -10, 100, &mut heap).unwrap();
        assert!(clamped.eq_value(&list, &heap));

        for value in [full, empty, clamped, list] {
            value.drop_with_heap(&mut heap);
        }
        assert_eq!(heap.live_objects(), 0);
    }

    #[test]
    fn list_subscript_returns_the_node_cell() {
        let mut heap = Heap::new();
        let list = new_list(&mut heap, &[10, 20]);
        let cell = item(&list, 1, &mut heap).unwrap();
        assert_eq!(cell.kind(&heap), Kind::ListNode);
        assert!(cell.eq_value(&Value::Int(20), &heap), "nodes unwrap transparently");

        assign_node(heap_id(&cell), &Value::Int(99), &mut heap).unwrap();
        let reread = item(&list, 1, &mut heap).unwrap();
        assert!(reread.eq_value(&Value::Int(99), &heap), "assignment through the cell mutates the list");

        for value in [cell, reread, list] {
            value.drop_with_heap(&mut heap);
        }
        assert_eq!(heap.live_objects(), 0);
    }

    #[test]
    fn contains_walks_strings_and_lists() {
        let mut heap = Heap::new();
        let s = new_str(&mut heap, "abc");
        assert_eq!(as_int(&contains(&Value::Char(b'b'), &s, &heap).unwrap()), 1);
        assert_eq!(as_int(&contains(&Value::Char(b'z'), &s, &heap).unwrap()), 0);

        let list = new_list(&mut heap, &[1, 2, 3]);
        assert_eq!(as_int(&contains(&Value::Int(2), &list, &heap).unwrap()), 1);
        assert_eq!(as_int(&contains(&Value::Float(2.0), &list, &heap).unwrap()), 1);
        assert_eq!(as_int(&contains(&Value::Int(9), &list, &heap).unwrap()), 0);

        let err = contains(&Value::Int(1), &Value::Int(2), &heap).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeError);

        s.drop_with_heap(&mut heap);
        list.drop_with_heap(&mut heap);
    }

    #[test]
    fn cross_kind_equality_is_false_and_ordering_is_an_error() {
        let mut heap = Heap::new();
        let s = new_str(&mut heap, "1");
        assert_eq!(as_int(&eql(&s, &Value::Int(1), &heap)), 0);
        assert_eq!(as_int(&neq(&s, &Value::Int(1), &heap)), 1);
        let err = lss(&s, &Value::Int(1), &heap).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeError);
        s.drop_with_heap(&mut heap);
    }

    #[test]
    fn list_equality_is_deep() {
        let mut heap = Heap::new();
        let a = new_list(&mut heap, &[1, 2]);
        let b = new_list(&mut heap, &[1, 2]);
        let c = new_list(&mut heap, &[1, 3]);
        assert_eq!(as_int(&eql(&a, &b, &heap)), 1);
        assert_eq!(as_int(&eql(&a, &c, &heap)), 0);
        assert_eq!(as_int(&neq(&a, &c, &heap)), 1);
        for value in [a, b, c] {
            value.drop_with_heap(&mut heap);
        }
    }

    #[test]
    fn to_str_value_shares_strings_and_is_idempotent() {
        let mut heap = Heap::new();
        let s = new_str(&mut heap, "xyz");
        let shared = s.to_str_value(&mut heap).unwrap();
        assert_eq!(heap_id(&shared), heap_id(&s), "str input is shared, not copied");
        assert_eq!(heap.refcount(heap_id(&s)), 2);

        let twice = shared.to_str_value(&mut heap).unwrap();
        assert!(twice.eq_value(&shared, &heap));

        for value in [
            Value::Int(-42),
            Value::Float(0.5),
            Value::Char(b'k'),
            Value::None,
        ] {
            let once = value.to_str_value(&mut heap).unwrap();
            let again = once.to_str_value(&mut heap).unwrap();
            assert_eq!(once.kind(&heap), Kind::Str);
            assert!(once.eq_value(&again, &heap));
            once.drop_with_heap(&mut heap);
            again.drop_with_heap(&mut heap);
            value.drop_with_heap(&mut heap);
        }

        twice.drop_with_heap(&mut heap);
        shared.drop_with_heap(&mut heap);
        s.drop_with_heap(&mut heap);
        assert_eq!(heap.live_objects(), 0);
    }

    #[test]
    fn char_to_string_round_trips() {
        let mut heap = Heap::new();
        for c in [b'a', b'Z', b'0'] {
            let s = Value::Char(c).to_str_value(&mut heap).unwrap();
            let first = item(&s, 0, &mut heap).unwrap();
            assert!(first.eq_value(&Value::Char(c), &heap));
            first.drop_with_heap(&mut heap);
            s.drop_with_heap(&mut heap);
        }
        assert_eq!(heap.live_objects(), 0);
    }

    #[test]
    fn assignment_coercion_follows_the_declared_kind() {
        let mut heap = Heap::new();
        let text = new_str(&mut heap, "42");
        assert_eq!(as_int(&coerce_assign(Kind::Int, &text, &mut heap).unwrap()), 42);

        let coerced = coerce_assign(Kind::Str, &Value::Float(2.5), &mut heap).unwrap();
        assert_eq!(coerced.as_str_view(&heap).unwrap().as_bytes(), b"2.5");
        coerced.drop_with_heap(&mut heap);

        let err = coerce_assign(Kind::List, &Value::Int(1), &mut heap).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueError);

        text.drop_with_heap(&mut heap);
    }
}
