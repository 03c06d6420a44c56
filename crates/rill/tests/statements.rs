//! Statement-level behavior: declarations, assignment coercion, sequences,
//! print and input.

use pretty_assertions::assert_eq;
use rill::Runner;

fn run(source: &str) -> String {
    Runner::run_to_string(source).expect("program should run cleanly")
}

#[test]
fn declarations_take_default_values() {
    assert_eq!(run("int x\nprint x\n"), "0");
    assert_eq!(run("float f\nprint f\n"), "0");
    assert_eq!(run("str s\nprint s, \"|\"\n"), "|");
    assert_eq!(run("list l\nprint l\n"), "[]");
}

#[test]
fn one_line_declares_several_variables() {
    assert_eq!(run("int a, b = 2, c\nprint a, b, c\n"), "020");
}

#[test]
fn assignment_coerces_to_the_declared_kind() {
    assert_eq!(run("int x\nx = 2.9\nprint x\n"), "2");
    assert_eq!(run("float f\nf = 1\nprint f\n"), "1");
    assert_eq!(run("str s\ns = 42\nprint s + \"!\"\n"), "42!");
    assert_eq!(run("int n\nn = \"17\"\nprint n + 1\n"), "18");
    assert_eq!(run("char c\nc = 65\nprint c\n"), "A");
}

#[test]
fn assignment_is_an_expression_yielding_the_value() {
    assert_eq!(run("int a, b\na = b = 3\nprint a, b\n"), "33");
}

#[test]
fn print_writes_operands_without_separators() {
    assert_eq!(run("print 1, \" and \", 2\n"), "1 and 2");
    assert_eq!(run("print \"line\\n\"\n"), "line\n");
}

#[test]
fn char_literals_and_escapes() {
    assert_eq!(run("print 'x'\n"), "x");
    assert_eq!(run("char c\nc = '\\n'\nprint \"a\", c, \"b\"\n"), "a\nb");
    assert_eq!(run("print 'a' + 1\n"), "98");
}

#[test]
fn string_subscripts_and_slices() {
    assert_eq!(run("str s\ns = \"hello\"\nprint s[0], s[-1]\n"), "ho");
    assert_eq!(run("str s\ns = \"hello\"\nprint s[1:3]\n"), "el");
    assert_eq!(run("str s\ns = \"hello\"\nprint s[:2], s[3:]\n"), "helo");
    assert_eq!(run("str s\ns = \"hello\"\nprint s[4:2], \"|\"\n"), "|");
}

#[test]
fn list_subscripts_slices_and_concat() {
    assert_eq!(run("list l\nl = [1, 2, 3]\nprint l[1]\n"), "2");
    assert_eq!(run("list l\nl = [1, 2, 3]\nprint l[-1]\n"), "3");
    assert_eq!(run("list l\nl = [1, 2, 3] + [4]\nprint l\n"), "[1, 2, 3, 4]");
    assert_eq!(run("list l\nl = [1, 2, 3]\nprint l[1:]\n"), "[2, 3]");
}

#[test]
fn subscript_assignment_mutates_the_list() {
    assert_eq!(run("list l\nl = [1, 2, 3]\nl[1] = 9\nprint l\n"), "[1, 9, 3]");
    assert_eq!(run("list l\nl = [1, 2]\nl[-1] = 7\nprint l\n"), "[1, 7]");
}

#[test]
fn loop_variables_write_through_to_the_list() {
    let source = "list l\nl = [1, 2, 3]\nfor x in l\n    x = x * 10\nprint l\n";
    assert_eq!(run(source), "[10, 20, 30]");
}

#[test]
fn assignment_copies_lists_deeply() {
    let source = "list a, b\na = [1, 2]\nb = a\nb[0] = 9\nprint a, b\n";
    assert_eq!(run(source), "[1, 2][9, 2]");
}

#[test]
fn the_in_operator_searches_sequences() {
    assert_eq!(run("print 2 in [1, 2, 3]\n"), "1");
    assert_eq!(run("print 9 in [1, 2, 3]\n"), "0");
    assert_eq!(run("print 'e' in \"hello\"\n"), "1");
}

#[test]
fn comparison_chains_through_logical_operators() {
    assert_eq!(run("print 1 < 2 and 2 < 3\n"), "1");
    assert_eq!(run("print 1 > 2 or 0\n"), "0");
    assert_eq!(run("print !0, !5\n"), "10");
    assert_eq!(run("print 1 <> 2\n"), "1");
}

#[test]
fn input_converts_to_the_declared_kind() {
    let out = Runner::run_with_input("int x\ninput \"n? \" x\nprint x * 2\n", &["21"]).unwrap();
    assert_eq!(out, "n? 42");

    let out = Runner::run_with_input("str s\ninput s\nprint s, s\n", &["ab"]).unwrap();
    assert_eq!(out, "abab");

    let out = Runner::run_with_input("float f\ninput f\nprint f\n", &["0.25"]).unwrap();
    assert_eq!(out, "0.25");
}

#[test]
fn input_reads_one_line_per_item() {
    let out = Runner::run_with_input("int a, b\ninput a, b\nprint a + b\n", &["1", "2"]).unwrap();
    assert_eq!(out, "3");
}

#[test]
fn pass_does_nothing() {
    assert_eq!(run("if 1\n    pass\nprint \"ok\"\n"), "ok");
}

#[test]
fn parenthesized_expressions_override_precedence() {
    assert_eq!(run("print (1 + 2) * 3\n"), "9");
    assert_eq!(run("print -(2 + 3)\n"), "-5");
}

#[test]
fn float_printing_uses_16_significant_digits() {
    assert_eq!(run("print 1.0 / 3.0\n"), "0.3333333333333333");
    assert_eq!(run("print 2.0\n"), "2");
    assert_eq!(run("print 1e16\n"), "1E+16");
}
