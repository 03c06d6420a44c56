//! Whole-program scenarios run through the public API.

use pretty_assertions::assert_eq;
use rill::Runner;

fn run(source: &str) -> String {
    Runner::run_to_string(source).expect("program should run cleanly")
}

#[test]
fn functions_may_be_called_before_their_definition() {
    let out = run("int x\nx = f(3)\nprint x\ndef f(n)\n    return n * n\n");
    assert_eq!(out, "9");
}

#[test]
fn while_loops_stop_at_break() {
    let out = run("int i\ni = 0\nwhile 1\n    if i == 3\n        break\n    i = i + 1\nprint i\n");
    assert_eq!(out, "3");
}

#[test]
fn for_iterates_over_string_characters() {
    let out = run("str s\ns = \"ab\"\nfor c in s\n    print c\n");
    assert_eq!(out, "ab");
}

#[test]
fn numeric_coercion_follows_the_wider_operand() {
    assert_eq!(run("print 1 + 2.5\n"), "3.5");
    assert_eq!(run("print 1 / 2\n"), "0");
    assert_eq!(run("print 1.0 / 2\n"), "0.5");
}

#[test]
fn list_repetition_and_deep_equality() {
    let out = run("list a\na = [1,2] * 3\nprint a == [1,2,1,2,1,2]\n");
    assert_eq!(out, "1");
}

#[test]
fn recursion_with_return_values() {
    let out = run("def fact(n)\n    if n <= 1\n        return 1\n    return n * fact(n - 1)\nprint fact(5)\n");
    assert_eq!(out, "120");
}

#[test]
fn do_while_runs_the_body_before_the_test() {
    let out = run("int i\ni = 5\ndo\n    i = i + 1\nwhile i < 3\nprint i\n");
    assert_eq!(out, "6");
}

#[test]
fn continue_skips_the_rest_of_the_iteration() {
    let source = "list a\na = [1,2,3]\nint total\ntotal = 0\nfor x in a\n    if x == 2\n        continue\n    total = total + x\nprint total\n";
    assert_eq!(run(source), "4");
}

#[test]
fn else_branch_runs_when_the_condition_is_false() {
    let source = "int x\nx = 0\nif x\n    print \"then\"\nelse\n    print \"else\"\n";
    assert_eq!(run(source), "else");
}

#[test]
fn nested_loops_each_own_their_break() {
    let source = "int i, hits, j\nhits = 0\nfor i in [1,2,3]\n    j = 0\n    while 1\n        j = j + 1\n        if j == 2\n            break\n    hits = hits + j\nprint hits\n";
    assert_eq!(run(source), "6");
}

#[test]
fn a_clean_run_leaves_the_heap_empty() {
    let source = "list a\na = [1, 2, 3]\nstr s\ns = \"xyz\" * 2\ndef f(n)\n    return n + 1\nint x\nx = f(41)\nprint x\n";
    let mut runner = Runner::new(source, "leakcheck.rl").unwrap();
    let mut print = rill::CollectStringPrint::new();
    let mut input = rill::QueuedLines::default();
    runner.run(&mut print, &mut input).unwrap();
    assert_eq!(print.output(), "42");
    assert_eq!(runner.live_objects(), 0, "leak: {}", runner.dump_objects());
}

#[test]
fn top_level_return_stops_the_program() {
    let out = run("print \"a\"\nreturn\nprint \"b\"\n");
    assert_eq!(out, "a");
}

#[test]
fn import_runs_the_imported_module_once() {
    let dir = std::env::temp_dir().join(format!("rill-import-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let module = dir.join("twice.rl");
    std::fs::write(&module, "print \"loaded\"\ndef double(n)\n    return n * 2\n").unwrap();

    let path = module.to_str().unwrap();
    let source = format!("import \"{path}\"\nimport \"{path}\"\nprint double(21)\n");
    assert_eq!(run(&source), "loaded42");

    std::fs::remove_dir_all(&dir).ok();
}
