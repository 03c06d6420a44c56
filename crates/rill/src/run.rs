//! Public interface for running rill code.

use std::fs;

use crate::{
    error::{ErrorKind, RunResult},
    heap::{Heap, HeapStats},
    io::{CollectStringPrint, LineSource, PrintWriter, QueuedLines},
    parser::Interp,
    reader::SourceReader,
    scope::Scopes,
};

/// Primary interface for running rill code.
///
/// A `Runner` owns the tokenized source, the value heap and the scope stack.
/// Construction tokenizes the source, so lexical errors surface before
/// execution; [`Runner::run`] performs the function discovery pass and then
/// executes the program against the given output writer and input source.
///
/// # Example
/// ```
/// use rill::{CollectStringPrint, QueuedLines, Runner};
///
/// let mut runner = Runner::new("print 6 * 7", "demo.rl").unwrap();
/// let mut print = CollectStringPrint::new();
/// let mut input = QueuedLines::default();
/// runner.run(&mut print, &mut input).unwrap();
/// assert_eq!(print.output(), "42");
/// ```
#[derive(Debug)]
pub struct Runner {
    reader: SourceReader,
    heap: Heap,
    scopes: Scopes,
}

impl Runner {
    /// Creates a runner by tokenizing the given source.
    ///
    /// # Errors
    /// Returns a `SyntaxError`/`ValueError` if the source cannot be
    /// tokenized.
    pub fn new(source: &str, script_name: &str) -> RunResult<Self> {
        Ok(Self {
            reader: SourceReader::from_source(source, script_name)?,
            heap: Heap::new(),
            scopes: Scopes::new(),
        })
    }

    /// Creates a runner from a script file.
    pub fn from_file(path: &str) -> RunResult<Self> {
        let source = fs::read_to_string(path)
            .map_err(|err| ErrorKind::SystemError.msg(format!("cannot read {path}: {err}")))?;
        Self::new(&source, path)
    }

    /// Caps the number of live heap objects; exceeding the cap raises
    /// `OutOfMemoryError` at the allocation site.
    #[must_use]
    pub fn with_heap_limit(mut self, max_live: usize) -> Self {
        self.heap = Heap::with_limit(max_live);
        self
    }

    /// Runs the program: function discovery first, then the statement loop.
    ///
    /// All bindings are released afterwards, so on a clean run the heap ends
    /// empty — anything still live is a leak and shows up in
    /// [`Runner::heap_stats`].
    pub fn run(&mut self, print: &mut impl PrintWriter, input: &mut impl LineSource) -> RunResult<()> {
        let mut interp = Interp {
            reader: &mut self.reader,
            heap: &mut self.heap,
            scopes: &mut self.scopes,
            print,
            input,
        };
        let result = interp.run();
        self.scopes.clear(&mut self.heap);
        result
    }

    /// Convenience: runs `source` with no stdin and returns what it printed.
    pub fn run_to_string(source: &str) -> RunResult<String> {
        Self::run_with_input(source, &[])
    }

    /// Convenience: runs `source` feeding `lines` to `input` statements, and
    /// returns what it printed.
    pub fn run_with_input(source: &str, lines: &[&str]) -> RunResult<String> {
        let mut runner = Self::new(source, "main.rl")?;
        let mut print = CollectStringPrint::new();
        let mut input = QueuedLines::from_lines(lines);
        runner.run(&mut print, &mut input)?;
        Ok(print.into_output())
    }

    /// Snapshot of the heap state.
    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// Number of live heap objects (0 after a clean run).
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.heap.live_objects()
    }

    /// The live-object listing, one `object;refcount;kind;value` line per
    /// object. After a run this is the leak report.
    #[must_use]
    pub fn dump_objects(&self) -> String {
        self.heap.dump_dsv()
    }
}
