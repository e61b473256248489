use std::cell::RefCell;
use std::rc::Rc;

use conch_script::{
    Binding, InterpreterProvider, InterpreterRegistry, LineSink, OutputStream, ScriptError,
    TokenKind, highlighter_for,
};

fn collector() -> (Rc<RefCell<Vec<String>>>, Box<dyn FnMut(String)>) {
    let lines = Rc::new(RefCell::new(Vec::new()));
    let sink = lines.clone();
    (lines, Box::new(move |s| sink.borrow_mut().push(s)))
}

// ============================================================================
// LineSink Tests
// ============================================================================

#[test]
fn test_sink_holds_partial_line() {
    let (lines, emit) = collector();
    let mut sink = LineSink::new();
    sink.set_emitter(emit);
    sink.write("abc");
    assert!(lines.borrow().is_empty());
    assert_eq!(sink.pending(), "abc");
}

#[test]
fn test_sink_emits_on_newline_without_trailing_newline() {
    let (lines, emit) = collector();
    let mut sink = LineSink::new();
    sink.set_emitter(emit);
    sink.write("one\ntwo\nthr");
    assert_eq!(*lines.borrow(), vec!["one\ntwo".to_string()]);
    assert_eq!(sink.pending(), "thr");
}

#[test]
fn test_sink_flush_emits_pending() {
    let (lines, emit) = collector();
    let mut sink = LineSink::new();
    sink.set_emitter(emit);
    sink.write("partial");
    sink.flush();
    sink.flush();
    assert_eq!(*lines.borrow(), vec!["partial".to_string()]);
}

#[test]
fn test_sink_without_emitter_drops_output() {
    let mut sink = LineSink::new();
    sink.write("lost\n");
    assert_eq!(sink.pending(), "");
}

// ============================================================================
// Registry Tests
// ============================================================================

#[test]
fn test_registry_unknown_language_is_unavailable() {
    let registry = InterpreterRegistry::with_defaults();
    let err = registry.create("cobol").err();
    assert_eq!(err, Some(ScriptError::Unavailable("cobol".to_string())));
}

#[test]
fn test_registry_empty_knows_nothing() {
    let registry = InterpreterRegistry::new();
    assert!(registry.languages().is_empty());
    assert!(!registry.supports("lua"));
}

#[test]
fn test_registry_custom_factory_is_case_insensitive() {
    let mut registry = InterpreterRegistry::new();
    registry.register("Fake", || Err(ScriptError::Unavailable("fake".into())));
    assert!(registry.supports("FAKE"));
    assert_eq!(registry.languages(), vec!["fake".to_string()]);
}

// ============================================================================
// Binding Tests
// ============================================================================

#[test]
fn test_binding_table_lookup() {
    let host = Binding::table([("name", "conch".into()), ("build", Binding::Int(7))]);
    assert_eq!(host.get("name").and_then(Binding::as_str), Some("conch"));
    assert_eq!(host.get("build").and_then(Binding::as_int), Some(7));
    assert!(host.get("missing").is_none());
}

#[test]
fn test_binding_from_option() {
    let none: Option<String> = None;
    assert!(Binding::from(none).is_nil());
    assert_eq!(Binding::from(Some(2.5)), Binding::Float(2.5));
}

// ============================================================================
// Highlighter Tests
// ============================================================================

#[test]
fn test_highlight_lua_keywords_and_strings() {
    let hl = highlighter_for("lua").unwrap();
    let spans = hl.highlight("local s = \"hi\" -- note");
    let kinds: Vec<TokenKind> = spans.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Keyword,
            TokenKind::Identifier,
            TokenKind::Operator,
            TokenKind::String,
            TokenKind::Comment,
        ]
    );
    assert_eq!(spans[3].start, 10);
    assert_eq!(spans[3].len, 4);
}

#[test]
fn test_highlight_offsets_are_chars() {
    let hl = highlighter_for("lua").unwrap();
    let spans = hl.highlight("\"é\" 42");
    let number = spans.iter().find(|s| s.kind == TokenKind::Number).unwrap();
    assert_eq!(number.start, 4);
    assert_eq!(number.len, 2);
}

#[test]
fn test_highlight_shell_comment() {
    let hl = highlighter_for("shell").unwrap();
    let spans = hl.highlight("ls -la # list");
    assert_eq!(spans.last().map(|s| s.kind), Some(TokenKind::Comment));
}

#[test]
fn test_highlight_unknown_language() {
    assert!(highlighter_for("brainfuck").is_none());
}

// ============================================================================
// Lua Interpreter Tests
// ============================================================================

#[cfg(feature = "lua")]
mod lua {
    use super::*;

    fn lua() -> Box<dyn conch_script::Interpreter> {
        InterpreterRegistry::with_defaults().create("lua").unwrap()
    }

    #[test]
    fn test_lua_expression_result() {
        let mut interp = lua();
        assert_eq!(interp.eval("1 + 2").unwrap(), Some("3".to_string()));
    }

    #[test]
    fn test_lua_integral_float_drops_fraction() {
        let mut interp = lua();
        assert_eq!(interp.eval("10 / 2").unwrap(), Some("5".to_string()));
        assert_eq!(interp.eval("7 / 2").unwrap(), Some("3.5".to_string()));
    }

    #[test]
    fn test_lua_statement_has_no_result() {
        let mut interp = lua();
        assert_eq!(interp.eval("x = 5").unwrap(), None);
    }

    #[test]
    fn test_lua_globals_persist() {
        let mut interp = lua();
        interp.eval("counter = 41").unwrap();
        assert_eq!(interp.eval("counter + 1").unwrap(), Some("42".to_string()));
    }

    #[test]
    fn test_lua_print_goes_to_stdout_sink() {
        let mut interp = lua();
        let (out, emit) = collector();
        interp.set_output(OutputStream::Stdout, emit);
        interp.eval("print('a', 1)").unwrap();
        assert_eq!(*out.borrow(), vec!["a\t1".to_string()]);
    }

    #[test]
    fn test_lua_eprint_goes_to_stderr_sink() {
        let mut interp = lua();
        let (err, emit) = collector();
        interp.set_output(OutputStream::Stderr, emit);
        interp.eval("eprint('oops')").unwrap();
        interp.flush();
        assert_eq!(*err.borrow(), vec!["oops".to_string()]);
    }

    #[test]
    fn test_lua_io_write_is_captured() {
        let mut interp = lua();
        let (out, emit) = collector();
        interp.set_output(OutputStream::Stdout, emit);
        interp.eval("io.write('a', 1, '\\n'); io.write('tail')").unwrap();
        interp.flush();
        assert_eq!(*out.borrow(), vec!["a1".to_string(), "tail".to_string()]);
    }

    #[test]
    fn test_lua_io_stderr_write_is_captured() {
        let mut interp = lua();
        let (out, emit_out) = collector();
        let (err, emit_err) = collector();
        interp.set_output(OutputStream::Stdout, emit_out);
        interp.set_output(OutputStream::Stderr, emit_err);
        interp
            .eval("io.stderr:write('warn\\n'); io.stdout:write('x'):write('y\\n')")
            .unwrap();
        interp.flush();
        assert_eq!(*err.borrow(), vec!["warn".to_string()]);
        assert_eq!(*out.borrow(), vec!["xy".to_string()]);
    }

    #[test]
    fn test_lua_io_write_rejects_tables() {
        let mut interp = lua();
        let err = interp.eval("io.write({})").unwrap_err();
        assert!(matches!(err, ScriptError::Runtime(msg) if msg.contains("string expected")));
    }

    #[test]
    fn test_lua_runtime_error_is_cleaned() {
        let mut interp = lua();
        let err = interp.eval("error('boom')").unwrap_err();
        match err {
            ScriptError::Runtime(msg) => {
                assert!(msg.contains("boom"));
                assert!(!msg.contains("stack traceback"));
            }
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[test]
    fn test_lua_syntax_error() {
        let mut interp = lua();
        assert!(matches!(interp.eval("local = ="), Err(ScriptError::Syntax(_))));
    }

    #[test]
    fn test_lua_bind_and_read_back_table() {
        let mut interp = lua();
        let doc = Binding::table([("path", "/tmp/a.txt".into()), ("caret", Binding::Int(3))]);
        interp.bind("document", doc).unwrap();
        assert_eq!(
            interp.eval("document.path").unwrap(),
            Some("/tmp/a.txt".to_string())
        );
        let back = interp.binding("document").unwrap();
        assert_eq!(back.get("caret"), Some(&Binding::Int(3)));
    }

    #[test]
    fn test_lua_unbound_name_reads_none() {
        let interp = lua();
        assert!(interp.binding("nothing_here").is_none());
    }

    #[test]
    fn test_lua_interrupt_from_other_thread() {
        let mut interp = lua();
        let handle = interp.interrupt_handle().unwrap();
        let trip = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(100));
            handle.interrupt();
        });
        let result = interp.eval("while true do end");
        trip.join().unwrap();
        assert_eq!(result, Err(ScriptError::Interrupted));
        // The handle is re-armed for the next submission.
        assert_eq!(interp.eval("1").unwrap(), Some("1".to_string()));
    }
}
