//! Embedded Lua 5.4 interpreter.

use std::collections::BTreeMap;

use mlua::{Function, HookTriggers, Lua, MultiValue, Table, Value, Variadic, VmState};

use crate::{Binding, Interpreter, InterruptHandle, LineSink, OutputStream, ScriptError, SharedSink};

/// Instructions executed between two interrupt checks.
const INTERRUPT_CHECK_INTERVAL: u32 = 10_000;

const INTERRUPT_MESSAGE: &str = "evaluation interrupted";

pub struct LuaInterpreter {
    lua: Lua,
    stdout: SharedSink,
    stderr: SharedSink,
    interrupt: InterruptHandle,
}

impl std::fmt::Debug for LuaInterpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaInterpreter")
            .field("interrupted", &self.interrupt.is_interrupted())
            .finish_non_exhaustive()
    }
}

impl LuaInterpreter {
    pub fn new() -> Result<Self, ScriptError> {
        let lua = Lua::new();
        let stdout = LineSink::shared();
        let stderr = LineSink::shared();
        let interrupt = InterruptHandle::new();

        install_printer(&lua, "print", stdout.clone()).map_err(unavailable)?;
        install_printer(&lua, "eprint", stderr.clone()).map_err(unavailable)?;
        install_streams(&lua, stdout.clone(), stderr.clone()).map_err(unavailable)?;

        let flag = interrupt.clone();
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(INTERRUPT_CHECK_INTERVAL),
            move |_lua, _debug| {
                if flag.is_interrupted() {
                    Err(mlua::Error::RuntimeError(INTERRUPT_MESSAGE.to_string()))
                } else {
                    Ok(VmState::Continue)
                }
            },
        );

        tracing::debug!("lua interpreter ready");
        Ok(Self {
            lua,
            stdout,
            stderr,
            interrupt,
        })
    }
}

impl Interpreter for LuaInterpreter {
    fn language(&self) -> &str {
        "lua"
    }

    fn set_output(&mut self, stream: OutputStream, emit: Box<dyn FnMut(String)>) {
        let sink = match stream {
            OutputStream::Stdout => &self.stdout,
            OutputStream::Stderr => &self.stderr,
        };
        sink.borrow_mut().set_emitter(emit);
    }

    fn bind(&mut self, name: &str, value: Binding) -> Result<(), ScriptError> {
        let converted = to_lua(&self.lua, &value).map_err(|e| ScriptError::Binding {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.lua
            .globals()
            .set(name, converted)
            .map_err(|e| ScriptError::Binding {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    fn binding(&self, name: &str) -> Option<Binding> {
        let value: Value = self.lua.globals().get(name).ok()?;
        match value {
            Value::Nil => None,
            other => Some(from_lua(&other, 0)),
        }
    }

    fn eval(&mut self, code: &str) -> Result<Option<String>, ScriptError> {
        self.interrupt.reset();
        let outcome = self
            .lua
            .load(code)
            .set_name("=console")
            .eval::<MultiValue>();

        match outcome {
            Ok(values) => Ok(render_results(values)),
            Err(_) if self.interrupt.is_interrupted() => {
                self.interrupt.reset();
                Err(ScriptError::Interrupted)
            }
            Err(e) => Err(classify(&e)),
        }
    }

    fn flush(&mut self) {
        self.stdout.borrow_mut().flush();
        self.stderr.borrow_mut().flush();
    }

    fn interrupt_handle(&self) -> Option<InterruptHandle> {
        Some(self.interrupt.clone())
    }
}

// ────────────────────────────────────────────────────────────────────
// print / eprint / io
// ────────────────────────────────────────────────────────────────────

fn install_printer(lua: &Lua, name: &str, sink: SharedSink) -> mlua::Result<()> {
    let printer = lua.create_function(move |lua, args: Variadic<Value>| {
        let tostring: Function = lua.globals().get("tostring")?;
        let mut line = String::new();
        for (i, value) in args.into_iter().enumerate() {
            if i > 0 {
                line.push('\t');
            }
            let text: String = tostring.call(value)?;
            line.push_str(&text);
        }
        line.push('\n');
        sink.borrow_mut().write(&line);
        Ok(())
    })?;
    lua.globals().set(name, printer)
}

/// Replaces `io.write`, `io.stdout` and `io.stderr` so writes land in the
/// sinks instead of the host process's own streams.
fn install_streams(lua: &Lua, stdout: SharedSink, stderr: SharedSink) -> mlua::Result<()> {
    let io: Table = lua.globals().get("io")?;
    let out = stream_table(lua, stdout.clone())?;
    let err = stream_table(lua, stderr)?;

    let chained = out.clone();
    let write = lua.create_function(move |_, args: Variadic<Value>| {
        stdout.borrow_mut().write(&write_text(&args)?);
        Ok(chained.clone())
    })?;
    io.set("write", write)?;
    io.set("stdout", out)?;
    io.set("stderr", err)
}

fn stream_table(lua: &Lua, sink: SharedSink) -> mlua::Result<Table> {
    let stream = lua.create_table()?;
    let write = lua.create_function(move |_, (this, args): (Table, Variadic<Value>)| {
        sink.borrow_mut().write(&write_text(&args)?);
        Ok(this)
    })?;
    stream.set("write", write)?;
    stream.set("flush", lua.create_function(|_, this: Table| Ok(this))?)?;
    Ok(stream)
}

/// `io.write` accepts strings and numbers only.
fn write_text(args: &[Value]) -> mlua::Result<String> {
    let mut text = String::new();
    for (i, value) in args.iter().enumerate() {
        match value {
            Value::String(s) => text.push_str(&s.to_string_lossy()),
            Value::Integer(n) => text.push_str(&n.to_string()),
            Value::Number(n) => text.push_str(&n.to_string()),
            other => {
                return Err(mlua::Error::RuntimeError(format!(
                    "bad argument #{} to 'write' (string expected, got {})",
                    i + 1,
                    other.type_name()
                )));
            }
        }
    }
    Ok(text)
}

// ────────────────────────────────────────────────────────────────────
// Conversions
// ────────────────────────────────────────────────────────────────────

fn to_lua(lua: &Lua, binding: &Binding) -> mlua::Result<Value> {
    let value = match binding {
        Binding::Nil => Value::Nil,
        Binding::Bool(b) => Value::Boolean(*b),
        Binding::Int(i) => Value::Integer(*i),
        Binding::Float(f) => Value::Number(*f),
        Binding::Str(s) => Value::String(lua.create_string(s)?),
        Binding::Table(entries) => {
            let table: Table = lua.create_table()?;
            for (key, entry) in entries {
                table.set(key.as_str(), to_lua(lua, entry)?)?;
            }
            Value::Table(table)
        }
    };
    Ok(value)
}

/// Nested tables deeper than this are cut off to guard against cycles.
const MAX_TABLE_DEPTH: usize = 8;

fn from_lua(value: &Value, depth: usize) -> Binding {
    match value {
        Value::Nil => Binding::Nil,
        Value::Boolean(b) => Binding::Bool(*b),
        Value::Integer(i) => Binding::Int(*i),
        Value::Number(n) => Binding::Float(*n),
        Value::String(s) => Binding::Str(s.to_string_lossy().to_string()),
        Value::Table(t) if depth < MAX_TABLE_DEPTH => {
            let mut entries = BTreeMap::new();
            for pair in t.clone().pairs::<Value, Value>() {
                let Ok((key, entry)) = pair else { continue };
                let key = match key {
                    Value::String(s) => s.to_string_lossy().to_string(),
                    Value::Integer(i) => i.to_string(),
                    Value::Number(n) => format_number(n),
                    _ => continue,
                };
                entries.insert(key, from_lua(&entry, depth + 1));
            }
            Binding::Table(entries)
        }
        other => Binding::Str(other.type_name().to_string()),
    }
}

fn render_results(values: MultiValue) -> Option<String> {
    let rendered: Vec<String> = values
        .into_iter()
        .filter(|v| !v.is_nil())
        .map(|v| render_value(&v))
        .collect();
    if rendered.is_empty() {
        None
    } else {
        Some(rendered.join("\t"))
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.to_string_lossy().to_string(),
        other => format!("{}: {:p}", other.type_name(), other.to_pointer()),
    }
}

/// Integral floats print without a trailing `.0`.
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

// ────────────────────────────────────────────────────────────────────
// Error massaging
// ────────────────────────────────────────────────────────────────────

fn classify(error: &mlua::Error) -> ScriptError {
    match error {
        mlua::Error::SyntaxError { message, .. } => ScriptError::Syntax(clean_message(message)),
        other => ScriptError::Runtime(clean_message(&root_message(other))),
    }
}

fn root_message(error: &mlua::Error) -> String {
    match error {
        mlua::Error::RuntimeError(message) => message.clone(),
        mlua::Error::CallbackError { cause, .. } => root_message(cause),
        other => other.to_string(),
    }
}

fn clean_message(message: &str) -> String {
    let head = message
        .split_once("\nstack traceback:")
        .map(|(head, _)| head)
        .unwrap_or(message);
    let head = head.strip_prefix("runtime error: ").unwrap_or(head);
    let head = head.strip_prefix("syntax error: ").unwrap_or(head);
    head.trim_end().to_string()
}

fn unavailable(error: mlua::Error) -> ScriptError {
    tracing::warn!(error = %error, "lua interpreter failed to initialize");
    ScriptError::Unavailable(format!("lua ({error})"))
}
