//! Dispatch for `!directive` statements.
//!
//! Each directive gets its own `do_*` function taking the driver, the parsed
//! arguments, and (where the directive has a nested block) the shared anon
//! label cursor. Arguments are plain [`CallArg`]s; directives that take a
//! name as their first argument expect a bare string or identifier there,
//! named arguments (`start=`, `size=`, ...) are looked up by name.

use crate::ast::{AssignTarget, CallArg, Expr, Meta as MetaStmt, Stmt};
use crate::error::Error;
use crate::labels::AnonCursor;
use crate::macros::MacroDef;
use crate::pass::Driver;
use crate::section::Section;
use crate::value::Value;
use badass_util::EnumFromStr;

pub fn dispatch(driver: &mut Driver, directive: &MetaStmt, cursor: &mut AnonCursor) -> Result<(), Error> {
    match directive.name.as_str() {
        "section" => do_section(driver, directive, cursor),
        "byte" => do_emit(driver, &directive.args, EmitUnit::Byte),
        "word" => do_emit(driver, &directive.args, EmitUnit::Word),
        "byte3" => do_emit(driver, &directive.args, EmitUnit::Byte3),
        "text" => do_emit(driver, &directive.args, EmitUnit::Text),
        "fill" | "ds" => do_fill(driver, &directive.args),
        "align" => do_align(driver, &directive.args),
        "org" | "pc" => do_org(driver, &directive.args),
        "rept" => do_rept(driver, directive, cursor),
        "enum" => do_enum(driver, directive),
        "if" => do_if(driver, directive, cursor, IfKind::If),
        "ifdef" => do_if(driver, directive, cursor, IfKind::Ifdef),
        "ifndef" => do_if(driver, directive, cursor, IfKind::Ifndef),
        "define" => do_define(driver, &directive.args),
        "macro" => do_macro(driver, directive),
        "assert" => do_assert(driver, &directive.args),
        "log" => do_log(driver, &directive.args),
        "check" => do_check(driver, &directive.args),
        "encoding" => do_encoding(driver, &directive.args),
        "chartrans" => do_chartrans(driver, &directive.args),
        "include" => do_include(driver, &directive.args),
        "incbin" => do_incbin(driver, &directive.args),
        "script" => Ok(tracing::debug!("ignoring embedded script block, scripting is out of scope")),
        "run" => do_run(driver, &directive.args),
        "test" => do_test(driver, directive, cursor),
        other => Err(Error::Syntax(format!("unknown directive '!{other}'"))),
    }
}

fn directive_str_arg<'a>(args: &'a [CallArg], idx: usize) -> Option<&'a str> {
    args.get(idx).and_then(|a| match &a.value {
        Expr::Str(s) => Some(s.as_str()),
        Expr::Var(s) => Some(s.as_str()),
        _ => None,
    })
}

fn named_arg<'a>(args: &'a [CallArg], name: &str) -> Option<&'a Expr> {
    args.iter().find(|a| a.name.as_deref() == Some(name)).map(|a| &a.value)
}

fn named_str_arg<'a>(args: &'a [CallArg], name: &str) -> Option<&'a str> {
    named_arg(args, name).and_then(|e| match e {
        Expr::Str(s) => Some(s.as_str()),
        Expr::Var(s) => Some(s.as_str()),
        _ => None,
    })
}

fn arg_name(value: &Expr) -> Option<String> {
    match value {
        Expr::Str(s) => Some(s.clone()),
        Expr::Var(s) => Some(s.clone()),
        _ => None,
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, badass_util_derive::EnumFromStr)]
enum SectionFlag {
    NoStore,
    ToFile,
}

/// `!section name, start, pc` positionally, or `name=, start=, size=, in=,
/// pc=` named, plus the valueless flags `NoStore`/`ToFile`. Mirrors the
/// original's positional-then-named `parseArgs`.
fn do_section(driver: &mut Driver, directive: &MetaStmt, cursor: &mut AnonCursor) -> Result<(), Error> {
    if directive.args.is_empty() {
        return Err(Error::Syntax("!section requires at least a name".into()));
    }

    let mut name = None;
    let mut start = None;
    let mut pc = None;
    let mut size = None;
    let mut parent = None;
    let mut no_storage = false;
    let mut write_to_disk = false;
    let mut positional = 0;

    for a in &directive.args {
        match a.name.as_deref() {
            Some("name") => name = Some(arg_name(&a.value).ok_or_else(|| Error::Syntax("!section name must be a string or identifier".into()))?),
            Some("start") => start = Some(driver.eval_pub(&a.value)?.as_i64()? as u32),
            Some("size") => size = Some(driver.eval_pub(&a.value)?.as_i64()? as u32),
            Some("in") => parent = Some(arg_name(&a.value).ok_or_else(|| Error::Syntax("!section 'in' must be a string or identifier".into()))?),
            Some("pc") => pc = Some(driver.eval_pub(&a.value)?.as_i64()? as u32),
            Some(_) => {}
            None => match &a.value {
                Expr::Var(v) if SectionFlag::from_str(v) == Ok(SectionFlag::NoStore) => no_storage = true,
                Expr::Var(v) if SectionFlag::from_str(v) == Ok(SectionFlag::ToFile) => write_to_disk = true,
                _ => {
                    match positional {
                        0 => name = Some(arg_name(&a.value).ok_or_else(|| Error::Syntax("!section name must be a string or identifier".into()))?),
                        1 => start = Some(driver.eval_pub(&a.value)?.as_i64()? as u32),
                        2 => pc = Some(driver.eval_pub(&a.value)?.as_i64()? as u32),
                        _ => {}
                    }
                    positional += 1;
                }
            },
        }
    }

    let name = name.ok_or_else(|| Error::Syntax("!section requires a name".into()))?;

    if driver.sections.get_section(&name).is_none() {
        let mut section = match start.or(pc) {
            Some(s) => Section::new(name.clone(), s),
            None => Section::floating(name.clone()),
        };
        if let Some(sz) = size {
            section.size = Some(sz);
            section.flags.fixed_size = true;
        }
        if let Some(p) = parent {
            section.parent = Some(p);
        }
        section.flags.no_storage = no_storage;
        section.flags.write_to_disk = write_to_disk;
        driver.sections.add_section(section)?;
    }

    driver.sections.push_section(&name)?;
    if let Some(block) = &directive.block {
        driver.run_program_pub(block, cursor);
        driver.sections.pop_section()?;
    }
    Ok(())
}

enum EmitUnit {
    Byte,
    Word,
    Byte3,
    Text,
}

fn expand_numbers(v: &Value) -> Result<Vec<f64>, Error> {
    match v {
        Value::Number(n) => Ok(vec![*n]),
        Value::Numbers(v) => Ok(v.clone()),
        Value::Bytes(b) => Ok(b.iter().map(|&b| b as f64).collect()),
        other => Err(Error::Type(format!("{other} can not be emitted as a sequence of numbers"))),
    }
}

fn do_emit(driver: &mut Driver, args: &[CallArg], unit: EmitUnit) -> Result<(), Error> {
    for arg in args {
        let v = driver.eval_pub(&arg.value)?;
        match unit {
            EmitUnit::Byte => driver.emit_bytes(&v.to_bytes()?),
            EmitUnit::Text => match &v {
                Value::Str(s) => {
                    let bytes = text_bytes(driver, s);
                    driver.emit_bytes(&bytes);
                }
                other => driver.emit_bytes(&other.to_bytes()?),
            },
            EmitUnit::Word => {
                for n in expand_numbers(&v)? {
                    let n = n as i64 as u16;
                    driver.emit_bytes(&[n as u8, (n >> 8) as u8]);
                }
            }
            EmitUnit::Byte3 => {
                for n in expand_numbers(&v)? {
                    let n = n as i64 as u32;
                    driver.emit_bytes(&[n as u8, (n >> 8) as u8, (n >> 16) as u8]);
                }
            }
        }
    }
    Ok(())
}

fn text_bytes(driver: &Driver, s: &str) -> Vec<u8> {
    match driver.current_encoding.as_ref().and_then(|enc| driver.encodings.get(enc)) {
        Some(table) => s.chars().map(|c| *table.get(&c).unwrap_or(&(c as u32 as u8))).collect(),
        None => s.bytes().collect(),
    }
}

fn do_fill(driver: &mut Driver, args: &[CallArg]) -> Result<(), Error> {
    let count = driver
        .eval_pub(&args.first().ok_or_else(|| Error::Syntax("!fill/!ds requires a count".into()))?.value)?
        .as_i64()?;
    if count < 0 {
        return Err(Error::Range(format!("fill count may not be negative ({count})")));
    }
    let value = match args.get(1) {
        Some(a) => driver.eval_pub(&a.value)?.as_u8()?,
        None => 0,
    };
    for _ in 0..count {
        driver.emit_bytes(&[value]);
    }
    Ok(())
}

fn do_align(driver: &mut Driver, args: &[CallArg]) -> Result<(), Error> {
    let n = driver
        .eval_pub(&args.first().ok_or_else(|| Error::Syntax("!align requires a value".into()))?.value)?
        .as_i64()?;
    if n <= 0 {
        return Err(Error::Range(format!("!align requires a positive value, got {n}")));
    }
    let n = n as u32;
    let pc = driver.pc();
    let pad = (n - (pc % n)) % n;
    for _ in 0..pad {
        driver.emit_bytes(&[0]);
    }
    Ok(())
}

fn do_org(driver: &mut Driver, args: &[CallArg]) -> Result<(), Error> {
    let addr = driver
        .eval_pub(&args.first().ok_or_else(|| Error::Syntax("!org requires an address".into()))?.value)?
        .as_i64()? as u32;
    driver.sections.current_section_mut().set_pc(addr);
    Ok(())
}

/// `!rept count { body }`, `!rept name=count { body }` or `!rept vec { body }`:
/// binds the loop index under `i` (or the given name) each iteration, plus
/// `v` to the current element when the argument is itself an array.
fn do_rept(driver: &mut Driver, directive: &MetaStmt, cursor: &mut AnonCursor) -> Result<(), Error> {
    let arg = directive.args.first().ok_or_else(|| Error::Syntax("!rept requires a count".into()))?;
    let block = directive.block.as_ref().ok_or_else(|| Error::Syntax("!rept requires a body".into()))?;
    let index_var = arg.name.clone().unwrap_or_else(|| "i".to_string());
    let value = driver.eval_pub(&arg.value)?;

    let items: Option<Vec<Value>> = match &value {
        Value::Bytes(b) => Some(b.iter().map(|&n| Value::Number(n as f64)).collect()),
        Value::Numbers(n) => Some(n.iter().map(|&n| Value::Number(n)).collect()),
        _ => None,
    };
    let count = match &items {
        Some(v) => v.len(),
        None => {
            let n = value.as_i64()?;
            if n < 0 {
                return Err(Error::Range(format!("!rept count may not be negative ({n})")));
            }
            n as usize
        }
    };

    for i in 0..count {
        driver.symtab.set(&index_var, Value::Number(i as f64));
        if let Some(items) = &items {
            driver.symtab.set("v", items[i].clone());
        }
        driver.run_program_pub(block, cursor);
    }
    Ok(())
}

fn do_enum(driver: &mut Driver, directive: &MetaStmt) -> Result<(), Error> {
    let block = directive.block.as_ref().ok_or_else(|| Error::Syntax("!enum requires a body".into()))?;
    let mut value = match named_arg(&directive.args, "start") {
        Some(e) => driver.eval_pub(e)?.as_i64()?,
        None => 0,
    };
    for stmt in block {
        match stmt {
            Stmt::Label(name) => {
                driver.symtab.set(name, Value::Number(value as f64));
                value += 1;
            }
            Stmt::Assign { target: AssignTarget::Symbol(name), expr } => {
                value = driver.eval_pub(expr)?.as_i64()?;
                driver.symtab.set(name, Value::Number(value as f64));
                value += 1;
            }
            _ => return Err(Error::Syntax("!enum bodies may only contain labels".into())),
        }
    }
    Ok(())
}

enum IfKind {
    If,
    Ifdef,
    Ifndef,
}

fn do_if(driver: &mut Driver, directive: &MetaStmt, cursor: &mut AnonCursor, kind: IfKind) -> Result<(), Error> {
    let truthy = match kind {
        IfKind::If => {
            driver
                .eval_pub(&directive.args.first().ok_or_else(|| Error::Syntax("!if requires a condition".into()))?.value)?
                .as_number()?
                != 0.0
        }
        IfKind::Ifdef | IfKind::Ifndef => {
            let name = directive_str_arg(&directive.args, 0)
                .ok_or_else(|| Error::Syntax("!ifdef/!ifndef requires a symbol name".into()))?;
            let defined = driver.symtab.is_defined(name);
            matches!(kind, IfKind::Ifdef) == defined
        }
    };
    let branch = if truthy { directive.block.as_ref() } else { directive.else_block.as_ref() };
    if let Some(block) = branch {
        driver.run_program_pub(block, cursor);
    }
    Ok(())
}

fn do_define(driver: &mut Driver, args: &[CallArg]) -> Result<(), Error> {
    let name = directive_str_arg(args, 0).ok_or_else(|| Error::Syntax("!define requires a name".into()))?.to_string();
    let value = match args.get(1) {
        Some(a) => driver.eval_pub(&a.value)?,
        None => Value::Number(1.0),
    };
    driver.symtab.set(&name, value);
    Ok(())
}

fn do_macro(driver: &mut Driver, directive: &MetaStmt) -> Result<(), Error> {
    let name = directive_str_arg(&directive.args, 0).ok_or_else(|| Error::Syntax("!macro requires a name".into()))?.to_string();
    let params = directive.args[1..]
        .iter()
        .map(|a| match &a.value {
            Expr::Var(p) => Ok(p.clone()),
            _ => Err(Error::Syntax("macro parameters must be plain names".into())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let body = directive.block.clone().ok_or_else(|| Error::Syntax("!macro requires a body".into()))?;
    driver.macros.define(MacroDef { name, params, body })
}

fn do_assert(driver: &mut Driver, args: &[CallArg]) -> Result<(), Error> {
    let ok = driver
        .eval_pub(&args.first().ok_or_else(|| Error::Syntax("!assert requires a condition".into()))?.value)?
        .as_number()?
        != 0.0;
    if ok {
        return Ok(());
    }
    let message = match args.get(1) {
        Some(a) => driver.eval_pub(&a.value)?.to_string(),
        None => "assertion failed".to_string(),
    };
    Err(Error::Assert(message))
}

fn do_log(driver: &mut Driver, args: &[CallArg]) -> Result<(), Error> {
    let mut parts = Vec::with_capacity(args.len());
    for a in args {
        parts.push(driver.eval_pub(&a.value)?.to_string());
    }
    tracing::info!(target: "badass_asm::log", "{}", parts.join(" "));
    Ok(())
}

/// A delayed assertion (per the "!check" supplement): skipped while forward
/// references may still be unresolved, enforced only on the final pass, once
/// every symbol it touches is expected to hold its real value.
fn do_check(driver: &mut Driver, args: &[CallArg]) -> Result<(), Error> {
    if driver.symtab.undef_ok {
        return Ok(());
    }
    let ok = driver
        .eval_pub(&args.first().ok_or_else(|| Error::Syntax("!check requires a condition".into()))?.value)?
        .as_number()?
        != 0.0;
    if ok {
        return Ok(());
    }
    let message = match args.get(1) {
        Some(a) => driver.eval_pub(&a.value)?.to_string(),
        None => "check failed".to_string(),
    };
    Err(Error::Assert(message))
}

fn do_encoding(driver: &mut Driver, args: &[CallArg]) -> Result<(), Error> {
    let name = directive_str_arg(args, 0).ok_or_else(|| Error::Syntax("!encoding requires a name".into()))?.to_string();
    driver.encodings.entry(name.clone()).or_default();
    driver.current_encoding = Some(name);
    Ok(())
}

fn do_chartrans(driver: &mut Driver, args: &[CallArg]) -> Result<(), Error> {
    let encoding = directive_str_arg(args, 0)
        .ok_or_else(|| Error::Syntax("!chartrans requires an encoding name".into()))?
        .to_string();
    let ch = match args.get(1).map(|a| &a.value) {
        Some(Expr::Str(s)) => s.chars().next().ok_or_else(|| Error::Syntax("!chartrans character is empty".into()))?,
        _ => return Err(Error::Syntax("!chartrans requires a one-character string".into())),
    };
    let byte = driver
        .eval_pub(&args.get(2).ok_or_else(|| Error::Syntax("!chartrans requires a byte value".into()))?.value)?
        .as_u8()?;
    driver.encodings.entry(encoding).or_default().insert(ch, byte);
    Ok(())
}

fn do_include(driver: &mut Driver, args: &[CallArg]) -> Result<(), Error> {
    let path = directive_str_arg(args, 0).ok_or_else(|| Error::Syntax("!include requires a path".into()))?.to_string();
    let loader = driver
        .loader
        .clone()
        .ok_or_else(|| Error::Io(format!("no file loader configured, can not include '{path}'")))?;
    let parser = driver
        .parser
        .clone()
        .ok_or_else(|| Error::Io(format!("no parser configured, can not include '{path}'")))?;
    let bytes = loader(&path)?;
    let text = String::from_utf8(bytes).map_err(|e| Error::Syntax(format!("'{path}' is not valid UTF-8: {e}")))?;
    let program = parser(&text)?;
    let plan = crate::labels::plan(&program);
    let mut inner_cursor = AnonCursor::new(&plan);
    driver.run_program_pub(&program, &mut inner_cursor);
    Ok(())
}

fn do_incbin(driver: &mut Driver, args: &[CallArg]) -> Result<(), Error> {
    let path = directive_str_arg(args, 0).ok_or_else(|| Error::Syntax("!incbin requires a path".into()))?.to_string();
    let loader = driver
        .loader
        .clone()
        .ok_or_else(|| Error::Io(format!("no file loader configured, can not include '{path}'")))?;
    let mut bytes = loader(&path)?;
    if let Some(e) = named_arg(args, "start") {
        let start = driver.eval_pub(e)?.as_i64()? as usize;
        bytes = bytes
            .get(start..)
            .ok_or_else(|| Error::Range(format!("'{path}' has no data at offset {start}")))?
            .to_vec();
    }
    if let Some(e) = named_arg(args, "size") {
        let size = driver.eval_pub(e)?.as_i64()? as usize;
        bytes.truncate(size);
    }
    driver.emit_bytes(&bytes);
    Ok(())
}

/// Builds a flat memory image from every section's data at its
/// currently-known start address. Only an approximation before the final
/// layout pass runs, which is why `!run`/`!test` only actually execute once
/// `undef_ok` goes false.
fn build_image(driver: &Driver) -> sixfive::memory::DirectMemory {
    use sixfive::memory::Memory;
    let mut mem = sixfive::memory::DirectMemory::new();
    for section in driver.sections.sections() {
        if let Some(start) = section.start {
            mem.load(start as u16, &section.data);
        }
    }
    mem
}

fn do_run(driver: &mut Driver, args: &[CallArg]) -> Result<(), Error> {
    if driver.symtab.undef_ok {
        return Ok(());
    }
    let addr = driver
        .eval_pub(&args.first().ok_or_else(|| Error::Syntax("!run requires an address".into()))?.value)?
        .as_i64()? as u16;
    let max_cycles = match named_arg(args, "cycles") {
        Some(e) => driver.eval_pub(e)?.as_i64()? as u64,
        None => 1_000_000,
    };
    let into = named_str_arg(args, "into").unwrap_or("run").to_string();

    let mem = build_image(driver);
    let mut machine = sixfive::processor::Machine::new(mem, driver.cpu);
    machine.regs.pc = addr;
    let _ = machine.run_for(max_cycles);
    store_registers(driver, &into, &machine.regs);
    Ok(())
}

fn do_test(driver: &mut Driver, directive: &MetaStmt, cursor: &mut AnonCursor) -> Result<(), Error> {
    if driver.symtab.undef_ok {
        return Ok(());
    }
    let name = directive_str_arg(&directive.args, 0).ok_or_else(|| Error::Syntax("!test requires a name".into()))?.to_string();
    let addr = match named_arg(&directive.args, "at") {
        Some(e) => driver.eval_pub(e)?.as_i64()? as u16,
        None => return Err(Error::Syntax("!test requires an 'at' address".into())),
    };
    let max_cycles = match named_arg(&directive.args, "cycles") {
        Some(e) => driver.eval_pub(e)?.as_i64()? as u64,
        None => 1_000_000,
    };

    let mem = build_image(driver);
    let mut machine = sixfive::processor::Machine::new(mem, driver.cpu);
    machine.regs.pc = addr;
    if let Some(e) = named_arg(&directive.args, "a") {
        machine.regs.a = driver.eval_pub(e)?.as_u8()?;
    }
    if let Some(e) = named_arg(&directive.args, "x") {
        machine.regs.x = driver.eval_pub(e)?.as_u8()?;
    }
    if let Some(e) = named_arg(&directive.args, "y") {
        machine.regs.y = driver.eval_pub(e)?.as_u8()?;
    }
    let _ = machine.run_for(max_cycles);
    store_registers(driver, &format!("tests.{name}"), &machine.regs);

    if let Some(block) = &directive.block {
        driver.run_program_pub(block, cursor);
    }
    Ok(())
}

fn store_registers(driver: &mut Driver, prefix: &str, regs: &sixfive::register::Registers) {
    driver.symtab.set(&format!("{prefix}.a"), Value::Number(regs.a as f64));
    driver.symtab.set(&format!("{prefix}.x"), Value::Number(regs.x as f64));
    driver.symtab.set(&format!("{prefix}.y"), Value::Number(regs.y as f64));
    driver.symtab.set(&format!("{prefix}.sp"), Value::Number(regs.sp as f64));
    driver.symtab.set(&format!("{prefix}.pc"), Value::Number(regs.pc as f64));
    driver.symtab.set(&format!("{prefix}.p"), Value::Number(regs.status_byte() as f64));
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::CallArg;
    use crate::labels::plan;
    use crate::pass::{AssembleOptions, Driver};

    fn meta(name: &str, args: Vec<CallArg>, block: Option<Vec<Stmt>>) -> MetaStmt {
        MetaStmt { name: name.into(), args, block, else_block: None }
    }

    fn arg(e: Expr) -> CallArg {
        CallArg { name: None, value: e }
    }

    #[test]
    fn byte_directive_emits_one_byte_per_argument() {
        let mut driver = Driver::new(&AssembleOptions::default());
        let program = vec![];
        let p = plan(&program);
        let mut cursor = AnonCursor::new(&p);
        let d = meta("byte", vec![arg(Expr::Number(1.0)), arg(Expr::Number(2.0))], None);
        dispatch(&mut driver, &d, &mut cursor).unwrap();
        assert_eq!(driver.sections.current_section().data, vec![1, 2]);
    }

    #[test]
    fn word_directive_emits_little_endian() {
        let mut driver = Driver::new(&AssembleOptions::default());
        let program = vec![];
        let p = plan(&program);
        let mut cursor = AnonCursor::new(&p);
        let d = meta("word", vec![arg(Expr::Number(0x1234.0))], None);
        dispatch(&mut driver, &d, &mut cursor).unwrap();
        assert_eq!(driver.sections.current_section().data, vec![0x34, 0x12]);
    }

    #[test]
    fn fill_writes_requested_count_of_a_value() {
        let mut driver = Driver::new(&AssembleOptions::default());
        let program = vec![];
        let p = plan(&program);
        let mut cursor = AnonCursor::new(&p);
        let d = meta("fill", vec![arg(Expr::Number(3.0)), arg(Expr::Number(0xAA_u8 as f64))], None);
        dispatch(&mut driver, &d, &mut cursor).unwrap();
        assert_eq!(driver.sections.current_section().data, vec![0xAA, 0xAA, 0xAA]);
    }

    #[test]
    fn ifdef_runs_the_else_block_when_undefined() {
        let mut driver = Driver::new(&AssembleOptions::default());
        let program = vec![];
        let p = plan(&program);
        let mut cursor = AnonCursor::new(&p);
        let mut d = meta("ifdef", vec![arg(Expr::Var("missing".into()))], Some(vec![]));
        d.else_block = Some(vec![Stmt::Label("hit".into())]);
        dispatch(&mut driver, &d, &mut cursor).unwrap();
        assert!(driver.symtab.is_defined("hit"));
    }

    #[test]
    fn assert_false_condition_is_an_error() {
        let mut driver = Driver::new(&AssembleOptions::default());
        let program = vec![];
        let p = plan(&program);
        let mut cursor = AnonCursor::new(&p);
        let d = meta("assert", vec![arg(Expr::Number(0.0))], None);
        assert!(dispatch(&mut driver, &d, &mut cursor).is_err());
    }

    #[test]
    fn enum_assigns_sequential_values() {
        let mut driver = Driver::new(&AssembleOptions::default());
        let d = meta("enum", vec![], Some(vec![Stmt::Label("red".into()), Stmt::Label("green".into())]));
        dispatch(&mut driver, &d, &mut AnonCursor::new(&plan(&vec![]))).unwrap();
        assert_eq!(driver.symtab.get("red"), Some(Value::Number(0.0)));
        assert_eq!(driver.symtab.get("green"), Some(Value::Number(1.0)));
    }
}
