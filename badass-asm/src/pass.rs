//! The multi-pass driver.
//!
//! Assembly runs the whole program repeatedly: each pass clears the symbol
//! table's per-pass bookkeeping but keeps section layout data, walks every
//! statement evaluating expressions and emitting bytes, then asks the
//! symbol table whether anything it read came back undefined or changed
//! value since the last time it was read. Passes stop once nothing is left
//! undefined, or `max_passes` is hit — the final pass runs with
//! `undef_ok = false` so a genuinely unresolvable symbol becomes a real
//! error instead of silently looping forever.

use crate::ast::{AssignTarget, CallArg, Expr, InstrArg, Meta as MetaStmt, Program, Stmt};
use crate::error::{Error, Located};
use crate::eval::{self, Context};
use crate::instruction;
use crate::labels::{self, AnonCursor, AnonPlan};
use crate::macros::{MacroDef, MacroTable};
use crate::meta;
use crate::section::{Section, SectionTable};
use crate::symtab::SymbolTable;
use sixfive::enums::Cpu;

pub struct AssembleOptions {
    pub max_passes: usize,
    pub cpu: Cpu,
    pub defines: Vec<(String, Option<String>)>,
    /// Logs the still-undefined symbol set at the end of every
    /// non-converging pass, for `badass --show-undefined`.
    pub show_undefined: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        AssembleOptions { max_passes: 10, cpu: Cpu::Mos6502, defines: Vec::new(), show_undefined: false }
    }
}

pub struct Driver {
    pub symtab: SymbolTable,
    pub sections: SectionTable,
    pub macros: MacroTable,
    pub cpu: Cpu,
    current_file: String,
    current_line: usize,
    errors: Vec<Located>,
    /// Reads a file's raw bytes, used by `!incbin` and (after decoding as
    /// text) `!include`. `None` in contexts with no filesystem, e.g. tests.
    pub loader: Option<std::rc::Rc<dyn Fn(&str) -> Result<Vec<u8>, Error>>>,
    /// Parses included source text back into a `Program` so `!include` can
    /// splice it in; set by the top-level entry point that already owns the
    /// grammar, avoiding a dependency cycle between `pass` and `grammar`.
    pub parser: Option<std::rc::Rc<dyn Fn(&str) -> Result<Program, Error>>>,
    /// `!chartrans` tables, keyed by encoding name, plus the name `!encoding`
    /// last switched to; `!text` consults this to translate characters to
    /// bytes instead of assuming ASCII.
    pub encodings: std::collections::HashMap<String, std::collections::HashMap<char, u8>>,
    pub current_encoding: Option<String>,
    show_undefined: bool,
}

pub struct AssembleReport {
    pub passes_run: usize,
}

impl Driver {
    pub fn new(options: &AssembleOptions) -> Driver {
        let mut symtab = SymbolTable::new();
        for (key, value) in &options.defines {
            let v = match value {
                Some(s) => s.parse::<f64>().map(crate::value::Value::Number).unwrap_or_else(|_| {
                    crate::value::Value::Str(std::rc::Rc::from(s.as_str()))
                }),
                None => crate::value::Value::Number(1.0),
            };
            symtab.set(key, v);
        }
        Driver {
            symtab,
            sections: SectionTable::new(),
            macros: MacroTable::new(),
            cpu: options.cpu,
            current_file: String::new(),
            current_line: 0,
            errors: Vec::new(),
            loader: None,
            parser: None,
            encodings: std::collections::HashMap::new(),
            current_encoding: None,
            show_undefined: options.show_undefined,
        }
    }

    pub fn fail_pub(&mut self, error: Error) {
        self.fail(error);
    }

    fn fail(&mut self, error: Error) {
        self.errors.push(Located {
            file: self.current_file.clone(),
            line: self.current_line,
            error,
        });
    }

    pub fn assemble(&mut self, file: &str, program: &Program, max_passes: usize) -> Result<AssembleReport, Vec<Located>> {
        self.current_file = file.to_string();
        let plan = labels::plan(program);

        for pass in 1..=max_passes {
            self.sections = SectionTable::new();
            self.symtab.clear();
            self.errors.clear();
            self.symtab.undef_ok = pass < max_passes;

            let mut cursor = AnonCursor::new(&plan);
            self.run_program(program, &mut cursor);

            if !self.errors.is_empty() {
                if pass == max_passes {
                    return Err(std::mem::take(&mut self.errors));
                }
                continue;
            }

            self.symtab.resolve();

            if self.show_undefined && !self.symtab.done() {
                tracing::info!(pass, undefined = ?self.symtab.get_undefined(), "pass did not converge");
            }

            if self.symtab.done() {
                if let Err(e) = self.sections.layout_sections() {
                    self.fail(e);
                    return Err(std::mem::take(&mut self.errors));
                }
                return Ok(AssembleReport { passes_run: pass });
            }

            if pass == max_passes {
                let undefined: Vec<String> = self.symtab.get_undefined().iter().cloned().collect();
                self.fail(Error::Undefined(undefined.join(", ")));
                return Err(std::mem::take(&mut self.errors));
            }
        }

        unreachable!("loop always returns by the final pass")
    }

    pub fn pc(&self) -> u32 {
        self.sections.get_pc()
    }

    fn ctx(&mut self) -> Context<'_> {
        Context { symtab: &mut self.symtab, pc: self.pc() }
    }

    fn eval(&mut self, expr: &Expr) -> Result<crate::value::Value, Error> {
        let mut ctx = self.ctx();
        eval::eval(&mut ctx, expr)
    }

    fn run_program(&mut self, program: &Program, cursor: &mut AnonCursor) {
        for stmt in program {
            self.run_stmt(stmt, cursor);
        }
    }

    fn run_stmt(&mut self, stmt: &Stmt, cursor: &mut AnonCursor) {
        match stmt {
            Stmt::Label(name) => self.define_label(name, cursor),
            Stmt::Assign { target, expr } => self.run_assign(target, expr),
            Stmt::Instruction { label, mnemonic, suffix, arg } => {
                if let Some(l) = label {
                    self.define_label(l, cursor);
                }
                self.run_instruction(mnemonic, suffix.as_deref(), arg.as_ref(), cursor);
            }
            Stmt::MacroCall { label, name, args } => {
                if let Some(l) = label {
                    self.define_label(l, cursor);
                }
                self.run_macro_call(name, args, cursor);
            }
            Stmt::Meta(directive) => self.run_meta(directive, cursor),
            Stmt::Block(inner) => self.run_program(inner, cursor),
            Stmt::Script(_) => {}
        }
    }

    fn define_label(&mut self, raw: &str, cursor: &mut AnonCursor) {
        let pc = self.pc();
        let name = if raw == "+" || raw == "-" {
            cursor.next_decl_name().to_string()
        } else {
            raw.to_string()
        };
        if !self.symtab.is_redefinable(&name) {
            self.fail(Error::Syntax(format!("'{name}' is already defined and final")));
            return;
        }
        self.symtab.set(&name, crate::value::Value::Number(pc as f64));
    }

    fn run_assign(&mut self, target: &AssignTarget, expr: &Expr) {
        let value = match self.eval(expr) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        match target {
            AssignTarget::Pc => match value.as_i64() {
                Ok(n) => self.sections.current_section_mut().set_pc(n as u32),
                Err(e) => self.fail(e),
            },
            AssignTarget::Symbol(name) => {
                if !self.symtab.is_redefinable(name) {
                    self.fail(Error::Syntax(format!("'{name}' is already defined and final")));
                    return;
                }
                self.symtab.set(name, value);
            }
        }
    }

    fn run_instruction(&mut self, mnemonic: &str, suffix: Option<&str>, arg: Option<&InstrArg>, cursor: &mut AnonCursor) {
        let force_zp = suffix == Some("b");

        if let Some(InstrArg::ZeroPageRelative { zp, target, .. }) = arg {
            return self.run_zp_relative_instruction(mnemonic, zp, target);
        }

        let value = match arg {
            None | Some(InstrArg::Accumulator) => None,
            Some(InstrArg::LabelRef(_)) => match cursor.next_ref_target() {
                Some(name) => self.symtab.get(name),
                None => {
                    self.fail(Error::Range("no matching anonymous label".into()));
                    return;
                }
            },
            Some(
                InstrArg::Immediate(e)
                | InstrArg::IndX(e)
                | InstrArg::IndY(e)
                | InstrArg::Indirect(e)
                | InstrArg::AbsoluteX(e)
                | InstrArg::AbsoluteY(e)
                | InstrArg::Operand(e),
            ) => match self.eval(e) {
                Ok(v) => Some(v),
                Err(e) => return self.fail(e),
            },
            Some(InstrArg::ZeroPageRelative { .. }) => unreachable!("handled above"),
        };

        let numeric = match &value {
            Some(v) => match v.as_i64() {
                Ok(n) => Some(n),
                Err(e) => return self.fail(e),
            },
            None => None,
        };

        // Relative branches encode the displacement from the address right
        // after the branch instruction, not the absolute target.
        let resolved = if matches!(arg, Some(InstrArg::LabelRef(_))) {
            numeric.map(|target| {
                let next_pc = self.pc() as i64 + instruction_len_guess(mnemonic);
                target - next_pc
            })
        } else {
            numeric
        };

        match instruction::encode(self.cpu, mnemonic, arg, resolved, force_zp) {
            Ok(encoded) => self.emit_encoded(encoded),
            Err(e) => self.fail(e),
        }
    }

    fn run_zp_relative_instruction(&mut self, mnemonic: &str, zp: &Expr, target: &Expr) {
        let zp_byte = match self.eval(zp).and_then(|v| v.as_u8()) {
            Ok(b) => b,
            Err(e) => return self.fail(e),
        };
        let target_addr = match self.eval(target).and_then(|v| v.as_i64()) {
            Ok(n) => n,
            Err(e) => return self.fail(e),
        };
        let next_pc = self.pc() as i64 + 3; // opcode + zp byte + displacement byte
        let displacement = target_addr - next_pc;
        if !(-128..=127).contains(&displacement) {
            return self.fail(Error::Range(format!("branch target out of range ({displacement})")));
        }
        match instruction::encode_zero_page_relative(self.cpu, mnemonic, zp_byte, displacement as i8) {
            Ok(encoded) => self.emit_encoded(encoded),
            Err(e) => self.fail(e),
        }
    }

    fn emit_encoded(&mut self, encoded: instruction::Encoded) {
        self.sections.current_section_mut().add_byte(encoded.opcode);
        for b in encoded.operand {
            self.sections.current_section_mut().add_byte(b);
        }
    }

    fn run_macro_call(&mut self, name: &str, args: &[CallArg], cursor: &mut AnonCursor) {
        let def: MacroDef = match self.macros.get(name) {
            Some(d) => d.clone(),
            None => return self.fail(Error::Macro(format!("undefined macro '{name}'"))),
        };
        if def.params.len() != args.len() {
            return self.fail(Error::Macro(format!(
                "macro '{name}' expects {} arguments, got {}",
                def.params.len(),
                args.len()
            )));
        }

        let call_site = self.macros.next_call_site_label();
        self.symtab.set(&call_site, crate::value::Value::Number(self.pc() as f64));

        let mut saved = Vec::with_capacity(args.len());
        for (param, arg) in def.params.iter().zip(args) {
            let v = match self.eval(&arg.value) {
                Ok(v) => v,
                Err(e) => return self.fail(e),
            };
            if self.symtab.is_accessed(param) {
                tracing::warn!(param = %param, macro_name = %name, "macro parameter shadows an outer symbol");
            }
            saved.push((param.clone(), self.symtab.get(param)));
            self.symtab.set(param, v);
        }

        self.run_program(&def.body, cursor);

        for (param, old) in saved {
            match old {
                Some(v) => self.symtab.set(&param, v),
                None => self.symtab.erase(&param),
            }
        }
    }

    fn run_meta(&mut self, directive: &MetaStmt, cursor: &mut AnonCursor) {
        if let Err(e) = meta::dispatch(self, directive, cursor) {
            self.fail(e);
        }
    }

    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.sections.current_section_mut().add_byte(b);
        }
    }

    pub fn eval_pub(&mut self, expr: &Expr) -> Result<crate::value::Value, Error> {
        self.eval(expr)
    }

    pub fn run_program_pub(&mut self, program: &Program, cursor: &mut AnonCursor) {
        self.run_program(program, cursor)
    }
}

/// Rough instruction length used to compute a branch displacement before the
/// final operand bytes are actually laid down; matches every addressing
/// mode this program ever assigns to `LabelRef` (always `Relative`, 2 bytes).
fn instruction_len_guess(_mnemonic: &str) -> i64 {
    2
}
