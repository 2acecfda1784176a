//! `!macro name(params) { ... }` definitions and their expansion at call
//! sites.
//!
//! A macro call binds each argument to its parameter name as an ordinary
//! (non-final) symbol before the body runs, and restores whatever the
//! parameter name held beforehand afterwards — the statement-level analogue
//! of [`crate::eval::call_lambda`]. Shadowing a name that was already in use
//! outside the macro is legal but logged, since it usually indicates a
//! parameter name collision the user didn't intend.

use crate::ast::Program;
use crate::error::Error;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Program,
}

#[derive(Default)]
pub struct MacroTable {
    macros: HashMap<String, MacroDef>,
    /// Bumped on every expansion, used to build a unique synthetic label
    /// (`__macro_<n>`) standing in for "the last label defined", so a macro
    /// body can refer to its own call site without colliding with a sibling
    /// expansion's labels.
    expansion_count: u32,
}

impl MacroTable {
    pub fn new() -> MacroTable {
        MacroTable::default()
    }

    pub fn define(&mut self, def: MacroDef) -> Result<(), Error> {
        if self.macros.contains_key(&def.name) {
            return Err(Error::Macro(format!("macro '{}' already defined", def.name)));
        }
        self.macros.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.macros.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Allocates the next synthetic call-site label, e.g. `__macro_3`.
    pub fn next_call_site_label(&mut self) -> String {
        self.expansion_count += 1;
        format!("__macro_{}", self.expansion_count)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn redefining_a_macro_is_an_error() {
        let mut table = MacroTable::new();
        let def = MacroDef { name: "inc16".into(), params: vec!["addr".into()], body: vec![] };
        table.define(def.clone()).unwrap();
        assert!(table.define(def).is_err());
    }

    #[test]
    fn call_site_labels_are_unique_per_expansion() {
        let mut table = MacroTable::new();
        let a = table.next_call_site_label();
        let b = table.next_call_site_label();
        assert_ne!(a, b);
    }
}
