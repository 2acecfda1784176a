//! The symbol table: every name a pass can define, redefine or leave
//! dangling, plus the undefined/accessed bookkeeping the pass driver uses to
//! decide whether another pass will help.

use crate::value::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Clone, Debug)]
pub struct Symbol {
    pub value: Value,
    /// Set once and never redefined (e.g. a `.const` label), enforced by
    /// [`SymbolTable::is_redefinable`].
    pub final_: bool,
}

pub struct SymbolTable {
    syms: HashMap<String, Symbol>,
    undefined: HashSet<String>,
    accessed: HashSet<String>,
    pub trace: bool,
    /// While `true`, `get` on a missing name records it as undefined instead
    /// of erroring; the pass driver flips this off on the final pass.
    pub undef_ok: bool,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable {
            syms: HashMap::new(),
            undefined: HashSet::new(),
            accessed: HashSet::new(),
            trace: false,
            undef_ok: true,
        }
    }

    pub fn is_accessed(&self, name: &str) -> bool {
        self.accessed.contains(name)
    }

    /// A symbol is defined when it has a value and isn't flagged undefined
    /// (a prior pass may have seen its value change and re-flagged it).
    pub fn is_defined(&self, name: &str) -> bool {
        self.syms.contains_key(name) && !self.undefined.contains(name)
    }

    pub fn is_redefinable(&self, name: &str) -> bool {
        match self.syms.get(name) {
            Some(sym) if sym.final_ => self.undefined.contains(name),
            _ => true,
        }
    }

    pub fn set_final(&mut self, name: &str) {
        if let Some(sym) = self.syms.get_mut(name) {
            sym.final_ = true;
        }
    }

    /// Stores `value` under `name`. If the symbol has already been read this
    /// pass (`accessed`) and the new value differs from the old one, the
    /// name is flagged undefined so the pass driver knows to run again.
    pub fn set(&mut self, name: &str, value: Value) {
        if self.accessed.contains(name) {
            match self.syms.get(name) {
                Some(old) if old.value != value => {
                    if self.trace {
                        tracing::debug!(symbol = name, "redefined to a different value");
                    }
                    self.undefined.insert(name.to_string());
                }
                None => {
                    if self.trace {
                        tracing::debug!(symbol = name, "defined");
                    }
                }
                _ => {}
            }
        } else if self.trace && self.undefined.contains(name) {
            tracing::debug!(symbol = name, "defined");
        }
        self.syms.insert(
            name.to_string(),
            Symbol { value, final_: false },
        );
    }

    /// Reads `name`, recording the access. Returns `None` (and flags the name
    /// undefined) when `undef_ok`; errors when a final pass requires every
    /// symbol to already be resolved.
    pub fn get(&mut self, name: &str) -> Option<Value> {
        self.accessed.insert(name.to_string());
        match self.syms.get(name) {
            Some(sym) => Some(sym.value.clone()),
            None => {
                if self.trace {
                    tracing::debug!(symbol = name, "access to undefined symbol");
                }
                self.undefined.insert(name.to_string());
                None
            }
        }
    }

    pub fn get_sym(&self, name: &str) -> Option<&Symbol> {
        self.syms.get(name)
    }

    /// All symbols under the `name.` prefix, keyed by their suffix, for
    /// `foo.bar` dotted-map access.
    pub fn collect(&self, name: &str) -> BTreeMap<String, Value> {
        let prefix = format!("{name}.");
        self.syms
            .iter()
            .filter_map(|(key, sym)| {
                key.strip_prefix(&prefix)
                    .map(|rest| (rest.to_string(), sym.value.clone()))
            })
            .collect()
    }

    pub fn erase(&mut self, name: &str) {
        self.syms.remove(name);
        self.accessed.remove(name);
    }

    pub fn erase_all(&mut self, prefix: &str) {
        self.syms.retain(|key, _| !key.starts_with(prefix));
        self.accessed.retain(|key| !key.starts_with(prefix));
    }

    /// Clears `undefined` entries that now have a value, called between passes.
    pub fn resolve(&mut self) {
        self.undefined.retain(|name| !self.syms.contains_key(name));
    }

    /// True once every name ever flagged undefined has since been defined.
    pub fn ok(&self) -> bool {
        self.undefined.iter().all(|name| self.syms.contains_key(name))
    }

    pub fn done(&self) -> bool {
        self.undefined.is_empty()
    }

    pub fn get_undefined(&self) -> &HashSet<String> {
        &self.undefined
    }

    pub fn for_all(&self, mut f: impl FnMut(&str, &Value)) {
        for (name, sym) in &self.syms {
            f(name, &sym.value);
        }
    }

    /// Starts a new pass: clears transient per-pass state, keeps values.
    pub fn clear(&mut self) {
        for sym in self.syms.values_mut() {
            sym.final_ = false;
        }
        self.accessed.clear();
        self.undefined.clear();
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unknown_symbol_is_undefined_and_recorded() {
        let mut st = SymbolTable::new();
        assert!(st.get("foo").is_none());
        assert!(st.get_undefined().contains("foo"));
        assert!(!st.is_defined("foo"));
    }

    #[test]
    fn redefining_an_accessed_symbol_flags_it_undefined() {
        let mut st = SymbolTable::new();
        st.set("label", Value::Number(1.0));
        assert!(st.get("label").is_some());
        st.set("label", Value::Number(2.0));
        assert!(st.get_undefined().contains("label"));
    }

    #[test]
    fn resolve_clears_undefined_once_defined() {
        let mut st = SymbolTable::new();
        st.get("x");
        st.set("x", Value::Number(5.0));
        st.resolve();
        assert!(st.done());
    }

    #[test]
    fn final_symbol_is_not_redefinable_unless_flagged_undefined() {
        let mut st = SymbolTable::new();
        st.set("k", Value::Number(1.0));
        st.set_final("k");
        assert!(!st.is_redefinable("k"));
        st.get("k");
        st.set("k", Value::Number(2.0));
        assert!(st.is_redefinable("k"));
    }

    #[test]
    fn collect_gathers_dotted_children() {
        let mut st = SymbolTable::new();
        st.set("point.x", Value::Number(1.0));
        st.set("point.y", Value::Number(2.0));
        let m = st.collect("point");
        assert_eq!(m.get("x"), Some(&Value::Number(1.0)));
        assert_eq!(m.get("y"), Some(&Value::Number(2.0)));
    }
}
