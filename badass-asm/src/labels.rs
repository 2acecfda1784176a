//! Anonymous (`+`/`-`) label resolution.
//!
//! `+`/`-` labels don't get a name from the source; a branch operand written
//! as `++` means "the second `+` label appearing after this point", `-`
//! means "the nearest `-` label before this point". Counting which
//! declaration a reference means depends only on the program's structure,
//! not on any resolved address, so it's computed once up front and reused
//! for every assembly pass: each declaration gets a synthetic symbol name,
//! each reference is mapped to the name of the declaration it counts to,
//! and from then on it's an ordinary (possibly forward) symbol lookup.

use crate::ast::{InstrArg, Meta, Program, Stmt};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Event {
    Decl(char),
    Ref(char, usize),
}

pub struct AnonPlan {
    /// Synthetic symbol name for the Nth `+`/`-` declaration encountered, in
    /// source order.
    pub decl_names: Vec<String>,
    /// For the Nth anonymous reference encountered, the synthetic name it
    /// resolves to, or `None` if there weren't enough labels in that
    /// direction.
    pub ref_targets: Vec<Option<String>>,
}

pub fn plan(program: &Program) -> AnonPlan {
    let mut events = Vec::new();
    collect(program, &mut events);

    let decl_positions: Vec<(usize, char)> = events
        .iter()
        .enumerate()
        .filter_map(|(i, e)| match e {
            Event::Decl(c) => Some((i, *c)),
            Event::Ref(..) => None,
        })
        .collect();

    let decl_names: Vec<String> = (0..decl_positions.len()).map(|i| format!("__anon{i}")).collect();

    let ref_targets: Vec<Option<String>> = events
        .iter()
        .enumerate()
        .filter_map(|(i, e)| match e {
            Event::Ref(ch, count) => Some((i, *ch, *count)),
            Event::Decl(_) => None,
        })
        .map(|(event_idx, ch, count)| {
            let matching: Vec<(usize, usize)> = decl_positions
                .iter()
                .enumerate()
                .filter(|(_, (_, c))| *c == ch)
                .map(|(ordinal, (pos, _))| (ordinal, *pos))
                .collect();
            if ch == '+' {
                matching
                    .iter()
                    .filter(|(_, pos)| *pos > event_idx)
                    .nth(count - 1)
                    .map(|(ordinal, _)| decl_names[*ordinal].clone())
            } else {
                matching
                    .iter()
                    .rev()
                    .filter(|(_, pos)| *pos < event_idx)
                    .nth(count - 1)
                    .map(|(ordinal, _)| decl_names[*ordinal].clone())
            }
        })
        .collect();

    AnonPlan { decl_names, ref_targets }
}

fn collect(program: &Program, events: &mut Vec<Event>) {
    for stmt in program {
        match stmt {
            Stmt::Label(name) if name == "+" || name == "-" => {
                events.push(Event::Decl(name.chars().next().unwrap()));
            }
            Stmt::Instruction { arg: Some(InstrArg::LabelRef(n)), .. } => {
                let ch = if *n >= 0 { '+' } else { '-' };
                events.push(Event::Ref(ch, n.unsigned_abs() as usize));
            }
            Stmt::Block(inner) => collect(inner, events),
            Stmt::Meta(Meta { block, else_block, .. }) => {
                if let Some(b) = block {
                    collect(b, events);
                }
                if let Some(b) = else_block {
                    collect(b, events);
                }
            }
            _ => {}
        }
    }
}

/// Walks the same structural order as [`plan`], driving a decl/ref counter
/// pair so the pass driver can look up the synthetic name for each
/// declaration/reference as it evaluates the program linearly.
pub struct AnonCursor<'a> {
    plan: &'a AnonPlan,
    decl_i: usize,
    ref_i: usize,
}

impl<'a> AnonCursor<'a> {
    pub fn new(plan: &'a AnonPlan) -> AnonCursor<'a> {
        AnonCursor { plan, decl_i: 0, ref_i: 0 }
    }

    /// Falls back to a non-unique placeholder once `decl_i` runs past what
    /// `plan()` saw, which happens when a `!rept` body redeclares the same
    /// anonymous label on each of its iterations.
    pub fn next_decl_name(&mut self) -> &str {
        match self.plan.decl_names.get(self.decl_i) {
            Some(name) => {
                self.decl_i += 1;
                name
            }
            None => "__anon_overflow",
        }
    }

    pub fn next_ref_target(&mut self) -> Option<&str> {
        let target = self.plan.ref_targets.get(self.ref_i).and_then(|t| t.as_deref());
        self.ref_i += 1;
        target
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::Expr;

    fn instr(arg: InstrArg) -> Stmt {
        Stmt::Instruction { label: None, mnemonic: "BNE".into(), suffix: None, arg: Some(arg) }
    }

    #[test]
    fn forward_reference_skips_to_the_right_plus_label() {
        let program = vec![
            instr(InstrArg::LabelRef(1)),
            Stmt::Label("+".into()),
            Stmt::Label("+".into()),
        ];
        let plan = plan(&program);
        assert_eq!(plan.ref_targets[0], Some("__anon0".to_string()));
    }

    #[test]
    fn backward_reference_finds_the_nearest_minus_label() {
        let program = vec![
            Stmt::Label("-".into()),
            Stmt::Label("-".into()),
            instr(InstrArg::LabelRef(-1)),
        ];
        let plan = plan(&program);
        assert_eq!(plan.ref_targets[0], Some("__anon1".to_string()));
    }

    #[test]
    fn reference_with_no_matching_label_is_none() {
        let program = vec![instr(InstrArg::LabelRef(2)), Stmt::Label("+".into())];
        let plan = plan(&program);
        assert_eq!(plan.ref_targets[0], None);
    }

    #[test]
    fn cursor_walks_decls_and_refs_in_order() {
        let program = vec![
            instr(InstrArg::LabelRef(-1)),
            Stmt::Label("-".into()),
        ];
        let plan = plan(&program);
        let mut cursor = AnonCursor::new(&plan);
        assert_eq!(cursor.next_ref_target(), None);
        assert_eq!(cursor.next_decl_name(), "__anon0");
        let _ = Expr::Pc;
    }
}
