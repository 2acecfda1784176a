//! Turns source text into an [`ast::Program`] via the pest grammar in
//! `grammar.pest`, then a small hand-rolled precedence-climbing pass over
//! the flat atom/operator sequence `expr` produces (pest's token stream
//! doesn't encode precedence; the grammar only groups operators by
//! longest-match, not by binding strength).

use crate::ast::{AssignTarget, BinOp, ByteOp, CallArg, Expr, InstrArg, Lambda, Meta, Program, Stmt, UnOp};
use crate::error::Error;
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use std::rc::Rc;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct SourceParser;

pub fn parse(source: &str) -> Result<Program, Error> {
    let mut pairs = SourceParser::parse(Rule::program, source).map_err(|e| Error::Syntax(e.to_string()))?;
    let program_pair = pairs.next().expect("program rule always produces exactly one pair");
    Ok(stmt_list(program_pair.into_inner()))
}

fn stmt_list(pairs: Pairs<Rule>) -> Program {
    pairs.filter(|p| p.as_rule() != Rule::EOI).map(stmt).collect()
}

fn stmt(pair: Pair<Rule>) -> Stmt {
    match pair.as_rule() {
        Rule::label_stmt => {
            let name = pair.into_inner().next().unwrap().as_str().to_string();
            Stmt::Label(name)
        }
        Rule::assign_stmt => {
            let mut inner = pair.into_inner();
            let target = assign_target(inner.next().unwrap());
            let value = expr(inner.next().unwrap());
            Stmt::Assign { target, expr: value }
        }
        Rule::macro_call_stmt => {
            let mut inner = pair.into_inner();
            let mut next = inner.next().unwrap();
            let label = if next.as_rule() == Rule::asm_symbol {
                let l = next.as_str().to_string();
                next = inner.next().unwrap();
                Some(l)
            } else {
                None
            };
            let name = next.as_str().to_string();
            let args = call_args(inner.next().unwrap());
            Stmt::MacroCall { label, name, args }
        }
        Rule::instr_stmt => {
            let mut inner = pair.into_inner();
            let mut next = inner.next().unwrap();
            let label = if next.as_rule() == Rule::asm_symbol {
                let l = next.as_str().to_string();
                next = inner.next().unwrap();
                Some(l)
            } else {
                None
            };
            let (mnemonic, suffix) = match next.as_str().split_once('.') {
                Some((m, s)) => (m.to_string(), Some(s.to_string())),
                None => (next.as_str().to_string(), None),
            };
            let arg = inner.next().map(instr_arg);
            Stmt::Instruction { label, mnemonic, suffix, arg }
        }
        Rule::meta_stmt => meta_stmt(pair),
        Rule::script_stmt => {
            let body = pair.into_inner().next().unwrap().as_str().to_string();
            Stmt::Script(body)
        }
        other => unreachable!("unexpected statement rule {other:?}"),
    }
}

fn assign_target(pair: Pair<Rule>) -> AssignTarget {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::pc_target => AssignTarget::Pc,
        Rule::asm_symbol => AssignTarget::Symbol(inner.as_str().to_string()),
        other => unreachable!("unexpected assignment target rule {other:?}"),
    }
}

fn instr_arg(pair: Pair<Rule>) -> InstrArg {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::accumulator_arg => InstrArg::Accumulator,
        Rule::immediate_arg => InstrArg::Immediate(expr(inner.into_inner().next().unwrap())),
        Rule::indirect_x_arg => InstrArg::IndX(expr(inner.into_inner().next().unwrap())),
        Rule::indirect_y_arg => InstrArg::IndY(expr(inner.into_inner().next().unwrap())),
        Rule::indirect_arg => InstrArg::Indirect(expr(inner.into_inner().next().unwrap())),
        Rule::absolute_x_arg => InstrArg::AbsoluteX(expr(inner.into_inner().next().unwrap())),
        Rule::absolute_y_arg => InstrArg::AbsoluteY(expr(inner.into_inner().next().unwrap())),
        Rule::label_ref_arg => {
            let text = inner.into_inner().next().unwrap().as_str();
            let n = text.len() as i32;
            InstrArg::LabelRef(if text.starts_with('+') { n } else { -n })
        }
        Rule::zp_relative_arg => {
            let mut e = inner.into_inner();
            let zp = expr(e.next().unwrap());
            let bit = expr(e.next().unwrap());
            let target = expr(e.next().unwrap());
            InstrArg::ZeroPageRelative { zp, bit, target }
        }
        Rule::plain_arg => InstrArg::Operand(expr(inner.into_inner().next().unwrap())),
        other => unreachable!("unexpected instruction argument rule {other:?}"),
    }
}

fn meta_stmt(pair: Pair<Rule>) -> Stmt {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::if_block => if_block(inner),
        Rule::enum_block => enum_block(inner),
        Rule::meta_decl => meta_decl(inner),
        other => unreachable!("unexpected meta statement rule {other:?}"),
    }
}

fn if_block(pair: Pair<Rule>) -> Stmt {
    let mut inner = pair.into_inner();
    let decl = inner.next().unwrap().into_inner().next().unwrap();
    let (name, args) = match decl.as_rule() {
        Rule::if_ndef_decl => {
            let sym = decl.into_inner().next().unwrap().as_str().to_string();
            ("ifndef".to_string(), vec![CallArg { name: None, value: Expr::Var(sym) }])
        }
        Rule::if_def_decl => {
            let sym = decl.into_inner().next().unwrap().as_str().to_string();
            ("ifdef".to_string(), vec![CallArg { name: None, value: Expr::Var(sym) }])
        }
        Rule::if_expr_decl => {
            let cond = expr(decl.into_inner().next().unwrap());
            ("if".to_string(), vec![CallArg { name: None, value: cond }])
        }
        other => unreachable!("unexpected if-decl rule {other:?}"),
    };
    let mut blocks = inner.filter(|p| p.as_rule() == Rule::block);
    let block = blocks.next().map(|b| stmt_list(b.into_inner()));
    let else_block = blocks.next().map(|b| stmt_list(b.into_inner()));
    Stmt::Meta(Meta { name, args, block, else_block })
}

fn enum_block(pair: Pair<Rule>) -> Stmt {
    let mut args = Vec::new();
    let mut lines = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::ident => args.push(CallArg { name: None, value: Expr::Var(p.as_str().to_string()) }),
            Rule::enum_line => lines.push(enum_line(p)),
            _ => {}
        }
    }
    Stmt::Meta(Meta { name: "enum".to_string(), args, block: Some(lines), else_block: None })
}

fn enum_line(pair: Pair<Rule>) -> Stmt {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();
    match inner.next() {
        Some(e) => Stmt::Assign { target: AssignTarget::Symbol(name), expr: expr(e) },
        None => Stmt::Label(name),
    }
}

fn meta_decl(pair: Pair<Rule>) -> Stmt {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().trim_start_matches('!').to_string();
    let args = call_args(inner.next().unwrap());
    let block = inner.next().map(|p| stmt_list(p.into_inner()));
    Stmt::Meta(Meta { name, args, block, else_block: None })
}

fn call_args(pair: Pair<Rule>) -> Vec<CallArg> {
    pair.into_inner().map(call_arg).collect()
}

fn call_arg(pair: Pair<Rule>) -> CallArg {
    let mut inner = pair.into_inner();
    let first = inner.next().unwrap();
    if first.as_rule() == Rule::ident {
        let name = first.as_str().to_string();
        CallArg { name: Some(name), value: expr(inner.next().unwrap()) }
    } else {
        CallArg { name: None, value: expr(first) }
    }
}

fn expr(pair: Pair<Rule>) -> Expr {
    let mut atoms = Vec::new();
    let mut ops = Vec::new();
    let mut ternary = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::atom => atoms.push(atom(p)),
            Rule::bin_op => ops.push(p.as_str().to_string()),
            Rule::ternary => ternary = Some(p),
            other => unreachable!("unexpected expression child {other:?}"),
        }
    }
    let folded = fold_binary(atoms, ops);
    match ternary {
        Some(t) => {
            let mut ti = t.into_inner();
            let then_e = expr(ti.next().unwrap());
            let else_e = expr(ti.next().unwrap());
            Expr::Ternary(Box::new(folded), Box::new(then_e), Box::new(else_e))
        }
        None => folded,
    }
}

/// Standard two-stack operator-precedence folding (all operators here are
/// left-associative); avoids hand-indexing a flat atom/op array.
fn fold_binary(atoms: Vec<Expr>, ops: Vec<String>) -> Expr {
    let mut values = vec![atoms[0].clone()];
    let mut pending: Vec<(BinOp, u8)> = Vec::new();
    let mut rest = atoms.into_iter().skip(1);

    for op_text in ops {
        let op = to_binop(&op_text);
        let prec = precedence(&op_text);
        while let Some(&(top_op, top_prec)) = pending.last() {
            if top_prec < prec {
                break;
            }
            pending.pop();
            let rhs = values.pop().unwrap();
            let lhs = values.pop().unwrap();
            values.push(Expr::Binary(top_op, Box::new(lhs), Box::new(rhs)));
        }
        pending.push((op, prec));
        values.push(rest.next().expect("one trailing atom per operator"));
    }
    while let Some((op, _)) = pending.pop() {
        let rhs = values.pop().unwrap();
        let lhs = values.pop().unwrap();
        values.push(Expr::Binary(op, Box::new(lhs), Box::new(rhs)));
    }
    values.pop().expect("at least one atom in every expression")
}

fn precedence(op: &str) -> u8 {
    match op {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | ">" | "<=" | ">=" => 7,
        "<=>" => 8,
        "<<" | ">>" => 9,
        "+" | "-" => 10,
        "*" | "/" | "%" | "\\" => 11,
        other => unreachable!("unknown binary operator {other}"),
    }
}

fn to_binop(op: &str) -> BinOp {
    match op {
        "&&" => BinOp::And,
        "||" => BinOp::Or,
        "|" => BinOp::BitOr,
        "^" => BinOp::BitXor,
        "&" => BinOp::BitAnd,
        "==" => BinOp::Eq,
        "!=" => BinOp::Ne,
        "<" => BinOp::Lt,
        ">" => BinOp::Gt,
        "<=" => BinOp::Le,
        ">=" => BinOp::Ge,
        "<=>" => BinOp::Cmp,
        "<<" => BinOp::Shl,
        ">>" => BinOp::Shr,
        "+" => BinOp::Add,
        "-" => BinOp::Sub,
        "*" => BinOp::Mul,
        "/" => BinOp::Div,
        "%" => BinOp::Mod,
        "\\" => BinOp::IntDiv,
        other => unreachable!("unknown binary operator {other}"),
    }
}

fn atom(pair: Pair<Rule>) -> Expr {
    let text = pair.as_str();
    let mut inner = pair.into_inner();
    match inner.next() {
        None => {
            debug_assert_eq!(text.trim(), "*", "only the bare '*' primary has no inner pair");
            Expr::Pc
        }
        Some(p) => primary(p, &mut inner),
    }
}

fn primary(p: Pair<Rule>, rest: &mut Pairs<Rule>) -> Expr {
    match p.as_rule() {
        Rule::expr => expr(p),
        Rule::lambda => lambda_expr(p),
        Rule::array_literal => Expr::Array(p.into_inner().map(expr).collect()),
        Rule::index_expr => index_expr(p),
        Rule::fn_call => fn_call_expr(p),
        Rule::number => Expr::Number(parse_number(p.as_str())),
        Rule::string => Expr::Str(unquote(p.as_str())),
        Rule::un_op => {
            let op = match p.as_str() {
                "!" => UnOp::Not,
                "~" => UnOp::BitNot,
                "-" => UnOp::Neg,
                other => unreachable!("unknown unary operator {other}"),
            };
            let inner_atom = rest.next().expect("un_op is always followed by an atom");
            Expr::Unary(op, Box::new(atom(inner_atom)))
        }
        Rule::byte_op => {
            let op = match p.as_str() {
                "<" => ByteOp::Low,
                ">" => ByteOp::High,
                other => unreachable!("unknown byte-select operator {other}"),
            };
            let inner_atom = rest.next().expect("byte_op is always followed by an atom");
            Expr::ByteSelect(op, Box::new(atom(inner_atom)))
        }
        Rule::dotted => Expr::Var(p.as_str().to_string()),
        other => unreachable!("unexpected primary rule {other:?}"),
    }
}

fn lambda_expr(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let params = inner.next().unwrap().into_inner().map(|p| p.as_str().to_string()).collect();
    let body = expr(inner.next().unwrap());
    Expr::Lambda(Rc::new(Lambda { params, body }))
}

fn fn_call_expr(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();
    let args = call_args(inner.next().unwrap());
    Expr::Call(name, args)
}

fn index_base_expr(pair: Pair<Rule>) -> Expr {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::fn_call => fn_call_expr(inner),
        Rule::dotted => Expr::Var(inner.as_str().to_string()),
        Rule::lambda => lambda_expr(inner),
        other => unreachable!("unexpected index base rule {other:?}"),
    }
}

fn index_expr(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let base = index_base_expr(inner.next().unwrap());
    let spec = inner.next().unwrap().into_inner().next().unwrap();
    let (start, end) = match spec.as_rule() {
        Rule::slice_both => {
            let mut e = spec.into_inner();
            (Some(expr(e.next().unwrap())), Some(expr(e.next().unwrap())))
        }
        Rule::slice_from => (Some(expr(spec.into_inner().next().unwrap())), None),
        Rule::slice_to => (None, Some(expr(spec.into_inner().next().unwrap()))),
        Rule::slice_all => (None, None),
        Rule::single_index => (Some(expr(spec.into_inner().next().unwrap())), None),
        other => unreachable!("unexpected index spec rule {other:?}"),
    };
    Expr::Index { base: Box::new(base), start: start.map(Box::new), end: end.map(Box::new) }
}

fn parse_number(text: &str) -> f64 {
    if let Some(hex) = text.strip_prefix('$') {
        return i64::from_str_radix(hex, 16).unwrap_or(0) as f64;
    }
    if let Some(hex) = text.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).unwrap_or(0) as f64;
    }
    if let Some(bin) = text.strip_prefix('%') {
        return i64::from_str_radix(bin, 2).unwrap_or(0) as f64;
    }
    if let Some(bin) = text.strip_prefix("0b") {
        return i64::from_str_radix(bin, 2).unwrap_or(0) as f64;
    }
    if let Some(oct) = text.strip_prefix("0o") {
        return i64::from_str_radix(oct, 8).unwrap_or(0) as f64;
    }
    if let Some(multi) = text.strip_prefix("0m") {
        return i64::from_str_radix(multi, 4).unwrap_or(0) as f64;
    }
    if text.starts_with('\'') && text.ends_with('\'') && text.len() >= 3 {
        return text.chars().nth(1).unwrap() as u32 as f64;
    }
    text.parse::<f64>().unwrap_or(0.0)
}

fn unquote(text: &str) -> String {
    text.trim_matches('"').to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_a_label_and_an_instruction() {
        let program = parse("start:\n  lda #$10\n  rts\n").unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program[0], Stmt::Label("start".to_string()));
    }

    #[test]
    fn respects_operator_precedence() {
        let program = parse("foo = 1 + 2 * 3\n").unwrap();
        match &program[0] {
            Stmt::Assign { expr: Expr::Binary(BinOp::Add, lhs, rhs), .. } => {
                assert_eq!(**lhs, Expr::Number(1.0));
                assert!(matches!(**rhs, Expr::Binary(BinOp::Mul, ..)));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_hex_and_hash_prefixed_numbers() {
        let program = parse("foo = $ff\n").unwrap();
        assert_eq!(program[0], Stmt::Assign { target: AssignTarget::Symbol("foo".into()), expr: Expr::Number(255.0) });
    }

    #[test]
    fn parses_a_byte_directive_with_several_args() {
        let program = parse("!byte 1, 2, 3\n").unwrap();
        match &program[0] {
            Stmt::Meta(m) => {
                assert_eq!(m.name, "byte");
                assert_eq!(m.args.len(), 3);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_an_if_block_with_else() {
        let program = parse("!if 1 {\n  nop\n} else {\n  rts\n}\n").unwrap();
        match &program[0] {
            Stmt::Meta(m) => {
                assert_eq!(m.name, "if");
                assert!(m.block.is_some());
                assert!(m.else_block.is_some());
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_anonymous_label_references() {
        let program = parse("bne ++\n").unwrap();
        match &program[0] {
            Stmt::Instruction { arg: Some(InstrArg::LabelRef(n)), .. } => assert_eq!(*n, 2),
            other => panic!("unexpected statement: {other:?}"),
        }
    }
}
