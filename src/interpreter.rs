use std::collections::HashMap;
use std::io::{self, Write};

use crate::ast::*;
use crate::value::{RuntimeError, Value};

/// Scope stack: innermost scope last, globals at slot 0.
pub type Env = Vec<HashMap<String, Value>>;

/// Tree-walking evaluator.
///
/// Statements execute for effect; expressions produce a [`Value`]. `return`
/// and `break` travel through the `Err` channel as dedicated control-signal
/// variants and are consumed by the function-call protocol and the loop
/// driver respectively; only real runtime errors reach the caller of
/// [`Interpreter::run`].
pub struct Interpreter {
    pub env: Env,
    out: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Build an interpreter writing program output to `out` instead of
    /// stdout. The binary hands this a truncated file for the redirected
    /// mode; tests hand it an in-memory buffer.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Interpreter {
            env: vec![HashMap::new()],
            out,
        }
    }

    /// Execute the top-level block in the global scope.
    pub fn run(&mut self, program: &Block) -> Result<(), RuntimeError> {
        self.exec_stmts(&program.stmts)
    }

    // -------------------------------------------------------------------------
    // Environment management
    // -------------------------------------------------------------------------
    pub fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        for scope in self.env.iter().rev() {
            if let Some(v) = scope.get(name) {
                return Ok(v.clone());
            }
        }
        Err(RuntimeError::Error(format!(
            "Undefined variable '{}'",
            name
        )))
    }

    /// Bind in the innermost scope; a redeclaration overwrites.
    pub fn define(&mut self, name: String, val: Value) {
        if let Some(scope) = self.env.last_mut() {
            scope.insert(name, val);
        }
    }

    /// Walk the scope stack from innermost outward and update the first
    /// binding found.
    pub fn assign(&mut self, name: &str, val: Value) -> Result<(), RuntimeError> {
        for scope in self.env.iter_mut().rev() {
            if scope.contains_key(name) {
                scope.insert(name.to_string(), val);
                return Ok(());
            }
        }
        Err(RuntimeError::Error(format!(
            "Undefined variable '{}'",
            name
        )))
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------
    fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in stmts {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    /// Execute `block` in a fresh child scope, restoring the previous scope
    /// on every exit path including non-local ones.
    fn exec_block(&mut self, block: &Block) -> Result<(), RuntimeError> {
        self.env.push(HashMap::new());
        let result = self.exec_stmts(&block.stmts);
        self.env.pop();
        result
    }

    pub fn exec_stmt(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        match stmt {
            Stmt::Block(block) => self.exec_block(block),
            Stmt::VarDecl { name, init } => {
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                self.define(name.clone(), value);
                Ok(())
            }
            Stmt::FuncDecl { name, params, body } => {
                // The clone here is the deep copy the function value owns.
                let func = Value::Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                };
                self.define(name.clone(), func);
                Ok(())
            }
            Stmt::Loop {
                init,
                condition,
                increment,
                body,
            } => {
                // Loop frame: init bindings live here; each iteration's body
                // gets its own child scope.
                self.env.push(HashMap::new());
                let result = self.run_loop(init.as_deref(), condition.as_ref(), increment.as_ref(), body);
                self.env.pop();
                result
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition)?.truthy() {
                    self.exec_block(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_block(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::Print {
                newline,
                direct,
                args,
            } => {
                if let Some(text) = direct {
                    write!(self.out, "{}", text).map_err(io_err)?;
                } else {
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(self.out, " ").map_err(io_err)?;
                        }
                        let value = self.eval(arg)?;
                        write!(self.out, "{}", value).map_err(io_err)?;
                    }
                }
                if *newline {
                    writeln!(self.out).map_err(io_err)?;
                }
                self.out.flush().map_err(io_err)?;
                Ok(())
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                Err(RuntimeError::Return(Box::new(value)))
            }
            Stmt::Break => Err(RuntimeError::Break),
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(())
            }
        }
    }

    fn run_loop(
        &mut self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        increment: Option<&Expr>,
        body: &Block,
    ) -> Result<(), RuntimeError> {
        if let Some(init) = init {
            self.exec_stmt(init)?;
        }

        loop {
            if let Some(condition) = condition {
                if !self.eval(condition)?.truthy() {
                    break;
                }
            }

            match self.exec_block(body) {
                Ok(()) => {}
                Err(RuntimeError::Break) => break,
                Err(other) => return Err(other),
            }

            if let Some(increment) = increment {
                self.eval(increment)?;
            }
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------
    pub fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(lit) => Ok(eval_literal(lit)),
            Expr::Ident(name) => self.lookup(name),
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Neg => Value::narrowed(-operand.as_num()),
                    UnaryOp::Not => Value::Bool(!operand.truthy()),
                })
            }
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Call { callee, args } => {
                let callee = self.eval(callee)?;
                let mut arg_vals = Vec::with_capacity(args.len());
                for arg in args {
                    arg_vals.push(self.eval(arg)?);
                }
                self.call_value(callee, arg_vals)
            }
            Expr::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval(element)?);
                }
                Ok(Value::Array(items))
            }
            Expr::Index { target, index } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?.as_num() as i64;
                Ok(target.index(index))
            }
            Expr::Property { target, name } => {
                let target = self.eval(target)?;
                Ok(target.property(name))
            }
        }
    }

    fn eval_binary(&mut self, op: BinOp, left: &Expr, right: &Expr) -> Result<Value, RuntimeError> {
        match op {
            BinOp::Assign => return self.eval_assign(left, right),
            BinOp::And => {
                let l = self.eval(left)?;
                if !l.truthy() {
                    return Ok(Value::Bool(false));
                }
                let r = self.eval(right)?;
                return Ok(Value::Bool(r.truthy()));
            }
            BinOp::Or => {
                let l = self.eval(left)?;
                if l.truthy() {
                    return Ok(Value::Bool(true));
                }
                let r = self.eval(right)?;
                return Ok(Value::Bool(r.truthy()));
            }
            _ => {}
        }

        let l = self.eval(left)?;
        let r = self.eval(right)?;

        Ok(match op {
            BinOp::Add => op_add(l, r),
            BinOp::Sub => op_sub(l, r),
            BinOp::Mul => op_mul(l, r),
            BinOp::Div => op_div(l, r),
            BinOp::Rem => op_rem(l, r),
            BinOp::Eq => Value::Bool(value_eq(&l, &r)),
            BinOp::Neq => Value::Bool(!value_eq(&l, &r)),
            BinOp::Lt => Value::Bool(value_lt(&l, &r)),
            BinOp::Lte => Value::Bool(value_lte(&l, &r)),
            BinOp::Gt => Value::Bool(value_gt(&l, &r)),
            BinOp::Gte => Value::Bool(value_gte(&l, &r)),
            BinOp::Assign | BinOp::And | BinOp::Or => unreachable!(),
        })
    }

    /// Assignment targets are an identifier, or an index whose array
    /// sub-expression is an identifier (arrays have value semantics: read
    /// out, mutate the copy, write back). The right-hand side is evaluated
    /// exactly once; the result of the expression is the assigned value.
    fn eval_assign(&mut self, left: &Expr, right: &Expr) -> Result<Value, RuntimeError> {
        match left {
            Expr::Ident(name) => {
                let value = self.eval(right)?;
                self.assign(name, value.clone())?;
                Ok(value)
            }
            Expr::Index { target, index } => {
                let name = match target.as_ref() {
                    Expr::Ident(name) => name.clone(),
                    _ => {
                        return Err(RuntimeError::Error(
                            "Cannot assign to an element of a non-variable array".to_string(),
                        ))
                    }
                };

                let value = self.eval(right)?;
                let index = self.eval(index)?.as_num() as i64;
                let mut array = self.lookup(&name)?;
                array.set_index(index, value.clone());
                self.assign(&name, array)?;
                Ok(value)
            }
            _ => Err(RuntimeError::Error(
                "Invalid assignment target".to_string(),
            )),
        }
    }

    // -------------------------------------------------------------------------
    // Calls
    // -------------------------------------------------------------------------
    pub fn call_value(&mut self, callee: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match callee {
            Value::Native(name) => self.call_native(&name, &args),
            Value::Function { params, body, .. } => {
                if args.len() != params.len() {
                    return Err(RuntimeError::Error(format!(
                        "Expected {} arguments but got {}",
                        params.len(),
                        args.len()
                    )));
                }

                // Fresh scope on the caller's current stack: free names in
                // the body resolve through the caller's chain (dynamic
                // enclosure).
                let mut scope = HashMap::new();
                for (param, arg) in params.iter().zip(args) {
                    scope.insert(param.clone(), arg);
                }

                self.env.push(scope);
                let result = self.exec_stmts(&body.stmts);
                self.env.pop();

                match result {
                    Ok(()) => Ok(Value::Null),
                    Err(RuntimeError::Return(value)) => Ok(*value),
                    Err(other) => Err(other),
                }
            }
            _ => Err(RuntimeError::Error("Can only call functions".to_string())),
        }
    }

    /// Host-callable dispatch. The language ships no natives; the hook exists
    /// for hosts that bind `Value::Native` names into the global scope.
    fn call_native(&mut self, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let _ = args;
        Err(RuntimeError::Error(format!(
            "Unknown native function: '{}'",
            name
        )))
    }
}

fn io_err(e: io::Error) -> RuntimeError {
    RuntimeError::Error(format!("Cannot write output: {}", e))
}

fn eval_literal(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        // Numeric literals narrow to Int when exactly representable.
        Literal::Num(n) => Value::narrowed(*n),
        Literal::Str(s) => Value::Str(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
    }
}

// ---------------------------------------------------------------------------
// Arithmetic. Infallible: every type combination coerces somewhere.
// ---------------------------------------------------------------------------

fn op_add(l: Value, r: Value) -> Value {
    match (&l, &r) {
        (Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_add(*y)),
        _ if l.is_number() && r.is_number() => Value::narrowed(l.as_num() + r.as_num()),
        _ if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) => {
            Value::Str(format!("{}{}", l, r))
        }
        (Value::Array(x), Value::Array(y)) => {
            let mut items = x.clone();
            items.extend(y.iter().cloned());
            Value::Array(items)
        }
        _ if l.is_number() || r.is_number() => Value::narrowed(l.as_num() + r.as_num()),
        _ => Value::Str(format!("{}{}", l, r)),
    }
}

fn op_sub(l: Value, r: Value) -> Value {
    match (&l, &r) {
        (Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_sub(*y)),
        _ => Value::narrowed(l.as_num() - r.as_num()),
    }
}

fn op_mul(l: Value, r: Value) -> Value {
    match (&l, &r) {
        (Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_mul(*y)),
        _ => Value::narrowed(l.as_num() * r.as_num()),
    }
}

/// Division by zero yields integer 0. Exact integer division stays integer;
/// everything else goes through doubles and narrows back when exact.
fn op_div(l: Value, r: Value) -> Value {
    let divisor = r.as_num();
    if divisor == 0.0 {
        return Value::Int(0);
    }

    if let (Value::Int(x), Value::Int(y)) = (&l, &r) {
        if x.wrapping_rem(*y) == 0 {
            return Value::Int(x.wrapping_div(*y));
        }
    }

    Value::narrowed(l.as_num() / divisor)
}

fn op_rem(l: Value, r: Value) -> Value {
    let divisor = r.as_num();
    if divisor == 0.0 {
        return Value::Int(0);
    }

    if let (Value::Int(x), Value::Int(y)) = (&l, &r) {
        return Value::Int(x.wrapping_rem(*y));
    }

    Value::narrowed(l.as_num() % divisor)
}

// ---------------------------------------------------------------------------
// Equality and ordering
// ---------------------------------------------------------------------------

pub fn value_eq(l: &Value, r: &Value) -> bool {
    if matches!(l, Value::Null) && matches!(r, Value::Null) {
        return true;
    }
    if l.is_number() && r.is_number() {
        return l.as_num() == r.as_num();
    }
    if let (Value::Str(x), Value::Str(y)) = (l, r) {
        return x == y;
    }
    if let (Value::Bool(x), Value::Bool(y)) = (l, r) {
        return x == y;
    }
    // Number against string coerces to numbers.
    if (l.is_number() || r.is_number())
        && (matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)))
    {
        return l.as_num() == r.as_num();
    }
    // A boolean on either side coerces both to truthiness.
    if matches!(l, Value::Bool(_)) || matches!(r, Value::Bool(_)) {
        return l.truthy() == r.truthy();
    }
    // An array on either side compares stringified forms.
    if matches!(l, Value::Array(_)) || matches!(r, Value::Array(_)) {
        return l.to_string() == r.to_string();
    }
    false
}

pub fn value_lt(l: &Value, r: &Value) -> bool {
    if l.is_number() && r.is_number() {
        return l.as_num() < r.as_num();
    }
    if let (Value::Str(x), Value::Str(y)) = (l, r) {
        return x < y;
    }
    if (l.is_number() || r.is_number())
        && (matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)))
    {
        return l.as_num() < r.as_num();
    }
    if matches!(l, Value::Bool(_)) || matches!(r, Value::Bool(_)) {
        return l.as_num() < r.as_num();
    }
    if let (Value::Array(x), Value::Array(y)) = (l, r) {
        return x.len() < y.len();
    }
    l.to_string() < r.to_string()
}

pub fn value_lte(l: &Value, r: &Value) -> bool {
    if l.is_number() && r.is_number() {
        return l.as_num() <= r.as_num();
    }
    value_lt(l, r) || value_eq(l, r)
}

pub fn value_gt(l: &Value, r: &Value) -> bool {
    if l.is_number() && r.is_number() {
        return l.as_num() > r.as_num();
    }
    !value_lte(l, r)
}

pub fn value_gte(l: &Value, r: &Value) -> bool {
    if l.is_number() && r.is_number() {
        return l.as_num() >= r.as_num();
    }
    !value_lt(l, r)
}
