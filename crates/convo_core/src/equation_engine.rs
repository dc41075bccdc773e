use crate::traits::{Scalar, Signal};
use anyhow::{anyhow, bail, Result};
use std::cell::RefCell;
use std::collections::HashMap;

/// OpCodes for the Stack-based Virtual Machine.
/// The VM operates on a stack of `Scalar` values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant `f64` value onto the stack.
    LoadConst(f64),
    /// Pushes the value of a variable (by index) onto the stack.
    LoadVar(usize),
    /// Pushes the value of a parameter (by index) onto the stack.
    LoadParam(usize),
    /// Pops top two values (b, a), pushes (a + b).
    Add,
    /// Pops top two values (b, a), pushes (a - b).
    Sub,
    /// Pops top two values (b, a), pushes (a * b).
    Mul,
    /// Pops top two values (b, a), pushes (a / b).
    Div,
    /// Pops top two values (b, a), pushes (a ^ b).
    Pow,
    /// Pops top two values (b, a), pushes 1 if a > b, else 0.
    Greater,
    /// Pops top two values (b, a), pushes 1 if a < b, else 0.
    Less,
    /// Pops top two values (b, a), pushes 1 if a >= b, else 0.
    GreaterEq,
    /// Pops top two values (b, a), pushes 1 if a <= b, else 0.
    LessEq,
    /// Pops top two values (b, a), pushes max(a, b).
    Max,
    /// Pops top two values (b, a), pushes min(a, b).
    Min,
    /// Pops top value (a), pushes -a.
    Neg,
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Abs,
    Sqrt,
    /// Pops top value (a), pushes 1 if a > 0, else 0.
    Step,
}

/// Represents a compiled sequence of operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
}

impl Bytecode {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }
}

/// Stack-based Virtual Machine for evaluating expressions.
///
/// The VM is stateless; `execute` takes all necessary context:
/// - `bytecode`: Instructions to run.
/// - `vars`: Variable values (read-only).
/// - `params`: Parameter values (read-only).
/// - `stack`: A mutable buffer for intermediate computations.
///
/// Returns the value left on the stack. Malformed bytecode yields NaN.
pub struct VM;

impl VM {
    pub fn execute<T: Scalar>(
        bytecode: &Bytecode,
        vars: &[T],
        params: &[T],
        stack: &mut Vec<T>,
    ) -> T {
        stack.clear();

        for op in &bytecode.ops {
            let value = match op {
                OpCode::LoadConst(val) => T::from_f64(*val).unwrap_or_else(T::nan),
                OpCode::LoadVar(idx) => vars.get(*idx).copied().unwrap_or_else(T::nan),
                OpCode::LoadParam(idx) => params.get(*idx).copied().unwrap_or_else(T::nan),
                OpCode::Add
                | OpCode::Sub
                | OpCode::Mul
                | OpCode::Div
                | OpCode::Pow
                | OpCode::Greater
                | OpCode::Less
                | OpCode::GreaterEq
                | OpCode::LessEq
                | OpCode::Max
                | OpCode::Min => {
                    let b = pop(stack);
                    let a = pop(stack);
                    binary(*op, a, b)
                }
                _ => {
                    let a = pop(stack);
                    unary(*op, a)
                }
            };
            stack.push(value);
        }

        pop(stack)
    }
}

fn pop<T: Scalar>(stack: &mut Vec<T>) -> T {
    stack.pop().unwrap_or_else(T::nan)
}

fn indicator<T: Scalar>(condition: bool) -> T {
    if condition {
        T::one()
    } else {
        T::zero()
    }
}

fn binary<T: Scalar>(op: OpCode, a: T, b: T) -> T {
    match op {
        OpCode::Add => a + b,
        OpCode::Sub => a - b,
        OpCode::Mul => a * b,
        OpCode::Div => a / b,
        OpCode::Pow => a.powf(b),
        OpCode::Greater => indicator(a > b),
        OpCode::Less => indicator(a < b),
        OpCode::GreaterEq => indicator(a >= b),
        OpCode::LessEq => indicator(a <= b),
        OpCode::Max => a.max(b),
        OpCode::Min => a.min(b),
        _ => T::nan(),
    }
}

fn unary<T: Scalar>(op: OpCode, a: T) -> T {
    match op {
        OpCode::Neg => -a,
        OpCode::Sin => a.sin(),
        OpCode::Cos => a.cos(),
        OpCode::Tan => a.tan(),
        OpCode::Exp => a.exp(),
        OpCode::Ln => a.ln(),
        OpCode::Abs => a.abs(),
        OpCode::Sqrt => a.sqrt(),
        OpCode::Step => indicator(a > T::zero()),
        _ => T::nan(),
    }
}

// --- AST & Parser ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Greater,
    Less,
    GreaterEq,
    LessEq,
}

impl BinaryOp {
    fn opcode(self) -> OpCode {
        match self {
            BinaryOp::Add => OpCode::Add,
            BinaryOp::Sub => OpCode::Sub,
            BinaryOp::Mul => OpCode::Mul,
            BinaryOp::Div => OpCode::Div,
            BinaryOp::Pow => OpCode::Pow,
            BinaryOp::Greater => OpCode::Greater,
            BinaryOp::Less => OpCode::Less,
            BinaryOp::GreaterEq => OpCode::GreaterEq,
            BinaryOp::LessEq => OpCode::LessEq,
        }
    }
}

/// Abstract Syntax Tree nodes for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Neg(Box<Expr>),
    Call(String, Vec<Expr>),
}

/// Looks up a builtin function: its opcode and arity.
fn builtin(name: &str) -> Option<(OpCode, usize)> {
    let entry = match name {
        "sin" => (OpCode::Sin, 1),
        "cos" => (OpCode::Cos, 1),
        "tan" => (OpCode::Tan, 1),
        "exp" => (OpCode::Exp, 1),
        "ln" | "log" => (OpCode::Ln, 1),
        "abs" => (OpCode::Abs, 1),
        "sqrt" => (OpCode::Sqrt, 1),
        "step" | "heaviside" => (OpCode::Step, 1),
        "max" | "maximum" => (OpCode::Max, 2),
        "min" | "minimum" => (OpCode::Min, 2),
        _ => return None,
    };
    Some(entry)
}

fn builtin_constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

/// Compiles an AST (`Expr`) into `Bytecode`.
/// Resolves variable and parameter names to indices.
pub struct Compiler {
    pub var_map: HashMap<String, usize>,
    pub param_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new(var_names: &[String], param_names: &[String]) -> Self {
        let var_map = var_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let param_map = param_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { var_map, param_map }
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode> {
        let mut ops = Vec::new();
        self.compile_recursive(expr, &mut ops)?;
        Ok(Bytecode { ops })
    }

    fn compile_recursive(&self, expr: &Expr, ops: &mut Vec<OpCode>) -> Result<()> {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(*n)),
            Expr::Variable(name) => {
                if let Some(&idx) = self.var_map.get(name) {
                    ops.push(OpCode::LoadVar(idx));
                } else if let Some(&idx) = self.param_map.get(name) {
                    ops.push(OpCode::LoadParam(idx));
                } else if let Some(value) = builtin_constant(name) {
                    ops.push(OpCode::LoadConst(value));
                } else {
                    bail!("Unknown variable or parameter: {name}");
                }
            }
            Expr::Binary(left, op, right) => {
                self.compile_recursive(left, ops)?;
                self.compile_recursive(right, ops)?;
                ops.push(op.opcode());
            }
            Expr::Neg(operand) => {
                self.compile_recursive(operand, ops)?;
                ops.push(OpCode::Neg);
            }
            Expr::Call(func, args) => {
                let (opcode, arity) =
                    builtin(func).ok_or_else(|| anyhow!("Unknown function: {func}"))?;
                if args.len() != arity {
                    bail!(
                        "{func} expects {arity} argument(s), got {}",
                        args.len()
                    );
                }
                for arg in args {
                    self.compile_recursive(arg, ops)?;
                }
                ops.push(opcode);
            }
        }
        Ok(())
    }
}

// --- Simple Parser ---

/// Parses a string expression into an AST.
pub fn parse(input: &str) -> Result<Expr, String> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expression()?;
    if let Some(token) = parser.peek() {
        return Err(format!("Unexpected trailing input at {token:?}"));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Greater,
    Less,
    GreaterEq,
    LessEq,
    Comma,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut num_str = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    num_str.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            // Exponent, only when digits follow: "1e-3" but not "2e" or "2exp".
            let mut lookahead = chars.clone();
            if matches!(lookahead.next(), Some('e') | Some('E')) {
                let mut exponent = String::from("e");
                if let Some(&sign) = lookahead.peek() {
                    if sign == '+' || sign == '-' {
                        exponent.push(sign);
                        lookahead.next();
                    }
                }
                if lookahead.peek().is_some_and(|d| d.is_ascii_digit()) {
                    while let Some(&d) = lookahead.peek() {
                        if d.is_ascii_digit() {
                            exponent.push(d);
                            lookahead.next();
                        } else {
                            break;
                        }
                    }
                    num_str.push_str(&exponent);
                    chars = lookahead;
                }
            }
            let value = num_str
                .parse()
                .map_err(|_| format!("Invalid number: {num_str}"))?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Identifier(ident));
        } else {
            chars.next();
            let token = match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => {
                    if chars.peek() == Some(&'*') {
                        chars.next();
                        Token::Caret
                    } else {
                        Token::Star
                    }
                }
                '/' => Token::Slash,
                '^' => Token::Caret,
                ',' => Token::Comma,
                '(' => Token::LParen,
                ')' => Token::RParen,
                '>' | '<' => {
                    let or_equal = chars.peek() == Some(&'=');
                    if or_equal {
                        chars.next();
                    }
                    match (c, or_equal) {
                        ('>', false) => Token::Greater,
                        ('>', true) => Token::GreaterEq,
                        ('<', false) => Token::Less,
                        _ => Token::LessEq,
                    }
                }
                other => return Err(format!("Unexpected character '{other}'")),
            };
            tokens.push(token);
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).cloned()
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_rparen(&mut self) -> Result<(), String> {
        match self.consume() {
            Some(Token::RParen) => Ok(()),
            _ => Err("Expected ')'".to_string()),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, String> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_term()?;

        while let Some(token) = self.peek() {
            let op = match token {
                Token::Greater => BinaryOp::Greater,
                Token::Less => BinaryOp::Less,
                Token::GreaterEq => BinaryOp::GreaterEq,
                Token::LessEq => BinaryOp::LessEq,
                _ => break,
            };
            self.consume();
            let right = self.parse_term()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_factor()?;

        while let Some(token) = self.peek() {
            let op = match token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.consume();
            let right = self.parse_factor()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;

        while let Some(token) = self.peek() {
            let op = match token {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                let expr = self.parse_unary()?;
                Ok(Expr::Neg(Box::new(expr)))
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    /// `^` binds tighter than unary minus and is right-associative.
    fn parse_power(&mut self) -> Result<Expr, String> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(Box::new(base), BinaryOp::Pow, Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume(); // eat '('
                    let mut args = Vec::new();
                    if let Some(Token::RParen) = self.peek() {
                        self.consume();
                        return Ok(Expr::Call(name, args));
                    }
                    loop {
                        args.push(self.parse_expression()?);
                        match self.consume() {
                            Some(Token::Comma) => continue,
                            Some(Token::RParen) => break,
                            _ => return Err("Expected ',' or ')'".to_string()),
                        }
                    }
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_expression()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            Some(token) => Err(format!("Unexpected token {token:?}")),
            None => Err("Unexpected end of expression".to_string()),
        }
    }
}

// --- ExpressionSignal ---

/// A signal compiled from a text expression in one time variable.
#[derive(Debug)]
pub struct ExpressionSignal {
    bytecode: Bytecode,
    params: Vec<f64>,
    // Interior mutability for VM stack to avoid allocation per sample.
    // Note: This makes the signal !Sync.
    stack: RefCell<Vec<f64>>,
}

impl ExpressionSignal {
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn set_param(&mut self, index: usize, value: f64) -> Result<()> {
        let slot = self
            .params
            .get_mut(index)
            .ok_or_else(|| anyhow!("Parameter index {index} out of range"))?;
        *slot = value;
        Ok(())
    }
}

impl Clone for ExpressionSignal {
    fn clone(&self) -> Self {
        Self {
            bytecode: self.bytecode.clone(),
            params: self.params.clone(),
            stack: RefCell::new(Vec::with_capacity(self.stack.borrow().capacity())),
        }
    }
}

impl Signal for ExpressionSignal {
    fn value(&self, t: f64) -> f64 {
        let mut stack = self.stack.borrow_mut();
        VM::execute(&self.bytecode, &[t], &self.params, &mut stack)
    }
}

/// Compiles `expression` into a signal of `var_name`.
///
/// Every symbol must be the time variable, a named parameter or a builtin
/// constant, and every call must name a known function with the right arity.
pub fn compile_signal(
    expression: &str,
    var_name: &str,
    param_names: &[String],
    params: &[f64],
) -> Result<ExpressionSignal> {
    if param_names.len() != params.len() {
        bail!(
            "Parameter count mismatch: {} names for {} values",
            param_names.len(),
            params.len()
        );
    }
    if param_names.iter().any(|name| name == var_name) {
        bail!("Parameter name '{var_name}' shadows the time variable");
    }
    let parsed = parse(expression).map_err(|err| anyhow!("Failed to parse '{expression}': {err}"))?;
    let compiler = Compiler::new(&[var_name.to_string()], param_names);
    let bytecode = compiler.compile(&parsed)?;
    Ok(ExpressionSignal {
        bytecode,
        params: params.to_vec(),
        stack: RefCell::new(Vec::with_capacity(32)),
    })
}

#[cfg(test)]
mod tests {
    use super::{compile_signal, parse, BinaryOp, Expr};
    use crate::traits::Signal;

    fn signal(expr: &str) -> super::ExpressionSignal {
        compile_signal(expr, "t", &[], &[]).expect("expression should compile")
    }

    #[test]
    fn triangle_pulse_expression() {
        let tri = signal("max(0, 1 - abs(t))");
        assert_eq!(tri.value(0.0), 1.0);
        assert!((tri.value(0.25) - 0.75).abs() < 1e-15);
        assert!((tri.value(-0.5) - 0.5).abs() < 1e-15);
        assert_eq!(tri.value(2.0), 0.0);
    }

    #[test]
    fn causal_exponential_uses_indicator() {
        let decay = signal("(t > 0) * exp(-3*t)");
        assert_eq!(decay.value(-1.0), 0.0);
        assert_eq!(decay.value(0.0), 0.0);
        assert!((decay.value(1.0) - (-3.0f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(signal("-t^2").value(3.0), -9.0);
        assert_eq!(signal("2^3^2").value(0.0), 512.0);
        assert_eq!(signal("1 + 2 * t - 4 / 2").value(3.0), 5.0);
        assert_eq!(signal("t ** 2").value(4.0), 16.0);
        assert_eq!(signal("1 + t > 2").value(1.5), 1.0);
        assert_eq!(signal("t <= 1").value(1.0), 1.0);
        assert_eq!(signal("t < 1").value(1.0), 0.0);
        assert!((signal("2e-1 * t").value(10.0) - 2.0).abs() < 1e-12);
        assert!((signal("sin(pi * t)").value(0.5) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn parameters_resolve_by_name() {
        let names = vec!["a".to_string(), "w".to_string()];
        let mut sig = compile_signal("a * sin(w * t)", "t", &names, &[2.0, 20.0])
            .expect("expression should compile");
        assert!((sig.value(0.1) - 2.0 * (2.0f64).sin()).abs() < 1e-12);
        sig.set_param(0, 1.0).expect("param index");
        assert_eq!(sig.params(), &[1.0, 20.0]);
        assert!((sig.value(0.1) - (2.0f64).sin()).abs() < 1e-12);
        assert!(sig.set_param(5, 1.0).is_err());
    }

    #[test]
    fn parse_builds_expected_tree() {
        let expr = parse("t > 0").expect("parse");
        assert_eq!(
            expr,
            Expr::Binary(
                Box::new(Expr::Variable("t".into())),
                BinaryOp::Greater,
                Box::new(Expr::Number(0.0))
            )
        );
    }

    #[test]
    fn compile_rejects_bad_expressions() {
        let cases = [
            ("t + missing", "unknown variable"),
            ("foo(t)", "unknown function"),
            ("max(t)", "expects 2"),
            ("(t + 1", "expected ')'"),
            ("t 1", "trailing"),
            ("t $ 2", "unexpected character"),
            ("", "unexpected end"),
        ];
        for (expr, needle) in cases {
            let err = compile_signal(expr, "t", &[], &[]).expect_err(expr);
            assert!(
                err.to_string().to_lowercase().contains(needle),
                "unexpected error for '{expr}': {err}"
            );
        }
    }

    #[test]
    fn compile_rejects_mismatched_params() {
        let names = vec!["a".to_string()];
        assert!(compile_signal("a * t", "t", &names, &[]).is_err());
        assert!(compile_signal("t", "t", &["t".to_string()], &[1.0]).is_err());
    }
}
