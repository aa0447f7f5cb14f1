use std::collections::BTreeSet;

use super::env::Environment;

/// Parsed, immutable form of a script: an ordered list of assignments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledForm {
    pub(crate) assignments: Vec<Assignment>,
}

impl CompiledForm {
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Names the form reads before any of its own statements assign them.
    ///
    /// Such reads fall back to whatever the environment holds, which is `0.0`
    /// when nothing seeded the name.
    pub fn reads_before_write(&self) -> Vec<String> {
        let mut written: BTreeSet<&str> = BTreeSet::new();
        let mut early: BTreeSet<String> = BTreeSet::new();
        for assignment in &self.assignments {
            assignment.expr.visit_vars(&mut |name| {
                if !written.contains(name) {
                    early.insert(name.to_owned());
                }
            });
            written.insert(assignment.target.as_str());
        }
        early.into_iter().collect()
    }
}

/// `target = expr`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: String,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Var(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Function,
        arg: Box<Expr>,
    },
}

impl Expr {
    pub fn eval(&self, env: &Environment) -> f64 {
        match self {
            Expr::Number(value) => *value,
            Expr::Var(name) => env.get(name),
            Expr::Neg(inner) => -inner.eval(env),
            Expr::Binary { op, lhs, rhs } => op.apply(lhs.eval(env), rhs.eval(env)),
            Expr::Call { func, arg } => func.apply(arg.eval(env)),
        }
    }

    fn visit_vars<'a>(&'a self, visit: &mut impl FnMut(&'a str)) {
        match self {
            Expr::Number(_) => {}
            Expr::Var(name) => visit(name.as_str()),
            Expr::Neg(inner) => inner.visit_vars(visit),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.visit_vars(visit);
                rhs.visit_vars(visit);
            }
            Expr::Call { arg, .. } => arg.visit_vars(visit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            // Division by zero yields 0 so coordinates stay finite.
            BinaryOp::Div => {
                if rhs == 0.0 {
                    0.0
                } else {
                    lhs / rhs
                }
            }
        }
    }
}

/// Built-in single-argument functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sqrt,
    Sqr,
    Abs,
    Floor,
    Ceil,
    Exp,
    Log,
    Sign,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        let func = match name {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "asin" => Function::Asin,
            "acos" => Function::Acos,
            "atan" => Function::Atan,
            "sqrt" => Function::Sqrt,
            "sqr" => Function::Sqr,
            "abs" => Function::Abs,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            "exp" => Function::Exp,
            "log" => Function::Log,
            "sign" => Function::Sign,
            _ => return None,
        };
        Some(func)
    }

    pub fn apply(self, x: f64) -> f64 {
        match self {
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Asin => x.asin(),
            Function::Acos => x.acos(),
            Function::Atan => x.atan(),
            // Negative inputs use their magnitude.
            Function::Sqrt => x.abs().sqrt(),
            Function::Sqr => x * x,
            Function::Abs => x.abs(),
            Function::Floor => x.floor(),
            Function::Ceil => x.ceil(),
            Function::Exp => x.exp(),
            Function::Log => x.ln(),
            Function::Sign => {
                if x > 0.0 {
                    1.0
                } else if x < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Resolves the named constants scripts may use in place of a number.
pub fn named_constant(name: &str) -> Option<f64> {
    match name {
        "PI" => Some(std::f64::consts::PI),
        "E" => Some(std::f64::consts::E),
        _ => None,
    }
}
