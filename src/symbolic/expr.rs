//! Symbols and expressions
//!
//! The expression substrate the assembly engine is written against. A
//! `Symbol` is a named model variable with two pieces of metadata riding
//! along: its [`SymbolKind`] (time-varying state vs. time-invariant
//! parameter) and an explicit [`Role`] (membrane current, equilibrium
//! potential, ion concentration). Symbol identity is the name alone —
//! metadata never splits two symbols with the same name, which is what
//! makes roles usable as a side-channel keyed by stable identity.
//!
//! `Expr` is a closed AST: numbers, symbols, the time variable, negation,
//! exponential, the four arithmetic operators, power, and opaque
//! host-function application (used for stimulus waveforms). Arithmetic
//! operators are overloaded so assembly code reads as mathematics:
//!
//! ```
//! use neurosym::symbolic::{Expr, Symbol};
//!
//! let v = Symbol::state("V");
//! let alpha = 0.07 * Expr::exp(-0.05 * (Expr::from(&v) + 65.0));
//! assert!(alpha.free_symbols().contains(&v));
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops;
use std::sync::Arc;

use crate::error::{ModelError, Result};
use crate::ion::{Ion, Location};

/// Whether a symbol varies with time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    /// Time-varying: a state of some system.
    State,
    /// Time-invariant: a parameter.
    Parameter,
}

/// Out-of-band role metadata carried on a symbol.
///
/// The assembly engine reads roles to resolve per-ion current aggregation
/// and to seed concentration defaults; symbols with `Role::None` are plain
/// variables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// No special meaning.
    None,
    /// A membrane current. `aggregate` distinguishes the virtual per-ion
    /// summary current from a concrete per-channel current.
    Current { ion: Ion, aggregate: bool },
    /// An equilibrium (reversal) potential for an ion.
    Equilibrium { ion: Ion },
    /// An ion concentration on one side of the membrane.
    Concentration { ion: Ion, location: Location },
}

/// A named model variable.
///
/// Equality, ordering, and hashing use the name only; `kind` and `role`
/// are metadata attached to that identity.
#[derive(Clone)]
pub struct Symbol {
    name: Arc<str>,
    kind: SymbolKind,
    role: Role,
}

impl Symbol {
    /// Create a time-varying symbol.
    pub fn state(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            kind: SymbolKind::State,
            role: Role::None,
        }
    }

    /// Create a time-invariant symbol.
    pub fn parameter(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            kind: SymbolKind::Parameter,
            role: Role::None,
        }
    }

    /// Attach a role, consuming self.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_parameter(&self) -> bool {
        self.kind == SymbolKind::Parameter
    }

    /// Copy of this symbol living inside the namespace `prefix`.
    pub fn namespaced(&self, prefix: &str) -> Symbol {
        Symbol {
            name: Arc::from(format!("{prefix}.{}", self.name)),
            kind: self.kind,
            role: self.role,
        }
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Symbol {}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SymbolKind::State => write!(f, "{}(t)", self.name),
            SymbolKind::Parameter => write!(f, "{}", self.name),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An opaque host function embedded in an expression, e.g. a stimulus
/// waveform. Structural equality compares the name, not the closure.
#[derive(Clone)]
pub struct HostFn {
    name: Arc<str>,
    arity: usize,
    f: Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>,
}

impl HostFn {
    pub fn new(
        name: impl AsRef<str>,
        arity: usize,
        f: impl Fn(&[f64]) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            arity,
            f: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn call(&self, args: &[f64]) -> Result<f64> {
        if args.len() != self.arity {
            return Err(ModelError::BadArity {
                name: self.name.to_string(),
                expected: self.arity,
                got: args.len(),
            });
        }
        Ok((self.f)(args))
    }
}

impl PartialEq for HostFn {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.arity == other.arity
    }
}

impl fmt::Debug for HostFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostFn({}/{})", self.name, self.arity)
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Exp,
}

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// A symbolic expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(Symbol),
    /// The independent time variable.
    Time,
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Apply(HostFn, Vec<Expr>),
}

impl Expr {
    /// e^x
    pub fn exp(x: impl Into<Expr>) -> Expr {
        Expr::Unary(UnaryOp::Exp, Box::new(x.into()))
    }

    /// x^n for an integer exponent.
    pub fn powi(self, n: i32) -> Expr {
        Expr::Binary(BinOp::Pow, Box::new(self), Box::new(Expr::Num(n as f64)))
    }

    /// x^y
    pub fn pow(self, y: impl Into<Expr>) -> Expr {
        Expr::Binary(BinOp::Pow, Box::new(self), Box::new(y.into()))
    }

    /// Apply a host function to arguments.
    pub fn apply(f: HostFn, args: Vec<Expr>) -> Expr {
        Expr::Apply(f, args)
    }

    /// Every symbol occurring free in this expression, ordered by name.
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        match self {
            Expr::Num(_) | Expr::Time => {}
            Expr::Var(s) => {
                out.insert(s.clone());
            }
            Expr::Unary(_, a) => a.collect_symbols(out),
            Expr::Binary(_, a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Expr::Apply(_, args) => {
                for a in args {
                    a.collect_symbols(out);
                }
            }
        }
    }

    /// Whether `sym` occurs anywhere in this expression.
    pub fn contains(&self, sym: &Symbol) -> bool {
        match self {
            Expr::Num(_) | Expr::Time => false,
            Expr::Var(s) => s == sym,
            Expr::Unary(_, a) => a.contains(sym),
            Expr::Binary(_, a, b) => a.contains(sym) || b.contains(sym),
            Expr::Apply(_, args) => args.iter().any(|a| a.contains(sym)),
        }
    }

    /// Replace every occurrence of each map key with its expression.
    pub fn substitute(&self, map: &BTreeMap<Symbol, Expr>) -> Expr {
        match self {
            Expr::Num(_) | Expr::Time => self.clone(),
            Expr::Var(s) => match map.get(s) {
                Some(e) => e.clone(),
                None => self.clone(),
            },
            Expr::Unary(op, a) => Expr::Unary(*op, Box::new(a.substitute(map))),
            Expr::Binary(op, a, b) => {
                Expr::Binary(*op, Box::new(a.substitute(map)), Box::new(b.substitute(map)))
            }
            Expr::Apply(f, args) => Expr::Apply(
                f.clone(),
                args.iter().map(|a| a.substitute(map)).collect(),
            ),
        }
    }

    /// Copy of this expression with every symbol moved into `prefix`.
    pub fn namespaced(&self, prefix: &str) -> Expr {
        match self {
            Expr::Num(_) | Expr::Time => self.clone(),
            Expr::Var(s) => Expr::Var(s.namespaced(prefix)),
            Expr::Unary(op, a) => Expr::Unary(*op, Box::new(a.namespaced(prefix))),
            Expr::Binary(op, a, b) => Expr::Binary(
                *op,
                Box::new(a.namespaced(prefix)),
                Box::new(b.namespaced(prefix)),
            ),
            Expr::Apply(f, args) => Expr::Apply(
                f.clone(),
                args.iter().map(|a| a.namespaced(prefix)).collect(),
            ),
        }
    }

    /// Evaluate to a number against an environment.
    pub fn eval(&self, env: &EvalEnv<'_>) -> Result<f64> {
        match self {
            Expr::Num(v) => Ok(*v),
            Expr::Time => Ok(env.t),
            Expr::Var(s) => env
                .values
                .get(s.name())
                .copied()
                .ok_or_else(|| ModelError::UndefinedSymbol(s.name().to_string())),
            Expr::Unary(op, a) => {
                let x = a.eval(env)?;
                Ok(match op {
                    UnaryOp::Neg => -x,
                    UnaryOp::Exp => x.exp(),
                })
            }
            Expr::Binary(op, a, b) => {
                let x = a.eval(env)?;
                let y = b.eval(env)?;
                Ok(match op {
                    BinOp::Add => x + y,
                    BinOp::Sub => x - y,
                    BinOp::Mul => x * y,
                    BinOp::Div => x / y,
                    BinOp::Pow => x.powf(y),
                })
            }
            Expr::Apply(f, args) => {
                let vals = args
                    .iter()
                    .map(|a| a.eval(env))
                    .collect::<Result<Vec<f64>>>()?;
                f.call(&vals)
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary(BinOp::Add | BinOp::Sub, ..) => 1,
            Expr::Binary(BinOp::Mul | BinOp::Div, ..) => 2,
            Expr::Binary(BinOp::Pow, ..) => 3,
            Expr::Unary(UnaryOp::Neg, _) => 2,
            _ => 4,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, parent: u8, tight: bool) -> fmt::Result {
        let mine = self.precedence();
        if mine < parent || (tight && mine == parent) {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

/// Evaluation environment: the current time plus a value per symbol name.
pub struct EvalEnv<'a> {
    pub t: f64,
    pub values: &'a BTreeMap<String, f64>,
}

impl<'a> EvalEnv<'a> {
    pub fn new(t: f64, values: &'a BTreeMap<String, f64>) -> Self {
        Self { t, values }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(v) => write!(f, "{v}"),
            Expr::Var(s) => write!(f, "{s}"),
            Expr::Time => write!(f, "t"),
            Expr::Unary(UnaryOp::Neg, a) => {
                write!(f, "-")?;
                a.fmt_child(f, self.precedence(), true)
            }
            Expr::Unary(UnaryOp::Exp, a) => write!(f, "exp({a})"),
            Expr::Binary(op, a, b) => {
                let (sym, tight_rhs) = match op {
                    BinOp::Add => ("+", false),
                    BinOp::Sub => ("-", true),
                    BinOp::Mul => ("*", false),
                    BinOp::Div => ("/", true),
                    BinOp::Pow => ("^", true),
                };
                let prec = self.precedence();
                a.fmt_child(f, prec, false)?;
                write!(f, " {sym} ")?;
                b.fmt_child(f, prec, tight_rhs)
            }
            Expr::Apply(func, args) => {
                write!(f, "{}(", func.name())?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::Num(v)
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Expr::Num(v as f64)
    }
}

impl From<Symbol> for Expr {
    fn from(s: Symbol) -> Self {
        Expr::Var(s)
    }
}

impl From<&Symbol> for Expr {
    fn from(s: &Symbol) -> Self {
        Expr::Var(s.clone())
    }
}

macro_rules! binary_ops {
    ($($trait:ident, $method:ident, $op:expr;)*) => {$(
        impl ops::$trait for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::Binary($op, Box::new(self), Box::new(rhs))
            }
        }

        impl ops::$trait<f64> for Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                Expr::Binary($op, Box::new(self), Box::new(Expr::Num(rhs)))
            }
        }

        impl ops::$trait<Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::Binary($op, Box::new(Expr::Num(self)), Box::new(rhs))
            }
        }
    )*};
}

binary_ops! {
    Add, add, BinOp::Add;
    Sub, sub, BinOp::Sub;
    Mul, mul, BinOp::Mul;
    Div, div, BinOp::Div;
}

impl ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Unary(UnaryOp::Neg, Box::new(self))
    }
}
