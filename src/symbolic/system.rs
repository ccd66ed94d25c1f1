//! Equation systems
//!
//! A [`System`] is the unit every builder in this crate produces: a named
//! bag of equations, states, parameters, default values, and nested
//! subsystems. Composition rules:
//!
//! - At most one defining equation per symbol. Inserting an equation for an
//!   already-defined symbol replaces the previous one — this is how a
//!   network swaps a compartment's pinned synaptic-current equation for the
//!   real coupling sum.
//! - [`System::flatten`] namespaces every subsystem's content with
//!   `<subsystem name>.` and then overlays the parent's own equations and
//!   defaults, parent entries winning. Default values do not otherwise
//!   cross subsystem boundaries.
//! - [`System::simplify`] structurally eliminates redundant algebraic
//!   states (forwarding aliases, current definitions) by inlining them,
//!   reporting each as an observed binding. Self-referential algebraic
//!   equations and cycles are kept as ordered assignments instead.
//!
//! Equation order is insignificant to correctness; all orderings here exist
//! only to make output deterministic for a given input ordering.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::symbolic::expr::{EvalEnv, Expr, Symbol};

/// Left-hand side of an equation.
#[derive(Clone, Debug, PartialEq)]
pub enum Lhs {
    /// First time-derivative of a state.
    Deriv(Symbol),
    /// Algebraic definition of a state.
    Alg(Symbol),
}

impl Lhs {
    /// The symbol this equation defines.
    pub fn defined(&self) -> &Symbol {
        match self {
            Lhs::Deriv(s) | Lhs::Alg(s) => s,
        }
    }

    pub fn is_deriv(&self) -> bool {
        matches!(self, Lhs::Deriv(_))
    }
}

/// One equation: left-hand side ~ right-hand side.
#[derive(Clone, Debug, PartialEq)]
pub struct Equation {
    pub lhs: Lhs,
    pub rhs: Expr,
}

impl Equation {
    /// `d(sym)/dt ~ rhs`
    pub fn deriv(sym: Symbol, rhs: Expr) -> Self {
        Self {
            lhs: Lhs::Deriv(sym),
            rhs,
        }
    }

    /// `sym ~ rhs`
    pub fn alg(sym: Symbol, rhs: Expr) -> Self {
        Self {
            lhs: Lhs::Alg(sym),
            rhs,
        }
    }

    /// The symbol this equation defines.
    pub fn defined(&self) -> &Symbol {
        self.lhs.defined()
    }

    fn namespaced(&self, prefix: &str) -> Equation {
        let lhs = match &self.lhs {
            Lhs::Deriv(s) => Lhs::Deriv(s.namespaced(prefix)),
            Lhs::Alg(s) => Lhs::Alg(s.namespaced(prefix)),
        };
        Equation {
            lhs,
            rhs: self.rhs.namespaced(prefix),
        }
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lhs {
            Lhs::Deriv(s) => write!(f, "d({s})/dt ~ {}", self.rhs),
            Lhs::Alg(s) => write!(f, "{s} ~ {}", self.rhs),
        }
    }
}

/// A declared default: either a plain number or an expression resolved
/// numerically when an initial-value problem is formed.
#[derive(Clone, Debug, PartialEq)]
pub enum DefaultValue {
    Num(f64),
    Expr(Expr),
}

impl From<f64> for DefaultValue {
    fn from(v: f64) -> Self {
        DefaultValue::Num(v)
    }
}

impl From<Expr> for DefaultValue {
    fn from(e: Expr) -> Self {
        DefaultValue::Expr(e)
    }
}

impl DefaultValue {
    fn namespaced(&self, prefix: &str) -> DefaultValue {
        match self {
            DefaultValue::Num(v) => DefaultValue::Num(*v),
            DefaultValue::Expr(e) => DefaultValue::Expr(e.namespaced(prefix)),
        }
    }
}

/// A named equation system with nested subsystems.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct System {
    name: String,
    equations: Vec<Equation>,
    states: Vec<Symbol>,
    params: Vec<Symbol>,
    defaults: BTreeMap<Symbol, DefaultValue>,
    subsystems: Vec<System>,
}

impl System {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy of this system under a different name (the namespace prefix it
    /// flattens under when nested).
    pub fn renamed(&self, name: impl Into<String>) -> System {
        let mut out = self.clone();
        out.name = name.into();
        out
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn states(&self) -> &[Symbol] {
        &self.states
    }

    pub fn params(&self) -> &[Symbol] {
        &self.params
    }

    pub fn defaults(&self) -> &BTreeMap<Symbol, DefaultValue> {
        &self.defaults
    }

    pub fn subsystems(&self) -> &[System] {
        &self.subsystems
    }

    /// The defining equation for a symbol, if present at this level.
    pub fn equation_for(&self, sym: &Symbol) -> Option<&Equation> {
        self.equations.iter().find(|e| e.defined() == sym)
    }

    /// Register a state. Duplicates (by name) are ignored.
    pub fn add_state(&mut self, sym: Symbol) {
        if !self.states.contains(&sym) && !self.params.contains(&sym) {
            self.states.push(sym);
        }
    }

    /// Register a parameter. Duplicates (by name) are ignored.
    pub fn add_param(&mut self, sym: Symbol) {
        if !self.params.contains(&sym) && !self.states.contains(&sym) {
            self.params.push(sym);
        }
    }

    /// Whether a symbol is registered as a state or parameter here.
    pub fn declares(&self, sym: &Symbol) -> bool {
        self.states.contains(sym) || self.params.contains(sym)
    }

    /// Insert an equation, replacing any existing equation that defines the
    /// same symbol. The left-hand side is never duplicated.
    pub fn add_equation(&mut self, eq: Equation) {
        match self
            .equations
            .iter()
            .position(|e| e.defined() == eq.defined())
        {
            Some(i) => self.equations[i] = eq,
            None => self.equations.push(eq),
        }
    }

    /// Declare a default value, replacing any previous one.
    pub fn set_default(&mut self, sym: Symbol, value: impl Into<DefaultValue>) {
        self.defaults.insert(sym, value.into());
    }

    /// Nest a subsystem. Its content is namespaced by its name on flatten.
    pub fn add_subsystem(&mut self, sub: System) {
        self.subsystems.push(sub);
    }

    /// Collapse the subsystem tree into a single flat system.
    ///
    /// Every subsystem symbol is renamed `<subsystem>.<symbol>`, recursively.
    /// The parent's own equations and defaults are applied last and replace
    /// subsystem entries for the same flattened symbol.
    pub fn flatten(&self) -> System {
        let mut flat = System::new(self.name.clone());
        for sub in &self.subsystems {
            let inner = sub.flatten();
            let prefix = inner.name.clone();
            for eq in &inner.equations {
                flat.add_equation(eq.namespaced(&prefix));
            }
            for s in &inner.states {
                flat.add_state(s.namespaced(&prefix));
            }
            for p in &inner.params {
                flat.add_param(p.namespaced(&prefix));
            }
            for (sym, dv) in &inner.defaults {
                flat.defaults
                    .insert(sym.namespaced(&prefix), dv.namespaced(&prefix));
            }
        }
        for s in &self.states {
            flat.add_state(s.clone());
        }
        for p in &self.params {
            flat.add_param(p.clone());
        }
        for eq in &self.equations {
            flat.add_equation(eq.clone());
        }
        for (sym, dv) in &self.defaults {
            flat.defaults.insert(sym.clone(), dv.clone());
        }
        flat
    }

    /// Structurally simplify: flatten, then eliminate every algebraic state
    /// whose definition can be inlined. Eliminated definitions become
    /// observed bindings; self-referential definitions (and members of
    /// definition cycles) are kept as ordered assignments.
    pub fn simplify(&self) -> SimplifiedSystem {
        let flat = self.flatten();

        let mut derivs: Vec<Equation> = Vec::new();
        let mut alg: Vec<(Symbol, Expr)> = Vec::new();
        for eq in &flat.equations {
            match &eq.lhs {
                Lhs::Deriv(_) => derivs.push(eq.clone()),
                Lhs::Alg(s) => alg.push((s.clone(), eq.rhs.clone())),
            }
        }

        // Self-referential definitions can never be inlined.
        let (candidates, mut kept): (Vec<_>, Vec<_>) =
            alg.into_iter().partition(|(s, rhs)| !rhs.contains(s));

        // Dependency-order the candidates (definitions a candidate refers to
        // come first), dropping cycle members into the kept list.
        let names: BTreeSet<Symbol> = candidates.iter().map(|(s, _)| s.clone()).collect();
        let mut remaining: BTreeMap<Symbol, Expr> = candidates.iter().cloned().collect();
        let mut inlined: BTreeMap<Symbol, Expr> = BTreeMap::new();
        loop {
            let ready: Vec<Symbol> = remaining
                .iter()
                .filter(|(_, rhs)| {
                    rhs.free_symbols()
                        .iter()
                        .all(|s| !names.contains(s) || inlined.contains_key(s))
                })
                .map(|(s, _)| s.clone())
                .collect();
            if ready.is_empty() {
                break;
            }
            for sym in ready {
                let rhs = remaining.remove(&sym).expect("ready symbol present");
                let rhs = rhs.substitute(&inlined);
                inlined.insert(sym, rhs);
            }
        }
        if !remaining.is_empty() {
            log::debug!(
                "keeping {} cyclic algebraic definitions as assignments",
                remaining.len()
            );
            // Preserve original equation order for cycle members.
            for (s, rhs) in candidates {
                if remaining.contains_key(&s) {
                    kept.push((s, rhs));
                }
            }
        }

        let assignments: Vec<Equation> = kept
            .into_iter()
            .map(|(s, rhs)| Equation::alg(s, rhs.substitute(&inlined)))
            .collect();
        let derivs: Vec<Equation> = derivs
            .into_iter()
            .map(|eq| Equation {
                lhs: eq.lhs,
                rhs: eq.rhs.substitute(&inlined),
            })
            .collect();

        let diff_states: Vec<Symbol> = derivs.iter().map(|e| e.defined().clone()).collect();
        let observed: Vec<(Symbol, Expr)> = inlined.into_iter().collect();

        SimplifiedSystem {
            name: flat.name.clone(),
            diff_states,
            derivs,
            assignments,
            observed,
            params: flat.params.clone(),
            defaults: flat.defaults,
        }
    }

    /// Serializable snapshot of the flattened system, for introspection.
    pub fn summary(&self) -> SystemSummary {
        let flat = self.flatten();
        SystemSummary {
            name: flat.name.clone(),
            states: flat.states.iter().map(|s| s.name().to_string()).collect(),
            parameters: flat.params.iter().map(|s| s.name().to_string()).collect(),
            equations: flat.equations.iter().map(|e| e.to_string()).collect(),
            defaults: flat
                .defaults
                .iter()
                .map(|(s, d)| {
                    let rendered = match d {
                        DefaultValue::Num(v) => v.to_string(),
                        DefaultValue::Expr(e) => e.to_string(),
                    };
                    (s.name().to_string(), rendered)
                })
                .collect(),
        }
    }
}

/// Result of structural simplification: differential equations plus the
/// algebraic assignments that survived, with everything else inlined.
#[derive(Clone, Debug, PartialEq)]
pub struct SimplifiedSystem {
    pub name: String,
    /// Differential states, in equation order.
    pub diff_states: Vec<Symbol>,
    /// One derivative equation per entry of `diff_states`, same order.
    pub derivs: Vec<Equation>,
    /// Algebraic assignments kept (self-referential or cyclic), in original
    /// equation order.
    pub assignments: Vec<Equation>,
    /// Eliminated algebraic states and their fully inlined definitions,
    /// ordered by name.
    pub observed: Vec<(Symbol, Expr)>,
    pub params: Vec<Symbol>,
    pub defaults: BTreeMap<Symbol, DefaultValue>,
}

impl SimplifiedSystem {
    /// The fully inlined definition of an eliminated algebraic state.
    pub fn observed_for(&self, name: &str) -> Option<&Expr> {
        self.observed
            .iter()
            .find(|(s, _)| s.name() == name)
            .map(|(_, e)| e)
    }
}

/// Resolve every declared default to a number.
///
/// Expression defaults are evaluated against the numeric ones by fixed
/// point: a gate's steady-state expression resolves against the propagated
/// initial voltage. A default that never resolves is an error.
pub fn resolve_defaults(
    defaults: &BTreeMap<Symbol, DefaultValue>,
) -> Result<BTreeMap<String, f64>> {
    let mut resolved: BTreeMap<String, f64> = BTreeMap::new();
    let mut pending: Vec<(&Symbol, &Expr)> = Vec::new();
    for (sym, dv) in defaults {
        match dv {
            DefaultValue::Num(v) => {
                resolved.insert(sym.name().to_string(), *v);
            }
            DefaultValue::Expr(e) => pending.push((sym, e)),
        }
    }
    while !pending.is_empty() {
        let mut progress = false;
        let mut still = Vec::with_capacity(pending.len());
        for (sym, e) in pending {
            match e.eval(&EvalEnv::new(0.0, &resolved)) {
                Ok(v) => {
                    resolved.insert(sym.name().to_string(), v);
                    progress = true;
                }
                Err(_) => still.push((sym, e)),
            }
        }
        if !progress {
            return Err(ModelError::UnresolvedDefault(
                still[0].0.name().to_string(),
            ));
        }
        pending = still;
    }
    Ok(resolved)
}

/// Serializable introspection snapshot of a flattened system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemSummary {
    pub name: String,
    pub states: Vec<String>,
    pub parameters: Vec<String>,
    pub equations: Vec<String>,
    pub defaults: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Symbol {
        Symbol::state(name)
    }

    #[test]
    fn test_add_equation_replaces_same_lhs() {
        let mut sys = System::new("s");
        let x = sym("x");
        sys.add_equation(Equation::deriv(x.clone(), Expr::Num(0.0)));
        sys.add_equation(Equation::alg(x.clone(), Expr::Num(1.0)));
        assert_eq!(sys.equations().len(), 1);
        assert_eq!(sys.equation_for(&x).unwrap().rhs, Expr::Num(1.0));
    }

    #[test]
    fn test_flatten_namespaces_subsystem() {
        let mut sub = System::new("chan");
        let g = sym("g");
        sub.add_state(g.clone());
        sub.add_equation(Equation::alg(g.clone(), Expr::Num(3.0)));
        sub.set_default(g, 3.0);

        let mut parent = System::new("cell");
        parent.add_subsystem(sub);
        let flat = parent.flatten();

        let ns = sym("chan.g");
        assert!(flat.states().contains(&ns));
        assert_eq!(flat.equation_for(&ns).unwrap().rhs, Expr::Num(3.0));
        assert!(flat.defaults().contains_key(&ns));
        assert!(flat.subsystems().is_empty());
    }

    #[test]
    fn test_flatten_parent_overrides_subsystem_equation() {
        let mut sub = System::new("a");
        let isyn = sym("Isyn");
        sub.add_state(isyn.clone());
        sub.add_equation(Equation::deriv(isyn.clone(), Expr::Num(0.0)));

        let mut parent = System::new("net");
        parent.add_subsystem(sub);
        let coupled = sym("a.Isyn");
        parent.add_equation(Equation::alg(coupled.clone(), Expr::Num(7.0)));

        let flat = parent.flatten();
        let eq = flat.equation_for(&coupled).unwrap();
        assert!(!eq.lhs.is_deriv(), "parent equation must win");
        assert_eq!(eq.rhs, Expr::Num(7.0));
        assert_eq!(
            flat.equations()
                .iter()
                .filter(|e| e.defined() == &coupled)
                .count(),
            1
        );
    }

    #[test]
    fn test_flatten_parent_overrides_subsystem_default() {
        let mut sub = System::new("chan");
        let v = sym("V");
        sub.add_state(v.clone());
        sub.set_default(v, 0.0);

        let mut parent = System::new("cell");
        parent.add_subsystem(sub);
        parent.set_default(sym("chan.V"), -65.0);

        let flat = parent.flatten();
        assert_eq!(
            flat.defaults().get(&sym("chan.V")),
            Some(&DefaultValue::Num(-65.0))
        );
    }

    #[test]
    fn test_simplify_inlines_alias_chain() {
        // x' = b, b ~ a, a ~ 2  =>  x' = 2, both a and b observed
        let mut sys = System::new("s");
        let (x, a, b) = (sym("x"), sym("a"), sym("b"));
        sys.add_state(x.clone());
        sys.add_state(a.clone());
        sys.add_state(b.clone());
        sys.add_equation(Equation::deriv(x.clone(), Expr::from(&b)));
        sys.add_equation(Equation::alg(b.clone(), Expr::from(&a)));
        sys.add_equation(Equation::alg(a.clone(), Expr::Num(2.0)));

        let simp = sys.simplify();
        assert_eq!(simp.derivs.len(), 1);
        assert_eq!(simp.derivs[0].rhs, Expr::Num(2.0));
        assert!(simp.assignments.is_empty());
        assert_eq!(simp.observed_for("a"), Some(&Expr::Num(2.0)));
        assert_eq!(simp.observed_for("b"), Some(&Expr::Num(2.0)));
    }

    #[test]
    fn test_simplify_keeps_self_referential_assignment() {
        let mut sys = System::new("s");
        let i = sym("Iapp");
        sys.add_state(i.clone());
        sys.add_equation(Equation::alg(i.clone(), Expr::from(&i) + 1.0));

        let simp = sys.simplify();
        assert_eq!(simp.assignments.len(), 1);
        assert_eq!(simp.assignments[0].defined(), &i);
        assert!(simp.observed.is_empty());
    }

    #[test]
    fn test_resolve_defaults_fixed_point() {
        let mut defaults = BTreeMap::new();
        let v = sym("V");
        let m = sym("m");
        defaults.insert(v.clone(), DefaultValue::Num(-60.0));
        // m0 = -V / 100
        defaults.insert(
            m,
            DefaultValue::Expr(-Expr::from(&v) / 100.0),
        );
        let resolved = resolve_defaults(&defaults).unwrap();
        assert_eq!(resolved["V"], -60.0);
        assert!((resolved["m"] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_resolve_defaults_unresolvable_errors() {
        let mut defaults = BTreeMap::new();
        defaults.insert(
            sym("m"),
            DefaultValue::Expr(Expr::from(&sym("ghost"))),
        );
        assert!(matches!(
            resolve_defaults(&defaults),
            Err(ModelError::UnresolvedDefault(_))
        ));
    }

    #[test]
    fn test_determinism_same_input_same_output() {
        let build = || {
            let mut sys = System::new("s");
            let x = sym("x");
            sys.add_state(x.clone());
            sys.add_equation(Equation::deriv(x, Expr::Num(1.0)));
            sys.set_default(sym("x"), 0.5);
            sys
        };
        assert_eq!(build(), build());
        assert_eq!(build().simplify(), build().simplify());
    }
}
