//! Gating variables
//!
//! One voltage- or ligand-dependent state variable and its first-order ODE.
//! Two kinetic law families exist, each a variant of the closed
//! [`GateKinetics`] sum type:
//!
//! - **Alpha/Beta**: forward/backward rates give
//!   `d(x)/dt = α·(1−x) − β·x`, steady state `α/(α+β)`.
//! - **Steady-State/Tau**: `d(x)/dt = (x∞ − x)/τ`, steady state `x∞`.
//!
//! [`Gate::from_named`] is the validating entry point for named-expression
//! input; the typed constructors are statically safe.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::symbolic::{Equation, Expr, Symbol};

/// The fixed vocabulary of gate state names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateName {
    M,
    H,
    N,
}

impl GateName {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateName::M => "m",
            GateName::H => "h",
            GateName::N => "n",
        }
    }
}

/// The two supported kinetic law families.
#[derive(Clone, Debug, PartialEq)]
pub enum GateKinetics {
    /// Forward/backward rate expressions.
    AlphaBeta { alpha: Expr, beta: Expr },
    /// Steady-state and time-constant expressions.
    SteadyStateTau { steady: Expr, tau: Expr },
}

/// One gating variable: a state symbol, its kinetics, and the exponent it
/// contributes to a conductance product (default 1, only applied when ≠ 1).
#[derive(Clone, Debug, PartialEq)]
pub struct Gate {
    name: GateName,
    kinetics: GateKinetics,
    exponent: i32,
}

impl Gate {
    /// Alpha/Beta form for state m, h, or n.
    pub fn alpha_beta(name: GateName, alpha: Expr, beta: Expr) -> Self {
        Self {
            name,
            kinetics: GateKinetics::AlphaBeta { alpha, beta },
            exponent: 1,
        }
    }

    /// Steady-State/Tau form for state m or h.
    pub fn steady_state_tau(name: GateName, steady: Expr, tau: Expr) -> Self {
        Self {
            name,
            kinetics: GateKinetics::SteadyStateTau { steady, tau },
            exponent: 1,
        }
    }

    /// Build from named expressions. Requires exactly two entries whose
    /// names match one recognized rate-law set:
    /// `alpha_m`/`beta_m`, `alpha_h`/`beta_h`, `alpha_n`/`beta_n`,
    /// `m_inf`/`tau_m`, or `h_inf`/`tau_h`.
    pub fn from_named(pairs: &[(&str, Expr)]) -> Result<Gate> {
        if pairs.len() != 2 {
            return Err(ModelError::InvalidGateEquationCount(pairs.len()));
        }
        let lookup = |key: &str| -> Option<Expr> {
            pairs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, e)| e.clone())
        };
        let sets: [(&str, &str, GateName, bool); 5] = [
            ("alpha_m", "beta_m", GateName::M, true),
            ("alpha_h", "beta_h", GateName::H, true),
            ("alpha_n", "beta_n", GateName::N, true),
            ("m_inf", "tau_m", GateName::M, false),
            ("h_inf", "tau_h", GateName::H, false),
        ];
        for (first, second, name, is_alpha_beta) in sets {
            if let (Some(a), Some(b)) = (lookup(first), lookup(second)) {
                return Ok(if is_alpha_beta {
                    Gate::alpha_beta(name, a, b)
                } else {
                    Gate::steady_state_tau(name, a, b)
                });
            }
        }
        Err(ModelError::InvalidGateArguments(
            pairs.iter().map(|(n, _)| n.to_string()).collect(),
        ))
    }

    /// Record the power this gate contributes to the conductance product.
    pub fn with_exponent(mut self, exponent: i32) -> Self {
        self.exponent = exponent;
        self
    }

    pub fn name(&self) -> GateName {
        self.name
    }

    pub fn kinetics(&self) -> &GateKinetics {
        &self.kinetics
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// The gate's state symbol.
    pub fn symbol(&self) -> Symbol {
        Symbol::state(self.name.as_str())
    }

    /// The gate's single differential equation.
    pub fn ode(&self) -> Equation {
        let x = Expr::from(self.symbol());
        let rhs = match &self.kinetics {
            GateKinetics::AlphaBeta { alpha, beta } => {
                alpha.clone() * (1.0 - x.clone()) - beta.clone() * x
            }
            GateKinetics::SteadyStateTau { steady, tau } => {
                (steady.clone() - x) / tau.clone()
            }
        };
        Equation::deriv(self.symbol(), rhs)
    }

    /// The steady-state expression used as this gate's initial value.
    pub fn steady_state(&self) -> Option<Expr> {
        match &self.kinetics {
            GateKinetics::AlphaBeta { alpha, beta } => {
                Some(alpha.clone() / (alpha.clone() + beta.clone()))
            }
            GateKinetics::SteadyStateTau { steady, .. } => Some(steady.clone()),
        }
    }

    /// The gate's factor in a conductance product: `x` or `x^n`.
    pub fn factor(&self) -> Expr {
        let x = Expr::from(self.symbol());
        if self.exponent == 1 {
            x
        } else {
            x.powi(self.exponent)
        }
    }
}
