//! Simulation handoff
//!
//! Lowers a built compartment or network system to a solver-ready
//! [`InitialValueProblem`]: flatten, structurally simplify, resolve every
//! declared default to a number, and fix an ordered state vector over
//! `[0, duration]`.
//!
//! Algebraic assignments that survived simplification (the self-referential
//! stimulus form `I_app ~ f(t, I_app)`) are evaluated in order on every
//! right-hand-side call; a self-reference reads the previous value, seeded
//! from defaults.
//!
//! [`InitialValueProblem::integrate`] is a fixed-step RK4 reference
//! integrator for validating assembled models; production use hands the
//! problem to an external solver.

use std::collections::BTreeMap;

use crate::compartment::Compartment;
use crate::error::{ModelError, Result};
use crate::network::Network;
use crate::symbolic::{resolve_defaults, EvalEnv, Expr, System};
use crate::units::TimeSpan;

/// A solver-ready initial-value problem.
#[derive(Clone, Debug)]
pub struct InitialValueProblem {
    name: String,
    states: Vec<String>,
    y0: Vec<f64>,
    tspan: (f64, f64),
    derivs: Vec<Expr>,
    assignments: Vec<(String, Expr)>,
    assign0: BTreeMap<String, f64>,
    observed: Vec<(String, Expr)>,
    params: BTreeMap<String, f64>,
}

impl InitialValueProblem {
    /// Lower a system to an initial-value problem spanning `[0, duration]`,
    /// taking initial values from the declared defaults.
    pub fn from_system(system: &System, duration: TimeSpan) -> Result<Self> {
        let simp = system.simplify();
        let resolved = resolve_defaults(&simp.defaults)?;

        let require = |name: &str| -> Result<f64> {
            resolved
                .get(name)
                .copied()
                .ok_or_else(|| ModelError::UnresolvedDefault(name.to_string()))
        };

        let mut params = BTreeMap::new();
        for p in &simp.params {
            params.insert(p.name().to_string(), require(p.name())?);
        }

        let states: Vec<String> = simp
            .diff_states
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        let y0 = states
            .iter()
            .map(|name| require(name))
            .collect::<Result<Vec<f64>>>()?;

        let assignments: Vec<(String, Expr)> = simp
            .assignments
            .iter()
            .map(|eq| (eq.defined().name().to_string(), eq.rhs.clone()))
            .collect();
        let mut assign0 = BTreeMap::new();
        for (name, _) in &assignments {
            assign0.insert(name.clone(), require(name)?);
        }

        let observed = simp
            .observed
            .iter()
            .map(|(s, e)| (s.name().to_string(), e.clone()))
            .collect();

        Ok(Self {
            name: simp.name.clone(),
            states,
            y0,
            tspan: (0.0, duration.value()),
            derivs: simp.derivs.iter().map(|eq| eq.rhs.clone()).collect(),
            assignments,
            assign0,
            observed,
            params,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Differential state names, fixing the order of `y0` and `rhs` output.
    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn y0(&self) -> &[f64] {
        &self.y0
    }

    pub fn tspan(&self) -> (f64, f64) {
        self.tspan
    }

    /// Resolved parameter values.
    pub fn params(&self) -> &BTreeMap<String, f64> {
        &self.params
    }

    /// Evaluation environment at `(t, y)`: parameters, states, then the
    /// ordered algebraic assignments (self-references reading `prev`).
    fn env_at(
        &self,
        t: f64,
        y: &[f64],
        prev: &BTreeMap<String, f64>,
    ) -> Result<BTreeMap<String, f64>> {
        let mut values = self.params.clone();
        for (name, v) in self.states.iter().zip(y) {
            values.insert(name.clone(), *v);
        }
        for (name, v) in prev {
            values.insert(name.clone(), *v);
        }
        for (name, expr) in &self.assignments {
            let v = expr.eval(&EvalEnv::new(t, &values))?;
            values.insert(name.clone(), v);
        }
        Ok(values)
    }

    /// Derivatives at `(t, y)`, with `prev` supplying the previous
    /// algebraic-assignment values.
    pub fn rhs(&self, t: f64, y: &[f64], prev: &BTreeMap<String, f64>) -> Result<Vec<f64>> {
        let values = self.env_at(t, y, prev)?;
        let env = EvalEnv::new(t, &values);
        self.derivs.iter().map(|d| d.eval(&env)).collect()
    }

    fn assignments_at(
        &self,
        t: f64,
        y: &[f64],
        prev: &BTreeMap<String, f64>,
    ) -> Result<BTreeMap<String, f64>> {
        let values = self.env_at(t, y, prev)?;
        Ok(self
            .assignments
            .iter()
            .map(|(name, _)| (name.clone(), values[name]))
            .collect())
    }

    /// Fixed-step fourth-order Runge-Kutta over the whole time span.
    pub fn integrate(&self, dt: f64) -> Result<Trajectory> {
        assert!(dt > 0.0, "dt must be positive");
        let (t0, t1) = self.tspan;
        let steps = ((t1 - t0) / dt).round() as usize;

        let mut y = self.y0.clone();
        let mut assign = self.assign0.clone();
        let mut times = Vec::with_capacity(steps + 1);
        let mut rows = Vec::with_capacity(steps + 1);

        let mut t = t0;
        assign = self.assignments_at(t, &y, &assign)?;
        times.push(t);
        rows.push(self.row(&y, &assign));

        for _ in 0..steps {
            let h = dt;
            let k1 = self.rhs(t, &y, &assign)?;
            let k2 = self.rhs(t + h / 2.0, &shift(&y, &k1, h / 2.0), &assign)?;
            let k3 = self.rhs(t + h / 2.0, &shift(&y, &k2, h / 2.0), &assign)?;
            let k4 = self.rhs(t + h, &shift(&y, &k3, h), &assign)?;
            for i in 0..y.len() {
                y[i] += h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
            }
            t += h;
            assign = self.assignments_at(t, &y, &assign)?;
            times.push(t);
            rows.push(self.row(&y, &assign));
        }

        Ok(Trajectory {
            columns: self
                .states
                .iter()
                .cloned()
                .chain(self.assignments.iter().map(|(n, _)| n.clone()))
                .collect(),
            times,
            rows,
        })
    }

    fn row(&self, y: &[f64], assign: &BTreeMap<String, f64>) -> Vec<f64> {
        y.iter()
            .copied()
            .chain(self.assignments.iter().map(|(n, _)| assign[n]))
            .collect()
    }

    /// Evaluate an eliminated algebraic state along a trajectory.
    pub fn observed_series(&self, traj: &Trajectory, name: &str) -> Result<Vec<f64>> {
        let expr = self
            .observed
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
            .ok_or_else(|| ModelError::UndefinedSymbol(name.to_string()))?;

        let mut out = Vec::with_capacity(traj.times.len());
        for (i, t) in traj.times.iter().enumerate() {
            let mut values = self.params.clone();
            for (name, v) in traj.columns.iter().zip(&traj.rows[i]) {
                values.insert(name.clone(), *v);
            }
            out.push(expr.eval(&EvalEnv::new(*t, &values))?);
        }
        Ok(out)
    }
}

fn shift(y: &[f64], k: &[f64], h: f64) -> Vec<f64> {
    y.iter().zip(k).map(|(a, b)| a + h * b).collect()
}

/// A sampled solution: one row per time point, columns being the
/// differential states followed by the kept algebraic assignments.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    pub times: Vec<f64>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Trajectory {
    /// The full series for one column.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// The final value of one column.
    pub fn last(&self, name: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.rows.last().map(|r| r[idx])
    }
}

impl Compartment {
    /// Solver-ready problem for this compartment over `[0, duration]`.
    pub fn problem(&self, duration: TimeSpan) -> Result<InitialValueProblem> {
        InitialValueProblem::from_system(self.system(), duration)
    }
}

impl Network {
    /// Solver-ready problem for this network over `[0, duration]`.
    pub fn problem(&self, duration: TimeSpan) -> Result<InitialValueProblem> {
        InitialValueProblem::from_system(self.system(), duration)
    }
}
