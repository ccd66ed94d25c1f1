//! Conductance builders
//!
//! An [`IonChannel`] or [`SynapticChannel`] composes zero or more gating
//! variables into one current-producing subsystem:
//!
//! ```text
//! g = gbar * m^3 * h        (one equation per gate alongside)
//! ```
//!
//! Building classifies every free symbol of the gate kinetics: symbols the
//! substrate marks time-invariant are parameters, everything else is an
//! external input to be bound by the enclosing compartment or network. A
//! gate's own symbol never becomes an input, and the input list carries no
//! duplicates.
//!
//! Channels are immutable; calling [`IonChannel::with_conductance`] returns
//! a new value with only the magnitude and its dependent default replaced.

use std::collections::BTreeSet;

use crate::error::{ModelError, Result};
use crate::gate::Gate;
use crate::ion::Ion;
use crate::symbolic::{Equation, Expr, Role, Symbol, System};
use crate::units::{Conductance, SpecificConductance, Voltage};

/// Shared kinetics assembly for gated conductances: one ODE per gate, the
/// conductance product equation, steady-state (or zero) gate defaults, and
/// input/parameter classification.
fn build_kinetics(
    name: &str,
    gates: &[Gate],
    magnitude: f64,
) -> Result<(System, Vec<Symbol>, Vec<Symbol>)> {
    let mut gate_syms: BTreeSet<Symbol> = BTreeSet::new();
    for gate in gates {
        if !gate_syms.insert(gate.symbol()) {
            return Err(ModelError::DuplicateGate(
                gate.symbol().name().to_string(),
            ));
        }
    }

    let mut sys = System::new(name);
    let mut input_set: BTreeSet<Symbol> = BTreeSet::new();
    let mut param_set: BTreeSet<Symbol> = BTreeSet::new();

    for gate in gates {
        let ode = gate.ode();
        for sym in ode.rhs.free_symbols() {
            if gate_syms.contains(&sym) {
                continue;
            }
            if sym.is_parameter() {
                param_set.insert(sym);
            } else {
                input_set.insert(sym);
            }
        }
        sys.add_state(gate.symbol());
        sys.add_equation(ode);
        match gate.steady_state() {
            Some(steady) => sys.set_default(gate.symbol(), steady),
            None => sys.set_default(gate.symbol(), 0.0),
        }
    }

    let gbar = Symbol::parameter("gbar");
    let mut product = Expr::from(&gbar);
    for gate in gates {
        product = product * gate.factor();
    }
    let g = Symbol::state("g");
    sys.add_state(g.clone());
    sys.add_equation(Equation::alg(g, product));
    sys.add_param(gbar.clone());
    sys.set_default(gbar.clone(), magnitude);

    for p in &param_set {
        sys.add_param(p.clone());
    }
    // Inputs are subsystem states bound by forwarding equations at the
    // enclosing level.
    for i in &input_set {
        sys.add_state(i.clone());
    }

    let mut params = vec![gbar];
    params.extend(param_set);
    Ok((sys, input_set.into_iter().collect(), params))
}

/// An ionic membrane conductance.
///
/// A channel with zero gating variables is passive: its conductance is one
/// bare scalar parameter with no states and no kinetics equations.
#[derive(Clone, Debug, PartialEq)]
pub struct IonChannel {
    name: String,
    ion: Ion,
    gates: Vec<Gate>,
    max_conductance: SpecificConductance,
    inputs: Vec<Symbol>,
    params: Vec<Symbol>,
    system: System,
}

impl IonChannel {
    /// Build a channel subsystem from gating variables and a maximal
    /// conductance magnitude.
    pub fn new(
        name: impl Into<String>,
        ion: Ion,
        gates: Vec<Gate>,
        max_conductance: SpecificConductance,
    ) -> Result<Self> {
        let name = name.into();
        let magnitude = max_conductance.value();

        let (system, inputs, params) = if gates.is_empty() {
            let mut sys = System::new(name.clone());
            let g = Symbol::parameter("g");
            sys.add_param(g.clone());
            sys.set_default(g.clone(), magnitude);
            (sys, Vec::new(), vec![g])
        } else {
            build_kinetics(&name, &gates, magnitude)?
        };

        Ok(Self {
            name,
            ion,
            gates,
            max_conductance,
            inputs,
            params,
            system,
        })
    }

    /// New channel identical to this one except for the maximal-conductance
    /// magnitude and its dependent default. `self` is untouched.
    pub fn with_conductance(&self, max_conductance: SpecificConductance) -> Self {
        let mut out = self.clone();
        out.max_conductance = max_conductance;
        let scale = out.scale_symbol();
        out.system.set_default(scale, max_conductance.value());
        out
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ion(&self) -> Ion {
        self.ion
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn max_conductance(&self) -> SpecificConductance {
        self.max_conductance
    }

    /// External inputs to be bound by the enclosing compartment.
    pub fn inputs(&self) -> &[Symbol] {
        &self.inputs
    }

    pub fn params(&self) -> &[Symbol] {
        &self.params
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    /// Whether this channel has no gating kinetics.
    pub fn is_passive(&self) -> bool {
        self.gates.is_empty()
    }

    /// The symbol producing this channel's total conductance.
    pub fn conductance_symbol(&self) -> Symbol {
        if self.is_passive() {
            Symbol::parameter("g")
        } else {
            Symbol::state("g")
        }
    }

    /// The scale parameter whose default is the stripped magnitude.
    fn scale_symbol(&self) -> Symbol {
        if self.is_passive() {
            Symbol::parameter("g")
        } else {
            Symbol::parameter("gbar")
        }
    }
}

/// A synaptic conductance.
///
/// Always builds the full kinetics path (no passive special case) and
/// additionally carries a reversal potential. The gating kinetics are
/// driven by the presynaptic membrane potential, bound during network
/// assembly.
#[derive(Clone, Debug, PartialEq)]
pub struct SynapticChannel {
    name: String,
    ion: Ion,
    gates: Vec<Gate>,
    max_conductance: Conductance,
    reversal: Voltage,
    inputs: Vec<Symbol>,
    params: Vec<Symbol>,
    system: System,
}

impl SynapticChannel {
    pub fn new(
        name: impl Into<String>,
        ion: Ion,
        gates: Vec<Gate>,
        max_conductance: Conductance,
        reversal: Voltage,
    ) -> Result<Self> {
        let name = name.into();
        let (system, inputs, params) =
            build_kinetics(&name, &gates, max_conductance.value())?;
        Ok(Self {
            name,
            ion,
            gates,
            max_conductance,
            reversal,
            inputs,
            params,
            system,
        })
    }

    /// New synapse identical to this one except for the magnitude and its
    /// dependent default.
    pub fn with_conductance(&self, max_conductance: Conductance) -> Self {
        let mut out = self.clone();
        out.max_conductance = max_conductance;
        out.system
            .set_default(Symbol::parameter("gbar"), max_conductance.value());
        out
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ion(&self) -> Ion {
        self.ion
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn max_conductance(&self) -> Conductance {
        self.max_conductance
    }

    pub fn reversal(&self) -> Voltage {
        self.reversal
    }

    /// The shared reversal-potential parameter for this synapse type.
    pub fn reversal_symbol(&self) -> Symbol {
        Symbol::parameter(format!("E_{}", self.name))
            .with_role(Role::Equilibrium { ion: self.ion })
    }

    pub fn inputs(&self) -> &[Symbol] {
        &self.inputs
    }

    pub fn params(&self) -> &[Symbol] {
        &self.params
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn conductance_symbol(&self) -> Symbol {
        Symbol::state("g")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateName;
    use crate::symbolic::DefaultValue;

    fn voltage_gate(name: GateName) -> Gate {
        let v = Symbol::state("V");
        Gate::alpha_beta(
            name,
            0.1 * (Expr::from(&v) + 40.0),
            4.0 * Expr::exp(-(Expr::from(&v) + 65.0) / 18.0),
        )
    }

    #[test]
    fn test_passive_channel_is_single_parameter() {
        let leak = IonChannel::new(
            "leak",
            Ion::NonSpecific,
            vec![],
            SpecificConductance::millisiemens_per_cm2(0.3),
        )
        .unwrap();
        assert!(leak.is_passive());
        assert!(leak.system().equations().is_empty());
        assert!(leak.system().states().is_empty());
        assert_eq!(leak.system().params().len(), 1);
        assert_eq!(
            leak.system().defaults().get(&Symbol::parameter("g")),
            Some(&DefaultValue::Num(0.3))
        );
    }

    #[test]
    fn test_gated_channel_conductance_product() {
        let na = IonChannel::new(
            "NaV",
            Ion::Sodium,
            vec![voltage_gate(GateName::M).with_exponent(3), voltage_gate(GateName::H)],
            SpecificConductance::millisiemens_per_cm2(120.0),
        )
        .unwrap();

        let g = Symbol::state("g");
        let eq = na.system().equation_for(&g).unwrap();
        assert_eq!(eq.rhs.to_string(), "gbar * m^3 * h");
        assert_eq!(
            na.system().defaults().get(&Symbol::parameter("gbar")),
            Some(&DefaultValue::Num(120.0))
        );
    }

    #[test]
    fn test_inputs_exclude_gate_symbols() {
        let na = IonChannel::new(
            "NaV",
            Ion::Sodium,
            vec![voltage_gate(GateName::M), voltage_gate(GateName::H)],
            SpecificConductance::millisiemens_per_cm2(120.0),
        )
        .unwrap();
        let inputs: Vec<&str> = na.inputs().iter().map(|s| s.name()).collect();
        assert_eq!(inputs, vec!["V"]);
    }

    #[test]
    fn test_parameter_symbols_classified() {
        let v = Symbol::state("V");
        let shift = Symbol::parameter("shift");
        let gate = Gate::alpha_beta(
            GateName::M,
            Expr::from(&v) + Expr::from(&shift),
            Expr::Num(1.0),
        );
        let chan = IonChannel::new(
            "shifted",
            Ion::Potassium,
            vec![gate],
            SpecificConductance::millisiemens_per_cm2(5.0),
        )
        .unwrap();
        assert!(chan.params().contains(&shift));
        assert!(!chan.inputs().contains(&shift));
        assert!(chan.inputs().contains(&v));
    }

    #[test]
    fn test_duplicate_gate_rejected() {
        let err = IonChannel::new(
            "bad",
            Ion::Sodium,
            vec![voltage_gate(GateName::M), voltage_gate(GateName::M)],
            SpecificConductance::millisiemens_per_cm2(1.0),
        )
        .unwrap_err();
        assert_eq!(err, ModelError::DuplicateGate("m".into()));
    }

    #[test]
    fn test_build_is_deterministic() {
        let build = || {
            IonChannel::new(
                "NaV",
                Ion::Sodium,
                vec![voltage_gate(GateName::M).with_exponent(3), voltage_gate(GateName::H)],
                SpecificConductance::millisiemens_per_cm2(120.0),
            )
            .unwrap()
        };
        let a = build();
        let b = build();
        assert_eq!(a.system(), b.system());
        assert_eq!(a.inputs(), b.inputs());
        assert_eq!(a.params(), b.params());
    }

    #[test]
    fn test_with_conductance_does_not_mutate_original() {
        let original = IonChannel::new(
            "NaV",
            Ion::Sodium,
            vec![voltage_gate(GateName::M)],
            SpecificConductance::millisiemens_per_cm2(120.0),
        )
        .unwrap();
        let rescaled = original.with_conductance(SpecificConductance::millisiemens_per_cm2(60.0));

        let gbar = Symbol::parameter("gbar");
        assert_eq!(
            original.system().defaults().get(&gbar),
            Some(&DefaultValue::Num(120.0))
        );
        assert_eq!(
            rescaled.system().defaults().get(&gbar),
            Some(&DefaultValue::Num(60.0))
        );
        assert_eq!(rescaled.max_conductance().value(), 60.0);
    }

    #[test]
    fn test_synaptic_channel_builds_full_path() {
        let v = Symbol::state("V");
        let syn_gate = Gate::steady_state_tau(
            GateName::M,
            1.0 / (1.0 + Expr::exp(-(Expr::from(&v) - 20.0) / 5.0)),
            Expr::Num(5.0),
        );
        let syn = SynapticChannel::new(
            "Glut",
            Ion::NonSpecific,
            vec![syn_gate],
            Conductance::millisiemens(0.03),
            Voltage::millivolts(0.0),
        )
        .unwrap();

        assert_eq!(syn.reversal_symbol().name(), "E_Glut");
        assert!(syn.system().equation_for(&Symbol::state("g")).is_some());
        assert_eq!(syn.inputs().iter().map(|s| s.name()).collect::<Vec<_>>(), vec!["V"]);
    }
}
