//! Compartment assembly
//!
//! A compartment is one electrically isotropic membrane patch: its
//! conductances, equilibrium potentials, and optional auxiliary state
//! transforms folded into a single governing system around
//!
//! ```text
//! d(V)/dt = (I_app - (sum of channel currents + I_syn)) / (area * c_m)
//! ```
//!
//! Each channel subsystem is nested whole; the compartment binds every
//! classified channel input with a forwarding equation and pushes its own
//! default across the subsystem boundary (default resolution does not
//! cross it otherwise). Per-ion aggregator currents requested by auxiliary
//! transforms are synthesized as the sum of the concrete per-channel
//! currents of that ion. Any required state still unresolved after that
//! pass is a construction error, never a missing-symbol failure deep inside
//! the solver.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::channel::IonChannel;
use crate::error::{ModelError, Result};
use crate::ion::{membrane_current, EquilibriumPotential, EquilibriumValue, Ion, IonConcentration};
use crate::symbolic::{DefaultValue, Equation, Expr, HostFn, Role, Symbol, System};
use crate::units::{Current, Length, SpecificCapacitance, Voltage};

/// Compartment geometry. Membrane areas are in cm².
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// Spherical patch; area is 4πr².
    Sphere { radius: Length },
    /// Explicit membrane area in cm².
    Unitless { area: f64 },
    /// Dimensionless point; unit area.
    Point,
}

impl Geometry {
    /// Membrane area in cm².
    pub fn area(&self) -> f64 {
        match self {
            Geometry::Sphere { radius } => {
                let r = radius.in_centimeters();
                4.0 * std::f64::consts::PI * r * r
            }
            Geometry::Unitless { area } => *area,
            Geometry::Point => 1.0,
        }
    }
}

/// A current-clamp waveform. The applied current is defined algebraically
/// as the stimulus evaluated at the current time and applied-current value.
#[derive(Clone, Debug, PartialEq)]
pub struct Stimulus {
    host: HostFn,
}

impl Stimulus {
    pub fn new(
        name: impl AsRef<str>,
        f: impl Fn(f64, f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            host: HostFn::new(name, 2, move |args| f(args[0], args[1])),
        }
    }

    /// Square current pulse: `amplitude` between `start` and `stop`, zero
    /// elsewhere.
    pub fn pulse(start: f64, stop: f64, amplitude: Current) -> Self {
        let amp = amplitude.value();
        Self::new("pulse", move |t, _i| {
            if t >= start && t < stop {
                amp
            } else {
                0.0
            }
        })
    }

    fn host(&self) -> &HostFn {
        &self.host
    }
}

/// An auxiliary state transform: a set of equations with declared
/// parameters, folded into the compartment. Used e.g. to convert a net
/// ionic current into an ion concentration. Output symbols carrying a
/// concentration role take their default from the matching annotation.
#[derive(Clone, Debug, PartialEq)]
pub struct AuxTransform {
    pub name: String,
    pub equations: Vec<Equation>,
    pub params: Vec<(Symbol, f64)>,
    pub concentrations: Vec<IonConcentration>,
}

impl AuxTransform {
    pub fn new(name: impl Into<String>, equations: Vec<Equation>) -> Self {
        Self {
            name: name.into(),
            equations,
            params: Vec::new(),
            concentrations: Vec::new(),
        }
    }

    pub fn with_param(mut self, sym: Symbol, default: f64) -> Self {
        self.params.push((sym, default));
        self
    }

    pub fn with_concentration(mut self, c: IonConcentration) -> Self {
        self.concentrations.push(c);
        self
    }
}

/// Builder for [`Compartment`].
#[derive(Clone, Debug)]
pub struct CompartmentBuilder {
    name: String,
    channels: Vec<IonChannel>,
    equilibria: Vec<EquilibriumPotential>,
    geometry: Geometry,
    capacitance: SpecificCapacitance,
    initial_voltage: Voltage,
    holding_current: Current,
    stimulus: Option<Stimulus>,
    transforms: Vec<AuxTransform>,
}

impl CompartmentBuilder {
    pub fn channel(mut self, channel: IonChannel) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channels(mut self, channels: impl IntoIterator<Item = IonChannel>) -> Self {
        self.channels.extend(channels);
        self
    }

    pub fn equilibrium(mut self, e: EquilibriumPotential) -> Self {
        self.equilibria.push(e);
        self
    }

    pub fn equilibria(mut self, es: impl IntoIterator<Item = EquilibriumPotential>) -> Self {
        self.equilibria.extend(es);
        self
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn capacitance(mut self, c: SpecificCapacitance) -> Self {
        self.capacitance = c;
        self
    }

    pub fn initial_voltage(mut self, v: Voltage) -> Self {
        self.initial_voltage = v;
        self
    }

    pub fn holding_current(mut self, i: Current) -> Self {
        self.holding_current = i;
        self
    }

    pub fn stimulus(mut self, s: Stimulus) -> Self {
        self.stimulus = Some(s);
        self
    }

    pub fn transform(mut self, t: AuxTransform) -> Self {
        self.transforms.push(t);
        self
    }

    /// Assemble the compartment system.
    pub fn build(self) -> Result<Compartment> {
        let name = self.name.clone();
        let mut sys = System::new(name.clone());

        let v = Symbol::state("V");
        let i_app = Symbol::state("I_app");
        let i_syn = Symbol::state("I_syn");
        let area = Symbol::parameter("area");
        let c_m = Symbol::parameter("c_m");

        // Seed states and defaults.
        sys.add_state(v.clone());
        sys.add_state(i_app.clone());
        sys.add_state(i_syn.clone());
        sys.add_param(area.clone());
        sys.add_param(c_m.clone());
        sys.set_default(area.clone(), self.geometry.area());
        sys.set_default(c_m.clone(), self.capacitance.value());
        sys.set_default(v.clone(), self.initial_voltage.value());
        sys.set_default(i_app.clone(), self.holding_current.value());
        sys.set_default(i_syn.clone(), 0.0);

        // Applied-current dynamics.
        match &self.stimulus {
            None => sys.add_equation(Equation::deriv(i_app.clone(), Expr::Num(0.0))),
            Some(stim) => sys.add_equation(Equation::alg(
                i_app.clone(),
                Expr::apply(stim.host().clone(), vec![Expr::Time, Expr::from(&i_app)]),
            )),
        }

        // Pinned until a network supplies incoming synaptic current.
        sys.add_equation(Equation::deriv(i_syn.clone(), Expr::Num(0.0)));

        let mut required: BTreeSet<Symbol> = BTreeSet::new();

        // Auxiliary transforms.
        for tr in &self.transforms {
            for (p, default) in &tr.params {
                sys.add_param(p.clone());
                sys.set_default(p.clone(), *default);
            }
            for eq in &tr.equations {
                for s in eq.rhs.free_symbols() {
                    if s.is_parameter() {
                        sys.add_param(s);
                    } else {
                        required.insert(s);
                    }
                }
                let out = eq.defined().clone();
                if let Role::Concentration { ion, location } = out.role() {
                    let seed = tr
                        .concentrations
                        .iter()
                        .find(|c| c.ion == ion && c.location == location);
                    if let Some(c) = seed {
                        sys.set_default(out.clone(), c.value.value());
                    }
                }
                sys.add_state(out);
                sys.add_equation(eq.clone());
            }
        }

        // Channels: nest, bind inputs, synthesize currents.
        let mut seen_channels: BTreeSet<&str> = BTreeSet::new();
        let mut currents: Vec<(Symbol, Ion)> = Vec::new();
        for chan in &self.channels {
            if !seen_channels.insert(chan.name()) {
                return Err(ModelError::DuplicateChannel(chan.name().to_string()));
            }
            sys.add_subsystem(chan.system().clone());

            for input in chan.inputs() {
                let inner = input.namespaced(chan.name());
                sys.add_equation(Equation::alg(inner.clone(), Expr::from(input)));
                if let Some(dv) = sys.defaults().get(input).cloned() {
                    sys.set_default(inner, dv);
                }
                if !sys.declares(input) {
                    required.insert(input.clone());
                }
            }

            let e_sym = self.resolve_equilibrium(&mut sys, &mut required, chan)?;

            let i_sym = membrane_current(format!("I_{}", chan.name()), chan.ion());
            let g = chan.conductance_symbol().namespaced(chan.name());
            let rhs = Expr::from(&area)
                * Expr::from(g)
                * (Expr::from(&v) - Expr::from(&e_sym));
            sys.add_state(i_sym.clone());
            sys.add_equation(Equation::alg(i_sym.clone(), rhs));
            currents.push((i_sym, chan.ion()));
        }

        // Aggregator-current resolution for whatever is still required.
        required.retain(|s| !sys.declares(s));
        let mut unresolved: Vec<String> = Vec::new();
        for r in required {
            match r.role() {
                Role::Current {
                    ion,
                    aggregate: true,
                } => {
                    let terms: Vec<Expr> = currents
                        .iter()
                        .filter(|(_, i)| *i == ion)
                        .map(|(s, _)| Expr::from(s))
                        .collect();
                    let rhs = match sum(terms) {
                        Some(e) => e,
                        None => {
                            log::debug!(
                                "aggregator {} has no contributing channels in '{name}'",
                                r.name()
                            );
                            Expr::Num(0.0)
                        }
                    };
                    sys.add_state(r.clone());
                    sys.add_equation(Equation::alg(r, rhs));
                }
                _ => unresolved.push(r.name().to_string()),
            }
        }
        if !unresolved.is_empty() {
            return Err(ModelError::UnresolvedStates {
                names: unresolved,
                context: format!("compartment '{name}'"),
            });
        }

        // Governing membrane equation.
        let ionic = sum(currents.iter().map(|(s, _)| Expr::from(s)).collect())
            .map(|e| e + Expr::from(&i_syn))
            .unwrap_or_else(|| Expr::from(&i_syn));
        let rhs = (Expr::from(&i_app) - ionic) / (Expr::from(&area) * Expr::from(&c_m));
        sys.add_equation(Equation::deriv(v.clone(), rhs));

        let states = sys.states().to_vec();
        let params = sys.params().to_vec();
        Ok(Compartment {
            name,
            geometry: self.geometry,
            capacitance: self.capacitance,
            channels: self.channels,
            states,
            params,
            system: sys,
        })
    }

    /// First equilibrium entry in input order whose ion matches the
    /// channel's; registers its symbol on first use.
    fn resolve_equilibrium(
        &self,
        sys: &mut System,
        required: &mut BTreeSet<Symbol>,
        chan: &IonChannel,
    ) -> Result<Symbol> {
        let mut matches = self.equilibria.iter().filter(|e| e.ion() == chan.ion());
        let first = matches.next().ok_or_else(|| ModelError::MissingEquilibrium {
            ion: chan.ion().to_string(),
            channel: chan.name().to_string(),
        })?;
        if matches.next().is_some() {
            log::warn!(
                "multiple equilibrium potentials for ion {}; using the first",
                chan.ion()
            );
        }

        let e_sym = first.symbol();
        if !sys.declares(&e_sym) {
            match first.value() {
                EquilibriumValue::Fixed(voltage) => {
                    sys.add_param(e_sym.clone());
                    sys.set_default(e_sym.clone(), voltage.value());
                }
                EquilibriumValue::Dynamic { symbol, expr } => {
                    sys.add_state(symbol.clone());
                    sys.add_equation(Equation::alg(symbol.clone(), expr.clone()));
                    for s in expr.free_symbols() {
                        if s == *symbol {
                            continue;
                        }
                        if s.is_parameter() {
                            sys.add_param(s);
                        } else {
                            required.insert(s);
                        }
                    }
                }
            }
        }
        Ok(e_sym)
    }
}

fn sum(terms: Vec<Expr>) -> Option<Expr> {
    terms.into_iter().reduce(|acc, t| acc + t)
}

/// One membrane patch with its governing equation system.
#[derive(Clone, Debug, PartialEq)]
pub struct Compartment {
    name: String,
    geometry: Geometry,
    capacitance: SpecificCapacitance,
    channels: Vec<IonChannel>,
    states: Vec<Symbol>,
    params: Vec<Symbol>,
    system: System,
}

impl Compartment {
    /// Start building a compartment. Defaults: point geometry, 1 µF/cm²,
    /// −65 mV initial voltage, zero holding current, no stimulus.
    pub fn builder(name: impl Into<String>) -> CompartmentBuilder {
        CompartmentBuilder {
            name: name.into(),
            channels: Vec::new(),
            equilibria: Vec::new(),
            geometry: Geometry::Point,
            capacitance: SpecificCapacitance::microfarads_per_cm2(1.0),
            initial_voltage: Voltage::millivolts(-65.0),
            holding_current: Current::microamps(0.0),
            stimulus: None,
            transforms: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn capacitance(&self) -> SpecificCapacitance {
        self.capacitance
    }

    /// The conductances this compartment was built from, for reuse by
    /// network assembly.
    pub fn channels(&self) -> &[IonChannel] {
        &self.channels
    }

    pub fn states(&self) -> &[Symbol] {
        &self.states
    }

    pub fn params(&self) -> &[Symbol] {
        &self.params
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    /// Membrane potential state.
    pub fn voltage_symbol(&self) -> Symbol {
        Symbol::state("V")
    }

    /// Applied (clamp) current state.
    pub fn applied_current_symbol(&self) -> Symbol {
        Symbol::state("I_app")
    }

    /// Total incoming synaptic current state.
    pub fn synaptic_current_symbol(&self) -> Symbol {
        Symbol::state("I_syn")
    }

    /// The default map entry recorded for a symbol, if any.
    pub fn default_of(&self, sym: &Symbol) -> Option<&DefaultValue> {
        self.system.defaults().get(sym)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{Gate, GateName};
    use crate::ion::{aggregate_current, concentration_state, Location};
    use crate::symbolic::Lhs;
    use crate::units::{Molarity, SpecificConductance};

    fn na_channel() -> IonChannel {
        let v = Symbol::state("V");
        let m = Gate::alpha_beta(
            GateName::M,
            0.1 * (Expr::from(&v) + 40.0),
            4.0 * Expr::exp(-(Expr::from(&v) + 65.0) / 18.0),
        )
        .with_exponent(3);
        let h = Gate::alpha_beta(
            GateName::H,
            0.07 * Expr::exp(-(Expr::from(&v) + 65.0) / 20.0),
            1.0 / (1.0 + Expr::exp(-(Expr::from(&v) + 35.0) / 10.0)),
        );
        IonChannel::new(
            "NaV",
            Ion::Sodium,
            vec![m, h],
            SpecificConductance::millisiemens_per_cm2(120.0),
        )
        .unwrap()
    }

    fn leak_channel() -> IonChannel {
        IonChannel::new(
            "leak",
            Ion::NonSpecific,
            vec![],
            SpecificConductance::millisiemens_per_cm2(0.3),
        )
        .unwrap()
    }

    fn ca_channel(name: &str) -> IonChannel {
        let v = Symbol::state("V");
        let m = Gate::steady_state_tau(
            GateName::M,
            1.0 / (1.0 + Expr::exp(-(Expr::from(&v) + 25.0) / 5.0)),
            Expr::Num(2.0),
        );
        IonChannel::new(
            name,
            Ion::Calcium,
            vec![m],
            SpecificConductance::millisiemens_per_cm2(4.4),
        )
        .unwrap()
    }

    fn na_equilibrium() -> EquilibriumPotential {
        EquilibriumPotential::fixed(Ion::Sodium, Voltage::millivolts(50.0))
    }

    #[test]
    fn test_seeded_states_and_defaults() {
        let soma = Compartment::builder("soma")
            .channel(leak_channel())
            .equilibrium(EquilibriumPotential::fixed(
                Ion::NonSpecific,
                Voltage::millivolts(-54.4),
            ))
            .build()
            .unwrap();

        for name in ["V", "I_app", "I_syn"] {
            assert!(
                soma.states().contains(&Symbol::state(name)),
                "missing seeded state {name}"
            );
        }
        assert_eq!(
            soma.default_of(&Symbol::state("V")),
            Some(&DefaultValue::Num(-65.0))
        );
        assert_eq!(
            soma.default_of(&Symbol::state("I_syn")),
            Some(&DefaultValue::Num(0.0))
        );
        assert_eq!(
            soma.default_of(&Symbol::parameter("c_m")),
            Some(&DefaultValue::Num(1.0))
        );
    }

    #[test]
    fn test_applied_current_constant_without_stimulus() {
        let soma = Compartment::builder("soma")
            .channel(leak_channel())
            .equilibrium(EquilibriumPotential::fixed(
                Ion::NonSpecific,
                Voltage::millivolts(-54.4),
            ))
            .build()
            .unwrap();
        let eq = soma
            .system()
            .equation_for(&Symbol::state("I_app"))
            .unwrap();
        assert!(eq.lhs.is_deriv());
        assert_eq!(eq.rhs, Expr::Num(0.0));
    }

    #[test]
    fn test_stimulus_defines_applied_current_algebraically() {
        let soma = Compartment::builder("soma")
            .channel(leak_channel())
            .equilibrium(EquilibriumPotential::fixed(
                Ion::NonSpecific,
                Voltage::millivolts(-54.4),
            ))
            .stimulus(Stimulus::pulse(10.0, 20.0, Current::microamps(0.5)))
            .build()
            .unwrap();
        let eq = soma
            .system()
            .equation_for(&Symbol::state("I_app"))
            .unwrap();
        assert!(!eq.lhs.is_deriv());
        assert!(matches!(eq.rhs, Expr::Apply(..)));
    }

    #[test]
    fn test_forwarding_equation_and_default_propagation() {
        let soma = Compartment::builder("soma")
            .channel(na_channel())
            .equilibrium(na_equilibrium())
            .initial_voltage(Voltage::millivolts(-60.0))
            .build()
            .unwrap();

        let inner_v = Symbol::state("NaV.V");
        let eq = soma.system().equation_for(&inner_v).unwrap();
        assert_eq!(eq.rhs, Expr::from(&Symbol::state("V")));
        // Compartment default crossed the subsystem boundary.
        assert_eq!(
            soma.default_of(&inner_v),
            Some(&DefaultValue::Num(-60.0))
        );
    }

    #[test]
    fn test_channel_current_equation() {
        let soma = Compartment::builder("soma")
            .channel(na_channel())
            .equilibrium(na_equilibrium())
            .build()
            .unwrap();
        let i_na = Symbol::state("I_NaV");
        let eq = soma.system().equation_for(&i_na).unwrap();
        assert_eq!(eq.rhs.to_string(), "area * NaV.g * (V - E_Na)");
        assert_eq!(
            soma.default_of(&Symbol::parameter("E_Na")),
            Some(&DefaultValue::Num(50.0))
        );
    }

    #[test]
    fn test_missing_equilibrium_is_explicit_error() {
        let err = Compartment::builder("soma")
            .channel(na_channel())
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingEquilibrium { .. }));
    }

    #[test]
    fn test_ambiguous_equilibrium_first_match_wins() {
        let soma = Compartment::builder("soma")
            .channel(na_channel())
            .equilibrium(EquilibriumPotential::fixed(
                Ion::Sodium,
                Voltage::millivolts(50.0),
            ))
            .equilibrium(EquilibriumPotential::fixed(
                Ion::Sodium,
                Voltage::millivolts(45.0),
            ))
            .build()
            .unwrap();
        assert_eq!(
            soma.default_of(&Symbol::parameter("E_Na")),
            Some(&DefaultValue::Num(50.0))
        );
    }

    #[test]
    fn test_membrane_equation_sums_channel_currents() {
        let soma = Compartment::builder("soma")
            .channel(na_channel())
            .channel(leak_channel())
            .equilibrium(na_equilibrium())
            .equilibrium(EquilibriumPotential::fixed(
                Ion::NonSpecific,
                Voltage::millivolts(-54.4),
            ))
            .build()
            .unwrap();
        let eq = soma.system().equation_for(&Symbol::state("V")).unwrap();
        assert!(eq.lhs.is_deriv());
        assert_eq!(
            eq.rhs.to_string(),
            "(I_app - (I_NaV + I_leak + I_syn)) / (area * c_m)"
        );
    }

    #[test]
    fn test_aggregator_current_sums_matching_ions() {
        // Calcium pool driven by the aggregate calcium current.
        let ca = concentration_state("Ca", Ion::Calcium, Location::Inside);
        let i_ca = aggregate_current(Ion::Calcium);
        let tau = Symbol::parameter("tau_Ca");
        let pool = AuxTransform::new(
            "ca_pool",
            vec![Equation::deriv(
                ca.clone(),
                -Expr::from(&i_ca) - Expr::from(&ca) / Expr::from(&tau),
            )],
        )
        .with_param(tau, 200.0)
        .with_concentration(IonConcentration::new(
            Ion::Calcium,
            Molarity::micromolar(0.05),
            Location::Inside,
        ));

        let soma = Compartment::builder("soma")
            .channel(ca_channel("CaS"))
            .channel(ca_channel("CaT"))
            .equilibrium(EquilibriumPotential::fixed(
                Ion::Calcium,
                Voltage::millivolts(120.0),
            ))
            .transform(pool)
            .build()
            .unwrap();

        let eq = soma.system().equation_for(&i_ca).unwrap();
        assert_eq!(eq.rhs.to_string(), "I_CaS + I_CaT");
        // Concentration annotation seeded the pool default.
        match soma.default_of(&ca) {
            Some(DefaultValue::Num(v)) => assert!((v - 5e-5).abs() < 1e-15),
            other => panic!("expected numeric Ca default, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_required_state_is_error() {
        let ghost = Symbol::state("ghost");
        let x = Symbol::state("x");
        let tr = AuxTransform::new(
            "bad",
            vec![Equation::deriv(x, Expr::from(&ghost))],
        );
        let err = Compartment::builder("soma")
            .channel(leak_channel())
            .equilibrium(EquilibriumPotential::fixed(
                Ion::NonSpecific,
                Voltage::millivolts(-54.4),
            ))
            .transform(tr)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::UnresolvedStates {
                names: vec!["ghost".into()],
                context: "compartment 'soma'".into()
            }
        );
    }

    #[test]
    fn test_duplicate_channel_rejected() {
        let err = Compartment::builder("soma")
            .channel(leak_channel())
            .channel(leak_channel())
            .equilibrium(EquilibriumPotential::fixed(
                Ion::NonSpecific,
                Voltage::millivolts(-54.4),
            ))
            .build()
            .unwrap_err();
        assert_eq!(err, ModelError::DuplicateChannel("leak".into()));
    }

    #[test]
    fn test_dynamic_equilibrium_becomes_state() {
        let ca = concentration_state("Ca", Ion::Calcium, Location::Inside);
        let ca_out = Symbol::parameter("Ca_out");
        // Nernst-like placeholder form.
        let nernst = 12.5 * (Expr::from(&ca_out) / Expr::from(&ca));
        let i_ca = aggregate_current(Ion::Calcium);
        let tau = Symbol::parameter("tau_Ca");
        let pool = AuxTransform::new(
            "ca_pool",
            vec![Equation::deriv(
                ca.clone(),
                -Expr::from(&i_ca) - Expr::from(&ca) / Expr::from(&tau),
            )],
        )
        .with_param(tau, 200.0)
        .with_concentration(IonConcentration::new(
            Ion::Calcium,
            Molarity::micromolar(0.05),
            Location::Inside,
        ));

        let soma = Compartment::builder("soma")
            .channel(ca_channel("CaS"))
            .equilibrium(EquilibriumPotential::dynamic(Ion::Calcium, nernst))
            .transform(pool)
            .build()
            .unwrap();

        let e_ca = Symbol::state("E_Ca");
        assert!(soma.states().contains(&e_ca));
        let eq = soma.system().equation_for(&e_ca).unwrap();
        assert!(matches!(eq.lhs, Lhs::Alg(_)));
        assert!(soma.params().contains(&ca_out));
    }

    #[test]
    fn test_sphere_area() {
        let g = Geometry::Sphere {
            radius: Length::micrometers(20.0),
        };
        // 4*pi*(20e-4 cm)^2
        let expected = 4.0 * std::f64::consts::PI * 4e-6;
        assert!((g.area() - expected).abs() < 1e-15);
    }

    #[test]
    fn test_build_is_deterministic() {
        let build = || {
            Compartment::builder("soma")
                .channel(na_channel())
                .channel(leak_channel())
                .equilibrium(na_equilibrium())
                .equilibrium(EquilibriumPotential::fixed(
                    Ion::NonSpecific,
                    Voltage::millivolts(-54.4),
                ))
                .build()
                .unwrap()
        };
        assert_eq!(build().system(), build().system());
    }
}
