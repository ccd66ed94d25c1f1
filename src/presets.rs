//! Classic model building blocks
//!
//! The squid-axon Hodgkin-Huxley channel set and a glutamatergic synapse,
//! ready to drop into compartments. Rate laws and reversal constants are
//! the standard ones (voltages in mV, rates in 1/ms):
//!
//! ```text
//! I_Na = gbar_Na * m^3 h * (V - 50)      gbar_Na = 120 mS/cm^2
//! I_K  = gbar_K  * n^4   * (V + 77)      gbar_K  =  36 mS/cm^2
//! I_l  = g_l * (V + 54.4)                g_l     = 0.3 mS/cm^2
//! ```

use crate::channel::{IonChannel, SynapticChannel};
use crate::compartment::Compartment;
use crate::gate::{Gate, GateName};
use crate::ion::{EquilibriumPotential, Ion};
use crate::symbolic::{Expr, Symbol};
use crate::units::{Conductance, SpecificConductance, Voltage};

fn v() -> Expr {
    Expr::from(&Symbol::state("V"))
}

/// Sodium activation gate m, cubed in the conductance product.
pub fn sodium_activation() -> Gate {
    let alpha = 0.1 * (v() + 40.0) / (1.0 - Expr::exp(-0.1 * (v() + 40.0)));
    let beta = 4.0 * Expr::exp(-0.0556 * (v() + 65.0));
    Gate::alpha_beta(GateName::M, alpha, beta).with_exponent(3)
}

/// Sodium inactivation gate h.
pub fn sodium_inactivation() -> Gate {
    let alpha = 0.07 * Expr::exp(-0.05 * (v() + 65.0));
    let beta = 1.0 / (1.0 + Expr::exp(-0.1 * (v() + 35.0)));
    Gate::alpha_beta(GateName::H, alpha, beta)
}

/// Potassium activation gate n, raised to the fourth power.
pub fn potassium_activation() -> Gate {
    let alpha = 0.01 * (v() + 55.0) / (1.0 - Expr::exp(-0.1 * (v() + 55.0)));
    let beta = 0.125 * Expr::exp(-0.0125 * (v() + 65.0));
    Gate::alpha_beta(GateName::N, alpha, beta).with_exponent(4)
}

/// Transient sodium channel, `gbar * m^3 * h`, 120 mS/cm².
pub fn sodium_channel() -> IonChannel {
    IonChannel::new(
        "NaV",
        Ion::Sodium,
        vec![sodium_activation(), sodium_inactivation()],
        SpecificConductance::millisiemens_per_cm2(120.0),
    )
    .expect("preset channel is well-formed")
}

/// Delayed-rectifier potassium channel, `gbar * n^4`, 36 mS/cm².
pub fn potassium_channel() -> IonChannel {
    IonChannel::new(
        "Kdr",
        Ion::Potassium,
        vec![potassium_activation()],
        SpecificConductance::millisiemens_per_cm2(36.0),
    )
    .expect("preset channel is well-formed")
}

/// Passive leak, 0.3 mS/cm².
pub fn leak_channel() -> IonChannel {
    IonChannel::new(
        "leak",
        Ion::NonSpecific,
        vec![],
        SpecificConductance::millisiemens_per_cm2(0.3),
    )
    .expect("preset channel is well-formed")
}

/// The squid-axon equilibrium potentials: Na 50 mV, K −77 mV, leak −54.4 mV.
pub fn squid_equilibria() -> Vec<EquilibriumPotential> {
    vec![
        EquilibriumPotential::fixed(Ion::Sodium, Voltage::millivolts(50.0)),
        EquilibriumPotential::fixed(Ion::Potassium, Voltage::millivolts(-77.0)),
        EquilibriumPotential::fixed(Ion::NonSpecific, Voltage::millivolts(-54.4)),
    ]
}

/// Excitatory synapse: sigmoidal activation of the presynaptic voltage,
/// 0 mV reversal.
pub fn glutamatergic_synapse() -> SynapticChannel {
    let steady = 1.0 / (1.0 + Expr::exp(-(v() - 20.0) / 5.0));
    let gate = Gate::steady_state_tau(GateName::M, steady, Expr::Num(5.0));
    SynapticChannel::new(
        "Glut",
        Ion::NonSpecific,
        vec![gate],
        Conductance::microsiemens(30.0),
        Voltage::millivolts(0.0),
    )
    .expect("preset synapse is well-formed")
}

/// A complete squid-axon soma: NaV + Kdr + leak with the classic
/// equilibria, resting at −65 mV.
pub fn squid_soma(name: impl Into<String>) -> Compartment {
    Compartment::builder(name)
        .channel(sodium_channel())
        .channel(potassium_channel())
        .channel(leak_channel())
        .equilibria(squid_equilibria())
        .build()
        .expect("preset compartment is well-formed")
}
