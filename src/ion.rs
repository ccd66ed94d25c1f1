//! Ion vocabulary - species, locations, concentrations, currents, equilibria

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::symbolic::{Expr, Role, Symbol};
use crate::units::{Molarity, Voltage};

/// Ion species a conductance can carry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ion {
    Calcium,
    Sodium,
    Potassium,
    Chloride,
    /// Leak / mixed currents with no single carrier.
    #[default]
    NonSpecific,
}

impl Ion {
    /// Canonical display symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Ion::Calcium => "Ca",
            Ion::Sodium => "Na",
            Ion::Potassium => "K",
            Ion::Chloride => "Cl",
            Ion::NonSpecific => "l",
        }
    }
}

impl fmt::Display for Ion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Which side of the membrane a concentration refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Inside,
    Outside,
}

/// An ion concentration on one side of the membrane, used to seed the
/// default of an auxiliary-transform output state carrying the matching
/// concentration role.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IonConcentration {
    pub ion: Ion,
    pub value: Molarity,
    pub location: Location,
}

impl IonConcentration {
    pub fn new(ion: Ion, value: Molarity, location: Location) -> Self {
        Self {
            ion,
            value,
            location,
        }
    }
}

/// State symbol for a concrete per-channel membrane current.
pub fn membrane_current(name: impl AsRef<str>, ion: Ion) -> Symbol {
    Symbol::state(name).with_role(Role::Current {
        ion,
        aggregate: false,
    })
}

/// State symbol for the virtual per-ion summary current, defined during
/// compartment assembly as the sum of every concrete current of that ion.
pub fn aggregate_current(ion: Ion) -> Symbol {
    Symbol::state(format!("I_{}", ion.symbol())).with_role(Role::Current {
        ion,
        aggregate: true,
    })
}

/// State symbol for an ion concentration.
pub fn concentration_state(name: impl AsRef<str>, ion: Ion, location: Location) -> Symbol {
    Symbol::state(name).with_role(Role::Concentration { ion, location })
}

/// The value side of an equilibrium potential.
#[derive(Clone, Debug, PartialEq)]
pub enum EquilibriumValue {
    /// A constant: becomes a compartment parameter.
    Fixed(Voltage),
    /// State-dependent: becomes a compartment state with its own equation.
    /// Free symbols of the expression (minus the symbol itself) become
    /// required compartment states.
    Dynamic { symbol: Symbol, expr: Expr },
}

/// The voltage at which an ion's net current is zero.
#[derive(Clone, Debug, PartialEq)]
pub struct EquilibriumPotential {
    ion: Ion,
    value: EquilibriumValue,
}

impl EquilibriumPotential {
    /// Constant equilibrium potential.
    pub fn fixed(ion: Ion, value: Voltage) -> Self {
        Self {
            ion,
            value: EquilibriumValue::Fixed(value),
        }
    }

    /// State-dependent equilibrium potential, e.g. a Nernst form driven by
    /// an internal concentration.
    pub fn dynamic(ion: Ion, expr: Expr) -> Self {
        let symbol = Symbol::state(format!("E_{}", ion.symbol()))
            .with_role(Role::Equilibrium { ion });
        Self {
            ion,
            value: EquilibriumValue::Dynamic { symbol, expr },
        }
    }

    pub fn ion(&self) -> Ion {
        self.ion
    }

    pub fn value(&self) -> &EquilibriumValue {
        &self.value
    }

    /// The symbol this equilibrium contributes to a compartment.
    pub fn symbol(&self) -> Symbol {
        match &self.value {
            EquilibriumValue::Fixed(_) => Symbol::parameter(format!("E_{}", self.ion.symbol()))
                .with_role(Role::Equilibrium { ion: self.ion }),
            EquilibriumValue::Dynamic { symbol, .. } => symbol.clone(),
        }
    }
}
