//! Typed physical quantities
//!
//! Every magnitude that enters a generated equation passes through one of
//! these newtypes first, so the canonical unit of each dimension is fixed
//! in exactly one place:
//!
//! | Quantity               | Canonical unit |
//! |------------------------|----------------|
//! | Voltage                | mV             |
//! | Current                | µA             |
//! | SpecificConductance    | mS/cm²         |
//! | SpecificCapacitance    | µF/cm²         |
//! | Molarity               | mM             |
//! | Conductance            | mS             |
//! | TimeSpan               | ms             |
//! | Length                 | µm             |
//!
//! `value()` strips a quantity to a plain number in its canonical unit.

use serde::{Deserialize, Serialize};

macro_rules! quantity {
    ($(#[$doc:meta])* $name:ident, $canon:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
        pub struct $name(f64);

        impl $name {
            /// Construct from a magnitude in the canonical unit.
            pub fn $canon(v: f64) -> Self {
                Self(v)
            }

            /// Strip to a plain number in the canonical unit.
            pub fn value(self) -> f64 {
                self.0
            }
        }
    };
}

quantity!(
    /// Electric potential, canonically millivolts.
    Voltage,
    millivolts
);

impl Voltage {
    /// Construct from volts.
    pub fn volts(v: f64) -> Self {
        Self(v * 1e3)
    }
}

quantity!(
    /// Membrane current, canonically microamperes.
    Current,
    microamps
);

impl Current {
    /// Construct from nanoamperes.
    pub fn nanoamps(v: f64) -> Self {
        Self(v * 1e-3)
    }
}

quantity!(
    /// Conductance per membrane area, canonically mS/cm².
    SpecificConductance,
    millisiemens_per_cm2
);

quantity!(
    /// Capacitance per membrane area, canonically µF/cm².
    SpecificCapacitance,
    microfarads_per_cm2
);

quantity!(
    /// Concentration, canonically millimolar.
    Molarity,
    millimolar
);

impl Molarity {
    /// Construct from micromolar.
    pub fn micromolar(v: f64) -> Self {
        Self(v * 1e-3)
    }
}

quantity!(
    /// Absolute conductance, canonically millisiemens.
    Conductance,
    millisiemens
);

impl Conductance {
    /// Construct from microsiemens.
    pub fn microsiemens(v: f64) -> Self {
        Self(v * 1e-3)
    }

    /// Construct from nanosiemens.
    pub fn nanosiemens(v: f64) -> Self {
        Self(v * 1e-6)
    }
}

quantity!(
    /// Duration, canonically milliseconds.
    TimeSpan,
    milliseconds
);

impl TimeSpan {
    /// Construct from seconds.
    pub fn seconds(v: f64) -> Self {
        Self(v * 1e3)
    }
}

quantity!(
    /// Length, canonically micrometers.
    Length,
    micrometers
);

impl Length {
    /// Length in centimeters (membrane areas are in cm²).
    pub fn in_centimeters(self) -> f64 {
        self.0 * 1e-4
    }
}
