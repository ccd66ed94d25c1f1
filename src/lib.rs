//! # Neurosym - Declarative Neuron Model Assembly
//!
//! Assembles multi-compartment, Hodgkin-Huxley style electrophysiological
//! models from reusable building blocks, producing symbolic equation
//! systems ready for a numerical solver.
//!
//! ## Building Blocks
//!
//! - **Gate**: one voltage/ligand-dependent state variable and its ODE
//! - **IonChannel / SynapticChannel**: gates composed into one
//!   current-producing conductance subsystem
//! - **Compartment**: conductances + equilibrium potentials folded into a
//!   membrane-potential equation system
//! - **Network**: compartments wired through a synaptic topology
//! - **InitialValueProblem**: the simplified, solver-ready handoff
//!
//! ## Design Principles
//!
//! - **Immutable value objects**: every builder returns a new value;
//!   rescaling a channel's conductance never mutates the original
//! - **Deterministic assembly**: identical inputs produce structurally
//!   identical systems, regardless of call order or interleaving
//! - **Explicit errors**: missing equilibria, unresolved states, and bad
//!   gate definitions fail at construction, never deep inside a solver
//! - **Roles over hidden metadata**: per-ion current aggregation and
//!   concentration seeding ride on an explicit symbol role field
//!
//! ## Example
//!
//! ```
//! use neurosym::presets;
//! use neurosym::units::TimeSpan;
//!
//! let soma = presets::squid_soma("soma");
//! let problem = soma.problem(TimeSpan::milliseconds(50.0)).unwrap();
//! let trajectory = problem.integrate(0.01).unwrap();
//! assert!(trajectory.last("V").unwrap().is_finite());
//! ```

// Symbolic-algebra substrate (symbols, expressions, equation systems)
pub mod symbolic;

// Typed physical quantities
pub mod units;

// Ion vocabulary: species, concentrations, currents, equilibria
pub mod ion;
pub use ion::{
    aggregate_current, concentration_state, membrane_current, EquilibriumPotential,
    EquilibriumValue, Ion, IonConcentration, Location,
};

// Gating variables
pub mod gate;
pub use gate::{Gate, GateKinetics, GateName};

// Conductance builders
pub mod channel;
pub use channel::{IonChannel, SynapticChannel};

// Compartment assembly
pub mod compartment;
pub use compartment::{AuxTransform, Compartment, CompartmentBuilder, Geometry, Stimulus};

// Network assembly
pub mod network;
pub use network::{Network, NetworkTopology, TopologyEdge};

// Solver handoff
pub mod simulation;
pub use simulation::{InitialValueProblem, Trajectory};

// Classic model building blocks
pub mod presets;

// Errors
mod error;
pub use error::{ModelError, Result};
