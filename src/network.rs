//! Network assembly
//!
//! Wires compartments together through a synaptic topology: a set of
//! directed edges, each carrying a synaptic conductance instance. Every
//! edge gets a uniquely named copy of its synapse subsystem, its voltage
//! input bound to the presynaptic compartment's membrane potential, and
//! contributes one term to the postsynaptic compartment's total synaptic
//! current:
//!
//! ```text
//! post.I_syn ~ sum over incoming edges of  g_syn * (V_post - E_rev)
//! ```
//!
//! Instance naming: edges are grouped by synapse type name; a per-type
//! counter starts at the number of edges of that type and counts down, so
//! the first-seen edge gets the highest ordinal and the sequence has no
//! gaps or repeats for a given topology ordering. Compartments with no
//! incoming edges keep their synaptic-current state pinned to a constant.

use std::collections::{BTreeMap, BTreeSet};

use crate::channel::SynapticChannel;
use crate::compartment::Compartment;
use crate::error::{ModelError, Result};
use crate::symbolic::{DefaultValue, Equation, Expr, Symbol, System};

/// One directed synaptic connection.
#[derive(Clone, Debug, PartialEq)]
pub struct TopologyEdge {
    pub pre: String,
    pub post: String,
    pub synapse: SynapticChannel,
}

/// An ordered set of directed edges.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkTopology {
    edges: Vec<TopologyEdge>,
}

impl NetworkTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edge from `pre` to `post` carrying `synapse`.
    pub fn edge(
        mut self,
        pre: impl Into<String>,
        post: impl Into<String>,
        synapse: SynapticChannel,
    ) -> Self {
        self.edges.push(TopologyEdge {
            pre: pre.into(),
            post: post.into(),
            synapse,
        });
        self
    }

    pub fn edges(&self) -> &[TopologyEdge] {
        &self.edges
    }
}

/// A set of compartments coupled through a synaptic topology.
#[derive(Clone, Debug, PartialEq)]
pub struct Network {
    compartments: Vec<Compartment>,
    topology: NetworkTopology,
    instance_names: Vec<String>,
    system: System,
}

impl Network {
    /// Assemble the coupled network system.
    pub fn assemble(
        compartments: Vec<Compartment>,
        topology: NetworkTopology,
    ) -> Result<Network> {
        let mut sys = System::new("network");

        let mut names: BTreeSet<&str> = BTreeSet::new();
        for comp in &compartments {
            if !names.insert(comp.name()) {
                return Err(ModelError::DuplicateCompartment(comp.name().to_string()));
            }
            sys.add_subsystem(comp.system().clone());
        }

        // Per-type counters seeded with the edge count of that type;
        // ordinals are handed out in descending order.
        let mut counters: BTreeMap<&str, usize> = BTreeMap::new();
        for edge in topology.edges() {
            *counters.entry(edge.synapse.name()).or_insert(0) += 1;
        }

        let mut instance_names = Vec::with_capacity(topology.edges().len());
        let mut coupling: BTreeMap<String, Expr> = BTreeMap::new();
        for edge in topology.edges() {
            for end in [&edge.pre, &edge.post] {
                if !names.contains(end.as_str()) {
                    return Err(ModelError::UnknownCompartment(end.clone()));
                }
            }

            let counter = counters
                .get_mut(edge.synapse.name())
                .expect("counted synapse type");
            let instance = format!("{}{}", edge.synapse.name(), counter);
            *counter -= 1;

            sys.add_subsystem(edge.synapse.system().renamed(instance.clone()));

            // Bind the synapse's membrane-potential input to the
            // presynaptic compartment, propagating its initial voltage.
            let v = Symbol::state("V");
            if edge.synapse.inputs().contains(&v) {
                let inner = v.namespaced(&instance);
                let pre_v = v.namespaced(&edge.pre);
                sys.add_equation(Equation::alg(inner.clone(), Expr::from(&pre_v)));
                if let Some(DefaultValue::Num(v0)) =
                    compartments
                        .iter()
                        .find(|c| c.name() == edge.pre)
                        .and_then(|c| c.default_of(&v))
                {
                    sys.set_default(inner, *v0);
                }
            }

            // Shared reversal-potential parameter for this synapse type.
            let rev = edge.synapse.reversal_symbol();
            sys.add_param(rev.clone());
            sys.set_default(rev.clone(), edge.synapse.reversal().value());

            // Accumulate this edge into the postsynaptic current, replacing
            // any previous equation for the same left-hand side.
            let g = edge.synapse.conductance_symbol().namespaced(&instance);
            let post_v = Symbol::state("V").namespaced(&edge.post);
            let term = Expr::from(g) * (Expr::from(&post_v) - Expr::from(&rev));
            let post_isyn = Symbol::state("I_syn").namespaced(&edge.post);
            let rhs = match coupling.remove(post_isyn.name()) {
                Some(prev) => prev + term,
                None => term,
            };
            coupling.insert(post_isyn.name().to_string(), rhs.clone());
            sys.add_equation(Equation::alg(post_isyn, rhs));

            instance_names.push(instance);
        }

        // Pin the synaptic current of every compartment nothing targets.
        for comp in &compartments {
            let isyn = Symbol::state("I_syn").namespaced(comp.name());
            if !coupling.contains_key(isyn.name()) {
                log::debug!("no incoming edges for '{}'; pinning {}", comp.name(), isyn);
                sys.add_equation(Equation::deriv(isyn, Expr::Num(0.0)));
            }
        }

        Ok(Network {
            compartments,
            topology,
            instance_names,
            system: sys,
        })
    }

    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    pub fn topology(&self) -> &NetworkTopology {
        &self.topology
    }

    /// Unique synapse instance names, in edge order.
    pub fn instance_names(&self) -> &[String] {
        &self.instance_names
    }

    pub fn system(&self) -> &System {
        &self.system
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::IonChannel;
    use crate::gate::{Gate, GateName};
    use crate::ion::{EquilibriumPotential, Ion};
    use crate::symbolic::Lhs;
    use crate::units::{Conductance, SpecificConductance, Voltage};

    fn leak_soma(name: &str) -> Compartment {
        let leak = IonChannel::new(
            "leak",
            Ion::NonSpecific,
            vec![],
            SpecificConductance::millisiemens_per_cm2(0.3),
        )
        .unwrap();
        Compartment::builder(name)
            .channel(leak)
            .equilibrium(EquilibriumPotential::fixed(
                Ion::NonSpecific,
                Voltage::millivolts(-54.4),
            ))
            .build()
            .unwrap()
    }

    fn glut() -> SynapticChannel {
        let v = Symbol::state("V");
        let gate = Gate::steady_state_tau(
            GateName::M,
            1.0 / (1.0 + Expr::exp(-(Expr::from(&v) - 20.0) / 5.0)),
            Expr::Num(5.0),
        );
        SynapticChannel::new(
            "Glut",
            Ion::NonSpecific,
            vec![gate],
            Conductance::microsiemens(30.0),
            Voltage::millivolts(0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_single_edge_coupling() {
        let net = Network::assemble(
            vec![leak_soma("A"), leak_soma("B")],
            NetworkTopology::new().edge("A", "B", glut()),
        )
        .unwrap();

        assert_eq!(net.instance_names(), &["Glut1".to_string()]);

        // B's synaptic current has exactly one term referencing Glut1.
        let b_isyn = Symbol::state("B.I_syn");
        let eq = net.system().equation_for(&b_isyn).unwrap();
        assert!(matches!(eq.lhs, Lhs::Alg(_)));
        assert_eq!(eq.rhs.to_string(), "Glut1.g * (B.V - E_Glut)");

        // A has no incoming edges: pinned to a constant.
        let a_isyn = Symbol::state("A.I_syn");
        let eq = net.system().equation_for(&a_isyn).unwrap();
        assert!(eq.lhs.is_deriv());
        assert_eq!(eq.rhs, Expr::Num(0.0));
    }

    #[test]
    fn test_presynaptic_voltage_binding() {
        let net = Network::assemble(
            vec![leak_soma("A"), leak_soma("B")],
            NetworkTopology::new().edge("A", "B", glut()),
        )
        .unwrap();

        let inner_v = Symbol::state("Glut1.V");
        let eq = net.system().equation_for(&inner_v).unwrap();
        assert_eq!(eq.rhs, Expr::from(&Symbol::state("A.V")));
        assert_eq!(
            net.system().defaults().get(&inner_v),
            Some(&DefaultValue::Num(-65.0))
        );
    }

    #[test]
    fn test_instance_names_distinct_descending_no_gaps() {
        let net = Network::assemble(
            vec![leak_soma("A"), leak_soma("B"), leak_soma("C")],
            NetworkTopology::new()
                .edge("A", "B", glut())
                .edge("B", "C", glut())
                .edge("C", "A", glut()),
        )
        .unwrap();

        assert_eq!(
            net.instance_names(),
            &["Glut3".to_string(), "Glut2".to_string(), "Glut1".to_string()]
        );
        let distinct: BTreeSet<&String> = net.instance_names().iter().collect();
        assert_eq!(distinct.len(), 3, "instance names must be pairwise distinct");
    }

    #[test]
    fn test_convergent_edges_accumulate_single_equation() {
        let net = Network::assemble(
            vec![leak_soma("A"), leak_soma("B"), leak_soma("C")],
            NetworkTopology::new()
                .edge("A", "C", glut())
                .edge("B", "C", glut()),
        )
        .unwrap();

        let c_isyn = Symbol::state("C.I_syn");
        let defining: Vec<_> = net
            .system()
            .equations()
            .iter()
            .filter(|e| e.defined() == &c_isyn)
            .collect();
        assert_eq!(defining.len(), 1, "left-hand side never duplicated");
        assert_eq!(
            defining[0].rhs.to_string(),
            "Glut2.g * (C.V - E_Glut) + Glut1.g * (C.V - E_Glut)"
        );
    }

    #[test]
    fn test_shared_reversal_parameter() {
        let net = Network::assemble(
            vec![leak_soma("A"), leak_soma("B"), leak_soma("C")],
            NetworkTopology::new()
                .edge("A", "B", glut())
                .edge("A", "C", glut()),
        )
        .unwrap();
        let rev = Symbol::parameter("E_Glut");
        assert_eq!(
            net.system()
                .params()
                .iter()
                .filter(|p| **p == rev)
                .count(),
            1
        );
        assert_eq!(
            net.system().defaults().get(&rev),
            Some(&DefaultValue::Num(0.0))
        );
    }

    #[test]
    fn test_unknown_compartment_rejected() {
        let err = Network::assemble(
            vec![leak_soma("A")],
            NetworkTopology::new().edge("A", "nowhere", glut()),
        )
        .unwrap_err();
        assert_eq!(err, ModelError::UnknownCompartment("nowhere".into()));
    }

    #[test]
    fn test_duplicate_compartment_rejected() {
        let err =
            Network::assemble(vec![leak_soma("A"), leak_soma("A")], NetworkTopology::new())
                .unwrap_err();
        assert_eq!(err, ModelError::DuplicateCompartment("A".into()));
    }

    #[test]
    fn test_network_flatten_overrides_compartment_pin() {
        let net = Network::assemble(
            vec![leak_soma("A"), leak_soma("B")],
            NetworkTopology::new().edge("A", "B", glut()),
        )
        .unwrap();
        let flat = net.system().flatten();

        // B's pinned derivative was replaced by the coupling equation.
        let b_isyn = Symbol::state("B.I_syn");
        let defining: Vec<_> = flat
            .equations()
            .iter()
            .filter(|e| e.defined() == &b_isyn)
            .collect();
        assert_eq!(defining.len(), 1);
        assert!(matches!(defining[0].lhs, Lhs::Alg(_)));
    }
}
