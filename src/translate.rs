//! Translation between circuit literals and BDD functions.
//!
//! The BDD variable of a positive state or input literal `l` is `l` itself,
//! and its primed (next-state) partner is `l + 1`. Since literals are even,
//! the two never collide and every current/next pair is adjacent in the
//! variable order.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::aiger::{Circuit, Definition, Literal};
use crate::bdd::Bdd;
use crate::reference::Ref;

/// Partial bijection between literals and functions.
///
/// Both polarities of a literal are always stored together:
/// `forward[!l] == -forward[l]`.
#[derive(Debug, Default)]
pub struct Translator {
    forward: HashMap<Literal, Ref>,
    reverse: HashMap<Ref, Literal>,
    state: Vec<Literal>,
    state_set: HashSet<Literal>,
}

impl Translator {
    /// Create a translator over the given state literals (latches and the
    /// error pseudo-latch).
    pub fn new(state: Vec<Literal>) -> Self {
        let state_set = state.iter().copied().collect();
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
            state,
            state_set,
        }
    }

    pub fn state(&self) -> &[Literal] {
        &self.state
    }

    pub fn is_state(&self, lit: Literal) -> bool {
        self.state_set.contains(&lit.strip())
    }

    /// Number of cached literals, counting both polarities.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Forget every cached pair.
    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }

    pub fn get(&self, lit: Literal) -> Option<Ref> {
        self.forward.get(&lit).copied()
    }

    pub fn literal_of(&self, f: Ref) -> Option<Literal> {
        self.reverse.get(&f).copied()
    }

    /// Record that `lit` denotes `f` (and `!lit` denotes `-f`).
    ///
    /// # Panics
    ///
    /// Panics if `lit` is already bound to another function.
    pub fn insert(&mut self, lit: Literal, f: Ref) {
        for (l, g) in [(lit, f), (!lit, -f)] {
            if let Some(&old) = self.forward.get(&l) {
                assert_eq!(
                    old, g,
                    "Literal {} is already bound to {}, cannot rebind it to {}",
                    l, old, g
                );
            }
            self.forward.insert(l, g);
            self.reverse.entry(g).or_insert(l);
        }
    }

    /// The function denoted by `lit` in `circuit`.
    ///
    /// Inputs, latches and the error pseudo-latch become variables, and-gates
    /// become conjunctions, everything else (constant false, undefined
    /// literals) is `zero`.
    pub fn function_of(&mut self, bdd: &Bdd, circuit: &Circuit, lit: Literal) -> Ref {
        if let Some(f) = self.get(lit) {
            return f;
        }

        // Post-order walk over the and-graph: (positive literal, children done)
        let mut stack = vec![(lit.strip(), false)];
        while let Some((l, expanded)) = stack.pop() {
            if self.forward.contains_key(&l) {
                continue;
            }
            let f = match circuit.definition(l) {
                Some(Definition::Input) | Some(Definition::Latch) => bdd.mk_var(l.raw()),
                Some(Definition::And(_)) => {
                    let gate = *circuit.and_gate(l).expect("and-gate definition points to a gate");
                    if !expanded {
                        stack.push((l, true));
                        for child in [gate.rhs0, gate.rhs1] {
                            if !self.forward.contains_key(&child) {
                                stack.push((child.strip(), false));
                            }
                        }
                        continue;
                    }
                    bdd.apply_and(self.forward[&gate.rhs0], self.forward[&gate.rhs1])
                }
                None if self.is_state(l) => bdd.mk_var(l.raw()),
                None => bdd.zero,
            };
            debug!("function_of({}) = {}", l, f);
            self.insert(l, f);
        }

        self.forward[&lit]
    }

    /// Swap every state variable with its primed partner.
    pub fn prime_state(&self, bdd: &Bdd, f: Ref) -> Ref {
        let pairs: Vec<(u32, u32)> = self.state.iter().map(|l| (l.raw(), l.raw() + 1)).collect();
        bdd.swap_pairs(f, &pairs)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    // x = latch 2, i = input 4, gate 6 = x ∧ ¬i, gate 8 = ¬6 ∧ i
    const CIRCUIT: &str = "\
aag 4 1 1 1 2
4
2 6
8
6 2 5
8 7 4
";

    fn setup() -> (Bdd, Circuit, Translator) {
        let circuit: Circuit = CIRCUIT.parse().unwrap();
        let translator = Translator::new(vec![Literal::new(2)]);
        (Bdd::default(), circuit, translator)
    }

    #[test]
    fn test_constants() {
        let (bdd, circuit, mut t) = setup();
        assert_eq!(t.function_of(&bdd, &circuit, Literal::FALSE), bdd.zero);
        assert_eq!(t.function_of(&bdd, &circuit, Literal::TRUE), bdd.one);
    }

    #[test]
    fn test_variables() {
        let (bdd, circuit, mut t) = setup();
        assert_eq!(t.function_of(&bdd, &circuit, Literal::new(2)), bdd.mk_var(2));
        assert_eq!(t.function_of(&bdd, &circuit, Literal::new(5)), -bdd.mk_var(4));
    }

    #[test]
    fn test_gates() {
        let (bdd, circuit, mut t) = setup();
        let x = bdd.mk_var(2);
        let i = bdd.mk_var(4);
        let g6 = bdd.apply_and(x, -i);
        let g8 = bdd.apply_and(-g6, i);
        assert_eq!(t.function_of(&bdd, &circuit, Literal::new(9)), -g8);
        assert_eq!(t.get(Literal::new(6)), Some(g6));
        assert_eq!(t.get(Literal::new(7)), Some(-g6));
    }

    #[test]
    fn test_undefined_literal_is_false() {
        let (bdd, circuit, mut t) = setup();
        assert_eq!(t.function_of(&bdd, &circuit, Literal::new(42)), bdd.zero);
    }

    #[test]
    fn test_bijection() {
        let (bdd, circuit, mut t) = setup();
        t.function_of(&bdd, &circuit, Literal::new(8));
        for lit in [2, 3, 4, 5, 6, 7, 8, 9].map(Literal::new) {
            let f = t.get(lit).unwrap();
            assert_eq!(t.get(!lit), Some(-f));
            assert_eq!(t.get(t.literal_of(f).unwrap()), Some(f));
        }
    }

    #[test]
    #[should_panic(expected = "already bound")]
    fn test_rebinding_panics() {
        let bdd = Bdd::default();
        let mut t = Translator::default();
        t.insert(Literal::new(2), bdd.mk_var(2));
        t.insert(Literal::new(3), bdd.mk_var(4));
    }

    #[test]
    fn test_clear() {
        let (bdd, circuit, mut t) = setup();
        t.function_of(&bdd, &circuit, Literal::new(8));
        assert!(!t.is_empty());
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.literal_of(bdd.mk_var(2)), None);
    }

    #[test]
    fn test_state_only_variable() {
        let bdd = Bdd::default();
        let circuit: Circuit = CIRCUIT.parse().unwrap();
        // A pseudo-latch unknown to the circuit still gets a variable.
        let mut t = Translator::new(vec![Literal::new(2), Literal::new(10)]);
        assert_eq!(t.function_of(&bdd, &circuit, Literal::new(11)), -bdd.mk_var(10));
    }

    #[test]
    fn test_prime_state() {
        let (bdd, _, t) = setup();
        let x = bdd.mk_var(2);
        let i = bdd.mk_var(4);
        let f = bdd.apply_and(x, i);
        assert_eq!(t.prime_state(&bdd, f), bdd.apply_and(bdd.mk_var(3), i));
    }
}
