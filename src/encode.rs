//! Compilation of BDD functions into and-inverter gates.
//!
//! A regular node `N = ite(v, H, L)` is compiled through its complement
//!
//! ```text
//! ¬N = ¬(v ∧ H) ∧ ¬(¬v ∧ L)
//! ```
//!
//! so a node costs at most three AND gates, and a complemented reference
//! costs nothing on top of its regular node.

use log::debug;

use crate::aiger::{AigerError, Circuit, Literal};
use crate::bdd::Bdd;
use crate::reference::Ref;
use crate::translate::Translator;

/// Writes functions of one manager into a circuit.
///
/// Compiled nodes are recorded in the translator's reverse map, so a node
/// shared by several functions is compiled once per pass.
pub struct Encoder<'a> {
    bdd: &'a Bdd,
    circuit: &'a mut Circuit,
    translator: &'a mut Translator,
    gates_added: usize,
}

impl<'a> Encoder<'a> {
    pub fn new(bdd: &'a Bdd, circuit: &'a mut Circuit, translator: &'a mut Translator) -> Self {
        Self {
            bdd,
            circuit,
            translator,
            gates_added: 0,
        }
    }

    /// Number of gates this encoder has allocated.
    pub fn gates_added(&self) -> usize {
        self.gates_added
    }

    /// Constant-folding AND.
    ///
    /// Only allocates a gate when neither operand is constant.
    pub fn and(&mut self, a: Literal, b: Literal) -> Result<Literal, AigerError> {
        if a == Literal::FALSE || b == Literal::FALSE {
            return Ok(Literal::FALSE);
        }
        if a == Literal::TRUE {
            return Ok(b);
        }
        if b == Literal::TRUE {
            return Ok(a);
        }
        let lhs = self.circuit.add_and(a, b)?;
        self.gates_added += 1;
        Ok(lhs)
    }

    fn lookup(&self, f: Ref) -> Option<Literal> {
        if self.bdd.is_zero(f) {
            return Some(Literal::FALSE);
        }
        if self.bdd.is_one(f) {
            return Some(Literal::TRUE);
        }
        if let Some(lit) = self.translator.literal_of(f) {
            return Some(lit);
        }
        self.translator.literal_of(-f).map(|lit| !lit)
    }

    /// Literal computing `f`, adding gates as needed.
    pub fn encode(&mut self, f: Ref) -> Result<Literal, AigerError> {
        if let Some(lit) = self.lookup(f) {
            return Ok(lit);
        }

        // (regular node, children done)
        let mut stack = vec![(f.regular(), false)];
        while let Some((node, expanded)) = stack.pop() {
            if self.lookup(node).is_some() {
                continue;
            }
            let high = self.bdd.high_node(node);
            let low = self.bdd.low_node(node);
            if !expanded {
                stack.push((node, true));
                for child in [low, high] {
                    if self.lookup(child).is_none() {
                        stack.push((child.regular(), false));
                    }
                }
                continue;
            }

            let v = Literal::new(self.bdd.variable(node.index()));
            let t = self.lookup(high).expect("high child is compiled before its parent");
            let e = self.lookup(low).expect("low child is compiled before its parent");
            let a = self.and(v, t)?;
            let b = self.and(!v, e)?;
            let g = self.and(!a, !b)?;
            debug!("encoded {} as {}", node, !g);
            self.translator.insert(!g, node);
        }

        Ok(self.lookup(f).expect("function is compiled"))
    }

    /// Redefine the input `y` as the output of `f`.
    pub fn define_input(&mut self, y: Literal, f: Ref) -> Result<Literal, AigerError> {
        let lit = self.encode(f)?;
        self.circuit.redefine_input_as_and(y, lit, lit)?;
        Ok(lit)
    }
}
