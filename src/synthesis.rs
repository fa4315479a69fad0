//! End-to-end synthesis of a controller for an AIGER safety specification.

use std::fmt::{Display, Formatter};
use std::time::Instant;

use log::info;

use crate::aiger::{AigerError, Circuit};
use crate::game::Game;
use crate::strategy::output_functions;

/// Outcome of a synthesis run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Realizability {
    Realizable,
    Unrealizable,
}

impl Realizability {
    /// Process exit status reporting this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            Realizability::Realizable => 10,
            Realizability::Unrealizable => 20,
        }
    }
}

impl Display for Realizability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Realizability::Realizable => write!(f, "REALIZABLE"),
            Realizability::Unrealizable => write!(f, "UNREALIZABLE"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// BDD storage size in bits (`2^storage_bits` nodes).
    pub storage_bits: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self { storage_bits: 20 }
    }
}

#[derive(Debug)]
pub enum SynthesisError {
    /// The specification must have exactly one (error) output.
    OutputCount(usize),
    Aiger(AigerError),
}

impl From<AigerError> for SynthesisError {
    fn from(e: AigerError) -> Self {
        SynthesisError::Aiger(e)
    }
}

impl Display for SynthesisError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesisError::OutputCount(n) => {
                write!(f, "Expected exactly one error output, found {}", n)
            }
            SynthesisError::Aiger(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SynthesisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SynthesisError::Aiger(e) => Some(e),
            _ => None,
        }
    }
}

/// Decide realizability of `circuit` and, if realizable, turn its
/// controllable inputs into gates implementing a winning controller.
///
/// On `Unrealizable`, no gates are added.
pub fn synthesize(
    circuit: &mut Circuit,
    config: &SynthesisConfig,
) -> Result<Realizability, SynthesisError> {
    let mut game = Game::new(circuit, config)?;

    let Some(winning) = game.winning_region() else {
        info!("{}", Realizability::Unrealizable);
        return Ok(Realizability::Unrealizable);
    };
    info!("{}", Realizability::Realizable);

    let time_determinization = Instant::now();
    let functions = output_functions(&game, winning);

    // Gates of the specification must not be reused for the controller.
    game.translator_mut().clear();

    let mut encoder = game.encoder(circuit);
    for &(y, f) in &functions {
        encoder.define_input(y, f)?;
    }
    info!("Added {} gates", encoder.gates_added());
    let bdd = game.bdd();
    info!(
        "BDD: {} nodes, cache: {} hits, {} misses",
        bdd.num_nodes(),
        bdd.cache().hits(),
        bdd.cache().misses()
    );
    info!(
        "Time for relation determinization: {:.2} s",
        time_determinization.elapsed().as_secs_f64()
    );

    Ok(Realizability::Realizable)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::aiger::{Literal, MAX_VARIABLE};

    #[test]
    fn test_exit_codes() {
        assert_eq!(Realizability::Realizable.exit_code(), 10);
        assert_eq!(Realizability::Unrealizable.exit_code(), 20);
    }

    #[test]
    fn test_unrealizable_leaves_circuit() {
        let text = "aag 2 1 1 1 0\n2\n4 2\n4\n";
        let mut circuit: Circuit = text.parse().unwrap();
        let res = synthesize(&mut circuit, &SynthesisConfig::default()).unwrap();
        assert_eq!(res, Realizability::Unrealizable);
        assert!(circuit.ands().is_empty());
        assert_eq!(circuit.inputs().len(), 1);
    }

    #[test]
    fn test_no_output() {
        let mut circuit: Circuit = "aag 0 0 0 0 0\n".parse().unwrap();
        let err = synthesize(&mut circuit, &SynthesisConfig::default()).unwrap_err();
        assert!(matches!(err, SynthesisError::OutputCount(0)));
        assert_eq!(err.to_string(), "Expected exactly one error output, found 0");
    }

    #[test]
    fn test_realizable_redefines_controllable() {
        // error = c, so c must stay low.
        let text = "aag 1 1 0 1 0\n2\n2\ni0 controllable_c\n";
        let mut circuit: Circuit = text.parse().unwrap();
        let res = synthesize(&mut circuit, &SynthesisConfig::default()).unwrap();
        assert_eq!(res, Realizability::Realizable);
        assert!(circuit.inputs().is_empty());
        let gate = circuit.and_gate(circuit.outputs()[0].literal).copied().unwrap();
        assert_eq!((gate.rhs0, gate.rhs1), (Literal::FALSE, Literal::FALSE));
    }

    #[test]
    fn test_no_room_for_error_latch() {
        let text = format!("aag {} 0 0 1 0\n0\n", MAX_VARIABLE);
        let mut circuit: Circuit = text.parse().unwrap();
        let err = synthesize(&mut circuit, &SynthesisConfig::default()).unwrap_err();
        assert!(matches!(err, SynthesisError::Aiger(AigerError::Unsupported(_))));
    }
}
