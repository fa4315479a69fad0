//! # aiger-synth: BDD-based safety synthesis for AIGER circuits
//!
//! Given a sequential circuit with *controllable* inputs (symbol names
//! starting with `controllable`), *uncontrollable* inputs, latches and a single
//! error output, **`aiger-synth`** decides whether a controller can drive the
//! controllable inputs so that the error output never rises, whatever the
//! other inputs do. If so, the controllable inputs are redefined as AND gates
//! implementing such a controller.
//!
//! ## Pipeline
//!
//! 1. The circuit is translated into a transition relation over BDD variables,
//!    with the error output latched into a pseudo-latch.
//! 2. The winning region of the safety game is computed as a greatest fixed point.
//! 3. A nondeterministic strategy is extracted, then determinized and minimized
//!    one controllable input at a time.
//! 4. Each output function is compiled back into gates.
//!
//! ## Basic Usage
//!
//! ```rust
//! use aiger_synth::aiger::Circuit;
//! use aiger_synth::synthesis::{synthesize, Realizability, SynthesisConfig};
//!
//! // The error output is the negation of the controllable input.
//! let text = "aag 1 1 0 1 0\n2\n3\ni0 controllable_c\n";
//! let mut circuit: Circuit = text.parse().unwrap();
//!
//! let res = synthesize(&mut circuit, &SynthesisConfig::default()).unwrap();
//! assert_eq!(res, Realizability::Realizable);
//! assert_eq!(res.exit_code(), 10);
//!
//! // The input is now a gate tied high.
//! assert!(circuit.inputs().is_empty());
//! assert!(circuit.to_string().contains("\n2 1 1\n"));
//! ```
//!
//! ## Core Components
//!
//! - **[`bdd`]**: The [`Bdd`][crate::bdd::Bdd] manager with complement edges, plus
//!   quantification ([`quantify`]) and model counting ([`sat`]).
//! - **[`aiger`]**: Circuit model and ASCII AIGER reader/writer.
//! - **[`game`]**: The safety game and its fixed points.
//! - **[`strategy`]**: Strategy extraction and determinization.
//! - **[`encode`]**: Compilation of BDDs into and-inverter gates.
//! - **[`synthesis`]**: The end-to-end driver.

pub mod aiger;
pub mod bdd;
pub mod cache;
pub mod encode;
pub mod game;
pub mod quantify;
pub mod reference;
pub mod sat;
pub mod strategy;
pub mod synthesis;
pub mod table;
pub mod translate;
pub mod utils;
