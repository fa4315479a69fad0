//! The safety game of a circuit.
//!
//! The controller picks the controllable inputs after seeing the state and
//! the uncontrollable inputs; it wins if the error output never rises. The
//! error output is latched into a pseudo-latch so that "error has happened"
//! is a property of the state.

use log::{debug, info};

use crate::aiger::{Circuit, Literal};
use crate::bdd::Bdd;
use crate::encode::Encoder;
use crate::reference::Ref;
use crate::synthesis::{SynthesisConfig, SynthesisError};
use crate::translate::Translator;

/// Synthesis context: the BDD manager, the translator and the symbolic game.
pub struct Game {
    bdd: Bdd,
    translator: Translator,
    error_latch: Literal,
    latches: Vec<Literal>,
    controllable: Vec<Literal>,
    uncontrollable: Vec<Literal>,
    transition: Ref,
    init: Ref,
    not_error: Ref,
}

fn vars(lits: &[Literal]) -> Vec<u32> {
    lits.iter().map(|l| l.raw()).collect()
}

fn primed_vars(lits: &[Literal]) -> Vec<u32> {
    lits.iter().map(|l| l.raw() + 1).collect()
}

impl Game {
    /// Build the game of `circuit`.
    ///
    /// Reserves a fresh literal in `circuit` for the error pseudo-latch.
    pub fn new(circuit: &mut Circuit, config: &SynthesisConfig) -> Result<Self, SynthesisError> {
        if circuit.outputs().len() != 1 {
            return Err(SynthesisError::OutputCount(circuit.outputs().len()));
        }
        let error_output = circuit.outputs()[0].literal;
        let error_latch = circuit.fresh_literal()?;

        let latches: Vec<Literal> = circuit.latches().iter().map(|l| l.literal).collect();
        let controllable: Vec<Literal> = circuit.controllable_inputs().map(|i| i.literal).collect();
        let uncontrollable: Vec<Literal> =
            circuit.uncontrollable_inputs().map(|i| i.literal).collect();
        info!(
            "Game with {} latches, {} controllable and {} uncontrollable inputs",
            latches.len(),
            controllable.len(),
            uncontrollable.len()
        );

        let bdd = Bdd::new(config.storage_bits);
        let mut state = latches.clone();
        state.push(error_latch);
        let mut translator = Translator::new(state);

        // x' <-> next(x), for every latch and the error pseudo-latch
        let mut next_states: Vec<(Literal, Literal)> =
            circuit.latches().iter().map(|l| (l.literal, l.next)).collect();
        next_states.push((error_latch, error_output));
        let mut transition = bdd.one;
        for (x, next) in next_states {
            let f = translator.function_of(&bdd, circuit, next);
            let primed = bdd.mk_var(x.raw() + 1);
            transition = bdd.apply_and(transition, bdd.apply_eq(primed, f));
        }
        debug!("transition relation has {} nodes", bdd.size(transition));

        let init = bdd.apply_and_many(translator.state().iter().map(|x| -bdd.mk_var(x.raw())));
        let not_error = -bdd.mk_var(error_latch.raw());

        Ok(Self {
            bdd,
            translator,
            error_latch,
            latches,
            controllable,
            uncontrollable,
            transition,
            init,
            not_error,
        })
    }

    pub fn bdd(&self) -> &Bdd {
        &self.bdd
    }
    pub fn translator(&self) -> &Translator {
        &self.translator
    }
    pub fn translator_mut(&mut self) -> &mut Translator {
        &mut self.translator
    }

    pub fn error_latch(&self) -> Literal {
        self.error_latch
    }
    /// Latches of the circuit, without the error pseudo-latch.
    pub fn latches(&self) -> &[Literal] {
        &self.latches
    }
    /// Latches followed by the error pseudo-latch.
    pub fn state(&self) -> &[Literal] {
        self.translator.state()
    }
    pub fn controllable(&self) -> &[Literal] {
        &self.controllable
    }
    pub fn uncontrollable(&self) -> &[Literal] {
        &self.uncontrollable
    }

    pub fn transition(&self) -> Ref {
        self.transition
    }
    pub fn init(&self) -> Ref {
        self.init
    }
    pub fn not_error(&self) -> Ref {
        self.not_error
    }

    pub fn state_vars(&self) -> Vec<u32> {
        vars(self.state())
    }
    pub fn primed_state_vars(&self) -> Vec<u32> {
        primed_vars(self.state())
    }
    pub fn controllable_vars(&self) -> Vec<u32> {
        vars(&self.controllable)
    }
    pub fn uncontrollable_vars(&self) -> Vec<u32> {
        vars(&self.uncontrollable)
    }

    /// Swap current and next copies of the state variables.
    pub fn prime(&self, f: Ref) -> Ref {
        self.translator.prime_state(&self.bdd, f)
    }

    /// Encoder writing into `circuit`, sharing this game's manager and translator.
    pub fn encoder<'a>(&'a mut self, circuit: &'a mut Circuit) -> Encoder<'a> {
        Encoder::new(&self.bdd, circuit, &mut self.translator)
    }

    /// Controllable predecessors: states from which the controller can force
    /// the next state into `target` whatever the uncontrollable inputs are.
    ///
    /// ```text
    /// pre(S) = ∀i. ∃c, x'. T(x, i, c, x') ∧ S(x')
    /// ```
    pub fn pre(&self, target: Ref) -> Ref {
        let primed = self.prime(target);
        let mut abstracted = self.controllable_vars();
        abstracted.extend(self.primed_state_vars());
        let moves = self.bdd.and_exists(self.transition, primed, &abstracted);
        self.bdd.forall(moves, &self.uncontrollable_vars())
    }

    /// Successors of `source` under `relation(x, i, c, x')`, over current-state variables.
    pub fn succ(&self, source: Ref, relation: Ref) -> Ref {
        let mut abstracted = self.state_vars();
        abstracted.extend(self.uncontrollable_vars());
        abstracted.extend(self.controllable_vars());
        let next = self.bdd.and_exists(relation, source, &abstracted);
        self.prime(next)
    }

    /// Greatest fixed point of `safe = ¬err ∧ pre(safe)`.
    ///
    /// Returns `None` if the initial state is losing.
    pub fn winning_region(&self) -> Option<Ref> {
        let mut safe = self.bdd.one;
        let mut iterations = 0;
        loop {
            iterations += 1;
            let next = self.bdd.apply_and(self.not_error, self.pre(safe));
            debug_assert!(self.bdd.is_implies(next, safe), "winning region must shrink");
            debug!("iteration {}: {} nodes", iterations, self.bdd.size(next));
            if next == safe {
                break;
            }
            safe = next;
        }
        info!(
            "Winning region after {} iterations: {} nodes, {} states",
            iterations,
            self.bdd.size(safe),
            self.bdd.sat_count(safe, self.state().len())
        );

        if self.bdd.is_zero(self.bdd.apply_and(self.init, safe)) {
            None
        } else {
            Some(safe)
        }
    }

    /// States reachable from the initial state under `relation(x, i, c, x')`.
    pub fn reachable(&self, relation: Ref) -> Ref {
        let mut reached = self.init;
        loop {
            let next = self.bdd.apply_or(reached, self.succ(reached, relation));
            if next == reached {
                return reached;
            }
            reached = next;
        }
    }
}
