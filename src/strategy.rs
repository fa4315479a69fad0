//! Strategy extraction from a winning region.

use log::{debug, info};

use crate::aiger::Literal;
use crate::bdd::Bdd;
use crate::game::Game;
use crate::reference::Ref;

/// All moves from winning states into winning states:
///
/// ```text
/// strategy(x, i, c) = ∃x'. W(x) ∧ W(x') ∧ T(x, i, c, x')
/// ```
pub fn nondeterministic_strategy(game: &Game, winning: Ref) -> Ref {
    let bdd = game.bdd();
    let both = bdd.apply_and(winning, game.prime(winning));
    bdd.and_exists(game.transition(), both, &game.primed_state_vars())
}

/// Inputs `(x, i)` where `y` must be 1, and where `y` may be 0,
/// limited to the `reachable` states.
///
/// The two sets are disjoint by construction.
pub(crate) fn care_pair(bdd: &Bdd, rho: Ref, y: u32, reachable: Ref) -> (Ref, Ref) {
    let p = bdd.cofactor(rho, y, true);
    let n = bdd.cofactor(rho, y, false);
    let p = bdd.apply_and(bdd.apply_and(p, -n), reachable);
    let n = bdd.apply_and(bdd.apply_and(n, -p), reachable);
    (p, n)
}

/// Turns a nondeterministic strategy into one function per controllable input.
///
/// Controllable inputs are resolved one at a time in declared order; each
/// resolved function is substituted back into the strategy before the next
/// input is considered.
pub struct Determinizer<'a> {
    game: &'a Game,
    strategy: Ref,
    closed_loop: Ref,
    candidates: Vec<u32>,
}

impl<'a> Determinizer<'a> {
    pub fn new(game: &'a Game, strategy: Ref) -> Self {
        let bdd = game.bdd();
        let closed_loop = bdd.apply_and(game.transition(), strategy);

        // Variables the output functions may be freed from, tried in this order.
        let mut candidates = vec![game.error_latch().raw()];
        candidates.extend(game.latches().iter().map(|l| l.raw()));
        candidates.extend(game.uncontrollable_vars());

        Self {
            game,
            strategy,
            closed_loop,
            candidates,
        }
    }

    /// Drop every candidate variable whose removal keeps `p` and `n` disjoint.
    fn minimize(&self, mut p: Ref, mut n: Ref) -> (Ref, Ref) {
        let bdd = self.game.bdd();
        for &v in &self.candidates {
            let p1 = bdd.exists(p, &[v]);
            let n1 = bdd.exists(n, &[v]);
            if bdd.is_zero(bdd.apply_and(p1, n1)) {
                debug!("dropped variable {}", v);
                p = p1;
                n = n1;
            }
        }
        (p, n)
    }

    /// Output function for the controllable input `y`, given the inputs still unresolved after it.
    fn resolve(&mut self, y: Literal, rest: &[Literal]) -> Ref {
        let bdd = self.game.bdd();

        let reachable = self.game.reachable(self.closed_loop);
        let others: Vec<u32> = rest.iter().map(|l| l.raw()).collect();
        let rho = bdd.exists(self.strategy, &others);

        let (p, n) = care_pair(bdd, rho, y.raw(), reachable);
        let (p, n) = self.minimize(p, n);
        let care = bdd.apply_xor(p, n);
        let f = bdd.restrict(p, care);
        debug_assert!(!bdd.support(f).contains(&self.game.error_latch().raw()));

        self.strategy = bdd.compose(self.strategy, y.raw(), f);
        self.closed_loop = bdd.compose(self.closed_loop, y.raw(), f);
        f
    }

    /// Resolve every controllable input.
    pub fn run(mut self) -> Vec<(Literal, Ref)> {
        let controllable = self.game.controllable();
        let mut functions = Vec::with_capacity(controllable.len());
        for (k, &y) in controllable.iter().enumerate() {
            let f = self.resolve(y, &controllable[k + 1..]);
            info!(
                "Output function for {}: {} nodes, support {:?}",
                y,
                self.game.bdd().size(f),
                self.game.bdd().support(f)
            );
            functions.push((y, f));
        }
        functions
    }
}

/// Deterministic output function for each controllable input, in declared order.
pub fn output_functions(game: &Game, winning: Ref) -> Vec<(Literal, Ref)> {
    let strategy = nondeterministic_strategy(game, winning);
    Determinizer::new(game, strategy).run()
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::aiger::Circuit;
    use crate::synthesis::SynthesisConfig;

    fn solve(text: &str) -> (Game, Ref) {
        let mut circuit: Circuit = text.parse().unwrap();
        let game = Game::new(&mut circuit, &SynthesisConfig::default()).unwrap();
        let w = game.winning_region().unwrap();
        (game, w)
    }

    // next(x) = i ∧ ¬c, error = x
    const RESETTABLE: &str = "\
aag 4 2 1 1 1
4
6
2 8
2
8 4 7
i0 env
i1 controllable_reset
";

    #[test]
    fn test_strategy_stays_winning() {
        let (game, w) = solve(RESETTABLE);
        let bdd = game.bdd();
        let strategy = nondeterministic_strategy(&game, w);
        // Every winning state and input has a safe move.
        let enabled = bdd.exists(strategy, &game.controllable_vars());
        assert_eq!(enabled, w);
        // Every move leads back into the winning region.
        let next = game.succ(w, bdd.apply_and(game.transition(), strategy));
        assert!(bdd.is_implies(next, w));
    }

    #[test]
    fn test_care_pair_disjoint() {
        let (game, w) = solve(RESETTABLE);
        let bdd = game.bdd();
        let strategy = nondeterministic_strategy(&game, w);
        let r = game.reachable(bdd.apply_and(game.transition(), strategy));
        let (p, n) = care_pair(bdd, strategy, 6, r);
        assert!(bdd.is_zero(bdd.apply_and(p, n)));
        assert!(bdd.is_implies(p, r));
        assert!(bdd.is_implies(n, r));
    }

    #[test]
    fn test_output_function() {
        let (game, w) = solve(RESETTABLE);
        let bdd = game.bdd();
        let functions = output_functions(&game, w);
        assert_eq!(functions.len(), 1);
        let (y, f) = functions[0];
        assert_eq!(y, Literal::new(6));
        // Reset is needed exactly when the environment raises i, and the
        // latch is irrelevant in the only reachable state.
        assert_eq!(f, bdd.mk_var(4));
    }

    #[test]
    fn test_functions_are_over_state_and_uncontrollable() {
        // Two controllable inputs that must differ from each other and from i:
        //   error = (c1 ∧ c2) ∨ (¬c1 ∧ ¬c2) ∨ (c1 ∧ i)
        let text = "\
aag 8 3 0 1 5
2
4
6
17
8 4 6
10 5 7
12 4 2
14 9 11
16 14 13
i0 env
i1 controllable_a
i2 controllable_b
";
        let (game, w) = solve(text);
        let bdd = game.bdd();
        let functions = output_functions(&game, w);
        let allowed: Vec<u32> =
            game.state_vars().into_iter().chain(game.uncontrollable_vars()).collect();
        for &(_, f) in &functions {
            assert!(bdd.support(f).iter().all(|v| allowed.contains(v)));
        }
        // Plug the functions in: the error must be unreachable.
        let (a, b) = (functions[0].1, functions[1].1);
        let i = bdd.mk_var(2);
        let err = bdd.apply_or_many([
            bdd.apply_and(a, b),
            bdd.apply_and(-a, -b),
            bdd.apply_and(a, i),
        ]);
        assert!(bdd.is_zero(err));
    }
}
