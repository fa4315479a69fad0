//! Quantification and variable renaming.
//!
//! Every operation here takes its variable set as a slice and keeps a
//! per-call memo table, because the result depends on the set as well as on
//! the operands.

use std::collections::HashMap;

use log::debug;

use crate::bdd::Bdd;
use crate::reference::Ref;

fn sorted(vars: &[u32]) -> Vec<u32> {
    let mut vars = vars.to_vec();
    vars.sort_unstable();
    vars.dedup();
    vars
}

/// Drop the variables that lie above `level`; the operand cannot depend on them.
fn skip_above(vars: &[u32], level: u32) -> &[u32] {
    let k = vars.partition_point(|&v| v < level);
    &vars[k..]
}

impl Bdd {
    /// Existential abstraction: `∃ vars. f`.
    pub fn exists(&self, f: Ref, vars: &[u32]) -> Ref {
        debug!("exists(f = {}, vars = {:?})", f, vars);
        let vars = sorted(vars);
        let mut cache = HashMap::new();
        self.exists_(f, &vars, &mut cache)
    }

    fn exists_(&self, f: Ref, vars: &[u32], cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }

        let v = self.level(f);
        let vars = skip_above(vars, v);
        if vars.is_empty() {
            return f;
        }

        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let (f0, f1) = self.top_cofactors(f, v);
        let e = self.exists_(f0, vars, cache);
        let res = if vars[0] == v {
            if self.is_one(e) {
                self.one
            } else {
                let t = self.exists_(f1, vars, cache);
                self.apply_or(e, t)
            }
        } else {
            let t = self.exists_(f1, vars, cache);
            self.mk_node(v, e, t)
        };

        cache.insert(f, res);
        res
    }

    /// Universal abstraction: `∀ vars. f`.
    pub fn forall(&self, f: Ref, vars: &[u32]) -> Ref {
        -self.exists(-f, vars)
    }

    /// Relational product: `∃ vars. f ∧ g`, without building `f ∧ g` first.
    pub fn and_exists(&self, f: Ref, g: Ref, vars: &[u32]) -> Ref {
        debug!("and_exists(f = {}, g = {}, vars = {:?})", f, g, vars);
        let vars = sorted(vars);
        let mut cache = HashMap::new();
        let mut exists_cache = HashMap::new();
        self.and_exists_(f, g, &vars, &mut cache, &mut exists_cache)
    }

    fn and_exists_(
        &self,
        f: Ref,
        g: Ref,
        vars: &[u32],
        cache: &mut HashMap<(Ref, Ref), Ref>,
        exists_cache: &mut HashMap<Ref, Ref>,
    ) -> Ref {
        if self.is_zero(f) || self.is_zero(g) || f == -g {
            return self.zero;
        }
        if self.is_one(f) {
            return self.exists_(g, vars, exists_cache);
        }
        if self.is_one(g) || f == g {
            return self.exists_(f, vars, exists_cache);
        }

        // The operation is symmetric: normalize the key.
        let (f, g) = if f.get() <= g.get() { (f, g) } else { (g, f) };

        let m = self.level(f).min(self.level(g));
        let vars = skip_above(vars, m);
        if vars.is_empty() {
            return self.apply_and(f, g);
        }

        let key = (f, g);
        if let Some(&res) = cache.get(&key) {
            return res;
        }

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let e = self.and_exists_(f0, g0, vars, cache, exists_cache);
        let res = if vars[0] == m {
            if self.is_one(e) {
                self.one
            } else {
                let t = self.and_exists_(f1, g1, vars, cache, exists_cache);
                self.apply_or(e, t)
            }
        } else {
            let t = self.and_exists_(f1, g1, vars, cache, exists_cache);
            self.mk_node(m, e, t)
        };

        cache.insert(key, res);
        res
    }

    /// Rename variables of `f` according to `perm`.
    ///
    /// Variables missing from `perm` are kept. The mapping must be injective
    /// on the support of `f`; the target order may differ from the source
    /// order, the result is rebuilt with ITE.
    pub fn rename_vars(&self, f: Ref, perm: &HashMap<u32, u32>) -> Ref {
        let mut cache = HashMap::new();
        self.rename_vars_(f, perm, &mut cache)
    }

    fn rename_vars_(&self, f: Ref, perm: &HashMap<u32, u32>, cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }
        if f.is_negated() {
            return -self.rename_vars_(-f, perm, cache);
        }
        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let v = self.variable(f.index());
        let low = self.rename_vars_(self.low_node(f), perm, cache);
        let high = self.rename_vars_(self.high_node(f), perm, cache);
        let w = perm.get(&v).copied().unwrap_or(v);
        let res = self.apply_ite(self.mk_var(w), high, low);

        cache.insert(f, res);
        res
    }

    /// Swap each pair of variables `(a, b)` simultaneously.
    pub fn swap_pairs(&self, f: Ref, pairs: &[(u32, u32)]) -> Ref {
        let mut perm = HashMap::with_capacity(2 * pairs.len());
        for &(a, b) in pairs {
            perm.insert(a, b);
            perm.insert(b, a);
        }
        self.rename_vars(f, &perm)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_exists() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        let f = bdd.apply_and(bdd.apply_and(x1, x2), x3);
        assert_eq!(bdd.exists(f, &[2]), bdd.apply_and(x1, x3));
        assert_eq!(bdd.exists(f, &[3, 1]), x2);
        assert_eq!(bdd.exists(f, &[1, 2, 3]), bdd.one);
        assert_eq!(bdd.exists(f, &[]), f);
        assert_eq!(bdd.exists(bdd.zero, &[1]), bdd.zero);
    }

    #[test]
    fn test_forall() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);

        let f = bdd.apply_or(x1, x2);
        assert_eq!(bdd.forall(f, &[1]), x2);
        assert_eq!(bdd.forall(f, &[1, 2]), bdd.zero);
        assert_eq!(bdd.forall(bdd.apply_or(x1, -x1), &[1]), bdd.one);
    }

    #[test]
    fn test_and_exists_matches_naive() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);
        let x4 = bdd.mk_var(4);

        let f = bdd.apply_or(bdd.apply_eq(x1, x3), x4);
        let g = bdd.apply_xor(x2, bdd.apply_and(x3, -x4));

        for vars in [vec![], vec![3], vec![1, 4], vec![2, 3], vec![1, 2, 3, 4]] {
            let expected = bdd.exists(bdd.apply_and(f, g), &vars);
            assert_eq!(bdd.and_exists(f, g, &vars), expected, "vars = {:?}", vars);
            assert_eq!(bdd.and_exists(g, f, &vars), expected, "vars = {:?}", vars);
        }
    }

    #[test]
    fn test_swap_pairs() {
        let bdd = Bdd::default();

        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);
        let x4 = bdd.mk_var(4);
        let x5 = bdd.mk_var(5);

        // f(x2, x4) -> f(x3, x5)
        let f = bdd.apply_and(x2, -x4);
        let g = bdd.swap_pairs(f, &[(2, 3), (4, 5)]);
        assert_eq!(g, bdd.apply_and(x3, -x5));

        // Swapping is an involution.
        assert_eq!(bdd.swap_pairs(g, &[(2, 3), (4, 5)]), f);

        // Mixed functions swap both directions at once.
        let h = bdd.apply_xor(x2, x5);
        assert_eq!(bdd.swap_pairs(h, &[(2, 3), (4, 5)]), bdd.apply_xor(x3, x4));
    }

    #[test]
    fn test_rename_vars_reorders() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let f = bdd.apply_and(x1, -x2);
        let perm = HashMap::from([(1, 2), (2, 1)]);
        assert_eq!(bdd.rename_vars(f, &perm), bdd.apply_and(x2, -x1));
    }
}
