//! The [`Bdd`] manager.
//!
//! All boolean functions live in one shared unique table, so two functions
//! are equal if and only if their [`Ref`]s are equal. Negation is a
//! complement edge (`-f`) and costs nothing. To keep the representation
//! canonical, the `high` edge of a stored node is never complemented.
//!
//! Variables are ordered by their index: a smaller index is closer to the
//! root. Index 0 is reserved for the terminal node.

use std::cell::RefCell;
use std::cmp::min;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;

use log::debug;

use crate::cache::Cache;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing2, pairing3, MyHash};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            variable: 0,
            low: Ref::positive(0),
            high: Ref::positive(0),
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(
            self.variable as u64,
            self.low.get() as u64,
            self.high.get() as u64,
        )
    }
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum OpKey {
    Ite(Ref, Ref, Ref),
    Restrict(Ref, Ref),
}

impl MyHash for OpKey {
    fn hash(&self) -> u64 {
        match self {
            OpKey::Ite(f, g, h) => pairing3(f.get() as u64, g.get() as u64, h.get() as u64),
            OpKey::Restrict(f, c) => pairing2(f.get() as u64, c.get() as u64).wrapping_add(1),
        }
    }
}

pub struct Bdd {
    storage: RefCell<Table<Node>>,
    cache: RefCell<Cache<OpKey, Ref>>,
    pub zero: Ref,
    pub one: Ref,
}

impl Bdd {
    pub fn new(storage_bits: usize) -> Self {
        assert!(
            storage_bits <= 31,
            "Storage bits should be in the range 0..=31"
        );

        let cache_bits = min(storage_bits, 16);

        let mut storage = Table::new(storage_bits);

        // Allocate the terminal node:
        let one = storage.add(Node::default());
        assert_eq!(one, 1); // Make sure the terminal node is (1).
        let one = Ref::positive(one as u32);
        let zero = -one;

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(cache_bits)),
            zero,
            one,
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(20)
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Bdd")
            .field("capacity", &storage.capacity())
            .field("size", &storage.size())
            .finish()
    }
}

impl Bdd {
    pub fn cache(&self) -> std::cell::Ref<'_, Cache<OpKey, Ref>> {
        self.cache.borrow()
    }

    /// Number of allocated nodes, including the terminal.
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().size()
    }

    pub fn variable(&self, index: u32) -> u32 {
        self.storage.borrow().value(index as usize).variable
    }
    pub fn low(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).low
    }
    pub fn high(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).high
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == self.zero
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == self.one
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.index() == self.one.index()
    }

    /// Position of the top variable of `node` in the order.
    /// Terminals sit below every variable.
    pub(crate) fn level(&self, node: Ref) -> u32 {
        if self.is_terminal(node) {
            u32::MAX
        } else {
            self.variable(node.index())
        }
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        debug!("mk(v = {}, low = {}, high = {})", v, low, high);

        assert_ne!(v, 0, "Variable index should not be zero");

        // Handle canonicity
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        // Handle duplicates
        if low == high {
            return low;
        }

        let i = self.storage.borrow_mut().put(Node {
            variable: v,
            low,
            high,
        });
        Ref::positive(i as u32)
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");
        self.mk_node(v, self.zero, self.one)
    }

    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");

        if self.is_terminal(node) || v < self.variable(node.index()) {
            return (node, node);
        }
        assert_eq!(v, self.variable(node.index()));
        (self.low_node(node), self.high_node(node))
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(x, y, z) = (x ∧ y) ∨ (¬x ∧ z)
    /// ```
    ///
    /// # Examples
    ///
    /// ```
    /// use aiger_synth::bdd::Bdd;
    ///
    /// let bdd = Bdd::default();
    /// let x = bdd.mk_var(1);
    /// let y = bdd.mk_var(2);
    /// let z = bdd.mk_var(3);
    /// let f = bdd.apply_ite(x, y, z);
    /// assert_eq!(f, bdd.mk_node(1, z, y));
    /// let x_and_y = bdd.apply_and(x, y);
    /// let not_x_and_z = bdd.apply_and(-x, z);
    /// assert_eq!(f, bdd.apply_or(x_and_y, not_x_and_z));
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        debug!("apply_ite(f = {}, g = {}, h = {})", f, g, h);

        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,G,~F) => ite(F,G,1)
        let g = if g == f {
            self.one
        } else if g == -f {
            self.zero
        } else {
            g
        };
        let h = if h == f {
            self.zero
        } else if h == -f {
            self.one
        } else {
            h
        };

        // More base cases:
        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        //   ite(F,0,1) => ~F
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // Make sure the first two pointers (f and g) are regular (not negated)
        let (mut f, mut g, mut h) = (f, g, h);

        // ite(~F,G,H) => ite(F,H,G)
        if f.is_negated() {
            f = -f;
            std::mem::swap(&mut g, &mut h);
        }

        // ite(F,~G,H) => ~ite(F,G,~H)
        let mut n = false;
        if g.is_negated() {
            n = true;
            g = -g;
            h = -h;
        }

        let (f, g, h) = (f, g, h); // make immutable

        let key = OpKey::Ite(f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            debug!("cache: apply_ite(f = {}, g = {}, h = {}) -> {}", f, g, h, res);
            return if n { -res } else { res };
        }

        // Determine the top variable:
        let m = self.level(f).min(self.level(g)).min(self.level(h));
        debug!("min variable = {}", m);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);

        let res = self.mk_node(m, e, t);
        debug!("computed: apply_ite(f = {}, g = {}, h = {}) -> {}", f, g, h, res);
        self.cache.borrow_mut().insert(key, res);

        if n {
            -res
        } else {
            res
        }
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.zero)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, self.one, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.one;
        for node in nodes.into_iter() {
            res = self.apply_and(res, node);
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.zero;
        for node in nodes.into_iter() {
            res = self.apply_or(res, node);
        }
        res
    }

    /// Check whether `f` implies `g`, i.e. `f ∧ ¬g` is unsatisfiable.
    pub fn is_implies(&self, f: Ref, g: Ref) -> bool {
        self.is_zero(self.apply_and(f, -g))
    }

    // f|v<-b
    pub fn cofactor(&self, f: Ref, v: u32, b: bool) -> Ref {
        let mut cache = HashMap::new();
        self.cofactor_(f, v, b, &mut cache)
    }

    fn cofactor_(&self, f: Ref, v: u32, b: bool, cache: &mut HashMap<Ref, Ref>) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");

        if self.is_terminal(f) {
            return f;
        }

        let i = self.variable(f.index());

        if v < i {
            // 'f' does not depend on 'v'
            return f;
        }

        if v == i {
            return if b {
                self.high_node(f)
            } else {
                self.low_node(f)
            };
        }

        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let low = self.cofactor_(self.low_node(f), v, b, cache);
        let high = self.cofactor_(self.high_node(f), v, b, cache);
        let res = self.mk_node(i, low, high);
        cache.insert(f, res);
        res
    }

    // f|v<-g
    pub fn compose(&self, f: Ref, v: u32, g: Ref) -> Ref {
        let mut cache = HashMap::new();
        self.compose_(f, v, g, &mut cache)
    }

    fn compose_(&self, f: Ref, v: u32, g: Ref, cache: &mut HashMap<(Ref, Ref), Ref>) -> Ref {
        debug!("compose(f = {}, v = {}, g = {})", f, v, g);

        if self.is_terminal(f) {
            return f;
        }

        let i = self.variable(f.index());
        if v < i {
            // 'f' does not depend on 'v'
            return f;
        }

        let key = (f, g);
        if let Some(&res) = cache.get(&key) {
            return res;
        }

        let res = if v == i {
            self.apply_ite(g, self.high_node(f), self.low_node(f))
        } else {
            let m = min(i, self.level(g));
            let (f0, f1) = self.top_cofactors(f, m);
            let (g0, g1) = self.top_cofactors(g, m);
            let h0 = self.compose_(f0, v, g0, cache);
            let h1 = self.compose_(f1, v, g1, cache);
            self.mk_node(m, h0, h1)
        };
        cache.insert(key, res);
        res
    }

    /// Don't-care simplification of `f` against the care set `c`
    /// (Coudert–Madre `restrict`).
    ///
    /// The result agrees with `f` wherever `c` holds and is usually smaller
    /// than `f`. Variables that occur in `c` but not in `f` never appear in
    /// the result.
    pub fn restrict(&self, f: Ref, c: Ref) -> Ref {
        debug!("restrict(f = {}, c = {})", f, c);

        if self.is_zero(c) {
            return self.zero;
        }
        if self.is_one(c) || self.is_terminal(f) {
            return f;
        }
        if f == c {
            return self.one;
        }
        if f == -c {
            return self.zero;
        }

        let key = OpKey::Restrict(f, c);
        if let Some(&res) = self.cache.borrow().get(&key) {
            debug!("cache: restrict(f = {}, c = {}) -> {}", f, c, res);
            return res;
        }

        let vf = self.level(f);
        let vc = self.level(c);

        let res = if vc < vf {
            // `f` does not depend on the top variable of `c`: abstract it away.
            let (c0, c1) = self.top_cofactors(c, vc);
            self.restrict(f, self.apply_or(c0, c1))
        } else {
            let (f0, f1) = self.top_cofactors(f, vf);
            let (c0, c1) = self.top_cofactors(c, vf);
            if self.is_zero(c1) {
                self.restrict(f0, c0)
            } else if self.is_zero(c0) {
                self.restrict(f1, c1)
            } else {
                let low = self.restrict(f0, c0);
                let high = self.restrict(f1, c1);
                self.mk_node(vf, low, high)
            }
        };

        self.cache.borrow_mut().insert(key, res);
        res
    }

    /// Indices of all nodes reachable from `nodes`, terminal included.
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<u32> {
        let mut visited = HashSet::new();
        visited.insert(self.one.index());
        let mut stack = Vec::from_iter(nodes);

        while let Some(node) = stack.pop() {
            let i = node.index();
            if visited.insert(i) {
                stack.push(self.low(i));
                stack.push(self.high(i));
            }
        }

        visited
    }

    pub fn size(&self, f: Ref) -> u64 {
        self.descendants([f]).len() as u64
    }

    /// Variables that `f` depends on, in order.
    pub fn support(&self, f: Ref) -> Vec<u32> {
        let mut vars: Vec<u32> = self
            .descendants([f])
            .into_iter()
            .filter(|&i| i != self.one.index())
            .map(|i| self.variable(i))
            .collect();
        vars.sort_unstable();
        vars.dedup();
        vars
    }
}
