use std::collections::HashMap;

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::reference::Ref;

impl Bdd {
    /// Number of satisfying assignments of `node` over `num_vars` variables.
    ///
    /// The support of `node` must be among those `num_vars` variables.
    pub fn sat_count(&self, node: Ref, num_vars: usize) -> BigUint {
        let mut cache = HashMap::new();
        let max = BigUint::from(1u32) << num_vars;
        self.sat_count_(node, &max, &mut cache)
    }

    fn sat_count_(&self, node: Ref, max: &BigUint, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_zero(node) {
            return BigUint::ZERO;
        } else if self.is_one(node) {
            return max.clone();
        }

        if let Some(count) = cache.get(&node) {
            return count.clone();
        }

        let low = self.low(node.index());
        let high = self.high(node.index());

        let count_low = self.sat_count_(low, max, cache);
        let count_high = self.sat_count_(high, max, cache);

        // Each branch was counted over all variables: halve their sum.
        let count: BigUint = (count_low + count_high) >> 1;
        let count = if node.is_negated() { max - count } else { count };

        cache.insert(node, count.clone());
        count
    }
}
