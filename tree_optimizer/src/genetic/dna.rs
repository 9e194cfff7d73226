use std::fmt;

use fixedbitset::FixedBitSet;

/// Fixed-length bit string, one bit per candidate node.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Dna(FixedBitSet);

impl Dna {
    /// All bits unset.
    pub fn new(length: usize) -> Self {
        Dna(FixedBitSet::with_capacity(length))
    }

    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        let bits: Vec<bool> = bits.into_iter().collect();
        let mut dna = Dna::new(bits.len());
        for (i, bit) in bits.into_iter().enumerate() {
            dna.set(i, bit);
        }
        dna
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.len() == 0
    }

    pub fn get(&self, index: usize) -> bool {
        self.0.contains(index)
    }

    pub fn set(&mut self, index: usize, value: bool) {
        self.0.set(index, value);
    }

    pub fn flip(&mut self, index: usize) {
        let value = self.0.contains(index);
        self.0.set(index, !value);
    }

    /// Indices of the set bits, ascending.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.ones()
    }

    pub fn count_ones(&self) -> usize {
        self.0.count_ones(..)
    }
}

impl fmt::Debug for Dna {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits: String = (0..self.len()).map(|i| if self.get(i) { '1' } else { '0' }).collect();
        write!(f, "Dna({bits})")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn equal_bits_hash_equally() {
        let a = Dna::from_bits([true, false, true]);
        let mut b = Dna::new(3);
        b.flip(0);
        b.set(2, true);
        assert_eq!(a, b);
        assert_eq!(HashSet::from([a.clone(), b]).len(), 1);
        assert_eq!(a.ones().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(a.count_ones(), 2);
        assert_eq!(format!("{a:?}"), "Dna(101)");
    }

    #[test]
    fn empty_dna() {
        let dna = Dna::new(0);
        assert!(dna.is_empty());
        assert_eq!(dna.ones().count(), 0);
    }
}
