use rand::Rng;

use super::Dna;

/// Changes applied to DNA. Operations are decoded from random draws first and applied
/// afterwards, so applying one is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnaOperation {
    /// Flips `length` consecutive bits starting at `start`, stopping at the end of the DNA.
    Flip { start: usize, length: usize },
    /// Copies bits `start..=end` of the donor over the DNA. With `swap_parents` the roles of
    /// the two parents are exchanged.
    Crossover { start: usize, end: usize, swap_parents: bool },
}

impl DnaOperation {
    /// A flip of a random run of 1 to `max_cluster_size` bits.
    pub fn random_flip<R: Rng + ?Sized>(rng: &mut R, dna_length: usize, max_cluster_size: usize) -> Self {
        if dna_length == 0 {
            return DnaOperation::Flip { start: 0, length: 0 };
        }
        DnaOperation::Flip {
            start: rng.gen_range(0..dna_length),
            length: rng.gen_range(1..=max_cluster_size.max(1)),
        }
    }

    /// A crossover of a random range. Both ends are drawn independently; drawing them in
    /// reverse order swaps the parents, so either parent's ends are exchanged equally often.
    pub fn random_crossover<R: Rng + ?Sized>(rng: &mut R, dna_length: usize) -> Self {
        if dna_length == 0 {
            return DnaOperation::Crossover { start: 0, end: 0, swap_parents: false };
        }
        let first = rng.gen_range(0..dna_length);
        let second = rng.gen_range(0..dna_length);
        DnaOperation::Crossover {
            start: first.min(second),
            end: first.max(second),
            swap_parents: first > second,
        }
    }

    /// Applies the operation to `dna`. Only crossovers read `donor`.
    pub fn apply(&self, dna: &Dna, donor: &Dna) -> Dna {
        match *self {
            DnaOperation::Flip { start, length } => self.apply_flip(dna, start, length),
            DnaOperation::Crossover { start, end, swap_parents } => {
                if swap_parents {
                    self.apply_crossover(donor, dna, start, end)
                } else {
                    self.apply_crossover(dna, donor, start, end)
                }
            }
        }
    }

    fn apply_flip(&self, dna: &Dna, start: usize, length: usize) -> Dna {
        let mut flipped = dna.clone();
        for i in start..start.saturating_add(length).min(dna.len()) {
            flipped.flip(i);
        }
        flipped
    }

    fn apply_crossover(&self, base: &Dna, donor: &Dna, start: usize, end: usize) -> Dna {
        let mut child = base.clone();
        if base.is_empty() || base.len() != donor.len() {
            return child;
        }
        for i in start..=end.min(base.len() - 1) {
            child.set(i, donor.get(i));
        }
        child
    }
}
