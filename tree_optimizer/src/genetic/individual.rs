use super::Dna;

/// A DNA together with its fitness. The DNA never changes, a mutation spawns a new individual.
#[derive(Debug, Clone)]
pub struct Individual {
    pub(super) dna: Dna,
    pub(super) fitness: f64,
    /// 1-based position in the fitness-sorted population of the last generation.
    pub(super) rank: usize,
    /// Number of generations this individual survived.
    pub(super) age: u32,
}

impl Individual {
    pub(super) fn new(dna: Dna, fitness: f64) -> Self {
        Individual {
            dna,
            fitness,
            rank: 0,
            age: 0,
        }
    }

    pub fn dna(&self) -> &Dna {
        &self.dna
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn age(&self) -> u32 {
        self.age
    }
}
