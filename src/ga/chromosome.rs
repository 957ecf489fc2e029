//! Binary edge-penalty chromosome.
//!
//! # Encoding
//!
//! `genes[i]` is 1 when the i-th dependency of the graph is treated as an
//! inter-cluster edge during learning, 0 otherwise.
//!
//! # Reference
//! Goldberg (1989), "Genetic Algorithms in Search, Optimization and Machine
//! Learning", Ch. 1 (binary encoding, single-point crossover)

use rand::Rng;

use super::Individual;

/// Binary chromosome over the dependencies of a graph.
///
/// Lower fitness (makespan) = better.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeChromosome {
    /// One gene per dependency, each 0 or 1.
    pub genes: Vec<u8>,
    fitness: Option<u64>,
}

impl Individual for EdgeChromosome {
    type Fitness = u64;

    fn fitness(&self) -> Option<u64> {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: u64) {
        self.fitness = Some(fitness);
    }
}

impl EdgeChromosome {
    /// Creates a chromosome with uniformly random genes.
    pub fn random<R: Rng>(len: usize, rng: &mut R) -> Self {
        Self::from_genes((0..len).map(|_| rng.random_range(0..=1u8)).collect())
    }

    /// Creates an unevaluated chromosome from genes.
    pub fn from_genes(genes: Vec<u8>) -> Self {
        Self {
            genes,
            fitness: None,
        }
    }

    /// Number of genes.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Whether the chromosome has no gene.
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Indices of the genes set to 1.
    pub fn penalised(&self) -> impl Iterator<Item = usize> + '_ {
        self.genes
            .iter()
            .enumerate()
            .filter(|(_, g)| **g == 1)
            .map(|(i, _)| i)
    }

    fn invalidate(&mut self) {
        self.fitness = None;
    }
}

/// Single-point crossover at a uniform cut `k` in `0..=len`.
///
/// `child1 = p1[k..] ++ p2[..k]`, `child2 = p2[k..] ++ p1[..k]`.
pub fn single_point_crossover<R: Rng>(
    p1: &EdgeChromosome,
    p2: &EdgeChromosome,
    rng: &mut R,
) -> (EdgeChromosome, EdgeChromosome) {
    let cut = rng.random_range(0..=p1.len().min(p2.len()));
    crossover_at(p1, p2, cut)
}

/// Single-point crossover at a fixed cut.
pub(crate) fn crossover_at(
    p1: &EdgeChromosome,
    p2: &EdgeChromosome,
    cut: usize,
) -> (EdgeChromosome, EdgeChromosome) {
    let splice = |a: &EdgeChromosome, b: &EdgeChromosome| {
        let mut genes = Vec::with_capacity(a.len());
        genes.extend_from_slice(&a.genes[cut..]);
        genes.extend_from_slice(&b.genes[..cut]);
        EdgeChromosome::from_genes(genes)
    };
    (splice(p1, p2), splice(p2, p1))
}

/// Flips each gene independently with probability `ratio`.
pub fn bit_flip_mutation<R: Rng>(chromosome: &mut EdgeChromosome, ratio: f64, rng: &mut R) {
    let mut changed = false;
    for gene in &mut chromosome.genes {
        if rng.random::<f64>() < ratio {
            *gene ^= 1;
            changed = true;
        }
    }
    if changed {
        chromosome.invalidate();
    }
}

/// Draws the same random numbers as a resampling mutation but leaves every
/// gene unchanged.
pub fn inert_mutation<R: Rng>(chromosome: &mut EdgeChromosome, ratio: f64, rng: &mut R) {
    for _ in &chromosome.genes {
        if rng.random::<f64>() < ratio {
            let _resampled: u8 = rng.random_range(0..=1u8);
        }
    }
}
