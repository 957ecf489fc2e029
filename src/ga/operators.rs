//! Configurable genetic operators.
//!
//! Provides the runtime-selectable mutation strategy via
//! [`GeneticOperators`]. Crossover is always single-point.
//!
//! # Usage
//!
//! ```
//! use cluster_sched::ga::operators::{GeneticOperators, MutationType};
//!
//! let ops = GeneticOperators::default();
//! assert_eq!(ops.mutation_type, MutationType::BitFlip);
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::chromosome::{bit_flip_mutation, inert_mutation, single_point_crossover, EdgeChromosome};

/// Mutation strategy for edge chromosomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationType {
    /// Flip each gene with the mutation probability.
    #[default]
    BitFlip,
    /// Consume the same random draws without changing any gene.
    Inert,
}

/// Runtime-selectable genetic operators.
///
/// # Example
///
/// ```
/// use cluster_sched::ga::operators::{GeneticOperators, MutationType};
///
/// let ops = GeneticOperators {
///     mutation_type: MutationType::Inert,
///     mutation_ratio: 0.05,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct GeneticOperators {
    /// Mutation strategy.
    pub mutation_type: MutationType,
    /// Per-gene mutation probability.
    pub mutation_ratio: f64,
}

impl Default for GeneticOperators {
    fn default() -> Self {
        Self {
            mutation_type: MutationType::BitFlip,
            mutation_ratio: 0.01,
        }
    }
}

impl GeneticOperators {
    /// Performs single-point crossover.
    pub fn crossover<R: Rng>(
        &self,
        p1: &EdgeChromosome,
        p2: &EdgeChromosome,
        rng: &mut R,
    ) -> (EdgeChromosome, EdgeChromosome) {
        single_point_crossover(p1, p2, rng)
    }

    /// Performs mutation using the configured strategy.
    pub fn mutate<R: Rng>(&self, chromosome: &mut EdgeChromosome, rng: &mut R) {
        match self.mutation_type {
            MutationType::BitFlip => bit_flip_mutation(chromosome, self.mutation_ratio, rng),
            MutationType::Inert => inert_mutation(chromosome, self.mutation_ratio, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_operators() {
        let ops = GeneticOperators::default();
        assert_eq!(ops.mutation_type, MutationType::BitFlip);
        assert!((ops.mutation_ratio - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_mutation_dispatch() {
        let mut rng = SmallRng::seed_from_u64(42);
        let genes = vec![0, 0, 1, 1];

        let flip = GeneticOperators {
            mutation_type: MutationType::BitFlip,
            mutation_ratio: 1.0,
        };
        let mut c = EdgeChromosome::from_genes(genes.clone());
        flip.mutate(&mut c, &mut rng);
        assert_eq!(c.genes, vec![1, 1, 0, 0]);

        let inert = GeneticOperators {
            mutation_type: MutationType::Inert,
            mutation_ratio: 1.0,
        };
        let mut c = EdgeChromosome::from_genes(genes.clone());
        inert.mutate(&mut c, &mut rng);
        assert_eq!(c.genes, genes);
    }

    #[test]
    fn test_crossover_keeps_length() {
        let mut rng = SmallRng::seed_from_u64(7);
        let ops = GeneticOperators::default();
        let p1 = EdgeChromosome::random(6, &mut rng);
        let p2 = EdgeChromosome::random(6, &mut rng);
        let (c1, c2) = ops.crossover(&p1, &p2, &mut rng);
        assert_eq!(c1.len(), 6);
        assert_eq!(c2.len(), 6);
    }

    #[test]
    fn test_mutation_type_serde() {
        let json = serde_json::to_string(&MutationType::Inert).unwrap();
        assert_eq!(json, "\"Inert\"");
        let back: MutationType = serde_json::from_str("\"BitFlip\"").unwrap();
        assert_eq!(back, MutationType::BitFlip);
    }
}
