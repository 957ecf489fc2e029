//! Genetic hybrid scheduling (CQGA-HEFT).
//!
//! A genetic algorithm searches over which dependencies to pre-penalise as
//! inter-cluster edges. Each chromosome is decoded by Q-learning into a
//! task ordering, and its fitness is the makespan of that ordering on the
//! clustered processor.
//!
//! # Encoding
//!
//! One binary gene per dependency, in the graph's edge enumeration order.
//! Gene `1` multiplies the edge's communication cost by `inout_ratio` before
//! learning.
//!
//! # Submodules
//!
//! - [`operators`]: Runtime-selectable mutation strategy
//!
//! # Reference
//! - Holland (1975), "Adaptation in Natural and Artificial Systems"
//! - Tong et al. (2020), "QL-HEFT: a novel machine learning scheduling
//!   scheme base on cloud computing environment"

mod chromosome;
pub mod operators;
mod problem;

pub use chromosome::{bit_flip_mutation, inert_mutation, single_point_crossover, EdgeChromosome};
pub use problem::Cqgaheft;

/// A population member with a minimisation fitness.
pub trait Individual: Clone {
    /// Fitness value (lower = better).
    type Fitness: PartialOrd + Copy;

    /// Fitness, `None` until evaluated.
    fn fitness(&self) -> Option<Self::Fitness>;

    /// Stores an evaluated fitness.
    fn set_fitness(&mut self, fitness: Self::Fitness);
}

/// Sorts a population by ascending fitness, unevaluated members last.
///
/// The sort is stable: equal fitness keeps population order.
pub fn sort_by_fitness<I: Individual>(population: &mut [I]) {
    population.sort_by(|a, b| match (a.fitness(), b.fitness()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Member with the lowest fitness. Ties go to the earliest member.
pub fn fittest<I: Individual>(population: &[I]) -> Option<&I> {
    let mut best: Option<&I> = None;
    for member in population {
        let Some(f) = member.fitness() else {
            continue;
        };
        match best.and_then(|b| b.fitness()) {
            Some(bf) if bf <= f => {}
            _ => best = Some(member),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(fitness: Option<u64>) -> EdgeChromosome {
        let mut c = EdgeChromosome::from_genes(vec![0]);
        if let Some(f) = fitness {
            c.set_fitness(f);
        }
        c
    }

    #[test]
    fn test_sort_by_fitness() {
        let mut pop = vec![member(None), member(Some(7)), member(Some(3)), member(Some(7))];
        pop[3].genes[0] = 1;
        sort_by_fitness(&mut pop);
        let f: Vec<_> = pop.iter().map(|c| c.fitness()).collect();
        assert_eq!(f, vec![Some(3), Some(7), Some(7), None]);
        // stable
        assert_eq!(pop[1].genes, vec![0]);
        assert_eq!(pop[2].genes, vec![1]);
    }

    #[test]
    fn test_fittest() {
        let pop = vec![member(None), member(Some(5)), member(Some(5)), member(Some(9))];
        let best = fittest(&pop).unwrap();
        assert!(std::ptr::eq(best, &pop[1]));
        assert!(fittest::<EdgeChromosome>(&[]).is_none());
        assert!(fittest(&[member(None)]).is_none());
    }
}
