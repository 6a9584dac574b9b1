//! Population ranking shared by every search algorithm: single-objective
//! ordering, Pareto dominance, non-dominated sorting and crowding distance.

use std::cmp::Ordering;

use super::chromosome::Chromosome;
use super::fitness::{evaluate_all, FitnessFunction};

/// A chromosome with its fitness vector and multi-objective ranking.
#[derive(Debug)]
pub struct Evaluated<T> {
    pub chromosome: Chromosome<T>,
    pub fitness: Vec<f64>,
    /// Index of the non-dominated front; 0 is best.
    pub rank: usize,
    pub crowding: f64,
}

impl<T> Clone for Evaluated<T> {
    fn clone(&self) -> Self {
        Self {
            chromosome: self.chromosome.clone(),
            fitness: self.fitness.clone(),
            rank: self.rank,
            crowding: self.crowding,
        }
    }
}

/// Order chromosomes best first under one fitness function. Stable, so
/// ties keep their input order.
pub fn rank_by_fitness<T>(
    chromosomes: &[Chromosome<T>],
    function: &dyn FitnessFunction<T>,
) -> Vec<Chromosome<T>> {
    let mut scored: Vec<(f64, Chromosome<T>)> = chromosomes
        .iter()
        .map(|c| (function.evaluate(c), c.clone()))
        .collect();
    let maximizing = function.is_maximizing();
    scored.sort_by(|(a, _), (b, _)| {
        let ord = a.partial_cmp(b).unwrap_or(Ordering::Equal);
        if maximizing {
            ord.reverse()
        } else {
            ord
        }
    });
    scored.into_iter().map(|(_, c)| c).collect()
}

/// `a` Pareto-dominates `b`: no worse in every objective, strictly better
/// in at least one.
pub fn dominates(a: &[f64], b: &[f64], maximizing: &[bool]) -> bool {
    let mut strictly = false;
    for ((x, y), max) in a.iter().zip(b).zip(maximizing) {
        let (x, y) = if *max { (*x, *y) } else { (-*x, -*y) };
        if x < y {
            return false;
        }
        if x > y {
            strictly = true;
        }
    }
    strictly
}

/// Split indices into non-dominated fronts, best front first.
pub fn non_dominated_sort(fitness: &[Vec<f64>], maximizing: &[bool]) -> Vec<Vec<usize>> {
    let n = fitness.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];
    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut current = Vec::new();

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if dominates(&fitness[i], &fitness[j], maximizing) {
                dominated_by[i].push(j);
            } else if dominates(&fitness[j], &fitness[i], maximizing) {
                domination_count[i] += 1;
            }
        }
        if domination_count[i] == 0 {
            current.push(i);
        }
    }

    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            for &j in &dominated_by[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next.push(j);
                }
            }
        }
        next.sort_unstable();
        fronts.push(std::mem::replace(&mut current, next));
    }
    fronts
}

/// Crowding distance of each member of `front`, in `front` order.
/// Boundary members of every objective get infinity.
pub fn crowding_distance(front: &[usize], fitness: &[Vec<f64>]) -> Vec<f64> {
    let mut distance = vec![0.0; front.len()];
    if front.len() <= 2 {
        return vec![f64::INFINITY; front.len()];
    }
    let objectives = fitness.get(front[0]).map_or(0, Vec::len);
    for m in 0..objectives {
        let mut order: Vec<usize> = (0..front.len()).collect();
        order.sort_by(|&a, &b| {
            fitness[front[a]][m]
                .partial_cmp(&fitness[front[b]][m])
                .unwrap_or(Ordering::Equal)
        });
        let min = fitness[front[order[0]]][m];
        let max = fitness[front[order[order.len() - 1]]][m];
        distance[order[0]] = f64::INFINITY;
        distance[order[order.len() - 1]] = f64::INFINITY;
        let span = max - min;
        if span <= 0.0 {
            continue;
        }
        for w in 1..order.len() - 1 {
            let prev = fitness[front[order[w - 1]]][m];
            let next = fitness[front[order[w + 1]]][m];
            distance[order[w]] += (next - prev) / span;
        }
    }
    distance
}

/// Ascending rank, then descending crowding distance; otherwise equal.
pub fn rank_crowding_cmp<T>(a: &Evaluated<T>, b: &Evaluated<T>) -> Ordering {
    a.rank.cmp(&b.rank).then_with(|| {
        b.crowding
            .partial_cmp(&a.crowding)
            .unwrap_or(Ordering::Equal)
    })
}

/// Evaluate chromosomes against every objective and assign rank and
/// crowding distance.
pub fn evaluate_population<T>(
    chromosomes: Vec<Chromosome<T>>,
    functions: &[Box<dyn FitnessFunction<T>>],
) -> Vec<Evaluated<T>> {
    let mut members: Vec<Evaluated<T>> = chromosomes
        .into_iter()
        .map(|chromosome| {
            let fitness = evaluate_all(&chromosome, functions);
            Evaluated {
                chromosome,
                fitness,
                rank: 0,
                crowding: 0.0,
            }
        })
        .collect();
    let maximizing: Vec<bool> = functions.iter().map(|f| f.is_maximizing()).collect();
    assign_rank_and_crowding(&mut members, &maximizing);
    members
}

/// Recompute rank and crowding distance in place.
pub fn assign_rank_and_crowding<T>(members: &mut [Evaluated<T>], maximizing: &[bool]) {
    let fitness: Vec<Vec<f64>> = members.iter().map(|m| m.fitness.clone()).collect();
    for (rank, front) in non_dominated_sort(&fitness, maximizing).iter().enumerate() {
        let distance = crowding_distance(front, &fitness);
        for (&i, d) in front.iter().zip(distance) {
            members[i].rank = rank;
            members[i].crowding = d;
        }
    }
}

/// Keep the best `size` members under rank-crowding order.
pub fn select_survivors<T>(
    mut members: Vec<Evaluated<T>>,
    size: usize,
    maximizing: &[bool],
) -> Vec<Evaluated<T>> {
    assign_rank_and_crowding(&mut members, maximizing);
    members.sort_by(rank_crowding_cmp);
    members.truncate(size);
    members
}
