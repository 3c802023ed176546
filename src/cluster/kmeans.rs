// Seeded Lloyd's k-means over the TF-IDF feature space.
//
// Determinism matters more than clustering quality here: given the same
// batch in the same order, two runs must produce identical assignments, so
// centers are initialized from a ChaCha8 stream seeded with a fixed value.
// Each restart picks distinct points as initial centers, refines to
// convergence or the iteration cap, and the restart with the lowest
// inertia wins.

use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Fixed seed for clustering runs.
pub const DEFAULT_SEED: u64 = 42;

const MAX_ITERATIONS: usize = 100;
const RESTARTS: usize = 10;

/// A finished partition: one cluster index per input vector and the mean
/// vector of every cluster. Clusters that ended up empty keep the last
/// center they had; no member ever references them.
#[derive(Debug, Clone)]
pub struct Clustering {
    pub assignments: Vec<usize>,
    pub centers: Vec<Vec<f64>>,
    pub inertia: f64,
}

/// Partition `vectors` into `k` clusters.
///
/// `k` is capped at the number of vectors — with one center per point the
/// partition is exact and further splitting is meaningless.
pub fn cluster(vectors: &[Vec<f64>], k: usize, seed: u64) -> Clustering {
    if vectors.is_empty() {
        return Clustering {
            assignments: Vec::new(),
            centers: Vec::new(),
            inertia: 0.0,
        };
    }
    let n = vectors.len();
    let k = k.clamp(1, n);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut best: Option<Clustering> = None;

    for _ in 0..RESTARTS {
        let run = lloyd_run(vectors, k, &mut rng);
        let improved = match &best {
            Some(current) => run.inertia < current.inertia,
            None => true,
        };
        if improved {
            best = Some(run);
        }
    }

    // RESTARTS >= 1, so a best run always exists.
    best.unwrap_or_else(|| Clustering {
        assignments: vec![0; n],
        centers: vec![vectors[0].clone()],
        inertia: 0.0,
    })
}

fn lloyd_run(vectors: &[Vec<f64>], k: usize, rng: &mut ChaCha8Rng) -> Clustering {
    let n = vectors.len();
    let dim = vectors[0].len();

    // Distinct data points as initial centers.
    let picks = sample(rng, n, k);
    let mut centers: Vec<Vec<f64>> = picks.iter().map(|i| vectors[i].clone()).collect();

    let mut assignments: Vec<usize> = Vec::new();
    for _ in 0..MAX_ITERATIONS {
        let new_assignments: Vec<usize> = vectors.iter().map(|v| nearest(v, &centers)).collect();
        let converged = new_assignments == assignments;
        assignments = new_assignments;

        // Recompute centers as member means. An empty cluster keeps its
        // previous center rather than being reseeded — acceptable for the
        // degenerate batches this pipeline sees.
        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (i, v) in vectors.iter().enumerate() {
            let c = assignments[i];
            counts[c] += 1;
            for (j, x) in v.iter().enumerate() {
                sums[c][j] += x;
            }
        }
        for c in 0..k {
            if counts[c] > 0 {
                for j in 0..dim {
                    centers[c][j] = sums[c][j] / counts[c] as f64;
                }
            }
        }

        if converged {
            break;
        }
    }

    let inertia = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| squared_distance(v, &centers[assignments[i]]))
        .sum();

    Clustering {
        assignments,
        centers,
        inertia,
    }
}

/// Index of the closest center; ties go to the lowest index.
fn nearest(vector: &[f64], centers: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (c, center) in centers.iter().enumerate() {
        let d = squared_distance(vector, center);
        if d < best_distance {
            best_distance = d;
            best = c;
        }
    }
    best
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}
