//! Seeded k-means (k-means++ initialization, Lloyd iterations).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Euclidean distance. Extra dimensions of the longer vector are ignored.
pub fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Fitted cluster centers.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeans {
    pub centroids: Vec<Vec<f32>>,
    pub iterations: usize,
}

impl KMeans {
    /// Cluster `points` into `k` groups. The same seed and input always
    /// give the same centroids. Returns `k.min(points.len())` centroids.
    pub fn fit(points: &[Vec<f32>], k: usize, seed: u64, max_iterations: usize) -> Self {
        let k = k.min(points.len());
        if k == 0 {
            return Self {
                centroids: Vec::new(),
                iterations: 0,
            };
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids = init_plus_plus(points, k, &mut rng);
        let mut assignment = vec![usize::MAX; points.len()];
        let mut iterations = 0;

        while iterations < max_iterations {
            iterations += 1;

            let mut changed = false;
            for (i, point) in points.iter().enumerate() {
                let nearest = nearest(point, &centroids);
                if assignment[i] != nearest {
                    assignment[i] = nearest;
                    changed = true;
                }
            }
            if !changed {
                break;
            }

            for (c, centroid) in centroids.iter_mut().enumerate() {
                let members: Vec<&Vec<f32>> = points
                    .iter()
                    .zip(&assignment)
                    .filter(|(_, a)| **a == c)
                    .map(|(p, _)| p)
                    .collect();
                // An empty cluster keeps its previous center.
                if let Some(mean) = mean(&members) {
                    *centroid = mean;
                }
            }
        }

        Self {
            centroids,
            iterations,
        }
    }
}

/// Index of the centroid closest to `point`; ties go to the lower index.
fn nearest(point: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = euclidean(point, c);
        if d < best_distance {
            best = i;
            best_distance = d;
        }
    }
    best
}

fn mean(members: &[&Vec<f32>]) -> Option<Vec<f32>> {
    let first = members.first()?;
    let mut sum = vec![0.0f64; first.len()];
    for m in members {
        for (s, v) in sum.iter_mut().zip(m.iter()) {
            *s += f64::from(*v);
        }
    }
    let n = members.len() as f64;
    Some(sum.into_iter().map(|s| (s / n) as f32).collect())
}

/// k-means++ seeding: each next center is drawn with probability
/// proportional to squared distance from the nearest chosen center.
fn init_plus_plus(points: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let mut centroids = vec![points[rng.gen_range(0..points.len())].clone()];

    while centroids.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| {
                let d = euclidean(p, &centroids[nearest(p, &centroids)]);
                d * d
            })
            .collect();
        let total: f64 = weights.iter().sum();

        let chosen = if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            let mut chosen = points.len() - 1;
            for (i, w) in weights.iter().enumerate() {
                if target < *w {
                    chosen = i;
                    break;
                }
                target -= w;
            }
            chosen
        } else {
            // All points coincide with a center.
            rng.gen_range(0..points.len())
        };
        centroids.push(points[chosen].clone());
    }

    centroids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![10.0, 10.0],
            vec![10.1, 10.0],
            vec![-10.0, 10.0],
            vec![-10.0, 10.1],
        ]
    }

    #[test]
    fn test_separated_blobs() {
        let fit = KMeans::fit(&blobs(), 3, 42, 300);
        assert_eq!(fit.centroids.len(), 3);

        let mut xs: Vec<i32> = fit.centroids.iter().map(|c| c[0].round() as i32).collect();
        xs.sort();
        assert_eq!(xs, vec![-10, 0, 10]);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let a = KMeans::fit(&blobs(), 3, 42, 300);
        let b = KMeans::fit(&blobs(), 3, 42, 300);
        assert_eq!(a, b);
    }

    #[test]
    fn test_k_capped_by_points() {
        let fit = KMeans::fit(&[vec![1.0], vec![2.0]], 3, 42, 300);
        assert_eq!(fit.centroids.len(), 2);
        assert!(KMeans::fit(&[], 3, 42, 300).centroids.is_empty());
    }

    #[test]
    fn test_identical_points() {
        let points = vec![vec![1.0, 1.0]; 5];
        let fit = KMeans::fit(&points, 3, 7, 300);
        assert_eq!(fit.centroids.len(), 3);
        assert!(fit.centroids.iter().all(|c| c == &vec![1.0, 1.0]));
    }

    #[test]
    fn test_euclidean() {
        assert!((euclidean(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-9);
    }
}
