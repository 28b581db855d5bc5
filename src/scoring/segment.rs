use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, ScoreTriple, SegmentName};

/// Number of market segments. The name table has exactly this many entries.
pub const SEGMENT_COUNT: usize = 5;

const DIMENSIONS: usize = 3;

type Point = [f64; DIMENSIONS];

/// How fitted clusters are mapped onto segment names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentLabeling {
    /// Cluster index `i` takes the `i`-th name of the fixed table.
    #[default]
    Positional,
    /// Clusters are named by their centroid characteristics in score space.
    Ranked,
}

impl SegmentLabeling {
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "positional" | "index" => Some(SegmentLabeling::Positional),
            "ranked" | "centroid" => Some(SegmentLabeling::Ranked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub seed: u64,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
    pub labeling: SegmentLabeling,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            labeling: SegmentLabeling::Positional,
        }
    }
}

/// Zero-mean, unit-variance scaling per score column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub mean: Point,
    pub scale: Point,
}

impl Standardizer {
    pub fn fit(points: &[Point]) -> Self {
        let n = points.len().max(1) as f64;
        let mut mean = [0.0; DIMENSIONS];
        for point in points {
            for (axis, value) in point.iter().enumerate() {
                mean[axis] += value / n;
            }
        }

        let mut scale = [0.0; DIMENSIONS];
        for point in points {
            for (axis, value) in point.iter().enumerate() {
                scale[axis] += (value - mean[axis]).powi(2) / n;
            }
        }
        for value in scale.iter_mut() {
            *value = value.sqrt();
            // Constant column: every standardized value becomes 0.
            if !value.is_normal() {
                *value = 1.0;
            }
        }

        Self { mean, scale }
    }

    pub fn transform(&self, point: &Point) -> Point {
        let mut out = [0.0; DIMENSIONS];
        for axis in 0..DIMENSIONS {
            out[axis] = (point[axis] - self.mean[axis]) / self.scale[axis];
        }
        out
    }
}

/// Result of one k-means fit.
#[derive(Debug, Clone)]
pub struct Clustering {
    pub centroids: Vec<Point>,
    pub assignments: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
}

/// Lloyd's k-means with k-means++ seeding from a fixed-seed generator.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    n_init: usize,
    max_iter: usize,
    tolerance: f64,
    seed: u64,
}

impl KMeans {
    pub fn new(k: usize, config: &SegmentationConfig) -> Self {
        Self {
            k,
            n_init: config.n_init.max(1),
            max_iter: config.max_iter.max(1),
            tolerance: config.tolerance.max(0.0),
            seed: config.seed,
        }
    }

    pub fn fit(&self, points: &[Point]) -> Result<Clustering> {
        if self.k == 0 {
            return Err(Error::Clustering("cluster count must be positive".to_string()));
        }
        if points.len() < self.k {
            return Err(Error::Clustering(format!(
                "{} rows cannot form {} clusters",
                points.len(),
                self.k
            )));
        }
        if points.iter().flatten().any(|value| !value.is_finite()) {
            return Err(Error::Clustering("non-finite feature value".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<Clustering> = None;
        for _ in 0..self.n_init {
            let run = self.fit_once(points, &mut rng);
            let better = best
                .as_ref()
                .map(|current| run.inertia < current.inertia)
                .unwrap_or(true);
            if better {
                best = Some(run);
            }
        }

        best.ok_or_else(|| Error::Clustering("no clustering run completed".to_string()))
    }

    fn fit_once(&self, points: &[Point], rng: &mut StdRng) -> Clustering {
        let mut centroids = self.seed_centroids(points, rng);
        let mut assignments = vec![0usize; points.len()];
        let mut iterations = 0;

        for _ in 0..self.max_iter {
            iterations += 1;
            for (slot, point) in assignments.iter_mut().zip(points) {
                *slot = nearest(&centroids, point).0;
            }

            let mut updated = vec![[0.0; DIMENSIONS]; self.k];
            let mut sizes = vec![0usize; self.k];
            for (point, &cluster) in points.iter().zip(&assignments) {
                sizes[cluster] += 1;
                for axis in 0..DIMENSIONS {
                    updated[cluster][axis] += point[axis];
                }
            }
            let mut reseeded = Vec::new();
            for cluster in 0..self.k {
                if sizes[cluster] == 0 {
                    updated[cluster] =
                        match farthest_point(points, &centroids, &assignments, &reseeded) {
                            Some(index) => {
                                reseeded.push(index);
                                points[index]
                            }
                            None => centroids[cluster],
                        };
                    continue;
                }
                for axis in 0..DIMENSIONS {
                    updated[cluster][axis] /= sizes[cluster] as f64;
                }
            }

            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| squared_distance(old, new))
                .sum();
            centroids = updated;
            if shift <= self.tolerance {
                break;
            }
        }

        for (slot, point) in assignments.iter_mut().zip(points) {
            *slot = nearest(&centroids, point).0;
        }
        let inertia = points
            .iter()
            .zip(&assignments)
            .map(|(point, &cluster)| squared_distance(point, &centroids[cluster]))
            .sum();

        Clustering {
            centroids,
            assignments,
            inertia,
            iterations,
        }
    }

    /// k-means++: each next centroid is drawn with probability proportional to
    /// its squared distance from the closest centroid chosen so far.
    fn seed_centroids(&self, points: &[Point], rng: &mut StdRng) -> Vec<Point> {
        let mut centroids = Vec::with_capacity(self.k);
        centroids.push(points[rng.gen_range(0..points.len())]);

        while centroids.len() < self.k {
            let distances: Vec<f64> = points
                .iter()
                .map(|point| nearest(&centroids, point).1)
                .collect();
            let total: f64 = distances.iter().sum();
            let next = if total > 0.0 {
                let mut target = rng.gen::<f64>() * total;
                let mut chosen = points.len() - 1;
                for (index, distance) in distances.iter().enumerate() {
                    if target < *distance {
                        chosen = index;
                        break;
                    }
                    target -= distance;
                }
                chosen
            } else {
                rng.gen_range(0..points.len())
            };
            centroids.push(points[next]);
        }

        centroids
    }
}

/// A fitted segmentation: scaler, centroids and the cluster → name table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentModel {
    pub standardizer: Standardizer,
    pub centroids: Vec<Point>,
    pub names: Vec<SegmentName>,
    pub labeling: SegmentLabeling,
}

impl SegmentModel {
    /// Segment index and name for one score triple: the nearest centroid in
    /// standardized space, ties going to the lower cluster index.
    pub fn assign(&self, scores: &ScoreTriple) -> (u8, SegmentName) {
        let point = self.standardizer.transform(&scores.as_array());
        let cluster = nearest(&self.centroids, &point).0;
        let name = self.names[cluster];
        match self.labeling {
            SegmentLabeling::Positional => (cluster as u8, name),
            SegmentLabeling::Ranked => (name.index(), name),
        }
    }
}

/// Fits a [`SegmentModel`] over the score columns of a whole catalog.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmentationConfig,
}

impl Segmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    pub fn fit(&self, scores: &[ScoreTriple]) -> Result<SegmentModel> {
        let raw: Vec<Point> = scores.iter().map(ScoreTriple::as_array).collect();
        let standardizer = Standardizer::fit(&raw);
        let points: Vec<Point> = raw.iter().map(|point| standardizer.transform(point)).collect();

        let clustering = KMeans::new(SEGMENT_COUNT, &self.config).fit(&points)?;
        tracing::info!(
            rows = points.len(),
            iterations = clustering.iterations,
            inertia = clustering.inertia,
            "fitted market segments"
        );

        let names = match self.config.labeling {
            SegmentLabeling::Positional => SegmentName::ALL.to_vec(),
            SegmentLabeling::Ranked => rank_names(&raw, &clustering.assignments),
        };

        Ok(SegmentModel {
            standardizer,
            centroids: clustering.centroids,
            names,
            labeling: self.config.labeling,
        })
    }
}

/// Names clusters by their mean scores: the most popular cluster leads the
/// market, the least trusted of the rest is the discount trap, the best value
/// of the rest is the best deal, the most trusted of the rest is the hidden gem
/// and the remaining one holds premium picks.
fn rank_names(raw: &[Point], assignments: &[usize]) -> Vec<SegmentName> {
    let mut sums = vec![[0.0; DIMENSIONS]; SEGMENT_COUNT];
    let mut sizes = vec![0usize; SEGMENT_COUNT];
    for (point, &cluster) in raw.iter().zip(assignments) {
        sizes[cluster] += 1;
        for axis in 0..DIMENSIONS {
            sums[cluster][axis] += point[axis];
        }
    }
    let means: Vec<ScoreTriple> = sums
        .iter()
        .zip(&sizes)
        .map(|(sum, &size)| {
            let n = size.max(1) as f64;
            ScoreTriple {
                value: sum[0] / n,
                trust: sum[1] / n,
                popularity: sum[2] / n,
            }
        })
        .collect();

    let mut remaining: Vec<usize> = (0..SEGMENT_COUNT).collect();
    let mut names = vec![SegmentName::PremiumPicks; SEGMENT_COUNT];
    let order: [(SegmentName, fn(&ScoreTriple) -> f64); 4] = [
        (SegmentName::MarketLeaders, |s| s.popularity),
        (SegmentName::DiscountTrap, |s| -s.trust),
        (SegmentName::BestDeals, |s| s.value),
        (SegmentName::HiddenGems, |s| s.trust),
    ];
    for (name, key) in order {
        let Some(position) = remaining
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| {
                key(&means[**a])
                    .total_cmp(&key(&means[**b]))
                    .then_with(|| ib.cmp(ia))
            })
            .map(|(position, _)| position)
        else {
            break;
        };
        let cluster = remaining.remove(position);
        names[cluster] = name;
    }

    names
}

fn nearest(centroids: &[Point], point: &Point) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(centroid, point);
        if distance < best.1 {
            best = (index, distance);
        }
    }
    best
}

/// Index of the point farthest from its assigned centroid, skipping points
/// already used to reseed an empty cluster in the same pass.
fn farthest_point(
    points: &[Point],
    centroids: &[Point],
    assignments: &[usize],
    used: &[usize],
) -> Option<usize> {
    points
        .iter()
        .zip(assignments)
        .enumerate()
        .filter(|(index, _)| !used.contains(index))
        .map(|(index, (point, &cluster))| (index, squared_distance(point, &centroids[cluster])))
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(index, _)| index)
}

fn squared_distance(a: &Point, b: &Point) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(value: f64, trust: f64, popularity: f64) -> ScoreTriple {
        ScoreTriple {
            value,
            trust,
            popularity,
        }
    }

    #[test]
    fn empty_clusters_reseed_to_distinct_points() {
        let points = [
            [0.0, 0.0, 0.0],
            [5.0, 0.0, 0.0],
            [0.0, 3.0, 0.0],
            [0.1, 0.0, 0.0],
        ];
        let centroids = [[0.0, 0.0, 0.0]];
        let assignments = [0, 0, 0, 0];

        let first = farthest_point(&points, &centroids, &assignments, &[]);
        assert_eq!(first, Some(1));
        let second = farthest_point(&points, &centroids, &assignments, &[1]);
        assert_eq!(second, Some(2));
        assert_eq!(
            farthest_point(&points, &centroids, &assignments, &[0, 1, 2, 3]),
            None
        );
    }

    fn five_blobs() -> Vec<ScoreTriple> {
        let centers = [
            triple(90.0, 80.0, 10.0),
            triple(85.0, 10.0, 5.0),
            triple(20.0, 90.0, 2.0),
            triple(40.0, 70.0, 95.0),
            triple(5.0, 60.0, 20.0),
        ];
        let mut scores = Vec::new();
        for center in centers {
            for offset in [-1.0, 0.0, 1.0] {
                scores.push(triple(
                    center.value + offset,
                    center.trust - offset,
                    center.popularity + offset,
                ));
            }
        }
        scores
    }

    #[test]
    fn standardizer_handles_constant_column() {
        let points = [[1.0, 5.0, 2.0], [3.0, 5.0, 4.0]];
        let scaler = Standardizer::fit(&points);
        let out = scaler.transform(&points[0]);
        assert!((out[0] + 1.0).abs() < 1e-12);
        assert_eq!(out[1], 0.0);
        assert!((out[2] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn kmeans_is_deterministic_for_fixed_seed() {
        let points: Vec<Point> = five_blobs().iter().map(ScoreTriple::as_array).collect();
        let config = SegmentationConfig::default();
        let first = KMeans::new(SEGMENT_COUNT, &config).fit(&points).unwrap();
        let second = KMeans::new(SEGMENT_COUNT, &config).fit(&points).unwrap();
        assert_eq!(first.assignments, second.assignments);
        assert_eq!(first.centroids, second.centroids);
    }

    #[test]
    fn kmeans_separates_well_spaced_blobs() {
        let points: Vec<Point> = five_blobs().iter().map(ScoreTriple::as_array).collect();
        let clustering = KMeans::new(SEGMENT_COUNT, &SegmentationConfig::default())
            .fit(&points)
            .unwrap();
        for blob in clustering.assignments.chunks(3) {
            assert!(blob.iter().all(|cluster| *cluster == blob[0]));
        }
        let mut distinct = clustering.assignments.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), SEGMENT_COUNT);
    }

    #[test]
    fn kmeans_rejects_too_few_rows() {
        let points = vec![[0.0; DIMENSIONS]; 3];
        let result = KMeans::new(SEGMENT_COUNT, &SegmentationConfig::default()).fit(&points);
        assert!(matches!(result, Err(Error::Clustering(_))));
    }

    #[test]
    fn kmeans_tolerates_duplicate_points() {
        let points = vec![[1.0, 1.0, 1.0]; 8];
        let clustering = KMeans::new(SEGMENT_COUNT, &SegmentationConfig::default())
            .fit(&points)
            .unwrap();
        assert_eq!(clustering.assignments.len(), 8);
        assert_eq!(clustering.inertia, 0.0);
    }

    #[test]
    fn positional_labels_follow_cluster_index() {
        let scores = five_blobs();
        let model = Segmenter::new(SegmentationConfig::default())
            .fit(&scores)
            .unwrap();
        for score in &scores {
            let (index, name) = model.assign(score);
            assert_eq!(SegmentName::from_index(index as usize), Some(name));
        }
    }

    #[test]
    fn ranked_labels_follow_centroid_characteristics() {
        let scores = five_blobs();
        let config = SegmentationConfig {
            labeling: SegmentLabeling::Ranked,
            ..SegmentationConfig::default()
        };
        let model = Segmenter::new(config).fit(&scores).unwrap();

        assert_eq!(model.assign(&scores[9]).1, SegmentName::MarketLeaders);
        assert_eq!(model.assign(&scores[3]).1, SegmentName::DiscountTrap);
        assert_eq!(model.assign(&scores[0]).1, SegmentName::BestDeals);
        assert_eq!(model.assign(&scores[6]).1, SegmentName::HiddenGems);
        assert_eq!(model.assign(&scores[12]).1, SegmentName::PremiumPicks);
        for score in &scores {
            let (index, name) = model.assign(score);
            assert_eq!(index, name.index());
        }
    }
}
