//! k-means（k-means++ 初始化 + Lloyd 迭代）

use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct KMeans {
    pub centroids: Vec<Vec<f64>>,
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl KMeans {
    /// 训练模型；`data` 非空且 `k` 不超过样本数由调用方保证
    pub fn fit<R: Rng + ?Sized>(data: &[Vec<f64>], k: usize, max_iter: usize, rng: &mut R) -> Self {
        let mut model = Self {
            centroids: init_plus_plus(data, k, rng),
        };

        let mut labels: Vec<usize> = data.iter().map(|p| model.predict(p)).collect();
        for _ in 0..max_iter {
            model.recompute(data, &labels);
            let next: Vec<usize> = data.iter().map(|p| model.predict(p)).collect();
            if next == labels {
                break;
            }
            labels = next;
        }
        model
    }

    /// 最近的质心下标，距离相同取下标小的
    pub fn predict(&self, point: &[f64]) -> usize {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (idx, centroid) in self.centroids.iter().enumerate() {
            let distance = squared_distance(point, centroid);
            if distance < best_distance {
                best = idx;
                best_distance = distance;
            }
        }
        best
    }

    /// 按当前分配重新计算质心，空簇保留原质心
    fn recompute(&mut self, data: &[Vec<f64>], labels: &[usize]) {
        let dims = self.centroids.first().map_or(0, Vec::len);
        let mut sums = vec![vec![0.0; dims]; self.centroids.len()];
        let mut counts = vec![0usize; self.centroids.len()];
        for (point, &label) in data.iter().zip(labels) {
            counts[label] += 1;
            for (sum, value) in sums[label].iter_mut().zip(point) {
                *sum += value;
            }
        }
        for ((centroid, sum), count) in self.centroids.iter_mut().zip(sums).zip(counts) {
            if count > 0 {
                *centroid = sum.into_iter().map(|s| s / count as f64).collect();
            }
        }
    }
}

/// k-means++：第一个质心均匀随机，之后按到最近质心距离的平方加权抽样
fn init_plus_plus<R: Rng + ?Sized>(data: &[Vec<f64>], k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    if data.is_empty() || k == 0 {
        return centroids;
    }
    centroids.push(data[rng.random_range(0..data.len())].clone());

    let mut nearest: Vec<f64> = data
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();
    while centroids.len() < k {
        let total: f64 = nearest.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = data.len() - 1;
            for (idx, weight) in nearest.iter().enumerate() {
                if target < *weight {
                    chosen = idx;
                    break;
                }
                target -= weight;
            }
            chosen
        } else {
            rng.random_range(0..data.len())
        };

        let centroid = data[chosen].clone();
        for (distance, point) in nearest.iter_mut().zip(data) {
            *distance = distance.min(squared_distance(point, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn separates_two_obvious_groups() {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![5.0, 5.0],
            vec![5.1, 5.0],
            vec![5.0, 5.1],
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let model = KMeans::fit(&data, 2, 100, &mut rng);

        let left = model.predict(&data[0]);
        let right = model.predict(&data[3]);
        assert_ne!(left, right);
        assert!(data[..3].iter().all(|p| model.predict(p) == left));
        assert!(data[3..].iter().all(|p| model.predict(p) == right));
    }

    #[test]
    fn identical_points_still_yield_k_centroids() {
        let data = vec![vec![1.0, 1.0]; 4];
        let mut rng = StdRng::seed_from_u64(1);
        let model = KMeans::fit(&data, 3, 10, &mut rng);
        assert_eq!(model.centroids.len(), 3);
        assert!(data.iter().all(|p| model.predict(p) == 0));
    }
}
