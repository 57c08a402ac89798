/// Piecewise cubic Hermite curve through `(xs, ys)` that never overshoots
/// between points: non-decreasing data gives a non-decreasing curve
/// (Fritsch-Carlson tangents).
#[derive(Debug, Clone, PartialEq)]
pub struct MonotoneCubic {
    xs: Vec<f64>,
    ys: Vec<f64>,
    tangents: Vec<f64>,
}

impl MonotoneCubic {
    /// `None` unless there are at least two points with strictly increasing x.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Option<Self> {
        if xs.len() < 2 || xs.len() != ys.len() || xs.windows(2).any(|pair| pair[1] <= pair[0]) {
            return None;
        }
        let n = xs.len();
        let secants: Vec<f64> = (0..n - 1)
            .map(|k| (ys[k + 1] - ys[k]) / (xs[k + 1] - xs[k]))
            .collect();

        let mut tangents = vec![0.0; n];
        tangents[0] = secants[0];
        tangents[n - 1] = secants[n - 2];
        for k in 1..n - 1 {
            tangents[k] = if secants[k - 1] * secants[k] <= 0.0 {
                0.0
            } else {
                (secants[k - 1] + secants[k]) / 2.0
            };
        }

        for k in 0..n - 1 {
            if secants[k] == 0.0 {
                tangents[k] = 0.0;
                tangents[k + 1] = 0.0;
                continue;
            }
            let alpha = tangents[k] / secants[k];
            let beta = tangents[k + 1] / secants[k];
            let magnitude = alpha * alpha + beta * beta;
            if magnitude > 9.0 {
                let tau = 3.0 / magnitude.sqrt();
                tangents[k] = tau * alpha * secants[k];
                tangents[k + 1] = tau * beta * secants[k];
            }
        }

        Some(Self { xs, ys, tangents })
    }

    /// Clamped to the first and last point outside the data range.
    pub fn value(&self, x: f64) -> f64 {
        let last = self.xs.len() - 1;
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[last] {
            return self.ys[last];
        }
        let k = self.xs.partition_point(|each| *each <= x) - 1;
        let h = self.xs[k + 1] - self.xs[k];
        let t = (x - self.xs[k]) / h;
        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;
        h00 * self.ys[k]
            + h10 * h * self.tangents[k]
            + h01 * self.ys[k + 1]
            + h11 * h * self.tangents[k + 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_points_are_linear() {
        let curve = MonotoneCubic::new(vec![0.0, 10.0], vec![0.0, 1.0]).unwrap();
        assert!((curve.value(5.0) - 0.5).abs() < 1e-9);
        assert_eq!(curve.value(-3.0), 0.0);
        assert_eq!(curve.value(12.0), 1.0);
    }

    #[test]
    fn never_decreases_for_increasing_data() {
        let curve =
            MonotoneCubic::new(vec![0.0, 2.0, 3.0, 10.0], vec![0.0, 0.1, 0.8, 1.0]).unwrap();
        let mut previous = curve.value(0.0);
        for step in 1..=100 {
            let current = curve.value(step as f64 / 10.0);
            assert!(current + 1e-12 >= previous);
            assert!(current <= 1.0 + 1e-12);
            previous = current;
        }
    }

    #[test]
    fn rejects_repeated_abscissas() {
        assert!(MonotoneCubic::new(vec![0.0, 0.0], vec![0.0, 1.0]).is_none());
        assert!(MonotoneCubic::new(vec![0.0], vec![0.0]).is_none());
    }
}
