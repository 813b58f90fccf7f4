//! Derivative-free minimization (Nelder–Mead downhill simplex).

/// Stopping rules for [`minimize`].
#[derive(Debug, Clone, Copy)]
pub struct NelderMead {
    /// Maximum number of simplex iterations.
    pub max_iterations: usize,
    /// Stop once the spread of objective values across the simplex falls
    /// below this (relative to the best value).
    pub tolerance: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tolerance: 1e-10,
        }
    }
}

/// Outcome of a minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Best point found.
    pub point: Vec<f64>,
    /// Objective value at `point`.
    pub value: f64,
    /// Iterations used.
    pub iterations: usize,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimizes `objective` starting from `start`.
///
/// The initial simplex offsets each coordinate by the matching entry of
/// `steps`. Non-finite objective values are treated as `+inf`, so the
/// simplex moves away from them. With an empty `start` the objective is
/// evaluated once and returned.
pub fn minimize<F>(objective: F, start: &[f64], steps: &[f64], options: NelderMead) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() { v } else { f64::INFINITY }
    };

    let n = start.len();
    if n == 0 {
        return Minimum {
            point: Vec::new(),
            value: eval(start),
            iterations: 0,
        };
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(start.to_vec());
    for i in 0..n {
        let mut vertex = start.to_vec();
        vertex[i] += steps.get(i).copied().unwrap_or(0.1);
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    let mut iterations = 0;
    while iterations < options.max_iterations {
        iterations += 1;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let best = values[0];
        let worst = values[n];
        if (worst - best).abs() <= options.tolerance.mul_add(best.abs(), options.tolerance) {
            break;
        }

        #[allow(clippy::cast_precision_loss)]
        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|v| v[j]).sum::<f64>() / n as f64)
            .collect();
        let along = |coefficient: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&simplex[n])
                .map(|(c, w)| coefficient.mul_add(c - w, *c))
                .collect()
        };

        let reflected = along(REFLECTION);
        let reflected_value = eval(&reflected);

        if reflected_value < values[0] {
            let expanded = along(EXPANSION);
            let expanded_value = eval(&expanded);
            if expanded_value < reflected_value {
                simplex[n] = expanded;
                values[n] = expanded_value;
            } else {
                simplex[n] = reflected;
                values[n] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[n - 1] {
            simplex[n] = reflected;
            values[n] = reflected_value;
            continue;
        }

        let (contracted, contracted_value) = if reflected_value < values[n] {
            let outside = along(CONTRACTION * REFLECTION);
            let value = eval(&outside);
            (outside, value)
        } else {
            let inside = along(-CONTRACTION);
            let value = eval(&inside);
            (inside, value)
        };

        if contracted_value < values[n].min(reflected_value) {
            simplex[n] = contracted;
            values[n] = contracted_value;
            continue;
        }

        let best_vertex = simplex[0].clone();
        for i in 1..=n {
            for (x, b) in simplex[i].iter_mut().zip(&best_vertex) {
                *x = SHRINK.mul_add(*x - b, *b);
            }
            values[i] = eval(&simplex[i]);
        }
    }

    let (best, value) = simplex
        .into_iter()
        .zip(values)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or_else(|| (start.to_vec(), f64::INFINITY));

    Minimum {
        point: best,
        value,
        iterations,
    }
}
