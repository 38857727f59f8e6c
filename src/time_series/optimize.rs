//! Derivative-free minimisation used for ARMA parameter estimation

/// Nelder-Mead settings
#[derive(Debug, Clone)]
pub struct NelderMeadOptions {
    /// Iteration budget
    pub max_iterations: usize,
    /// Relative spread of simplex values at which the search stops
    pub f_tolerance: f64,
    /// Edge length of the initial simplex
    pub initial_step: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        NelderMeadOptions {
            max_iterations: 2000,
            f_tolerance: 1e-10,
            initial_step: 0.5,
        }
    }
}

/// Outcome of a minimisation
#[derive(Debug, Clone)]
pub struct Minimum {
    /// Best point found
    pub x: Vec<f64>,
    /// Objective at `x`
    pub value: f64,
    /// Iterations used
    pub iterations: usize,
    /// Whether the tolerance was reached within the budget
    pub converged: bool,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimise `f` starting from `x0` with the Nelder-Mead simplex method.
///
/// Non-finite objective values are treated as `+inf`.
pub fn nelder_mead<F>(f: F, x0: &[f64], options: &NelderMeadOptions) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let eval = |x: &[f64]| {
        let v = f(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    let n = x0.len();
    if n == 0 {
        return Minimum {
            x: Vec::new(),
            value: eval(x0),
            iterations: 0,
            converged: true,
        };
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    for i in 0..n {
        let mut vertex = x0.to_vec();
        vertex[i] += options.initial_step;
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        // Order vertices best to worst
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| {
            values[a]
                .partial_cmp(&values[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let best = values[0];
        let worst = values[n];
        if best.is_finite() && worst.is_finite() {
            let spread = 2.0 * (worst - best).abs() / (worst.abs() + best.abs() + 1e-300);
            if spread <= options.f_tolerance || (worst - best).abs() <= f64::EPSILON {
                converged = true;
                break;
            }
        }

        iterations += 1;

        // Centroid of all but the worst vertex
        let mut centroid = vec![0.0; n];
        for vertex in simplex.iter().take(n) {
            for (c, v) in centroid.iter_mut().zip(vertex) {
                *c += v / n as f64;
            }
        }

        let towards = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&simplex[n])
                .map(|(c, w)| c + coef * (w - c))
                .collect()
        };

        let reflected = towards(-REFLECTION);
        let f_reflected = eval(&reflected);

        if f_reflected < values[0] {
            let expanded = towards(-EXPANSION);
            let f_expanded = eval(&expanded);
            if f_expanded < f_reflected {
                simplex[n] = expanded;
                values[n] = f_expanded;
            } else {
                simplex[n] = reflected;
                values[n] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[n - 1] {
            simplex[n] = reflected;
            values[n] = f_reflected;
            continue;
        }

        // Contract towards the better of the worst and reflected points
        let (contracted, f_contracted) = if f_reflected < values[n] {
            let outside = towards(-REFLECTION * CONTRACTION);
            let f_outside = eval(&outside);
            (outside, f_outside)
        } else {
            let inside = towards(CONTRACTION);
            let f_inside = eval(&inside);
            (inside, f_inside)
        };

        if f_contracted < values[n].min(f_reflected) {
            simplex[n] = contracted;
            values[n] = f_contracted;
            continue;
        }

        // Shrink everything towards the best vertex
        let best_vertex = simplex[0].clone();
        for i in 1..=n {
            for (x, b) in simplex[i].iter_mut().zip(&best_vertex) {
                *x = b + SHRINK * (*x - b);
            }
            values[i] = eval(&simplex[i]);
        }
    }

    let best_idx = values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    Minimum {
        x: simplex[best_idx].clone(),
        value: values[best_idx],
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_minimum() {
        let f = |x: &[f64]| (x[0] - 1.0).powi(2) + 2.0 * (x[1] + 0.5).powi(2) + 3.0;
        let result = nelder_mead(f, &[0.0, 0.0], &NelderMeadOptions::default());
        assert!(result.converged);
        assert!((result.x[0] - 1.0).abs() < 1e-3);
        assert!((result.x[1] + 0.5).abs() < 1e-3);
        assert!((result.value - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_rosenbrock() {
        let f = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2) + 1.0;
        let options = NelderMeadOptions {
            max_iterations: 5000,
            ..Default::default()
        };
        let result = nelder_mead(f, &[-1.2, 1.0], &options);
        assert!(result.converged);
        assert!((result.x[0] - 1.0).abs() < 1e-2);
        assert!((result.x[1] - 1.0).abs() < 2e-2);
    }

    #[test]
    fn test_budget_exhaustion_is_reported() {
        let f = |x: &[f64]| (x[0] - 100.0).powi(2) + 1.0;
        let options = NelderMeadOptions {
            max_iterations: 3,
            ..Default::default()
        };
        let result = nelder_mead(f, &[0.0], &options);
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn test_non_finite_region_is_avoided() {
        let f = |x: &[f64]| {
            if x[0] < 0.0 {
                f64::NAN
            } else {
                (x[0] - 2.0).powi(2) + 1.0
            }
        };
        let result = nelder_mead(f, &[1.0], &NelderMeadOptions::default());
        assert!(result.converged);
        assert!((result.x[0] - 2.0).abs() < 1e-3);
    }
}
