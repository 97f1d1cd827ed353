//! High-level entry point for maximizing a user-provided `PosteriorDensity`.
//!
//! This selects an L-BFGS solver with either Hager-Zhang or More-Thuente line
//! search, wraps the objective in an `ArgMinAdapter` (which *minimizes*
//! `-ℓ(θ)`), and delegates the run to `run_lbfgs`.
use crate::optimization::{
    errors::OptResult,
    map_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, MapOptions, PosteriorDensity},
    },
};

/// Maximize a penalized log-likelihood `ℓ(θ)` using L-BFGS with the chosen
/// line search.
///
/// # Behavior
/// - Validates the initial guess via `f.check(theta0, data)`.
/// - Wraps `(f, data)` in an `ArgMinAdapter` that exposes a *minimization*
///   problem `c(θ) = -ℓ(θ)` to `argmin`.
/// - Builds an L-BFGS solver with either **Hager-Zhang** or **More-Thuente**
///   line search based on `opts.line_searcher`.
/// - Calls `run_lbfgs`, which configures the executor (initial params,
///   max iters, optional observers) and returns an `OptimOutcome`.
///
/// # Parameters
/// - `f`: Your objective implementing [`PosteriorDensity`].
/// - `theta0`: Initial parameter vector (consumed).
/// - `data`: Objective data passed through to `value`/`grad`.
/// - `opts`: Optimizer options (tolerances, line search choice, verbosity, etc.).
///
/// # Errors
/// - Propagates any error from `f.check`.
/// - Propagates builder errors from `build_optimizer_*`.
/// - Propagates runtime errors from `run_lbfgs` (e.g., line search failures).
///
/// # Returns
/// An [`OptimOutcome`] containing `theta_hat`, best value `ℓ(θ̂)`,
/// termination status, iteration counts, function evaluation counts, and
/// optionally the gradient norm.
pub fn maximize<F: PosteriorDensity>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MapOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::OptResult as Res,
        map_optimizer::{Cost, Grad, Tolerances},
    };
    use ndarray::array;

    // A strictly concave toy objective with a known maximizer:
    // ℓ(θ) = -(θ - t)·(θ - t), maximized at θ = t.
    struct Shifted {
        target: Theta,
    }

    impl PosteriorDensity for Shifted {
        type Data = ();

        fn value(&self, theta: &Theta, _data: &()) -> Res<Cost> {
            let diff = theta - &self.target;
            Ok(-diff.dot(&diff))
        }

        fn check(&self, _theta: &Theta, _data: &()) -> Res<()> {
            Ok(())
        }

        fn grad(&self, theta: &Theta, _data: &()) -> Res<Grad> {
            Ok((theta - &self.target) * -2.0)
        }
    }

    #[test]
    fn maximize_recovers_the_known_optimum() {
        // Arrange
        let f = Shifted { target: array![1.5, -2.0, 0.25] };
        let tols = Tolerances::new(Some(1e-10), None, Some(100)).unwrap();
        let opts = MapOptions::new(tols, LineSearcher::MoreThuente, false, None).unwrap();

        // Act
        let out = maximize(&f, array![0.0, 0.0, 0.0], &(), &opts).unwrap();

        // Assert
        for (got, want) in out.theta_hat.iter().zip(f.target.iter()) {
            assert!((got - want).abs() < 1e-5, "theta_hat {got} should be near {want}");
        }
        assert!(out.value > -1e-8, "objective at the optimum should be near zero");
    }
}
