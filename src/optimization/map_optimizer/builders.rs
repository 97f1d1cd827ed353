//! L-BFGS solver construction helpers.
//!
//! These builders hide Argmin's generic wiring and apply crate-level options
//! (tolerances, memory size) so that higher-level code can request a
//! configured solver without touching Argmin-specific types. The initial
//! parameter vector and maximum iteration count are runtime concerns handled
//! by the runner layer, not here.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    map_optimizer::{
        traits::MapOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};

/// Construct L-BFGS with the Hager-Zhang line search.
///
/// Consults `opts.lbfgs_mem` (falling back to [`DEFAULT_LBFGS_MEM`]) and wires
/// the optional gradient / cost-change tolerances from `opts.tols`.
///
/// # Errors
/// Returns an `OptError` (via `From<argmin::core::Error>`) if Argmin rejects a
/// tolerance setting.
pub fn build_optimizer_hager_zhang(opts: &MapOptions) -> OptResult<LbfgsHagerZhang> {
    let hager_zhang = HagerZhangLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsHagerZhang::new(hager_zhang, mem);
    configure_lbfgs(lbfgs, opts)
}

/// Construct L-BFGS with the More-Thuente line search.
///
/// Consults `opts.lbfgs_mem` (falling back to [`DEFAULT_LBFGS_MEM`]) and wires
/// the optional gradient / cost-change tolerances from `opts.tols`.
///
/// # Errors
/// Returns an `OptError` (via `From<argmin::core::Error>`) if Argmin rejects a
/// tolerance setting.
pub fn build_optimizer_more_thuente(opts: &MapOptions) -> OptResult<LbfgsMoreThuente> {
    let more_thuente = MoreThuenteLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsMoreThuente::new(more_thuente, mem);
    configure_lbfgs(lbfgs, opts)
}

/// Apply optional tolerances to an L-BFGS solver.
///
/// When a tolerance is `None`, the corresponding `with_tolerance_*` method is
/// not called and Argmin's defaults remain in effect. The generics are kept
/// minimal (`L` only) so new line-search types can reuse this function.
///
/// # Errors
/// Returns an `OptError` if `with_tolerance_grad` or `with_tolerance_cost`
/// rejects a value.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MapOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::map_optimizer::traits::{LineSearcher, MapOptions, Tolerances};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Basic construction of L-BFGS solvers with Hager-Zhang and
    //   More-Thuente line searches.
    // - Propagation of `lbfgs_mem` (Some vs None) into the builder paths.
    //
    // They intentionally DO NOT cover:
    // - End-to-end executor behavior (e.g., `run_lbfgs`), which is tested
    //   in the optimizer runner layer.
    // -------------------------------------------------------------------------

    #[test]
    fn build_optimizer_hager_zhang_uses_default_memory_when_none() {
        // Arrange
        let tols =
            Tolerances::new(Some(1e-6), Some(1e-8), Some(50)).expect("Tolerances should be valid");
        let opts = MapOptions::new(tols, LineSearcher::HagerZhang, false, None)
            .expect("MapOptions should be valid");

        // Act
        let solver = build_optimizer_hager_zhang(&opts);

        // Assert
        assert!(
            solver.is_ok(),
            "Builder should succeed when lbfgs_mem is None and tolerances are valid"
        );
    }

    #[test]
    fn build_optimizer_more_thuente_accepts_explicit_memory() {
        // Arrange
        let tols = Tolerances::new(Some(1e-6), None, Some(50)).expect("Tolerances should be valid");
        let opts = MapOptions::new(tols, LineSearcher::MoreThuente, false, Some(3))
            .expect("MapOptions should be valid");

        // Act
        let solver = build_optimizer_more_thuente(&opts);

        // Assert
        assert!(solver.is_ok(), "Builder should succeed with an explicit lbfgs_mem");
    }
}
