//! Fixed-coefficient mask: which (feature, class) coefficients are pinned
//! during fitting.
//!
//! Two mechanisms can fix a coefficient to zero: an explicit per-(feature,
//! class) zero-mask, and a designated reference class whose entire
//! coefficient column is fixed to resolve the identifiability redundancy of
//! multinomial models. Both are supplied at construction; the type has no
//! setters and must be treated as immutable afterwards, because
//! [`FixedParams::count`] memoizes its first result and never invalidates it.
//!
//! The zero-mask is jagged: rows may have different lengths, and indices
//! outside a row's bound are treated as *not fixed*. That convention lets the
//! mask omit an always-free intercept column implicitly.
use std::cell::Cell;

/// Boolean constraint mask over (feature, class) coefficient pairs.
///
/// Interior mutability is limited to the memoized count, which makes the type
/// `!Sync`: first use of [`FixedParams::count`] from multiple threads would
/// race. Warm the cache single-threaded (or call `count` eagerly) before
/// sharing read-only.
#[derive(Debug, Clone)]
pub struct FixedParams {
    allzeroes: Vec<Vec<bool>>,
    reference_class: Option<usize>,
    nfixed: Cell<Option<usize>>,
}

impl FixedParams {
    /// Construct a mask from a jagged zero table and an optional reference
    /// class id.
    pub fn new(allzeroes: Vec<Vec<bool>>, reference_class: Option<usize>) -> Self {
        FixedParams { allzeroes, reference_class, nfixed: Cell::new(None) }
    }

    /// A mask that fixes nothing.
    pub fn none() -> Self {
        FixedParams::new(Vec::new(), None)
    }

    /// Whether the explicit zero-mask mechanism is active.
    pub fn zero_mask_active(&self) -> bool {
        !self.allzeroes.is_empty()
    }

    /// Whether coefficient (feature `j`, class `k`) is fixed.
    ///
    /// Evaluation order, preserved exactly:
    /// 1. neither mechanism active: nothing is fixed;
    /// 2. `k` equals the configured reference class id: fixed;
    /// 3. `j` outside the zero-mask rows: not fixed (this is what lets an
    ///    intercept column go unaccounted for);
    /// 4. `k` outside row `j`'s bound: not fixed;
    /// 5. otherwise the stored boolean.
    pub fn is_fixed(&self, j: usize, k: usize) -> bool {
        if !self.zero_mask_active() && self.reference_class.is_none() {
            return false;
        }
        // Deliberately the configured id, not the last class index; an
        // earlier revision of this rule compared against the last index.
        if self.reference_class == Some(k) {
            return true;
        }
        if j >= self.allzeroes.len() {
            return false;
        }
        if k >= self.allzeroes[j].len() {
            return false;
        }
        self.allzeroes[j][k]
    }

    /// The configured reference class id, for callers that special-case the
    /// reference class (e.g., excluding it from reporting).
    pub fn ref_class_id(&self) -> Option<usize> {
        self.reference_class
    }

    /// Total number of fixed coefficients within the zero-mask's bounds.
    ///
    /// Lazily computed on first call and cached for the lifetime of the
    /// instance; the cache is one-way and never invalidated. The scan covers
    /// the jagged mask's own dimensions, consulting [`FixedParams::is_fixed`]
    /// so reference-class entries inside those bounds are included.
    pub fn count(&self) -> usize {
        if let Some(n) = self.nfixed.get() {
            return n;
        }
        let mut n = 0;
        if self.zero_mask_active() || self.reference_class.is_some() {
            for j in 0..self.allzeroes.len() {
                for k in 0..self.allzeroes[j].len() {
                    if self.is_fixed(j, k) {
                        n += 1;
                    }
                }
            }
        }
        self.nfixed.set(Some(n));
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The evaluation order of `is_fixed`, including the id-based reference
    //   class rule and the out-of-range-means-free convention.
    // - The memoize-once contract of `count`.
    //
    // They intentionally DO NOT cover:
    // - How masks are built from training data (covered by the design module).
    // -------------------------------------------------------------------------

    #[test]
    fn nothing_fixed_when_no_mechanism_is_active() {
        let fp = FixedParams::none();
        assert!(!fp.is_fixed(0, 0));
        assert!(!fp.is_fixed(100, 100));
        assert_eq!(fp.count(), 0);
    }

    #[test]
    fn reference_class_fixes_its_whole_column_by_configured_id() {
        // Reference class 2; mask says nothing about class 2.
        let fp = FixedParams::new(vec![vec![false, false, false]; 4], Some(2));

        for j in 0..10 {
            assert!(fp.is_fixed(j, 2), "feature {j} of the reference class must be fixed");
        }
        assert!(!fp.is_fixed(0, 1));
        // Not an is-last-class rule: with 3 classes and reference id 2 they
        // coincide, so pin the id somewhere else and recheck.
        let fp = FixedParams::new(vec![vec![false, false, false]; 4], Some(0));
        assert!(fp.is_fixed(3, 0));
        assert!(!fp.is_fixed(3, 2));
    }

    #[test]
    fn out_of_range_mask_indices_are_not_fixed() {
        // Jagged mask: feature 1's row is shorter, and there is no row for
        // the intercept-like feature 2.
        let fp = FixedParams::new(vec![vec![true, false], vec![true]], None);

        assert!(fp.is_fixed(0, 0));
        assert!(!fp.is_fixed(0, 1));
        assert!(fp.is_fixed(1, 0));
        assert!(!fp.is_fixed(1, 1), "class beyond the jagged row bound is free");
        assert!(!fp.is_fixed(2, 0), "feature beyond the mask is free");
    }

    #[test]
    fn count_scans_the_mask_through_the_reference_rule() {
        let fp = FixedParams::new(vec![vec![false, true], vec![false, false]], Some(0));

        // Class 0 entries are fixed by the reference rule, plus the one
        // explicit true: (0,0), (1,0), (0,1).
        assert_eq!(fp.count(), 3);
    }

    #[test]
    fn count_is_memoized_once() {
        let fp = FixedParams::new(vec![vec![true, false]], None);

        let first = fp.count();
        let second = fp.count();

        assert_eq!(first, 1);
        assert_eq!(second, first);
        assert_eq!(fp.nfixed.get(), Some(first));
    }
}
