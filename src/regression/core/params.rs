//! Coefficient storage for polytomous models.
//!
//! A parameter matrix holds one coefficient per (feature, class) pair, D
//! features by C classes. Storage is selected at construction time between
//! two variants behind the single [`ParamMatrix`] surface: a dense
//! class-major store (the default, used by training) and a sparse-row store
//! that skips zero coefficients (for models where most coefficients of rare
//! features are zero). Nothing outside this module matches on the variant;
//! scoring and training go through [`ParamMatrix::class_cursor`] and the
//! checked element accessors.
//!
//! Out-of-range access with feature index ≥ D or class index ≥ C always
//! fails with [`RegressionError::DimensionConflict`]; it is never clamped.
//!
//! The `Display` implementation emits the textual layout persisted model
//! files round-trip against: one header line `D C`, then one line per
//! feature index with all C coefficients for that feature in class order.
use crate::regression::{
    core::sparse::{DenseCursor, ParamCursor, SparseCursor, SparseEntry},
    errors::{RegressionError, RegressionResult},
};
use ndarray::Array1;

/// Dense class-major coefficient storage: `m[k][j]` is the coefficient of
/// feature `j` for class `k`.
///
/// Class-major layout keeps each class's coefficient vector contiguous, which
/// is what scoring consumes row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseStore {
    m: Vec<Vec<f64>>,
    d: usize,
    c: usize,
}

impl DenseStore {
    /// Allocate a `d x c` store with every entry set to `v`.
    pub fn new(d: usize, c: usize, v: f64) -> Self {
        DenseStore { m: vec![vec![v; d]; c], d, c }
    }

    /// Rebuild a store from the optimizer's flat class-major layout
    /// (`theta[k*d + j]`).
    ///
    /// Trailing entries beyond `d * c` are ignored; missing entries read as
    /// zero. Callers validate the length before fitting, so in practice the
    /// layout matches exactly.
    pub fn from_theta(d: usize, c: usize, theta: &Array1<f64>) -> Self {
        let mut store = DenseStore::new(d, c, 0.0);
        for k in 0..c {
            for j in 0..d {
                let idx = k * d + j;
                if idx < theta.len() {
                    store.m[k][j] = theta[idx];
                }
            }
        }
        store
    }

    /// Flatten into the optimizer's class-major layout.
    pub fn to_theta(&self) -> Array1<f64> {
        let mut theta = Array1::zeros(self.d * self.c);
        for k in 0..self.c {
            for j in 0..self.d {
                theta[k * self.d + j] = self.m[k][j];
            }
        }
        theta
    }

    /// Bulk read-only view of class `k`'s coefficients, indexed by feature.
    ///
    /// This is the hot-path accessor scoring uses to avoid per-element
    /// dispatch. Panics if `k >= c`; the public checked surface is on
    /// [`ParamMatrix`].
    pub fn class_params(&self, k: usize) -> &[f64] {
        &self.m[k]
    }

    fn at(&self, j: usize, k: usize) -> f64 {
        self.m[k][j]
    }

    fn at_mut(&mut self, j: usize, k: usize) -> &mut f64 {
        &mut self.m[k][j]
    }
}

/// Sparse-row coefficient storage: per class, an ordered list of
/// (feature, value) entries with zeros omitted.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseRowStore {
    rows: Vec<Vec<SparseEntry>>,
    d: usize,
    c: usize,
}

impl SparseRowStore {
    /// Allocate a `d x c` store with every entry zero (no stored entries).
    pub fn new(d: usize, c: usize) -> Self {
        SparseRowStore { rows: vec![Vec::new(); c], d, c }
    }

    /// Ordered entries of class `k`'s row. Panics if `k >= c`; the public
    /// checked surface is on [`ParamMatrix`].
    pub fn class_entries(&self, k: usize) -> &[SparseEntry] {
        &self.rows[k]
    }

    fn at(&self, j: usize, k: usize) -> f64 {
        match self.rows[k].binary_search_by_key(&j, |e| e.var) {
            Ok(pos) => self.rows[k][pos].value,
            Err(_) => 0.0,
        }
    }

    fn put(&mut self, j: usize, k: usize, v: f64) {
        match self.rows[k].binary_search_by_key(&j, |e| e.var) {
            Ok(pos) => {
                if v == 0.0 {
                    self.rows[k].remove(pos);
                } else {
                    self.rows[k][pos].value = v;
                }
            }
            Err(pos) => {
                if v != 0.0 {
                    self.rows[k].insert(pos, SparseEntry::new(j, v));
                }
            }
        }
    }
}

/// Cursor over one class's coefficients, independent of storage variant.
#[derive(Debug, Clone)]
pub enum RowCursor<'a> {
    Dense(DenseCursor<'a>),
    Sparse(SparseCursor<'a>),
}

impl ParamCursor for RowCursor<'_> {
    fn var(&self) -> usize {
        match self {
            RowCursor::Dense(c) => c.var(),
            RowCursor::Sparse(c) => c.var(),
        }
    }

    fn val(&self) -> f64 {
        match self {
            RowCursor::Dense(c) => c.val(),
            RowCursor::Sparse(c) => c.val(),
        }
    }

    fn advance(&mut self) {
        match self {
            RowCursor::Dense(c) => c.advance(),
            RowCursor::Sparse(c) => c.advance(),
        }
    }

    fn is_done(&self) -> bool {
        match self {
            RowCursor::Dense(c) => c.is_done(),
            RowCursor::Sparse(c) => c.is_done(),
        }
    }
}

/// A (features D x classes C) real-valued coefficient matrix.
///
/// The storage variant is chosen at construction ([`ParamMatrix::dense`] /
/// [`ParamMatrix::sparse_row`]) and is invisible to callers afterwards:
/// element access, row cursors, resizing, and the persisted text layout all
/// behave identically.
///
/// Owned exclusively by the training/restoration code that created it;
/// mutated element-wise during fitting; not shared across threads.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamMatrix {
    Dense(DenseStore),
    SparseRow(SparseRowStore),
}

impl ParamMatrix {
    /// Dense storage, every entry set to `v`.
    pub fn dense(d: usize, c: usize, v: f64) -> Self {
        ParamMatrix::Dense(DenseStore::new(d, c, v))
    }

    /// Sparse-row storage, every entry zero.
    pub fn sparse_row(d: usize, c: usize) -> Self {
        ParamMatrix::SparseRow(SparseRowStore::new(d, c))
    }

    /// Number of features (rows of the conceptual D x C matrix).
    pub fn d(&self) -> usize {
        match self {
            ParamMatrix::Dense(s) => s.d,
            ParamMatrix::SparseRow(s) => s.d,
        }
    }

    /// Number of classes.
    pub fn c(&self) -> usize {
        match self {
            ParamMatrix::Dense(s) => s.c,
            ParamMatrix::SparseRow(s) => s.c,
        }
    }

    fn check_bounds(&self, j: usize, k: usize) -> RegressionResult<()> {
        if j >= self.d() || k >= self.c() {
            return Err(RegressionError::DimensionConflict {
                feature: j,
                class: k,
                d: self.d(),
                c: self.c(),
            });
        }
        Ok(())
    }

    /// Read coefficient (feature `j`, class `k`).
    ///
    /// # Errors
    /// [`RegressionError::DimensionConflict`] if `j >= D` or `k >= C`.
    pub fn get(&self, j: usize, k: usize) -> RegressionResult<f64> {
        self.check_bounds(j, k)?;
        Ok(match self {
            ParamMatrix::Dense(s) => s.at(j, k),
            ParamMatrix::SparseRow(s) => s.at(j, k),
        })
    }

    /// Write coefficient (feature `j`, class `k`).
    ///
    /// # Errors
    /// [`RegressionError::DimensionConflict`] if `j >= D` or `k >= C`.
    pub fn set(&mut self, j: usize, k: usize, v: f64) -> RegressionResult<()> {
        self.check_bounds(j, k)?;
        match self {
            ParamMatrix::Dense(s) => *s.at_mut(j, k) = v,
            ParamMatrix::SparseRow(s) => s.put(j, k, v),
        }
        Ok(())
    }

    /// Ordered cursor over class `k`'s coefficients.
    ///
    /// # Errors
    /// [`RegressionError::DimensionConflict`] if `k >= C`.
    pub fn class_cursor(&self, k: usize) -> RegressionResult<RowCursor<'_>> {
        if k >= self.c() {
            return Err(RegressionError::DimensionConflict {
                feature: 0,
                class: k,
                d: self.d(),
                c: self.c(),
            });
        }
        Ok(match self {
            ParamMatrix::Dense(s) => RowCursor::Dense(DenseCursor::new(s.class_params(k))),
            ParamMatrix::SparseRow(s) => RowCursor::Sparse(SparseCursor::new(s.class_entries(k))),
        })
    }

    /// Reallocate to `d` features x `c` classes, filling every entry with `v`.
    ///
    /// This is the only resizing operation. A sparse-row store asked to fill
    /// with a nonzero `v` materializes every entry, which defeats its point
    /// but keeps the contract uniform.
    pub fn reset(&mut self, d: usize, c: usize, v: f64) {
        match self {
            ParamMatrix::Dense(s) => *s = DenseStore::new(d, c, v),
            ParamMatrix::SparseRow(s) => {
                *s = SparseRowStore::new(d, c);
                if v != 0.0 {
                    for k in 0..c {
                        for j in 0..d {
                            s.put(j, k, v);
                        }
                    }
                }
            }
        }
    }

    /// The dense store, if this matrix is dense. Training works on the dense
    /// variant and uses this to reach the bulk row view.
    pub fn as_dense(&self) -> Option<&DenseStore> {
        match self {
            ParamMatrix::Dense(s) => Some(s),
            ParamMatrix::SparseRow(_) => None,
        }
    }

    fn value_unchecked(&self, j: usize, k: usize) -> f64 {
        match self {
            ParamMatrix::Dense(s) => s.at(j, k),
            ParamMatrix::SparseRow(s) => s.at(j, k),
        }
    }
}

/// Textual layout of a parameter matrix: header line `D C`, then one line per
/// feature index with all C coefficients in class order. Persistence writes
/// and parses exactly this layout.
impl std::fmt::Display for ParamMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.d(), self.c())?;
        for j in 0..self.d() {
            write!(f, "\n{j}")?;
            for k in 0..self.c() {
                write!(f, " {}", self.value_unchecked(j, k))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::core::sparse::dot_sparse;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Write-then-read round trips and out-of-range rejection for both
    //   storage variants.
    // - `reset` semantics (dimensions and fill value).
    // - Cursor agreement between the dense and sparse-row variants.
    // - The persisted text layout.
    //
    // They intentionally DO NOT cover:
    // - Parsing of the text layout (covered by the persistence module).
    // -------------------------------------------------------------------------

    #[test]
    fn write_then_read_returns_the_written_value() {
        for mut m in [ParamMatrix::dense(3, 2, 0.0), ParamMatrix::sparse_row(3, 2)] {
            m.set(2, 1, -4.5).unwrap();
            assert_eq!(m.get(2, 1).unwrap(), -4.5);
            assert_eq!(m.get(0, 0).unwrap(), 0.0);
        }
    }

    #[test]
    fn out_of_range_access_fails_with_dimension_conflict() {
        let mut m = ParamMatrix::dense(3, 2, 0.0);

        let read_err = m.get(3, 0).unwrap_err();
        let write_err = m.set(0, 2, 1.0).unwrap_err();

        assert_eq!(
            read_err,
            RegressionError::DimensionConflict { feature: 3, class: 0, d: 3, c: 2 }
        );
        assert_eq!(
            write_err,
            RegressionError::DimensionConflict { feature: 0, class: 2, d: 3, c: 2 }
        );
    }

    #[test]
    fn reset_resizes_and_fills() {
        let mut m = ParamMatrix::dense(2, 2, 9.0);

        m.reset(4, 3, 0.5);

        assert_eq!(m.d(), 4);
        assert_eq!(m.c(), 3);
        for j in 0..4 {
            for k in 0..3 {
                assert_eq!(m.get(j, k).unwrap(), 0.5);
            }
        }
    }

    #[test]
    fn sparse_row_store_drops_explicit_zeros() {
        let mut m = ParamMatrix::sparse_row(4, 1);
        m.set(1, 0, 2.0).unwrap();
        m.set(1, 0, 0.0).unwrap();

        assert_eq!(m.get(1, 0).unwrap(), 0.0);
        match &m {
            ParamMatrix::SparseRow(s) => assert!(s.class_entries(0).is_empty()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn cursors_agree_across_storage_variants() {
        let mut dense = ParamMatrix::dense(5, 1, 0.0);
        let mut sparse = ParamMatrix::sparse_row(5, 1);
        for &(j, v) in &[(0usize, 0.5), (2, -0.5), (4, 2.0)] {
            dense.set(j, 0, v).unwrap();
            sparse.set(j, 0, v).unwrap();
        }
        let x = vec![SparseEntry::new(0, 1.0), SparseEntry::new(2, 1.0), SparseEntry::new(3, 7.0)];

        let via_dense = dot_sparse(&x, dense.class_cursor(0).unwrap());
        let via_sparse = dot_sparse(&x, sparse.class_cursor(0).unwrap());

        assert_eq!(via_dense, via_sparse);
        assert_eq!(via_dense, 0.0);
    }

    #[test]
    fn display_emits_the_persisted_layout() {
        let mut m = ParamMatrix::dense(3, 2, 0.0);
        m.set(0, 0, 0.5).unwrap();
        m.set(2, 1, -1.5).unwrap();

        assert_eq!(m.to_string(), "3 2\n0 0.5 0\n1 0 0\n2 0 -1.5");
    }

    #[test]
    fn theta_round_trip_preserves_the_class_major_layout() {
        let mut store = DenseStore::new(2, 3, 0.0);
        *store.at_mut(1, 2) = 4.0;
        *store.at_mut(0, 1) = -2.0;

        let theta = store.to_theta();
        let back = DenseStore::from_theta(2, 3, &theta);

        assert_eq!(back, store);
        // Class-major: theta[k*d + j].
        assert_eq!(theta[2 * 2 + 1], 4.0);
        assert_eq!(theta[1 * 2 + 0], -2.0);
    }
}
