//! Row providers, feature selection, and the design that maps original
//! feature ids into the contiguous selected-feature space.
//!
//! The scoring and fitting code assumes sparse rows indexed by offset into
//! the design's feature selection: 0-based, contiguous, strictly increasing
//! within a row. [`RowSetMem`] enforces that invariant at construction, and
//! [`Design::project`] produces remapped row sets that satisfy it, so the
//! numeric core downstream never re-checks it.
use crate::regression::{
    core::sparse::{SparseEntry, SparseVector},
    errors::{RegressionError, RegressionResult},
};

/// Maps class indices to human-readable names for reporting.
pub trait NameResolver {
    fn n_classes(&self) -> usize;
    fn class_name(&self, k: usize) -> &str;
}

/// Supplies rows of (sparse feature vector, class label) for training and
/// testing.
///
/// Implementations guarantee that every row's feature indices are strictly
/// increasing and below `n_features()`, and that labels are below
/// `n_classes()`.
pub trait RowSet: NameResolver {
    fn n_rows(&self) -> usize;
    fn n_features(&self) -> usize;
    fn row(&self, i: usize) -> (&[SparseEntry], usize);
}

/// In-memory row set.
///
/// The canonical `RowSet` implementation: owns its rows, labels, and class
/// names, and validates the sparse-row invariants once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSetMem {
    rows: Vec<SparseVector>,
    labels: Vec<usize>,
    n_features: usize,
    class_names: Vec<String>,
}

impl RowSetMem {
    /// Construct a validated in-memory row set.
    ///
    /// # Errors
    /// - [`RegressionError::ClassLabelOutOfRange`] if a label is not below
    ///   the class count.
    /// - [`RegressionError::FeatureIndexOutOfRange`] if an entry references a
    ///   feature at or beyond `n_features`, or if a row's indices are not
    ///   strictly increasing (reported against the offending entry).
    pub fn new(
        rows: Vec<SparseVector>, labels: Vec<usize>, n_features: usize,
        class_names: Vec<String>,
    ) -> RegressionResult<Self> {
        assert_eq!(rows.len(), labels.len(), "one label per row");
        let classes = class_names.len();
        for (i, &label) in labels.iter().enumerate() {
            if label >= classes {
                return Err(RegressionError::ClassLabelOutOfRange { row: i, label, classes });
            }
        }
        for (i, row) in rows.iter().enumerate() {
            let mut prev: Option<usize> = None;
            for e in row {
                let monotone = prev.map_or(true, |p| e.var > p);
                if !monotone || e.var >= n_features {
                    return Err(RegressionError::FeatureIndexOutOfRange {
                        row: i,
                        feature: e.var,
                        features: n_features,
                    });
                }
                prev = Some(e.var);
            }
        }
        Ok(RowSetMem { rows, labels, n_features, class_names })
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }
}

impl NameResolver for RowSetMem {
    fn n_classes(&self) -> usize {
        self.class_names.len()
    }

    fn class_name(&self, k: usize) -> &str {
        &self.class_names[k]
    }
}

impl RowSet for RowSetMem {
    fn n_rows(&self) -> usize {
        self.rows.len()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn row(&self, i: usize) -> (&[SparseEntry], usize) {
        (&self.rows[i], self.labels[i])
    }
}

/// Design-construction configuration.
///
/// - `add_intercept`: append a constant feature as the **last** selected
///   index.
/// - `zero_unseen`: force coefficients of (feature, class) pairs never
///   observed together in training to zero via the fixed-parameter mask.
/// - `squeeze_to`: when set, shrink the trained model's active feature set
///   to this many features by repeated constrained re-fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesignParameter {
    pub add_intercept: bool,
    pub zero_unseen: bool,
    pub squeeze_to: Option<usize>,
}

impl DesignParameter {
    pub fn new(add_intercept: bool, zero_unseen: bool, squeeze_to: Option<usize>) -> Self {
        DesignParameter { add_intercept, zero_unseen, squeeze_to }
    }
}

impl Default for DesignParameter {
    fn default() -> Self {
        DesignParameter { add_intercept: true, zero_unseen: false, squeeze_to: None }
    }
}

/// The feature space a model is fitted in: which original features were
/// selected, in ascending order, plus the optional trailing intercept.
///
/// Selected indices are positions into `feat_select`; the intercept, when
/// present, occupies the final position and has no original id.
#[derive(Debug, Clone, PartialEq)]
pub struct Design {
    feat_select: Vec<usize>,
    add_intercept: bool,
}

impl Design {
    /// Build a design from training rows: select every original feature
    /// observed with a nonzero value, ascending.
    pub fn build(rows: &dyn RowSet, param: &DesignParameter) -> Design {
        let mut seen = vec![false; rows.n_features()];
        for i in 0..rows.n_rows() {
            let (entries, _) = rows.row(i);
            for e in entries {
                if e.value != 0.0 {
                    seen[e.var] = true;
                }
            }
        }
        let feat_select =
            seen.iter().enumerate().filter_map(|(j, &s)| s.then_some(j)).collect();
        Design { feat_select, add_intercept: param.add_intercept }
    }

    /// Reconstruct a design from a persisted selection list.
    pub fn from_selection(feat_select: Vec<usize>, add_intercept: bool) -> Design {
        Design { feat_select, add_intercept }
    }

    /// Original feature ids, ascending, excluding the intercept.
    pub fn feat_select(&self) -> &[usize] {
        &self.feat_select
    }

    /// Dimension of the selected-feature space (including the intercept).
    pub fn n_selected(&self) -> usize {
        self.feat_select.len() + usize::from(self.add_intercept)
    }

    /// Index of the intercept in the selected space, if one is configured.
    pub fn intercept_index(&self) -> Option<usize> {
        self.add_intercept.then_some(self.feat_select.len())
    }

    /// Remap a row set into the selected-feature space.
    ///
    /// Entries whose original feature was not selected are dropped; surviving
    /// entries keep their relative order (the selection is ascending, so the
    /// remapped indices are strictly increasing too); the intercept entry,
    /// when configured, is appended last with value 1.0.
    pub fn project(&self, rows: &dyn RowSet) -> RegressionResult<RowSetMem> {
        let mut out_rows = Vec::with_capacity(rows.n_rows());
        let mut labels = Vec::with_capacity(rows.n_rows());
        let class_names: Vec<String> =
            (0..rows.n_classes()).map(|k| rows.class_name(k).to_string()).collect();
        for i in 0..rows.n_rows() {
            let (entries, label) = rows.row(i);
            let mut row: SparseVector = Vec::with_capacity(entries.len() + 1);
            for e in entries {
                if let Ok(pos) = self.feat_select.binary_search(&e.var) {
                    row.push(SparseEntry::new(pos, e.value));
                }
            }
            if let Some(idx) = self.intercept_index() {
                row.push(SparseEntry::new(idx, 1.0));
            }
            out_rows.push(row);
            labels.push(label);
        }
        RowSetMem::new(out_rows, labels, self.n_selected(), class_names)
    }

    /// Zero-mask rows for the fixed-parameter table: `mask[j][k]` is true when
    /// selected feature `j` never occurs in a row of class `k`.
    ///
    /// The mask covers only non-intercept features; the intercept column is
    /// deliberately unaccounted for, which the mask's out-of-range convention
    /// treats as free.
    pub fn unseen_zero_mask(&self, projected: &RowSetMem) -> Vec<Vec<bool>> {
        let n_masked = self.feat_select.len();
        let classes = projected.n_classes();
        let mut mask = vec![vec![true; classes]; n_masked];
        for i in 0..projected.n_rows() {
            let (entries, label) = projected.row(i);
            for e in entries {
                if e.var < n_masked && e.value != 0.0 {
                    mask[e.var][label] = false;
                }
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|k| format!("class{k}")).collect()
    }

    fn sv(pairs: &[(usize, f64)]) -> SparseVector {
        pairs.iter().map(|&(var, value)| SparseEntry::new(var, value)).collect()
    }

    #[test]
    fn row_set_mem_rejects_bad_labels_and_non_monotone_rows() {
        let err =
            RowSetMem::new(vec![sv(&[(0, 1.0)])], vec![3], 4, names(2)).unwrap_err();
        assert_eq!(err, RegressionError::ClassLabelOutOfRange { row: 0, label: 3, classes: 2 });

        let unordered = vec![sv(&[(2, 1.0)]), sv(&[(3, 1.0), (1, 1.0)])];
        let err = RowSetMem::new(unordered, vec![0, 1], 4, names(2)).unwrap_err();
        assert_eq!(err, RegressionError::FeatureIndexOutOfRange { row: 1, feature: 1, features: 4 });
    }

    #[test]
    fn build_selects_observed_features_ascending() {
        let rows = RowSetMem::new(
            vec![sv(&[(5, 1.0)]), sv(&[(2, 1.0), (9, 1.0)])],
            vec![0, 1],
            10,
            names(2),
        )
        .unwrap();

        let design = Design::build(&rows, &DesignParameter::new(true, false, None));

        assert_eq!(design.feat_select(), &[2, 5, 9]);
        assert_eq!(design.n_selected(), 4);
        assert_eq!(design.intercept_index(), Some(3));
    }

    #[test]
    fn project_remaps_into_the_contiguous_space_and_appends_the_intercept() {
        let rows = RowSetMem::new(
            vec![sv(&[(5, 2.0)]), sv(&[(2, 1.0), (9, -1.0)])],
            vec![0, 1],
            10,
            names(2),
        )
        .unwrap();
        let design = Design::build(&rows, &DesignParameter::new(true, false, None));

        let projected = design.project(&rows).unwrap();

        assert_eq!(projected.n_features(), 4);
        let (r0, y0) = projected.row(0);
        assert_eq!(y0, 0);
        assert_eq!(r0, &[SparseEntry::new(1, 2.0), SparseEntry::new(3, 1.0)]);
        let (r1, _) = projected.row(1);
        assert_eq!(
            r1,
            &[SparseEntry::new(0, 1.0), SparseEntry::new(2, -1.0), SparseEntry::new(3, 1.0)]
        );
    }

    #[test]
    fn project_drops_features_outside_a_restored_selection() {
        let design = Design::from_selection(vec![2, 9], false);
        let rows = RowSetMem::new(vec![sv(&[(2, 1.0), (5, 4.0)])], vec![0], 10, names(1)).unwrap();

        let projected = design.project(&rows).unwrap();

        let (r0, _) = projected.row(0);
        assert_eq!(r0, &[SparseEntry::new(0, 1.0)]);
    }

    #[test]
    fn unseen_zero_mask_covers_only_non_intercept_features() {
        let rows = RowSetMem::new(
            vec![sv(&[(0, 1.0)]), sv(&[(1, 1.0)])],
            vec![0, 1],
            2,
            names(2),
        )
        .unwrap();
        let design = Design::build(&rows, &DesignParameter::new(true, true, None));
        let projected = design.project(&rows).unwrap();

        let mask = design.unseen_zero_mask(&projected);

        // Two masked features, no intercept row.
        assert_eq!(mask.len(), 2);
        // Feature 0 seen only in class 0; feature 1 only in class 1.
        assert_eq!(mask[0], vec![false, true]);
        assert_eq!(mask[1], vec![true, false]);
    }
}
