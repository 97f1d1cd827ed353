//! Core building blocks of the regression stack: coefficient storage, the
//! fixed-coefficient mask, sparse rows and scoring primitives, and the
//! configuration value objects consumed by training.
//!
//! Everything here is synchronous, CPU-bound, and single-threaded; the only
//! interior mutability is the memoized count inside [`fixed::FixedParams`],
//! which makes that type `!Sync` until its cache is warmed.

pub mod design;
pub mod fixed;
pub mod model_type;
pub mod params;
pub mod prior;
pub mod sparse;

pub use self::design::{Design, DesignParameter, NameResolver, RowSet, RowSetMem};
pub use self::fixed::FixedParams;
pub use self::model_type::{Link, ModelType, ResultFormat, ThresholdCriterion};
pub use self::params::{DenseStore, ParamMatrix, RowCursor, SparseRowStore};
pub use self::prior::{BayesParameter, HyperParamPlan, PriorShape, PriorTerm, PriorTermsByTopic};
pub use self::sparse::{
    DenseCursor, ParamCursor, SparseCursor, SparseEntry, SparseVector, dot_sparse,
    dot_sparse_by_dense,
};
