//! # Linen Ops
//!
//! Umbrella crate for the linen operations forecasting workspace.
//!
//! - [`demand_math`]: numeric helpers (descriptive statistics, outlier fences,
//!   recency weighting, trend fitting)
//! - [`linen_forecast`]: the forecasting pipeline built on top of them
//!
//! ## Example
//!
//! ```
//! use linen_ops_workspace::demand_math::OutlierSplit;
//!
//! let split = OutlierSplit::detect(&[10.0, 10.0, 10.0, 10.0, 200.0], 5);
//! assert_eq!(split.outlier_count(), 1);
//! ```

pub use demand_math;
pub use linen_forecast;
