//! Coordinate system inference for CDM datasets.
//!
//! A [`CoordSysBuilder`] picks a [`Convention`] for a dataset, lets it
//! augment the dataset's attributes, classifies every variable's coordinate
//! role and then runs a fixed sequence of passes that turn those roles into
//! [`CoordinateAxis`], [`CoordinateSystem`] and [`CoordinateTransform`]
//! values. One-dimensional numeric axes carry a [`MonotonicAxisIndex`] for
//! position lookups.
//!
//! Problems that leave the result usable are recorded in [`Diagnostics`];
//! only read failures, augmentation failures, configuration errors and
//! cancellation abort a build.

pub mod axis;
pub mod builder;
pub mod cancel;
pub mod classify;
pub mod config;
pub mod convention;
pub mod diagnostics;
pub mod error;
pub mod index;
mod pipeline;
pub mod system;
pub mod transform;

pub use axis::{AxisType, CoordinateAxis, Positive};
pub use builder::{CoordSysBuilder, EnhancedDataset, VariableInfo};
pub use cancel::{CancelTask, NeverCancel};
pub use classify::{AxisRole, RoleFlags};
pub use config::EnhanceConfig;
pub use convention::{Convention, ConventionRegistry};
pub use diagnostics::{Diagnostics, Pass};
pub use error::{CoordSysError, CoordSysResult};
pub use index::{AxisCursor, AxisIndexError, MonotonicAxisIndex};
pub use system::CoordinateSystem;
pub use transform::{CoordTransBuilder, CoordTransBuilderRegistry, CoordinateTransform, TransformType};
