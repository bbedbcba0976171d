//! Conventions and the convention registry.
//!
//! A [`Convention`] is a named rule-set: it may claim a dataset through
//! `is_mine`, rewrite it before classification through `augment`, and guess
//! axis types for axes that carry no explicit `_CoordinateAxisType`.
//!
//! Dispatch order when building a dataset:
//!
//! 1. exact match of the `Conventions` (or `Convention`) global attribute
//!    against a registered name;
//! 2. the attribute split on `,`/`;` (or `/` when neither occurs), the first
//!    registered convention, in registry order, whose name appears in the
//!    list;
//! 3. the first convention whose `is_mine` returns true;
//! 4. the default convention, with an advisory. Unless an exact or listed
//!    name matched, the advisory also notes the unrecognized (or missing)
//!    `Conventions` attribute.

pub mod cf;
pub mod coards;
pub mod coordinates;
pub mod cosmic;
pub mod gdv;
pub mod m3io;
pub mod nuwg;
pub mod wrf;

pub(crate) mod synth;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cdm_common::{Dataset, Variable};

use crate::axis::{AxisType, Positive};
use crate::cancel::CancelTask;
use crate::classify::attrs;
use crate::diagnostics::{Diagnostics, Pass};
use crate::error::CoordSysResult;

pub use cf::CfConvention;
pub use coards::CoardsConvention;
pub use coordinates::CoordinatesConvention;
pub use cosmic::Cosmic1Convention;
pub use gdv::GdvConvention;
pub use m3io::M3ioConvention;
pub use nuwg::NuwgConvention;
pub use wrf::WrfConvention;

/// A named set of dataset-specific coordinate rules.
pub trait Convention: Send + Sync {
    fn name(&self) -> &str;

    /// Claim a dataset whose convention attribute did not match.
    fn is_mine(&self, _dataset: &Dataset) -> bool {
        false
    }

    /// Rewrite the dataset before classification.
    ///
    /// An error aborts the build.
    fn augment(
        &self,
        _dataset: &mut Dataset,
        _cancel: &dyn CancelTask,
        _diag: &mut Diagnostics,
    ) -> CoordSysResult<()> {
        Ok(())
    }

    /// Axis type of an axis without `_CoordinateAxisType`.
    fn axis_type(&self, _dataset: &Dataset, _var: &Variable) -> Option<AxisType> {
        None
    }

    /// Positive direction of a vertical axis.
    fn positive(&self, var: &Variable, axis_type: AxisType) -> Option<Positive> {
        default_positive(var, axis_type)
    }
}

/// `_CoordinateZisPositive`, then `positive`; vertical axes only.
/// Pressure axes without either attribute point down.
pub fn default_positive(var: &Variable, axis_type: AxisType) -> Option<Positive> {
    if !axis_type.is_vertical() {
        return None;
    }
    var.attribute_string(attrs::Z_IS_POSITIVE)
        .or_else(|| var.attribute_string(attrs::POSITIVE))
        .and_then(Positive::parse)
        .or((axis_type == AxisType::Pressure).then_some(Positive::Down))
}

/// Global attribute naming the dataset's convention.
pub fn convention_attribute(dataset: &Dataset) -> Option<&str> {
    ["Conventions", "Convention"].iter().find_map(|name| {
        dataset
            .find_global_attribute(name)
            .and_then(|a| a.string_value())
            .map(str::trim)
    })
}

/// Split a convention attribute into its listed names.
pub fn split_convention_names(value: &str) -> Vec<&str> {
    let parts: Vec<&str> = if value.contains(',') || value.contains(';') {
        value.split([',', ';']).collect()
    } else {
        value.split('/').collect()
    };
    parts
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Ordered conventions with an exact-name index and a default.
#[derive(Clone)]
pub struct ConventionRegistry {
    entries: Vec<Arc<dyn Convention>>,
    by_name: HashMap<String, Arc<dyn Convention>>,
    default: Arc<dyn Convention>,
}

impl fmt::Debug for ConventionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConventionRegistry")
            .field("entries", &self.names())
            .field("default", &self.default.name())
            .finish()
    }
}

impl Default for ConventionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ConventionRegistry {
    /// A registry with no entries; every dataset falls back to `default`.
    pub fn empty(default: Arc<dyn Convention>) -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            default,
        }
    }

    /// The built-in conventions, GDV as default:
    /// `_Coordinates`, `CF-1.0`, `COARDS`, `GDV`, `NUWG`, `WRF`,
    /// `M3IOVGGrid`, `Cosmic1`.
    pub fn with_builtins() -> Self {
        let gdv: Arc<dyn Convention> = Arc::new(GdvConvention);
        let mut registry = Self::empty(gdv.clone());
        registry.append(Arc::new(CoordinatesConvention));
        registry.append(Arc::new(CfConvention));
        registry.append(Arc::new(CoardsConvention));
        registry.append(gdv);
        registry.append(Arc::new(NuwgConvention));
        registry.append(Arc::new(WrfConvention));
        registry.append(Arc::new(M3ioConvention));
        registry.append(Arc::new(Cosmic1Convention));
        registry
    }

    fn append(&mut self, convention: Arc<dyn Convention>) {
        self.by_name
            .insert(convention.name().to_string(), convention.clone());
        self.entries.push(convention);
    }

    /// Register a user convention. It is consulted before every existing
    /// entry and replaces any entry of the same name for exact matches.
    pub fn register(&mut self, convention: Arc<dyn Convention>) {
        self.by_name
            .insert(convention.name().to_string(), convention.clone());
        self.entries.insert(0, convention);
    }

    /// Registered names in dispatch order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|c| c.name()).collect()
    }

    pub fn find(&self, name: &str) -> Option<&Arc<dyn Convention>> {
        self.by_name.get(name)
    }

    pub fn default_convention(&self) -> &Arc<dyn Convention> {
        &self.default
    }

    /// Pick the convention for a dataset.
    pub fn select(&self, dataset: &Dataset, diag: &mut Diagnostics) -> Arc<dyn Convention> {
        let attribute = convention_attribute(dataset);

        if let Some(value) = attribute {
            if let Some(conv) = self.find(value) {
                diag.trace(Pass::Convention, format!("Using convention {}", conv.name()));
                return conv.clone();
            }

            let listed = split_convention_names(value);
            for conv in &self.entries {
                if listed.iter().any(|n| n.eq_ignore_ascii_case(conv.name())) {
                    diag.trace(
                        Pass::Convention,
                        format!("Using convention {} from list '{}'", conv.name(), value),
                    );
                    return conv.clone();
                }
            }
        }

        for conv in &self.entries {
            if conv.is_mine(dataset) {
                diag.trace(
                    Pass::Convention,
                    format!("Using convention {} (is_mine)", conv.name()),
                );
                return conv.clone();
            }
        }

        diag.advise(Pass::Convention, "No 'Convention' global attribute");
        diag.advise(
            Pass::Convention,
            format!(
                "No CoordSysBuilder found - using default ({})",
                self.default.name()
            ),
        );
        self.default.clone()
    }
}
