//! Coordinate system builder and the enhanced dataset it produces.

use std::sync::Arc;

use cdm_common::Dataset;
use cdm_enhance::DecodePolicy;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::axis::CoordinateAxis;
use crate::cancel::{self, CancelTask};
use crate::classify::{classify_dataset, AxisRole};
use crate::config::EnhanceConfig;
use crate::convention::ConventionRegistry;
use crate::diagnostics::Diagnostics;
use crate::error::{CoordSysError, CoordSysResult};
use crate::pipeline::{self, BuildContext, PassState};
use crate::system::CoordinateSystem;
use crate::transform::{CoordTransBuilderRegistry, CoordinateTransform};

/// Builds coordinate systems for datasets.
///
/// The registries are shared, immutable snapshots, so one builder can be
/// used from many threads at once.
///
/// # Example
///
/// ```rust,ignore
/// let builder = CoordSysBuilder::new(EnhanceConfig::from_env());
/// let enhanced = builder.build(dataset, &NeverCancel)?;
/// for cs in enhanced.systems_for("temperature") {
///     println!("{}", cs.name());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CoordSysBuilder {
    conventions: Arc<ConventionRegistry>,
    transforms: Arc<CoordTransBuilderRegistry>,
    config: EnhanceConfig,
}

impl Default for CoordSysBuilder {
    fn default() -> Self {
        Self::new(EnhanceConfig::default())
    }
}

impl CoordSysBuilder {
    /// A builder with the built-in conventions and transform builders.
    pub fn new(config: EnhanceConfig) -> Self {
        Self::with_registries(
            Arc::new(ConventionRegistry::with_builtins()),
            Arc::new(CoordTransBuilderRegistry::with_builtins()),
            config,
        )
    }

    /// A builder over caller-supplied registries.
    pub fn with_registries(
        conventions: Arc<ConventionRegistry>,
        transforms: Arc<CoordTransBuilderRegistry>,
        config: EnhanceConfig,
    ) -> Self {
        Self {
            conventions,
            transforms,
            config,
        }
    }

    pub fn config(&self) -> &EnhanceConfig {
        &self.config
    }

    pub fn conventions(&self) -> &ConventionRegistry {
        &self.conventions
    }

    pub fn transforms(&self) -> &CoordTransBuilderRegistry {
        &self.transforms
    }

    /// Select a convention, augment the dataset, classify its variables and
    /// run the coordinate system passes.
    ///
    /// # Arguments
    /// * `dataset` - Dataset to enhance; the result owns the augmented copy
    /// * `cancel` - Polled between passes and between variables
    ///
    /// # Errors
    /// Invalid configuration, augmentation failure, a failed axis read, or
    /// cancellation. Everything else is reported through
    /// [`EnhancedDataset::diagnostics`].
    pub fn build(
        &self,
        mut dataset: Dataset,
        cancel: &dyn CancelTask,
    ) -> CoordSysResult<EnhancedDataset> {
        self.config.validate().map_err(CoordSysError::config)?;
        cancel::check(cancel)?;

        let mut diag = Diagnostics::new();
        let convention = self.conventions.select(&dataset, &mut diag);
        info!(
            location = %dataset.location(),
            convention = convention.name(),
            "Building coordinate systems"
        );

        convention.augment(&mut dataset, cancel, &mut diag)?;
        cancel::check(cancel)?;

        let classes = classify_dataset(&dataset, self.config.missing_policy(), cancel, &mut diag)?;

        let mut ctx = BuildContext {
            dataset: &dataset,
            convention: convention.as_ref(),
            transforms: &self.transforms,
            config: &self.config,
            cancel,
            diag,
        };
        let state = pipeline::run(PassState::new(classes), &mut ctx)?;
        let BuildContext { diag, .. } = ctx;

        let enhanced = EnhancedDataset::assemble(dataset, convention.name().to_string(), state, diag);
        info!(
            location = %enhanced.dataset.location(),
            axes = enhanced.axes.len(),
            systems = enhanced.systems.len(),
            transforms = enhanced.transforms.len(),
            advisories = enhanced.diagnostics.advisories().count(),
            "Coordinate systems built"
        );
        Ok(enhanced)
    }

    /// Build independent datasets in parallel.
    ///
    /// Results are in input order; one failure does not affect the others.
    pub fn build_all(
        &self,
        datasets: Vec<Dataset>,
        cancel: &dyn CancelTask,
    ) -> Vec<CoordSysResult<EnhancedDataset>> {
        debug!(count = datasets.len(), "Building datasets in parallel");
        datasets
            .into_par_iter()
            .map(|ds| self.build(ds, cancel))
            .collect()
    }
}

/// Coordinate information about one variable.
#[derive(Debug, Clone)]
pub struct VariableInfo {
    pub name: String,
    pub roles: Vec<AxisRole>,
    pub decode: DecodePolicy,
    /// Names of the systems assigned to this variable.
    pub systems: Vec<String>,
    pub axis: Option<Arc<CoordinateAxis>>,
}

impl VariableInfo {
    pub fn is_data(&self) -> bool {
        self.roles == [AxisRole::None]
    }

    pub fn has_role(&self, role: AxisRole) -> bool {
        self.roles.contains(&role)
    }
}

/// A dataset with its coordinate axes, systems and transforms.
#[derive(Debug, Clone)]
pub struct EnhancedDataset {
    dataset: Dataset,
    convention: String,
    axes: Vec<Arc<CoordinateAxis>>,
    systems: Vec<Arc<CoordinateSystem>>,
    transforms: Vec<Arc<CoordinateTransform>>,
    variables: Vec<VariableInfo>,
    diagnostics: Diagnostics,
}

impl EnhancedDataset {
    fn assemble(dataset: Dataset, convention: String, state: PassState, diagnostics: Diagnostics) -> Self {
        let systems: Vec<Arc<CoordinateSystem>> =
            state.systems.into_iter().map(Arc::new).collect();
        let axes = state.vars.iter().filter_map(|v| v.axis.clone()).collect();

        let variables = state
            .vars
            .into_iter()
            .map(|v| VariableInfo {
                roles: v.class.roles(),
                systems: v
                    .systems
                    .iter()
                    .map(|&s| systems[s].name().to_string())
                    .collect(),
                name: v.class.name,
                decode: v.class.decode,
                axis: v.axis,
            })
            .collect();

        Self {
            dataset,
            convention,
            axes,
            systems,
            transforms: state.transforms,
            variables,
            diagnostics,
        }
    }

    /// The dataset after convention augmentation.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }

    /// Name of the convention used.
    pub fn convention(&self) -> &str {
        &self.convention
    }

    pub fn axes(&self) -> &[Arc<CoordinateAxis>] {
        &self.axes
    }

    pub fn coordinate_systems(&self) -> &[Arc<CoordinateSystem>] {
        &self.systems
    }

    pub fn transforms(&self) -> &[Arc<CoordinateTransform>] {
        &self.transforms
    }

    /// Per-variable results, in dataset order.
    pub fn variables(&self) -> &[VariableInfo] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&VariableInfo> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn find_coordinate_system(&self, name: &str) -> Option<&Arc<CoordinateSystem>> {
        self.systems.iter().find(|s| s.name() == name)
    }

    pub fn find_axis(&self, name: &str) -> Option<&Arc<CoordinateAxis>> {
        self.axes.iter().find(|a| a.name == name)
    }

    pub fn find_transform(&self, name: &str) -> Option<&Arc<CoordinateTransform>> {
        self.transforms.iter().find(|t| t.name == name)
    }

    /// Systems assigned to a variable; empty for unknown names.
    pub fn systems_for(&self, variable: &str) -> Vec<&Arc<CoordinateSystem>> {
        self.variable(variable)
            .map(|v| {
                v.systems
                    .iter()
                    .filter_map(|name| self.find_coordinate_system(name))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use test_utils::{cf_time_lat_lon, coordinates_projection};

    #[test]
    fn test_invalid_config_is_rejected() {
        let builder = CoordSysBuilder::new(EnhanceConfig {
            fill_value_is_missing: false,
            invalid_data_is_missing: false,
            missing_data_is_missing: false,
            use_nans: true,
            ..Default::default()
        });
        let result = builder.build(cf_time_lat_lon(), &NeverCancel);
        assert!(matches!(result, Err(CoordSysError::Config(_))));
    }

    #[test]
    fn test_cancelled_before_start() {
        let result = CoordSysBuilder::default().build(cf_time_lat_lon(), &|| true);
        assert!(matches!(result, Err(CoordSysError::Cancelled)));
    }

    #[test]
    fn test_variable_info() {
        let enhanced = CoordSysBuilder::default()
            .build(coordinates_projection(), &NeverCancel)
            .unwrap();

        assert_eq!(enhanced.convention(), "_Coordinates");
        let time = enhanced.variable("time").unwrap();
        assert!(time.has_role(AxisRole::CoordinateVariable));
        assert!(time.axis.is_some());

        let reflectivity = enhanced.variable("reflectivity").unwrap();
        assert!(reflectivity.is_data());
        assert!(reflectivity.decode.has_missing());
        assert_eq!(reflectivity.systems, vec!["y-x".to_string()]);

        assert!(enhanced.systems_for("nothing").is_empty());
        assert!(enhanced.find_transform("LambertProjection").is_some());
    }
}
