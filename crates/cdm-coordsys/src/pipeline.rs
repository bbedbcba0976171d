//! The nine coordinate system passes.
//!
//! Each pass takes the current [`PassState`] by value and returns the next
//! one. Passes only add information: a role, axis or system recorded by an
//! earlier pass is never withdrawn, except that the maximal pass may replace
//! a narrower implicit assignment.

use std::collections::HashMap;
use std::sync::Arc;

use cdm_common::{Dataset, DimId, Variable};
use tracing::debug;

use crate::axis::{AxisType, CoordinateAxis};
use crate::cancel::{self, CancelTask};
use crate::classify::{dims_fit, CoordRefs, RoleFlags, VariableClass};
use crate::config::EnhanceConfig;
use crate::convention::Convention;
use crate::diagnostics::{Diagnostics, Pass};
use crate::error::{CoordSysError, CoordSysResult};
use crate::index::MonotonicAxisIndex;
use crate::system::CoordinateSystem;
use crate::transform::{CoordTransBuilderRegistry, CoordinateTransform};

/// Per-variable state carried between passes.
#[derive(Debug, Clone)]
pub(crate) struct VarState {
    pub class: VariableClass,
    pub axis: Option<Arc<CoordinateAxis>>,
    /// System built from this variable's declaration.
    pub system_decl: Option<usize>,
    /// Transform built from this variable's declaration.
    pub transform: Option<usize>,
    /// Systems assigned to this (data) variable.
    pub systems: Vec<usize>,
}

/// Everything the passes have learned so far.
#[derive(Debug, Clone)]
pub(crate) struct PassState {
    pub vars: Vec<VarState>,
    pub systems: Vec<CoordinateSystem>,
    pub transforms: Vec<Arc<CoordinateTransform>>,
    by_name: HashMap<String, usize>,
    /// Coordinate variables and aliases of each dimension.
    coord_vars: HashMap<DimId, Vec<usize>>,
}

impl PassState {
    pub fn new(classes: Vec<VariableClass>) -> Self {
        let mut by_name = HashMap::with_capacity(classes.len());
        let mut coord_vars: HashMap<DimId, Vec<usize>> = HashMap::new();
        for (i, class) in classes.iter().enumerate() {
            by_name.insert(class.name.clone(), i);
            if let Some(dim) = class.coordinate_dim {
                coord_vars.entry(dim).or_default().push(i);
            }
        }

        let vars = classes
            .into_iter()
            .map(|class| VarState {
                class,
                axis: None,
                system_decl: None,
                transform: None,
                systems: Vec::new(),
            })
            .collect();

        Self {
            vars,
            systems: Vec::new(),
            transforms: Vec::new(),
            by_name,
            coord_vars,
        }
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Materialized axes named by `tokens`, skipping names that are not axes.
    fn resolve_axes(&self, tokens: &[String]) -> Vec<Arc<CoordinateAxis>> {
        tokens
            .iter()
            .filter_map(|t| self.find(t))
            .filter_map(|j| self.vars[j].axis.clone())
            .collect()
    }

    /// Index of the system with the canonical name of `axes`, adding a new
    /// one if there is none.
    fn find_or_add_system(&mut self, axes: Vec<Arc<CoordinateAxis>>, implicit: bool) -> usize {
        let name = CoordinateSystem::make_name(&axes);
        if let Some(i) = self.systems.iter().position(|s| s.name() == name) {
            return i;
        }
        self.systems.push(CoordinateSystem::new(axes, implicit));
        self.systems.len() - 1
    }

    /// Every materialized axis, in dataset order.
    pub fn axes(&self) -> impl Iterator<Item = &Arc<CoordinateAxis>> {
        self.vars.iter().filter_map(|v| v.axis.as_ref())
    }
}

/// Read-only inputs of one build plus its diagnostics.
pub(crate) struct BuildContext<'a> {
    pub dataset: &'a Dataset,
    pub convention: &'a dyn Convention,
    pub transforms: &'a CoordTransBuilderRegistry,
    pub config: &'a EnhanceConfig,
    pub cancel: &'a dyn CancelTask,
    pub diag: Diagnostics,
}

type PassFn = fn(PassState, &mut BuildContext<'_>) -> CoordSysResult<PassState>;

/// The passes in execution order.
pub(crate) const PIPELINE: [(Pass, PassFn); 9] = [
    (Pass::FindAxes, find_axes),
    (Pass::FindSystems, find_systems),
    (Pass::FindTransforms, find_transforms),
    (Pass::MakeAxes, make_axes),
    (Pass::MakeSystems, make_systems),
    (Pass::AssignExplicit, assign_explicit),
    (Pass::AssignImplicit, assign_implicit),
    (Pass::AssignMaximal, assign_maximal),
    (Pass::Transforms, make_transforms),
];

/// Run every pass, checking for cancellation before each one.
pub(crate) fn run(mut state: PassState, ctx: &mut BuildContext<'_>) -> CoordSysResult<PassState> {
    for (pass, run_pass) in PIPELINE {
        cancel::check(ctx.cancel)?;
        state = run_pass(state, ctx)?;
        debug!(
            pass = %pass,
            systems = state.systems.len(),
            transforms = state.transforms.len(),
            "Pass complete"
        );
    }
    Ok(state)
}

// === Reference propagation ===

fn propagate(
    mut state: PassState,
    ctx: &mut BuildContext<'_>,
    pass: Pass,
    label: &str,
    refs: fn(&CoordRefs) -> Vec<String>,
    mark: fn(&mut RoleFlags),
) -> CoordSysResult<PassState> {
    for i in 0..state.vars.len() {
        cancel::check(ctx.cancel)?;
        for name in refs(&state.vars[i].class.refs) {
            match state.find(&name) {
                Some(j) => mark(&mut state.vars[j].class.flags),
                None => ctx.diag.advise(
                    pass,
                    format!(
                        "***Cant find {} {} referenced from var= {}",
                        label, name, state.vars[i].class.name
                    ),
                ),
            }
        }
    }
    Ok(state)
}

fn find_axes(state: PassState, ctx: &mut BuildContext<'_>) -> CoordSysResult<PassState> {
    propagate(
        state,
        ctx,
        Pass::FindAxes,
        "coordAxis",
        |refs| {
            refs.axes
                .iter()
                .chain(refs.coordinates.iter())
                .flatten()
                .cloned()
                .collect()
        },
        |flags| flags.axis = true,
    )
}

fn find_systems(state: PassState, ctx: &mut BuildContext<'_>) -> CoordSysResult<PassState> {
    propagate(
        state,
        ctx,
        Pass::FindSystems,
        "coordSystem",
        |refs| refs.systems.clone().unwrap_or_default(),
        |flags| flags.system = true,
    )
}

fn find_transforms(state: PassState, ctx: &mut BuildContext<'_>) -> CoordSysResult<PassState> {
    propagate(
        state,
        ctx,
        Pass::FindTransforms,
        "coord Transform",
        |refs| refs.transforms.clone().unwrap_or_default(),
        |flags| flags.transform = true,
    )
}

// === Axes ===

fn make_axes(mut state: PassState, ctx: &mut BuildContext<'_>) -> CoordSysResult<PassState> {
    for i in 0..state.vars.len() {
        cancel::check(ctx.cancel)?;
        let class = &state.vars[i].class;
        if !class.flags.coordinate_variable && !class.flags.axis {
            continue;
        }
        // classes are in dataset order
        let dataset = ctx.dataset;
        let Some(var) = dataset.variable(i) else {
            continue;
        };
        let axis = make_axis(ctx, class, var)?;
        state.vars[i].axis = Some(Arc::new(axis));
    }
    Ok(state)
}

fn make_axis(
    ctx: &mut BuildContext<'_>,
    class: &VariableClass,
    var: &Variable,
) -> CoordSysResult<CoordinateAxis> {
    let axis_type = class
        .explicit_axis_type
        .or_else(|| ctx.convention.axis_type(ctx.dataset, var));
    if axis_type.is_none() {
        ctx.diag.advise(
            Pass::MakeAxes,
            format!("Coordinate Axis {} does not have an assigned AxisType", var.name),
        );
    }

    let positive = axis_type
        .filter(|t| t.is_vertical())
        .and_then(|t| ctx.convention.positive(var, t));

    let index = if ctx.config.read_axis_values && var.rank() == 1 && var.data_type.is_numeric() {
        read_index(ctx, class, var, axis_type)?
    } else {
        None
    };

    ctx.diag.trace(
        Pass::MakeAxes,
        format!(
            " Made Coordinate Axis {} type= {}",
            var.name,
            axis_type.map_or("none", AxisType::as_str)
        ),
    );

    Ok(CoordinateAxis {
        name: var.name.clone(),
        data_type: var.data_type,
        dims: var.dims.clone(),
        axis_type,
        positive,
        units: var.units().map(str::to_string),
        is_coordinate_variable: class.coordinate_dim.is_some(),
        decode: class.decode.clone(),
        index,
    })
}

/// Read and decode a 1-D axis. Read failures abort the build; values that
/// cannot be indexed only lose the index.
fn read_index(
    ctx: &mut BuildContext<'_>,
    class: &VariableClass,
    var: &Variable,
    axis_type: Option<AxisType>,
) -> CoordSysResult<Option<MonotonicAxisIndex>> {
    let raw = ctx
        .dataset
        .read(var)
        .map_err(|e| CoordSysError::read(&var.name, e))?;
    let Some(decoded) = class.decode.decode_array(&raw) else {
        return Ok(None);
    };

    let midpoints = decoded
        .values
        .iter()
        .zip(&decoded.valid)
        .map(|(&v, &ok)| if ok { v } else { f64::NAN })
        .collect();

    match MonotonicAxisIndex::new(midpoints) {
        Ok(index) if axis_type == Some(AxisType::Lon) => Ok(Some(index.into_longitude())),
        Ok(index) => Ok(Some(index)),
        Err(e) => {
            ctx.diag.advise(
                Pass::MakeAxes,
                format!("Coordinate Axis {} has no lookup index: {}", var.name, e),
            );
            Ok(None)
        }
    }
}

// === Systems ===

fn make_systems(mut state: PassState, ctx: &mut BuildContext<'_>) -> CoordSysResult<PassState> {
    for i in 0..state.vars.len() {
        cancel::check(ctx.cancel)?;
        if !state.vars[i].class.flags.system {
            continue;
        }
        let name = state.vars[i].class.name.clone();
        let tokens = state.vars[i].class.refs.axes.clone().unwrap_or_default();

        let mut axes = Vec::with_capacity(tokens.len());
        for token in &tokens {
            match state.find(token).and_then(|j| state.vars[j].axis.clone()) {
                Some(axis) => axes.push(axis),
                None => ctx.diag.advise(
                    Pass::MakeSystems,
                    format!("Cant find axes {} for Coordinate System {}", token, name),
                ),
            }
        }
        if axes.is_empty() {
            ctx.diag.advise(
                Pass::MakeSystems,
                format!("No axes found for Coordinate System {}", name),
            );
            continue;
        }

        let s = state.find_or_add_system(axes, false);
        state.vars[i].system_decl = Some(s);
        ctx.diag.trace(
            Pass::MakeSystems,
            format!(" Made Coordinate System {} from variable {}", state.systems[s].name(), name),
        );
    }
    Ok(state)
}

fn assign_explicit(mut state: PassState, ctx: &mut BuildContext<'_>) -> CoordSysResult<PassState> {
    for i in 0..state.vars.len() {
        cancel::check(ctx.cancel)?;
        let var = &state.vars[i];
        if !var.class.is_data() || !var.systems.is_empty() {
            continue;
        }
        let name = var.class.name.clone();

        if let Some(tokens) = var.class.refs.systems.clone() {
            for token in tokens {
                let Some(j) = state.find(&token) else {
                    ctx.diag.advise(
                        Pass::AssignExplicit,
                        format!(
                            "***Cant find Coordinate System variable {} referenced from var= {}",
                            token, name
                        ),
                    );
                    continue;
                };
                let Some(s) = state.vars[j].system_decl else {
                    ctx.diag.advise(
                        Pass::AssignExplicit,
                        format!(
                            "***Not a Coordinate System variable ={} referenced from var= {}",
                            token, name
                        ),
                    );
                    continue;
                };
                if !state.vars[i].systems.contains(&s) {
                    state.vars[i].systems.push(s);
                    ctx.diag.trace(
                        Pass::AssignExplicit,
                        format!(
                            " assign explicit CoordSys {} for var= {}",
                            state.systems[s].name(),
                            name
                        ),
                    );
                }
            }
        }

        if !state.vars[i].systems.is_empty() {
            continue;
        }
        let Some(tokens) = state.vars[i].class.refs.axes.clone() else {
            continue;
        };
        let axes = state.resolve_axes(&tokens);
        if axes.len() > 1 {
            let s = state.find_or_add_system(axes, false);
            state.vars[i].systems.push(s);
            ctx.diag.trace(
                Pass::AssignExplicit,
                format!(
                    " assign explicit coordAxes CoordSys {} for var= {}",
                    state.systems[s].name(),
                    name
                ),
            );
        }
    }
    Ok(state)
}

fn assign_implicit(mut state: PassState, ctx: &mut BuildContext<'_>) -> CoordSysResult<PassState> {
    for i in 0..state.vars.len() {
        cancel::check(ctx.cancel)?;
        let var = &state.vars[i];
        if !var.class.is_data() || !var.systems.is_empty() {
            continue;
        }

        let mut axes = state.resolve_axes(var.class.refs.axis_names());
        for dim in &var.class.dims {
            for &j in state.coord_vars.get(dim).into_iter().flatten() {
                if let Some(axis) = &state.vars[j].axis {
                    axes.push(axis.clone());
                }
            }
        }
        let mut seen = Vec::with_capacity(axes.len());
        axes.retain(|a| {
            let fresh = !seen.contains(&a.name);
            seen.push(a.name.clone());
            fresh
        });
        if axes.len() < 2 {
            continue;
        }

        let name = var.class.name.clone();
        let s = state.find_or_add_system(axes, true);
        state.vars[i].systems.push(s);
        ctx.diag.trace(
            Pass::AssignImplicit,
            format!(" assigned implicit CoordSys {} for var= {}", state.systems[s].name(), name),
        );
    }
    Ok(state)
}

/// Assign the system of every axis that fits inside a variable's shape.
///
/// No horizontal (X/Y or Lat/Lon) pair is required of the axis set.
fn assign_maximal(mut state: PassState, ctx: &mut BuildContext<'_>) -> CoordSysResult<PassState> {
    if !ctx.config.use_maximal_coord_sys {
        ctx.diag.trace(Pass::AssignMaximal, " maximal coordinate systems disabled");
        return Ok(state);
    }

    for i in 0..state.vars.len() {
        cancel::check(ctx.cancel)?;
        let var = &state.vars[i];
        if !var.class.is_data() {
            continue;
        }
        let existing = match var.systems.as_slice() {
            [] => None,
            [s] if state.systems[*s].is_implicit()
                && state.systems[*s].rank_range() < var.class.dims.len() =>
            {
                Some(&state.systems[*s])
            }
            _ => continue,
        };

        let axes: Vec<Arc<CoordinateAxis>> = state
            .axes()
            .filter(|a| dims_fit(&a.dims, a.data_type, &var.class.dims))
            .cloned()
            .collect();

        if existing.is_some_and(|cs| axes.len() <= cs.rank_range()) {
            continue;
        }
        if axes.len() < 2 {
            continue;
        }
        let candidate = CoordinateSystem::make_name(&axes);
        if existing.is_some_and(|cs| cs.name() == candidate) {
            continue;
        }

        let name = var.class.name.clone();
        let s = state.find_or_add_system(axes, true);
        state.vars[i].systems = vec![s];
        ctx.diag.trace(
            Pass::AssignMaximal,
            format!(" assigned maximal coord System '{}' for var= {}", candidate, name),
        );
    }
    Ok(state)
}

// === Transforms ===

fn make_transforms(mut state: PassState, ctx: &mut BuildContext<'_>) -> CoordSysResult<PassState> {
    for i in 0..state.vars.len() {
        cancel::check(ctx.cancel)?;
        if !state.vars[i].class.flags.transform {
            continue;
        }
        let dataset = ctx.dataset;
        let Some(var) = dataset.variable(i) else {
            continue;
        };
        if let Some(ct) = ctx.transforms.make_transform(dataset, var, &mut ctx.diag) {
            state.transforms.push(Arc::new(ct));
            state.vars[i].transform = Some(state.transforms.len() - 1);
        }
    }

    assign_transforms_from_systems(&mut state, &mut ctx.diag);
    assign_transforms_to_systems(&mut state, &mut ctx.diag);
    assign_transforms_by_axes(&mut state, &mut ctx.diag);
    assign_transforms_by_axis_types(&mut state, &mut ctx.diag);
    Ok(state)
}

fn attach(state: &mut PassState, diag: &mut Diagnostics, s: usize, t: usize, how: &str) {
    let ct = state.transforms[t].clone();
    if state.systems[s].add_transform(ct) {
        diag.trace(
            Pass::Transforms,
            format!(
                " assign ({}) coordTransform {} to CoordSys= {}",
                how,
                state.transforms[t],
                state.systems[s].name()
            ),
        );
    }
}

/// `_CoordinateTransforms` on system declarations.
fn assign_transforms_from_systems(state: &mut PassState, diag: &mut Diagnostics) {
    for i in 0..state.vars.len() {
        let (Some(s), Some(tokens)) = (
            state.vars[i].system_decl,
            state.vars[i].class.refs.transforms.clone(),
        ) else {
            continue;
        };
        for token in tokens {
            match state.find(&token).map(|j| state.vars[j].transform) {
                Some(Some(t)) => attach(state, diag, s, t, "explicit"),
                Some(None) => diag.advise(
                    Pass::Transforms,
                    format!(
                        "***Cant find coordTransform in {} referenced from var= {}",
                        token, state.vars[i].class.name
                    ),
                ),
                None => diag.advise(
                    Pass::Transforms,
                    format!(
                        "***Cant find coordTransform variable={} referenced from var= {}",
                        token, state.vars[i].class.name
                    ),
                ),
            }
        }
    }
}

/// `_CoordinateSystems` on transform declarations.
fn assign_transforms_to_systems(state: &mut PassState, diag: &mut Diagnostics) {
    for i in 0..state.vars.len() {
        let (Some(t), Some(tokens)) = (
            state.vars[i].transform,
            state.vars[i].class.refs.systems.clone(),
        ) else {
            continue;
        };
        for token in tokens {
            match state.find(&token).and_then(|j| state.vars[j].system_decl) {
                Some(s) => attach(state, diag, s, t, "explicit"),
                None => diag.advise(
                    Pass::Transforms,
                    format!(
                        "***Cant find coordSystem variable {} referenced from var= {}",
                        token, state.vars[i].class.name
                    ),
                ),
            }
        }
    }
}

/// `_CoordinateAxes` on transform declarations.
fn assign_transforms_by_axes(state: &mut PassState, diag: &mut Diagnostics) {
    for i in 0..state.vars.len() {
        let (Some(t), Some(tokens)) = (
            state.vars[i].transform,
            state.vars[i].class.refs.axes.clone(),
        ) else {
            continue;
        };
        let names: Vec<String> = state
            .resolve_axes(&tokens)
            .iter()
            .map(|a| a.name.clone())
            .collect();
        if names.is_empty() {
            continue;
        }
        for s in 0..state.systems.len() {
            if state.systems[s].contains_axes(&names) {
                attach(state, diag, s, t, "implicit coordAxes");
            }
        }
    }
}

/// `_CoordinateAxisTypes` on transform declarations.
fn assign_transforms_by_axis_types(state: &mut PassState, diag: &mut Diagnostics) {
    for i in 0..state.vars.len() {
        let (Some(t), Some(tokens)) = (
            state.vars[i].transform,
            state.vars[i].class.refs.axis_types.as_ref(),
        ) else {
            continue;
        };
        let types: Vec<AxisType> = tokens.iter().filter_map(|n| AxisType::from_name(n)).collect();
        if types.is_empty() {
            continue;
        }
        for s in 0..state.systems.len() {
            if state.systems[s].contains_axis_types(&types) {
                attach(state, diag, s, t, "implicit coordAxisType");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use crate::classify::{attrs, classify_dataset};
    use crate::convention::{CfConvention, CoordinatesConvention, GdvConvention};
    use cdm_common::{DataType, Dimension};
    use test_utils::{cf_hybrid_lambert, cf_time_lat_lon, coordinates_projection, legacy_2d_latlon};

    struct Run {
        state: PassState,
        diag: Diagnostics,
    }

    impl Run {
        fn systems_of(&self, var: &str) -> Vec<&str> {
            let i = self.state.find(var).unwrap();
            self.state.vars[i]
                .systems
                .iter()
                .map(|&s| self.state.systems[s].name())
                .collect()
        }

        fn system(&self, name: &str) -> &CoordinateSystem {
            self.state.systems.iter().find(|s| s.name() == name).unwrap()
        }
    }

    fn run_passes(
        mut ds: Dataset,
        convention: &dyn Convention,
        config: &EnhanceConfig,
        passes: &[(Pass, PassFn)],
    ) -> Run {
        let mut diag = Diagnostics::new();
        convention.augment(&mut ds, &NeverCancel, &mut diag).unwrap();
        let classes =
            classify_dataset(&ds, config.missing_policy(), &NeverCancel, &mut diag).unwrap();
        let registry = CoordTransBuilderRegistry::with_builtins();
        let mut ctx = BuildContext {
            dataset: &ds,
            convention,
            transforms: &registry,
            config,
            cancel: &NeverCancel,
            diag,
        };
        let mut state = PassState::new(classes);
        for (_, pass) in passes {
            state = pass(state, &mut ctx).unwrap();
        }
        Run {
            state,
            diag: ctx.diag,
        }
    }

    fn run_all(ds: Dataset, convention: &dyn Convention) -> Run {
        run_passes(ds, convention, &EnhanceConfig::default(), &PIPELINE)
    }

    // ============================================================
    // Implicit and explicit assignment
    // ============================================================

    #[test]
    fn test_cf_implicit_system() {
        let run = run_all(cf_time_lat_lon(), &CfConvention);
        assert_eq!(run.systems_of("temp"), vec!["lat-lon-time"]);
        let cs = run.system("lat-lon-time");
        assert!(cs.is_implicit());
        assert_eq!(cs.axes().len(), 3);
        assert!(run.diag.has_advice("Coordinate Axis lat does not have an assigned AxisType"));
    }

    #[test]
    fn test_explicit_system_and_axes() {
        let run = run_all(coordinates_projection(), &CoordinatesConvention);
        assert_eq!(run.systems_of("temperature"), vec!["time-y-x"]);
        assert_eq!(run.systems_of("reflectivity"), vec!["y-x"]);
        assert!(!run.system("time-y-x").is_implicit());
        assert!(!run.system("y-x").is_implicit());

        let projection = run.system("time-y-x").projection().unwrap();
        assert_eq!(projection.name, "LambertProjection");
        assert!(run.system("y-x").transforms().is_empty());
    }

    #[test]
    fn test_unresolved_references_are_advisory() {
        let mut ds = Dataset::new("memory://refs");
        let x = ds.add_dimension(Dimension::new("x", 2));
        ds.add_variable(
            Variable::new("x", DataType::Float, vec![x]).with_values(vec![0.0f32, 1.0]),
        );
        ds.add_variable(
            Variable::new("data", DataType::Float, vec![x])
                .with_attribute(attrs::AXES, "x ghost")
                .with_attribute(attrs::SYSTEMS, "nosys"),
        );
        let run = run_all(ds, &CoordinatesConvention);
        assert!(run.diag.has_advice("***Cant find coordAxis ghost referenced from var= data"));
        assert!(run.diag.has_advice("***Cant find coordSystem nosys referenced from var= data"));
        assert!(run
            .diag
            .has_advice("***Cant find Coordinate System variable nosys referenced from var= data"));
        assert!(run.systems_of("data").is_empty());
    }

    #[test]
    fn test_system_without_axes_is_dropped() {
        let mut ds = Dataset::new("memory://empty-system");
        ds.add_variable(
            Variable::new("grid", DataType::Char, vec![])
                .with_attribute(attrs::TRANSFORMS, "proj"),
        );
        let run = run_all(ds, &CoordinatesConvention);
        assert!(run.diag.has_advice("No axes found for Coordinate System grid"));
        assert!(run.state.systems.is_empty());
    }

    // ============================================================
    // Maximal
    // ============================================================

    #[test]
    fn test_maximal_fills_legacy_variable() {
        let run = run_all(legacy_2d_latlon(), &GdvConvention);
        assert_eq!(run.systems_of("temperature"), vec!["time-lat-lon"]);
        assert_eq!(run.systems_of("humidity"), vec!["time-lat-lon"]);
        assert_eq!(run.state.systems.len(), 1);
    }

    #[test]
    fn test_maximal_disabled() {
        let config = EnhanceConfig {
            use_maximal_coord_sys: false,
            ..Default::default()
        };
        let run = run_passes(legacy_2d_latlon(), &GdvConvention, &config, &PIPELINE);
        assert_eq!(run.systems_of("temperature"), vec!["time-lat-lon"]);
        assert!(run.systems_of("humidity").is_empty());
    }

    #[test]
    fn test_maximal_is_idempotent() {
        let once = run_passes(
            legacy_2d_latlon(),
            &GdvConvention,
            &EnhanceConfig::default(),
            &PIPELINE[..8],
        );
        let mut passes = PIPELINE[..8].to_vec();
        passes.push(PIPELINE[7]);
        let twice = run_passes(legacy_2d_latlon(), &GdvConvention, &EnhanceConfig::default(), &passes);

        for var in ["temperature", "humidity", "time", "lat", "lon"] {
            assert_eq!(once.systems_of(var), twice.systems_of(var), "{}", var);
        }
        assert_eq!(once.state.systems.len(), twice.state.systems.len());
    }

    #[test]
    fn test_maximal_accepts_sets_without_horizontal_pair() {
        // Only a time axis and a station height axis: no X/Y or Lat/Lon.
        let mut ds = Dataset::new("memory://stations");
        let time = ds.add_dimension(Dimension::new("time", 2));
        let station = ds.add_dimension(Dimension::new("station", 3));
        ds.add_variable(
            Variable::new("time", DataType::Double, vec![time])
                .with_attribute("units", "hours since 2024-01-01")
                .with_values(vec![0.0, 1.0]),
        );
        ds.add_variable(
            Variable::new("alt", DataType::Float, vec![station])
                .with_attribute(attrs::AXIS_TYPE, "Height")
                .with_values(vec![10.0f32, 250.0, 900.0]),
        );
        ds.add_variable(Variable::new("obs", DataType::Float, vec![time, station]));

        let run = run_all(ds, &GdvConvention);
        assert_eq!(run.systems_of("obs"), vec!["time-alt"]);
        assert!(run.system("time-alt").is_implicit());
    }

    // ============================================================
    // Transforms
    // ============================================================

    #[test]
    fn test_cf_transforms_attach_by_axes_and_types() {
        let run = run_all(cf_hybrid_lambert(), &CfConvention);
        assert_eq!(run.systems_of("T"), vec!["time-lev-y-x"]);
        assert_eq!(run.systems_of("PS"), vec!["time-y-x"]);
        for var in ["hyam", "hybm", "P0"] {
            assert!(run.systems_of(var).is_empty(), "{}", var);
        }

        let full = run.system("time-lev-y-x");
        assert_eq!(full.vertical_transform().map(|t| t.name.as_str()), Some("lev"));
        assert_eq!(
            full.projection().map(|t| t.name.as_str()),
            Some("Lambert_Conformal")
        );
        assert!(full.is_geo_xy());

        let surface = run.system("time-y-x");
        assert!(surface.vertical_transform().is_none());
        assert!(surface.projection().is_some());
    }

    #[test]
    fn test_transform_names_missing_system() {
        let mut ds = coordinates_projection();
        if let Some(v) = ds.find_variable_mut("LambertProjection") {
            v.set_attribute(cdm_common::Attribute::new(attrs::SYSTEMS, "Nowhere"));
        }
        let run = run_all(ds, &CoordinatesConvention);
        assert!(run
            .diag
            .has_advice("***Cant find coordSystem variable Nowhere referenced from var= LambertProjection"));
    }

    // ============================================================
    // Axis reading
    // ============================================================

    #[test]
    fn test_non_monotonic_axis_loses_index() {
        let mut ds = Dataset::new("memory://bumpy");
        let x = ds.add_dimension(Dimension::new("x", 3));
        ds.add_variable(
            Variable::new("x", DataType::Float, vec![x]).with_values(vec![0.0f32, 2.0, 1.0]),
        );
        let run = run_all(ds, &GdvConvention);
        assert!(run.diag.has_advice("Coordinate Axis x has no lookup index"));
        let axis = run.state.axes().next().unwrap();
        assert!(axis.index().is_none());
    }

    #[test]
    fn test_unreadable_axis_is_fatal() {
        let mut ds = Dataset::new("memory://no-values");
        let x = ds.add_dimension(Dimension::new("x", 3));
        ds.add_variable(Variable::new("x", DataType::Float, vec![x]));

        let mut diag = Diagnostics::new();
        let classes = classify_dataset(&ds, Default::default(), &NeverCancel, &mut diag).unwrap();
        let registry = CoordTransBuilderRegistry::with_builtins();
        let config = EnhanceConfig::default();
        let mut ctx = BuildContext {
            dataset: &ds,
            convention: &GdvConvention,
            transforms: &registry,
            config: &config,
            cancel: &NeverCancel,
            diag,
        };
        let result = run(PassState::new(classes), &mut ctx);
        assert!(matches!(result, Err(CoordSysError::Read { ref variable, .. }) if variable == "x"));
    }

    #[test]
    fn test_longitude_axis_index_wraps() {
        let mut ds = Dataset::new("memory://lon");
        let lon = ds.add_dimension(Dimension::new("lon", 4));
        ds.add_variable(
            Variable::new("lon", DataType::Double, vec![lon])
                .with_attribute("units", "degrees_east")
                .with_values(vec![0.0, 90.0, 180.0, 270.0]),
        );
        let run = run_all(ds, &GdvConvention);
        let axis = run.state.axes().next().unwrap();
        assert!(axis.index().unwrap().is_longitude());
    }
}
