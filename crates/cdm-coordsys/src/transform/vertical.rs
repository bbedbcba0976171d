//! Vertical coordinate transform builders driven by CF `formula_terms`.

use cdm_common::{Dataset, Variable};

use super::{CoordTransBuilder, CoordinateTransform, ParamValue, TransformParameter, TransformType};
use crate::diagnostics::{Diagnostics, Pass};

pub const FORMULA_TERMS: &str = "formula_terms";

/// Builder for one parameterized vertical coordinate.
#[derive(Debug, Clone)]
pub struct VerticalBuilder {
    name: &'static str,
    required: &'static [&'static str],
    optional: &'static [&'static str],
    /// At least one of these terms must be present.
    one_of: &'static [&'static str],
}

/// The built-in vertical coordinates.
pub fn builtins() -> Vec<VerticalBuilder> {
    vec![
        VerticalBuilder {
            name: "atmosphere_sigma_coordinate",
            required: &["sigma", "ps", "ptop"],
            optional: &[],
            one_of: &[],
        },
        VerticalBuilder {
            name: "atmosphere_hybrid_sigma_pressure_coordinate",
            required: &["b", "ps"],
            optional: &["a", "ap", "p0"],
            one_of: &["a", "ap"],
        },
        VerticalBuilder {
            name: "atmosphere_ln_pressure_coordinate",
            required: &["p0", "lev"],
            optional: &[],
            one_of: &[],
        },
        VerticalBuilder {
            name: "ocean_s_coordinate",
            required: &["s", "eta", "depth", "a", "b", "depth_c"],
            optional: &[],
            one_of: &[],
        },
        VerticalBuilder {
            name: "ocean_sigma_coordinate",
            required: &["sigma", "eta", "depth"],
            optional: &[],
            one_of: &[],
        },
        VerticalBuilder {
            name: "wrf_eta",
            required: &[
                "perturbation_geopotential",
                "base_geopotential",
                "perturbation_pressure",
                "base_pressure",
            ],
            optional: &[],
            one_of: &[],
        },
    ]
}

/// Parse `"term: variable term: variable ..."` into ordered pairs.
///
/// Both `"a: hyam"` and `"a:hyam"` are accepted. Returns `None` if a term
/// has no variable.
pub fn parse_formula_terms(formula: &str) -> Option<Vec<(String, String)>> {
    let mut out = Vec::new();
    let mut tokens = formula.split_whitespace();
    while let Some(token) = tokens.next() {
        let (term, rest) = token.split_once(':')?;
        let var = if rest.is_empty() {
            tokens.next()?
        } else {
            rest
        };
        out.push((term.to_string(), var.to_string()));
    }
    Some(out)
}

impl CoordTransBuilder for VerticalBuilder {
    fn transform_name(&self) -> &str {
        self.name
    }

    fn transform_type(&self) -> TransformType {
        TransformType::Vertical
    }

    fn build(
        &self,
        dataset: &Dataset,
        ctv: &Variable,
        diag: &mut Diagnostics,
    ) -> Option<CoordinateTransform> {
        let Some(formula) = ctv.attribute_string(FORMULA_TERMS) else {
            diag.advise(
                Pass::Transforms,
                format!("**{} variable {} has no {}", self.name, ctv.name, FORMULA_TERMS),
            );
            return None;
        };

        let Some(terms) = parse_formula_terms(formula) else {
            diag.advise(
                Pass::Transforms,
                format!("**{} cannot parse {} '{}'", ctv.name, FORMULA_TERMS, formula),
            );
            return None;
        };

        let has = |term: &str| terms.iter().any(|(t, _)| t.eq_ignore_ascii_case(term));

        if let Some(missing) = self.required.iter().find(|&&t| !has(t)) {
            diag.advise(
                Pass::Transforms,
                format!(
                    "**{} formula_terms of {} missing term {}",
                    self.name, ctv.name, missing
                ),
            );
            return None;
        }
        if !self.one_of.is_empty() && !self.one_of.iter().any(|&t| has(t)) {
            diag.advise(
                Pass::Transforms,
                format!(
                    "**{} formula_terms of {} needs one of {}",
                    self.name,
                    ctv.name,
                    self.one_of.join(", ")
                ),
            );
            return None;
        }

        let mut parameters = Vec::with_capacity(terms.len());
        for (term, var) in terms {
            let known = self
                .required
                .iter()
                .chain(self.optional)
                .any(|t| t.eq_ignore_ascii_case(&term));
            if !known {
                diag.trace(
                    Pass::Transforms,
                    format!(" {} ignores formula term {} of {}", self.name, term, ctv.name),
                );
                continue;
            }
            if dataset.find_variable(&var).is_none() {
                diag.advise(
                    Pass::Transforms,
                    format!(
                        "**{} formula term {} references missing variable {}",
                        ctv.name, term, var
                    ),
                );
                return None;
            }
            parameters.push(TransformParameter::new(term, ParamValue::Text(var)));
        }

        Some(CoordinateTransform {
            name: ctv.name.clone(),
            authority: self.name.to_string(),
            transform_type: TransformType::Vertical,
            parameters,
        })
    }
}
