//! Per-variable decode policy: unsigned widening, scale/offset and missing data.
//!
//! A [`DecodePolicy`] is derived once from a variable's attributes and never
//! mutated afterwards. Decoding maps a packed sample `x` to
//! `scale * x + offset`, after reinterpreting signed bit patterns as unsigned
//! when the variable is unsigned.
//!
//! `_FillValue` and `missing_value` are always packed values and go through
//! the same transform. `valid_min`/`valid_max`/`valid_range` are physical
//! only when their type matches the wider of the `scale_factor`/`add_offset`
//! types and that type is wider than the storage type; otherwise they are
//! packed as well.

use serde::{Deserialize, Serialize};
use tracing::debug;

use cdm_common::{Attribute, DataType, RawArray, Sample, Variable};

use crate::missing::{close_enough, MissingKind, MissingPolicy};

pub const SCALE_FACTOR: &str = "scale_factor";
pub const ADD_OFFSET: &str = "add_offset";
pub const VALID_RANGE: &str = "valid_range";
pub const VALID_MIN: &str = "valid_min";
pub const VALID_MAX: &str = "valid_max";
pub const FILL_VALUE: &str = "_FillValue";
pub const MISSING_VALUE: &str = "missing_value";

/// Immutable decode rules of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodePolicy {
    /// Signed bit patterns are reinterpreted as unsigned.
    pub unsigned: bool,
    /// Declared storage type after `_Unsigned` adjustment.
    pub storage_type: DataType,
    pub has_scale_offset: bool,
    pub scale: f64,
    pub offset: f64,
    /// Lower valid bound in physical units.
    pub valid_min: Option<f64>,
    /// Upper valid bound in physical units.
    pub valid_max: Option<f64>,
    /// Fill value in physical units.
    pub fill_value: Option<f64>,
    /// Missing values in physical units.
    pub missing_values: Vec<f64>,
    /// Element type of decoded data.
    pub output_kind: DataType,
    pub policy: MissingPolicy,
}

impl Default for DecodePolicy {
    fn default() -> Self {
        Self {
            unsigned: false,
            storage_type: DataType::Double,
            has_scale_offset: false,
            scale: 1.0,
            offset: 0.0,
            valid_min: None,
            valid_max: None,
            fill_value: None,
            missing_values: Vec::new(),
            output_kind: DataType::Double,
            policy: MissingPolicy::default(),
        }
    }
}

/// Non-string numeric attribute, if present.
fn numeric_attr<'a>(var: &'a Variable, name: &str) -> Option<&'a Attribute> {
    var.find_attribute(name)
        .filter(|a| !a.is_string() && !a.is_empty())
}

impl DecodePolicy {
    /// Derive the policy from a variable's attributes.
    pub fn from_variable(var: &Variable, policy: MissingPolicy) -> Self {
        let storage_type = var.unsigned_adjusted_type();
        let unsigned = storage_type.is_unsigned();

        let mut out = Self {
            unsigned,
            storage_type,
            output_kind: storage_type,
            policy,
            ..Default::default()
        };

        // scale and offset
        let mut scale_type = None;
        let mut offset_type = None;
        if let Some(att) = numeric_attr(var, SCALE_FACTOR) {
            if let Some(v) = att.numeric_value() {
                out.scale = v;
                out.has_scale_offset = true;
                scale_type = Some(att.data_type());
            }
        }
        if let Some(att) = numeric_attr(var, ADD_OFFSET) {
            if let Some(v) = att.numeric_value() {
                out.offset = v;
                out.has_scale_offset = true;
                offset_type = Some(att.data_type());
            }
        }
        let packing_type = DataType::wider(scale_type, offset_type);

        // valid range
        let range_att = numeric_attr(var, VALID_RANGE).filter(|a| a.len() > 1);
        let (min_att, max_att) = match range_att {
            Some(_) => (None, None),
            None => (numeric_attr(var, VALID_MIN), numeric_attr(var, VALID_MAX)),
        };
        let valid_type = match range_att {
            Some(att) => Some(att.data_type()),
            None => DataType::wider(
                min_att.map(Attribute::data_type),
                max_att.map(Attribute::data_type),
            ),
        };
        // Compared against the unsigned-adjusted storage type: a UByte range on
        // `_Unsigned` byte data is packed, a Short range is physical.
        let physical_valid = out.has_scale_offset
            && DataType::rank_of(valid_type) == DataType::rank_of(packing_type)
            && DataType::rank_of(packing_type) > storage_type.rank();
        let (valid_min, valid_max) = {
            let valid_value = |att: &Attribute, i: usize| -> Option<f64> {
                let v = att.numeric_at(i)?;
                Some(if physical_valid { v } else { out.attribute_to_physical(att, v) })
            };
            match range_att {
                Some(att) => (valid_value(att, 0), valid_value(att, 1)),
                None => (
                    min_att.and_then(|a| valid_value(a, 0)),
                    max_att.and_then(|a| valid_value(a, 0)),
                ),
            }
        };
        out.valid_min = valid_min;
        out.valid_max = valid_max;

        // fill value
        if let Some(att) = numeric_attr(var, FILL_VALUE) {
            out.fill_value = att
                .numeric_value()
                .map(|v| out.attribute_to_physical(att, v));
        }

        // missing values
        if let Some(att) = var.find_attribute(MISSING_VALUE) {
            out.missing_values = match att.string_value() {
                Some(s) if var.data_type == DataType::Char => {
                    vec![s.chars().next().map_or(0.0, |c| c as u32 as f64)]
                }
                Some(s) => match s.trim().parse::<f64>() {
                    Ok(v) => vec![out.to_physical(v)],
                    Err(_) => {
                        debug!(variable = %var.name, value = %s, "Ignoring non-numeric missing_value");
                        Vec::new()
                    }
                },
                None => att
                    .numeric_values()
                    .into_iter()
                    .map(|v| out.attribute_to_physical(att, v))
                    .collect(),
            };
        }

        out.output_kind = out.compute_output_kind(packing_type);

        debug!(
            variable = %var.name,
            unsigned = out.unsigned,
            scale = out.scale,
            offset = out.offset,
            output_kind = %out.output_kind,
            has_missing = out.has_missing(),
            "Derived decode policy"
        );

        out
    }

    fn compute_output_kind(&self, packing_type: Option<DataType>) -> DataType {
        if !self.storage_type.is_numeric() {
            return self.storage_type;
        }
        let base = if self.unsigned {
            self.storage_type.widen_unsigned()
        } else {
            self.storage_type
        };
        let widest = DataType::wider(Some(base), packing_type).unwrap_or(base);
        if self.has_missing() && widest.rank() < DataType::Float.rank() {
            DataType::Float
        } else {
            widest
        }
    }

    /// Apply `scale * x + offset` to an already-widened packed value.
    pub fn to_physical(&self, packed: f64) -> f64 {
        if self.has_scale_offset {
            self.scale * packed + self.offset
        } else {
            packed
        }
    }

    /// Convert an attribute value given in packed units.
    ///
    /// Integral attribute values of an unsigned variable are reinterpreted
    /// as unsigned first.
    fn attribute_to_physical(&self, att: &Attribute, value: f64) -> f64 {
        let widened = if self.unsigned {
            att.data_type().unsigned_value(value)
        } else {
            value
        };
        self.to_physical(widened)
    }

    /// Widen a raw numeric value and apply scale/offset, without NaN encoding.
    pub fn convert(&self, raw: f64) -> f64 {
        let widened = if self.unsigned {
            self.storage_type.unsigned_value(raw)
        } else {
            raw
        };
        self.to_physical(widened)
    }

    /// Decode one raw value given as `f64` in the signed storage range.
    ///
    /// Missing values become NaN only when the policy enables NaN encoding.
    pub fn decode(&self, raw: f64) -> f64 {
        let v = self.convert(raw);
        if self.policy.use_nans && self.is_missing(v) {
            f64::NAN
        } else {
            v
        }
    }

    /// Decode one typed raw sample.
    pub fn decode_sample<T: Sample>(&self, raw: T) -> f64 {
        let widened = if self.unsigned {
            raw.to_f64_unsigned()
        } else {
            raw.to_f64_signed()
        };
        let v = self.to_physical(widened);
        if self.policy.use_nans && self.is_missing(v) {
            f64::NAN
        } else {
            v
        }
    }

    /// Decode a whole array, returning values plus a validity mask.
    ///
    /// Returns `None` for character and string data.
    pub fn decode_array(&self, raw: &RawArray) -> Option<DecodedArray> {
        let widened = raw.to_f64_vec(self.unsigned)?;
        let mut values = Vec::with_capacity(widened.len());
        let mut valid = Vec::with_capacity(widened.len());
        for x in widened {
            let v = self.to_physical(x);
            let ok = self.classify(v).is_none();
            values.push(if !ok && self.policy.use_nans { f64::NAN } else { v });
            valid.push(ok);
        }
        Some(DecodedArray { values, valid })
    }

    // === Missing-data predicates ===

    pub fn has_fill_value(&self) -> bool {
        self.fill_value.is_some()
    }

    pub fn has_invalid_data(&self) -> bool {
        self.valid_min.is_some() || self.valid_max.is_some()
    }

    pub fn has_missing_value(&self) -> bool {
        !self.missing_values.is_empty()
    }

    /// Check if at least one enabled condition has data present.
    pub fn has_missing(&self) -> bool {
        (self.policy.invalid_data_is_missing && self.has_invalid_data())
            || (self.policy.fill_value_is_missing && self.has_fill_value())
            || (self.policy.missing_data_is_missing && self.has_missing_value())
    }

    pub fn is_fill_value(&self, v: f64) -> bool {
        self.fill_value == Some(v)
    }

    /// Outside `[valid_min, valid_max]`; an absent bound is unbounded.
    pub fn is_invalid_data(&self, v: f64) -> bool {
        self.valid_min.is_some_and(|min| v < min) || self.valid_max.is_some_and(|max| v > max)
    }

    pub fn is_missing_value(&self, v: f64) -> bool {
        self.missing_values.iter().any(|&m| close_enough(v, m))
    }

    /// Why `v` (a physical value) is missing, if it is.
    pub fn classify(&self, v: f64) -> Option<MissingKind> {
        if v.is_nan() {
            return Some(MissingKind::NaN);
        }
        let p = &self.policy;
        if p.missing_data_is_missing && self.is_missing_value(v) {
            Some(MissingKind::MissingValue)
        } else if p.fill_value_is_missing && self.is_fill_value(v) {
            Some(MissingKind::Fill)
        } else if p.invalid_data_is_missing && self.is_invalid_data(v) {
            Some(MissingKind::Invalid)
        } else {
            None
        }
    }

    /// Check if a physical value is missing under the policy.
    pub fn is_missing(&self, v: f64) -> bool {
        self.classify(v).is_some()
    }
}

/// Decoded values with a validity mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedArray {
    pub values: Vec<f64>,
    pub valid: Vec<bool>,
}

impl DecodedArray {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The i-th value, or `None` if it is missing.
    pub fn get(&self, i: usize) -> Option<f64> {
        match self.valid.get(i) {
            Some(true) => self.values.get(i).copied(),
            _ => None,
        }
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Values as options, `None` where missing.
    pub fn to_options(&self) -> Vec<Option<f64>> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdm_common::DimId;

    fn var(dt: DataType) -> Variable {
        Variable::new("v", dt, vec![DimId(0)])
    }

    fn policy(v: &Variable) -> DecodePolicy {
        DecodePolicy::from_variable(v, MissingPolicy::default())
    }

    // ============================================================
    // Unsigned handling
    // ============================================================

    #[test]
    fn test_unsigned_byte_round_trip() {
        let v = var(DataType::Byte)
            .with_attribute("_Unsigned", "true")
            .with_attribute(SCALE_FACTOR, 0.5f32)
            .with_attribute(ADD_OFFSET, 10.0f32);
        let p = policy(&v);
        assert!(p.unsigned);
        assert_eq!(p.decode(-1.0), 255.0 * 0.5 + 10.0);
        assert_eq!(p.decode_sample(0xFFu8 as i8), 255.0 * 0.5 + 10.0);
    }

    #[test]
    fn test_unsigned_without_packing_widens() {
        let p = policy(&var(DataType::Byte).with_attribute("_Unsigned", "TRUE"));
        assert_eq!(p.output_kind, DataType::Short);
        assert_eq!(p.decode(-2.0), 254.0);

        let p = policy(&var(DataType::UShort));
        assert_eq!(p.output_kind, DataType::Int);
    }

    #[test]
    fn test_unsigned_fill_value_attribute() {
        let v = var(DataType::Byte)
            .with_attribute("_Unsigned", "true")
            .with_attribute(FILL_VALUE, -1i8);
        let p = policy(&v);
        assert_eq!(p.fill_value, Some(255.0));
        assert_eq!(p.classify(p.decode(-1.0)), Some(MissingKind::Fill));
    }

    // ============================================================
    // Output kind
    // ============================================================

    #[test]
    fn test_output_kind_follows_scale_type() {
        let p = policy(&var(DataType::Short).with_attribute(SCALE_FACTOR, 0.01f64));
        assert_eq!(p.output_kind, DataType::Double);

        let p = policy(&var(DataType::Short).with_attribute(SCALE_FACTOR, 2i32));
        assert_eq!(p.output_kind, DataType::Int);

        let p = policy(&var(DataType::Short));
        assert_eq!(p.output_kind, DataType::Short);
    }

    #[test]
    fn test_output_kind_forced_to_float_when_missing() {
        let v = var(DataType::Short)
            .with_attribute(SCALE_FACTOR, 2i32)
            .with_attribute(FILL_VALUE, -32767i16);
        assert_eq!(policy(&v).output_kind, DataType::Float);

        // disabled policies do not force promotion
        let p = DecodePolicy::from_variable(&v, MissingPolicy::none());
        assert_eq!(p.output_kind, DataType::Int);
    }

    // ============================================================
    // Valid range units
    // ============================================================

    #[test]
    fn test_valid_range_packed_when_types_differ() {
        let v = var(DataType::Short)
            .with_attribute(SCALE_FACTOR, 0.1f32)
            .with_attribute(ADD_OFFSET, 100.0f32)
            .with_attribute(VALID_RANGE, vec![-100i16, 100]);
        let p = policy(&v);
        assert!((p.valid_min.unwrap() - 90.0).abs() < 1e-4);
        assert!((p.valid_max.unwrap() - 110.0).abs() < 1e-4);
    }

    #[test]
    fn test_valid_range_physical_when_matching_wider_type() {
        let v = var(DataType::Short)
            .with_attribute(SCALE_FACTOR, 0.1f32)
            .with_attribute(ADD_OFFSET, 100.0f32)
            .with_attribute(VALID_RANGE, vec![90.0f32, 110.0]);
        let p = policy(&v);
        assert_eq!(p.valid_min, Some(90.0));
        assert_eq!(p.valid_max, Some(110.0));
    }

    #[test]
    fn test_valid_range_tie_between_scale_and_offset_types() {
        // scale and offset disagree; the wider (double) decides
        let v = var(DataType::Short)
            .with_attribute(SCALE_FACTOR, 0.5f32)
            .with_attribute(ADD_OFFSET, 1.0f64)
            .with_attribute(VALID_RANGE, vec![0.0f32, 10.0]);
        let p = policy(&v);
        assert_eq!(p.valid_max, Some(10.0 * 0.5 + 1.0));

        let v = var(DataType::Short)
            .with_attribute(SCALE_FACTOR, 0.5f32)
            .with_attribute(ADD_OFFSET, 1.0f64)
            .with_attribute(VALID_RANGE, vec![0.0f64, 10.0]);
        let p = policy(&v);
        assert_eq!(p.valid_max, Some(10.0));
    }

    #[test]
    fn test_valid_range_packed_when_packing_not_wider_than_storage() {
        // valid type equals packing type, but packing is no wider than storage
        let v = var(DataType::Float)
            .with_attribute(SCALE_FACTOR, 2.0f32)
            .with_attribute(VALID_RANGE, vec![0.0f32, 10.0]);
        let p = policy(&v);
        assert_eq!(p.valid_max, Some(20.0));
    }

    #[test]
    fn test_valid_min_max_separately() {
        let v = var(DataType::Float).with_attribute(VALID_MIN, 0.0f32);
        let p = policy(&v);
        assert!(p.has_invalid_data());
        assert_eq!(p.valid_max, None);
        assert!(p.is_invalid_data(-0.5));
        assert!(!p.is_invalid_data(1.0e30));
    }

    // ============================================================
    // Missing values
    // ============================================================

    #[test]
    fn test_missing_value_tolerance() {
        let v = var(DataType::Float).with_attribute(MISSING_VALUE, vec![-999.0f32, -888.0]);
        let p = policy(&v);
        assert_eq!(p.classify(-999.000_001), Some(MissingKind::MissingValue));
        assert_eq!(p.classify(-888.0), Some(MissingKind::MissingValue));
        assert_eq!(p.classify(-998.0), None);
        assert_eq!(p.classify(f64::NAN), Some(MissingKind::NaN));
    }

    #[test]
    fn test_fill_value_is_exact() {
        let v = var(DataType::Double).with_attribute(FILL_VALUE, -999.0f64);
        let p = policy(&v);
        assert!(p.is_missing(-999.0));
        assert!(!p.is_missing(-999.000_001));
    }

    #[test]
    fn test_string_missing_value() {
        let v = var(DataType::Short).with_attribute(MISSING_VALUE, " -99 ");
        assert_eq!(policy(&v).missing_values, vec![-99.0]);

        let v = var(DataType::Short).with_attribute(MISSING_VALUE, "none");
        assert!(!policy(&v).has_missing_value());

        let v = var(DataType::Char).with_attribute(MISSING_VALUE, "X");
        assert_eq!(policy(&v).missing_values, vec![88.0]);
    }

    #[test]
    fn test_policy_toggles() {
        let v = var(DataType::Float)
            .with_attribute(FILL_VALUE, -1.0f32)
            .with_attribute(VALID_MAX, 100.0f32);
        let p = DecodePolicy::from_variable(
            &v,
            MissingPolicy {
                fill_value_is_missing: false,
                ..Default::default()
            },
        );
        assert!(!p.is_missing(-1.0));
        assert_eq!(p.classify(200.0), Some(MissingKind::Invalid));
    }

    #[test]
    fn test_decode_array_mask_and_nans() {
        let v = var(DataType::Short)
            .with_attribute(SCALE_FACTOR, 0.5f32)
            .with_attribute(FILL_VALUE, -1i16);
        let raw = RawArray::from(vec![2i16, -1, 4]);

        let decoded = policy(&v).decode_array(&raw).unwrap();
        assert_eq!(decoded.values, vec![1.0, -0.5, 2.0]);
        assert_eq!(decoded.valid, vec![true, false, true]);
        assert_eq!(decoded.to_options(), vec![Some(1.0), None, Some(2.0)]);

        let p = DecodePolicy::from_variable(&v, MissingPolicy::default().with_nans(true));
        let decoded = p.decode_array(&raw).unwrap();
        assert!(decoded.values[1].is_nan());
        assert_eq!(decoded.valid_count(), 2);
        assert!(p.decode(-1.0).is_nan());
    }

    #[test]
    fn test_string_scale_factor_ignored() {
        let v = var(DataType::Short).with_attribute(SCALE_FACTOR, "0.5");
        let p = policy(&v);
        assert!(!p.has_scale_offset);
        assert_eq!(p.decode(4.0), 4.0);
    }
}
