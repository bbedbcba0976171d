//! Data model behavior seen from outside the crate: readers, type lattice
//! and time units.

use std::sync::{Arc, Mutex};

use cdm_common::{
    CdmError, CdmResult, DataType, Dataset, Dimension, RawArray, TimePeriod, TimeUnits, Variable,
    VariableReader,
};
use chrono::{Datelike, Timelike};

// ============================================================
// Reader collaborator
// ============================================================

/// Produces `0, 1, 2, ...` for every variable and records what was asked for.
#[derive(Default)]
struct RampReader {
    requests: Mutex<Vec<String>>,
}

impl VariableReader for RampReader {
    fn read(&self, dataset: &Dataset, variable: &Variable) -> CdmResult<RawArray> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(variable.name.clone());
        }
        if variable.data_type == DataType::String {
            return Ok(RawArray::String(vec!["a".into(), "b".into()]));
        }
        let n = dataset.size(variable);
        Ok(RawArray::from((0..n).map(|i| i as f32).collect::<Vec<_>>()))
    }
}

fn gridded(reader: Arc<RampReader>) -> Dataset {
    let mut ds = Dataset::new("memory://gridded");
    let y = ds.add_dimension(Dimension::new("y", 2));
    let x = ds.add_dimension(Dimension::new("x", 3));
    ds.add_variable(Variable::new("y", DataType::Float, vec![y]).with_values(vec![10.0f32, 20.0]));
    ds.add_variable(Variable::new("x", DataType::Float, vec![x]));
    ds.add_variable(Variable::new("field", DataType::Float, vec![y, x]));
    ds.add_variable(Variable::new("labels", DataType::String, vec![x]));
    ds.with_reader(reader)
}

#[test]
fn test_reader_only_called_without_cached_values() {
    let reader = Arc::new(RampReader::default());
    let ds = gridded(reader.clone());

    let y = ds.read_by_name("y").unwrap();
    assert_eq!(y.to_f64_vec(false), Some(vec![10.0, 20.0]));

    let field = ds.read_by_name("field").unwrap();
    assert_eq!(field.len(), 6);
    assert_eq!(field.data_type(), DataType::Float);

    let requests = reader.requests.lock().unwrap().clone();
    assert_eq!(requests, vec!["field".to_string()]);
}

#[test]
fn test_string_data_skips_shape_check() {
    let ds = gridded(Arc::new(RampReader::default()));
    let labels = ds.read_by_name("labels").unwrap();
    assert_eq!(labels.to_strings(0), Some(vec!["a".to_string(), "b".to_string()]));
}

#[test]
fn test_reader_shape_mismatch() {
    let mut ds = gridded(Arc::new(RampReader::default()));
    // the reader sizes its output from the dataset, so shrink a cached copy instead
    ds.find_variable_mut("x").unwrap().values = Some(RawArray::from(vec![1.0f32, 2.0]));
    match ds.read_by_name("x") {
        Err(CdmError::ShapeMismatch { variable, expected, actual }) => {
            assert_eq!(variable, "x");
            assert_eq!(expected, 3);
            assert_eq!(actual, 2);
        }
        other => panic!("expected shape mismatch, got {other:?}"),
    }
}

#[test]
fn test_add_variable_replaces_by_name() {
    let mut ds = gridded(Arc::new(RampReader::default()));
    let before = ds.variables().len();
    let index = ds.find_variable_index("field").unwrap();

    let replaced = ds.add_variable(Variable::new("field", DataType::Double, vec![]));
    assert_eq!(replaced, index);
    assert_eq!(ds.variables().len(), before);
    assert_eq!(ds.find_variable("field").unwrap().data_type, DataType::Double);
    assert!(ds.find_variable("field").unwrap().is_scalar());
}

#[test]
fn test_coordinate_variables_and_shapes() {
    let ds = gridded(Arc::new(RampReader::default()));
    let coords: Vec<&str> = ds
        .variables()
        .iter()
        .filter(|v| ds.is_coordinate_variable(v))
        .map(|v| v.name.as_str())
        .collect();
    assert_eq!(coords, vec!["y", "x"]);

    let field = ds.find_variable("field").unwrap();
    assert_eq!(ds.shape(field), vec![2, 3]);
    assert_eq!(ds.size(field), 6);
}

// ============================================================
// Type lattice
// ============================================================

#[test]
fn test_wider_is_commutative_and_picks_max_rank() {
    let optional: Vec<Option<DataType>> = std::iter::once(None)
        .chain(DataType::numeric_kinds().into_iter().map(Some))
        .collect();

    for &a in &optional {
        for &b in &optional {
            let w = DataType::wider(a, b);
            assert_eq!(w, DataType::wider(b, a), "{a:?} {b:?}");
            assert_eq!(
                DataType::rank_of(w),
                DataType::rank_of(a).max(DataType::rank_of(b)),
                "{a:?} {b:?}"
            );
        }
    }
}

#[test]
fn test_widen_unsigned_holds_full_range() {
    for dt in DataType::numeric_kinds() {
        if !dt.is_integral() {
            continue;
        }
        let unsigned = dt.to_unsigned();
        assert!(unsigned.is_unsigned(), "{dt}");
        let wide = unsigned.widen_unsigned();
        assert!(wide.rank() > unsigned.rank(), "{dt} -> {wide}");
        assert!(!wide.is_unsigned(), "{dt} -> {wide}");
    }
}

#[test]
fn test_unsigned_attribute_adjusts_declared_type() {
    let v = Variable::new("b", DataType::Byte, vec![]).with_attribute("_Unsigned", "True");
    assert_eq!(v.unsigned_adjusted_type(), DataType::UByte);
    assert!(v.is_unsigned());

    let f = Variable::new("f", DataType::Float, vec![]).with_attribute("_Unsigned", "true");
    assert_eq!(f.unsigned_adjusted_type(), DataType::Float);

    let s = Variable::new("s", DataType::Short, vec![]).with_attribute("_Unsigned", "false");
    assert_eq!(s.unsigned_adjusted_type(), DataType::Short);
}

// ============================================================
// Time units
// ============================================================

#[test]
fn test_time_units_with_clock_reference() {
    let tu = TimeUnits::parse("hours since 2024-01-15 12:00:00").unwrap();
    assert_eq!(tu.period, TimePeriod::Hours);

    let t = tu.to_datetime(18.0).unwrap();
    assert_eq!((t.year(), t.month(), t.day(), t.hour()), (2024, 1, 16, 6));

    let back = tu.to_datetime(-12.5).unwrap();
    assert_eq!((back.day(), back.hour(), back.minute()), (14, 23, 30));
}

#[test]
fn test_time_units_rejects_non_reference_units() {
    assert!(TimeUnits::parse("hours").is_none());
    assert!(TimeUnits::parse("degrees_north").is_none());
    assert!(TimeUnits::parse("fortnights since 2000-01-01").is_none());
}
