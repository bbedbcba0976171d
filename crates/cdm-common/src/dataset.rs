//! In-memory dataset metadata plus the reader collaborator that supplies values.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::array::RawArray;
use crate::attribute::{Attribute, AttributeBag};
use crate::dimension::{DimId, Dimension};
use crate::error::{CdmError, CdmResult};
use crate::variable::Variable;

/// Source of raw variable values (file readers, remote protocols, ...).
///
/// Implemented outside this workspace; the coordinate engine only calls it
/// when it materializes a coordinate axis.
pub trait VariableReader: Send + Sync {
    fn read(&self, dataset: &Dataset, variable: &Variable) -> CdmResult<RawArray>;
}

/// Variables, dimensions and global attributes of one dataset.
#[derive(Clone, Default)]
pub struct Dataset {
    location: String,
    dimensions: Vec<Dimension>,
    variables: Vec<Variable>,
    attributes: AttributeBag,
    reader: Option<Arc<dyn VariableReader>>,
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("location", &self.location)
            .field("dimensions", &self.dimensions)
            .field("variables", &self.variables.len())
            .field("attributes", &self.attributes)
            .field("has_reader", &self.reader.is_some())
            .finish()
    }
}

impl Dataset {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Default::default()
        }
    }

    /// Attach the reader used for variables without in-memory values.
    pub fn with_reader(mut self, reader: Arc<dyn VariableReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    // === Dimensions ===

    pub fn add_dimension(&mut self, dim: Dimension) -> DimId {
        self.dimensions.push(dim);
        DimId(self.dimensions.len() - 1)
    }

    pub fn dimension(&self, id: DimId) -> Option<&Dimension> {
        self.dimensions.get(id.0)
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Find a shared dimension by name.
    pub fn find_dimension(&self, name: &str) -> Option<DimId> {
        self.dimensions
            .iter()
            .position(|d| d.shared && d.name == name)
            .map(DimId)
    }

    pub fn dimension_name(&self, id: DimId) -> &str {
        self.dimension(id).map_or("?", |d| d.name.as_str())
    }

    // === Variables ===

    /// Add a variable, replacing any existing variable of the same name.
    pub fn add_variable(&mut self, var: Variable) -> usize {
        match self.variables.iter().position(|v| v.name == var.name) {
            Some(i) => {
                self.variables[i] = var;
                i
            }
            None => {
                self.variables.push(var);
                self.variables.len() - 1
            }
        }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, index: usize) -> Option<&Variable> {
        self.variables.get(index)
    }

    pub fn find_variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn find_variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }

    pub fn find_variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.iter_mut().find(|v| v.name == name)
    }

    /// Lengths of the variable's dimensions.
    pub fn shape(&self, var: &Variable) -> Vec<usize> {
        var.dims
            .iter()
            .map(|&d| self.dimension(d).map_or(0, |dim| dim.length))
            .collect()
    }

    /// Total number of elements of the variable.
    pub fn size(&self, var: &Variable) -> usize {
        self.shape(var).iter().product()
    }

    /// Classic netCDF coordinate variable: 1-D with a dimension of the same name.
    pub fn is_coordinate_variable(&self, var: &Variable) -> bool {
        var.rank() == 1 && self.dimension_name(var.dims[0]) == var.name
    }

    // === Global attributes ===

    pub fn global_attributes(&self) -> &AttributeBag {
        &self.attributes
    }

    pub fn set_global_attribute(&mut self, attr: Attribute) {
        self.attributes.set(attr);
    }

    /// Case-insensitive global attribute lookup.
    pub fn find_global_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.find_ignore_case(name)
    }

    // === Values ===

    /// Read the raw values of a variable.
    ///
    /// In-memory values win over the reader. The element count is checked
    /// against the declared shape for numeric data.
    pub fn read(&self, var: &Variable) -> CdmResult<RawArray> {
        let raw = match (&var.values, &self.reader) {
            (Some(values), _) => values.clone(),
            (None, Some(reader)) => {
                debug!(variable = %var.name, location = %self.location, "Reading variable values");
                reader.read(self, var)?
            }
            (None, None) => return Err(CdmError::NoData(var.name.clone())),
        };

        if raw.is_numeric() {
            let expected = self.size(var);
            if raw.len() != expected {
                return Err(CdmError::ShapeMismatch {
                    variable: var.name.clone(),
                    expected,
                    actual: raw.len(),
                });
            }
        }
        Ok(raw)
    }

    /// Read a variable by name.
    pub fn read_by_name(&self, name: &str) -> CdmResult<RawArray> {
        let var = self
            .find_variable(name)
            .ok_or_else(|| CdmError::VariableNotFound(name.to_string()))?;
        self.read(var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    struct FailingReader;

    impl VariableReader for FailingReader {
        fn read(&self, _dataset: &Dataset, variable: &Variable) -> CdmResult<RawArray> {
            Err(CdmError::read_failed(&variable.name, "disk on fire"))
        }
    }

    fn small_dataset() -> Dataset {
        let mut ds = Dataset::new("memory://small");
        let time = ds.add_dimension(Dimension::unlimited("time", 3));
        let x = ds.add_dimension(Dimension::new("x", 2));
        ds.add_variable(
            Variable::new("time", DataType::Double, vec![time]).with_values(vec![0.0, 1.0, 2.0]),
        );
        ds.add_variable(Variable::new("data", DataType::Float, vec![time, x]));
        ds
    }

    #[test]
    fn test_coordinate_variable_detection() {
        let ds = small_dataset();
        let time = ds.find_variable("time").unwrap();
        let data = ds.find_variable("data").unwrap();
        assert!(ds.is_coordinate_variable(time));
        assert!(!ds.is_coordinate_variable(data));
        assert_eq!(ds.shape(data), vec![3, 2]);
    }

    #[test]
    fn test_private_dimension_not_found_by_name() {
        let mut ds = Dataset::new("memory://private");
        let shared = ds.add_dimension(Dimension::new("n", 4));
        let private = ds.add_dimension(Dimension::private("n", 4));
        assert_ne!(shared, private);
        assert_eq!(ds.find_dimension("n"), Some(shared));
    }

    #[test]
    fn test_read_prefers_in_memory_values() {
        let ds = small_dataset().with_reader(Arc::new(FailingReader));
        let raw = ds.read_by_name("time").unwrap();
        assert_eq!(raw.to_f64_vec(false), Some(vec![0.0, 1.0, 2.0]));

        let err = ds.read_by_name("data").unwrap_err();
        assert!(matches!(err, CdmError::ReadFailed { .. }));
    }

    #[test]
    fn test_read_checks_shape() {
        let mut ds = small_dataset();
        ds.find_variable_mut("time").unwrap().values = Some(RawArray::from(vec![1.0f64]));
        let err = ds.read_by_name("time").unwrap_err();
        assert!(matches!(err, CdmError::ShapeMismatch { expected: 3, actual: 1, .. }));
    }

    #[test]
    fn test_read_without_reader() {
        let ds = small_dataset();
        assert!(matches!(ds.read_by_name("data"), Err(CdmError::NoData(_))));
        assert!(matches!(
            ds.read_by_name("nope"),
            Err(CdmError::VariableNotFound(_))
        ));
    }
}
