//! Descriptor pool: qualified message-type names mapped to field layouts.
//!
//! Stands in for the protocol-schema source indexed tables decode their
//! values against. Loaded from a JSON file of the shape
//! `{"types": {"pkg.Name": {"fields": [{"name": "x", "type": "int64"}]}}}`.

use std::collections::HashMap;
use std::fs;

use datafusion::arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};
use crate::provider::Column;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptorPool {
    pub types: HashMap<String, MessageDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDescriptor {
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Int64,
    Double,
    Bool,
}

impl DescriptorPool {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            HarnessError::InvalidArgument(format!("malformed descriptor pool: {e}"))
        })
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            HarnessError::NotFound(format!("cannot open descriptor pool file '{path}': {e}"))
        })?;
        Self::from_json(&text)
    }

    /// Exact, case-sensitive lookup by qualified type name.
    pub fn get(&self, name: &str) -> Option<&MessageDescriptor> {
        self.types.get(name)
    }
}

impl MessageDescriptor {
    pub fn columns(&self) -> Vec<Column> {
        self.fields
            .iter()
            .map(|f| Column::new(f.name.as_str(), f.kind.data_type()))
            .collect()
    }
}

impl FieldKind {
    pub fn data_type(&self) -> DataType {
        match self {
            FieldKind::String => DataType::Utf8,
            FieldKind::Int64 => DataType::Int64,
            FieldKind::Double => DataType::Float64,
            FieldKind::Bool => DataType::Boolean,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Int64 => "int64",
            FieldKind::Double => "double",
            FieldKind::Bool => "bool",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POOL: &str = r#"{
        "types": {
            "zoo.Animal": {
                "fields": [
                    {"name": "name", "type": "string"},
                    {"name": "legs", "type": "int64"},
                    {"name": "weight", "type": "double"},
                    {"name": "tame", "type": "bool"}
                ]
            }
        }
    }"#;

    #[test]
    fn loads_and_resolves_types() {
        let pool = DescriptorPool::from_json(POOL).unwrap();
        let animal = pool.get("zoo.Animal").unwrap();
        let columns = animal.columns();
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[0].data_type, DataType::Utf8);
        assert_eq!(columns[1].data_type, DataType::Int64);
        assert_eq!(columns[2].data_type, DataType::Float64);
        assert_eq!(columns[3].data_type, DataType::Boolean);
        assert!(pool.get("zoo.animal").is_none(), "lookup is case-sensitive");
    }

    #[test]
    fn malformed_json_is_invalid_argument() {
        let err = DescriptorPool::from_json("{not json").unwrap_err();
        assert!(matches!(err, HarnessError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_field_kind_is_rejected() {
        let err = DescriptorPool::from_json(
            r#"{"types": {"T": {"fields": [{"name": "x", "type": "decimal"}]}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::InvalidArgument(_)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = DescriptorPool::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, HarnessError::NotFound(_)));
    }
}
