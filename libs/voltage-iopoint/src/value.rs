//! Point value model
//!
//! - [`PointValue`]: the timestamped value/quality/error tuple held by a state cell
//! - [`PointData`]: value types a point can carry (one instantiation per type)
//! - [`DataValue`]: type-erased attribute value for introspection
//! - [`ChangeMask`]: fields that differ from the previous commit

use crate::error::ErrorCode;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Quality
// ============================================================================

/// Quality of the most recent value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    #[default]
    Bad,
}

impl Quality {
    pub fn is_good(&self) -> bool {
        matches!(self, Quality::Good)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Good => "good",
            Quality::Bad => "bad",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Data types
// ============================================================================

/// Data type reported by a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bool,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::UInt32 => "uint32",
            DataType::UInt64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-erased value of a single attribute
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Timestamp(Timestamp),
    Quality(Quality),
    Error(ErrorCode),
}

impl DataValue {
    /// Integer form for numeric exports
    ///
    /// Errors use [`ErrorCode::code`] and timestamps their epoch millis.
    /// Floats and qualities have no integer form.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DataValue::Bool(v) => Some(i64::from(*v)),
            DataValue::Int(v) => Some(*v),
            DataValue::UInt(v) => i64::try_from(*v).ok(),
            DataValue::Timestamp(v) => Some(v.as_millis()),
            DataValue::Error(v) => Some(v.code()),
            DataValue::Float(_) | DataValue::Quality(_) => None,
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Bool(v) => write!(f, "{}", v),
            DataValue::Int(v) => write!(f, "{}", v),
            DataValue::UInt(v) => write!(f, "{}", v),
            DataValue::Float(v) => write!(f, "{}", v),
            DataValue::Timestamp(v) => write!(f, "{}", v),
            DataValue::Quality(v) => write!(f, "{}", v),
            DataValue::Error(v) => write!(f, "{}", v),
        }
    }
}

/// Value types an I/O point can carry
///
/// Comparison uses `PartialEq`, so a float NaN is always reported as a change.
pub trait PointData: Clone + PartialEq + Default + fmt::Debug + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    fn to_data_value(&self) -> DataValue;
}

macro_rules! impl_point_data {
    ($ty:ty, $data_type:ident, $variant:ident, $conv:ty) => {
        impl PointData for $ty {
            const DATA_TYPE: DataType = DataType::$data_type;

            fn to_data_value(&self) -> DataValue {
                DataValue::$variant(<$conv>::from(*self))
            }
        }
    };
}

impl_point_data!(bool, Bool, Bool, bool);
impl_point_data!(i32, Int32, Int, i64);
impl_point_data!(i64, Int64, Int, i64);
impl_point_data!(u32, UInt32, UInt, u64);
impl_point_data!(u64, UInt64, UInt, u64);
impl_point_data!(f32, Float32, Float, f64);
impl_point_data!(f64, Float64, Float, f64);

// ============================================================================
// PointValue
// ============================================================================

/// Observable state of one point direction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointValue<T> {
    /// Time of the most recent commit
    pub update_time: Timestamp,
    /// Last successfully transferred value
    pub value: T,
    /// Time of the most recent commit that changed value, quality or error
    pub change_time: Timestamp,
    pub quality: Quality,
    pub error: ErrorCode,
}

impl<T: Default> Default for PointValue<T> {
    fn default() -> Self {
        Self {
            update_time: Timestamp::MIN,
            value: T::default(),
            change_time: Timestamp::MIN,
            quality: Quality::Bad,
            error: ErrorCode::NotConnected,
        }
    }
}

// ============================================================================
// ChangeMask
// ============================================================================

/// Fields of a commit that differ from the previous snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeMask {
    pub value_changed: bool,
    pub quality_changed: bool,
    pub error_changed: bool,
}

impl ChangeMask {
    /// Mask with no field set
    pub const NONE: ChangeMask = ChangeMask {
        value_changed: false,
        quality_changed: false,
        error_changed: false,
    };

    pub fn any_changed(&self) -> bool {
        self.value_changed | self.quality_changed | self.error_changed
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_default_point_value() {
        let state = PointValue::<f64>::default();
        assert_eq!(state.quality, Quality::Bad);
        assert_eq!(state.error, ErrorCode::NotConnected);
        assert!(state.update_time.is_min());
        assert!(state.change_time.is_min());
        assert_eq!(state.value, 0.0);
    }

    #[test]
    fn test_data_types() {
        assert_eq!(<f64 as PointData>::DATA_TYPE, DataType::Float64);
        assert_eq!(<bool as PointData>::DATA_TYPE, DataType::Bool);
        assert_eq!(<u32 as PointData>::DATA_TYPE, DataType::UInt32);
        assert_eq!(DataType::Int64.to_string(), "int64");
    }

    #[test]
    fn test_to_data_value_widens() {
        assert_eq!(7i32.to_data_value(), DataValue::Int(7));
        assert_eq!(7u32.to_data_value(), DataValue::UInt(7));
        assert_eq!(1.5f32.to_data_value(), DataValue::Float(1.5));
        assert_eq!(true.to_data_value(), DataValue::Bool(true));
    }

    #[test]
    fn test_as_i64_exports_error_codes() {
        let error = ErrorCode::Rejected { code: -3 };
        let exported = DataValue::Error(error).as_i64().unwrap();
        assert_eq!(exported, error.code());
        assert_eq!(ErrorCode::from_code(exported), Some(error));

        assert_eq!(DataValue::Bool(true).as_i64(), Some(1));
        assert_eq!(DataValue::UInt(u64::MAX).as_i64(), None);
        assert_eq!(DataValue::Float(1.0).as_i64(), None);
    }

    #[test]
    fn test_change_mask_any() {
        assert!(!ChangeMask::NONE.any_changed());
        let mask = ChangeMask {
            error_changed: true,
            ..ChangeMask::NONE
        };
        assert!(mask.any_changed());
    }
}
