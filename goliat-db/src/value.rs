//! Parameter values and the bind-side conversion trait.

use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;

use super::error::{BindError, DbResult};

/// A value bound to one statement parameter.
///
/// Consumed by exactly one bind call. Text and blob payloads are copied by
/// the engine, so the source buffer may be reused as soon as the bind
/// returns.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    /// SQL NULL.
    Null,
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Binary blob. An empty blob is bound as a zero-length blob, not NULL.
    Blob(Vec<u8>),
    /// Engine-allocated blob of `n` zero bytes, to be filled through
    /// [`Blob`](super::Blob) afterwards.
    ZeroBlob(u64),
}

/// Owned copy of a column's dynamic value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Binary blob.
    Blob(Vec<u8>),
}

/// Marker that binds SQL NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Null;

/// Marker that binds an engine-allocated zero-filled blob of the given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroBlob(pub u64);

/// Produces the [`BindValue`] for a parameter.
///
/// Implemented for the native kinds below. Caller-defined types implement
/// it to become bindable:
///
/// ```
/// use goliat_db::{BindValue, DbResult, ToBindValue};
///
/// struct Celsius(f64);
///
/// impl ToBindValue for Celsius {
///     fn to_bind_value(&self) -> DbResult<BindValue> {
///         Ok(BindValue::Float(self.0))
///     }
/// }
/// ```
pub trait ToBindValue {
    /// Converts `self` into a bindable value.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::UnsupportedType`] when the value has no engine
    /// representation.
    fn to_bind_value(&self) -> DbResult<BindValue>;
}

impl ToBindValue for BindValue {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        Ok(self.clone())
    }
}

impl ToBindValue for Value {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        Ok(match self {
            Self::Null => BindValue::Null,
            Self::Integer(v) => BindValue::Int64(*v),
            Self::Float(v) => BindValue::Float(*v),
            Self::Text(v) => BindValue::Text(v.clone()),
            Self::Blob(v) => BindValue::Blob(v.clone()),
        })
    }
}

impl ToBindValue for Null {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        Ok(BindValue::Null)
    }
}

impl ToBindValue for ZeroBlob {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        Ok(BindValue::ZeroBlob(self.0))
    }
}

impl ToBindValue for bool {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        Ok(BindValue::Int(i32::from(*self)))
    }
}

macro_rules! bind_as_int {
    ($($t:ty),*) => {$(
        impl ToBindValue for $t {
            fn to_bind_value(&self) -> DbResult<BindValue> {
                Ok(BindValue::Int(i32::from(*self)))
            }
        }
    )*};
}

bind_as_int!(i8, i16, i32, u8, u16);

impl ToBindValue for u32 {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        Ok(BindValue::Int64(i64::from(*self)))
    }
}

impl ToBindValue for i64 {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        Ok(BindValue::Int64(*self))
    }
}

macro_rules! bind_as_checked_int64 {
    ($($t:ty),*) => {$(
        impl ToBindValue for $t {
            fn to_bind_value(&self) -> DbResult<BindValue> {
                i64::try_from(*self)
                    .map(BindValue::Int64)
                    .map_err(|_| {
                        BindError::UnsupportedType(concat!(stringify!($t), " above i64::MAX")).into()
                    })
            }
        }
    )*};
}

bind_as_checked_int64!(u64, isize, usize);

impl ToBindValue for f64 {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        Ok(BindValue::Float(*self))
    }
}

impl ToBindValue for f32 {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        Err(BindError::UnsupportedType("f32 (use f64 instead)").into())
    }
}

impl ToBindValue for str {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        Ok(BindValue::Text(self.to_owned()))
    }
}

impl ToBindValue for String {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        self.as_str().to_bind_value()
    }
}

impl ToBindValue for [u8] {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        Ok(BindValue::Blob(self.to_vec()))
    }
}

impl ToBindValue for Vec<u8> {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        self.as_slice().to_bind_value()
    }
}

impl<const N: usize> ToBindValue for [u8; N] {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        self.as_slice().to_bind_value()
    }
}

impl<T: ToBindValue> ToBindValue for Option<T> {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        self.as_ref()
            .map_or(Ok(BindValue::Null), ToBindValue::to_bind_value)
    }
}

impl<T: ToBindValue + ?Sized> ToBindValue for &T {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        (**self).to_bind_value()
    }
}

impl<T: ToBindValue + ?Sized> ToBindValue for Box<T> {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        (**self).to_bind_value()
    }
}

impl<T: ToBindValue + ?Sized> ToBindValue for Rc<T> {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        (**self).to_bind_value()
    }
}

impl<T: ToBindValue + ?Sized> ToBindValue for Arc<T> {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        (**self).to_bind_value()
    }
}

impl<T: ToBindValue + ToOwned + ?Sized> ToBindValue for Cow<'_, T> {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        (**self).to_bind_value()
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Blob(v.to_vec())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Convenience macro for building parameter lists.
///
/// Usage: `params![1_i64, blob.as_slice(), "text", None::<i64>]`
#[macro_export]
macro_rules! params {
    () => {
        &[] as &[&dyn $crate::ToBindValue]
    };
    ($($val:expr),+ $(,)?) => {
        &[$(&$val as &dyn $crate::ToBindValue),+] as &[&dyn $crate::ToBindValue]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_kinds() {
        assert_eq!(true.to_bind_value(), Ok(BindValue::Int(1)));
        assert_eq!(false.to_bind_value(), Ok(BindValue::Int(0)));
        assert_eq!(7_u8.to_bind_value(), Ok(BindValue::Int(7)));
        assert_eq!(u32::MAX.to_bind_value(), Ok(BindValue::Int64(4_294_967_295)));
        assert_eq!("hi".to_bind_value(), Ok(BindValue::Text("hi".into())));
        assert_eq!(
            vec![1_u8, 2].to_bind_value(),
            Ok(BindValue::Blob(vec![1, 2]))
        );
        assert_eq!(ZeroBlob(8).to_bind_value(), Ok(BindValue::ZeroBlob(8)));
        assert_eq!(None::<i64>.to_bind_value(), Ok(BindValue::Null));
        assert_eq!(Some(3_i64).to_bind_value(), Ok(BindValue::Int64(3)));
    }

    #[test]
    fn test_unsupported_kinds() {
        let err = 1.5_f32.to_bind_value().expect_err("f32 rejected");
        assert!(matches!(
            err,
            crate::DbError::Bind(BindError::UnsupportedType(_))
        ));
        let err = u64::MAX.to_bind_value().expect_err("too large");
        assert!(matches!(
            err,
            crate::DbError::Bind(BindError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_params_macro_erases_types() {
        let blob = vec![9_u8];
        let params = params![1_i64, "two", blob.as_slice(), Null];
        assert_eq!(params.len(), 4);
        assert_eq!(params[2].to_bind_value(), Ok(BindValue::Blob(vec![9])));
        assert!(params![].is_empty());
    }
}
