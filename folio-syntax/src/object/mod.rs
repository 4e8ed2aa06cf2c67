//! PDF objects.

mod dict;
mod name;
mod number;
mod store;
mod stream;
mod string;

pub use dict::{Dict, keys};
pub use name::Name;
pub use number::Number;
pub use store::{ObjRef, ObjectStore, Resolve, ResolveExt};
pub use stream::Stream;
pub use string::PdfString;

pub(crate) use name::hex_value;

use crate::parser::ObjectParser;

/// A PDF array.
pub type Array = Vec<Object>;

/// A primitive PDF object.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// The null object.
    Null,
    /// A boolean.
    Boolean(bool),
    /// An integer or real number.
    Number(Number),
    /// A literal or hex string.
    String(PdfString),
    /// A name.
    Name(Name),
    /// An array.
    Array(Array),
    /// A dictionary.
    Dict(Dict),
    /// A stream.
    Stream(Stream),
    /// A reference to an indirect object.
    Ref(ObjRef),
}

impl Object {
    /// Parse a single object from bytes. Mostly useful for tests and
    /// for callers that hold objects in serialized form.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        ObjectParser::new(data).parse_object()
    }

    /// Convert the object into `T`.
    pub fn cast<T: FromObject>(&self) -> Option<T> {
        T::from_object(self)
    }

    /// The object as a number, if it is one.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The object as a name, if it is one.
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Self::Name(n) => Some(n),
            _ => None,
        }
    }

    /// The object as a dictionary. Streams yield their dictionary.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(d) => Some(d),
            Self::Stream(s) => Some(s.dict()),
            _ => None,
        }
    }

    /// The object as an array, if it is one.
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The object as a stream, if it is one.
    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Self::Stream(s) => Some(s),
            _ => None,
        }
    }
}

/// Conversion from a borrowed [`Object`] into a concrete type.
pub trait FromObject: Sized {
    /// Attempt the conversion.
    fn from_object(obj: &Object) -> Option<Self>;
}

impl FromObject for Object {
    fn from_object(obj: &Object) -> Option<Self> {
        Some(obj.clone())
    }
}

impl FromObject for Number {
    fn from_object(obj: &Object) -> Option<Self> {
        obj.as_number()
    }
}

impl FromObject for bool {
    fn from_object(obj: &Object) -> Option<Self> {
        match obj {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromObject for f32 {
    fn from_object(obj: &Object) -> Option<Self> {
        obj.as_number().map(|n| n.as_f32())
    }
}

impl FromObject for f64 {
    fn from_object(obj: &Object) -> Option<Self> {
        obj.as_number().map(|n| n.as_f64())
    }
}

macro_rules! int_object {
    ($($t:ty),*) => {
        $(
            impl FromObject for $t {
                fn from_object(obj: &Object) -> Option<Self> {
                    obj.as_number().and_then(|n| n.as_i64().try_into().ok())
                }
            }
        )*
    };
}

int_object!(i32, i64, u8, u16, u32, usize);

impl FromObject for Name {
    fn from_object(obj: &Object) -> Option<Self> {
        obj.as_name().cloned()
    }
}

impl FromObject for PdfString {
    fn from_object(obj: &Object) -> Option<Self> {
        match obj {
            Object::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromObject for Dict {
    fn from_object(obj: &Object) -> Option<Self> {
        obj.as_dict().cloned()
    }
}

impl FromObject for Stream {
    fn from_object(obj: &Object) -> Option<Self> {
        obj.as_stream().cloned()
    }
}

impl FromObject for ObjRef {
    fn from_object(obj: &Object) -> Option<Self> {
        match obj {
            Object::Ref(r) => Some(*r),
            _ => None,
        }
    }
}

impl<T: FromObject> FromObject for Vec<T> {
    fn from_object(obj: &Object) -> Option<Self> {
        obj.as_array()?.iter().map(T::from_object).collect()
    }
}

impl<T: FromObject, const N: usize> FromObject for [T; N] {
    fn from_object(obj: &Object) -> Option<Self> {
        Vec::<T>::from_object(obj)?.try_into().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casts() {
        let obj = Object::from_bytes(b"[1 2.5 3]").unwrap();
        assert_eq!(obj.cast::<Vec<f32>>(), Some(vec![1.0, 2.5, 3.0]));
        assert_eq!(obj.cast::<[f32; 3]>(), Some([1.0, 2.5, 3.0]));
        assert_eq!(obj.cast::<[f32; 2]>(), None);
        assert_eq!(obj.cast::<Vec<u8>>(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn negative_to_unsigned_fails() {
        assert_eq!(Object::from_bytes(b"-1").unwrap().cast::<u32>(), None);
    }
}
