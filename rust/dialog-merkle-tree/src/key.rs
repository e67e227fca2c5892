use std::borrow::Cow;

/// A key used to order entries in a [Tree](crate::Tree).
pub trait KeyType: std::fmt::Debug + Clone + Ord {
    /// Get the raw bytes of this [`KeyType`], as fed to a leaf digest when
    /// the tree hashes keys.
    fn bytes(&self) -> Cow<'_, [u8]>;
}

/// A value that may be stored within a [Tree](crate::Tree)
pub trait ValueType: std::fmt::Debug + Clone + PartialEq {
    /// Get the raw bytes of this [`ValueType`], as fed to a leaf digest.
    fn bytes(&self) -> Cow<'_, [u8]>;
}

impl KeyType for Vec<u8> {
    fn bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_ref())
    }
}

impl ValueType for Vec<u8> {
    fn bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_ref())
    }
}

impl KeyType for String {
    fn bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl ValueType for String {
    fn bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

// Integers hash as big-endian so byte order agrees with numeric order.
macro_rules! integer_types {
    ($($integer:ty),*) => {
        $(
            impl KeyType for $integer {
                fn bytes(&self) -> Cow<'_, [u8]> {
                    Cow::Owned(self.to_be_bytes().to_vec())
                }
            }

            impl ValueType for $integer {
                fn bytes(&self) -> Cow<'_, [u8]> {
                    Cow::Owned(self.to_be_bytes().to_vec())
                }
            }
        )*
    };
}

integer_types!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
