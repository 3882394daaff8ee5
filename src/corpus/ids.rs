//! Newtype IDs for corpus elements.
//!
//! COCO uses plain integers for images, annotations and categories. Wrapping
//! them keeps an image id from being passed where a category id is expected,
//! which matters in the sampler where both are used as map keys side by side.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! corpus_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Creates a new id from its raw COCO value.
            #[inline]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value.
            #[inline]
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self::new(id)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

corpus_id!(
    /// Identifier of an image in the corpus.
    ImageId
);

corpus_id!(
    /// Identifier of a single annotation (one object instance).
    AnnotationId
);

corpus_id!(
    /// Identifier of a category (class label).
    CategoryId
);
