//! Bounding boxes in COCO's `[x, y, width, height]` layout.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

use super::space::{Normalized, Pixel};

/// An axis-aligned box stored as top-left corner plus size.
///
/// The `TSpace` parameter is either [`Pixel`] or [`Normalized`]. Nothing
/// forces the size to be positive; the parser keeps whatever the corpus says.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYWH<TSpace> {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> BBoxXYWH<TSpace> {
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            _space: PhantomData,
        }
    }

    /// Returns the box as `[x, y, width, height]`.
    #[inline]
    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

impl BBoxXYWH<Pixel> {
    /// Builds a pixel box from a raw COCO bbox array.
    ///
    /// Returns `None` unless the slice has exactly four values; an empty or
    /// truncated bbox makes the annotation unusable.
    pub fn from_coco_slice(values: &[f64]) -> Option<Self> {
        match values {
            [x, y, w, h] => Some(Self::new(*x, *y, *w, *h)),
            _ => None,
        }
    }

    /// Scales the box by the image size.
    ///
    /// Returns `None` when either image dimension is not a positive finite
    /// number, since the result would be meaningless.
    pub fn normalize(&self, image_width: f64, image_height: f64) -> Option<BBoxXYWH<Normalized>> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(image_width) || !valid(image_height) {
            return None;
        }
        Some(BBoxXYWH::new(
            self.x / image_width,
            self.y / image_height,
            self.width / image_width,
            self.height / image_height,
        ))
    }
}

impl<TSpace> std::fmt::Debug for BBoxXYWH<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYWH")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

// Serialized as a plain `[x, y, w, h]` array, same as COCO.
impl<TSpace> Serialize for BBoxXYWH<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

impl<'de, TSpace> Deserialize<'de> for BBoxXYWH<TSpace> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [x, y, w, h] = <[f64; 4]>::deserialize(deserializer)?;
        Ok(Self::new(x, y, w, h))
    }
}
