//! Vertex types and attributes.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// RGBA color with 8-bit components.
///
/// Colors double as region labels: two vertices belong to the same region
/// exactly when all four channels are equal, so the type is `Eq + Hash + Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VertexColor {
    /// Red component (0-255).
    pub r: u8,
    /// Green component (0-255).
    pub g: u8,
    /// Blue component (0-255).
    pub b: u8,
    /// Alpha component (0-255).
    pub a: u8,
}

impl VertexColor {
    /// Create a new opaque color from RGB components.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::VertexColor;
    ///
    /// let red = VertexColor::new(255, 0, 0);
    /// assert_eq!(red.r, 255);
    /// assert_eq!(red.a, 255);
    /// ```
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color from all four RGBA components.
    #[inline]
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from floating point values in [0, 1] range.
    ///
    /// Values are clamped to the valid range.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::VertexColor;
    ///
    /// let color = VertexColor::from_float(1.0, 0.5, 0.0, 1.0);
    /// assert_eq!(color.r, 255);
    /// assert_eq!(color.g, 127);
    /// assert_eq!(color.b, 0);
    /// ```
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    // Truncation and sign loss are safe: values are clamped to [0.0, 1.0] before * 255.0
    pub fn from_float(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: (r.clamp(0.0, 1.0) * 255.0) as u8,
            g: (g.clamp(0.0, 1.0) * 255.0) as u8,
            b: (b.clamp(0.0, 1.0) * 255.0) as u8,
            a: (a.clamp(0.0, 1.0) * 255.0) as u8,
        }
    }

    /// Channels as an array `[r, g, b, a]`.
    #[inline]
    #[must_use]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Black color (0, 0, 0).
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// White color (255, 255, 255).
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Red color (255, 0, 0).
    pub const RED: Self = Self::new(255, 0, 0);

    /// Green color (0, 255, 0).
    pub const GREEN: Self = Self::new(0, 255, 0);

    /// Blue color (0, 0, 255).
    pub const BLUE: Self = Self::new(0, 0, 255);
}

impl Default for VertexColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[u8; 4]> for VertexColor {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self::rgba(r, g, b, a)
    }
}

impl std::fmt::Display for VertexColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.r, self.g, self.b, self.a)
    }
}

/// A vertex in 3D space with an optional color label.
///
/// # Example
///
/// ```
/// use mesh_types::{Vertex, Point3};
///
/// let v1 = Vertex::new(Point3::new(1.0, 2.0, 3.0));
/// let v2 = Vertex::from_coords(1.0, 2.0, 3.0);
///
/// assert_eq!(v1.position, v2.position);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vertex {
    /// 3D position.
    pub position: Point3<f64>,

    /// Per-vertex color, if the source mesh carried one.
    pub color: Option<VertexColor>,
}

impl Vertex {
    /// Create a new vertex with only position set.
    #[inline]
    #[must_use]
    pub const fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            color: None,
        }
    }

    /// Create a vertex from raw coordinates.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::Vertex;
    ///
    /// let v = Vertex::from_coords(1.0, 2.0, 3.0);
    /// assert_eq!(v.position.z, 3.0);
    /// assert!(v.color.is_none());
    /// ```
    #[inline]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Point3::new is not const in nalgebra
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }

    /// Attach a color.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::{Vertex, VertexColor};
    ///
    /// let v = Vertex::from_coords(0.0, 0.0, 0.0).with_color(VertexColor::RED);
    /// assert_eq!(v.color, Some(VertexColor::RED));
    /// ```
    #[inline]
    #[must_use]
    pub const fn with_color(mut self, color: VertexColor) -> Self {
        self.color = Some(color);
        self
    }
}

impl From<Point3<f64>> for Vertex {
    fn from(position: Point3<f64>) -> Self {
        Self::new(position)
    }
}

impl From<[f64; 3]> for Vertex {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::from_coords(x, y, z)
    }
}
