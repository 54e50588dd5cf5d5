//! Color keys and the sources that supply them.

use std::fmt;
use std::str::FromStr;

use mesh_types::{IndexedMesh, VertexColor};

use crate::error::{RegionError, RegionResult};

/// Exact RGBA color identifying one region.
///
/// Two vertices belong to the same region iff their keys are equal. Keys
/// order lexicographically by `(r, g, b, a)`, which is the order regions are
/// visited in.
///
/// # Example
///
/// ```
/// use mesh_region::ColorKey;
///
/// let key: ColorKey = "255,0,0".parse().unwrap();
/// assert_eq!(key, ColorKey::new(255, 0, 0, 255));
/// assert_eq!(key.to_string(), "255,0,0,255");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorKey([u8; 4]);

impl ColorKey {
    /// Create a key from RGBA channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Channels as `[r, g, b, a]`.
    #[must_use]
    pub const fn channels(self) -> [u8; 4] {
        self.0
    }
}

impl From<VertexColor> for ColorKey {
    fn from(color: VertexColor) -> Self {
        Self(color.to_array())
    }
}

impl From<ColorKey> for VertexColor {
    fn from(key: ColorKey) -> Self {
        Self::from(key.0)
    }
}

impl fmt::Display for ColorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "{r},{g},{b},{a}")
    }
}

impl FromStr for ColorKey {
    type Err = RegionError;

    /// Parse `"r,g,b"` or `"r,g,b,a"`; alpha defaults to 255.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RegionError::InvalidColorKey {
            input: s.to_string(),
        };

        let channels = s
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;

        match channels.as_slice() {
            &[r, g, b] => Ok(Self::new(r, g, b, 255)),
            &[r, g, b, a] => Ok(Self::new(r, g, b, a)),
            _ => Err(invalid()),
        }
    }
}

/// A colored surface whose per-vertex colors can be segmented.
#[derive(Debug, Clone, Copy)]
pub enum ColorSource<'a> {
    /// A triangle mesh carrying 8-bit vertex colors.
    Mesh(&'a IndexedMesh),

    /// Point-colored data: a flat `vertex_count × channels` buffer of color
    /// values in `[0, 255]` plus the triangle connectivity.
    Points {
        /// Row-major color values.
        colors: &'a [f32],
        /// Channels per vertex; 3 (RGB) or 4 (RGBA).
        channels: usize,
        /// Triangle faces over the colored points.
        faces: &'a [[u32; 3]],
    },
}

impl<'a> ColorSource<'a> {
    /// Resolve one color key per vertex plus the faces.
    ///
    /// Float channels are truncated to integers.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::UnsupportedColorSource`] if a mesh vertex has
    /// no color, the channel count is not 3 or 4, or the buffer length is
    /// not a multiple of the channel count.
    pub fn resolve(self) -> RegionResult<(Vec<ColorKey>, &'a [[u32; 3]])> {
        match self {
            Self::Mesh(mesh) => {
                let colors = mesh.colors().ok_or_else(|| {
                    RegionError::unsupported_color_source("mesh has uncolored vertices")
                })?;
                Ok((colors.into_iter().map(ColorKey::from).collect(), &mesh.faces))
            }
            Self::Points {
                colors,
                channels,
                faces,
            } => {
                if channels != 3 && channels != 4 {
                    return Err(RegionError::unsupported_color_source(format!(
                        "{channels} color channels"
                    )));
                }
                if colors.len() % channels != 0 {
                    return Err(RegionError::unsupported_color_source(format!(
                        "{} color values do not split into {channels} channels",
                        colors.len()
                    )));
                }
                let keys = colors
                    .chunks_exact(channels)
                    .map(|c| {
                        let alpha = c.get(3).map_or(255, |&a| channel_to_u8(a));
                        ColorKey::new(
                            channel_to_u8(c[0]),
                            channel_to_u8(c[1]),
                            channel_to_u8(c[2]),
                            alpha,
                        )
                    })
                    .collect();
                Ok((keys, faces))
            }
        }
    }
}

impl<'a> From<&'a IndexedMesh> for ColorSource<'a> {
    fn from(mesh: &'a IndexedMesh) -> Self {
        Self::Mesh(mesh)
    }
}

#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel_to_u8(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{Point3, Vertex};

    #[test]
    fn parse_and_display() {
        let key: ColorKey = "10, 20, 30, 40".parse().unwrap();
        assert_eq!(key.channels(), [10, 20, 30, 40]);
        assert_eq!(key.to_string(), "10,20,30,40");

        assert!("1,2".parse::<ColorKey>().is_err());
        assert!("1,2,3,4,5".parse::<ColorKey>().is_err());
        assert!("256,0,0".parse::<ColorKey>().is_err());
        assert!("red".parse::<ColorKey>().is_err());
    }

    #[test]
    fn keys_order_lexicographically() {
        let red = ColorKey::from(VertexColor::RED);
        let blue = ColorKey::from(VertexColor::BLUE);
        assert!(blue < red);
    }

    #[test]
    fn mesh_source_requires_colors() {
        let mut mesh = IndexedMesh::new();
        mesh.vertices.push(Vertex::new(Point3::origin()).with_color(VertexColor::RED));
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));

        let result = ColorSource::from(&mesh).resolve();
        assert!(matches!(result, Err(RegionError::UnsupportedColorSource { .. })));
    }

    #[test]
    fn point_source_truncates_channels() {
        let colors = [255.0, 0.9, 12.7, 0.0, 0.0, 255.0];
        let faces = [];
        let (keys, _) = ColorSource::Points {
            colors: &colors,
            channels: 3,
            faces: &faces,
        }
        .resolve()
        .unwrap();

        assert_eq!(keys, vec![ColorKey::new(255, 0, 12, 255), ColorKey::new(0, 0, 255, 255)]);
    }

    #[test]
    fn point_source_rejects_bad_channel_count() {
        let colors = [0.0; 10];
        let result = ColorSource::Points {
            colors: &colors,
            channels: 5,
            faces: &[],
        }
        .resolve();
        assert!(matches!(result, Err(RegionError::UnsupportedColorSource { .. })));

        let result = ColorSource::Points {
            colors: &colors,
            channels: 3,
            faces: &[],
        }
        .resolve();
        assert!(matches!(result, Err(RegionError::UnsupportedColorSource { .. })));
    }
}
