//! Color-based segmentation of a template mesh.
//!
//! Every distinct vertex color becomes one [`Region`]. Within a region a
//! vertex is a *contour* vertex if any one-ring neighbor has a different
//! color, otherwise a *feature* vertex. Regions with fewer than
//! [`MIN_FEATURE_VERTICES`] feature vertices are treated as paint noise and
//! absorbed into their neighbors.

use std::collections::BTreeMap;

use tracing::debug;

use crate::adjacency::VertexAdjacency;
use crate::color::{ColorKey, ColorSource};
use crate::error::{RegionError, RegionResult};

/// Regions with fewer feature vertices than this are absorbed.
pub const MIN_FEATURE_VERTICES: usize = 3;

/// Vertices of a single color, split into interior and boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    /// Vertices whose neighbors all share this color.
    pub feature: Vec<u32>,
    /// Vertices with at least one differently colored neighbor.
    pub contour: Vec<u32>,
}

impl Region {
    /// Total number of vertices (feature + contour).
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.feature.len() + self.contour.len()
    }

    /// Feature and contour vertices merged and sorted ascending.
    #[must_use]
    pub fn all_vertices(&self) -> Vec<u32> {
        let mut all: Vec<u32> = self.feature.iter().chain(&self.contour).copied().collect();
        all.sort_unstable();
        all
    }
}

/// Regions of a segmented mesh, keyed and iterated by [`ColorKey`].
///
/// # Example
///
/// ```
/// use mesh_types::{IndexedMesh, Vertex, VertexColor};
/// use mesh_region::{segment_by_color, ColorKey};
///
/// let mut mesh = IndexedMesh::new();
/// for i in 0..4 {
///     mesh.vertices.push(Vertex::from_coords(f64::from(i), 0.0, 0.0).with_color(VertexColor::RED));
/// }
/// mesh.faces.push([0, 1, 2]);
/// mesh.faces.push([1, 3, 2]);
///
/// let regions = segment_by_color(&mesh).unwrap();
/// let red = regions.get(ColorKey::from(VertexColor::RED)).unwrap();
/// assert_eq!(red.feature, vec![0, 1, 2, 3]);
/// assert!(red.contour.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionMap {
    regions: BTreeMap<ColorKey, Region>,
}

impl RegionMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Region for `key`, if present.
    #[must_use]
    pub fn get(&self, key: ColorKey) -> Option<&Region> {
        self.regions.get(&key)
    }

    /// Region for `key`, or [`RegionError::RegionNotFound`].
    ///
    /// # Errors
    ///
    /// Returns an error if no region has this color.
    pub fn require(&self, key: ColorKey) -> RegionResult<&Region> {
        self.get(key).ok_or_else(|| RegionError::RegionNotFound {
            key: key.to_string(),
        })
    }

    /// Check if a region with this color exists.
    #[must_use]
    pub fn contains(&self, key: ColorKey) -> bool {
        self.regions.contains_key(&key)
    }

    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Check if there are no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region colors in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = ColorKey> + '_ {
        self.regions.keys().copied()
    }

    /// Iterate over `(color, region)` pairs in ascending color order.
    pub fn iter(&self) -> impl Iterator<Item = (ColorKey, &Region)> {
        self.regions.iter().map(|(&k, r)| (k, r))
    }

    /// Feature vertex counts per region, in key order.
    #[must_use]
    pub fn feature_counts(&self) -> Vec<(ColorKey, usize)> {
        self.iter().map(|(k, r)| (k, r.feature.len())).collect()
    }
}

impl IntoIterator for RegionMap {
    type Item = (ColorKey, Region);
    type IntoIter = std::collections::btree_map::IntoIter<ColorKey, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.into_iter()
    }
}

/// Segment a colored surface into regions.
///
/// Accepts anything convertible into a [`ColorSource`], in particular
/// `&IndexedMesh`.
///
/// After bucketing, each region with fewer than [`MIN_FEATURE_VERTICES`]
/// feature vertices is absorbed. Regions are visited in key order and the
/// size check happens at visit time. Each feature vertex of a small region,
/// in list order, goes to the most frequent color among its
/// one-ring neighbors (the first color encountered wins a tie) as both a
/// feature and a contour vertex. The first feature vertex whose majority
/// color is its own ends the region's pass. Contour vertices of a small
/// region are never reassigned. All small regions are removed afterwards,
/// so their unassigned vertices belong to no region.
///
/// # Errors
///
/// Returns [`RegionError::UnsupportedColorSource`] if the source has no
/// usable per-vertex colors, [`RegionError::EmptyMesh`] if it has no
/// vertices, or [`RegionError::InvalidVertexIndex`] for dangling faces.
pub fn segment_by_color<'a>(source: impl Into<ColorSource<'a>>) -> RegionResult<RegionMap> {
    let (colors, faces) = source.into().resolve()?;
    if colors.is_empty() {
        return Err(RegionError::EmptyMesh);
    }
    let adjacency = VertexAdjacency::build(colors.len(), faces)?;

    let mut regions: BTreeMap<ColorKey, Region> = BTreeMap::new();
    for (idx, &color) in colors.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let idx = idx as u32;
        let region = regions.entry(color).or_default();
        let on_boundary = adjacency
            .neighbors(idx)
            .iter()
            .any(|&n| colors[n as usize] != color);
        if on_boundary {
            region.contour.push(idx);
        } else {
            region.feature.push(idx);
        }
    }

    let found = regions.len();
    let absorbed = absorb_small_regions(&mut regions, &colors, &adjacency);

    debug!(
        vertices = colors.len(),
        edges = adjacency.edge_count(),
        regions = regions.len(),
        absorbed,
        found,
        "Segmented mesh by vertex color"
    );

    Ok(RegionMap { regions })
}

fn absorb_small_regions(
    regions: &mut BTreeMap<ColorKey, Region>,
    colors: &[ColorKey],
    adjacency: &VertexAdjacency,
) -> usize {
    let keys: Vec<ColorKey> = regions.keys().copied().collect();
    let mut small = Vec::new();

    for key in keys {
        // Earlier absorptions can grow a region past the threshold.
        let members = match regions.get(&key) {
            Some(region) if region.feature.len() < MIN_FEATURE_VERTICES => region.feature.clone(),
            _ => continue,
        };
        small.push(key);

        for idx in members {
            let Some(winner) = dominant_neighbor_color(idx, colors, adjacency) else {
                continue;
            };
            if winner == key {
                break;
            }
            if let Some(target) = regions.get_mut(&winner) {
                target.feature.push(idx);
                target.contour.push(idx);
            }
        }
    }

    for key in &small {
        regions.remove(key);
    }
    small.len()
}

/// Most frequent neighbor color of `vertex`; ties go to the color seen first.
fn dominant_neighbor_color(
    vertex: u32,
    colors: &[ColorKey],
    adjacency: &VertexAdjacency,
) -> Option<ColorKey> {
    let mut counts: Vec<(ColorKey, usize)> = Vec::new();
    for &n in adjacency.neighbors(vertex) {
        let color = colors[n as usize];
        match counts.iter_mut().find(|(c, _)| *c == color) {
            Some(entry) => entry.1 += 1,
            None => counts.push((color, 1)),
        }
    }

    let mut best: Option<(ColorKey, usize)> = None;
    for (color, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((color, count));
        }
    }
    best.map(|(color, _)| color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{IndexedMesh, Vertex, VertexColor};

    /// Triangulated `cols × rows` vertex grid, vertex `r * cols + c`.
    fn grid(cols: u32, rows: u32, color_of: impl Fn(u32, u32) -> VertexColor) -> IndexedMesh {
        let mut mesh = IndexedMesh::new();
        for r in 0..rows {
            for c in 0..cols {
                mesh.vertices.push(
                    Vertex::from_coords(f64::from(c), f64::from(r), 0.0).with_color(color_of(c, r)),
                );
            }
        }
        for r in 0..rows - 1 {
            for c in 0..cols - 1 {
                let v = r * cols + c;
                mesh.faces.push([v, v + 1, v + cols]);
                mesh.faces.push([v + 1, v + cols + 1, v + cols]);
            }
        }
        mesh
    }

    fn red() -> ColorKey {
        ColorKey::from(VertexColor::RED)
    }

    fn blue() -> ColorKey {
        ColorKey::from(VertexColor::BLUE)
    }

    #[test]
    fn single_color_mesh_is_all_feature() {
        let mesh = grid(3, 3, |_, _| VertexColor::RED);
        let regions = segment_by_color(&mesh).unwrap();

        assert_eq!(regions.len(), 1);
        let region = regions.get(red()).unwrap();
        assert_eq!(region.feature, (0..9).collect::<Vec<_>>());
        assert!(region.contour.is_empty());
    }

    #[test]
    fn two_color_grid_splits_feature_and_contour() {
        // Columns 0-1 red, 2-3 blue.
        let mesh = grid(4, 3, |c, _| if c < 2 { VertexColor::RED } else { VertexColor::BLUE });
        let regions = segment_by_color(&mesh).unwrap();

        assert_eq!(regions.len(), 2);
        let red_region = regions.get(red()).unwrap();
        let blue_region = regions.get(blue()).unwrap();

        assert_eq!(red_region.feature, vec![0, 4, 8]);
        assert_eq!(red_region.contour, vec![1, 5, 9]);
        assert_eq!(blue_region.feature, vec![3, 7, 11]);
        assert_eq!(blue_region.contour, vec![2, 6, 10]);
    }

    #[test]
    fn block_coloring_partitions_vertices() {
        let mesh = grid(6, 4, |c, _| if c < 3 { VertexColor::GREEN } else { VertexColor::WHITE });
        let regions = segment_by_color(&mesh).unwrap();

        let mut seen: Vec<u32> = regions.iter().flat_map(|(_, r)| r.all_vertices()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..24).collect::<Vec<_>>());
        for (key, region) in regions.iter() {
            assert!(region.feature.len() >= MIN_FEATURE_VERTICES, "{key} too small");
        }
    }

    #[test]
    fn twelve_vertex_two_color_mesh_has_two_regions() {
        // 6 red vertices (columns 0-1) and 6 blue (columns 2-3).
        let mesh = grid(4, 3, |c, _| if c < 2 { VertexColor::RED } else { VertexColor::BLUE });
        assert_eq!(mesh.vertices.len(), 12);
        let regions = segment_by_color(&mesh).unwrap();
        let adjacency = VertexAdjacency::build(12, &mesh.faces).unwrap();

        assert_eq!(regions.len(), 2);
        for (key, region) in regions.iter() {
            assert!(region.feature.len() >= MIN_FEATURE_VERTICES, "{key} feature too small");
            assert!(!region.contour.is_empty(), "{key} has no contour");
            // Every contour vertex touches the other region.
            for &v in &region.contour {
                let other = adjacency
                    .neighbors(v)
                    .iter()
                    .any(|&n| ColorKey::from(mesh.vertices[n as usize].color.unwrap_or_default()) != key);
                assert!(other, "contour vertex {v} is not on the shared boundary");
            }
        }
    }

    #[test]
    fn lone_contour_speck_is_dropped() {
        // A single green vertex in the middle of a red 5x5 patch. It is a
        // contour vertex of a region with no feature vertices.
        let mesh = grid(5, 5, |c, r| {
            if (c, r) == (2, 2) { VertexColor::GREEN } else { VertexColor::RED }
        });
        let regions = segment_by_color(&mesh).unwrap();

        assert_eq!(regions.len(), 1);
        assert!(!regions.contains(ColorKey::from(VertexColor::GREEN)));
        let red_region = regions.get(red()).unwrap();
        assert!(!red_region.feature.contains(&12));
        assert!(!red_region.contour.contains(&12));
        assert_eq!(red_region.vertex_count(), 24);
    }

    #[test]
    fn small_region_contour_is_not_reassigned() {
        // Green 2x2 corner block in a red 6x6 grid. Only vertex 0 is interior
        // to green, so green is too small.
        let mesh = grid(6, 6, |c, r| {
            if c < 2 && r < 2 { VertexColor::GREEN } else { VertexColor::RED }
        });
        let green = ColorKey::from(VertexColor::GREEN);
        let regions = segment_by_color(&mesh).unwrap();

        assert!(!regions.contains(green));
        let red_region = regions.get(red()).unwrap();
        // Vertex 7 is a green contour vertex with a red majority; it stays
        // unassigned. Vertex 0 is green feature with a green majority.
        for idx in [0, 1, 6, 7] {
            assert!(!red_region.all_vertices().contains(&idx), "vertex {idx} moved to red");
        }
        assert_eq!(red_region.vertex_count(), 32);
    }

    #[test]
    fn own_majority_ends_the_small_region_pass() {
        // Red feature list [0, 5]: vertex 0 sees only red, vertex 5 only blue.
        let colors = vec![red(), red(), blue(), blue(), blue(), red()];
        let faces = [[0, 1, 0], [2, 3, 4], [5, 3, 4]];
        let adjacency = VertexAdjacency::build(6, &faces).unwrap();
        let mut regions: BTreeMap<ColorKey, Region> = BTreeMap::new();
        regions.insert(red(), Region { feature: vec![0, 5], contour: vec![1] });
        regions.insert(blue(), Region { feature: vec![2, 3, 4], contour: vec![] });

        let absorbed = absorb_small_regions(&mut regions, &colors, &adjacency);

        assert_eq!(absorbed, 1);
        assert!(!regions.contains_key(&red()));
        // Vertex 0 stops the pass before vertex 5 can move to blue.
        let blue_region = &regions[&blue()];
        assert_eq!(blue_region.feature, vec![2, 3, 4]);
        assert!(blue_region.contour.is_empty());
    }

    #[test]
    fn foreign_majority_feature_vertex_moves() {
        // Red feature list [5, 0]: vertex 5 sees only blue and moves first.
        let colors = vec![red(), red(), blue(), blue(), blue(), red()];
        let faces = [[0, 1, 0], [2, 3, 4], [5, 3, 4]];
        let adjacency = VertexAdjacency::build(6, &faces).unwrap();
        let mut regions: BTreeMap<ColorKey, Region> = BTreeMap::new();
        regions.insert(red(), Region { feature: vec![5, 0], contour: vec![1] });
        regions.insert(blue(), Region { feature: vec![2, 3, 4], contour: vec![] });

        absorb_small_regions(&mut regions, &colors, &adjacency);

        let blue_region = &regions[&blue()];
        assert_eq!(blue_region.feature, vec![2, 3, 4, 5]);
        assert_eq!(blue_region.contour, vec![5]);
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn isolated_feature_vertex_is_skipped() {
        // Vertex 4 is green, isolated, and the only green vertex.
        let colors = vec![red(), red(), red(), red(), ColorKey::from(VertexColor::GREEN)];
        let adjacency = VertexAdjacency::build(5, &[[0, 1, 2], [1, 3, 2]]).unwrap();
        let mut regions: BTreeMap<ColorKey, Region> = BTreeMap::new();
        regions.insert(red(), Region { feature: vec![0, 1, 2, 3], contour: vec![] });
        regions.insert(ColorKey::from(VertexColor::GREEN), Region { feature: vec![4], contour: vec![] });

        assert_eq!(absorb_small_regions(&mut regions, &colors, &adjacency), 1);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[&red()].feature, vec![0, 1, 2, 3]);
    }

    #[test]
    fn segmentation_is_deterministic() {
        let mesh = grid(6, 5, |c, r| match (c + 2 * r) % 4 {
            0 => VertexColor::RED,
            1 => VertexColor::GREEN,
            _ => VertexColor::BLUE,
        });
        let first = segment_by_color(&mesh).unwrap();
        let second = segment_by_color(&mesh).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn dominant_color_tie_goes_to_first_seen() {
        let colors = vec![red(), blue(), red(), blue()];
        let adjacency = VertexAdjacency::build(4, &[[0, 1, 2], [0, 2, 3]]).unwrap();
        // Vertex 0 neighbors sorted: 1 (blue), 2 (red), 3 (blue) → blue 2, red 1.
        assert_eq!(dominant_neighbor_color(0, &colors, &adjacency), Some(blue()));

        let adjacency = VertexAdjacency::build(4, &[[0, 1, 2]]).unwrap();
        // Neighbors 1 (blue), 2 (red): tie, blue seen first.
        assert_eq!(dominant_neighbor_color(0, &colors, &adjacency), Some(blue()));
        assert_eq!(dominant_neighbor_color(3, &colors, &adjacency), None);
    }

    #[test]
    fn uncolored_mesh_is_unsupported() {
        let mut mesh = grid(3, 3, |_, _| VertexColor::RED);
        mesh.vertices[4].color = None;
        assert!(matches!(
            segment_by_color(&mesh),
            Err(RegionError::UnsupportedColorSource { .. })
        ));
    }

    #[test]
    fn point_source_matches_mesh_source() {
        let mesh = grid(4, 3, |c, _| if c < 2 { VertexColor::RED } else { VertexColor::BLUE });
        let colors: Vec<f32> = mesh
            .vertices
            .iter()
            .flat_map(|v| {
                let [r, g, b, _] = v.color.unwrap_or_default().to_array();
                [f32::from(r), f32::from(g), f32::from(b)]
            })
            .collect();

        let from_points = segment_by_color(ColorSource::Points {
            colors: &colors,
            channels: 3,
            faces: &mesh.faces,
        })
        .unwrap();
        assert_eq!(from_points, segment_by_color(&mesh).unwrap());
    }

    #[test]
    fn require_reports_missing_region() {
        let mesh = grid(3, 3, |_, _| VertexColor::RED);
        let regions = segment_by_color(&mesh).unwrap();
        assert!(regions.require(red()).is_ok());
        assert!(matches!(
            regions.require(blue()),
            Err(RegionError::RegionNotFound { .. })
        ));
    }
}
