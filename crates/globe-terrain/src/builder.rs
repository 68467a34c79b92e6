//! Tile height-field construction: displaced vertex grid, triangle list and normals.

use glam::DVec3;
use globe_cubesphere::TileDescriptor;

use crate::{BuildError, ElevationModel, TileGeometry};

/// Finest grid a single tile may request.
pub const MAX_SUBDIVISIONS: u32 = 4096;

/// One tile to build.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildRequest {
    /// Where the tile lies.
    pub descriptor: TileDescriptor,
    /// Grid cells per tile edge. The grid has `(n + 1)^2` vertices.
    pub subdivisions: u32,
}

impl BuildRequest {
    pub fn new(descriptor: TileDescriptor, subdivisions: u32) -> Self {
        Self {
            descriptor,
            subdivisions,
        }
    }
}

/// Reject requests that cannot produce a valid grid.
pub fn validate_request(request: &BuildRequest) -> Result<(), BuildError> {
    if request.subdivisions == 0 || request.subdivisions > MAX_SUBDIVISIONS {
        return Err(BuildError::InvalidDescriptor(format!(
            "subdivisions must be in 1..={MAX_SUBDIVISIONS}, got {}",
            request.subdivisions
        )));
    }
    if !request.descriptor.is_well_formed() {
        return Err(BuildError::InvalidDescriptor(format!(
            "tile {} has edge length {} and size {}",
            request.descriptor.id(),
            request.descriptor.edge_length,
            request.descriptor.size
        )));
    }
    Ok(())
}

/// Build the displaced mesh for one tile.
///
/// Vertex `(i, j)` sits at index `j * (n + 1) + i` and local coordinates
/// `s = i / n - 0.5`, `t = j / n - 0.5`, so tiles sharing an edge produce
/// bit-identical edge positions. Normals come from central differences of
/// the displaced surface, which keeps them continuous across tile edges too.
pub fn build_tile(request: &BuildRequest, model: &ElevationModel) -> Result<TileGeometry, BuildError> {
    validate_request(request)?;

    let descriptor = &request.descriptor;
    let n = request.subdivisions;
    let row = n as usize + 1;
    let step = 1.0 / f64::from(n);
    let h = step * 0.5;

    let surface = |s: f64, t: f64| model.surface_point(descriptor.local_to_cube(s, t));
    let origin = descriptor.cube_position.normalize() * model.radius();

    let mut positions = Vec::with_capacity(row * row);
    let mut normals = Vec::with_capacity(row * row);
    for j in 0..row {
        let t = j as f64 * step - 0.5;
        for i in 0..row {
            let s = i as f64 * step - 0.5;
            let vertex = j * row + i;

            let p = surface(s, t);
            if !p.is_finite() {
                return Err(BuildError::NonFinite {
                    what: "position",
                    vertex,
                });
            }
            let ds = surface(s + h, t) - surface(s - h, t);
            let dt = surface(s, t + h) - surface(s, t - h);
            let normal = ds.cross(dt).normalize_or_zero();
            if normal == DVec3::ZERO || !normal.is_finite() {
                return Err(BuildError::NonFinite {
                    what: "normal",
                    vertex,
                });
            }

            positions.push((p - origin).as_vec3().to_array());
            normals.push(normal.as_vec3().to_array());
        }
    }

    let mut indices = Vec::with_capacity(n as usize * n as usize * 6);
    let row = row as u32;
    for j in 0..n {
        for i in 0..n {
            let a = j * row + i;
            let b = a + 1;
            let c = b + row;
            let d = a + row;
            indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }

    Ok(TileGeometry {
        origin,
        positions,
        normals,
        indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoiseLayerSettings, PlanetParameters, TerrainSettings};
    use globe_cubesphere::{Direction, TilePath};

    const RADIUS: f64 = 50_000.0;

    fn model(terrain: TerrainSettings) -> ElevationModel {
        ElevationModel::new(&PlanetParameters::new(RADIUS, 11, terrain)).unwrap()
    }

    fn request(direction: Direction, indices: &[u8], n: u32) -> BuildRequest {
        let path = TilePath::from_indices(indices).unwrap();
        BuildRequest::new(TileDescriptor::new(direction, path, RADIUS * 2.0), n)
    }

    #[test]
    fn test_grid_dimensions() {
        let g = build_tile(&request(Direction::Up, &[], 8), &model(TerrainSettings::flat())).unwrap();
        assert_eq!(g.vertex_count(), 81);
        assert_eq!(g.normals.len(), 81);
        assert_eq!(g.triangle_count(), 128);
        assert!(g.indices.iter().all(|&i| i < 81));
    }

    #[test]
    fn test_zero_subdivisions_rejected() {
        let err = build_tile(&request(Direction::Up, &[], 0), &model(TerrainSettings::flat())).unwrap_err();
        assert!(matches!(err, BuildError::InvalidDescriptor(_)));
    }

    #[test]
    fn test_degenerate_descriptor_rejected() {
        let r = BuildRequest::new(TileDescriptor::new(Direction::Left, TilePath::ROOT, 0.0), 4);
        assert!(matches!(validate_request(&r), Err(BuildError::InvalidDescriptor(_))));
    }

    /// Finite settings whose evaluation overflows: two stacked masks of
    /// `1e308` give an infinite mask, and a zero layer under it gives NaN.
    fn overflowing_terrain() -> TerrainSettings {
        let constant = |floor: f64, masks: Vec<usize>, mask_only: bool| NoiseLayerSettings {
            octaves: 0,
            floor,
            masks,
            mask_only,
            ..Default::default()
        };
        TerrainSettings {
            noise_layers: vec![
                constant(1e308, Vec::new(), true),
                constant(1e308, vec![0], true),
                constant(0.0, vec![1], false),
            ],
            crater_layers: Vec::new(),
            ..Default::default()
        }
    }

    #[test]
    fn test_nan_elevation_is_reported_non_finite() {
        let terrain = overflowing_terrain();
        assert!(terrain.validate().is_ok());
        let err = build_tile(&request(Direction::Up, &[], 4), &model(terrain)).unwrap_err();
        assert_eq!(
            err,
            BuildError::NonFinite {
                what: "position",
                vertex: 0
            }
        );
    }

    #[test]
    fn test_infinite_elevation_is_reported_non_finite() {
        let huge = NoiseLayerSettings {
            octaves: 0,
            floor: 1e308,
            ..Default::default()
        };
        let terrain = TerrainSettings {
            noise_layers: vec![huge.clone(), huge],
            crater_layers: Vec::new(),
            ..Default::default()
        };
        let err = build_tile(&request(Direction::Left, &[1], 4), &model(terrain)).unwrap_err();
        assert!(matches!(err, BuildError::NonFinite { what: "position", .. }));
    }

    #[test]
    fn test_flat_tile_lies_on_sphere_with_outward_normals() {
        let g = build_tile(&request(Direction::Backward, &[2, 1], 6), &model(TerrainSettings::flat())).unwrap();
        for i in 0..g.vertex_count() {
            let p = g.world_position(i).unwrap();
            assert!((p.length() - RADIUS).abs() < 0.05, "vertex {i} off the sphere");
            let n = DVec3::from_array(g.normals[i].map(f64::from));
            assert!(n.dot(p.normalize()) > 0.99, "normal {i} not radial");
        }
    }

    #[test]
    fn test_triangles_wind_counter_clockwise_from_outside() {
        let g = build_tile(&request(Direction::Right, &[0], 4), &model(TerrainSettings::flat())).unwrap();
        for tri in g.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| g.world_position(i as usize).unwrap());
            let face_normal = (b - a).cross(c - a);
            assert!(face_normal.dot(a) > 0.0, "triangle {tri:?} faces inward");
        }
    }

    #[test]
    fn test_sibling_tiles_share_edge_vertices() {
        let m = model(TerrainSettings::default());
        let n = 8;
        let left = build_tile(&request(Direction::Forward, &[3, 0], n), &m).unwrap();
        let right = build_tile(&request(Direction::Forward, &[3, 1], n), &m).unwrap();
        let row = n as usize + 1;
        for j in 0..row {
            let a = left.world_position(j * row + n as usize).unwrap();
            let b = right.world_position(j * row).unwrap();
            assert!((a - b).length() < 0.05, "seam gap at row {j}: {}", (a - b).length());
        }
    }

    #[test]
    fn test_adjacent_faces_share_edge_vertices() {
        let m = model(TerrainSettings::default());
        let n = 8;
        let forward = build_tile(&request(Direction::Forward, &[], n), &m).unwrap();
        let right = build_tile(&request(Direction::Right, &[], n), &m).unwrap();
        let row = n as usize + 1;
        for j in 0..row {
            let a = forward.world_position(j * row + n as usize).unwrap();
            let b = right.world_position(j * row).unwrap();
            assert!((a - b).length() < 0.05, "face seam gap at row {j}");
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let m = model(TerrainSettings::default());
        let r = request(Direction::Down, &[1, 2, 3], 5);
        assert_eq!(build_tile(&r, &m).unwrap(), build_tile(&r, &m).unwrap());
    }
}
