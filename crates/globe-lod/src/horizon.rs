//! Horizon tests for points and whole tiles.

use glam::DVec3;
use globe_cubesphere::TileDescriptor;

/// Returns `true` if a tile center is certainly on the far side of the body.
///
/// By Pythagoras, a point on the sphere of radius `r` whose squared distance
/// to the observer `O` exceeds `|O|^2 + r^2` lies behind the plane through
/// the body center orthogonal to `O`, and therefore behind the horizon. The
/// body is centered at the origin and `r = edge_length / 2`.
///
/// This says nothing about the rest of the tile; use
/// [`is_tile_beyond_horizon`] to decide whether a tile can be hidden.
#[inline]
pub fn is_beyond_horizon(distance_sq: f64, observer_center_distance_sq: f64, edge_length: f64) -> bool {
    let radius = edge_length * 0.5;
    distance_sq > observer_center_distance_sq + radius * radius
}

/// Returns `true` if no point of the tile, projected onto the undisplaced
/// sphere, can be seen from `observer` (planet space, body at the origin).
///
/// The tile fits in a cone around its center direction whose half-angle is
/// the widest corner. The observer sees a cap of half-angle
/// `acos(r / |O|)` around its own direction. The tile is hidden only when
/// the angle between the two axes exceeds both half-angles combined.
pub fn is_tile_beyond_horizon(descriptor: &TileDescriptor, observer: DVec3) -> bool {
    let radius = descriptor.sphere_radius();
    let observer_distance = observer.length();
    if observer_distance <= radius {
        return false;
    }
    let Some(center) = descriptor.cube_position.try_normalize() else {
        return false;
    };
    let spread = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)]
        .into_iter()
        .filter_map(|(s, t)| descriptor.local_to_cube(s, t).try_normalize())
        .map(|corner| angle_between(center, corner))
        .fold(0.0, f64::max);
    let visible_cap = (radius / observer_distance).acos();
    angle_between(center, observer / observer_distance) > spread + visible_cap
}

fn angle_between(a: DVec3, b: DVec3) -> f64 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}
