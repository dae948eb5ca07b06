//! Procedural meshes.
//!
//! Triangles are wound clockwise when seen from outside in left-handed
//! space: for a triangle `(a, b, c)`, `(b - a) × (c - a)` points outward.

use crate::mesh::Vertex;
use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

/// Vertex and index lists ready for [`crate::Mesh::from_arrays`].
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Axis-aligned cube centered on the origin.
pub fn cube(size: f32) -> MeshData {
    let h = size * 0.5;
    // (outward normal, screen right, screen up) for a viewer outside the face
    let faces = [
        (Vec3::NEG_Z, Vec3::X, Vec3::Y),
        (Vec3::Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::X, Vec3::Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::NEG_Z),
    ];

    let mut data = MeshData::default();
    for (n, r, u) in faces {
        let base = data.vertices.len() as u32;
        let corners = [
            (n - r - u, [0.0, 1.0]),
            (n - r + u, [0.0, 0.0]),
            (n + r + u, [1.0, 0.0]),
            (n + r - u, [1.0, 1.0]),
        ];
        for (p, uv) in corners {
            data.vertices
                .push(Vertex::new((p * h).to_array(), n.to_array(), uv));
        }
        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    compute_tangents(&mut data);
    data
}

/// UV sphere with `slices` around the Y axis and `stacks` from pole to pole.
pub fn sphere(radius: f32, slices: u32, stacks: u32) -> MeshData {
    let slices = slices.max(3);
    let stacks = stacks.max(2);
    let mut data = MeshData::default();

    for i in 0..=stacks {
        let phi = PI * i as f32 / stacks as f32;
        for j in 0..=slices {
            let theta = TAU * j as f32 / slices as f32;
            let n = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            let uv = [j as f32 / slices as f32, i as f32 / stacks as f32];
            data.vertices
                .push(Vertex::new((n * radius).to_array(), n.to_array(), uv));
        }
    }

    let row = slices + 1;
    for i in 0..stacks {
        for j in 0..slices {
            let a = i * row + j;
            let b = a + 1;
            let c = a + row;
            let d = c + 1;
            // The first and last rows collapse to a pole; skip their degenerate halves.
            if i != 0 {
                data.indices.extend_from_slice(&[a, b, c]);
            }
            if i != stacks - 1 {
                data.indices.extend_from_slice(&[b, d, c]);
            }
        }
    }
    compute_tangents(&mut data);
    data
}

/// Square on the XZ plane facing +Y. UVs repeat `tiles` times per side.
pub fn plane(half_extent: f32, tiles: f32) -> MeshData {
    let h = half_extent;
    let n = [0.0, 1.0, 0.0];
    let vertices = vec![
        Vertex::new([-h, 0.0, -h], n, [0.0, tiles]),
        Vertex::new([-h, 0.0, h], n, [0.0, 0.0]),
        Vertex::new([h, 0.0, h], n, [tiles, 0.0]),
        Vertex::new([h, 0.0, -h], n, [tiles, tiles]),
    ];
    let mut data = MeshData {
        vertices,
        indices: vec![0, 1, 2, 0, 2, 3],
    };
    compute_tangents(&mut data);
    data
}

/// Fill per-vertex tangents from UV derivatives, orthogonalized against the
/// normal. Vertices whose triangles have no UV area get an arbitrary
/// perpendicular.
pub fn compute_tangents(data: &mut MeshData) {
    let mut accum = vec![Vec3::ZERO; data.vertices.len()];

    for tri in data.indices.chunks_exact(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (v0, v1, v2) = (&data.vertices[i0], &data.vertices[i1], &data.vertices[i2]);
        let e1 = Vec3::from(v1.position) - Vec3::from(v0.position);
        let e2 = Vec3::from(v2.position) - Vec3::from(v0.position);
        let d1 = Vec2::from(v1.uv) - Vec2::from(v0.uv);
        let d2 = Vec2::from(v2.uv) - Vec2::from(v0.uv);

        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < 1e-8 {
            continue;
        }
        let t = (e1 * d2.y - e2 * d1.y) / det;
        for i in [i0, i1, i2] {
            accum[i] += t;
        }
    }

    for (vertex, t) in data.vertices.iter_mut().zip(accum) {
        let n = Vec3::from(vertex.normal);
        let ortho = t - n * n.dot(t);
        let tangent = if ortho.length_squared() > 1e-12 {
            ortho.normalize()
        } else {
            n.any_orthonormal_vector()
        };
        vertex.tangent = tangent.to_array();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_outward(data: &MeshData) {
        for tri in data.indices.chunks_exact(3) {
            let p: Vec<Vec3> = tri
                .iter()
                .map(|&i| Vec3::from(data.vertices[i as usize].position))
                .collect();
            let face = (p[1] - p[0]).cross(p[2] - p[0]);
            let centroid = (p[0] + p[1] + p[2]) / 3.0;
            assert!(face.dot(centroid) > 0.0, "inward triangle {tri:?}");
        }
    }

    #[test]
    fn cube_counts_and_winding() {
        let data = cube(1.0);
        assert_eq!(data.vertices.len(), 24);
        assert_eq!(data.indices.len(), 36);
        assert_outward(&data);
    }

    #[test]
    fn sphere_winding_and_radius() {
        let data = sphere(0.5, 16, 8);
        assert_outward(&data);
        for v in &data.vertices {
            assert!((Vec3::from(v.position).length() - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn sphere_skips_pole_degenerates() {
        let data = sphere(1.0, 8, 4);
        // 8 slices, 4 stacks: two pole rows of 8 triangles, two middle rows of 16
        assert_eq!(data.indices.len() / 3, 8 + 16 + 16 + 8);
    }

    #[test]
    fn plane_faces_up() {
        let data = plane(5.0, 4.0);
        let p: Vec<Vec3> = data.indices[..3]
            .iter()
            .map(|&i| Vec3::from(data.vertices[i as usize].position))
            .collect();
        let face = (p[1] - p[0]).cross(p[2] - p[0]);
        assert!(face.normalize().abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn cube_tangents_follow_u() {
        let data = cube(2.0);
        // -Z face: u increases toward +X
        for v in &data.vertices[0..4] {
            assert!(Vec3::from(v.tangent).abs_diff_eq(Vec3::X, 1e-5));
        }
    }

    #[test]
    fn tangents_are_unit_and_perpendicular() {
        let data = sphere(1.0, 12, 6);
        for v in &data.vertices {
            let t = Vec3::from(v.tangent);
            let n = Vec3::from(v.normal);
            assert!((t.length() - 1.0).abs() < 1e-4);
            assert!(t.dot(n).abs() < 1e-4);
        }
    }
}
