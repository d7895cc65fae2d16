//! Fault facets: triangle meshes reduced to unit normals and areas.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::math::{Vec3, cross, norm, scale, sub};

/// Per-face unit normals and areas, index-aligned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceSet {
    normals: Vec<Vec3>,
    areas: Vec<f64>,
}

impl FaceSet {
    pub fn new(normals: Vec<Vec3>, areas: Vec<f64>) -> Result<Self, GeometryError> {
        if normals.len() != areas.len() {
            return Err(GeometryError::LengthMismatch {
                normals: normals.len(),
                areas: areas.len(),
            });
        }
        let bad = normals
            .iter()
            .zip(&areas)
            .position(|(n, a)| !a.is_finite() || n.iter().any(|c| !c.is_finite()));
        if let Some(face) = bad {
            return Err(GeometryError::NonFinite(face));
        }
        Ok(Self { normals, areas })
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn areas(&self) -> &[f64] {
        &self.areas
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

/// Reduce a triangle mesh to per-face unit normals and areas.
///
/// `positions` holds `x, y, z` triplets and `indices` holds one vertex triplet
/// per face. The normal follows the winding `(p2 - p1) × (p3 - p1)`.
pub fn faces_from_mesh(positions: &[f64], indices: &[u32]) -> Result<FaceSet, GeometryError> {
    if positions.len() % 3 != 0 {
        return Err(GeometryError::PositionsNotTriplets(positions.len()));
    }
    if indices.len() % 3 != 0 {
        return Err(GeometryError::IndicesNotTriplets(indices.len()));
    }

    let vertices = positions.len() / 3;
    let vertex = |face: usize, index: u32| -> Result<Vec3, GeometryError> {
        let i = index as usize;
        if i >= vertices {
            return Err(GeometryError::IndexOutOfRange {
                face,
                index: i,
                vertices,
            });
        }
        Ok([positions[3 * i], positions[3 * i + 1], positions[3 * i + 2]])
    };

    let faces = indices.len() / 3;
    let mut normals = Vec::with_capacity(faces);
    let mut areas = Vec::with_capacity(faces);
    for (face, tri) in indices.chunks_exact(3).enumerate() {
        let p1 = vertex(face, tri[0])?;
        let p2 = vertex(face, tri[1])?;
        let p3 = vertex(face, tri[2])?;

        let c = cross(&sub(&p2, &p1), &sub(&p3, &p1));
        let len = norm(&c);
        if !len.is_finite() {
            return Err(GeometryError::NonFinite(face));
        }
        if len <= f64::EPSILON {
            return Err(GeometryError::DegenerateFace(face));
        }
        normals.push(scale(&c, 1.0 / len));
        areas.push(0.5 * len);
    }

    Ok(FaceSet { normals, areas })
}

/// Flat vertex and index buffers, as consumed by [`faces_from_mesh`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub positions: Vec<f64>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn faces(&self) -> Result<FaceSet, GeometryError> {
        faces_from_mesh(&self.positions, &self.indices)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Rotate every vertex by `dip` degrees about the x axis, then by
    /// `strike` degrees clockwise about the vertical
    #[must_use]
    pub fn tilted(mut self, dip: f64, strike: f64) -> Self {
        let (sd, cd) = dip.to_radians().sin_cos();
        let (ss, cs) = strike.to_radians().sin_cos();
        for p in self.positions.chunks_exact_mut(3) {
            let (y, z) = (p[1] * cd - p[2] * sd, p[1] * sd + p[2] * cd);
            let x = p[0];
            p[0] = x * cs + y * ss;
            p[1] = -x * ss + y * cs;
            p[2] = z;
        }
        self
    }
}

/// Regular `a × b` rectangle in the horizontal plane centred on the origin,
/// split into `na × nb` cells of two triangles each. Normals point up.
pub fn rectangle(a: f64, b: f64, na: usize, nb: usize) -> Mesh {
    let (na, nb) = (na.max(1), nb.max(1));
    let mut positions = Vec::with_capacity(3 * (na + 1) * (nb + 1));
    for j in 0..=nb {
        let y = -0.5 * b + b * j as f64 / nb as f64;
        for i in 0..=na {
            let x = -0.5 * a + a * i as f64 / na as f64;
            positions.extend_from_slice(&[x, y, 0.0]);
        }
    }

    let row = (na + 1) as u32;
    let mut indices = Vec::with_capacity(6 * na * nb);
    for j in 0..nb as u32 {
        for i in 0..na as u32 {
            let v0 = j * row + i;
            let v1 = v0 + 1;
            let v2 = v0 + row;
            let v3 = v2 + 1;
            indices.extend_from_slice(&[v0, v1, v3, v0, v3, v2]);
        }
    }

    Mesh { positions, indices }
}

/// Accumulates facets from any number of faults
#[derive(Debug, Clone, Default)]
pub struct FaultGeometry {
    normals: Vec<Vec3>,
    areas: Vec<f64>,
    max_area: f64,
}

impl FaultGeometry {
    pub fn add(&mut self, faces: FaceSet) -> usize {
        let added = faces.len();
        self.max_area = faces.areas.iter().copied().fold(self.max_area, f64::max);
        self.normals.extend(faces.normals);
        self.areas.extend(faces.areas);
        added
    }

    pub fn reset(&mut self) {
        self.normals.clear();
        self.areas.clear();
        self.max_area = 0.0;
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn areas(&self) -> &[f64] {
        &self.areas
    }

    pub fn max_area(&self) -> f64 {
        self.max_area
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn total_area(&self) -> f64 {
        self.areas.iter().sum()
    }

    /// (normal, area) per facet
    pub fn faces(&self) -> impl Iterator<Item = (&Vec3, f64)> {
        self.normals.iter().zip(self.areas.iter().copied())
    }
}
