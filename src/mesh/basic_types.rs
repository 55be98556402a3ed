// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use serde::{Deserialize, Serialize};

use crate::{
    error::{MeshFlowError, Result},
    geometry::Vec3,
};

pub type Triangle = [u32; 3];

/// One index group of a mesh. All groups share the vertex numbering of the
/// owning [`MeshData`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubMesh {
    pub name: String,
    pub triangles: Vec<Triangle>,
}

impl SubMesh {
    pub fn new(name: impl Into<String>, triangles: Vec<Triangle>) -> Self {
        Self {
            name: name.into(),
            triangles,
        }
    }
}

/// Host-side mesh snapshot consumed at setup time.
///
/// `tangents` carry the handedness sign in `w`. Normals and tangents may be
/// empty when the caller only needs the flow solver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub rest_positions: Vec<Vec3<f32>>,
    pub normals: Vec<Vec3<f32>>,
    pub tangents: Vec<[f32; 4]>,
    pub sub_meshes: Vec<SubMesh>,
}

impl MeshData {
    pub fn new(rest_positions: Vec<Vec3<f32>>, triangles: Vec<Triangle>) -> Self {
        Self {
            rest_positions,
            normals: Vec::new(),
            tangents: Vec::new(),
            sub_meshes: vec![SubMesh::new("default", triangles)],
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3<f32>>) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_tangents(mut self, tangents: Vec<[f32; 4]>) -> Self {
        self.tangents = tangents;
        self
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.rest_positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.sub_meshes.iter().map(|s| s.triangles.len()).sum()
    }

    /// All triangles of all sub-meshes, in sub-mesh order.
    pub fn triangles(&self) -> impl Iterator<Item = &Triangle> + '_ {
        self.sub_meshes.iter().flat_map(|s| s.triangles.iter())
    }

    /// Fails on the first index that does not name a vertex.
    pub fn validate_indices(&self) -> Result<()> {
        let vertex_count = self.vertex_count();
        for (sub_mesh, group) in self.sub_meshes.iter().enumerate() {
            for (triangle, tri) in group.triangles.iter().enumerate() {
                if let Some(&index) = tri.iter().find(|&&v| v as usize >= vertex_count) {
                    return Err(MeshFlowError::VertexOutOfRange {
                        sub_mesh,
                        triangle,
                        index,
                        vertex_count,
                    });
                }
            }
        }
        Ok(())
    }

    /// Checks that the optional attribute streams match the vertex count.
    pub fn validate_attributes(&self) -> Result<()> {
        let n = self.vertex_count();
        if !self.normals.is_empty() {
            MeshFlowError::check_len("normals", n, self.normals.len())?;
        }
        if !self.tangents.is_empty() {
            MeshFlowError::check_len("tangents", n, self.tangents.len())?;
        }
        Ok(())
    }
}
