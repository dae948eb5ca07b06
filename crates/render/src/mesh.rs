use crate::device::{MeshId, RenderDevice};
use crate::error::RenderError;
use bytemuck::{Pod, Zeroable};

/// Vertex layout shared by every mesh: position, normal, uv, tangent.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
            tangent: [0.0; 3],
        }
    }
}

/// Immutable vertex/index buffer pair living on the device.
#[derive(Debug, PartialEq, Eq)]
pub struct Mesh {
    id: MeshId,
    vertex_count: u32,
    index_count: u32,
}

impl Mesh {
    /// Upload vertices and 32-bit indices.
    pub fn from_arrays(
        device: &mut dyn RenderDevice,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<Self, RenderError> {
        if indices.is_empty() {
            return Err(RenderError::EmptyMesh);
        }
        let id = device.create_mesh(vertices, indices)?;
        tracing::debug!(
            id = id.0,
            vertices = vertices.len(),
            indices = indices.len(),
            "mesh uploaded"
        );
        Ok(Self {
            id,
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
        })
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Issue one indexed draw of the whole index buffer.
    pub fn draw(&self, device: &mut dyn RenderDevice) {
        device.draw_indexed(self.id, self.index_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceCommand;
    use crate::recording::RecordingDevice;

    fn triangle() -> Vec<Vertex> {
        vec![
            Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, -1.0], [0.5, 0.0]),
            Vertex::new([1.0, -1.0, 0.0], [0.0, 0.0, -1.0], [1.0, 1.0]),
            Vertex::new([-1.0, -1.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0]),
        ]
    }

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 44);
    }

    #[test]
    fn mesh_keeps_counts() {
        let mut device = RecordingDevice::new(64, 64);
        let mesh = Mesh::from_arrays(&mut device, &triangle(), &[0, 1, 2]).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(device.mesh_sizes(mesh.id()), Some((3, 3)));
    }

    #[test]
    fn draw_uses_index_count() {
        let mut device = RecordingDevice::new(64, 64);
        let mesh = Mesh::from_arrays(&mut device, &triangle(), &[0, 1, 2]).unwrap();
        mesh.draw(&mut device);
        assert_eq!(
            device.commands(),
            &[DeviceCommand::DrawIndexed {
                mesh: mesh.id(),
                index_count: 3
            }]
        );
    }

    #[test]
    fn empty_index_list_is_rejected() {
        let mut device = RecordingDevice::new(64, 64);
        let err = Mesh::from_arrays(&mut device, &triangle(), &[]).unwrap_err();
        assert!(matches!(err, RenderError::EmptyMesh));
    }
}
