use super::device::GlDevice;
use gl::types::*;
use std::mem;

pub const FLOATS_PER_VERTEX: usize = 2;

/// Unit-ish square centred at the origin, `(x, y)` per vertex.
#[rustfmt::skip]
pub const QUAD_POSITIONS: [f32; 8] = [
    -0.5, -0.5, // 0
     0.5, -0.5, // 1
     0.5,  0.5, // 2
    -0.5,  0.5, // 3
];

/// Two counter-clockwise triangles over `QUAD_POSITIONS`.
#[rustfmt::skip]
pub const QUAD_INDICES: [u32; 6] = [
    0, 1, 2,
    2, 3, 0,
];

pub fn vertex_count() -> usize {
    QUAD_POSITIONS.len() / FLOATS_PER_VERTEX
}

/// The quad uploaded once into static vertex and index buffers.
pub struct QuadMesh {
    vao: GLuint,
    vbo: GLuint,
    ebo: GLuint,
    index_count: GLsizei,
}

impl QuadMesh {
    pub fn upload(_device: &GlDevice) -> Self {
        let mut mesh = QuadMesh {
            vao: 0,
            vbo: 0,
            ebo: 0,
            index_count: QUAD_INDICES.len() as GLsizei,
        };

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&QUAD_POSITIONS);
        let index_bytes: &[u8] = bytemuck::cast_slice(&QUAD_INDICES);

        unsafe {
            gl::GenVertexArrays(1, &mut mesh.vao);
            gl::GenBuffers(1, &mut mesh.vbo);
            gl::GenBuffers(1, &mut mesh.ebo);

            gl::BindVertexArray(mesh.vao);

            gl::BindBuffer(gl::ARRAY_BUFFER, mesh.vbo);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                vertex_bytes.len() as GLsizeiptr,
                vertex_bytes.as_ptr() as *const _,
                gl::STATIC_DRAW,
            );

            // Position (location = 0)
            let stride = (FLOATS_PER_VERTEX * mem::size_of::<f32>()) as GLsizei;
            gl::VertexAttribPointer(
                0,
                FLOATS_PER_VERTEX as GLint,
                gl::FLOAT,
                gl::FALSE,
                stride,
                std::ptr::null(),
            );
            gl::EnableVertexAttribArray(0);

            gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, mesh.ebo);
            gl::BufferData(
                gl::ELEMENT_ARRAY_BUFFER,
                index_bytes.len() as GLsizeiptr,
                index_bytes.as_ptr() as *const _,
                gl::STATIC_DRAW,
            );

            gl::BindVertexArray(0);
        }

        log::debug!(
            "Uploaded quad: {} vertices, {} indices",
            vertex_count(),
            mesh.index_count
        );
        mesh
    }

    pub fn draw(&self, _device: &GlDevice) {
        unsafe {
            gl::BindVertexArray(self.vao);
            gl::DrawElements(
                gl::TRIANGLES,
                self.index_count,
                gl::UNSIGNED_INT,
                std::ptr::null(),
            );
        }
    }
}

impl Drop for QuadMesh {
    fn drop(&mut self) {
        unsafe {
            gl::DeleteVertexArrays(1, &self.vao);
            gl::DeleteBuffers(1, &self.vbo);
            gl::DeleteBuffers(1, &self.ebo);
        }
    }
}
