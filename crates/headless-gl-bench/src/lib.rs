//! # headless-gl bench
//!
//! Fixtures for the criterion benchmarks in `benches/headless_gl.rs`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut fixture = DrawFixture::webgl1(64, 64);
//! fixture.upload_indices(&triangle_indices(1024));
//! ```

use headless_gl::constants as gl;
use headless_gl::{
    ContextAttributes, ContextError, SoftwareDriver, WebGLContext, WebGLProgram,
    WebGLRenderingContext,
};
use tracing::debug;

const VERTEX_SOURCE: &str = "attribute vec2 position;\n\
void main() { gl_Position = vec4(position, 0.0, 1.0); }";

const FRAGMENT_SOURCE: &str = "precision mediump float;\n\
uniform vec4 color;\n\
void main() { gl_FragColor = color; }";

/// A WebGL 1 context with a linked program in use and bound vertex and
/// element buffers.
pub struct DrawFixture {
    pub ctx: WebGLRenderingContext<SoftwareDriver>,
    pub program: WebGLProgram,
}

impl DrawFixture {
    pub fn webgl1(width: i32, height: i32) -> Result<Self, ContextError> {
        let mut ctx = WebGLRenderingContext::new(
            SoftwareDriver::new(),
            width,
            height,
            ContextAttributes::default(),
        )?;
        let program = link(&mut ctx).ok_or_else(|| {
            ContextError::NativeContext("benchmark program failed to link".to_string())
        })?;
        ctx.use_program(Some(program));
        debug!(width, height, "Benchmark fixture ready");
        Ok(Self { ctx, program })
    }

    /// Bind an element buffer holding `indices`.
    pub fn upload_indices(&mut self, indices: &[u16]) {
        let bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_ne_bytes()).collect();
        let buffer = self.ctx.create_buffer();
        self.ctx.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, buffer);
        self.ctx
            .buffer_data(gl::ELEMENT_ARRAY_BUFFER, &bytes, gl::STATIC_DRAW);
    }

    /// Bind `vertices` two-component positions to the program's attribute.
    pub fn upload_positions(&mut self, vertices: usize) {
        let location = self.ctx.get_attrib_location(self.program, "position");
        let Ok(location) = u32::try_from(location) else {
            return;
        };
        let buffer = self.ctx.create_buffer();
        self.ctx.bind_buffer(gl::ARRAY_BUFFER, buffer);
        self.ctx
            .buffer_data_size(gl::ARRAY_BUFFER, (vertices * 8) as i64, gl::STATIC_DRAW);
        self.ctx
            .vertex_attrib_pointer(location, 2, gl::FLOAT, false, 0, 0);
        self.ctx.enable_vertex_attrib_array(location);
    }

    /// Forget recorded draws so long runs do not grow the driver log.
    pub fn reset(&mut self) {
        self.ctx.driver_mut().clear_draw_calls();
    }
}

fn link<C: WebGLContext>(ctx: &mut C) -> Option<WebGLProgram> {
    let vertex = ctx.create_shader(gl::VERTEX_SHADER)?;
    ctx.shader_source(vertex, VERTEX_SOURCE);
    ctx.compile_shader(vertex);
    let fragment = ctx.create_shader(gl::FRAGMENT_SHADER)?;
    ctx.shader_source(fragment, FRAGMENT_SOURCE);
    ctx.compile_shader(fragment);
    let program = ctx.create_program()?;
    ctx.attach_shader(program, vertex);
    ctx.attach_shader(program, fragment);
    ctx.link_program(program);
    ctx.get_program_parameter(program, gl::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
        .then_some(program)
}

/// `count` triangles over a strip of `count + 2` vertices.
pub fn triangle_indices(count: usize) -> Vec<u16> {
    (0..count)
        .flat_map(|i| {
            let i = (i % (u16::MAX as usize - 2)) as u16;
            [i, i + 1, i + 2]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_draws() {
        let mut fixture = DrawFixture::webgl1(8, 8).expect("fixture");
        fixture.upload_positions(66);
        fixture.upload_indices(&triangle_indices(64));
        fixture
            .ctx
            .draw_elements(gl::TRIANGLES, 64 * 3, gl::UNSIGNED_SHORT, 0);
        assert_eq!(fixture.ctx.get_error(), gl::NO_ERROR);
        assert_eq!(fixture.ctx.driver().draw_calls().len(), 1);
        fixture.reset();
        assert!(fixture.ctx.driver().draw_calls().is_empty());
    }

    #[test]
    fn test_triangle_indices() {
        assert_eq!(triangle_indices(2), vec![0, 1, 2, 1, 2, 3]);
    }
}
