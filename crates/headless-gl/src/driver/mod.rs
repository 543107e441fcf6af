//! The native driver boundary.
//!
//! The validation layer never talks to a GPU itself. Every effect goes through
//! a [`NativeDriver`], a flat set of GL ES entry points over raw integer
//! handles. Calls reaching the driver have already been validated, but the
//! driver is still the authority for anything the layer cannot know up front
//! (allocation failure, shader compilation, queries), and reports problems
//! through [`NativeDriver::get_error`].

mod software;

pub use software::{DrawCall, SoftwareDriver, SoftwareLimits};

use crate::value::{ActiveInfo, ParameterValue, ShaderPrecisionFormat, UniformData};

/// Kinds of driver objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Buffer,
    Texture,
    Framebuffer,
    Renderbuffer,
    Program,
    Shader,
    VertexArray,
}

impl ObjectKind {
    /// Name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Buffer => "buffer",
            ObjectKind::Texture => "texture",
            ObjectKind::Framebuffer => "framebuffer",
            ObjectKind::Renderbuffer => "renderbuffer",
            ObjectKind::Program => "program",
            ObjectKind::Shader => "shader",
            ObjectKind::VertexArray => "vertex array",
        }
    }
}

/// Native GL entry points consumed by the rendering contexts.
///
/// Handles are raw driver names; `0` means "no object". Object creation
/// returns `0` on failure. Once [`NativeDriver::destroy`] has been called the
/// driver must ignore every further call.
pub trait NativeDriver {
    // ==================== Lifecycle ====================

    /// Raw driver error, `NO_ERROR` when none is pending.
    fn get_error(&mut self) -> u32;

    /// Space separated `GL_*` extension names supported by the driver.
    fn supported_extensions(&mut self) -> String;

    /// Request a driver extension before it is exposed.
    fn request_extension(&mut self, name: &str);

    /// Release the native context and every object it owns.
    fn destroy(&mut self);

    // ==================== Objects ====================

    fn create_object(&mut self, kind: ObjectKind) -> u32;
    fn create_shader(&mut self, shader_type: u32) -> u32;
    fn delete_object(&mut self, kind: ObjectKind, handle: u32);
    fn is_object(&mut self, kind: ObjectKind, handle: u32) -> bool;

    // ==================== Bindings ====================

    fn active_texture(&mut self, texture: u32);
    fn bind_buffer(&mut self, target: u32, buffer: u32);
    fn bind_texture(&mut self, target: u32, texture: u32);
    fn bind_framebuffer(&mut self, target: u32, framebuffer: u32);
    fn bind_renderbuffer(&mut self, target: u32, renderbuffer: u32);
    fn bind_vertex_array(&mut self, array: u32);
    fn use_program(&mut self, program: u32);

    // ==================== Buffers ====================

    fn buffer_data(&mut self, target: u32, size: usize, data: Option<&[u8]>, usage: u32);
    fn buffer_sub_data(&mut self, target: u32, offset: usize, data: &[u8]);
    fn get_buffer_parameter(&mut self, target: u32, pname: u32) -> i32;

    // ==================== Fixed-function state ====================

    fn enable(&mut self, cap: u32);
    fn disable(&mut self, cap: u32);
    fn is_enabled(&mut self, cap: u32) -> bool;
    fn blend_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32);
    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32);
    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32);
    fn clear(&mut self, mask: u32);
    fn clear_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32);
    fn clear_depth(&mut self, depth: f32);
    fn clear_stencil(&mut self, stencil: i32);
    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool);
    fn cull_face(&mut self, mode: u32);
    fn front_face(&mut self, mode: u32);
    fn depth_func(&mut self, func: u32);
    fn depth_mask(&mut self, flag: bool);
    fn depth_range(&mut self, z_near: f32, z_far: f32);
    fn hint(&mut self, target: u32, mode: u32);
    fn line_width(&mut self, width: f32);
    fn polygon_offset(&mut self, factor: f32, units: f32);
    fn sample_coverage(&mut self, value: f32, invert: bool);
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32);
    fn stencil_mask_separate(&mut self, face: u32, mask: u32);
    fn stencil_op_separate(&mut self, face: u32, fail: u32, zfail: u32, zpass: u32);
    fn pixel_storei(&mut self, pname: u32, param: i32);
    fn finish(&mut self);
    fn flush(&mut self);

    /// Query a piece of driver state. Unknown names record `INVALID_ENUM`
    /// and return [`ParameterValue::Null`].
    fn get_parameter(&mut self, pname: u32) -> ParameterValue;

    // ==================== Shaders and programs ====================

    fn shader_source(&mut self, shader: u32, source: &str);
    fn compile_shader(&mut self, shader: u32);
    fn get_shader_parameter(&mut self, shader: u32, pname: u32) -> i32;
    fn get_shader_info_log(&mut self, shader: u32) -> String;
    fn get_shader_precision_format(
        &mut self,
        shader_type: u32,
        precision_type: u32,
    ) -> Option<ShaderPrecisionFormat>;
    fn attach_shader(&mut self, program: u32, shader: u32);
    fn detach_shader(&mut self, program: u32, shader: u32);
    fn bind_attrib_location(&mut self, program: u32, index: u32, name: &str);
    fn link_program(&mut self, program: u32);
    fn validate_program(&mut self, program: u32);
    fn get_program_parameter(&mut self, program: u32, pname: u32) -> i32;
    fn get_program_info_log(&mut self, program: u32) -> String;
    fn get_active_attrib(&mut self, program: u32, index: u32) -> Option<ActiveInfo>;
    fn get_active_uniform(&mut self, program: u32, index: u32) -> Option<ActiveInfo>;
    fn get_attrib_location(&mut self, program: u32, name: &str) -> i32;
    fn get_uniform_location(&mut self, program: u32, name: &str) -> i32;
    fn get_uniform(&mut self, program: u32, location: i32) -> UniformData;

    /// Set `values.len() / components` consecutive float uniforms.
    fn uniform_f(&mut self, location: i32, components: usize, values: &[f32]);
    fn uniform_i(&mut self, location: i32, components: usize, values: &[i32]);
    fn uniform_ui(&mut self, location: i32, components: usize, values: &[u32]);
    fn uniform_matrix(&mut self, location: i32, columns: usize, rows: usize, values: &[f32]);

    // ==================== Vertex attributes ====================

    fn enable_vertex_attrib_array(&mut self, index: u32);
    fn disable_vertex_attrib_array(&mut self, index: u32);
    #[allow(clippy::too_many_arguments)]
    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: usize,
    );
    fn vertex_attrib_i_pointer(&mut self, index: u32, size: i32, ty: u32, stride: i32, offset: usize);
    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32);
    fn vertex_attrib_4f(&mut self, index: u32, value: [f32; 4]);

    // ==================== Textures ====================

    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: u32,
        width: i32,
        height: i32,
        border: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );
    #[allow(clippy::too_many_arguments)]
    fn tex_sub_image_2d(
        &mut self,
        target: u32,
        level: i32,
        xoffset: i32,
        yoffset: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    );
    #[allow(clippy::too_many_arguments)]
    fn tex_image_3d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: u32,
        width: i32,
        height: i32,
        depth: i32,
        border: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );
    #[allow(clippy::too_many_arguments)]
    fn tex_sub_image_3d(
        &mut self,
        target: u32,
        level: i32,
        xoffset: i32,
        yoffset: i32,
        zoffset: i32,
        width: i32,
        height: i32,
        depth: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    );
    fn tex_storage_2d(&mut self, target: u32, levels: i32, internal_format: u32, width: i32, height: i32);
    #[allow(clippy::too_many_arguments)]
    fn tex_storage_3d(
        &mut self,
        target: u32,
        levels: i32,
        internal_format: u32,
        width: i32,
        height: i32,
        depth: i32,
    );
    #[allow(clippy::too_many_arguments)]
    fn copy_tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        border: i32,
    );
    #[allow(clippy::too_many_arguments)]
    fn copy_tex_sub_image_2d(
        &mut self,
        target: u32,
        level: i32,
        xoffset: i32,
        yoffset: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    );
    fn generate_mipmap(&mut self, target: u32);
    fn tex_parameterf(&mut self, target: u32, pname: u32, param: f32);
    fn tex_parameteri(&mut self, target: u32, pname: u32, param: i32);
    fn get_tex_parameter(&mut self, target: u32, pname: u32) -> f32;

    // ==================== Framebuffers ====================

    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: u32,
        level: i32,
    );
    fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: u32,
    );
    fn renderbuffer_storage(&mut self, target: u32, internal_format: u32, width: i32, height: i32);
    fn renderbuffer_storage_multisample(
        &mut self,
        target: u32,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    );
    fn get_renderbuffer_parameter(&mut self, target: u32, pname: u32) -> i32;
    fn check_framebuffer_status(&mut self, target: u32) -> u32;
    fn draw_buffers(&mut self, buffers: &[u32]);

    /// Read a rectangle that lies inside the bound read framebuffer.
    #[allow(clippy::too_many_arguments)]
    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &mut [u8],
    );

    // ==================== Drawing ====================

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32);
    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: usize);
    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32);
    fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        ty: u32,
        offset: usize,
        instances: i32,
    );
}
