//! Rendering contexts.
//!
//! [`ContextBase`] holds everything both API versions track. Its operations
//! are split by topic across the submodules. [`WebGLContext`] is the shared
//! entry point surface: provided methods are identical in both versions and
//! the required ones are the version hooks.

mod base;
mod drawing;
mod fixed_function;
mod framebuffers;
mod lifecycle;
mod programs;
mod textures;
mod vertex;

pub use base::ContextBase;
pub use textures::ImageData;
pub(crate) use textures::ImageUpload;

use crate::attributes::ContextAttributes;
use crate::constants as gl;
use crate::driver::NativeDriver;
use crate::error::{ContextError, GlError};
use crate::extensions::Extension;
use crate::objects::{
    WebGLBuffer, WebGLFramebuffer, WebGLProgram, WebGLRenderbuffer, WebGLShader, WebGLTexture,
};
use crate::uniforms::WebGLUniformLocation;
use crate::value::{ActiveInfo, ParameterValue, ShaderPrecisionFormat};

/// API version of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebGLVersion {
    WebGL1,
    WebGL2,
}

impl WebGLVersion {
    pub fn name(self) -> &'static str {
        match self {
            WebGLVersion::WebGL1 => "WebGL 1",
            WebGLVersion::WebGL2 => "WebGL 2",
        }
    }

    /// Targets accepted by `bindTexture` and the texture parameter calls.
    pub fn is_texture_target(self, target: u32) -> bool {
        match target {
            gl::TEXTURE_2D | gl::TEXTURE_CUBE_MAP => true,
            gl::TEXTURE_3D | gl::TEXTURE_2D_ARRAY => self == WebGLVersion::WebGL2,
            _ => false,
        }
    }

    pub fn is_framebuffer_target(self, target: u32) -> bool {
        match target {
            gl::FRAMEBUFFER => true,
            gl::DRAW_FRAMEBUFFER | gl::READ_FRAMEBUFFER => self == WebGLVersion::WebGL2,
            _ => false,
        }
    }
}

/// Implementation maxima queried from the driver when a context is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverLimits {
    pub texture_units: usize,
    pub vertex_attribs: usize,
    pub max_texture_size: i32,
    pub max_texture_level: i32,
    pub max_cube_map_size: i32,
    pub max_cube_map_level: i32,
    pub max_3d_texture_size: i32,
    pub max_array_texture_layers: i32,
    pub max_draw_buffers: u32,
}

/// Highest mip level of a chain whose base is `size` texels wide.
fn max_level(size: i32) -> i32 {
    (size.max(1) as u32).next_power_of_two().trailing_zeros() as i32
}

impl DriverLimits {
    pub(crate) fn query<D: NativeDriver>(driver: &mut D, version: WebGLVersion) -> Self {
        let mut get = |pname| driver.get_parameter(pname).as_i32().unwrap_or(0).max(0);
        let max_texture_size = get(gl::MAX_TEXTURE_SIZE);
        let max_cube_map_size = get(gl::MAX_CUBE_MAP_TEXTURE_SIZE);
        let (max_3d_texture_size, max_array_texture_layers) = match version {
            WebGLVersion::WebGL1 => (0, 0),
            WebGLVersion::WebGL2 => (
                get(gl::MAX_3D_TEXTURE_SIZE),
                get(gl::MAX_ARRAY_TEXTURE_LAYERS),
            ),
        };
        Self {
            texture_units: get(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS) as usize,
            vertex_attribs: get(gl::MAX_VERTEX_ATTRIBS) as usize,
            max_texture_size,
            max_texture_level: max_level(max_texture_size),
            max_cube_map_size,
            max_cube_map_level: max_level(max_cube_map_size),
            max_3d_texture_size,
            max_array_texture_layers,
            max_draw_buffers: get(gl::MAX_DRAW_BUFFERS).max(1) as u32,
        }
    }
}

/// Entry points shared by [`WebGLRenderingContext`] and
/// [`WebGL2RenderingContext`].
///
/// Method names follow the WebGL IDL in snake case. Protocol errors are
/// recorded on the context and read back with [`WebGLContext::get_error`].
///
/// [`WebGLRenderingContext`]: crate::WebGLRenderingContext
/// [`WebGL2RenderingContext`]: crate::WebGL2RenderingContext
#[allow(clippy::too_many_arguments)]
pub trait WebGLContext {
    type Driver: NativeDriver;

    fn base(&self) -> &ContextBase<Self::Driver>;
    fn base_mut(&mut self) -> &mut ContextBase<Self::Driver>;

    // ==================== Version hooks ====================

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<WebGLFramebuffer>);
    fn get_parameter(&mut self, pname: u32) -> ParameterValue;
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
    fn renderbuffer_storage(&mut self, target: u32, internal_format: u32, width: i32, height: i32);
    fn compile_shader(&mut self, shader: WebGLShader);

    // ==================== Context ====================

    fn version(&self) -> WebGLVersion {
        self.base().version
    }

    /// Access the native driver.
    fn driver(&self) -> &Self::Driver {
        &self.base().driver
    }

    fn driver_mut(&mut self) -> &mut Self::Driver {
        &mut self.base_mut().driver
    }

    /// Return and clear the lowest pending error.
    fn get_error(&mut self) -> u32 {
        self.base_mut().get_error()
    }

    fn get_context_attributes(&self) -> ContextAttributes {
        self.base().attributes
    }

    fn is_context_lost(&self) -> bool {
        self.base().destroyed
    }

    fn get_extension(&mut self, name: &str) -> Option<Extension> {
        self.base_mut().get_extension(name)
    }

    fn get_supported_extensions(&mut self) -> Vec<String> {
        self.base_mut().get_supported_extensions()
    }

    fn drawing_buffer_width(&self) -> i32 {
        self.base().width
    }

    fn drawing_buffer_height(&self) -> i32 {
        self.base().height
    }

    /// Reallocate the default framebuffer.
    fn resize(&mut self, width: i32, height: i32) -> Result<(), ContextError> {
        self.base_mut().resize(width, height)
    }

    /// Release the native context. Idempotent.
    fn destroy(&mut self) {
        self.base_mut().destroy()
    }

    // ==================== Objects ====================

    fn create_buffer(&mut self) -> Option<WebGLBuffer> {
        self.base_mut().create_buffer()
    }

    fn create_texture(&mut self) -> Option<WebGLTexture> {
        self.base_mut().create_texture()
    }

    fn create_framebuffer(&mut self) -> Option<WebGLFramebuffer> {
        self.base_mut().create_framebuffer()
    }

    fn create_renderbuffer(&mut self) -> Option<WebGLRenderbuffer> {
        self.base_mut().create_renderbuffer()
    }

    fn create_program(&mut self) -> Option<WebGLProgram> {
        self.base_mut().create_program()
    }

    fn create_shader(&mut self, shader_type: u32) -> Option<WebGLShader> {
        self.base_mut().create_shader(shader_type)
    }

    fn delete_buffer(&mut self, buffer: WebGLBuffer) {
        self.base_mut().delete_buffer(buffer)
    }

    fn delete_texture(&mut self, texture: WebGLTexture) {
        self.base_mut().delete_texture(texture)
    }

    fn delete_framebuffer(&mut self, framebuffer: WebGLFramebuffer) {
        self.base_mut().delete_framebuffer(framebuffer)
    }

    fn delete_renderbuffer(&mut self, renderbuffer: WebGLRenderbuffer) {
        self.base_mut().delete_renderbuffer(renderbuffer)
    }

    fn delete_program(&mut self, program: WebGLProgram) {
        self.base_mut().delete_program(program)
    }

    fn delete_shader(&mut self, shader: WebGLShader) {
        self.base_mut().delete_shader(shader)
    }

    fn is_buffer(&mut self, buffer: WebGLBuffer) -> bool {
        self.base_mut().is_object(buffer)
    }

    fn is_texture(&mut self, texture: WebGLTexture) -> bool {
        self.base_mut().is_object(texture)
    }

    fn is_framebuffer(&mut self, framebuffer: WebGLFramebuffer) -> bool {
        self.base_mut().is_object(framebuffer)
    }

    fn is_renderbuffer(&mut self, renderbuffer: WebGLRenderbuffer) -> bool {
        self.base_mut().is_object(renderbuffer)
    }

    fn is_program(&mut self, program: WebGLProgram) -> bool {
        self.base_mut().is_object(program)
    }

    fn is_shader(&mut self, shader: WebGLShader) -> bool {
        self.base_mut().is_object(shader)
    }

    // ==================== Bindings ====================

    fn bind_buffer(&mut self, target: u32, buffer: Option<WebGLBuffer>) {
        self.base_mut().bind_buffer(target, buffer)
    }

    fn bind_renderbuffer(&mut self, target: u32, renderbuffer: Option<WebGLRenderbuffer>) {
        self.base_mut().bind_renderbuffer(target, renderbuffer)
    }

    fn bind_texture(&mut self, target: u32, texture: Option<WebGLTexture>) {
        self.base_mut().bind_texture(target, texture)
    }

    fn active_texture(&mut self, texture: u32) {
        self.base_mut().active_texture(texture)
    }

    fn use_program(&mut self, program: Option<WebGLProgram>) {
        self.base_mut().use_program(program)
    }

    // ==================== Buffers ====================

    /// Allocate and fill the bound buffer.
    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        self.base_mut()
            .buffer_data(target, data.len() as i64, Some(data), usage)
    }

    /// Allocate `size` zeroed bytes for the bound buffer.
    fn buffer_data_size(&mut self, target: u32, size: i64, usage: u32) {
        self.base_mut().buffer_data(target, size, None, usage)
    }

    fn buffer_sub_data(&mut self, target: u32, offset: i64, data: &[u8]) {
        self.base_mut().buffer_sub_data(target, offset, data)
    }

    fn get_buffer_parameter(&mut self, target: u32, pname: u32) -> ParameterValue {
        self.base_mut().get_buffer_parameter(target, pname)
    }

    // ==================== Framebuffers ====================

    fn check_framebuffer_status(&mut self, target: u32) -> u32 {
        self.base_mut().check_framebuffer_status(target)
    }

    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: Option<WebGLTexture>,
        level: i32,
    ) {
        self.base_mut()
            .framebuffer_texture_2d(target, attachment, textarget, texture, level)
    }

    fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: Option<WebGLRenderbuffer>,
    ) {
        self.base_mut()
            .framebuffer_renderbuffer(target, attachment, renderbuffer_target, renderbuffer)
    }

    fn get_framebuffer_attachment_parameter(
        &mut self,
        target: u32,
        attachment: u32,
        pname: u32,
    ) -> ParameterValue {
        self.base_mut()
            .get_framebuffer_attachment_parameter(target, attachment, pname)
    }

    fn get_renderbuffer_parameter(&mut self, target: u32, pname: u32) -> ParameterValue {
        self.base_mut().get_renderbuffer_parameter(target, pname)
    }

    // ==================== Textures ====================

    /// `texImage2D` from an image source; the internal format, format and
    /// type apply to `image.data`.
    fn tex_image_2d_source(
        &mut self,
        target: u32,
        level: i32,
        internal_format: u32,
        format: u32,
        ty: u32,
        image: ImageData<'_>,
    ) {
        self.tex_image_2d(
            target,
            level,
            internal_format,
            image.width,
            image.height,
            0,
            format,
            ty,
            Some(image.data),
        )
    }

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
    ) {
        if matches!(target, gl::TEXTURE_3D | gl::TEXTURE_2D_ARRAY) {
            self.base_mut().set_error(GlError::InvalidEnum);
            return;
        }
        self.base_mut().tex_sub_image(
            target,
            level,
            [xoffset, yoffset, 0],
            [width, height, 1],
            format,
            ty,
            pixels,
        )
    }

    fn tex_sub_image_2d_source(
        &mut self,
        target: u32,
        level: i32,
        xoffset: i32,
        yoffset: i32,
        format: u32,
        ty: u32,
        image: ImageData<'_>,
    ) {
        self.tex_sub_image_2d(
            target,
            level,
            xoffset,
            yoffset,
            image.width,
            image.height,
            format,
            ty,
            image.data,
        )
    }

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
    ) {
        self.base_mut()
            .copy_tex_image_2d(target, level, internal_format, x, y, width, height, border)
    }

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
    ) {
        self.base_mut()
            .copy_tex_sub_image_2d(target, level, xoffset, yoffset, x, y, width, height)
    }

    /// No compressed formats are exposed, so every upload is rejected.
    fn compressed_tex_image_2d(
        &mut self,
        _target: u32,
        _level: i32,
        _internal_format: u32,
        _width: i32,
        _height: i32,
        _border: i32,
        _data: &[u8],
    ) {
        self.base_mut().set_error(GlError::InvalidEnum)
    }

    fn compressed_tex_sub_image_2d(
        &mut self,
        _target: u32,
        _level: i32,
        _xoffset: i32,
        _yoffset: i32,
        _width: i32,
        _height: i32,
        _format: u32,
        _data: &[u8],
    ) {
        self.base_mut().set_error(GlError::InvalidEnum)
    }

    fn tex_parameterf(&mut self, target: u32, pname: u32, param: f32) {
        self.base_mut().tex_parameter(target, pname, param, false)
    }

    fn tex_parameteri(&mut self, target: u32, pname: u32, param: i32) {
        self.base_mut().tex_parameter(target, pname, param as f32, true)
    }

    fn get_tex_parameter(&mut self, target: u32, pname: u32) -> ParameterValue {
        self.base_mut().get_tex_parameter(target, pname)
    }

    fn generate_mipmap(&mut self, target: u32) {
        self.base_mut().generate_mipmap(target)
    }

    // ==================== Fixed function ====================

    fn enable(&mut self, cap: u32) {
        self.base_mut().set_capability(cap, true)
    }

    fn disable(&mut self, cap: u32) {
        self.base_mut().set_capability(cap, false)
    }

    fn is_enabled(&mut self, cap: u32) -> bool {
        self.base_mut().is_enabled(cap)
    }

    fn blend_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32) {
        self.driver_mut().blend_color(red, green, blue, alpha)
    }

    fn blend_equation(&mut self, mode: u32) {
        self.base_mut().blend_equation_separate(mode, mode)
    }

    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32) {
        self.base_mut().blend_equation_separate(mode_rgb, mode_alpha)
    }

    fn blend_func(&mut self, src: u32, dst: u32) {
        self.base_mut().blend_func_separate(src, dst, src, dst)
    }

    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        self.base_mut()
            .blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha)
    }

    fn clear_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32) {
        self.driver_mut().clear_color(red, green, blue, alpha)
    }

    fn clear_depth(&mut self, depth: f32) {
        self.driver_mut().clear_depth(depth)
    }

    fn clear_stencil(&mut self, stencil: i32) {
        self.base_mut().clear_stencil(stencil)
    }

    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool) {
        self.driver_mut().color_mask(red, green, blue, alpha)
    }

    fn cull_face(&mut self, mode: u32) {
        self.base_mut().cull_face(mode)
    }

    fn front_face(&mut self, mode: u32) {
        self.base_mut().front_face(mode)
    }

    fn depth_func(&mut self, func: u32) {
        self.base_mut().depth_func(func)
    }

    fn depth_mask(&mut self, flag: bool) {
        self.driver_mut().depth_mask(flag)
    }

    fn depth_range(&mut self, z_near: f32, z_far: f32) {
        self.base_mut().depth_range(z_near, z_far)
    }

    fn hint(&mut self, target: u32, mode: u32) {
        self.base_mut().hint(target, mode)
    }

    fn line_width(&mut self, width: f32) {
        self.base_mut().line_width(width)
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        self.driver_mut().polygon_offset(factor, units)
    }

    fn sample_coverage(&mut self, value: f32, invert: bool) {
        self.driver_mut().sample_coverage(value, invert)
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.base_mut().scissor(x, y, width, height)
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.base_mut().viewport(x, y, width, height)
    }

    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32) {
        self.base_mut()
            .stencil_func_separate(gl::FRONT_AND_BACK, func, reference, mask)
    }

    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32) {
        self.base_mut()
            .stencil_func_separate(face, func, reference, mask)
    }

    fn stencil_mask(&mut self, mask: u32) {
        self.base_mut().stencil_mask_separate(gl::FRONT_AND_BACK, mask)
    }

    fn stencil_mask_separate(&mut self, face: u32, mask: u32) {
        self.base_mut().stencil_mask_separate(face, mask)
    }

    fn stencil_op(&mut self, fail: u32, zfail: u32, zpass: u32) {
        self.base_mut()
            .stencil_op_separate(gl::FRONT_AND_BACK, fail, zfail, zpass)
    }

    fn stencil_op_separate(&mut self, face: u32, fail: u32, zfail: u32, zpass: u32) {
        self.base_mut().stencil_op_separate(face, fail, zfail, zpass)
    }

    fn pixel_storei(&mut self, pname: u32, param: i32) {
        self.base_mut().pixel_storei(pname, param)
    }

    fn finish(&mut self) {
        self.driver_mut().finish()
    }

    fn flush(&mut self) {
        self.driver_mut().flush()
    }

    // ==================== Drawing ====================

    fn clear(&mut self, mask: u32) {
        self.base_mut().clear(mask)
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.base_mut().draw_arrays(mode, first, count, None)
    }

    /// Draw `count` indices of type `ty` read at byte `offset` of the
    /// element array buffer.
    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: i64) {
        self.base_mut().draw_elements(mode, count, ty, offset, None)
    }

    // ==================== Vertex attributes ====================

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.base_mut().set_vertex_attrib_array(index, true)
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.base_mut().set_vertex_attrib_array(index, false)
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i64,
    ) {
        self.base_mut()
            .vertex_attrib_pointer(index, size, ty, normalized, stride, offset, false)
    }

    fn vertex_attrib1f(&mut self, index: u32, x: f32) {
        self.base_mut().vertex_attrib(index, 1, &[x])
    }

    fn vertex_attrib2f(&mut self, index: u32, x: f32, y: f32) {
        self.base_mut().vertex_attrib(index, 2, &[x, y])
    }

    fn vertex_attrib3f(&mut self, index: u32, x: f32, y: f32, z: f32) {
        self.base_mut().vertex_attrib(index, 3, &[x, y, z])
    }

    fn vertex_attrib4f(&mut self, index: u32, x: f32, y: f32, z: f32, w: f32) {
        self.base_mut().vertex_attrib(index, 4, &[x, y, z, w])
    }

    fn vertex_attrib1fv(&mut self, index: u32, values: &[f32]) {
        self.base_mut().vertex_attrib(index, 1, values)
    }

    fn vertex_attrib2fv(&mut self, index: u32, values: &[f32]) {
        self.base_mut().vertex_attrib(index, 2, values)
    }

    fn vertex_attrib3fv(&mut self, index: u32, values: &[f32]) {
        self.base_mut().vertex_attrib(index, 3, values)
    }

    fn vertex_attrib4fv(&mut self, index: u32, values: &[f32]) {
        self.base_mut().vertex_attrib(index, 4, values)
    }

    fn get_vertex_attrib(&mut self, index: u32, pname: u32) -> ParameterValue {
        self.base_mut().get_vertex_attrib(index, pname)
    }

    fn get_vertex_attrib_offset(&mut self, index: u32, pname: u32) -> usize {
        self.base_mut().get_vertex_attrib_offset(index, pname)
    }

    // ==================== Shaders and programs ====================

    fn shader_source(&mut self, shader: WebGLShader, source: &str) {
        self.base_mut().shader_source(shader, source)
    }

    fn get_shader_parameter(&mut self, shader: WebGLShader, pname: u32) -> ParameterValue {
        self.base_mut().get_shader_parameter(shader, pname)
    }

    fn get_shader_info_log(&mut self, shader: WebGLShader) -> Option<String> {
        self.base_mut().get_shader_info_log(shader)
    }

    fn get_shader_source(&mut self, shader: WebGLShader) -> Option<String> {
        self.base_mut().get_shader_source(shader)
    }

    fn get_shader_precision_format(
        &mut self,
        shader_type: u32,
        precision_type: u32,
    ) -> Option<ShaderPrecisionFormat> {
        self.base_mut()
            .get_shader_precision_format(shader_type, precision_type)
    }

    fn attach_shader(&mut self, program: WebGLProgram, shader: WebGLShader) {
        self.base_mut().attach_shader(program, shader)
    }

    fn detach_shader(&mut self, program: WebGLProgram, shader: WebGLShader) {
        self.base_mut().detach_shader(program, shader)
    }

    fn get_attached_shaders(&mut self, program: WebGLProgram) -> Option<Vec<WebGLShader>> {
        self.base_mut().get_attached_shaders(program)
    }

    fn bind_attrib_location(&mut self, program: WebGLProgram, index: u32, name: &str) {
        self.base_mut().bind_attrib_location(program, index, name)
    }

    fn link_program(&mut self, program: WebGLProgram) {
        self.base_mut().link_program(program)
    }

    fn validate_program(&mut self, program: WebGLProgram) {
        self.base_mut().validate_program(program)
    }

    fn get_program_parameter(&mut self, program: WebGLProgram, pname: u32) -> ParameterValue {
        self.base_mut().get_program_parameter(program, pname)
    }

    fn get_program_info_log(&mut self, program: WebGLProgram) -> Option<String> {
        self.base_mut().get_program_info_log(program)
    }

    fn get_active_attrib(&mut self, program: WebGLProgram, index: u32) -> Option<ActiveInfo> {
        self.base_mut().get_active_attrib(program, index)
    }

    fn get_active_uniform(&mut self, program: WebGLProgram, index: u32) -> Option<ActiveInfo> {
        self.base_mut().get_active_uniform(program, index)
    }

    fn get_attrib_location(&mut self, program: WebGLProgram, name: &str) -> i32 {
        self.base_mut().get_attrib_location(program, name)
    }

    fn get_uniform_location(
        &mut self,
        program: WebGLProgram,
        name: &str,
    ) -> Option<WebGLUniformLocation> {
        self.base_mut().get_uniform_location(program, name)
    }

    fn get_uniform(&mut self, program: WebGLProgram, location: &WebGLUniformLocation) -> ParameterValue {
        self.base_mut().get_uniform(program, location)
    }

    // ==================== Uniforms ====================

    fn uniform1f(&mut self, location: Option<&WebGLUniformLocation>, x: f32) {
        self.base_mut().uniform_f(location, &[x])
    }

    fn uniform2f(&mut self, location: Option<&WebGLUniformLocation>, x: f32, y: f32) {
        self.base_mut().uniform_f(location, &[x, y])
    }

    fn uniform3f(&mut self, location: Option<&WebGLUniformLocation>, x: f32, y: f32, z: f32) {
        self.base_mut().uniform_f(location, &[x, y, z])
    }

    fn uniform4f(&mut self, location: Option<&WebGLUniformLocation>, x: f32, y: f32, z: f32, w: f32) {
        self.base_mut().uniform_f(location, &[x, y, z, w])
    }

    fn uniform1i(&mut self, location: Option<&WebGLUniformLocation>, x: i32) {
        self.base_mut().uniform_i(location, &[x])
    }

    fn uniform2i(&mut self, location: Option<&WebGLUniformLocation>, x: i32, y: i32) {
        self.base_mut().uniform_i(location, &[x, y])
    }

    fn uniform3i(&mut self, location: Option<&WebGLUniformLocation>, x: i32, y: i32, z: i32) {
        self.base_mut().uniform_i(location, &[x, y, z])
    }

    fn uniform4i(&mut self, location: Option<&WebGLUniformLocation>, x: i32, y: i32, z: i32, w: i32) {
        self.base_mut().uniform_i(location, &[x, y, z, w])
    }

    fn uniform1fv(&mut self, location: Option<&WebGLUniformLocation>, values: &[f32]) {
        self.base_mut().uniform_fv(location, 1, values)
    }

    fn uniform2fv(&mut self, location: Option<&WebGLUniformLocation>, values: &[f32]) {
        self.base_mut().uniform_fv(location, 2, values)
    }

    fn uniform3fv(&mut self, location: Option<&WebGLUniformLocation>, values: &[f32]) {
        self.base_mut().uniform_fv(location, 3, values)
    }

    fn uniform4fv(&mut self, location: Option<&WebGLUniformLocation>, values: &[f32]) {
        self.base_mut().uniform_fv(location, 4, values)
    }

    fn uniform1iv(&mut self, location: Option<&WebGLUniformLocation>, values: &[i32]) {
        self.base_mut().uniform_iv(location, 1, values)
    }

    fn uniform2iv(&mut self, location: Option<&WebGLUniformLocation>, values: &[i32]) {
        self.base_mut().uniform_iv(location, 2, values)
    }

    fn uniform3iv(&mut self, location: Option<&WebGLUniformLocation>, values: &[i32]) {
        self.base_mut().uniform_iv(location, 3, values)
    }

    fn uniform4iv(&mut self, location: Option<&WebGLUniformLocation>, values: &[i32]) {
        self.base_mut().uniform_iv(location, 4, values)
    }

    fn uniform_matrix2fv(&mut self, location: Option<&WebGLUniformLocation>, transpose: bool, values: &[f32]) {
        self.base_mut().uniform_matrix(location, transpose, 2, 2, values)
    }

    fn uniform_matrix3fv(&mut self, location: Option<&WebGLUniformLocation>, transpose: bool, values: &[f32]) {
        self.base_mut().uniform_matrix(location, transpose, 3, 3, values)
    }

    fn uniform_matrix4fv(&mut self, location: Option<&WebGLUniformLocation>, transpose: bool, values: &[f32]) {
        self.base_mut().uniform_matrix(location, transpose, 4, 4, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SoftwareDriver;

    #[test]
    fn test_version_targets() {
        assert!(WebGLVersion::WebGL1.is_texture_target(gl::TEXTURE_CUBE_MAP));
        assert!(!WebGLVersion::WebGL1.is_texture_target(gl::TEXTURE_3D));
        assert!(WebGLVersion::WebGL2.is_texture_target(gl::TEXTURE_2D_ARRAY));
        assert!(!WebGLVersion::WebGL1.is_framebuffer_target(gl::READ_FRAMEBUFFER));
        assert!(WebGLVersion::WebGL2.is_framebuffer_target(gl::DRAW_FRAMEBUFFER));
    }

    #[test]
    fn test_max_level() {
        assert_eq!(max_level(1), 0);
        assert_eq!(max_level(1024), 10);
        assert_eq!(max_level(1000), 10);
        assert_eq!(max_level(0), 0);
    }

    #[test]
    fn test_limits_from_driver() {
        let mut driver = SoftwareDriver::new();
        let v1 = DriverLimits::query(&mut driver, WebGLVersion::WebGL1);
        assert!(v1.texture_units > 0);
        assert!(v1.vertex_attribs > 0);
        assert_eq!(v1.max_3d_texture_size, 0);
        let v2 = DriverLimits::query(&mut driver, WebGLVersion::WebGL2);
        assert!(v2.max_3d_texture_size > 0);
        assert!(v2.max_draw_buffers >= 1);
    }
}
