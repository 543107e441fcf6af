//! The WebGL 2 context.

use crate::attributes::ContextAttributes;
use crate::constants as gl;
use crate::context::{ContextBase, ImageUpload, WebGLContext, WebGLVersion};
use crate::driver::NativeDriver;
use crate::error::{ContextError, GlError, GlResult};
use crate::extensions::ExtensionId;
use crate::formats;
use crate::objects::{WebGLFramebuffer, WebGLShader, WebGLTexture, WebGLVertexArrayObject};
use crate::uniforms::WebGLUniformLocation;
use crate::value::ParameterValue;
use crate::webgl1;

/// Pixel size of `(internal_format, format, ty)` against the format table.
fn upload_pixel_size(internal_format: u32, format: u32, ty: u32) -> GlResult<usize> {
    if formats::lookup(internal_format).is_none() {
        return Err(GlError::InvalidValue);
    }
    if !formats::verify_format(internal_format, format, ty) {
        return Err(GlError::InvalidOperation);
    }
    Ok(formats::pixel_size(internal_format, ty))
}

/// A WebGL 2 rendering context over a native driver.
#[derive(Debug)]
pub struct WebGL2RenderingContext<D: NativeDriver> {
    base: ContextBase<D>,
}

impl<D: NativeDriver> WebGL2RenderingContext<D> {
    /// Create a context with a `width` x `height` drawing buffer.
    ///
    /// The attributes must ask for a WebGL 2 context.
    pub fn new(
        driver: D,
        width: i32,
        height: i32,
        attributes: ContextAttributes,
    ) -> Result<Self, ContextError> {
        if !attributes.create_webgl2_context {
            return Err(ContextError::VersionMismatch {
                requested: WebGLVersion::WebGL1.name(),
                created: WebGLVersion::WebGL2.name(),
            });
        }
        let base = ContextBase::new(driver, WebGLVersion::WebGL2, width, height, attributes)?;
        Ok(Self { base })
    }

    fn color_buffer_float(&self) -> bool {
        self.base.extension_enabled(ExtensionId::ExtColorBufferFloat)
    }

    // ==================== Volume textures ====================

    #[allow(clippy::too_many_arguments)]
    pub fn tex_image_3d(
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
    ) {
        if !matches!(target, gl::TEXTURE_3D | gl::TEXTURE_2D_ARRAY) {
            self.base.set_error(GlError::InvalidEnum);
            return;
        }
        let pixel_size = self
            .base
            .report(upload_pixel_size(internal_format, format, ty))
            .unwrap_or(0);
        self.base.tex_image(ImageUpload {
            target,
            level,
            internal_format,
            width,
            height,
            depth,
            border,
            format,
            ty,
            pixel_size,
            pixels,
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn tex_sub_image_3d(
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
    ) {
        if !matches!(target, gl::TEXTURE_3D | gl::TEXTURE_2D_ARRAY) {
            self.base.set_error(GlError::InvalidEnum);
            return;
        }
        self.base.tex_sub_image(
            target,
            level,
            [xoffset, yoffset, zoffset],
            [width, height, depth],
            format,
            ty,
            pixels,
        );
    }

    /// Allocate an immutable 2D or cube map texture with `levels` mips.
    pub fn tex_storage_2d(
        &mut self,
        target: u32,
        levels: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        self.base
            .tex_storage(target, levels, internal_format, width, height, None);
    }

    pub fn tex_storage_3d(
        &mut self,
        target: u32,
        levels: i32,
        internal_format: u32,
        width: i32,
        height: i32,
        depth: i32,
    ) {
        self.base
            .tex_storage(target, levels, internal_format, width, height, Some(depth));
    }

    // ==================== Vertex arrays ====================

    pub fn create_vertex_array(&mut self) -> Option<WebGLVertexArrayObject> {
        self.base.create_vertex_array()
    }

    pub fn delete_vertex_array(&mut self, array: WebGLVertexArrayObject) {
        self.base.delete_vertex_array(array);
    }

    pub fn is_vertex_array(&mut self, array: WebGLVertexArrayObject) -> bool {
        self.base.is_vertex_array(array)
    }

    pub fn bind_vertex_array(&mut self, array: Option<WebGLVertexArrayObject>) {
        self.base.bind_vertex_array(array);
    }

    pub fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        self.base.vertex_attrib_divisor(index, divisor);
    }

    /// Integer attribute pointer; values reach the shader unconverted.
    pub fn vertex_attrib_i_pointer(&mut self, index: u32, size: i32, ty: u32, stride: i32, offset: i64) {
        self.base
            .vertex_attrib_pointer(index, size, ty, false, stride, offset, true);
    }

    // ==================== Draws ====================

    pub fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        self.base.draw_arrays(mode, first, count, Some(instances));
    }

    pub fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        ty: u32,
        offset: i64,
        instances: i32,
    ) {
        self.base
            .draw_elements(mode, count, ty, offset, Some(instances));
    }

    pub fn draw_buffers(&mut self, buffers: &[u32]) {
        let max = self.base.limits.max_draw_buffers;
        self.base.draw_buffers(buffers, max);
    }

    // ==================== Renderbuffers ====================

    pub fn renderbuffer_storage_multisample(
        &mut self,
        target: u32,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        let format_ok = formats::is_multisample_format(internal_format, self.color_buffer_float());
        self.base.renderbuffer_storage(
            target,
            Some(samples),
            internal_format,
            width,
            height,
            format_ok,
        );
    }

    // ==================== Unsigned uniforms ====================

    pub fn uniform1ui(&mut self, location: Option<&WebGLUniformLocation>, x: u32) {
        self.base.uniform_ui(location, &[x]);
    }

    pub fn uniform2ui(&mut self, location: Option<&WebGLUniformLocation>, x: u32, y: u32) {
        self.base.uniform_ui(location, &[x, y]);
    }

    pub fn uniform3ui(&mut self, location: Option<&WebGLUniformLocation>, x: u32, y: u32, z: u32) {
        self.base.uniform_ui(location, &[x, y, z]);
    }

    pub fn uniform4ui(&mut self, location: Option<&WebGLUniformLocation>, x: u32, y: u32, z: u32, w: u32) {
        self.base.uniform_ui(location, &[x, y, z, w]);
    }

    pub fn uniform1uiv(&mut self, location: Option<&WebGLUniformLocation>, values: &[u32]) {
        self.base.uniform_uiv(location, 1, values);
    }

    pub fn uniform2uiv(&mut self, location: Option<&WebGLUniformLocation>, values: &[u32]) {
        self.base.uniform_uiv(location, 2, values);
    }

    pub fn uniform3uiv(&mut self, location: Option<&WebGLUniformLocation>, values: &[u32]) {
        self.base.uniform_uiv(location, 3, values);
    }

    pub fn uniform4uiv(&mut self, location: Option<&WebGLUniformLocation>, values: &[u32]) {
        self.base.uniform_uiv(location, 4, values);
    }

    // ==================== Non-square matrices ====================

    pub fn uniform_matrix2x3fv(&mut self, location: Option<&WebGLUniformLocation>, transpose: bool, values: &[f32]) {
        self.base.uniform_matrix(location, transpose, 2, 3, values);
    }

    pub fn uniform_matrix3x2fv(&mut self, location: Option<&WebGLUniformLocation>, transpose: bool, values: &[f32]) {
        self.base.uniform_matrix(location, transpose, 3, 2, values);
    }

    pub fn uniform_matrix2x4fv(&mut self, location: Option<&WebGLUniformLocation>, transpose: bool, values: &[f32]) {
        self.base.uniform_matrix(location, transpose, 2, 4, values);
    }

    pub fn uniform_matrix4x2fv(&mut self, location: Option<&WebGLUniformLocation>, transpose: bool, values: &[f32]) {
        self.base.uniform_matrix(location, transpose, 4, 2, values);
    }

    pub fn uniform_matrix3x4fv(&mut self, location: Option<&WebGLUniformLocation>, transpose: bool, values: &[f32]) {
        self.base.uniform_matrix(location, transpose, 3, 4, values);
    }

    pub fn uniform_matrix4x3fv(&mut self, location: Option<&WebGLUniformLocation>, transpose: bool, values: &[f32]) {
        self.base.uniform_matrix(location, transpose, 4, 3, values);
    }
}

impl<D: NativeDriver> WebGLContext for WebGL2RenderingContext<D> {
    type Driver = D;

    fn base(&self) -> &ContextBase<D> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ContextBase<D> {
        &mut self.base
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<WebGLFramebuffer>) {
        if !self.base.version.is_framebuffer_target(target) {
            self.base.set_error(GlError::InvalidEnum);
            return;
        }
        self.base.bind_framebuffer_target(target, framebuffer);
    }

    fn get_parameter(&mut self, pname: u32) -> ParameterValue {
        let registry = &self.base.registry;
        match pname {
            gl::VERSION => ParameterValue::String(format!(
                "WebGL 2.0 stack-gl {}",
                env!("CARGO_PKG_VERSION")
            )),
            gl::SHADING_LANGUAGE_VERSION => {
                ParameterValue::String("WebGL GLSL ES 3.0 stack-gl".to_string())
            }
            gl::READ_FRAMEBUFFER_BINDING => registry
                .wrap_opt::<WebGLFramebuffer>(self.base.read_framebuffer)
                .into(),
            gl::VERTEX_ARRAY_BINDING => registry
                .wrap_opt::<WebGLVertexArrayObject>(self.base.active_vertex_array)
                .into(),
            gl::TEXTURE_BINDING_3D => registry
                .wrap_opt::<WebGLTexture>(self.base.active_unit().bind_3d)
                .into(),
            gl::TEXTURE_BINDING_2D_ARRAY => registry
                .wrap_opt::<WebGLTexture>(self.base.active_unit().bind_2d_array)
                .into(),
            _ => self.base.get_parameter_shared(pname),
        }
    }

    /// Formats come from the sized internal format table.
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
    ) {
        if matches!(target, gl::TEXTURE_3D | gl::TEXTURE_2D_ARRAY) {
            self.base.set_error(GlError::InvalidEnum);
            return;
        }
        let pixel_size = self
            .base
            .report(upload_pixel_size(internal_format, format, ty))
            .unwrap_or(0);
        self.base.tex_image(ImageUpload {
            target,
            level,
            internal_format,
            width,
            height,
            depth: 1,
            border,
            format,
            ty,
            pixel_size,
            pixels,
        });
    }

    /// Adds `RGBA` / `FLOAT` readback to the WebGL 1 pair.
    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &mut [u8],
    ) {
        let size = match (format, ty) {
            (gl::RGBA, gl::FLOAT) => Ok(16),
            _ => webgl1::read_pixel_size(format, ty),
        };
        let Some(bytes_per_pixel) = self.base.report(size) else {
            return;
        };
        self.base
            .read_pixels(x, y, width, height, format, ty, bytes_per_pixel, pixels);
    }

    fn renderbuffer_storage(&mut self, target: u32, internal_format: u32, width: i32, height: i32) {
        let format_ok = formats::is_renderable_color_format(internal_format, self.color_buffer_float())
            || formats::is_renderable_depth_stencil_format(internal_format);
        self.base
            .renderbuffer_storage(target, None, internal_format, width, height, format_ok);
    }

    /// Sources naming reserved identifiers fail to compile before reaching
    /// the driver.
    fn compile_shader(&mut self, shader: WebGLShader) {
        self.base.compile_shader(shader, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SoftwareDriver;

    fn context() -> WebGL2RenderingContext<SoftwareDriver> {
        WebGL2RenderingContext::new(SoftwareDriver::new(), 4, 4, ContextAttributes::webgl2())
            .expect("context")
    }

    #[test]
    fn test_requires_webgl2_attributes() {
        let result = WebGL2RenderingContext::new(
            SoftwareDriver::new(),
            4,
            4,
            ContextAttributes::default(),
        );
        assert!(matches!(result, Err(ContextError::VersionMismatch { .. })));
    }

    #[test]
    fn test_upload_pixel_size() {
        assert_eq!(upload_pixel_size(gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE), Ok(4));
        assert_eq!(
            upload_pixel_size(gl::RGBA8, gl::RGB, gl::UNSIGNED_BYTE),
            Err(GlError::InvalidOperation)
        );
        assert_eq!(upload_pixel_size(0x1234, gl::RGBA, gl::UNSIGNED_BYTE), Err(GlError::InvalidValue));
    }

    #[test]
    fn test_version_strings() {
        let mut ctx = context();
        assert!(ctx
            .get_parameter(gl::VERSION)
            .as_str()
            .is_some_and(|v| v.starts_with("WebGL 2.0 stack-gl")));
        assert_eq!(
            ctx.get_parameter(gl::SHADING_LANGUAGE_VERSION).as_str(),
            Some("WebGL GLSL ES 3.0 stack-gl")
        );
    }

    #[test]
    fn test_split_framebuffer_bindings() {
        let mut ctx = context();
        let framebuffer = ctx.create_framebuffer();
        ctx.bind_framebuffer(gl::READ_FRAMEBUFFER, framebuffer);
        assert_eq!(ctx.get_error(), gl::NO_ERROR);
        assert_eq!(
            ctx.get_parameter(gl::READ_FRAMEBUFFER_BINDING),
            ParameterValue::from(framebuffer)
        );
        assert_eq!(ctx.get_parameter(gl::DRAW_FRAMEBUFFER_BINDING), ParameterValue::Null);
    }

    #[test]
    fn test_vertex_array_binding() {
        let mut ctx = context();
        let array = ctx.create_vertex_array().expect("array");
        assert!(!ctx.is_vertex_array(array));
        ctx.bind_vertex_array(Some(array));
        assert!(ctx.is_vertex_array(array));
        assert_eq!(
            ctx.get_parameter(gl::VERTEX_ARRAY_BINDING),
            ParameterValue::from(Some(array))
        );
        ctx.bind_vertex_array(None);
        ctx.delete_vertex_array(array);
        assert!(!ctx.is_vertex_array(array));
    }

    #[test]
    fn test_tex_storage_is_immutable() {
        let mut ctx = context();
        let texture = ctx.create_texture();
        ctx.bind_texture(gl::TEXTURE_2D, texture);
        ctx.tex_storage_2d(gl::TEXTURE_2D, 3, gl::RGBA8, 4, 4);
        assert_eq!(ctx.get_error(), gl::NO_ERROR);
        ctx.tex_storage_2d(gl::TEXTURE_2D, 1, gl::RGBA8, 4, 4);
        assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
    }

    #[test]
    fn test_tex_image_3d_targets() {
        let mut ctx = context();
        ctx.tex_image_3d(gl::TEXTURE_2D, 0, gl::RGBA8, 1, 1, 1, 0, gl::RGBA, gl::UNSIGNED_BYTE, None);
        assert_eq!(ctx.get_error(), gl::INVALID_ENUM);
        let texture = ctx.create_texture();
        ctx.bind_texture(gl::TEXTURE_3D, texture);
        ctx.tex_image_3d(gl::TEXTURE_3D, 0, gl::RGBA8, 2, 2, 2, 0, gl::RGBA, gl::UNSIGNED_BYTE, None);
        assert_eq!(ctx.get_error(), gl::NO_ERROR);
    }

    #[test]
    fn test_draw_buffers_on_default_framebuffer() {
        let mut ctx = context();
        ctx.draw_buffers(&[gl::BACK]);
        assert_eq!(ctx.get_error(), gl::NO_ERROR);
        ctx.draw_buffers(&[gl::COLOR_ATTACHMENT0]);
        assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
        ctx.draw_buffers(&[]);
        assert_eq!(ctx.get_error(), gl::INVALID_ENUM);
    }
}
