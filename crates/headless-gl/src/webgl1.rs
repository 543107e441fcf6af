//! The WebGL 1 context.

use crate::attributes::ContextAttributes;
use crate::constants as gl;
use crate::context::{ContextBase, ImageUpload, WebGLContext, WebGLVersion};
use crate::driver::NativeDriver;
use crate::error::{ContextError, GlError};
use crate::extensions::ExtensionId;
use crate::formats;
use crate::objects::{WebGLFramebuffer, WebGLShader, WebGLVertexArrayObject};
use crate::value::ParameterValue;

/// Pixel size of a readback in the one format pair WebGL 1 guarantees.
pub(crate) fn read_pixel_size(format: u32, ty: u32) -> Result<usize, GlError> {
    match (format, ty) {
        (gl::RGBA, gl::UNSIGNED_BYTE) => Ok(4),
        (
            gl::RGBA | gl::RGB | gl::ALPHA,
            gl::UNSIGNED_BYTE
            | gl::UNSIGNED_SHORT_5_6_5
            | gl::UNSIGNED_SHORT_4_4_4_4
            | gl::UNSIGNED_SHORT_5_5_5_1
            | gl::FLOAT,
        ) => Err(GlError::InvalidOperation),
        _ => Err(GlError::InvalidEnum),
    }
}

/// A WebGL 1 rendering context over a native driver.
#[derive(Debug)]
pub struct WebGLRenderingContext<D: NativeDriver> {
    base: ContextBase<D>,
}

impl<D: NativeDriver> WebGLRenderingContext<D> {
    /// Create a context with a `width` x `height` drawing buffer.
    pub fn new(
        driver: D,
        width: i32,
        height: i32,
        attributes: ContextAttributes,
    ) -> Result<Self, ContextError> {
        if attributes.create_webgl2_context {
            return Err(ContextError::VersionMismatch {
                requested: WebGLVersion::WebGL2.name(),
                created: WebGLVersion::WebGL1.name(),
            });
        }
        let base = ContextBase::new(driver, WebGLVersion::WebGL1, width, height, attributes)?;
        Ok(Self { base })
    }

    // ==================== ANGLE_instanced_arrays ====================

    pub fn vertex_attrib_divisor_angle(&mut self, index: u32, divisor: u32) {
        if self.base.require_extension(ExtensionId::AngleInstancedArrays) {
            self.base.vertex_attrib_divisor(index, divisor);
        }
    }

    pub fn draw_arrays_instanced_angle(&mut self, mode: u32, first: i32, count: i32, primcount: i32) {
        if self.base.require_extension(ExtensionId::AngleInstancedArrays) {
            self.base.draw_arrays(mode, first, count, Some(primcount));
        }
    }

    pub fn draw_elements_instanced_angle(
        &mut self,
        mode: u32,
        count: i32,
        ty: u32,
        offset: i64,
        primcount: i32,
    ) {
        if self.base.require_extension(ExtensionId::AngleInstancedArrays) {
            self.base
                .draw_elements(mode, count, ty, offset, Some(primcount));
        }
    }

    // ==================== WEBGL_draw_buffers ====================

    pub fn draw_buffers_webgl(&mut self, buffers: &[u32]) {
        let Some(max) = self.base.extensions.draw_buffers().map(|e| e.max_draw_buffers) else {
            self.base.set_error(GlError::InvalidOperation);
            return;
        };
        self.base.draw_buffers(buffers, max);
    }

    // ==================== OES_vertex_array_object ====================

    pub fn create_vertex_array_oes(&mut self) -> Option<WebGLVertexArrayObject> {
        if !self.base.require_extension(ExtensionId::OesVertexArrayObject) {
            return None;
        }
        self.base.create_vertex_array()
    }

    pub fn delete_vertex_array_oes(&mut self, array: WebGLVertexArrayObject) {
        if self.base.require_extension(ExtensionId::OesVertexArrayObject) {
            self.base.delete_vertex_array(array);
        }
    }

    pub fn is_vertex_array_oes(&mut self, array: WebGLVertexArrayObject) -> bool {
        self.base.require_extension(ExtensionId::OesVertexArrayObject)
            && self.base.is_vertex_array(array)
    }

    pub fn bind_vertex_array_oes(&mut self, array: Option<WebGLVertexArrayObject>) {
        if self.base.require_extension(ExtensionId::OesVertexArrayObject) {
            self.base.bind_vertex_array(array);
        }
    }
}

impl<D: NativeDriver> WebGLContext for WebGLRenderingContext<D> {
    type Driver = D;

    fn base(&self) -> &ContextBase<D> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ContextBase<D> {
        &mut self.base
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<WebGLFramebuffer>) {
        if target != gl::FRAMEBUFFER {
            self.base.set_error(GlError::InvalidEnum);
            return;
        }
        self.base.bind_framebuffer_target(target, framebuffer);
    }

    fn get_parameter(&mut self, pname: u32) -> ParameterValue {
        match pname {
            gl::VERSION => ParameterValue::String(format!(
                "WebGL 1.0 stack-gl {}",
                env!("CARGO_PKG_VERSION")
            )),
            gl::SHADING_LANGUAGE_VERSION => {
                ParameterValue::String("WebGL GLSL ES 1.0 stack-gl".to_string())
            }
            gl::VERTEX_ARRAY_BINDING_OES => {
                if !self.base.extension_enabled(ExtensionId::OesVertexArrayObject) {
                    self.base.set_error(GlError::InvalidEnum);
                    return ParameterValue::Null;
                }
                self.base
                    .registry
                    .wrap_opt::<WebGLVertexArrayObject>(self.base.active_vertex_array)
                    .into()
            }
            gl::READ_FRAMEBUFFER_BINDING | gl::TEXTURE_BINDING_3D | gl::TEXTURE_BINDING_2D_ARRAY => {
                self.base.set_error(GlError::InvalidEnum);
                ParameterValue::Null
            }
            _ => self.base.get_parameter_shared(pname),
        }
    }

    /// Formats are the unsized WebGL 1 set; `internal_format` must equal
    /// `format` and float data needs `OES_texture_float`.
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
        let size = match formats::legacy_pixel_size(format, ty) {
            Ok(_) if internal_format != format => Err(GlError::InvalidOperation),
            Ok(_) if ty == gl::FLOAT && !self.base.extension_enabled(ExtensionId::OesTextureFloat) => {
                Err(GlError::InvalidEnum)
            }
            other => other,
        };
        let pixel_size = self.base.report(size).unwrap_or(0);
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
        let Some(bytes_per_pixel) = self.base.report(read_pixel_size(format, ty)) else {
            return;
        };
        self.base
            .read_pixels(x, y, width, height, format, ty, bytes_per_pixel, pixels);
    }

    fn renderbuffer_storage(&mut self, target: u32, internal_format: u32, width: i32, height: i32) {
        let format_ok = formats::is_legacy_renderbuffer_format(internal_format);
        self.base
            .renderbuffer_storage(target, None, internal_format, width, height, format_ok);
    }

    fn compile_shader(&mut self, shader: WebGLShader) {
        self.base.compile_shader(shader, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SoftwareDriver;

    fn context() -> WebGLRenderingContext<SoftwareDriver> {
        WebGLRenderingContext::new(SoftwareDriver::new(), 4, 4, ContextAttributes::default())
            .expect("context")
    }

    #[test]
    fn test_rejects_webgl2_attributes() {
        let result = WebGLRenderingContext::new(
            SoftwareDriver::new(),
            4,
            4,
            ContextAttributes::webgl2(),
        );
        assert!(matches!(result, Err(ContextError::VersionMismatch { .. })));
    }

    #[test]
    fn test_version_strings() {
        let mut ctx = context();
        let version = ctx.get_parameter(gl::VERSION);
        assert!(version.as_str().is_some_and(|v| v.starts_with("WebGL 1.0 stack-gl")));
        assert_eq!(
            ctx.get_parameter(gl::SHADING_LANGUAGE_VERSION).as_str(),
            Some("WebGL GLSL ES 1.0 stack-gl")
        );
    }

    #[test]
    fn test_read_pixel_formats() {
        assert_eq!(read_pixel_size(gl::RGBA, gl::UNSIGNED_BYTE), Ok(4));
        assert_eq!(
            read_pixel_size(gl::RGB, gl::UNSIGNED_BYTE),
            Err(GlError::InvalidOperation)
        );
        assert_eq!(read_pixel_size(gl::RGBA, gl::FLOAT), Err(GlError::InvalidOperation));
        assert_eq!(
            read_pixel_size(gl::LUMINANCE, gl::UNSIGNED_BYTE),
            Err(GlError::InvalidEnum)
        );
    }

    #[test]
    fn test_extension_entry_points_need_resolution() {
        let mut ctx = context();
        ctx.draw_arrays_instanced_angle(gl::TRIANGLES, 0, 3, 1);
        assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
        assert!(ctx.create_vertex_array_oes().is_none());
        assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
        ctx.get_parameter(gl::VERTEX_ARRAY_BINDING_OES);
        assert_eq!(ctx.get_error(), gl::INVALID_ENUM);
    }

    #[test]
    fn test_vertex_array_extension() {
        let mut ctx = context();
        if ctx.get_extension("OES_vertex_array_object").is_none() {
            return;
        }
        let array = ctx.create_vertex_array_oes().expect("array");
        assert!(!ctx.is_vertex_array_oes(array));
        ctx.bind_vertex_array_oes(Some(array));
        assert!(ctx.is_vertex_array_oes(array));
        assert_eq!(
            ctx.get_parameter(gl::VERTEX_ARRAY_BINDING_OES),
            ParameterValue::from(Some(array))
        );
        assert_eq!(ctx.get_error(), gl::NO_ERROR);
    }

    #[test]
    fn test_tex_image_format_must_match_internal_format() {
        let mut ctx = context();
        let texture = ctx.create_texture();
        ctx.bind_texture(gl::TEXTURE_2D, texture);
        ctx.tex_image_2d(gl::TEXTURE_2D, 0, gl::RGB, 1, 1, 0, gl::RGBA, gl::UNSIGNED_BYTE, None);
        assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
        ctx.tex_image_2d(gl::TEXTURE_2D, 0, gl::RGBA, 1, 1, 0, gl::RGBA, gl::FLOAT, None);
        assert_eq!(ctx.get_error(), gl::INVALID_ENUM);
        ctx.tex_image_2d(gl::TEXTURE_2D, 0, gl::RGBA, 1, 1, 0, gl::RGBA, gl::UNSIGNED_BYTE, None);
        assert_eq!(ctx.get_error(), gl::NO_ERROR);
        assert_eq!(
            ctx.get_parameter(gl::TEXTURE_BINDING_2D),
            ParameterValue::from(texture)
        );
    }
}
