//! Capabilities, blending, depth, stencil, viewport and pixel storage.

use super::ContextBase;
use crate::constants as gl;
use crate::driver::NativeDriver;
use crate::error::GlError;
use crate::extensions::ExtensionId;
use crate::objects::{
    WebGLBuffer, WebGLFramebuffer, WebGLProgram, WebGLRenderbuffer, WebGLTexture,
};
use crate::value::ParameterValue;

fn is_blend_factor(factor: u32) -> bool {
    matches!(
        factor,
        gl::ZERO
            | gl::ONE
            | gl::SRC_COLOR
            | gl::ONE_MINUS_SRC_COLOR
            | gl::DST_COLOR
            | gl::ONE_MINUS_DST_COLOR
            | gl::SRC_ALPHA
            | gl::ONE_MINUS_SRC_ALPHA
            | gl::DST_ALPHA
            | gl::ONE_MINUS_DST_ALPHA
            | gl::SRC_ALPHA_SATURATE
            | gl::CONSTANT_COLOR
            | gl::ONE_MINUS_CONSTANT_COLOR
            | gl::CONSTANT_ALPHA
            | gl::ONE_MINUS_CONSTANT_ALPHA
    )
}

fn is_constant_factor(factor: u32) -> bool {
    matches!(
        factor,
        gl::CONSTANT_COLOR
            | gl::ONE_MINUS_CONSTANT_COLOR
            | gl::CONSTANT_ALPHA
            | gl::ONE_MINUS_CONSTANT_ALPHA
    )
}

fn is_compare_func(func: u32) -> bool {
    matches!(
        func,
        gl::NEVER
            | gl::LESS
            | gl::EQUAL
            | gl::LEQUAL
            | gl::GREATER
            | gl::NOTEQUAL
            | gl::GEQUAL
            | gl::ALWAYS
    )
}

fn is_stencil_op(op: u32) -> bool {
    matches!(
        op,
        gl::KEEP
            | gl::ZERO
            | gl::REPLACE
            | gl::INCR
            | gl::DECR
            | gl::INVERT
            | gl::INCR_WRAP
            | gl::DECR_WRAP
    )
}

fn is_face(face: u32) -> bool {
    matches!(face, gl::FRONT | gl::BACK | gl::FRONT_AND_BACK)
}

impl<D: NativeDriver> ContextBase<D> {
    // ==================== Capabilities ====================

    fn is_capability(&self, cap: u32) -> bool {
        match cap {
            gl::BLEND
            | gl::CULL_FACE
            | gl::DEPTH_TEST
            | gl::DITHER
            | gl::POLYGON_OFFSET_FILL
            | gl::SAMPLE_ALPHA_TO_COVERAGE
            | gl::SAMPLE_COVERAGE
            | gl::SCISSOR_TEST
            | gl::STENCIL_TEST => true,
            gl::RASTERIZER_DISCARD => self.is_webgl2(),
            _ => false,
        }
    }

    /// `enable` / `disable`.
    ///
    /// The legacy texture capabilities are not WebGL state; the unit's mode is
    /// tracked and the call is rejected like any other unknown capability.
    pub(crate) fn set_capability(&mut self, cap: u32, enabled: bool) {
        if cap == gl::TEXTURE_2D || cap == gl::TEXTURE_CUBE_MAP {
            let unit = self.active_unit_mut();
            if enabled {
                unit.mode = cap;
            } else if unit.mode == cap {
                unit.mode = 0;
            }
            self.set_error(GlError::InvalidEnum);
            return;
        }
        if !self.is_capability(cap) {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        if enabled {
            self.driver.enable(cap);
        } else {
            self.driver.disable(cap);
        }
    }

    pub(crate) fn is_enabled(&mut self, cap: u32) -> bool {
        if !self.is_capability(cap) {
            self.set_error(GlError::InvalidEnum);
            return false;
        }
        self.driver.is_enabled(cap)
    }

    // ==================== Blending ====================

    fn is_blend_mode(&self, mode: u32) -> bool {
        match mode {
            gl::FUNC_ADD | gl::FUNC_SUBTRACT | gl::FUNC_REVERSE_SUBTRACT => true,
            gl::MIN | gl::MAX => {
                self.is_webgl2() || self.extension_enabled(ExtensionId::ExtBlendMinmax)
            }
            _ => false,
        }
    }

    pub(crate) fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32) {
        if !self.is_blend_mode(mode_rgb) || !self.is_blend_mode(mode_alpha) {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        self.driver.blend_equation_separate(mode_rgb, mode_alpha);
    }

    pub(crate) fn blend_func_separate(
        &mut self,
        src_rgb: u32,
        dst_rgb: u32,
        src_alpha: u32,
        dst_alpha: u32,
    ) {
        if ![src_rgb, dst_rgb, src_alpha, dst_alpha]
            .into_iter()
            .all(is_blend_factor)
        {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        if (is_constant_factor(src_rgb) && is_constant_factor(dst_rgb))
            || (is_constant_factor(src_alpha) && is_constant_factor(dst_alpha))
        {
            self.set_error(GlError::InvalidOperation);
            return;
        }
        self.driver
            .blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha);
    }

    // ==================== Depth and culling ====================

    pub(crate) fn depth_func(&mut self, func: u32) {
        if !is_compare_func(func) {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        self.driver.depth_func(func);
    }

    pub(crate) fn depth_range(&mut self, z_near: f32, z_far: f32) {
        if z_near > z_far {
            self.set_error(GlError::InvalidOperation);
            return;
        }
        self.driver.depth_range(z_near, z_far);
    }

    pub(crate) fn cull_face(&mut self, mode: u32) {
        if !is_face(mode) {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        self.driver.cull_face(mode);
    }

    pub(crate) fn front_face(&mut self, mode: u32) {
        if mode != gl::CW && mode != gl::CCW {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        self.driver.front_face(mode);
    }

    pub(crate) fn line_width(&mut self, width: f32) {
        if width.is_nan() || width <= 0.0 {
            self.set_error(GlError::InvalidValue);
            return;
        }
        self.driver.line_width(width);
    }

    pub(crate) fn hint(&mut self, target: u32, mode: u32) {
        let target_ok = target == gl::GENERATE_MIPMAP_HINT
            || (target == gl::FRAGMENT_SHADER_DERIVATIVE_HINT_OES
                && (self.is_webgl2()
                    || self.extension_enabled(ExtensionId::OesStandardDerivatives)));
        if !target_ok || !matches!(mode, gl::FASTEST | gl::NICEST | gl::DONT_CARE) {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        self.driver.hint(target, mode);
    }

    // ==================== Stencil ====================

    pub(crate) fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32) {
        self.check_stencil = true;
        if !is_face(face) || !is_compare_func(func) {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        self.driver.stencil_func_separate(face, func, reference, mask);
    }

    pub(crate) fn stencil_mask_separate(&mut self, face: u32, mask: u32) {
        self.check_stencil = true;
        if !is_face(face) {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        self.driver.stencil_mask_separate(face, mask);
    }

    pub(crate) fn stencil_op_separate(&mut self, face: u32, fail: u32, zfail: u32, zpass: u32) {
        self.check_stencil = true;
        if !is_face(face) || ![fail, zfail, zpass].into_iter().all(is_stencil_op) {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        self.driver.stencil_op_separate(face, fail, zfail, zpass);
    }

    pub(crate) fn clear_stencil(&mut self, stencil: i32) {
        self.check_stencil = false;
        self.driver.clear_stencil(stencil);
    }

    // ==================== Viewport ====================

    pub(crate) fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if width < 0 || height < 0 {
            self.set_error(GlError::InvalidValue);
            return;
        }
        self.driver.viewport(x, y, width, height);
    }

    pub(crate) fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if width < 0 || height < 0 {
            self.set_error(GlError::InvalidValue);
            return;
        }
        self.driver.scissor(x, y, width, height);
    }

    // ==================== Pixel storage ====================

    pub(crate) fn pixel_storei(&mut self, pname: u32, param: i32) {
        let alignment_ok = matches!(param, 1 | 2 | 4 | 8);
        match pname {
            gl::UNPACK_ALIGNMENT | gl::PACK_ALIGNMENT if !alignment_ok => {
                self.set_error(GlError::InvalidValue);
                return;
            }
            gl::UNPACK_ALIGNMENT => self.unpack_alignment = param as usize,
            gl::PACK_ALIGNMENT => self.pack_alignment = param as usize,
            gl::UNPACK_FLIP_Y_WEBGL => {
                self.unpack_flip_y = param != 0;
                return;
            }
            gl::UNPACK_PREMULTIPLY_ALPHA_WEBGL => {
                self.unpack_premultiply_alpha = param != 0;
                return;
            }
            gl::UNPACK_COLORSPACE_CONVERSION_WEBGL => {
                let param = param as u32;
                if param != gl::NONE && param != gl::BROWSER_DEFAULT_WEBGL {
                    self.set_error(GlError::InvalidValue);
                } else {
                    self.unpack_colorspace_conversion = param;
                }
                return;
            }
            gl::UNPACK_ROW_LENGTH
            | gl::UNPACK_SKIP_ROWS
            | gl::UNPACK_SKIP_PIXELS
            | gl::UNPACK_SKIP_IMAGES
            | gl::UNPACK_IMAGE_HEIGHT
            | gl::PACK_ROW_LENGTH
            | gl::PACK_SKIP_ROWS
            | gl::PACK_SKIP_PIXELS
                if self.is_webgl2() => {}
            _ => {
                self.set_error(GlError::InvalidEnum);
                return;
            }
        }
        self.driver.pixel_storei(pname, param);
    }

    // ==================== Queries ====================

    /// `getParameter` for state shared by both versions. Anything the layer
    /// does not track is answered by the driver.
    pub(crate) fn get_parameter_shared(&mut self, pname: u32) -> ParameterValue {
        let registry = &self.registry;
        match pname {
            gl::COMPRESSED_TEXTURE_FORMATS => ParameterValue::Uint32Array(Vec::new()),
            gl::ARRAY_BUFFER_BINDING => registry
                .wrap_opt::<WebGLBuffer>(self.vertex_global.array_buffer)
                .into(),
            gl::ELEMENT_ARRAY_BUFFER_BINDING => registry
                .wrap_opt::<WebGLBuffer>(self.vertex_state().element_buffer)
                .into(),
            gl::CURRENT_PROGRAM => registry.wrap_opt::<WebGLProgram>(self.active_program).into(),
            gl::FRAMEBUFFER_BINDING => registry
                .wrap_opt::<WebGLFramebuffer>(self.draw_framebuffer)
                .into(),
            gl::RENDERBUFFER_BINDING => registry
                .wrap_opt::<WebGLRenderbuffer>(self.active_renderbuffer)
                .into(),
            gl::TEXTURE_BINDING_2D => registry
                .wrap_opt::<WebGLTexture>(self.active_unit().bind_2d)
                .into(),
            gl::TEXTURE_BINDING_CUBE_MAP => registry
                .wrap_opt::<WebGLTexture>(self.active_unit().bind_cube)
                .into(),
            gl::ACTIVE_TEXTURE => ParameterValue::Int((gl::TEXTURE0 as usize + self.active_texture_unit) as i32),
            gl::PACK_ALIGNMENT => ParameterValue::Int(self.pack_alignment as i32),
            gl::UNPACK_ALIGNMENT => ParameterValue::Int(self.unpack_alignment as i32),
            gl::UNPACK_FLIP_Y_WEBGL => ParameterValue::Bool(self.unpack_flip_y),
            gl::UNPACK_PREMULTIPLY_ALPHA_WEBGL => ParameterValue::Bool(self.unpack_premultiply_alpha),
            gl::UNPACK_COLORSPACE_CONVERSION_WEBGL => {
                ParameterValue::Int(self.unpack_colorspace_conversion as i32)
            }
            gl::VENDOR => ParameterValue::String("stack-gl".to_string()),
            gl::RENDERER => ParameterValue::String("ANGLE".to_string()),
            _ => self.driver.get_parameter(pname),
        }
    }
}
