//! Texture images, storage and parameters.

use super::{ContextBase, WebGLVersion};
use crate::constants as gl;
use crate::driver::NativeDriver;
use crate::error::GlError;
use crate::extensions::ExtensionId;
use crate::formats;
use crate::framebuffer::is_cube_face;
use crate::objects::{LevelInfo, ObjectKey};
use crate::pixels;
use crate::value::ParameterValue;

/// Client pixels with their dimensions, the image-source form of
/// `texImage2D` and `texSubImage2D`.
#[derive(Debug, Clone, Copy)]
pub struct ImageData<'a> {
    pub width: i32,
    pub height: i32,
    pub data: &'a [u8],
}

/// Arguments of a `texImage2D` / `texImage3D` call after version-specific
/// format validation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ImageUpload<'a> {
    pub target: u32,
    pub level: i32,
    pub internal_format: u32,
    pub width: i32,
    pub height: i32,
    /// `1` for two-dimensional uploads.
    pub depth: i32,
    pub border: i32,
    pub format: u32,
    pub ty: u32,
    pub pixel_size: usize,
    pub pixels: Option<&'a [u8]>,
}

fn is_linear_filter(param: i32) -> bool {
    matches!(
        param as u32,
        gl::LINEAR | gl::LINEAR_MIPMAP_NEAREST | gl::NEAREST_MIPMAP_LINEAR | gl::LINEAR_MIPMAP_LINEAR
    )
}

impl<D: NativeDriver> ContextBase<D> {
    // ==================== Targets ====================

    /// Texture bound for an image target (`TEXTURE_2D`, a cube face, or a
    /// WebGL 2 volume target). Unknown targets are `INVALID_ENUM`.
    fn image_texture(&mut self, target: u32) -> Option<Option<ObjectKey>> {
        let unit = *self.active_unit();
        let bound = match target {
            gl::TEXTURE_2D => unit.bind_2d,
            t if is_cube_face(t) => unit.bind_cube,
            gl::TEXTURE_3D if self.is_webgl2() => unit.bind_3d,
            gl::TEXTURE_2D_ARRAY if self.is_webgl2() => unit.bind_2d_array,
            _ => {
                self.set_error(GlError::InvalidEnum);
                return None;
            }
        };
        Some(bound)
    }

    /// Texture bound at a bind target, for parameter calls.
    fn bound_texture(&mut self, target: u32) -> Option<ObjectKey> {
        if !self.version.is_texture_target(target) {
            self.set_error(GlError::InvalidEnum);
            return None;
        }
        let bound = self.active_unit().binding(target);
        if bound.is_none() {
            self.set_error(GlError::InvalidOperation);
        }
        bound
    }

    /// Level and size limits of an image target.
    pub(crate) fn check_dimensions(
        &mut self,
        target: u32,
        width: i32,
        height: i32,
        depth: i32,
        level: i32,
    ) -> bool {
        if level < 0 || width < 0 || height < 0 || depth < 0 {
            self.set_error(GlError::InvalidValue);
            return false;
        }
        let limits = self.limits;
        let within = match target {
            gl::TEXTURE_2D => {
                width <= limits.max_texture_size
                    && height <= limits.max_texture_size
                    && level <= limits.max_texture_level
            }
            gl::TEXTURE_3D => {
                width <= limits.max_3d_texture_size
                    && height <= limits.max_3d_texture_size
                    && depth <= limits.max_3d_texture_size
                    && level <= limits.max_texture_level
            }
            gl::TEXTURE_2D_ARRAY => {
                width <= limits.max_texture_size
                    && height <= limits.max_texture_size
                    && depth <= limits.max_array_texture_layers
                    && level <= limits.max_texture_level
            }
            t if is_cube_face(t) => {
                width <= limits.max_cube_map_size
                    && height <= limits.max_cube_map_size
                    && level <= limits.max_cube_map_level
            }
            _ => {
                self.set_error(GlError::InvalidEnum);
                return false;
            }
        };
        if !within {
            self.set_error(GlError::InvalidValue);
        }
        within
    }

    // ==================== Uploads ====================

    /// Shared tail of `texImage2D` and `texImage3D`.
    pub(crate) fn tex_image(&mut self, upload: ImageUpload<'_>) {
        let ImageUpload {
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
        } = upload;
        let Some(bound) = self.image_texture(target) else {
            return;
        };
        let Some(key) = bound else {
            self.set_error(GlError::InvalidOperation);
            return;
        };
        if let Some(texture) = self.registry.texture_mut(key) {
            texture.internal_format = internal_format;
        }
        if pixel_size == 0 {
            return;
        }
        if !self.check_dimensions(target, width, height, depth, level) {
            return;
        }
        let needed = pixels::upload_size(
            width as usize,
            height as usize,
            depth as usize,
            pixel_size,
            self.unpack_alignment,
        );
        if pixels.is_some_and(|p| p.len() < needed) {
            self.set_error(GlError::InvalidOperation);
            return;
        }
        if border != 0 || (is_cube_face(target) && width != height) {
            self.set_error(GlError::InvalidValue);
            return;
        }

        let three_d = matches!(target, gl::TEXTURE_3D | gl::TEXTURE_2D_ARRAY);
        let error = self.speculative(|d| {
            if three_d {
                d.tex_image_3d(
                    target,
                    level,
                    internal_format,
                    width,
                    height,
                    depth,
                    border,
                    format,
                    ty,
                    pixels,
                );
            } else {
                d.tex_image_2d(
                    target,
                    level,
                    internal_format,
                    width,
                    height,
                    border,
                    format,
                    ty,
                    pixels,
                );
            }
        });
        if error != gl::NO_ERROR {
            return;
        }
        if let Some(texture) = self.registry.texture_mut(key) {
            texture.set_level(
                level,
                LevelInfo {
                    width,
                    height,
                    depth,
                },
            );
            texture.format = format;
            texture.ty = ty;
        }
        self.update_active_framebuffers(key);
    }

    /// Pixel size of a sub-image upload into `key`.
    fn sub_image_pixel_size(&mut self, key: ObjectKey, format: u32, ty: u32) -> Option<usize> {
        let (internal_format, texture_format) = self
            .registry
            .texture(key)
            .map_or((0, 0), |t| (t.internal_format, t.format));
        let size = match self.version {
            WebGLVersion::WebGL1 => self.report(formats::legacy_pixel_size(format, ty))?,
            WebGLVersion::WebGL2 => {
                if !formats::verify_format(internal_format, format, ty) {
                    self.set_error(GlError::InvalidOperation);
                    return None;
                }
                formats::pixel_size(internal_format, ty)
            }
        };
        if self.version == WebGLVersion::WebGL1 && format != texture_format {
            self.set_error(GlError::InvalidOperation);
            return None;
        }
        Some(size)
    }

    /// `texSubImage2D` and `texSubImage3D`. `depth` and `zoffset` are `1`
    /// and `0` for two-dimensional targets.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn tex_sub_image(
        &mut self,
        target: u32,
        level: i32,
        offset: [i32; 3],
        size: [i32; 3],
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) {
        let Some(bound) = self.image_texture(target) else {
            return;
        };
        let Some(key) = bound else {
            self.set_error(GlError::InvalidOperation);
            return;
        };
        let [xoffset, yoffset, zoffset] = offset;
        let [width, height, depth] = size;
        if !self.check_dimensions(target, width, height, depth, level) {
            return;
        }
        if xoffset < 0 || yoffset < 0 || zoffset < 0 {
            self.set_error(GlError::InvalidValue);
            return;
        }
        let info = self
            .registry
            .texture(key)
            .map(|t| t.level(level))
            .unwrap_or_default();
        let fits = xoffset + width <= info.width
            && yoffset + height <= info.height
            && (zoffset + depth <= info.depth.max(1));
        if !fits {
            self.set_error(GlError::InvalidValue);
            return;
        }
        let Some(pixel_size) = self.sub_image_pixel_size(key, format, ty) else {
            return;
        };
        let needed = pixels::upload_size(
            width as usize,
            height as usize,
            depth as usize,
            pixel_size,
            self.unpack_alignment,
        );
        if pixels.len() < needed {
            self.set_error(GlError::InvalidOperation);
            return;
        }
        if matches!(target, gl::TEXTURE_3D | gl::TEXTURE_2D_ARRAY) {
            self.driver.tex_sub_image_3d(
                target, level, xoffset, yoffset, zoffset, width, height, depth, format, ty, pixels,
            );
        } else {
            self.driver
                .tex_sub_image_2d(target, level, xoffset, yoffset, width, height, format, ty, pixels);
        }
    }

    /// `texStorage2D` / `texStorage3D`: allocate every level at once and
    /// freeze the texture's format.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn tex_storage(
        &mut self,
        target: u32,
        levels: i32,
        internal_format: u32,
        width: i32,
        height: i32,
        depth: Option<i32>,
    ) {
        let targets_ok = match depth {
            None => matches!(target, gl::TEXTURE_2D | gl::TEXTURE_CUBE_MAP),
            Some(_) => matches!(target, gl::TEXTURE_3D | gl::TEXTURE_2D_ARRAY),
        };
        if !targets_ok {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        let Some(key) = self.active_unit().binding(target) else {
            self.set_error(GlError::InvalidOperation);
            return;
        };
        if self.registry.texture(key).is_some_and(|t| t.immutable) {
            self.set_error(GlError::InvalidOperation);
            return;
        }
        let Some(info) = formats::lookup(internal_format) else {
            self.set_error(GlError::InvalidEnum);
            return;
        };
        let layers = depth.unwrap_or(1);
        if levels < 1 || width < 1 || height < 1 || layers < 1 {
            self.set_error(GlError::InvalidValue);
            return;
        }
        let largest = match target {
            gl::TEXTURE_3D => width.max(height).max(layers),
            _ => width.max(height),
        };
        let max_levels = 32 - (largest as u32).leading_zeros() as i32;
        if levels > max_levels {
            self.set_error(GlError::InvalidOperation);
            return;
        }

        let error = self.speculative(|d| match depth {
            Some(depth) => d.tex_storage_3d(target, levels, internal_format, width, height, depth),
            None => d.tex_storage_2d(target, levels, internal_format, width, height),
        });
        if error != gl::NO_ERROR {
            return;
        }
        if let Some(texture) = self.registry.texture_mut(key) {
            for level in 0..levels {
                let layer_depth = match target {
                    gl::TEXTURE_3D => (layers >> level).max(1),
                    _ => layers,
                };
                texture.set_level(
                    level,
                    LevelInfo {
                        width: (width >> level).max(1),
                        height: (height >> level).max(1),
                        depth: layer_depth,
                    },
                );
            }
            texture.internal_format = internal_format;
            texture.format = info.format;
            texture.ty = info.types.first().map_or(gl::UNSIGNED_BYTE, |&(ty, _)| ty);
            texture.immutable = true;
        }
        self.update_active_framebuffers(key);
    }

    // ==================== Copies ====================

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn copy_tex_image_2d(
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
        if target != gl::TEXTURE_2D && !is_cube_face(target) {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        let Some(Some(key)) = self.image_texture(target) else {
            self.set_error(GlError::InvalidOperation);
            return;
        };
        if !self.check_dimensions(target, width, height, 1, level) {
            return;
        }
        if border != 0 || (is_cube_face(target) && width != height) {
            self.set_error(GlError::InvalidValue);
            return;
        }
        if !self.framebuffer_ok(self.read_framebuffer) {
            return;
        }
        let error = self.speculative(|d| {
            d.copy_tex_image_2d(target, level, internal_format, x, y, width, height, border)
        });
        if error != gl::NO_ERROR {
            return;
        }
        if let Some(texture) = self.registry.texture_mut(key) {
            texture.set_level(
                level,
                LevelInfo {
                    width,
                    height,
                    depth: 1,
                },
            );
            texture.internal_format = internal_format;
            texture.format = internal_format;
            texture.ty = gl::UNSIGNED_BYTE;
        }
        self.update_active_framebuffers(key);
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn copy_tex_sub_image_2d(
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
        if target != gl::TEXTURE_2D && !is_cube_face(target) {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        if !matches!(self.image_texture(target), Some(Some(_))) {
            self.set_error(GlError::InvalidOperation);
            return;
        }
        if level < 0 || xoffset < 0 || yoffset < 0 || width < 0 || height < 0 {
            self.set_error(GlError::InvalidValue);
            return;
        }
        if !self.framebuffer_ok(self.read_framebuffer) {
            return;
        }
        self.driver
            .copy_tex_sub_image_2d(target, level, xoffset, yoffset, x, y, width, height);
    }

    // ==================== Parameters ====================

    /// Float textures given a linear filter they cannot sample with become
    /// incomplete and bind natively as `0` until the filter is fixed.
    fn verify_texture_completeness(&mut self, target: u32, key: ObjectKey, pname: u32, param: i32) {
        let float_sampling = match self.version {
            WebGLVersion::WebGL1 => self.extension_enabled(ExtensionId::OesTextureFloat),
            WebGLVersion::WebGL2 => true,
        };
        let linear_ok = self.extension_enabled(ExtensionId::OesTextureFloatLinear);
        let Some(texture) = self.registry.texture_mut(key) else {
            return;
        };
        let was_complete = texture.complete;
        if float_sampling
            && !linear_ok
            && texture.ty == gl::FLOAT
            && matches!(pname, gl::TEXTURE_MAG_FILTER | gl::TEXTURE_MIN_FILTER)
            && is_linear_filter(param)
        {
            texture.complete = false;
        } else {
            texture.complete = true;
        }
        if texture.complete != was_complete || !texture.complete {
            let native = self.texture_native(Some(key));
            self.driver.bind_texture(target, native);
        }
    }

    fn is_texture_parameter(&self, pname: u32) -> bool {
        match pname {
            gl::TEXTURE_MIN_FILTER | gl::TEXTURE_MAG_FILTER | gl::TEXTURE_WRAP_S | gl::TEXTURE_WRAP_T => {
                true
            }
            gl::TEXTURE_MAX_ANISOTROPY_EXT => {
                self.extension_enabled(ExtensionId::ExtTextureFilterAnisotropic)
            }
            gl::TEXTURE_WRAP_R
            | gl::TEXTURE_MIN_LOD
            | gl::TEXTURE_MAX_LOD
            | gl::TEXTURE_BASE_LEVEL
            | gl::TEXTURE_MAX_LEVEL
            | gl::TEXTURE_COMPARE_MODE
            | gl::TEXTURE_COMPARE_FUNC => self.is_webgl2(),
            _ => false,
        }
    }

    /// `texParameterf` / `texParameteri`.
    pub(crate) fn tex_parameter(&mut self, target: u32, pname: u32, param: f32, integer: bool) {
        let Some(key) = self.bound_texture(target) else {
            return;
        };
        if !self.is_texture_parameter(pname) {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        let param_ok = match pname {
            gl::TEXTURE_MIN_FILTER => matches!(
                param as u32,
                gl::NEAREST
                    | gl::LINEAR
                    | gl::NEAREST_MIPMAP_NEAREST
                    | gl::LINEAR_MIPMAP_NEAREST
                    | gl::NEAREST_MIPMAP_LINEAR
                    | gl::LINEAR_MIPMAP_LINEAR
            ),
            gl::TEXTURE_MAG_FILTER => matches!(param as u32, gl::NEAREST | gl::LINEAR),
            gl::TEXTURE_WRAP_S | gl::TEXTURE_WRAP_T | gl::TEXTURE_WRAP_R => matches!(
                param as u32,
                gl::REPEAT | gl::CLAMP_TO_EDGE | gl::MIRRORED_REPEAT
            ),
            _ => true,
        };
        if !param_ok {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        self.verify_texture_completeness(target, key, pname, param as i32);
        if integer {
            self.driver.tex_parameteri(target, pname, param as i32);
        } else {
            self.driver.tex_parameterf(target, pname, param);
        }
    }

    pub(crate) fn get_tex_parameter(&mut self, target: u32, pname: u32) -> ParameterValue {
        if self.bound_texture(target).is_none() {
            return ParameterValue::Null;
        }
        if !self.is_texture_parameter(pname) {
            self.set_error(GlError::InvalidEnum);
            return ParameterValue::Null;
        }
        let value = self.driver.get_tex_parameter(target, pname);
        match pname {
            gl::TEXTURE_MAX_ANISOTROPY_EXT | gl::TEXTURE_MIN_LOD | gl::TEXTURE_MAX_LOD => {
                ParameterValue::Float(value)
            }
            _ => ParameterValue::Int(value as i32),
        }
    }

    pub(crate) fn generate_mipmap(&mut self, target: u32) {
        if self.bound_texture(target).is_none() {
            return;
        }
        self.speculative(|d| d.generate_mipmap(target));
    }
}
