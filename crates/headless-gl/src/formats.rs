//! Pixel format tables.
//!
//! [`FORMAT_TABLE`] maps every accepted internal format to its client format
//! and the `(type, bytes per pixel)` pairs that may be uploaded into it. Pixel
//! sizes and row strides are derived from it.

use crate::constants as gl;
use crate::error::{GlError, GlResult};

/// Upload rules for one internal format.
#[derive(Debug, Clone, Copy)]
pub struct FormatInfo {
    pub internal_format: u32,
    pub format: u32,
    /// Allowed `(type, bytes per pixel)` pairs.
    pub types: &'static [(u32, usize)],
}

const fn info(internal_format: u32, format: u32, types: &'static [(u32, usize)]) -> FormatInfo {
    FormatInfo {
        internal_format,
        format,
        types,
    }
}

const UB: u32 = gl::UNSIGNED_BYTE;
const HF: u32 = gl::HALF_FLOAT;
const F: u32 = gl::FLOAT;

pub static FORMAT_TABLE: &[FormatInfo] = &[
    info(gl::RGB, gl::RGB, &[(UB, 3), (gl::UNSIGNED_SHORT_5_6_5, 2)]),
    info(
        gl::RGBA,
        gl::RGBA,
        &[(UB, 4), (gl::UNSIGNED_SHORT_4_4_4_4, 2), (gl::UNSIGNED_SHORT_5_5_5_1, 2)],
    ),
    info(gl::LUMINANCE_ALPHA, gl::LUMINANCE_ALPHA, &[(UB, 2)]),
    info(gl::LUMINANCE, gl::LUMINANCE, &[(UB, 1)]),
    info(gl::ALPHA, gl::ALPHA, &[(UB, 1)]),
    info(gl::R8, gl::RED, &[(UB, 1)]),
    info(gl::R16F, gl::RED, &[(HF, 2), (F, 2)]),
    info(gl::R32F, gl::RED, &[(F, 4)]),
    info(gl::R8UI, gl::RED_INTEGER, &[(UB, 1)]),
    info(gl::RG8, gl::RG, &[(UB, 2)]),
    info(gl::RG16F, gl::RG, &[(HF, 4), (F, 4)]),
    info(gl::RG32F, gl::RG, &[(F, 8)]),
    info(gl::RG8UI, gl::RG, &[(UB, 2)]),
    info(gl::RGB8, gl::RGB, &[(UB, 3)]),
    info(gl::SRGB8, gl::RGB, &[(UB, 3)]),
    info(gl::RGB565, gl::RGB, &[(UB, 3), (gl::UNSIGNED_SHORT_5_6_5, 2)]),
    info(
        gl::R11F_G11F_B10F,
        gl::RGB,
        &[(gl::UNSIGNED_INT_10F_11F_11F_REV, 4), (HF, 4), (F, 4)],
    ),
    info(gl::RGB9_E5, gl::RGB, &[(HF, 4), (F, 4)]),
    info(gl::RGB16F, gl::RGB, &[(HF, 6), (F, 6)]),
    info(gl::RGB32F, gl::RGB, &[(F, 12)]),
    info(gl::RGB8UI, gl::RGB_INTEGER, &[(UB, 3)]),
    info(gl::RGBA8, gl::RGBA, &[(UB, 4)]),
    info(gl::SRGB8_ALPHA8, gl::RGBA, &[(UB, 4)]),
    info(gl::RGB5_A1, gl::RGBA, &[(UB, 2), (gl::UNSIGNED_SHORT_5_5_5_1, 2)]),
    info(gl::RGB10_A2, gl::RGBA, &[(gl::UNSIGNED_INT_2_10_10_10_REV, 4)]),
    info(gl::RGBA4, gl::RGBA, &[(UB, 2), (gl::UNSIGNED_SHORT_4_4_4_4, 2)]),
    info(gl::RGBA16F, gl::RGBA, &[(HF, 8), (F, 8)]),
    info(gl::RGBA32F, gl::RGBA, &[(F, 16)]),
    info(gl::RGBA8UI, gl::RGBA_INTEGER, &[(UB, 4)]),
];

/// Table entry for `internal_format`.
pub fn lookup(internal_format: u32) -> Option<&'static FormatInfo> {
    FORMAT_TABLE
        .iter()
        .find(|f| f.internal_format == internal_format)
}

/// Whether `(internal_format, format, ty)` is an accepted upload triple.
pub fn verify_format(internal_format: u32, format: u32, ty: u32) -> bool {
    lookup(internal_format)
        .is_some_and(|f| f.format == format && f.types.iter().any(|&(t, _)| t == ty))
}

/// Bytes per pixel for an upload, `0` for unknown combinations.
pub fn pixel_size(internal_format: u32, ty: u32) -> usize {
    lookup(internal_format)
        .and_then(|f| f.types.iter().find(|&&(t, _)| t == ty))
        .map_or(0, |&(_, size)| size)
}

/// WebGL 1 pixel size: unsized formats only, with packed types restricted to
/// their matching format.
pub fn legacy_pixel_size(format: u32, ty: u32) -> GlResult<usize> {
    let format_size = match format {
        gl::ALPHA | gl::LUMINANCE => 1,
        gl::LUMINANCE_ALPHA => 2,
        gl::RGB => 3,
        gl::RGBA => 4,
        _ => return Err(GlError::InvalidEnum),
    };
    match ty {
        gl::UNSIGNED_BYTE => Ok(format_size),
        gl::FLOAT => Ok(format_size * 4),
        gl::UNSIGNED_SHORT_5_6_5 if format == gl::RGB => Ok(2),
        gl::UNSIGNED_SHORT_4_4_4_4 | gl::UNSIGNED_SHORT_5_5_5_1 if format == gl::RGBA => Ok(2),
        gl::UNSIGNED_SHORT_5_6_5 | gl::UNSIGNED_SHORT_4_4_4_4 | gl::UNSIGNED_SHORT_5_5_5_1 => {
            Err(GlError::InvalidOperation)
        }
        _ => Err(GlError::InvalidEnum),
    }
}

/// Size in bytes of one vertex/index component type, `0` for unknown types.
pub fn type_size(ty: u32) -> usize {
    match ty {
        gl::BYTE | gl::UNSIGNED_BYTE => 1,
        gl::SHORT | gl::UNSIGNED_SHORT | gl::HALF_FLOAT => 2,
        gl::INT | gl::UNSIGNED_INT | gl::FLOAT => 4,
        _ => 0,
    }
}

pub fn is_float_type(ty: u32) -> bool {
    matches!(ty, gl::FLOAT | gl::HALF_FLOAT)
}

/// Color formats a WebGL 2 renderbuffer or texture can render into.
pub fn is_renderable_color_format(format: u32, color_buffer_float: bool) -> bool {
    matches!(
        format,
        gl::RGBA4
            | gl::RGB565
            | gl::RGB5_A1
            | gl::R8
            | gl::R8UI
            | gl::R8I
            | gl::R16UI
            | gl::R16I
            | gl::R32UI
            | gl::R32I
            | gl::RG8
            | gl::RG8UI
            | gl::RG8I
            | gl::RG16UI
            | gl::RG16I
            | gl::RG32UI
            | gl::RG32I
            | gl::RGB8
            | gl::RGBA8
            | gl::SRGB8_ALPHA8
            | gl::RGB10_A2
            | gl::RGBA8UI
            | gl::RGBA8I
            | gl::RGB10_A2UI
            | gl::RGBA16UI
            | gl::RGBA16I
            | gl::RGBA32I
            | gl::RGBA32UI
    ) || (color_buffer_float && is_float_color_format(format))
}

/// Internal formats a color texture attachment may use.
pub fn is_renderable_texture_format(format: u32, color_buffer_float: bool) -> bool {
    matches!(
        format,
        gl::RGBA | gl::RGB | gl::LUMINANCE_ALPHA | gl::LUMINANCE | gl::ALPHA
    ) || is_renderable_color_format(format, color_buffer_float)
}

fn is_float_color_format(format: u32) -> bool {
    matches!(
        format,
        gl::R16F | gl::RG16F | gl::RGBA16F | gl::R32F | gl::RG32F | gl::RGBA32F | gl::R11F_G11F_B10F
    )
}

/// Depth and stencil formats accepted by renderbuffer storage.
pub fn is_renderable_depth_stencil_format(format: u32) -> bool {
    matches!(
        format,
        gl::DEPTH_COMPONENT16
            | gl::DEPTH_COMPONENT24
            | gl::DEPTH_COMPONENT32F
            | gl::DEPTH_STENCIL
            | gl::DEPTH24_STENCIL8
            | gl::DEPTH32F_STENCIL8
            | gl::STENCIL_INDEX
            | gl::STENCIL_INDEX8
    )
}

/// Formats accepted by `renderbufferStorageMultisample`.
pub fn is_multisample_format(format: u32, color_buffer_float: bool) -> bool {
    (format != gl::R8 && is_renderable_color_format(format, color_buffer_float))
        || (format != gl::STENCIL_INDEX && is_renderable_depth_stencil_format(format))
}

/// Formats a depth-stencil attachment renderbuffer may hold.
pub fn is_depth_stencil_format(format: u32) -> bool {
    matches!(
        format,
        gl::DEPTH_STENCIL | gl::DEPTH24_STENCIL8 | gl::DEPTH32F_STENCIL8
    )
}

/// Formats a depth attachment renderbuffer may hold.
pub fn is_depth_format(format: u32) -> bool {
    matches!(
        format,
        gl::DEPTH_COMPONENT16 | gl::DEPTH_COMPONENT24 | gl::DEPTH_COMPONENT32F
    )
}

/// Formats a stencil attachment renderbuffer may hold.
pub fn is_stencil_format(format: u32) -> bool {
    format == gl::STENCIL_INDEX8
}

/// WebGL 1 renderbuffer formats.
pub fn is_legacy_renderbuffer_format(format: u32) -> bool {
    matches!(
        format,
        gl::RGBA4
            | gl::RGB565
            | gl::RGB5_A1
            | gl::DEPTH_COMPONENT16
            | gl::STENCIL_INDEX8
            | gl::DEPTH_STENCIL
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_format() {
        assert!(verify_format(gl::RGBA, gl::RGBA, gl::UNSIGNED_BYTE));
        assert!(verify_format(gl::RGB, gl::RGB, gl::UNSIGNED_SHORT_5_6_5));
        assert!(verify_format(gl::R16F, gl::RED, gl::FLOAT));
        assert!(!verify_format(gl::RGBA, gl::RGB, gl::UNSIGNED_BYTE));
        assert!(!verify_format(gl::RGBA8, gl::RGBA, gl::FLOAT));
        assert!(!verify_format(0x1234, gl::RGBA, gl::UNSIGNED_BYTE));
    }

    #[test]
    fn test_pixel_size() {
        assert_eq!(pixel_size(gl::RGBA, gl::UNSIGNED_BYTE), 4);
        assert_eq!(pixel_size(gl::RGBA, gl::UNSIGNED_SHORT_4_4_4_4), 2);
        assert_eq!(pixel_size(gl::RGB32F, gl::FLOAT), 12);
        assert_eq!(pixel_size(gl::R16F, gl::FLOAT), 2);
        assert_eq!(pixel_size(gl::RGBA32F, gl::UNSIGNED_BYTE), 0);
    }

    #[test]
    fn test_every_table_entry_is_self_consistent() {
        for entry in FORMAT_TABLE {
            for &(ty, size) in entry.types {
                assert!(verify_format(entry.internal_format, entry.format, ty));
                assert_eq!(pixel_size(entry.internal_format, ty), size);
            }
        }
    }

    #[test]
    fn test_legacy_pixel_size() {
        assert_eq!(legacy_pixel_size(gl::LUMINANCE_ALPHA, gl::UNSIGNED_BYTE), Ok(2));
        assert_eq!(legacy_pixel_size(gl::RGB, gl::UNSIGNED_SHORT_5_6_5), Ok(2));
        assert_eq!(
            legacy_pixel_size(gl::RGBA, gl::UNSIGNED_SHORT_5_6_5),
            Err(GlError::InvalidOperation)
        );
        assert_eq!(legacy_pixel_size(gl::RED, gl::UNSIGNED_BYTE), Err(GlError::InvalidEnum));
        assert_eq!(legacy_pixel_size(gl::RGBA, gl::SHORT), Err(GlError::InvalidEnum));
    }

    #[test]
    fn test_renderable_formats() {
        assert!(is_renderable_color_format(gl::RGBA8, false));
        assert!(!is_renderable_color_format(gl::RGBA32F, false));
        assert!(is_renderable_color_format(gl::RGBA32F, true));
        assert!(is_renderable_texture_format(gl::RGBA, false));
        assert!(!is_renderable_texture_format(gl::RGB9_E5, true));
        assert!(is_multisample_format(gl::DEPTH24_STENCIL8, false));
        assert!(!is_multisample_format(gl::R8, false));
        assert!(!is_multisample_format(gl::STENCIL_INDEX, false));
    }
}
