//! Extension registry.
//!
//! Extensions are a closed set ([`ExtensionId`]). `getExtension` resolves a
//! name to an id, checks availability for the context version against the
//! driver's extension string, and memoizes the resulting [`Extension`] value
//! for the lifetime of the context. An unavailable extension is not
//! memoized, so a later call checks again.

use std::collections::BTreeMap;

use crate::constants as gl;
use crate::context::WebGLVersion;

/// Extensions known to the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtensionId {
    AngleInstancedArrays,
    OesElementIndexUint,
    OesStandardDerivatives,
    OesTextureFloat,
    OesTextureFloatLinear,
    WebGLDrawBuffers,
    ExtBlendMinmax,
    ExtTextureFilterAnisotropic,
    OesVertexArrayObject,
    ExtShaderTextureLod,
    ExtColorBufferFloat,
    StackglResizeDrawingbuffer,
    StackglDestroyContext,
}

impl ExtensionId {
    pub const ALL: [ExtensionId; 13] = [
        ExtensionId::AngleInstancedArrays,
        ExtensionId::OesElementIndexUint,
        ExtensionId::OesStandardDerivatives,
        ExtensionId::OesTextureFloat,
        ExtensionId::OesTextureFloatLinear,
        ExtensionId::WebGLDrawBuffers,
        ExtensionId::ExtBlendMinmax,
        ExtensionId::ExtTextureFilterAnisotropic,
        ExtensionId::OesVertexArrayObject,
        ExtensionId::ExtShaderTextureLod,
        ExtensionId::ExtColorBufferFloat,
        ExtensionId::StackglResizeDrawingbuffer,
        ExtensionId::StackglDestroyContext,
    ];

    /// Name reported by `getSupportedExtensions`.
    pub fn name(self) -> &'static str {
        match self {
            ExtensionId::AngleInstancedArrays => "ANGLE_instanced_arrays",
            ExtensionId::OesElementIndexUint => "OES_element_index_uint",
            ExtensionId::OesStandardDerivatives => "OES_standard_derivatives",
            ExtensionId::OesTextureFloat => "OES_texture_float",
            ExtensionId::OesTextureFloatLinear => "OES_texture_float_linear",
            ExtensionId::WebGLDrawBuffers => "WEBGL_draw_buffers",
            ExtensionId::ExtBlendMinmax => "EXT_blend_minmax",
            ExtensionId::ExtTextureFilterAnisotropic => "EXT_texture_filter_anisotropic",
            ExtensionId::OesVertexArrayObject => "OES_vertex_array_object",
            ExtensionId::ExtShaderTextureLod => "EXT_shader_texture_lod",
            ExtensionId::ExtColorBufferFloat => "EXT_color_buffer_float",
            ExtensionId::StackglResizeDrawingbuffer => "STACKGL_resize_drawingbuffer",
            ExtensionId::StackglDestroyContext => "STACKGL_destroy_context",
        }
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(name))
    }

    /// Driver extension that gates this one; `None` when always offered.
    pub fn native_name(self) -> Option<&'static str> {
        match self {
            ExtensionId::AngleInstancedArrays
            | ExtensionId::StackglResizeDrawingbuffer
            | ExtensionId::StackglDestroyContext => None,
            ExtensionId::OesElementIndexUint => Some("GL_OES_element_index_uint"),
            ExtensionId::OesStandardDerivatives => Some("GL_OES_standard_derivatives"),
            ExtensionId::OesTextureFloat => Some("GL_OES_texture_float"),
            ExtensionId::OesTextureFloatLinear => Some("GL_OES_texture_float_linear"),
            ExtensionId::WebGLDrawBuffers => Some("GL_EXT_draw_buffers"),
            ExtensionId::ExtBlendMinmax => Some("GL_EXT_blend_minmax"),
            ExtensionId::ExtTextureFilterAnisotropic => Some("GL_EXT_texture_filter_anisotropic"),
            ExtensionId::OesVertexArrayObject => Some("GL_OES_vertex_array_object"),
            ExtensionId::ExtShaderTextureLod => Some("GL_EXT_shader_texture_lod"),
            ExtensionId::ExtColorBufferFloat => Some("GL_EXT_color_buffer_float"),
        }
    }

    /// Whether a context of `version` ever offers this extension.
    pub fn offered_by(self, version: WebGLVersion) -> bool {
        match version {
            WebGLVersion::WebGL1 => self != ExtensionId::ExtColorBufferFloat,
            WebGLVersion::WebGL2 => matches!(
                self,
                ExtensionId::OesTextureFloatLinear
                    | ExtensionId::ExtTextureFilterAnisotropic
                    | ExtensionId::ExtColorBufferFloat
                    | ExtensionId::StackglResizeDrawingbuffer
                    | ExtensionId::StackglDestroyContext
            ),
        }
    }

    /// Whether this extension is available given the driver extension string.
    pub fn is_available(self, version: WebGLVersion, native_extensions: &str) -> bool {
        if !self.offered_by(version) {
            return false;
        }
        match self.native_name() {
            None => true,
            Some(native) => {
                let bare = native.trim_start_matches("GL_");
                native_extensions
                    .split_whitespace()
                    .any(|token| token == native || token == bare)
            }
        }
    }
}

/// Extensions offered by a context of `version`, in reporting order.
pub fn supported_extensions(version: WebGLVersion, native_extensions: &str) -> Vec<ExtensionId> {
    let always: &[ExtensionId] = match version {
        WebGLVersion::WebGL1 => &[
            ExtensionId::AngleInstancedArrays,
            ExtensionId::StackglResizeDrawingbuffer,
            ExtensionId::StackglDestroyContext,
        ],
        WebGLVersion::WebGL2 => &[
            ExtensionId::StackglResizeDrawingbuffer,
            ExtensionId::StackglDestroyContext,
        ],
    };
    always
        .iter()
        .copied()
        .chain(ExtensionId::ALL.into_iter().filter(|id| {
            id.native_name().is_some() && id.is_available(version, native_extensions)
        }))
        .collect()
}

/// `ANGLE_instanced_arrays`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AngleInstancedArrays;

impl AngleInstancedArrays {
    pub const VERTEX_ATTRIB_ARRAY_DIVISOR_ANGLE: u32 = gl::VERTEX_ATTRIB_ARRAY_DIVISOR_ANGLE;
}

/// `OES_standard_derivatives`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OesStandardDerivatives;

impl OesStandardDerivatives {
    pub const FRAGMENT_SHADER_DERIVATIVE_HINT_OES: u32 = gl::FRAGMENT_SHADER_DERIVATIVE_HINT_OES;
}

/// `EXT_blend_minmax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtBlendMinmax;

impl ExtBlendMinmax {
    pub const MIN_EXT: u32 = gl::MIN_EXT;
    pub const MAX_EXT: u32 = gl::MAX_EXT;
}

/// `EXT_texture_filter_anisotropic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtTextureFilterAnisotropic;

impl ExtTextureFilterAnisotropic {
    pub const TEXTURE_MAX_ANISOTROPY_EXT: u32 = gl::TEXTURE_MAX_ANISOTROPY_EXT;
    pub const MAX_TEXTURE_MAX_ANISOTROPY_EXT: u32 = gl::MAX_TEXTURE_MAX_ANISOTROPY_EXT;
}

/// `OES_vertex_array_object`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OesVertexArrayObject;

impl OesVertexArrayObject {
    pub const VERTEX_ARRAY_BINDING_OES: u32 = gl::VERTEX_ARRAY_BINDING_OES;
}

/// `WEBGL_draw_buffers`, sized from the driver's `MAX_DRAW_BUFFERS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebGLDrawBuffers {
    pub max_draw_buffers: u32,
}

impl WebGLDrawBuffers {
    pub const MAX_COLOR_ATTACHMENTS_WEBGL: u32 = gl::MAX_COLOR_ATTACHMENTS_WEBGL;
    pub const MAX_DRAW_BUFFERS_WEBGL: u32 = gl::MAX_DRAW_BUFFERS_WEBGL;

    pub fn new(max_draw_buffers: u32) -> Self {
        Self {
            max_draw_buffers: max_draw_buffers.max(1),
        }
    }

    /// `COLOR_ATTACHMENTi_WEBGL`.
    pub fn color_attachment(&self, index: u32) -> Option<u32> {
        (index < self.max_draw_buffers).then(|| gl::COLOR_ATTACHMENT0_WEBGL + index)
    }

    /// `DRAW_BUFFERi_WEBGL`.
    pub fn draw_buffer(&self, index: u32) -> Option<u32> {
        (index < self.max_draw_buffers).then(|| gl::DRAW_BUFFER0_WEBGL + index)
    }
}

/// A resolved extension, as returned by `getExtension`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension {
    AngleInstancedArrays(AngleInstancedArrays),
    OesStandardDerivatives(OesStandardDerivatives),
    ExtBlendMinmax(ExtBlendMinmax),
    ExtTextureFilterAnisotropic(ExtTextureFilterAnisotropic),
    OesVertexArrayObject(OesVertexArrayObject),
    WebGLDrawBuffers(WebGLDrawBuffers),
    /// Extensions that only enable behavior and expose nothing.
    Flag(ExtensionId),
}

impl Extension {
    /// Build the capability value for `id`.
    pub fn new(id: ExtensionId, max_draw_buffers: u32) -> Self {
        match id {
            ExtensionId::AngleInstancedArrays => Extension::AngleInstancedArrays(AngleInstancedArrays),
            ExtensionId::OesStandardDerivatives => {
                Extension::OesStandardDerivatives(OesStandardDerivatives)
            }
            ExtensionId::ExtBlendMinmax => Extension::ExtBlendMinmax(ExtBlendMinmax),
            ExtensionId::ExtTextureFilterAnisotropic => {
                Extension::ExtTextureFilterAnisotropic(ExtTextureFilterAnisotropic)
            }
            ExtensionId::OesVertexArrayObject => Extension::OesVertexArrayObject(OesVertexArrayObject),
            ExtensionId::WebGLDrawBuffers => {
                Extension::WebGLDrawBuffers(WebGLDrawBuffers::new(max_draw_buffers))
            }
            other => Extension::Flag(other),
        }
    }

    pub fn id(&self) -> ExtensionId {
        match self {
            Extension::AngleInstancedArrays(_) => ExtensionId::AngleInstancedArrays,
            Extension::OesStandardDerivatives(_) => ExtensionId::OesStandardDerivatives,
            Extension::ExtBlendMinmax(_) => ExtensionId::ExtBlendMinmax,
            Extension::ExtTextureFilterAnisotropic(_) => ExtensionId::ExtTextureFilterAnisotropic,
            Extension::OesVertexArrayObject(_) => ExtensionId::OesVertexArrayObject,
            Extension::WebGLDrawBuffers(_) => ExtensionId::WebGLDrawBuffers,
            Extension::Flag(id) => *id,
        }
    }

    pub fn name(&self) -> &'static str {
        self.id().name()
    }
}

/// Extensions resolved on a context.
#[derive(Debug, Clone, Default)]
pub struct ExtensionTable {
    resolved: BTreeMap<ExtensionId, Extension>,
}

impl ExtensionTable {
    pub fn get(&self, id: ExtensionId) -> Option<&Extension> {
        self.resolved.get(&id)
    }

    pub fn is_enabled(&self, id: ExtensionId) -> bool {
        self.resolved.contains_key(&id)
    }

    pub fn insert(&mut self, extension: Extension) -> &Extension {
        self.resolved.entry(extension.id()).or_insert(extension)
    }

    /// `WEBGL_draw_buffers`, when resolved.
    pub fn draw_buffers(&self) -> Option<&WebGLDrawBuffers> {
        match self.resolved.get(&ExtensionId::WebGLDrawBuffers) {
            Some(Extension::WebGLDrawBuffers(ext)) => Some(ext),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.resolved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NATIVE: &str = "GL_OES_texture_float GL_EXT_draw_buffers GL_OES_element_index_uint";

    #[test]
    fn test_name_lookup_is_case_insensitive() {
        assert_eq!(
            ExtensionId::from_name("oes_texture_float"),
            Some(ExtensionId::OesTextureFloat)
        );
        assert_eq!(
            ExtensionId::from_name("WEBGL_DRAW_BUFFERS"),
            Some(ExtensionId::WebGLDrawBuffers)
        );
        assert_eq!(ExtensionId::from_name("WEBGL_lose_context"), None);
    }

    #[test]
    fn test_webgl1_supported_list() {
        let names: Vec<&str> = supported_extensions(WebGLVersion::WebGL1, NATIVE)
            .into_iter()
            .map(ExtensionId::name)
            .collect();
        assert_eq!(
            names,
            vec![
                "ANGLE_instanced_arrays",
                "STACKGL_resize_drawingbuffer",
                "STACKGL_destroy_context",
                "OES_element_index_uint",
                "OES_texture_float",
                "WEBGL_draw_buffers",
            ]
        );
    }

    #[test]
    fn test_webgl2_offers_a_reduced_set() {
        let native = "GL_OES_texture_float EXT_color_buffer_float";
        let ids = supported_extensions(WebGLVersion::WebGL2, native);
        assert!(ids.contains(&ExtensionId::ExtColorBufferFloat));
        assert!(!ids.contains(&ExtensionId::OesTextureFloat));
        assert!(!ids.contains(&ExtensionId::AngleInstancedArrays));
    }

    #[test]
    fn test_draw_buffers_attachments() {
        let ext = WebGLDrawBuffers::new(4);
        assert_eq!(ext.color_attachment(3), Some(gl::COLOR_ATTACHMENT0 + 3));
        assert_eq!(ext.color_attachment(4), None);
    }

    #[test]
    fn test_table_memoizes_first_instance() {
        let mut table = ExtensionTable::default();
        table.insert(Extension::new(ExtensionId::WebGLDrawBuffers, 4));
        table.insert(Extension::new(ExtensionId::WebGLDrawBuffers, 8));
        assert_eq!(table.draw_buffers().map(|e| e.max_draw_buffers), Some(4));
        assert!(table.is_enabled(ExtensionId::WebGLDrawBuffers));
    }
}
