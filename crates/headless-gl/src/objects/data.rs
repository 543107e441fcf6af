//! Per-kind tracked state of registry objects.

use std::collections::BTreeMap;

use super::ObjectKey;
use crate::state::VertexArrayState;
use crate::value::ActiveInfo;

/// Mip levels tracked per texture.
pub const MAX_TEXTURE_LEVELS: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct BufferData {
    /// `ARRAY_BUFFER` or `ELEMENT_ARRAY_BUFFER` once bound, `0` before.
    pub binding: u32,
    pub size: usize,
    pub usage: u32,
    /// Shadow copy of element data, kept for index range validation.
    pub elements: Vec<u8>,
}

/// Dimensions of one mip level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelInfo {
    pub width: i32,
    pub height: i32,
    pub depth: i32,
}

#[derive(Debug, Clone)]
pub struct TextureData {
    /// Dimensional target once bound, `0` before.
    pub binding: u32,
    pub levels: [LevelInfo; MAX_TEXTURE_LEVELS],
    pub format: u32,
    pub ty: u32,
    pub internal_format: u32,
    /// Cleared when a float texture is given a filter it cannot sample with.
    pub complete: bool,
    /// Set by `texStorage*`.
    pub immutable: bool,
}

impl Default for TextureData {
    fn default() -> Self {
        Self {
            binding: 0,
            levels: [LevelInfo::default(); MAX_TEXTURE_LEVELS],
            format: 0,
            ty: 0,
            internal_format: 0,
            complete: true,
            immutable: false,
        }
    }
}

impl TextureData {
    pub fn level(&self, level: i32) -> LevelInfo {
        usize::try_from(level)
            .ok()
            .and_then(|l| self.levels.get(l).copied())
            .unwrap_or_default()
    }

    pub fn set_level(&mut self, level: i32, info: LevelInfo) {
        if let Some(slot) = usize::try_from(level).ok().and_then(|l| self.levels.get_mut(l)) {
            *slot = info;
        }
    }
}

/// Object attached to a framebuffer attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachedObject {
    Texture(ObjectKey),
    Renderbuffer(ObjectKey),
}

impl AttachedObject {
    pub fn key(self) -> ObjectKey {
        match self {
            AttachedObject::Texture(key) | AttachedObject::Renderbuffer(key) => key,
        }
    }
}

/// One populated attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub object: AttachedObject,
    pub level: i32,
    /// Texture target used for the attachment (`TEXTURE_2D` or a cube face).
    pub face: u32,
}

#[derive(Debug, Clone, Default)]
pub struct FramebufferData {
    /// Last target this framebuffer was bound to, `0` before.
    pub binding: u32,
    pub attachments: BTreeMap<u32, Attachment>,
    /// Cached completeness, `None` until computed.
    pub status: Option<u32>,
    /// Valid only while `status` is complete.
    pub width: i32,
    pub height: i32,
}

impl FramebufferData {
    pub fn attached(&self, attachment: u32) -> Option<AttachedObject> {
        self.attachments.get(&attachment).map(|a| a.object)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderbufferData {
    pub binding: u32,
    pub width: i32,
    pub height: i32,
    pub format: u32,
    pub samples: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ProgramData {
    /// Link generation; bumps on every `linkProgram`.
    pub link_count: u32,
    pub link_status: bool,
    pub link_info_log: String,
    pub validate_status: bool,
    /// Locations of the active attributes.
    pub attributes: Vec<i32>,
    pub uniforms: Vec<ActiveInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct ShaderData {
    pub shader_type: u32,
    pub source: String,
    pub compile_status: bool,
    pub compile_info: String,
}

#[derive(Debug, Clone, Default)]
pub struct VertexArrayData {
    /// Set on first bind, as `isVertexArray` requires.
    pub bound_once: bool,
    pub state: VertexArrayState,
}

/// Tracked state of a registry object.
#[derive(Debug, Clone)]
pub enum ObjectData {
    Buffer(BufferData),
    Texture(TextureData),
    Framebuffer(FramebufferData),
    Renderbuffer(RenderbufferData),
    Program(ProgramData),
    Shader(ShaderData),
    VertexArray(VertexArrayData),
}

impl ObjectData {
    pub fn kind(&self) -> crate::driver::ObjectKind {
        use crate::driver::ObjectKind;
        match self {
            ObjectData::Buffer(_) => ObjectKind::Buffer,
            ObjectData::Texture(_) => ObjectKind::Texture,
            ObjectData::Framebuffer(_) => ObjectKind::Framebuffer,
            ObjectData::Renderbuffer(_) => ObjectKind::Renderbuffer,
            ObjectData::Program(_) => ObjectKind::Program,
            ObjectData::Shader(_) => ObjectKind::Shader,
            ObjectData::VertexArray(_) => ObjectKind::VertexArray,
        }
    }
}
