//! Framebuffer attachment points and completeness.
//!
//! Completeness is computed by the layer rather than asked of the driver, so
//! that `checkFramebufferStatus` and the draw-time gate agree with the rules
//! WebGL imposes on top of GL ES.

use crate::constants as gl;
use crate::error::{GlError, GlResult};
use crate::formats;
use crate::objects::{
    AttachedObject, FramebufferData, ObjectRegistry, TextureData, WebGLRenderbuffer, WebGLTexture,
};
use crate::value::ParameterValue;

/// Valid attachment points of a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSet {
    all: Vec<u32>,
    color: Vec<u32>,
}

impl Default for AttachmentSet {
    fn default() -> Self {
        Self::with_color_attachments(1)
    }
}

impl AttachmentSet {
    /// `COLOR_ATTACHMENT0..count` plus the depth and stencil points.
    pub fn with_color_attachments(count: u32) -> Self {
        let color: Vec<u32> = (0..count.max(1)).map(|i| gl::COLOR_ATTACHMENT0 + i).collect();
        let mut all = color.clone();
        all.extend([
            gl::DEPTH_ATTACHMENT,
            gl::STENCIL_ATTACHMENT,
            gl::DEPTH_STENCIL_ATTACHMENT,
        ]);
        Self { all, color }
    }

    pub fn all(&self) -> &[u32] {
        &self.all
    }

    pub fn color(&self) -> &[u32] {
        &self.color
    }

    pub fn contains(&self, attachment: u32) -> bool {
        self.all.contains(&attachment)
    }

    pub fn is_color(&self, attachment: u32) -> bool {
        self.color.contains(&attachment)
    }
}

/// Format rules applied by the completeness pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletenessRules {
    /// Color textures must be `RGBA` with byte or float texels.
    WebGL1,
    /// Color attachments must use a renderable internal format.
    WebGL2 { color_buffer_float: bool },
}

impl CompletenessRules {
    fn depth_stencil_format(self, format: u32) -> bool {
        match self {
            CompletenessRules::WebGL1 => format == gl::DEPTH_STENCIL,
            CompletenessRules::WebGL2 { .. } => matches!(
                format,
                gl::DEPTH_STENCIL | gl::DEPTH24_STENCIL8 | gl::DEPTH32F_STENCIL8
            ),
        }
    }

    fn depth_format(self, format: u32) -> bool {
        match self {
            CompletenessRules::WebGL1 => format == gl::DEPTH_COMPONENT16,
            CompletenessRules::WebGL2 { .. } => matches!(
                format,
                gl::DEPTH_COMPONENT16 | gl::DEPTH_COMPONENT24 | gl::DEPTH_COMPONENT32F
            ),
        }
    }

    fn color_texture(self, texture: &TextureData) -> bool {
        match self {
            CompletenessRules::WebGL1 => {
                texture.format == gl::RGBA && matches!(texture.ty, gl::UNSIGNED_BYTE | gl::FLOAT)
            }
            CompletenessRules::WebGL2 { color_buffer_float } => {
                formats::is_renderable_texture_format(texture.internal_format, color_buffer_float)
            }
        }
    }

    fn color_renderbuffer(self, format: u32) -> bool {
        match self {
            CompletenessRules::WebGL1 => matches!(format, gl::RGBA4 | gl::RGB565 | gl::RGB5_A1),
            CompletenessRules::WebGL2 { color_buffer_float } => {
                formats::is_renderable_color_format(format, color_buffer_float)
            }
        }
    }
}

/// Outcome of the completeness pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completeness {
    pub status: u32,
    /// Agreed attachment size when complete.
    pub size: Option<(i32, i32)>,
}

impl Completeness {
    fn incomplete(status: u32) -> Self {
        Self { status, size: None }
    }

    pub fn is_complete(&self) -> bool {
        self.status == gl::FRAMEBUFFER_COMPLETE
    }
}

/// Compute the completeness of `framebuffer` from its recorded attachments.
pub fn precheck(
    registry: &ObjectRegistry,
    framebuffer: &FramebufferData,
    attachments: &AttachmentSet,
    rules: CompletenessRules,
) -> Completeness {
    let depth = framebuffer.attached(gl::DEPTH_ATTACHMENT);
    let stencil = framebuffer.attached(gl::STENCIL_ATTACHMENT);
    let depth_stencil = framebuffer.attached(gl::DEPTH_STENCIL_ATTACHMENT);

    if (depth_stencil.is_some() && (stencil.is_some() || depth.is_some()))
        || (stencil.is_some() && depth.is_some())
    {
        return Completeness::incomplete(gl::FRAMEBUFFER_UNSUPPORTED);
    }

    let color_count = attachments
        .color()
        .iter()
        .filter(|a| framebuffer.attached(**a).is_some())
        .count();
    if color_count == 0 {
        return Completeness::incomplete(gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT);
    }

    let mut sizes: Vec<(i32, i32)> = Vec::new();

    let depth_roles: [(Option<AttachedObject>, &dyn Fn(u32) -> bool); 3] = [
        (depth_stencil, &|f| rules.depth_stencil_format(f)),
        (depth, &|f| rules.depth_format(f)),
        (stencil, &|f| f == gl::STENCIL_INDEX8),
    ];
    for (object, accepts) in depth_roles {
        match object {
            Some(AttachedObject::Texture(_)) => {
                return Completeness::incomplete(gl::FRAMEBUFFER_UNSUPPORTED);
            }
            Some(AttachedObject::Renderbuffer(key)) => {
                let Some(rb) = registry.renderbuffer(key) else {
                    return Completeness::incomplete(gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT);
                };
                if !accepts(rb.format) {
                    return Completeness::incomplete(gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT);
                }
                sizes.push((rb.width, rb.height));
            }
            None => {}
        }
    }

    for point in attachments.color() {
        let Some(attachment) = framebuffer.attachments.get(point) else {
            continue;
        };
        match attachment.object {
            AttachedObject::Texture(key) => {
                let Some(texture) = registry.texture(key) else {
                    return Completeness::incomplete(gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT);
                };
                if !rules.color_texture(texture) {
                    return Completeness::incomplete(gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT);
                }
                let level = texture.level(attachment.level);
                sizes.push((level.width, level.height));
            }
            AttachedObject::Renderbuffer(key) => {
                let Some(rb) = registry.renderbuffer(key) else {
                    return Completeness::incomplete(gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT);
                };
                if !rules.color_renderbuffer(rb.format) {
                    return Completeness::incomplete(gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT);
                }
                sizes.push((rb.width, rb.height));
            }
        }
    }

    let Some(&(width, height)) = sizes.first() else {
        return Completeness::incomplete(gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT);
    };
    if sizes.windows(2).any(|pair| pair[0] != pair[1]) {
        return Completeness::incomplete(gl::FRAMEBUFFER_INCOMPLETE_DIMENSIONS);
    }
    if width == 0 || height == 0 {
        return Completeness::incomplete(gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT);
    }
    Completeness {
        status: gl::FRAMEBUFFER_COMPLETE,
        size: Some((width, height)),
    }
}

/// `getFramebufferAttachmentParameter` for an attachment point of a bound
/// framebuffer.
pub fn attachment_parameter(
    registry: &ObjectRegistry,
    framebuffer: &FramebufferData,
    attachment: u32,
    pname: u32,
) -> GlResult<ParameterValue> {
    let Some(record) = framebuffer.attachments.get(&attachment) else {
        return match pname {
            gl::FRAMEBUFFER_ATTACHMENT_OBJECT_TYPE => Ok(ParameterValue::Int(gl::NONE as i32)),
            _ => Err(GlError::InvalidEnum),
        };
    };
    match (record.object, pname) {
        (AttachedObject::Texture(key), gl::FRAMEBUFFER_ATTACHMENT_OBJECT_NAME) => {
            Ok(registry.wrap_opt::<WebGLTexture>(Some(key)).into())
        }
        (AttachedObject::Texture(_), gl::FRAMEBUFFER_ATTACHMENT_OBJECT_TYPE) => {
            Ok(ParameterValue::Int(gl::TEXTURE as i32))
        }
        (AttachedObject::Texture(_), gl::FRAMEBUFFER_ATTACHMENT_TEXTURE_LEVEL) => {
            Ok(ParameterValue::Int(record.level))
        }
        (AttachedObject::Texture(_), gl::FRAMEBUFFER_ATTACHMENT_TEXTURE_CUBE_MAP_FACE) => {
            let face = if record.face == gl::TEXTURE_2D { 0 } else { record.face };
            Ok(ParameterValue::Int(face as i32))
        }
        (AttachedObject::Renderbuffer(key), gl::FRAMEBUFFER_ATTACHMENT_OBJECT_NAME) => {
            Ok(registry.wrap_opt::<WebGLRenderbuffer>(Some(key)).into())
        }
        (AttachedObject::Renderbuffer(_), gl::FRAMEBUFFER_ATTACHMENT_OBJECT_TYPE) => {
            Ok(ParameterValue::Int(gl::RENDERBUFFER as i32))
        }
        _ => Err(GlError::InvalidEnum),
    }
}

/// Cube map face targets.
pub fn is_cube_face(target: u32) -> bool {
    (gl::TEXTURE_CUBE_MAP_POSITIVE_X..=gl::TEXTURE_CUBE_MAP_NEGATIVE_Z).contains(&target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{
        next_context_id, Attachment, LevelInfo, ObjectData, ObjectKey, RenderbufferData,
    };

    fn renderbuffer(reg: &mut ObjectRegistry, format: u32, w: i32, h: i32) -> ObjectKey {
        reg.insert(
            w as u32 * 1000 + h as u32 + format,
            ObjectData::Renderbuffer(RenderbufferData {
                binding: gl::RENDERBUFFER,
                width: w,
                height: h,
                format,
                samples: 0,
            }),
        )
    }

    fn attach(fb: &mut FramebufferData, point: u32, object: AttachedObject) {
        fb.attachments.insert(
            point,
            Attachment {
                object,
                level: 0,
                face: gl::RENDERBUFFER,
            },
        );
    }

    #[test]
    fn test_attachment_sets() {
        let set = AttachmentSet::with_color_attachments(4);
        assert!(set.contains(gl::COLOR_ATTACHMENT0 + 3));
        assert!(!set.contains(gl::COLOR_ATTACHMENT0 + 4));
        assert!(set.contains(gl::DEPTH_STENCIL_ATTACHMENT));
        assert_eq!(AttachmentSet::default().color(), &[gl::COLOR_ATTACHMENT0]);
    }

    #[test]
    fn test_empty_framebuffer_is_missing_attachment() {
        let reg = ObjectRegistry::new(next_context_id());
        let fb = FramebufferData::default();
        let result = precheck(&reg, &fb, &AttachmentSet::default(), CompletenessRules::WebGL1);
        assert_eq!(result.status, gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT);
    }

    #[test]
    fn test_mismatched_dimensions() {
        let mut reg = ObjectRegistry::new(next_context_id());
        let color = renderbuffer(&mut reg, gl::RGBA4, 4, 4);
        let depth = renderbuffer(&mut reg, gl::DEPTH_COMPONENT16, 8, 4);
        let mut fb = FramebufferData::default();
        attach(&mut fb, gl::COLOR_ATTACHMENT0, AttachedObject::Renderbuffer(color));
        attach(&mut fb, gl::DEPTH_ATTACHMENT, AttachedObject::Renderbuffer(depth));
        let result = precheck(&reg, &fb, &AttachmentSet::default(), CompletenessRules::WebGL1);
        assert_eq!(result.status, gl::FRAMEBUFFER_INCOMPLETE_DIMENSIONS);
    }

    #[test]
    fn test_depth_plus_depth_stencil_unsupported() {
        let mut reg = ObjectRegistry::new(next_context_id());
        let a = renderbuffer(&mut reg, gl::DEPTH_COMPONENT16, 4, 4);
        let b = renderbuffer(&mut reg, gl::DEPTH_STENCIL, 4, 4);
        let mut fb = FramebufferData::default();
        attach(&mut fb, gl::DEPTH_ATTACHMENT, AttachedObject::Renderbuffer(a));
        attach(&mut fb, gl::DEPTH_STENCIL_ATTACHMENT, AttachedObject::Renderbuffer(b));
        let result = precheck(&reg, &fb, &AttachmentSet::default(), CompletenessRules::WebGL1);
        assert_eq!(result.status, gl::FRAMEBUFFER_UNSUPPORTED);
    }

    #[test]
    fn test_complete_texture_attachment() {
        let mut reg = ObjectRegistry::new(next_context_id());
        let mut texture = TextureData {
            format: gl::RGBA,
            internal_format: gl::RGBA,
            ty: gl::UNSIGNED_BYTE,
            ..Default::default()
        };
        texture.set_level(
            0,
            LevelInfo {
                width: 16,
                height: 8,
                depth: 1,
            },
        );
        let key = reg.insert(9, ObjectData::Texture(texture));
        let mut fb = FramebufferData::default();
        attach(&mut fb, gl::COLOR_ATTACHMENT0, AttachedObject::Texture(key));
        let result = precheck(&reg, &fb, &AttachmentSet::default(), CompletenessRules::WebGL1);
        assert!(result.is_complete());
        assert_eq!(result.size, Some((16, 8)));
    }

    #[test]
    fn test_webgl2_color_renderbuffer_formats() {
        let mut reg = ObjectRegistry::new(next_context_id());
        let color = renderbuffer(&mut reg, gl::RGBA32F, 2, 2);
        let mut fb = FramebufferData::default();
        attach(&mut fb, gl::COLOR_ATTACHMENT0, AttachedObject::Renderbuffer(color));
        let set = AttachmentSet::default();
        let without = precheck(
            &reg,
            &fb,
            &set,
            CompletenessRules::WebGL2 {
                color_buffer_float: false,
            },
        );
        assert_eq!(without.status, gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT);
        let with = precheck(
            &reg,
            &fb,
            &set,
            CompletenessRules::WebGL2 {
                color_buffer_float: true,
            },
        );
        assert!(with.is_complete());
    }

    #[test]
    fn test_attachment_parameter_for_empty_point() {
        let reg = ObjectRegistry::new(next_context_id());
        let fb = FramebufferData::default();
        assert_eq!(
            attachment_parameter(
                &reg,
                &fb,
                gl::COLOR_ATTACHMENT0,
                gl::FRAMEBUFFER_ATTACHMENT_OBJECT_TYPE
            ),
            Ok(ParameterValue::Int(gl::NONE as i32))
        );
        assert_eq!(
            attachment_parameter(
                &reg,
                &fb,
                gl::COLOR_ATTACHMENT0,
                gl::FRAMEBUFFER_ATTACHMENT_TEXTURE_LEVEL
            ),
            Err(GlError::InvalidEnum)
        );
    }
}
