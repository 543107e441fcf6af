//! Framebuffer attachments, completeness and renderbuffer storage.

use super::ContextBase;
use crate::constants as gl;
use crate::driver::NativeDriver;
use crate::error::GlError;
use crate::framebuffer::{self, is_cube_face};
use crate::objects::{AttachedObject, Attachment, ObjectKey, WebGLRenderbuffer, WebGLTexture};
use crate::value::ParameterValue;

impl<D: NativeDriver> ContextBase<D> {
    // ==================== Completeness ====================

    /// Recompute and cache the completeness of `key`.
    pub(crate) fn refresh_completeness(&mut self, key: ObjectKey) -> u32 {
        let attachments = self.attachment_set();
        let rules = self.completeness_rules();
        let Some(data) = self.registry.framebuffer(key) else {
            return gl::FRAMEBUFFER_UNSUPPORTED;
        };
        let result = framebuffer::precheck(&self.registry, data, &attachments, rules);
        if let Some(data) = self.registry.framebuffer_mut(key) {
            data.status = Some(result.status);
            (data.width, data.height) = result.size.unwrap_or((0, 0));
        }
        result.status
    }

    /// Sync the native attachments of `key`, bound at `target`, with the
    /// recorded ones.
    ///
    /// Incomplete framebuffers carry no native attachments, so the driver
    /// never renders into a configuration the layer rejected.
    pub(crate) fn update_framebuffer_attachments(&mut self, key: ObjectKey, target: u32) {
        let previous = self.registry.framebuffer(key).and_then(|data| data.status);
        let status = self.refresh_completeness(key);
        if status != gl::FRAMEBUFFER_COMPLETE {
            if previous == Some(gl::FRAMEBUFFER_COMPLETE) {
                self.reset_native_attachments(key, target);
            }
            return;
        }
        self.reset_native_attachments(key, target);

        let Some(data) = self.registry.framebuffer(key) else {
            return;
        };
        let attachments: Vec<(u32, Attachment)> =
            data.attachments.iter().map(|(p, a)| (*p, *a)).collect();
        for (point, attachment) in attachments {
            let handle = self.registry.handle(Some(attachment.object.key()));
            match attachment.object {
                AttachedObject::Texture(_) => self.driver.framebuffer_texture_2d(
                    target,
                    point,
                    attachment.face,
                    handle,
                    attachment.level,
                ),
                AttachedObject::Renderbuffer(_) => {
                    self.driver
                        .framebuffer_renderbuffer(target, point, gl::RENDERBUFFER, handle)
                }
            }
        }
    }

    fn reset_native_attachments(&mut self, key: ObjectKey, target: u32) {
        let points = self.attachment_set();
        for &point in points.all() {
            let recorded = self
                .registry
                .framebuffer(key)
                .and_then(|data| data.attachments.get(&point).copied());
            match recorded {
                Some(Attachment {
                    object: AttachedObject::Renderbuffer(_),
                    ..
                }) => self
                    .driver
                    .framebuffer_renderbuffer(target, point, gl::RENDERBUFFER, 0),
                Some(Attachment { face, level, .. }) => {
                    self.driver.framebuffer_texture_2d(target, point, face, 0, level)
                }
                None => self
                    .driver
                    .framebuffer_texture_2d(target, point, gl::TEXTURE_2D, 0, 0),
            }
        }
    }

    /// The bound framebuffers with the native target each is bound at.
    pub(crate) fn bound_framebuffers(&self) -> Vec<(ObjectKey, u32)> {
        match (self.draw_framebuffer, self.read_framebuffer) {
            (Some(draw), Some(read)) if draw == read => vec![(draw, gl::FRAMEBUFFER)],
            (draw, read) => draw
                .map(|k| (k, gl::DRAW_FRAMEBUFFER))
                .into_iter()
                .chain(read.map(|k| (k, gl::READ_FRAMEBUFFER)))
                .collect(),
        }
    }

    /// Refresh bound framebuffers that have `object` attached, after its
    /// storage changed.
    pub(crate) fn update_active_framebuffers(&mut self, object: ObjectKey) {
        for (framebuffer, target) in self.bound_framebuffers() {
            let attached = self.registry.framebuffer(framebuffer).is_some_and(|data| {
                data.attachments.values().any(|a| a.object.key() == object)
            });
            if attached {
                self.update_framebuffer_attachments(framebuffer, target);
            }
        }
    }

    /// Gate for draws and reads: an incomplete framebuffer is
    /// `INVALID_FRAMEBUFFER_OPERATION`.
    pub(crate) fn framebuffer_ok(&mut self, key: Option<ObjectKey>) -> bool {
        let Some(key) = key else {
            return true;
        };
        if self.refresh_completeness(key) != gl::FRAMEBUFFER_COMPLETE {
            self.set_error(GlError::InvalidFramebufferOperation);
            return false;
        }
        true
    }

    /// `checkFramebufferStatus`.
    pub(crate) fn check_framebuffer_status(&mut self, target: u32) -> u32 {
        if !self.version.is_framebuffer_target(target) {
            self.set_error(GlError::InvalidEnum);
            return 0;
        }
        match self.framebuffer_for(target) {
            Some(key) => self.refresh_completeness(key),
            None => gl::FRAMEBUFFER_COMPLETE,
        }
    }

    /// Framebuffer bound at a validated target.
    pub(crate) fn framebuffer_for(&self, target: u32) -> Option<ObjectKey> {
        match target {
            gl::READ_FRAMEBUFFER => self.read_framebuffer,
            _ => self.draw_framebuffer,
        }
    }

    // ==================== Attachments ====================

    fn check_attachment_target(&mut self, target: u32, attachment: u32) -> bool {
        if !self.version.is_framebuffer_target(target) || !self.attachment_set().contains(attachment) {
            self.set_error(GlError::InvalidEnum);
            return false;
        }
        true
    }

    /// Record `object` at `attachment` of `framebuffer`, moving the
    /// ownership edge from the previous attachment.
    fn set_attachment(
        &mut self,
        framebuffer: ObjectKey,
        attachment: u32,
        object: Option<AttachedObject>,
        face: u32,
        level: i32,
    ) {
        let Some(data) = self.registry.framebuffer_mut(framebuffer) else {
            return;
        };
        let previous = match object {
            Some(object) => data.attachments.insert(
                attachment,
                Attachment {
                    object,
                    level,
                    face,
                },
            ),
            None => data.attachments.remove(&attachment),
        };
        let mut released = Vec::new();
        if let Some(object) = object {
            self.registry.link(framebuffer, object.key());
        }
        if let Some(previous) = previous {
            self.registry
                .unlink_one(framebuffer, previous.object.key(), &mut released);
        }
        self.delete_released(released);
    }

    fn attach(
        &mut self,
        target: u32,
        attachment: u32,
        object: Option<AttachedObject>,
        face: u32,
        level: i32,
    ) {
        let Some(framebuffer) = self.framebuffer_for(target) else {
            self.set_error(GlError::InvalidOperation);
            return;
        };
        self.set_attachment(framebuffer, attachment, object, face, level);
        let bind_target = if target == gl::FRAMEBUFFER && self.read_framebuffer != Some(framebuffer) {
            gl::DRAW_FRAMEBUFFER
        } else {
            target
        };
        self.update_framebuffer_attachments(framebuffer, bind_target);
    }

    pub(crate) fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: Option<WebGLTexture>,
        level: i32,
    ) {
        if !self.check_attachment_target(target, attachment) {
            return;
        }
        if level != 0 {
            self.set_error(GlError::InvalidValue);
            return;
        }
        let key = match texture {
            None => None,
            Some(texture) => {
                let Some(key) = self.checked(texture) else {
                    return;
                };
                let binding = self.registry.texture(key).map_or(0, |t| t.binding);
                let expected = if textarget == gl::TEXTURE_2D {
                    gl::TEXTURE_2D
                } else if is_cube_face(textarget) {
                    gl::TEXTURE_CUBE_MAP
                } else {
                    self.set_error(GlError::InvalidEnum);
                    return;
                };
                if binding != expected {
                    self.set_error(GlError::InvalidOperation);
                    return;
                }
                Some(key)
            }
        };
        self.attach(
            target,
            attachment,
            key.map(AttachedObject::Texture),
            textarget,
            level,
        );
    }

    pub(crate) fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: Option<WebGLRenderbuffer>,
    ) {
        if !self.check_attachment_target(target, attachment) {
            return;
        }
        if renderbuffer_target != gl::RENDERBUFFER {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        let key = match renderbuffer {
            None => None,
            Some(renderbuffer) => match self.checked(renderbuffer) {
                Some(key) => Some(key),
                None => return,
            },
        };
        self.attach(
            target,
            attachment,
            key.map(AttachedObject::Renderbuffer),
            gl::RENDERBUFFER,
            0,
        );
    }

    /// Detach `object` from every bound framebuffer.
    pub(crate) fn detach_from_framebuffers(&mut self, object: ObjectKey) {
        for (framebuffer, target) in self.bound_framebuffers() {
            let points: Vec<u32> = self
                .registry
                .framebuffer(framebuffer)
                .map(|data| {
                    data.attachments
                        .iter()
                        .filter(|(_, a)| a.object.key() == object)
                        .map(|(p, _)| *p)
                        .collect()
                })
                .unwrap_or_default();
            if points.is_empty() {
                continue;
            }
            for point in points {
                self.set_attachment(framebuffer, point, None, gl::TEXTURE_2D, 0);
            }
            self.update_framebuffer_attachments(framebuffer, target);
        }
    }

    pub(crate) fn get_framebuffer_attachment_parameter(
        &mut self,
        target: u32,
        attachment: u32,
        pname: u32,
    ) -> ParameterValue {
        if !self.check_attachment_target(target, attachment) {
            return ParameterValue::Null;
        }
        let Some(key) = self.framebuffer_for(target) else {
            self.set_error(GlError::InvalidOperation);
            return ParameterValue::Null;
        };
        let result = match self.registry.framebuffer(key) {
            Some(data) => framebuffer::attachment_parameter(&self.registry, data, attachment, pname),
            None => Err(GlError::InvalidOperation),
        };
        self.report(result).unwrap_or_default()
    }

    // ==================== Renderbuffers ====================

    /// Allocate storage for the bound renderbuffer.
    ///
    /// `format_ok` is the version's verdict on `internal_format`; `samples`
    /// selects the multisample entry point.
    pub(crate) fn renderbuffer_storage(
        &mut self,
        target: u32,
        samples: Option<i32>,
        internal_format: u32,
        width: i32,
        height: i32,
        format_ok: bool,
    ) {
        if target != gl::RENDERBUFFER {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        let Some(key) = self.active_renderbuffer else {
            self.set_error(GlError::InvalidOperation);
            return;
        };
        if !format_ok {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        if samples.is_some_and(|s| s < 0) {
            self.set_error(GlError::InvalidValue);
            return;
        }
        let error = self.speculative(|d| match samples {
            Some(samples) => {
                d.renderbuffer_storage_multisample(target, samples, internal_format, width, height)
            }
            None => d.renderbuffer_storage(target, internal_format, width, height),
        });
        if error != gl::NO_ERROR {
            return;
        }
        if let Some(data) = self.registry.renderbuffer_mut(key) {
            data.width = width;
            data.height = height;
            data.format = internal_format;
            data.samples = samples.unwrap_or(0);
        }
        self.update_active_framebuffers(key);
    }

    pub(crate) fn get_renderbuffer_parameter(&mut self, target: u32, pname: u32) -> ParameterValue {
        if target != gl::RENDERBUFFER {
            self.set_error(GlError::InvalidEnum);
            return ParameterValue::Null;
        }
        let Some(data) = self
            .active_renderbuffer
            .and_then(|key| self.registry.renderbuffer(key))
            .copied()
        else {
            self.set_error(GlError::InvalidOperation);
            return ParameterValue::Null;
        };
        match pname {
            gl::RENDERBUFFER_WIDTH => ParameterValue::Int(data.width),
            gl::RENDERBUFFER_HEIGHT => ParameterValue::Int(data.height),
            gl::RENDERBUFFER_INTERNAL_FORMAT => ParameterValue::Int(data.format as i32),
            gl::RENDERBUFFER_SAMPLES if self.is_webgl2() => ParameterValue::Int(data.samples),
            gl::RENDERBUFFER_RED_SIZE
            | gl::RENDERBUFFER_GREEN_SIZE
            | gl::RENDERBUFFER_BLUE_SIZE
            | gl::RENDERBUFFER_ALPHA_SIZE
            | gl::RENDERBUFFER_DEPTH_SIZE
            | gl::RENDERBUFFER_STENCIL_SIZE => {
                ParameterValue::Int(self.driver.get_renderbuffer_parameter(target, pname))
            }
            _ => {
                self.set_error(GlError::InvalidEnum);
                ParameterValue::Null
            }
        }
    }

    // ==================== Draw buffers ====================

    /// `drawBuffers` / `drawBuffersWEBGL`.
    ///
    /// The default framebuffer takes a single `BACK` or `NONE`; `BACK` is
    /// its color attachment natively. A bound framebuffer takes
    /// `COLOR_ATTACHMENTi` or `NONE` at position `i`.
    pub(crate) fn draw_buffers(&mut self, buffers: &[u32], max_draw_buffers: u32) {
        if buffers.is_empty() {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        let native: Vec<u32> = if self.draw_framebuffer.is_none() {
            match buffers {
                [gl::BACK] => vec![gl::COLOR_ATTACHMENT0],
                [gl::NONE] => vec![gl::NONE],
                _ => {
                    self.set_error(GlError::InvalidOperation);
                    return;
                }
            }
        } else {
            if buffers.len() > max_draw_buffers as usize {
                self.set_error(GlError::InvalidValue);
                return;
            }
            let valid = buffers
                .iter()
                .enumerate()
                .all(|(i, &b)| b == gl::NONE || b == gl::COLOR_ATTACHMENT0 + i as u32);
            if !valid {
                self.set_error(GlError::InvalidOperation);
                return;
            }
            buffers.to_vec()
        };
        self.driver.draw_buffers(&native);
    }
}
