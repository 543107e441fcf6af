//! Object creation, deletion and binding.

use tracing::warn;

use super::ContextBase;
use crate::constants as gl;
use crate::driver::{NativeDriver, ObjectKind};
use crate::error::GlError;
use crate::objects::{
    BufferData, FramebufferData, GlObject, ObjectData, ObjectKey, ProgramData, RenderbufferData,
    ShaderData, TextureData, VertexArrayData, WebGLBuffer, WebGLFramebuffer, WebGLProgram,
    WebGLRenderbuffer, WebGLShader, WebGLTexture, WebGLVertexArrayObject,
};
use crate::state::VertexArrayState;

impl<D: NativeDriver> ContextBase<D> {
    // ==================== Creation ====================

    fn create<H: GlObject>(&mut self, handle: u32, data: ObjectData) -> Option<H> {
        if handle == 0 {
            warn!(kind = H::KIND.name(), "Driver refused to create object");
            return None;
        }
        let key = self.registry.insert(handle, data);
        Some(self.registry.wrap(key))
    }

    pub(crate) fn create_buffer(&mut self) -> Option<WebGLBuffer> {
        let handle = self.driver.create_object(ObjectKind::Buffer);
        self.create(handle, ObjectData::Buffer(BufferData::default()))
    }

    pub(crate) fn create_texture(&mut self) -> Option<WebGLTexture> {
        let handle = self.driver.create_object(ObjectKind::Texture);
        self.create(handle, ObjectData::Texture(TextureData::default()))
    }

    pub(crate) fn create_framebuffer(&mut self) -> Option<WebGLFramebuffer> {
        let handle = self.driver.create_object(ObjectKind::Framebuffer);
        self.create(handle, ObjectData::Framebuffer(FramebufferData::default()))
    }

    pub(crate) fn create_renderbuffer(&mut self) -> Option<WebGLRenderbuffer> {
        let handle = self.driver.create_object(ObjectKind::Renderbuffer);
        self.create(handle, ObjectData::Renderbuffer(RenderbufferData::default()))
    }

    pub(crate) fn create_program(&mut self) -> Option<WebGLProgram> {
        let handle = self.driver.create_object(ObjectKind::Program);
        self.create(handle, ObjectData::Program(ProgramData::default()))
    }

    pub(crate) fn create_shader(&mut self, shader_type: u32) -> Option<WebGLShader> {
        if shader_type != gl::VERTEX_SHADER && shader_type != gl::FRAGMENT_SHADER {
            self.set_error(GlError::InvalidEnum);
            return None;
        }
        let handle = self.driver.create_shader(shader_type);
        self.create(
            handle,
            ObjectData::Shader(ShaderData {
                shader_type,
                ..Default::default()
            }),
        )
    }

    pub(crate) fn create_vertex_array(&mut self) -> Option<WebGLVertexArrayObject> {
        let handle = self.driver.create_object(ObjectKind::VertexArray);
        let state = VertexArrayState::new(self.limits.vertex_attribs);
        self.create(
            handle,
            ObjectData::VertexArray(VertexArrayData {
                bound_once: false,
                state,
            }),
        )
    }

    // ==================== Deletion ====================

    /// Ownership check for delete calls. Deleting a released object is a
    /// no-op; deleting a foreign one is `INVALID_OPERATION`.
    fn deletable<H: GlObject>(&mut self, object: H) -> Option<ObjectKey> {
        match self.registry.check(object) {
            Ok(key) => Some(key),
            Err(GlError::InvalidOperation) => {
                self.set_error(GlError::InvalidOperation);
                None
            }
            Err(_) => None,
        }
    }

    fn mark_deleted(&mut self, key: ObjectKey) {
        let mut released = Vec::new();
        self.registry.mark_deleted(key, &mut released);
        self.delete_released(released);
    }

    pub(crate) fn delete_buffer(&mut self, buffer: WebGLBuffer) {
        let Some(key) = self.deletable(buffer) else {
            return;
        };
        if self.vertex_global.array_buffer == Some(key) {
            self.driver.bind_buffer(gl::ARRAY_BUFFER, 0);
            self.vertex_global.array_buffer = None;
            self.rebind(Some(key), None);
        }
        if self.vertex_state().element_buffer == Some(key) {
            self.driver.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, 0);
            self.vertex_state_mut().element_buffer = None;
            self.swap_vertex_reference(Some(key), None);
        }
        let uses = self.vertex_state_mut().release_array_buffer(key);
        for _ in 0..uses {
            self.swap_vertex_reference(Some(key), None);
        }
        self.mark_deleted(key);
    }

    pub(crate) fn delete_texture(&mut self, texture: WebGLTexture) {
        let Some(key) = self.deletable(texture) else {
            return;
        };
        let bound: Vec<(usize, u32)> = self
            .texture_units
            .iter()
            .enumerate()
            .flat_map(|(unit, bindings)| {
                bindings
                    .bound()
                    .filter(|(_, k)| *k == key)
                    .map(move |(target, _)| (unit, target))
                    .collect::<Vec<_>>()
            })
            .collect();
        for &(unit, target) in &bound {
            self.driver.active_texture(gl::TEXTURE0 + unit as u32);
            self.driver.bind_texture(target, 0);
            if let Some(slot) = self.texture_units[unit].slot_mut(target) {
                *slot = None;
            }
            self.rebind(Some(key), None);
        }
        if !bound.is_empty() {
            self.driver
                .active_texture(gl::TEXTURE0 + self.active_texture_unit as u32);
        }
        self.detach_from_framebuffers(key);
        self.mark_deleted(key);
    }

    pub(crate) fn delete_framebuffer(&mut self, framebuffer: WebGLFramebuffer) {
        let Some(key) = self.deletable(framebuffer) else {
            return;
        };
        let draw = self.draw_framebuffer == Some(key);
        let read = self.read_framebuffer == Some(key);
        match (draw, read) {
            (true, true) => self.bind_framebuffer_target(gl::FRAMEBUFFER, None),
            (true, false) => self.bind_framebuffer_target(gl::DRAW_FRAMEBUFFER, None),
            (false, true) => self.bind_framebuffer_target(gl::READ_FRAMEBUFFER, None),
            (false, false) => {}
        }
        self.mark_deleted(key);
    }

    pub(crate) fn delete_renderbuffer(&mut self, renderbuffer: WebGLRenderbuffer) {
        let Some(key) = self.deletable(renderbuffer) else {
            return;
        };
        if self.active_renderbuffer == Some(key) {
            self.driver.bind_renderbuffer(gl::RENDERBUFFER, 0);
            self.active_renderbuffer = None;
            self.rebind(Some(key), None);
        }
        self.detach_from_framebuffers(key);
        self.mark_deleted(key);
    }

    /// Programs in use and shaders attached to programs stay alive until
    /// released by those relations.
    pub(crate) fn delete_program(&mut self, program: WebGLProgram) {
        if let Some(key) = self.deletable(program) {
            self.mark_deleted(key);
        }
    }

    pub(crate) fn delete_shader(&mut self, shader: WebGLShader) {
        if let Some(key) = self.deletable(shader) {
            self.mark_deleted(key);
        }
    }

    pub(crate) fn delete_vertex_array(&mut self, array: WebGLVertexArrayObject) {
        let Some(key) = self.deletable(array) else {
            return;
        };
        if self.active_vertex_array == Some(key) {
            self.bind_vertex_array_key(None);
        }
        self.mark_deleted(key);
    }

    // ==================== Queries ====================

    /// `is*`: a live object of this context that the driver still knows.
    pub(crate) fn is_object<H: GlObject>(&mut self, object: H) -> bool {
        let Some(key) = self.registry.owns(object) else {
            return false;
        };
        let handle = self.registry.handle(Some(key));
        self.driver.is_object(H::KIND, handle)
    }

    /// `isVertexArray`: only arrays that were bound at least once count.
    pub(crate) fn is_vertex_array(&mut self, array: WebGLVertexArrayObject) -> bool {
        let bound = self
            .registry
            .owns(array)
            .and_then(|key| self.registry.vertex_array(key))
            .is_some_and(|data| data.bound_once);
        bound && self.is_object(array)
    }

    // ==================== Binding ====================

    pub(crate) fn bind_buffer(&mut self, target: u32, buffer: Option<WebGLBuffer>) {
        if target != gl::ARRAY_BUFFER && target != gl::ELEMENT_ARRAY_BUFFER {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        let key = match buffer {
            None => None,
            Some(buffer) => {
                let Some(key) = self.bindable(buffer) else {
                    return;
                };
                let Some(data) = self.registry.buffer_mut(key) else {
                    return;
                };
                if data.binding != 0 && data.binding != target {
                    self.set_error(GlError::InvalidOperation);
                    return;
                }
                data.binding = target;
                Some(key)
            }
        };
        let handle = self.registry.handle(key);
        self.driver.bind_buffer(target, handle);
        self.store_buffer_binding(target, key);
    }

    fn store_buffer_binding(&mut self, target: u32, key: Option<ObjectKey>) {
        if target == gl::ARRAY_BUFFER {
            let old = std::mem::replace(&mut self.vertex_global.array_buffer, key);
            self.rebind(old, key);
        } else {
            let old = std::mem::replace(&mut self.vertex_state_mut().element_buffer, key);
            self.swap_vertex_reference(old, key);
        }
    }

    /// Move a buffer reference held by the current vertex state. Vertex array
    /// objects hold their buffers through ownership edges so that releasing
    /// the array releases them.
    pub(crate) fn swap_vertex_reference(&mut self, old: Option<ObjectKey>, new: Option<ObjectKey>) {
        let Some(array) = self.active_vertex_array else {
            self.rebind(old, new);
            return;
        };
        if old == new {
            return;
        }
        let mut released = Vec::new();
        if let Some(new) = new {
            self.registry.link(array, new);
        }
        if let Some(old) = old {
            self.registry.unlink_one(array, old, &mut released);
        }
        self.delete_released(released);
    }

    pub(crate) fn bind_renderbuffer(&mut self, target: u32, renderbuffer: Option<WebGLRenderbuffer>) {
        if target != gl::RENDERBUFFER {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        let key = match renderbuffer {
            None => None,
            Some(renderbuffer) => {
                let Some(key) = self.bindable(renderbuffer) else {
                    return;
                };
                if let Some(data) = self.registry.renderbuffer_mut(key) {
                    data.binding = target;
                }
                Some(key)
            }
        };
        let handle = self.registry.handle(key);
        self.driver.bind_renderbuffer(target, handle);
        let old = std::mem::replace(&mut self.active_renderbuffer, key);
        self.rebind(old, key);
    }

    pub(crate) fn active_texture(&mut self, texture: u32) {
        let unit = texture.wrapping_sub(gl::TEXTURE0) as usize;
        if texture < gl::TEXTURE0 || unit >= self.texture_units.len() {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        self.driver.active_texture(texture);
        self.active_texture_unit = unit;
    }

    pub(crate) fn bind_texture(&mut self, target: u32, texture: Option<WebGLTexture>) {
        if !self.version.is_texture_target(target) {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        let key = match texture {
            None => None,
            Some(texture) => {
                let Some(key) = self.bindable(texture) else {
                    return;
                };
                let Some(data) = self.registry.texture_mut(key) else {
                    return;
                };
                if data.binding != 0 && data.binding != target {
                    self.set_error(GlError::InvalidOperation);
                    return;
                }
                data.binding = target;
                Some(key)
            }
        };
        let native = self.texture_native(key);
        if self.speculative(|d| d.bind_texture(target, native)) != gl::NO_ERROR {
            return;
        }
        let Some(slot) = self.active_unit_mut().slot_mut(target) else {
            return;
        };
        let old = std::mem::replace(slot, key);
        self.rebind(old, key);
    }

    /// Bind `framebuffer` to a validated framebuffer target, updating the
    /// draw and read bindings it covers.
    pub(crate) fn bind_framebuffer_target(
        &mut self,
        target: u32,
        framebuffer: Option<WebGLFramebuffer>,
    ) {
        let key = match framebuffer {
            None => None,
            Some(framebuffer) => match self.bindable(framebuffer) {
                Some(key) => Some(key),
                None => return,
            },
        };
        let native = self.framebuffer_native(key);
        self.driver.bind_framebuffer(target, native);
        if let Some(data) = key.and_then(|k| self.registry.framebuffer_mut(k)) {
            data.binding = target;
        }
        if matches!(target, gl::FRAMEBUFFER | gl::DRAW_FRAMEBUFFER) {
            let old = std::mem::replace(&mut self.draw_framebuffer, key);
            self.rebind(old, key);
        }
        if matches!(target, gl::FRAMEBUFFER | gl::READ_FRAMEBUFFER) {
            let old = std::mem::replace(&mut self.read_framebuffer, key);
            self.rebind(old, key);
        }
        if let Some(key) = key {
            self.update_framebuffer_attachments(key, target);
        }
    }

    pub(crate) fn bind_vertex_array(&mut self, array: Option<WebGLVertexArrayObject>) {
        let key = match array {
            None => None,
            Some(array) => {
                let Some(key) = self.bindable(array) else {
                    return;
                };
                Some(key)
            }
        };
        self.bind_vertex_array_key(key);
    }

    fn bind_vertex_array_key(&mut self, key: Option<ObjectKey>) {
        let handle = self.registry.handle(key);
        self.driver.bind_vertex_array(handle);
        if let Some(data) = key.and_then(|k| self.registry.vertex_array_mut(k)) {
            data.bound_once = true;
        }
        let old = std::mem::replace(&mut self.active_vertex_array, key);
        self.rebind(old, key);
    }

    pub(crate) fn use_program(&mut self, program: Option<WebGLProgram>) {
        let key = match program {
            None => None,
            Some(program) => {
                let Some(key) = self.bindable(program) else {
                    return;
                };
                Some(key)
            }
        };
        let handle = self.registry.handle(key);
        if self.speculative(|d| d.use_program(handle)) != gl::NO_ERROR {
            return;
        }
        let old = std::mem::replace(&mut self.active_program, key);
        self.rebind(old, key);
    }
}
