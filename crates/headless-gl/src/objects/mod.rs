//! Object registry and lifecycle.
//!
//! Every handle-backed object lives in a generation-checked arena owned by its
//! context. Host code holds small `Copy` handles ([`WebGLBuffer`],
//! [`WebGLTexture`], ...) that name the owning context and the arena slot. A
//! released object leaves its slot, so a surviving handle becomes a zeroed
//! sentinel that fails every ownership check with `INVALID_VALUE`.
//!
//! Lifetime is deterministic reference counting. Bindings call
//! [`ObjectRegistry::retain`] / [`ObjectRegistry::release`]; ownership edges
//! (framebuffer to attachment, program to shader, vertex array to buffer) use
//! [`ObjectRegistry::link`] / [`ObjectRegistry::unlink`]. An object reaches the
//! driver's delete only once it is pending delete and unreferenced.

mod data;

pub use data::{
    AttachedObject, Attachment, BufferData, FramebufferData, LevelInfo, ObjectData, ProgramData,
    RenderbufferData, ShaderData, TextureData, VertexArrayData, MAX_TEXTURE_LEVELS,
};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use slotmap::SlotMap;
use tracing::debug;

use crate::driver::ObjectKind;
use crate::error::{GlError, GlResult};

slotmap::new_key_type! {
    /// Arena slot of a registry object.
    pub struct ObjectKey;
}

static NEXT_CONTEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Allocate a process-unique context id.
pub(crate) fn next_context_id() -> u32 {
    NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Owning context plus arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub(crate) context: u32,
    pub(crate) key: ObjectKey,
}

/// A typed host-side handle.
pub trait GlObject: Copy {
    const KIND: ObjectKind;

    fn id(self) -> ObjectId;
    fn from_id(id: ObjectId) -> Self;
}

macro_rules! gl_object {
    ($($(#[$meta:meta])* $name:ident => $kind:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(ObjectId);

            impl GlObject for $name {
                const KIND: ObjectKind = ObjectKind::$kind;

                fn id(self) -> ObjectId {
                    self.0
                }

                fn from_id(id: ObjectId) -> Self {
                    Self(id)
                }
            }
        )*
    };
}

gl_object! {
    /// A buffer object.
    WebGLBuffer => Buffer;
    /// A texture object.
    WebGLTexture => Texture;
    /// A framebuffer object.
    WebGLFramebuffer => Framebuffer;
    /// A renderbuffer object.
    WebGLRenderbuffer => Renderbuffer;
    /// A program object.
    WebGLProgram => Program;
    /// A shader object.
    WebGLShader => Shader;
    /// A vertex array object.
    WebGLVertexArrayObject => VertexArray;
}

/// A live registry object.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    /// Native driver name.
    pub handle: u32,
    pub ref_count: i32,
    pub pending_delete: bool,
    /// Outgoing ownership edges. An object appears once per link.
    pub references: Vec<ObjectKey>,
    /// Creation order within the context, for diagnostics.
    pub serial: u64,
    pub data: ObjectData,
}

/// An object whose native handle must now be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Released {
    pub key: ObjectKey,
    pub kind: ObjectKind,
    pub handle: u32,
}

/// Arena of the objects owned by one context.
#[derive(Debug)]
pub struct ObjectRegistry {
    context: u32,
    objects: SlotMap<ObjectKey, ObjectEntry>,
    handles: HashMap<(ObjectKind, u32), ObjectKey>,
    next_serial: u64,
}

macro_rules! typed_access {
    ($($get:ident, $get_mut:ident => $variant:ident($ty:ty);)*) => {
        $(
            pub fn $get(&self, key: ObjectKey) -> Option<&$ty> {
                match self.objects.get(key).map(|e| &e.data) {
                    Some(ObjectData::$variant(data)) => Some(data),
                    _ => None,
                }
            }

            pub fn $get_mut(&mut self, key: ObjectKey) -> Option<&mut $ty> {
                match self.objects.get_mut(key).map(|e| &mut e.data) {
                    Some(ObjectData::$variant(data)) => Some(data),
                    _ => None,
                }
            }
        )*
    };
}

impl ObjectRegistry {
    pub fn new(context: u32) -> Self {
        Self {
            context,
            objects: SlotMap::with_key(),
            handles: HashMap::new(),
            next_serial: 1,
        }
    }

    /// Id of the owning context.
    pub fn context_id(&self) -> u32 {
        self.context
    }

    /// Register a freshly created native object.
    pub fn insert(&mut self, handle: u32, data: ObjectData) -> ObjectKey {
        let kind = data.kind();
        let serial = self.next_serial;
        self.next_serial += 1;
        let key = self.objects.insert(ObjectEntry {
            handle,
            ref_count: 0,
            pending_delete: false,
            references: Vec::new(),
            serial,
            data,
        });
        self.handles.insert((kind, handle), key);
        debug!(kind = kind.name(), handle, serial, "Registered object");
        key
    }

    /// Registered object for a native handle.
    pub fn lookup(&self, kind: ObjectKind, handle: u32) -> Option<ObjectKey> {
        self.handles.get(&(kind, handle)).copied()
    }

    pub fn get(&self, key: ObjectKey) -> Option<&ObjectEntry> {
        self.objects.get(key)
    }

    pub fn get_mut(&mut self, key: ObjectKey) -> Option<&mut ObjectEntry> {
        self.objects.get_mut(key)
    }

    pub fn contains(&self, key: ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    /// Native handle of a live object, `0` for released ones.
    pub fn handle(&self, key: Option<ObjectKey>) -> u32 {
        key.and_then(|k| self.objects.get(k)).map_or(0, |e| e.handle)
    }

    pub fn is_pending_delete(&self, key: ObjectKey) -> bool {
        self.objects.get(key).is_some_and(|e| e.pending_delete)
    }

    /// Number of live objects of `kind`.
    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.objects.values().filter(|e| e.data.kind() == kind).count()
    }

    typed_access! {
        buffer, buffer_mut => Buffer(BufferData);
        texture, texture_mut => Texture(TextureData);
        framebuffer, framebuffer_mut => Framebuffer(FramebufferData);
        renderbuffer, renderbuffer_mut => Renderbuffer(RenderbufferData);
        program, program_mut => Program(ProgramData);
        shader, shader_mut => Shader(ShaderData);
        vertex_array, vertex_array_mut => VertexArray(VertexArrayData);
    }

    /// Handle for an arena key of this context.
    pub fn wrap<H: GlObject>(&self, key: ObjectKey) -> H {
        H::from_id(ObjectId {
            context: self.context,
            key,
        })
    }

    /// Optional handle for an optional key.
    pub fn wrap_opt<H: GlObject>(&self, key: Option<ObjectKey>) -> Option<H> {
        key.filter(|k| self.objects.contains_key(*k)).map(|k| self.wrap(k))
    }

    // ==================== Ownership ====================

    /// Validate that `object` is a live object of this context.
    ///
    /// A foreign object is `INVALID_OPERATION`; a released one is
    /// `INVALID_VALUE`.
    pub fn check<H: GlObject>(&self, object: H) -> GlResult<ObjectKey> {
        let id = object.id();
        if id.context != self.context {
            return Err(GlError::InvalidOperation);
        }
        match self.objects.get(id.key) {
            Some(entry) if entry.handle != 0 && entry.data.kind() == H::KIND => Ok(id.key),
            _ => Err(GlError::InvalidValue),
        }
    }

    /// Like [`ObjectRegistry::check`] but without an error.
    pub fn owns<H: GlObject>(&self, object: H) -> Option<ObjectKey> {
        self.check(object).ok()
    }

    // ==================== Reference counting ====================

    pub fn retain(&mut self, key: ObjectKey) {
        if let Some(entry) = self.objects.get_mut(key) {
            entry.ref_count += 1;
        }
    }

    /// Drop one reference and run the deletion check.
    pub fn release(&mut self, key: ObjectKey, released: &mut Vec<Released>) {
        if let Some(entry) = self.objects.get_mut(key) {
            entry.ref_count -= 1;
        }
        self.check_delete(key, released);
    }

    /// Swap a counted reference from `old` to `new`.
    pub fn replace(
        &mut self,
        old: Option<ObjectKey>,
        new: Option<ObjectKey>,
        released: &mut Vec<Released>,
    ) {
        if old == new {
            return;
        }
        if let Some(new) = new {
            self.retain(new);
        }
        if let Some(old) = old {
            self.release(old, released);
        }
    }

    /// Add an ownership edge `from -> to`.
    pub fn link(&mut self, from: ObjectKey, to: ObjectKey) {
        if let Some(entry) = self.objects.get_mut(from) {
            entry.references.push(to);
            self.retain(to);
        }
    }

    /// Remove every `from -> to` edge, releasing `to` once per edge.
    pub fn unlink(&mut self, from: ObjectKey, to: ObjectKey, released: &mut Vec<Released>) {
        let removed = match self.objects.get_mut(from) {
            Some(entry) => {
                let before = entry.references.len();
                entry.references.retain(|k| *k != to);
                before - entry.references.len()
            }
            None => 0,
        };
        for _ in 0..removed {
            self.release(to, released);
        }
    }

    /// Remove a single `from -> to` edge.
    pub fn unlink_one(&mut self, from: ObjectKey, to: ObjectKey, released: &mut Vec<Released>) {
        let removed = self.objects.get_mut(from).is_some_and(|entry| {
            match entry.references.iter().position(|k| *k == to) {
                Some(index) => {
                    entry.references.remove(index);
                    true
                }
                None => false,
            }
        });
        if removed {
            self.release(to, released);
        }
    }

    pub fn is_linked(&self, from: ObjectKey, to: ObjectKey) -> bool {
        self.objects
            .get(from)
            .is_some_and(|e| e.references.contains(&to))
    }

    /// Flag an object for deletion and run the deletion check.
    pub fn mark_deleted(&mut self, key: ObjectKey, released: &mut Vec<Released>) {
        if let Some(entry) = self.objects.get_mut(key) {
            entry.pending_delete = true;
        }
        self.check_delete(key, released);
    }

    /// Release `key` if it is pending delete and unreferenced.
    ///
    /// Linked objects are unlinked first, so a cascade lists children before
    /// their owner.
    pub fn check_delete(&mut self, key: ObjectKey, released: &mut Vec<Released>) {
        let ready = self
            .objects
            .get(key)
            .is_some_and(|e| e.ref_count <= 0 && e.pending_delete && e.handle != 0);
        if !ready {
            return;
        }
        let Some(entry) = self.objects.remove(key) else {
            return;
        };
        for child in entry.references {
            self.release(child, released);
        }
        let kind = entry.data.kind();
        self.handles.remove(&(kind, entry.handle));
        debug!(kind = kind.name(), handle = entry.handle, "Releasing object");
        released.push(Released {
            key,
            kind,
            handle: entry.handle,
        });
    }

    /// Forget every object. Used when the native context goes away.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.handles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ObjectRegistry {
        ObjectRegistry::new(next_context_id())
    }

    #[test]
    fn test_insert_and_wrap() {
        let mut reg = registry();
        let key = reg.insert(7, ObjectData::Buffer(BufferData::default()));
        let buffer: WebGLBuffer = reg.wrap(key);
        assert_eq!(reg.check(buffer), Ok(key));
        assert_eq!(reg.handle(Some(key)), 7);
        assert_eq!(reg.lookup(ObjectKind::Buffer, 7), Some(key));
    }

    #[test]
    fn test_foreign_object_is_invalid_operation() {
        let mut a = registry();
        let b = registry();
        let key = a.insert(1, ObjectData::Texture(TextureData::default()));
        let texture: WebGLTexture = a.wrap(key);
        assert_eq!(b.check(texture), Err(GlError::InvalidOperation));
    }

    #[test]
    fn test_deferred_delete_while_referenced() {
        let mut reg = registry();
        let key = reg.insert(3, ObjectData::Buffer(BufferData::default()));
        let mut released = Vec::new();

        reg.retain(key);
        reg.mark_deleted(key, &mut released);
        assert!(released.is_empty());
        assert!(reg.contains(key));

        reg.release(key, &mut released);
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].handle, 3);

        let buffer: WebGLBuffer = reg.wrap(key);
        assert_eq!(reg.check(buffer), Err(GlError::InvalidValue));
    }

    #[test]
    fn test_cascade_releases_children_first() {
        let mut reg = registry();
        let fb = reg.insert(1, ObjectData::Framebuffer(FramebufferData::default()));
        let tex = reg.insert(2, ObjectData::Texture(TextureData::default()));
        let mut released = Vec::new();

        reg.link(fb, tex);
        reg.mark_deleted(tex, &mut released);
        assert!(released.is_empty());

        reg.mark_deleted(fb, &mut released);
        let handles: Vec<u32> = released.iter().map(|r| r.handle).collect();
        assert_eq!(handles, vec![2, 1]);
    }

    #[test]
    fn test_unlink_removes_every_edge() {
        let mut reg = registry();
        let program = reg.insert(1, ObjectData::Program(ProgramData::default()));
        let shader = reg.insert(2, ObjectData::Shader(ShaderData::default()));
        let mut released = Vec::new();

        reg.link(program, shader);
        reg.link(program, shader);
        assert_eq!(reg.get(shader).unwrap().ref_count, 2);

        reg.unlink(program, shader, &mut released);
        assert_eq!(reg.get(shader).unwrap().ref_count, 0);
        assert!(!reg.is_linked(program, shader));
        assert!(released.is_empty());
    }

    #[test]
    fn test_replace_same_is_noop() {
        let mut reg = registry();
        let key = reg.insert(1, ObjectData::Renderbuffer(RenderbufferData::default()));
        let mut released = Vec::new();
        reg.replace(None, Some(key), &mut released);
        reg.replace(Some(key), Some(key), &mut released);
        assert_eq!(reg.get(key).unwrap().ref_count, 1);
    }
}
