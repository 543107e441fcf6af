//! State shared by both context versions.

use tracing::{debug, warn};

use super::{DriverLimits, WebGLVersion};
use crate::attributes::ContextAttributes;
use crate::constants as gl;
use crate::driver::{NativeDriver, ObjectKind};
use crate::error::{ContextError, ErrorState, GlError, GlResult};
use crate::extensions::{self, Extension, ExtensionId, ExtensionTable};
use crate::framebuffer::{AttachmentSet, CompletenessRules};
use crate::objects::{next_context_id, GlObject, ObjectKey, ObjectRegistry, Released};
use crate::state::{GlobalVertexState, TextureUnit, VertexArrayState};

/// Native objects backing the default framebuffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DrawingBuffer {
    pub framebuffer: u32,
    pub color: u32,
    pub depth_stencil: u32,
}

/// Tracked context state and the native driver it wraps.
#[derive(Debug)]
pub struct ContextBase<D: NativeDriver> {
    pub(crate) driver: D,
    pub(crate) version: WebGLVersion,
    pub(crate) registry: ObjectRegistry,
    pub(crate) errors: ErrorState,
    pub(crate) attributes: ContextAttributes,
    pub(crate) extensions: ExtensionTable,
    pub(crate) limits: DriverLimits,

    pub(crate) texture_units: Vec<TextureUnit>,
    pub(crate) active_texture_unit: usize,
    pub(crate) vertex_global: GlobalVertexState,
    pub(crate) default_vertex_state: VertexArrayState,
    pub(crate) active_vertex_array: Option<ObjectKey>,
    pub(crate) active_program: Option<ObjectKey>,
    pub(crate) draw_framebuffer: Option<ObjectKey>,
    pub(crate) read_framebuffer: Option<ObjectKey>,
    pub(crate) active_renderbuffer: Option<ObjectKey>,

    pub(crate) pack_alignment: usize,
    pub(crate) unpack_alignment: usize,
    pub(crate) unpack_flip_y: bool,
    pub(crate) unpack_premultiply_alpha: bool,
    pub(crate) unpack_colorspace_conversion: u32,
    /// Set by every stencil call; cleared once front and back state agree.
    pub(crate) check_stencil: bool,

    pub(crate) drawing_buffer: DrawingBuffer,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) destroyed: bool,
}

impl<D: NativeDriver> ContextBase<D> {
    /// Wrap `driver` in a new context of `version`.
    pub(crate) fn new(
        mut driver: D,
        version: WebGLVersion,
        width: i32,
        height: i32,
        attributes: ContextAttributes,
    ) -> Result<Self, ContextError> {
        if width <= 0 || height <= 0 {
            return Err(ContextError::InvalidDimensions { width, height });
        }
        let attributes = attributes.normalized();
        let limits = DriverLimits::query(&mut driver, version);
        if limits.texture_units == 0 || limits.vertex_attribs == 0 {
            warn!("Driver reported no texture units or vertex attributes");
            return Err(ContextError::NativeContext(
                "driver reported no texture units or vertex attributes".to_string(),
            ));
        }

        let mut base = Self {
            driver,
            version,
            registry: ObjectRegistry::new(next_context_id()),
            errors: ErrorState::new(),
            attributes,
            extensions: ExtensionTable::default(),
            texture_units: vec![TextureUnit::default(); limits.texture_units],
            active_texture_unit: 0,
            vertex_global: GlobalVertexState::new(limits.vertex_attribs),
            default_vertex_state: VertexArrayState::new(limits.vertex_attribs),
            active_vertex_array: None,
            active_program: None,
            draw_framebuffer: None,
            read_framebuffer: None,
            active_renderbuffer: None,
            pack_alignment: 4,
            unpack_alignment: 4,
            unpack_flip_y: false,
            unpack_premultiply_alpha: false,
            unpack_colorspace_conversion: gl::BROWSER_DEFAULT_WEBGL,
            check_stencil: false,
            drawing_buffer: DrawingBuffer::default(),
            width,
            height,
            destroyed: false,
            limits,
        };
        base.allocate_drawing_buffer()?;
        base.reset_default_state();
        debug!(
            context = base.registry.context_id(),
            ?version,
            width,
            height,
            "Created rendering context"
        );
        Ok(base)
    }

    fn allocate_drawing_buffer(&mut self) -> Result<(), ContextError> {
        let framebuffer = self.driver.create_object(ObjectKind::Framebuffer);
        let color = self.driver.create_object(ObjectKind::Texture);
        let depth_stencil = self.driver.create_object(ObjectKind::Renderbuffer);
        if framebuffer == 0 || color == 0 || depth_stencil == 0 {
            warn!("Driver refused the drawing buffer objects");
            for (kind, handle) in [
                (ObjectKind::Framebuffer, framebuffer),
                (ObjectKind::Texture, color),
                (ObjectKind::Renderbuffer, depth_stencil),
            ] {
                if handle != 0 {
                    self.driver.delete_object(kind, handle);
                }
            }
            return Err(ContextError::DrawingBuffer);
        }
        self.drawing_buffer = DrawingBuffer {
            framebuffer,
            color,
            depth_stencil,
        };
        self.resize_drawing_buffer(self.width, self.height);
        Ok(())
    }

    fn reset_default_state(&mut self) {
        let (width, height) = (self.width, self.height);
        let driver = &mut self.driver;
        driver.active_texture(gl::TEXTURE0);
        driver.bind_framebuffer(gl::FRAMEBUFFER, self.drawing_buffer.framebuffer);
        driver.bind_texture(gl::TEXTURE_2D, 0);
        driver.bind_renderbuffer(gl::RENDERBUFFER, 0);
        driver.pixel_storei(gl::PACK_ALIGNMENT, 4);
        driver.pixel_storei(gl::UNPACK_ALIGNMENT, 4);
        driver.viewport(0, 0, width, height);
        driver.scissor(0, 0, width, height);
        driver.clear_depth(1.0);
        driver.clear_color(0.0, 0.0, 0.0, 0.0);
        driver.clear_stencil(0);
        driver.clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT | gl::STENCIL_BUFFER_BIT);
    }

    /// Re-provision the default framebuffer at `width` x `height`.
    ///
    /// Bindings touched on the way are restored afterwards.
    pub(crate) fn resize_drawing_buffer(&mut self, width: i32, height: i32) {
        let DrawingBuffer {
            framebuffer,
            color,
            depth_stencil,
        } = self.drawing_buffer;
        let attributes = self.attributes;

        let driver = &mut self.driver;
        driver.bind_framebuffer(gl::FRAMEBUFFER, framebuffer);
        for attachment in [
            gl::COLOR_ATTACHMENT0,
            gl::DEPTH_ATTACHMENT,
            gl::STENCIL_ATTACHMENT,
            gl::DEPTH_STENCIL_ATTACHMENT,
        ] {
            driver.framebuffer_texture_2d(gl::FRAMEBUFFER, attachment, gl::TEXTURE_2D, 0, 0);
        }

        let format = if attributes.alpha { gl::RGBA } else { gl::RGB };
        driver.bind_texture(gl::TEXTURE_2D, color);
        driver.tex_image_2d(
            gl::TEXTURE_2D,
            0,
            format,
            width,
            height,
            0,
            format,
            gl::UNSIGNED_BYTE,
            None,
        );
        driver.tex_parameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::NEAREST as i32);
        driver.tex_parameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::NEAREST as i32);
        driver.framebuffer_texture_2d(
            gl::FRAMEBUFFER,
            gl::COLOR_ATTACHMENT0,
            gl::TEXTURE_2D,
            color,
            0,
        );

        let storage = match (attributes.depth, attributes.stencil) {
            (true, true) => Some((gl::DEPTH_STENCIL, gl::DEPTH_STENCIL_ATTACHMENT)),
            (true, false) => Some((gl::DEPTH_COMPONENT24, gl::DEPTH_ATTACHMENT)),
            (false, true) => Some((gl::STENCIL_INDEX8, gl::STENCIL_ATTACHMENT)),
            (false, false) => None,
        };
        if let Some((format, attachment)) = storage {
            driver.bind_renderbuffer(gl::RENDERBUFFER, depth_stencil);
            driver.renderbuffer_storage(gl::RENDERBUFFER, format, width, height);
            driver.framebuffer_renderbuffer(
                gl::FRAMEBUFFER,
                attachment,
                gl::RENDERBUFFER,
                depth_stencil,
            );
        }

        self.restore_framebuffer_bindings();
        let texture = self.texture_units[self.active_texture_unit].bind_2d;
        let texture = self.texture_native(texture);
        self.driver.bind_texture(gl::TEXTURE_2D, texture);
        let renderbuffer = self.registry.handle(self.active_renderbuffer);
        self.driver.bind_renderbuffer(gl::RENDERBUFFER, renderbuffer);
    }

    /// Re-issue the tracked framebuffer bindings to the driver.
    pub(crate) fn restore_framebuffer_bindings(&mut self) {
        let draw = self.framebuffer_native(self.draw_framebuffer);
        self.driver.bind_framebuffer(gl::FRAMEBUFFER, draw);
        if self.read_framebuffer != self.draw_framebuffer {
            let read = self.framebuffer_native(self.read_framebuffer);
            self.driver.bind_framebuffer(gl::READ_FRAMEBUFFER, read);
        }
    }

    /// `resize`: reallocate the drawing buffer.
    pub(crate) fn resize(&mut self, width: i32, height: i32) -> Result<(), ContextError> {
        if width <= 0 || height <= 0 {
            return Err(ContextError::InvalidDimensions { width, height });
        }
        if width != self.width || height != self.height {
            debug!(width, height, "Resizing drawing buffer");
            self.resize_drawing_buffer(width, height);
            self.width = width;
            self.height = height;
        }
        Ok(())
    }

    /// `destroy`: release the native context. Later calls are ignored.
    pub(crate) fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        debug!(context = self.registry.context_id(), "Destroying rendering context");
        self.registry.clear();
        self.extensions.clear();
        self.errors.clear();
        self.texture_units.fill(TextureUnit::default());
        self.active_vertex_array = None;
        self.active_program = None;
        self.draw_framebuffer = None;
        self.read_framebuffer = None;
        self.active_renderbuffer = None;
        self.vertex_global = GlobalVertexState::new(self.limits.vertex_attribs);
        self.default_vertex_state = VertexArrayState::new(self.limits.vertex_attribs);
        self.driver.destroy();
        self.destroyed = true;
    }

    // ==================== Errors ====================

    pub(crate) fn set_error(&mut self, error: GlError) {
        self.errors.set(error);
    }

    /// Record the error of a failed validation step.
    pub(crate) fn report<T>(&mut self, result: GlResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.set_error(error);
                None
            }
        }
    }

    /// `getError`: the lowest pending error, then the driver's.
    pub(crate) fn get_error(&mut self) -> u32 {
        match self.errors.take() {
            Some(code) => code,
            None => self.driver.get_error(),
        }
    }

    /// Move the lowest pending error onto the save stack.
    pub(crate) fn save_error(&mut self) {
        let native = self.driver.get_error();
        self.errors.record(native);
        let saved = self.errors.take().unwrap_or(gl::NO_ERROR);
        self.errors.push_saved(saved);
    }

    pub(crate) fn restore_error(&mut self, latest: u32) {
        self.errors.restore(latest);
    }

    /// Run a native call whose failure must not be confused with earlier
    /// errors. Returns the error the call produced.
    pub(crate) fn speculative(&mut self, call: impl FnOnce(&mut D)) -> u32 {
        self.save_error();
        call(&mut self.driver);
        let error = self.driver.get_error();
        self.restore_error(error);
        error
    }

    // ==================== Objects ====================

    /// Delete the native handles of released objects.
    pub(crate) fn delete_released(&mut self, released: Vec<Released>) {
        for object in released {
            self.driver.delete_object(object.kind, object.handle);
        }
    }

    /// Ownership check that records its failure.
    pub(crate) fn checked<H: GlObject>(&mut self, object: H) -> Option<ObjectKey> {
        let result = self.registry.check(object);
        self.report(result)
    }

    /// Ownership check for bind calls. Objects awaiting deletion are skipped
    /// without an error.
    pub(crate) fn bindable<H: GlObject>(&mut self, object: H) -> Option<ObjectKey> {
        let key = self.checked(object)?;
        (!self.registry.is_pending_delete(key)).then_some(key)
    }

    /// Swap a counted binding from `old` to `new`.
    pub(crate) fn rebind(&mut self, old: Option<ObjectKey>, new: Option<ObjectKey>) {
        let mut released = Vec::new();
        self.registry.replace(old, new, &mut released);
        self.delete_released(released);
    }

    // ==================== Accessors ====================

    pub(crate) fn active_unit(&self) -> &TextureUnit {
        &self.texture_units[self.active_texture_unit]
    }

    pub(crate) fn active_unit_mut(&mut self) -> &mut TextureUnit {
        &mut self.texture_units[self.active_texture_unit]
    }

    /// Vertex state of the bound vertex array, or the default one.
    pub(crate) fn vertex_state(&self) -> &VertexArrayState {
        match self
            .active_vertex_array
            .and_then(|key| self.registry.vertex_array(key))
        {
            Some(array) => &array.state,
            None => &self.default_vertex_state,
        }
    }

    pub(crate) fn vertex_state_mut(&mut self) -> &mut VertexArrayState {
        match self
            .active_vertex_array
            .and_then(|key| self.registry.vertex_array_mut(key))
        {
            Some(array) => &mut array.state,
            None => &mut self.default_vertex_state,
        }
    }

    /// Native name to bind for a texture. Incomplete textures bind as `0`.
    pub(crate) fn texture_native(&self, key: Option<ObjectKey>) -> u32 {
        match key.and_then(|k| self.registry.texture(k).map(|t| (k, t.complete))) {
            Some((k, true)) => self.registry.handle(Some(k)),
            _ => 0,
        }
    }

    /// Native name of a framebuffer binding; `None` is the drawing buffer.
    pub(crate) fn framebuffer_native(&self, key: Option<ObjectKey>) -> u32 {
        match key {
            Some(_) => self.registry.handle(key),
            None => self.drawing_buffer.framebuffer,
        }
    }

    /// Attachment points accepted by attachment calls.
    pub(crate) fn attachment_set(&self) -> AttachmentSet {
        match self.version {
            WebGLVersion::WebGL2 => AttachmentSet::with_color_attachments(self.limits.max_draw_buffers),
            WebGLVersion::WebGL1 => match self.extensions.draw_buffers() {
                Some(ext) => AttachmentSet::with_color_attachments(ext.max_draw_buffers),
                None => AttachmentSet::default(),
            },
        }
    }

    pub(crate) fn completeness_rules(&self) -> CompletenessRules {
        match self.version {
            WebGLVersion::WebGL1 => CompletenessRules::WebGL1,
            WebGLVersion::WebGL2 => CompletenessRules::WebGL2 {
                color_buffer_float: self.extensions.is_enabled(ExtensionId::ExtColorBufferFloat),
            },
        }
    }

    /// Whether WebGL 2 only enums are accepted.
    pub(crate) fn is_webgl2(&self) -> bool {
        self.version == WebGLVersion::WebGL2
    }

    pub(crate) fn extension_enabled(&self, id: ExtensionId) -> bool {
        self.extensions.is_enabled(id)
    }

    /// Gate for extension entry points.
    pub(crate) fn require_extension(&mut self, id: ExtensionId) -> bool {
        if self.extensions.is_enabled(id) {
            true
        } else {
            self.set_error(GlError::InvalidOperation);
            false
        }
    }

    // ==================== Extensions ====================

    /// `getExtension`: resolve and memoize a capability object.
    pub(crate) fn get_extension(&mut self, name: &str) -> Option<Extension> {
        let id = ExtensionId::from_name(name)?;
        if let Some(extension) = self.extensions.get(id) {
            return Some(extension.clone());
        }
        let native = self.driver.supported_extensions();
        if !id.is_available(self.version, &native) {
            return None;
        }
        if let Some(native_name) = id.native_name() {
            self.driver.request_extension(native_name);
        }
        debug!(extension = id.name(), "Resolved extension");
        let extension = Extension::new(id, self.limits.max_draw_buffers);
        Some(self.extensions.insert(extension).clone())
    }

    /// `getSupportedExtensions`.
    pub(crate) fn get_supported_extensions(&mut self) -> Vec<String> {
        let native = self.driver.supported_extensions();
        extensions::supported_extensions(self.version, &native)
            .into_iter()
            .map(|id| id.name().to_string())
            .collect()
    }
}
