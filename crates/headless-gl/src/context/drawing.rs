//! Draw calls, clears and readback.

use tracing::trace;

use super::{ContextBase, WebGLVersion};
use crate::constants as gl;
use crate::draw;
use crate::driver::NativeDriver;
use crate::error::GlError;
use crate::extensions::ExtensionId;
use crate::pixels::{self, ReadPlan, Rect};

impl<D: NativeDriver> ContextBase<D> {
    // ==================== Pre-draw checks ====================

    /// Front and back stencil state must agree once a stencil call was made.
    pub(crate) fn check_stencil_state(&mut self) -> bool {
        if !self.check_stencil || self.version != WebGLVersion::WebGL1 {
            return true;
        }
        let pairs = [
            (gl::STENCIL_WRITEMASK, gl::STENCIL_BACK_WRITEMASK),
            (gl::STENCIL_VALUE_MASK, gl::STENCIL_BACK_VALUE_MASK),
            (gl::STENCIL_REF, gl::STENCIL_BACK_REF),
        ];
        for (front, back) in pairs {
            if self.driver.get_parameter(front) != self.driver.get_parameter(back) {
                self.set_error(GlError::InvalidOperation);
                return false;
            }
        }
        self.check_stencil = false;
        true
    }

    /// Every enabled attribute the program reads must have a buffer large
    /// enough to fetch vertex `max_index`.
    fn check_vertex_attribs(&mut self, max_index: usize) -> bool {
        let Some(program) = self.active_program else {
            self.set_error(GlError::InvalidOperation);
            return false;
        };
        let used = self
            .registry
            .program(program)
            .map(|p| p.attributes.clone())
            .unwrap_or_default();
        let registry = &self.registry;
        let result = draw::check_attributes(&self.vertex_state().attribs, &used, max_index, |key| {
            registry.buffer(key).map(|b| b.size)
        });
        self.report(result).is_some()
    }

    // ==================== Draws ====================

    /// `drawArrays` and its instanced forms. `instances` is `None` for the
    /// plain entry point.
    pub(crate) fn draw_arrays(&mut self, mode: u32, first: i32, count: i32, instances: Option<i32>) {
        if first < 0 || count < 0 || instances.is_some_and(|n| n < 0) {
            self.set_error(GlError::InvalidValue);
            return;
        }
        if !self.check_stencil_state() {
            return;
        }
        let Some(reduced) = self.report(draw::reduce(mode, count)) else {
            return;
        };
        if !self.framebuffer_ok(self.draw_framebuffer) {
            return;
        }
        if reduced == 0 || instances == Some(0) {
            return;
        }
        let Some(max_index) = first.checked_add(reduced - 1) else {
            self.set_error(GlError::InvalidOperation);
            return;
        };
        if !self.check_vertex_attribs(max_index as usize) {
            return;
        }
        trace!(mode, first, count = reduced, ?instances, "drawArrays");
        match instances {
            Some(instances) => self
                .driver
                .draw_arrays_instanced(mode, first, reduced, instances),
            None => self.driver.draw_arrays(mode, first, reduced),
        }
    }

    /// `drawElements` and its instanced forms.
    pub(crate) fn draw_elements(
        &mut self,
        mode: u32,
        count: i32,
        ty: u32,
        offset: i64,
        instances: Option<i32>,
    ) {
        if count < 0 || offset < 0 || instances.is_some_and(|n| n < 0) {
            self.set_error(GlError::InvalidValue);
            return;
        }
        if !self.check_stencil_state() {
            return;
        }
        let Some(element_buffer) = self.vertex_state().element_buffer else {
            self.set_error(GlError::InvalidOperation);
            return;
        };
        let uint_indices = self.is_webgl2() || self.extension_enabled(ExtensionId::OesElementIndexUint);
        if self.report(draw::index_size(ty, uint_indices)).is_none() {
            return;
        }
        let Some(reduced) = self.report(draw::reduce(mode, count)) else {
            return;
        };
        if !self.framebuffer_ok(self.draw_framebuffer) {
            return;
        }
        if count == 0 {
            self.check_vertex_attribs(0);
            return;
        }
        if instances == Some(0) {
            return;
        }

        let offset = offset as usize;
        let scan = match self.registry.buffer(element_buffer) {
            Some(buffer) => {
                draw::max_index(&buffer.elements, ty, offset, count as usize, reduced as usize)
            }
            None => Err(GlError::InvalidOperation),
        };
        let Some(max_index) = self.report(scan) else {
            return;
        };
        let max_index = max_index.map_or(0, |m| m as usize);
        if !self.check_vertex_attribs(max_index) || reduced == 0 {
            return;
        }
        trace!(mode, count = reduced, ty, offset, ?instances, "drawElements");
        match instances {
            Some(instances) => self
                .driver
                .draw_elements_instanced(mode, reduced, ty, offset, instances),
            None => self.driver.draw_elements(mode, reduced, ty, offset),
        }
    }

    pub(crate) fn clear(&mut self, mask: u32) {
        if mask & !(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT | gl::STENCIL_BUFFER_BIT) != 0 {
            self.set_error(GlError::InvalidValue);
            return;
        }
        if !self.framebuffer_ok(self.draw_framebuffer) {
            return;
        }
        self.driver.clear(mask);
    }

    // ==================== Readback ====================

    /// Read a rectangle of the read framebuffer into `pixels`.
    ///
    /// Format and type were accepted by the caller; `bytes_per_pixel`
    /// follows from them. Texels outside the framebuffer read as zero.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        bytes_per_pixel: usize,
        pixels: &mut [u8],
    ) {
        if width < 0 || height < 0 {
            self.set_error(GlError::InvalidValue);
            return;
        }
        if !self.framebuffer_ok(self.read_framebuffer) {
            return;
        }
        let (w, h) = (width as usize, height as usize);
        let stride = pixels::row_stride(w, bytes_per_pixel, self.pack_alignment);
        let size = pixels::read_size(w, h, bytes_per_pixel, self.pack_alignment);
        if size == 0 {
            return;
        }
        if pixels.len() < size {
            self.set_error(GlError::InvalidValue);
            return;
        }

        let (view_width, view_height) = match self
            .read_framebuffer
            .and_then(|key| self.registry.framebuffer(key))
        {
            Some(data) => (data.width, data.height),
            None => (self.width, self.height),
        };
        let rect = Rect {
            x,
            y,
            width,
            height,
        };
        match pixels::plan_read(rect, view_width, view_height) {
            ReadPlan::Direct => {
                self.driver
                    .read_pixels(x, y, width, height, format, ty, &mut pixels[..size]);
            }
            ReadPlan::Outside => pixels[..size].fill(0),
            ReadPlan::Clipped { source, dx, dy } => {
                pixels[..size].fill(0);
                let (sw, sh) = (source.width as usize, source.height as usize);
                let source_stride = pixels::row_stride(sw, bytes_per_pixel, self.pack_alignment);
                let mut sub = vec![0u8; source_stride * sh];
                self.driver.read_pixels(
                    source.x,
                    source.y,
                    source.width,
                    source.height,
                    format,
                    ty,
                    &mut sub,
                );
                let offset = dx * bytes_per_pixel + dy * stride;
                pixels::scatter(
                    pixels,
                    stride,
                    offset,
                    &sub,
                    source_stride,
                    sh,
                    sw * bytes_per_pixel,
                );
            }
        }
    }
}
