//! Buffer storage and vertex attribute state.

use super::ContextBase;
use crate::constants as gl;
use crate::driver::NativeDriver;
use crate::error::GlError;
use crate::extensions::ExtensionId;
use crate::formats;
use crate::objects::{ObjectKey, WebGLBuffer};
use crate::state::AttribPointer;
use crate::value::ParameterValue;

impl<D: NativeDriver> ContextBase<D> {
    // ==================== Buffers ====================

    fn is_buffer_usage(&self, usage: u32) -> bool {
        match usage {
            gl::STREAM_DRAW | gl::STATIC_DRAW | gl::DYNAMIC_DRAW => true,
            gl::STREAM_READ
            | gl::STREAM_COPY
            | gl::STATIC_READ
            | gl::STATIC_COPY
            | gl::DYNAMIC_READ
            | gl::DYNAMIC_COPY => self.is_webgl2(),
            _ => false,
        }
    }

    /// Buffer bound at a validated buffer target.
    pub(crate) fn active_buffer(&self, target: u32) -> Option<ObjectKey> {
        match target {
            gl::ARRAY_BUFFER => self.vertex_global.array_buffer,
            _ => self.vertex_state().element_buffer,
        }
    }

    /// `bufferData` with either contents or a byte size.
    pub(crate) fn buffer_data(&mut self, target: u32, size: i64, data: Option<&[u8]>, usage: u32) {
        if !self.is_buffer_usage(usage) {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        if target != gl::ARRAY_BUFFER && target != gl::ELEMENT_ARRAY_BUFFER {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        let Some(key) = self.active_buffer(target) else {
            self.set_error(GlError::InvalidOperation);
            return;
        };
        let Ok(size) = usize::try_from(size) else {
            self.set_error(GlError::InvalidValue);
            return;
        };
        if self.speculative(|d| d.buffer_data(target, size, data, usage)) != gl::NO_ERROR {
            return;
        }
        if let Some(buffer) = self.registry.buffer_mut(key) {
            buffer.size = size;
            buffer.usage = usage;
            if target == gl::ELEMENT_ARRAY_BUFFER {
                buffer.elements = match data {
                    Some(bytes) => bytes.to_vec(),
                    None => vec![0; size],
                };
            }
        }
    }

    pub(crate) fn buffer_sub_data(&mut self, target: u32, offset: i64, data: &[u8]) {
        if target != gl::ARRAY_BUFFER && target != gl::ELEMENT_ARRAY_BUFFER {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        let Some(key) = self.active_buffer(target) else {
            self.set_error(GlError::InvalidOperation);
            return;
        };
        let size = self.registry.buffer(key).map_or(0, |b| b.size);
        let Ok(offset) = usize::try_from(offset) else {
            self.set_error(GlError::InvalidValue);
            return;
        };
        if offset > size || data.len() > size - offset {
            self.set_error(GlError::InvalidValue);
            return;
        }
        if target == gl::ELEMENT_ARRAY_BUFFER {
            if let Some(slot) = self
                .registry
                .buffer_mut(key)
                .and_then(|b| b.elements.get_mut(offset..offset + data.len()))
            {
                slot.copy_from_slice(data);
            }
        }
        self.driver.buffer_sub_data(target, offset, data);
    }

    pub(crate) fn get_buffer_parameter(&mut self, target: u32, pname: u32) -> ParameterValue {
        if target != gl::ARRAY_BUFFER && target != gl::ELEMENT_ARRAY_BUFFER {
            self.set_error(GlError::InvalidEnum);
            return ParameterValue::Null;
        }
        let Some((size, usage)) = self
            .active_buffer(target)
            .and_then(|key| self.registry.buffer(key))
            .map(|b| (b.size, b.usage))
        else {
            self.set_error(GlError::InvalidOperation);
            return ParameterValue::Null;
        };
        match pname {
            gl::BUFFER_SIZE => ParameterValue::Int(size as i32),
            gl::BUFFER_USAGE => ParameterValue::Int(usage as i32),
            _ => {
                self.set_error(GlError::InvalidEnum);
                ParameterValue::Null
            }
        }
    }

    // ==================== Attribute pointers ====================

    fn attrib_index(&mut self, index: u32) -> Option<usize> {
        let index = index as usize;
        if index >= self.limits.vertex_attribs {
            self.set_error(GlError::InvalidValue);
            return None;
        }
        Some(index)
    }

    fn is_pointer_type(&self, ty: u32, integer: bool) -> bool {
        match ty {
            gl::BYTE | gl::UNSIGNED_BYTE | gl::SHORT | gl::UNSIGNED_SHORT => true,
            gl::FLOAT => !integer,
            gl::INT | gl::UNSIGNED_INT => self.is_webgl2(),
            gl::HALF_FLOAT => self.is_webgl2() && !integer,
            _ => false,
        }
    }

    /// `vertexAttribPointer` and `vertexAttribIPointer`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i64,
        integer: bool,
    ) {
        if stride < 0 || offset < 0 {
            self.set_error(GlError::InvalidValue);
            return;
        }
        let Some(slot) = self.attrib_index(index) else {
            return;
        };
        if !(1..=4).contains(&size) {
            self.set_error(GlError::InvalidValue);
            return;
        }
        let Some(buffer) = self.vertex_global.array_buffer else {
            self.set_error(GlError::InvalidOperation);
            return;
        };
        let type_size = formats::type_size(ty);
        if type_size == 0 || !self.is_pointer_type(ty, integer) {
            self.set_error(GlError::InvalidEnum);
            return;
        }
        if stride > 255 {
            self.set_error(GlError::InvalidValue);
            return;
        }
        let offset = offset as usize;
        if stride as usize % type_size != 0 || offset % type_size != 0 {
            self.set_error(GlError::InvalidOperation);
            return;
        }

        if integer {
            self.driver
                .vertex_attrib_i_pointer(index, size, ty, stride, offset);
        } else {
            self.driver
                .vertex_attrib_pointer(index, size, ty, normalized, stride, offset);
        }
        let previous = self.vertex_state_mut().set_pointer(
            slot,
            AttribPointer {
                buffer,
                size,
                byte_size: size as usize * type_size,
                ty,
                normalized: normalized && !integer,
                stride,
                offset,
                integer,
            },
        );
        self.swap_vertex_reference(previous, Some(buffer));
    }

    pub(crate) fn set_vertex_attrib_array(&mut self, index: u32, enabled: bool) {
        let Some(slot) = self.attrib_index(index) else {
            return;
        };
        if enabled {
            self.driver.enable_vertex_attrib_array(index);
        } else {
            self.driver.disable_vertex_attrib_array(index);
        }
        self.vertex_state_mut().attribs[slot].enabled = enabled;
    }

    pub(crate) fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        let Some(slot) = self.attrib_index(index) else {
            return;
        };
        self.driver.vertex_attrib_divisor(index, divisor);
        self.vertex_state_mut().attribs[slot].divisor = divisor;
    }

    // ==================== Generic values ====================

    /// `vertexAttrib{N}f[v]`: missing components default to `(0, 0, 0, 1)`.
    pub(crate) fn vertex_attrib(&mut self, index: u32, components: usize, values: &[f32]) {
        if values.len() < components {
            self.set_error(GlError::InvalidValue);
            return;
        }
        let Some(slot) = self.attrib_index(index) else {
            return;
        };
        let mut value = [0.0, 0.0, 0.0, 1.0];
        value[..components].copy_from_slice(&values[..components]);
        self.driver.vertex_attrib_4f(index, value);
        self.vertex_global.values[slot] = value;
    }

    pub(crate) fn get_vertex_attrib(&mut self, index: u32, pname: u32) -> ParameterValue {
        let Some(slot) = self.attrib_index(index) else {
            return ParameterValue::Null;
        };
        if pname == gl::CURRENT_VERTEX_ATTRIB {
            return ParameterValue::Float32Array(self.vertex_global.values[slot].to_vec());
        }
        let attrib = self.vertex_state().attribs[slot];
        let divisor_visible =
            self.is_webgl2() || self.extension_enabled(ExtensionId::AngleInstancedArrays);
        match pname {
            gl::VERTEX_ATTRIB_ARRAY_BUFFER_BINDING => {
                self.registry.wrap_opt::<WebGLBuffer>(attrib.buffer).into()
            }
            gl::VERTEX_ATTRIB_ARRAY_ENABLED => ParameterValue::Bool(attrib.enabled),
            gl::VERTEX_ATTRIB_ARRAY_SIZE => ParameterValue::Int(attrib.input_size),
            gl::VERTEX_ATTRIB_ARRAY_STRIDE => ParameterValue::Int(attrib.input_stride),
            gl::VERTEX_ATTRIB_ARRAY_TYPE => ParameterValue::Int(attrib.ty as i32),
            gl::VERTEX_ATTRIB_ARRAY_NORMALIZED => ParameterValue::Bool(attrib.normalized),
            gl::VERTEX_ATTRIB_ARRAY_DIVISOR if divisor_visible => {
                ParameterValue::Int(attrib.divisor as i32)
            }
            gl::VERTEX_ATTRIB_ARRAY_INTEGER if self.is_webgl2() => ParameterValue::Bool(attrib.integer),
            _ => {
                self.set_error(GlError::InvalidEnum);
                ParameterValue::Null
            }
        }
    }

    pub(crate) fn get_vertex_attrib_offset(&mut self, index: u32, pname: u32) -> usize {
        if pname != gl::VERTEX_ATTRIB_ARRAY_POINTER {
            self.set_error(GlError::InvalidEnum);
            return 0;
        }
        match self.attrib_index(index) {
            Some(slot) => self.vertex_state().attribs[slot].offset,
            None => 0,
        }
    }
}
