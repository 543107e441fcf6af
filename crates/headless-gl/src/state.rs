//! Texture unit and vertex attribute state.

use crate::constants as gl;
use crate::objects::ObjectKey;

/// Bindings of one texture unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureUnit {
    /// Capability enabled through legacy `enable(TEXTURE_2D)`.
    pub mode: u32,
    pub bind_2d: Option<ObjectKey>,
    pub bind_cube: Option<ObjectKey>,
    pub bind_3d: Option<ObjectKey>,
    pub bind_2d_array: Option<ObjectKey>,
}

impl TextureUnit {
    /// Binding slot for a bind target.
    pub fn binding(&self, target: u32) -> Option<ObjectKey> {
        match target {
            gl::TEXTURE_2D => self.bind_2d,
            gl::TEXTURE_CUBE_MAP => self.bind_cube,
            gl::TEXTURE_3D => self.bind_3d,
            gl::TEXTURE_2D_ARRAY => self.bind_2d_array,
            _ => None,
        }
    }

    pub fn slot_mut(&mut self, target: u32) -> Option<&mut Option<ObjectKey>> {
        match target {
            gl::TEXTURE_2D => Some(&mut self.bind_2d),
            gl::TEXTURE_CUBE_MAP => Some(&mut self.bind_cube),
            gl::TEXTURE_3D => Some(&mut self.bind_3d),
            gl::TEXTURE_2D_ARRAY => Some(&mut self.bind_2d_array),
            _ => None,
        }
    }

    pub fn bound(&self) -> impl Iterator<Item = (u32, ObjectKey)> + '_ {
        [
            (gl::TEXTURE_2D, self.bind_2d),
            (gl::TEXTURE_CUBE_MAP, self.bind_cube),
            (gl::TEXTURE_3D, self.bind_3d),
            (gl::TEXTURE_2D_ARRAY, self.bind_2d_array),
        ]
        .into_iter()
        .filter_map(|(target, key)| key.map(|k| (target, k)))
    }
}

/// One vertex attribute slot of a vertex array.
#[derive(Debug, Clone, Copy)]
pub struct VertexAttribute {
    /// Array mode enabled by `enableVertexAttribArray`.
    pub enabled: bool,
    pub buffer: Option<ObjectKey>,
    pub offset: usize,
    /// Bytes per element (`components * component size`).
    pub size: usize,
    /// Effective stride; tightly packed when the request was `0`.
    pub stride: usize,
    pub ty: u32,
    pub normalized: bool,
    pub integer: bool,
    pub divisor: u32,
    /// Requested component count.
    pub input_size: i32,
    /// Requested stride.
    pub input_stride: i32,
}

impl Default for VertexAttribute {
    fn default() -> Self {
        Self {
            enabled: false,
            buffer: None,
            offset: 0,
            size: 0,
            stride: 0,
            ty: gl::FLOAT,
            normalized: false,
            integer: false,
            divisor: 0,
            input_size: 4,
            input_stride: 0,
        }
    }
}

impl VertexAttribute {
    /// Byte range this attribute needs to fetch element `max_index`.
    pub fn required_bytes(&self, max_index: usize) -> usize {
        if self.divisor > 0 {
            self.size + self.offset
        } else {
            self.stride * max_index + self.size + self.offset
        }
    }
}

/// Pointer parameters recorded by `vertexAttribPointer`.
#[derive(Debug, Clone, Copy)]
pub struct AttribPointer {
    pub buffer: ObjectKey,
    pub size: i32,
    pub byte_size: usize,
    pub ty: u32,
    pub normalized: bool,
    pub stride: i32,
    pub offset: usize,
    pub integer: bool,
}

/// State captured by a vertex array object.
#[derive(Debug, Clone, Default)]
pub struct VertexArrayState {
    pub element_buffer: Option<ObjectKey>,
    pub attribs: Vec<VertexAttribute>,
}

impl VertexArrayState {
    pub fn new(max_attribs: usize) -> Self {
        Self {
            element_buffer: None,
            attribs: vec![VertexAttribute::default(); max_attribs],
        }
    }

    /// Every buffer this state references, once per reference.
    pub fn referenced_buffers(&self) -> Vec<ObjectKey> {
        self.element_buffer
            .into_iter()
            .chain(self.attribs.iter().filter_map(|a| a.buffer))
            .collect()
    }

    /// Apply a pointer to `index`, returning the buffer it displaced.
    pub fn set_pointer(&mut self, index: usize, pointer: AttribPointer) -> Option<ObjectKey> {
        let attrib = &mut self.attribs[index];
        let previous = attrib.buffer.replace(pointer.buffer);
        attrib.size = pointer.byte_size;
        attrib.offset = pointer.offset;
        attrib.stride = if pointer.stride != 0 {
            pointer.stride as usize
        } else {
            pointer.byte_size
        };
        attrib.ty = pointer.ty;
        attrib.normalized = pointer.normalized;
        attrib.integer = pointer.integer;
        attrib.input_size = pointer.size;
        attrib.input_stride = pointer.stride;
        previous
    }

    /// Detach `buffer` from every attribute, returning how many slots used it.
    pub fn release_array_buffer(&mut self, buffer: ObjectKey) -> usize {
        let mut count = 0;
        for attrib in &mut self.attribs {
            if attrib.buffer == Some(buffer) {
                attrib.buffer = None;
                count += 1;
            }
        }
        count
    }
}

/// Vertex state that is not captured by vertex array objects.
#[derive(Debug, Clone)]
pub struct GlobalVertexState {
    pub array_buffer: Option<ObjectKey>,
    /// Generic attribute values used when array mode is off.
    pub values: Vec<[f32; 4]>,
}

impl GlobalVertexState {
    pub fn new(max_attribs: usize) -> Self {
        Self {
            array_buffer: None,
            values: vec![[0.0, 0.0, 0.0, 1.0]; max_attribs],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_pointer_stride_defaults_to_packed() {
        let mut keys: SlotMap<ObjectKey, ()> = SlotMap::with_key();
        let buffer = keys.insert(());
        let mut state = VertexArrayState::new(4);
        let previous = state.set_pointer(
            1,
            AttribPointer {
                buffer,
                size: 3,
                byte_size: 12,
                ty: gl::FLOAT,
                normalized: false,
                stride: 0,
                offset: 4,
                integer: false,
            },
        );
        assert_eq!(previous, None);
        let attrib = &state.attribs[1];
        assert_eq!(attrib.stride, 12);
        assert_eq!(attrib.input_stride, 0);
        assert_eq!(attrib.required_bytes(2), 12 * 2 + 12 + 4);
    }

    #[test]
    fn test_release_array_buffer() {
        let mut keys: SlotMap<ObjectKey, ()> = SlotMap::with_key();
        let buffer = keys.insert(());
        let mut state = VertexArrayState::new(2);
        state.attribs[0].buffer = Some(buffer);
        state.attribs[1].buffer = Some(buffer);
        assert_eq!(state.referenced_buffers().len(), 2);
        assert_eq!(state.release_array_buffer(buffer), 2);
        assert!(state.referenced_buffers().is_empty());
    }

    #[test]
    fn test_generic_values_default() {
        let state = GlobalVertexState::new(3);
        assert_eq!(state.values[2], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_divisor_bounds() {
        let attrib = VertexAttribute {
            size: 8,
            offset: 4,
            stride: 16,
            divisor: 1,
            ..Default::default()
        };
        assert_eq!(attrib.required_bytes(100), 12);
    }
}
