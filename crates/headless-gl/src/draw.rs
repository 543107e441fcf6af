//! Draw call argument reduction and vertex fetch bounds.

use crate::constants as gl;
use crate::error::{GlError, GlResult};
use crate::objects::ObjectKey;
use crate::state::VertexAttribute;

/// Reduce `count` to a whole number of primitives for `mode`.
///
/// Partial triangles and lines are dropped. Strips, fans and loops below
/// their minimum vertex count are `INVALID_OPERATION`; unknown modes are
/// `INVALID_ENUM`.
pub fn vertex_count(mode: u32, count: i32) -> GlResult<i32> {
    match mode {
        gl::TRIANGLES => Ok(count - count % 3),
        gl::LINES => Ok(count - count % 2),
        gl::POINTS => Ok(count),
        gl::LINE_LOOP | gl::LINE_STRIP if count < 2 => Err(GlError::InvalidOperation),
        gl::TRIANGLE_FAN | gl::TRIANGLE_STRIP if count < 3 => Err(GlError::InvalidOperation),
        gl::LINE_LOOP | gl::LINE_STRIP | gl::TRIANGLE_FAN | gl::TRIANGLE_STRIP => Ok(count),
        _ => Err(GlError::InvalidEnum),
    }
}

/// Like [`vertex_count`], but a zero count is accepted for every mode since
/// it draws nothing.
pub fn reduce(mode: u32, count: i32) -> GlResult<i32> {
    match vertex_count(mode, count) {
        Err(GlError::InvalidOperation) if count == 0 => Ok(0),
        other => other,
    }
}

/// Byte size of an index type. `UNSIGNED_INT` needs `uint_indices`.
pub fn index_size(ty: u32, uint_indices: bool) -> GlResult<usize> {
    match ty {
        gl::UNSIGNED_BYTE => Ok(1),
        gl::UNSIGNED_SHORT => Ok(2),
        gl::UNSIGNED_INT if uint_indices => Ok(4),
        _ => Err(GlError::InvalidEnum),
    }
}

/// Largest index among the first `used` of `count` indices of type `ty`
/// starting at byte `offset` of `elements`.
///
/// The whole `count` range must lie in the shadow copy; only the `used`
/// prefix is scanned. `None` when nothing is read. A misaligned offset or a
/// range past the end of the shadow copy is `INVALID_OPERATION`.
pub fn max_index(
    elements: &[u8],
    ty: u32,
    offset: usize,
    count: usize,
    used: usize,
) -> GlResult<Option<u32>> {
    let size = match ty {
        gl::UNSIGNED_BYTE => 1,
        gl::UNSIGNED_SHORT => 2,
        gl::UNSIGNED_INT => 4,
        _ => return Err(GlError::InvalidEnum),
    };
    if offset % size != 0 {
        return Err(GlError::InvalidOperation);
    }
    let end = count
        .checked_mul(size)
        .and_then(|len| len.checked_add(offset))
        .ok_or(GlError::InvalidOperation)?;
    let range = elements.get(offset..end).ok_or(GlError::InvalidOperation)?;
    let max = range
        .chunks_exact(size)
        .take(used)
        .map(|c| match size {
            1 => u32::from(c[0]),
            2 => u32::from(u16::from_ne_bytes([c[0], c[1]])),
            _ => u32::from_ne_bytes([c[0], c[1], c[2], c[3]]),
        })
        .max();
    Ok(max)
}

/// Check every enabled attribute the program reads against its buffer.
///
/// `buffer_size` resolves a buffer key to its byte size. An enabled attribute
/// without a buffer, or one whose fetch of `max_index` runs past the end of
/// its buffer, is `INVALID_OPERATION`.
pub fn check_attributes<F>(
    attribs: &[VertexAttribute],
    program_attributes: &[i32],
    max_index: usize,
    buffer_size: F,
) -> GlResult<()>
where
    F: Fn(ObjectKey) -> Option<usize>,
{
    for (index, attrib) in attribs.iter().enumerate() {
        if !attrib.enabled {
            continue;
        }
        let size = attrib
            .buffer
            .and_then(&buffer_size)
            .ok_or(GlError::InvalidOperation)?;
        let used = i32::try_from(index).is_ok_and(|i| program_attributes.contains(&i));
        if used && attrib.required_bytes(max_index) > size {
            return Err(GlError::InvalidOperation);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_partial_primitives_are_dropped() {
        assert_eq!(vertex_count(gl::TRIANGLES, 7), Ok(6));
        assert_eq!(vertex_count(gl::LINES, 5), Ok(4));
        assert_eq!(vertex_count(gl::POINTS, 5), Ok(5));
        assert_eq!(vertex_count(gl::TRIANGLE_STRIP, 4), Ok(4));
    }

    #[test]
    fn test_strip_minimums() {
        assert_eq!(
            vertex_count(gl::TRIANGLE_STRIP, 2),
            Err(GlError::InvalidOperation)
        );
        assert_eq!(vertex_count(gl::LINE_LOOP, 1), Err(GlError::InvalidOperation));
        assert_eq!(vertex_count(0x1234, 3), Err(GlError::InvalidEnum));
        assert_eq!(reduce(gl::TRIANGLE_FAN, 0), Ok(0));
    }

    #[test]
    fn test_index_sizes() {
        assert_eq!(index_size(gl::UNSIGNED_SHORT, false), Ok(2));
        assert_eq!(index_size(gl::UNSIGNED_INT, false), Err(GlError::InvalidEnum));
        assert_eq!(index_size(gl::UNSIGNED_INT, true), Ok(4));
    }

    #[test]
    fn test_max_index_scan() {
        let shorts: Vec<u8> = [0u16, 7, 3, 2].iter().flat_map(|v| v.to_ne_bytes()).collect();
        assert_eq!(max_index(&shorts, gl::UNSIGNED_SHORT, 0, 4, 4), Ok(Some(7)));
        assert_eq!(max_index(&shorts, gl::UNSIGNED_SHORT, 4, 2, 2), Ok(Some(3)));
        assert_eq!(
            max_index(&shorts, gl::UNSIGNED_SHORT, 1, 1, 1),
            Err(GlError::InvalidOperation)
        );
        assert_eq!(
            max_index(&shorts, gl::UNSIGNED_SHORT, 4, 3, 3),
            Err(GlError::InvalidOperation)
        );
        assert_eq!(max_index(&[5, 9, 1], gl::UNSIGNED_BYTE, 0, 0, 0), Ok(None));
    }

    #[test]
    fn test_max_index_ignores_dropped_tail() {
        let shorts: Vec<u8> = [0u16, 1, 2, 200].iter().flat_map(|v| v.to_ne_bytes()).collect();
        assert_eq!(max_index(&shorts, gl::UNSIGNED_SHORT, 0, 4, 3), Ok(Some(2)));
        assert_eq!(max_index(&shorts, gl::UNSIGNED_SHORT, 0, 4, 0), Ok(None));
        assert_eq!(
            max_index(&shorts, gl::UNSIGNED_SHORT, 2, 4, 3),
            Err(GlError::InvalidOperation)
        );
    }

    #[test]
    fn test_attribute_bounds() {
        let mut keys: SlotMap<ObjectKey, ()> = SlotMap::with_key();
        let buffer = keys.insert(());
        let attrib = VertexAttribute {
            enabled: true,
            buffer: Some(buffer),
            size: 8,
            stride: 8,
            ..Default::default()
        };
        let attribs = [attrib];
        // Three vec2 floats fit in 24 bytes.
        assert_eq!(check_attributes(&attribs, &[0], 2, |_| Some(24)), Ok(()));
        assert_eq!(
            check_attributes(&attribs, &[0], 3, |_| Some(24)),
            Err(GlError::InvalidOperation)
        );
        // Attributes the program does not read are not bounds checked.
        assert_eq!(check_attributes(&attribs, &[], 3, |_| Some(24)), Ok(()));
    }

    #[test]
    fn test_enabled_attribute_without_buffer() {
        let attribs = [VertexAttribute {
            enabled: true,
            ..Default::default()
        }];
        assert_eq!(
            check_attributes(&attribs, &[], 0, |_| Some(0)),
            Err(GlError::InvalidOperation)
        );
    }
}
