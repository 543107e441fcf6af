//! Pixel transfer sizing and the readback window.
//!
//! The driver does not clip reads against the logical framebuffer, so reads
//! that leave the framebuffer are split here: everything outside reads as
//! transparent black and only the overlapping rectangle reaches the driver.

/// Bytes between consecutive rows, rounded up to `alignment`.
pub fn row_stride(width: usize, bytes_per_pixel: usize, alignment: usize) -> usize {
    let stride = width * bytes_per_pixel;
    let alignment = alignment.max(1);
    match stride % alignment {
        0 => stride,
        rem => stride + alignment - rem,
    }
}

/// Bytes a readback writes: every row padded except the last.
pub fn read_size(width: usize, height: usize, bytes_per_pixel: usize, alignment: usize) -> usize {
    if width == 0 || height == 0 {
        return 0;
    }
    row_stride(width, bytes_per_pixel, alignment) * (height - 1) + width * bytes_per_pixel
}

/// Bytes an upload of `depth` images must provide.
pub fn upload_size(
    width: usize,
    height: usize,
    depth: usize,
    bytes_per_pixel: usize,
    alignment: usize,
) -> usize {
    row_stride(width, bytes_per_pixel, alignment) * height * depth
}

/// Rectangle in framebuffer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// How a readback of a rectangle is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPlan {
    /// Entirely inside the framebuffer: read straight into the destination.
    Direct,
    /// Entirely outside: zero-fill only.
    Outside,
    /// Partly outside: zero-fill, read `source`, and copy it to `(dx, dy)` of
    /// the destination rectangle.
    Clipped { source: Rect, dx: usize, dy: usize },
}

/// Decide how to read `rect` from a `view_width` x `view_height` framebuffer.
pub fn plan_read(rect: Rect, view_width: i32, view_height: i32) -> ReadPlan {
    let Rect {
        x,
        y,
        width,
        height,
    } = rect;
    if x >= view_width || x + width <= 0 || y >= view_height || y + height <= 0 {
        return ReadPlan::Outside;
    }
    if x >= 0 && x + width <= view_width && y >= 0 && y + height <= view_height {
        return ReadPlan::Direct;
    }

    let nx = x.max(0);
    let ny = y.max(0);
    let n_width = (x + width).min(view_width) - nx;
    let n_height = (y + height).min(view_height) - ny;
    if n_width <= 0 || n_height <= 0 {
        return ReadPlan::Outside;
    }
    ReadPlan::Clipped {
        source: Rect {
            x: nx,
            y: ny,
            width: n_width,
            height: n_height,
        },
        dx: (nx - x) as usize,
        dy: (ny - y) as usize,
    }
}

/// Copy `rows` rows of `row_bytes` from `src` into `dst` starting at byte
/// `offset`.
pub fn scatter(
    dst: &mut [u8],
    dst_stride: usize,
    offset: usize,
    src: &[u8],
    src_stride: usize,
    rows: usize,
    row_bytes: usize,
) {
    for row in 0..rows {
        let from = row * src_stride;
        let to = offset + row * dst_stride;
        let (Some(source), Some(target)) = (
            src.get(from..from + row_bytes),
            dst.get_mut(to..to + row_bytes),
        ) else {
            break;
        };
        target.copy_from_slice(source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_stride_alignment() {
        assert_eq!(row_stride(3, 3, 4), 12);
        assert_eq!(row_stride(1, 3, 4), 4);
        assert_eq!(row_stride(5, 1, 1), 5);
        assert_eq!(row_stride(5, 1, 8), 8);
    }

    #[test]
    fn test_read_size_skips_last_row_padding() {
        assert_eq!(read_size(1, 2, 3, 4), 4 + 3);
        assert_eq!(read_size(0, 10, 4, 4), 0);
        assert_eq!(upload_size(1, 2, 1, 3, 4), 8);
    }

    #[test]
    fn test_plan_direct_and_outside() {
        let inside = Rect {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
        };
        assert_eq!(plan_read(inside, 4, 4), ReadPlan::Direct);
        let outside = Rect {
            x: 4,
            y: 0,
            width: 2,
            height: 2,
        };
        assert_eq!(plan_read(outside, 4, 4), ReadPlan::Outside);
    }

    #[test]
    fn test_plan_clips_both_edges() {
        let rect = Rect {
            x: -2,
            y: 1,
            width: 10,
            height: 5,
        };
        assert_eq!(
            plan_read(rect, 4, 4),
            ReadPlan::Clipped {
                source: Rect {
                    x: 0,
                    y: 1,
                    width: 4,
                    height: 3
                },
                dx: 2,
                dy: 0,
            }
        );
    }

    #[test]
    fn test_scatter_into_strided_destination() {
        let mut dst = vec![0u8; 12];
        let src = [1u8, 2, 3, 4];
        scatter(&mut dst, 6, 2, &src, 2, 2, 2);
        assert_eq!(dst, vec![0, 0, 1, 2, 0, 0, 0, 0, 3, 4, 0, 0]);
    }
}
