//! End-to-end behavior of both context versions over the software driver.

use headless_gl::constants as gl;
use headless_gl::{
    ContextAttributes, ObjectKind, ParameterValue, SoftwareDriver, WebGL2RenderingContext,
    WebGLContext, WebGLProgram, WebGLRenderingContext,
};
use headless_gl_common::logging::{try_init_logging, LogConfig};

const VERTEX_SOURCE: &str = "attribute vec2 position;\n\
uniform vec4 offset;\n\
void main() { gl_Position = vec4(position, 0.0, 1.0) + offset; }";

const FRAGMENT_SOURCE: &str = "precision mediump float;\n\
uniform vec4 color;\n\
void main() { gl_FragColor = color; }";

fn webgl1(width: i32, height: i32) -> WebGLRenderingContext<SoftwareDriver> {
    let _ = try_init_logging(LogConfig::test());
    WebGLRenderingContext::new(SoftwareDriver::new(), width, height, ContextAttributes::default())
        .expect("webgl1 context")
}

fn webgl2(width: i32, height: i32) -> WebGL2RenderingContext<SoftwareDriver> {
    let _ = try_init_logging(LogConfig::test());
    WebGL2RenderingContext::new(SoftwareDriver::new(), width, height, ContextAttributes::webgl2())
        .expect("webgl2 context")
}

fn linked_program<C: WebGLContext>(ctx: &mut C) -> WebGLProgram {
    let vertex = ctx.create_shader(gl::VERTEX_SHADER).expect("vertex shader");
    ctx.shader_source(vertex, VERTEX_SOURCE);
    ctx.compile_shader(vertex);
    let fragment = ctx.create_shader(gl::FRAGMENT_SHADER).expect("fragment shader");
    ctx.shader_source(fragment, FRAGMENT_SOURCE);
    ctx.compile_shader(fragment);

    let program = ctx.create_program().expect("program");
    ctx.attach_shader(program, vertex);
    ctx.attach_shader(program, fragment);
    ctx.link_program(program);
    assert_eq!(
        ctx.get_program_parameter(program, gl::LINK_STATUS),
        ParameterValue::Bool(true)
    );
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    program
}

fn read_rgba<C: WebGLContext>(ctx: &mut C, x: i32, y: i32, width: i32, height: i32) -> Vec<u8> {
    let mut pixels = vec![0xAB; (width * height * 4) as usize];
    ctx.read_pixels(x, y, width, height, gl::RGBA, gl::UNSIGNED_BYTE, &mut pixels);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    pixels
}

// ==================== Clears and readback ====================

#[test]
fn test_clear_colors_read_back() {
    let mut ctx = webgl1(4, 4);
    let colors: [[u8; 4]; 4] = [
        [0, 0, 0, 255],
        [255, 255, 255, 255],
        [0, 255, 0, 255],
        [255, 0, 255, 0],
    ];
    for color in colors {
        let [r, g, b, a] = color.map(|c| f32::from(c) / 255.0);
        ctx.clear_color(r, g, b, a);
        ctx.clear(gl::COLOR_BUFFER_BIT);
        let pixels = read_rgba(&mut ctx, 0, 0, 4, 4);
        for texel in pixels.chunks_exact(4) {
            assert_eq!(texel, color);
        }
    }
}

#[test]
fn test_scissored_clear() {
    let mut ctx = webgl1(4, 4);
    ctx.clear_color(1.0, 0.0, 0.0, 1.0);
    ctx.clear(gl::COLOR_BUFFER_BIT);
    ctx.enable(gl::SCISSOR_TEST);
    ctx.scissor(0, 0, 2, 2);
    ctx.clear_color(0.0, 0.0, 1.0, 1.0);
    ctx.clear(gl::COLOR_BUFFER_BIT);

    let pixels = read_rgba(&mut ctx, 0, 0, 4, 4);
    assert_eq!(&pixels[0..4], &[0, 0, 255, 255]);
    assert_eq!(&pixels[(3 * 4 + 3) * 4..], &[255, 0, 0, 255]);
}

#[test]
fn test_resize_and_straddling_readback() {
    let mut ctx = webgl1(4, 4);
    ctx.resize(8, 6).expect("resize");
    assert_eq!(ctx.drawing_buffer_width(), 8);
    assert_eq!(ctx.drawing_buffer_height(), 6);

    ctx.clear_color(0.0, 1.0, 0.0, 1.0);
    ctx.clear(gl::COLOR_BUFFER_BIT);
    let (x, y, width, height) = (6, 4, 4, 4);
    let pixels = read_rgba(&mut ctx, x, y, width, height);
    for row in 0..height {
        for col in 0..width {
            let at = ((row * width + col) * 4) as usize;
            let inside = x + col < 8 && y + row < 6;
            let expected: [u8; 4] = if inside { [0, 255, 0, 255] } else { [0; 4] };
            assert_eq!(&pixels[at..at + 4], &expected, "texel ({col}, {row})");
        }
    }
}

#[test]
fn test_resize_rejects_empty_surface() {
    let mut ctx = webgl1(4, 4);
    assert!(ctx.resize(0, 4).is_err());
    assert_eq!(ctx.drawing_buffer_width(), 4);
}

#[test]
fn test_texture_upload_round_trips_through_framebuffer() {
    let mut ctx = webgl1(4, 4);
    let texels: Vec<u8> = (0..2 * 2 * 4).map(|i| (i * 13) as u8).collect();

    let texture = ctx.create_texture();
    ctx.bind_texture(gl::TEXTURE_2D, texture);
    ctx.tex_image_2d(
        gl::TEXTURE_2D,
        0,
        gl::RGBA,
        2,
        2,
        0,
        gl::RGBA,
        gl::UNSIGNED_BYTE,
        Some(&texels),
    );
    let framebuffer = ctx.create_framebuffer();
    ctx.bind_framebuffer(gl::FRAMEBUFFER, framebuffer);
    ctx.framebuffer_texture_2d(gl::FRAMEBUFFER, gl::COLOR_ATTACHMENT0, gl::TEXTURE_2D, texture, 0);
    assert_eq!(
        ctx.check_framebuffer_status(gl::FRAMEBUFFER),
        gl::FRAMEBUFFER_COMPLETE
    );

    assert_eq!(read_rgba(&mut ctx, 0, 0, 2, 2), texels);
}

#[test]
fn test_float_readback_in_webgl2() {
    let mut ctx = webgl2(2, 2);
    ctx.clear_color(1.0, 0.0, 0.0, 1.0);
    ctx.clear(gl::COLOR_BUFFER_BIT);
    let mut pixels = vec![0u8; 2 * 2 * 16];
    ctx.read_pixels(0, 0, 2, 2, gl::RGBA, gl::FLOAT, &mut pixels);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    let first: Vec<f32> = pixels[..16]
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(first, vec![1.0, 0.0, 0.0, 1.0]);

    let mut ctx = webgl1(2, 2);
    ctx.read_pixels(0, 0, 2, 2, gl::RGBA, gl::FLOAT, &mut pixels);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
}

#[test]
fn test_read_pixels_needs_room_for_every_row() {
    let mut ctx = webgl1(3, 3);
    // Three rows of three RGBA texels at alignment 4: 12 * 2 + 12 bytes.
    let mut short = vec![0u8; 35];
    ctx.read_pixels(0, 0, 3, 3, gl::RGBA, gl::UNSIGNED_BYTE, &mut short);
    assert_eq!(ctx.get_error(), gl::INVALID_VALUE);
    let mut exact = vec![0u8; 36];
    ctx.read_pixels(0, 0, 3, 3, gl::RGBA, gl::UNSIGNED_BYTE, &mut exact);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);

    let mut ctx = webgl2(3, 3);
    let mut floats = vec![0u8; 3 * 3 * 16 - 1];
    ctx.read_pixels(0, 0, 3, 3, gl::RGBA, gl::FLOAT, &mut floats);
    assert_eq!(ctx.get_error(), gl::INVALID_VALUE);
    floats.push(0);
    ctx.read_pixels(0, 0, 3, 3, gl::RGBA, gl::FLOAT, &mut floats);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
}

#[test]
fn test_read_pixels_pads_rows_to_pack_alignment() {
    fn check<C: WebGLContext>(ctx: &mut C) {
        ctx.clear_color(0.0, 1.0, 0.0, 1.0);
        ctx.clear(gl::COLOR_BUFFER_BIT);
        ctx.pixel_storei(gl::PACK_ALIGNMENT, 8);
        assert_eq!(ctx.get_parameter(gl::PACK_ALIGNMENT), ParameterValue::Int(8));

        // 12-byte rows padded to 16; the last row is not padded.
        let mut short = vec![0xAB; 27];
        ctx.read_pixels(0, 0, 3, 2, gl::RGBA, gl::UNSIGNED_BYTE, &mut short);
        assert_eq!(ctx.get_error(), gl::INVALID_VALUE);

        let mut pixels = vec![0xAB; 28];
        ctx.read_pixels(0, 0, 3, 2, gl::RGBA, gl::UNSIGNED_BYTE, &mut pixels);
        assert_eq!(ctx.get_error(), gl::NO_ERROR);
        for row in [&pixels[..12], &pixels[16..28]] {
            for texel in row.chunks_exact(4) {
                assert_eq!(texel, [0, 255, 0, 255]);
            }
        }
        assert_eq!(&pixels[12..16], [0xAB; 4]);
    }
    check(&mut webgl1(3, 2));
    check(&mut webgl2(3, 2));
}

#[test]
fn test_webgl1_read_pixels_only_takes_rgba_bytes() {
    let mut ctx = webgl1(2, 2);
    let mut pixels = vec![0u8; 64];
    ctx.read_pixels(0, 0, 2, 2, gl::RGB, gl::UNSIGNED_BYTE, &mut pixels);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
    ctx.read_pixels(0, 0, 2, 2, gl::RGBA, gl::UNSIGNED_SHORT_4_4_4_4, &mut pixels);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
    ctx.read_pixels(0, 0, 2, 2, gl::LUMINANCE, gl::UNSIGNED_BYTE, &mut pixels);
    assert_eq!(ctx.get_error(), gl::INVALID_ENUM);
    ctx.read_pixels(0, 0, 2, 2, gl::RGBA, gl::UNSIGNED_BYTE, &mut pixels);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
}

// ==================== Object lifetime ====================

#[test]
fn test_deleting_program_in_use_is_deferred() {
    let mut ctx = webgl1(2, 2);
    let program = linked_program(&mut ctx);
    let shaders = ctx.get_attached_shaders(program).expect("shaders");
    assert_eq!(shaders.len(), 2);
    ctx.use_program(Some(program));

    for shader in shaders {
        ctx.delete_shader(shader);
    }
    ctx.delete_program(program);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    assert_eq!(ctx.driver().live_objects(ObjectKind::Program), 1);
    assert_eq!(ctx.driver().live_objects(ObjectKind::Shader), 2);

    ctx.use_program(None);
    assert_eq!(ctx.driver().live_objects(ObjectKind::Program), 0);
    assert_eq!(ctx.driver().live_objects(ObjectKind::Shader), 0);
}

#[test]
fn test_detached_shader_is_released() {
    let mut ctx = webgl1(2, 2);
    let program = linked_program(&mut ctx);
    let shaders = ctx.get_attached_shaders(program).expect("shaders");
    ctx.delete_shader(shaders[0]);
    assert_eq!(ctx.driver().live_objects(ObjectKind::Shader), 2);

    ctx.detach_shader(program, shaders[0]);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    assert_eq!(ctx.driver().live_objects(ObjectKind::Shader), 1);
}

#[test]
fn test_deleted_texture_is_unbound() {
    let mut ctx = webgl1(2, 2);
    let texture = ctx.create_texture().expect("texture");
    ctx.bind_texture(gl::TEXTURE_2D, Some(texture));
    ctx.delete_texture(texture);
    assert_eq!(ctx.get_parameter(gl::TEXTURE_BINDING_2D), ParameterValue::Null);
    assert!(!ctx.is_texture(texture));

    ctx.bind_texture(gl::TEXTURE_2D, Some(texture));
    assert_eq!(ctx.get_error(), gl::INVALID_VALUE);
}

#[test]
fn test_foreign_objects_are_rejected() {
    let mut first = webgl1(2, 2);
    let mut second = webgl1(2, 2);
    let buffer = first.create_buffer();
    second.bind_buffer(gl::ARRAY_BUFFER, buffer);
    assert_eq!(second.get_error(), gl::INVALID_OPERATION);
    assert_eq!(first.get_error(), gl::NO_ERROR);
}

#[test]
fn test_buffer_role_is_fixed_by_first_bind() {
    let mut ctx = webgl1(2, 2);
    let buffer = ctx.create_buffer();
    ctx.bind_buffer(gl::ARRAY_BUFFER, buffer);
    ctx.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, buffer);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
    assert_eq!(
        ctx.get_parameter(gl::ARRAY_BUFFER_BINDING),
        ParameterValue::from(buffer)
    );
    assert_eq!(
        ctx.get_parameter(gl::ELEMENT_ARRAY_BUFFER_BINDING),
        ParameterValue::Null
    );
}

#[test]
fn test_buffer_sub_data_may_end_at_buffer_end() {
    let mut ctx = webgl1(2, 2);
    let buffer = ctx.create_buffer();
    ctx.bind_buffer(gl::ARRAY_BUFFER, buffer);
    ctx.buffer_data_size(gl::ARRAY_BUFFER, 8, gl::STATIC_DRAW);
    ctx.buffer_sub_data(gl::ARRAY_BUFFER, 8, &[]);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    ctx.buffer_sub_data(gl::ARRAY_BUFFER, 4, &[1, 2, 3, 4]);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    ctx.buffer_sub_data(gl::ARRAY_BUFFER, 9, &[]);
    assert_eq!(ctx.get_error(), gl::INVALID_VALUE);
    ctx.buffer_sub_data(gl::ARRAY_BUFFER, 5, &[1, 2, 3, 4]);
    assert_eq!(ctx.get_error(), gl::INVALID_VALUE);
}

#[test]
fn test_destroyed_context_is_lost() {
    let mut ctx = webgl1(2, 2);
    ctx.destroy();
    assert!(ctx.is_context_lost());
    assert!(ctx.driver().is_destroyed());
}

// ==================== Framebuffer completeness ====================

#[test]
fn test_empty_framebuffer_is_missing_attachment() {
    let mut ctx = webgl1(4, 4);
    let framebuffer = ctx.create_framebuffer();
    ctx.bind_framebuffer(gl::FRAMEBUFFER, framebuffer);
    assert_eq!(
        ctx.check_framebuffer_status(gl::FRAMEBUFFER),
        gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
    );
}

#[test]
fn test_mismatched_attachments_block_draws() {
    let mut ctx = webgl1(4, 4);
    let texture = ctx.create_texture();
    ctx.bind_texture(gl::TEXTURE_2D, texture);
    ctx.tex_image_2d(gl::TEXTURE_2D, 0, gl::RGBA, 2, 2, 0, gl::RGBA, gl::UNSIGNED_BYTE, None);
    let renderbuffer = ctx.create_renderbuffer();
    ctx.bind_renderbuffer(gl::RENDERBUFFER, renderbuffer);
    ctx.renderbuffer_storage(gl::RENDERBUFFER, gl::DEPTH_COMPONENT16, 3, 3);

    let framebuffer = ctx.create_framebuffer();
    ctx.bind_framebuffer(gl::FRAMEBUFFER, framebuffer);
    ctx.framebuffer_texture_2d(gl::FRAMEBUFFER, gl::COLOR_ATTACHMENT0, gl::TEXTURE_2D, texture, 0);
    ctx.framebuffer_renderbuffer(
        gl::FRAMEBUFFER,
        gl::DEPTH_ATTACHMENT,
        gl::RENDERBUFFER,
        renderbuffer,
    );
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    assert_eq!(
        ctx.check_framebuffer_status(gl::FRAMEBUFFER),
        gl::FRAMEBUFFER_INCOMPLETE_DIMENSIONS
    );

    let program = linked_program(&mut ctx);
    ctx.use_program(Some(program));
    ctx.clear(gl::COLOR_BUFFER_BIT);
    assert_eq!(ctx.get_error(), gl::INVALID_FRAMEBUFFER_OPERATION);
    ctx.draw_arrays(gl::TRIANGLES, 0, 3);
    assert_eq!(ctx.get_error(), gl::INVALID_FRAMEBUFFER_OPERATION);
    assert!(ctx.driver().draw_calls().is_empty());

    ctx.renderbuffer_storage(gl::RENDERBUFFER, gl::DEPTH_COMPONENT16, 2, 2);
    assert_eq!(
        ctx.check_framebuffer_status(gl::FRAMEBUFFER),
        gl::FRAMEBUFFER_COMPLETE
    );
    ctx.draw_arrays(gl::TRIANGLES, 0, 3);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    assert_eq!(ctx.driver().draw_calls().len(), 1);
}

#[test]
fn test_webgl2_sized_color_attachment_is_complete() {
    let mut ctx = webgl2(4, 4);
    let texture = ctx.create_texture();
    ctx.bind_texture(gl::TEXTURE_2D, texture);
    ctx.tex_image_2d(gl::TEXTURE_2D, 0, gl::RGBA8, 2, 2, 0, gl::RGBA, gl::UNSIGNED_BYTE, None);
    let renderbuffer = ctx.create_renderbuffer();
    ctx.bind_renderbuffer(gl::RENDERBUFFER, renderbuffer);
    ctx.renderbuffer_storage(gl::RENDERBUFFER, gl::DEPTH_COMPONENT24, 2, 2);

    let framebuffer = ctx.create_framebuffer();
    ctx.bind_framebuffer(gl::DRAW_FRAMEBUFFER, framebuffer);
    ctx.framebuffer_texture_2d(gl::DRAW_FRAMEBUFFER, gl::COLOR_ATTACHMENT0, gl::TEXTURE_2D, texture, 0);
    ctx.framebuffer_renderbuffer(
        gl::DRAW_FRAMEBUFFER,
        gl::DEPTH_ATTACHMENT,
        gl::RENDERBUFFER,
        renderbuffer,
    );
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    assert_eq!(
        ctx.check_framebuffer_status(gl::DRAW_FRAMEBUFFER),
        gl::FRAMEBUFFER_COMPLETE
    );
    assert_eq!(
        ctx.check_framebuffer_status(gl::READ_FRAMEBUFFER),
        gl::FRAMEBUFFER_COMPLETE
    );
}

// ==================== Draw calls ====================

#[test]
fn test_draw_without_program_fails() {
    let mut ctx = webgl1(2, 2);
    ctx.draw_arrays(gl::TRIANGLES, 0, 3);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
}

#[test]
fn test_draw_elements_reduces_count() {
    let mut ctx = webgl1(2, 2);
    let program = linked_program(&mut ctx);
    ctx.use_program(Some(program));

    let indices: Vec<u8> = [0u16, 1, 2, 2, 1, 3, 0]
        .iter()
        .flat_map(|i| i.to_ne_bytes())
        .collect();
    let elements = ctx.create_buffer();
    ctx.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, elements);
    ctx.buffer_data(gl::ELEMENT_ARRAY_BUFFER, &indices, gl::STATIC_DRAW);

    ctx.draw_elements(gl::TRIANGLES, 7, gl::UNSIGNED_SHORT, 0);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    let calls = ctx.driver().draw_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].count, 6);
    assert_eq!(calls[0].indices, Some((gl::UNSIGNED_SHORT, 0)));

    ctx.draw_elements(gl::TRIANGLE_STRIP, 2, gl::UNSIGNED_SHORT, 0);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
    assert_eq!(ctx.driver().draw_calls().len(), 1);
}

#[test]
fn test_draw_elements_checks_index_range() {
    let mut ctx = webgl1(2, 2);
    let program = linked_program(&mut ctx);
    ctx.use_program(Some(program));

    let elements = ctx.create_buffer();
    ctx.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, elements);
    ctx.buffer_data(gl::ELEMENT_ARRAY_BUFFER, &[0, 1, 2], gl::STATIC_DRAW);
    ctx.draw_elements(gl::TRIANGLES, 6, gl::UNSIGNED_BYTE, 0);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);

    ctx.draw_elements(gl::TRIANGLES, 2, gl::UNSIGNED_SHORT, 1);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
}

#[test]
fn test_draw_reads_enabled_attributes_within_buffer() {
    let mut ctx = webgl1(2, 2);
    let program = linked_program(&mut ctx);
    ctx.use_program(Some(program));
    let position = ctx.get_attrib_location(program, "position");
    assert!(position >= 0);
    let position = position as u32;

    let vertices = ctx.create_buffer();
    ctx.bind_buffer(gl::ARRAY_BUFFER, vertices);
    ctx.buffer_data_size(gl::ARRAY_BUFFER, 3 * 2 * 4, gl::STATIC_DRAW);
    ctx.vertex_attrib_pointer(position, 2, gl::FLOAT, false, 0, 0);
    ctx.enable_vertex_attrib_array(position);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);

    ctx.draw_arrays(gl::TRIANGLES, 0, 3);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    ctx.draw_arrays(gl::TRIANGLES, 1, 3);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
    assert_eq!(ctx.driver().draw_calls().len(), 1);
}

#[test]
fn test_draw_elements_bounds_skip_dropped_indices() {
    let mut ctx = webgl1(2, 2);
    let program = linked_program(&mut ctx);
    ctx.use_program(Some(program));
    let position = ctx.get_attrib_location(program, "position") as u32;

    let vertices = ctx.create_buffer();
    ctx.bind_buffer(gl::ARRAY_BUFFER, vertices);
    ctx.buffer_data_size(gl::ARRAY_BUFFER, 4 * 2 * 4, gl::STATIC_DRAW);
    ctx.vertex_attrib_pointer(position, 2, gl::FLOAT, false, 0, 0);
    ctx.enable_vertex_attrib_array(position);

    let indices: Vec<u8> = [0u16, 1, 2, 2, 1, 3, 200]
        .iter()
        .flat_map(|i| i.to_ne_bytes())
        .collect();
    let elements = ctx.create_buffer();
    ctx.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, elements);
    ctx.buffer_data(gl::ELEMENT_ARRAY_BUFFER, &indices, gl::STATIC_DRAW);

    ctx.draw_elements(gl::TRIANGLES, 7, gl::UNSIGNED_SHORT, 0);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    let calls = ctx.driver().draw_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].count, 6);

    // The full index range must still be in the element buffer.
    ctx.draw_elements(gl::TRIANGLES, 8, gl::UNSIGNED_SHORT, 0);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
    // Index 200 is fetched once the sixth triangle vertex is kept.
    ctx.draw_elements(gl::TRIANGLES, 6, gl::UNSIGNED_SHORT, 2);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
    assert_eq!(ctx.driver().draw_calls().len(), 1);
}

#[test]
fn test_draw_arrays_skips_empty_primitives() {
    let mut ctx = webgl1(2, 2);
    let program = linked_program(&mut ctx);
    ctx.use_program(Some(program));
    ctx.draw_arrays(gl::TRIANGLES, 0, 2);
    ctx.draw_arrays(gl::LINES, 0, 1);
    ctx.draw_arrays(gl::POINTS, 0, 0);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    assert!(ctx.driver().draw_calls().is_empty());

    let mut ctx = webgl2(2, 2);
    let program = linked_program(&mut ctx);
    ctx.use_program(Some(program));
    ctx.draw_arrays_instanced(gl::TRIANGLES, 0, 2, 3);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    assert!(ctx.driver().draw_calls().is_empty());
}

#[test]
fn test_draw_arrays_rejects_unaddressable_last_vertex() {
    let mut ctx = webgl1(2, 2);
    let program = linked_program(&mut ctx);
    ctx.use_program(Some(program));
    ctx.draw_arrays(gl::POINTS, i32::MAX, 2);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
    ctx.draw_arrays(gl::POINTS, i32::MAX, 1);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    assert_eq!(ctx.driver().draw_calls().len(), 1);
}

#[test]
fn test_instanced_draws_in_webgl2() {
    let mut ctx = webgl2(2, 2);
    let program = linked_program(&mut ctx);
    ctx.use_program(Some(program));
    ctx.draw_arrays_instanced(gl::TRIANGLES, 0, 3, 4);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    assert_eq!(ctx.driver().draw_calls()[0].instances, 4);
}

// ==================== Programs and uniforms ====================

#[test]
fn test_uniform_location_is_stale_after_relink() {
    let mut ctx = webgl1(2, 2);
    let program = linked_program(&mut ctx);
    ctx.use_program(Some(program));
    let color = ctx
        .get_uniform_location(program, "color")
        .expect("color location");
    ctx.uniform4f(Some(&color), 1.0, 0.5, 0.25, 1.0);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    assert_eq!(
        ctx.get_uniform(program, &color),
        ParameterValue::Float32Array(vec![1.0, 0.5, 0.25, 1.0])
    );

    ctx.link_program(program);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    ctx.uniform4f(Some(&color), 0.0, 0.0, 0.0, 1.0);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
}

#[test]
fn test_uniform_type_and_shape_checks() {
    let mut ctx = webgl1(2, 2);
    let program = linked_program(&mut ctx);
    ctx.use_program(Some(program));
    let color = ctx
        .get_uniform_location(program, "color")
        .expect("color location");

    ctx.uniform1f(Some(&color), 1.0);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);
    ctx.uniform4fv(Some(&color), &[1.0, 2.0, 3.0]);
    assert_eq!(ctx.get_error(), gl::INVALID_VALUE);
    ctx.uniform4f(None, 1.0, 1.0, 1.0, 1.0);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
}

#[test]
fn test_reserved_identifiers_fail_webgl2_compile() {
    let mut ctx = webgl2(2, 2);
    let shader = ctx.create_shader(gl::VERTEX_SHADER).expect("shader");
    ctx.shader_source(shader, "attribute vec2 webgl_position; void main() {}");
    ctx.compile_shader(shader);
    assert_eq!(
        ctx.get_shader_parameter(shader, gl::COMPILE_STATUS),
        ParameterValue::Bool(false)
    );
    assert!(ctx
        .get_shader_info_log(shader)
        .is_some_and(|log| !log.is_empty()));
}

#[test]
fn test_failed_link_reports_log() {
    let mut ctx = webgl1(2, 2);
    let program = ctx.create_program().expect("program");
    ctx.link_program(program);
    assert_eq!(
        ctx.get_program_parameter(program, gl::LINK_STATUS),
        ParameterValue::Bool(false)
    );
    assert!(ctx
        .get_program_info_log(program)
        .is_some_and(|log| !log.is_empty()));
}

// ==================== Extensions ====================

#[test]
fn test_extension_resolution_enables_entry_points() {
    let mut ctx = webgl1(2, 2);
    let program = linked_program(&mut ctx);
    ctx.use_program(Some(program));

    ctx.draw_arrays_instanced_angle(gl::TRIANGLES, 0, 3, 2);
    assert_eq!(ctx.get_error(), gl::INVALID_OPERATION);

    assert!(ctx.get_extension("ANGLE_instanced_arrays").is_some());
    ctx.draw_arrays_instanced_angle(gl::TRIANGLES, 0, 3, 2);
    assert_eq!(ctx.get_error(), gl::NO_ERROR);
    assert_eq!(ctx.driver().draw_calls().len(), 1);
}

#[test]
fn test_supported_extensions_follow_driver() {
    let _ = try_init_logging(LogConfig::test());
    let driver = SoftwareDriver::new().with_extensions("GL_OES_texture_float");
    let mut ctx = WebGLRenderingContext::new(driver, 2, 2, ContextAttributes::default())
        .expect("context");
    let supported = ctx.get_supported_extensions();
    assert!(supported.iter().any(|e| e == "OES_texture_float"));
    assert!(!supported.iter().any(|e| e == "OES_vertex_array_object"));
    assert!(ctx.get_extension("OES_vertex_array_object").is_none());
}
