//! headless-gl benchmarks
//!
//! Run with: cargo bench -p headless-gl-bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use headless_gl::constants as gl;
use headless_gl::{ContextAttributes, SoftwareDriver, WebGLContext, WebGLRenderingContext};
use headless_gl_bench::{triangle_indices, DrawFixture};

fn context(width: i32, height: i32) -> WebGLRenderingContext<SoftwareDriver> {
    WebGLRenderingContext::new(SoftwareDriver::new(), width, height, ContextAttributes::default())
        .expect("benchmark context")
}

fn draw_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_elements");

    for triangles in [64usize, 1024, 16384] {
        let mut fixture = DrawFixture::webgl1(64, 64).expect("fixture");
        fixture.upload_positions(triangles + 2);
        fixture.upload_indices(&triangle_indices(triangles));
        let count = (triangles * 3) as i32;

        group.throughput(Throughput::Elements(triangles as u64));
        group.bench_with_input(BenchmarkId::new("validate", triangles), &count, |b, &count| {
            b.iter(|| {
                fixture
                    .ctx
                    .draw_elements(gl::TRIANGLES, count, gl::UNSIGNED_SHORT, 0);
                fixture.reset();
            })
        });
    }

    group.bench_function("draw_arrays", |b| {
        let mut fixture = DrawFixture::webgl1(64, 64).expect("fixture");
        fixture.upload_positions(3);
        b.iter(|| {
            fixture.ctx.draw_arrays(gl::TRIANGLES, 0, 3);
            fixture.reset();
        })
    });

    group.finish();
}

fn object_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("objects");

    group.bench_function("create_bind_delete_texture", |b| {
        let mut ctx = context(4, 4);
        b.iter(|| {
            let texture = ctx.create_texture();
            ctx.bind_texture(gl::TEXTURE_2D, texture);
            if let Some(texture) = texture {
                ctx.delete_texture(texture);
            }
        })
    });

    group.bench_function("framebuffer_completeness", |b| {
        let mut ctx = context(4, 4);
        let texture = ctx.create_texture();
        ctx.bind_texture(gl::TEXTURE_2D, texture);
        ctx.tex_image_2d(gl::TEXTURE_2D, 0, gl::RGBA, 16, 16, 0, gl::RGBA, gl::UNSIGNED_BYTE, None);
        let framebuffer = ctx.create_framebuffer();
        ctx.bind_framebuffer(gl::FRAMEBUFFER, framebuffer);
        ctx.framebuffer_texture_2d(gl::FRAMEBUFFER, gl::COLOR_ATTACHMENT0, gl::TEXTURE_2D, texture, 0);
        b.iter(|| ctx.check_framebuffer_status(gl::FRAMEBUFFER))
    });

    group.finish();
}

fn readback_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_pixels");

    for size in [16i32, 256] {
        let mut ctx = context(size, size);
        ctx.clear_color(0.25, 0.5, 0.75, 1.0);
        ctx.clear(gl::COLOR_BUFFER_BIT);
        let mut pixels = vec![0u8; (size * size * 4) as usize];

        group.throughput(Throughput::Bytes(pixels.len() as u64));
        group.bench_with_input(BenchmarkId::new("inside", size), &size, |b, &size| {
            b.iter(|| {
                ctx.read_pixels(0, 0, size, size, gl::RGBA, gl::UNSIGNED_BYTE, &mut pixels)
            })
        });
        group.bench_with_input(BenchmarkId::new("straddling", size), &size, |b, &size| {
            b.iter(|| {
                ctx.read_pixels(
                    size / 2,
                    size / 2,
                    size,
                    size,
                    gl::RGBA,
                    gl::UNSIGNED_BYTE,
                    &mut pixels,
                )
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    draw_benchmarks,
    object_benchmarks,
    readback_benchmarks,
);

criterion_main!(benches);
