//! Headless resource session demo.
//!
//! Generates a few assets in a temporary directory, then walks through the
//! resource lifecycle: cached loads, shared ownership, render targets, and
//! uniform writes. Run with `RUST_LOG=debug` to watch the reference counts
//! and cache traffic.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example resource_session
//! ```

use firethorn::{
    ContextConfig, FieldType, MeshData, RenderContext, RenderTargetKind, ResourceKind,
    TextureRole, UniformValue,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Stage a few assets to load.
    let asset_dir = std::env::temp_dir().join(format!("firethorn-demo-{}", std::process::id()));
    std::fs::create_dir_all(&asset_dir).expect("create demo asset dir");
    image::RgbaImage::from_pixel(64, 64, image::Rgba([177, 76, 58, 255]))
        .save(asset_dir.join("brick.png"))
        .expect("write brick.png");
    std::fs::write(
        asset_dir.join("lit.vert"),
        "#version 330 core\nvoid main() { gl_Position = vec4(0.0); }\n",
    )
    .expect("write lit.vert");
    std::fs::write(
        asset_dir.join("lit.frag"),
        "#version 330 core\nout vec4 color;\nvoid main() { color = vec4(1.0); }\n",
    )
    .expect("write lit.frag");

    let (context, stats) = RenderContext::headless(ContextConfig {
        label: "demo".to_string(),
        asset_roots: vec![asset_dir.clone()],
        ..ContextConfig::default()
    });

    // Cached loads: the second request is a cache hit on the same handle.
    let brick = context
        .load_texture("brick.png", TextureRole::BaseColor, false, true)
        .expect("load brick.png");
    let brick_again = context
        .load_texture("brick.png", TextureRole::BaseColor, false, true)
        .expect("reload brick.png");
    println!(
        "brick.png -> handle {} (count {})",
        brick.handle().get(),
        context.ref_count(ResourceKind::Texture, brick.handle())
    );
    assert_eq!(brick.handle(), brick_again.handle());

    let shader = context
        .load_shader("lit.vert", "lit.frag", None::<&str>)
        .expect("load shader");
    println!("lit shader -> handle {}", shader.handle().get());

    // Shared ownership: clones alias one GPU object.
    let copies: Vec<_> = (0..3).map(|_| brick.clone()).collect();
    println!(
        "after 3 clones: count {}",
        context.ref_count(ResourceKind::Texture, brick.handle())
    );
    drop(copies);

    // A scene's worth of uncached resources.
    let cube = context.create_mesh(&MeshData::cube()).expect("upload cube");
    println!(
        "cube mesh -> handle {} ({} triangles)",
        cube.handle().get(),
        cube.triangle_count()
    );

    let mut target = context
        .create_render_target(640, 360, RenderTargetKind::Standard)
        .expect("create render target");
    target.resize(1280, 720).expect("resize render target");
    println!(
        "render target -> handle {} ({}x{})",
        target.handle().get(),
        target.width(),
        target.height()
    );

    let camera = context
        .create_uniform_buffer(
            "camera",
            &[
                ("u_view_proj", FieldType::Mat4),
                ("u_eye", FieldType::Vec3),
                ("u_time", FieldType::Float),
            ],
        )
        .expect("create camera block");
    camera
        .set("u_view_proj", UniformValue::Mat4(glam::Mat4::IDENTITY))
        .expect("write view-proj");
    camera
        .set("u_eye", UniformValue::Vec3(glam::Vec3::new(0.0, 1.5, 4.0)))
        .expect("write eye");
    camera
        .set("u_time", UniformValue::Float(0.0))
        .expect("write time");
    camera.bind_to_slot(0);
    println!(
        "camera block -> handle {} ({} bytes)",
        camera.handle().get(),
        camera.size()
    );

    context.dump_ref_counts();

    // Teardown: drop everything and show the device's view of the session.
    drop((brick, brick_again, shader, cube, target, camera));
    println!("\nsession summary:");
    for kind in ResourceKind::ALL {
        println!(
            "  {:<16} created {:>2}, freed {:>2}, live {}",
            kind.name(),
            stats.created(kind),
            stats.freed(kind),
            stats.live(kind)
        );
    }

    let _ = std::fs::remove_dir_all(&asset_dir);
}
