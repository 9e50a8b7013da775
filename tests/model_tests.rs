//! Model loading, aggregate caching, and aggregate eviction.

mod common;

use common::{context, AssetDir};
use firethorn::{ResourceKind, TextureRole};

#[test]
fn model_meshes_and_textures_share_the_handle_table() {
    let dir = AssetDir::new();
    dir.write_png("checker.png", 2, 2, [200, 200, 200, 255]);
    dir.write_triangle_gltf("tri", Some("checker.png"));
    let (ctx, stats) = context(&dir);

    let model = ctx.load_model("tri.gltf", false, true).unwrap();
    assert_eq!(model.mesh_count(), 1);
    assert_eq!(model.triangle_count(), 1);

    let mesh = &model.meshes[0];
    assert_eq!(mesh.buffers.vertex_count(), 3);
    assert_eq!(mesh.buffers.index_count(), 3);
    assert_eq!(ctx.ref_count(ResourceKind::MeshBuffers, mesh.buffers.handle()), 1);

    assert_eq!(mesh.textures.len(), 1);
    assert_eq!(mesh.textures[0].role(), TextureRole::BaseColor);

    // The material texture went through the texture cache: a direct load of
    // the same identity shares the handle.
    let direct = ctx
        .load_texture("checker.png", TextureRole::BaseColor, false, true)
        .unwrap();
    assert_eq!(direct.handle(), mesh.textures[0].handle());
    assert_eq!(ctx.ref_count(ResourceKind::Texture, direct.handle()), 2);
    assert_eq!(stats.created(ResourceKind::Texture), 1);
}

#[test]
fn model_cache_hit_returns_the_same_mesh_handles() {
    let dir = AssetDir::new();
    dir.write_triangle_gltf("tri", None);
    let (ctx, stats) = context(&dir);

    let first = ctx.load_model("tri.gltf", false, true).unwrap();
    let second = ctx.load_model("tri.gltf", false, true).unwrap();
    let handle = first.meshes[0].buffers.handle();
    assert_eq!(second.meshes[0].buffers.handle(), handle);
    assert_eq!(ctx.ref_count(ResourceKind::MeshBuffers, handle), 2);
    assert_eq!(stats.created(ResourceKind::MeshBuffers), 1);

    // Differing flags are a different identity.
    let flipped = ctx.load_model("tri.gltf", true, true).unwrap();
    assert_ne!(flipped.meshes[0].buffers.handle(), handle);
}

#[test]
fn dropping_the_last_model_copy_evicts_the_whole_aggregate() {
    let dir = AssetDir::new();
    dir.write_png("checker.png", 2, 2, [200, 200, 200, 255]);
    dir.write_triangle_gltf("tri", Some("checker.png"));
    let (ctx, stats) = context(&dir);

    let model = ctx.load_model("tri.gltf", false, true).unwrap();
    let copy = model.clone();
    let mesh_handle = model.meshes[0].buffers.handle();
    assert_eq!(ctx.ref_count(ResourceKind::MeshBuffers, mesh_handle), 2);

    drop(copy);
    assert_eq!(ctx.ref_count(ResourceKind::MeshBuffers, mesh_handle), 1);

    drop(model);
    assert_eq!(stats.live(ResourceKind::MeshBuffers), 0);
    assert_eq!(stats.live(ResourceKind::Texture), 0);

    // The aggregate is gone: the same path uploads fresh meshes.
    let reloaded = ctx.load_model("tri.gltf", false, true).unwrap();
    assert_ne!(reloaded.meshes[0].buffers.handle(), mesh_handle);
    assert_eq!(stats.created(ResourceKind::MeshBuffers), 2);
}

#[test]
fn model_textures_survive_model_eviction_in_the_texture_cache() {
    let dir = AssetDir::new();
    dir.write_png("checker.png", 2, 2, [200, 200, 200, 255]);
    dir.write_triangle_gltf("tri", Some("checker.png"));
    let (ctx, stats) = context(&dir);

    let model = ctx.load_model("tri.gltf", false, true).unwrap();
    let texture_handle = model.meshes[0].textures[0].handle();

    // An outside owner keeps the texture alive past the model.
    let kept = ctx
        .load_texture("checker.png", TextureRole::BaseColor, false, true)
        .unwrap();
    drop(model);
    assert_eq!(stats.live(ResourceKind::MeshBuffers), 0);
    assert_eq!(ctx.ref_count(ResourceKind::Texture, texture_handle), 1);

    // Reloading the model mints new meshes but hits the texture cache.
    let reloaded = ctx.load_model("tri.gltf", false, true).unwrap();
    assert_eq!(reloaded.meshes[0].textures[0].handle(), kept.handle());
    assert_eq!(stats.created(ResourceKind::Texture), 1);
}
