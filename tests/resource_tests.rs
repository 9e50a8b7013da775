//! Reference counting, cache identity, and eviction behavior.

mod common;

use std::path::Path;

use common::{context, context_with_config, AssetDir};
use firethorn::device::TextureFormat;
use firethorn::{ContextConfig, FirethornError, ResourceKind, TextureRole};

/// Moving a wrapper must not touch the reference count.
fn move_through<T>(value: T) -> T {
    value
}

#[test]
fn refcount_balance_across_clone_move_drop() {
    let dir = AssetDir::new();
    dir.write_png("brick.png", 2, 2, [180, 60, 40, 255]);
    let (ctx, stats) = context(&dir);

    let a = ctx
        .load_texture("brick.png", TextureRole::BaseColor, false, true)
        .unwrap();
    let handle = a.handle();
    assert_eq!(ctx.ref_count(ResourceKind::Texture, handle), 1);

    let b = a.clone();
    assert_eq!(ctx.ref_count(ResourceKind::Texture, handle), 2);

    let b = move_through(b);
    assert_eq!(ctx.ref_count(ResourceKind::Texture, handle), 2);

    let clones: Vec<_> = (0..3).map(|_| a.clone()).collect();
    assert_eq!(ctx.ref_count(ResourceKind::Texture, handle), 5);

    drop(clones);
    assert_eq!(ctx.ref_count(ResourceKind::Texture, handle), 2);

    drop(b);
    drop(a);
    assert_eq!(ctx.ref_count(ResourceKind::Texture, handle), 0);
    assert_eq!(stats.live(ResourceKind::Texture), 0);
    assert_eq!(stats.freed(ResourceKind::Texture), 1);
}

#[test]
fn cache_identity_is_filename_plus_flags() {
    let dir = AssetDir::new();
    dir.write_png("wall.png", 2, 2, [10, 20, 30, 255]);
    let (ctx, _stats) = context(&dir);

    let base = ctx
        .load_texture("wall.png", TextureRole::BaseColor, false, true)
        .unwrap();
    let same = ctx
        .load_texture("wall.png", TextureRole::BaseColor, false, true)
        .unwrap();
    assert_eq!(base.handle(), same.handle());
    assert_eq!(ctx.ref_count(ResourceKind::Texture, base.handle()), 2);

    let flipped = ctx
        .load_texture("wall.png", TextureRole::BaseColor, true, true)
        .unwrap();
    let linear = ctx
        .load_texture("wall.png", TextureRole::BaseColor, false, false)
        .unwrap();
    assert_ne!(base.handle(), flipped.handle());
    assert_ne!(base.handle(), linear.handle());
    assert_ne!(flipped.handle(), linear.handle());
}

#[test]
fn eviction_yields_a_fresh_handle_never_a_reused_one() {
    let dir = AssetDir::new();
    dir.write_png("brick.png", 2, 2, [180, 60, 40, 255]);
    let (ctx, stats) = context(&dir);

    let first = ctx
        .load_texture("brick.png", TextureRole::BaseColor, false, true)
        .unwrap();
    let old = first.handle();
    drop(first);
    assert_eq!(stats.live(ResourceKind::Texture), 0);

    let second = ctx
        .load_texture("brick.png", TextureRole::BaseColor, false, true)
        .unwrap();
    assert_ne!(second.handle(), old);
    assert!(second.handle().get() > old.get());
}

/// The full shared-ownership walkthrough: load, copy, drop, reload, evict.
#[test]
fn shared_texture_lifecycle() {
    let dir = AssetDir::new();
    dir.write_png("brick.png", 2, 2, [180, 60, 40, 255]);
    let (ctx, stats) = context(&dir);

    // Cache miss: fresh handle, one owner.
    let a = ctx
        .load_texture("brick.png", TextureRole::BaseColor, false, true)
        .unwrap();
    let h1 = a.handle();
    assert_eq!(ctx.ref_count(ResourceKind::Texture, h1), 1);
    assert_eq!(stats.created(ResourceKind::Texture), 1);

    // Copy: two owners.
    let b = a.clone();
    assert_eq!(ctx.ref_count(ResourceKind::Texture, h1), 2);

    // Drop the original: still alive through the copy.
    drop(a);
    assert_eq!(ctx.ref_count(ResourceKind::Texture, h1), 1);
    assert_eq!(stats.live(ResourceKind::Texture), 1);

    // Same identity again: cache hit, same handle, no new GPU object.
    let c = ctx
        .load_texture("brick.png", TextureRole::BaseColor, false, true)
        .unwrap();
    assert_eq!(c.handle(), h1);
    assert_eq!(ctx.ref_count(ResourceKind::Texture, h1), 2);
    assert_eq!(stats.created(ResourceKind::Texture), 1);

    // Last owners gone: freed exactly once, cache entry evicted.
    drop(b);
    drop(c);
    assert_eq!(ctx.ref_count(ResourceKind::Texture, h1), 0);
    assert_eq!(stats.freed(ResourceKind::Texture), 1);
    assert_eq!(stats.double_frees(), 0);

    let fresh = ctx
        .load_texture("brick.png", TextureRole::BaseColor, false, true)
        .unwrap();
    assert_ne!(fresh.handle(), h1);
    assert_eq!(stats.created(ResourceKind::Texture), 2);
}

#[test]
fn overwriting_a_wrapper_with_its_own_clone_is_safe() {
    let dir = AssetDir::new();
    dir.write_png("brick.png", 2, 2, [180, 60, 40, 255]);
    let (ctx, stats) = context(&dir);

    let mut a = ctx
        .load_texture("brick.png", TextureRole::BaseColor, false, true)
        .unwrap();
    let handle = a.handle();

    // The clone increments before the previous value drops.
    a = a.clone();
    assert_eq!(ctx.ref_count(ResourceKind::Texture, handle), 1);
    assert_eq!(stats.freed(ResourceKind::Texture), 0);

    let mut b = ctx
        .load_texture("brick.png", TextureRole::BaseColor, true, true)
        .unwrap();
    let other = b.handle();
    std::mem::swap(&mut a, &mut b);
    assert_eq!(ctx.ref_count(ResourceKind::Texture, handle), 1);
    assert_eq!(ctx.ref_count(ResourceKind::Texture, other), 1);
}

#[test]
fn attribute_changes_stay_on_the_callers_copy() {
    let dir = AssetDir::new();
    dir.write_png("brick.png", 2, 2, [180, 60, 40, 255]);
    let (ctx, _stats) = context(&dir);

    let mut a = ctx
        .load_texture("brick.png", TextureRole::BaseColor, false, true)
        .unwrap();
    a.set_role(TextureRole::Height);
    a.set_unit(5);

    let b = ctx
        .load_texture("brick.png", TextureRole::Normal, false, true)
        .unwrap();
    assert_eq!(b.handle(), a.handle());
    assert_eq!(b.role(), TextureRole::Normal);
    assert_eq!(b.unit(), 0);
    assert_eq!(a.role(), TextureRole::Height);
}

#[test]
fn same_filename_in_different_directories_aliases_by_default() {
    let dir = AssetDir::new();
    dir.write_png("a/wall.png", 2, 2, [255, 0, 0, 255]);
    dir.write_png("b/wall.png", 2, 2, [0, 255, 0, 255]);

    let (ctx, _stats) = context(&dir);
    let first = ctx
        .load_texture("a/wall.png", TextureRole::BaseColor, false, true)
        .unwrap();
    let second = ctx
        .load_texture("b/wall.png", TextureRole::BaseColor, false, true)
        .unwrap();
    // Documented limitation of the file-name identity rule.
    assert_eq!(first.handle(), second.handle());

    let (qualified, _stats) = context_with_config(
        &dir,
        ContextConfig {
            path_qualified_cache: true,
            ..ContextConfig::default()
        },
    );
    let first = qualified
        .load_texture("a/wall.png", TextureRole::BaseColor, false, true)
        .unwrap();
    let second = qualified
        .load_texture("b/wall.png", TextureRole::BaseColor, false, true)
        .unwrap();
    assert_ne!(first.handle(), second.handle());
}

#[test]
fn shader_identity_is_the_source_path_tuple() {
    let dir = AssetDir::new();
    dir.write_text("basic.vert", "void main() {}\n");
    dir.write_text("basic.frag", "void main() {}\n");
    dir.write_text("wire.geom", "void main() {}\n");
    let (ctx, stats) = context(&dir);

    let a = ctx
        .load_shader("basic.vert", "basic.frag", None::<&Path>)
        .unwrap();
    let b = ctx
        .load_shader("basic.vert", "basic.frag", None::<&Path>)
        .unwrap();
    assert_eq!(a.handle(), b.handle());
    assert_eq!(ctx.ref_count(ResourceKind::ShaderProgram, a.handle()), 2);

    let with_geometry = ctx
        .load_shader("basic.vert", "basic.frag", Some("wire.geom"))
        .unwrap();
    assert_ne!(with_geometry.handle(), a.handle());
    assert!(with_geometry.geometry_path().is_some());

    let old = a.handle();
    drop(a);
    drop(b);
    drop(with_geometry);
    assert_eq!(stats.live(ResourceKind::ShaderProgram), 0);
    assert_eq!(stats.freed(ResourceKind::ShaderProgram), 2);

    let fresh = ctx
        .load_shader("basic.vert", "basic.frag", None::<&Path>)
        .unwrap();
    assert_ne!(fresh.handle(), old);
}

#[test]
fn failed_shader_compilation_leaves_nothing_behind() {
    let dir = AssetDir::new();
    dir.write_text("empty.vert", "");
    dir.write_text("basic.frag", "void main() {}\n");
    let (ctx, stats) = context(&dir);

    let err = ctx
        .load_shader("empty.vert", "basic.frag", None::<&Path>)
        .unwrap_err();
    assert!(matches!(err, FirethornError::Device(_)));
    assert_eq!(stats.live(ResourceKind::ShaderProgram), 0);
    assert_eq!(ctx.live(ResourceKind::ShaderProgram), 0);

    // The failure is not cached; a corrected file under a different name
    // still loads.
    let shader = ctx
        .load_shader("basic.frag", "basic.frag", None::<&Path>)
        .unwrap();
    assert!(!shader.handle().is_none());
}

#[test]
fn unresolvable_path_is_a_hard_failure() {
    let dir = AssetDir::new();
    let (ctx, _stats) = context(&dir);
    let err = ctx
        .load_texture("missing.png", TextureRole::BaseColor, false, false)
        .unwrap_err();
    assert!(matches!(err, FirethornError::AssetNotFound { .. }));
}

#[test]
fn unsupported_channel_count_is_rejected() {
    let dir = AssetDir::new();
    dir.write_gray_alpha_png("mask.png", 2, 2);
    let (ctx, stats) = context(&dir);
    let err = ctx
        .load_texture("mask.png", TextureRole::Generic, false, false)
        .unwrap_err();
    assert!(matches!(
        err,
        FirethornError::UnsupportedChannelCount { channels: 2, .. }
    ));
    assert_eq!(stats.live(ResourceKind::Texture), 0);
}

#[test]
fn single_channel_images_upload_as_r8() {
    let dir = AssetDir::new();
    dir.write_gray_png("height.png", 4, 4, 90);
    let (ctx, _stats) = context(&dir);
    let tex = ctx
        .load_texture("height.png", TextureRole::Height, false, false)
        .unwrap();
    assert_eq!(tex.format(), TextureFormat::R8Unorm);
    assert_eq!(tex.width(), 4);
    assert_eq!(tex.height(), 4);
}

#[test]
fn cubemap_identity_and_face_validation() {
    let dir = AssetDir::new();
    let faces = ["px", "nx", "py", "ny", "pz", "nz"];
    for face in faces {
        dir.write_png(&format!("sky/{face}.png"), 2, 2, [40, 80, 200, 255]);
    }
    let (ctx, stats) = context(&dir);

    let paths = faces.map(|f| format!("sky/{f}.png"));
    let a = ctx.load_cubemap(paths.clone(), false, true).unwrap();
    let b = ctx.load_cubemap(paths.clone(), false, true).unwrap();
    assert_eq!(a.handle(), b.handle());
    assert_eq!(stats.created(ResourceKind::Texture), 1);

    // Face order is part of the identity.
    let mut reordered = paths.clone();
    reordered.swap(0, 1);
    let c = ctx.load_cubemap(reordered, false, true).unwrap();
    assert_ne!(c.handle(), a.handle());

    // A face of the wrong size fails the whole load.
    dir.write_png("sky/odd.png", 4, 4, [0, 0, 0, 255]);
    let mut mismatched = paths;
    mismatched[3] = "sky/odd.png".to_string();
    let err = ctx.load_cubemap(mismatched, false, true).unwrap_err();
    assert!(matches!(err, FirethornError::CubeFaceMismatch { .. }));
}

#[test]
fn untracked_handles_report_zero() {
    let dir = AssetDir::new();
    let (ctx, _stats) = context(&dir);
    assert_eq!(
        ctx.ref_count(ResourceKind::Texture, firethorn::RawHandle::NONE),
        0
    );
}

#[test]
fn context_clones_share_one_cache() {
    let dir = AssetDir::new();
    dir.write_png("brick.png", 2, 2, [180, 60, 40, 255]);
    let (ctx, _stats) = context(&dir);
    let other = ctx.clone();

    let a = ctx
        .load_texture("brick.png", TextureRole::BaseColor, false, true)
        .unwrap();
    let b = other
        .load_texture("brick.png", TextureRole::BaseColor, false, true)
        .unwrap();
    assert_eq!(a.handle(), b.handle());
    assert_eq!(other.ref_count(ResourceKind::Texture, a.handle()), 2);

    ctx.dump_ref_counts();
}
