use std::path::{Path, PathBuf};
use std::sync::Arc;

use media_manager::error::{MediaError, UploadError};
use media_manager::locator::StreamLocator;
use media_manager::media::MediaContext;
use media_manager::ops::{SanitizeError, Sanitizer, SvgHushSanitizer};
use media_manager::resolver::{absolute_root, Intent};
use media_manager::upload::{TempUpload, UploadHandle};

const FOLDER: &str = "user://pages/blog";

fn setup_with(sanitizer: Arc<dyn Sanitizer>) -> (tempfile::TempDir, MediaContext) {
    let dir = tempfile::tempdir().unwrap();
    let webroot = absolute_root(&dir.path().join("webroot"));
    std::fs::create_dir_all(webroot.join("user/pages/blog")).unwrap();

    let mut locator = StreamLocator::new(&webroot);
    locator.add_scheme("user", ["user"]);
    let ctx = MediaContext::new(&webroot, Arc::new(locator), sanitizer, 1024 * 1024, true);
    (dir, ctx)
}

fn setup() -> (tempfile::TempDir, MediaContext) {
    setup_with(Arc::new(SvgHushSanitizer))
}

fn blog_dir(ctx: &MediaContext) -> PathBuf {
    ctx.resolver.webroot().join("user/pages/blog")
}

fn touch(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(name), name.as_bytes()).unwrap();
    }
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

// ============================================================================
// rename
// ============================================================================

#[test]
fn test_rename_missing_source_is_noop() {
    let (_dir, ctx) = setup();
    let outcome = ctx.ops.rename("ghost.png", "other.png", FOLDER).unwrap();
    assert!(outcome.is_noop());
    assert!(listing(&blog_dir(&ctx)).is_empty());
}

#[test]
fn test_rename_to_same_name_is_noop() {
    let (_dir, ctx) = setup();
    touch(&blog_dir(&ctx), &["photo.jpg"]);

    let outcome = ctx.ops.rename("photo.jpg", "photo.jpg", FOLDER).unwrap();
    assert!(outcome.is_noop());
    assert_eq!(listing(&blog_dir(&ctx)), vec!["photo.jpg"]);
}

#[test]
fn test_rename_carries_sidecar_and_variants() {
    let (_dir, ctx) = setup();
    let dir = blog_dir(&ctx);
    touch(
        &dir,
        &[
            "photo.jpg",
            "photo.jpg.meta.yaml",
            "photo@2x.jpg",
            "photo@3x.jpg",
            "photo@2x.jpg.meta.yaml",
            "photograph.jpg",
        ],
    );

    let outcome = ctx.ops.rename("photo.jpg", "sunset.jpg", FOLDER).unwrap();

    assert_eq!(outcome.renamed[0], ("photo.jpg".to_string(), "sunset.jpg".to_string()));
    assert_eq!(
        outcome.renamed[1],
        ("photo.jpg.meta.yaml".to_string(), "sunset.jpg.meta.yaml".to_string())
    );
    assert_eq!(outcome.renamed.len(), 5);
    assert_eq!(
        listing(&dir),
        vec![
            "photograph.jpg",
            "sunset.jpg",
            "sunset.jpg.meta.yaml",
            "sunset@2x.jpg",
            "sunset@2x.jpg.meta.yaml",
            "sunset@3x.jpg",
        ]
    );
    // Contents travel with the names
    assert_eq!(std::fs::read(dir.join("sunset@3x.jpg")).unwrap(), b"photo@3x.jpg");
}

#[test]
fn test_rename_conflict_leaves_everything_in_place() {
    let (_dir, ctx) = setup();
    let dir = blog_dir(&ctx);
    touch(&dir, &["a.png", "a.png.meta.yaml", "b.png"]);

    let err = ctx.ops.rename("a.png", "b.png", FOLDER).unwrap_err();

    assert!(matches!(err, MediaError::Conflict { .. }));
    assert_eq!(listing(&dir), vec!["a.png", "a.png.meta.yaml", "b.png"]);
    assert_eq!(std::fs::read(dir.join("b.png")).unwrap(), b"b.png");
}

#[test]
fn test_rename_conflict_on_derivative_target() {
    let (_dir, ctx) = setup();
    let dir = blog_dir(&ctx);
    touch(&dir, &["a.png", "a@2x.png", "b@2x.png"]);

    let err = ctx.ops.rename("a.png", "b.png", FOLDER).unwrap_err();

    match err {
        MediaError::Conflict { to, .. } => assert!(to.ends_with("b@2x.png")),
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(listing(&dir), vec!["a.png", "a@2x.png", "b@2x.png"]);
}

#[test]
fn test_rename_reports_failed_sidecar_as_partial() {
    let (_dir, ctx) = setup();
    let dir = blog_dir(&ctx);
    touch(&dir, &["photo.png", "photo.png.meta.yaml"]);
    // Fits the file system's name limit, its sidecar name does not
    let long = format!("{}.png", "a".repeat(247));

    let err = ctx.ops.rename("photo.png", &long, FOLDER).unwrap_err();

    assert!(matches!(err, MediaError::MetadataRename { .. }));
    assert!(err.is_partial());
    assert_eq!(listing(&dir), vec![long, "photo.png.meta.yaml".to_string()]);
}

#[test]
fn test_rename_reports_failed_variant_as_partial() {
    let (_dir, ctx) = setup();
    let dir = blog_dir(&ctx);
    touch(&dir, &["photo.png", "photo@2x.png"]);
    let long = format!("{}.png", "b".repeat(250));

    let err = ctx.ops.rename("photo.png", &long, FOLDER).unwrap_err();

    assert!(matches!(err, MediaError::DerivativeRename { .. }));
    assert!(err.is_partial());
    assert_eq!(err.translation_key(), "MEDIA.ERROR.DERIVATIVE_RENAME");
    assert_eq!(listing(&dir), vec![long, "photo@2x.png".to_string()]);
}

#[test]
fn test_rename_conflict_is_not_partial() {
    let (_dir, ctx) = setup();
    touch(&blog_dir(&ctx), &["a.png", "b.png"]);
    let err = ctx.ops.rename("a.png", "b.png", FOLDER).unwrap_err();
    assert!(!err.is_partial());
}

// ============================================================================
// remove
// ============================================================================

#[test]
fn test_remove_stops_at_first_failed_derivative() {
    let (_dir, ctx) = setup();
    let dir = blog_dir(&ctx);
    touch(&dir, &["photo.jpg", "photo.jpg.meta.yaml", "photo@3x.jpg"]);
    // Matches the variant pattern but cannot be unlinked
    std::fs::create_dir(dir.join("photo@2x.jpg")).unwrap();

    let err = ctx.ops.remove("photo.jpg", FOLDER).unwrap_err();

    match &err {
        MediaError::Delete { path, message } => {
            assert!(path.ends_with("photo@2x.jpg"));
            assert!(!message.is_empty());
        }
        other => panic!("expected delete error, got {other:?}"),
    }
    // Primary and sidecar are gone, the sweep stopped before @3x
    assert_eq!(listing(&dir), vec!["photo@2x.jpg", "photo@3x.jpg"]);
}

#[test]
fn test_mutations_by_real_folder_clear_stream_lookups() {
    let (_dir, ctx) = setup();
    let dir = blog_dir(&ctx);
    touch(&dir, &["old.png", "keep.png"]);
    let old = "user://pages/blog/old.png";
    let keep = "user://pages/blog/keep.png";

    // Memoize both lookups
    assert!(ctx.resolver.resolve(old, Intent::Existing).unwrap().is_some());
    assert!(ctx.resolver.resolve(keep, Intent::Existing).unwrap().is_some());

    ctx.ops.remove("old.png", "user/pages/blog").unwrap();
    assert!(matches!(
        ctx.resolver.resolve(old, Intent::Existing),
        Err(MediaError::UnresolvedStream { .. })
    ));

    ctx.ops.rename("keep.png", "kept.png", "user/pages/blog").unwrap();
    assert!(matches!(
        ctx.resolver.resolve(keep, Intent::Existing),
        Err(MediaError::UnresolvedStream { .. })
    ));
    assert!(ctx
        .resolver
        .resolve("user://pages/blog/kept.png", Intent::Existing)
        .unwrap()
        .is_some());
}

#[test]
fn test_remove_deletes_whole_family() {
    let (_dir, ctx) = setup();
    let dir = blog_dir(&ctx);
    touch(
        &dir,
        &[
            "logo.png",
            "logo.png.meta.yaml",
            "logo@2x.png",
            "logo@2x.png.meta.yaml",
            "logo-dark.png",
        ],
    );

    let outcome = ctx.ops.remove("logo.png", FOLDER).unwrap();

    assert_eq!(
        outcome.removed,
        vec![
            "logo.png",
            "logo.png.meta.yaml",
            "logo@2x.png",
            "logo@2x.png.meta.yaml",
        ]
    );
    assert_eq!(listing(&dir), vec!["logo-dark.png"]);
}

#[test]
fn test_remove_missing_file_still_sweeps_derivatives() {
    let (_dir, ctx) = setup();
    let dir = blog_dir(&ctx);
    touch(&dir, &["orphan.png.meta.yaml", "orphan@2x.png", "keep.png"]);

    let outcome = ctx.ops.remove("orphan.png", FOLDER).unwrap();

    assert_eq!(outcome.removed, vec!["orphan.png.meta.yaml", "orphan@2x.png"]);
    assert_eq!(listing(&dir), vec!["keep.png"]);
}

#[test]
fn test_remove_missing_file_without_family_is_noop() {
    let (_dir, ctx) = setup();
    touch(&blog_dir(&ctx), &["keep.png"]);

    let outcome = ctx.ops.remove("ghost.png", FOLDER).unwrap();
    assert!(outcome.removed.is_empty());
    assert_eq!(listing(&blog_dir(&ctx)), vec!["keep.png"]);
}

#[test]
fn test_remove_twice_is_idempotent() {
    let (_dir, ctx) = setup();
    touch(&blog_dir(&ctx), &["single.png"]);

    let first = ctx.ops.remove("single.png", FOLDER).unwrap();
    assert_eq!(first.removed, vec!["single.png"]);

    // Missing file in an existing folder: treated as a no-op, not an error
    let second = ctx.ops.remove("single.png", FOLDER).unwrap();
    assert!(second.removed.is_empty());
}

#[test]
fn test_remove_in_missing_folder_is_noop() {
    let (_dir, ctx) = setup();
    let outcome = ctx.ops.remove("ghost.png", "user://pages/nowhere").unwrap();
    assert!(outcome.removed.is_empty());
    assert!(!ctx.resolver.webroot().join("user/pages/nowhere").exists());
}

#[test]
fn test_remove_outside_webroot_is_rejected() {
    let (_dir, ctx) = setup();
    let err = ctx.ops.remove("passwd", "../../etc").unwrap_err();
    assert!(matches!(err, MediaError::BadDestination { .. }));
}

// ============================================================================
// read / copy / move
// ============================================================================

#[test]
fn test_read_file_and_stream() {
    let (_dir, ctx) = setup();
    touch(&blog_dir(&ctx), &["notes.txt"]);

    assert_eq!(ctx.ops.read_file("notes.txt", FOLDER).unwrap(), b"notes.txt");

    let mut contents = String::new();
    let mut file = ctx.ops.read_stream("notes.txt", FOLDER).unwrap();
    std::io::Read::read_to_string(&mut file, &mut contents).unwrap();
    assert_eq!(contents, "notes.txt");
}

#[test]
fn test_read_errors() {
    let (_dir, ctx) = setup();
    std::fs::create_dir_all(blog_dir(&ctx).join("album")).unwrap();

    assert!(matches!(
        ctx.ops.read_file("missing.txt", FOLDER),
        Err(MediaError::Read { .. })
    ));
    assert!(matches!(
        ctx.ops.read_stream("album", FOLDER),
        Err(MediaError::Read { .. })
    ));
}

#[test]
fn test_read_image_dimensions() {
    let (_dir, ctx) = setup();
    image::RgbImage::new(7, 3)
        .save(blog_dir(&ctx).join("tiny.png"))
        .unwrap();
    touch(&blog_dir(&ctx), &["fake.png"]);

    assert_eq!(ctx.ops.read_image_dimensions("tiny.png", FOLDER).unwrap(), (7, 3));
    assert!(matches!(
        ctx.ops.read_image_dimensions("fake.png", FOLDER),
        Err(MediaError::Read { .. })
    ));
}

#[test]
fn test_copy_creates_parent_folders() {
    let (_dir, ctx) = setup();
    touch(&blog_dir(&ctx), &["a.png", "a@2x.png"]);

    let copied = ctx.ops.copy("a.png", "archive/a.png", FOLDER).unwrap();

    assert_eq!(copied, blog_dir(&ctx).join("archive/a.png"));
    assert_eq!(std::fs::read(&copied).unwrap(), b"a.png");
    // Derivatives stay behind
    assert_eq!(listing(&blog_dir(&ctx).join("archive")), vec!["a.png"]);
}

#[test]
fn test_copy_missing_source() {
    let (_dir, ctx) = setup();
    let err = ctx.ops.copy("ghost.png", "copy.png", FOLDER).unwrap_err();
    assert!(matches!(err, MediaError::Read { .. }));
}

#[test]
fn test_move_upload_only_once() {
    let (dir, ctx) = setup();
    let mut upload =
        TempUpload::from_bytes(dir.path().join("tmp"), "cover.png", Some("image/png"), b"cover")
            .unwrap();

    let target = ctx
        .ops
        .move_upload(&mut upload, "cover.png", "user://pages/fresh")
        .unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), b"cover");
    assert!(upload.is_moved());

    let err = ctx
        .ops
        .move_upload(&mut upload, "again.png", FOLDER)
        .unwrap_err();
    assert!(matches!(err, MediaError::Upload(UploadError::AlreadyMoved(_))));
}

#[test]
fn test_unmoved_upload_is_cleaned_up() {
    let dir = tempfile::tempdir().unwrap();
    let upload = TempUpload::from_bytes(dir.path(), "cover.png", None, b"cover").unwrap();
    let temp_path = upload.temp_path().unwrap().to_path_buf();
    assert!(temp_path.exists());

    drop(upload);
    assert!(!temp_path.exists());
}

// ============================================================================
// sanitize
// ============================================================================

#[test]
fn test_sanitize_strips_scripts() {
    let (_dir, ctx) = setup();
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" onload="alert(1)"><script>alert(2)</script><rect width="10" height="10"/></svg>"#;
    std::fs::write(blog_dir(&ctx).join("icon.svg"), svg).unwrap();

    ctx.ops.sanitize_svg("icon.svg", FOLDER).unwrap();

    let cleaned = std::fs::read_to_string(blog_dir(&ctx).join("icon.svg")).unwrap();
    assert!(!cleaned.contains("script"));
    assert!(!cleaned.contains("onload"));
    assert!(cleaned.contains("rect"));
}

struct RejectingSanitizer;

impl Sanitizer for RejectingSanitizer {
    fn sanitize(&self, path: &Path) -> Result<(), SanitizeError> {
        Err(SanitizeError::Filter {
            path: path.display().to_string(),
            message: "rejected".to_string(),
        })
    }
}

#[test]
fn test_sanitizer_errors_pass_through() {
    let (_dir, ctx) = setup_with(Arc::new(RejectingSanitizer));
    touch(&blog_dir(&ctx), &["icon.svg"]);

    let err = ctx.ops.sanitize_svg("icon.svg", FOLDER).unwrap_err();
    assert_eq!(err.translation_key(), "MEDIA.ERROR.SANITIZE");

    match err {
        MediaError::Sanitize(SanitizeError::Filter { message, .. }) => {
            assert_eq!(message, "rejected")
        }
        other => panic!("expected sanitizer error, got {other:?}"),
    }
}
