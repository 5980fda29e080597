use std::path::{Path, PathBuf};
use std::sync::Arc;

use media_manager::error::{MediaError, UploadError};
use media_manager::locator::StreamLocator;
use media_manager::media::MediaContext;
use media_manager::ops::SvgHushSanitizer;
use media_manager::resolver::absolute_root;
use media_manager::upload::{
    FieldPath, FieldSettings, PendingAction, QueueState, TempUpload, UploadHandle, UploadQueue,
};

const BLOG: &str = "user/pages/blog";

fn setup() -> (tempfile::TempDir, MediaContext) {
    let dir = tempfile::tempdir().unwrap();
    let webroot = absolute_root(&dir.path().join("webroot"));
    std::fs::create_dir_all(webroot.join(BLOG)).unwrap();

    let mut locator = StreamLocator::new(&webroot);
    locator.add_scheme("user", ["user"]);
    let ctx = MediaContext::new(
        &webroot,
        Arc::new(locator),
        Arc::new(SvgHushSanitizer),
        1024,
        true,
    );
    (dir, ctx)
}

fn upload(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> Box<dyn UploadHandle> {
    Box::new(TempUpload::from_bytes(dir.path().join("spool"), name, None, data).unwrap())
}

fn stage(
    queue: &mut UploadQueue,
    folder: &str,
    filename: &str,
    upload: Option<Box<dyn UploadHandle>>,
) {
    queue
        .queue_change(
            FieldPath::new("hero", filename).unwrap(),
            PathBuf::from(folder),
            filename,
            upload,
            FieldSettings::default(),
        )
        .unwrap();
}

fn spooled(dir: &tempfile::TempDir) -> usize {
    std::fs::read_dir(dir.path().join("spool"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

fn blog(ctx: &MediaContext) -> PathBuf {
    ctx.resolver.webroot().join(BLOG)
}

#[test]
fn test_new_queue_is_clean() {
    let queue = UploadQueue::new(1024);
    assert_eq!(queue.state(), QueueState::Clean);
    assert!(queue.is_empty());
}

#[test]
fn test_delete_supersedes_upload() {
    let (dir, _ctx) = setup();
    let mut queue = UploadQueue::new(1024);

    stage(&mut queue, BLOG, "logo.png", Some(upload(&dir, "logo.png", b"logo")));
    assert_eq!(spooled(&dir), 1);
    stage(&mut queue, BLOG, "logo.png", None);

    assert_eq!(queue.len(), 1);
    let entry = queue.get(&Path::new(BLOG).join("logo.png")).unwrap();
    assert!(entry.is_delete());
    // The superseded upload released its spooled file
    assert_eq!(spooled(&dir), 0);
}

#[test]
fn test_superseded_entry_moves_to_end() {
    let (dir, _ctx) = setup();
    let mut queue = UploadQueue::new(1024);

    stage(&mut queue, BLOG, "a.png", Some(upload(&dir, "a.png", b"a")));
    stage(&mut queue, BLOG, "b.png", Some(upload(&dir, "b.png", b"b")));
    stage(&mut queue, BLOG, "a.png", Some(upload(&dir, "a.png", b"a2")));

    let order: Vec<&str> = queue.entries().iter().map(|e| e.filename.as_str()).collect();
    assert_eq!(order, vec!["b.png", "a.png"]);
}

#[test]
fn test_oversized_upload_is_not_staged() {
    let (dir, _ctx) = setup();
    let mut queue = UploadQueue::new(3);

    let err = queue
        .queue_change(
            FieldPath::new("hero", "big.png").unwrap(),
            PathBuf::from(BLOG),
            "big.png",
            Some(upload(&dir, "big.png", b"four")),
            FieldSettings::default(),
        )
        .unwrap_err();

    assert!(matches!(err, MediaError::Upload(UploadError::TooLarge { limit: 3, .. })));
    assert!(queue.is_empty());
    assert_eq!(queue.state(), QueueState::Clean);
}

#[test]
fn test_discard_writes_nothing() {
    let (dir, ctx) = setup();
    std::fs::write(blog(&ctx).join("old.png"), b"old").unwrap();
    let mut queue = UploadQueue::new(1024);

    stage(&mut queue, BLOG, "new.png", Some(upload(&dir, "new.png", b"new")));
    stage(&mut queue, BLOG, "old.png", None);
    queue.discard();

    assert!(queue.is_empty());
    assert_eq!(queue.state(), QueueState::Discarded);
    assert!(!blog(&ctx).join("new.png").exists());
    assert!(blog(&ctx).join("old.png").exists());
    assert_eq!(spooled(&dir), 0);
}

#[test]
fn test_commit_replays_in_order() {
    let (dir, ctx) = setup();
    std::fs::write(blog(&ctx).join("old.png"), b"old").unwrap();
    std::fs::write(blog(&ctx).join("old@2x.png"), b"old2x").unwrap();
    let mut queue = UploadQueue::new(1024);

    stage(&mut queue, BLOG, "new.png", Some(upload(&dir, "new.png", b"new")));
    stage(&mut queue, BLOG, "old.png", None);
    stage(
        &mut queue,
        "user/pages/blog/images",
        "logo.png",
        Some(upload(&dir, "logo.png", b"logo")),
    );

    let applied = queue.commit(&ctx.ops, &ctx.index, false).unwrap();

    let actions: Vec<(PathBuf, PendingAction)> =
        applied.iter().map(|c| (c.path.clone(), c.action)).collect();
    assert_eq!(
        actions,
        vec![
            (PathBuf::from("user/pages/blog/new.png"), PendingAction::Add),
            (PathBuf::from("user/pages/blog/old.png"), PendingAction::Delete),
            (PathBuf::from("user/pages/blog/images/logo.png"), PendingAction::Add),
        ]
    );
    assert_eq!(queue.state(), QueueState::Committed);
    assert!(queue.is_empty());

    assert_eq!(std::fs::read(blog(&ctx).join("new.png")).unwrap(), b"new");
    assert_eq!(std::fs::read(blog(&ctx).join("images/logo.png")).unwrap(), b"logo");
    assert!(!blog(&ctx).join("old.png").exists());
    assert!(!blog(&ctx).join("old@2x.png").exists());
}

#[test]
fn test_commit_invalidates_touched_folders() {
    let (dir, ctx) = setup();
    let folder = Path::new(BLOG);
    assert!(ctx.index.list_files(folder).unwrap().is_empty());
    assert!(ctx.index.is_cached(folder));

    let mut queue = UploadQueue::new(1024);
    stage(&mut queue, BLOG, "new.png", Some(upload(&dir, "new.png", b"new")));
    queue.commit(&ctx.ops, &ctx.index, false).unwrap();

    assert!(!ctx.index.is_cached(folder));
    assert!(ctx.index.list_files(folder).unwrap().contains_key("new.png"));
}

#[test]
fn test_commit_stops_at_first_failure() {
    let (dir, ctx) = setup();
    // A file where the destination folder should be
    std::fs::write(blog(&ctx).join("blocked"), b"not a folder").unwrap();
    let mut queue = UploadQueue::new(1024);

    stage(&mut queue, BLOG, "a.png", Some(upload(&dir, "a.png", b"a")));
    stage(
        &mut queue,
        "user/pages/blog/blocked",
        "b.png",
        Some(upload(&dir, "b.png", b"b")),
    );
    stage(&mut queue, BLOG, "c.png", Some(upload(&dir, "c.png", b"c")));

    let err = queue.commit(&ctx.ops, &ctx.index, false).unwrap_err();

    match &err {
        MediaError::Commit { key, source } => {
            assert_eq!(key, "hero:b.png");
            assert!(matches!(source.as_ref(), MediaError::Write { .. }));
        }
        other => panic!("expected commit error, got {other:?}"),
    }
    assert_eq!(err.translation_key(), "MEDIA.ERROR.WRITE");

    // A landed, C was never attempted
    assert!(blog(&ctx).join("a.png").exists());
    assert!(!blog(&ctx).join("c.png").exists());

    // B and C stay staged for a retry
    let remaining: Vec<&str> = queue.entries().iter().map(|e| e.filename.as_str()).collect();
    assert_eq!(remaining, vec!["b.png", "c.png"]);
    assert_eq!(queue.state(), QueueState::Dirty);
}

#[test]
fn test_commit_sanitizes_svg() {
    let (dir, ctx) = setup();
    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(1)</script><circle r="4"/></svg>"#;
    let mut queue = UploadQueue::new(1024);
    stage(&mut queue, BLOG, "icon.svg", Some(upload(&dir, "icon.svg", svg)));

    queue.commit(&ctx.ops, &ctx.index, true).unwrap();

    let cleaned = std::fs::read_to_string(blog(&ctx).join("icon.svg")).unwrap();
    assert!(!cleaned.contains("script"));
    assert!(cleaned.contains("circle"));
}

#[test]
fn test_failed_delete_stops_replay() {
    let (dir, ctx) = setup();
    let mut queue = UploadQueue::new(1024);

    stage(&mut queue, BLOG, "a.png", Some(upload(&dir, "a.png", b"a")));
    // Resolves outside the webroot
    stage(&mut queue, "../escape", "b.png", None);
    stage(&mut queue, BLOG, "c.png", Some(upload(&dir, "c.png", b"c")));

    let err = queue.commit(&ctx.ops, &ctx.index, false).unwrap_err();

    match err {
        MediaError::Commit { key, source } => {
            assert_eq!(key, "hero:b.png");
            assert!(matches!(*source, MediaError::BadDestination { .. }));
        }
        other => panic!("expected commit error, got {other:?}"),
    }
    assert!(blog(&ctx).join("a.png").exists());
    assert!(!blog(&ctx).join("c.png").exists());
    assert_eq!(queue.len(), 2);
}

#[test]
fn test_failed_unlink_stops_replay() {
    let (dir, ctx) = setup();
    std::fs::write(blog(&ctx).join("photo.jpg"), b"photo").unwrap();
    std::fs::write(blog(&ctx).join("photo@3x.jpg"), b"3x").unwrap();
    // A directory in the variant sweep cannot be unlinked
    std::fs::create_dir(blog(&ctx).join("photo@2x.jpg")).unwrap();
    let mut queue = UploadQueue::new(1024);

    stage(&mut queue, BLOG, "a.png", Some(upload(&dir, "a.png", b"a")));
    stage(&mut queue, BLOG, "photo.jpg", None);
    stage(&mut queue, BLOG, "c.png", Some(upload(&dir, "c.png", b"c")));

    let err = queue.commit(&ctx.ops, &ctx.index, false).unwrap_err();

    match &err {
        MediaError::Commit { key, source } => {
            assert_eq!(key, "hero:photo.jpg");
            match source.as_ref() {
                MediaError::Delete { path, .. } => assert!(path.ends_with("photo@2x.jpg")),
                other => panic!("expected delete error, got {other:?}"),
            }
        }
        other => panic!("expected commit error, got {other:?}"),
    }
    assert_eq!(err.translation_key(), "MEDIA.ERROR.DELETE");

    // Nothing applied is rolled back, nothing after the failure is attempted
    assert!(blog(&ctx).join("a.png").exists());
    assert!(!blog(&ctx).join("photo.jpg").exists());
    assert!(blog(&ctx).join("photo@3x.jpg").exists());
    assert!(!blog(&ctx).join("c.png").exists());
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.state(), QueueState::Dirty);
}
