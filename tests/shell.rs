//! End-to-end shell behaviour with scripted platform collaborators.

use std::{
    collections::{HashMap, VecDeque},
    fs,
    io::{self, Cursor, Read, Write},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use chrono::NaiveDate;
use scrawl::{
    error::EditorError,
    i18n::Messages,
    loader::MAX_CHARS,
    platform::{
        ContentResolver, DocumentPicker, FsResolver, Locator, Notifier, PickerUnavailable,
        SpeechError, SpeechRecognizer, SpeechReply,
    },
    shell::{Completion, Shell, ShellEvent},
    worker::{ui_channel, Worker},
};
use tempfile::TempDir;

// ── Fakes ─────────────────────────────────────────────────────────────────────

type Pick = Result<Option<Locator>, PickerUnavailable>;

#[derive(Default)]
struct FakePlatform {
    opens: VecDeque<Pick>,
    saves: VecDeque<Pick>,
    speech: VecDeque<Result<Vec<String>, SpeechError>>,
    /// Replies held back, to be answered (or dropped) by the test.
    held: Vec<SpeechReply>,
    hold_replies: bool,
    save_requests: Vec<(String, String)>,
    toasts: Vec<String>,
}

impl DocumentPicker for FakePlatform {
    fn pick_open(&mut self) -> Pick {
        self.opens.pop_front().unwrap_or(Ok(None))
    }

    fn pick_save(&mut self, suggested_name: &str, mime: &str) -> Pick {
        self.save_requests
            .push((suggested_name.to_owned(), mime.to_owned()));
        self.saves.pop_front().unwrap_or(Ok(None))
    }
}

impl SpeechRecognizer for FakePlatform {
    fn recognize(&mut self, reply: SpeechReply) {
        if self.hold_replies {
            self.held.push(reply);
        } else {
            reply.send(self.speech.pop_front().unwrap_or(Ok(Vec::new())));
        }
    }
}

impl Notifier for FakePlatform {
    fn toast(&mut self, message: &str) {
        self.toasts.push(message.to_owned());
    }
}

/// In-memory documents.  The locator `"no-stream"` yields no writable stream.
#[derive(Default)]
struct MemResolver {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    write_opens: AtomicUsize,
}

impl MemResolver {
    fn with(name: &str, content: &str) -> Self {
        let r = Self::default();
        r.files
            .lock()
            .unwrap()
            .insert(name.to_owned(), content.as_bytes().to_vec());
        r
    }

    fn content(&self, name: &str) -> Option<String> {
        let files = self.files.lock().unwrap();
        files.get(name).map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

struct MemWriter {
    name: String,
    buf: Vec<u8>,
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MemWriter {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        self.files.lock().unwrap().insert(self.name.clone(), buf);
    }
}

impl ContentResolver for MemResolver {
    fn open_read(&self, locator: &Locator) -> io::Result<Box<dyn Read + Send>> {
        let files = self.files.lock().unwrap();
        let bytes = files
            .get(locator.as_str())
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such document"))?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn open_write(&self, locator: &Locator) -> io::Result<Option<Box<dyn Write + Send>>> {
        self.write_opens.fetch_add(1, Ordering::SeqCst);
        if locator.as_str() == "no-stream" {
            return Ok(None);
        }
        Ok(Some(Box::new(MemWriter {
            name: locator.as_str().to_owned(),
            buf: Vec::new(),
            files: Arc::clone(&self.files),
        })))
    }
}

/// Every read panics.
struct Exploding;

impl Read for Exploding {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        panic!("reader exploded");
    }
}

/// `"boom"` opens a reader that panics; everything else defers to `inner`.
struct ExplodingResolver {
    inner: MemResolver,
}

impl ContentResolver for ExplodingResolver {
    fn open_read(&self, locator: &Locator) -> io::Result<Box<dyn Read + Send>> {
        if locator.as_str() == "boom" {
            return Ok(Box::new(Exploding));
        }
        self.inner.open_read(locator)
    }

    fn open_write(&self, locator: &Locator) -> io::Result<Option<Box<dyn Write + Send>>> {
        self.inner.open_write(locator)
    }
}

fn shell(platform: FakePlatform, resolver: Arc<dyn ContentResolver>) -> Shell<FakePlatform> {
    let worker = Worker::spawn("test-io").unwrap();
    Shell::new(
        platform,
        resolver,
        worker,
        ui_channel(|| {}),
        Arc::new(Messages::default()),
    )
}

fn noon() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 2)
        .and_then(|d| d.and_hms_opt(12, 30, 0))
        .unwrap()
}

// ── Open ──────────────────────────────────────────────────────────────────────

#[test]
fn open_loads_file_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("note.txt");
    fs::write(&path, "hello\nworld\n").unwrap();

    let mut platform = FakePlatform::default();
    platform.opens.push_back(Ok(Some(Locator::from(path.as_path()))));
    let mut sh = shell(platform, Arc::new(FsResolver));

    assert!(sh.open_document().is_some());
    let events = sh.wait_idle();

    assert!(matches!(events.as_slice(), [ShellEvent::Loaded]));
    assert_eq!(sh.document().text(), "hello\nworld\n");
    assert_eq!(sh.document().cursor(), 0);
    assert!(!sh.is_busy());
}

#[test]
fn oversize_file_shows_only_the_sentinel() {
    let big = format!("{}\n{}\n", "a".repeat(MAX_CHARS), "b");
    let resolver = Arc::new(MemResolver::with("big", &big));
    let mut platform = FakePlatform::default();
    platform.opens.push_back(Ok(Some(Locator::new("big"))));
    let mut sh = shell(platform, resolver);
    sh.document_mut().set_text("previous".to_owned());

    sh.open_document();
    sh.wait_idle();

    let expected = format!("{}\n\n", Messages::default().file_too_large);
    assert_eq!(sh.document().text(), expected);
}

#[test]
fn cancelled_open_changes_nothing() {
    let mut sh = shell(FakePlatform::default(), Arc::new(MemResolver::default()));
    sh.document_mut().set_text("keep me".to_owned());

    assert_eq!(sh.open_document(), None);
    assert!(sh.wait_idle().is_empty());
    assert_eq!(sh.document().text(), "keep me");
    assert!(sh.platform().toasts.is_empty());
}

#[test]
fn missing_picker_is_toasted() {
    let mut platform = FakePlatform::default();
    platform
        .opens
        .push_back(Err(PickerUnavailable("no file manager".to_owned())));
    let mut sh = shell(platform, Arc::new(MemResolver::default()));

    assert_eq!(sh.open_document(), None);
    assert_eq!(
        sh.platform().toasts,
        vec![Messages::default().need_external_fm]
    );
}

#[test]
fn missing_document_is_reported_not_loaded() {
    let mut platform = FakePlatform::default();
    platform.opens.push_back(Ok(Some(Locator::new("ghost"))));
    let mut sh = shell(platform, Arc::new(MemResolver::default()));
    sh.document_mut().set_text("untouched".to_owned());

    sh.open_document();
    let events = sh.wait_idle();

    match events.as_slice() {
        [ShellEvent::LoadFailed(EditorError::StreamNotFound { locator, source })] => {
            assert_eq!(locator.as_str(), "ghost");
            assert_eq!(source.kind(), io::ErrorKind::NotFound);
        }
        other => panic!("unexpected events {other:?}"),
    }
    assert_eq!(sh.document().text(), "untouched");
}

// ── Save ──────────────────────────────────────────────────────────────────────

#[test]
fn save_writes_buffer_to_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.txt");

    let mut platform = FakePlatform::default();
    platform.saves.push_back(Ok(Some(Locator::from(path.as_path()))));
    let mut sh = shell(platform, Arc::new(FsResolver));
    sh.document_mut().set_text("привет\nworld".to_owned());

    assert!(sh.save_document(&noon()).is_some());
    let events = sh.wait_idle();

    assert!(matches!(events.as_slice(), [ShellEvent::Saved(_)]));
    assert_eq!(fs::read_to_string(&path).unwrap(), "привет\nworld");
    assert_eq!(
        sh.platform().save_requests,
        vec![("2025-11-02_12-30.txt".to_owned(), "text/plain".to_owned())]
    );
}

#[test]
fn save_without_target_never_writes() {
    let resolver = Arc::new(MemResolver::default());
    let mut sh = shell(FakePlatform::default(), Arc::clone(&resolver) as Arc<dyn ContentResolver>);
    sh.document_mut().set_text("draft".to_owned());

    assert_eq!(sh.save_document(&noon()), None);
    assert!(sh.wait_idle().is_empty());
    assert_eq!(resolver.write_opens.load(Ordering::SeqCst), 0);
}

#[test]
fn save_without_output_stream_is_reported() {
    let mut platform = FakePlatform::default();
    platform.saves.push_back(Ok(Some(Locator::new("no-stream"))));
    let mut sh = shell(platform, Arc::new(MemResolver::default()));

    sh.save_document(&noon());
    let events = sh.wait_idle();

    assert!(matches!(
        events.as_slice(),
        [ShellEvent::SaveFailed(EditorError::NoOutputStream(_))]
    ));
}

#[test]
fn save_snapshot_is_taken_at_request_time() {
    let resolver = Arc::new(MemResolver::default());
    let mut platform = FakePlatform::default();
    platform.saves.push_back(Ok(Some(Locator::new("snap"))));
    let mut sh = shell(platform, Arc::clone(&resolver) as Arc<dyn ContentResolver>);
    sh.document_mut().set_text("first".to_owned());

    sh.save_document(&noon());
    sh.document_mut().set_text("second".to_owned());
    sh.wait_idle();

    assert_eq!(resolver.content("snap").as_deref(), Some("first"));
}

#[test]
fn load_and_save_run_in_request_order() {
    let resolver = Arc::new(MemResolver::with("in", "line one\n"));
    let mut platform = FakePlatform::default();
    platform.opens.push_back(Ok(Some(Locator::new("in"))));
    platform.saves.push_back(Ok(Some(Locator::new("out"))));
    let mut sh = shell(platform, Arc::clone(&resolver) as Arc<dyn ContentResolver>);

    let load = sh.open_document().unwrap();
    let events = sh.wait_idle();
    assert!(matches!(events.as_slice(), [ShellEvent::Loaded]));

    let save = sh.save_document(&noon()).unwrap();
    assert!(save > load);
    sh.wait_idle();

    assert_eq!(resolver.content("out").as_deref(), Some("line one\n"));
}

// ── Dictate ───────────────────────────────────────────────────────────────────

#[test]
fn dictation_inserts_first_candidate_at_cursor() {
    let mut platform = FakePlatform::default();
    platform
        .speech
        .push_back(Ok(vec!["brave new".to_owned(), "grave new".to_owned()]));
    let mut sh = shell(platform, Arc::new(MemResolver::default()));
    sh.document_mut().set_text("a world".to_owned());
    sh.document_mut().set_cursor(2);

    sh.dictate();
    let events = sh.wait_idle();
    assert!(matches!(events.as_slice(), [ShellEvent::Dictated]));
    assert_eq!(sh.document().text(), "a brave new world");
    assert_eq!(sh.document().cursor(), 12);
}

#[test]
fn dictation_lands_at_the_cursor_when_it_arrives() {
    let mut platform = FakePlatform::default();
    platform.hold_replies = true;
    let mut sh = shell(platform, Arc::new(MemResolver::default()));
    sh.document_mut().set_text("hello world".to_owned());

    sh.dictate();
    assert!(sh.is_busy());
    assert!(sh.pump().is_empty());

    // The user keeps editing while the recognizer listens.
    sh.document_mut().set_cursor(6);
    let reply = sh.platform_mut().held.pop().unwrap();
    std::thread::spawn(move || reply.send(Ok(vec!["big".to_owned()])))
        .join()
        .unwrap();

    let events = sh.wait_idle();
    assert!(matches!(events.as_slice(), [ShellEvent::Dictated]));
    assert_eq!(sh.document().text(), "hello big world");
    assert!(!sh.is_busy());
}

#[test]
fn unanswered_dictation_still_resolves() {
    let mut platform = FakePlatform::default();
    platform.hold_replies = true;
    let mut sh = shell(platform, Arc::new(MemResolver::default()));

    sh.dictate();
    sh.platform_mut().held.clear();

    assert!(sh.wait_idle().is_empty());
    assert!(!sh.is_busy());
    assert_eq!(sh.document().text(), "");
    assert!(sh.platform().toasts.is_empty());
}

#[test]
fn dictation_without_engine_is_toasted() {
    let mut platform = FakePlatform::default();
    platform
        .speech
        .push_back(Err(SpeechError::Unavailable("not installed".to_owned())));
    let mut sh = shell(platform, Arc::new(MemResolver::default()));

    sh.dictate();
    assert!(sh.wait_idle().is_empty());
    assert_eq!(
        sh.platform().toasts,
        vec![Messages::default().need_speech_engine]
    );
    assert_eq!(sh.document().text(), "");
}

#[test]
fn empty_or_failed_dictation_is_silent() {
    let mut platform = FakePlatform::default();
    platform.speech.push_back(Ok(Vec::new()));
    platform
        .speech
        .push_back(Err(SpeechError::Failed("no match".to_owned())));
    let mut sh = shell(platform, Arc::new(MemResolver::default()));

    sh.dictate();
    sh.dictate();
    assert!(sh.wait_idle().is_empty());
    assert!(sh.platform().toasts.is_empty());
    assert_eq!(sh.document().text(), "");
}

// ── Completions ───────────────────────────────────────────────────────────────

#[test]
fn panicking_load_fails_and_worker_keeps_going() {
    let resolver = Arc::new(ExplodingResolver {
        inner: MemResolver::with("fine", "after\n"),
    });
    let mut platform = FakePlatform::default();
    platform.opens.push_back(Ok(Some(Locator::new("boom"))));
    platform.opens.push_back(Ok(Some(Locator::new("fine"))));
    let mut sh = shell(platform, resolver);
    sh.document_mut().set_text("before".to_owned());

    assert!(sh.open_document().is_some());
    let events = sh.wait_idle();
    match events.as_slice() {
        [ShellEvent::LoadFailed(EditorError::JobPanicked(msg))] => {
            assert_eq!(msg, "reader exploded");
        }
        other => panic!("expected a panicked load, got {other:?}"),
    }
    assert!(!sh.is_busy());
    assert_eq!(sh.document().text(), "before");

    assert!(sh.open_document().is_some());
    let events = sh.wait_idle();
    assert!(matches!(events.as_slice(), [ShellEvent::Loaded]));
    assert_eq!(sh.document().text(), "after\n");
}

#[test]
fn stray_and_duplicate_completions_are_ignored() {
    let resolver = Arc::new(MemResolver::with("doc", "real\n"));
    let mut platform = FakePlatform::default();
    platform.opens.push_back(Ok(Some(Locator::new("doc"))));

    let (ui, queue) = ui_channel(|| {});
    let forged = ui.clone();
    let mut sh = Shell::new(
        platform,
        resolver as Arc<dyn ContentResolver>,
        Worker::spawn("test-io").unwrap(),
        (ui, queue),
        Arc::new(Messages::default()),
    );

    // Never requested.
    forged.post(Completion::Loaded { id: 999, text: "forged".to_owned() });
    assert!(sh.pump().is_empty());

    let id = sh.open_document().unwrap();
    sh.wait_idle();
    assert_eq!(sh.document().text(), "real\n");

    // Already resolved.
    forged.post(Completion::Loaded { id, text: "again".to_owned() });
    assert!(sh.pump().is_empty());
    assert_eq!(sh.document().text(), "real\n");
}
