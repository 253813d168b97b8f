// ── Editor shell ──────────────────────────────────────────────────────────────
//
// A single `Shell` is created on startup and owned by the front end for the
// lifetime of the main screen.  It owns the document and is only ever touched
// on the UI thread; load/save I/O is shipped to the worker and the results come
// back as `Completion`s through the UI queue.
//
// Every failure is handled here.  Nothing propagates to the caller as an
// `Err`; instead `pump` reports `ShellEvent`s and the front end decides what
// the user sees.

use std::{collections::HashMap, io::Write, sync::Arc};

use chrono::NaiveDateTime;

use crate::{
    document::Document,
    error::{EditorError, Result},
    i18n::Messages,
    loader::{self, MAX_CHARS},
    platform::{
        ContentResolver, Locator, Platform, SpeechError, SpeechOutcome, SpeechReply,
        PLAIN_TEXT_MIME,
    },
    worker::{self, UiHandle, UiQueue, Worker},
};

/// Identifies one load, save or dictation request.
pub type RequestId = u64;

// ── Messages between threads ──────────────────────────────────────────────────

/// Result of a worker job, posted to the UI thread.
#[derive(Debug)]
pub enum Completion {
    Loaded { id: RequestId, text: String },
    Saved { id: RequestId, locator: Locator },
    Failed { id: RequestId, error: EditorError },
    Dictated { id: RequestId, outcome: SpeechOutcome },
}

impl Completion {
    pub fn id(&self) -> RequestId {
        match self {
            Self::Loaded { id, .. }
            | Self::Saved { id, .. }
            | Self::Failed { id, .. }
            | Self::Dictated { id, .. } => *id,
        }
    }
}

/// What happened, for the front end to present.
#[derive(Debug)]
pub enum ShellEvent {
    /// The document buffer now holds newly loaded text.
    Loaded,
    Saved(Locator),
    /// A transcript was inserted at the cursor.
    Dictated,
    LoadFailed(EditorError),
    SaveFailed(EditorError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Load,
    Save,
    Dictate,
}

// ── Save naming ───────────────────────────────────────────────────────────────

/// Default "Save As" name: the current time as `yyyy-MM-dd_HH-mm.txt`.
pub fn suggested_file_name(now: &NaiveDateTime) -> String {
    format!("{}.txt", now.format("%Y-%m-%d_%H-%M"))
}

// ── Shell ─────────────────────────────────────────────────────────────────────

pub struct Shell<P> {
    platform: P,
    resolver: Arc<dyn ContentResolver>,
    worker: Worker,
    ui: UiHandle<Completion>,
    queue: UiQueue<Completion>,
    messages: Arc<Messages>,
    document: Document,
    next_id: RequestId,
    pending: HashMap<RequestId, RequestKind>,
    /// Failures raised on the UI thread, reported by the next `pump`.
    deferred: Vec<ShellEvent>,
}

impl<P: Platform> Shell<P> {
    /// Build the shell around an already-running worker and a UI queue whose
    /// wake callback nudges the front end's loop.
    pub fn new(
        platform: P,
        resolver: Arc<dyn ContentResolver>,
        worker: Worker,
        channel: (UiHandle<Completion>, UiQueue<Completion>),
        messages: Arc<Messages>,
    ) -> Self {
        let (ui, queue) = channel;
        Self {
            platform,
            resolver,
            worker,
            ui,
            queue,
            messages,
            document: Document::new(),
            next_id: 1,
            pending: HashMap::new(),
            deferred: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// `true` while a load, save or dictation is in flight.
    pub fn is_busy(&self) -> bool {
        !self.pending.is_empty()
    }

    // ── Open ──────────────────────────────────────────────────────────────────

    /// "Open": pick a document and load it in the background.
    ///
    /// A cancelled picker is a no-op.  A missing picker is reported as a
    /// toast.
    pub fn open_document(&mut self) -> Option<RequestId> {
        match self.platform.pick_open() {
            Ok(Some(locator)) => self.begin_load(locator),
            Ok(None) => {
                log::debug!("open cancelled");
                None
            }
            Err(e) => {
                log::warn!("{e}");
                let msg = self.messages.need_external_fm.clone();
                self.platform.toast(&msg);
                None
            }
        }
    }

    /// Load `locator` on the worker.  The text replaces the document when the
    /// completion is pumped.
    pub fn begin_load(&mut self, locator: Locator) -> Option<RequestId> {
        let id = self.allocate(RequestKind::Load);
        let resolver = Arc::clone(&self.resolver);
        let messages = Arc::clone(&self.messages);
        let ui = self.ui.clone();

        log::info!("loading {locator} (request {id})");
        let queued = self.worker.execute(move || {
            let completion = worker::catch_panic(|| match resolver.open_read(&locator) {
                Ok(stream) => Completion::Loaded {
                    id,
                    text: loader::read_text(stream, MAX_CHARS, &messages),
                },
                Err(source) => Completion::Failed {
                    id,
                    error: EditorError::StreamNotFound { locator, source },
                },
            })
            .unwrap_or_else(|msg| Completion::Failed {
                id,
                error: EditorError::JobPanicked(msg),
            });
            ui.post(completion);
        });
        self.submitted(id, RequestKind::Load, queued)
    }

    // ── Save ──────────────────────────────────────────────────────────────────

    /// "Save As": pick a target, suggesting a name built from `now`, and
    /// write the current text in the background.
    ///
    /// No target means no write.
    pub fn save_document(&mut self, now: &NaiveDateTime) -> Option<RequestId> {
        let suggested = suggested_file_name(now);
        match self.platform.pick_save(&suggested, PLAIN_TEXT_MIME) {
            Ok(Some(locator)) => {
                let bytes = self.document.to_bytes();
                self.begin_save(locator, bytes)
            }
            Ok(None) => {
                log::debug!("save cancelled");
                None
            }
            Err(e) => {
                log::warn!("{e}");
                let msg = self.messages.need_external_fm.clone();
                self.platform.toast(&msg);
                None
            }
        }
    }

    /// Write `bytes` to `locator` on the worker.
    pub fn begin_save(&mut self, locator: Locator, bytes: Vec<u8>) -> Option<RequestId> {
        let id = self.allocate(RequestKind::Save);
        let resolver = Arc::clone(&self.resolver);
        let ui = self.ui.clone();

        log::info!("saving {} bytes to {locator} (request {id})", bytes.len());
        let queued = self.worker.execute(move || {
            let completion =
                worker::catch_panic(|| match write_document(resolver.as_ref(), &locator, &bytes) {
                    Ok(()) => Completion::Saved { id, locator },
                    Err(error) => Completion::Failed { id, error },
                })
                .unwrap_or_else(|msg| Completion::Failed {
                    id,
                    error: EditorError::JobPanicked(msg),
                });
            ui.post(completion);
        });
        self.submitted(id, RequestKind::Save, queued)
    }

    // ── Dictate ───────────────────────────────────────────────────────────────

    /// "Dictate": listen once; the best transcript plus a space goes in at
    /// the cursor when the completion is pumped.
    pub fn dictate(&mut self) -> RequestId {
        let id = self.allocate(RequestKind::Dictate);
        let ui = self.ui.clone();

        log::info!("dictation started (request {id})");
        self.platform.recognize(SpeechReply::new(move |outcome| {
            ui.post(Completion::Dictated { id, outcome });
        }));
        id
    }

    fn insert_transcript(&mut self, id: RequestId, outcome: SpeechOutcome) -> Option<ShellEvent> {
        match outcome {
            Ok(candidates) => match candidates.into_iter().next() {
                Some(best) => {
                    self.document.insert_at_cursor(&format!("{best} "));
                    Some(ShellEvent::Dictated)
                }
                None => {
                    log::info!("request {id}: no transcript");
                    None
                }
            },
            Err(e @ SpeechError::Unavailable(_)) => {
                log::warn!("request {id}: {e}");
                let msg = self.messages.need_speech_engine.clone();
                self.platform.toast(&msg);
                None
            }
            Err(e @ SpeechError::Failed(_)) => {
                log::error!("request {id}: {e}");
                None
            }
        }
    }

    // ── Completions ───────────────────────────────────────────────────────────

    /// Apply every completion that has arrived, without blocking.
    pub fn pump(&mut self) -> Vec<ShellEvent> {
        let mut events = std::mem::take(&mut self.deferred);
        let arrived: Vec<Completion> = self.queue.drain().collect();
        events.extend(arrived.into_iter().filter_map(|c| self.apply(c)));
        events
    }

    /// Block until every in-flight request has completed, applying each.
    pub fn wait_idle(&mut self) -> Vec<ShellEvent> {
        let mut events = self.pump();
        while self.is_busy() {
            let Some(completion) = self.queue.wait() else {
                break;
            };
            events.extend(self.apply(completion));
        }
        events
    }

    fn apply(&mut self, completion: Completion) -> Option<ShellEvent> {
        let id = completion.id();
        let Some(kind) = self.pending.remove(&id) else {
            log::warn!("ignoring completion for unknown or finished request {id}");
            return None;
        };

        match completion {
            Completion::Loaded { text, .. } => {
                log::info!("request {id}: loaded {} chars", text.chars().count());
                self.document.set_text(text);
                Some(ShellEvent::Loaded)
            }
            Completion::Saved { locator, .. } => {
                log::info!("request {id}: saved {locator}");
                Some(ShellEvent::Saved(locator))
            }
            Completion::Dictated { outcome, .. } => self.insert_transcript(id, outcome),
            Completion::Failed { error, .. } => {
                log::error!("request {id}: {error}");
                match kind {
                    RequestKind::Load => Some(ShellEvent::LoadFailed(error)),
                    RequestKind::Save => Some(ShellEvent::SaveFailed(error)),
                    RequestKind::Dictate => None,
                }
            }
        }
    }

    // ── Request bookkeeping ───────────────────────────────────────────────────

    fn allocate(&mut self, kind: RequestKind) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert(id, kind);
        id
    }

    fn submitted(
        &mut self,
        id: RequestId,
        kind: RequestKind,
        queued: Result<()>,
    ) -> Option<RequestId> {
        match queued {
            Ok(()) => Some(id),
            Err(error) => {
                log::error!("request {id} not queued: {error}");
                self.pending.remove(&id);
                self.deferred.extend(match kind {
                    RequestKind::Load => Some(ShellEvent::LoadFailed(error)),
                    RequestKind::Save => Some(ShellEvent::SaveFailed(error)),
                    RequestKind::Dictate => None,
                });
                None
            }
        }
    }
}

/// Open, write, flush and close the save target.  Runs on the worker.
fn write_document(resolver: &dyn ContentResolver, locator: &Locator, bytes: &[u8]) -> Result<()> {
    let mut out = resolver
        .open_write(locator)?
        .ok_or_else(|| EditorError::NoOutputStream(locator.clone()))?;
    out.write_all(bytes)?;
    out.flush()?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
