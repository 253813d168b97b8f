// ── Dictation ─────────────────────────────────────────────────────────────────
//
// One-shot free-form recognition through `Windows.Media.SpeechRecognition`.
// The default recognizer constraint is the dictation grammar.
//
// Recognition runs on its own detached thread because the WinRT calls block.
// The UI thread keeps pumping messages; the outcome comes back through the
// reply, which posts it to the UI queue.

use std::thread;

use windows::Media::SpeechRecognition::{SpeechRecognitionResultStatus, SpeechRecognizer};

use crate::platform::{SpeechError, SpeechReply};

/// Start listening once and return immediately.
///
/// If the thread cannot start, or panics, the dropped reply answers with a
/// failure.
pub(crate) fn recognize(reply: SpeechReply) {
    let spawned = thread::Builder::new()
        .name("scrawl-speech".to_owned())
        .spawn(move || reply.send(listen()));
    if let Err(e) = spawned {
        log::error!("speech thread not started: {e}");
    }
}

fn listen() -> Result<Vec<String>, SpeechError> {
    let unavailable = |e: windows::core::Error| SpeechError::Unavailable(e.message());
    let failed = |e: windows::core::Error| SpeechError::Failed(e.message());

    // Missing language packs and a declined speech privacy policy both fail
    // here, before any audio is captured.
    let recognizer = SpeechRecognizer::new().map_err(unavailable)?;
    let compiled = recognizer
        .CompileConstraintsAsync()
        .and_then(|op| op.get())
        .map_err(unavailable)?;
    let status = compiled.Status().map_err(unavailable)?;
    if status != SpeechRecognitionResultStatus::Success {
        return Err(SpeechError::Unavailable(format!(
            "constraint compilation returned {status:?}"
        )));
    }

    let result = recognizer
        .RecognizeAsync()
        .and_then(|op| op.get())
        .map_err(failed)?;
    let status = result.Status().map_err(failed)?;
    if status == SpeechRecognitionResultStatus::UserCanceled {
        return Ok(Vec::new());
    }
    if status != SpeechRecognitionResultStatus::Success {
        return Err(SpeechError::Failed(format!("recognition returned {status:?}")));
    }

    let text = result.Text().map_err(failed)?.to_string();
    Ok(if text.is_empty() { Vec::new() } else { vec![text] })
}
