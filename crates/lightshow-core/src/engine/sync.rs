//! Background synchronization loop.
//!
//! One loop thread runs per playback session. Each iteration reads the audio
//! clock, applies latency compensation and writes the relay bytes of the
//! frame at that position. The relays are only rewritten when the frame index
//! changes, so a paused song costs a clock read per iteration.

use super::EngineShared;
use lightshow_fseq::{DecodeError, SequenceDecoder};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Counts live loop threads; decremented when the loop exits for any reason.
struct LoopGuard<'a>(&'a AtomicUsize);

impl<'a> LoopGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Why the loop asked for the session to end.
enum Exit {
    Cancelled,
    SongEnded,
    Fault(String),
}

pub(super) fn run_sync_loop(
    shared: Arc<EngineShared>,
    session_id: u64,
    mut decoder: SequenceDecoder,
    cancel: Arc<AtomicBool>,
) {
    let _guard = LoopGuard::enter(&shared.active_loops);
    let timing = shared.timing;
    let step = decoder.step_time_ms() as u64;
    let mut last_index = None;

    let exit = loop {
        if cancel.load(Ordering::Acquire) {
            break Exit::Cancelled;
        }

        let (position, busy) = {
            let audio = shared.audio.lock();
            (audio.position(), audio.is_busy())
        };
        if !busy && !shared.paused.load(Ordering::Acquire) {
            break Exit::SongEnded;
        }

        let ms = timing.compensate(position.as_millis() as u64);
        let index = ms / step;
        if last_index != Some(index) {
            match decoder.frame_at_time_ms(ms) {
                Ok(frame) => {
                    if let Err(e) = shared.relays.apply_frame(frame.relay_bytes()) {
                        break Exit::Fault(format!("relay write failed: {e}"));
                    }
                }
                // Audio can run past the last frame; hold the final state
                Err(DecodeError::OutOfRange { .. }) => {}
                Err(e) => break Exit::Fault(format!("frame {index}: {e}")),
            }
            last_index = Some(index);
        }

        std::thread::sleep(timing.poll_interval());
    };

    match exit {
        Exit::Cancelled => log::debug!("sync loop {session_id} cancelled"),
        Exit::SongEnded => {
            log::info!("song finished, stopping session {session_id}");
            request_stop(&shared, session_id);
        }
        Exit::Fault(reason) => {
            log::error!("sync loop {session_id} failed: {reason}");
            *shared.fault.lock() = Some(reason);
            request_stop(&shared, session_id);
        }
    }
}

/// Stop `session_id` from a fresh thread; the loop thread cannot join itself.
///
/// The stop routine ignores the request if another stop or play already
/// replaced the session.
fn request_stop(shared: &Arc<EngineShared>, session_id: u64) {
    let shared = Arc::clone(shared);
    let spawned = std::thread::Builder::new()
        .name("lightshow-autostop".into())
        .spawn(move || {
            if let Err(e) = shared.stop_session(Some(session_id)) {
                log::error!("automatic stop of session {session_id} failed: {e}");
            }
        });
    if let Err(e) = spawned {
        log::error!("cannot spawn stop thread for session {session_id}: {e}");
    }
}
