//! Asset-loading listener protocol.
//!
//! Asset loaders report metadata through a fixed event prefix: duration,
//! then track count, then one registration per track, then the final
//! output format. The events may be produced on a decode worker while the
//! pipeline consumes them on its control thread, so the contract is
//! enforced here with an explicit state machine behind a mutex instead of
//! call-site discipline. An out-of-order event is a defect: it fails the
//! session and is reported, never silently tolerated.

use crate::error::{ExportError, Result};
use bitflags::bitflags;
use mediaforge_core::format::Format;
use mediaforge_core::time::DurationUs;
use parking_lot::Mutex;
use tracing::{debug, warn};

bitflags! {
    /// Output sample types an asset loader can produce for a track.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OutputTypes: u32 {
        /// Compressed samples, suitable for passthrough.
        const ENCODED = 0x0001;
        /// Decoded samples, suitable for processing and re-encoding.
        const DECODED = 0x0002;
    }
}

/// Downstream handle accepting samples once the output format is known.
pub trait SampleConsumer: Send {
    /// Queue one sample for the downstream pipeline stage.
    fn queue_sample(&mut self, timestamp_us: i64, data: &[u8]) -> Result<()>;

    /// Signal that no further samples will be queued.
    fn end_of_stream(&mut self) -> Result<()>;
}

/// Consumer-side callbacks for one asset-load session.
///
/// Callbacks are invoked in the order guaranteed by [`LoadSession`]; a
/// listener never observes a track registration before the duration and
/// track count, nor an output format before the last track registration.
pub trait AssetListener: Send {
    /// The resolved presentation duration, or unset for live/unbounded
    /// sources.
    fn on_duration(&mut self, duration: DurationUs);

    /// The number of tracks the loader will register.
    fn on_track_count(&mut self, track_count: usize);

    /// One track's input format and the output types that may be requested
    /// for it.
    fn on_track_added(&mut self, format: &Format, output_types: OutputTypes);

    /// The finalized output format. Returns the consumer that subsequent
    /// stages push samples into.
    fn on_output_format(&mut self, format: &Format) -> Result<Box<dyn SampleConsumer>>;

    /// The session failed; no further callbacks follow.
    fn on_error(&mut self, error: ExportError);
}

/// Protocol position of a load session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    NotStarted,
    DurationReported,
    TrackCountReported { expected: usize, added: usize },
    OutputFormatReady,
    Failed,
}

struct SessionInner<L: AssetListener> {
    phase: SessionPhase,
    listener: L,
}

/// One asset-load session enforcing the event-ordering contract.
///
/// Producer-side methods verify the transition, forward the callback while
/// holding the session guard (so the producer cannot advance before the
/// callback returns), and fail the session on any out-of-order event.
/// After a failure or an [`abort`](LoadSession::abort), exactly one
/// `on_error` has been delivered and every further event is rejected with
/// [`ExportError::SessionFailed`] without reaching the listener.
pub struct LoadSession<L: AssetListener> {
    inner: Mutex<SessionInner<L>>,
}

impl<L: AssetListener> LoadSession<L> {
    /// Create a session delivering to the given listener.
    pub fn new(listener: L) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                phase: SessionPhase::NotStarted,
                listener,
            }),
        }
    }

    /// Report the resolved duration. Must be the first event.
    pub fn duration_known(&self, duration: DurationUs) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.phase {
            SessionPhase::NotStarted => {
                inner.phase = SessionPhase::DurationReported;
                debug!(%duration, "load session: duration reported");
                inner.listener.on_duration(duration);
                Ok(())
            }
            SessionPhase::Failed => Err(Self::already_failed("duration")),
            _ => Err(Self::violate(&mut inner, "duration reported twice")),
        }
    }

    /// Report how many tracks will be registered. Must follow the duration.
    pub fn track_count_known(&self, track_count: usize) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.phase {
            SessionPhase::DurationReported => {
                if track_count == 0 {
                    return Err(Self::violate(&mut inner, "track count of zero reported"));
                }
                inner.phase = SessionPhase::TrackCountReported {
                    expected: track_count,
                    added: 0,
                };
                debug!(track_count, "load session: track count reported");
                inner.listener.on_track_count(track_count);
                Ok(())
            }
            SessionPhase::Failed => Err(Self::already_failed("track count")),
            SessionPhase::NotStarted => {
                Err(Self::violate(&mut inner, "track count reported before duration"))
            }
            _ => Err(Self::violate(&mut inner, "track count reported twice")),
        }
    }

    /// Register one track. Must follow the track count; one call per track,
    /// in any order among tracks.
    pub fn track_ready(&self, format: &Format, output_types: OutputTypes) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.phase {
            SessionPhase::TrackCountReported { expected, added } => {
                if output_types.is_empty() {
                    return Err(Self::violate(
                        &mut inner,
                        "track registered without any supported output type",
                    ));
                }
                if added == expected {
                    return Err(Self::violate(
                        &mut inner,
                        format!("more tracks registered than the {} reported", expected),
                    ));
                }
                inner.phase = SessionPhase::TrackCountReported {
                    expected,
                    added: added + 1,
                };
                debug!(
                    track = added + 1,
                    of = expected,
                    track_type = %format.track_type(),
                    "load session: track registered"
                );
                inner.listener.on_track_added(format, output_types);
                Ok(())
            }
            SessionPhase::Failed => Err(Self::already_failed("track registration")),
            _ => Err(Self::violate(
                &mut inner,
                "track registered without a preceding track count",
            )),
        }
    }

    /// Report the finalized output format. Must follow the last track
    /// registration; returns the listener's sample consumer.
    pub fn output_format_ready(&self, format: &Format) -> Result<Box<dyn SampleConsumer>> {
        let mut inner = self.inner.lock();
        match inner.phase {
            SessionPhase::TrackCountReported { expected, added } if added == expected => {
                match inner.listener.on_output_format(format) {
                    Ok(consumer) => {
                        inner.phase = SessionPhase::OutputFormatReady;
                        debug!("load session: output format ready");
                        Ok(consumer)
                    }
                    Err(err) => {
                        // The listener itself refused; it already knows, so
                        // the failure is not echoed back through on_error.
                        inner.phase = SessionPhase::Failed;
                        Err(err)
                    }
                }
            }
            SessionPhase::TrackCountReported { expected, added } => Err(Self::violate(
                &mut inner,
                format!(
                    "output format reported after {} of {} tracks",
                    added, expected
                ),
            )),
            SessionPhase::Failed => Err(Self::already_failed("output format")),
            SessionPhase::OutputFormatReady => {
                Err(Self::violate(&mut inner, "output format reported twice"))
            }
            _ => Err(Self::violate(
                &mut inner,
                "output format reported before any track",
            )),
        }
    }

    /// Fail the session, delivering exactly one error event.
    ///
    /// Allowed from any live phase, including after the output format:
    /// sample processing continues past the metadata prefix and its errors
    /// are funneled through the same channel.
    pub fn fail(&self, error: ExportError) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.phase == SessionPhase::Failed {
            return Err(Self::already_failed("failure event"));
        }
        warn!(%error, "load session failed");
        inner.phase = SessionPhase::Failed;
        inner.listener.on_error(error);
        Ok(())
    }

    /// Abort the session. Partial registration is a valid terminal outcome;
    /// exactly one failure event is delivered and nothing follows it.
    pub fn abort(&self, reason: impl Into<String>) -> Result<()> {
        self.fail(ExportError::Aborted(reason.into()))
    }

    /// Whether the session has failed or been aborted.
    pub fn is_failed(&self) -> bool {
        self.inner.lock().phase == SessionPhase::Failed
    }

    /// Whether the full event prefix has been delivered.
    pub fn is_complete(&self) -> bool {
        self.inner.lock().phase == SessionPhase::OutputFormatReady
    }

    fn violate(inner: &mut SessionInner<L>, message: impl Into<String>) -> ExportError {
        let message = message.into();
        warn!(%message, "asset-load protocol violated");
        inner.phase = SessionPhase::Failed;
        inner.listener.on_error(ExportError::protocol(message.clone()));
        ExportError::protocol(message)
    }

    fn already_failed(event: &str) -> ExportError {
        ExportError::SessionFailed(format!("{} delivered after failure", event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaforge_core::format::{AudioCodec, VideoCodec};
    use std::sync::Arc;

    #[derive(Default)]
    struct NullConsumer;

    impl SampleConsumer for NullConsumer {
        fn queue_sample(&mut self, _timestamp_us: i64, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        fn end_of_stream(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingListener {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingListener {
        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }
    }

    impl AssetListener for RecordingListener {
        fn on_duration(&mut self, duration: DurationUs) {
            self.events.lock().push(format!("duration:{}", duration.value));
        }

        fn on_track_count(&mut self, track_count: usize) {
            self.events.lock().push(format!("count:{}", track_count));
        }

        fn on_track_added(&mut self, format: &Format, _output_types: OutputTypes) {
            self.events
                .lock()
                .push(format!("track:{}", format.track_type()));
        }

        fn on_output_format(&mut self, _format: &Format) -> Result<Box<dyn SampleConsumer>> {
            self.events.lock().push("output".into());
            Ok(Box::new(NullConsumer))
        }

        fn on_error(&mut self, error: ExportError) {
            self.events.lock().push(format!("error:{}", error));
        }
    }

    fn video() -> Format {
        Format::video(VideoCodec::H264, 1920, 1080)
    }

    fn audio() -> Format {
        Format::audio(AudioCodec::Aac, 48_000, 2)
    }

    #[test]
    fn test_ordered_session_delivers_everything() {
        let listener = RecordingListener::default();
        let events = listener.clone();
        let session = LoadSession::new(listener);

        session
            .duration_known(DurationUs::from_micros(5_000_000))
            .unwrap();
        session.track_count_known(2).unwrap();
        session
            .track_ready(&video(), OutputTypes::ENCODED | OutputTypes::DECODED)
            .unwrap();
        session.track_ready(&audio(), OutputTypes::ENCODED).unwrap();
        let mut consumer = session.output_format_ready(&video()).unwrap();
        consumer.queue_sample(0, &[0u8; 4]).unwrap();
        consumer.end_of_stream().unwrap();

        assert!(session.is_complete());
        assert_eq!(
            events.events(),
            vec![
                "duration:5000000",
                "count:2",
                "track:Video",
                "track:Audio",
                "output"
            ]
        );
    }

    #[test]
    fn test_unset_duration_is_allowed_first() {
        let session = LoadSession::new(RecordingListener::default());
        session.duration_known(DurationUs::unset()).unwrap();
        session.track_count_known(1).unwrap();
    }

    #[test]
    fn test_track_before_duration_is_violation() {
        let listener = RecordingListener::default();
        let events = listener.clone();
        let session = LoadSession::new(listener);

        let err = session
            .track_ready(&video(), OutputTypes::ENCODED)
            .unwrap_err();
        assert!(err.is_protocol_violation());
        assert!(session.is_failed());

        // The violation reached the listener exactly once.
        let recorded = events.events();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].starts_with("error:"));
    }

    #[test]
    fn test_track_count_before_duration_is_violation() {
        let session = LoadSession::new(RecordingListener::default());
        assert!(session.track_count_known(2).unwrap_err().is_protocol_violation());
    }

    #[test]
    fn test_duration_reported_twice_is_violation() {
        let session = LoadSession::new(RecordingListener::default());
        session.duration_known(DurationUs::zero()).unwrap();
        assert!(session
            .duration_known(DurationUs::zero())
            .unwrap_err()
            .is_protocol_violation());
    }

    #[test]
    fn test_zero_track_count_is_violation() {
        let session = LoadSession::new(RecordingListener::default());
        session.duration_known(DurationUs::zero()).unwrap();
        assert!(session.track_count_known(0).unwrap_err().is_protocol_violation());
    }

    #[test]
    fn test_extra_track_is_violation() {
        let session = LoadSession::new(RecordingListener::default());
        session.duration_known(DurationUs::zero()).unwrap();
        session.track_count_known(1).unwrap();
        session.track_ready(&video(), OutputTypes::ENCODED).unwrap();
        assert!(session
            .track_ready(&audio(), OutputTypes::ENCODED)
            .unwrap_err()
            .is_protocol_violation());
    }

    #[test]
    fn test_empty_output_types_is_violation() {
        let session = LoadSession::new(RecordingListener::default());
        session.duration_known(DurationUs::zero()).unwrap();
        session.track_count_known(1).unwrap();
        assert!(session
            .track_ready(&video(), OutputTypes::empty())
            .unwrap_err()
            .is_protocol_violation());
    }

    #[test]
    fn test_output_format_before_last_track_is_violation() {
        let session = LoadSession::new(RecordingListener::default());
        session.duration_known(DurationUs::zero()).unwrap();
        session.track_count_known(2).unwrap();
        session.track_ready(&video(), OutputTypes::ENCODED).unwrap();
        assert!(session
            .output_format_ready(&video())
            .err()
            .unwrap()
            .is_protocol_violation());
    }

    #[test]
    fn test_abort_delivers_one_error_then_rejects() {
        let listener = RecordingListener::default();
        let events = listener.clone();
        let session = LoadSession::new(listener);

        session.duration_known(DurationUs::zero()).unwrap();
        session.track_count_known(2).unwrap();
        session.track_ready(&video(), OutputTypes::ENCODED).unwrap();

        // Abort with only one of two tracks registered: valid terminal state.
        session.abort("user cancelled").unwrap();
        assert!(session.is_failed());

        // Nothing further is delivered, including a second failure.
        assert!(matches!(
            session.track_ready(&audio(), OutputTypes::ENCODED),
            Err(ExportError::SessionFailed(_))
        ));
        assert!(matches!(
            session.abort("again"),
            Err(ExportError::SessionFailed(_))
        ));

        let recorded = events.events();
        assert_eq!(recorded.len(), 4);
        assert!(recorded[3].starts_with("error:"));
    }

    #[test]
    fn test_producer_thread_delivery_order() {
        let listener = RecordingListener::default();
        let events = listener.clone();
        let session = Arc::new(LoadSession::new(listener));

        let producer = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                session.duration_known(DurationUs::from_micros(1)).unwrap();
                session.track_count_known(1).unwrap();
                session.track_ready(&video(), OutputTypes::DECODED).unwrap();
                session.output_format_ready(&video()).unwrap();
            })
        };
        producer.join().unwrap();

        assert!(session.is_complete());
        assert_eq!(
            events.events(),
            vec!["duration:1", "count:1", "track:Video", "output"]
        );
    }

    #[test]
    fn test_listener_rejecting_output_format_fails_session() {
        struct RejectingListener;

        impl AssetListener for RejectingListener {
            fn on_duration(&mut self, _duration: DurationUs) {}
            fn on_track_count(&mut self, _track_count: usize) {}
            fn on_track_added(&mut self, _format: &Format, _output_types: OutputTypes) {}
            fn on_output_format(&mut self, _format: &Format) -> Result<Box<dyn SampleConsumer>> {
                Err(ExportError::Consumer("no muxer slot left".into()))
            }
            fn on_error(&mut self, _error: ExportError) {
                panic!("listener-originated failure must not be echoed back");
            }
        }

        let session = LoadSession::new(RejectingListener);
        session.duration_known(DurationUs::zero()).unwrap();
        session.track_count_known(1).unwrap();
        session.track_ready(&video(), OutputTypes::DECODED).unwrap();
        assert!(matches!(
            session.output_format_ready(&video()),
            Err(ExportError::Consumer(_))
        ));
        assert!(session.is_failed());
    }
}
