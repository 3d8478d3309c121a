use crate::models::{AnswerId, QuestionId};
use crate::supplier::AnswerRecorder;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::thread;

/// One answered or timed-out question, as handed off by a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerEvent {
    pub question_id: QuestionId,
    pub was_correct: bool,
}

/// Where a session hands answer events. `submit` must not block.
pub trait AnswerSink: Send {
    fn submit(&self, event: AnswerEvent);
}

/// Sink for sessions whose answers should not be persisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardAnswers;

impl AnswerSink for DiscardAnswers {
    fn submit(&self, _event: AnswerEvent) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordReport {
    Recorded {
        question_id: QuestionId,
        answer_id: AnswerId,
    },
    Failed {
        question_id: QuestionId,
        error: String,
    },
}

/// Sending half of the answer worker's queue.
#[derive(Debug, Clone)]
pub struct RecorderHandle {
    tx: Sender<AnswerEvent>,
}

impl AnswerSink for RecorderHandle {
    fn submit(&self, event: AnswerEvent) {
        if self.tx.send(event).is_err() {
            log::warn!(
                "Answer worker is gone, dropping answer for question {}",
                event.question_id
            );
        }
    }
}

/// Starts the thread that persists answer events.
///
/// Each event is written once; failures are logged and reported on the
/// returned receiver but never retried. The worker exits once every
/// [`RecorderHandle`] has been dropped.
pub fn spawn_answer_worker<R>(
    recorder: R,
) -> std::io::Result<(RecorderHandle, Receiver<RecordReport>, thread::JoinHandle<()>)>
where
    R: AnswerRecorder + Send + 'static,
{
    let (event_tx, event_rx) = unbounded::<AnswerEvent>();
    let (report_tx, report_rx) = unbounded::<RecordReport>();

    let handle = thread::Builder::new()
        .name("themed-quiz::answer_worker".to_string())
        .spawn(move || {
            for event in event_rx.iter() {
                log::debug!(
                    "Worker recording answer for question {} (correct: {})",
                    event.question_id,
                    event.was_correct
                );

                let report = match recorder.record_answer(event.question_id, event.was_correct) {
                    Ok(answer_id) => RecordReport::Recorded {
                        question_id: event.question_id,
                        answer_id,
                    },
                    Err(e) => {
                        log::warn!(
                            "Failed to record answer for question {}: {}",
                            event.question_id,
                            e
                        );
                        RecordReport::Failed {
                            question_id: event.question_id,
                            error: e.to_string(),
                        }
                    }
                };

                // Nobody listening for reports is fine.
                let _ = report_tx.send(report);
            }
            log::debug!("Answer worker channel disconnected, exiting");
        })?;

    Ok((RecorderHandle { tx: event_tx }, report_rx, handle))
}
