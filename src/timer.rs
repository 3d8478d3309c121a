use crate::session::{Phase, QuestionToken, QuizSession, Step};
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// Async-safe wrapper that serializes every event sent to a [`QuizSession`].
#[derive(Debug)]
pub struct SharedQuizSession<R = StdRng> {
    inner: Arc<Mutex<QuizSession<R>>>,
}

impl<R> Clone for SharedQuizSession<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> SharedQuizSession<R> {
    pub fn new(session: QuizSession<R>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Exclusive access for the duration of one event.
    pub async fn lock(&self) -> MutexGuard<'_, QuizSession<R>> {
        self.inner.lock().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { remaining: u32 },
    /// The question ran out of time and has been logged as timed out.
    Expired,
}

/// Ticks the current question once per period until it is answered, expires,
/// or the timer is dropped.
#[derive(Debug)]
pub struct QuestionTimer {
    handle: JoinHandle<()>,
}

impl QuestionTimer {
    /// Returns `None` when the session is untimed or its current question is
    /// not waiting for an answer.
    pub async fn start<R>(
        session: SharedQuizSession<R>,
        period: Duration,
        events: mpsc::UnboundedSender<TimerEvent>,
    ) -> Option<Self>
    where
        R: Rng + Send + 'static,
    {
        let token = {
            let guard = session.lock().await;
            guard.remaining_time()?;
            guard.question_token()?
        };

        let handle = tokio::spawn(run_timer(session, token, period, events));
        Some(Self { handle })
    }

    pub fn cancel(self) {
        // Drop aborts the task.
    }
}

impl Drop for QuestionTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run_timer<R: Rng>(
    session: SharedQuizSession<R>,
    token: QuestionToken,
    period: Duration,
    events: mpsc::UnboundedSender<TimerEvent>,
) {
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;

        let mut guard = session.lock().await;
        if guard.question_token() != Some(token) {
            log::debug!("Timer for a finished question stopped");
            return;
        }

        let snapshot = match guard.tick() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Timer tick rejected: {}", e);
                return;
            }
        };
        drop(guard);

        if snapshot.phase == Phase::InProgress(Step::Answered) {
            let _ = events.send(TimerEvent::Expired);
            return;
        }
        if let Some(remaining) = snapshot.remaining_time
            && events.send(TimerEvent::Tick { remaining }).is_err()
        {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Choice, SessionConfig};
    use crate::session::tests::{question, CollectingSink, StaticSupplier};
    use rand::SeedableRng;
    use std::num::NonZeroU32;

    fn shared(time_limit: Option<u32>) -> SharedQuizSession {
        let config = SessionConfig {
            theme_id: 1,
            question_count: 2,
            time_limit: time_limit.and_then(NonZeroU32::new),
        };
        let session = QuizSession::start_with_rng(
            config,
            &StaticSupplier(vec![question(1, 3, 1), question(2, 3, 2)]),
            CollectingSink::default(),
            StdRng::seed_from_u64(5),
        )
        .unwrap();
        SharedQuizSession::new(session)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_expires_question_once() {
        let session = shared(Some(3));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let timer = QuestionTimer::start(session.clone(), Duration::from_secs(1), tx)
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(TimerEvent::Tick { remaining: 2 }));
        assert_eq!(rx.recv().await, Some(TimerEvent::Tick { remaining: 1 }));
        assert_eq!(rx.recv().await, Some(TimerEvent::Expired));
        // The sender is dropped when the task ends.
        assert_eq!(rx.recv().await, None);
        drop(timer);

        let guard = session.lock().await;
        assert_eq!(guard.answer_log().len(), 1);
        assert_eq!(guard.answer_log()[0].chosen, Choice::TimedOut);
        assert_eq!(guard.remaining_time(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_answered_question_stops_timer() {
        let session = shared(Some(3));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _timer = QuestionTimer::start(session.clone(), Duration::from_secs(1), tx)
            .await
            .unwrap();
        assert_eq!(rx.recv().await, Some(TimerEvent::Tick { remaining: 2 }));

        session.lock().await.submit_answer(0).unwrap();

        // The stale timer wakes up, sees the answer and exits without ticking.
        assert_eq!(rx.recv().await, None);

        let guard = session.lock().await;
        assert_eq!(guard.answer_log().len(), 1);
        assert_eq!(guard.answer_log()[0].chosen, Choice::Alternative(0));
        assert_eq!(guard.remaining_time(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_timer_cancels_ticks() {
        let session = shared(Some(3));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let timer = QuestionTimer::start(session.clone(), Duration::from_secs(1), tx)
            .await
            .unwrap();
        timer.cancel();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(rx.recv().await, None);
        assert_eq!(session.lock().await.remaining_time(), Some(3));
    }

    #[tokio::test]
    async fn test_untimed_session_has_no_timer() {
        let session = shared(None);
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(
            QuestionTimer::start(session, Duration::from_secs(1), tx)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_answered_question_has_no_timer() {
        let session = shared(Some(3));
        session.lock().await.submit_answer(1).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(
            QuestionTimer::start(session, Duration::from_secs(1), tx)
                .await
                .is_none()
        );
    }
}
