use crate::lock::lock_id_for;
use aya_core::AyaError;
use aya_runtime_state::RuntimeStateRepository;
use std::future::Future;

/// Runs `work` only if this replica wins the advisory lock keyed by
/// `worker_name`. Releases the lock on every exit path,
/// including when `work` returns an error. Returns `Ok(None)` without
/// running `work` if the lock isn't acquired: "lock not
/// acquired" is not an error, just "another replica is doing it".
pub async fn with_leader_lock<T, F, Fut>(
    runtime_state: &dyn RuntimeStateRepository,
    worker_name: &str,
    work: F,
) -> Result<Option<T>, AyaError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, AyaError>>,
{
    let lock_id = lock_id_for(worker_name);
    if !runtime_state.try_lock(lock_id).await? {
        #[cfg(feature = "tracing")]
        tracing::debug!(worker = worker_name, "advisory lock held elsewhere, skipping cycle");
        return Ok(None);
    }

    let result = work().await;
    runtime_state.release_lock(lock_id).await?;
    result.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aya_runtime_state::RuntimeStateEntry;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeState {
        locked: Mutex<Option<i64>>,
    }

    #[async_trait]
    impl RuntimeStateRepository for FakeState {
        async fn get(&self, _key: &str) -> Result<Option<String>, AyaError> {
            Ok(None)
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<(), AyaError> {
            Ok(())
        }
        async fn remove(&self, _key: &str) -> Result<(), AyaError> {
            Ok(())
        }
        async fn list_by_prefix(&self, _prefix: &str) -> Result<Vec<RuntimeStateEntry>, AyaError> {
            Ok(vec![])
        }
        async fn get_time(&self, _key: &str) -> Result<Option<DateTime<Utc>>, AyaError> {
            Ok(None)
        }
        async fn set_time(&self, _key: &str, _value: DateTime<Utc>) -> Result<(), AyaError> {
            Ok(())
        }
        async fn try_lock(&self, id: i64) -> Result<bool, AyaError> {
            let mut locked = self.locked.lock().unwrap();
            if locked.is_some() {
                Ok(false)
            } else {
                *locked = Some(id);
                Ok(true)
            }
        }
        async fn release_lock(&self, id: i64) -> Result<(), AyaError> {
            let mut locked = self.locked.lock().unwrap();
            if *locked == Some(id) {
                *locked = None;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn lock_is_released_after_successful_work() {
        let state = FakeState::default();
        let ran = AtomicBool::new(false);
        let result = with_leader_lock(&state, "w", || async {
            ran.store(true, Ordering::SeqCst);
            Ok::<_, AyaError>(42)
        })
        .await
        .unwrap();

        assert_eq!(result, Some(42));
        assert!(ran.load(Ordering::SeqCst));
        assert!(state.locked.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn lock_is_released_even_when_work_errors() {
        let state = FakeState::default();
        let result = with_leader_lock(&state, "w", || async {
            Err::<(), _>(AyaError::Invariant("boom".into()))
        })
        .await;

        assert!(result.is_err());
        assert!(state.locked.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn lock_held_elsewhere_skips_work() {
        let state = FakeState::default();
        state.locked.lock().unwrap().replace(lock_id_for("w"));

        let ran = AtomicBool::new(false);
        let result = with_leader_lock(&state, "w", || async {
            ran.store(true, Ordering::SeqCst);
            Ok::<_, AyaError>(())
        })
        .await
        .unwrap();

        assert!(result.is_none());
        assert!(!ran.load(Ordering::SeqCst));
    }
}
