use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::domain::DomainError;
use crate::domain::llm::{EngineLoader, LocalEngine, ProgressCallback};

/// Lazily initialized, session-scoped handle to the local engine.
///
/// The first `acquire` loads the model; concurrent callers wait on the load
/// lock and reuse the result, so the engine is constructed at most once per
/// successful load. A failed load leaves the slot empty. The ready handle sits
/// behind its own lock, so `is_ready` and `reset` never wait on a download.
pub struct EngineSlot {
    loader: Arc<dyn EngineLoader>,
    model_id: String,
    load_lock: Mutex<()>,
    engine: RwLock<Option<Arc<dyn LocalEngine>>>,
}

impl fmt::Debug for EngineSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSlot")
            .field("model_id", &self.model_id)
            .field("loader", &self.loader)
            .finish()
    }
}

impl EngineSlot {
    pub fn new(loader: Arc<dyn EngineLoader>, model_id: impl Into<String>) -> Self {
        Self {
            loader,
            model_id: model_id.into(),
            load_lock: Mutex::new(()),
            engine: RwLock::new(None),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub async fn acquire(
        &self,
        progress: Option<ProgressCallback>,
    ) -> Result<Arc<dyn LocalEngine>, DomainError> {
        if let Some(engine) = self.loaded().await {
            return Ok(engine);
        }

        let _loading = self.load_lock.lock().await;
        if let Some(engine) = self.loaded().await {
            return Ok(engine);
        }

        tracing::info!(model = %self.model_id, "Initializing local engine");

        let engine = self
            .loader
            .load(&self.model_id, progress)
            .await
            .map_err(|e| match e {
                DomainError::Initialization { .. } => e,
                other => DomainError::initialization("local", other.to_string()),
            })?;

        tracing::info!(model = %self.model_id, "Local engine ready");
        *self.engine.write().await = Some(Arc::clone(&engine));
        Ok(engine)
    }

    async fn loaded(&self) -> Option<Arc<dyn LocalEngine>> {
        self.engine.read().await.as_ref().map(Arc::clone)
    }

    pub async fn is_ready(&self) -> bool {
        self.engine.read().await.is_some()
    }

    /// Drop the loaded engine; the next acquire loads again.
    /// A load already in progress still completes and fills the slot.
    pub async fn reset(&self) {
        self.engine.write().await.take();
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::domain::llm::{EngineReply, GenerationParams, Message};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    pub struct StaticEngine {
        pub model: String,
        pub reply: Result<EngineReply, String>,
        pub seen: std::sync::Mutex<Vec<Vec<Message>>>,
    }

    impl StaticEngine {
        pub fn replying(model: &str, content: Option<&str>, prompt: u64, completion: u64) -> Self {
            Self {
                model: model.to_string(),
                reply: Ok(EngineReply {
                    content: content.map(str::to_string),
                    prompt_tokens: prompt,
                    completion_tokens: completion,
                }),
                seen: std::sync::Mutex::new(Vec::new()),
            }
        }

        pub fn failing(model: &str, message: &str) -> Self {
            Self {
                model: model.to_string(),
                reply: Err(message.to_string()),
                seen: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LocalEngine for StaticEngine {
        async fn complete(
            &self,
            messages: &[Message],
            _params: &GenerationParams,
        ) -> Result<EngineReply, DomainError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.reply.clone().map_err(DomainError::internal)
        }

        fn model_id(&self) -> &str {
            &self.model
        }
    }

    /// Loader that counts constructions and can be told to fail
    #[derive(Debug)]
    pub struct CountingLoader {
        pub loads: AtomicUsize,
        pub fail_first: AtomicUsize,
        pub delay: Duration,
        pub engine: Arc<StaticEngine>,
    }

    impl CountingLoader {
        pub fn new(engine: Arc<StaticEngine>) -> Self {
            Self {
                loads: AtomicUsize::new(0),
                fail_first: AtomicUsize::new(0),
                delay: Duration::from_millis(0),
                engine,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn failing_times(self, times: usize) -> Self {
            self.fail_first.store(times, Ordering::SeqCst);
            self
        }

        pub fn load_count(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EngineLoader for CountingLoader {
        async fn load(
            &self,
            model_id: &str,
            progress: Option<ProgressCallback>,
        ) -> Result<Arc<dyn LocalEngine>, DomainError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if let Some(report) = progress {
                report(&format!("loading {}", model_id));
            }
            tokio::time::sleep(self.delay).await;

            let remaining = self.fail_first.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_first.store(remaining - 1, Ordering::SeqCst);
                return Err(DomainError::internal("model download interrupted"));
            }

            Ok(self.engine.clone())
        }
    }
}
