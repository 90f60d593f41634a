use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// Tracks the tokens of executions that are currently in flight.
///
/// Each running request holds a `Registration`; dropping it removes the
/// token, so the registry only ever sees live work.
#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    active: Arc<Mutex<HashMap<Uuid, CancellationToken>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> Registration {
        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        self.active.lock().insert(id, token.clone());
        Registration {
            id,
            token,
            active: Arc::clone(&self.active),
        }
    }

    /// Trigger every live token. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let tokens: Vec<CancellationToken> = self.active.lock().values().cloned().collect();
        for token in &tokens {
            token.cancel();
        }
        if !tokens.is_empty() {
            info!("Cancelled {} running request(s)", tokens.len());
        }
        tokens.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}

pub struct Registration {
    id: Uuid,
    token: CancellationToken,
    active: Arc<Mutex<HashMap<Uuid, CancellationToken>>>,
}

impl Registration {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.active.lock().remove(&self.id);
    }
}
