use async_trait::async_trait;

/// Front-end hook that asks the user to approve a command.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn ask(&self, description: &str) -> bool;
}

/// Fixed answer, for non-interactive hosts and tests.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn ask(&self, _description: &str) -> bool {
        self.0
    }
}
