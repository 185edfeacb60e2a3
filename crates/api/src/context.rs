use stockbook_core::UserId;

/// Acting user for a request.
///
/// Every ledger mutation is attributed to this user. It is immutable and must
/// be present for all stock, purchase and sale routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor: UserId,
}

impl ActorContext {
    pub fn new(actor: UserId) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> UserId {
        self.actor
    }
}
