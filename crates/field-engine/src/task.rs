use tokio::sync::watch;

/// Result of a restartable task invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    /// The invocation was the latest one and its effects were applied.
    Committed(T),
    /// A newer invocation started first; nothing was applied.
    Superseded,
}

impl<T> TaskOutcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, TaskOutcome::Committed(_))
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, TaskOutcome::Superseded)
    }

    pub fn committed(self) -> Option<T> {
        match self {
            TaskOutcome::Committed(value) => Some(value),
            TaskOutcome::Superseded => None,
        }
    }
}

/// Generation counter shared by all invocations of one operation on one
/// field. Only the holder of the newest [`Ticket`] may commit.
#[derive(Debug)]
pub struct RestartableTask {
    name: &'static str,
    generation: watch::Sender<u64>,
}

impl RestartableTask {
    pub fn new(name: &'static str) -> Self {
        let (generation, _) = watch::channel(0);
        Self { name, generation }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Starts a new invocation, superseding every earlier ticket.
    pub fn begin(&self) -> Ticket {
        let mut issued = 0;
        self.generation.send_modify(|generation| {
            *generation += 1;
            issued = *generation;
        });
        Ticket {
            generation: issued,
            latest: self.generation.subscribe(),
        }
    }

    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }
}

/// Claim of one task invocation.
#[derive(Debug)]
pub struct Ticket {
    generation: u64,
    latest: watch::Receiver<u64>,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        *self.latest.borrow() == self.generation
    }

    /// Resolves once a newer invocation has begun; never resolves otherwise.
    pub async fn superseded(&mut self) {
        loop {
            if !self.is_current() {
                return;
            }
            if self.latest.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
