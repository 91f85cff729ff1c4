use crate::{Error, Result};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    Idle,
    Busy,
    Restarting,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerEvent {
    Started,
    StartFailed,
    JobReceived,
    JobCompleted,
    JobFailed,
    JobAbandoned,
    Respawning,
    ShutdownRequested,
}

pub struct WorkerLifecycle {
    worker_id: usize,
    state: WorkerState,
}

impl WorkerLifecycle {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            state: WorkerState::Starting,
        }
    }

    pub fn current_state(&self) -> WorkerState {
        self.state
    }

    pub fn accepts_jobs(&self) -> bool {
        self.state == WorkerState::Idle
    }

    pub fn transition(&mut self, event: WorkerEvent) -> Result<()> {
        let old_state = self.state;

        let new_state = match (old_state, event) {
            (WorkerState::Starting, WorkerEvent::Started) => WorkerState::Idle,
            (WorkerState::Starting, WorkerEvent::StartFailed) => WorkerState::Stopped,
            (WorkerState::Idle, WorkerEvent::JobReceived) => WorkerState::Busy,
            (WorkerState::Busy, WorkerEvent::JobCompleted) => WorkerState::Idle,
            (WorkerState::Busy, WorkerEvent::JobFailed) => WorkerState::Restarting,
            (WorkerState::Busy, WorkerEvent::JobAbandoned) => WorkerState::Restarting,
            (WorkerState::Restarting, WorkerEvent::Respawning) => WorkerState::Starting,
            (WorkerState::Stopped, WorkerEvent::ShutdownRequested) => {
                return Err(Error::InvalidTransition {
                    current: format!("{:?}", old_state),
                    requested: format!("{:?}", event),
                });
            }
            (_, WorkerEvent::ShutdownRequested) => WorkerState::Stopped,
            _ => {
                warn!(
                    "Invalid transition for worker {} from {:?} with event {:?}",
                    self.worker_id, old_state, event
                );
                return Err(Error::InvalidTransition {
                    current: format!("{:?}", old_state),
                    requested: format!("{:?}", event),
                });
            }
        };

        match new_state {
            WorkerState::Restarting | WorkerState::Stopped => info!(
                "Worker {} state transition: {:?} -> {:?} (event: {:?})",
                self.worker_id, old_state, new_state, event
            ),
            _ => debug!(
                "Worker {} state transition: {:?} -> {:?} (event: {:?})",
                self.worker_id, old_state, new_state, event
            ),
        }

        self.state = new_state;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state == WorkerState::Stopped
    }
}
