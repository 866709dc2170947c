//! Hub sizing.

/// Default number of messages a connection may have queued before it is
/// considered stalled and evicted.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default number of pending register/unregister/broadcast requests.
pub const DEFAULT_INTAKE_CAPACITY: usize = 1024;

/// Capacities for the hub intake and the per-connection outbound queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    pub queue_capacity: usize,
    pub intake_capacity: usize,
}

impl HubConfig {
    /// Build a config. Zero capacities are raised to one, since a channel
    /// needs room for at least a single message.
    pub fn new(queue_capacity: usize, intake_capacity: usize) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
            intake_capacity: intake_capacity.max(1),
        }
    }

    pub fn with_queue_capacity(self, queue_capacity: usize) -> Self {
        Self::new(queue_capacity, self.intake_capacity)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY, DEFAULT_INTAKE_CAPACITY)
    }
}
