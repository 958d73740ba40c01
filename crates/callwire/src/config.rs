use core::time::Duration;

/// Tunables shared by the client, the transport and the dispatch loop.
///
/// The configuration is passed explicitly to every component that needs it;
/// nothing in the engine reads process-wide state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Messages buffered per direction before `send` suspends.
    pub channel_capacity: usize,
    /// Capacity of the queue of calls waiting to be dispatched.
    pub accept_backlog: usize,
    /// Timeout applied to calls opened without an explicit timeout or
    /// deadline. `None` leaves such calls unbounded.
    pub default_timeout: Option<Duration>,
    /// How long the dispatch loop waits for in-flight calls to finish after
    /// shutdown is requested before cancelling them.
    pub shutdown_grace: Duration,
}

impl EngineConfig {
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;
    pub const DEFAULT_ACCEPT_BACKLOG: usize = 128;
    pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(3);
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: Self::DEFAULT_CHANNEL_CAPACITY,
            accept_backlog: Self::DEFAULT_ACCEPT_BACKLOG,
            default_timeout: None,
            shutdown_grace: Self::DEFAULT_SHUTDOWN_GRACE,
        }
    }
}
