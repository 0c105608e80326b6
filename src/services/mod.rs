/// Periodic staleness sweep over the durable tier.
pub mod cleanup;
/// Core game operations: create, guess, hint, complete.
pub mod game_service;
/// Multi-tier record resolution and write-back synchronization.
pub mod resolution;
/// Durable-backend connect/health/degraded supervisor.
pub mod storage_supervisor;
