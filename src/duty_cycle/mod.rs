mod runner;
mod shutdown;

pub use runner::{current_time_ms, run_duty_cycle};
pub use shutdown::{shutdown_signal, ShutdownHandle, ShutdownSignal};
