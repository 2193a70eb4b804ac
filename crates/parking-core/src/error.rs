use eva_common::Error;

pub use eva_common::EResult as Result;

/// Fatal initialization error (shared memory create/open, primitive init, file open).
///
/// The caller must abort the process on receipt of this kind; partial shared state is unsafe
/// to continue with.
pub fn init_failure<S: std::fmt::Display>(msg: S) -> Error {
    Error::failed(msg.to_string())
}

/// A channel observed state inconsistent with the manager-local tables (e.g. a car reported on
/// a level other than its recorded current level). Logged and resynchronized, never fatal.
pub fn protocol_violation<S: std::fmt::Display>(msg: S) -> Error {
    Error::invalid_data(msg.to_string())
}

/// An exit event for a plate with no matching billing entry. Logged, the car is released
/// without a charge.
pub fn missing_billing_entry(plate: &str) -> Error {
    Error::not_found(format!("no billing entry for {plate}"))
}
