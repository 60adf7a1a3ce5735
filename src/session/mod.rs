pub mod cancel;
pub mod controller;
pub mod reducer;
pub mod state;
pub mod transport;

pub use controller::{Session, SessionObserver, StartOutcome, StartRejection};
