//! Core listener infrastructure.
//!
//! - [`Registry`]: the owned set of listeners, mutated through handles
//! - [`Dispatcher`]: hands every inbound message to all listeners at once
//! - [`Correlation`]: a temporary listener awaiting one specific reply
//! - [`Handler`]: the trait every listener implements

pub mod correlation;
pub mod dispatch;
pub mod registry;
pub mod traits;

pub use correlation::Correlation;
pub use dispatch::{DispatchReport, Dispatcher};
pub use registry::{Listener, ListenerHandle, Registry};
pub use traits::{Flow, Handler, HandlerResult};
