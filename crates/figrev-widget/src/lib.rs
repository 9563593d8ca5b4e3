//! Interactive parameter widgets: the reactive loop that lets a user
//! tweak named parameters of a producing function and republish the
//! result without re-running the whole cell.

pub mod channel;
pub mod debounce;
pub mod error;
pub mod params;

pub use channel::{FrontEndModel, ParamMeta, Producer, Reexecution, WidgetChannel};
pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use error::{Result, WidgetError};
pub use params::ParamSet;
