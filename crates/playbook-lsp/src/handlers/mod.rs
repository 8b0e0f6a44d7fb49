mod completion;
mod configuration;
mod lifecycle;
mod notifications;
mod validation;

pub use completion::*;
pub use configuration::*;
pub use lifecycle::*;
pub use notifications::*;
pub use validation::*;
