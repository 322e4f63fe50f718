pub mod cache;
pub mod candidate;
pub mod chain;
pub mod error;
pub mod load_state;
pub mod pipeline;
pub mod queue;
pub mod request;

pub use cache::*;
pub use candidate::*;
pub use chain::*;
pub use error::*;
pub use load_state::*;
pub use pipeline::*;
pub use queue::*;
pub use request::*;
