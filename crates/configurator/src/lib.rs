//! Asset resolution and visual synchronization for the suitcase configurator.
//!
//! Deterministic and I/O free: fetching happens in the host, which exchanges
//! [`streaming::FetchCommand`]s and completions with [`Configurator`].

pub mod capability;
pub mod configuration;
pub mod engine;
pub mod error;
pub mod material;
pub mod model;
pub mod motion;
pub mod resolver;
pub mod settings;
pub mod still;
pub mod store;
pub mod transition;
pub mod visual;

pub use capability::*;
pub use configuration::*;
pub use engine::*;
pub use error::*;
pub use material::*;
pub use model::*;
pub use motion::*;
pub use resolver::*;
pub use settings::*;
pub use still::*;
pub use store::*;
pub use transition::*;
pub use visual::*;
