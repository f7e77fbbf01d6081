//! A graph query engine over a small relational domain.
//!
//! Query shapes are resolved against an entity registry and a batched
//! backing store: every relation lookup in a resolution tick is
//! coalesced into one store call per lookup kind, failures stay scoped
//! to the field that triggered them, and the response document mirrors
//! the requested shape exactly.

mod assembly;
mod configuration;
mod domain;
mod error;
mod executor;
mod json_ext;
mod limits;
mod loader;
mod request;
mod response;
mod schema;
mod store;
pub mod testing;

pub use configuration::*;
pub use domain::*;
pub use error::*;
pub use executor::*;
pub use json_ext::*;
pub use request::*;
pub use response::*;
pub use schema::*;
pub use store::*;

pub mod prelude {
    // NOTE: only traits can be added here! Everything else should be scoped under the module
    //       graph so the user can use, for example:
    //        -  graph::Schema to get the entity registry
    //        -  graph::Request to get a query request
    //        -  graph::Response to get a query response
    //        -  ...
    pub use crate::store::Store;
    pub mod graph {
        pub use crate::*;
    }
}
