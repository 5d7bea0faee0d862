pub mod builder;
pub mod cli;
pub mod config;
pub mod dump;
pub mod error;
pub mod model;
pub mod resolve;
pub mod schema;
pub mod store;
pub mod util;
pub mod validate;

pub use builder::{Builder, SharedBuilder};
pub use error::{GraphError, Result};
pub use model::{Edge, EdgeLabel, Element, Id, RequestKind, Vertex, VertexData, VertexLabel};
pub use resolve::{Resolution, Resolver};
pub use store::{Snapshot, Store};
pub use validate::{ValidationReport, Violation, ViolationKind, validate};
