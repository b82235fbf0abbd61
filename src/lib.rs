//! Cell-tower geolocation with a local cache.
//!
//! Exposes the resolver and its collaborators for embedding and for
//! integration tests.

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod dataset;
pub mod model;
pub mod remote;
pub mod resolver;

pub use cache::TowerCache;
pub use connectivity::{Connectivity, TcpProbe};
pub use dataset::{DatasetLoader, IngestReport};
pub use model::{Resolution, Source, TowerId, TowerLocation};
pub use remote::{CellLocator, MissingToken, RemoteError, RemoteFix, UnwiredClient};
pub use resolver::TowerResolver;
