//! HTTP API handlers for opsd-recon

pub mod health;
pub mod matching;
pub mod proposals;
pub mod resolutions;

pub use health::health_routes;
pub use matching::match_routes;
pub use proposals::proposal_routes;
pub use resolutions::resolution_routes;
