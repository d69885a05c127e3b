//! Reconciliation services

pub mod catalog;
pub mod proposal_engine;
pub mod resolution_queue;
pub mod rules;
pub mod side_effects;

pub use proposal_engine::ProposalEngine;
pub use resolution_queue::ResolutionQueue;
