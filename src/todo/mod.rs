pub mod data;
pub mod endpoints;
pub mod error;
pub mod helpers;
pub mod index;
pub mod reconciler;
pub mod registry;
pub mod sync;
