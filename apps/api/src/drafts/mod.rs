// Draft Version Manager
// Implements: draft store over a pluggable medium, skill and experience merge
// engines, draft diffing, version lifecycle (duplicate, merge, restore).
// The core is synchronous; HTTP handlers lock the shared store per request.

pub mod diff;
pub mod experience;
pub mod handlers;
pub mod lifecycle;
pub mod redis_medium;
pub mod skills;
pub mod storage;
pub mod store;
pub mod sync;
