// Server-held session state: wire model and the synchronizer that adopts it.

pub mod model;
pub mod sync;
