//! RocketChat export: line-delimited JSON records for rooms, users and
//! messages, plus attachment blobs under `files/`.

pub mod export;
pub mod model;
pub mod paths;
