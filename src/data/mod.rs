//! CPCD input files: dialogs, track catalog and model output (all JSONL).

pub mod loader;
pub mod schema;

pub use loader::{group_results, load_dialogs, load_jsonl, load_results, load_tracks};
pub use schema::{ClusterId, Dialog, DialogId, Neighbor, PredictionRecord, Track, TrackId, Turn};
