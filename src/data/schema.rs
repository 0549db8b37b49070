//! Record types for the CPCD dialog, track and model-output files.

use crate::error::{EvalError, Result};
use serde::Deserialize;
use std::collections::HashMap;

pub type DialogId = String;
pub type TrackId = String;
pub type ClusterId = String;

/// One catalog track.
#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub track_ids: TrackId,
    #[serde(default)]
    pub track_titles: String,
    #[serde(default)]
    pub track_artists: Vec<String>,
    #[serde(default)]
    pub track_release_titles: String,
    #[serde(default)]
    pub track_canonical_ids: TrackId,
    /// Equivalence class shared by near-duplicate tracks.
    pub track_cluster_ids: ClusterId,
}

/// One user query / system response exchange.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Turn {
    #[serde(default)]
    pub user_query: String,
    #[serde(default)]
    pub system_response: String,
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub search_results: Vec<Vec<TrackId>>,
    #[serde(default)]
    pub liked_results: Vec<TrackId>,
    #[serde(default)]
    pub disliked_results: Vec<TrackId>,
}

/// A multi-turn session and its goal playlist.
#[derive(Debug, Clone, Deserialize)]
pub struct Dialog {
    pub id: DialogId,
    #[serde(default)]
    pub turns: Vec<Turn>,
    #[serde(default)]
    pub tracks: HashMap<TrackId, Track>,
    pub goal_playlist: Vec<TrackId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Neighbor {
    pub docid: TrackId,
    #[serde(default)]
    pub distance: Option<f64>,
}

/// One line of model output: the ranked neighbors for a single turn.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionRecord {
    /// `"<dialog_id>:<turn_index>"`
    pub docid: String,
    #[serde(default)]
    pub neighbor: Vec<Neighbor>,
}

impl PredictionRecord {
    /// Splits `docid` at its first `:` into dialog id and turn index.
    pub fn turn_key(&self) -> Result<(&str, usize)> {
        let (dialog_id, turn) = self.docid.split_once(':').ok_or_else(|| {
            EvalError::InvalidRecord(format!(
                "docid '{}' is not of the form <dialog_id>:<turn_index>",
                self.docid
            ))
        })?;
        let turn_idx = turn.parse::<usize>().map_err(|e| {
            EvalError::InvalidRecord(format!("bad turn index in docid '{}': {}", self.docid, e))
        })?;
        Ok((dialog_id, turn_idx))
    }

    /// Ranked track ids, best first.
    pub fn track_ids(&self) -> impl Iterator<Item = &TrackId> {
        self.neighbor.iter().map(|n| &n.docid)
    }
}
