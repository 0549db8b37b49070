//! Turns loaded dialogs, tracks and model output into the cluster-id inputs
//! the scorer consumes.
//!
//! Runs in two steps: extract gold and seed track ids per dialog, then map
//! every track id list to deduplicated cluster ids.

use crate::data::{ClusterId, Dialog, DialogId, Track, TrackId};
use crate::error::{EvalError, Result};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Default number of liked tracks per turn that seed the following turns.
pub const DEFAULT_NUM_PREV_TRACKS: usize = 3;

/// Cluster-id resolved predictions, gold and seeds.
#[derive(Debug, Clone)]
pub struct EvalInputs {
    pub preds: IndexMap<DialogId, Vec<Vec<ClusterId>>>,
    pub gold: HashMap<DialogId, Vec<ClusterId>>,
    pub seed_tracks: HashMap<DialogId, Vec<Vec<ClusterId>>>,
}

/// Maps track ids to cluster ids, keeping the first occurrence of each cluster.
pub fn convert_to_cluster_ids<S: AsRef<str>>(
    track_ids: &[S],
    tracks: &HashMap<TrackId, Track>,
) -> Result<Vec<ClusterId>> {
    let mut cluster_ids = Vec::with_capacity(track_ids.len());
    let mut seen_clusters = HashSet::with_capacity(track_ids.len());

    for track_id in track_ids {
        let track_id = track_id.as_ref();
        let track = tracks
            .get(track_id)
            .ok_or_else(|| EvalError::UnknownTrack(track_id.to_string()))?;
        if seen_clusters.insert(track.track_cluster_ids.as_str()) {
            cluster_ids.push(track.track_cluster_ids.clone());
        }
    }
    Ok(cluster_ids)
}

/// Goal playlist track ids per dialog.
pub fn gold_results(dialogs: &HashMap<DialogId, Dialog>) -> HashMap<DialogId, Vec<TrackId>> {
    dialogs
        .iter()
        .map(|(id, dialog)| (id.clone(), dialog.goal_playlist.clone()))
        .collect()
}

/// Seed track ids per dialog and turn.
///
/// Turn 0 has no seeds. Turn `t + 1` is seeded with the first
/// `num_previous_tracks` liked results of turn `t`; the last turn seeds
/// nothing.
pub fn seed_tracks(
    dialogs: &HashMap<DialogId, Dialog>,
    num_previous_tracks: usize,
) -> HashMap<DialogId, Vec<Vec<TrackId>>> {
    dialogs
        .iter()
        .map(|(id, dialog)| {
            let mut seeds = vec![Vec::new()];
            let seeding_turns = dialog.turns.len().saturating_sub(1);
            for turn in &dialog.turns[..seeding_turns] {
                let n = num_previous_tracks.min(turn.liked_results.len());
                seeds.push(turn.liked_results[..n].to_vec());
            }
            (id.clone(), seeds)
        })
        .collect()
}

/// Builds scorer inputs from raw model output, dialogs and the track catalog.
pub fn prepare_inputs(
    results: &IndexMap<DialogId, Vec<Vec<TrackId>>>,
    dialogs: &HashMap<DialogId, Dialog>,
    tracks: &HashMap<TrackId, Track>,
    num_previous_tracks: usize,
) -> Result<EvalInputs> {
    let gold = gold_results(dialogs);
    let seeds = seed_tracks(dialogs, num_previous_tracks);

    log::info!("Converting to cluster ids");
    let preds = results
        .iter()
        .map(|(id, turns)| Ok::<_, EvalError>((id.clone(), convert_turns(turns, tracks)?)))
        .collect::<Result<IndexMap<_, _>>>()?;
    let gold = gold
        .iter()
        .map(|(id, track_ids)| {
            Ok::<_, EvalError>((id.clone(), convert_to_cluster_ids(track_ids, tracks)?))
        })
        .collect::<Result<HashMap<_, _>>>()?;
    let seed_tracks = seeds
        .iter()
        .map(|(id, turns)| Ok::<_, EvalError>((id.clone(), convert_turns(turns, tracks)?)))
        .collect::<Result<HashMap<_, _>>>()?;

    Ok(EvalInputs {
        preds,
        gold,
        seed_tracks,
    })
}

fn convert_turns(
    turns: &[Vec<TrackId>],
    tracks: &HashMap<TrackId, Track>,
) -> Result<Vec<Vec<ClusterId>>> {
    turns
        .iter()
        .map(|track_ids| convert_to_cluster_ids(track_ids, tracks))
        .collect()
}
