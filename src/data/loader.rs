use crate::data::schema::{Dialog, DialogId, PredictionRecord, Track, TrackId};
use crate::error::{EvalError, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Loads a JSONL file, one record per non-blank line.
pub fn load_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let mut records = Vec::new();

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            EvalError::InvalidRecord(format!("{}:{}: {}", path.display(), idx + 1, e))
        })?;
        records.push(record);
    }

    log::debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Loads dialogs keyed by dialog id.
pub fn load_dialogs(path: &Path) -> Result<HashMap<DialogId, Dialog>> {
    let dialogs: Vec<Dialog> = load_jsonl(path)?;
    Ok(dialogs.into_iter().map(|d| (d.id.clone(), d)).collect())
}

/// Loads the track catalog keyed by track id.
pub fn load_tracks(path: &Path) -> Result<HashMap<TrackId, Track>> {
    let tracks: Vec<Track> = load_jsonl(path)?;
    Ok(tracks.into_iter().map(|t| (t.track_ids.clone(), t)).collect())
}

/// Loads model output and regroups it per dialog; see [`group_results`].
pub fn load_results(path: &Path) -> Result<IndexMap<DialogId, Vec<Vec<TrackId>>>> {
    let records: Vec<PredictionRecord> = load_jsonl(path)?;
    group_results(records)
}

/// Regroups per-turn prediction records into per-dialog lists indexed by turn.
///
/// Dialogs keep the order in which they first appear. Turns below the
/// highest index seen for a dialog but absent from the input become empty
/// lists. A repeated `<dialog>:<turn>` key keeps the last record.
pub fn group_results(
    records: Vec<PredictionRecord>,
) -> Result<IndexMap<DialogId, Vec<Vec<TrackId>>>> {
    let mut per_dialog: IndexMap<DialogId, BTreeMap<usize, Vec<TrackId>>> = IndexMap::new();

    for record in &records {
        let (dialog_id, turn_idx) = record.turn_key()?;
        let tracks: Vec<TrackId> = record.track_ids().cloned().collect();
        per_dialog
            .entry(dialog_id.to_string())
            .or_default()
            .insert(turn_idx, tracks);
    }

    Ok(per_dialog
        .into_iter()
        .map(|(dialog_id, mut turns)| {
            let num_turns = turns.keys().next_back().map_or(0, |&max| max + 1);
            let per_turn = (0..num_turns)
                .map(|i| turns.remove(&i).unwrap_or_default())
                .collect();
            (dialog_id, per_turn)
        })
        .collect())
}
