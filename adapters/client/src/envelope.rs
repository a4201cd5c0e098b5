use serde::Deserialize;
use sweepview_system_poller::{Snapshot, TransportError};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Envelope {
    map_data: MapData,
    rows: Option<u32>,
    cols: Option<u32>,
    total_robots: Option<u32>,
    total_cells: Option<u32>,
    total_trash: Option<u32>,
    total_obstacles: Option<u32>,
    total_trashcans: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MapData {
    Text(String),
    Rows(Vec<String>),
}

/// Decodes a JSON envelope carrying the grid and its metadata.
///
/// `map_data` may be a single newline-joined string or an array of row
/// strings. Declared dimensions are only attached when both `rows` and
/// `cols` are present.
pub fn decode_envelope(body: &str) -> Result<Snapshot, TransportError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|error| TransportError::Decode {
            reason: error.to_string(),
        })?;

    debug!(
        rows = envelope.rows,
        cols = envelope.cols,
        robots = envelope.total_robots,
        cells = envelope.total_cells,
        trash = envelope.total_trash,
        obstacles = envelope.total_obstacles,
        trashcans = envelope.total_trashcans,
        "decoded snapshot envelope"
    );

    let body = match envelope.map_data {
        MapData::Text(text) => text,
        MapData::Rows(rows) => rows.join("\n"),
    };

    Ok(Snapshot {
        body,
        robots: envelope.total_robots,
        dimensions: envelope.rows.zip(envelope.cols),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_arrays_are_joined_with_newlines() {
        let snapshot = decode_envelope(
            r#"{"map_data": ["0 X", "S 2"], "total_robots": 5, "rows": 2, "cols": 2}"#,
        )
        .expect("envelope decodes");

        assert_eq!(snapshot.body, "0 X\nS 2");
        assert_eq!(snapshot.robots, Some(5));
        assert_eq!(snapshot.dimensions, Some((2, 2)));
    }

    #[test]
    fn text_payloads_and_missing_metadata_are_accepted() {
        let snapshot =
            decode_envelope(r#"{"map_data": "0 0\nP X", "rows": 2}"#).expect("envelope decodes");

        assert_eq!(snapshot.body, "0 0\nP X");
        assert_eq!(snapshot.robots, None);
        assert_eq!(snapshot.dimensions, None, "cols missing, no dimensions");
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let error = decode_envelope("0 0\nX S").expect_err("raw grid is not an envelope");

        assert!(matches!(error, TransportError::Decode { .. }));
    }

    #[test]
    fn missing_map_data_is_a_decode_error() {
        let error = decode_envelope(r#"{"rows": 2}"#).expect_err("map_data is required");

        assert!(matches!(error, TransportError::Decode { .. }));
    }
}
