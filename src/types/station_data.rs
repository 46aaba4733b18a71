//! The outcome of querying one station for one reference year.

use polars::prelude::DataFrame;
use std::fmt;

/// Display name reported when a station could not be resolved.
pub const UNKNOWN_STATION_NAME: &str = "Unknown";

/// Why a station query produced no table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoDataReason {
    /// The query ran but matched zero rows.
    NoRows,
    /// The query failed: missing table, SQL error, or an unparseable timestamp.
    QueryFailed(String),
}

impl fmt::Display for NoDataReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoDataReason::NoRows => write!(f, "no rows"),
            NoDataReason::QueryFailed(message) => write!(f, "query failed: {message}"),
        }
    }
}

/// Hourly normals for a station, or the reason there are none.
///
/// Batch rendering over many stations should not stop at one bad station, so the
/// query gateway never returns an error. Instead it returns [`StationData::NoData`],
/// and [`StationData::frame`] / [`StationData::name`] degrade to an empty table and
/// [`UNKNOWN_STATION_NAME`].
#[derive(Debug, Clone)]
pub enum StationData {
    Loaded {
        /// Rows sorted by the `date` index column.
        frame: DataFrame,
        /// Display name from the station lookup table, if it has an entry.
        name: Option<String>,
    },
    NoData {
        reason: NoDataReason,
    },
}

impl StationData {
    pub fn is_loaded(&self) -> bool {
        matches!(self, StationData::Loaded { .. })
    }

    /// The station table, or an empty frame when there is no data.
    pub fn frame(&self) -> DataFrame {
        match self {
            StationData::Loaded { frame, .. } => frame.clone(),
            StationData::NoData { .. } => DataFrame::empty(),
        }
    }

    pub fn into_frame(self) -> DataFrame {
        match self {
            StationData::Loaded { frame, .. } => frame,
            StationData::NoData { .. } => DataFrame::empty(),
        }
    }

    pub fn height(&self) -> usize {
        match self {
            StationData::Loaded { frame, .. } => frame.height(),
            StationData::NoData { .. } => 0,
        }
    }

    /// The display name, or [`UNKNOWN_STATION_NAME`].
    pub fn name(&self) -> &str {
        match self {
            StationData::Loaded {
                name: Some(name), ..
            } => name,
            _ => UNKNOWN_STATION_NAME,
        }
    }

    pub fn no_data_reason(&self) -> Option<&NoDataReason> {
        match self {
            StationData::Loaded { .. } => None,
            StationData::NoData { reason } => Some(reason),
        }
    }
}
