//! Labels identifying which decade's normals dataset a table holds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// A reference-year label such as `2010` or `2020`.
///
/// This is not a literal year of observation: `2020` names the 1991–2020 normals,
/// `2010` the 1981–2010 normals. Each label maps to one table in the store.
///
/// # Examples
///
/// ```
/// use climate_normals::ReferenceYear;
///
/// assert_eq!(ReferenceYear::Y2020.table_name("noaa"), "noaa_hlytemp_2020");
/// assert_eq!("2010".parse::<ReferenceYear>().unwrap(), ReferenceYear::Y2010);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceYear(pub u16);

impl ReferenceYear {
    pub const Y2010: ReferenceYear = ReferenceYear(2010);
    pub const Y2020: ReferenceYear = ReferenceYear(2020);
    /// The earlier and later decade compared by change heatmaps.
    pub const DECADE_PAIR: [ReferenceYear; 2] = [Self::Y2010, Self::Y2020];

    /// Name of the hourly temperature table for this year, e.g. `noaa_hlytemp_2010`.
    pub fn table_name(&self, source: &str) -> String {
        format!("{}_hlytemp_{}", source.to_lowercase(), self.0)
    }
}

impl fmt::Display for ReferenceYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReferenceYear {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ReferenceYear)
    }
}

impl From<u16> for ReferenceYear {
    fn from(year: u16) -> Self {
        ReferenceYear(year)
    }
}
