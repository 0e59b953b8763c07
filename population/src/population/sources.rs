use frbsim_common::{Degrees, DispersionMeasure, Megaparsec, Milliseconds, Redshift};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Per-source arrays of a generated population. Index `i` addresses the same
/// source in every array, and all arrays have the same length.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Sources {
    pub z: Array1<Redshift>,
    pub dist_co: Array1<Megaparsec>,
    pub dist_lum: Array1<Megaparsec>,
    /// Bolometric luminosity over the emission range, erg/s.
    pub lum_bol: Array1<f64>,
    pub si: Array1<f64>,
    pub w_int: Array1<Milliseconds>,
    pub dm_igm: Array1<DispersionMeasure>,
    pub dm_host: Array1<DispersionMeasure>,
    pub dm_intervening: Array1<DispersionMeasure>,
    pub dm_mw: Array1<DispersionMeasure>,
    pub dm: Array1<DispersionMeasure>,
    pub ra: Array1<Degrees>,
    pub dec: Array1<Degrees>,
    pub gl: Array1<Degrees>,
    pub gb: Array1<Degrees>,
}

impl Sources {
    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn columns(&self) -> [(&'static str, &Array1<f64>); 15] {
        [
            ("z", &self.z),
            ("dist_co", &self.dist_co),
            ("dist_lum", &self.dist_lum),
            ("lum_bol", &self.lum_bol),
            ("si", &self.si),
            ("w_int", &self.w_int),
            ("dm_igm", &self.dm_igm),
            ("dm_host", &self.dm_host),
            ("dm_intervening", &self.dm_intervening),
            ("dm_mw", &self.dm_mw),
            ("dm", &self.dm),
            ("ra", &self.ra),
            ("dec", &self.dec),
            ("gl", &self.gl),
            ("gb", &self.gb),
        ]
    }

    /// Looks up a per-source array by name, e.g. for histogramming.
    pub fn column(&self, name: &str) -> Option<&Array1<f64>> {
        self.columns()
            .into_iter()
            .find_map(|(column, values)| (column == name).then_some(values))
    }

    /// True when every array has the same length.
    pub fn is_consistent(&self) -> bool {
        let n = self.len();
        self.columns().iter().all(|(_, values)| values.len() == n)
    }
}
