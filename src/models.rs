use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use std::sync::LazyLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub catalog_path: String,
    /// ICS every place is created in and normalised against
    pub region: String,
    pub groups_path: Option<String>,
    pub output_directory: Option<String>,
    #[serde(default)]
    pub columns: ColumnMap,
}

/// Source headers for each canonical practice field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub practice: String,
    pub practice_name: String,
    pub region: String,
    pub gp_pop: String,
    pub general_acute: String,
    pub community: String,
    pub mental_health: String,
    pub maternity: String,
    pub hchs: String,
    pub prescribing: String,
    pub ambulance: String,
    pub overall: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: "data/gp_practice_weighted_population.csv".to_string(),
            region: "".to_string(),
            groups_path: Some("groups.csv".to_string()),
            output_directory: Some("output".to_string()),
            columns: ColumnMap::default(),
        }
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            practice: "Practice".to_string(),
            practice_name: "GP practice name".to_string(),
            region: "STP21_42".to_string(),
            gp_pop: Measure::GpPop.column().to_string(),
            general_acute: Measure::GeneralAcute.column().to_string(),
            community: Measure::Community.column().to_string(),
            mental_health: Measure::MentalHealth.column().to_string(),
            maternity: Measure::Maternity.column().to_string(),
            hchs: Measure::Hchs.column().to_string(),
            prescribing: Measure::Prescribing.column().to_string(),
            ambulance: Measure::Ambulance.column().to_string(),
            overall: Measure::Overall.column().to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }
}

impl ColumnMap {
    /// Source header carrying `measure`.
    pub fn measure(&self, measure: Measure) -> &str {
        match measure {
            Measure::GpPop => &self.gp_pop,
            Measure::GeneralAcute => &self.general_acute,
            Measure::Community => &self.community,
            Measure::MentalHealth => &self.mental_health,
            Measure::Maternity => &self.maternity,
            Measure::Hchs => &self.hchs,
            Measure::Prescribing => &self.prescribing,
            Measure::Ambulance => &self.ambulance,
            Measure::Overall => &self.overall,
        }
    }
}

/// The registered population and the eight weighted populations carried per practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measure {
    GpPop,
    GeneralAcute,
    Community,
    MentalHealth,
    Maternity,
    Hchs,
    Prescribing,
    Ambulance,
    Overall,
}

impl Measure {
    pub const COUNT: usize = 9;

    pub const ALL: [Measure; Self::COUNT] = [
        Measure::GpPop,
        Measure::GeneralAcute,
        Measure::Community,
        Measure::MentalHealth,
        Measure::Maternity,
        Measure::Hchs,
        Measure::Prescribing,
        Measure::Ambulance,
        Measure::Overall,
    ];

    /// Measures that get a need index; `Overall` is indexed like any category.
    pub const WEIGHTED: [Measure; NeedIndices::COUNT] = [
        Measure::GeneralAcute,
        Measure::Community,
        Measure::MentalHealth,
        Measure::Maternity,
        Measure::Hchs,
        Measure::Prescribing,
        Measure::Ambulance,
        Measure::Overall,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Measure::GpPop => "GP_pop",
            Measure::GeneralAcute => "WP_G&A",
            Measure::Community => "WP_CS",
            Measure::MentalHealth => "WP_MH",
            Measure::Maternity => "WP_Mat",
            Measure::Hchs => "WP_HCHS",
            Measure::Prescribing => "WP_Presc",
            Measure::Ambulance => "WP_AM",
            Measure::Overall => "WP_Overall",
        }
    }

    /// Output header of the index derived from this measure.
    pub fn index_column(self) -> Option<&'static str> {
        match self {
            Measure::GpPop => None,
            Measure::GeneralAcute => Some("G&A_Index"),
            Measure::Community => Some("CS_Index"),
            Measure::MentalHealth => Some("MH_Index"),
            Measure::Maternity => Some("Mat_Index"),
            Measure::Hchs => Some("HCHS_Index"),
            Measure::Prescribing => Some("Presc_Index"),
            Measure::Ambulance => Some("AM_Index"),
            Measure::Overall => Some("Overall_Index"),
        }
    }

    fn slot(self) -> usize {
        self as usize
    }

    fn index_slot(self) -> Option<usize> {
        self.slot().checked_sub(1)
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Raw per-practice figures as read from the source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Figures([f64; Measure::COUNT]);

impl Figures {
    pub fn from_fn(mut f: impl FnMut(Measure) -> f64) -> Self {
        Self(Measure::ALL.map(&mut f))
    }
}

impl Index<Measure> for Figures {
    type Output = f64;

    fn index(&self, measure: Measure) -> &f64 {
        &self.0[measure.slot()]
    }
}

/// Summed figures of a place or region, truncated toward zero after summation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals([i64; Measure::COUNT]);

impl Totals {
    pub fn from_fn(mut f: impl FnMut(Measure) -> i64) -> Self {
        Self(Measure::ALL.map(&mut f))
    }
}

impl Index<Measure> for Totals {
    type Output = i64;

    fn index(&self, measure: Measure) -> &i64 {
        &self.0[measure.slot()]
    }
}

/// Relative need indices, one per weighted measure. 1.0 is parity with the region.
/// A slot is `None` when the region has none of that weighted population.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NeedIndices([Option<f64>; NeedIndices::COUNT]);

impl NeedIndices {
    pub const COUNT: usize = 8;

    pub fn from_fn(f: impl FnMut(Measure) -> Option<f64>) -> Self {
        Self(Measure::WEIGHTED.map(f))
    }

    pub fn get(&self, measure: Measure) -> Option<f64> {
        measure.index_slot().and_then(|slot| self.0[slot])
    }

    /// Distance from parity, rounded to two decimals.
    pub fn parity_delta(&self, measure: Measure) -> Option<f64> {
        self.get(measure)
            .map(|index| ((index - 1.0) * 100.0).round() / 100.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Practice {
    /// `"<code> : <name>"`, unique across the catalog
    pub id: String,
    pub region: String,
    pub figures: Figures,
}

impl Practice {
    pub fn new(code: &str, name: &str, region: &str, figures: Figures) -> Self {
        Self {
            id: practice_identity(code, name),
            region: region.to_string(),
            figures,
        }
    }

    /// Practice name without its code prefix.
    pub fn display_name(&self) -> &str {
        CODE_PREFIX
            .find(&self.id)
            .map_or(self.id.as_str(), |m| &self.id[m.end()..])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Place,
    /// Whole-region total appended after each place; the last one is the index denominator
    RegionTotal,
}

/// One row of the session result table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub label: String,
    pub kind: RowKind,
    pub totals: Totals,
    pub indices: NeedIndices,
}

impl ResultRow {
    pub fn place(label: &str, totals: Totals) -> Self {
        Self {
            label: label.to_string(),
            kind: RowKind::Place,
            totals,
            indices: NeedIndices::default(),
        }
    }

    pub fn region_total(label: &str, totals: Totals) -> Self {
        Self {
            label: label.to_string(),
            kind: RowKind::RegionTotal,
            totals,
            indices: NeedIndices::default(),
        }
    }
}

static CODE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+\s*:\s*").expect("valid code prefix pattern"));
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*:\s*").expect("valid separator pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

pub fn practice_identity(code: &str, name: &str) -> String {
    normalize_identity(&format!("{} : {}", code.trim(), name.trim()))
}

/// Normalize a practice identity: single spaces, and `" : "` between code and name.
pub fn normalize_identity(id: &str) -> String {
    let collapsed = WHITESPACE.replace_all(id.trim(), " ");
    SEPARATOR.replacen(&collapsed, 1, " : ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_joins_code_and_name() {
        assert_eq!(
            practice_identity("B85005", " Shepley Health Centre "),
            "B85005 : Shepley Health Centre"
        );
    }

    #[test]
    fn normalize_identity_fixes_spacing() {
        assert_eq!(
            normalize_identity("B85005:Shepley   Health Centre"),
            "B85005 : Shepley Health Centre"
        );
        assert_eq!(
            normalize_identity("  B85022 :  Honley Surgery"),
            "B85022 : Honley Surgery"
        );
    }

    #[test]
    fn display_name_strips_code() {
        let practice = Practice::new("B85022", "Honley Surgery", "X", Figures::default());
        assert_eq!(practice.display_name(), "Honley Surgery");
    }

    #[test]
    fn need_indices_have_no_gp_pop_slot() {
        let indices = NeedIndices::from_fn(|m| Some(m as usize as f64));
        assert_eq!(indices.get(Measure::GpPop), None);
        assert_eq!(indices.get(Measure::GeneralAcute), Some(1.0));
        assert_eq!(indices.get(Measure::Overall), Some(8.0));
    }

    #[test]
    fn parity_delta_rounds_to_two_places() {
        let indices = NeedIndices::from_fn(|_| Some(1.23456));
        assert_eq!(indices.parity_delta(Measure::Maternity), Some(0.23));
    }

    #[test]
    fn undefined_index_has_no_value_or_delta() {
        let indices = NeedIndices::from_fn(|m| (m != Measure::Community).then_some(1.5));
        assert_eq!(indices.get(Measure::Community), None);
        assert_eq!(indices.parity_delta(Measure::Community), None);
        assert_eq!(indices.get(Measure::Hchs), Some(1.5));
    }

    #[test]
    fn default_columns_match_source_headers() {
        let columns = ColumnMap::default();
        assert_eq!(columns.measure(Measure::GeneralAcute), "WP_G&A");
        assert_eq!(columns.region, "STP21_42");
    }
}
