use crate::error::CatalogError;
use crate::models::{normalize_identity, ColumnMap, Figures, Measure, Practice};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Immutable table of practices, in source order.
#[derive(Debug, Clone, Default)]
pub struct PracticeCatalog {
    practices: Vec<Practice>,
    by_id: HashMap<String, usize>,
}

impl PracticeCatalog {
    pub fn load(path: impl AsRef<Path>, columns: &ColumnMap) -> Result<Self, CatalogError> {
        let file = File::open(path)?;
        Self::from_reader(file, columns)
    }

    /// Read practices from CSV, locating every field by its mapped header.
    pub fn from_reader<R: Read>(reader: R, columns: &ColumnMap) -> Result<Self, CatalogError> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
        let headers = reader.headers()?.clone();

        let code_col = find_column(&headers, &columns.practice)?;
        let name_col = find_column(&headers, &columns.practice_name)?;
        let region_col = find_column(&headers, &columns.region)?;
        let mut measure_cols = [0usize; Measure::COUNT];
        for (slot, measure) in measure_cols.iter_mut().zip(Measure::ALL) {
            *slot = find_column(&headers, columns.measure(measure))?;
        }

        let mut practices = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            // header is line 1
            let row = i + 2;
            let code = record.get(code_col).unwrap_or_default();
            let name = record.get(name_col).unwrap_or_default();
            let region = record.get(region_col).unwrap_or_default();
            for (value, column) in [(code, &columns.practice), (region, &columns.region)] {
                if value.is_empty() {
                    return Err(CatalogError::MissingField {
                        row,
                        column: column.clone(),
                    });
                }
            }

            let mut figures = [0.0; Measure::COUNT];
            for ((figure, measure), col) in figures.iter_mut().zip(Measure::ALL).zip(measure_cols) {
                *figure = parse_figure(record.get(col)).ok_or_else(|| CatalogError::MissingFigure {
                    row,
                    practice: code.to_string(),
                    column: columns.measure(measure).to_string(),
                })?;
            }
            let figures = Figures::from_fn(|measure| figures[measure as usize]);

            practices.push(Practice::new(code, name, region, figures));
        }

        Self::from_practices(practices)
    }

    pub fn from_practices(practices: Vec<Practice>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(practices.len());
        for (position, practice) in practices.iter().enumerate() {
            if by_id.insert(practice.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateIdentity(practice.id.clone()));
            }
        }
        Ok(Self { practices, by_id })
    }

    pub fn practices(&self) -> &[Practice] {
        &self.practices
    }

    pub fn len(&self) -> usize {
        self.practices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.practices.is_empty()
    }

    /// Look up a practice by identity, tolerating spacing differences.
    pub fn get(&self, id: &str) -> Option<&Practice> {
        self.by_id
            .get(id)
            .or_else(|| self.by_id.get(&normalize_identity(id)))
            .map(|&position| &self.practices[position])
    }

    /// Practices of `region`, in catalog order.
    pub fn region<'a>(&'a self, region: &'a str) -> impl Iterator<Item = &'a Practice> + 'a {
        self.practices.iter().filter(move |p| p.region == region)
    }

    /// Sorted, de-duplicated region names.
    pub fn regions(&self) -> Vec<&str> {
        let mut regions: Vec<&str> = self.practices.iter().map(|p| p.region.as_str()).collect();
        regions.sort_unstable();
        regions.dedup();
        regions
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize, CatalogError> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| CatalogError::MissingColumn(name.to_string()))
}

fn parse_figure(value: Option<&str>) -> Option<f64> {
    value?
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Practice,GP practice name,STP21_42,GP_pop,WP_G&A,WP_CS,WP_MH,WP_Mat,WP_HCHS,WP_Presc,WP_AM,WP_Overall";

    fn load(body: &str) -> Result<PracticeCatalog, CatalogError> {
        let csv = format!("{HEADER}\n{body}");
        PracticeCatalog::from_reader(csv.as_bytes(), &ColumnMap::default())
    }

    #[test]
    fn loads_practices_in_source_order() {
        let catalog = load(
            "B1,North Surgery,X,100,120,1,2,3,4,5,6,7\n\
             B2,South Surgery,Y,\"1,000\",80,0,0,0,0,0,0,0\n",
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        let first = &catalog.practices()[0];
        assert_eq!(first.id, "B1 : North Surgery");
        assert_eq!(first.region, "X");
        assert_eq!(first.figures[Measure::GeneralAcute], 120.0);
        assert_eq!(first.figures[Measure::Overall], 7.0);
        assert_eq!(catalog.practices()[1].figures[Measure::GpPop], 1000.0);
    }

    #[test]
    fn missing_column_is_a_load_error() {
        let csv = "Practice,GP practice name,STP21_42,GP_pop\nB1,A,X,1\n";
        let err = PracticeCatalog::from_reader(csv.as_bytes(), &ColumnMap::default()).unwrap_err();
        assert!(matches!(err, CatalogError::MissingColumn(ref c) if c == "WP_G&A"));
        assert!(err.is_data_load());
    }

    #[test]
    fn blank_figure_is_a_load_error() {
        let err = load("B1,A,X,100,,0,0,0,0,0,0,0\n").unwrap_err();
        match err {
            CatalogError::MissingFigure { row, practice, column } => {
                assert_eq!(row, 2);
                assert_eq!(practice, "B1");
                assert_eq!(column, "WP_G&A");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_figure_is_a_load_error() {
        let err = load("B1,A,X,lots,1,0,0,0,0,0,0,0\n").unwrap_err();
        assert!(matches!(err, CatalogError::MissingFigure { ref column, .. } if column == "GP_pop"));
    }

    #[test]
    fn blank_code_or_region_is_a_load_error() {
        let err = load("B1,A,X,1,1,1,1,1,1,1,1,1
,Nameless,X,1,1,1,1,1,1,1,1,1
").unwrap_err();
        assert!(matches!(err, CatalogError::MissingField { row: 3, ref column } if column == "Practice"));

        let err = load("B1,A,,1,1,1,1,1,1,1,1,1
").unwrap_err();
        assert!(matches!(err, CatalogError::MissingField { row: 2, ref column } if column == "STP21_42"));
        assert!(err.is_data_load());
    }

    #[test]
    fn ragged_row_is_malformed() {
        let err = load("B1,A,X,100\n").unwrap_err();
        assert!(matches!(err, CatalogError::Malformed(_)));
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let err = load(
            "B1,Same Name,X,1,1,1,1,1,1,1,1,1\n\
             B1,Same Name,Y,2,2,2,2,2,2,2,2,2\n",
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateIdentity(ref id) if id == "B1 : Same Name"));
        assert!(!err.is_data_load());
    }

    #[test]
    fn same_code_with_different_names_is_allowed() {
        let catalog = load(
            "B1,Main Site,X,1,1,1,1,1,1,1,1,1\n\
             B1,Branch Site,X,2,2,2,2,2,2,2,2,2\n",
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn remapped_headers_are_honoured() {
        let columns = ColumnMap {
            practice: "Code".to_string(),
            practice_name: "Name".to_string(),
            region: "ICS".to_string(),
            ..ColumnMap::default()
        };
        let csv = "WP_Overall,Name,GP_pop,ICS,WP_G&A,WP_CS,WP_MH,WP_Mat,WP_HCHS,WP_Presc,WP_AM,Code\n\
                   9,Honley Surgery,100,West,120,0,0,0,0,0,0,B85022\n";
        let catalog = PracticeCatalog::from_reader(csv.as_bytes(), &columns).unwrap();
        let practice = catalog.get("B85022 : Honley Surgery").unwrap();
        assert_eq!(practice.region, "West");
        assert_eq!(practice.figures[Measure::Overall], 9.0);
        assert_eq!(practice.figures[Measure::GpPop], 100.0);
    }

    #[test]
    fn lookup_tolerates_spacing() {
        let catalog = load("B85005,Shepley Health Centre,X,1,1,1,1,1,1,1,1,1\n").unwrap();
        assert!(catalog.get("B85005:Shepley  Health Centre").is_some());
        assert!(catalog.get("B85005").is_none());
    }

    #[test]
    fn regions_are_sorted_and_unique() {
        let catalog = load(
            "B1,A,Yorkshire,1,1,1,1,1,1,1,1,1\n\
             B2,B,Cumbria,1,1,1,1,1,1,1,1,1\n\
             B3,C,Yorkshire,1,1,1,1,1,1,1,1,1\n",
        )
        .unwrap();
        assert_eq!(catalog.regions(), vec!["Cumbria", "Yorkshire"]);
        let ids: Vec<&str> = catalog.region("Yorkshire").map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["B1 : A", "B3 : C"]);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = PracticeCatalog::load("does/not/exist.csv", &ColumnMap::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
