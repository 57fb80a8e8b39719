use crate::models::{Measure, ResultRow};
use crate::session::{AllocationSession, PlaceSelection};
use anyhow::{bail, Result};
use csv::{ReaderBuilder, Trim, Writer};
use log::info;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Write both session tables into `output_dir`, named after the region.
pub fn save_session(
    session: &AllocationSession,
    region: &str,
    output_dir: &str,
) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(output_dir)?;

    let results_path = Path::new(output_dir).join(format!("{} place based allocations.csv", region));
    write_results(session.rows(), File::create(&results_path)?)?;
    info!("wrote {}", results_path.display());

    let groups_path =
        Path::new(output_dir).join(format!("{} place based allocations groups.csv", region));
    write_groups(&session.accumulator().export_places_table(), File::create(&groups_path)?)?;
    info!("wrote {}", groups_path.display());

    Ok((results_path, groups_path))
}

pub fn print_summary(session: &AllocationSession) {
    println!("\n📊 SUMMARY");
    println!("==========\n");

    let catalog = session.catalog();
    let places = session.accumulator().places();
    let groups = session.accumulator().groups();

    for (row, group) in places.zip(groups) {
        println!(
            "📍 {} - GP population {}",
            row.label,
            format_thousands(row.totals[Measure::GpPop])
        );
        for measure in Measure::WEIGHTED {
            let column = measure.index_column().unwrap_or_default();
            match (row.indices.get(measure), row.indices.parity_delta(measure)) {
                (Some(index), Some(delta)) => {
                    println!("   {:<14} {:.2} ({:+.2} vs ICS)", column, index, delta)
                }
                _ => println!("   {:<14} undefined (no {} in ICS)", column, measure),
            }
        }
        let names: Vec<&str> = group
            .practices
            .iter()
            .map(|id| catalog.get(id).map_or(id.as_str(), |p| p.display_name()))
            .collect();
        println!("   Selected GP practices: {}\n", names.join(", "));
    }

    if let Some(region) = session.rows().last() {
        println!(
            "🏥 Indices relative to {} (GP population {})",
            region.label,
            format_thousands(region.totals[Measure::GpPop])
        );
    }
}

/// Write the result table: label, summed figures, then indices.
pub fn write_results<W: Write>(rows: &[ResultRow], out: W) -> Result<()> {
    let mut writer = Writer::from_writer(out);

    let mut header = vec!["Place Name"];
    header.extend(Measure::ALL.iter().map(|m| m.column()));
    header.extend(Measure::WEIGHTED.iter().filter_map(|m| m.index_column()));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.label.clone()];
        record.extend(Measure::ALL.iter().map(|&m| format_thousands(row.totals[m])));
        // undefined indices are left blank
        record.extend(Measure::WEIGHTED.iter().map(|&m| {
            row.indices
                .get(m)
                .map_or_else(String::new, |index| format!("{:.3}", index))
        }));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the groups table, padding short rows with empty cells.
pub fn write_groups<W: Write>(groups: &[Vec<String>], out: W) -> Result<()> {
    let width = groups.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let mut writer = Writer::from_writer(out);

    let mut header = vec!["Place Name".to_string()];
    header.extend((1..width).map(|n| format!("Practice {}", n)));
    writer.write_record(&header)?;

    for group in groups {
        let padding = std::iter::repeat(String::new()).take(width - group.len());
        writer.write_record(group.iter().cloned().chain(padding))?;
    }

    writer.flush()?;
    Ok(())
}

/// Read a two-column (place name, practice) table into selections, in order
/// of first appearance of each place.
pub fn read_groups<R: Read>(input: R) -> Result<Vec<PlaceSelection>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input);

    let mut selections: Vec<PlaceSelection> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let place = record.get(0).unwrap_or_default();
        let practice = record.get(1).unwrap_or_default();
        if place.is_empty() && practice.is_empty() {
            continue;
        }
        if place.is_empty() {
            bail!("row {}: practice `{}` has no place name", i + 2, practice);
        }

        let position = *positions.entry(place.to_string()).or_insert_with(|| {
            selections.push(PlaceSelection::new(place, Vec::<String>::new()));
            selections.len() - 1
        });
        if !practice.is_empty() {
            selections[position].practices.push(practice.to_string());
        }
    }

    Ok(selections)
}

/// Whole number with comma thousands separators.
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::compute_indices;
    use crate::models::Totals;

    #[test]
    fn thousands_separators() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
        assert_eq!(format_thousands(-45000), "-45,000");
    }

    #[test]
    fn results_have_figures_then_indices() {
        let totals = |gp_pop: i64, general_acute: i64| {
            Totals::from_fn(|m| match m {
                Measure::GpPop => gp_pop,
                Measure::GeneralAcute => general_acute,
                _ => gp_pop,
            })
        };
        let mut rows = vec![
            ResultRow::place("GroupHi", totals(1200, 1440)),
            ResultRow::region_total("X", totals(2400, 2400)),
        ];
        compute_indices(&mut rows).unwrap();

        let mut buf = Vec::new();
        write_results(&rows, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "Place Name,GP_pop,WP_G&A,WP_CS,WP_MH,WP_Mat,WP_HCHS,WP_Presc,WP_AM,WP_Overall,\
             G&A_Index,CS_Index,MH_Index,Mat_Index,HCHS_Index,Presc_Index,AM_Index,Overall_Index"
        );
        assert_eq!(
            lines[1],
            "GroupHi,\"1,200\",\"1,440\",\"1,200\",\"1,200\",\"1,200\",\"1,200\",\"1,200\",\"1,200\",\"1,200\",\
             1.200,1.000,1.000,1.000,1.000,1.000,1.000,1.000"
        );
        assert!(lines[2].starts_with("X,\"2,400\""));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn undefined_indices_are_written_as_empty_cells() {
        let totals = |gp_pop: i64, general_acute: i64| {
            Totals::from_fn(|m| match m {
                Measure::GpPop => gp_pop,
                Measure::GeneralAcute => general_acute,
                _ => 0,
            })
        };
        let mut rows = vec![
            ResultRow::place("GroupLo", totals(100, 80)),
            ResultRow::region_total("X", totals(200, 200)),
        ];
        compute_indices(&mut rows).unwrap();

        let mut buf = Vec::new();
        write_results(&rows, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[1], "GroupLo,100,80,0,0,0,0,0,0,0,0.800,,,,,,,");
        assert_eq!(lines[2], "X,200,200,0,0,0,0,0,0,0,1.000,,,,,,,");
    }

    #[test]
    fn groups_are_padded_to_the_widest_row() {
        let groups = vec![
            vec!["A".to_string(), "P1 : One".to_string(), "P2 : Two".to_string()],
            vec!["B".to_string(), "P3 : Three".to_string()],
        ];
        let mut buf = Vec::new();
        write_groups(&groups, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(
            text,
            "Place Name,Practice 1,Practice 2\nA,P1 : One,P2 : Two\nB,P3 : Three,\n"
        );
    }

    #[test]
    fn empty_groups_table_has_only_a_header() {
        let mut buf = Vec::new();
        write_groups(&[], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Place Name\n");
    }

    #[test]
    fn groups_read_in_first_appearance_order() {
        let csv = "Place,Practice\n\
                   South,P3 : Three\n\
                   North,P1 : One\n\
                   South,P4 : Four\n\
                   ,\n\
                   North, P2 : Two \n";
        let selections = read_groups(csv.as_bytes()).unwrap();

        assert_eq!(
            selections,
            vec![
                PlaceSelection::new("South", ["P3 : Three", "P4 : Four"]),
                PlaceSelection::new("North", ["P1 : One", "P2 : Two"]),
            ]
        );
    }

    #[test]
    fn practice_without_place_is_rejected() {
        let csv = "Place,Practice\n,P1 : One\n";
        let err = read_groups(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }
}
