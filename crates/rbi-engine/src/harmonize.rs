//! Column harmonization across sources with drifting attribute names.

use rbi_core::table::FeatureTable;

/// Column synonyms seen in the bilingual BIG RBI exports, mapped to their
/// canonical short names.
pub const RENAME_MAP: &[(&str, &str)] = &[
    ("SHAPE_Area", "SHAPE_AREA"),
    ("NAMOBJ (Nama Objek)", "NAMOBJ"),
    ("FCODE (Feature Code)", "FCODE"),
    ("REMARK (Catatan)", "REMARK"),
];

/// Project `table` onto the reference table's schema.
///
/// Known synonyms are renamed first. Columns absent from the reference are
/// dropped and reference columns the table lacks are simply omitted, so the
/// result is a narrowing, never a null-filled union. Geometry is always kept.
pub fn harmonize(table: FeatureTable, reference: &FeatureTable) -> FeatureTable {
    harmonize_to_columns(table, &reference.column_names())
}

/// [`harmonize`] against an explicit column list. Reference names are used
/// as given: a bilingual reference column such as `NAMOBJ (Nama Objek)`
/// matches nothing once the table itself has been renamed.
pub fn harmonize_to_columns<S: AsRef<str>>(
    mut table: FeatureTable,
    reference_columns: &[S],
) -> FeatureTable {
    table.rename_columns(RENAME_MAP);
    let keep: Vec<&str> = reference_columns.iter().map(AsRef::as_ref).collect();
    table.select(&keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Geometry, Point};
    use rbi_core::table::Value;

    fn table(columns: &[&str], rows: &[Vec<Value>]) -> FeatureTable {
        let mut table = FeatureTable::new(
            columns.iter().map(|c| (*c).to_string()).collect(),
            Some("EPSG:4326".to_string()),
        );
        for (i, row) in rows.iter().enumerate() {
            table.push(Geometry::Point(Point::new(i as f64, 0.0)), row.clone());
        }
        table
    }

    #[test]
    fn test_renames_and_projects_onto_reference() {
        let reference = table(&["NAMOBJ", "FCODE"], &[vec!["A".into(), "AP010".into()]]);
        let other = table(
            &["NAMOBJ (Nama Objek)", "REMARK"],
            &[vec!["Jalan Sudirman".into(), "JALAN ARTERI".into()]],
        );

        let result = harmonize(other, &reference);
        assert_eq!(result.column_names(), vec!["NAMOBJ", "geometry"]);
        assert_eq!(result.value(0, "NAMOBJ"), Some(&Value::from("Jalan Sudirman")));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_follows_reference_column_order() {
        let reference = table(&["REMARK", "FCODE", "NAMOBJ"], &[]);
        let other = table(
            &["NAMOBJ", "FCODE (Feature Code)", "REMARK (Catatan)", "SHAPE_Area"],
            &[vec!["A".into(), "AP010".into(), "LOKAL".into(), 12.5.into()]],
        );

        let result = harmonize(other, &reference);
        assert_eq!(result.columns(), &["REMARK", "FCODE", "NAMOBJ"]);
        assert_eq!(result.value(0, "REMARK"), Some(&Value::from("LOKAL")));
    }

    #[test]
    fn test_reference_harmonizes_to_itself() {
        let reference = table(
            &["NAMOBJ", "_source", "_layer"],
            &[vec!["A".into(), "jabar".into(), "JALAN_LN_25K".into()]],
        );
        let result = harmonize(reference.clone(), &reference);
        assert_eq!(result, reference);
    }

    #[test]
    fn test_bilingual_reference_columns_are_not_renamed() {
        let reference = table(&["NAMOBJ (Nama Objek)", "FCODE"], &[]);
        let other = table(&["NAMOBJ", "FCODE"], &[vec!["Jl. Raya Serang".into(), "AP030".into()]]);

        let result = harmonize(other, &reference);
        assert_eq!(result.column_names(), vec!["FCODE", "geometry"]);
        assert_eq!(result.value(0, "FCODE"), Some(&Value::from("AP030")));
    }

    #[test]
    fn test_bilingual_reference_loses_renamed_columns_of_itself() {
        let reference = table(
            &["NAMOBJ (Nama Objek)", "REMARK (Catatan)", "FCODE"],
            &[vec!["Jl. Raya Serang".into(), "KOLEKTOR".into(), "AP030".into()]],
        );
        let result = harmonize(reference.clone(), &reference);
        assert_eq!(result.columns(), &["FCODE"]);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_repeated_reference_names_do_not_duplicate_columns() {
        let reference = table(&["NAMOBJ", "NAMOBJ (Nama Objek)", "NAMOBJ"], &[]);
        let other = table(&["NAMOBJ"], &[vec!["Jl. Sudirman".into()]]);

        let result = harmonize_to_columns(other, reference.columns());
        assert_eq!(result.columns(), &["NAMOBJ"]);
    }

    #[test]
    fn test_idempotent() {
        let reference = table(&["NAMOBJ", "FCODE"], &[]);
        let other = table(
            &["NAMOBJ (Nama Objek)", "REMARK", "FCODE"],
            &[vec!["B".into(), "X".into(), "AP030".into()]],
        );
        let once = harmonize(other, &reference);
        let twice = harmonize(once.clone(), &reference);
        assert_eq!(once, twice);
    }
}
