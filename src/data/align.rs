use log::warn;

use super::index::CanonicalIndex;
use super::model::{AlignedSource, Record, Series};
use super::rules::{CleaningRules, DropReason, Placement};
use crate::error::Result;

/// Re-key one source onto the canonical index and apply its cleaning rules.
///
/// Records whose key the primary source never produced are logged and
/// dropped. A read error from `records` aborts the source.
pub fn align_source<I>(
    index: &CanonicalIndex,
    name: &str,
    records: I,
    rules: &CleaningRules,
) -> Result<AlignedSource>
where
    I: IntoIterator<Item = Result<Record>>,
{
    let mut source = AlignedSource::new(name);
    if rules.diversion.is_some() {
        source.diverted = Some(Series::default());
    }

    for record in records {
        let record = record?;
        source.stats.accepted += 1;

        let key = record.key();
        let Some(position) = index.position(&key) else {
            warn!("found run/fill/LS {key} in {name} not in list of LS from primary source");
            source.stats.unmatched += 1;
            continue;
        };
        source.stats.aligned += 1;
        place(&mut source, rules, position, record.delivered());
    }

    Ok(source)
}

/// Apply the cleaning rules to the primary source itself.
///
/// Each record keeps its arrival position, so a duplicated key still plots
/// at both of its lines even though the index only remembers the later one.
pub fn align_primary(name: &str, records: &[Record], rules: &CleaningRules) -> AlignedSource {
    let mut source = AlignedSource::new(name);
    if rules.diversion.is_some() {
        source.diverted = Some(Series::default());
    }
    for (position, record) in records.iter().enumerate() {
        source.stats.accepted += 1;
        source.stats.aligned += 1;
        place(&mut source, rules, position, record.delivered());
    }
    source
}

fn place(source: &mut AlignedSource, rules: &CleaningRules, position: usize, value: f64) {
    let outcome = rules.apply(position, value);
    match outcome.placement {
        Placement::Main(point) => source.series.push(point),
        Placement::Diverted(point) => source.diverted.get_or_insert_with(Series::default).push(point),
        Placement::Dropped(DropReason::Cut) => source.stats.cut += 1,
        Placement::Dropped(DropReason::Discarded) => source.stats.discarded += 1,
    }
    if let Some(point) = outcome.inset {
        source.inset.push(point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::rules::{CutWindow, Diversion, PositionWindow};
    use csv::StringRecord;

    fn rec(ls: usize, value: f64) -> Record {
        let ls = format!("{ls}:{ls}");
        let value = value.to_string();
        let fields = StringRecord::from(vec![
            "300027:6016",
            ls.as_str(),
            "t",
            "STABLE BEAMS",
            "6500",
            value.as_str(),
            "0",
            "0",
            "0",
        ]);
        Record::from_fields(0, fields).unwrap()
    }

    fn ok(records: Vec<Record>) -> impl Iterator<Item = Result<Record>> {
        records.into_iter().map(Ok)
    }

    #[test]
    fn secondary_with_same_keys_aligns_one_to_one() {
        let primary: Vec<Record> = (0..5).map(|ls| rec(ls, 1.0)).collect();
        let index = CanonicalIndex::build(&primary);
        let secondary: Vec<Record> = (0..5).map(|ls| rec(ls, 2.0)).collect();

        let aligned = align_source(&index, "HFOC", ok(secondary), &CleaningRules::default()).unwrap();
        assert_eq!(aligned.series.positions().collect::<Vec<_>>(), [0, 1, 2, 3, 4]);
        assert!(aligned.series.values().all(|v| v == 2.0));
        assert!(aligned.stats.is_clean());
    }

    #[test]
    fn unmatched_key_is_dropped_and_index_untouched() {
        let primary: Vec<Record> = (0..5).map(|ls| rec(ls, 1.0)).collect();
        let index = CanonicalIndex::build(&primary);
        let mut secondary: Vec<Record> = (0..5).map(|ls| rec(ls, 2.0)).collect();
        secondary.insert(2, rec(99, 2.0));

        let aligned = align_source(&index, "PLT", ok(secondary), &CleaningRules::default()).unwrap();
        assert_eq!(aligned.series.len(), 5);
        assert_eq!(aligned.stats.accepted, 6);
        assert_eq!(aligned.stats.unmatched, 1);
        assert_eq!(index.len(), 5);
        assert!(!index.contains(&rec(99, 0.0).key()));
    }

    #[test]
    fn secondary_order_does_not_matter() {
        let primary: Vec<Record> = (0..4).map(|ls| rec(ls, 1.0)).collect();
        let index = CanonicalIndex::build(&primary);
        let secondary = vec![rec(3, 3.0), rec(0, 0.5)];

        let aligned = align_source(&index, "BCM1F", ok(secondary), &CleaningRules::default()).unwrap();
        assert_eq!(aligned.series.positions().collect::<Vec<_>>(), [3, 0]);
    }

    #[test]
    fn diversion_union_covers_kept_points_without_overlap() {
        let primary: Vec<Record> = (0..2000).map(|ls| rec(ls, 1.0)).collect();
        let index = CanonicalIndex::build(&primary);
        let secondary: Vec<Record> = (0..2000).map(|ls| rec(ls, 2.75)).collect();
        let rules = CleaningRules {
            diversion: Some(Diversion::new(1000, 1500)),
            ..Default::default()
        };

        let aligned = align_source(&index, "PCC", ok(secondary), &rules).unwrap();
        let main: Vec<usize> = aligned.series.positions().collect();
        let diverted: Vec<usize> = aligned.diverted.as_ref().unwrap().positions().collect();

        assert_eq!(main.first(), Some(&1001));
        assert_eq!(main.last(), Some(&1499));
        assert_eq!(diverted.first(), Some(&1501));
        assert_eq!(diverted.last(), Some(&1999));
        assert!(main.iter().all(|p| !diverted.contains(p)));
        assert_eq!(aligned.combined().count(), main.len() + diverted.len());
        assert_eq!(aligned.stats.discarded, 1001 + 1);
    }

    #[test]
    fn primary_keeps_arrival_positions_for_duplicate_keys() {
        let primary = vec![rec(1, 1.0), rec(2, 2.0), rec(1, 3.0)];
        let index = CanonicalIndex::build(&primary);
        assert_eq!(index.position(&primary[0].key()), Some(2));

        let aligned = align_primary("HFET", &primary, &CleaningRules::default());
        let points: Vec<(usize, f64)> = aligned.series.points.iter().map(|p| (p.position, p.value)).collect();
        assert_eq!(points, [(0, 1.0), (1, 2.0), (2, 3.0)]);
        assert_eq!(aligned.stats.accepted, 3);
    }

    #[test]
    fn primary_goes_through_the_same_rules() {
        let primary: Vec<Record> = (0..5).map(|ls| rec(ls, 4.0)).collect();
        let rules = CleaningRules {
            blackout: Some(PositionWindow::new(0, 0)),
            cut: Some(CutWindow::new(1, 3)),
            ..Default::default()
        };

        let aligned = align_primary("HFET", &primary, &rules);
        let points: Vec<(usize, f64)> = aligned.series.points.iter().map(|p| (p.position, p.value)).collect();
        assert_eq!(points, [(0, 0.0), (1, 4.0), (2, 4.0)]);
        assert_eq!(aligned.stats.cut, 2);
    }

    #[test]
    fn read_error_aborts_source() {
        let index = CanonicalIndex::default();
        let failing = vec![Err(crate::error::LumiError::NoNormtags)];
        assert!(align_source(&index, "HFET", failing, &CleaningRules::default()).is_err());
    }
}
