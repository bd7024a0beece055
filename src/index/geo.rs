//! Geospatial index support: row key = the geohash of the indexed
//! point/area, row body = a pointer to an auxiliary "special" row
//! keyed by a numeric `fullGeoID` carrying the full rectangle plus the
//! caller's emitted value. `GeoIndexEnumerator`'s job (`geo_query`)
//! is to turn a rectangular search area into a small set of geohash
//! ranges that cover it, enumerate those ranges, and reject any
//! candidate whose actual (non-quantized) rectangle doesn't intersect
//! the search area.
//!
//! Grounded on `examples/original_source`'s geo index (`coveringHashRanges`,
//! full-rectangle side table keyed by a synthetic numeric id) per
//! spec.md §4.11. `coveringHashRanges` here is a simplified version of
//! that search: rather than a full DP merge over hash-length and
//! hash-range combinations, it scans precisions from 1 upward and picks
//! the finest one whose covering cell count still fits `max_count`,
//! returning each covered cell as its own single-hash range (no range
//! merging of lexicographically adjacent cells). This is a correctness
//! preserving narrowing of the same idea, not the optimal packing.

use std::collections::HashSet;

use crate::collatable::{CollatableBuilder, CollatableReader};
use crate::geohash;
use crate::Result;

use super::enumerator::{IndexEnumerator, KeyRange};
use super::{decode_row_key, range_for_emitted_key, EmittedValue, Index};
use crate::backend::RangeOptions;

const DEFAULT_MAX_RANGES: usize = 50;
const POINT_HASH_PRECISION: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Range {
        Range { min, max }
    }

    fn intersects(&self, other: &Range) -> bool {
        self.min <= other.max && self.max >= other.min
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Area {
    pub lat: Range,
    pub lon: Range,
}

impl Area {
    pub fn new(lat: Range, lon: Range) -> Area {
        Area { lat, lon }
    }

    pub fn point(coord: Coord) -> Area {
        Area { lat: Range::new(coord.lat, coord.lat), lon: Range::new(coord.lon, coord.lon) }
    }

    pub fn intersects(&self, other: &Area) -> bool {
        self.lat.intersects(&other.lat) && self.lon.intersects(&other.lon)
    }

    fn center(&self) -> Coord {
        Coord { lat: (self.lat.min + self.lat.max) / 2.0, lon: (self.lon.min + self.lon.max) / 2.0 }
    }

    /// Sorted, deduplicated single-hash ranges covering this area at
    /// the finest precision that keeps the cell count at or under
    /// `max_count` (0 means the default of 50), plus the strict
    /// prefixes of the first covering hash so coarser parent cells a
    /// document was indexed under are still matched exactly.
    pub fn covering_hash_ranges(&self, max_count: usize) -> Vec<(String, String)> {
        let max_count = if max_count == 0 { DEFAULT_MAX_RANGES } else { max_count };
        let mut cells = Vec::new();
        for precision in 1..=geohash::MAX_HASH_LENGTH {
            cells = self.cells_at_precision(precision);
            if cells.len() <= max_count || precision == geohash::MAX_HASH_LENGTH {
                break;
            }
        }

        let mut ranges: Vec<(String, String)> = cells.iter().map(|c| (c.clone(), c.clone())).collect();
        if let Some(first) = cells.first() {
            for end in 1..first.len() {
                let prefix = first[..end].to_string();
                ranges.push((prefix.clone(), prefix));
            }
        }
        ranges
    }

    fn cells_at_precision(&self, precision: usize) -> Vec<String> {
        let sample = geohash::hash(self.lat.min, self.lon.min, precision);
        let (lat_r, lon_r) = geohash::decode(&sample);
        let lat_step = (lat_r.1 - lat_r.0).max(1e-12);
        let lon_step = (lon_r.1 - lon_r.0).max(1e-12);

        let mut cells = std::collections::BTreeSet::new();
        let mut lat = self.lat.min;
        let mut guard = 0usize;
        loop {
            let mut lon = self.lon.min;
            loop {
                cells.insert(geohash::hash(lat, lon, precision));
                guard += 1;
                if lon >= self.lon.max || guard > 1_000_000 {
                    break;
                }
                lon = (lon + lon_step).min(self.lon.max);
            }
            if lat >= self.lat.max || guard > 1_000_000 {
                break;
            }
            lat = (lat + lat_step).min(self.lat.max);
        }
        cells.into_iter().collect()
    }
}

fn number_key(n: u64) -> Vec<u8> {
    let mut b = CollatableBuilder::new();
    b.add_number(n as f64);
    b.finish()
}

fn string_key(s: &str) -> Vec<u8> {
    let mut b = CollatableBuilder::new();
    b.add_string(s);
    b.finish()
}

/// Emits the geohash row for `area` plus the auxiliary special row
/// holding the full rectangle and `value`, keyed by `full_geo_id`
/// (caller-assigned, unique per emitted geo key for this document).
pub fn emit_geo(area: &Area, full_geo_id: u64, value: &[u8], emit: &mut dyn FnMut(Vec<u8>, EmittedValue)) {
    let mut special = CollatableBuilder::new();
    special.begin_array();
    special.add_number(area.lat.min);
    special.add_number(area.lat.max);
    special.add_number(area.lon.min);
    special.add_number(area.lon.max);
    special.add_bytes(value);
    special.end_array();
    emit(number_key(full_geo_id), EmittedValue::Body(special.finish()));

    let center = area.center();
    let h = geohash::hash(center.lat, center.lon, POINT_HASH_PRECISION);
    let pointer = number_key(full_geo_id);
    emit(string_key(&h), EmittedValue::Body(pointer));
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeoResult {
    pub doc_id: String,
    pub geo_id: u64,
    pub area: Area,
    pub value: Vec<u8>,
}

/// Queries the geo index for rows whose indexed area intersects
/// `search_area`.
pub fn geo_query(index: &Index, search_area: &Area, max_ranges: usize, opts: &RangeOptions) -> Result<Vec<GeoResult>> {
    let hash_ranges = search_area.covering_hash_ranges(max_ranges);
    let mut key_ranges = Vec::with_capacity(hash_ranges.len());
    for (min_hash, max_hash) in &hash_ranges {
        let (range_min, _) = range_for_emitted_key(&string_key(min_hash));
        let (_, range_max) = range_for_emitted_key(&string_key(max_hash));
        key_ranges.push(KeyRange::new(range_min, range_max, false));
    }

    let mut e = IndexEnumerator::new(index, &key_ranges, None, opts, false, 0, None)?;
    let mut seen = HashSet::new();
    let mut results = Vec::new();

    while e.next() {
        let rec = e.doc();
        let (_emitted_key, doc_id, _emit_index) = decode_row_key(rec.key.as_bytes())?;
        let mut r = CollatableReader::new(rec.body.as_bytes());
        let full_geo_id = r.read_int()? as u64;

        if !seen.insert((doc_id.clone(), full_geo_id)) {
            continue;
        }

        let special = index.store().get(&number_key(full_geo_id))?;
        if !special.exists {
            continue;
        }
        let mut sr = CollatableReader::new(special.body.as_bytes());
        sr.begin_array()?;
        let lat_min = sr.read_double()?;
        let lat_max = sr.read_double()?;
        let lon_min = sr.read_double()?;
        let lon_max = sr.read_double()?;
        let value = sr.read_bytes()?;
        sr.end_array()?;

        let area = Area::new(Range::new(lat_min, lat_max), Range::new(lon_min, lon_max));
        if !area.intersects(search_area) {
            continue;
        }
        results.push(GeoResult { doc_id, geo_id: full_geo_id, area, value });
    }
    Ok(results)
}

#[cfg(test)]
#[path = "geo_test.rs"]
mod geo_test;
