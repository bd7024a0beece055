//! Module `geohash` implements the base-32 geohash encoding the
//! geospatial index builds its row keys from: `hash(coord, nChars)`
//! alternates bits between the longitude and latitude ranges, halving
//! each on every bit; `decode` reverses it back to the covered
//! rectangle.
//!
//! Grounded on `examples/original_source`'s geohash implementation per
//! spec.md §4.11 (same base-32 alphabet, same longitude-first bit
//! interleaving, 22-character maximum).

pub const MAX_HASH_LENGTH: usize = 22;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

fn base32_index(c: char) -> Option<u8> {
    BASE32.iter().position(|&b| b as char == c).map(|i| i as u8)
}

/// Encode `(lat, lon)` as a geohash string of exactly `n_chars`
/// characters (clamped to `[1, MAX_HASH_LENGTH]`).
pub fn hash(lat: f64, lon: f64, n_chars: usize) -> String {
    let n_chars = n_chars.clamp(1, MAX_HASH_LENGTH);
    let mut lat_range = (-90.0f64, 90.0f64);
    let mut lon_range = (-180.0f64, 180.0f64);
    let mut is_lon = true;
    let mut bit_count = 0u8;
    let mut ch: u8 = 0;
    let mut out = String::with_capacity(n_chars);

    while out.len() < n_chars {
        if is_lon {
            let mid = (lon_range.0 + lon_range.1) / 2.0;
            ch <<= 1;
            if lon >= mid {
                ch |= 1;
                lon_range.0 = mid;
            } else {
                lon_range.1 = mid;
            }
        } else {
            let mid = (lat_range.0 + lat_range.1) / 2.0;
            ch <<= 1;
            if lat >= mid {
                ch |= 1;
                lat_range.0 = mid;
            } else {
                lat_range.1 = mid;
            }
        }
        is_lon = !is_lon;
        bit_count += 1;
        if bit_count == 5 {
            out.push(BASE32[ch as usize] as char);
            bit_count = 0;
            ch = 0;
        }
    }
    out
}

/// Decode a geohash string back to the rectangle it denotes, as
/// `((lat_min, lat_max), (lon_min, lon_max))`.
pub fn decode(hash_str: &str) -> ((f64, f64), (f64, f64)) {
    let mut lat_range = (-90.0f64, 90.0f64);
    let mut lon_range = (-180.0f64, 180.0f64);
    let mut is_lon = true;

    for c in hash_str.chars() {
        let idx = base32_index(c).unwrap_or(0);
        for bit in (0..5).rev() {
            let bit_val = (idx >> bit) & 1;
            if is_lon {
                let mid = (lon_range.0 + lon_range.1) / 2.0;
                if bit_val == 1 {
                    lon_range.0 = mid;
                } else {
                    lon_range.1 = mid;
                }
            } else {
                let mid = (lat_range.0 + lat_range.1) / 2.0;
                if bit_val == 1 {
                    lat_range.0 = mid;
                } else {
                    lat_range.1 = mid;
                }
            }
            is_lon = !is_lon;
        }
    }
    (lat_range, lon_range)
}

#[cfg(test)]
#[path = "geohash_test.rs"]
mod geohash_test;
