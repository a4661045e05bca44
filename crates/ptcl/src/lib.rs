//! PTCL: precomputed particle point clouds for the morph loader's fast path.
//!
//! - Positions are stored as little-endian f32 xyz triples, already normalized.
//! - Optional per-point colors are stored as u8 rgb triples.
//! - The payload may be zlib-compressed (miniz_oxide).
//! - A flat JSON document is accepted as an alternative encoding.
//!
//! File layout (little-endian):
//!   00  : [u8;4]  magic = b"PTCL"
//!   04  : u32     version = 1
//!   08  : u32     flags (bitfield)
//!                 bit 0 => per-point colors present
//!                 bit 1 => payload zlib-compressed
//!   0C  : u32     points_count
//!   ..  : u32     payload_size          (if bit1)
//!   ..  : payload
//!
//! Payload:
//!   points_count × (f32 x, f32 y, f32 z)
//!   points_count × (u8 r, u8 g, u8 b)    (if bit0)
//!
//! JSON documents are either a bare flat array `[x0, y0, z0, x1, ...]` or an
//! object `{"positions": [...], "colors": [...]}` with colors in [0,1].

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::Path;

pub const PTCL_MAGIC: [u8; 4] = *b"PTCL";
pub const PTCL_VERSION: u32 = 1;

const FLAG_COLORS: u32 = 1 << 0;
const FLAG_ZLIB: u32 = 1 << 1;

/// A decoded point resource. `positions.len()` is always a multiple of 3 and,
/// when present, `colors` has the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct PointResource {
    pub positions: Vec<f32>,
    pub colors: Option<Vec<f32>>,
}

impl PointResource {
    pub fn new(positions: Vec<f32>, colors: Option<Vec<f32>>) -> io::Result<Self> {
        validate(&positions, colors.as_deref())?;
        Ok(Self { positions, colors })
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Storage options for [`write_file`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    pub compress: bool,
}

#[inline(always)]
fn need(buf: &[u8], want: usize) -> io::Result<()> {
    if buf.len() < want {
        Err(io::Error::new(ErrorKind::UnexpectedEof, "truncated PTCL"))
    } else {
        Ok(())
    }
}

#[inline(always)]
fn take<'a>(buf: &mut &'a [u8], n: usize) -> io::Result<&'a [u8]> {
    need(buf, n)?;
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

#[inline(always)]
fn le_u32(buf: &mut &[u8]) -> io::Result<u32> {
    let b = take(buf, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[cold]
fn bad(msg: &str) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, msg)
}

fn validate(positions: &[f32], colors: Option<&[f32]>) -> io::Result<()> {
    if positions.len() % 3 != 0 {
        return Err(bad("position count is not a multiple of 3"));
    }

    if positions.iter().any(|v| !v.is_finite()) {
        return Err(bad("non-finite position value"));
    }

    if let Some(colors) = colors {
        if colors.len() != positions.len() {
            return Err(bad("colors length != positions length"));
        }
    }

    Ok(())
}

/// Reinterpret a tightly packed f32 block; falls back to a portable decode when
/// the slice is misaligned or the target is big-endian.
fn decode_f32s(raw: &[u8]) -> Vec<f32> {
    #[cfg(target_endian = "little")]
    {
        if let Ok(values) = bytemuck::try_cast_slice::<u8, f32>(raw) {
            return values.to_vec();
        }
    }

    raw.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[inline]
pub fn color_to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[inline]
pub fn color_from_u8(c: u8) -> f32 {
    c as f32 / 255.0
}

fn parse_payload(mut p: &[u8], count: usize, has_colors: bool) -> io::Result<PointResource> {
    let pos_bytes = count
        .checked_mul(12)
        .ok_or_else(|| bad("points size overflow"))?;
    let positions = decode_f32s(take(&mut p, pos_bytes)?);

    let colors = if has_colors {
        let raw = take(&mut p, count * 3)?;
        Some(raw.iter().copied().map(color_from_u8).collect())
    } else {
        None
    };

    if !p.is_empty() {
        return Err(bad("trailing bytes after PTCL payload"));
    }

    validate(&positions, colors.as_deref())?;
    Ok(PointResource { positions, colors })
}

/// Parse PTCL from a contiguous byte slice.
pub fn parse_ptcl_bytes(mut p: &[u8]) -> io::Result<PointResource> {
    if take(&mut p, 4)? != PTCL_MAGIC {
        return Err(bad("bad PTCL magic"));
    }

    let version = le_u32(&mut p)?;
    if version != PTCL_VERSION {
        return Err(bad("unsupported PTCL version"));
    }

    let flags = le_u32(&mut p)?;
    let has_colors = (flags & FLAG_COLORS) != 0;
    let compressed = (flags & FLAG_ZLIB) != 0;

    let count = le_u32(&mut p)? as usize;

    if compressed {
        let payload_size = le_u32(&mut p)? as usize;
        let packed = take(&mut p, payload_size)?;
        let bytes_per_point = if has_colors { 15 } else { 12 };
        let expected = count
            .checked_mul(bytes_per_point)
            .ok_or_else(|| bad("points size overflow"))?;
        let payload = miniz_oxide::inflate::decompress_to_vec_zlib_with_limit(packed, expected)
            .map_err(|e| bad(&format!("zlib payload: {:?}", e.status)))?;
        parse_payload(&payload, count, has_colors)
    } else {
        parse_payload(p, count, has_colors)
    }
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum JsonDoc {
    Flat(Vec<f32>),
    Object {
        positions: Vec<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        colors: Option<Vec<f32>>,
    },
}

/// Parse a JSON point document (flat array or `{positions, colors}` object).
pub fn parse_json_bytes(bytes: &[u8]) -> io::Result<PointResource> {
    let doc: JsonDoc = serde_json::from_slice(bytes)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;

    let (positions, colors) = match doc {
        JsonDoc::Flat(positions) => (positions, None),
        JsonDoc::Object { positions, colors } => (positions, colors),
    };

    PointResource::new(positions, colors)
}

/// Read either encoding, chosen by file extension (`.json` is JSON, anything
/// else is parsed as PTCL).
pub fn read_path<P: AsRef<Path>>(path: P) -> io::Result<PointResource> {
    let path = path.as_ref();
    if is_json(path) {
        parse_json_bytes(&std::fs::read(path)?)
    } else {
        read_file(path)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
}

/// Fast path: prefer mmap; fall back to a single read.
#[cfg(feature = "mmap")]
pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<PointResource> {
    let file = File::open(path)?;
    let map = unsafe { memmap2::MmapOptions::new().map(&file)? };
    parse_ptcl_bytes(&map)
}

#[cfg(not(feature = "mmap"))]
pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<PointResource> {
    let bytes = std::fs::read(path)?;
    parse_ptcl_bytes(&bytes)
}

/// Encode a resource into PTCL bytes.
pub fn encode_ptcl(res: &PointResource, opts: WriteOptions) -> io::Result<Vec<u8>> {
    validate(&res.positions, res.colors.as_deref())?;

    let count = u32::try_from(res.point_count()).map_err(|_| bad("too many points"))?;

    let mut flags = 0u32;
    if res.colors.is_some() {
        flags |= FLAG_COLORS;
    }
    if opts.compress {
        flags |= FLAG_ZLIB;
    }

    let mut payload = Vec::with_capacity(res.positions.len() * 4 + res.positions.len());
    for v in &res.positions {
        payload.extend_from_slice(&v.to_le_bytes());
    }
    if let Some(colors) = res.colors.as_ref() {
        payload.extend(colors.iter().copied().map(color_to_u8));
    }

    let mut out = Vec::with_capacity(20 + payload.len());
    out.extend_from_slice(&PTCL_MAGIC);
    out.extend_from_slice(&PTCL_VERSION.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());

    if opts.compress {
        let packed = miniz_oxide::deflate::compress_to_vec_zlib(&payload, 6);
        let size = u32::try_from(packed.len()).map_err(|_| bad("payload too large"))?;
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&packed);
    } else {
        out.extend_from_slice(&payload);
    }

    Ok(out)
}

pub fn write_file<P: AsRef<Path>>(path: P, res: &PointResource, opts: WriteOptions) -> io::Result<()> {
    let bytes = encode_ptcl(res, opts)?;
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(&bytes)?;
    file.flush()?;

    Ok(())
}

/// Write the JSON encoding. Colors (if any) produce the object form, otherwise
/// a bare flat array is written.
pub fn write_json<P: AsRef<Path>>(path: P, res: &PointResource) -> io::Result<()> {
    validate(&res.positions, res.colors.as_deref())?;

    let doc = match res.colors.as_ref() {
        Some(colors) => JsonDoc::Object {
            positions: res.positions.clone(),
            colors: Some(colors.clone()),
        },
        None => JsonDoc::Flat(res.positions.clone()),
    };

    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer(file, &doc).map_err(|e| io::Error::new(ErrorKind::Other, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PointResource {
        PointResource::new(
            vec![0.0, 1.0, 2.0, -3.5, 4.25, 5.0],
            Some(vec![0.0, 0.5, 1.0, 1.0, 0.0, 0.2]),
        )
        .unwrap()
    }

    #[test]
    fn compressed_ptcl_preserves_positions_and_quantizes_colors() {
        let res = sample();
        let bytes = encode_ptcl(&res, WriteOptions { compress: true }).unwrap();
        let back = parse_ptcl_bytes(&bytes).unwrap();

        assert_eq!(back.positions, res.positions);
        let colors = back.colors.unwrap();
        for (a, b) in colors.iter().zip(res.colors.unwrap()) {
            assert!((a - b).abs() <= 1.0 / 255.0);
        }
    }

    #[test]
    fn rejects_bad_magic_and_truncation() {
        let mut bytes = encode_ptcl(&sample(), WriteOptions::default()).unwrap();

        let truncated = &bytes[..bytes.len() - 2];
        let err = parse_ptcl_bytes(truncated).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);

        bytes[0] = b'X';
        let err = parse_ptcl_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn oversized_zlib_payload_is_rejected() {
        let packed = miniz_oxide::deflate::compress_to_vec_zlib(&vec![0u8; 1 << 20], 6);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&PTCL_MAGIC);
        bytes.extend_from_slice(&PTCL_VERSION.to_le_bytes());
        bytes.extend_from_slice(&FLAG_ZLIB.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&(packed.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&packed);

        let err = parse_ptcl_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn json_accepts_flat_and_object_forms() {
        let flat = parse_json_bytes(b"[1, 2, 3, 4, 5, 6]").unwrap();
        assert_eq!(flat.point_count(), 2);
        assert!(flat.colors.is_none());

        let obj = parse_json_bytes(br#"{"positions":[1,2,3],"colors":[1,0,0]}"#).unwrap();
        assert_eq!(obj.positions, vec![1.0, 2.0, 3.0]);
        assert_eq!(obj.colors, Some(vec![1.0, 0.0, 0.0]));
    }

    #[test]
    fn json_rejects_ragged_arrays() {
        assert!(parse_json_bytes(b"[1, 2, 3, 4]").is_err());
        assert!(parse_json_bytes(br#"{"positions":[1,2,3],"colors":[1]}"#).is_err());
    }

    #[test]
    fn read_path_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let res = sample();

        let json_path = dir.path().join("shape.json");
        write_json(&json_path, &res).unwrap();
        assert_eq!(read_path(&json_path).unwrap().positions, res.positions);

        let bin_path = dir.path().join("shape.ptcl");
        write_file(&bin_path, &res, WriteOptions::default()).unwrap();
        assert_eq!(read_path(&bin_path).unwrap().point_count(), 2);
    }
}
