//! Web font containers
//!
//! WOFF1 is unwrapped back into a plain sfnt so it can be parsed like any
//! TrueType/OpenType file. WOFF2 is Brotli-decompressed and rebuilt from its
//! untransformed tables. EOT files carry the sfnt verbatim at the end unless
//! MTX compression or XOR obfuscation is set.

use flate2::read::ZlibDecoder;
use std::io::Read;

/// WOFF signature ('wOFF')
pub const WOFF_SIGNATURE: u32 = 0x774F_4646;

/// WOFF2 signature ('wOF2')
pub const WOFF2_SIGNATURE: u32 = 0x774F_4632;

/// EOT magic number, little-endian at offset 34
pub const EOT_MAGIC: u16 = 0x504C;

const WOFF_HEADER_LEN: usize = 44;
const WOFF_ENTRY_LEN: usize = 20;
const WOFF2_HEADER_LEN: usize = 48;
const EOT_FIXED_HEADER_LEN: usize = 36;

const EOT_FLAG_MTX_COMPRESSED: u32 = 0x0000_0004;
const EOT_FLAG_XOR_ENCRYPTED: u32 = 0x1000_0000;

/// Largest sfnt we are willing to inflate a WOFF into
const MAX_SFNT_SIZE: usize = 64 * 1024 * 1024;

/// Flavor of a font collection ('ttcf')
const TTC_FLAVOR: u32 = 0x7474_6366;

/// Flag value announcing an explicit tag in a WOFF2 directory entry
const WOFF2_ARBITRARY_TAG: u8 = 0x3F;

/// Tags addressed by index in WOFF2 table directory flags
const WOFF2_KNOWN_TAGS: [[u8; 4]; 63] = [
    *b"cmap", *b"head", *b"hhea", *b"hmtx", *b"maxp", *b"name", *b"OS/2", *b"post",
    *b"cvt ", *b"fpgm", *b"glyf", *b"loca", *b"prep", *b"CFF ", *b"VORG", *b"EBDT",
    *b"EBLC", *b"gasp", *b"hdmx", *b"kern", *b"LTSH", *b"PCLT", *b"VDMX", *b"vhea",
    *b"vmtx", *b"BASE", *b"GDEF", *b"GPOS", *b"GSUB", *b"EBSC", *b"JSTF", *b"MATH",
    *b"CBDT", *b"CBLC", *b"COLR", *b"CPAL", *b"SVG ", *b"sbix", *b"acnt", *b"avar",
    *b"bdat", *b"bloc", *b"bsln", *b"cvar", *b"fdsc", *b"feat", *b"fmtx", *b"fvar",
    *b"gvar", *b"hsty", *b"just", *b"lcar", *b"mort", *b"morx", *b"opbd", *b"prop",
    *b"trak", *b"Zapf", *b"Silf", *b"Glat", *b"Gloc", *b"Feat", *b"Sill",
];

/// sfnt magic numbers accepted as a container flavor
const SFNT_FLAVORS: [u32; 4] = [0x0001_0000, 0x4F54_544F, 0x7472_7565, 0x7474_6366];

fn be_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn be_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn le_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn le_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Table ready to be laid out in an sfnt
struct SfntTable {
    tag: [u8; 4],
    checksum: u32,
    data: Vec<u8>,
}

/// Lay `tables` out as an sfnt with a sorted, binary-searchable directory
fn build_sfnt(flavor: u32, mut tables: Vec<SfntTable>) -> Result<Vec<u8>, String> {
    if tables.is_empty() {
        return Err("font has no tables".to_string());
    }
    let num_tables = u16::try_from(tables.len()).map_err(|_| "too many tables".to_string())?;

    // Readers binary-search the sfnt table directory
    tables.sort_by(|a, b| a.tag.cmp(&b.tag));

    let header_len = 12 + tables.len() * 16;
    let mut output = vec![0u8; header_len];

    output[0..4].copy_from_slice(&flavor.to_be_bytes());
    output[4..6].copy_from_slice(&num_tables.to_be_bytes());
    let entry_selector = u16::BITS - 1 - num_tables.leading_zeros();
    let search_range = (1u32 << entry_selector) * 16;
    let range_shift = u32::from(num_tables) * 16 - search_range;
    output[6..8].copy_from_slice(&(search_range as u16).to_be_bytes());
    output[8..10].copy_from_slice(&(entry_selector as u16).to_be_bytes());
    output[10..12].copy_from_slice(&(range_shift as u16).to_be_bytes());

    for (i, table) in tables.iter().enumerate() {
        let table_offset = output.len();
        if table_offset + table.data.len() > MAX_SFNT_SIZE {
            return Err("decoded font exceeds size limit".to_string());
        }

        let dir = 12 + i * 16;
        output[dir..dir + 4].copy_from_slice(&table.tag);
        output[dir + 4..dir + 8].copy_from_slice(&table.checksum.to_be_bytes());
        output[dir + 8..dir + 12].copy_from_slice(&(table_offset as u32).to_be_bytes());
        output[dir + 12..dir + 16].copy_from_slice(&(table.data.len() as u32).to_be_bytes());

        output.extend_from_slice(&table.data);
        while output.len() % 4 != 0 {
            output.push(0);
        }
    }

    Ok(output)
}

/// sfnt table checksum: wrapping sum of big-endian words, zero padded
fn table_checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

/// WOFF table directory entry
#[derive(Debug)]
struct WoffTableEntry {
    tag: [u8; 4],
    offset: usize,
    comp_length: usize,
    orig_length: usize,
    orig_checksum: u32,
}

/// Decode WOFF1 to raw OpenType/TrueType data
pub fn decode_woff(data: &[u8]) -> Result<Vec<u8>, String> {
    let truncated = || "truncated WOFF header".to_string();

    if data.len() < WOFF_HEADER_LEN {
        return Err(truncated());
    }
    if be_u32(data, 0) != Some(WOFF_SIGNATURE) {
        return Err("missing WOFF signature".to_string());
    }

    let flavor = be_u32(data, 4).ok_or_else(truncated)?;
    let length = be_u32(data, 8).ok_or_else(truncated)? as usize;
    let num_tables = be_u16(data, 12).ok_or_else(truncated)?;

    if length != data.len() {
        return Err(format!(
            "WOFF declares {} bytes but file has {}",
            length,
            data.len()
        ));
    }
    if num_tables == 0 {
        return Err("WOFF has no tables".to_string());
    }

    let mut tables = Vec::with_capacity(num_tables as usize);
    for i in 0..num_tables as usize {
        let base = WOFF_HEADER_LEN + i * WOFF_ENTRY_LEN;
        let field = |off: usize| be_u32(data, base + off).ok_or("truncated WOFF table directory");
        let entry = WoffTableEntry {
            tag: field(0)?.to_be_bytes(),
            offset: field(4)? as usize,
            comp_length: field(8)? as usize,
            orig_length: field(12)? as usize,
            orig_checksum: field(16)?,
        };
        tables.push(SfntTable {
            tag: entry.tag,
            checksum: entry.orig_checksum,
            data: inflate_table(data, &entry)?,
        });
    }

    build_sfnt(flavor, tables)
}

fn inflate_table(data: &[u8], entry: &WoffTableEntry) -> Result<Vec<u8>, String> {
    let tag = String::from_utf8_lossy(&entry.tag).into_owned();
    let end = entry
        .offset
        .checked_add(entry.comp_length)
        .ok_or_else(|| format!("table '{}' offset overflows", tag))?;
    let raw = data
        .get(entry.offset..end)
        .ok_or_else(|| format!("table '{}' lies outside the file", tag))?;

    if entry.comp_length == entry.orig_length {
        return Ok(raw.to_vec());
    }
    if entry.comp_length > entry.orig_length || entry.orig_length > MAX_SFNT_SIZE {
        return Err(format!("table '{}' has inconsistent lengths", tag));
    }

    let mut table = Vec::with_capacity(entry.orig_length);
    ZlibDecoder::new(raw)
        .take(entry.orig_length as u64 + 1)
        .read_to_end(&mut table)
        .map_err(|e| format!("table '{}' failed to inflate: {}", tag, e))?;

    if table.len() != entry.orig_length {
        return Err(format!(
            "table '{}' inflated to {} bytes, expected {}",
            tag,
            table.len(),
            entry.orig_length
        ));
    }
    Ok(table)
}

/// Fields of the 48-byte WOFF2 header that decoding needs
struct Woff2Header {
    flavor: u32,
    num_tables: u16,
    total_sfnt_size: usize,
    compressed_length: usize,
}

fn woff2_header(data: &[u8]) -> Result<Woff2Header, String> {
    if data.len() < WOFF2_HEADER_LEN {
        return Err("truncated WOFF2 header".to_string());
    }
    if be_u32(data, 0) != Some(WOFF2_SIGNATURE) {
        return Err("missing WOFF2 signature".to_string());
    }

    let header = Woff2Header {
        flavor: be_u32(data, 4).unwrap_or(0),
        num_tables: be_u16(data, 12).unwrap_or(0),
        total_sfnt_size: be_u32(data, 16).unwrap_or(0) as usize,
        compressed_length: be_u32(data, 20).unwrap_or(0) as usize,
    };
    let length = be_u32(data, 8).unwrap_or(0) as usize;

    if !SFNT_FLAVORS.contains(&header.flavor) {
        return Err(format!("unknown WOFF2 flavor 0x{:08X}", header.flavor));
    }
    if length != data.len() {
        return Err(format!(
            "WOFF2 declares {} bytes but file has {}",
            length,
            data.len()
        ));
    }
    if header.num_tables == 0 {
        return Err("WOFF2 has no tables".to_string());
    }
    if header.compressed_length == 0 || header.compressed_length > data.len() - WOFF2_HEADER_LEN {
        return Err("WOFF2 compressed stream size is invalid".to_string());
    }
    if header.total_sfnt_size > MAX_SFNT_SIZE {
        return Err("WOFF2 declares a font above the size limit".to_string());
    }
    Ok(header)
}

/// Big-endian reader over the WOFF2 directories
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn u8(&mut self) -> Result<u8, String> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or("truncated WOFF2 table directory")?;
        self.pos += 1;
        Ok(byte)
    }

    fn u32(&mut self) -> Result<u32, String> {
        let value = be_u32(self.data, self.pos).ok_or("truncated WOFF2 table directory")?;
        self.pos += 4;
        Ok(value)
    }

    /// UIntBase128: up to five 7-bit groups, no leading zero group
    fn base128(&mut self) -> Result<u32, String> {
        let mut value = 0u32;
        for i in 0..5 {
            let byte = self.u8()?;
            if i == 0 && byte == 0x80 {
                return Err("UIntBase128 has a leading zero".to_string());
            }
            if value & 0xFE00_0000 != 0 {
                return Err("UIntBase128 overflows".to_string());
            }
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err("UIntBase128 is longer than five bytes".to_string())
    }

    /// 255UInt16
    fn uint255(&mut self) -> Result<u16, String> {
        match self.u8()? {
            253 => {
                let hi = u16::from(self.u8()?);
                let lo = u16::from(self.u8()?);
                Ok((hi << 8) | lo)
            }
            254 => Ok(u16::from(self.u8()?) + 506),
            255 => Ok(u16::from(self.u8()?) + 253),
            byte => Ok(u16::from(byte)),
        }
    }
}

/// WOFF2 table directory entry
#[derive(Debug)]
struct Woff2TableEntry {
    tag: [u8; 4],
    orig_length: u32,
    /// Present only when a preprocessing transform was applied
    transform_length: Option<u32>,
}

impl Woff2TableEntry {
    fn read(cursor: &mut Cursor<'_>) -> Result<Self, String> {
        let flags = cursor.u8()?;
        let tag = match flags & 0x3F {
            WOFF2_ARBITRARY_TAG => cursor.u32()?.to_be_bytes(),
            index => WOFF2_KNOWN_TAGS[index as usize],
        };

        // glyf/loca use version 0 for their transform and 3 for none;
        // every other table is untransformed at version 0
        let version = flags >> 6;
        let transformed = if &tag == b"glyf" || &tag == b"loca" {
            version != 3
        } else {
            version != 0
        };

        let orig_length = cursor.base128()?;
        let transform_length = if transformed {
            Some(cursor.base128()?)
        } else {
            None
        };

        Ok(Self {
            tag,
            orig_length,
            transform_length,
        })
    }

    /// Bytes this table occupies in the decompressed stream
    fn stream_length(&self) -> usize {
        self.transform_length.unwrap_or(self.orig_length) as usize
    }
}

/// Read the collection directory and return the first font's flavor and
/// table indices
fn first_collection_font(cursor: &mut Cursor<'_>, num_tables: usize) -> Result<(u32, Vec<usize>), String> {
    let _version = cursor.u32()?;
    let num_fonts = cursor.uint255()?;
    if num_fonts == 0 {
        return Err("WOFF2 collection has no fonts".to_string());
    }

    let mut first = None;
    for _ in 0..num_fonts {
        let count = cursor.uint255()?;
        let flavor = cursor.u32()?;
        let mut indices = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let index = cursor.uint255()? as usize;
            if index >= num_tables {
                return Err(format!("WOFF2 collection references missing table {}", index));
            }
            indices.push(index);
        }
        first.get_or_insert((flavor, indices));
    }
    first.ok_or_else(|| "WOFF2 collection has no fonts".to_string())
}

/// Decode WOFF2 into an sfnt carrying every untransformed table
///
/// The Brotli stream is fully decompressed and checked against the table
/// directory. Transformed `glyf`/`loca`/`hmtx` tables are left out: the result
/// carries naming and metrics tables, not outlines. For collections only the
/// first font is rebuilt.
pub fn decode_woff2(data: &[u8]) -> Result<Vec<u8>, String> {
    let header = woff2_header(data)?;

    let mut cursor = Cursor::new(data, WOFF2_HEADER_LEN);
    let entries = (0..header.num_tables)
        .map(|_| Woff2TableEntry::read(&mut cursor))
        .collect::<Result<Vec<_>, _>>()?;

    let (flavor, font_tables) = if header.flavor == TTC_FLAVOR {
        first_collection_font(&mut cursor, entries.len())?
    } else {
        (header.flavor, (0..entries.len()).collect())
    };

    let compressed = cursor
        .pos
        .checked_add(header.compressed_length)
        .and_then(|end| data.get(cursor.pos..end))
        .ok_or("WOFF2 compressed stream lies outside the file")?;

    let expected = entries
        .iter()
        .try_fold(0usize, |sum, entry| sum.checked_add(entry.stream_length()))
        .filter(|total| *total <= MAX_SFNT_SIZE)
        .ok_or("WOFF2 table directory exceeds size limit")?;

    let mut stream = Vec::with_capacity(expected);
    brotli::Decompressor::new(compressed, 4096)
        .take(expected as u64 + 1)
        .read_to_end(&mut stream)
        .map_err(|e| format!("WOFF2 stream failed to decompress: {}", e))?;

    if stream.len() != expected {
        return Err(format!(
            "WOFF2 stream decompressed to {} bytes, table directory needs {}",
            stream.len(),
            expected
        ));
    }

    let mut offsets = Vec::with_capacity(entries.len());
    let mut offset = 0;
    for entry in &entries {
        offsets.push(offset);
        offset += entry.stream_length();
    }

    let tables: Vec<SfntTable> = font_tables
        .into_iter()
        .filter(|&i| entries[i].transform_length.is_none())
        .map(|i| {
            let table = &stream[offsets[i]..offsets[i] + entries[i].stream_length()];
            SfntTable {
                tag: entries[i].tag,
                checksum: table_checksum(table),
                data: table.to_vec(),
            }
        })
        .collect();

    for required in [b"head", b"hhea", b"maxp"] {
        if !tables.iter().any(|t| &t.tag == required) {
            return Err(format!(
                "WOFF2 has no usable '{}' table",
                String::from_utf8_lossy(required)
            ));
        }
    }

    build_sfnt(flavor, tables)
}

/// Whether `data` starts like an Embedded OpenType file
pub fn looks_like_eot(data: &[u8]) -> bool {
    data.len() >= EOT_FIXED_HEADER_LEN && le_u16(data, 34) == Some(EOT_MAGIC)
}

/// Validate an EOT header and return the embedded sfnt when stored verbatim
pub fn eot_payload(data: &[u8]) -> Result<Option<&[u8]>, String> {
    if !looks_like_eot(data) {
        return Err("missing EOT magic number".to_string());
    }

    let eot_size = le_u32(data, 0).unwrap_or(0) as usize;
    let font_data_size = le_u32(data, 4).unwrap_or(0) as usize;
    let flags = le_u32(data, 12).unwrap_or(0);

    if eot_size != data.len() {
        return Err(format!(
            "EOT declares {} bytes but file has {}",
            eot_size,
            data.len()
        ));
    }
    if font_data_size == 0 || font_data_size > data.len() - EOT_FIXED_HEADER_LEN {
        return Err("EOT font data size is invalid".to_string());
    }
    if flags & (EOT_FLAG_MTX_COMPRESSED | EOT_FLAG_XOR_ENCRYPTED) != 0 {
        return Ok(None);
    }

    Ok(Some(&data[data.len() - font_data_size..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn woff_from_tables(tables: &[([u8; 4], Vec<u8>, bool)]) -> Vec<u8> {
        let mut payloads = Vec::new();
        for (tag, data, compress) in tables {
            let stored = if *compress {
                let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
                enc.write_all(data).unwrap();
                enc.finish().unwrap()
            } else {
                data.clone()
            };
            payloads.push((*tag, data.len(), stored));
        }

        let mut out = vec![0u8; WOFF_HEADER_LEN + tables.len() * WOFF_ENTRY_LEN];
        let mut entries = Vec::new();
        for (tag, orig_len, stored) in &payloads {
            let offset = out.len();
            out.extend_from_slice(stored);
            while out.len() % 4 != 0 {
                out.push(0);
            }
            entries.push((*tag, offset, stored.len(), *orig_len));
        }

        let total = out.len() as u32;
        out[0..4].copy_from_slice(&WOFF_SIGNATURE.to_be_bytes());
        out[4..8].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        out[8..12].copy_from_slice(&total.to_be_bytes());
        out[12..14].copy_from_slice(&(tables.len() as u16).to_be_bytes());
        for (i, (tag, offset, comp, orig)) in entries.iter().enumerate() {
            let base = WOFF_HEADER_LEN + i * WOFF_ENTRY_LEN;
            out[base..base + 4].copy_from_slice(tag);
            out[base + 4..base + 8].copy_from_slice(&(*offset as u32).to_be_bytes());
            out[base + 8..base + 12].copy_from_slice(&(*comp as u32).to_be_bytes());
            out[base + 12..base + 16].copy_from_slice(&(*orig as u32).to_be_bytes());
        }
        out
    }

    #[test]
    fn test_decode_woff_mixed_tables() {
        let plain = vec![7u8; 8];
        let packed = vec![3u8; 200];
        let woff = woff_from_tables(&[(*b"abcd", plain.clone(), false), (*b"wxyz", packed.clone(), true)]);

        let sfnt = decode_woff(&woff).unwrap();

        assert_eq!(be_u32(&sfnt, 0), Some(0x0001_0000));
        assert_eq!(be_u16(&sfnt, 4), Some(2));
        // searchRange / entrySelector / rangeShift for two tables
        assert_eq!(be_u16(&sfnt, 6), Some(32));
        assert_eq!(be_u16(&sfnt, 8), Some(1));
        assert_eq!(be_u16(&sfnt, 10), Some(0));

        let second_offset = be_u32(&sfnt, 12 + 16 + 8).unwrap() as usize;
        let second_len = be_u32(&sfnt, 12 + 16 + 12).unwrap() as usize;
        assert_eq!(&sfnt[second_offset..second_offset + second_len], packed.as_slice());
    }

    #[test]
    fn test_decode_woff_rejects_bad_signature() {
        let mut woff = woff_from_tables(&[(*b"abcd", vec![1, 2, 3, 4], false)]);
        woff[0] = b'x';
        assert!(decode_woff(&woff).is_err());
    }

    #[test]
    fn test_decode_woff_rejects_out_of_bounds_table() {
        let mut woff = woff_from_tables(&[(*b"abcd", vec![1, 2, 3, 4], false)]);
        let base = WOFF_HEADER_LEN;
        woff[base + 4..base + 8].copy_from_slice(&10_000u32.to_be_bytes());
        assert!(decode_woff(&woff).is_err());
    }

    fn base128(mut value: u32) -> Vec<u8> {
        let mut bytes = vec![(value & 0x7F) as u8];
        value >>= 7;
        while value > 0 {
            bytes.push((value & 0x7F) as u8 | 0x80);
            value >>= 7;
        }
        bytes.reverse();
        bytes
    }

    /// WOFF2 with one Brotli stream; `true` marks a transformed table
    fn woff2_from_tables(tables: &[([u8; 4], Vec<u8>, bool)]) -> Vec<u8> {
        let mut directory = Vec::new();
        let mut stream = Vec::new();
        for (tag, data, transformed) in tables {
            let glyf_like = tag == b"glyf" || tag == b"loca";
            let version: u8 = match (glyf_like, *transformed) {
                (true, true) | (false, false) => 0,
                (true, false) => 3,
                (false, true) => 1,
            };
            match WOFF2_KNOWN_TAGS.iter().position(|known| known == tag) {
                Some(index) => directory.push(index as u8 | version << 6),
                None => {
                    directory.push(WOFF2_ARBITRARY_TAG | version << 6);
                    directory.extend_from_slice(tag);
                }
            }
            directory.extend(base128(data.len() as u32));
            if *transformed {
                directory.extend(base128(data.len() as u32));
            }
            stream.extend_from_slice(data);
        }

        let mut writer = brotli::CompressorWriter::new(Vec::new(), 4096, 9, 22);
        writer.write_all(&stream).unwrap();
        let compressed = writer.into_inner();

        let mut out = vec![0u8; WOFF2_HEADER_LEN];
        out.extend_from_slice(&directory);
        out.extend_from_slice(&compressed);
        while out.len() % 4 != 0 {
            out.push(0);
        }

        let total = out.len() as u32;
        out[0..4].copy_from_slice(&WOFF2_SIGNATURE.to_be_bytes());
        out[4..8].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        out[8..12].copy_from_slice(&total.to_be_bytes());
        out[12..14].copy_from_slice(&(tables.len() as u16).to_be_bytes());
        out[16..20].copy_from_slice(&(stream.len() as u32 + 256).to_be_bytes());
        out[20..24].copy_from_slice(&(compressed.len() as u32).to_be_bytes());
        out[24..26].copy_from_slice(&1u16.to_be_bytes());
        out
    }

    fn sfnt_tags(sfnt: &[u8]) -> Vec<[u8; 4]> {
        let count = be_u16(sfnt, 4).unwrap() as usize;
        (0..count)
            .map(|i| be_u32(sfnt, 12 + i * 16).unwrap().to_be_bytes())
            .collect()
    }

    #[test]
    fn test_decode_woff2_rebuilds_tables() {
        let name = b"name-table".to_vec();
        let woff2 = woff2_from_tables(&[
            (*b"head", vec![1u8; 54], false),
            (*b"hhea", vec![2u8; 36], false),
            (*b"maxp", vec![3u8; 6], false),
            (*b"name", name.clone(), false),
            (*b"Zzzz", vec![4u8; 5], false),
        ]);

        let sfnt = decode_woff2(&woff2).unwrap();

        assert_eq!(be_u32(&sfnt, 0), Some(0x0001_0000));
        assert_eq!(
            sfnt_tags(&sfnt),
            vec![*b"Zzzz", *b"head", *b"hhea", *b"maxp", *b"name"]
        );
        let dir = 12 + 4 * 16;
        let offset = be_u32(&sfnt, dir + 8).unwrap() as usize;
        assert_eq!(&sfnt[offset..offset + name.len()], name.as_slice());
        assert_eq!(be_u32(&sfnt, dir + 4), Some(table_checksum(&name)));
    }

    #[test]
    fn test_decode_woff2_skips_transformed_tables() {
        let woff2 = woff2_from_tables(&[
            (*b"glyf", vec![9u8; 40], true),
            (*b"head", vec![1u8; 54], false),
            (*b"hhea", vec![2u8; 36], false),
            (*b"loca", Vec::new(), true),
            (*b"maxp", vec![3u8; 6], false),
        ]);

        let sfnt = decode_woff2(&woff2).unwrap();
        assert_eq!(sfnt_tags(&sfnt), vec![*b"head", *b"hhea", *b"maxp"]);
    }

    #[test]
    fn test_decode_woff2_requires_core_tables() {
        let woff2 = woff2_from_tables(&[(*b"name", vec![5u8; 12], false)]);
        let err = decode_woff2(&woff2).unwrap_err();
        assert!(err.contains("head"), "{}", err);
    }

    #[test]
    fn test_decode_woff2_rejects_garbage_stream() {
        let mut data = vec![0xAAu8; 64];
        data[0..4].copy_from_slice(&WOFF2_SIGNATURE.to_be_bytes());
        data[4..8].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        data[8..12].copy_from_slice(&64u32.to_be_bytes());
        data[12..14].copy_from_slice(&1u16.to_be_bytes());
        data[16..20].copy_from_slice(&64u32.to_be_bytes());
        data[20..24].copy_from_slice(&8u32.to_be_bytes());

        assert!(decode_woff2(&data).is_err());
    }

    #[test]
    fn test_decode_woff2_rejects_short_stream() {
        let mut woff2 = woff2_from_tables(&[
            (*b"head", vec![1u8; 54], false),
            (*b"hhea", vec![2u8; 36], false),
            (*b"maxp", vec![3u8; 6], false),
        ]);
        // Claim a longer maxp than the stream holds
        let maxp_length = WOFF2_HEADER_LEN + 2 + 2 + 1;
        assert_eq!(woff2[maxp_length], 6);
        woff2[maxp_length] = 7;

        let err = decode_woff2(&woff2).unwrap_err();
        assert!(err.contains("decompressed"), "{}", err);
    }

    #[test]
    fn test_decode_woff2_rejects_bad_length() {
        let mut woff2 = woff2_from_tables(&[(*b"head", vec![1u8; 54], false)]);
        let declared = woff2.len() as u32 + 1;
        woff2[8..12].copy_from_slice(&declared.to_be_bytes());
        assert!(decode_woff2(&woff2).is_err());
    }

    #[test]
    fn test_uint255() {
        let data = [7u8, 253, 0x01, 0x02, 254, 0, 255, 3];
        let mut cursor = Cursor::new(&data, 0);
        assert_eq!(cursor.uint255().unwrap(), 7);
        assert_eq!(cursor.uint255().unwrap(), 0x0102);
        assert_eq!(cursor.uint255().unwrap(), 506);
        assert_eq!(cursor.uint255().unwrap(), 256);
    }

    #[test]
    fn test_base128_rejects_leading_zero() {
        let data = [0x80u8, 0x01];
        assert!(Cursor::new(&data, 0).base128().is_err());

        let data = [0x81u8, 0x00];
        assert_eq!(Cursor::new(&data, 0).base128().unwrap(), 128);
    }

    #[test]
    fn test_eot_payload_flags() {
        let payload = b"sfnt-bytes".to_vec();
        let mut data = vec![0u8; EOT_FIXED_HEADER_LEN + 4];
        data.extend_from_slice(&payload);
        let total = data.len() as u32;
        data[0..4].copy_from_slice(&total.to_le_bytes());
        data[4..8].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        data[8..12].copy_from_slice(&0x0002_0001u32.to_le_bytes());
        data[34..36].copy_from_slice(&EOT_MAGIC.to_le_bytes());

        assert_eq!(eot_payload(&data).unwrap(), Some(payload.as_slice()));

        data[12..16].copy_from_slice(&EOT_FLAG_MTX_COMPRESSED.to_le_bytes());
        assert_eq!(eot_payload(&data).unwrap(), None);
    }
}
