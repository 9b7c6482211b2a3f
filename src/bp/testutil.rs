//! Byte-level block encoders for unit tests.

use byteorder::{LittleEndian, WriteBytesExt};

use super::format::*;

pub(crate) fn put_str16(buf: &mut Vec<u8>, s: &str) {
    buf.write_u16::<LittleEndian>(s.len() as u16).unwrap();
    buf.extend_from_slice(s.as_bytes());
}

/// Prefix `body` with a tag and a length counted from the length field.
pub(crate) fn framed(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.write_u64::<LittleEndian>(body.len() as u64 + 8).unwrap();
    out.extend_from_slice(body);
    out
}

pub(crate) struct VarSpec {
    pub member_id: u32,
    pub name: &'static str,
    pub path: &'static str,
    pub type_id: u8,
    pub is_dimension: u8,
    /// (flag, value) for local, global, offset.
    pub dims: Vec<[(u8, u64); 3]>,
    pub characteristics: Vec<(u8, Vec<u8>)>,
    pub pad: usize,
    pub payload: Option<Vec<u8>>,
}

impl VarSpec {
    /// Double array with literal local dimensions and a matching payload.
    pub fn doubles(name: &'static str, local: &[u64]) -> Self {
        let count: u64 = local.iter().product();
        Self {
            member_id: 1,
            name,
            path: "/",
            type_id: 6,
            is_dimension: b'n',
            dims: local.iter().map(|&l| [(b'n', l), (b'n', l), (b'n', 0)]).collect(),
            characteristics: vec![(3, 0u64.to_le_bytes().to_vec())],
            pad: 3,
            payload: Some(vec![0xab; count as usize * 8]),
        }
    }
}

pub(crate) fn encode_vmd(spec: &VarSpec) -> Vec<u8> {
    let mut body = Vec::new();
    body.write_u32::<LittleEndian>(spec.member_id).unwrap();
    put_str16(&mut body, spec.name);
    put_str16(&mut body, spec.path);
    body.push(spec.type_id);
    body.push(spec.is_dimension);
    body.push(spec.dims.len() as u8);
    body.write_u16::<LittleEndian>((spec.dims.len() * DIMENSION_ENTRY_SIZE) as u16)
        .unwrap();
    for dim in &spec.dims {
        for (flag, value) in dim {
            body.push(*flag);
            body.write_u64::<LittleEndian>(*value).unwrap();
        }
    }
    let mut chars = Vec::new();
    for (tag, payload) in &spec.characteristics {
        chars.push(*tag);
        chars.extend_from_slice(payload);
    }
    body.push(spec.characteristics.len() as u8);
    body.write_u32::<LittleEndian>(chars.len() as u32).unwrap();
    body.extend_from_slice(&chars);
    body.push((spec.pad + TAG_SIZE) as u8);
    body.extend(std::iter::repeat(b' ').take(spec.pad));
    body.extend_from_slice(VMD_CLOSE_TAG);
    if let Some(payload) = &spec.payload {
        body.extend_from_slice(payload);
    }
    framed(VMD_OPEN_TAG, &body)
}

pub(crate) fn encode_amd(member_id: u32, name: &str, type_id: u8, value: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.write_u32::<LittleEndian>(member_id).unwrap();
    put_str16(&mut body, name);
    put_str16(&mut body, "/");
    body.push(type_id);
    body.extend_from_slice(value);
    body.extend_from_slice(AMD_CLOSE_TAG);
    framed(AMD_OPEN_TAG, &body)
}

pub(crate) fn encode_pg(step: u32, vars: &[Vec<u8>], attrs: &[Vec<u8>]) -> Vec<u8> {
    let mut body = Vec::new();
    body.push(FLAG_YES);
    put_str16(&mut body, "io");
    body.extend_from_slice(&[0; 4]);
    put_str16(&mut body, &step.to_string());
    body.write_u32::<LittleEndian>(step).unwrap();
    // One POSIX method with empty parameters.
    body.push(1);
    body.write_u16::<LittleEndian>(3).unwrap();
    body.push(2);
    put_str16(&mut body, "");
    for section in [vars, attrs] {
        let bytes: Vec<u8> = section.concat();
        body.write_u32::<LittleEndian>(section.len() as u32).unwrap();
        body.write_u64::<LittleEndian>(bytes.len() as u64).unwrap();
        body.extend_from_slice(&bytes);
    }
    body.extend_from_slice(PG_CLOSE_TAG);
    framed(PG_OPEN_TAG, &body)
}

pub(crate) fn encode_header(format_version: u8) -> Vec<u8> {
    let mut h = vec![0u8; HEADER_SIZE];
    h[..10].copy_from_slice(b"BP Index  ");
    h[MAJOR_OFFSET] = b'2';
    h[MINOR_OFFSET] = b'9';
    h[MICRO_OFFSET] = b'0';
    h[FORMAT_VERSION_OFFSET] = format_version;
    h
}
