//! Byte-level encoders for synthetic BP files.
#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};

pub fn header(format_version: u8) -> Vec<u8> {
    let mut h = vec![0u8; 64];
    h[..16].copy_from_slice(b"ADIOS-BP v2.9.2 ");
    h[24] = b'2';
    h[25] = b'9';
    h[26] = b'2';
    h[31] = format_version;
    h
}

fn str16(buf: &mut Vec<u8>, s: &str) {
    buf.write_u16::<LittleEndian>(s.len() as u16).unwrap();
    buf.extend_from_slice(s.as_bytes());
}

/// `tag` + u64 length counted from the length field + body.
fn framed(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.write_u64::<LittleEndian>(body.len() as u64 + 8).unwrap();
    out.extend_from_slice(body);
    out
}

/// Dimension component: `(is_reference, value)`.
pub type Dim = (bool, u64);

#[derive(Clone, Debug)]
pub struct Var {
    pub member_id: u32,
    pub name: String,
    pub path: String,
    pub type_id: u8,
    pub is_dimension: bool,
    pub dims: Vec<[Dim; 3]>,
    pub characteristics: Vec<(u8, Vec<u8>)>,
    pub pad: usize,
    pub payload: Option<Vec<u8>>,
}

impl Var {
    /// Scalar of the given type with no characteristics and no payload.
    pub fn new(name: &str, type_id: u8) -> Self {
        Self {
            member_id: 0,
            name: name.to_string(),
            path: String::new(),
            type_id,
            is_dimension: false,
            dims: Vec::new(),
            characteristics: Vec::new(),
            pad: 0,
            payload: None,
        }
    }

    pub fn member_id(mut self, id: u32) -> Self {
        self.member_id = id;
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn dimension_variable(mut self) -> Self {
        self.is_dimension = true;
        self
    }

    /// Literal local/global/offset triple.
    pub fn dim(mut self, local: u64, global: u64, offset: u64) -> Self {
        self.dims.push([(false, local), (false, global), (false, offset)]);
        self
    }

    pub fn dim_raw(mut self, dim: [Dim; 3]) -> Self {
        self.dims.push(dim);
        self
    }

    pub fn characteristic(mut self, kind: u8, raw: &[u8]) -> Self {
        self.characteristics.push((kind, raw.to_vec()));
        self
    }

    pub fn pad(mut self, pad: usize) -> Self {
        self.pad = pad;
        self
    }

    pub fn payload(mut self, bytes: Vec<u8>) -> Self {
        self.payload = Some(bytes);
        self
    }

    /// Payload of `element_size` x product of local dims bytes.
    pub fn filled_payload(self, element_size: usize) -> Self {
        let count: u64 = self.dims.iter().map(|d| d[0].1).product();
        let bytes = (0..count as usize * element_size).map(|i| i as u8).collect();
        self.payload(bytes)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.write_u32::<LittleEndian>(self.member_id).unwrap();
        str16(&mut body, &self.name);
        str16(&mut body, &self.path);
        body.push(self.type_id);
        body.push(if self.is_dimension { b'y' } else { b'n' });
        body.push(self.dims.len() as u8);
        body.write_u16::<LittleEndian>(self.dims.len() as u16 * 27).unwrap();
        for dim in &self.dims {
            for (is_ref, value) in dim {
                body.push(if *is_ref { b'y' } else { b'n' });
                body.write_u64::<LittleEndian>(*value).unwrap();
            }
        }
        let mut entries = Vec::new();
        for (kind, raw) in &self.characteristics {
            entries.push(*kind);
            entries.extend_from_slice(raw);
        }
        body.push(self.characteristics.len() as u8);
        body.write_u32::<LittleEndian>(entries.len() as u32).unwrap();
        body.extend_from_slice(&entries);
        body.push(self.pad as u8 + 4);
        body.extend(std::iter::repeat(b' ').take(self.pad));
        body.extend_from_slice(b"VMD]");
        if let Some(payload) = &self.payload {
            body.extend_from_slice(payload);
        }
        framed(b"[VMD", &body)
    }
}

#[derive(Clone, Debug)]
pub struct Attr {
    pub member_id: u32,
    pub name: String,
    pub type_id: u8,
    pub value: Vec<u8>,
}

impl Attr {
    pub fn new(name: &str, type_id: u8, value: &[u8]) -> Self {
        Self { member_id: 0, name: name.to_string(), type_id, value: value.to_vec() }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.write_u32::<LittleEndian>(self.member_id).unwrap();
        str16(&mut body, &self.name);
        str16(&mut body, "");
        body.push(self.type_id);
        body.extend_from_slice(&self.value);
        body.extend_from_slice(b"AMD]");
        framed(b"[AMD", &body)
    }
}

#[derive(Clone, Debug)]
pub struct Pg {
    pub name: String,
    pub step: u32,
    pub methods: Vec<(u8, String)>,
    pub vars: Vec<Var>,
    pub attrs: Vec<Attr>,
}

impl Pg {
    pub fn new(step: u32) -> Self {
        Self {
            name: "writer".to_string(),
            step,
            methods: vec![(2, String::new())],
            vars: Vec::new(),
            attrs: Vec::new(),
        }
    }

    pub fn var(mut self, var: Var) -> Self {
        self.vars.push(var);
        self
    }

    pub fn attr(mut self, attr: Attr) -> Self {
        self.attrs.push(attr);
        self
    }

    /// Offset of the variables section count field, relative to the PG start.
    pub fn variables_section_offset(&self) -> usize {
        let methods: usize = self.methods.iter().map(|(_, p)| 3 + p.len()).sum();
        4 + 8 + 1 + 2 + self.name.len() + 4 + 2 + self.step.to_string().len() + 4 + 3 + methods
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = vec![b'y'];
        str16(&mut body, &self.name);
        body.extend_from_slice(&[0; 4]);
        str16(&mut body, &self.step.to_string());
        body.write_u32::<LittleEndian>(self.step).unwrap();

        let mut methods = Vec::new();
        for (id, params) in &self.methods {
            methods.push(*id);
            str16(&mut methods, params);
        }
        body.push(self.methods.len() as u8);
        body.write_u16::<LittleEndian>(methods.len() as u16).unwrap();
        body.extend_from_slice(&methods);

        let vars: Vec<u8> = self.vars.iter().flat_map(Var::encode).collect();
        body.write_u32::<LittleEndian>(self.vars.len() as u32).unwrap();
        body.write_u64::<LittleEndian>(vars.len() as u64).unwrap();
        body.extend_from_slice(&vars);

        let attrs: Vec<u8> = self.attrs.iter().flat_map(Attr::encode).collect();
        body.write_u32::<LittleEndian>(self.attrs.len() as u32).unwrap();
        body.write_u64::<LittleEndian>(attrs.len() as u64).unwrap();
        body.extend_from_slice(&attrs);

        body.extend_from_slice(b"PGI]");
        framed(b"[PGI", &body)
    }
}

/// Data file: header followed by the encoded groups.
pub fn data_file(groups: &[Pg]) -> Vec<u8> {
    let mut out = header(4);
    for pg in groups {
        out.extend(pg.encode());
    }
    out
}

/// v4 index row values: step, rank, pg, var, att, end, timestamp, reserved.
pub fn index_v4(rows: &[[u64; 8]]) -> Vec<u8> {
    let mut out = header(4);
    for row in rows {
        for v in row {
            out.write_u64::<LittleEndian>(*v).unwrap();
        }
    }
    out
}

pub fn v5_record(kind: u8, values: &[u64]) -> Vec<u8> {
    let mut out = vec![kind];
    out.write_u64::<LittleEndian>(values.len() as u64 * 8).unwrap();
    for v in values {
        out.write_u64::<LittleEndian>(*v).unwrap();
    }
    out
}

pub fn v5_writer_map(rank_to_subfile: &[u64], aggregators: u64, subfiles: u64) -> Vec<u8> {
    let mut values = vec![rank_to_subfile.len() as u64, aggregators, subfiles];
    values.extend_from_slice(rank_to_subfile);
    v5_record(b'w', &values)
}

/// Step record with the given per-writer `(pos, size)` flushes and final positions.
pub fn v5_step(metadata_pos: u64, metadata_size: u64, writers: &[(Vec<(u64, u64)>, u64)]) -> Vec<u8> {
    let flush_count = writers.first().map_or(0, |(f, _)| f.len() as u64);
    let mut values = vec![metadata_pos, metadata_size, flush_count];
    for (flushes, last) in writers {
        for (pos, size) in flushes {
            values.extend([*pos, *size]);
        }
        values.push(*last);
    }
    v5_record(b's', &values)
}
