//! Field-per-line text reports.

use std::io::{self, Write};

use crate::bp::*;

pub fn write_header(out: &mut impl Write, header: &FormatHeader) -> io::Result<()> {
    writeln!(out, "Header info:")?;
    writeln!(out, "  Version string  : {}", header.version_string)?;
    writeln!(out, "  Version         : {}.{}.{}", header.major, header.minor, header.micro)?;
    writeln!(
        out,
        "  Endianness      : {}",
        if header.is_little_endian { "little endian" } else { "big endian" }
    )?;
    writeln!(out, "  Subfiles        : {}", yes_no(header.has_subfiles))?;
    writeln!(out, "  Format          : {}", header.format_version)?;
    writeln!(out, "  Active (live)   : {}", yes_no(header.is_live))?;
    Ok(())
}

pub fn write_index(out: &mut impl Write, index: &Index) -> io::Result<()> {
    match index {
        Index::V4(idx) => write_index_v4(out, idx),
        Index::V5(idx) => write_index_v5(out, idx),
    }
}

pub fn write_index_v4(out: &mut impl Write, index: &IndexV4) -> io::Result<()> {
    write_header(out, &index.header)?;
    writeln!(out)?;
    writeln!(
        out,
        "  {:>6}  {:>6}  {:>12}  {:>12}  {:>12}  {:>12}  {:>12}",
        "step", "rank", "pg ptr", "var ptr", "att ptr", "end ptr", "timestamp"
    )?;
    for r in &index.records {
        writeln!(
            out,
            "  {:>6}  {:>6}  {:>12}  {:>12}  {:>12}  {:>12}  {:>12}",
            r.step, r.rank, r.pg_ptr, r.var_ptr, r.att_ptr, r.end_ptr, r.timestamp
        )?;
    }
    if index.trailing_bytes > 0 {
        writeln!(out, "  {} stray bytes after the last row", index.trailing_bytes)?;
    }
    Ok(())
}

pub fn write_index_v5(out: &mut impl Write, index: &IndexV5) -> io::Result<()> {
    write_header(out, &index.header)?;
    writeln!(out)?;
    for record in &index.records {
        match record {
            RecordV5::WriterMap(map) => {
                writeln!(out, "WriterMap at offset {}", map.offset)?;
                writeln!(out, "  Writers         : {}", map.layout.writer_count)?;
                writeln!(out, "  Aggregators     : {}", map.layout.aggregator_count)?;
                writeln!(out, "  Subfiles        : {}", map.layout.subfile_count)?;
                writeln!(out, "  Rank to subfile : {:?}", map.rank_to_subfile)?;
            }
            RecordV5::Step(step) => {
                writeln!(out, "Step {} at offset {}", step.step, step.offset)?;
                writeln!(out, "  Metadata pos    : {}", step.metadata_pos)?;
                writeln!(out, "  Metadata size   : {}", step.metadata_size)?;
                writeln!(out, "  Flush count     : {}", step.flush_count)?;
                for (rank, w) in step.writers.iter().enumerate() {
                    write!(out, "  Writer {rank:<5}   :")?;
                    for f in &w.flushes {
                        write!(out, " loc:{} siz:{};", f.data_pos, f.data_size)?;
                    }
                    writeln!(out, " loc:{}", w.final_pos)?;
                }
            }
            RecordV5::MetaMetadata(range) => {
                writeln!(out, "MetaMetadata at offset {}, {} bytes", range.offset, range.length)?;
            }
            RecordV5::Unknown { tag, range } => {
                writeln!(
                    out,
                    "Unknown record 0x{tag:02x} at offset {}, {} bytes skipped",
                    range.offset, range.length
                )?;
            }
        }
    }
    Ok(())
}

pub fn write_data_file(out: &mut impl Write, report: &DataFileReport) -> io::Result<()> {
    match &report.header {
        Some(header) => write_header(out, header)?,
        None => writeln!(out, "Header info: There is no header in this data file")?,
    }
    writeln!(out)?;
    for (i, pg) in report.process_groups.iter().enumerate() {
        write_process_group(out, i, pg)?;
    }
    if report.trailing_bytes > 0 {
        writeln!(out, "{} trailing bytes not decoded", report.trailing_bytes)?;
    }
    for e in &report.errors {
        writeln!(out, "ERROR: {e}")?;
    }
    Ok(())
}

pub fn write_process_group(out: &mut impl Write, index: usize, pg: &ProcessGroup) -> io::Result<()> {
    writeln!(out, "PG {index}: ")?;
    writeln!(out, "  Starting offset : {}", pg.offset)?;
    writeln!(out, "  PG length       : {} bytes (+4 for Tag)", pg.declared_length)?;
    writeln!(out, "  isRowMajor      : {}", yes_no(pg.is_row_major))?;
    writeln!(out, "  PG Name         : {}", pg.name)?;
    writeln!(out, "  Step Name       : {}", pg.timestep_name)?;
    writeln!(out, "  Step Value      : {}", pg.step)?;
    writeln!(out, "  Methods count   : {}", pg.methods.len())?;
    for m in &pg.methods {
        writeln!(out, "      Method ID   : {} ({})", m.method.id(), m.method)?;
        writeln!(out, "      M. params   : \"{}\"", m.params)?;
    }
    writeln!(out, "  # of Variables  : {}", pg.variables.len())?;
    writeln!(out, "  Vars length     : {} bytes", pg.variables_section.length)?;
    for (i, var) in pg.variables.iter().enumerate() {
        write_variable(out, i, var)?;
    }
    writeln!(out, "  # of Attributes : {}", pg.attributes.len())?;
    writeln!(out, "  Attrs length    : {} bytes", pg.attributes_section.length)?;
    for (i, attr) in pg.attributes.iter().enumerate() {
        write_attribute(out, i, attr)?;
    }
    Ok(())
}

pub fn write_variable(out: &mut impl Write, index: usize, var: &VariableMetadata) -> io::Result<()> {
    writeln!(out, "  Var {index:5}")?;
    writeln!(out, "      Starting offset : {}", var.offset)?;
    writeln!(out, "      Var block size  : {} bytes (+4 for Tag)", var.declared_length)?;
    writeln!(out, "      Member ID       : {}", var.member_id)?;
    writeln!(out, "      Var Name        : {}", var.name)?;
    writeln!(out, "      Var Path        : {}", var.path)?;
    writeln!(out, "      Type            : {} ({})", var.data_type.id(), var.data_type)?;
    writeln!(out, "      isDimensionVar  : {}", yes_no(var.is_dimension_variable))?;
    writeln!(out, "      # of Dimensions : {}", var.dimensions.rank())?;
    writeln!(out, "      Dims Length     : {}", var.dimensions_length)?;
    for (i, d) in var.dimensions.iter().enumerate() {
        writeln!(out, "      Dim[{i}]")?;
        writeln!(out, "           local  dim : {}", d.local)?;
        writeln!(out, "           global dim : {}", d.global)?;
        writeln!(out, "           offset dim : {}", d.offset)?;
    }
    writeln!(out, "      # of Characteristics    : {}", var.characteristics.len())?;
    writeln!(out, "      Characteristics Length  : {}", var.characteristics.declared_length)?;
    for (i, c) in var.characteristics.iter().enumerate() {
        writeln!(out, "      Characteristics[{i}]")?;
        writeln!(out, "          Type        : {} ({})", c.kind.tag(), c.kind)?;
        writeln!(out, "          Content     : {} bytes = {}", c.raw.len(), characteristic_value(c))?;
    }
    writeln!(out, "      Tag (pad {:2})    : VMD]", var.end_tag_padding)?;
    if let Some(payload) = var.payload {
        writeln!(out, "      Payload offset  : {}", payload.offset)?;
        writeln!(out, "      Variable Data   : {} bytes", payload.length)?;
    }
    Ok(())
}

pub fn write_attribute(out: &mut impl Write, index: usize, attr: &AttributeMetadata) -> io::Result<()> {
    writeln!(out, "  attr {index:5}")?;
    writeln!(out, "      Starting offset : {}", attr.offset)?;
    writeln!(out, "      Attr block size : {} bytes (+4 for Tag)", attr.declared_length)?;
    writeln!(out, "      Member ID       : {}", attr.member_id)?;
    writeln!(out, "      Attr Name       : {}", attr.name)?;
    writeln!(out, "      Attr Path       : {}", attr.path)?;
    writeln!(out, "      Type            : {} ({})", attr.data_type.id(), attr.data_type)?;
    if let Some(value) = attr.value {
        writeln!(out, "      Value           : {} bytes at offset {}", value.length, value.offset)?;
    }
    Ok(())
}

pub fn write_dataset(out: &mut impl Write, dataset: &Dataset) -> io::Result<()> {
    writeln!(out, "Dataset: {}", dataset.root.display())?;
    writeln!(out, "  Steps           : {}", dataset.index.step_count())?;
    writeln!(out, "  Metadata files  : {}", dataset.metadata_files.len())?;
    writeln!(out, "  Data files      : {}", dataset.data_files.len())?;
    writeln!(out)?;
    write_index(out, &dataset.index)?;
    for file in &dataset.data_files {
        writeln!(out)?;
        writeln!(out, "==== data.{} ({} bytes) ====", file.id, file.size)?;
        if let Some(report) = &file.report {
            write_data_file(out, report)?;
        }
    }
    Ok(())
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

fn characteristic_value(c: &Characteristic) -> String {
    if let Some(v) = c.as_u64() {
        return v.to_string();
    }
    if let Some(v) = c.as_u32() {
        return v.to_string();
    }
    c.raw.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ")
}
