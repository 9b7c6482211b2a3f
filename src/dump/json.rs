//! JSON renderings of decoded structures.

use serde_json::{json, Value};

use crate::bp::*;
use crate::util::{DimensionValue, Error};

pub fn header_json(header: &FormatHeader) -> Value {
    json!({
        "version_string": header.version_string,
        "version": [header.major, header.minor, header.micro],
        "little_endian": header.is_little_endian,
        "has_subfiles": header.has_subfiles,
        "format_version": header.format_version.as_u8(),
        "is_live": header.is_live,
    })
}

pub fn index_json(index: &Index) -> Value {
    match index {
        Index::V4(idx) => index_v4_json(idx),
        Index::V5(idx) => index_v5_json(idx),
    }
}

pub fn index_v4_json(index: &IndexV4) -> Value {
    let rows: Vec<Value> = index
        .records
        .iter()
        .map(|r| {
            json!({
                "step": r.step,
                "rank": r.rank,
                "pg_ptr": r.pg_ptr,
                "var_ptr": r.var_ptr,
                "att_ptr": r.att_ptr,
                "end_ptr": r.end_ptr,
                "timestamp": r.timestamp,
            })
        })
        .collect();
    json!({
        "header": header_json(&index.header),
        "records": rows,
        "trailing_bytes": index.trailing_bytes,
    })
}

pub fn index_v5_json(index: &IndexV5) -> Value {
    let records: Vec<Value> = index.records.iter().map(record_v5_json).collect();
    json!({
        "header": header_json(&index.header),
        "records": records,
    })
}

fn record_v5_json(record: &RecordV5) -> Value {
    match record {
        RecordV5::WriterMap(map) => json!({
            "kind": "writer_map",
            "offset": map.offset,
            "writer_count": map.layout.writer_count,
            "aggregator_count": map.layout.aggregator_count,
            "subfile_count": map.layout.subfile_count,
            "rank_to_subfile": map.rank_to_subfile,
        }),
        RecordV5::Step(step) => {
            let writers: Vec<Value> = step
                .writers
                .iter()
                .map(|w| {
                    let flushes: Vec<Value> = w
                        .flushes
                        .iter()
                        .map(|f| json!({ "pos": f.data_pos, "size": f.data_size }))
                        .collect();
                    json!({ "flushes": flushes, "final_pos": w.final_pos })
                })
                .collect();
            json!({
                "kind": "step",
                "offset": step.offset,
                "step": step.step,
                "metadata_pos": step.metadata_pos,
                "metadata_size": step.metadata_size,
                "flush_count": step.flush_count,
                "writers": writers,
            })
        }
        RecordV5::MetaMetadata(range) => json!({
            "kind": "meta_metadata",
            "offset": range.offset,
            "length": range.length,
        }),
        RecordV5::Unknown { tag, range } => json!({
            "kind": "unknown",
            "tag": tag,
            "offset": range.offset,
            "length": range.length,
        }),
    }
}

pub fn data_file_json(report: &DataFileReport) -> Value {
    let groups: Vec<Value> = report.process_groups.iter().map(process_group_json).collect();
    let errors: Vec<Value> = report.errors.iter().map(error_json).collect();
    json!({
        "header": report.header.as_ref().map(header_json),
        "process_groups": groups,
        "errors": errors,
        "trailing_bytes": report.trailing_bytes,
    })
}

pub fn process_group_json(pg: &ProcessGroup) -> Value {
    let methods: Vec<Value> = pg
        .methods
        .iter()
        .map(|m| json!({ "id": m.method.id(), "name": m.method.to_string(), "params": m.params }))
        .collect();
    let variables: Vec<Value> = pg.variables.iter().map(variable_json).collect();
    let attributes: Vec<Value> = pg.attributes.iter().map(attribute_json).collect();
    json!({
        "offset": pg.offset,
        "length": pg.declared_length,
        "row_major": pg.is_row_major,
        "name": pg.name,
        "timestep_name": pg.timestep_name,
        "step": pg.step,
        "methods": methods,
        "variables": variables,
        "attributes": attributes,
    })
}

pub fn variable_json(var: &VariableMetadata) -> Value {
    let dims: Vec<Value> = var
        .dimensions
        .iter()
        .map(|d| {
            json!({
                "local": dimension_json(d.local),
                "global": dimension_json(d.global),
                "offset": dimension_json(d.offset),
            })
        })
        .collect();
    let characteristics: Vec<Value> = var
        .characteristics
        .iter()
        .map(|c| json!({ "kind": c.kind.to_string(), "offset": c.offset, "raw": c.raw }))
        .collect();
    json!({
        "offset": var.offset,
        "length": var.declared_length,
        "member_id": var.member_id,
        "name": var.name,
        "path": var.path,
        "type": var.data_type.to_string(),
        "type_id": var.data_type.id(),
        "is_dimension": var.is_dimension_variable,
        "dimensions": dims,
        "element_count": var.element_count(),
        "characteristics": characteristics,
        "payload": var.payload.map(range_json),
    })
}

pub fn attribute_json(attr: &AttributeMetadata) -> Value {
    json!({
        "offset": attr.offset,
        "length": attr.declared_length,
        "member_id": attr.member_id,
        "name": attr.name,
        "path": attr.path,
        "type": attr.data_type.to_string(),
        "type_id": attr.data_type.id(),
        "value": attr.value.map(range_json),
    })
}

pub fn dataset_json(dataset: &Dataset) -> Value {
    let files: Vec<Value> = dataset
        .data_files
        .iter()
        .map(|f| {
            json!({
                "id": f.id,
                "path": f.path.display().to_string(),
                "size": f.size,
                "report": f.report.as_ref().map(data_file_json),
            })
        })
        .collect();
    json!({
        "root": dataset.root.display().to_string(),
        "index": index_json(&dataset.index),
        "metadata_files": dataset.metadata_files.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        "data_files": files,
    })
}

pub fn error_json(error: &Error) -> Value {
    let path: Vec<String> = error.block_path().iter().map(ToString::to_string).collect();
    json!({
        "message": error.to_string(),
        "offset": error.offset(),
        "blocks": path,
    })
}

fn dimension_json(value: DimensionValue) -> Value {
    match value {
        DimensionValue::Literal(v) => json!(v),
        DimensionValue::VariableReference(id) => json!({ "var": id }),
    }
}

fn range_json(range: ByteRange) -> Value {
    json!({ "offset": range.offset, "length": range.length })
}
