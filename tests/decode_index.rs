//! Index decoding (v4 rows and v5 records).

mod common;

use bpformat::bp::{DecodeOptions, FormatVersion, Index, IndexRecordV4, IndexV4, IndexV5, RecordV5};
use bpformat::Error;
use common::{header, index_v4, v5_record, v5_step, v5_writer_map};

#[test]
fn test_v4_rows_roundtrip() {
    let rows: Vec<[u64; 8]> = (0..3u64)
        .flat_map(|step| (0..4u64).map(move |rank| [step, rank, 64 + step * 4000 + rank * 1000, 11, 22, 33, 1_700_000_000 + step, 0]))
        .collect();
    let idx = IndexV4::decode(&index_v4(&rows)).unwrap();
    assert_eq!(idx.records.len(), 12);
    for (decoded, raw) in idx.records.iter().zip(&rows) {
        let expected = IndexRecordV4 {
            step: raw[0],
            rank: raw[1],
            pg_ptr: raw[2],
            var_ptr: raw[3],
            att_ptr: raw[4],
            end_ptr: raw[5],
            timestamp: raw[6],
            reserved: raw[7],
        };
        assert_eq!(*decoded, expected);
        assert_eq!(IndexRecordV4::from_row(&decoded.to_row()), expected);
    }
    assert_eq!(idx.steps(), vec![0, 1, 2]);
    assert_eq!(idx.step(2).map(|r| r.rank).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
}

#[test]
fn test_v4_trailing_garbage_is_counted() {
    for stray in [1usize, 31, 63] {
        let mut bytes = index_v4(&[[0, 0, 64, 0, 0, 0, 0, 0]]);
        bytes.extend(std::iter::repeat(0xcc).take(stray));
        let idx = IndexV4::decode(&bytes).unwrap();
        assert_eq!(idx.records.len(), 1);
        assert_eq!(idx.trailing_bytes, stray as u64);
    }
}

#[test]
fn test_v5_four_writers_two_steps() {
    let writers = |base: u64| -> Vec<(Vec<(u64, u64)>, u64)> {
        (0..4).map(|w| (vec![(base + w * 100, 64)], base + w * 100 + 64)).collect()
    };
    let mut bytes = header(5);
    bytes.extend(v5_writer_map(&[0, 0, 1, 1], 2, 2));
    bytes.extend(v5_step(0, 512, &writers(0)));
    bytes.extend(v5_step(512, 480, &writers(4096)));

    let idx = IndexV5::decode(&bytes, &DecodeOptions::default()).unwrap();
    let maps: Vec<_> = idx.writer_maps().collect();
    assert_eq!(maps.len(), 1);
    assert_eq!(maps[0].layout.writer_count, 4);
    assert_eq!(maps[0].layout.aggregator_count, 2);
    assert_eq!(maps[0].rank_to_subfile, vec![0, 0, 1, 1]);

    let steps: Vec<_> = idx.steps().collect();
    assert_eq!(steps.len(), 2);
    for (i, step) in steps.iter().enumerate() {
        assert_eq!(step.step, i as u64);
        assert_eq!(step.flush_count, 1);
        assert_eq!(step.writers.len(), 4);
        assert!(step.writers.iter().all(|w| w.flushes.len() == 1));
    }
    assert_eq!(steps[1].metadata_pos, 512);
    assert_eq!(steps[1].writers[3].flushes[0].data_pos, 4396);
    assert_eq!(steps[1].writers[3].final_pos, 4460);
}

#[test]
fn test_v5_step_before_writer_map() {
    let mut bytes = header(5);
    bytes.extend(v5_step(0, 10, &[(vec![], 0)]));
    let err = IndexV5::decode(&bytes, &DecodeOptions::default()).unwrap_err();
    assert!(matches!(err.root(), Error::MissingWriterMap { offset: 64 }));
}

#[test]
fn test_v5_unknown_record_kind() {
    let mut bytes = header(5);
    bytes.extend(v5_writer_map(&[0], 1, 1));
    bytes.extend(v5_record(b'z', &[1, 2]));
    bytes.extend(v5_step(0, 10, &[(vec![(0, 1)], 1)]));

    let err = IndexV5::decode(&bytes, &DecodeOptions::default()).unwrap_err();
    assert!(matches!(err.root(), Error::UnknownRecordKind { tag: b'z', .. }));

    let idx = IndexV5::decode(&bytes, &DecodeOptions::forensic()).unwrap();
    assert_eq!(idx.records.len(), 3);
    assert!(matches!(idx.records[1], RecordV5::Unknown { tag: b'z', .. }));
    assert_eq!(idx.steps().count(), 1);
}

#[test]
fn test_generation_dispatch() {
    let v4 = Index::decode(&index_v4(&[[0; 8]]), &DecodeOptions::default()).unwrap();
    assert_eq!(v4.format_version(), FormatVersion::V4);
    assert_eq!(v4.step_count(), 1);

    let mut bytes = header(5);
    bytes.extend(v5_writer_map(&[0], 1, 1));
    let v5 = Index::decode(&bytes, &DecodeOptions::default()).unwrap();
    assert_eq!(v5.format_version(), FormatVersion::V5);

    let mut bytes = header(6);
    bytes.extend(v5_writer_map(&[0], 1, 1));
    let err = Index::decode(&bytes, &DecodeOptions::default()).unwrap_err();
    assert!(matches!(err.root(), Error::UnsupportedVersion { value: 6, .. }));
}

#[test]
fn test_truncated_index_prefixes() {
    let mut bytes = header(5);
    bytes.extend(v5_writer_map(&[0, 1], 1, 2));
    bytes.extend(v5_step(0, 10, &[(vec![(0, 1)], 1), (vec![(5, 1)], 6)]));
    for len in (1..bytes.len()).filter(|&len| len != 64) {
        let err = Index::decode(&bytes[..len], &DecodeOptions::default());
        match err {
            Err(e) => assert!(e.is_truncation(), "prefix {len}: {e}"),
            Ok(_) if len == 64 + v5_writer_map(&[0, 1], 1, 2).len() => {}
            Ok(_) => panic!("prefix {len} decoded"),
        }
    }
}
