//! End-to-end scenarios exercising the builder/reader pair through the public API only.

use sstable::{CompressionType, Options, SSIterator, Table, TableBuilder};

fn build(opt: Options, data: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut dst: Vec<u8> = Vec::new();
    {
        let mut b = TableBuilder::new(opt, &mut dst);
        for (k, v) in data {
            b.add(k, v).unwrap();
        }
        b.finish().unwrap();
    }
    dst
}

#[test]
fn s1_seek_then_forward_scan() {
    let mut opt = Options::default();
    opt.block_restart_interval = 2;
    opt.block_size = 64;
    let data: &[(&[u8], &[u8])] = &[(b"a", b"1"), (b"ab", b"2"), (b"abc", b"3"), (b"b", b"4")];
    let bytes = build(opt.clone(), data);
    let table = Table::new(opt, bytes, Default::default()).unwrap();

    let mut iter = table.iter();
    iter.seek(b"ab");
    assert!(iter.valid());
    let mut k = Vec::new();
    let mut v = Vec::new();
    iter.current(&mut k, &mut v);
    assert_eq!((k.as_slice(), v.as_slice()), (b"ab".as_ref(), b"2".as_ref()));

    assert!(iter.advance());
    iter.current(&mut k, &mut v);
    assert_eq!((k.as_slice(), v.as_slice()), (b"abc".as_ref(), b"3".as_ref()));

    assert!(iter.advance());
    iter.current(&mut k, &mut v);
    assert_eq!((k.as_slice(), v.as_slice()), (b"b".as_ref(), b"4".as_ref()));

    assert!(!iter.advance());
    assert!(!iter.valid());
}

#[test]
fn s2_internal_get_over_many_shuffled_keys() {
    use rand::seq::SliceRandom;

    let n = 2000;
    let mut data: Vec<(String, String)> = (0..n)
        .map(|i| (format!("key{:05}", i), format!("value{:05}", i)))
        .collect();
    data.sort();

    let mut opt = Options::default();
    opt.block_restart_interval = 16;
    let borrowed: Vec<(&[u8], &[u8])> = data
        .iter()
        .map(|(k, v)| (k.as_bytes(), v.as_bytes()))
        .collect();
    let bytes = build(opt.clone(), &borrowed);
    let table = Table::new(opt, bytes, Default::default()).unwrap();

    let mut probes: Vec<usize> = (0..n).collect();
    probes.shuffle(&mut rand::thread_rng());

    for i in probes {
        let (k, v) = &data[i];
        let mut hits = 0;
        table
            .internal_get(k.as_bytes(), |got_k, got_v| {
                hits += 1;
                assert_eq!(got_k, k.as_bytes());
                assert_eq!(got_v, v.as_bytes());
            })
            .unwrap();
        assert_eq!(hits, 1);
    }
}

#[test]
fn s4_corrupted_block_byte_is_detected() {
    let opt = Options::default();
    let mut bytes = build(opt.clone(), &[(b"abc", b"def")]);
    bytes[0] ^= 0xff;
    let table = Table::new(opt, bytes, Default::default()).unwrap();
    let err = table.get(b"abc").unwrap_err();
    assert_eq!(err.code, sstable::StatusCode::Corruption);
}

#[test]
fn s5_empty_table_opens_and_finds_nothing() {
    let opt = Options::default();
    let bytes = build(opt.clone(), &[]);
    let table = Table::new(opt, bytes, Default::default()).unwrap();
    let mut hits = 0;
    table.internal_get(b"anything", |_, _| hits += 1).unwrap();
    assert_eq!(hits, 0);
    assert!(table.iter().next().is_none());
}

#[test]
fn s6_multiple_data_blocks_round_trip() {
    let mut opt = Options::default();
    opt.block_size = 32;
    let data: Vec<(Vec<u8>, Vec<u8>)> = (0..40)
        .map(|i| (format!("k{:04}", i).into_bytes(), format!("v{:04}", i).into_bytes()))
        .collect();
    let borrowed: Vec<(&[u8], &[u8])> = data.iter().map(|(k, v)| (k.as_slice(), v.as_slice())).collect();
    let bytes = build(opt.clone(), &borrowed);
    let table = Table::new(opt, bytes, Default::default()).unwrap();

    let mut iter = table.iter();
    let mut i = 0;
    while let Some((k, v)) = iter.next() {
        assert_eq!(k, data[i].0);
        assert_eq!(v, data[i].1);
        i += 1;
    }
    assert_eq!(i, data.len());
}

#[test]
fn footer_magic_discriminates_non_table_files() {
    let mut bytes = vec![0u8; 64];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = i as u8;
    }
    let err = Table::new(Options::default(), bytes, Default::default()).unwrap_err();
    assert_eq!(err.code, sstable::StatusCode::Corruption);
}

#[test]
fn snappy_compressed_roundtrip() {
    let mut opt = Options::default();
    opt.compression = CompressionType::Snappy;
    let data: &[(&[u8], &[u8])] = &[
        (b"aaaaaaaa", b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
        (b"bbbbbbbb", b"bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
    ];
    let bytes = build(opt.clone(), data);
    let table = Table::new(opt, bytes, Default::default()).unwrap();
    assert_eq!(table.get(b"aaaaaaaa").unwrap(), Some(data[0].1.to_vec()));
    assert_eq!(table.get(b"bbbbbbbb").unwrap(), Some(data[1].1.to_vec()));
}
