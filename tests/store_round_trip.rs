//! Tests for record persistence through the host store, including the
//! disk-spilled backend.

use dnsweep::{DnsRecord, HostStore, QuestionType};

fn record_for(host: &str) -> DnsRecord {
    let mut record = DnsRecord::new(host);
    record.push_answer(QuestionType::A, "10.0.0.1".into());
    record.push_answer(QuestionType::A, "10.0.0.2".into());
    record.push_answer(QuestionType::Cname, "edge.example.net.".into());
    record.push_answer(QuestionType::Txt, "v=spf1 -all".into());
    record.raw = "example.com.\t300\tIN\tA\t10.0.0.1\n".into();
    record
}

#[test]
fn test_bundle_survives_memory_store() {
    let store = HostStore::new();
    let record = record_for("example.com");
    store
        .put("example.com", &record.to_bytes().unwrap())
        .unwrap();

    let restored = DnsRecord::from_bytes(&store.get("example.com").unwrap()).unwrap();
    assert_eq!(restored, record);
    assert_eq!(restored.answers(QuestionType::A).len(), 2);
    assert_eq!(restored.answers(QuestionType::Cname), ["edge.example.net."]);
}

#[test]
fn test_bundle_survives_disk_spill() {
    let store = HostStore::with_spill_threshold(8);
    let mut originals = Vec::new();
    for i in 0..32 {
        let host = format!("host{:02}.example.com", i);
        let record = record_for(&host);
        store.put(&host, &record.to_bytes().unwrap()).unwrap();
        originals.push((host, record));
    }

    for (host, original) in &originals {
        let restored = DnsRecord::from_bytes(&store.get(host).unwrap()).unwrap();
        assert_eq!(&restored, original, "mismatch for {}", host);
    }

    // scan still visits every entry in sorted order after the spill
    let mut scanned = Vec::new();
    store.scan(|k, _| scanned.push(k.to_string()));
    assert_eq!(scanned.len(), 32);
    assert!(scanned.windows(2).all(|w| w[0] < w[1]));
    store.close();
}

#[test]
fn test_pending_markers_coexist_with_bundles() {
    // the input phase stores empty values; the wildcard phase overwrites
    // them with serialized bundles
    let store = HostStore::new();
    store.put("a.example.com", b"").unwrap();
    assert!(DnsRecord::from_bytes(&store.get("a.example.com").unwrap()).is_err());

    let record = record_for("a.example.com");
    store
        .put("a.example.com", &record.to_bytes().unwrap())
        .unwrap();
    let restored = DnsRecord::from_bytes(&store.get("a.example.com").unwrap()).unwrap();
    assert_eq!(restored.host, "a.example.com");
    assert_eq!(store.len(), 1);
}
