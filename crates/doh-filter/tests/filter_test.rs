//! End-to-end filter properties: build artifacts, wrap them as a filter,
//! and classify against the stored set

use doh_core::{FileTag, FileTagIndex, UserBitmap};
use doh_filter::{BlocklistFilter, FrozenTrie, TrieBuilder};
use std::collections::BTreeSet;
use std::sync::Arc;

fn manifest(n: u32) -> FileTagIndex {
    let tags = (0..n)
        .map(|value| FileTag {
            value,
            uname: format!("list{value}"),
            vname: format!("List {value}"),
            group: if value % 2 == 0 { "privacy" } else { "security" }.to_string(),
            subg: String::new(),
            url: format!("https://lists.example/{value}.txt"),
            show: 1,
            entries: 100,
        })
        .collect();
    FileTagIndex::from_tags(tags).unwrap()
}

fn build_filter(entries: &[(&str, &[u32])], lists: u32) -> BlocklistFilter {
    let mut builder = TrieBuilder::new();
    for (domain, ids) in entries {
        builder.insert(domain, ids).unwrap();
    }
    let artifacts = builder.build().unwrap();
    let trie = FrozenTrie::new(artifacts.td, artifacts.rd, artifacts.node_count).unwrap();
    BlocklistFilter::new(trie, manifest(lists)).unwrap()
}

fn ids_of(verdict: &doh_core::Verdict) -> BTreeSet<String> {
    verdict.matched_list_ids.clone()
}

struct SplitMix(u64);

impl SplitMix {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    fn label(&mut self) -> String {
        let len = 3 + (self.next() % 10) as usize;
        (0..len)
            .map(|_| (b'a' + (self.next() % 26) as u8) as char)
            .collect()
    }
}

#[test]
fn test_large_membership_has_no_false_results() {
    const N: usize = 10_000;
    let mut rng = SplitMix(0x5eed);

    let members: Vec<(String, Vec<u32>)> = (0..N)
        .map(|i| {
            let name = format!("{}.{}.member{i}.test", rng.label(), rng.label());
            let mut ids: Vec<u32> = vec![(i % 16) as u32, ((i * 7 + 3) % 16) as u32];
            ids.sort_unstable();
            ids.dedup();
            (name, ids)
        })
        .collect();

    let mut builder = TrieBuilder::new();
    for (name, ids) in &members {
        builder.insert(name, ids).unwrap();
    }
    let artifacts = builder.build().unwrap();
    let trie = FrozenTrie::new(artifacts.td, artifacts.rd, artifacts.node_count).unwrap();
    let filter = BlocklistFilter::new(trie, manifest(16)).unwrap();

    for (name, ids) in &members {
        let verdict = filter.classify_name(name, None).unwrap();
        assert!(verdict.blocked, "member {name} must block");
        let expect: BTreeSet<String> = ids.iter().map(|id| id.to_string()).collect();
        assert_eq!(ids_of(&verdict), expect, "member {name}");
    }

    // Non-members live under apexes that are never stored, so neither an
    // exact hit nor suffix inheritance can apply.
    for i in 0..N {
        let name = format!("{}.outsider{i}.test", rng.label());
        let verdict = filter.classify_name(&name, None).unwrap();
        assert!(!verdict.blocked, "non-member {name} must pass");
        assert!(verdict.matched_list_ids.is_empty());
    }
}

#[test]
fn test_empty_blocklist_passes_everything() {
    let filter = build_filter(&[], 0);
    for name in ["example.com", "a.b.c.d.e", "x"] {
        let verdict = filter.classify_name(name, None).unwrap();
        assert!(!verdict.blocked);
        assert!(verdict.matched_list_ids.is_empty());
    }
}

#[test]
fn test_single_entry_boundary_family() {
    let filter = build_filter(&[("example.com", &[0])], 1);

    for name in ["example.com", "a.example.com", "a.b.example.com"] {
        assert!(
            filter.classify_name(name, None).unwrap().blocked,
            "{name} must block"
        );
    }
    for name in ["example.co", "xample.com", "com", "example", "anexample.com"] {
        assert!(
            !filter.classify_name(name, None).unwrap().blocked,
            "{name} must pass"
        );
    }
}

#[test]
fn test_subdomain_inherits_but_parent_does_not() {
    let filter = build_filter(&[("ads.tracker.example", &[0])], 1);
    assert!(filter.classify_name("x.ads.tracker.example", None).unwrap().blocked);
    assert!(filter.classify_name("y.x.ads.tracker.example", None).unwrap().blocked);
    assert!(!filter.classify_name("tracker.example", None).unwrap().blocked);
    assert!(!filter.classify_name("example", None).unwrap().blocked);
}

#[test]
fn test_deepest_suffix_decides_ids() {
    let filter = build_filter(
        &[("example.com", &[0]), ("ads.example.com", &[1, 2])],
        4,
    );
    let verdict = filter.classify_name("x.ads.example.com", None).unwrap();
    assert_eq!(
        ids_of(&verdict),
        BTreeSet::from(["1".to_string(), "2".to_string()])
    );
    let verdict = filter.classify_name("www.example.com", None).unwrap();
    assert_eq!(ids_of(&verdict), BTreeSet::from(["0".to_string()]));
}

#[test]
fn test_case_and_trailing_dot_insensitive() {
    let filter = build_filter(&[("Example.COM", &[0])], 1);
    assert!(filter.classify_name("EXAMPLE.com.", None).unwrap().blocked);
    assert!(filter.classify_name("example.com", None).unwrap().blocked);
}

#[test]
fn test_non_ascii_bytes_compare_bytewise() {
    let filter = build_filter(&[("bücher.example", &[0])], 1);
    // Identical bytes match; ASCII case folds, non-ASCII does not.
    assert!(filter.classify_name("bücher.EXAMPLE", None).unwrap().blocked);
    assert!(!filter.classify_name("bÜcher.example", None).unwrap().blocked);
}

#[test]
fn test_user_bitmap_deny_minus_allow() {
    let filter = build_filter(&[("ads.example.com", &[5, 42])], 64);

    // deny {5, 42}, allow {42}: id 5 still blocks, and only id 5 matches.
    let user = UserBitmap::new([42], [5, 42]);
    let verdict = filter.classify_name("ads.example.com", Some(&user)).unwrap();
    assert!(verdict.blocked);
    assert_eq!(ids_of(&verdict), BTreeSet::from(["5".to_string()]));

    // Allowing everything stored clears the block.
    let user = UserBitmap::new([5, 42], [5, 42]);
    let verdict = filter.classify_name("ads.example.com", Some(&user)).unwrap();
    assert!(!verdict.blocked);
    assert!(verdict.matched_list_ids.is_empty());

    // Denying lists the name is not on does nothing.
    let user = UserBitmap::deny_only([7, 9]);
    let verdict = filter.classify_name("ads.example.com", Some(&user)).unwrap();
    assert!(!verdict.blocked);
}

#[test]
fn test_classify_answers_merges() {
    let filter = build_filter(&[("cdn.ads.net", &[1])], 2);
    let answers = vec!["benign.example".to_string(), "cdn.ads.net".to_string()];
    let agg = filter.classify_answers("site.example", &answers, None).unwrap();
    assert!(agg.blocked);
    assert_eq!(agg.matched_list_ids, BTreeSet::from(["1".to_string()]));
    assert_eq!(agg.verdicts.len(), 3);
    assert!(!agg.verdicts[0].blocked);
    assert!(agg.verdicts[2].blocked);

    let agg = filter
        .classify_answers("site.example", &["benign.example".to_string()], None)
        .unwrap();
    assert!(!agg.blocked);
}

#[test]
fn test_lookup_domain_info_joins_manifest() {
    let filter = build_filter(&[("ads.example.com", &[1, 3])], 4);
    let info = filter.lookup_domain_info("x.ads.example.com").unwrap();
    assert_eq!(
        info.list_ids,
        BTreeSet::from(["1".to_string(), "3".to_string()])
    );
    assert_eq!(info.tag_entries["1"].uname, "list1");
    assert_eq!(info.tag_entries["3"].uname, "list3");

    let info = filter.lookup_domain_info("unrelated.example").unwrap();
    assert!(info.list_ids.is_empty());
    assert!(info.tag_entries.is_empty());
}

#[test]
fn test_concurrent_classify_agrees() {
    let filter = Arc::new(build_filter(
        &[("ads.example.com", &[0, 2]), ("tracker.net", &[1])],
        4,
    ));
    let names: Vec<String> = (0..100)
        .map(|i| match i % 4 {
            0 => format!("h{i}.ads.example.com"),
            1 => "tracker.net".to_string(),
            2 => format!("h{i}.benign.org"),
            _ => "ads.example.com".to_string(),
        })
        .collect();

    let expected: Vec<_> = names
        .iter()
        .map(|n| filter.classify_name(n, None).unwrap())
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let filter = Arc::clone(&filter);
            let names = names.clone();
            let expected = expected.clone();
            std::thread::spawn(move || {
                for (name, want) in names.iter().zip(&expected) {
                    let got = filter.classify_name(name, None).unwrap();
                    assert_eq!(&got, want, "verdict for {name} diverged");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_stats_count_lookups_and_blocks() {
    let filter = build_filter(&[("ads.example.com", &[0])], 1);
    filter.classify_name("ads.example.com", None).unwrap();
    filter.classify_name("benign.example", None).unwrap();
    let stats = filter.stats();
    assert_eq!(stats.lookups, 2);
    assert_eq!(stats.suffix_matches, 1);
    assert_eq!(stats.blocked, 1);
}
