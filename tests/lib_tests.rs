use clap::Parser;
use collexer::collection::{
    DocumentCollection, JsonCollection, Segment, SegmentDescriptor, TextCollection,
    TrecCollection, list_segment_files, resolve_collection, shard_of, shard_segments,
};
use collexer::engine::arg_parser::Cli;
use collexer::engine::build_config;
use collexer::engine::counters::CounterAggregate;
use collexer::engine::progress::{
    ProgressBarConfig, create_progress_bar, progress_line, update_progress_bar,
};
use collexer::engine::tools::{
    check_input_root, format_hms, is_os_hidden_file, load_whitelist, path_relative_to,
    path_to_key_string, resolve_input_path, with_commas,
};
use collexer::generator::{
    DefaultDocumentGenerator, DocumentGenerator, PassthroughDocumentGenerator, resolve_generator,
};
use collexer::pipeline::{TaskOutcome, WorkerPool};
use collexer::{Counters, Generated, GeneratorOptions, ShardSpec, Similarity, SourceDocument};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

// --- path_relative_to ---

#[test]
fn test_path_relative_under_base() {
    let base = PathBuf::from("/foo/bar");
    let path = PathBuf::from("/foo/bar/baz/qux.jsonl");
    assert_eq!(
        path_relative_to(&path, &base),
        Some(PathBuf::from("baz/qux.jsonl"))
    );
}

#[test]
fn test_path_relative_not_under_base() {
    let base = PathBuf::from("/foo/bar");
    let path = PathBuf::from("/other/qux");
    assert_eq!(path_relative_to(&path, &base), None);
}

#[test]
fn test_path_to_key_string_forward_slashes() {
    assert_eq!(
        path_to_key_string(&PathBuf::from("part/0001.jsonl")),
        "part/0001.jsonl"
    );
}

#[test]
fn test_path_to_key_string_backslashes_normalized() {
    assert_eq!(
        path_to_key_string(&PathBuf::from("part\\0001.jsonl")),
        "part/0001.jsonl"
    );
}

// --- is_os_hidden_file ---

#[test]
fn test_os_hidden_files() {
    assert!(is_os_hidden_file(&PathBuf::from("docs/.DS_Store")));
    assert!(is_os_hidden_file(&PathBuf::from("docs/._part.json")));
    assert!(is_os_hidden_file(&PathBuf::from("Thumbs.db")));
    assert!(!is_os_hidden_file(&PathBuf::from("docs/part.json")));
}

// --- input root ---

#[test]
fn test_resolve_input_path_rewrites_doc_prefix() {
    assert_eq!(
        resolve_input_path(&PathBuf::from("/path/to/msmarco")),
        PathBuf::from("collections/msmarco")
    );
    assert_eq!(
        resolve_input_path(&PathBuf::from("/data/msmarco")),
        PathBuf::from("/data/msmarco")
    );
}

#[test]
fn test_check_input_root_missing_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = check_input_root(&dir.path().join("nope")).unwrap_err();
    assert!(format!("{err:#}").contains("does not exist or is not readable"));
}

#[test]
fn test_check_input_root_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "x").unwrap();
    assert!(check_input_root(&file).is_err());
}

#[test]
fn test_check_input_root_ok() {
    let dir = tempfile::tempdir().unwrap();
    let root = check_input_root(dir.path()).unwrap();
    assert!(root.is_absolute());
}

// --- whitelist ---

#[test]
fn test_load_whitelist_trims_and_skips_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ids.txt");
    std::fs::write(&path, "a\n  b  \n\nc\n").unwrap();
    let ids = load_whitelist(&path).unwrap();
    let expected: HashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_load_whitelist_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_whitelist(&dir.path().join("missing.txt")).is_err());
}

// --- formatting ---

#[test]
fn test_with_commas() {
    assert_eq!(with_commas(0), "0");
    assert_eq!(with_commas(999), "999");
    assert_eq!(with_commas(1_000), "1,000");
    assert_eq!(with_commas(1_234_567), "1,234,567");
}

#[test]
fn test_format_hms() {
    assert_eq!(format_hms(Duration::from_secs(0)), "00:00:00");
    assert_eq!(format_hms(Duration::from_secs(3_725)), "01:02:05");
}

#[test]
fn test_progress_line_single_segment_shows_count_only() {
    assert_eq!(progress_line(1, 0, 12_345), "12,345 documents indexed");
}

#[test]
fn test_progress_line_multi_segment_shows_percentage() {
    assert_eq!(
        progress_line(4, 1, 100),
        "25.00% of files completed, 100 documents indexed"
    );
}

#[test]
fn test_progress_bar_counts_every_concurrent_update() {
    let bar = create_progress_bar(ProgressBarConfig::new(
        100,
        "Indexing",
        kdam::Animation::Classic,
    ));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let bar = Arc::clone(&bar);
            thread::spawn(move || {
                for _ in 0..25 {
                    update_progress_bar(&bar, 1);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(bar.lock().unwrap().counter, 100);
}

// --- sharding ---

fn descriptors(n: usize) -> Vec<SegmentDescriptor> {
    (0..n)
        .map(|i| {
            let rel = format!("dir/part-{i:03}.jsonl");
            SegmentDescriptor {
                path: PathBuf::from(&rel),
                rel,
            }
        })
        .collect()
}

#[test]
fn test_shards_partition_segments() {
    let all = descriptors(50);
    let mut seen = HashSet::new();
    for current in 0..4 {
        let spec = ShardSpec::new(4, current).unwrap();
        for seg in shard_segments(all.clone(), spec) {
            assert!(seen.insert(seg.rel), "segment in more than one shard");
        }
    }
    assert_eq!(seen.len(), 50);
}

#[test]
fn test_shard_of_is_stable() {
    assert_eq!(shard_of("a/b.json", 7), shard_of("a/b.json", 7));
    assert!(shard_of("a/b.json", 7) < 7);
}

#[test]
fn test_shard_assignment_is_reproducible() {
    let a = shard_segments(descriptors(40), ShardSpec::new(4, 2).unwrap());
    let b = shard_segments(descriptors(40), ShardSpec::new(4, 2).unwrap());
    assert_eq!(a, b);
}

#[test]
fn test_single_shard_keeps_everything() {
    let all = descriptors(10);
    assert_eq!(shard_segments(all.clone(), ShardSpec::new(1, 0).unwrap()), all);
}

#[test]
fn test_shard_spec_rejects_out_of_range() {
    assert!(ShardSpec::new(0, 0).is_err());
    assert!(ShardSpec::new(2, 2).is_err());
    assert!(ShardSpec::new(2, 1).is_ok());
}

// --- registries ---

#[test]
fn test_resolve_known_collections() {
    for name in ["JsonCollection", "TrecCollection", "TextCollection"] {
        assert_eq!(resolve_collection(name).unwrap().name(), name);
    }
}

#[test]
fn test_resolve_unknown_collection_lists_known_names() {
    let err = resolve_collection("WarcCollection").err().unwrap();
    assert!(err.to_string().contains("JsonCollection"));
}

#[test]
fn test_resolve_unknown_generator_fails() {
    assert!(resolve_generator("NoSuchGenerator").is_err());
}

#[test]
fn test_default_generator_classifies_documents() {
    let factory = resolve_generator("DefaultDocumentGenerator").unwrap();
    let mut generator = factory(&GeneratorOptions::default());

    let ok = SourceDocument::new("d1", "hello world");
    assert!(matches!(generator.generate(&ok), Generated::Ok(d) if d.id == "d1"));

    let empty = SourceDocument::new("d2", "   ");
    assert_eq!(generator.generate(&empty), Generated::Empty);

    let no_id = SourceDocument::new("  ", "text");
    assert!(matches!(generator.generate(&no_id), Generated::Invalid(_)));
}

#[test]
fn test_default_generator_builds_document() {
    let mut generator = DefaultDocumentGenerator::new(GeneratorOptions {
        fields: vec!["title".to_string()],
        store_contents: false,
        store_raw: true,
    });

    let mut skipped = SourceDocument::new("a", "text");
    skipped.skip = true;
    assert_eq!(generator.generate(&skipped), Generated::Skipped);

    let mut doc = SourceDocument::new("a", " text ");
    doc.fields.insert("title".to_string(), "T".to_string());
    doc.fields.insert("author".to_string(), "X".to_string());
    let Generated::Ok(out) = generator.generate(&doc) else {
        panic!("expected a document");
    };
    assert_eq!(out.id, "a");
    assert_eq!(out.contents.as_deref(), Some("text"));
    assert_eq!(out.raw.as_deref(), Some(" text "));
    assert_eq!(out.fields.len(), 1);
    assert_eq!(out.fields.get("title").map(String::as_str), Some("T"));
}

#[test]
fn test_passthrough_generator_keeps_blank_contents() {
    let mut generator = PassthroughDocumentGenerator::new(GeneratorOptions::default());
    let Generated::Ok(out) = generator.generate(&SourceDocument::new("a", "")) else {
        panic!("expected a document");
    };
    assert_eq!(out.contents.as_deref(), Some(""));
}

// --- collections ---

fn open_segment(collection: &dyn DocumentCollection, dir: &Path, rel: &str, bytes: &[u8]) -> Box<dyn Segment> {
    let path = dir.join(rel);
    std::fs::write(&path, bytes).unwrap();
    let seg = SegmentDescriptor {
        rel: rel.to_string(),
        path,
    };
    collection.open_segment(&seg).unwrap()
}

#[test]
fn test_json_reads_lines_and_numeric_ids() {
    let dir = tempfile::tempdir().unwrap();
    let mut seg = open_segment(
        &JsonCollection,
        dir.path(),
        "a.jsonl",
        b"{\"id\":\"a\",\"contents\":\"alpha\",\"title\":\"A\"}\n{\"id\":7,\"contents\":\"seven\"}\n",
    );
    let docs: Vec<_> = seg.by_ref().collect();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].id, "a");
    assert_eq!(docs[0].contents, "alpha");
    assert_eq!(docs[0].fields.get("title").map(String::as_str), Some("A"));
    assert_eq!(docs[1].id, "7");
    assert!(!seg.error_status());
}

#[test]
fn test_json_expands_arrays() {
    let dir = tempfile::tempdir().unwrap();
    let seg = open_segment(
        &JsonCollection,
        dir.path(),
        "a.json",
        b"[{\"id\":\"x\",\"contents\":\"1\"},{\"id\":\"y\",\"contents\":\"2\"}]",
    );
    let ids: Vec<String> = seg.map(|d| d.id).collect();
    assert_eq!(ids, vec!["x", "y"]);
}

#[test]
fn test_json_missing_id_is_not_indexable() {
    let dir = tempfile::tempdir().unwrap();
    let docs: Vec<_> =
        open_segment(&JsonCollection, dir.path(), "a.json", b"{\"contents\":\"orphan\"}").collect();
    assert_eq!(docs.len(), 1);
    assert!(!docs[0].indexable());
}

#[test]
fn test_json_malformed_record_stops_segment_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut seg = open_segment(
        &JsonCollection,
        dir.path(),
        "a.jsonl",
        b"{\"id\":\"a\",\"contents\":\"ok\"}\n{\"id\": broken\n{\"id\":\"c\"}",
    );
    assert_eq!(seg.by_ref().count(), 1);
    assert!(seg.error_status());
}

#[test]
fn test_trec_parses_blocks_and_counts_missing_docno() {
    let dir = tempfile::tempdir().unwrap();
    let text = "<DOC>\n<DOCNO> d1 </DOCNO>\n<TITLE>First</TITLE>\n<TEXT>\nhello world\n</TEXT>\n</DOC>\n\
                <DOC>\n<TEXT>no id here</TEXT>\n</DOC>\n\
                <DOC>\n<DOCNO>d2</DOCNO>\nplain body\n</DOC>\n";
    let mut seg = open_segment(&TrecCollection, dir.path(), "fb1", text.as_bytes());
    let docs: Vec<_> = seg.by_ref().collect();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].id, "d1");
    assert_eq!(docs[0].contents, "hello world");
    assert_eq!(docs[0].fields.get("title").map(String::as_str), Some("First"));
    assert_eq!(docs[1].contents, "plain body");
    assert_eq!(seg.skipped_count(), 1);
    assert!(!seg.error_status());
}

#[test]
fn test_trec_truncated_block_sets_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut seg = open_segment(
        &TrecCollection,
        dir.path(),
        "fb1",
        b"<DOC><DOCNO>a</DOCNO>x</DOC><DOC><DOCNO>b",
    );
    assert_eq!(seg.by_ref().count(), 1);
    assert!(seg.error_status());
}

#[test]
fn test_text_doc_id_strips_extension() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("sub/dir")).unwrap();
    let docs: Vec<_> = open_segment(&TextCollection, dir.path(), "sub/dir/b.md", b"body").collect();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "sub/dir/b");
    assert_eq!(docs[0].contents, "body");
}

#[test]
fn test_text_invalid_utf8_sets_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut seg = open_segment(&TextCollection, dir.path(), "bad.txt", &[0xff, 0xfe, 0x00]);
    assert!(seg.next().is_none());
    assert!(seg.error_status());
}

#[test]
fn test_listing_is_sorted_and_skips_hidden_and_settings() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("b.txt"), "b").unwrap();
    std::fs::write(dir.path().join("sub/a.txt"), "a").unwrap();
    std::fs::write(dir.path().join("a.txt"), "a").unwrap();
    std::fs::write(dir.path().join(".DS_Store"), "x").unwrap();
    std::fs::write(dir.path().join("collexer.toml"), "").unwrap();
    let segs = list_segment_files(dir.path(), |_| true).unwrap();
    let rels: Vec<&str> = segs.iter().map(|s| s.rel.as_str()).collect();
    assert_eq!(rels, vec!["a.txt", "b.txt", "sub/a.txt"]);
}

// --- counters ---

#[test]
fn test_concurrent_counter_increments_are_not_lost() {
    let counters = Arc::new(CounterAggregate::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let c = Arc::clone(&counters);
            thread::spawn(move || {
                for _ in 0..1000 {
                    c.add_indexed(2);
                    c.incr_unindexable();
                    c.incr_empty();
                    c.add_skipped(1);
                    c.incr_errors();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let snapshot = counters.snapshot();
    assert_eq!(
        snapshot,
        Counters {
            indexed: 16_000,
            unindexable: 8000,
            empty: 8000,
            skipped: 8000,
            errors: 8000,
        }
    );
    assert_eq!(snapshot.total(), 48_000);
}

// --- worker pool ---

#[test]
fn test_pool_every_task_reports_once() {
    let mut pool = WorkerPool::new(3, Arc::new(AtomicBool::new(false))).unwrap();
    let ran = Arc::new(AtomicUsize::new(0));
    for i in 0..20 {
        let ran = Arc::clone(&ran);
        pool.submit(format!("task-{i}"), move || {
            ran.fetch_add(1, Ordering::Relaxed);
            TaskOutcome::Completed
        });
    }
    assert_eq!(pool.submitted(), 20);
    let (_handle, done_rx) = pool.finish_submissions();
    let outcomes: Vec<_> = done_rx.iter().collect();
    assert_eq!(outcomes.len(), 20);
    assert!(outcomes.iter().all(|o| *o == TaskOutcome::Completed));
    assert_eq!(ran.load(Ordering::Relaxed), 20);
}

#[test]
fn test_pool_panicking_task_is_isolated() {
    let mut pool = WorkerPool::new(2, Arc::new(AtomicBool::new(false))).unwrap();
    pool.submit("boom".to_string(), || panic!("generator bug"));
    pool.submit("fine".to_string(), || TaskOutcome::Completed);
    let (_handle, done_rx) = pool.finish_submissions();
    let outcomes: Vec<_> = done_rx.iter().collect();
    assert_eq!(outcomes, vec![TaskOutcome::Completed; 2]);
}

#[test]
fn test_pool_cancel_skips_queued_tasks() {
    let mut pool = WorkerPool::new(1, Arc::new(AtomicBool::new(false))).unwrap();
    pool.request_cancel();
    for i in 0..5 {
        pool.submit(format!("task-{i}"), || TaskOutcome::Completed);
    }
    let (_handle, done_rx) = pool.finish_submissions();
    assert!(done_rx.iter().all(|o| o == TaskOutcome::Cancelled));
}

// --- config layering ---

#[test]
fn test_flags_override_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("collexer.toml"),
        "[settings]\ncollection = \"TrecCollection\"\nindex = \"from-file\"\nthreads = 2\n",
    )
    .unwrap();
    let input = dir.path().to_string_lossy().to_string();
    let cli = Cli::parse_from(["collexer", "--input", &input, "--threads", "6", "--optimize"]);
    let config = build_config(&cli).unwrap();
    assert_eq!(config.collection, "TrecCollection");
    assert_eq!(config.index, PathBuf::from("from-file"));
    assert_eq!(config.threads, 6);
    assert!(config.optimize);
}

#[test]
fn test_settings_file_values_apply() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("collexer.toml"),
        r#"
        [settings]
        collection = "JsonCollection"
        index = "idx"
        threads = 3
        unique_docid = true
        similarity = "bm25-accurate"
        fields = ["title"]
        shard_count = 4
        shard_current = 1
        "#,
    )
    .unwrap();
    let input = dir.path().to_string_lossy().to_string();
    let config = build_config(&Cli::parse_from(["collexer", "--input", &input])).unwrap();
    assert_eq!(config.threads, 3);
    assert!(config.unique_docid);
    assert_eq!(config.similarity, Similarity::Bm25Accurate);
    assert_eq!(config.generator_opts.fields, vec!["title".to_string()]);
    assert_eq!(config.shard, Some(ShardSpec { count: 4, current: 1 }));
}

#[test]
fn test_settings_file_invalid_shard_pair_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("collexer.toml"),
        "[settings]\ncollection = \"JsonCollection\"\nindex = \"idx\"\nshard_count = 2\nshard_current = 5\n",
    )
    .unwrap();
    let input = dir.path().to_string_lossy().to_string();
    let config = build_config(&Cli::parse_from(["collexer", "--input", &input])).unwrap();
    assert_eq!(config.shard, None);
}

#[test]
fn test_missing_collection_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().to_string_lossy().to_string();
    let cli = Cli::parse_from(["collexer", "--input", &input, "--index", "idx"]);
    assert!(build_config(&cli).is_err());
}

#[test]
fn test_shard_flags_are_validated() {
    let cli = Cli::parse_from([
        "collexer",
        "--input",
        "in",
        "--collection",
        "JsonCollection",
        "--index",
        "idx",
        "--shard-count",
        "3",
        "--shard-current",
        "3",
    ]);
    assert!(build_config(&cli).is_err());
}
