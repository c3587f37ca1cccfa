use std::path::Path;

use code_chunker::{ChunkType, ChunkerConfig, chunk_file};

fn numbered(n: usize) -> String {
    (1..=n)
        .map(|i| format!("value_{i} = {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn files_up_to_one_and_a_half_windows_stay_whole() {
    let cfg = ChunkerConfig::with_window(20, 5);
    for n in [1usize, 7, 20, 29, 30] {
        let chunks = chunk_file(Path::new("/ws/f.py"), &numbered(n), Path::new("/ws"), &cfg);
        assert_eq!(chunks.len(), 1, "lines={n}");
        assert_eq!(chunks[0].chunk_type, ChunkType::File);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, n);
    }
    let split = chunk_file(Path::new("/ws/f.py"), &numbered(31), Path::new("/ws"), &cfg);
    assert!(split.len() > 1);
}

#[test]
fn sliced_ranges_cover_every_line_without_gaps() {
    for (size, overlap, lines) in [(10, 2, 57), (7, 0, 100), (50, 49, 203), (13, 4, 20)] {
        let cfg = ChunkerConfig::with_window(size, overlap);
        let chunks = chunk_file(Path::new("/ws/f.rs"), &numbered(lines), Path::new("/ws"), &cfg);

        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks.last().unwrap().end_line, lines);

        let mut covered_to = 0usize;
        for c in &chunks {
            assert!(c.start_line <= covered_to + 1, "gap before line {}", c.start_line);
            assert!(c.end_line - c.start_line < size);
            covered_to = covered_to.max(c.end_line);
        }
        assert_eq!(covered_to, lines);
    }
}

#[test]
fn twenty_thousand_line_file_advances_every_nine_hundred_lines() {
    let cfg = ChunkerConfig::with_window(1000, 100);
    let big = chunk_file(Path::new("/ws/a.py"), &numbered(20_000), Path::new("/ws"), &cfg);
    let small = chunk_file(Path::new("/ws/b.py"), &numbered(5), Path::new("/ws"), &cfg);

    assert_eq!(small.len(), 1);
    assert_eq!(small[0].chunk_type, ChunkType::File);

    assert_eq!(big.len(), 23);
    for (i, c) in big.iter().enumerate() {
        assert_eq!(c.start_line, i * 900 + 1);
    }
    assert_eq!(big.last().unwrap().start_line, 19_801);
    assert_eq!(big.last().unwrap().end_line, 20_000);
}

#[test]
fn ids_are_unique_per_file() {
    let cfg = ChunkerConfig::with_window(10, 3);
    let chunks = chunk_file(Path::new("/ws/f.rs"), &numbered(500), Path::new("/ws"), &cfg);
    let mut ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), chunks.len());
}
