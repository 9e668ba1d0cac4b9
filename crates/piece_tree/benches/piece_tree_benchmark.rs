use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use piece_tree::{EndOfLine, PieceTree, Range, StringBuffer};
use std::hint::black_box;

fn sample_text(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("line {i} of the benchmark document\n"))
        .collect()
}

fn tree_from(text: &str) -> PieceTree {
    PieceTree::new(
        vec![StringBuffer::new(text.to_string())],
        EndOfLine::Lf,
        true,
    )
}

fn bench_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("creation");

    for lines in [100, 1_000, 10_000].iter() {
        let text = sample_text(*lines);

        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("piece_tree", lines), lines, |b, _| {
            b.iter(|| black_box(tree_from(black_box(&text))))
        });

        group.bench_with_input(BenchmarkId::new("ropey", lines), lines, |b, _| {
            b.iter(|| black_box(ropey::Rope::from_str(black_box(&text))))
        });
    }
    group.finish();
}

fn bench_insert_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for lines in [1_000, 10_000].iter() {
        let text = sample_text(*lines);
        let middle = text.len() / 2;

        group.throughput(Throughput::Elements(1));

        group.bench_with_input(BenchmarkId::new("piece_tree_middle", lines), lines, |b, _| {
            b.iter_batched(
                || tree_from(&text),
                |mut tree| {
                    tree.insert(black_box(middle), black_box("INSERTED"), true);
                    black_box(tree);
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("ropey_middle", lines), lines, |b, _| {
            b.iter_batched(
                || ropey::Rope::from_str(&text),
                |mut rope| {
                    rope.insert(black_box(middle), black_box("INSERTED"));
                    black_box(rope);
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("piece_tree_typing", lines), lines, |b, _| {
            b.iter_batched(
                || tree_from(&text),
                |mut tree| {
                    for (i, ch) in "typed word ".char_indices() {
                        let mut buf = [0; 4];
                        tree.insert(middle + i, ch.encode_utf8(&mut buf), true);
                    }
                    black_box(tree);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_delete_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete");

    for lines in [1_000, 10_000].iter() {
        let text = sample_text(*lines);
        let middle = text.len() / 2;

        group.bench_with_input(BenchmarkId::new("piece_tree_middle", lines), lines, |b, _| {
            b.iter_batched(
                || tree_from(&text),
                |mut tree| {
                    tree.delete(black_box(middle), black_box(100));
                    black_box(tree);
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("ropey_middle", lines), lines, |b, _| {
            b.iter_batched(
                || ropey::Rope::from_str(&text),
                |mut rope| {
                    rope.remove(black_box(middle)..black_box(middle + 100));
                    black_box(rope);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_line_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("lines");
    let lines = 10_000;
    let text = sample_text(lines);

    let mut tree = tree_from(&text);
    // scatter edits so lookups cross many pieces
    for i in (0..lines).step_by(97) {
        let offset = tree.get_offset_at(i + 1, 1);
        tree.insert(offset, "x", true);
    }
    let rope = ropey::Rope::from_str(&tree.get_text());

    group.bench_function("piece_tree_line_content", |b| {
        b.iter(|| {
            for line in (1..lines).step_by(251) {
                black_box(tree.get_line_content(black_box(line)));
            }
        })
    });

    group.bench_function("ropey_line_content", |b| {
        b.iter(|| {
            for line in (1..lines).step_by(251) {
                black_box(rope.line(black_box(line - 1)).to_string());
            }
        })
    });

    group.bench_function("piece_tree_value_in_range", |b| {
        b.iter(|| black_box(tree.get_value_in_range(&Range::new(100, 1, 200, 5), None)))
    });

    group.bench_function("piece_tree_position_at", |b| {
        let len = tree.len();
        b.iter(|| {
            for offset in (0..len).step_by(len / 64 + 1) {
                black_box(tree.get_position_at(black_box(offset)));
            }
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_creation,
    bench_insert_operations,
    bench_delete_operations,
    bench_line_queries
);
criterion_main!(benches);
