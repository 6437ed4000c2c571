use smallvec::smallvec;

use veld_ir::{
    Alignment, ArgSpec, Guard, KernelSpec, NormalizeKind, Operation, ReduceOp, ScalarExpr,
    SelectArm, ShapeView, WorkSpan,
};

use crate::emit::{EmittedKernel, Kernel, emit};

fn single(spec: &KernelSpec) -> Kernel {
    match emit(spec).unwrap() {
        EmittedKernel::Single(kernel) => kernel,
        EmittedKernel::NormalizePair(_) => panic!("expected a single kernel"),
    }
}

/// Run a kernel over its whole work space with one worker and dense views.
fn run(kernel: &Kernel, out_len: usize, inputs: &[&[f64]]) -> Vec<f64> {
    run_with_views(
        kernel,
        out_len,
        inputs,
        std::iter::once(ShapeView::contiguous(out_len))
            .chain(inputs.iter().map(|data| ShapeView::contiguous(data.len())))
            .collect(),
    )
}

fn run_with_views(
    kernel: &Kernel,
    out_len: usize,
    inputs: &[&[f64]],
    views: Vec<ShapeView>,
) -> Vec<f64> {
    let mut out = vec![0.0; out_len];
    let mut buffers = vec![out.as_mut_ptr()];
    let mut lens = vec![out_len];
    for data in inputs {
        buffers.push(data.as_ptr().cast_mut());
        lens.push(data.len());
    }

    let span = WorkSpan { start: 0, step: 1, total: kernel.work_total() };
    unsafe { kernel.apply(&buffers, &lens, &views, span) };
    out
}

#[test]
fn test_map_with_broadcast_executes() {
    let spec = KernelSpec::new(
        Operation::Map { expr: ScalarExpr::input(0).add(ScalarExpr::input(1)) },
        smallvec![4, 4],
        vec![ArgSpec::same(smallvec![4, 4]), ArgSpec::broadcast(smallvec![4])],
    );
    let kernel = single(&spec);
    assert_eq!(kernel.name(), "map");
    assert_eq!(kernel.arity(), 3);

    let a: Vec<f64> = (0..16).map(|i| i as f64).collect();
    let bias = [100.0, 200.0, 300.0, 400.0];
    let out = run(&kernel, 16, &[&a, &bias]);

    for i in 0..16 {
        assert_eq!(out[i], a[i] + bias[i % 4]);
    }
}

#[test]
fn test_select_emits_identity_matrix() {
    let spec = KernelSpec::new(
        Operation::Select {
            arms: vec![SelectArm {
                guard: Guard::Diagonal { dim: 4 },
                value: ScalarExpr::constant(1.0),
            }],
            default: ScalarExpr::constant(0.0),
        },
        smallvec![4, 4],
        vec![],
    );
    let out = run(&single(&spec), 16, &[]);

    for r in 0..4 {
        for c in 0..4 {
            assert_eq!(out[r * 4 + c], if r == c { 1.0 } else { 0.0 });
        }
    }
}

#[test]
fn test_first_matching_arm_wins() {
    let spec = KernelSpec::new(
        Operation::Select {
            arms: vec![
                SelectArm { guard: Guard::Position { index: 0 }, value: ScalarExpr::constant(7.0) },
                SelectArm {
                    guard: Guard::Leading { extent: 4, count: 2 },
                    value: ScalarExpr::constant(3.0),
                },
            ],
            default: ScalarExpr::constant(0.0),
        },
        smallvec![8],
        vec![],
    );
    let out = run(&single(&spec), 8, &[]);
    assert_eq!(out, vec![7.0, 3.0, 0.0, 0.0, 3.0, 3.0, 0.0, 0.0]);
}

#[test]
fn test_reduce_sum_matches_naive() {
    let spec = KernelSpec::new(
        Operation::Reduce { op: ReduceOp::Sum, window: 8 },
        smallvec![4],
        vec![ArgSpec::new(smallvec![4, 8], Alignment::Reduced { window: 8 })],
    );
    let kernel = single(&spec);
    assert_eq!(kernel.name(), "reduce_sum");

    let data: Vec<f64> = (0..32).map(|i| (i as f64) * 0.5).collect();
    let out = run(&kernel, 4, &[&data]);

    for (g, value) in out.iter().enumerate() {
        let expected: f64 = data[g * 8..(g + 1) * 8].iter().sum();
        assert_eq!(*value, expected);
    }
}

#[test]
fn test_reduce_max_ignores_scale() {
    let spec = KernelSpec::new(
        Operation::Reduce { op: ReduceOp::Max, window: 4 },
        smallvec![2],
        vec![ArgSpec::new(smallvec![8], Alignment::Reduced { window: 4 })],
    );
    let data = [1.0, -5.0, 3.0, 2.0, -1.0, -2.0, -0.5, -4.0];
    let out = run(&single(&spec), 2, &[&data]);
    assert_eq!(out, vec![3.0, -0.5]);
}

#[test]
fn test_gather_transposes() {
    let spec = KernelSpec::new(
        Operation::Gather,
        smallvec![3, 2],
        vec![ArgSpec::new(
            smallvec![2, 3],
            Alignment::Permuted { order: smallvec![1, 0] },
        )],
    );
    let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let out = run(&single(&spec), 6, &[&data]);
    assert_eq!(out, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
}

#[test]
fn test_strided_output_interleaves() {
    let spec = KernelSpec::new(
        Operation::Map { expr: ScalarExpr::input(0) },
        smallvec![4],
        vec![ArgSpec::same(smallvec![4])],
    )
    .strided();
    let kernel = single(&spec);

    let data = [1.0, 2.0, 3.0, 4.0];
    let views = vec![
        ShapeView::new(0, 4, 2).unwrap(),
        ShapeView::contiguous(4),
    ];
    let out = run_with_views(&kernel, 8, &[&data], views);
    assert_eq!(out, vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0, 4.0, 0.0]);
}

#[test]
fn test_normalize_pair_structure() {
    let spec = KernelSpec::new(
        Operation::Normalize { group: 30, kind: NormalizeKind::MeanCenter },
        smallvec![30, 30],
        vec![ArgSpec::same(smallvec![30, 30])],
    );
    let EmittedKernel::NormalizePair(pair) = emit(&spec).unwrap() else {
        panic!("expected a normalization pair");
    };

    assert_eq!(pair.group, 30);
    assert_eq!(pair.group_count(), 30);
    assert_eq!(pair.stats.name(), "normalize_stats");
    assert_eq!(pair.stats.arity(), 2);
    assert_eq!(pair.stats.work_total(), 30);
    assert_eq!(pair.apply.name(), "normalize_apply");
    assert_eq!(pair.apply.arity(), 3);
    assert_eq!(pair.apply.work_total(), 900);
}

#[test]
fn test_normalize_pair_mean_centers() {
    let spec = KernelSpec::new(
        Operation::Normalize { group: 4, kind: NormalizeKind::MeanCenter },
        smallvec![2, 4],
        vec![ArgSpec::same(smallvec![2, 4])],
    );
    let EmittedKernel::NormalizePair(pair) = emit(&spec).unwrap() else {
        panic!("expected a normalization pair");
    };

    let data = [1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0];
    let means = run(&pair.stats, 2, &[&data]);
    assert_eq!(means, vec![2.5, 25.0]);

    let out = run(&pair.apply, 8, &[&data, &means]);
    assert_eq!(out, vec![-1.5, -0.5, 0.5, 1.5, -15.0, -5.0, 5.0, 15.0]);
}

#[test]
fn test_standardize_unit_variance() {
    let spec = KernelSpec::new(
        Operation::Normalize { group: 4, kind: NormalizeKind::Standardize { epsilon: 0.0 } },
        smallvec![4],
        vec![ArgSpec::same(smallvec![4])],
    );
    let EmittedKernel::NormalizePair(pair) = emit(&spec).unwrap() else {
        panic!("expected a normalization pair");
    };

    let data = [2.0, 4.0, 6.0, 8.0];
    let means = run(&pair.stats, 1, &[&data]);
    let out = run(&pair.apply, 4, &[&data, &means]);

    // Mean 5, population variance 5: (x - 5) / sqrt(5).
    let sd = 5.0f64.sqrt();
    for (value, x) in out.iter().zip(&data) {
        assert!((value - (x - 5.0) / sd).abs() < 1e-12);
    }
    let sum: f64 = out.iter().sum();
    assert!(sum.abs() < 1e-12);
}
