use smallvec::smallvec;

use crate::expr::{IndexExpr, PermTerm};
use crate::view::ShapeView;

fn dense(extent: usize) -> ShapeView {
    ShapeView::contiguous(extent)
}

#[test]
fn test_identity() {
    let view = dense(10);
    for i in 0..10 {
        assert_eq!(IndexExpr::Identity.resolve(i, &view), i);
    }
}

#[test]
fn test_identity_with_offset() {
    let view = dense(10).at_offset(100);
    assert_eq!(IndexExpr::Identity.resolve(7, &view), 107);
}

#[test]
fn test_broadcast_wraps_modulo() {
    let view = dense(8);
    assert_eq!(IndexExpr::Broadcast.resolve(0, &view), 0);
    assert_eq!(IndexExpr::Broadcast.resolve(7, &view), 7);
    assert_eq!(IndexExpr::Broadcast.resolve(8, &view), 0);
    assert_eq!(IndexExpr::Broadcast.resolve(63, &view), 7);
}

#[test]
fn test_strided_scales_by_leading_stride() {
    let view = ShapeView::new(4, 8, 12).unwrap();
    assert_eq!(IndexExpr::Strided.resolve(0, &view), 4);
    assert_eq!(IndexExpr::Strided.resolve(3, &view), 4 + 36);
}

#[test]
fn test_permuted_transpose_2d() {
    // Output traverses a 3x4 matrix; input holds its 4x3 transpose.
    // Output component (row, col) = (i / 4, i % 4); input address is
    // col * 3 + row.
    let expr = IndexExpr::Permuted {
        terms: smallvec![
            PermTerm { div: 4, rem: 3, scale: 1 }, // output row -> input col stride 1
            PermTerm { div: 1, rem: 4, scale: 3 }, // output col -> input row stride 3
        ],
    };
    let view = dense(12);

    // Element (1, 2) of the output is at i = 6; transposed source is (2, 1),
    // flat address 2 * 3 + 1 = 7.
    assert_eq!(expr.resolve(6, &view), 7);

    // Every address in [0, 12) is visited exactly once.
    let mut seen = vec![false; 12];
    for i in 0..12 {
        let addr = expr.resolve(i, &view);
        assert!(!seen[addr]);
        seen[addr] = true;
    }
    assert!(seen.iter().all(|&v| v));
}

#[test]
fn test_window_base() {
    let expr = IndexExpr::WindowBase { window: 30 };
    let view = dense(900);
    assert_eq!(expr.resolve(0, &view), 0);
    assert_eq!(expr.resolve(1, &view), 30);
    assert_eq!(expr.resolve(29, &view), 870);
}

#[test]
fn test_group_base() {
    let expr = IndexExpr::GroupBase { group: 30 };
    let view = dense(900);
    assert_eq!(expr.resolve(0, &view), 0);
    assert_eq!(expr.resolve(29, &view), 0);
    assert_eq!(expr.resolve(30, &view), 30);
    assert_eq!(expr.resolve(89, &view), 60);
}

#[test]
fn test_address_bound_covers_every_resolution() {
    let total = 60;
    let exprs = [
        IndexExpr::Identity,
        IndexExpr::Broadcast,
        IndexExpr::Strided,
        IndexExpr::Permuted {
            terms: smallvec![
                PermTerm { div: 12, rem: 5, scale: 1 },
                PermTerm { div: 1, rem: 12, scale: 5 },
            ],
        },
        IndexExpr::WindowBase { window: 4 },
        IndexExpr::GroupBase { group: 6 },
        IndexExpr::Grouped { group: 6 },
    ];
    let view = ShapeView::new(3, 12, 2).unwrap();

    for expr in &exprs {
        let bound = expr.address_bound(total, &view);
        let max = (0..total).map(|i| expr.resolve(i, &view)).max().unwrap();
        assert!(max < bound, "{expr:?}: resolved {max}, bound {bound}");
    }
}

#[test]
fn test_address_bound_empty_space() {
    let view = ShapeView::new(7, 4, 1).unwrap();
    assert_eq!(IndexExpr::Identity.address_bound(0, &view), 7);
}

#[test]
fn test_grouped_lookup() {
    let expr = IndexExpr::Grouped { group: 30 };
    let view = dense(30);
    assert_eq!(expr.resolve(0, &view), 0);
    assert_eq!(expr.resolve(29, &view), 0);
    assert_eq!(expr.resolve(30, &view), 1);
    assert_eq!(expr.resolve(899, &view), 29);
}
