//! Column-vector filter kernels (§4.11): dense numeric arrays compared
//! against a scalar, producing a one-byte-per-element bitmap. The scalar
//! loop is the correctness reference; the unrolled variants process
//! several lanes per iteration and must agree with it bit-for-bit.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpKind {
    Eq,
    Gt,
    Lt,
}

fn cmp_i64(kind: CmpKind, a: i64, b: i64) -> bool {
    match kind {
        CmpKind::Eq => a == b,
        CmpKind::Gt => a > b,
        CmpKind::Lt => a < b,
    }
}

fn cmp_f64(kind: CmpKind, a: f64, b: f64) -> bool {
    match kind {
        CmpKind::Eq => a == b,
        CmpKind::Gt => a > b,
        CmpKind::Lt => a < b,
    }
}

/// Scalar reference kernel over `i32`. Always correct; used directly for
/// small arrays and as the oracle for the unrolled kernel in tests.
pub fn eq_gt_lt_i32(kind: CmpKind, data: &[i32], scalar: i32) -> Vec<u8> {
    data.iter()
        .map(|&v| cmp_i64(kind, v as i64, scalar as i64) as u8)
        .collect()
}

/// 4-wide unrolled `i32` kernel (§4.11: "process 4 × i32 ... at a time").
/// The tail (length not a multiple of 4) falls back to the scalar loop.
pub fn eq_gt_lt_i32_unrolled(kind: CmpKind, data: &[i32], scalar: i32) -> Vec<u8> {
    let mut out = vec![0u8; data.len()];
    let chunks = data.len() / 4;
    for c in 0..chunks {
        let base = c * 4;
        for lane in 0..4 {
            out[base + lane] = cmp_i64(kind, data[base + lane] as i64, scalar as i64) as u8;
        }
    }
    for i in (chunks * 4)..data.len() {
        out[i] = cmp_i64(kind, data[i] as i64, scalar as i64) as u8;
    }
    out
}

pub fn eq_gt_lt_i64(kind: CmpKind, data: &[i64], scalar: i64) -> Vec<u8> {
    data.iter().map(|&v| cmp_i64(kind, v, scalar) as u8).collect()
}

/// 2-wide unrolled `i64` kernel.
pub fn eq_gt_lt_i64_unrolled(kind: CmpKind, data: &[i64], scalar: i64) -> Vec<u8> {
    let mut out = vec![0u8; data.len()];
    let chunks = data.len() / 2;
    for c in 0..chunks {
        let base = c * 2;
        out[base] = cmp_i64(kind, data[base], scalar) as u8;
        out[base + 1] = cmp_i64(kind, data[base + 1], scalar) as u8;
    }
    if data.len() % 2 == 1 {
        let last = data.len() - 1;
        out[last] = cmp_i64(kind, data[last], scalar) as u8;
    }
    out
}

pub fn eq_gt_lt_f64(kind: CmpKind, data: &[f64], scalar: f64) -> Vec<u8> {
    data.iter().map(|&v| cmp_f64(kind, v, scalar) as u8).collect()
}

/// 2-wide unrolled `f64` kernel.
pub fn eq_gt_lt_f64_unrolled(kind: CmpKind, data: &[f64], scalar: f64) -> Vec<u8> {
    let mut out = vec![0u8; data.len()];
    let chunks = data.len() / 2;
    for c in 0..chunks {
        let base = c * 2;
        out[base] = cmp_f64(kind, data[base], scalar) as u8;
        out[base + 1] = cmp_f64(kind, data[base + 1], scalar) as u8;
    }
    if data.len() % 2 == 1 {
        let last = data.len() - 1;
        out[last] = cmp_f64(kind, data[last], scalar) as u8;
    }
    out
}

/// Element-wise bitmap AND, for combining two filter passes.
pub fn bitmap_and(a: &[u8], b: &[u8]) -> Vec<u8> {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(&x, &y)| (x != 0 && y != 0) as u8).collect()
}

/// Element-wise bitmap OR.
pub fn bitmap_or(a: &[u8], b: &[u8]) -> Vec<u8> {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(&x, &y)| (x != 0 || y != 0) as u8).collect()
}

/// Counts set bits (nonzero bytes) in a bitmap.
pub fn popcount(bitmap: &[u8]) -> usize {
    bitmap.iter().filter(|&&b| b != 0).count()
}

#[test]
fn test_scalar_and_unrolled_i32_agree() {
    let data: Vec<i32> = (-10..10).collect();
    for kind in [CmpKind::Eq, CmpKind::Gt, CmpKind::Lt] {
        let scalar = eq_gt_lt_i32(kind, &data, 3);
        let unrolled = eq_gt_lt_i32_unrolled(kind, &data, 3);
        assert_eq!(scalar, unrolled);
    }
}

#[test]
fn test_scalar_and_unrolled_i64_agree_with_odd_length() {
    let data: Vec<i64> = (0..17).collect();
    let scalar = eq_gt_lt_i64(CmpKind::Gt, &data, 8);
    let unrolled = eq_gt_lt_i64_unrolled(CmpKind::Gt, &data, 8);
    assert_eq!(scalar, unrolled);
}

#[test]
fn test_scalar_and_unrolled_f64_agree_with_odd_length() {
    let data: Vec<f64> = (0..13).map(|i| i as f64 * 1.5).collect();
    let scalar = eq_gt_lt_f64(CmpKind::Lt, &data, 10.0);
    let unrolled = eq_gt_lt_f64_unrolled(CmpKind::Lt, &data, 10.0);
    assert_eq!(scalar, unrolled);
}

#[test]
fn test_bitmap_and_or_popcount() {
    let a = vec![1u8, 0, 1, 1];
    let b = vec![1u8, 1, 0, 1];
    assert_eq!(bitmap_and(&a, &b), vec![1, 0, 0, 1]);
    assert_eq!(bitmap_or(&a, &b), vec![1, 1, 1, 1]);
    assert_eq!(popcount(&a), 3);
}
