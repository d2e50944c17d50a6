use test_case::test_case;

use crate::capacity::Capacity;
use crate::error::Error;
use crate::ub::{UbRequest, UbTiling, ub_tiling};

fn capacity(max_ub: i64, max_ub_db: i64) -> Capacity {
    Capacity { units: 32, max_dtype_bytes: 4, max_ub, max_ub_db }
}

fn request<'a>(output: &'a [i64], broadcast_axis: &'a [bool], start: (usize, i64), capacity: Capacity) -> UbRequest<'a> {
    UbRequest {
        output,
        broadcast_axis,
        start_axis: start.0,
        start_extent: start.1,
        capacity,
        elems_per_block: 8,
        broadcast_opt: true,
    }
}

#[test]
fn test_outer_split_with_double_buffer() {
    let tiling = ub_tiling(&request(&[100, 5824], &[true, true], (0, 4), capacity(21840, 10920))).unwrap();
    assert_eq!(tiling, UbTiling { axis: 1, factor: 5824, double_buffer: true });
}

#[test]
fn test_unit_step_moves_to_next_axis() {
    // One row of [6, 3, 512] per pass is the whole of axis 2.
    let tiling = ub_tiling(&request(&[6, 3, 512], &[false, true, false], (0, 6), capacity(4096, 512))).unwrap();
    assert_eq!(tiling, UbTiling { axis: 2, factor: 512, double_buffer: true });

    // A factor above one stays on its axis.
    let tiling = ub_tiling(&request(&[6, 3, 512], &[false, true, false], (0, 6), capacity(4096, 1024))).unwrap();
    assert_eq!(tiling, UbTiling { axis: 1, factor: 2, double_buffer: true });
}

#[test]
fn test_single_axis_large() {
    let tiling = ub_tiling(&request(&[3031754], &[false], (0, 94744), capacity(21840, 10920))).unwrap();
    assert_eq!(tiling, UbTiling { axis: 0, factor: 10920, double_buffer: true });
}

#[test]
fn test_everything_fits_single_buffer() {
    let tiling = ub_tiling(&request(&[64, 100], &[false, false], (0, 2), capacity(21840, 10920))).unwrap();
    assert_eq!(tiling, UbTiling { axis: 0, factor: 2, double_buffer: false });
}

#[test_case(1000, 300, 150, 144; "rounded down when rounding up overflows")]
#[test_case(1027, 600, 512, 344; "tail rebalanced")]
#[test_case(1000, 600, 500, 500; "exact split untouched")]
fn test_last_axis_adjustments(dim: i64, max_ub: i64, max_ub_db: i64, factor: i64) {
    let tiling = ub_tiling(&request(&[dim], &[false], (0, dim), capacity(max_ub, max_ub_db))).unwrap();
    assert_eq!(tiling.factor, factor);
    assert!(tiling.double_buffer);
    assert!(tiling.factor <= max_ub_db);
}

#[test]
fn test_middle_axis_broadcast_shrinks() {
    let tiling = ub_tiling(&request(&[64, 10], &[true, false], (0, 64), capacity(320, 160))).unwrap();
    assert_eq!(tiling, UbTiling { axis: 0, factor: 10, double_buffer: true });
}

#[test]
fn test_middle_axis_broadcast_disabled() {
    let mut req = request(&[64, 10], &[true, false], (0, 64), capacity(320, 160));
    req.broadcast_opt = false;
    assert_eq!(ub_tiling(&req).unwrap(), UbTiling { axis: 0, factor: 16, double_buffer: true });
}

#[test]
fn test_lowest_middle_retarget() {
    let tiling = ub_tiling(&request(&[3, 4, 2048], &[false, true, false], (0, 3), capacity(21840, 10920))).unwrap();
    assert_eq!(tiling, UbTiling { axis: 1, factor: 4, double_buffer: true });
}

#[test]
fn test_lowest_middle_needs_large_row() {
    let tiling = ub_tiling(&request(&[3, 4, 512], &[false, true, false], (0, 3), capacity(8192, 4096))).unwrap();
    assert_eq!(tiling, UbTiling { axis: 0, factor: 3, double_buffer: false });
}

#[test]
fn test_starts_at_block_axis() {
    let tiling = ub_tiling(&request(&[8, 100, 64], &[false, true, false], (1, 50), capacity(21840, 10920))).unwrap();
    assert_eq!(tiling, UbTiling { axis: 1, factor: 50, double_buffer: false });
}

#[test]
fn test_invalid_requests() {
    let zero = request(&[4], &[false], (0, 0), capacity(100, 50));
    assert_eq!(ub_tiling(&zero).unwrap_err(), Error::ZeroDivisor { what: "block factor" });

    let out_of_range = request(&[4], &[false], (1, 4), capacity(100, 50));
    assert!(matches!(ub_tiling(&out_of_range), Err(Error::IndexOutOfRange { .. })));
}
