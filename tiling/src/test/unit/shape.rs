use test_case::test_case;
use vectile_dtype::DType;

use crate::error::Error;
use crate::shape::{OutputDesc, RuntimeShapes, TensorDesc, complete_shapes};
use crate::test::helpers::shapes;

#[test_case(&[&[5824], &[100, 1]], &[100, 5824]; "right aligned broadcast")]
#[test_case(&[&[2, 3, 4], &[4]], &[2, 3, 4]; "trailing vector")]
#[test_case(&[&[], &[3]], &[3]; "scalar input")]
#[test_case(&[&[]], &[1]; "scalar only")]
#[test_case(&[&[2, 0, 2], &[2, 0, 2]], &[2, 0, 2]; "empty tensor")]
#[test_case(&[&[1, 3], &[0, 1]], &[0, 3]; "zero broadcasts against one")]
fn test_output_shape(inputs: &[&[i64]], expected: &[i64]) {
    let completed = complete_shapes(&shapes(inputs, DType::Float32), true).unwrap();
    assert_eq!(completed.output.as_slice(), expected);
    assert!(completed.inputs.iter().all(|input| input.len() == expected.len()));
}

#[test]
fn test_inputs_padded_with_leading_ones() {
    let completed = complete_shapes(&shapes(&[&[5824], &[100, 1]], DType::Float32), true).unwrap();
    assert_eq!(completed.inputs[0].as_slice(), &[1, 5824]);
    assert_eq!(completed.inputs[1].as_slice(), &[100, 1]);
}

#[test]
fn test_broadcast_mismatch() {
    let result = complete_shapes(&shapes(&[&[3, 4], &[2, 4]], DType::Float32), true);
    assert_eq!(result.unwrap_err(), Error::BroadcastMismatch { axis: 0, lhs: 3, rhs: 2 });
}

#[test]
fn test_broadcast_unsupported() {
    let result = complete_shapes(&shapes(&[&[3, 4], &[1, 4]], DType::Float32), false);
    assert_eq!(result.unwrap_err(), Error::BroadcastUnsupported { input: 1 });
}

#[test]
fn test_elementwise_without_broadcast_support() {
    let completed = complete_shapes(&shapes(&[&[3, 4], &[3, 4]], DType::Float32), false).unwrap();
    assert_eq!(completed.output.as_slice(), &[3, 4]);
}

#[test]
fn test_negative_dim() {
    let result = complete_shapes(&shapes(&[&[3, -1]], DType::Float32), true);
    assert_eq!(result.unwrap_err(), Error::NegativeDim { input: 0, axis: 1, dim: -1 });
}

#[test]
fn test_rank_exceeded() {
    let shape = [1i64; 17];
    let result = complete_shapes(&shapes(&[&shape], DType::Float32), true);
    assert_eq!(result.unwrap_err(), Error::RankExceeded { rank: 17, max: 16 });
}

#[test]
fn test_no_inputs_or_outputs() {
    let no_inputs = RuntimeShapes::new(vec![], vec![OutputDesc::new(DType::Float32)]);
    assert_eq!(complete_shapes(&no_inputs, true).unwrap_err(), Error::NoInputs);

    let no_outputs = RuntimeShapes::new(vec![TensorDesc::new([4], DType::Float32)], vec![]);
    assert_eq!(complete_shapes(&no_outputs, true).unwrap_err(), Error::NoOutputs);
}

#[test]
fn test_output_shape_checked() {
    let ok = RuntimeShapes::new(
        vec![TensorDesc::new([3, 1], DType::Float32), TensorDesc::new([4], DType::Float32)],
        vec![OutputDesc::with_shape([3, 4], DType::Float32)],
    );
    assert!(complete_shapes(&ok, true).is_ok());

    let wrong = RuntimeShapes::new(
        vec![TensorDesc::new([3, 1], DType::Float32), TensorDesc::new([4], DType::Float32)],
        vec![OutputDesc::with_shape([3, 5], DType::Float32)],
    );
    assert_eq!(
        complete_shapes(&wrong, true).unwrap_err(),
        Error::OutputShapeMismatch { expected: vec![3, 4], actual: vec![3, 5] }
    );
}

#[test]
fn test_widest_dtypes() {
    let shapes = RuntimeShapes::new(
        vec![TensorDesc::new([4], DType::Float16), TensorDesc::new([4], DType::Int32)],
        vec![OutputDesc::new(DType::Int8), OutputDesc::new(DType::Float16)],
    );
    let completed = complete_shapes(&shapes, true).unwrap();
    assert_eq!(completed.in_dtype, DType::Int32);
    assert_eq!(completed.out_dtype, DType::Float16);
    assert_eq!(completed.out_dtypes.as_slice(), &[DType::Int8, DType::Float16]);
}

#[test]
fn test_output_size_overflow() {
    let completed = complete_shapes(&shapes(&[&[65536, 65536]], DType::Int8), true).unwrap();
    assert!(matches!(completed.checked_output_size(), Err(Error::OutputSizeOverflow { .. })));

    let completed = complete_shapes(&shapes(&[&[1024, 1024]], DType::Int8), true).unwrap();
    assert_eq!(completed.checked_output_size().unwrap(), 1 << 20);
}
