use test_case::test_case;
use vectile_dtype::DType;

use crate::capacity::{Capacity, resolve_capacity};
use crate::error::Error;
use crate::pattern::Pattern;
use crate::profile::CompileTimeProfile;
use crate::test::helpers::{STANDARD_CAPACITY, base_info, standard_profile, static_flags};

#[test]
fn test_resolve_standard() {
    let profile = standard_profile(static_flags());
    let capacity = resolve_capacity(&profile, Pattern::CommonBroadcast).unwrap();
    assert_eq!(capacity, Capacity { units: 32, max_dtype_bytes: 4, max_ub: 21840, max_ub_db: 10920 });
}

#[test]
fn test_missing_key() {
    let profile = CompileTimeProfile::builder()
        .flags(static_flags())
        .base_info(base_info(&["100"], STANDARD_CAPACITY))
        .build()
        .unwrap();
    assert_eq!(
        resolve_capacity(&profile, Pattern::UnknownUnknown).unwrap_err(),
        Error::MissingCapacity { key: "999".to_string() }
    );
}

#[test_case(&[32, 4, 21840]; "too short")]
#[test_case(&[32, 4, 21840, 10920, 1]; "too long")]
fn test_arity(tuple: &[i64]) {
    assert_eq!(
        Capacity::from_tuple("100", tuple).unwrap_err(),
        Error::CapacityArity { key: "100".to_string(), len: tuple.len() }
    );
}

#[test_case(&[0, 4, 21840, 10920], "unit count")]
#[test_case(&[32, 0, 21840, 10920], "max dtype width")]
#[test_case(&[32, 4, -1, 10920], "buffer capacity")]
#[test_case(&[32, 4, 21840, 0], "double-buffered capacity")]
fn test_non_positive(tuple: &[i64], what: &'static str) {
    assert_eq!(Capacity::from_tuple("100", tuple).unwrap_err(), Error::ZeroDivisor { what });
}

#[test_case(DType::Float32, true)]
#[test_case(DType::Float16, true)]
#[test_case(DType::Int8, true)]
#[test_case(DType::Float64, false)]
#[test_case(DType::Int64, false)]
fn test_dtype_width(dtype: DType, fits: bool) {
    let capacity = Capacity::from_tuple("100", &STANDARD_CAPACITY).unwrap();
    assert_eq!(capacity.check_dtype(dtype).is_ok(), fits);
}
