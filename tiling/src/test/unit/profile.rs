use test_case::test_case;
use vectile_dtype::DType;

use crate::emit::EmissionToken;
use crate::engine::tile;
use crate::error::Error;
use crate::pattern::Pattern;
use crate::profile::{AlignmentTable, CompileInfo, CompileTimeProfile, DeviceFamily, TilingFlags};
use crate::test::helpers::{shapes, static_flags};

const COMPILE_INFO: &str = r#"{
    "flag_info": [false, false, true, true, true, true, false],
    "base_info": {
        "100": [32, 4, 21840, 10920],
        "999": [32, 4, 21840, 10920]
    },
    "ub_block_bytes": 32,
    "soc_version": "Ascend910B3",
    "elewise_vars": {
        "99910240": [10015, 20014, 30015],
        "10010001": [10000, 20000, 30000]
    }
}"#;

#[test]
fn test_from_json() {
    let info: CompileInfo = serde_json::from_str(COMPILE_INFO).unwrap();
    let profile = CompileTimeProfile::from_compile_info(&info).unwrap();

    assert!(profile.flags().support_broadcast);
    assert!(profile.flags().dynamic_fallback());
    assert!(!profile.flags().axis_factor_only);
    assert_eq!(profile.device(), DeviceFamily::Newer);
    assert!(profile.has_capacity(Pattern::Common));
    assert!(!profile.has_capacity(Pattern::CommonBroadcast));

    let emission = profile.emission().unwrap();
    assert_eq!(
        emission[&99_910_240],
        vec![
            EmissionToken::Dim { input: 0, axis: 15 },
            EmissionToken::BlockFactor { axis: 14 },
            EmissionToken::UbFactor { axis: 15 },
        ]
    );
}

#[test]
fn test_json_profile_tiles() {
    let info: CompileInfo = serde_json::from_str(COMPILE_INFO).unwrap();
    let profile = CompileTimeProfile::from_compile_info(&info).unwrap();
    let decision = tile(&profile, &shapes(&[&[1, 5824], &[100, 1]], DType::Float32)).unwrap();

    assert_eq!(decision.tiling_key, Some(99_910_240));
    assert_eq!(decision.tiling_data, vec![5824, 4, 5824]);
}

#[test]
fn test_missing_flag_info() {
    let info: CompileInfo = serde_json::from_str(r#"{ "base_info": {} }"#).unwrap();
    assert_eq!(
        CompileTimeProfile::from_compile_info(&info).unwrap_err(),
        Error::MissingField { field: "flag_info" }
    );
}

#[test]
fn test_missing_base_info() {
    let info: CompileInfo = serde_json::from_str(r#"{ "flag_info": [false, false, true] }"#).unwrap();
    assert_eq!(
        CompileTimeProfile::from_compile_info(&info).unwrap_err(),
        Error::MissingField { field: "base_info" }
    );
}

#[test]
fn test_const_mode_requires_shapes() {
    let info: CompileInfo = serde_json::from_str(r#"{ "flag_info": [false, true] }"#).unwrap();
    assert_eq!(
        CompileTimeProfile::from_compile_info(&info).unwrap_err(),
        Error::MissingField { field: "const_shapes" }
    );
}

#[test]
fn test_const_mode_arity() {
    let info: CompileInfo = serde_json::from_str(
        r#"{ "flag_info": [false, true], "const_shapes": [[4, 4]], "const_block_dims": [1, 2] }"#,
    )
    .unwrap();
    assert!(matches!(
        CompileTimeProfile::from_compile_info(&info),
        Err(Error::MalformedField { field: "const_block_dims", .. })
    ));
}

#[test]
fn test_bad_emission_key() {
    let info: CompileInfo =
        serde_json::from_str(r#"{ "flag_info": [true], "base_info": {}, "elewise_vars": { "abc": [] } }"#).unwrap();
    assert!(matches!(
        CompileTimeProfile::from_compile_info(&info),
        Err(Error::MalformedField { field: "elewise_vars", .. })
    ));
}

#[test]
fn test_bad_emission_code() {
    let info: CompileInfo =
        serde_json::from_str(r#"{ "flag_info": [true], "base_info": {}, "elewise_vars": { "1": [99999] } }"#).unwrap();
    assert_eq!(
        CompileTimeProfile::from_compile_info(&info).unwrap_err(),
        Error::InvalidEmissionCode { code: 99999 }
    );
}

#[test]
fn test_empty_flag_info() {
    assert!(matches!(TilingFlags::from_flag_info(&[]), Err(Error::MalformedField { field: "flag_info", .. })));
}

#[test_case(32, DType::Float32, 8)]
#[test_case(32, DType::Float16, 16)]
#[test_case(32, DType::Int8, 32)]
#[test_case(16, DType::Float64, 2)]
fn test_alignment_table(block_bytes: i64, dtype: DType, elems: i64) {
    assert_eq!(AlignmentTable::new(block_bytes).unwrap().elems_per_block(dtype), elems);
}

#[test]
fn test_alignment_too_small() {
    assert!(matches!(AlignmentTable::new(4), Err(Error::AlignmentTooSmall { block_bytes: 4, .. })));
    assert_eq!(AlignmentTable::new(0).unwrap_err(), Error::ZeroDivisor { what: "alignment unit" });
}

#[test]
fn test_builder_rejects_small_alignment() {
    let result = CompileTimeProfile::builder().flags(static_flags()).ub_block_bytes(2).build();
    assert!(matches!(result, Err(Error::AlignmentTooSmall { .. })));
}

#[test]
fn test_profile_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CompileTimeProfile>();
}
