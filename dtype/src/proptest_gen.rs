use crate::*;
use proptest::prelude::*;

impl DType {
    /// Any dtype no wider than `max_bytes`.
    pub fn bounded_generator(max_bytes: usize) -> impl Strategy<Value = Self> {
        let fitting: Vec<Self> = Self::all().filter(|dtype| dtype.bytes() <= max_bytes).collect();
        proptest::sample::select(fitting)
    }
}
