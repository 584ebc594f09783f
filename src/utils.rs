use anyhow::{Result, bail};
use std::{fmt::Debug, ops::RangeBounds};

pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }

    Ok(())
}

pub fn check_finite(vals: &[f64]) -> Result<()> {
    if let Some(idx) = vals.iter().position(|val| !val.is_finite()) {
        bail!("values must be finite, but element {idx} is {:?}", vals[idx]);
    }

    Ok(())
}
