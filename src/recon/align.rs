use crate::error::{ReconError, Result};

/// Value written into positions an interrupted scan never acquired.
pub const PAD_VALUE: f64 = 0.0;

/// Pad `spectrum` with zeros at the tail until it holds `total_points` values.
///
/// A spectrum longer than the scan grid means the header and the event
/// table disagree; that is reported, never truncated.
pub fn align(spectrum: Vec<f64>, total_points: usize) -> Result<Vec<f64>> {
    align_with(spectrum, total_points, PAD_VALUE)
}

/// [`align`] with an explicit fill value.
pub fn align_with(mut spectrum: Vec<f64>, total_points: usize, fill: f64) -> Result<Vec<f64>> {
    let len = spectrum.len();
    if len > total_points {
        return Err(ReconError::OversizedSpectrum { len, total_points });
    }
    if len < total_points {
        log::info!("Padding data (points={len} expected={total_points})");
        spectrum.resize(total_points, fill);
    }
    Ok(spectrum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_length_is_untouched() {
        let data = vec![1.0, 2.0, 3.0];
        assert_eq!(align(data.clone(), 3).unwrap(), data);
    }

    #[test]
    fn short_spectrum_is_zero_padded_at_the_tail() {
        let data: Vec<f64> = (1..=17).map(f64::from).collect();
        let out = align(data.clone(), 20).unwrap();
        assert_eq!(out.len(), 20);
        assert_eq!(&out[..17], data.as_slice());
        assert!(out[17..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn custom_fill_value() {
        let out = align_with(vec![1.0], 3, f64::NAN).unwrap();
        assert_eq!(out[0], 1.0);
        assert!(out[1].is_nan() && out[2].is_nan());
    }

    #[test]
    fn oversized_spectrum_is_an_error() {
        match align(vec![0.0; 21], 20) {
            Err(ReconError::OversizedSpectrum { len, total_points }) => {
                assert_eq!((len, total_points), (21, 20));
            }
            other => panic!("expected OversizedSpectrum, got {other:?}"),
        }
    }
}
