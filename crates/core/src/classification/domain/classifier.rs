use crate::imaging::domain::normalizer::NormalizedTensor;

/// Domain interface for the sign classifier.
///
/// Returns one confidence per catalog entry, in catalog order. The model
/// runtime behind it is assumed non-reentrant, hence `&mut self`.
pub trait Classifier: Send {
    fn classify(&mut self, tensor: &NormalizedTensor) -> Result<Vec<f32>, Box<dyn std::error::Error>>;
}

/// Index of the highest confidence; the first one wins on ties.
///
/// `None` for an empty distribution. NaN entries never win.
pub fn argmax(confidences: &[f32]) -> Option<usize> {
    confidences
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::single(&[0.3], Some(0))]
    #[case::middle(&[0.1, 0.7, 0.2], Some(1))]
    #[case::last(&[0.1, 0.2, 0.7], Some(2))]
    #[case::tie_first_wins(&[0.5, 0.5], Some(0))]
    #[case::nan_ignored(&[f32::NAN, 0.1], Some(1))]
    #[case::empty(&[], None)]
    fn test_argmax(#[case] confidences: &[f32], #[case] expected: Option<usize>) {
        assert_eq!(argmax(confidences), expected);
    }
}
