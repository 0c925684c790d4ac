/// Cosine similarity in `[-1, 1]`.
///
/// Returns 0.0 for empty or length-mismatched inputs and for zero vectors.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> f32 {
    if query.is_empty() || query.len() != candidate.len() {
        return 0.0;
    }

    let (dot, query_sq, candidate_sq) = query.iter().zip(candidate).fold(
        (0.0f64, 0.0f64, 0.0f64),
        |(dot, qq, cc), (q, c)| {
            let (q, c) = (f64::from(*q), f64::from(*c));
            (dot + q * c, qq + q * q, cc + c * c)
        },
    );

    let denom = query_sq.sqrt() * candidate_sq.sqrt();
    if denom <= f64::from(f32::EPSILON) {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0) as f32
}

/// Best cosine similarity between `query` and any candidate; 0.0 when there
/// are no candidates.
pub fn max_cosine(query: &[f32], candidates: &[Vec<f32>]) -> f32 {
    candidates
        .iter()
        .map(|candidate| cosine_similarity(query, candidate))
        .fold(None, |best: Option<f32>, score| {
            Some(best.map_or(score, |b| b.max(score)))
        })
        .unwrap_or(0.0)
}

pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
