//! Small vector math helpers for embedding post-processing and scoring.

/// L2 norm of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale a vector to unit L2 norm.
///
/// Returns `None` for zero-norm input, which cannot participate in cosine
/// similarity.
pub fn normalize(mut v: Vec<f32>) -> Option<Vec<f32>> {
    let norm = l2_norm(&v);
    if norm < f32::EPSILON {
        return None;
    }
    for x in &mut v {
        *x /= norm;
    }
    Some(v)
}

/// Dot product. For unit vectors this equals cosine similarity.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Component-wise arithmetic mean of a set of vectors.
///
/// The result is deliberately not renormalized: the query representative is
/// the plain mean of its block vectors.
pub fn mean(vectors: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let mut out = vec![0.0f32; first.len()];
    for v in vectors {
        for (o, x) in out.iter_mut().zip(v.iter()) {
            *o += x;
        }
    }
    let n = vectors.len() as f32;
    for o in &mut out {
        *o /= n;
    }
    out
}
