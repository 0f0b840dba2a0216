use crate::errors::PersistenceError;
use sha2::{Digest, Sha256};

pub fn encode_vec_f32(v: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() * 4);
    for x in v {
        out.extend_from_slice(&x.to_le_bytes());
    }
    out
}

#[allow(clippy::manual_is_multiple_of)]
pub fn decode_vec_f32(bytes: &[u8]) -> Result<Vec<f32>, PersistenceError> {
    if bytes.len() % 4 != 0 {
        return Err(PersistenceError::Invariant(format!(
            "invalid embedding blob size {}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

pub fn sha256_hex(s: &str) -> String {
    let mut h = Sha256::new();
    h.update(s.as_bytes());
    hex::encode(h.finalize())
}

/// Cache key for one embedding: model id plus the digest of the exact text.
pub fn embed_cache_key(model_id: &str, text: &str) -> String {
    format!("emb|{}|{}", model_id, sha256_hex(text))
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Dense symmetric distance matrix, row-major.
pub fn pairwise_distances(points: &[Vec<f32>]) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut out = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean_distance(&points[i], &points[j]);
            out[i][j] = d;
            out[j][i] = d;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_truncated_blob() {
        let mut blob = encode_vec_f32(&[0.1, -0.2, 3.5]);
        let out = decode_vec_f32(&blob).unwrap();
        assert_eq!(out, vec![0.1, -0.2, 3.5]);

        blob.pop();
        assert!(decode_vec_f32(&blob).is_err());
    }

    #[test]
    fn cache_key_depends_on_model_and_text() {
        let a = embed_cache_key("m1", "best crm");
        assert!(a.starts_with("emb|m1|"));
        assert_ne!(a, embed_cache_key("m2", "best crm"));
        assert_ne!(a, embed_cache_key("m1", "best crm "));
    }

    #[test]
    fn euclidean_three_four_five() {
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-12);
        let m = pairwise_distances(&[vec![0.0, 0.0], vec![3.0, 4.0]]);
        assert_eq!(m[0][1], m[1][0]);
        assert_eq!(m[0][0], 0.0);
    }
}
