use itertools::Itertools;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;

use crate::errors::MetadataError;

const PREFIX: &str = "POSITION-";

/// The shuffled sequence in which fragments are handed to the worker list.
/// Position `k` of the order names the `original_index` delivered to worker
/// `k`. Recoverable only through the encrypted metadata string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOrder(Vec<usize>);

impl SendOrder {
    /// A uniformly random permutation of `[0, n)`.
    pub fn shuffled(n: usize) -> Self {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut OsRng);
        SendOrder(indices)
    }

    pub fn identity(n: usize) -> Self {
        SendOrder((0..n).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    /// The literal metadata string, e.g. `POSITION-2,0,1`.
    pub fn encode(&self) -> String {
        format!("{}{}", PREFIX, self.0.iter().join(","))
    }

    pub fn parse(s: &str) -> Result<Self, MetadataError> {
        let body = s.strip_prefix(PREFIX).ok_or_else(|| MetadataError::Malformed {
            reason: format!("missing `{}` prefix", PREFIX),
        })?;
        let indices = body
            .split(',')
            .map(|tok| {
                tok.parse::<usize>().map_err(|_| MetadataError::Malformed {
                    reason: format!("`{}` is not an index", tok),
                })
            })
            .collect::<Result<Vec<usize>, MetadataError>>()?;
        Ok(SendOrder(indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_prefix() {
        let order = SendOrder(vec![2, 0, 1]);
        assert_eq!(order.encode(), "POSITION-2,0,1");
    }

    #[test]
    fn parse_round_trips() {
        let order = SendOrder::shuffled(7);
        assert_eq!(SendOrder::parse(&order.encode()).unwrap(), order);
    }

    #[test]
    fn shuffled_is_a_permutation() {
        let order = SendOrder::shuffled(16);
        let mut seen: Vec<usize> = order.iter().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..16).collect::<Vec<usize>>());
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(matches!(
            SendOrder::parse("2,0,1"),
            Err(MetadataError::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_non_integer_token() {
        assert!(matches!(
            SendOrder::parse("POSITION-2,x,1"),
            Err(MetadataError::Malformed { .. })
        ));
    }
}
