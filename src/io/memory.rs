use super::{RangeSource, check_range};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

/// In-memory source that records every range it serves.
///
/// Stands in for a remote object when exercising the resolver.
pub struct MemorySource {
    data: Vec<u8>,
    requests: Mutex<Vec<(u64, u64)>>,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every `(start, end_inclusive)` pair requested so far, in order
    pub fn requests(&self) -> Vec<(u64, u64)> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Sum of the lengths of all requested ranges
    pub fn transferred_bytes(&self) -> u64 {
        self.requests().iter().map(|(s, e)| e - s + 1).sum()
    }
}

#[async_trait]
impl RangeSource for MemorySource {
    async fn get_range(&self, start: u64, end_inclusive: u64) -> Result<Vec<u8>> {
        check_range(start, end_inclusive, self.size())?;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((start, end_inclusive));
        }
        Ok(self.data[start as usize..=end_inclusive as usize].to_vec())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_requests() {
        let source = MemorySource::new((0u8..32).collect());
        assert_eq!(source.get_range(0, 3).await.unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(source.get_range(30, 31).await.unwrap(), vec![30, 31]);
        assert!(source.get_range(31, 32).await.is_err());
        assert_eq!(source.requests(), vec![(0, 3), (30, 31)]);
        assert_eq!(source.transferred_bytes(), 6);
    }
}
